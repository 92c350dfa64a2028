//! The apex chat relay.
//!
//! Serves `POST /api/chat` and `GET /api/health`, relaying chat requests to
//! the Anthropic API and streaming replies back as server-sent events.
//!
//! # Usage
//!
//! ```bash
//! ANTHROPIC_API_KEY=... apex-relay
//! apex-relay --port 8080 --allow-origin https://apex.example
//! apex-relay --system-prompt prompts/base.md
//! ```
//!
//! `RUST_LOG` controls logging (default `info`).

use arrrg::CommandLine;

use apex_relay::{RelayArgs, RelayConfig, init_tracing, serve};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, free) = RelayArgs::from_command_line_relaxed("apex-relay [OPTIONS]");
    if !free.is_empty() {
        eprintln!("apex-relay takes no positional arguments: {free:?}");
        std::process::exit(1);
    }
    init_tracing("info")?;

    let config = RelayConfig::from_env(args)?;
    tracing::info!(?config, "starting apex relay");
    serve(config).await?;
    Ok(())
}
