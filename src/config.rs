//! Deployment configuration for the relay.
//!
//! Configuration comes from the command line ([`RelayArgs`], parsed with
//! `arrrg`) and the environment.  Command-line values win.  The result is a
//! [`RelayConfig`] that is resolved once at startup and never changes.

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use arrrg_derive::CommandLine;
use url::Url;

use crate::error::{Error, Result};
use crate::upstream::DEFAULT_API_URL;

/// Port used when neither `--port` nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 3001;

/// CORS origin used when neither `--allow-origin` nor `APEX_ALLOWED_ORIGINS` is set.
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";

/// Environment variable holding the provider credential.
pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Command-line arguments for the apex-relay server.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct RelayArgs {
    /// Port to listen on.
    #[arrrg(optional, "Port to listen on (default: $PORT or 3001)", "PORT")]
    pub port: Option<u16>,

    /// Address to bind.
    #[arrrg(optional, "Address to bind (default: 0.0.0.0)", "ADDR")]
    pub bind: Option<String>,

    /// Comma-separated CORS allow-list.
    #[arrrg(
        optional,
        "Comma-separated allowed origins (default: $APEX_ALLOWED_ORIGINS or http://localhost:5173)",
        "ORIGINS"
    )]
    pub allow_origin: Option<String>,

    /// Replacement base instruction document.
    #[arrrg(optional, "Read the base system prompt from this file", "PATH")]
    pub system_prompt: Option<String>,

    /// Upstream API root.
    #[arrrg(optional, "Anthropic API base URL (default: https://api.anthropic.com/v1/)", "URL")]
    pub api_url: Option<String>,
}

/// Resolved relay configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// The provider credential.  `None` means every chat request fails with
    /// a configuration error; the relay still starts.
    pub api_key: Option<String>,

    /// Address to bind.
    pub bind: IpAddr,

    /// Port to listen on.
    pub port: u16,

    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,

    /// Upstream API root.
    pub api_url: String,

    /// Replacement base instruction document, if any.
    pub system_prompt_path: Option<PathBuf>,
}

impl RelayConfig {
    /// Resolve `args` against the process environment.
    pub fn from_env(args: RelayArgs) -> Result<Self> {
        Self::from_lookup(args, |var| env::var(var).ok())
    }

    /// Resolve `args` against an arbitrary variable lookup.
    pub fn from_lookup<F>(args: RelayArgs, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR).filter(|key| !key.trim().is_empty());

        let port = match (args.port, lookup("PORT")) {
            (Some(port), _) => port,
            (None, Some(port)) => port.trim().parse::<u16>().map_err(|_| {
                Error::configuration(format!("PORT is not a valid port number: {port:?}"))
            })?,
            (None, None) => DEFAULT_PORT,
        };

        let bind = match args.bind {
            Some(bind) => bind.parse::<IpAddr>().map_err(|_| {
                Error::configuration(format!("--bind is not an IP address: {bind:?}"))
            })?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let origins = args
            .allow_origin
            .or_else(|| lookup("APEX_ALLOWED_ORIGINS"))
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.to_string());
        let allowed_origins = split_origins(&origins);
        if allowed_origins.is_empty() {
            return Err(Error::configuration("no allowed origins configured"));
        }

        let api_url = args.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Url::parse(&api_url)?;

        Ok(Self {
            api_key,
            bind,
            port,
            allowed_origins,
            api_url,
            system_prompt_path: args.system_prompt.map(PathBuf::from),
        })
    }

    /// The socket address to listen on.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

// Hand-written so the credential never reaches a log line.
impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("bind", &self.bind)
            .field("port", &self.port)
            .field("allowed_origins", &self.allowed_origins)
            .field("api_url", &self.api_url)
            .field("system_prompt_path", &self.system_prompt_path)
            .finish()
    }
}

fn split_origins(origins: &str) -> Vec<String> {
    origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}
