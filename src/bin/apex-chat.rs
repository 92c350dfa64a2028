//! Interactive terminal chat against an apex relay.
//!
//! # Usage
//!
//! ```bash
//! apex-chat
//! apex-chat --url http://localhost:3001 --page atlas --label "Atlas Planner"
//! ```
//!
//! # Commands
//!
//! - `/page <page> [label]` - Set the planner page the conversation is about
//! - `/set <key> <value>` - Set a session state field
//! - `/unset <key>` - Remove a session state field
//! - `/state` - Show the page context and session state
//! - `/clear` - Clear conversation history
//! - `/help` - Show available commands
//! - `/quit` - Exit the application
//!
//! Ctrl+C while a reply is streaming abandons that reply.

use std::io::{self, Write};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use apex_relay::StreamClient;
use apex_relay::chat::{ChatArgs, ChatCommand, ChatConfig, ChatSession, help_text, parse_command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("apex-chat [OPTIONS]");
    apex_relay::init_tracing("warn")?;
    let config = ChatConfig::from(args);

    let client = StreamClient::new(&config.url)?;
    let mut session = ChatSession::with_context(config.context);
    let mut rl = DefaultEditor::new()?;

    println!("Apex chat (relay: {})", client.endpoint());
    println!("Type /help for commands, /quit to exit\n");

    loop {
        let line = match rl.readline("You: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Input error: {err}");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);

        if let Some(cmd) = parse_command(line) {
            match cmd {
                ChatCommand::Quit => {
                    println!("Goodbye!");
                    break;
                }
                ChatCommand::Clear => {
                    session.clear();
                    println!("Conversation cleared.");
                }
                ChatCommand::Help => {
                    for line in help_text().lines() {
                        println!("    {line}");
                    }
                }
                ChatCommand::Page(context) => {
                    println!("Now viewing {} ({}).", context.label, context.page);
                    session.set_context(Some(context));
                }
                ChatCommand::ClearPage => {
                    session.set_context(None);
                    println!("Page context cleared.");
                }
                ChatCommand::Set(key, value) => {
                    println!("{key} = {value}");
                    session.set_state_value(key, value);
                }
                ChatCommand::Unset(key) => match session.remove_state_value(&key) {
                    Some(_) => println!("{key} removed."),
                    None => println!("{key} was not set."),
                },
                ChatCommand::State => print_state(&session),
                ChatCommand::Invalid(message) => eprintln!("{message}"),
            }
            continue;
        }

        println!("Apex:");
        let interrupted = tokio::select! {
            _ = session.send(&client, line, print_chunk) => false,
            _ = tokio::signal::ctrl_c() => true,
        };
        println!();
        if interrupted {
            session.abandon();
            println!("(reply abandoned)");
        } else if let Some(err) = session.last_error() {
            eprintln!("Error: {err}");
        }
        println!();
    }

    Ok(())
}

fn print_chunk(chunk: &str) {
    print!("{chunk}");
    let _ = io::stdout().flush();
}

fn print_state(session: &ChatSession) {
    match session.context() {
        Some(context) => println!("    Page: {} ({})", context.label, context.page),
        None => println!("    Page: (none)"),
    }
    if session.state().is_empty() {
        println!("    State: (empty)");
    } else {
        println!("    State:");
        for (key, value) in session.state() {
            println!("      {key} = {value}");
        }
    }
    println!("    Turns: {}", session.history().len());
}
