//! Chat command handler.
//!
//! A line-based loop over one [`Session`]. Lines starting with `/` are
//! session commands; everything else is a question.

use super::{render_outcome, RenderOptions};
use clap::Args;
use cityq_core::{config::AppConfig, AppResult};
use cityq_router::{ConfiguredFactory, Role, Session};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "Commands: /reset (forget the conversation), /history, /quit";

/// Interactive conversation
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Print the SQL behind structured answers
    #[arg(long)]
    pub show_query: bool,

    /// Print the passages behind semantic answers
    #[arg(long)]
    pub show_sources: bool,
}

/// One parsed input line.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Reset,
    History,
    Quit,
    Help,
    Unknown(&'a str),
    Question(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    match line {
        "" => Input::Empty,
        "/reset" => Input::Reset,
        "/history" => Input::History,
        "/quit" | "/exit" => Input::Quit,
        "/help" => Input::Help,
        command if command.starts_with('/') => Input::Unknown(command),
        question => Input::Question(question),
    }
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let factory = Arc::new(ConfiguredFactory::new(config.clone()));
        let mut session = Session::start(factory).await?;
        let options = RenderOptions {
            show_query: self.show_query,
            show_sources: self.show_sources,
        };

        println!("Ask about New York City, Los Angeles, Chicago, Houston, Miami or Seattle.");
        println!("{}", HELP);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match parse_input(&line) {
                Input::Empty => continue,
                Input::Quit => break,
                Input::Help => println!("{}", HELP),
                Input::Unknown(command) => println!("Unknown command {}. {}", command, HELP),
                Input::History => {
                    if session.history().is_empty() {
                        println!("(no history)");
                    }
                    for turn in session.history() {
                        let who = match turn.role {
                            Role::User => "you",
                            Role::Assistant => "cityq",
                        };
                        println!("[{}] {}: {}", turn.at.format("%H:%M:%S"), who, turn.content);
                    }
                }
                Input::Reset => match session.reset().await {
                    Ok(()) => println!("Conversation reset."),
                    Err(e) => println!("Error: {}", e),
                },
                Input::Question(question) => match session.ask(question).await {
                    Ok(routed) => {
                        tracing::debug!("Answered by {}", routed.decision.tool_name);
                        println!("{}", render_outcome(&routed.outcome, options));
                    }
                    Err(e) => println!("Error: {}", e),
                },
            }
        }

        tracing::info!(session = %session.id(), turns = session.history().len(), "Chat ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_commands() {
        assert_eq!(parse_input("/reset"), Input::Reset);
        assert_eq!(parse_input("  /history "), Input::History);
        assert_eq!(parse_input("/quit"), Input::Quit);
        assert_eq!(parse_input("/exit"), Input::Quit);
        assert_eq!(parse_input("/nope"), Input::Unknown("/nope"));
    }

    #[test]
    fn test_parse_questions_and_blank_lines() {
        assert_eq!(parse_input("   "), Input::Empty);
        assert_eq!(
            parse_input(" What is the population of Miami? "),
            Input::Question("What is the population of Miami?")
        );
    }
}
