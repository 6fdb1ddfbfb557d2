//! Parley terminal shell.
//!
//! Reads lines from stdin and hands them to a conversation session. Lines
//! starting with `/` are shell commands; everything else is sent to the backend.

use std::sync::Arc;

use clap::Parser;
use parley_core::config::{parse_timeout, DEFAULT_API_BASE};
use parley_core::{
    AgentDirectory, AgentId, ClientConfig, ConversationSession, HttpTransport, Sender,
    SessionEvent,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser, Debug)]
#[command(name = "parley", about = "Chat with a multi-agent backend")]
struct Args {
    /// Backend base address
    #[arg(long, env = "PARLEY_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// `http` or `duplex`
    #[arg(long, env = "PARLEY_TRANSPORT", default_value = "http")]
    transport: String,

    /// `routed` or `legacy`
    #[arg(long, env = "PARLEY_ROUTE", default_value = "routed")]
    route: String,

    /// Request timeout in seconds (unbounded if unset)
    #[arg(long, env = "PARLEY_TIMEOUT_SECS")]
    timeout_secs: Option<String>,

    /// Pin this agent from the start
    #[arg(long)]
    agent: Option<String>,

    /// Send the session id along with pinned-agent requests
    #[arg(long)]
    share_conversation_id: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn client_config(&self) -> Result<ClientConfig, parley_core::ConfigError> {
        let mut config = ClientConfig::new(&self.api_base)?;
        config.transport = self.transport.parse()?;
        config.route_style = self.route.parse()?;
        config.request_timeout = self.timeout_secs.as_deref().map(parse_timeout).transpose()?;
        config.share_conversation_id = self.share_conversation_id;
        Ok(config)
    }
}

/// A line of user input.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Say(String),
    Agents,
    Pin(String),
    Auto,
    Status,
    Help,
    Quit,
}

fn parse_line(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(Command::Say(line.to_string()));
    };

    let mut parts = rest.split_whitespace();
    let command = match (parts.next(), parts.next()) {
        (Some("agents"), None) => Command::Agents,
        (Some("pin"), Some(agent)) => Command::Pin(agent.to_string()),
        (Some("auto"), None) => Command::Auto,
        (Some("status"), None) => Command::Status,
        (Some("quit" | "exit" | "bye"), None) => Command::Quit,
        _ => Command::Help,
    };
    Some(command)
}

const HELP: &str = "\
Commands:
  /agents        list healthy agents
  /pin <agent>   send every message to <agent>
  /auto          let the backend choose the agent
  /status        show the session status
  /quit          leave
Anything else is sent as a message.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = args.client_config()?;
    log::info!("Talking to {}", config.base_url());

    let directory = AgentDirectory::new(HttpTransport::new(Arc::new(config.clone()))?);
    let session = ConversationSession::start(config)?;
    if let Some(agent) = args.agent.as_deref() {
        session.set_routing_preference(Some(AgentId::from(agent)));
    }

    tokio::spawn(print_replies(Arc::clone(&session)));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match parse_line(&line) {
            None => {}
            Some(Command::Say(text)) => {
                let session = Arc::clone(&session);
                tokio::spawn(async move {
                    session.submit(&text).await;
                });
            }
            Some(Command::Agents) => {
                let agents = session.refresh_agents(&directory).await;
                if agents.is_empty() {
                    println!("No healthy agents ({})", session.status_label());
                }
                for agent in agents {
                    println!("  {:<20} {}", agent.id.as_str(), agent.label);
                }
            }
            Some(Command::Pin(agent)) => {
                if directory.find(&agent).is_none() {
                    log::warn!("{} is not in the last agent list", agent);
                }
                session.set_routing_preference(Some(AgentId::from(agent.as_str())));
            }
            Some(Command::Auto) => session.set_routing_preference(None),
            Some(Command::Status) => {
                println!(
                    "{} ({} in flight, routing: {})",
                    session.status_label(),
                    session.in_flight(),
                    session
                        .routing_preference()
                        .map(|a| a.to_string())
                        .unwrap_or_else(|| "auto".to_string())
                );
            }
            Some(Command::Help) => println!("{HELP}"),
            Some(Command::Quit) => break,
        }
    }

    session.dispose();
    Ok(())
}

/// Print agent messages and status changes as they happen.
async fn print_replies(session: Arc<ConversationSession>) {
    let mut events = session.subscribe();
    loop {
        match events.recv().await {
            Ok(SessionEvent::MessageAppended { message }) if message.sender() == Sender::Agent => {
                println!("Agent: {}", message.text());
            }
            Ok(SessionEvent::StatusChanged { label, .. }) => log::debug!("status: {}", label),
            Ok(_) => {}
            Err(RecvError::Lagged(count)) => {
                log::warn!("Missed {} session events", count);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{RouteStyle, TransportMode};

    mod parse_line {
        use super::*;

        #[test]
        fn blank_lines_are_skipped() {
            assert_eq!(parse_line(""), None);
            assert_eq!(parse_line("   "), None);
        }

        #[test]
        fn plain_text_is_a_message() {
            assert_eq!(
                parse_line("  fever and cough "),
                Some(Command::Say("fever and cough".to_string()))
            );
        }

        #[test]
        fn commands() {
            assert_eq!(parse_line("/agents"), Some(Command::Agents));
            assert_eq!(
                parse_line("/pin finance_agent"),
                Some(Command::Pin("finance_agent".to_string()))
            );
            assert_eq!(parse_line("/auto"), Some(Command::Auto));
            assert_eq!(parse_line("/bye"), Some(Command::Quit));
        }

        #[test]
        fn unknown_or_malformed_commands_show_help() {
            assert_eq!(parse_line("/pin"), Some(Command::Help));
            assert_eq!(parse_line("/dance now"), Some(Command::Help));
        }
    }

    mod args {
        use super::*;

        #[test]
        fn flags_build_config() {
            let args = Args::parse_from([
                "parley",
                "--api-base",
                "http://backend:5000",
                "--transport",
                "duplex",
                "--route",
                "legacy",
                "--timeout-secs",
                "15",
            ]);
            let config = args.client_config().unwrap();

            assert_eq!(config.transport, TransportMode::Duplex);
            assert_eq!(config.route_style, RouteStyle::LegacyTool);
            assert_eq!(config.ws_url(), "ws://backend:5000/ws");
            assert_eq!(
                config.request_timeout,
                Some(std::time::Duration::from_secs(15))
            );
        }

        #[test]
        fn bad_transport_is_rejected() {
            let args = Args::parse_from(["parley", "--transport", "smoke-signals"]);
            assert!(args.client_config().is_err());
        }
    }
}
