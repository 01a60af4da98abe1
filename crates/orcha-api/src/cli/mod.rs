//! CLI command definitions for the `orcha` binary.

pub mod run;
pub mod validate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use orcha_types::orchestration::EventResponse;

/// Run staged workflow specifications.
#[derive(Parser)]
#[command(name = "orcha", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Engine config file (default: $ORCHA_CONFIG or ~/.orcha/config.toml).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a specification to completion on an in-process engine.
    Run {
        /// Specification file (.json, .yaml or .yml).
        file: PathBuf,

        /// Deliver an external event once the run starts (repeatable).
        #[arg(long = "event", value_name = "NAME=Continue|Cancel", value_parser = parse_event_arg)]
        events: Vec<(String, EventResponse)>,
    },

    /// Parse and validate a specification without running it.
    Validate {
        /// Specification file (.json, .yaml or .yml).
        file: PathBuf,
    },

    /// Start the REST API server.
    Serve {
        /// Port to listen on (overrides config).
        #[arg(long)]
        port: Option<u16>,

        /// Host to bind to (overrides config).
        #[arg(long)]
        host: Option<String>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Parse `NAME=Continue` / `NAME=Cancel`.
fn parse_event_arg(raw: &str) -> Result<(String, EventResponse), String> {
    let (name, payload) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=Continue|Cancel, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("event name must not be empty".to_string());
    }
    let response = payload.trim().parse::<EventResponse>()?;
    Ok((name.to_string(), response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_arg() {
        assert_eq!(
            parse_event_arg("Approve=Cancel").unwrap(),
            ("Approve".to_string(), EventResponse::Cancel)
        );
        assert_eq!(
            parse_event_arg(" Approve = continue ").unwrap(),
            ("Approve".to_string(), EventResponse::Continue)
        );
        assert!(parse_event_arg("Approve").is_err());
        assert!(parse_event_arg("=Continue").is_err());
        assert!(parse_event_arg("Approve=Maybe").is_err());
    }

    #[test]
    fn test_cli_parses_run_with_events() {
        let cli = Cli::try_parse_from([
            "orcha", "run", "spec.json", "--event", "A=Continue", "--event", "B=Cancel", "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Run { file, events } => {
                assert_eq!(file, PathBuf::from("spec.json"));
                assert_eq!(events.len(), 2);
                assert_eq!(events[1], ("B".to_string(), EventResponse::Cancel));
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }
}
