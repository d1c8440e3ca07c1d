//! agent-config
//!
//! Loads agent configuration from files, directories and flags, validates it
//! against the local environment and reports the result.

use agent_config::cli::{Cli, Command};
use agent_config::config::load;
use anyhow::Result;
use clap::Parser;
use std::fs::OpenOptions;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// `-v` picks the default level; `RUST_LOG` directives refine it.
fn log_filter(verbose: bool, env: Option<&str>) -> EnvFilter {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(env.unwrap_or_default())
}

fn init_logging(cli: &Cli) -> Result<()> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(cli.verbose, env.as_deref());

    match cli.log.as_str() {
        "0" | "off" => {}
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let command = cli.command.unwrap_or(Command::Validate);
    debug!("Running {:?}", command);

    let result = load(cli.load_opts())?;

    match command {
        Command::Validate => {
            for warning in &result.warnings {
                println!("Warning: {}", warning);
            }
            println!("Configuration is valid!");
        }
        Command::Show => {
            for warning in &result.warnings {
                eprintln!("Warning: {}", warning);
            }
            println!(
                "{}",
                serde_json::to_string_pretty(&result.runtime_config)?
            );
        }
    }

    Ok(())
}
