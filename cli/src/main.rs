//! DRIP command-line tool — replays operation journals against an accrual ledger.

mod config;
mod error;
mod journal;

use clap::Parser;
use drip_accrual::{MintRecord, NoRecord};
use drip_utils::{format_duration, LogFormat};
use std::path::PathBuf;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "drip", about = "Lazy-accrual ledger tools")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "DRIP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "DRIP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "DRIP_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Replay a JSON journal and print the final ledger state as JSON.
    Replay {
        /// Journal file to replay.
        journal: PathBuf,

        /// Track cumulative minted totals per account.
        #[arg(long)]
        recording: bool,

        /// Issuer account (overrides the config file).
        #[arg(long, env = "DRIP_ISSUER")]
        issuer: Option<String>,

        /// Keep going after rejected entries instead of stopping.
        #[arg(long)]
        keep_going: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => CliConfig::from_toml_file(path)?,
        None => CliConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    drip_utils::init_logging(config.log_format, &config.log_level);
    if let Some(ref path) = cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    match cli.command {
        Command::Replay {
            journal,
            recording,
            issuer,
            keep_going,
        } => {
            if let Some(issuer) = issuer {
                config.issuer = issuer;
            }
            if keep_going {
                config.fail_fast = false;
            }

            let entries = journal::load_journal(&journal)?;
            let span = match (entries.first(), entries.last()) {
                (Some(first), Some(last)) => last.at - first.at,
                _ => 0,
            };
            tracing::info!(
                "Replaying {} entries spanning {} (issuer: {}, recording: {})",
                entries.len(),
                format_duration(span),
                config.issuer,
                recording,
            );

            let report = if recording {
                journal::replay::<MintRecord>(&entries, &config)?
            } else {
                journal::replay::<NoRecord>(&entries, &config)?
            };
            if !report.rejected.is_empty() {
                tracing::warn!("{} entries rejected", report.rejected.len());
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
