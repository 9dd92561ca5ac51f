//! csvchat CLI
//!
//! Operations tool for the storage behind csvchat: expiry sweeps, quota
//! inspection, uploaded files and raw key-value access.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use csvchat_runtime::{StorageConfig, StorageContext};
use tracing_subscriber::{EnvFilter, fmt};

/// csvchat storage operations.
#[derive(Parser, Debug)]
#[command(name = "csvchat", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "CSVCHAT_CONFIG", default_value = "csvchat.toml", global = true)]
    config: PathBuf,

    /// Data directory, overriding the configuration.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Delete chat records and uploads past retention.
    Sweep(commands::sweep::SweepArgs),
    /// Show the remaining message quota of a caller.
    Quota(commands::quota::IdentityArgs),
    /// Consume one message from a caller's quota.
    Consume(commands::quota::IdentityArgs),
    /// Upload a CSV file.
    Upload(commands::files::UploadArgs),
    /// Fetch an uploaded CSV file.
    Fetch(commands::files::FetchArgs),
    /// Read and write raw key-value entries.
    Kv(commands::kv::KvArgs),
    /// List stored chat records.
    Chats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = StorageConfig::load(Some(cli.config.as_path()))?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir.clone_from(dir);
    }
    let ctx = StorageContext::from_config(&config);

    match cli.command {
        Command::Sweep(args) => commands::sweep::run(&ctx, &args, &cli.format).await,
        Command::Quota(args) => commands::quota::peek(&ctx, &args, &cli.format).await,
        Command::Consume(args) => commands::quota::consume(&ctx, &args, &cli.format).await,
        Command::Upload(args) => commands::files::upload(&ctx, &args, &cli.format).await,
        Command::Fetch(args) => commands::files::fetch(&ctx, &args).await,
        Command::Kv(args) => commands::kv::run(&ctx, &args).await,
        Command::Chats => commands::chats::run(&ctx, &cli.format).await,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn interval_excludes_selection() {
        let res = Cli::try_parse_from(["csvchat", "sweep", "--chats", "--interval", "60"]);
        assert!(res.is_err());
        let res = Cli::try_parse_from(["csvchat", "sweep", "--interval", "60"]);
        assert!(res.is_ok());
    }
}
