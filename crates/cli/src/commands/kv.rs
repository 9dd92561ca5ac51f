use clap::{Args, Subcommand};
use csvchat_runtime::StorageContext;
use csvchat_state::StateKey;

#[derive(Args, Debug)]
pub struct KvArgs {
    #[command(subcommand)]
    pub command: KvCommand,
}

#[derive(Subcommand, Debug)]
pub enum KvCommand {
    /// Print the value stored under a key.
    Get {
        /// Key, e.g. `chat:<id>` or `limit:<identity>`.
        key: String,
    },
    /// Store a value (string or @file path).
    Set { key: String, value: String },
    /// Delete a key.
    Del { key: String },
}

fn read_value(input: &str) -> anyhow::Result<String> {
    match input.strip_prefix('@') {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => Ok(input.to_owned()),
    }
}

pub async fn run(ctx: &StorageContext, args: &KvArgs) -> anyhow::Result<()> {
    match &args.command {
        KvCommand::Get { key } => match ctx.kv.get(&StateKey::parse(key)).await? {
            Some(value) => println!("{value}"),
            None => anyhow::bail!("key not found: {key}"),
        },
        KvCommand::Set { key, value } => {
            ctx.kv.set(&StateKey::parse(key), &read_value(value)?).await?;
            println!("stored {key}");
        }
        KvCommand::Del { key } => {
            ctx.kv.delete(&StateKey::parse(key)).await?;
            println!("deleted {key}");
        }
    }
    Ok(())
}
