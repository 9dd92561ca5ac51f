use clap::Args;
use csvchat_core::QuotaStatus;
use csvchat_runtime::StorageContext;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct IdentityArgs {
    /// Caller identity (browser fingerprint).
    pub identity: String,
}

fn print_status(status: &QuotaStatus, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(status)?),
        OutputFormat::Text => {
            println!("Remaining: {}/{}", status.remaining, status.limit);
            println!("Resets:    {}", status.reset.to_rfc3339());
        }
    }
    Ok(())
}

pub async fn peek(
    ctx: &StorageContext,
    args: &IdentityArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let status = ctx.limiter.peek_remaining(&args.identity).await?;
    print_status(&status, format)
}

pub async fn consume(
    ctx: &StorageContext,
    args: &IdentityArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let status = ctx.limiter.consume(&args.identity).await?;
    print_status(&status, format)
}
