use std::time::Duration;

use clap::Args;
use csvchat_runtime::StorageContext;
use tokio::sync::mpsc;
use tracing::info;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Only sweep chat records.
    #[arg(long, conflicts_with = "uploads")]
    pub chats: bool,
    /// Only sweep uploaded files.
    #[arg(long)]
    pub uploads: bool,
    /// Keep running, sweeping both directories every N seconds.
    #[arg(long, value_name = "SECS", conflicts_with_all = ["chats", "uploads"])]
    pub interval: Option<u64>,
}

pub async fn run(
    ctx: &StorageContext,
    args: &SweepArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    if let Some(secs) = args.interval {
        anyhow::ensure!(secs > 0, "--interval must be at least 1 second");
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, stopping sweeper");
                let _ = shutdown_tx.send(()).await;
            }
        });
        ctx.sweeper.run(Duration::from_secs(secs), shutdown_rx).await;
        return Ok(());
    }

    let chat_report = if args.uploads {
        None
    } else {
        Some(ctx.sweeper.sweep_chats().await)
    };
    let upload_report = if args.chats {
        None
    } else {
        Some(ctx.sweeper.sweep_uploads().await)
    };

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "chats": chat_report,
                "uploads": upload_report,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            if let Some(report) = chat_report {
                println!("chats:   {report}");
            }
            if let Some(report) = upload_report {
                println!("uploads: {report}");
            }
        }
    }
    Ok(())
}
