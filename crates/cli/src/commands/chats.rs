use csvchat_core::Namespace;
use csvchat_runtime::StorageContext;
use csvchat_state_fs::FsKeyValueStore;
use tracing::warn;

use crate::OutputFormat;

pub async fn run(ctx: &StorageContext, format: &OutputFormat) -> anyhow::Result<()> {
    if ctx.kv.backend() != "fs" {
        warn!(backend = ctx.kv.backend(), "listing covers the local data directory only");
    }
    let store = FsKeyValueStore::new(ctx.layout.clone());
    let keys = store.keys(Namespace::Chat).await?;

    match format {
        OutputFormat::Json => {
            let ids: Vec<&str> = keys.iter().map(|k| k.id.as_str()).collect();
            println!("{}", serde_json::to_string_pretty(&ids)?);
        }
        OutputFormat::Text => {
            println!("{} chat records:", keys.len());
            for key in &keys {
                println!("  {}", key.id);
            }
        }
    }
    Ok(())
}
