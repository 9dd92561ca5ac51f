use std::io::Write;
use std::path::PathBuf;

use bytes::Bytes;
use clap::Args;
use csvchat_blob::{UploadPolicy, serve};
use csvchat_runtime::StorageContext;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// File to upload.
    pub path: PathBuf,
    /// Name to record instead of the file name.
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Key returned by `upload`.
    pub key: String,
    /// Write the file here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Print the response headers to stderr.
    #[arg(long)]
    pub headers: bool,
}

pub async fn upload(
    ctx: &StorageContext,
    args: &UploadArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let name = match &args.name {
        Some(name) => name.clone(),
        None => args
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_owned(),
    };
    let content = tokio::fs::read(&args.path).await?;
    UploadPolicy::default().check(&name, None, content.len() as u64)?;

    let blob = ctx.blobs.upload(Bytes::from(content), &name).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&blob)?),
        OutputFormat::Text => {
            println!("Key:     {}", blob.key);
            println!("Locator: {}", blob.locator);
            println!("Size:    {} bytes", blob.size);
        }
    }
    Ok(())
}

pub async fn fetch(ctx: &StorageContext, args: &FetchArgs) -> anyhow::Result<()> {
    let Some(served) = serve::prepare(ctx.blobs.as_ref(), &args.key).await? else {
        anyhow::bail!("file not found: {}", args.key);
    };

    if args.headers {
        for (name, value) in &served.headers {
            eprintln!("{name}: {value}");
        }
    }
    match &args.output {
        Some(path) => tokio::fs::write(path, &served.body).await?,
        None => std::io::stdout().write_all(&served.body)?,
    }
    Ok(())
}
