use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, warn};

use csvchat_core::layout::VALUE_EXTENSION;
use csvchat_core::{DataLayout, RetentionPolicy};

use crate::report::SweepReport;

/// Which entries of a directory a sweep considers.
#[derive(Debug, Clone, Copy)]
enum Filter {
    ValueFiles,
    AllFiles,
}

/// Deletes chat records and uploads that are past retention.
///
/// A file is removed when its modification time is strictly older than
/// `now - retention`. Per-entry failures are logged and counted; a sweep
/// itself never fails.
#[derive(Debug, Clone)]
pub struct ExpirySweeper {
    layout: DataLayout,
    retention: RetentionPolicy,
}

impl ExpirySweeper {
    pub fn new(layout: DataLayout, retention: RetentionPolicy) -> Self {
        Self { layout, retention }
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    pub async fn sweep_chats(&self) -> SweepReport {
        self.sweep_chats_at(Utc::now()).await
    }

    pub async fn sweep_uploads(&self) -> SweepReport {
        self.sweep_uploads_at(Utc::now()).await
    }

    /// Remove `chats/*.json` files older than the chat retention.
    pub async fn sweep_chats_at(&self, now: DateTime<Utc>) -> SweepReport {
        let report = sweep_dir(
            &self.layout.chats_dir(),
            now - self.retention.chats,
            Filter::ValueFiles,
        )
        .await;
        if !report.is_empty() {
            info!(%report, "chat sweep complete");
        }
        report
    }

    /// Remove files in `uploads/` older than the upload retention.
    pub async fn sweep_uploads_at(&self, now: DateTime<Utc>) -> SweepReport {
        let report = sweep_dir(
            &self.layout.uploads_dir(),
            now - self.retention.uploads,
            Filter::AllFiles,
        )
        .await;
        if !report.is_empty() {
            info!(%report, "upload sweep complete");
        }
        report
    }

    /// Sweep both directories every `period` until `shutdown_rx` fires or
    /// its sender is dropped. The first sweep runs immediately.
    pub async fn run(&self, period: StdDuration, mut shutdown_rx: mpsc::Receiver<()>) {
        info!(period_secs = period.as_secs(), "expiry sweeper starting");
        let mut ticker = interval(period);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("expiry sweeper received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    let mut total = self.sweep_chats().await;
                    total += self.sweep_uploads().await;
                    debug!(%total, "sweep cycle done");
                }
            }
        }
    }
}

async fn sweep_dir(dir: &Path, cutoff: DateTime<Utc>, filter: Filter) -> SweepReport {
    let mut report = SweepReport::default();

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return report,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot list directory for sweep");
            report.failed += 1;
            return report;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "directory listing interrupted");
                report.failed += 1;
                break;
            }
        };
        let path = entry.path();

        if matches!(filter, Filter::ValueFiles)
            && path.extension().and_then(|e| e.to_str()) != Some(VALUE_EXTENSION)
        {
            continue;
        }

        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot stat entry");
                report.failed += 1;
                continue;
            }
        };
        if !meta.is_file() {
            continue;
        }
        report.scanned += 1;

        let modified = match meta.modified() {
            Ok(at) => DateTime::<Utc>::from(at),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "entry has no modification time");
                report.failed += 1;
                continue;
            }
        };
        if modified >= cutoff {
            continue;
        }

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), %modified, "expired entry removed");
                report.removed += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot remove expired entry");
                report.failed += 1;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::Duration;

    use super::*;

    fn setup() -> (ExpirySweeper, DataLayout, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        std::fs::create_dir_all(layout.chats_dir()).unwrap();
        std::fs::create_dir_all(layout.uploads_dir()).unwrap();
        let sweeper = ExpirySweeper::new(layout.clone(), RetentionPolicy::default());
        (sweeper, layout, dir)
    }

    fn touch(path: PathBuf) -> DateTime<Utc> {
        std::fs::write(&path, b"{}").unwrap();
        DateTime::<Utc>::from(std::fs::metadata(&path).unwrap().modified().unwrap())
    }

    #[tokio::test]
    async fn chat_retention_boundary() {
        let (sweeper, layout, _dir) = setup();
        let path = layout.chats_dir().join("c1.json");
        let mtime = touch(path.clone());

        let report = sweeper
            .sweep_chats_at(mtime + Duration::days(7) - Duration::seconds(1))
            .await;
        assert_eq!(report, SweepReport { scanned: 1, removed: 0, failed: 0 });
        assert!(path.exists());

        let report = sweeper.sweep_chats_at(mtime + Duration::days(7)).await;
        assert_eq!(report.removed, 0, "exactly at retention is kept");

        let report = sweeper
            .sweep_chats_at(mtime + Duration::days(7) + Duration::seconds(1))
            .await;
        assert_eq!(report, SweepReport { scanned: 1, removed: 1, failed: 0 });
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn chat_sweep_ignores_other_files() {
        let (sweeper, layout, _dir) = setup();
        let keep = layout.chats_dir().join("notes.txt");
        let mtime = touch(keep.clone());
        std::fs::create_dir(layout.chats_dir().join("nested.json")).unwrap();

        let report = sweeper.sweep_chats_at(mtime + Duration::days(30)).await;
        assert_eq!(report, SweepReport::default());
        assert!(keep.exists());
    }

    #[tokio::test]
    async fn upload_retention_boundary() {
        let (sweeper, layout, _dir) = setup();
        let csv = layout.uploads_dir().join("a.csv");
        let bare = layout.uploads_dir().join("noext");
        let mtime = touch(csv.clone());
        touch(bare.clone());

        let report = sweeper
            .sweep_uploads_at(mtime + Duration::hours(24) - Duration::seconds(1))
            .await;
        assert_eq!(report.removed, 0);

        let report = sweeper
            .sweep_uploads_at(mtime + Duration::hours(24) + Duration::seconds(5))
            .await;
        assert_eq!(report.scanned, 2);
        assert_eq!(report.removed, 2);
        assert!(!csv.exists());
        assert!(!bare.exists());
    }

    #[tokio::test]
    async fn recent_chats_survive_upload_window() {
        let (sweeper, layout, _dir) = setup();
        let path = layout.chats_dir().join("c2.json");
        let mtime = touch(path.clone());

        let report = sweeper.sweep_chats_at(mtime + Duration::days(2)).await;
        assert_eq!(report.removed, 0);
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_entry_does_not_stop_sweep() {
        let (sweeper, layout, _dir) = setup();
        let looped = layout.chats_dir().join("loop.json");
        std::os::unix::fs::symlink(&looped, &looped).unwrap();
        let old = layout.chats_dir().join("old.json");
        let mtime = touch(old.clone());

        let report = sweeper.sweep_chats_at(mtime + Duration::days(8)).await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.removed, 1);
        assert!(!old.exists());
        assert!(std::fs::symlink_metadata(&looped).is_ok());
    }

    #[tokio::test]
    async fn missing_directories_yield_empty_reports() {
        let dir = tempfile::tempdir().unwrap();
        let sweeper = ExpirySweeper::new(
            DataLayout::new(dir.path().join("absent")),
            RetentionPolicy::default(),
        );
        assert_eq!(sweeper.sweep_chats().await, SweepReport::default());
        assert_eq!(sweeper.sweep_uploads().await, SweepReport::default());
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let (sweeper, layout, _dir) = setup();
        let path = layout.uploads_dir().join("old.csv");
        std::fs::write(&path, b"x").unwrap();
        let sweeper = ExpirySweeper::new(
            layout,
            RetentionPolicy {
                chats: Duration::days(7),
                uploads: Duration::seconds(-1),
            },
        );

        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move { sweeper.run(StdDuration::from_secs(3600), rx).await });
        tokio::time::sleep(StdDuration::from_millis(200)).await;
        tx.send(()).await.unwrap();
        handle.await.unwrap();

        assert!(!path.exists(), "first tick sweeps immediately");
    }
}
