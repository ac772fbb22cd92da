use crate::config::UploadConfig;
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};
use tokio::{sync::broadcast::Receiver, task::JoinHandle, time::interval};

/// Maintenance pass over the upload directory. Per-request cleanup already
/// removes uploads on every exit path; the sweeper catches residue left by
/// crashes or kills.
pub struct CleanupSweeper {
    upload_dir: PathBuf,
    max_age: Duration,
    sweep_interval: Duration,
}

impl CleanupSweeper {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            max_age: Duration::from_secs(config.max_age_seconds),
            sweep_interval: Duration::from_secs(config.sweep_interval_seconds),
        }
    }

    pub fn start(self, mut shutdown_rx: Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = interval(self.sweep_interval);
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        match sweep(&self.upload_dir, self.max_age) {
                            Ok(removed) if removed > 0 => {
                                tracing::info!(removed, "cleaned up stale uploads");
                            }
                            Ok(_) => {}
                            Err(e) => {
                                tracing::error!(error = %e, dir = ?self.upload_dir, "upload sweep failed");
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Cleanup sweeper received shutdown signal");
                        break;
                    }
                }
            }
        })
    }
}

/// Remove every regular file in `dir` whose last-modified time is older than
/// `max_age`. Individual deletion failures are logged and skipped. Returns
/// the number of files removed.
pub fn sweep(dir: &Path, max_age: Duration) -> io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable directory entry during sweep");
                continue;
            }
        };

        let metadata = match entry.metadata() {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(path = ?entry.path(), error = %e, "failed to stat file during sweep");
                continue;
            }
        };

        // Files with an unreadable or future mtime count as age zero.
        let age = metadata
            .modified()
            .ok()
            .and_then(|mtime| now.duration_since(mtime).ok())
            .unwrap_or(Duration::ZERO);

        if age > max_age {
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(path = ?entry.path(), error = %e, "failed to delete stale upload");
                }
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn removes_stale_files_and_keeps_fresh_ones() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("stale.png");
        fs::write(&stale, b"old").unwrap();

        sleep(Duration::from_millis(1500));
        let fresh = dir.path().join("fresh.png");
        fs::write(&fresh, b"new").unwrap();

        let removed = sweep(dir.path(), Duration::from_secs(1)).unwrap();

        assert_eq!(removed, 1);
        assert!(!stale.exists());
        assert!(fresh.exists());
    }

    #[test]
    fn keeps_everything_under_the_threshold() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"a").unwrap();

        let removed = sweep(dir.path(), Duration::from_secs(3600)).unwrap();
        assert_eq!(removed, 0);
    }

    #[test]
    fn skips_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        sleep(Duration::from_millis(1100));
        let removed = sweep(dir.path(), Duration::from_secs(1)).unwrap();

        assert_eq!(removed, 0);
        assert!(dir.path().join("nested").exists());
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(sweep(Path::new("./no_such_dir"), Duration::from_secs(1)).is_err());
    }
}
