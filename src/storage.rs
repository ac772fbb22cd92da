use std::path::{Path, PathBuf};
use tokio::io;

/// A temporary upload on disk, removed on every exit path: `remove` on the
/// main path, the Drop backstop when an error or panic unwinds the request
/// before removal.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    removed: bool,
}

impl TempUpload {
    pub async fn write(path: PathBuf, data: &[u8]) -> io::Result<Self> {
        tokio::fs::write(&path, data).await?;
        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn remove(mut self) {
        self.removed = true;
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            tracing::warn!(path = ?self.path, error = %e, "failed to delete uploaded file");
        }
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if !self.removed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!(path = ?self.path, error = %e, "failed to delete uploaded file on drop");
            }
        }
    }
}
