use crate::Result;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tokio::fs::ReadDir;
use uuid::Uuid;

/// Write a file.
pub(crate) async fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
    let path = path.as_ref();
    tokio::fs::write(path, contents)
        .await
        .context(format!("Unable to write to {}", path.to_string_lossy()))
}

/// Read a file to a `String`.
pub(crate) async fn read(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file at {}", path.display()))
}

/// Create a directory and any missing parents.
pub(crate) async fn make_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .with_context(|| format!("Unable to create directory at {}", path.to_string_lossy()))
}

pub(crate) async fn canonicalize(path: &Path) -> Result<PathBuf> {
    tokio::fs::canonicalize(path).await.with_context(|| {
        format!(
            "Unable to canonicalize the path {}",
            path.to_string_lossy()
        )
    })
}

pub(crate) async fn read_dir(path: &Path) -> Result<ReadDir> {
    tokio::fs::read_dir(path)
        .await
        .with_context(|| format!("Unable to read directory {}", path.display()))
}

pub(crate) async fn copy(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
    let (from, to) = (from.as_ref(), to.as_ref());
    tokio::fs::copy(from, to).await.with_context(|| {
        format!(
            "Unable to copy file from '{}' to '{}'",
            from.display(),
            to.display()
        )
    })?;
    Ok(())
}

pub(crate) async fn remove(path: &Path) -> Result<()> {
    tokio::fs::remove_file(path)
        .await
        .with_context(|| format!("Unable to remove file {}", path.display()))
}

/// Generates an id for a leave entry, e.g. `leave-3f2b0c4e9a1d4b7c8e6f5a4b3c2d1e0f`.
pub(crate) fn generate_leave_id() -> String {
    format!("leave-{}", Uuid::new_v4().simple())
}

/// Generates an id for a user who was not given one by an identity provider.
pub(crate) fn generate_user_id() -> String {
    format!("local-{}", Uuid::new_v4().simple())
}
