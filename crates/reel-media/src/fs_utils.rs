//! Filesystem helpers for artifact hand-off between stages.
//!
//! Artifacts are written to a sibling `.part` file first and moved into
//! place once complete, so a failed stage never leaves a truncated file at
//! the final path.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Sibling path used while an artifact is being written.
pub fn part_path(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("artifact"));
    name.push(".part");
    path.with_file_name(name)
}

/// Size of a regular file, or `None` if it does not exist.
pub async fn file_len(path: &Path) -> Option<u64> {
    fs::metadata(path)
        .await
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}

/// Fail unless `path` exists and holds at least one byte.
pub async fn ensure_non_empty(path: &Path) -> MediaResult<u64> {
    match file_len(path).await {
        None => Err(MediaError::FileNotFound(path.to_path_buf())),
        Some(0) => Err(MediaError::EmptyFile(path.to_path_buf())),
        Some(len) => Ok(len),
    }
}

/// Remove a file, treating "already gone" as success.
pub async fn remove_if_exists(path: &Path) -> MediaResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Write `bytes` to `path` through a `.part` file.
///
/// Empty payloads are rejected before touching the filesystem. On any
/// failure both the `.part` file and the target are removed.
pub async fn write_artifact(path: &Path, bytes: &[u8]) -> MediaResult<u64> {
    if bytes.is_empty() {
        return Err(MediaError::EmptyFile(path.to_path_buf()));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let tmp = part_path(path);
    let result = async {
        fs::write(&tmp, bytes).await?;
        move_file(&tmp, path).await?;
        ensure_non_empty(path).await
    }
    .await;

    if result.is_err() {
        let _ = remove_if_exists(&tmp).await;
        let _ = remove_if_exists(path).await;
    }

    result
}

/// Rename `src` over `dst`, creating the destination directory.
///
/// Callers only move sibling `.part` files, so both paths share a filesystem.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let dst = dst.as_ref();
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::rename(src.as_ref(), dst).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_part_path_keeps_extension() {
        assert_eq!(
            part_path(Path::new("out/images/001.png")),
            PathBuf::from("out/images/001.png.part")
        );
    }

    #[tokio::test]
    async fn test_write_artifact_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("images").join("001.png");

        let len = write_artifact(&path, b"png-bytes").await.unwrap();

        assert_eq!(len, 9);
        assert_eq!(fs::read(&path).await.unwrap(), b"png-bytes");
        assert!(!part_path(&path).exists());
    }

    #[tokio::test]
    async fn test_write_artifact_rejects_empty_payload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("001.png");

        let err = write_artifact(&path, b"").await.unwrap_err();

        assert!(matches!(err, MediaError::EmptyFile(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_write_artifact_overwrites_previous_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("001.png");
        fs::write(&path, b"old").await.unwrap();

        write_artifact(&path, b"new bytes").await.unwrap();

        assert_eq!(fs::read(&path).await.unwrap(), b"new bytes");
    }

    #[tokio::test]
    async fn test_ensure_non_empty() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.wav");
        fs::write(&empty, b"").await.unwrap();

        assert!(matches!(ensure_non_empty(&empty).await, Err(MediaError::EmptyFile(_))));
        assert!(matches!(
            ensure_non_empty(&dir.path().join("missing.wav")).await,
            Err(MediaError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_if_exists_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.mp4");
        fs::write(&path, b"x").await.unwrap();

        remove_if_exists(&path).await.unwrap();
        remove_if_exists(&path).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_move_file_overwrites_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("source.txt");
        let dst = dir.path().join("dest.txt");

        fs::write(&src, b"new content").await.unwrap();
        fs::write(&dst, b"old content").await.unwrap();

        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).await.unwrap(), "new content");
    }

    #[tokio::test]
    async fn test_move_file_creates_destination_dir() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("001.mp4.part");
        let dst = dir.path().join("videos").join("001.mp4");
        fs::write(&src, b"mp4").await.unwrap();

        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"mp4");
    }

    #[tokio::test]
    async fn test_move_file_missing_source_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = move_file(dir.path().join("absent.part"), dir.path().join("absent"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Io(_)));
    }
}
