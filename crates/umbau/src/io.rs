//! File I/O utilities.
//!
//! Path validation, directory traversal for batch conversion, and the
//! temp-write/rename publish step every backend uses so a failed attempt
//! never leaves a partial file at the final destination.

use crate::{Result, UmbauError};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Validate that a file exists.
pub fn validate_file_exists(path: impl AsRef<Path>) -> Result<()> {
    if !path.as_ref().is_file() {
        return Err(UmbauError::validation(format!(
            "File does not exist: {}",
            path.as_ref().display()
        )));
    }
    Ok(())
}

/// Recursively collect files under `dir` matching `filter`.
///
/// Results are sorted so batch runs visit files in a stable order.
pub fn traverse_directory<F>(dir: impl AsRef<Path>, filter: F) -> Result<Vec<PathBuf>>
where
    F: Fn(&Path) -> bool,
{
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(UmbauError::validation(format!(
            "Path is not a directory: {}",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    traverse_directory_impl(dir, &filter, &mut files)?;
    files.sort();
    Ok(files)
}

fn traverse_directory_impl<F>(dir: &Path, filter: &F, files: &mut Vec<PathBuf>) -> Result<()>
where
    F: Fn(&Path) -> bool,
{
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            if filter(&path) {
                files.push(path);
            }
        } else if path.is_dir() {
            traverse_directory_impl(&path, filter, files)?;
        }
    }
    Ok(())
}

/// Lower-cased extension of a path, without the dot.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase())
}

/// Atomically publish `bytes` as `dest_dir/file_name`.
///
/// Writes to a uuid-suffixed sibling first and renames into place; rename
/// within one directory is atomic on POSIX filesystems.
pub async fn publish_bytes(dest_dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dest_dir).await?;
    let final_path = dest_dir.join(file_name);
    let tmp_path = dest_dir.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    if let Err(e) = fs::write(&tmp_path, bytes).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp_path, &final_path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }
    Ok(final_path)
}

/// Atomically publish an existing file (e.g. a tool's scratch output) as
/// `dest_dir/file_name`. Falls back to copy + rename when the scratch file
/// lives on another filesystem.
pub async fn publish_file(scratch: &Path, dest_dir: &Path, file_name: &str) -> Result<PathBuf> {
    fs::create_dir_all(dest_dir).await?;
    let final_path = dest_dir.join(file_name);

    if fs::rename(scratch, &final_path).await.is_ok() {
        return Ok(final_path);
    }

    // Cross-device rename fails with EXDEV; stage a copy next to the target.
    let tmp_path = dest_dir.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));
    if let Err(e) = fs::copy(scratch, &tmp_path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp_path, &final_path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }
    let _ = fs::remove_file(scratch).await;
    Ok(final_path)
}

/// RAII guard for a scratch directory, removed on drop on every exit path.
pub(crate) struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create a uniquely named scratch directory under the system temp dir.
    pub async fn new(prefix: &str) -> Result<Self> {
        let path = std::env::temp_dir().join(format!("{}_{}", prefix, uuid::Uuid::new_v4()));
        fs::create_dir_all(&path).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_validate_file_exists() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.doc");
        File::create(&file_path).unwrap();

        assert!(validate_file_exists(&file_path).is_ok());
        assert!(validate_file_exists(dir.path().join("missing.doc")).is_err());
        assert!(validate_file_exists(dir.path()).is_err());
    }

    #[test]
    fn test_traverse_directory_recursive_sorted() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("b.doc")).unwrap();
        File::create(dir.path().join("a.xls")).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        File::create(dir.path().join("sub").join("c.mht")).unwrap();
        File::create(dir.path().join("skip.png")).unwrap();

        let files = traverse_directory(dir.path(), |p| {
            extension_of(p).is_some_and(|e| e != "png")
        })
        .unwrap();

        assert_eq!(files.len(), 3);
        assert!(files.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_traverse_directory_rejects_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.doc");
        File::create(&file_path).unwrap();
        assert!(traverse_directory(&file_path, |_| true).is_err());
    }

    #[tokio::test]
    async fn test_publish_bytes_atomic() {
        let dir = tempdir().unwrap();
        let path = publish_bytes(dir.path(), "out.html", b"<html></html>").await.unwrap();
        assert_eq!(path, dir.path().join("out.html"));
        assert_eq!(std::fs::read(&path).unwrap(), b"<html></html>");

        // No temp debris left behind.
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_publish_file_moves_scratch_output() {
        let scratch = tempdir().unwrap();
        let dest = tempdir().unwrap();
        let scratch_file = scratch.path().join("report.pdf");
        std::fs::write(&scratch_file, b"%PDF-1.7").unwrap();

        let path = publish_file(&scratch_file, dest.path(), "report.pdf").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_scratch_dir_cleanup_on_drop() {
        let path = {
            let scratch = ScratchDir::new("umbau_test").await.unwrap();
            assert!(scratch.path().is_dir());
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
