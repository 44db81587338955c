//! Filesystem existence probing.
//!
//! # Responsibilities
//! - Report whether a path names a regular file, a directory, or nothing
//! - Keep "does not exist" distinct from every other I/O failure
//!
//! # Design Decisions
//! - "Does not exist" is an expected outcome (the dispatcher falls through
//!   to the upstream); permission errors, ENOTDIR and friends propagate and
//!   fail the request instead of silently rerouting it

use std::io;
use std::path::Path;

/// What a path resolves to on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    RegularFile,
    Directory,
    Missing,
}

/// Stat a path and classify the result.
///
/// `ErrorKind::NotFound` maps to [`PathKind::Missing`]; any other error is
/// returned to the caller. Symlinks are followed, and anything that exists
/// but is not a directory counts as a regular file.
pub async fn classify(path: &Path) -> io::Result<PathKind> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => {
            if meta.is_dir() {
                Ok(PathKind::Directory)
            } else {
                Ok(PathKind::RegularFile)
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(PathKind::Missing),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn classifies_files_and_directories() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("hello.txt");
        std::fs::write(&file, "hi").unwrap();

        assert_eq!(classify(&file).await.unwrap(), PathKind::RegularFile);
        assert_eq!(classify(root.path()).await.unwrap(), PathKind::Directory);
    }

    #[tokio::test]
    async fn missing_path_is_not_an_error() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("nope");
        assert_eq!(classify(&missing).await.unwrap(), PathKind::Missing);
    }

    #[tokio::test]
    async fn traversing_through_a_file_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("blob");
        std::fs::write(&file, "data").unwrap();

        // stat("blob/nested") fails with ENOTDIR, which must not be
        // mistaken for "does not exist"
        let err = classify(&file.join("nested")).await.unwrap_err();
        assert_ne!(err.kind(), io::ErrorKind::NotFound);
    }
}
