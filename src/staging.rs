//! Staging area for files arriving from a share

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

/// Allocates local paths for incoming files under one directory.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl Default for StagingArea {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir().join("skylight"),
        }
    }
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Claim a fresh path for a remote name.
    ///
    /// Path separators in the name are flattened to underscores, the
    /// staging directory is created on first use, and a taken name falls
    /// back to a uuid-suffixed variant. The file is created empty as
    /// part of the claim. An empty name cannot be staged.
    pub async fn allocate(&self, remote_name: &str) -> io::Result<PathBuf> {
        let name = sanitize(remote_name);
        if name.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty remote name",
            ));
        }

        fs::create_dir_all(&self.dir).await?;

        let candidate = self.dir.join(&name);
        match claim(&candidate).await {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e),
        }

        let fallback = self.dir.join(unique_variant(&name));
        claim(&fallback).await?;
        Ok(fallback)
    }
}

/// Create the file with create-new semantics so two allocations can
/// never claim the same path.
async fn claim(path: &Path) -> io::Result<()> {
    fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)
        .await
        .map(|_| ())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

fn unique_variant(name: &str) -> String {
    let path = Path::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
    let id = Uuid::new_v4();
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}-{id}.{ext}"),
        None => format!("{stem}-{id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allocate_creates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path());

        let path = staging.allocate("movie.mp4").await.unwrap();
        assert_eq!(path, dir.path().join("movie.mp4"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_second_allocation_gets_a_distinct_path() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path());

        let first = staging.allocate("movie.mp4").await.unwrap();
        let second = staging.allocate("movie.mp4").await.unwrap();

        assert_ne!(first, second);
        assert!(second.exists());
        assert_eq!(second.extension().unwrap(), "mp4");
        assert!(
            second
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("movie-")
        );
    }

    #[tokio::test]
    async fn test_path_separators_are_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path());

        let path = staging.allocate("clips/day one\\take2.mov").await.unwrap();
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            "clips_day one_take2.mov"
        );
        assert_eq!(path.parent().unwrap(), dir.path());
    }

    #[tokio::test]
    async fn test_empty_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path());

        let err = staging.allocate("").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_missing_staging_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deep").join("stage");
        let staging = StagingArea::new(&nested);

        let path = staging.allocate("notes.txt").await.unwrap();
        assert!(path.starts_with(&nested));
        assert!(path.exists());
    }

    #[test]
    fn test_default_dir_is_under_system_temp() {
        let staging = StagingArea::default();
        assert!(staging.dir().starts_with(std::env::temp_dir()));
        assert!(staging.dir().ends_with("skylight"));
    }

    #[test]
    fn test_variant_without_extension_keeps_the_stem() {
        let variant = unique_variant("README");
        assert!(variant.starts_with("README-"));
        assert!(!variant.contains('.'));
    }
}
