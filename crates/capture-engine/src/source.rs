//! Media sources: user-selected video files registered under a locator.
//!
//! The registry plays the role of an object-URL table. Every registered
//! source stays alive until it is revoked, so whoever replaces or tears down
//! a session must revoke the source it held.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use snapper_common::error::{SnapperError, SnapperResult};

/// Identity of a registered source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "media-source:{}", self.0)
    }
}

/// A video file wrapped as a playable source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    pub id: SourceId,
    /// Absolute path of the file.
    pub path: PathBuf,
    /// File size at registration time.
    pub size_bytes: u64,
}

impl MediaSource {
    /// Locator string, e.g. `media-source:4`.
    pub fn locator(&self) -> String {
        self.id.to_string()
    }
}

/// Table of live sources.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    next_id: u64,
    live: HashMap<SourceId, MediaSource>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file. Fails if the path does not name a readable file;
    /// whether its contents decode is left to the surface loader.
    pub fn create(&mut self, path: &Path) -> SnapperResult<MediaSource> {
        let path = std::fs::canonicalize(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SnapperError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => SnapperError::Io(e),
        })?;
        let meta = std::fs::metadata(&path)?;
        if !meta.is_file() {
            return Err(SnapperError::load(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        self.next_id += 1;
        let source = MediaSource {
            id: SourceId(self.next_id),
            path,
            size_bytes: meta.len(),
        };
        tracing::debug!(
            locator = %source.id,
            path = %source.path.display(),
            size_bytes = source.size_bytes,
            "Registered media source"
        );
        self.live.insert(source.id, source.clone());
        Ok(source)
    }

    /// Release a source. Returns whether it was still registered.
    pub fn revoke(&mut self, id: SourceId) -> bool {
        let removed = self.live.remove(&id).is_some();
        if removed {
            tracing::debug!(locator = %id, "Revoked media source");
        }
        removed
    }

    /// Number of sources not yet revoked.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Revoke everything, returning how many sources were released.
    pub fn revoke_all(&mut self) -> usize {
        let count = self.live.len();
        self.live.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("snapper_test_sources");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, b"not really a video").unwrap();
        path
    }

    #[test]
    fn test_create_and_revoke() {
        let path = scratch_file("a.mp4");
        let mut registry = SourceRegistry::new();

        let first = registry.create(&path).unwrap();
        let second = registry.create(&path).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(first.size_bytes, 18);
        assert_eq!(registry.live_count(), 2);
        assert!(first.locator().starts_with("media-source:"));

        assert!(registry.revoke(first.id));
        assert!(!registry.revoke(first.id));
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn test_missing_file() {
        let mut registry = SourceRegistry::new();
        let err = registry
            .create(Path::new("/nonexistent/snapper/clip.mp4"))
            .unwrap_err();
        assert!(matches!(err, SnapperError::FileNotFound { .. }));
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_directory_is_rejected() {
        let mut registry = SourceRegistry::new();
        let err = registry.create(&std::env::temp_dir()).unwrap_err();
        assert!(matches!(err, SnapperError::Load { .. }));
    }
}
