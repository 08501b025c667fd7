//! Delivery of encoded snapshots.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use snapper_common::error::{SnapperError, SnapperResult};

/// Highest ` (n)` suffix tried before giving up.
const MAX_SUFFIX: u32 = 10_000;

/// Saves bytes under a name. Returns where they ended up.
pub trait DownloadSink: Send {
    fn deliver(&mut self, bytes: &[u8], filename: &str) -> SnapperResult<PathBuf>;
}

/// Writes snapshots into a directory without ever overwriting: a taken name
/// gets a ` (n)` suffix before the extension, the way browsers number
/// repeated downloads.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The filename followed by its ` (1)`, ` (2)`, ... variants.
    fn candidates<'a>(&'a self, filename: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
        let (stem, ext) = match filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (filename, None),
        };
        std::iter::once(self.dir.join(filename)).chain((1..MAX_SUFFIX).map(move |n| {
            match ext {
                Some(ext) => self.dir.join(format!("{stem} ({n}).{ext}")),
                None => self.dir.join(format!("{stem} ({n})")),
            }
        }))
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&mut self, bytes: &[u8], filename: &str) -> SnapperResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        for path in self.candidates(filename) {
            // Never truncate: a name taken in the meantime moves on to the next.
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };
            file.write_all(bytes)?;
            tracing::info!(path = %path.display(), bytes = bytes.len(), "Snapshot saved");
            return Ok(path);
        }
        Err(SnapperError::unknown(format!(
            "No free name for {filename} in {}",
            self.dir.display()
        )))
    }
}

/// A delivered file kept in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Collects deliveries in memory, for embedding and tests. Clones share the
/// same list.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    deliveries: std::sync::Arc<Mutex<Vec<Delivery>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

impl DownloadSink for MemorySink {
    fn deliver(&mut self, bytes: &[u8], filename: &str) -> SnapperResult<PathBuf> {
        if let Ok(mut deliveries) = self.deliveries.lock() {
            deliveries.push(Delivery {
                filename: filename.to_string(),
                bytes: bytes.to_vec(),
            });
        }
        Ok(PathBuf::from(filename))
    }
}
