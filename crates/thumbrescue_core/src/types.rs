use serde::Serialize;
use std::path::{Path, PathBuf};

/// Immutable reference to one candidate cache file, as produced by the locator.
#[derive(Debug, Clone)]
pub struct CacheFile {
    pub path: PathBuf,
    pub name: String,
}

impl CacheFile {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }

    /// File name without its extension, used to name output artifacts.
    #[must_use]
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name)
    }
}

/// Half-open candidate byte range `[start, end)` within one file's buffer.
/// `end` includes the 2-byte end marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
}

impl Segment {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A validated output artifact. Immutable once created; removed only by the
/// next run's cleanup pass.
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    pub path: PathBuf,
    pub source: String,
    pub index: usize,
}

impl ExtractedImage {
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Aggregate progress for one scan. Mutated only by the scan worker; read
/// concurrently through snapshot clones.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanStats {
    pub total_files: usize,
    pub processed_files: usize,
    pub total_images: u64,
    pub current_file: Option<String>,
    pub current_file_images: u64,
}

impl ScanStats {
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total_files == 0 {
            return 100;
        }
        ((self.processed_files * 100) / self.total_files) as u8
    }
}
