use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::scanner::{MarkerScanner, FALSE_START_SKIP};
use crate::types::{CacheFile, ExtractedImage};
use crate::validator::validate_jpeg;
use crate::writer::{AtomicWriter, RetryPolicy};

/// Progress callback cadence within a single cache file, in validated images.
pub const PROGRESS_IMAGE_INTERVAL: u64 = 20;

static SCRATCH_SEQ: AtomicU64 = AtomicU64::new(0);

/// Drives Scanner → Validator → Writer over one cache file.
pub struct FileProcessor {
    scanner: MarkerScanner,
    writer: AtomicWriter,
    retry: RetryPolicy,
}

impl FileProcessor {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let retry = RetryPolicy::default();
        Self {
            scanner: MarkerScanner::jpeg(),
            writer: AtomicWriter::new(output_dir).with_retry(retry),
            retry,
        }
    }

    /// Extracts every validated segment from `file` into the output directory.
    ///
    /// Never fails: an unreadable file or a mid-file error is logged and
    /// surfaces as a zero or partial result. Cancellation is observed at
    /// segment granularity; `on_progress` fires every
    /// [`PROGRESS_IMAGE_INTERVAL`] validated images.
    pub fn process(
        &self,
        file: &CacheFile,
        cancel: &AtomicBool,
        mut on_progress: impl FnMut(u64),
    ) -> Vec<ExtractedImage> {
        let data = match self.read_source(&file.path) {
            Ok(data) => data,
            Err(e) => {
                warn!(file = %file.name, error = %e, "skipping unreadable cache file");
                return Vec::new();
            }
        };

        let mut extracted = Vec::new();
        let mut pos = 0usize;

        while let Some(segment) = self.scanner.next_segment(&data, pos) {
            if cancel.load(Ordering::SeqCst) {
                break;
            }

            let bytes = &data[segment.start..segment.end];
            if !validate_jpeg(bytes) {
                debug!(file = %file.name, offset = segment.start, "rejected candidate segment");
                pos = segment.start + FALSE_START_SKIP;
                continue;
            }

            let index = extracted.len();
            match self.writer.write_image(file, index, bytes) {
                Ok(image) => {
                    extracted.push(image);
                    pos = segment.end;
                    if extracted.len() as u64 % PROGRESS_IMAGE_INTERVAL == 0 {
                        on_progress(extracted.len() as u64);
                    }
                }
                Err(e) => {
                    warn!(file = %file.name, offset = segment.start, error = %e, "write failed, skipping segment");
                    pos = segment.start + FALSE_START_SKIP;
                }
            }
        }

        extracted
    }

    /// Reads the cache file through a private scratch copy. Explorer keeps
    /// thumbcache files open, so reading a copy dodges the sharing violation
    /// on Windows; if the copy itself fails, falls back to a direct read.
    fn read_source(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        let scratch = scratch_path(path);
        match fs::copy(path, &scratch) {
            Ok(_) => {
                let data = fs::read(&scratch);
                if let Err(e) = self.retry.remove_file(&scratch) {
                    warn!(path = %scratch.display(), error = %e, "scratch copy left behind");
                }
                data
            }
            Err(_) => fs::read(path),
        }
    }
}

fn scratch_path(source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cache".to_string());
    let seq = SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "thumbrescue_{}_{seq}_{name}",
        std::process::id()
    ))
}
