use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{CoreError, Result};
use crate::types::{CacheFile, ExtractedImage};

pub const OUTPUT_EXTENSION: &str = "jpg";

/// Bounded retry for filesystem mutations that may race an external file lock.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Deletes `path`, sleeping between attempts. A missing file counts as
    /// success.
    pub fn remove_file(&self, path: &Path) -> Result<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match fs::remove_file(path) {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
                Err(e) => {
                    if attempt >= self.max_attempts {
                        return Err(CoreError::DeleteExhausted {
                            path: path.to_path_buf(),
                            attempts: attempt,
                            source: e,
                        });
                    }
                    thread::sleep(self.delay);
                }
            }
        }
    }
}

/// Removes every entry from `dir`, creating it first if missing. Entries that
/// survive the retry policy are logged and left behind; they do not abort the
/// run.
pub fn clear_dir(dir: &Path, retry: RetryPolicy) -> Result<()> {
    fs::create_dir_all(dir)?;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            if let Err(e) = fs::remove_dir_all(&path) {
                warn!(path = %path.display(), error = %e, "leaving stale directory behind");
            }
        } else if let Err(e) = retry.remove_file(&path) {
            warn!(error = %e, "leaving stale entry behind");
        }
    }
    Ok(())
}

/// Persists validated segments as `{source stem}_{index}.jpg`.
///
/// Writing is two-phase: bytes land in a `.tmp` sibling and are renamed into
/// the final name only after the full write succeeds, so no observer of the
/// output directory ever sees a partial file under a final name.
#[derive(Debug, Clone)]
pub struct AtomicWriter {
    output_dir: PathBuf,
    retry: RetryPolicy,
}

impl AtomicWriter {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn write_image(
        &self,
        source: &CacheFile,
        index: usize,
        bytes: &[u8],
    ) -> Result<ExtractedImage> {
        let final_path = self
            .output_dir
            .join(format!("{}_{index}.{OUTPUT_EXTENSION}", source.stem()));
        let tmp_path = final_path.with_extension(format!("{OUTPUT_EXTENSION}.tmp"));

        if let Err(e) = write_then_rename(&tmp_path, &final_path, bytes) {
            if let Err(cleanup) = self.retry.remove_file(&tmp_path) {
                debug!(path = %tmp_path.display(), error = %cleanup, "orphaned temp artifact");
            }
            return Err(e);
        }

        Ok(ExtractedImage {
            path: final_path,
            source: source.name.clone(),
            index,
        })
    }
}

fn write_then_rename(tmp: &Path, final_path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = fs::File::create(tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp, final_path)?;
    Ok(())
}
