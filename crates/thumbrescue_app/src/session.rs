use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{info, warn};

use thumbrescue_core::{clear_dir, CacheFile, FileProcessor, RetryPolicy, ScanStats};

use crate::events::{EventPublisher, ScanEvent};

/// Enumerates the cache files a scan should visit. The session never inspects
/// the source beyond this call.
pub trait CacheFileSource: Send + Sync {
    fn cache_files(&self) -> anyhow::Result<Vec<CacheFile>>;
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("scan already in progress")]
    AlreadyRunning,

    #[error("cache file source unavailable: {0}")]
    CacheSource(String),

    #[error("output directory unavailable: {0}")]
    OutputDir(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Stopping,
}

struct Shared {
    state: Mutex<SessionState>,
    stats: Mutex<ScanStats>,
    cancel: AtomicBool,
}

/// Process-wide scan control. At most one scan runs at a time; `start` while
/// running is rejected, never queued. All shared state is touched only through
/// synchronized accessors, and the worker never blocks on a caller.
pub struct ScanSession {
    shared: Arc<Shared>,
    output_dir: PathBuf,
    locator: Arc<dyn CacheFileSource>,
    publisher: Arc<dyn EventPublisher>,
    retry: RetryPolicy,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ScanSession {
    #[must_use]
    pub fn new(
        locator: Arc<dyn CacheFileSource>,
        output_dir: impl Into<PathBuf>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::Idle),
                stats: Mutex::new(ScanStats::default()),
                cancel: AtomicBool::new(false),
            }),
            output_dir: output_dir.into(),
            locator,
            publisher,
            retry: RetryPolicy::default(),
            worker: Mutex::new(None),
        }
    }

    /// Begins a scan. Permitted only from `Idle`; a concurrent request is
    /// rejected with [`SessionError::AlreadyRunning`] and an `error` event,
    /// leaving the running scan untouched.
    pub fn start(&self) -> Result<(), SessionError> {
        {
            // Check-and-set under one lock so two callers cannot both observe
            // Idle.
            let mut state = self.shared.state.lock();
            if *state != SessionState::Idle {
                self.publisher.publish(ScanEvent::Error {
                    message: "Scan already in progress. Stop it or wait for it to finish."
                        .to_string(),
                });
                return Err(SessionError::AlreadyRunning);
            }
            *state = SessionState::Running;
        }

        self.shared.cancel.store(false, Ordering::SeqCst);
        *self.shared.stats.lock() = ScanStats::default();

        if let Err(e) = clear_dir(&self.output_dir, self.retry) {
            self.fail_start(format!("output directory unavailable: {e}"));
            return Err(SessionError::OutputDir(e.to_string()));
        }

        let files = match self.locator.cache_files() {
            Ok(files) => files,
            Err(e) => {
                self.fail_start(format!("cache file source unavailable: {e}"));
                return Err(SessionError::CacheSource(e.to_string()));
            }
        };

        let snapshot = {
            let mut stats = self.shared.stats.lock();
            stats.total_files = files.len();
            stats.clone()
        };
        info!(total_files = files.len(), "starting scan");
        self.publisher.publish(ScanEvent::Progress {
            percent: 0,
            message: "Starting scan...".to_string(),
            current_file: None,
            stats: snapshot,
        });

        let shared = Arc::clone(&self.shared);
        let publisher = Arc::clone(&self.publisher);
        let processor = FileProcessor::new(&self.output_dir);
        let handle = thread::Builder::new()
            .name("scan-worker".to_string())
            .spawn(move || run_worker(&shared, publisher.as_ref(), &processor, &files))
            .expect("failed to spawn scan worker");
        *self.worker.lock() = Some(handle);

        Ok(())
    }

    /// Requests cancellation. Returns immediately; the worker notices the flag
    /// at its next checkpoint and acknowledges with a `stopped` terminal
    /// event. No-op unless `Running`.
    pub fn stop(&self) {
        let mut state = self.shared.state.lock();
        if *state == SessionState::Running {
            self.shared.cancel.store(true, Ordering::SeqCst);
            *state = SessionState::Stopping;
            info!("stop requested");
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.shared.state.lock()
    }

    /// Snapshot of the aggregate progress counters. Never fails.
    #[must_use]
    pub fn stats(&self) -> ScanStats {
        self.shared.stats.lock().clone()
    }

    /// Blocks until the current worker (if any) has exited.
    pub fn wait(&self) {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    fn fail_start(&self, message: String) {
        warn!("{message}");
        self.publisher.publish(ScanEvent::Error { message });
        *self.shared.state.lock() = SessionState::Idle;
    }
}

fn run_worker(
    shared: &Shared,
    publisher: &dyn EventPublisher,
    processor: &FileProcessor,
    files: &[CacheFile],
) {
    let total = files.len();
    let mut outputs: Vec<String> = Vec::new();
    let mut stopped = false;

    for file in files {
        if shared.cancel.load(Ordering::SeqCst) {
            stopped = true;
            break;
        }

        let snapshot = {
            let mut stats = shared.stats.lock();
            stats.current_file = Some(file.name.clone());
            stats.current_file_images = 0;
            stats.clone()
        };
        publisher.publish(ScanEvent::Progress {
            percent: snapshot.percent(),
            message: format!("Processing {}...", file.name),
            current_file: Some(file.name.clone()),
            stats: snapshot,
        });

        let extracted = processor.process(file, &shared.cancel, |count| {
            let snapshot = {
                let mut stats = shared.stats.lock();
                stats.current_file_images = count;
                stats.clone()
            };
            publisher.publish(ScanEvent::Progress {
                percent: snapshot.percent(),
                message: format!("{}: {count} images so far", file.name),
                current_file: Some(file.name.clone()),
                stats: snapshot,
            });
        });

        let snapshot = {
            let mut stats = shared.stats.lock();
            stats.processed_files += 1;
            stats.total_images += extracted.len() as u64;
            stats.current_file_images = extracted.len() as u64;
            stats.clone()
        };
        outputs.extend(extracted.iter().map(|image| image.file_name()));
        info!(file = %file.name, extracted = extracted.len(), "file processed");
        publisher.publish(ScanEvent::FileProcessed {
            file_name: file.name.clone(),
            extracted: extracted.len() as u64,
            stats: snapshot,
        });
    }

    // A stop during the final file still ends the run as stopped.
    if shared.cancel.load(Ordering::SeqCst) {
        stopped = true;
    }

    let final_stats = {
        let mut stats = shared.stats.lock();
        stats.current_file = None;
        stats.clone()
    };

    // Back to Idle before the terminal event, so an observer reacting to the
    // event can immediately start a new scan.
    *shared.state.lock() = SessionState::Idle;

    if stopped {
        info!(
            processed = final_stats.processed_files,
            total, "scan stopped by user"
        );
        publisher.publish(ScanEvent::Stopped {
            processed_files: final_stats.processed_files,
            total_files: total,
            stats: final_stats,
        });
    } else {
        info!(
            images = final_stats.total_images,
            files = final_stats.processed_files,
            "scan completed"
        );
        publisher.publish(ScanEvent::Completed {
            percent: 100,
            outputs,
            stats: final_stats,
        });
    }
}
