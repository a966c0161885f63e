use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Serialize;
use thumbrescue_core::ScanStats;

/// One entry in the ordered per-session event stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    Progress {
        percent: u8,
        message: String,
        current_file: Option<String>,
        stats: ScanStats,
    },
    FileProcessed {
        file_name: String,
        extracted: u64,
        stats: ScanStats,
    },
    Completed {
        percent: u8,
        outputs: Vec<String>,
        stats: ScanStats,
    },
    Stopped {
        processed_files: usize,
        total_files: usize,
        stats: ScanStats,
    },
    Error {
        message: String,
    },
}

impl ScanEvent {
    /// Exactly one terminal event is emitted per run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Stopped { .. })
    }
}

/// Best-effort push channel to observers. Delivery is never awaited and never
/// confirmed; events are ordered per session.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: ScanEvent);
}

/// Publisher over an unbounded channel; a dropped receiver silently discards
/// events instead of blocking the scan worker.
pub struct ChannelPublisher {
    tx: Sender<ScanEvent>,
}

impl ChannelPublisher {
    #[must_use]
    pub fn new() -> (Self, Receiver<ScanEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl EventPublisher for ChannelPublisher {
    fn publish(&self, event: ScanEvent) {
        let _ = self.tx.send(event);
    }
}
