use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::error::ScanError;

/// The locator unit's worker index, as specified in `spec.md` §3.
pub const LOCATOR_WORKER_INDEX: usize = 0;

/// The value placed on the bounded work queue between the locator unit and
/// scan workers.
///
/// Tagged as a real variant rather than overloading `null`/exceptions, per
/// the DESIGN NOTES in `spec.md` §9.
pub enum WorkItem {
    Path(PathBuf),
    /// Sentinel marking end-of-input for one worker.
    EndOfInput,
    /// Poison value: a fatal locator error, to be reported by whichever
    /// worker drains it, then ignored by the pool for everyone else.
    Fatal(Arc<ScanError>),
}

/// One result produced by scanning a single file.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub path: PathBuf,
    pub read_length: u64,
    pub matches: HashMap<u64, String>,
    pub timeouts: HashSet<u64>,
    pub timestamp: SystemTime,
}

impl ScanResult {
    pub fn new(
        path: PathBuf,
        read_length: u64,
        matches: HashMap<u64, String>,
        timeouts: HashSet<u64>,
    ) -> Self {
        Self {
            path,
            read_length,
            matches,
            timeouts,
            timestamp: SystemTime::now(),
        }
    }

    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }

    pub fn timeout_count(&self) -> usize {
        self.timeouts.len()
    }
}

/// Tagged scan events flowing over the bounded event queue from every unit
/// to the pool's event loop. See `spec.md` §3.
pub enum ScanEvent {
    Completed,
    FileQueueEmptied,
    FileProcessed(ScanResult),
    Exception(ScanError),
    FatalException(Arc<ScanError>),
    ProgressUpdate,
    LogMessage { level: tracing::Level, message: String },
}

/// A single event tagged with the unit that produced it.
pub struct TaggedEvent {
    pub worker_index: usize,
    pub event: ScanEvent,
}

impl TaggedEvent {
    pub fn new(worker_index: usize, event: ScanEvent) -> Self {
        Self { worker_index, event }
    }
}

/// Per-worker counters, aggregated by [`crate::pool::WorkerPool`]'s event
/// loop — the sole owner and mutator.
#[derive(Debug, Clone)]
pub struct ScanMetrics {
    pub counts: Vec<u64>,
    pub bytes: Vec<u64>,
    pub matches: Vec<u64>,
    pub timeouts: Vec<u64>,
}

impl ScanMetrics {
    pub fn new(worker_count: usize) -> Self {
        Self {
            counts: vec![0; worker_count],
            bytes: vec![0; worker_count],
            matches: vec![0; worker_count],
            timeouts: vec![0; worker_count],
        }
    }

    /// Record one worker's result. `worker_index` is 1-based in event
    /// payloads (workers are numbered 1..=N); callers pass `worker_index - 1`
    /// as the metrics slot.
    pub fn record_result(&mut self, slot: usize, result: &ScanResult) {
        self.counts[slot] += 1;
        self.bytes[slot] += result.read_length;
        if result.has_matches() {
            self.matches[slot] += 1;
        }
        self.timeouts[slot] += result.timeout_count() as u64;
    }

    pub fn total_count(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.bytes.iter().sum()
    }

    pub fn total_matches(&self) -> u64 {
        self.matches.iter().sum()
    }

    pub fn total_timeouts(&self) -> u64 {
        self.timeouts.iter().sum()
    }
}

/// A snapshot handed to the progress callback: elapsed scan time plus a copy
/// of the metrics collected so far.
pub struct ScanProgressUpdate {
    pub elapsed_time: Duration,
    pub metrics: ScanMetrics,
}

/// The pool's state machine: `Locating -> Processing -> Complete`, or
/// `Failed` from any state. Single-writer (the pool's event loop thread),
/// multi-reader (workers, the progress monitor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    LocatingFiles = 0,
    ProcessingFiles = 1,
    Complete = 2,
    Failed = 3,
}

impl Status {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::LocatingFiles,
            1 => Self::ProcessingFiles,
            2 => Self::Complete,
            _ => Self::Failed,
        }
    }
}

/// Shared, atomic handle to the pool's [`Status`].
#[derive(Clone)]
pub struct StatusHandle(Arc<AtomicU8>);

impl StatusHandle {
    pub fn new(initial: Status) -> Self {
        Self(Arc::new(AtomicU8::new(initial as u8)))
    }

    pub fn get(&self) -> Status {
        Status::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, status: Status) {
        self.0.store(status as u8, Ordering::Release);
    }

    /// Transition `Locating -> Processing`, idempotent: does nothing if
    /// already past that point.
    pub fn mark_processing(&self) {
        let _ = self.0.compare_exchange(
            Status::LocatingFiles as u8,
            Status::ProcessingFiles as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.get(), Status::Complete | Status::Failed)
    }
}
