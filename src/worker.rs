use std::fs::File;
use std::io::Read;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::error::ScanError;
use crate::event::{ScanEvent, StatusHandle, TaggedEvent};
use crate::matcher::{CompiledMatcher, JitScratch};

pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024;
pub const DEFAULT_QUEUE_READ_TIMEOUT: Duration = Duration::from_secs(180);

/// Per-worker tuning passed down from [`crate::scanner::Options`].
#[derive(Clone)]
pub struct WorkerConfig {
    pub chunk_size: u64,
    pub scanned_content_limit: Option<u64>,
    pub queue_read_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            scanned_content_limit: None,
            queue_read_timeout: DEFAULT_QUEUE_READ_TIMEOUT,
        }
    }
}

/// A long-lived scan worker bound to pool slot `index` (1-based — locator
/// owns index 0). See `spec.md` §4.F.
pub struct ScanWorker;

impl ScanWorker {
    /// Spawn the worker thread.
    pub fn spawn(
        index: usize,
        status: StatusHandle,
        work_rx: Receiver<crate::event::WorkItem>,
        event_tx: Sender<TaggedEvent>,
        matcher: Arc<CompiledMatcher>,
        config: WorkerConfig,
    ) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name(format!("worker-{index}"))
            .spawn(move || Self::run(index, status, work_rx, event_tx, matcher, config))
            .expect("failed to spawn scan worker thread")
    }

    fn run(
        index: usize,
        status: StatusHandle,
        work_rx: Receiver<crate::event::WorkItem>,
        event_tx: Sender<TaggedEvent>,
        matcher: Arc<CompiledMatcher>,
        config: WorkerConfig,
    ) {
        tracing::debug!(worker = index, "worker started");
        let mut scratch = JitScratch::new();
        let mut buf = vec![0u8; config.chunk_size as usize];

        loop {
            if status.get() == crate::event::Status::Failed {
                return;
            }
            match work_rx.recv_timeout(config.queue_read_timeout) {
                Ok(crate::event::WorkItem::EndOfInput) => {
                    Self::emit(&event_tx, index, ScanEvent::FileQueueEmptied);
                    Self::emit(&event_tx, index, ScanEvent::Completed);
                    return;
                }
                Ok(crate::event::WorkItem::Fatal(error)) => {
                    Self::emit(&event_tx, index, ScanEvent::FatalException(error));
                }
                Ok(crate::event::WorkItem::Path(path)) => {
                    Self::process_file(index, &path, &matcher, &config, &mut scratch, &mut buf, &event_tx);
                }
                Err(RecvTimeoutError::Timeout) => {
                    // Liveness safety net: a lost sentinel would otherwise
                    // deadlock this worker forever. See DESIGN NOTES in
                    // spec.md §9 — not a correctness mechanism.
                    if status.get() == crate::event::Status::ProcessingFiles {
                        Self::emit(&event_tx, index, ScanEvent::Completed);
                        return;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }

    fn process_file(
        index: usize,
        path: &std::path::Path,
        matcher: &CompiledMatcher,
        config: &WorkerConfig,
        scratch: &mut JitScratch,
        buf: &mut [u8],
        event_tx: &Sender<TaggedEvent>,
    ) {
        tracing::debug!(worker = index, path = %path.display(), "processing file");
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(source) => {
                Self::emit(
                    event_tx,
                    index,
                    ScanEvent::Exception(ScanError::FileIo {
                        path: path.to_path_buf(),
                        source,
                    }),
                );
                return;
            }
        };

        let mut context = matcher.create_context();
        let mut length: u64 = 0;

        loop {
            let want = next_chunk_size(length, config.chunk_size, config.scanned_content_limit);
            if want == 0 {
                break;
            }
            let read = match file.read(&mut buf[..want as usize]) {
                Ok(read) => read,
                Err(source) => {
                    Self::emit(
                        event_tx,
                        index,
                        ScanEvent::Exception(ScanError::FileIo {
                            path: path.to_path_buf(),
                            source,
                        }),
                    );
                    return;
                }
            };
            if read == 0 {
                break;
            }
            let first = length == 0;
            length += read as u64;
            if context.process_chunk(&buf[..read], first, scratch) {
                break;
            }
        }

        let result = crate::matcher::finish_result(path.to_path_buf(), length, context);
        Self::emit(event_tx, index, ScanEvent::FileProcessed(result));
    }

    fn emit(event_tx: &Sender<TaggedEvent>, index: usize, event: ScanEvent) {
        let _ = event_tx.send(TaggedEvent::new(index, event));
    }
}

/// How many bytes to read next, honoring `scanned_content_limit`. Returns
/// `0` when the limit has been reached (the caller should stop reading).
fn next_chunk_size(length: u64, chunk_size: u64, limit: Option<u64>) -> u64 {
    match limit {
        None => chunk_size,
        Some(limit) if length >= limit => 0,
        Some(limit) => (limit - length).min(chunk_size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_size_respects_content_limit() {
        assert_eq!(next_chunk_size(0, 1024, Some(100)), 100);
        assert_eq!(next_chunk_size(90, 1024, Some(100)), 10);
        assert_eq!(next_chunk_size(100, 1024, Some(100)), 0);
    }

    #[test]
    fn chunk_size_unbounded_without_limit() {
        assert_eq!(next_chunk_size(0, 1024, None), 1024);
        assert_eq!(next_chunk_size(1_000_000, 1024, None), 1024);
    }
}
