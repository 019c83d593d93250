use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error::ScanError;
use crate::event::{
    ScanEvent, ScanMetrics, ScanProgressUpdate, ScanResult, Status, StatusHandle, TaggedEvent,
    WorkItem, LOCATOR_WORKER_INDEX,
};
use crate::locator::LocatorUnit;
use crate::matcher::CompiledMatcher;
use crate::progress::ProgressMonitor;
use crate::timer::Timer;
use crate::worker::{ScanWorker, WorkerConfig};

const WORK_QUEUE_CAPACITY: usize = 10_000;
const EVENT_QUEUE_CAPACITY: usize = 100;

pub type ResultCallback<'a> = dyn FnMut(ScanResult) + 'a;
pub type ProgressCallback<'a> = dyn FnMut(ScanProgressUpdate) + 'a;

/// Owns the work queue, event queue, status flag, and every spawned unit for
/// one scan. See `spec.md` §4.H.
///
/// Scoped-acquisition contract: [`WorkerPool::run`] joins every unit on
/// normal completion; on a fatal event it terminates them instead (workers
/// are detached threads, so "terminate" here means: stop waiting on them and
/// let the error propagate — the OS threads themselves observe the `Failed`
/// status or a closed channel and exit on their own on the next queue op).
pub struct WorkerPool {
    work_tx: Sender<WorkItem>,
    event_tx: Sender<TaggedEvent>,
    event_rx: Receiver<TaggedEvent>,
    status: StatusHandle,
    locator: LocatorUnit,
    workers: Vec<JoinHandle<()>>,
    monitor: Option<JoinHandle<()>>,
    worker_count: usize,
}

impl WorkerPool {
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        worker_count: usize,
        file_filter: Arc<crate::filter::FileFilter>,
        matcher: Arc<CompiledMatcher>,
        worker_config: WorkerConfig,
        has_progress_receiver: bool,
    ) -> Self {
        let (work_tx, work_rx) = bounded::<WorkItem>(WORK_QUEUE_CAPACITY);
        let (event_tx, event_rx) = bounded::<TaggedEvent>(EVENT_QUEUE_CAPACITY);
        let status = StatusHandle::new(Status::LocatingFiles);

        let locator = LocatorUnit::spawn(
            file_filter,
            status.clone(),
            work_tx.clone(),
            event_tx.clone(),
            worker_count,
        );

        let monitor = if has_progress_receiver {
            Some(ProgressMonitor::spawn(status.clone(), event_tx.clone()))
        } else {
            None
        };

        let workers = (1..=worker_count)
            .map(|index| {
                ScanWorker::spawn(
                    index,
                    status.clone(),
                    work_rx.clone(),
                    event_tx.clone(),
                    Arc::clone(&matcher),
                    worker_config.clone(),
                )
            })
            .collect();

        Self {
            work_tx,
            event_tx,
            event_rx,
            status,
            locator,
            workers,
            monitor,
            worker_count,
        }
    }

    pub fn locator_mut(&mut self) -> &mut LocatorUnit {
        &mut self.locator
    }

    fn completed_workers(&self, completed: &std::collections::HashSet<usize>) -> bool {
        completed.len() >= self.worker_count
    }

    /// The event multiplexer: drains the event queue, updating `metrics`
    /// and `status`, invoking `result_cb` for every `FILE_PROCESSED`, until
    /// either every worker has signalled completion or a fatal error
    /// arrives. See the dispatch table in `spec.md` §4.H.
    pub fn await_results(
        mut self,
        metrics: &mut ScanMetrics,
        timer: &Timer,
        mut result_cb: Box<ResultCallback<'_>>,
        mut progress_cb: Option<Box<ProgressCallback<'_>>>,
    ) -> Result<(), ScanError> {
        let mut completed_workers = std::collections::HashSet::new();
        let outcome = loop {
            let tagged = match self.event_rx.recv() {
                Ok(tagged) => tagged,
                Err(_) => break Ok(()),
            };
            match tagged.event {
                ScanEvent::Completed => {
                    if tagged.worker_index != LOCATOR_WORKER_INDEX {
                        tracing::debug!(worker = tagged.worker_index, "worker completed");
                        completed_workers.insert(tagged.worker_index);
                    } else {
                        tracing::debug!("locator unit exited");
                    }
                    if self.completed_workers(&completed_workers) {
                        tracing::debug!(
                            "all workers have completed and all results have been processed"
                        );
                        break Ok(());
                    }
                }
                ScanEvent::FileQueueEmptied => {
                    self.status.mark_processing();
                }
                ScanEvent::FileProcessed(result) => {
                    if result.timeout_count() > 0 {
                        let ids: Vec<String> =
                            result.timeouts.iter().map(|id| id.to_string()).collect();
                        tracing::warn!(
                            path = %result.path.display(),
                            signatures = %ids.join(", "),
                            "signatures timed out while processing file"
                        );
                    }
                    let slot = tagged.worker_index.saturating_sub(1);
                    metrics.record_result(slot, &result);
                    result_cb(result);
                }
                ScanEvent::Exception(error) => {
                    tracing::error!(%error, "exception occurred while processing file");
                }
                ScanEvent::FatalException(error) => {
                    self.status.set(Status::Failed);
                    break Err(error);
                }
                ScanEvent::ProgressUpdate => {
                    if let Some(progress_cb) = progress_cb.as_mut() {
                        progress_cb(ScanProgressUpdate {
                            elapsed_time: timer.elapsed(),
                            metrics: metrics.clone(),
                        });
                    }
                }
                ScanEvent::LogMessage { level, message } => {
                    match level {
                        tracing::Level::ERROR => tracing::error!("{message}"),
                        tracing::Level::WARN => tracing::warn!("{message}"),
                        tracing::Level::INFO => tracing::info!("{message}"),
                        tracing::Level::DEBUG => tracing::debug!("{message}"),
                        tracing::Level::TRACE => tracing::trace!("{message}"),
                    }
                }
            }
        };

        match outcome {
            Ok(()) => {
                self.status.set(Status::Complete);
                self.join();
                Ok(())
            }
            Err(error) => {
                self.terminate();
                // `error` is the `Arc<ScanError>` poisoned onto the work queue
                // by the locator (see locator.rs) and forwarded here by
                // whichever worker drained it. By the time it reaches this
                // point only one strong reference should remain, so this is
                // normally a plain move; `duplicate()` is the fallback for
                // the rare case another clone is still outstanding.
                Err(Arc::try_unwrap(error).unwrap_or_else(|arc| arc.duplicate()))
            }
        }
    }

    fn join(self) {
        self.locator.join();
        for worker in self.workers {
            let _ = worker.join();
        }
        if let Some(monitor) = self.monitor {
            let _ = monitor.join();
        }
    }

    /// Abrupt stop: drop the sender ends so every unit observes a closed
    /// channel on its next queue operation and exits. Threads are still
    /// joined so we never leak them, but we don't wait for them to drain
    /// in-flight work first.
    fn terminate(self) {
        drop(self.work_tx);
        drop(self.event_tx);
        self.join();
    }
}
