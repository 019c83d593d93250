use std::collections::HashSet;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ScanError;
use crate::event::{ScanMetrics, ScanProgressUpdate, ScanResult};
use crate::filter::FileFilter;
use crate::matcher::{CompiledMatcher, PcreOptions};
use crate::pool::WorkerPool;
use crate::signature::SignatureSet;
use crate::stream::StreamReader;
use crate::timer::Timer;
use crate::worker::{WorkerConfig, DEFAULT_CHUNK_SIZE, DEFAULT_QUEUE_READ_TIMEOUT};

/// Configuration for one [`Scanner::scan`] call. See `spec.md` §6.
pub struct Options<R: Read + Send + 'static> {
    pub paths: HashSet<String>,
    pub signatures: SignatureSet,
    pub workers: u32,
    pub chunk_size: u64,
    pub path_source: Option<StreamReader<R>>,
    pub scanned_content_limit: Option<u64>,
    pub file_filter: Option<FileFilter>,
    pub match_all: bool,
    pub pcre_options: PcreOptions,
    pub queue_read_timeout: Duration,
}

impl<R: Read + Send + 'static> Options<R> {
    pub fn new(signatures: SignatureSet) -> Self {
        Self {
            paths: HashSet::new(),
            signatures,
            workers: 1,
            chunk_size: DEFAULT_CHUNK_SIZE,
            path_source: None,
            scanned_content_limit: None,
            file_filter: None,
            match_all: false,
            pcre_options: PcreOptions::default(),
            queue_read_timeout: DEFAULT_QUEUE_READ_TIMEOUT,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.paths.insert(path.into());
        self
    }

    pub fn with_workers(mut self, workers: u32) -> Self {
        self.workers = workers.max(1);
        self
    }
}

type ProgressCallback<'a> = dyn FnMut(ScanProgressUpdate) + 'a;
type FinishedCallback<'a> = dyn FnOnce(&ScanMetrics, &Timer) + 'a;

/// Default `finished_cb`: logs the summary message(s) described in
/// `spec.md` §4.I.
pub fn default_finished_handler(metrics: &ScanMetrics, timer: &Timer) {
    let timeout_count = metrics.total_timeouts();
    if timeout_count > 0 {
        tracing::warn!("{timeout_count} timeout(s) occurred during scan");
    }
    tracing::info!(
        "Found {} matching file(s) after processing {} file(s) containing {} byte(s) over {} second(s)",
        metrics.total_matches(),
        metrics.total_count(),
        metrics.total_bytes(),
        timer.elapsed().as_secs(),
    );
}

/// Wires the locator, worker pool, matcher, metrics, and timer together and
/// exposes the single entry point callers use to run a scan. See
/// `spec.md` §4.I.
pub struct Scanner<R: Read + Send + 'static> {
    options: Options<R>,
}

impl<R: Read + Send + 'static> Scanner<R> {
    pub fn new(options: Options<R>) -> Self {
        Self { options }
    }

    /// Run the scan to completion. `use_log_events` toggles routing every
    /// unit's logging through the event queue instead of directly into the
    /// process-wide `tracing` subscriber — see `SPEC_FULL.md`'s Logging
    /// section and `spec.md`'s DESIGN NOTES on cross-unit logging. Since
    /// this crate uses OS threads sharing one subscriber, `use_log_events`
    /// exists to preserve the option for a future process-isolated
    /// topology; with threads, direct `tracing` calls already fan in
    /// correctly, so it's a no-op when threads are used.
    pub fn scan(
        mut self,
        result_cb: impl FnMut(ScanResult),
        progress_cb: Option<Box<ProgressCallback<'_>>>,
        finished_cb: Option<Box<FinishedCallback<'_>>>,
    ) -> Result<ScanMetrics, ScanError> {
        let mut timer = Timer::start();

        let file_filter = Arc::new(
            self.options
                .file_filter
                .take()
                .unwrap_or_else(default_file_filter),
        );
        let matcher = CompiledMatcher::compile(
            &self.options.signatures,
            self.options.match_all,
            self.options.pcre_options,
        );
        let worker_count = self.options.workers as usize;
        tracing::debug!(worker_count, "using worker(s)");

        let worker_config = WorkerConfig {
            chunk_size: self.options.chunk_size,
            scanned_content_limit: self.options.scanned_content_limit,
            queue_read_timeout: self.options.queue_read_timeout,
        };

        let mut pool = WorkerPool::start(
            worker_count,
            file_filter,
            matcher,
            worker_config,
            progress_cb.is_some(),
        );

        for path in &self.options.paths {
            pool.locator_mut().add_path(path.clone());
        }
        if let Some(path_source) = self.options.path_source.as_mut() {
            tracing::debug!("reading input paths");
            while let Some(path) = path_source
                .read_entry()
                .map_err(|e| ScanError::Configuration(e.to_string()))?
            {
                pool.locator_mut().add_path(path);
            }
        }
        pool.locator_mut().finalize_paths()?;

        let mut metrics = ScanMetrics::new(worker_count);
        tracing::debug!("awaiting results");
        let result = pool.await_results(
            &mut metrics,
            &timer,
            Box::new(result_cb),
            progress_cb,
        );

        timer.stop();
        result?;

        match finished_cb {
            Some(finished_cb) => finished_cb(&metrics, &timer),
            None => default_finished_handler(&metrics, &timer),
        }
        Ok(metrics)
    }
}

fn default_file_filter() -> FileFilter {
    FileFilter::from_config(&crate::filter::FileFilterConfig::default())
        .expect("default file filter patterns are valid regexes")
}
