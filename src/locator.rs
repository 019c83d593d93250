use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use crate::error::ScanError;
use crate::event::{ScanEvent, StatusHandle, TaggedEvent, LOCATOR_WORKER_INDEX};
use crate::filter::FileFilter;

/// Walks one root path, emitting filtered regular-file paths into a bounded
/// work queue.
///
/// The root is canonicalised to resolve the user-provided argument; inner
/// traversal tracks the canonical path of every directory entered during
/// *this* walk so a symlink cycle terminates instead of recursing forever
/// (the REDESIGN FLAGS fix in `SPEC_FULL.md` for the original's unbounded
/// `os.scandir` recursion).
pub struct FileLocator<'a> {
    file_filter: &'a FileFilter,
    visited_dirs: HashSet<PathBuf>,
    status: StatusHandle,
}

impl<'a> FileLocator<'a> {
    pub fn new(file_filter: &'a FileFilter, status: StatusHandle) -> Self {
        Self {
            file_filter,
            visited_dirs: HashSet::new(),
            status,
        }
    }

    /// Walk `path`, sending each matching file to `output`. Blocks when
    /// `output` is full — this is the backpressure mechanism specified in
    /// `spec.md` §4.D/§5.
    pub fn locate(
        &mut self,
        path: &Path,
        output: &Sender<crate::event::WorkItem>,
    ) -> Result<(), ScanError> {
        let real_path = fs::canonicalize(path).map_err(|source| ScanError::LocatorFatal {
            path: path.to_path_buf(),
            source,
        })?;

        if real_path.is_dir() {
            self.search_directory(&real_path, output)
        } else {
            let _ = output.send(crate::event::WorkItem::Path(real_path));
            Ok(())
        }
    }

    fn search_directory(
        &mut self,
        dir: &Path,
        output: &Sender<crate::event::WorkItem>,
    ) -> Result<(), ScanError> {
        if self.status.get() == crate::event::Status::Failed {
            return Ok(());
        }
        let canonical = fs::canonicalize(dir).map_err(|source| ScanError::LocatorFatal {
            path: dir.to_path_buf(),
            source,
        })?;
        if !self.visited_dirs.insert(canonical) {
            return Ok(());
        }

        let entries = fs::read_dir(dir).map_err(|source| ScanError::LocatorFatal {
            path: dir.to_path_buf(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| ScanError::LocatorFatal {
                path: dir.to_path_buf(),
                source,
            })?;
            let file_type = entry.file_type().map_err(|source| ScanError::LocatorFatal {
                path: entry.path(),
                source,
            })?;

            if file_type.is_dir() || (file_type.is_symlink() && entry.path().is_dir()) {
                self.search_directory(&entry.path(), output)?;
            } else if file_type.is_file() || (file_type.is_symlink() && entry.path().is_file()) {
                let path = entry.path();
                if !self.file_filter.filter(&path) {
                    continue;
                }
                tracing::debug!(path = %path.display(), "file added to scan queue");
                if output
                    .send(crate::event::WorkItem::Path(path))
                    .is_err()
                {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

/// Input to the [`LocatorUnit`]: either another root path to walk, or the
/// end-of-input sentinel.
enum LocatorInput {
    Path(PathBuf),
    End,
}

/// A long-lived execution unit draining a path-input queue, running one
/// [`FileLocator`] per input path, and streaming the results into the
/// bounded work queue shared with every scan worker.
///
/// See `spec.md` §4.E. The invariant that *exactly* `worker_count` sentinels
/// reach the work queue — even on locator failure — is preserved by always
/// pushing them in the `run` loop's tail, regardless of how the loop exits.
pub struct LocatorUnit {
    input_tx: Sender<LocatorInput>,
    path_count: usize,
    handle: Option<JoinHandle<()>>,
}

impl LocatorUnit {
    /// Spawn the locator thread. `worker_count` sentinels will be pushed
    /// onto `work_tx` once input is finalized or a fatal error occurs.
    pub fn spawn(
        file_filter: Arc<FileFilter>,
        status: StatusHandle,
        work_tx: Sender<crate::event::WorkItem>,
        event_tx: Sender<TaggedEvent>,
        worker_count: usize,
    ) -> Self {
        let (input_tx, input_rx) = crossbeam_channel::bounded::<LocatorInput>(16);

        let handle = std::thread::Builder::new()
            .name("locator".into())
            .spawn(move || Self::run(file_filter, status, input_rx, work_tx, event_tx, worker_count))
            .expect("failed to spawn locator thread");

        Self {
            input_tx,
            path_count: 0,
            handle: Some(handle),
        }
    }

    /// Queue a root path to be located. Mirrors `add_path` in the original
    /// scanner.
    pub fn add_path(&mut self, path: impl Into<PathBuf>) {
        self.path_count += 1;
        let path = path.into();
        tracing::info!(path = %path.display(), "scanning path");
        let _ = self.input_tx.send(LocatorInput::Path(path));
    }

    /// Signal end of input. Fails with [`ScanError::Configuration`] if no
    /// path was ever added.
    pub fn finalize_paths(&mut self) -> Result<(), ScanError> {
        let _ = self.input_tx.send(LocatorInput::End);
        if self.path_count < 1 {
            return Err(ScanError::Configuration(
                "at least one scan path must be specified".to_string(),
            ));
        }
        Ok(())
    }

    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn run(
        file_filter: Arc<FileFilter>,
        status: StatusHandle,
        input_rx: Receiver<LocatorInput>,
        work_tx: Sender<crate::event::WorkItem>,
        event_tx: Sender<TaggedEvent>,
        worker_count: usize,
    ) {
        let mut fatal = None;
        loop {
            match input_rx.recv() {
                Ok(LocatorInput::Path(path)) => {
                    let mut locator = FileLocator::new(&file_filter, status.clone());
                    if let Err(error) = locator.locate(&path, &work_tx) {
                        fatal = Some(error);
                        break;
                    }
                }
                Ok(LocatorInput::End) | Err(_) => break,
            }
        }

        if let Some(error) = fatal {
            let error = Arc::new(error);
            let _ = work_tx.send(crate::event::WorkItem::Fatal(Arc::clone(&error)));
        }

        for _ in 0..worker_count {
            let _ = work_tx.send(crate::event::WorkItem::EndOfInput);
        }

        let _ = event_tx.send(TaggedEvent::new(LOCATOR_WORKER_INDEX, ScanEvent::Completed));
    }
}
