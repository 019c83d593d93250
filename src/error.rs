use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while configuring or running a scan.
///
/// Mirrors the error taxonomy in `spec.md` §7: [`ScanError::Configuration`]
/// never reaches a worker, [`ScanError::LocatorFatal`] and
/// [`ScanError::WorkerFatal`] abort the whole scan, while a per-file
/// [`ScanError::FileIo`] only ever reaches the caller via logging — workers
/// keep going. Per-pattern timeouts are not an error variant at all; they are
/// recorded on [`crate::event::ScanResult::timeouts`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ScanError {
    /// Raised before the worker pool starts — no paths configured, or some
    /// other option conflict. Never reaches the event loop.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A directory walk failed with an OS error. Poisoned onto the work
    /// queue, surfaces as `FATAL_EXCEPTION`, aborts the scan.
    #[error("fatal error walking {path}: {source}")]
    LocatorFatal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An OS error opening or reading a single file. Logged and the scan
    /// continues with the next file.
    #[error("IO error reading {path}: {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Unexpected failure inside a worker thread. Aborts the scan.
    #[error("worker failure: {0}")]
    WorkerFatal(String),
}

impl ScanError {
    /// The path this error occurred at, if applicable.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::LocatorFatal { path, .. } | Self::FileIo { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Whether the scan can continue after this error.
    ///
    /// Only [`ScanError::FileIo`] is recoverable — it is surfaced as an
    /// `EXCEPTION` event and the next file is processed. Every other variant
    /// is fatal and terminates the pool.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::FileIo { .. })
    }

    /// Whether this error should halt the scan immediately.
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Reconstruct an owned copy of this error. Used to recover a
    /// `ScanError` out of an `Arc<ScanError>` that still has other owners
    /// (`Arc::try_unwrap` is the normal path; this is the fallback). The
    /// `io::Error` source can't be cloned, so its kind and message are
    /// carried over into a fresh `io::Error` instead of the original object.
    pub fn duplicate(&self) -> Self {
        match self {
            Self::Configuration(message) => Self::Configuration(message.clone()),
            Self::LocatorFatal { path, source } => Self::LocatorFatal {
                path: path.clone(),
                source: io::Error::new(source.kind(), source.to_string()),
            },
            Self::FileIo { path, source } => Self::FileIo {
                path: path.clone(),
                source: io::Error::new(source.kind(), source.to_string()),
            },
            Self::WorkerFatal(message) => Self::WorkerFatal(message.clone()),
        }
    }
}
