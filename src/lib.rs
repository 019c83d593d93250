//! # malscan-core
//!
//! A parallel filesystem scanning engine for matching file contents against a
//! large set of regular-expression malware signatures.
//!
//! This crate is the scanning engine only: a locator unit discovers
//! candidate files and streams them into a bounded work queue, a pool of
//! scan workers chunk-read each file through a shared compiled matcher, and
//! an event loop on the caller's thread aggregates metrics and drives
//! `result`/`progress`/`finished` callbacks. Signature acquisition, report
//! formatting, and CLI/config parsing are the caller's responsibility.
//!
//! # Quick start
//!
//! ```no_run
//! use std::io;
//! use malscan_core::{Options, Scanner, Signature, SignatureSet};
//!
//! let mut signatures = SignatureSet::new();
//! signatures.add(Signature::new(1, r"eval\(\$_GET"));
//!
//! let options: Options<io::Empty> = Options::new(signatures)
//!     .with_path("/var/www")
//!     .with_workers(4);
//!
//! let scanner = Scanner::new(options);
//! let metrics = scanner
//!     .scan(
//!         |result| println!("{}: {} match(es)", result.path.display(), result.matches.len()),
//!         None,
//!         None,
//!     )
//!     .expect("scan failed");
//!
//! println!("scanned {} file(s)", metrics.total_count());
//! ```
//!
//! # Custom path sources
//!
//! `Options::path_source` accepts anything implementing [`std::io::Read`] —
//! wrap standard input in a [`StreamReader`] to accept a delimiter-separated
//! path list in addition to (or instead of) `Options::paths`.

#![forbid(unsafe_code)]

mod error;
mod event;
mod filter;
mod locator;
mod matcher;
mod pool;
mod progress;
mod scanner;
mod signature;
mod stream;
mod timer;
mod worker;

pub use error::ScanError;
pub use event::{ScanEvent, ScanMetrics, ScanProgressUpdate, ScanResult, Status};
pub use filter::{FileFilter, FileFilterConfig};
pub use matcher::{CompiledMatcher, JitScratch, MatchContext, PcreOptions};
pub use scanner::{default_finished_handler, Options, Scanner};
pub use signature::{Signature, SignatureSet};
pub use stream::StreamReader;
pub use worker::{WorkerConfig, DEFAULT_CHUNK_SIZE, DEFAULT_QUEUE_READ_TIMEOUT};
