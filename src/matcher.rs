use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use regex::bytes::Regex;

use crate::event::ScanResult;
use crate::signature::SignatureSet;

/// One compiled pattern plus the tuning carried over from its [`crate::signature::Signature`].
struct CompiledSignature {
    id: u64,
    regex: Regex,
    anchored: bool,
    timeout: Duration,
}

/// A compiled [`SignatureSet`], shared read-only across all scan workers for
/// the lifetime of one scan.
///
/// The `regex` crate is the matching engine backing this type (see
/// `DESIGN.md` for why `regex` over a backtracking engine): its automaton is
/// linear-time in input length, so it can never pathologically backtrack —
/// the per-pattern timeout below instead bounds the cost of a single
/// oversized match rather than guarding against exponential blowup.
pub struct CompiledMatcher {
    signatures: Vec<CompiledSignature>,
    match_all: bool,
}

/// Options steering the underlying PCRE-equivalent engine. In the original
/// Python scanner this configures the PCRE JIT and match/recursion limits;
/// here it only configures the cooperative per-pattern timeout default,
/// since `regex` has no backtracking limits to tune.
#[derive(Debug, Clone, Copy)]
pub struct PcreOptions {
    pub default_timeout: Duration,
}

impl Default for PcreOptions {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(1),
        }
    }
}

impl CompiledMatcher {
    /// Compile every signature in `signatures`. A pattern that fails to
    /// compile as a regex is skipped with a `tracing::warn!` rather than
    /// aborting the whole scan — one bad signature should not be fatal.
    pub fn compile(signatures: &SignatureSet, match_all: bool, pcre_options: PcreOptions) -> Arc<Self> {
        let mut compiled = Vec::with_capacity(signatures.len());
        for signature in signatures.iter() {
            match Regex::new(&signature.pattern) {
                Ok(regex) => compiled.push(CompiledSignature {
                    id: signature.id,
                    regex,
                    anchored: signature.anchored,
                    timeout: signature.timeout.unwrap_or(pcre_options.default_timeout),
                }),
                Err(error) => {
                    tracing::warn!(signature_id = signature.id, %error, "failed to compile signature, skipping");
                }
            }
        }
        Arc::new(Self {
            signatures: compiled,
            match_all,
        })
    }

    /// Start a fresh per-file scratch context.
    pub fn create_context(&self) -> MatchContext<'_> {
        MatchContext {
            matcher: self,
            matches: Vec::new(),
            timeouts: HashSet::new(),
            resolved: HashSet::new(),
        }
    }
}

/// Per-worker scratch reused across files, separate from [`MatchContext`]
/// (which is per-file). Holds a reusable UTF-8 decode buffer so excerpt
/// extraction doesn't reallocate for every match.
#[derive(Default)]
pub struct JitScratch {
    excerpt_buf: String,
}

impl JitScratch {
    pub fn new() -> Self {
        Self::default()
    }

    fn decode_excerpt(&mut self, bytes: &[u8]) -> String {
        self.excerpt_buf.clear();
        self.excerpt_buf
            .push_str(&String::from_utf8_lossy(bytes));
        self.excerpt_buf.clone()
    }
}

/// Per-file accumulator of matches and timeouts, plus short-circuit state.
///
/// Never shared across files or threads — [`crate::worker::ScanWorker`]
/// creates a fresh one per file and drops it once the corresponding
/// `FILE_PROCESSED` event has been queued.
pub struct MatchContext<'m> {
    matcher: &'m CompiledMatcher,
    matches: Vec<(u64, String)>,
    timeouts: HashSet<u64>,
    /// Signature ids already matched or timed out in this file — not
    /// reconsidered on later chunks.
    resolved: HashSet<u64>,
}

impl<'m> MatchContext<'m> {
    /// Scan one chunk of a file's content.
    ///
    /// `first` marks the first chunk of the file (anchored signatures are
    /// only eligible then). Returns `true` once no further chunks need be
    /// scanned: in `match_all == false` mode, as soon as any signature
    /// matches; in `match_all == true` mode, once every signature has
    /// either matched or timed out.
    pub fn process_chunk(&mut self, chunk: &[u8], first: bool, scratch: &mut JitScratch) -> bool {
        for signature in &self.matcher.signatures {
            if self.resolved.contains(&signature.id) {
                continue;
            }
            if signature.anchored && !first {
                continue;
            }

            let started = Instant::now();
            let found = signature.regex.find(chunk);
            let elapsed = started.elapsed();

            if elapsed > signature.timeout {
                self.timeouts.insert(signature.id);
                self.resolved.insert(signature.id);
                continue;
            }

            if let Some(found) = found {
                let excerpt = scratch.decode_excerpt(found.as_bytes());
                self.matches.push((signature.id, excerpt));
                self.resolved.insert(signature.id);
                if !self.matcher.match_all {
                    return true;
                }
            }
        }

        if self.matcher.match_all {
            self.resolved.len() >= self.matcher.signatures.len()
        } else {
            false
        }
    }

    pub fn matches(&self) -> &[(u64, String)] {
        &self.matches
    }

    pub fn timeouts(&self) -> &HashSet<u64> {
        &self.timeouts
    }

    /// Consume the context into the pieces a [`ScanResult`] needs.
    pub fn into_parts(self) -> (Vec<(u64, String)>, HashSet<u64>) {
        (self.matches, self.timeouts)
    }
}

/// Build a [`ScanResult`] from a completed [`MatchContext`]. Kept as a free
/// function rather than a `ScanResult` constructor so `matcher` doesn't need
/// to depend on the timestamp source used by `event`.
pub fn finish_result(
    path: std::path::PathBuf,
    read_length: u64,
    context: MatchContext<'_>,
) -> ScanResult {
    let (matches, timeouts) = context.into_parts();
    ScanResult::new(path, read_length, matches.into_iter().collect(), timeouts)
}
