use std::collections::HashMap;
use std::time::Duration;

/// A single malware signature: an id, a regular expression, and optional
/// per-pattern tuning.
///
/// Immutable after construction — `SignatureSet::remove` drops whole entries
/// rather than mutating one in place.
#[derive(Debug, Clone)]
pub struct Signature {
    pub id: u64,
    pub pattern: String,
    /// When `true`, this signature may only match in the first chunk of a
    /// file (mirrors PCRE's `\A`-anchored patterns in the original scanner).
    pub anchored: bool,
    /// Per-pattern CPU budget. Falls back to [`SignatureSet`]'s default
    /// when unset.
    pub timeout: Option<Duration>,
}

impl Signature {
    pub fn new(id: u64, pattern: impl Into<String>) -> Self {
        Self {
            id,
            pattern: pattern.into(),
            anchored: false,
            timeout: None,
        }
    }

    pub fn anchored(mut self, anchored: bool) -> Self {
        self.anchored = anchored;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// An indexed collection of [`Signature`]s.
///
/// Built once by the caller of [`crate::scanner::Scanner`], then handed to
/// [`crate::matcher::CompiledMatcher::compile`] and shared read-only across
/// workers for the lifetime of one scan.
#[derive(Debug, Clone, Default)]
pub struct SignatureSet {
    signatures: Vec<Signature>,
    index: HashMap<u64, usize>,
    /// Default per-pattern CPU budget applied to signatures that don't
    /// specify their own.
    pub default_timeout: Duration,
}

impl SignatureSet {
    pub fn new() -> Self {
        Self {
            signatures: Vec::new(),
            index: HashMap::new(),
            default_timeout: Duration::from_secs(1),
        }
    }

    pub fn with_default_timeout(default_timeout: Duration) -> Self {
        Self {
            default_timeout,
            ..Self::new()
        }
    }

    /// Add a signature, replacing any existing one with the same id.
    pub fn add(&mut self, signature: Signature) {
        if let Some(&i) = self.index.get(&signature.id) {
            self.signatures[i] = signature;
            return;
        }
        self.index.insert(signature.id, self.signatures.len());
        self.signatures.push(signature);
    }

    /// Remove a signature by id, if present. Must be called before
    /// [`crate::matcher::CompiledMatcher::compile`] — the compiled matcher
    /// has no remove operation of its own.
    pub fn remove(&mut self, id: u64) -> Option<Signature> {
        let i = self.index.remove(&id)?;
        let removed = self.signatures.remove(i);
        for idx in self.index.values_mut() {
            if *idx > i {
                *idx -= 1;
            }
        }
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.signatures.iter()
    }
}

impl FromIterator<Signature> for SignatureSet {
    fn from_iter<I: IntoIterator<Item = Signature>>(iter: I) -> Self {
        let mut set = Self::new();
        for signature in iter {
            set.add(signature);
        }
        set
    }
}
