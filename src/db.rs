use crate::error::P0fSynError;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Section holding the client SYN signatures, the only one the matcher reads.
pub const TCP_REQUEST: &str = "tcp:request";

/// Signature database consumed by the SYN matcher.
///
/// Entries are kept in source-file order. The order is load-bearing: when two
/// signatures reach the same score the one loaded first wins, so this is a plain
/// `Vec` and never a keyed map. A `Database` is immutable once built; share it by
/// reference or behind an `Arc`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Database {
    entries: Vec<Entry>,
}

/// One labelled group of raw signatures.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Entry {
    /// Section tag, e.g. `tcp:request` or `http:response`.
    pub section: String,
    /// Display name. Entries with an empty label never win a match.
    pub label: String,
    /// System family, informational only.
    pub sys: String,
    /// Raw signature strings, in file order.
    pub sig: Vec<String>,
}

impl Entry {
    pub fn new(section: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            label: label.into(),
            sys: String::new(),
            sig: vec![],
        }
    }

    pub fn with_sys(mut self, sys: impl Into<String>) -> Self {
        self.sys = sys.into();
        self
    }

    pub fn with_sig(mut self, sig: impl Into<String>) -> Self {
        self.sig.push(sig.into());
        self
    }

    pub fn is_tcp_request(&self) -> bool {
        self.section == TCP_REQUEST
    }
}

impl Database {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    /// Parses the signature file bundled with the crate (`config/p0f.fp`).
    pub fn load_default() -> Result<Self, P0fSynError> {
        let db: Database = include_str!("../config/p0f.fp").parse()?;
        debug!(
            "Loaded default database: {} entries, {} tcp:request",
            db.len(),
            db.tcp_request().count()
        );
        Ok(db)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, P0fSynError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let db: Database = content.parse()?;
        debug!("Loaded database from {}: {} entries", path.display(), db.len());
        Ok(db)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Entries of the `tcp:request` section, in load order.
    pub fn tcp_request(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|entry| entry.is_tcp_request())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<Entry>> for Database {
    fn from(entries: Vec<Entry>) -> Self {
        Self::new(entries)
    }
}
