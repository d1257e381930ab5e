use crate::db::Database;
use crate::packet::PacketMeta;
use crate::signature_matcher::SignatureMatcher;

/// Label returned when nothing in the database could be scored.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Classifies SYNs against one database.
///
/// Detection is a pure read of the database, so a detector can be shared by
/// reference between threads; workers that own their own copy build one each.
pub struct SynDetector<'a> {
    matcher: SignatureMatcher<'a>,
}

impl<'a> SynDetector<'a> {
    pub fn new(database: &'a Database) -> Self {
        Self {
            matcher: SignatureMatcher::new(database),
        }
    }

    /// Label of the best scoring `tcp:request` signature, or [`UNKNOWN_LABEL`]
    /// when the database has no usable signature.
    pub fn detect(&self, meta: &PacketMeta) -> &'a str {
        self.matcher.best_label(meta).unwrap_or(UNKNOWN_LABEL)
    }

    pub fn matcher(&self) -> &SignatureMatcher<'a> {
        &self.matcher
    }
}

/// One-shot detection. Builds the matcher on every call; keep a [`SynDetector`]
/// around when classifying more than a handful of packets.
pub fn detect<'a>(database: &'a Database, meta: &PacketMeta) -> &'a str {
    SynDetector::new(database).detect(meta)
}
