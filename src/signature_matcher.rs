use crate::db::Database;
use crate::options::{normalize, OptionSet};
use crate::packet::PacketMeta;
use crate::signature::{TcpRequestSignature, TtlRule, WindowExpr, WindowScaleExpr};
use tracing::{debug, trace};

/// Relative tolerance of the near-window check.
pub const NEAR_WINDOW_RATIO: f64 = 0.15;

/// Observed SYN, normalized once per match.
#[derive(Clone, Debug, PartialEq)]
pub struct ObservedSyn {
    pub ttl: i64,
    pub window: i64,
    pub mss: i64,
    pub wscale: i64,
    pub options: OptionSet,
}

impl From<&PacketMeta> for ObservedSyn {
    fn from(meta: &PacketMeta) -> Self {
        ObservedSyn {
            ttl: i64::from(meta.ttl),
            window: i64::from(meta.window),
            mss: i64::from(meta.mss),
            wscale: i64::from(meta.wscale),
            options: normalize(meta.options.iter().flat_map(|o| o.split(',')))
                .iter()
                .collect(),
        }
    }
}

/// Points awarded by each term. The terms are independent and add up; in
/// particular an `mss*N` window earns both the window points and the MSS bonus.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub ttl: f64,
    pub window: f64,
    pub mss_bonus: f64,
    pub options: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.ttl + self.window + self.mss_bonus + self.options
    }
}

impl TcpRequestSignature {
    pub fn score(&self, observed: &ObservedSyn) -> f64 {
        self.score_breakdown(observed).total()
    }

    pub fn score_breakdown(&self, observed: &ObservedSyn) -> ScoreBreakdown {
        ScoreBreakdown {
            ttl: if ttl_matches(&self.ttl, observed.ttl) { 3.0 } else { 0.0 },
            window: self.window_score(observed),
            mss_bonus: mss_bonus(&self.window, observed.mss),
            options: options_score(self.option_set(), &observed.options),
        }
    }

    fn window_score(&self, observed: &ObservedSyn) -> f64 {
        if self.window == WindowExpr::Any {
            return 3.0;
        }
        if window_equals(&self.window, observed.window, observed.mss) {
            match self.window_scale {
                WindowScaleExpr::Absent | WindowScaleExpr::Any => 3.0,
                _ if observed.wscale <= 0 => 3.0,
                WindowScaleExpr::Value(ws) if ws == observed.wscale => 3.0,
                _ => 2.0,
            }
        } else if window_near(&self.window, observed.window, observed.mss) {
            2.0
        } else {
            0.0
        }
    }
}

/// TTL rule check. Exact values compare against both the raw TTL and the
/// bucket (64, 128 or 255) it rounds up to.
pub fn ttl_matches(rule: &TtlRule, ttl: i64) -> bool {
    match *rule {
        TtlRule::Any => true,
        TtlRule::UpperBound(max) => ttl <= max,
        TtlRule::Range(lo, hi) => lo <= ttl && ttl <= hi,
        TtlRule::Exact(n) => ttl_bucket(ttl) == n || ttl == n,
        TtlRule::Unrecognized => false,
    }
}

pub fn ttl_bucket(ttl: i64) -> i64 {
    if ttl <= 64 {
        64
    } else if ttl <= 128 {
        128
    } else {
        255
    }
}

fn mss_window(n: Option<i64>, mss: i64) -> Option<i64> {
    if mss <= 0 {
        return None;
    }
    n.and_then(|n| mss.checked_mul(n))
}

pub fn window_equals(expr: &WindowExpr, window: i64, mss: i64) -> bool {
    match *expr {
        WindowExpr::Any | WindowExpr::Empty => true,
        WindowExpr::Mss(n) => mss_window(n, mss) == Some(window),
        WindowExpr::Mtu(_) | WindowExpr::Unrecognized => false,
        WindowExpr::Value(n) => window == n,
    }
}

pub fn window_near(expr: &WindowExpr, window: i64, mss: i64) -> bool {
    match *expr {
        WindowExpr::Mss(n) => {
            mss_window(n, mss).is_some_and(|target| within_ratio(window, target, NEAR_WINDOW_RATIO))
        }
        WindowExpr::Value(n) => within_ratio(window, n, NEAR_WINDOW_RATIO),
        _ => false,
    }
}

pub fn within_ratio(a: i64, b: i64, ratio: f64) -> bool {
    if a == 0 || b == 0 {
        return false;
    }
    let (a, b) = (a as f64, b as f64);
    a >= b * (1.0 - ratio) && a <= b * (1.0 + ratio)
}

/// Extra points for signatures that key their window on the MSS, awarded
/// whenever an MSS was observed and whether or not the window matched.
pub fn mss_bonus(expr: &WindowExpr, mss: i64) -> f64 {
    if mss <= 0 {
        return 0.0;
    }
    match expr {
        WindowExpr::Any => 1.0,
        WindowExpr::Mss(_) => 2.0,
        _ => 0.0,
    }
}

/// Option layout term: `+3` for identical sets, `+2` above one half, plus
/// the similarity itself. Skipped when either side lists no options.
pub fn options_score(expected: &OptionSet, observed: &OptionSet) -> f64 {
    if expected.is_empty() || observed.is_empty() {
        return 0.0;
    }
    let similarity = expected.similarity(observed);
    let mut score = similarity;
    if similarity == 1.0 {
        score += 3.0;
    }
    if similarity > 0.5 {
        score += 2.0;
    }
    score
}

struct Candidate<'a> {
    label: &'a str,
    signatures: Vec<TcpRequestSignature>,
}

/// Scores an observed SYN against every `tcp:request` signature of a database.
///
/// Signatures are parsed once here. Entries with an empty label and signature
/// strings that fail to parse are left out, which never affects the outcome of
/// a match since they could not have been selected anyway.
pub struct SignatureMatcher<'a> {
    candidates: Vec<Candidate<'a>>,
}

impl<'a> SignatureMatcher<'a> {
    pub fn new(database: &'a Database) -> Self {
        let mut candidates = vec![];

        for entry in database.tcp_request() {
            if entry.label.is_empty() {
                trace!("skip unlabelled tcp:request entry");
                continue;
            }

            let signatures: Vec<TcpRequestSignature> = entry
                .sig
                .iter()
                .filter_map(|raw| match raw.parse::<TcpRequestSignature>() {
                    Ok(sig) => Some(sig),
                    Err(err) => {
                        trace!("skip signature of `{}`: {}", entry.label, err);
                        None
                    }
                })
                .collect();

            if !signatures.is_empty() {
                candidates.push(Candidate {
                    label: entry.label.as_str(),
                    signatures,
                });
            }
        }

        debug!(
            "Signature matcher ready: {} labels, {} signatures",
            candidates.len(),
            candidates.iter().map(|c| c.signatures.len()).sum::<usize>()
        );

        Self { candidates }
    }

    /// Number of parsed signatures taking part in matching.
    pub fn signature_count(&self) -> usize {
        self.candidates.iter().map(|c| c.signatures.len()).sum()
    }

    /// Highest scoring label and its score.
    ///
    /// Only a strictly greater score replaces the current best, so among equal
    /// scores the signature loaded first wins.
    pub fn best_match(&self, meta: &PacketMeta) -> Option<(&'a str, f64)> {
        let observed = ObservedSyn::from(meta);
        let mut best: Option<(&'a str, f64)> = None;

        for candidate in &self.candidates {
            for signature in &candidate.signatures {
                let score = signature.score(&observed);
                if best.map_or(true, |(_, best_score)| score > best_score) {
                    best = Some((candidate.label, score));
                }
            }
        }

        best
    }

    pub fn best_label(&self, meta: &PacketMeta) -> Option<&'a str> {
        self.best_match(meta).map(|(label, _)| label)
    }
}
