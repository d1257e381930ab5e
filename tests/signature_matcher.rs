use p0f_syn::options::{normalize_layout, OptionSet};
use p0f_syn::signature::{TcpRequestSignature, TtlRule, WindowExpr};
use p0f_syn::signature_matcher::{
    mss_bonus, options_score, ttl_bucket, ttl_matches, window_near, ObservedSyn, ScoreBreakdown,
};
use p0f_syn::{Database, Entry, SignatureMatcher};

mod common;
use common::{linux_meta, meta, tcp_request};

fn sig(raw: &str) -> TcpRequestSignature {
    match raw.parse() {
        Ok(sig) => sig,
        Err(e) => panic!("Failed to parse `{raw}`: {e}"),
    }
}

fn set(layout: &str) -> OptionSet {
    normalize_layout(layout).iter().collect()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn test_score_breakdown_exact_match() {
    let observed = ObservedSyn::from(&meta(64, 65535, 1460, 7, &["mss", "sok", "ts", "nop", "ws"]));
    let breakdown = sig("4:64:0:65535,7:mss,sok,ts,nop,ws:0:0").score_breakdown(&observed);

    assert_eq!(
        breakdown,
        ScoreBreakdown {
            ttl: 3.0,
            window: 3.0,
            mss_bonus: 0.0,
            options: 6.0,
        }
    );
    assert_close(breakdown.total(), 12.0);
}

#[test]
fn test_observed_options_accept_joined_tokens() {
    let joined = ObservedSyn::from(&meta(64, 0, 0, 0, &["mss,nop", " WS ", "eol"]));
    assert_eq!(joined.options, set("mss,nop,ws"));
}

#[test]
fn test_ttl_bucketing() {
    assert_eq!(ttl_bucket(1), 64);
    assert_eq!(ttl_bucket(64), 64);
    assert_eq!(ttl_bucket(65), 128);
    assert_eq!(ttl_bucket(128), 128);
    assert_eq!(ttl_bucket(129), 255);

    assert!(ttl_matches(&TtlRule::Exact(64), 60));
    assert!(ttl_matches(&TtlRule::Exact(128), 113));
    assert!(ttl_matches(&TtlRule::Exact(255), 200));
    assert!(!ttl_matches(&TtlRule::Exact(128), 130));
    assert!(!ttl_matches(&TtlRule::Exact(64), 65));
}

#[test]
fn test_exact_ttl_also_matches_raw_value() {
    assert!(ttl_matches(&TtlRule::Exact(32), 32));
    assert!(!ttl_matches(&TtlRule::Exact(32), 31));
}

#[test]
fn test_ttl_ranges() {
    assert!(ttl_matches(&TtlRule::Range(120, 140), 130));
    assert!(ttl_matches(&TtlRule::Range(120, 140), 120));
    assert!(ttl_matches(&TtlRule::Range(120, 140), 140));
    assert!(!ttl_matches(&TtlRule::Range(120, 140), 141));

    assert!(ttl_matches(&TtlRule::UpperBound(64), 64));
    assert!(ttl_matches(&TtlRule::UpperBound(64), 1));
    assert!(!ttl_matches(&TtlRule::UpperBound(64), 65));

    assert!(ttl_matches(&TtlRule::Any, 0));
    assert!(!ttl_matches(&TtlRule::Unrecognized, 64));
}

#[test]
fn test_window_scale_mismatch_costs_one_point() {
    let signature = sig("*:128:0:8192,8:mss,nop,ws,nop,nop,sok:df,id+:0");

    let same_scale = ObservedSyn::from(&meta(128, 8192, 1460, 8, &[]));
    let other_scale = ObservedSyn::from(&meta(128, 8192, 1460, 2, &[]));
    let no_scale = ObservedSyn::from(&meta(128, 8192, 1460, 0, &[]));

    assert_close(signature.score_breakdown(&same_scale).window, 3.0);
    assert_close(signature.score_breakdown(&other_scale).window, 2.0);
    assert_close(signature.score_breakdown(&no_scale).window, 3.0);
}

#[test]
fn test_near_window() {
    let signature = sig("*:128:0:8192,0:mss,nop,nop,sok:df,id+:0");

    let near = ObservedSyn::from(&meta(128, 8760, 1460, 0, &[]));
    let far = ObservedSyn::from(&meta(128, 10000, 1460, 0, &[]));

    assert_close(signature.score_breakdown(&near).window, 2.0);
    assert_close(signature.score_breakdown(&far).window, 0.0);

    assert!(window_near(&WindowExpr::Mss(Some(20)), 30000, 1460));
    assert!(!window_near(&WindowExpr::Mss(Some(20)), 30000, 0));
    assert!(!window_near(&WindowExpr::Value(0), 0, 1460));
}

#[test]
fn test_bonus_stacks_with_window_points() {
    let observed = ObservedSyn::from(&linux_meta());
    let breakdown = sig("*:64:0:mss*20,7:mss,sok,ts,nop,ws:df,id+:0").score_breakdown(&observed);

    assert_close(breakdown.window, 3.0);
    assert_close(breakdown.mss_bonus, 2.0);
    assert_close(breakdown.total(), 14.0);
}

#[test]
fn test_wildcard_window() {
    let observed = ObservedSyn::from(&linux_meta());
    let breakdown = sig("*:64:0:*,*:mss:df,id+:0").score_breakdown(&observed);

    assert_close(breakdown.window, 3.0);
    assert_close(breakdown.mss_bonus, 1.0);
}

#[test]
fn test_mss_bonus_requires_observed_mss() {
    assert_close(mss_bonus(&WindowExpr::Mss(Some(20)), 1460), 2.0);
    assert_close(mss_bonus(&WindowExpr::Mss(None), 1460), 2.0);
    assert_close(mss_bonus(&WindowExpr::Any, 1460), 1.0);
    assert_close(mss_bonus(&WindowExpr::Value(8192), 1460), 0.0);
    assert_close(mss_bonus(&WindowExpr::Mss(Some(20)), 0), 0.0);
    assert_close(mss_bonus(&WindowExpr::Any, 0), 0.0);
}

#[test]
fn test_mss_window_without_mss_never_matches() {
    let observed = ObservedSyn::from(&meta(64, 0, 0, 0, &["mss"]));
    let breakdown = sig("*:64:0:mss*20,7:mss:df,id+:0").score_breakdown(&observed);

    assert_close(breakdown.window, 0.0);
    assert_close(breakdown.mss_bonus, 0.0);
}

#[test]
fn test_options_score() {
    let windows = set("mss,nop,ws,nop,nop,sok");
    let linux = set("mss,sok,ts,nop,ws");

    assert_close(options_score(&linux, &linux), 6.0);
    assert_close(options_score(&windows, &linux), 2.8);
    assert_close(options_score(&set("mss,ts"), &set("mss,ws")), 1.0 / 3.0);
    assert_close(options_score(&OptionSet::default(), &linux), 0.0);
    assert_close(options_score(&linux, &OptionSet::default()), 0.0);
}

#[test]
fn test_similarity_is_symmetric() {
    let layouts = ["mss", "mss,nop,ws", "sok,ts", "mss,sok,ts,nop,ws", ""];
    for a in layouts {
        for b in layouts {
            assert_close(set(a).similarity(&set(b)), set(b).similarity(&set(a)));
        }
    }
    assert_close(set("").similarity(&set("")), 1.0);
}

#[test]
fn test_empty_label_never_wins() {
    let db = Database::new(vec![
        tcp_request("", &["*:64:0:mss*20,7:mss,sok,ts,nop,ws:df,id+:0"]),
        tcp_request("weak", &["*:255:0:1,0:ts:0:0"]),
    ]);
    let matcher = SignatureMatcher::new(&db);

    assert_eq!(matcher.signature_count(), 1);
    assert_eq!(matcher.best_label(&linux_meta()), Some("weak"));
}

#[test]
fn test_first_loaded_wins_ties() {
    let raw = "*:64:0:mss*20,7:mss,sok,ts,nop,ws:df,id+:0";
    let db = Database::new(vec![
        tcp_request("first", &[raw]),
        tcp_request("second", &[raw]),
    ]);

    assert_eq!(
        SignatureMatcher::new(&db).best_label(&linux_meta()),
        Some("first")
    );
}

#[test]
fn test_strictly_higher_later_signature_wins() {
    let db = Database::new(vec![
        tcp_request("first", &["*:64:0:mss*20,10:mss,sok,ts,nop,ws:df,id+:0"]),
        tcp_request("second", &["*:64:0:mss*20,7:mss,sok,ts,nop,ws:df,id+:0"]),
    ]);

    match SignatureMatcher::new(&db).best_match(&linux_meta()) {
        Some((label, score)) => {
            assert_eq!(label, "second");
            assert_close(score, 14.0);
        }
        None => panic!("expected a match"),
    }
}

#[test]
fn test_malformed_signatures_are_skipped() {
    let db = Database::new(vec![
        tcp_request("broken", &["garbage", "4:64:0"]),
        tcp_request("mixed", &["1:2", "*:64:0:*,*:mss:df,id+:0"]),
    ]);
    let matcher = SignatureMatcher::new(&db);

    assert_eq!(matcher.signature_count(), 1);
    assert_eq!(matcher.best_label(&linux_meta()), Some("mixed"));
}

#[test]
fn test_other_sections_are_ignored() {
    let db = Database::new(vec![
        Entry::new("tcp:response", "server").with_sig("*:64:0:mss*20,7:mss,sok,ts,nop,ws:df,id+:0"),
        tcp_request("client", &["*:64:0:*:mss:0:0"]),
    ]);

    assert_eq!(
        SignatureMatcher::new(&db).best_label(&linux_meta()),
        Some("client")
    );
}

#[test]
fn test_no_candidates() {
    let db = Database::default();
    let matcher = SignatureMatcher::new(&db);

    assert_eq!(matcher.signature_count(), 0);
    assert_eq!(matcher.best_match(&linux_meta()), None);
}

#[test]
fn test_matching_is_deterministic() {
    let db = common::load_db();
    let matcher = SignatureMatcher::new(&db);
    let first = matcher.best_match(&linux_meta());

    for _ in 0..10 {
        assert_eq!(matcher.best_match(&linux_meta()), first);
    }
}
