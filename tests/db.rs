use p0f_syn::db::TCP_REQUEST;
use p0f_syn::{Database, Entry, P0fSynError};
use std::fs;

mod common;
use common::load_db;

fn parse(content: &str) -> Database {
    match content.parse() {
        Ok(db) => db,
        Err(e) => panic!("Failed to parse database: {e}"),
    }
}

#[test]
fn test_load_default() {
    let db = load_db();

    assert!(db.tcp_request().count() > 10);
    assert!(db.entries().iter().any(|e| e.section == "http:response"));
    assert!(db.entries().iter().any(|e| e.section == "mtu"));
    assert!(db
        .tcp_request()
        .all(|e| !e.label.is_empty() && !e.sig.is_empty()));
}

#[test]
fn test_default_keeps_file_order() {
    let db = load_db();
    let labels: Vec<&str> = db.tcp_request().map(|e| e.label.as_str()).collect();

    assert_eq!(labels.first(), Some(&"s:unix:Linux:3.11 and newer"));
    let mac = labels.iter().position(|l| l.starts_with("s:unix:MacOS X"));
    let freebsd = labels.iter().position(|l| l.starts_with("s:unix:FreeBSD:9"));
    match (mac, freebsd) {
        (Some(mac), Some(freebsd)) => assert!(mac < freebsd),
        _ => panic!("bundled database lacks the Apple or FreeBSD entries"),
    }
}

#[test]
fn test_parse_entries() {
    let db = parse(
        r#"
; comment
[tcp:request]

label = s:unix:Linux:3.11 and newer
sys   = unix
sig   = *:64:0:mss*20,10:mss,sok,ts,nop,ws:df,id+:0
sig   = *:64:0:mss*20,7:mss,sok,ts,nop,ws:df,id+:0

  label=s:win:Windows:7 or 8
  sig=*:128:0:8192,8:mss,nop,ws,nop,nop,sok:df,id+:0

[http:response]
label = s:!:nginx:1.x
sig   = 1:Server,Date::nginx
"#,
    );

    assert_eq!(
        db.entries(),
        &[
            Entry::new(TCP_REQUEST, "s:unix:Linux:3.11 and newer")
                .with_sys("unix")
                .with_sig("*:64:0:mss*20,10:mss,sok,ts,nop,ws:df,id+:0")
                .with_sig("*:64:0:mss*20,7:mss,sok,ts,nop,ws:df,id+:0"),
            Entry::new(TCP_REQUEST, "s:win:Windows:7 or 8")
                .with_sig("*:128:0:8192,8:mss,nop,ws,nop,nop,sok:df,id+:0"),
            Entry::new("http:response", "s:!:nginx:1.x").with_sig("1:Server,Date::nginx"),
        ]
    );
    assert_eq!(db.tcp_request().count(), 2);
}

#[test]
fn test_entries_before_any_section() {
    let db = parse("label = orphan\nsig = *:64:0:*:mss:0:0\n");

    assert_eq!(db.len(), 1);
    assert_eq!(db.entries()[0].section, "");
    assert_eq!(db.tcp_request().count(), 0);
}

#[test]
fn test_unknown_keys_are_skipped() {
    let db = parse("[tcp:request]\nlabel = a\nclassic = 1\nsig = *:64:0:*:mss:0:0\n");

    assert_eq!(
        db.entries(),
        &[Entry::new(TCP_REQUEST, "a").with_sig("*:64:0:*:mss:0:0")]
    );
}

#[test]
fn test_unlabelled_entries_are_dropped() {
    let db = parse("[tcp:request]\nlabel =\nsig = *:64:0:*:mss:0:0\nlabel = b\nsig = *:128:0:*:mss:0:0\n");

    assert_eq!(db.len(), 1);
    assert_eq!(db.entries()[0].label, "b");
}

#[test]
fn test_parse_errors() {
    for content in [
        "[tcp:request]\nthis line has no separator\n",
        "[tcp:request]\n= value without key\n",
        "[tcp:request]\nsig = *:64:0:*:mss:0:0\n",
        "[tcp:request]\nsys = unix\nlabel = late\n",
    ] {
        match content.parse::<Database>() {
            Err(P0fSynError::Parse(msg)) => assert!(msg.starts_with("line 2"), "{msg}"),
            other => panic!("expected parse error for {content:?}, got {other:?}"),
        }
    }
}

#[test]
fn test_load_from_file() {
    let path = std::env::temp_dir().join(format!("p0f-syn-db-{}.fp", std::process::id()));
    if let Err(e) = fs::write(&path, "[tcp:request]\nlabel = file\nsig = *:64:0:*:mss:0:0\n") {
        panic!("Failed to write {}: {e}", path.display());
    }

    let loaded = Database::load_from_file(&path);
    let _ = fs::remove_file(&path);

    match loaded {
        Ok(db) => assert_eq!(db.tcp_request().map(|e| e.label.as_str()).collect::<Vec<_>>(), ["file"]),
        Err(e) => panic!("Failed to load database: {e}"),
    }
}

#[test]
fn test_load_missing_file() {
    match Database::load_from_file("/nonexistent/p0f-syn/p0f.fp") {
        Err(P0fSynError::Io(_)) => {}
        other => panic!("expected an I/O error, got {other:?}"),
    }
}
