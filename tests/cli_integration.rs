//! Integration tests for the ip2asn command-line interface

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

const FEED: &str = "1.1.1.0\t1.1.1.255\t13335\tUS\tCLOUDFLARENET\n\
8.8.8.0\t8.8.8.255\tAS15169\tUS\tGOOGLE\n\
not a valid line\n\
9.9.9.0\t9.9.9.255\t19281\tCH\tQUAD9\n";

fn write_feed(dir: &Path) -> std::path::PathBuf {
    let feed_path = dir.join("feed.tsv");
    fs::write(&feed_path, FEED).unwrap();
    feed_path
}

fn build_db(dir: &Path, format: &str) -> std::path::PathBuf {
    let feed_path = write_feed(dir);
    let db_path = dir.join(format!("test.{format}.db"));
    Command::cargo_bin("ip2asn")
        .unwrap()
        .args([
            "build",
            feed_path.to_str().unwrap(),
            db_path.to_str().unwrap(),
            "--format",
            format,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 ranges"));
    db_path
}

#[test]
fn test_build_and_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = build_db(dir.path(), "ultra");

    Command::cargo_bin("ip2asn")
        .unwrap()
        .args(["lookup", db_path.to_str().unwrap(), "8.8.8.8"])
        .assert()
        .success()
        .stdout(predicate::str::contains("AS15169"))
        .stdout(predicate::str::contains("GOOGLE"));
}

#[test]
fn test_lookup_miss_and_invalid_input() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = build_db(dir.path(), "ultra");

    Command::cargo_bin("ip2asn")
        .unwrap()
        .args([
            "lookup",
            db_path.to_str().unwrap(),
            "5.5.5.5",
            "not-an-ip",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("5.5.5.5\t-"))
        .stdout(predicate::str::contains("not-an-ip\t-"));
}

#[test]
fn test_lookup_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = build_db(dir.path(), "ultra");

    let output = Command::cargo_bin("ip2asn")
        .unwrap()
        .args([
            "lookup",
            db_path.to_str().unwrap(),
            "--json",
            "1.1.1.1",
            "4.4.4.4",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let results = parsed.as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["asn"], 13335);
    assert_eq!(results[0]["name"], "CLOUDFLARENET");
    assert!(results[1]["asn"].is_null());
}

#[test]
fn test_info_reports_counts_and_format() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = build_db(dir.path(), "ultra");

    Command::cargo_bin("ip2asn")
        .unwrap()
        .args(["info", db_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("ultra-compact"))
        .stdout(predicate::str::contains("ranges:      3"))
        .stdout(predicate::str::contains("unique ASNs: 3"));
}

#[test]
fn test_every_format_roundtrips_through_cli() {
    let dir = tempfile::tempdir().unwrap();
    for format in ["ultra", "ip2a", "asn2", "asnd"] {
        let db_path = build_db(dir.path(), format);
        Command::cargo_bin("ip2asn")
            .unwrap()
            .args(["lookup", db_path.to_str().unwrap(), "9.9.9.9"])
            .assert()
            .success()
            .stdout(predicate::str::contains("AS19281"));
    }
}

#[test]
fn test_load_rejects_garbage_file() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("bogus.db");
    fs::write(&bogus, b"this is not a database").unwrap();

    Command::cargo_bin("ip2asn")
        .unwrap()
        .args(["lookup", bogus.to_str().unwrap(), "8.8.8.8"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot load"));
}

#[test]
fn test_build_rejects_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("out.db");
    Command::cargo_bin("ip2asn")
        .unwrap()
        .args([
            "build",
            dir.path().join("missing.tsv").to_str().unwrap(),
            db_path.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot open feed"));
}
