//! Integration tests for the ip2asn library
//!
//! Exercises the full pipeline: feed parsing, database build, on-disk
//! round-trips, and the lookup contract.

use ip2asn::{build_ultra_compact, format_ipv4, parse_ipv4, AsnDatabase, RangeRecord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn record(start: &str, end: &str, asn: u32, name: &str) -> RangeRecord {
    RangeRecord {
        start: parse_ipv4(start).unwrap(),
        end: parse_ipv4(end).unwrap(),
        asn,
        name: name.to_string(),
    }
}

fn roundtrip(records: Vec<RangeRecord>) -> AsnDatabase {
    let mut bytes = Vec::new();
    build_ultra_compact(records, &mut bytes).unwrap();
    AsnDatabase::from_bytes(&bytes).unwrap()
}

#[test]
fn test_google_dns() {
    let db = roundtrip(vec![record("8.8.8.0", "8.8.8.255", 15169, "GOOGLE")]);
    assert_eq!(db.lookup("8.8.8.8"), Some((15169, Some("GOOGLE"))));
}

#[test]
fn test_cloudflare_dns() {
    let db = roundtrip(vec![record("1.1.1.0", "1.1.1.255", 13335, "CLOUDFLARENET")]);
    assert_eq!(db.lookup("1.1.1.1"), Some((13335, Some("CLOUDFLARENET"))));
}

#[test]
fn test_adjacent_ranges_and_gap() {
    let db = roundtrip(vec![
        record("140.82.0.0", "140.82.63.255", 20473, "VULTR"),
        record("140.82.112.0", "140.82.127.255", 36459, "GITHUB"),
    ]);
    assert_eq!(db.lookup("140.82.121.3"), Some((36459, Some("GITHUB"))));
    assert_eq!(db.lookup("140.82.80.1"), None);
    assert_eq!(db.lookup("140.82.0.1"), Some((20473, Some("VULTR"))));
}

#[test]
fn test_single_range_boundaries() {
    let db = roundtrip(vec![record("10.0.0.0", "10.0.0.255", 64512, "PRIVATE")]);
    assert_eq!(db.lookup("10.0.0.0").map(|r| r.0), Some(64512));
    assert_eq!(db.lookup("10.0.0.255").map(|r| r.0), Some(64512));
    assert_eq!(db.lookup("9.255.255.255"), None);
    assert_eq!(db.lookup("10.0.1.0"), None);
}

#[test]
fn test_unparseable_input_returns_none() {
    let db = roundtrip(vec![record("8.8.8.0", "8.8.8.255", 15169, "GOOGLE")]);
    assert_eq!(db.lookup("256.0.0.0"), None);
    assert_eq!(db.lookup("not an ip"), None);
    assert_eq!(db.lookup("8.8.8"), None);
    assert_eq!(db.lookup("8.8.8.8.8"), None);
}

/// Generate `count` disjoint ranges with ASNs drawn from `1..=asn_space`.
fn synthetic_records(count: usize, asn_space: u32, seed: u64) -> Vec<RangeRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut records = Vec::with_capacity(count);
    let mut cursor: u32 = 0;
    for _ in 0..count {
        let start = cursor + rng.gen_range(1..100);
        let end = start + rng.gen_range(0..1000);
        let asn = rng.gen_range(1..=asn_space);
        records.push(RangeRecord {
            start,
            end,
            asn,
            name: format!("ORG-{asn}"),
        });
        cursor = end;
    }
    records
}

#[test]
fn test_synthetic_feed_roundtrip() {
    let records = synthetic_records(10_000, 1_000, 42);
    let db = roundtrip(records.clone());

    assert_eq!(db.entry_count(), 10_000);
    for rec in &records {
        let midpoint = rec.start + (rec.end - rec.start) / 2;
        let (asn, name) = db
            .lookup_v4(midpoint)
            .unwrap_or_else(|| panic!("no hit for {}", format_ipv4(midpoint)));
        assert_eq!(asn, rec.asn);
        assert_eq!(name, Some(rec.name.as_str()));
    }
}

#[test]
fn test_loaded_database_invariants() {
    let mut bytes = Vec::new();
    build_ultra_compact(synthetic_records(5_000, 800, 7), &mut bytes).unwrap();
    let db = AsnDatabase::from_bytes(&bytes).unwrap();

    let rows: Vec<(u32, u32, u32)> = db.table().ranges().collect();
    for (i, &(start, end, asn)) in rows.iter().enumerate() {
        // Range well-formedness and sortedness/disjointness.
        assert!(start <= end, "inverted range at {i}");
        if i > 0 {
            assert!(rows[i - 1].0 <= start, "unsorted at {i}");
            assert!(rows[i - 1].1 < start, "overlap at {i}");
        }
        // Endpoint coverage.
        assert_eq!(db.lookup_v4(start).map(|r| r.0), Some(asn));
        assert_eq!(db.lookup_v4(end).map(|r| r.0), Some(asn));
        // Gap behavior, sampled just past each range that has a gap after it.
        if i + 1 < rows.len() && end + 1 < rows[i + 1].0 {
            assert_eq!(db.lookup_v4(end + 1), None, "gap miss at {i}");
        }
    }
}

#[test]
fn test_load_is_idempotent() {
    let mut bytes = Vec::new();
    build_ultra_compact(synthetic_records(2_000, 300, 99), &mut bytes).unwrap();

    let first = AsnDatabase::from_bytes(&bytes).unwrap();
    let second = AsnDatabase::from_bytes(&bytes).unwrap();
    assert_eq!(first.entry_count(), second.entry_count());
    assert_eq!(first.unique_asn_count(), second.unique_asn_count());

    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..10_000 {
        let ip: u32 = rng.gen();
        assert_eq!(first.lookup_v4(ip), second.lookup_v4(ip));
    }
}

#[test]
fn test_feed_to_database_pipeline() {
    let feed = "1.1.1.0\t1.1.1.255\t13335\tUS\tCLOUDFLARENET\n\
                8.8.8.0\t8.8.8.255\tAS15169\tUS\tGOOGLE\n\
                bad line that gets skipped\n\
                9.9.9.0\t9.9.9.255\t19281\tCH\tQUAD9";
    let records: Vec<RangeRecord> = ip2asn::feed::records(feed.as_bytes())
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(records.len(), 3);

    let db = roundtrip(records);
    assert_eq!(db.lookup("8.8.8.8"), Some((15169, Some("GOOGLE"))));
    assert_eq!(db.lookup("9.9.9.9"), Some((19281, Some("QUAD9"))));
    assert_eq!(db.unique_asn_count(), 3);
}

#[test]
fn test_parse_format_roundtrip_sweep() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..10_000 {
        let ip: u32 = rng.gen();
        assert_eq!(parse_ipv4(&format_ipv4(ip)), Some(ip));
    }
}
