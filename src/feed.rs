//! Input feed parsing
//!
//! The upstream feed is a TSV stream with five tab-separated fields per
//! line: `start_ip \t end_ip \t asn \t country_code \t org_name`. Records
//! arrive pre-sorted by `start_ip`. Lines that fail to parse are skipped
//! silently; I/O failures from the underlying reader are surfaced.

use crate::addr::parse_ipv4;
use crate::error::Ip2AsnError;
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// Longest organization name carried into a database, in bytes
pub const MAX_NAME_LEN: usize = u16::MAX as usize;

/// One feed record: an IPv4 range, its originating ASN, and the org name.
///
/// ASN `0` is a legitimate sentinel in the feed, marking ranges that are
/// not routed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeRecord {
    /// First address of the range
    pub start: u32,
    /// Last address of the range (inclusive), `start <= end`
    pub end: u32,
    /// Originating AS number
    pub asn: u32,
    /// Organization name from the feed
    pub name: String,
}

/// Parse one feed line into a record.
///
/// Returns `None` for malformed lines: wrong field count, unparseable
/// addresses or ASN, or `start > end`. The `AS` prefix on the ASN field is
/// stripped; the country code is discarded.
pub fn parse_feed_line(line: &str) -> Option<RangeRecord> {
    let mut fields = line.splitn(5, '\t');
    let start = parse_ipv4(fields.next()?)?;
    let end = parse_ipv4(fields.next()?)?;
    let asn_field = fields.next()?;
    let asn_field = asn_field.strip_prefix("AS").unwrap_or(asn_field);
    let asn: u32 = asn_field.parse().ok()?;
    let _country = fields.next()?;
    let name = fields.next()?;
    if start > end {
        return None;
    }
    Some(RangeRecord {
        start,
        end,
        asn,
        name: clamp_name(name),
    })
}

fn clamp_name(name: &str) -> String {
    if name.len() <= MAX_NAME_LEN {
        return name.to_string();
    }
    let mut cut = MAX_NAME_LEN;
    while !name.is_char_boundary(cut) {
        cut -= 1;
    }
    name[..cut].to_string()
}

/// Iterator over the records of a TSV feed.
///
/// Created by [`records`]. Malformed lines are skipped; only I/O errors are
/// yielded as `Err`.
pub struct FeedRecords<R: BufRead> {
    lines: std::io::Lines<R>,
}

impl<R: BufRead> Iterator for FeedRecords<R> {
    type Item = Result<RangeRecord, Ip2AsnError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next()? {
                Err(e) => return Some(Err(e.into())),
                Ok(line) => {
                    if let Some(record) = parse_feed_line(&line) {
                        return Some(Ok(record));
                    }
                }
            }
        }
    }
}

/// Read feed records from any buffered source.
pub fn records<R: BufRead>(reader: R) -> FeedRecords<R> {
    FeedRecords {
        lines: reader.lines(),
    }
}
