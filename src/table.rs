//! Immutable range table backing IPv4 lookups
//!
//! The table holds three parallel arrays sorted by range start, plus a map
//! from ASN to organization name. It is built once, validated on
//! construction, and never mutated afterwards; concurrent readers share it
//! without synchronization.

use crate::error::Ip2AsnError;
use crate::feed::RangeRecord;
use std::collections::HashMap;

/// Immutable IPv4 range database: `(start, end, asn)` rows plus ASN names.
///
/// Invariants, verified at construction:
/// - `starts` is sorted ascending
/// - `starts[i] <= ends[i]` for every row
/// - rows are disjoint: `ends[i-1] < starts[i]`
///
/// Name lookups borrow from storage owned by the table; the returned `&str`
/// is valid for the table's lifetime.
#[derive(Debug, Default)]
pub struct RangeTable {
    starts: Vec<u32>,
    ends: Vec<u32>,
    asns: Vec<u32>,
    names: HashMap<u32, String>,
    unique_asns: usize,
}

impl RangeTable {
    /// Assemble a table from pre-built parallel arrays and a name map.
    ///
    /// Fails with [`Ip2AsnError::CorruptedData`] when the arrays disagree in
    /// length, a range is inverted, or ranges are unsorted or overlapping.
    pub fn new(
        starts: Vec<u32>,
        ends: Vec<u32>,
        asns: Vec<u32>,
        names: HashMap<u32, String>,
    ) -> Result<Self, Ip2AsnError> {
        if starts.len() != ends.len() || starts.len() != asns.len() {
            return Err(Ip2AsnError::CorruptedData(format!(
                "mismatched array lengths: {} starts, {} ends, {} asns",
                starts.len(),
                ends.len(),
                asns.len()
            )));
        }
        for i in 0..starts.len() {
            if starts[i] > ends[i] {
                return Err(Ip2AsnError::CorruptedData(format!(
                    "inverted range at row {i}: {} > {}",
                    starts[i], ends[i]
                )));
            }
            if i > 0 && ends[i - 1] >= starts[i] {
                return Err(Ip2AsnError::CorruptedData(format!(
                    "ranges out of order or overlapping at row {i}"
                )));
            }
        }
        let unique_asns = {
            let mut sorted = asns.clone();
            sorted.sort_unstable();
            sorted.dedup();
            sorted.len()
        };
        Ok(Self {
            starts,
            ends,
            asns,
            names,
            unique_asns,
        })
    }

    /// Build a table from feed records, already sorted by start address.
    ///
    /// The name map keeps the first name seen for each ASN.
    pub fn from_records<I>(records: I) -> Result<Self, Ip2AsnError>
    where
        I: IntoIterator<Item = RangeRecord>,
    {
        let mut starts = Vec::new();
        let mut ends = Vec::new();
        let mut asns = Vec::new();
        let mut names: HashMap<u32, String> = HashMap::new();
        for record in records {
            starts.push(record.start);
            ends.push(record.end);
            asns.push(record.asn);
            names.entry(record.asn).or_insert(record.name);
        }
        Self::new(starts, ends, asns, names)
    }

    /// Find the range containing `ip`.
    ///
    /// Returns the ASN and, when the name table knows it, the organization
    /// name. Addresses falling in a gap between ranges return `None`. Never
    /// fails.
    pub fn lookup(&self, ip: u32) -> Option<(u32, Option<&str>)> {
        let idx = self.starts.partition_point(|&start| start <= ip);
        if idx == 0 {
            return None;
        }
        let i = idx - 1;
        if ip > self.ends[i] {
            return None;
        }
        let asn = self.asns[i];
        Some((asn, self.names.get(&asn).map(String::as_str)))
    }

    /// Number of ranges in the table
    pub fn entry_count(&self) -> usize {
        self.starts.len()
    }

    /// Number of distinct ASNs across all ranges
    pub fn unique_asn_count(&self) -> usize {
        self.unique_asns
    }

    /// Whether the table holds no ranges
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Iterate the `(start, end, asn)` rows in start order.
    pub fn ranges(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        (0..self.starts.len()).map(move |i| (self.starts[i], self.ends[i], self.asns[i]))
    }

    /// The ASN-to-name map
    pub fn names(&self) -> &HashMap<u32, String> {
        &self.names
    }
}
