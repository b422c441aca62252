//! Database façade: load a file, look up addresses
//!
//! [`AsnDatabase`] is the single public entry point. It picks the backing
//! structure at load time (the binary-search range table for flat IPv4
//! feeds, the prefix trie for CIDR or IPv6 inputs) and presents one lookup
//! surface over both. A loaded database is immutable and `Send + Sync`;
//! share it by reference (or `Arc`) across threads without synchronization,
//! and serve updates by loading a new database and swapping the reference.

use crate::addr::{parse_ipv4, IpBits};
use crate::codec::{self, ultra, Format};
use crate::error::Ip2AsnError;
use crate::feed::RangeRecord;
use crate::table::RangeTable;
use crate::trie::{AsnEntry, PrefixTrie, TrieBuilder};
use ipnet::IpNet;
use std::io::Write;
use std::net::Ipv6Addr;
use std::path::Path;

/// An immutable, loaded IP-to-ASN database.
pub struct AsnDatabase {
    table: RangeTable,
    trie: Option<PrefixTrie>,
    format: Option<Format>,
}

impl AsnDatabase {
    /// Load a database file, choosing the codec by its magic bytes.
    ///
    /// The file handle is held only for the duration of this call.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Ip2AsnError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Parse database bytes already in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Ip2AsnError> {
        let (format, table) = codec::read_bytes(bytes)?;
        Ok(AsnDatabase {
            table,
            trie: None,
            format: Some(format),
        })
    }

    /// Build a database directly from feed records, without a file.
    pub fn from_records<I>(records: I) -> Result<Self, Ip2AsnError>
    where
        I: IntoIterator<Item = RangeRecord>,
    {
        Ok(AsnDatabase {
            table: RangeTable::from_records(records)?,
            trie: None,
            format: None,
        })
    }

    /// Build a trie-backed database from CIDR prefixes.
    ///
    /// Use this for nested prefixes (longest-prefix-match semantics), IPv6,
    /// or mixed v4/v6 tables.
    pub fn from_prefixes<I>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = (IpNet, AsnEntry)>,
    {
        let mut builder = TrieBuilder::new();
        for (net, entry) in prefixes {
            builder.insert(net, entry);
        }
        AsnDatabase {
            table: RangeTable::default(),
            trie: Some(builder.freeze()),
            format: None,
        }
    }

    /// Look up an IPv4 address by its 32-bit value.
    ///
    /// Returns the originating ASN and, when known, the organization name.
    /// The name borrows from the database and is valid for its lifetime.
    /// Never fails; addresses in uncovered gaps return `None`.
    pub fn lookup_v4(&self, ip: u32) -> Option<(u32, Option<&str>)> {
        if !self.table.is_empty() {
            return self.table.lookup(ip);
        }
        self.trie
            .as_ref()?
            .lookup(IpBits::V4(ip))
            .map(|e| (e.asn, e.name.as_deref()))
    }

    /// Look up an address given as text.
    ///
    /// IPv4 strings go through the strict dotted-quad parser and the range
    /// table; IPv6 strings go to the trie when one is present. Unparseable
    /// input returns `None`; by contract, lookup never errors.
    pub fn lookup(&self, address: &str) -> Option<(u32, Option<&str>)> {
        if let Some(ip) = parse_ipv4(address) {
            return self.lookup_v4(ip);
        }
        let v6: Ipv6Addr = address.parse().ok()?;
        self.lookup_v6(v6).map(|e| (e.asn, e.name.as_deref()))
    }

    /// Look up an IPv6 address. Delegates to the trie; `None` without one.
    pub fn lookup_v6(&self, addr: Ipv6Addr) -> Option<&AsnEntry> {
        self.trie.as_ref()?.lookup(IpBits::from(addr))
    }

    /// Number of ranges (or trie prefixes) in the database
    pub fn entry_count(&self) -> usize {
        if let Some(trie) = &self.trie {
            if self.table.is_empty() {
                return trie.prefix_count();
            }
        }
        self.table.entry_count()
    }

    /// Number of distinct ASNs across all ranges (or trie prefixes)
    pub fn unique_asn_count(&self) -> usize {
        if let Some(trie) = &self.trie {
            if self.table.is_empty() {
                return trie.unique_asn_count();
            }
        }
        self.table.unique_asn_count()
    }

    /// The on-disk format this database was loaded from, when it came from
    /// serialized bytes
    pub fn format(&self) -> Option<Format> {
        self.format
    }

    /// Borrow the backing range table.
    pub fn table(&self) -> &RangeTable {
        &self.table
    }
}

/// Build the primary-format database file from a record stream.
///
/// Records must arrive sorted by start address; overlapping or unsorted
/// input fails with [`Ip2AsnError::CorruptedData`].
pub fn build_ultra_compact<I, W>(records: I, out: &mut W) -> Result<(), Ip2AsnError>
where
    I: IntoIterator<Item = RangeRecord>,
    W: Write,
{
    let table = RangeTable::from_records(records)?;
    ultra::write(&table, out)
}
