//! ip2asn - offline IP-to-ASN lookup
//!
//! This library answers "which Autonomous System originates the prefix that
//! contains IP address X?" from a compact on-disk database, entirely
//! offline: no BGP, no WHOIS, no network at all. A loaded database serves
//! point lookups in microseconds via binary search over immutable range
//! arrays, with a prefix trie as the alternative path for CIDR and IPv6
//! workloads.
//!
//! # Features
//!
//! - **Compact storage**: the primary Ultra-Compact format fits a full
//!   global feed (~500k ranges, ~80k ASNs) in roughly 3.5 MB
//! - **Four on-disk formats**: Ultra-Compact (`ULTR`), delta-encoded
//!   (`IP2A`), and two fixed-width layouts (`ASN2`, `ASND`), detected by
//!   magic at load time
//! - **Immutable databases**: lock-free concurrent lookups; update by
//!   loading a fresh database and swapping the reference
//! - **Longest-prefix match**: a build-then-freeze binary trie for nested
//!   CIDR prefixes and IPv6
//!
//! # Quick Start
//!
//! ```
//! use ip2asn::{build_ultra_compact, AsnDatabase, RangeRecord};
//!
//! # fn main() -> Result<(), ip2asn::Ip2AsnError> {
//! let records = vec![RangeRecord {
//!     start: u32::from(std::net::Ipv4Addr::new(8, 8, 8, 0)),
//!     end: u32::from(std::net::Ipv4Addr::new(8, 8, 8, 255)),
//!     asn: 15169,
//!     name: "GOOGLE".to_string(),
//! }];
//!
//! let mut bytes = Vec::new();
//! build_ultra_compact(records, &mut bytes)?;
//!
//! let db = AsnDatabase::from_bytes(&bytes)?;
//! assert_eq!(db.lookup("8.8.8.8"), Some((15169, Some("GOOGLE"))));
//! assert_eq!(db.lookup("9.9.9.9"), None);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`addr`]: strict IPv4 text handling and the bit-addressable address value
//! - [`varint`]: the LEB128 integer codec shared by the on-disk formats
//! - [`feed`]: TSV input feed parsing
//! - [`table`]: the immutable binary-search range table
//! - [`codec`]: on-disk formats and magic-based detection
//! - [`trie`]: the longest-prefix-match trie for CIDR/IPv6 inputs
//! - [`db`]: the [`AsnDatabase`] façade tying it together

#![allow(clippy::uninlined_format_args)]

pub mod addr;
pub mod codec;
pub mod db;
pub mod error;
pub mod feed;
pub mod table;
pub mod trie;
pub mod varint;

// Re-export core types for library users
pub use addr::{format_ipv4, parse_ipv4, IpBits};
pub use codec::Format;
pub use db::{build_ultra_compact, AsnDatabase};
pub use error::Ip2AsnError;
pub use feed::RangeRecord;
pub use table::RangeTable;
pub use trie::{AsnEntry, PrefixTrie, TrieBuilder};
