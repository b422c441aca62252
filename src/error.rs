//! Error types for database build and load operations

use thiserror::Error;

/// Errors that can occur while building or loading an ASN database
///
/// Lookups never produce these: an unparseable address string yields `None`
/// by API contract, and a lookup by `u32` cannot fail.
#[derive(Debug, Error)]
pub enum Ip2AsnError {
    /// An IPv4 or IPv6 string failed to parse
    #[error("invalid IP address: {0}")]
    InvalidAddress(String),

    /// Magic bytes match no recognized codec, or header fields are
    /// self-inconsistent (e.g. claimed counts exceed the available bytes)
    #[error("invalid database format: {0}")]
    InvalidFormat(String),

    /// The header was recognized but the record or name data is undecodable
    #[error("corrupted data: {0}")]
    CorruptedData(String),

    /// The file's version field is newer than this reader understands
    #[error("unsupported format version {found} (newest supported is {supported})")]
    UnsupportedVersion {
        /// Version found in the file header
        found: u32,
        /// Newest version this build can parse
        supported: u32,
    },

    /// Zlib produced no usable output within the retry budget
    #[error("zlib decompression failed")]
    DecompressionFailed,

    /// Pass-through failure from the byte source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
