//! On-disk codecs and format detection
//!
//! Four formats are supported. The primary Ultra-Compact format and the
//! delta-encoded IP2A format are whole-file zlib streams, so their magic is
//! only visible after inflation; ASN2 and ASND carry their magic in the
//! clear (ASN2 optionally compresses the whole image, header included).
//! [`read_bytes`] sniffs raw magics first, then attempts one inflation and
//! dispatches on the inner magic.

pub mod asn2;
pub mod asnd;
pub mod ip2a;
pub mod ultra;

use crate::error::Ip2AsnError;
use crate::table::RangeTable;
use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use std::io::Write;

/// Identifies which codec a database file was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Primary format, magic `ULTR`
    UltraCompact,
    /// Delta-encoded secondary format, magic `IP2A`
    Ip2a,
    /// Fixed-width big-endian format, magic `ASN2`
    Asn2,
    /// Fixed-width little-endian format, magic `ASND`
    Asnd,
}

impl Format {
    /// Human-readable format name
    pub fn name(&self) -> &'static str {
        match self {
            Format::UltraCompact => "ultra-compact",
            Format::Ip2a => "ip2a",
            Format::Asn2 => "asn2",
            Format::Asnd => "asnd",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse database bytes, choosing the codec by magic.
///
/// Unrecognizable input fails with [`Ip2AsnError::InvalidFormat`]; a zlib
/// stream that cannot be inflated fails with
/// [`Ip2AsnError::DecompressionFailed`].
pub fn read_bytes(bytes: &[u8]) -> Result<(Format, RangeTable), Ip2AsnError> {
    if bytes.len() >= 4 {
        if bytes[..4] == asn2::MAGIC.to_be_bytes() {
            return Ok((Format::Asn2, asn2::parse_image(bytes)?));
        }
        if bytes[..4] == asnd::MAGIC.to_le_bytes() {
            return Ok((Format::Asnd, asnd::parse_image(bytes)?));
        }
    }
    if !looks_like_zlib(bytes) {
        return Err(Ip2AsnError::InvalidFormat(
            "magic bytes match no recognized codec".into(),
        ));
    }
    let image = inflate(bytes)?;
    if image.len() >= 4 {
        if &image[..4] == ultra::MAGIC {
            return Ok((Format::UltraCompact, ultra::parse_image(&image)?));
        }
        if &image[..4] == ip2a::MAGIC {
            return Ok((Format::Ip2a, ip2a::parse_image(&image)?));
        }
        if image[..4] == asn2::MAGIC.to_be_bytes() {
            return Ok((Format::Asn2, asn2::parse_image(&image)?));
        }
    }
    Err(Ip2AsnError::InvalidFormat(
        "magic bytes match no recognized codec".into(),
    ))
}

/// Quick zlib-header plausibility check: deflate method plus a valid
/// header checksum.
fn looks_like_zlib(bytes: &[u8]) -> bool {
    if bytes.len() < 2 {
        return false;
    }
    bytes[0] & 0x0f == 8 && u16::from_be_bytes([bytes[0], bytes[1]]) % 31 == 0
}

/// Compress a serialized image with zlib.
pub(crate) fn deflate(image: &[u8]) -> Result<Vec<u8>, Ip2AsnError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(image)?;
    Ok(encoder.finish()?)
}

/// Inflate a whole-file zlib stream.
///
/// The decompressed size is unknown up front: start at eight times the
/// compressed size and double, restarting, up to three attempts before
/// giving up with [`Ip2AsnError::DecompressionFailed`].
pub(crate) fn inflate(bytes: &[u8]) -> Result<Vec<u8>, Ip2AsnError> {
    let mut capacity = bytes.len().saturating_mul(8).max(64);
    for _ in 0..3 {
        let mut out = Vec::with_capacity(capacity);
        let mut stream = Decompress::new(true);
        match stream.decompress_vec(bytes, &mut out, FlushDecompress::Finish) {
            Ok(Status::StreamEnd) => return Ok(out),
            Ok(_) => capacity = capacity.saturating_mul(2),
            Err(_) => return Err(Ip2AsnError::DecompressionFailed),
        }
    }
    Err(Ip2AsnError::DecompressionFailed)
}
