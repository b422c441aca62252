//! Delta-encoded secondary codec, magic `IP2A`
//!
//! Image layout before zlib compression: magic, LE32 version, LE32 count,
//! then per range `varint(start - prev_start)`, `varint(end - start)`,
//! `varint(asn)` with `prev_start = 0` for the first record. There is no
//! name table; lookups through this format yield `name = None`.

use crate::codec;
use crate::error::Ip2AsnError;
use crate::table::RangeTable;
use crate::varint;
use std::collections::HashMap;
use std::io::Write;

/// Format magic, first four bytes of the decompressed image
pub const MAGIC: &[u8; 4] = b"IP2A";

/// Newest version this build reads and the version it writes
pub const VERSION: u32 = 1;

const HEADER_LEN: usize = 12;
// Three varints of at least one byte each.
const MIN_RANGE_LEN: usize = 3;

/// Serialize `table` (ranges only) and write the compressed bytes to `out`.
pub fn write<W: Write>(table: &RangeTable, out: &mut W) -> Result<(), Ip2AsnError> {
    let image = encode_image(table);
    let compressed = codec::deflate(&image)?;
    out.write_all(&compressed)?;
    Ok(())
}

fn encode_image(table: &RangeTable) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + table.entry_count() * 6);
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&VERSION.to_le_bytes());
    buf.extend_from_slice(&(table.entry_count() as u32).to_le_bytes());

    let mut prev_start = 0u32;
    for (start, end, asn) in table.ranges() {
        varint::encode(start - prev_start, &mut buf);
        varint::encode(end - start, &mut buf);
        varint::encode(asn, &mut buf);
        prev_start = start;
    }
    buf
}

/// Parse a decompressed IP2A image.
pub fn parse_image(image: &[u8]) -> Result<RangeTable, Ip2AsnError> {
    if image.len() < HEADER_LEN {
        return Err(Ip2AsnError::InvalidFormat("truncated header".into()));
    }
    if &image[..4] != MAGIC {
        return Err(Ip2AsnError::InvalidFormat("bad magic, expected IP2A".into()));
    }
    let version = u32::from_le_bytes([image[4], image[5], image[6], image[7]]);
    if version > VERSION {
        return Err(Ip2AsnError::UnsupportedVersion {
            found: version,
            supported: VERSION,
        });
    }
    let count = u32::from_le_bytes([image[8], image[9], image[10], image[11]]) as usize;
    if count.saturating_mul(MIN_RANGE_LEN) > image.len() - HEADER_LEN {
        return Err(Ip2AsnError::InvalidFormat(format!(
            "claimed range count {count} exceeds available bytes"
        )));
    }

    let mut starts = Vec::with_capacity(count);
    let mut ends = Vec::with_capacity(count);
    let mut asns = Vec::with_capacity(count);
    let mut offset = HEADER_LEN;
    let mut prev_start = 0u32;
    for _ in 0..count {
        let delta = varint::decode(image, &mut offset)?;
        let size = varint::decode(image, &mut offset)?;
        let asn = varint::decode(image, &mut offset)?;
        let start = prev_start.wrapping_add(delta);
        starts.push(start);
        ends.push(start.wrapping_add(size));
        asns.push(asn);
        prev_start = start;
    }

    RangeTable::new(starts, ends, asns, HashMap::new())
}

/// Inflate and parse an IP2A file.
pub fn read(bytes: &[u8]) -> Result<RangeTable, Ip2AsnError> {
    parse_image(&codec::inflate(bytes)?)
}
