//! Ultra-Compact primary codec, magic `ULTR`
//!
//! Serialized image layout, before whole-buffer zlib compression:
//!
//! ```text
//! "ULTR"                                   4 bytes ASCII
//! range_count                              LE32
//! asn_count                                LE32
//! per range:  start BE32,
//!             varint(end - start),
//!             varint(asn)
//! asn_count                                LE32 (repeated, must agree)
//! per ASN, ascending:
//!             varint(asn),
//!             varint(name_len),
//!             name bytes (UTF-8, no terminator)
//! ```
//!
//! `start` is big-endian so the raw bytes read in dotted-quad order; counts
//! are little-endian; varints are LEB128. Existing files depend on these
//! exact conventions.

use crate::codec;
use crate::error::Ip2AsnError;
use crate::table::RangeTable;
use crate::varint;
use std::collections::HashMap;
use std::io::Write;

/// Format magic, first four bytes of the decompressed image
pub const MAGIC: &[u8; 4] = b"ULTR";

const HEADER_LEN: usize = 12;
// BE32 start plus at least one byte each for the two varints.
const MIN_RANGE_LEN: usize = 6;

/// Serialize `table` and write the compressed bytes to `out`.
pub fn write<W: Write>(table: &RangeTable, out: &mut W) -> Result<(), Ip2AsnError> {
    let image = encode_image(table);
    let compressed = codec::deflate(&image)?;
    out.write_all(&compressed)?;
    Ok(())
}

fn encode_image(table: &RangeTable) -> Vec<u8> {
    let range_count = table.entry_count() as u32;
    let asn_count = table.names().len() as u32;

    let mut buf = Vec::with_capacity(HEADER_LEN + table.entry_count() * 8);
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&range_count.to_le_bytes());
    buf.extend_from_slice(&asn_count.to_le_bytes());

    for (start, end, asn) in table.ranges() {
        buf.extend_from_slice(&start.to_be_bytes());
        varint::encode(end - start, &mut buf);
        varint::encode(asn, &mut buf);
    }

    buf.extend_from_slice(&asn_count.to_le_bytes());
    let mut asns: Vec<u32> = table.names().keys().copied().collect();
    asns.sort_unstable();
    for asn in asns {
        let name = &table.names()[&asn];
        varint::encode(asn, &mut buf);
        varint::encode(name.len() as u32, &mut buf);
        buf.extend_from_slice(name.as_bytes());
    }
    buf
}

/// Parse a decompressed Ultra-Compact image.
pub fn parse_image(image: &[u8]) -> Result<RangeTable, Ip2AsnError> {
    if image.len() < HEADER_LEN {
        return Err(Ip2AsnError::InvalidFormat("truncated header".into()));
    }
    if &image[..4] != MAGIC {
        return Err(Ip2AsnError::InvalidFormat("bad magic, expected ULTR".into()));
    }
    let range_count = read_u32_le(image, 4) as usize;
    let asn_count = read_u32_le(image, 8) as usize;

    if range_count.saturating_mul(MIN_RANGE_LEN) > image.len() - HEADER_LEN {
        return Err(Ip2AsnError::InvalidFormat(format!(
            "claimed range count {range_count} exceeds available bytes"
        )));
    }

    let mut starts = Vec::with_capacity(range_count);
    let mut ends = Vec::with_capacity(range_count);
    let mut asns = Vec::with_capacity(range_count);
    let mut offset = HEADER_LEN;
    for _ in 0..range_count {
        if offset + 4 > image.len() {
            return Err(Ip2AsnError::InvalidFormat(
                "range entries run past the end of the buffer".into(),
            ));
        }
        let start = u32::from_be_bytes([
            image[offset],
            image[offset + 1],
            image[offset + 2],
            image[offset + 3],
        ]);
        offset += 4;
        let size = varint::decode(image, &mut offset)?;
        let asn = varint::decode(image, &mut offset)?;
        starts.push(start);
        ends.push(start.wrapping_add(size));
        asns.push(asn);
    }

    if offset + 4 > image.len() {
        return Err(Ip2AsnError::InvalidFormat(
            "missing ASN table count".into(),
        ));
    }
    let table_count = read_u32_le(image, offset) as usize;
    offset += 4;
    if table_count != asn_count {
        return Err(Ip2AsnError::InvalidFormat(format!(
            "ASN count fields disagree: header says {asn_count}, table says {table_count}"
        )));
    }

    let mut names = HashMap::with_capacity(asn_count);
    for _ in 0..asn_count {
        let asn = varint::decode(image, &mut offset)?;
        let name_len = varint::decode(image, &mut offset)? as usize;
        if offset + name_len > image.len() {
            return Err(Ip2AsnError::CorruptedData(
                "name length points past the end of the buffer".into(),
            ));
        }
        // An undecodable name is dropped; a missing name is survivable.
        if let Ok(name) = std::str::from_utf8(&image[offset..offset + name_len]) {
            names.insert(asn, name.to_string());
        }
        offset += name_len;
    }

    RangeTable::new(starts, ends, asns, names)
}

/// Inflate and parse an Ultra-Compact file.
pub fn read(bytes: &[u8]) -> Result<RangeTable, Ip2AsnError> {
    parse_image(&codec::inflate(bytes)?)
}

fn read_u32_le(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}
