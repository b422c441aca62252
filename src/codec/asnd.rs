//! Fixed-width IPv4-only codec, magic `ASND`
//!
//! Little-endian throughout and never compressed. Header: LE32 magic, LE32
//! version, LE32 entry_count, LE32 string_table_offset. Entries are (LE32
//! start, LE32 end, LE32 asn_packed); the top 8 bits of `asn_packed` are
//! reserved (zero on write, masked off on read), which caps this format at
//! 24-bit ASNs. The string table is a LE32 count followed by (LE32 asn,
//! LE16 name_len, UTF-8 bytes) entries.

use crate::error::Ip2AsnError;
use crate::table::RangeTable;
use std::collections::HashMap;
use std::io::Write;

/// Format magic, stored little-endian (file begins `44 4E 53 41`)
pub const MAGIC: u32 = 0x4153_4e44;

/// Newest version this build reads and the version it writes
pub const VERSION: u32 = 1;

const ASN_MASK: u32 = 0x00ff_ffff;
const HEADER_LEN: usize = 16;
const ENTRY_LEN: usize = 12;

/// Serialize `table` and write it to `out`.
///
/// Fails with [`Ip2AsnError::InvalidFormat`] when a range carries an ASN
/// that does not fit the format's 24-bit field.
pub fn write<W: Write>(table: &RangeTable, out: &mut W) -> Result<(), Ip2AsnError> {
    let image = encode_image(table)?;
    out.write_all(&image)?;
    Ok(())
}

fn encode_image(table: &RangeTable) -> Result<Vec<u8>, Ip2AsnError> {
    let table_offset = (HEADER_LEN + table.entry_count() * ENTRY_LEN) as u32;

    let mut buf = Vec::with_capacity(table_offset as usize + 4);
    buf.extend_from_slice(&MAGIC.to_le_bytes());
    buf.extend_from_slice(&VERSION.to_le_bytes());
    buf.extend_from_slice(&(table.entry_count() as u32).to_le_bytes());
    buf.extend_from_slice(&table_offset.to_le_bytes());

    for (start, end, asn) in table.ranges() {
        if asn & !ASN_MASK != 0 {
            return Err(Ip2AsnError::InvalidFormat(format!(
                "ASN {asn} does not fit the 24-bit ASND field"
            )));
        }
        buf.extend_from_slice(&start.to_le_bytes());
        buf.extend_from_slice(&end.to_le_bytes());
        buf.extend_from_slice(&asn.to_le_bytes());
    }

    let mut asns: Vec<u32> = table.names().keys().copied().collect();
    asns.sort_unstable();
    buf.extend_from_slice(&(asns.len() as u32).to_le_bytes());
    for asn in asns {
        let name = &table.names()[&asn];
        buf.extend_from_slice(&asn.to_le_bytes());
        buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
        buf.extend_from_slice(name.as_bytes());
    }
    Ok(buf)
}

/// Parse an ASND image.
pub fn parse_image(image: &[u8]) -> Result<RangeTable, Ip2AsnError> {
    if image.len() < HEADER_LEN {
        return Err(Ip2AsnError::InvalidFormat("truncated header".into()));
    }
    if read_u32_le(image, 0) != MAGIC {
        return Err(Ip2AsnError::InvalidFormat("bad magic, expected ASND".into()));
    }
    let version = read_u32_le(image, 4);
    if version > VERSION {
        return Err(Ip2AsnError::UnsupportedVersion {
            found: version,
            supported: VERSION,
        });
    }
    let entry_count = read_u32_le(image, 8) as usize;
    let table_offset = read_u32_le(image, 12) as usize;

    let entries_end = HEADER_LEN + entry_count.saturating_mul(ENTRY_LEN);
    if entries_end > image.len() {
        return Err(Ip2AsnError::InvalidFormat(format!(
            "claimed entry count {entry_count} exceeds available bytes"
        )));
    }
    if table_offset < entries_end || table_offset + 4 > image.len() {
        return Err(Ip2AsnError::InvalidFormat(format!(
            "string table offset {table_offset} is inconsistent with the header"
        )));
    }

    let mut starts = Vec::with_capacity(entry_count);
    let mut ends = Vec::with_capacity(entry_count);
    let mut asns = Vec::with_capacity(entry_count);
    for i in 0..entry_count {
        let base = HEADER_LEN + i * ENTRY_LEN;
        starts.push(read_u32_le(image, base));
        ends.push(read_u32_le(image, base + 4));
        asns.push(read_u32_le(image, base + 8) & ASN_MASK);
    }

    let name_count = read_u32_le(image, table_offset) as usize;
    let mut names = HashMap::with_capacity(name_count);
    let mut offset = table_offset + 4;
    for _ in 0..name_count {
        if offset + 6 > image.len() {
            return Err(Ip2AsnError::CorruptedData(
                "string table entry runs past the end of the buffer".into(),
            ));
        }
        let asn = read_u32_le(image, offset);
        let name_len = u16::from_le_bytes([image[offset + 4], image[offset + 5]]) as usize;
        offset += 6;
        if offset + name_len > image.len() {
            return Err(Ip2AsnError::CorruptedData(
                "name length points past the end of the buffer".into(),
            ));
        }
        if let Ok(name) = std::str::from_utf8(&image[offset..offset + name_len]) {
            names.insert(asn, name.to_string());
        }
        offset += name_len;
    }

    RangeTable::new(starts, ends, asns, names)
}

fn read_u32_le(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}
