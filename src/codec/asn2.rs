//! Fixed-width secondary codec, magic `ASN2`
//!
//! Big-endian throughout. Header: BE32 magic, BE16 version, BE16 flags
//! (bit 0 = compressed), BE32 range_count, BE32 asn_table_offset. Ranges
//! follow as (BE32 start, BE32 end, BE32 asn) rows; the ASN table at the
//! stated offset is a BE32 count followed by (BE32 asn, BE16 name_len,
//! UTF-8 bytes) entries. When the compressed flag is set the whole image,
//! header included, is stored as one zlib stream.

use crate::codec;
use crate::error::Ip2AsnError;
use crate::table::RangeTable;
use std::collections::HashMap;
use std::io::Write;

/// Format magic (`ASN2` in ASCII when written big-endian)
pub const MAGIC: u32 = 0x4153_4e32;

/// Newest version this build reads and the version it writes
pub const VERSION: u16 = 2;

const FLAG_COMPRESSED: u16 = 1;
const HEADER_LEN: usize = 16;
const RANGE_LEN: usize = 12;

/// Serialize `table` and write it to `out`, optionally zlib-compressed.
pub fn write<W: Write>(
    table: &RangeTable,
    out: &mut W,
    compressed: bool,
) -> Result<(), Ip2AsnError> {
    let image = encode_image(table, compressed);
    if compressed {
        out.write_all(&codec::deflate(&image)?)?;
    } else {
        out.write_all(&image)?;
    }
    Ok(())
}

fn encode_image(table: &RangeTable, compressed: bool) -> Vec<u8> {
    let range_count = table.entry_count() as u32;
    let table_offset = (HEADER_LEN + table.entry_count() * RANGE_LEN) as u32;
    let flags = if compressed { FLAG_COMPRESSED } else { 0 };

    let mut buf = Vec::with_capacity(table_offset as usize + 4);
    buf.extend_from_slice(&MAGIC.to_be_bytes());
    buf.extend_from_slice(&VERSION.to_be_bytes());
    buf.extend_from_slice(&flags.to_be_bytes());
    buf.extend_from_slice(&range_count.to_be_bytes());
    buf.extend_from_slice(&table_offset.to_be_bytes());

    for (start, end, asn) in table.ranges() {
        buf.extend_from_slice(&start.to_be_bytes());
        buf.extend_from_slice(&end.to_be_bytes());
        buf.extend_from_slice(&asn.to_be_bytes());
    }

    let mut asns: Vec<u32> = table.names().keys().copied().collect();
    asns.sort_unstable();
    buf.extend_from_slice(&(asns.len() as u32).to_be_bytes());
    for asn in asns {
        let name = &table.names()[&asn];
        buf.extend_from_slice(&asn.to_be_bytes());
        buf.extend_from_slice(&(name.len() as u16).to_be_bytes());
        buf.extend_from_slice(name.as_bytes());
    }
    buf
}

/// Parse an uncompressed ASN2 image.
pub fn parse_image(image: &[u8]) -> Result<RangeTable, Ip2AsnError> {
    if image.len() < HEADER_LEN {
        return Err(Ip2AsnError::InvalidFormat("truncated header".into()));
    }
    if read_u32_be(image, 0) != MAGIC {
        return Err(Ip2AsnError::InvalidFormat("bad magic, expected ASN2".into()));
    }
    let version = u16::from_be_bytes([image[4], image[5]]);
    if version > VERSION {
        return Err(Ip2AsnError::UnsupportedVersion {
            found: u32::from(version),
            supported: u32::from(VERSION),
        });
    }
    let _flags = u16::from_be_bytes([image[6], image[7]]);
    let range_count = read_u32_be(image, 8) as usize;
    let table_offset = read_u32_be(image, 12) as usize;

    let ranges_end = HEADER_LEN + range_count.saturating_mul(RANGE_LEN);
    if ranges_end > image.len() {
        return Err(Ip2AsnError::InvalidFormat(format!(
            "claimed range count {range_count} exceeds available bytes"
        )));
    }
    if table_offset < ranges_end || table_offset + 4 > image.len() {
        return Err(Ip2AsnError::InvalidFormat(format!(
            "ASN table offset {table_offset} is inconsistent with the header"
        )));
    }

    let mut starts = Vec::with_capacity(range_count);
    let mut ends = Vec::with_capacity(range_count);
    let mut asns = Vec::with_capacity(range_count);
    for i in 0..range_count {
        let base = HEADER_LEN + i * RANGE_LEN;
        starts.push(read_u32_be(image, base));
        ends.push(read_u32_be(image, base + 4));
        asns.push(read_u32_be(image, base + 8));
    }

    let asn_count = read_u32_be(image, table_offset) as usize;
    let mut names = HashMap::with_capacity(asn_count);
    let mut offset = table_offset + 4;
    for _ in 0..asn_count {
        if offset + 6 > image.len() {
            return Err(Ip2AsnError::CorruptedData(
                "ASN table entry runs past the end of the buffer".into(),
            ));
        }
        let asn = read_u32_be(image, offset);
        let name_len = u16::from_be_bytes([image[offset + 4], image[offset + 5]]) as usize;
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

/// Parse an ASN2 file, inflating first when it is stored compressed.
pub fn read(bytes: &[u8]) -> Result<RangeTable, Ip2AsnError> {
    if bytes.len() >= 4 && bytes[..4] == MAGIC.to_be_bytes() {
        return parse_image(bytes);
    }
    parse_image(&codec::inflate(bytes)?)
}

fn read_u32_be(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::RangeRecord;

    fn sample_table() -> RangeTable {
        RangeTable::from_records(vec![
            RangeRecord {
                start: 0x0101_0100,
                end: 0x0101_01ff,
                asn: 13335,
                name: "CLOUDFLARENET".to_string(),
            },
            RangeRecord {
                start: 0x0808_0800,
                end: 0x0808_08ff,
                asn: 15169,
                name: "GOOGLE".to_string(),
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_roundtrip_uncompressed() {
        let mut out = Vec::new();
        write(&sample_table(), &mut out, false).unwrap();
        assert_eq!(&out[..4], b"ASN2");
        let loaded = read(&out).unwrap();
        assert_eq!(loaded.lookup(0x0808_0808), Some((15169, Some("GOOGLE"))));
    }

    #[test]
    fn test_roundtrip_compressed() {
        let mut out = Vec::new();
        write(&sample_table(), &mut out, true).unwrap();
        // Compressed files hide the magic behind the zlib stream.
        assert_ne!(&out[..4], b"ASN2");
        let loaded = read(&out).unwrap();
        assert_eq!(
            loaded.lookup(0x0101_0101),
            Some((13335, Some("CLOUDFLARENET")))
        );
    }

    #[test]
    fn test_newer_version_rejected() {
        let mut image = encode_image(&sample_table(), false);
        image[4..6].copy_from_slice(&3u16.to_be_bytes());
        assert!(matches!(
            parse_image(&image),
            Err(Ip2AsnError::UnsupportedVersion { found: 3, .. })
        ));
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut image = encode_image(&sample_table(), false);
        image[0] = b'Z';
        assert!(matches!(
            parse_image(&image),
            Err(Ip2AsnError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_inconsistent_table_offset_rejected() {
        let mut image = encode_image(&sample_table(), false);
        image[12..16].copy_from_slice(&4u32.to_be_bytes());
        assert!(matches!(
            parse_image(&image),
            Err(Ip2AsnError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_oversized_range_count_rejected() {
        let mut image = encode_image(&sample_table(), false);
        image[8..12].copy_from_slice(&u32::MAX.to_be_bytes());
        assert!(matches!(
            parse_image(&image),
            Err(Ip2AsnError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_truncated_name_rejected() {
        let image = encode_image(&sample_table(), false);
        assert!(matches!(
            parse_image(&image[..image.len() - 3]),
            Err(Ip2AsnError::CorruptedData(_))
        ));
    }
}
