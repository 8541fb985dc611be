//! `cmap` subtable format 4 (segmented Unicode BMP), spec §4.2 "Charmap".

use std::collections::HashMap;

use crate::error::{FontError, Result};
use crate::readable::Readable;

/// Build a `codepoint -> glyphIndex` map from the first (3,1) or (0,3)
/// subtable whose format is 4, expanding the segment arrays exactly as the
/// OpenType spec defines them.
pub fn parse(cmap: &[u8]) -> Result<HashMap<u32, u16>> {
    let mut r = Readable::new(cmap);
    let _version = r.uint16()?;
    let num_tables = r.uint16()?;

    let mut subtable_offset = None;
    for _ in 0..num_tables {
        let platform_id = r.uint16()?;
        let encoding_id = r.uint16()?;
        let offset = r.uint32()? as usize;
        let is_candidate = matches!((platform_id, encoding_id), (3, 1) | (0, 3));
        if is_candidate {
            let format = r.peek_uint16_at(offset)?;
            if format == 4 {
                subtable_offset = Some(offset);
                break;
            }
        }
    }
    let offset = subtable_offset.ok_or(FontError::UnsupportedCmap)?;
    parse_format4(&cmap[offset..])
}

fn parse_format4(data: &[u8]) -> Result<HashMap<u32, u16>> {
    let mut r = Readable::new(data);
    let _format = r.uint16()?;
    let _length = r.uint16()?;
    let _language = r.uint16()?;
    let seg_count_x2 = r.uint16()? as usize;
    let seg_count = seg_count_x2 / 2;
    let _search_range = r.uint16()?;
    let _entry_selector = r.uint16()?;
    let _range_shift = r.uint16()?;

    let mut end_code = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        end_code.push(r.uint16()?);
    }
    let _reserved_pad = r.uint16()?;
    let mut start_code = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        start_code.push(r.uint16()?);
    }
    let mut id_delta = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        id_delta.push(r.int16()?);
    }
    let id_range_offset_pos = r.position();
    let mut id_range_offset = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        id_range_offset.push(r.uint16()?);
    }

    let mut map = HashMap::new();
    for seg in 0..seg_count {
        let start = start_code[seg];
        let end = end_code[seg];
        if start == 0xFFFF && end == 0xFFFF {
            continue;
        }
        for c in start..=end {
            let glyph = if id_range_offset[seg] == 0 {
                (c as i32 + id_delta[seg] as i32) as u16
            } else {
                // Per the OpenType spec: the stored offset is relative to
                // the address of the idRangeOffset entry itself.
                let entry_pos = id_range_offset_pos + seg * 2;
                let glyph_index_addr =
                    entry_pos + id_range_offset[seg] as usize + 2 * (c - start) as usize;
                let raw = r.peek_uint16_at(glyph_index_addr)?;
                if raw == 0 {
                    0
                } else {
                    (raw as i32 + id_delta[seg] as i32) as u16
                }
            };
            if glyph != 0 {
                map.insert(c as u32, glyph);
            }
            if c == 0xFFFF {
                break;
            }
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_trivial_format4() -> Vec<u8> {
        // Two segments: [0x41,0x42] -> glyphs 3,4 (via idDelta), and the
        // mandatory terminating 0xFFFF segment.
        let mut out = Vec::new();
        out.extend_from_slice(&4u16.to_be_bytes()); // format
        out.extend_from_slice(&0u16.to_be_bytes()); // length (unused by parser)
        out.extend_from_slice(&0u16.to_be_bytes()); // language
        let seg_count = 2u16;
        out.extend_from_slice(&(seg_count * 2).to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        // endCode
        out.extend_from_slice(&0x42u16.to_be_bytes());
        out.extend_from_slice(&0xFFFFu16.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // reservedPad
        // startCode
        out.extend_from_slice(&0x41u16.to_be_bytes());
        out.extend_from_slice(&0xFFFFu16.to_be_bytes());
        // idDelta: glyph = c + delta => delta = 3 - 0x41
        let delta: i16 = (3i32 - 0x41) as i16;
        out.extend_from_slice(&delta.to_be_bytes());
        out.extend_from_slice(&1i16.to_be_bytes());
        // idRangeOffset
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out
    }

    #[test]
    fn format4_maps_simple_delta_segment() {
        let data = build_trivial_format4();
        let map = parse_format4(&data).unwrap();
        assert_eq!(map.get(&0x41), Some(&3));
        assert_eq!(map.get(&0x42), Some(&4));
        assert!(!map.contains_key(&0xFFFF));
    }
}
