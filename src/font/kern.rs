//! Legacy `kern` table (format 0 only) and `GPOS` pair-adjustment kerning
//! (LookupType 2, PosFormat 1/2), spec §4.2 "Kerning".

use std::collections::HashMap;

use crate::error::{FontError, Result};
use crate::readable::Readable;

pub type Kerning = HashMap<u16, HashMap<u16, i16>>;

fn insert(kerning: &mut Kerning, left: u16, right: u16, value: i16) {
    kerning.entry(left).or_default().insert(right, value);
}

/// Parse a legacy `kern` table. Only subtable format 0 is accepted; any
/// other format subtable is a hard error per spec §4.2.
pub fn parse_kern(data: &[u8]) -> Result<Kerning> {
    let mut r = Readable::new(data);
    let _version = r.uint16()?;
    let num_tables = r.uint16()?;
    let mut kerning = Kerning::new();
    for _ in 0..num_tables {
        let _sub_version = r.uint16()?;
        let length = r.uint16()? as usize;
        let coverage = r.uint16()?;
        let format = (coverage >> 8) as u16;
        let start = r.position();
        if format != 0 {
            return Err(FontError::UnsupportedKernFormat(format).into());
        }
        let num_pairs = r.uint16()?;
        let _search_range = r.uint16()?;
        let _entry_selector = r.uint16()?;
        let _range_shift = r.uint16()?;
        for _ in 0..num_pairs {
            let left = r.uint16()?;
            let right = r.uint16()?;
            let value = r.int16()?;
            insert(&mut kerning, left, right, value);
        }
        r.jump(start + length.saturating_sub(6));
    }
    Ok(kerning)
}

/// Parse `GPOS` for the `kern` feature's pair-adjustment (LookupType 2)
/// subtables, supporting `PosFormat` 1 (per-glyph pairs) and 2 (class
/// pairs) with `ValueFormat1 = XAdvance`, `ValueFormat2 = 0`.
pub fn parse_gpos(data: &[u8]) -> Result<Kerning> {
    let mut r = Readable::new(data);
    let _major = r.uint16()?;
    let _minor = r.uint16()?;
    let script_list_offset = r.uint16()? as usize;
    let feature_list_offset = r.uint16()? as usize;
    let lookup_list_offset = r.uint16()? as usize;
    let _ = script_list_offset; // script/language selection is not needed: we scan every feature tagged "kern"

    let kern_feature_indices = parse_feature_list_for_tag(data, feature_list_offset, b"kern")?;
    let lookup_indices = parse_lookup_indices_for_features(data, feature_list_offset, &kern_feature_indices)?;

    let mut kerning = Kerning::new();
    let mut lr = Readable::new(data);
    lr.jump(lookup_list_offset);
    let lookup_count = lr.uint16()?;
    let mut lookup_offsets = Vec::with_capacity(lookup_count as usize);
    for _ in 0..lookup_count {
        lookup_offsets.push(lr.uint16()? as usize);
    }
    for &idx in &lookup_indices {
        let Some(&rel) = lookup_offsets.get(idx as usize) else {
            continue;
        };
        let lookup_offset = lookup_list_offset + rel;
        parse_lookup(data, lookup_offset, &mut kerning)?;
    }
    Ok(kerning)
}

fn parse_feature_list_for_tag(data: &[u8], feature_list_offset: usize, tag: &[u8; 4]) -> Result<Vec<u16>> {
    let mut r = Readable::new(data);
    r.jump(feature_list_offset);
    let count = r.uint16()?;
    let mut matches = Vec::new();
    for i in 0..count {
        let t = r.read(4)?;
        let offset = r.uint16()?;
        if t == &tag[..] {
            matches.push((i, offset));
        }
    }
    Ok(matches.into_iter().map(|(i, _)| i).collect())
}

fn parse_lookup_indices_for_features(data: &[u8], feature_list_offset: usize, feature_indices: &[u16]) -> Result<Vec<u16>> {
    let mut r = Readable::new(data);
    r.jump(feature_list_offset);
    let count = r.uint16()?;
    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let _tag = r.read(4)?;
        let offset = r.uint16()? as usize;
        records.push(offset);
    }
    let mut lookups = Vec::new();
    for &fi in feature_indices {
        let Some(&feature_offset) = records.get(fi as usize) else {
            continue;
        };
        let mut fr = Readable::new(data);
        fr.jump(feature_list_offset + feature_offset);
        let _feature_params = fr.uint16()?;
        let lookup_index_count = fr.uint16()?;
        for _ in 0..lookup_index_count {
            lookups.push(fr.uint16()?);
        }
    }
    Ok(lookups)
}

fn parse_lookup(data: &[u8], lookup_offset: usize, kerning: &mut Kerning) -> Result<()> {
    let mut r = Readable::new(data);
    r.jump(lookup_offset);
    let lookup_type = r.uint16()?;
    let _lookup_flag = r.uint16()?;
    let subtable_count = r.uint16()?;
    let mut subtable_offsets = Vec::with_capacity(subtable_count as usize);
    for _ in 0..subtable_count {
        subtable_offsets.push(r.uint16()? as usize);
    }
    if lookup_type != 2 {
        return Ok(()); // only pair adjustment contributes to kerning
    }
    for rel in subtable_offsets {
        parse_pair_pos_subtable(data, lookup_offset + rel, kerning)?;
    }
    Ok(())
}

fn parse_coverage(data: &[u8], offset: usize) -> Result<Vec<u16>> {
    let mut r = Readable::new(data);
    r.jump(offset);
    let format = r.uint16()?;
    let mut glyphs = Vec::new();
    match format {
        1 => {
            let count = r.uint16()?;
            for _ in 0..count {
                glyphs.push(r.uint16()?);
            }
        }
        2 => {
            let range_count = r.uint16()?;
            for _ in 0..range_count {
                let start = r.uint16()?;
                let end = r.uint16()?;
                let _start_coverage_index = r.uint16()?;
                for g in start..=end {
                    glyphs.push(g);
                }
            }
        }
        _ => {}
    }
    Ok(glyphs)
}

fn parse_class_def(data: &[u8], offset: usize) -> Result<HashMap<u16, u16>> {
    let mut r = Readable::new(data);
    r.jump(offset);
    let format = r.uint16()?;
    let mut classes = HashMap::new();
    match format {
        1 => {
            let start_glyph = r.uint16()?;
            let glyph_count = r.uint16()?;
            for i in 0..glyph_count {
                classes.insert(start_glyph + i, r.uint16()?);
            }
        }
        2 => {
            let range_count = r.uint16()?;
            for _ in 0..range_count {
                let start = r.uint16()?;
                let end = r.uint16()?;
                let class = r.uint16()?;
                for g in start..=end {
                    classes.insert(g, class);
                }
            }
        }
        _ => {}
    }
    Ok(classes)
}

fn parse_pair_pos_subtable(data: &[u8], offset: usize, kerning: &mut Kerning) -> Result<()> {
    let mut r = Readable::new(data);
    r.jump(offset);
    let format = r.uint16()?;
    let coverage_offset = r.uint16()? as usize;
    let value_format1 = r.uint16()?;
    let value_format2 = r.uint16()?;
    // Only ValueFormat1 = XAdvance (0x0004), ValueFormat2 = 0 is supported.
    if value_format1 != 0x0004 || value_format2 != 0 {
        return Err(FontError::UnsupportedGposFormat(format).into());
    }
    let coverage = parse_coverage(data, offset + coverage_offset)?;

    match format {
        1 => {
            let pair_set_count = r.uint16()?;
            let mut pair_set_offsets = Vec::with_capacity(pair_set_count as usize);
            for _ in 0..pair_set_count {
                pair_set_offsets.push(r.uint16()? as usize);
            }
            for (i, &left) in coverage.iter().enumerate() {
                let Some(&rel) = pair_set_offsets.get(i) else { continue };
                let mut pr = Readable::new(data);
                pr.jump(offset + rel);
                let pair_count = pr.uint16()?;
                for _ in 0..pair_count {
                    let right = pr.uint16()?;
                    let x_advance = pr.int16()?;
                    insert(kerning, left, right, x_advance);
                }
            }
        }
        2 => {
            let class_def1_offset = r.uint16()? as usize;
            let class_def2_offset = r.uint16()? as usize;
            let class1_count = r.uint16()?;
            let class2_count = r.uint16()?;
            let mut values = Vec::with_capacity(class1_count as usize);
            for _ in 0..class1_count {
                let mut row = Vec::with_capacity(class2_count as usize);
                for _ in 0..class2_count {
                    row.push(r.int16()?);
                }
                values.push(row);
            }
            let class1 = parse_class_def(data, offset + class_def1_offset)?;
            let class2 = parse_class_def(data, offset + class_def2_offset)?;
            for &left in &coverage {
                let c1 = *class1.get(&left).unwrap_or(&0);
                for (&right, &c2) in &class2 {
                    if let Some(row) = values.get(c1 as usize) {
                        if let Some(&x_advance) = row.get(c2 as usize) {
                            if x_advance != 0 {
                                insert(kerning, left, right, x_advance);
                            }
                        }
                    }
                }
            }
        }
        _ => return Err(FontError::UnsupportedGposFormat(format).into()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_kern_format0() -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0u16.to_be_bytes()); // version
        out.extend_from_slice(&1u16.to_be_bytes()); // numTables
        out.extend_from_slice(&0u16.to_be_bytes()); // subVersion
        out.extend_from_slice(&(14u16 + 6).to_be_bytes()); // length
        out.extend_from_slice(&0u16.to_be_bytes()); // coverage = format 0
        out.extend_from_slice(&1u16.to_be_bytes()); // nPairs
        out.extend_from_slice(&0u16.to_be_bytes()); // searchRange
        out.extend_from_slice(&0u16.to_be_bytes()); // entrySelector
        out.extend_from_slice(&0u16.to_be_bytes()); // rangeShift
        out.extend_from_slice(&5u16.to_be_bytes()); // left
        out.extend_from_slice(&6u16.to_be_bytes()); // right
        out.extend_from_slice(&(-50i16).to_be_bytes()); // value
        out
    }

    #[test]
    fn kern_format0_pair_is_readable() {
        let data = build_kern_format0();
        let kerning = parse_kern(&data).unwrap();
        assert_eq!(kerning.get(&5).and_then(|m| m.get(&6)), Some(&-50));
    }

    #[test]
    fn kern_rejects_non_format0_subtable() {
        let mut out = Vec::new();
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&8u16.to_be_bytes());
        out.extend_from_slice(&0x0200u16.to_be_bytes()); // format 2
        assert!(parse_kern(&out).is_err());
    }
}
