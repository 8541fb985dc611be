//! sfnt re-packaging for embedding, spec §4.2 "Embedding": a fresh
//! table directory over a reduced table set, with corrected
//! search-range/entry-selector/range-shift, per-table checksums and a
//! recomputed `head.checkSumAdjustment`.

const TRUETYPE_TABLES: [&[u8; 4]; 9] =
    [b"cvt ", b"fpgm", b"glyf", b"head", b"hhea", b"hmtx", b"loca", b"maxp", b"prep"];
const CFF_TABLES: [&[u8; 4]; 5] = [b"CFF ", b"head", b"hhea", b"hmtx", b"maxp"];

/// Build a standalone sfnt file containing only the tables needed to
/// render (not hint or substitute) the font, taken verbatim from the
/// source font's table directory.
pub fn repackage(tables: &[(&[u8; 4], &[u8])], has_cff: bool) -> Vec<u8> {
    let allowed: &[&[u8; 4]] = if has_cff { &CFF_TABLES } else { &TRUETYPE_TABLES };
    let selected: Vec<(&[u8; 4], &[u8])> = allowed
        .iter()
        .filter_map(|tag| tables.iter().find(|(t, _)| *t == *tag).copied())
        .collect();

    let num_tables = selected.len() as u16;
    let mut search_range_pow2 = 1u16;
    let mut entry_selector = 0u16;
    while search_range_pow2 * 2 <= num_tables {
        search_range_pow2 *= 2;
        entry_selector += 1;
    }
    let search_range = search_range_pow2 * 16;
    let range_shift = num_tables * 16 - search_range;

    let mut out = Vec::new();
    let sfnt_version: u32 = if has_cff { 0x4F54544F } else { 0x00010000 }; // 'OTTO' or 1.0
    out.extend_from_slice(&sfnt_version.to_be_bytes());
    out.extend_from_slice(&num_tables.to_be_bytes());
    out.extend_from_slice(&search_range.to_be_bytes());
    out.extend_from_slice(&entry_selector.to_be_bytes());
    out.extend_from_slice(&range_shift.to_be_bytes());

    let directory_start = out.len();
    out.resize(directory_start + 16 * selected.len(), 0);

    let mut head_checksum_adjustment_offset = None;
    let mut table_records = Vec::with_capacity(selected.len());
    for (tag, data) in &selected {
        let offset = out.len() as u32;
        let length = data.len() as u32;
        let mut padded = data.to_vec();
        if **tag == *b"head" {
            head_checksum_adjustment_offset = Some(offset as usize + 8);
            if padded.len() >= 12 {
                padded[8..12].copy_from_slice(&[0, 0, 0, 0]);
            }
        }
        let checksum = table_checksum(&padded);
        out.extend_from_slice(&padded);
        while out.len() % 4 != 0 {
            out.push(0);
        }
        table_records.push((**tag, checksum, offset, length));
    }

    for (i, (tag, checksum, offset, length)) in table_records.iter().enumerate() {
        let pos = directory_start + i * 16;
        out[pos..pos + 4].copy_from_slice(tag.as_slice());
        out[pos + 4..pos + 8].copy_from_slice(&checksum.to_be_bytes());
        out[pos + 8..pos + 12].copy_from_slice(&offset.to_be_bytes());
        out[pos + 12..pos + 16].copy_from_slice(&length.to_be_bytes());
    }

    if let Some(adjustment_offset) = head_checksum_adjustment_offset {
        let file_checksum = table_checksum(&out);
        let adjustment = 0xB1B0AFBAu32.wrapping_sub(file_checksum);
        out[adjustment_offset..adjustment_offset + 4].copy_from_slice(&adjustment.to_be_bytes());
    }

    out
}

fn table_checksum(data: &[u8]) -> u32 {
    let mut sum: u32 = 0;
    for chunk in data.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum = sum.wrapping_add(u32::from_be_bytes(word));
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repackage_orders_tables_by_the_allowed_truetype_list() {
        let head = vec![0u8; 54];
        let maxp = vec![0u8; 6];
        let tables: Vec<(&[u8; 4], &[u8])> = vec![(b"maxp", &maxp), (b"head", &head)];
        let out = repackage(&tables, false);
        assert_eq!(&out[0..4], &0x00010000u32.to_be_bytes());
        assert_eq!(u16::from_be_bytes([out[4], out[5]]), 2);
    }

    #[test]
    fn repackage_uses_otto_signature_for_cff() {
        let head = vec![0u8; 54];
        let cff = vec![1, 0, 4, 4];
        let tables: Vec<(&[u8; 4], &[u8])> = vec![(b"CFF ", &cff), (b"head", &head)];
        let out = repackage(&tables, true);
        assert_eq!(&out[0..4], b"OTTO");
    }
}
