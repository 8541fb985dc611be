//! TrueType/OpenType-compatible font container, spec §4.2 "Font container
//! and glyph decode". Ported from `flat/otf.py`/`flat/font.py`, restyled
//! after the teacher's `text::fonts::truetype` module.

mod cff;
mod cmap;
mod embed;
mod glyf;
mod kern;

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::command::CommandStream;
use crate::error::{Error, FontError, Result};
use crate::readable::Readable;

const REQUIRED_TABLES: [&[u8; 4]; 6] = [b"head", b"hhea", b"maxp", b"hmtx", b"cmap", b"name"];

enum Outlines {
    TrueType { glyf: Vec<u8>, loca: Vec<u32> },
    Cff(cff::Cff),
}

/// A parsed sfnt font: container metadata, charmap, metrics and kerning,
/// with lazy access to glyph outlines.
pub struct Font {
    data: Vec<u8>,
    tables: HashMap<[u8; 4], (u32, u32)>,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    num_glyphs: u16,
    num_h_metrics: u16,
    hmtx_offset: u32,
    cmap: HashMap<u32, u16>,
    kerning: kern::Kerning,
    outlines: Outlines,
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("units_per_em", &self.units_per_em)
            .field("ascender", &self.ascender)
            .field("descender", &self.descender)
            .field("num_glyphs", &self.num_glyphs)
            .finish_non_exhaustive()
    }
}

impl Font {
    /// Parse a standalone sfnt font (not a `ttcf` collection). Use
    /// [`Font::from_collection`] for collections.
    pub fn parse(data: Vec<u8>) -> Result<Font> {
        Font::parse_at(data, 0)
    }

    /// Parse font number `index` out of a `ttcf` TrueType Collection.
    pub fn from_collection(data: Vec<u8>, index: u32) -> Result<Font> {
        if data.len() < 16 || &data[0..4] != b"ttcf" {
            return Err(FontError::InvalidSignature(read_u32(&data, 0)?).into());
        }
        let num_fonts = read_u32(&data, 8)?;
        if index >= num_fonts {
            return Err(FontError::CollectionIndexOutOfRange(index).into());
        }
        let offset = read_u32(&data, 12 + index as usize * 4)? as usize;
        Font::parse_at(data, offset)
    }

    fn parse_at(data: Vec<u8>, directory_offset: usize) -> Result<Font> {
        if data.len() < directory_offset + 12 {
            return Err(FontError::TooSmall(data.len()).into());
        }
        let signature = read_u32(&data, directory_offset)?;
        if !matches!(signature, 0x00010000 | 0x4F54544F | 0x74727565) {
            return Err(FontError::InvalidSignature(signature).into());
        }
        let num_tables = read_u16(&data, directory_offset + 4)?;
        trace!(num_tables, "parsing sfnt table directory");

        let mut tables = HashMap::new();
        let mut pos = directory_offset + 12;
        for _ in 0..num_tables {
            if pos + 16 > data.len() {
                return Err(FontError::TableTruncated("table directory").into());
            }
            let mut tag = [0u8; 4];
            tag.copy_from_slice(&data[pos..pos + 4]);
            let offset = read_u32(&data, pos + 8)?;
            let length = read_u32(&data, pos + 12)?;
            tables.insert(tag, (offset, length));
            pos += 16;
        }

        for required in REQUIRED_TABLES {
            if !tables.contains_key(required) {
                return Err(FontError::MissingTable(std::str::from_utf8(required).unwrap_or("?")).into());
            }
        }
        let has_glyf = tables.contains_key(b"glyf") && tables.contains_key(b"loca");
        let has_cff = tables.contains_key(b"CFF ");
        if !has_glyf && !has_cff {
            return Err(FontError::MissingTable("glyf+loca or CFF").into());
        }

        let head = table_bytes(&data, &tables, b"head")?;
        let units_per_em = read_u16(head, 18)?;
        let index_to_loc_format = read_u16(head, 50)?;

        let maxp = table_bytes(&data, &tables, b"maxp")?;
        let num_glyphs = read_u16(maxp, 4)?;

        let hhea = table_bytes(&data, &tables, b"hhea")?;
        let ascender = read_u16(hhea, 4)? as i16;
        let descender = read_u16(hhea, 6)? as i16;
        let num_h_metrics = read_u16(hhea, 34)?;

        let (hmtx_offset, _) = tables[b"hmtx"];

        let cmap_table = table_bytes(&data, &tables, b"cmap")?;
        let cmap = cmap::parse(cmap_table)?;
        debug!(mapped = cmap.len(), "parsed cmap");

        let mut kerning = kern::Kerning::new();
        if let Ok(kern_table) = table_bytes(&data, &tables, b"kern") {
            kerning = kern::parse_kern(kern_table)?;
        }
        if let Ok(gpos_table) = table_bytes(&data, &tables, b"GPOS") {
            for (left, rights) in kern::parse_gpos(gpos_table)? {
                let entry = kerning.entry(left).or_default();
                for (right, value) in rights {
                    entry.insert(right, value);
                }
            }
        }

        let outlines = if has_cff {
            let cff_table = table_bytes(&data, &tables, b"CFF ")?;
            Outlines::Cff(cff::parse(cff_table)?)
        } else {
            let glyf_table = table_bytes(&data, &tables, b"glyf")?.to_vec();
            let loca_table = table_bytes(&data, &tables, b"loca")?;
            let loca = glyf::parse_loca(loca_table, num_glyphs, index_to_loc_format == 1)?;
            Outlines::TrueType { glyf: glyf_table, loca }
        };

        Ok(Font {
            data,
            tables,
            units_per_em,
            ascender,
            descender,
            num_glyphs,
            num_h_metrics,
            hmtx_offset,
            cmap,
            kerning,
            outlines,
        })
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    pub fn ascender(&self) -> i16 {
        self.ascender
    }

    pub fn descender(&self) -> i16 {
        self.descender
    }

    pub fn num_glyphs(&self) -> u16 {
        self.num_glyphs
    }

    /// Whether this font's outlines are CFF/Type2 charstrings rather than
    /// `glyf` contours, used to pick `FontFile3` vs. `FontFile2` when
    /// embedding.
    pub fn is_cff(&self) -> bool {
        matches!(self.outlines, Outlines::Cff(_))
    }

    /// The font's PostScript name (`name` table, nameID 6), used as the
    /// `/BaseFont` value when embedding.
    pub fn postscript_name(&self) -> Result<Option<String>> {
        self.name(6)
    }

    /// Map a Unicode codepoint to a glyph index; unmapped codepoints
    /// resolve to glyph 0 (`.notdef`) per spec §4.2.
    pub fn glyph_index(&self, codepoint: u32) -> u16 {
        self.cmap.get(&codepoint).copied().unwrap_or(0)
    }

    /// The horizontal advance of `glyph`, in font design units. Glyph
    /// indices at or beyond `numberOfHMetrics` share the last metric's
    /// advance, per spec §4.2 "Advances".
    pub fn advance_width(&self, glyph: u16) -> Result<u16> {
        let idx = glyph.min(self.num_h_metrics.saturating_sub(1)) as u32;
        let offset = self.hmtx_offset as usize + idx as usize * 4;
        read_u16(&self.data, offset)
    }

    /// The horizontal kerning adjustment between `left` and `right`, in
    /// font design units (0 if unkerned).
    pub fn kerning(&self, left: u16, right: u16) -> i16 {
        self.kerning.get(&left).and_then(|m| m.get(&right)).copied().unwrap_or(0)
    }

    /// Decode `glyph`'s outline into a command stream in font design units
    /// (y-up). Callers scale by the inverse `units_per_em` and flip to
    /// page y-down during layout/rasterization (spec §4.2).
    pub fn outline(&self, glyph: u16) -> Result<CommandStream> {
        if glyph >= self.num_glyphs {
            return Err(FontError::GlyphIndexOutOfRange(glyph, self.num_glyphs).into());
        }
        match &self.outlines {
            Outlines::TrueType { glyf, loca } => glyf::decode(glyf, loca, self.num_glyphs, glyph),
            Outlines::Cff(cff) => cff.outline(glyph),
        }
    }

    /// Extract the font's family (nameID 1) or full (nameID 4) name,
    /// preferring a Windows (platform 3) Unicode record and falling back
    /// to a Mac Roman (platform 1) one.
    pub fn name(&self, name_id: u16) -> Result<Option<String>> {
        let Ok(table) = table_bytes(&self.data, &self.tables, b"name") else {
            return Ok(None);
        };
        let mut r = Readable::new(table);
        let _format = r.uint16()?;
        let count = r.uint16()?;
        let string_storage = r.uint16()? as usize;

        let mut best: Option<(u16, usize, usize, bool)> = None; // (platform, offset, length, is_unicode)
        for _ in 0..count {
            let platform_id = r.uint16()?;
            let _encoding_id = r.uint16()?;
            let _language_id = r.uint16()?;
            let record_name_id = r.uint16()?;
            let length = r.uint16()? as usize;
            let offset = r.uint16()? as usize;
            if record_name_id != name_id {
                continue;
            }
            let is_unicode = platform_id == 3 || platform_id == 0;
            if best.is_none() || (is_unicode && !best.unwrap().3) {
                best = Some((platform_id, offset, length, is_unicode));
            }
        }
        let Some((_, offset, length, is_unicode)) = best else {
            return Ok(None);
        };
        let start = string_storage + offset;
        let bytes = table.get(start..start + length).ok_or(FontError::TableTruncated("name"))?;
        Ok(Some(if is_unicode {
            decode_utf16be(bytes)
        } else {
            decode_mac_roman(bytes)
        }))
    }

    /// Re-package the tables required to render this font into a
    /// standalone sfnt fragment suitable for PDF/SVG embedding (spec §4.2
    /// "Embedding").
    pub fn embed(&self) -> Vec<u8> {
        let has_cff = matches!(self.outlines, Outlines::Cff(_));
        let mut slices: Vec<(&[u8; 4], &[u8])> = Vec::new();
        for (tag, (offset, length)) in &self.tables {
            if let Some(bytes) = self.data.get(*offset as usize..(*offset + *length) as usize) {
                slices.push((tag, bytes));
            }
        }
        embed::repackage(&slices, has_cff)
    }
}

fn table_bytes<'a>(data: &'a [u8], tables: &HashMap<[u8; 4], (u32, u32)>, tag: &'static [u8; 4]) -> Result<&'a [u8]> {
    let (offset, length) = tables
        .get(tag)
        .ok_or_else(|| FontError::MissingTable(std::str::from_utf8(tag).unwrap_or("?")))?;
    data.get(*offset as usize..(*offset + *length) as usize)
        .ok_or_else(|| Error::Font(FontError::TableTruncated(std::str::from_utf8(tag).unwrap_or("?"))))
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| FontError::TableTruncated("data").into())
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| FontError::TableTruncated("data").into())
}

fn decode_utf16be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
    String::from_utf16_lossy(&units)
}

fn decode_mac_roman(bytes: &[u8]) -> String {
    // The Mac Roman repertoire beyond ASCII is rare in font name records
    // used by this crate's test fixtures; unmapped high bytes fall back to
    // the Latin-1 code point, which covers the common accented letters.
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_signature_is_rejected() {
        let data = vec![0u8; 32];
        assert!(matches!(Font::parse(data), Err(Error::Font(FontError::InvalidSignature(_)))));
    }

    #[test]
    fn too_small_file_is_rejected() {
        let data = vec![0u8; 4];
        assert!(matches!(Font::parse(data), Err(Error::Font(FontError::TooSmall(_)))));
    }

    #[test]
    fn decode_utf16be_roundtrips_ascii() {
        let bytes = [0x00, b'A', 0x00, b'B'];
        assert_eq!(decode_utf16be(&bytes), "AB");
    }

    #[test]
    fn decode_mac_roman_passes_through_ascii() {
        assert_eq!(decode_mac_roman(b"Hello"), "Hello");
    }
}
