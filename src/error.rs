//! Crate-wide error types.
//!
//! Mirrors the split the rest of the ecosystem uses: one narrow enum per
//! failure domain, plus a top-level [`Error`] that wraps them for the
//! public [`Result`] alias.

use thiserror::Error;

/// Malformed or unsupported font container / outline data (spec §7,
/// "Malformed input" and "Unsupported feature" for font decoding).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FontError {
    #[error("font file too small ({0} bytes)")]
    TooSmall(usize),
    #[error("invalid font signature: 0x{0:08X}")]
    InvalidSignature(u32),
    #[error("font collections (ttcf) with index {0} out of range")]
    CollectionIndexOutOfRange(u32),
    #[error("missing required table: {0}")]
    MissingTable(&'static str),
    #[error("table '{0}' extends beyond the end of the file")]
    TableTruncated(&'static str),
    #[error("unsupported cmap: no (3,1) or (0,3) format-4 subtable found")]
    UnsupportedCmap,
    #[error("unsupported kern subtable format {0}, only format 0 is supported")]
    UnsupportedKernFormat(u16),
    #[error("unsupported GPOS pair adjustment PosFormat {0}")]
    UnsupportedGposFormat(u16),
    #[error("unsupported CFF/Type2 charstring operator {0}")]
    UnsupportedCharstringOperator(u8),
    #[error("CFF charstring recursion exceeded the subroutine nesting limit")]
    CharstringRecursionLimit,
    #[error("glyph index {0} out of range (numGlyphs = {1})")]
    GlyphIndexOutOfRange(u16, u16),
}

/// Malformed or unsupported pixel-image data (spec §7).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid image magic bytes")]
    InvalidMagic,
    #[error("decompressed image size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("progressive JPEG is not supported")]
    ProgressiveJpegUnsupported,
    #[error("lossless JPEG is not supported")]
    LosslessJpegUnsupported,
    #[error("interlaced PNG is not supported")]
    InterlacedPngUnsupported,
    #[error("mismatched image kinds in blit: {0:?} vs {1:?}")]
    MismatchedKinds(crate::image::Kind, crate::image::Kind),
    #[error("dither level {0} outside the supported range [2, 256]")]
    InvalidDitherLevels(u32),
    #[error("underlying decoder failed: {0}")]
    Decoder(String),
}

/// Rasterizer-specific failures (spec §4.3, CMYK/spot rasterisation).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    #[error("rasterizing directly into a CMYK image is not supported")]
    CmykUnsupported,
    #[error("rasterizing an overprint colour is not supported")]
    OverprintUnsupported,
}

/// Top-level crate error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Font(#[from] FontError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error("invalid SVG path prelude: {0}")]
    InvalidSvgPath(String),
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_error_displays_table_name() {
        let e = FontError::MissingTable("glyf");
        assert_eq!(e.to_string(), "missing required table: glyf");
    }

    #[test]
    fn top_level_error_wraps_font_error() {
        let e: Error = FontError::UnsupportedCmap.into();
        assert!(matches!(e, Error::Font(FontError::UnsupportedCmap)));
    }

    #[test]
    fn image_error_mismatched_kinds_message() {
        let e = ImageError::MismatchedKinds(crate::image::Kind::Rgb, crate::image::Kind::Gray);
        assert!(e.to_string().contains("Rgb"));
    }
}
