//! Output adapters: the three sinks spec §6 "External interfaces" names
//! (PDF, SVG, raster). `shape`, `text` and `page` already implement the
//! per-item `pdf`/`svg`/`rasterize` methods; this module supplies the
//! document/page-level framing around them — file headers, cross-reference
//! tables, and XML document structure — the way `oxidize-pdf-core`'s
//! `writer` module frames its own per-object serialization.
//!
//! Raster output has no adapter here: [`crate::page::Page::image`] already
//! returns a complete [`crate::image::Image`], and PNG/JPEG re-encoding is
//! the `image` crate's job, not this crate's.

pub mod pdf;
pub mod svg;
