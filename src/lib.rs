//! # flatgeist
//!
//! A pure Rust library for page-based 2D graphics: a Bézier geometry
//! kernel, a TrueType/OpenType/CFF font decoder, an analytic coverage
//! rasterizer, and a paragraph layout engine, all driving one scene graph
//! that renders to PDF, SVG, or raster images.
//!
//! ## Quick start
//!
//! ```rust
//! use flatgeist::{Color, Document, Style, Unit};
//!
//! let mut doc = Document::new(100.0, 100.0, Unit::Mm);
//! let page = doc.addpage();
//! let circle = Style::new()
//!     .nofill()
//!     .stroke(Color::red())
//!     .width(2.5, Unit::Pt)
//!     .circle(50.0, 50.0, 20.0);
//! page.place(circle);
//! ```
//!
//! ## Modules
//!
//! - [`geom`] - points, Bézier segments, elevation/reduction, flattening
//! - [`font`] - TrueType/OpenType/CFF parsing, glyph outlines, kerning, embedding
//! - [`image`] - pixel buffers, PNG/JPEG codecs, resampling, compositing ops
//! - [`raster`] - analytic coverage rasterizer (fill and stroke)
//! - [`color`] - gray/RGB/CMYK/spot colors and device color operators
//! - [`command`] - the path command stream shared by shapes, glyphs, and the rasterizer
//! - [`units`] - point/mm/cm/inch/pica scale conversion
//! - [`shape`] - styled shapes (line, polyline, polygon, rectangle, circle, ellipse, path)
//! - [`text`] - styled paragraphs, line layout, placed text blocks
//! - [`resources`] - the resource-registration seam shapes/text/pages use to reach a backend
//! - [`page`] - placed items, reusable groups, pages, and documents
//! - [`backend`] - PDF, SVG, and raster output writers
//!
//! ## Rendering a scene
//!
//! A [`page::Document`] accumulates [`page::Page`]s, each holding placed
//! [`shape::Shape`]s, [`text::PlacedText`] blocks, [`image::Image`]s, and
//! nested [`page::Group`]s. Once built, a page renders three ways:
//! [`backend::pdf::write`] for a complete PDF file, [`backend::svg::write`]
//! for an SVG document, or [`page::Page::image`] for a rasterized bitmap.

pub mod backend;
pub mod color;
pub mod command;
pub mod error;
pub mod font;
pub mod geom;
pub mod image;
mod objects;
pub mod page;
pub mod raster;
pub mod readable;
pub mod resources;
pub mod shape;
pub mod text;
pub mod units;

pub use color::Color;
pub use error::{Error, Result};
pub use font::Font;
pub use image::{Image, Kind as ImageKind};
pub use page::{Document, Group, Item, Page, PlacedGroup, PlacedImage, PlacedShape};
pub use shape::{Shape, Style};
pub use text::{PlacedText, Text};
pub use units::Unit;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_addpage_produces_a_page_with_items() {
        let mut doc = Document::new(100.0, 100.0, Unit::Mm);
        let page = doc.addpage();
        let circle = Style::new().fill(Color::black()).circle(50.0, 50.0, 20.0);
        page.place(circle);
        assert_eq!(page.items.len(), 1);
    }
}
