//! The resource-registration contract a PDF content-stream writer exposes
//! to the things it serializes, so colour, font and image resources are
//! deduplicated once per document. Ported from `flat/pdf.py`'s
//! `_document_resources`; kept as a trait so `shape`, `text` and `page`
//! never depend on the concrete PDF object model in `backend::pdf`.

use std::rc::Rc;

use crate::color::Color;
use crate::font::Font;
use crate::image::Image;

pub trait PdfResources {
    /// Register (if not already present) an overprint `ExtGState` for this
    /// `(stroke, fill)` pair and return its resource name.
    fn overprint(&mut self, stroke: bool, fill: bool) -> String;
    /// Register (if not already present) a `Separation` colour space for
    /// this spot colour and return its resource name.
    fn space(&mut self, color: &Color) -> String;
    /// Register (if not already present) an embedded font program and
    /// return its resource name.
    fn font(&mut self, font: &Rc<Font>) -> String;
    /// Register (if not already present) an image XObject and return its
    /// resource name.
    fn image(&mut self, image: &Rc<Image>) -> String;
}
