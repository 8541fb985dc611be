//! Page and document composition: placed items, reusable groups, and the
//! top-level scene a document's three back-ends walk (spec §3 "Placed
//! item", "Page", §4 component table row `page`). Ported from
//! `flat/document.py` and `flat/group.py`.
//!
//! Groups ended up here rather than in `shape` (as the distilled spec's
//! scope line suggests) because a `Group`'s children are themselves placed
//! items — shapes, text blocks, images, or nested groups — and `text`
//! already depends on `shape` for [`GraphicsState`]; defining the
//! placed-item sum type in `shape` would close that cycle. `page` is the
//! natural home: it already sits above both.

use std::rc::Rc;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::color::dump;
use crate::error::{ImageError, Result};
use crate::image::{Image, Kind, Source};
use crate::raster::Rasterizer;
use crate::resources::PdfResources;
use crate::shape::{GraphicsState, Shape};
use crate::text::{PlacedText, Text};
use crate::units::Unit;

/// A [`Shape`] positioned on a page or inside a [`Group`] (ported from
/// `flat/shape.py`'s `placedshape`).
#[derive(Debug, Clone)]
pub struct PlacedShape {
    item: Shape,
    k: f64,
    x: f64,
    y: f64,
}

impl PlacedShape {
    fn new(item: Shape, k: f64) -> Self {
        PlacedShape { item, k, x: 0.0, y: 0.0 }
    }

    pub fn position(&mut self, x: f64, y: f64) -> &mut Self {
        self.x = x * self.k;
        self.y = y * self.k;
        self
    }

    pub fn pdf(&self, page_height: f64, state: &mut GraphicsState, resources: &mut dyn PdfResources) -> Result<String> {
        let setup = self.item.style().pdf(state, resources)?;
        let body = self.item.pdf(page_height, self.k, self.x, self.y)?;
        Ok(if setup.is_empty() { body } else { format!("{setup}\n{body}") })
    }

    pub fn svg(&self) -> Result<String> {
        self.item.svg(self.k, self.x, self.y)
    }

    pub fn rasterize(&self, r: &mut Rasterizer, k: f64, x: f64, y: f64) -> Result<()> {
        let device_scale = k;
        let combined_k = self.k * k;
        let combined_x = self.x * k + x;
        let combined_y = self.y * k + y;
        self.item.rasterize(r, combined_k, combined_x, combined_y, device_scale)
    }
}

/// An [`Image`] positioned and sized on a page or inside a [`Group`]
/// (ported from `flat/image.py`'s `placedimage`).
#[derive(Clone)]
pub struct PlacedImage {
    item: Rc<Image>,
    k: f64,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl PlacedImage {
    fn new(item: Rc<Image>, k: f64) -> Self {
        let (width, height) = (item.width as f64, item.height as f64);
        PlacedImage { item, k, x: 0.0, y: 0.0, width, height }
    }

    pub fn position(&mut self, x: f64, y: f64) -> &mut Self {
        self.x = x * self.k;
        self.y = y * self.k;
        self
    }

    pub fn frame(&mut self, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        self.x = x * self.k;
        self.y = y * self.k;
        self.width = width * self.k;
        self.height = height * self.k;
        self
    }

    pub fn fitwidth(&mut self, width: f64) -> &mut Self {
        let (iw, ih) = (self.item.width as f64, self.item.height as f64);
        self.width = width * self.k;
        self.height = width * ih / iw * self.k;
        self
    }

    pub fn fitheight(&mut self, height: f64) -> &mut Self {
        let (iw, ih) = (self.item.width as f64, self.item.height as f64);
        self.width = height * iw / ih * self.k;
        self.height = height * self.k;
        self
    }

    /// Emit a `cm`-transformed `Do` invocation, flipping the JPEG EXIF
    /// rotation (if any) into the placement matrix directly, since the PDF
    /// image XObject itself carries unrotated sample data.
    pub fn pdf(&self, page_height: f64, resources: &mut dyn PdfResources) -> String {
        let (x, y) = (self.x, page_height - self.y - self.height);
        let (w, h) = (self.width, self.height);
        let (mut a, mut b, mut c, mut d, mut e, mut f) = (w, 0.0, 0.0, h, x, y);
        if let Some(Source::Jpeg(_, rotation)) = self.item.source() {
            match rotation {
                90 => (a, b, c, d, e, f) = (0.0, -h, w, 0.0, x, y + h),
                180 => (a, b, c, d, e, f) = (-w, 0.0, 0.0, -h, x + w, y + h),
                270 => (a, b, c, d, e, f) = (0.0, h, -w, 0.0, x + w, y),
                _ => {}
            }
        }
        let name = resources.image(&self.item);
        format!(
            "q {} {} {} {} {} {} cm /{name} Do Q",
            dump(a),
            dump(b),
            dump(c),
            dump(d),
            dump(e),
            dump(f)
        )
    }

    pub fn svg(&self) -> Result<String> {
        let image = &self.item;
        let matches_aspect = (self.width - self.height * (image.width as f64 / image.height as f64)).abs() < 1e-6;
        let ratio = if matches_aspect { "" } else { " preserveAspectRatio=\"none\"" };
        let (mime, data) = match image.source() {
            Some(Source::Png(bytes)) => ("image/png", bytes.clone()),
            Some(Source::Jpeg(bytes, _)) => ("image/jpeg", bytes.clone()),
            None => ("image/png", encode_png(image)?),
        };
        Ok(format!(
            "<image x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\"{ratio} xlink:href=\"data:{mime};base64,{}\" />",
            dump(self.x),
            dump(self.y),
            dump(self.width),
            dump(self.height),
            STANDARD.encode(&data)
        ))
    }

    pub fn rasterize(&self, r: &mut Rasterizer, k: f64, x: f64, y: f64) -> Result<()> {
        let px = (self.x * k + x).round() as i64;
        let py = (self.y * k + y).round() as i64;
        let w = (self.width * k + 0.5) as usize;
        let h = (self.height * k + 0.5) as usize;
        let mut source = (*self.item).clone();
        source.decompress();
        source.resize(w, h, crate::image::Interpolation::Bicubic);
        r.image_mut().blit(px, py, &mut source)
    }
}

fn encode_png(image: &Image) -> Result<Vec<u8>> {
    use image::{codecs::png::PngEncoder, ColorType, ImageEncoder};
    let color = match image.kind {
        Kind::Gray => ColorType::L8,
        Kind::GrayAlpha => ColorType::La8,
        Kind::Rgb => ColorType::Rgb8,
        Kind::Rgba => ColorType::Rgba8,
        Kind::Cmyk => return Err(ImageError::Decoder("cannot re-encode device-CMYK as PNG".to_string()).into()),
    };
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(image.data(), image.width as u32, image.height as u32, color.into())
        .map_err(|e| ImageError::Decoder(e.to_string()))?;
    Ok(buf)
}

/// A reusable, independently-scaled collection of placed items — shapes,
/// text blocks, images, or nested groups — that can itself be placed onto
/// any number of pages (spec §1 scope line "group"; ported from
/// `flat/group.py`'s `group`).
pub struct Group {
    k: f64,
    pub items: Vec<Item>,
}

impl Group {
    pub fn new(unit: Unit) -> Self {
        Group { k: unit.scale(), items: Vec::new() }
    }

    pub fn units(&mut self, unit: Unit) {
        self.k = unit.scale();
    }

    pub fn place(&mut self, shape: Shape) -> &mut PlacedShape {
        self.items.push(Item::Shape(PlacedShape::new(shape, self.k)));
        match self.items.last_mut().unwrap() {
            Item::Shape(s) => s,
            _ => unreachable!(),
        }
    }

    pub fn place_image(&mut self, image: Rc<Image>) -> &mut PlacedImage {
        self.items.push(Item::Image(PlacedImage::new(image, self.k)));
        match self.items.last_mut().unwrap() {
            Item::Image(i) => i,
            _ => unreachable!(),
        }
    }

    pub fn place_text(&mut self, text: Rc<Text>, width: f64, height: f64) -> &mut PlacedText {
        self.items.push(Item::Text(PlacedText::new(text, width * self.k, height * self.k)));
        match self.items.last_mut().unwrap() {
            Item::Text(t) => t,
            _ => unreachable!(),
        }
    }

    pub fn place_group(&mut self, group: Rc<Group>) -> &mut PlacedGroup {
        self.items.push(Item::Group(PlacedGroup::new(group, self.k)));
        match self.items.last_mut().unwrap() {
            Item::Group(g) => g,
            _ => unreachable!(),
        }
    }
}

/// A [`Group`] placed on a page, with its own position and uniform scale
/// factor composed on top of the group's own internal layout (ported from
/// `flat/group.py`'s `placedgroup`).
pub struct PlacedGroup {
    item: Rc<Group>,
    k: f64,
    x: f64,
    y: f64,
    factor: f64,
}

impl PlacedGroup {
    fn new(item: Rc<Group>, k: f64) -> Self {
        PlacedGroup { item, k, x: 0.0, y: 0.0, factor: 1.0 }
    }

    pub fn position(&mut self, x: f64, y: f64) -> &mut Self {
        self.x = x * self.k;
        self.y = y * self.k;
        self
    }

    pub fn scale(&mut self, factor: f64) -> &mut Self {
        self.factor = factor;
        self
    }

    pub fn pdf(&self, page_height: f64, state: &GraphicsState, resources: &mut dyn PdfResources) -> Result<String> {
        let mut dummy = state.clone();
        let mut lines = Vec::new();
        for item in &self.item.items {
            lines.push(item.pdf(0.0, &mut dummy, resources)?);
        }
        Ok(format!(
            "q {} 0 0 {} {} {} cm\n{}\nQ",
            dump(self.factor),
            dump(self.factor),
            dump(self.x),
            dump(page_height - self.y),
            lines.join("\n")
        ))
    }

    pub fn svg(&self) -> Result<String> {
        let mut lines = Vec::new();
        for item in &self.item.items {
            lines.push(item.svg()?);
        }
        Ok(format!(
            "<g transform=\"matrix({}, 0, 0, {}, {}, {})\">{}</g>",
            dump(self.factor),
            dump(self.factor),
            dump(self.x),
            dump(self.y),
            lines.join("\n")
        ))
    }

    pub fn rasterize(&self, r: &mut Rasterizer, k: f64, x: f64, y: f64) -> Result<()> {
        for item in &self.item.items {
            item.rasterize(r, self.factor * k, self.x * k + x, self.y * k + y)?;
        }
        Ok(())
    }
}

/// One child of a [`Page`] or [`Group`] — the placed-item sum type the
/// back-ends visit in order (spec §9 "shapes as an enum, not a trait
/// object", generalised to every placeable kind).
pub enum Item {
    Shape(PlacedShape),
    Text(PlacedText),
    Group(PlacedGroup),
    Image(PlacedImage),
}

impl Item {
    pub fn pdf(&self, page_height: f64, state: &mut GraphicsState, resources: &mut dyn PdfResources) -> Result<String> {
        match self {
            Item::Shape(s) => s.pdf(page_height, state, resources),
            Item::Text(t) => t.pdf(page_height, state, resources),
            Item::Group(g) => g.pdf(page_height, &*state, resources),
            Item::Image(i) => Ok(i.pdf(page_height, resources)),
        }
    }

    pub fn svg(&self) -> Result<String> {
        match self {
            Item::Shape(s) => s.svg(),
            Item::Text(t) => t.svg(),
            Item::Group(g) => g.svg(),
            Item::Image(i) => i.svg(),
        }
    }

    pub fn rasterize(&self, r: &mut Rasterizer, k: f64, x: f64, y: f64) -> Result<()> {
        match self {
            Item::Shape(s) => s.rasterize(r, k, x, y),
            Item::Text(t) => t.rasterize(r, k, x, y),
            Item::Group(g) => g.rasterize(r, k, x, y),
            Item::Image(i) => i.rasterize(r, k, x, y),
        }
    }
}

/// One fixed-size page of a [`Document`], owning its placed items (spec §3
/// "Page"; ported from `flat/document.py`'s `page`).
pub struct Page {
    pub title: String,
    k: f64,
    pub width: f64,
    pub height: f64,
    pub items: Vec<Item>,
}

impl Page {
    fn new(title: String, k: f64, width: f64, height: f64) -> Self {
        Page { title, k, width, height, items: Vec::new() }
    }

    pub fn meta(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = title.into();
        self
    }

    pub fn size(&mut self, width: f64, height: f64, unit: Unit) -> &mut Self {
        self.k = unit.scale();
        self.width = width * self.k;
        self.height = height * self.k;
        self
    }

    pub fn place(&mut self, shape: Shape) -> &mut PlacedShape {
        self.items.push(Item::Shape(PlacedShape::new(shape, self.k)));
        match self.items.last_mut().unwrap() {
            Item::Shape(s) => s,
            _ => unreachable!(),
        }
    }

    pub fn place_image(&mut self, image: Rc<Image>) -> &mut PlacedImage {
        self.items.push(Item::Image(PlacedImage::new(image, self.k)));
        match self.items.last_mut().unwrap() {
            Item::Image(i) => i,
            _ => unreachable!(),
        }
    }

    pub fn place_text(&mut self, text: Rc<Text>, width: f64, height: f64) -> &mut PlacedText {
        self.items.push(Item::Text(PlacedText::new(text, width * self.k, height * self.k)));
        match self.items.last_mut().unwrap() {
            Item::Text(t) => t,
            _ => unreachable!(),
        }
    }

    pub fn place_group(&mut self, group: Rc<Group>) -> &mut PlacedGroup {
        self.items.push(Item::Group(PlacedGroup::new(group, self.k)));
        match self.items.last_mut().unwrap() {
            Item::Group(g) => g,
            _ => unreachable!(),
        }
    }

    /// This page's content stream: every item's `pdf`, diffed against a
    /// fresh [`GraphicsState`] and joined with newlines.
    pub fn content_stream(&self, resources: &mut dyn PdfResources) -> Result<String> {
        let mut state = GraphicsState::default();
        let mut lines = Vec::with_capacity(self.items.len());
        for item in &self.items {
            lines.push(item.pdf(self.height, &mut state, resources)?);
        }
        Ok(lines.join("\n"))
    }

    /// This page's SVG body: every item's `svg`, joined with newlines.
    pub fn svg_body(&self) -> Result<String> {
        let mut lines = Vec::with_capacity(self.items.len());
        for item in &self.items {
            lines.push(item.svg()?);
        }
        Ok(lines.join("\n"))
    }

    /// Rasterize this page at `ppi` (spec §6 "External interfaces";
    /// `flat/document.py`'s `page.image`).
    pub fn image(&self, ppi: f64, kind: Kind) -> Result<Image> {
        let k = ppi / 72.0;
        let w = (self.width * k + 0.5) as usize;
        let h = (self.height * k + 0.5) as usize;
        let mut r = Rasterizer::new(w, h, kind)?;
        for item in &self.items {
            item.rasterize(&mut r, k, 0.0, 0.0)?;
        }
        Ok(r.into_image())
    }
}

/// A document's ordered pages, each sharing the document's initial size and
/// unit scale until overridden (spec §3 "Page"; ported from
/// `flat/document.py`'s `document`).
pub struct Document {
    pub title: String,
    k: f64,
    pub width: f64,
    pub height: f64,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn new(width: f64, height: f64, unit: Unit) -> Self {
        let k = unit.scale();
        Document { title: "Untitled".to_string(), k, width: width * k, height: height * k, pages: Vec::new() }
    }

    pub fn meta(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = title.into();
        self
    }

    pub fn size(&mut self, width: f64, height: f64, unit: Unit) -> &mut Self {
        self.k = unit.scale();
        self.width = width * self.k;
        self.height = height * self.k;
        self
    }

    pub fn addpage(&mut self) -> &mut Page {
        self.pages.push(Page::new(self.title.clone(), self.k, self.width, self.height));
        self.pages.last_mut().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::shape::Style;

    #[test]
    fn addpage_inherits_document_size_in_points() {
        let mut doc = Document::new(100.0, 100.0, Unit::Mm);
        let page = doc.addpage();
        assert!((page.width - 283.46456692913385).abs() < 1e-9);
        assert!((page.height - 283.46456692913385).abs() < 1e-9);
    }

    #[test]
    fn page_content_stream_includes_stroke_width_and_circle() {
        let mut doc = Document::new(100.0, 100.0, Unit::Mm);
        let page = doc.addpage();
        let circle = Style::new()
            .nofill()
            .stroke(Color::red())
            .width(2.5, Unit::Pt)
            .circle(50.0, 50.0, 20.0);
        page.place(circle);
        struct Null;
        impl PdfResources for Null {
            fn overprint(&mut self, _: bool, _: bool) -> String {
                "G0".into()
            }
            fn space(&mut self, _: &Color) -> String {
                "C0".into()
            }
            fn font(&mut self, _: &Rc<crate::font::Font>) -> String {
                "F0".into()
            }
            fn image(&mut self, _: &Rc<Image>) -> String {
                "I0".into()
            }
        }
        let mut resources = Null;
        let stream = page.content_stream(&mut resources).unwrap();
        assert!(stream.contains("2.5 w"));
        assert!(stream.contains(" c "));
    }
}
