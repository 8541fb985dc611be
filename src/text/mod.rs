//! Text model and paragraph layout, spec §3 "Text model" and §4.4
//! "Paragraph layout". Ported from `flat/text.py`.

pub mod layout;

use std::rc::Rc;

use crate::color::Color;
use crate::command::Command;
use crate::error::Result;
use crate::font::Font;
use crate::raster::Rasterizer;
use crate::resources::PdfResources;
use crate::shape::{self, GraphicsState};
use layout::{Layout, RangeMax};

/// The universal newline set a [`Text`] splits paragraphs on (spec §3):
/// CR LF, LF, VT, FF, CR, NEL, LS, PS.
const PARAGRAPH_BREAKS: [&str; 8] = ["\r\n", "\n", "\u{0B}", "\u{0C}", "\r", "\u{85}", "\u{2028}", "\u{2029}"];

/// Font, size, leading and colour shared by one run of characters.
#[derive(Clone)]
pub struct Style {
    pub font: Rc<Font>,
    pub size: f64,
    pub leading: f64,
    pub color: Color,
}

impl Style {
    pub fn new(font: Rc<Font>, size: f64, leading: f64, color: Color) -> Self {
        Style { font, size, leading, color }
    }

    /// The font's ascender scaled to this style's point size.
    pub fn ascender(&self) -> f64 {
        self.font.ascender() as f64 * self.size / self.font.units_per_em() as f64
    }

    /// Emit the PDF graphics-state operators needed to select this style's
    /// font/size and fill colour, registering resources as needed. `has_text`
    /// suppresses the `Tf` operator for an empty run (spec §4.4, ported from
    /// `flat/text.py`'s `style.pdf`).
    pub fn pdf(&self, state: &mut GraphicsState, resources: &mut dyn PdfResources, has_text: bool) -> Result<String> {
        let mut fragments = Vec::new();
        if has_text {
            let same_font = state.font.as_ref().is_some_and(|f| Rc::ptr_eq(f, &self.font));
            if !same_font || self.size != state.size {
                let name = resources.font(&self.font);
                fragments.push(format!("/{name} {} Tf", crate::color::dump(self.size)));
                state.font = Some(Rc::clone(&self.font));
                state.size = self.size;
            }
        }
        let fo = shape::is_overprint(&Some(self.color.clone()));
        let ffo = shape::is_overprint(&state.fill);
        if fo != ffo {
            let sso = shape::is_overprint(&state.stroke);
            let name = resources.overprint(sso, fo);
            fragments.push(format!("/{name} gs"));
        }
        let fill = shape::unwrap_overprint(&Some(self.color.clone()));
        let state_fill = shape::unwrap_overprint(&state.fill);
        if fill != state_fill {
            if let Some(color) = &fill {
                fragments.push(shape::color_operator(color, false, resources)?);
            }
            state.fill = fill;
        }
        Ok(fragments.join(" "))
    }
}

pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// A `style` paired with a run of characters containing no newline.
#[derive(Clone)]
pub struct Span {
    pub style: Style,
    pub text: String,
}

impl Span {
    pub fn new(style: Style, text: impl Into<String>) -> Self {
        Span { style, text: text.into() }
    }
}

/// A non-empty ordered sequence of spans, with eagerly-built range-maximum
/// indexes over the per-span leading and ascender values.
pub struct Paragraph {
    pub spans: Vec<Span>,
    pub leadings: RangeMax,
    pub ascenders: RangeMax,
}

impl Paragraph {
    /// # Panics
    /// Panics if `spans` is empty (spec §3: a paragraph is non-empty).
    pub fn new(spans: Vec<Span>) -> Self {
        assert!(!spans.is_empty(), "a paragraph must contain at least one span");
        let leadings = RangeMax::new(&spans.iter().map(|s| s.style.leading).collect::<Vec<_>>());
        let ascenders = RangeMax::new(&spans.iter().map(|s| s.style.ascender()).collect::<Vec<_>>());
        Paragraph { spans, leadings, ascenders }
    }
}

/// A non-empty ordered sequence of paragraphs.
pub struct Text {
    pub paragraphs: Vec<Paragraph>,
}

impl Text {
    /// Build a single-style text body, splitting `content` into paragraphs
    /// on the universal newline set.
    ///
    /// # Panics
    /// Panics if `content` is empty (spec §3: a text is non-empty).
    pub fn new(content: &str, style: Style) -> Self {
        let paragraphs = split_paragraphs(content)
            .into_iter()
            .map(|line| Paragraph::new(vec![Span::new(style.clone(), line)]))
            .collect();
        Text { paragraphs }
    }

    pub fn from_paragraphs(paragraphs: Vec<Paragraph>) -> Self {
        assert!(!paragraphs.is_empty(), "a text must contain at least one paragraph");
        Text { paragraphs }
    }

    fn tail(&self) -> (usize, usize, usize) {
        let p = self.paragraphs.len() - 1;
        let s = self.paragraphs[p].spans.len() - 1;
        let c = self.paragraphs[p].spans[s].text.chars().count();
        (p, s, c)
    }
}

fn split_paragraphs(content: &str) -> Vec<String> {
    let mut normalized = content.to_string();
    for &sep in &PARAGRAPH_BREAKS {
        if sep != "\n" {
            normalized = normalized.replace(sep, "\n");
        }
    }
    normalized.split('\n').map(str::to_string).collect()
}

/// A text block laid into a fixed-size frame, optionally chained to a
/// following block so overflow continues there (spec §4.4 "Linked
/// blocks").
pub struct PlacedText {
    text: Rc<Text>,
    pub x: f64,
    pub y: f64,
    width: f64,
    height: f64,
    layout: Layout,
    next: Option<Box<PlacedText>>,
}

impl PlacedText {
    pub fn new(text: Rc<Text>, width: f64, height: f64) -> Self {
        let layout = layout::run(&text, width, height, (0, 0, 0));
        PlacedText { text, x: 0.0, y: 0.0, width, height, layout, next: None }
    }

    pub fn lines(&self) -> &[layout::Line] {
        &self.layout.lines
    }

    /// True iff the last committed line's end does not equal the text's
    /// true tail (spec §4.4 "Overflow").
    pub fn overflow(&self) -> bool {
        self.layout.end != self.text.tail()
    }

    pub fn position(&mut self, x: f64, y: f64) -> &mut Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Re-run layout for a new position and frame size, propagating the new
    /// end to the next block in the chain only if it changed (spec §4.4
    /// "Linked blocks", ported from `flat/text.py`'s `placedtext.frame`).
    pub fn frame(&mut self, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        let new_layout = layout::run(&self.text, width, height, self.layout.start);
        let end_changed = new_layout.end != self.layout.end;
        self.layout = new_layout;
        if end_changed {
            if let Some(next) = &mut self.next {
                next.adopt_start(self.layout.end);
            }
        }
        self
    }

    fn adopt_start(&mut self, start: (usize, usize, usize)) {
        let new_layout = layout::run(&self.text, self.width, self.height, start);
        let end_changed = new_layout.end != self.layout.end;
        self.layout = new_layout;
        if end_changed {
            if let Some(next) = &mut self.next {
                next.adopt_start(self.layout.end);
            }
        }
    }

    /// Fork a fresh block starting where this one's layout ends, insert it
    /// after this block in the chain, and return a reference to it.
    pub fn chained(&mut self, width: f64, height: f64) -> &mut PlacedText {
        let start = self.layout.end;
        let mut block = PlacedText::new(Rc::clone(&self.text), width, height);
        block.layout = layout::run(&self.text, width, height, start);
        let tail = self.next.take();
        block.next = tail;
        self.next = Some(Box::new(block));
        self.next.as_mut().unwrap()
    }

    /// The distinct fonts used across this block and its chained
    /// continuations, for back-ends (e.g. SVG `@font-face`) that need to
    /// embed font data once per font rather than once per run.
    pub fn fonts(&self) -> Vec<Rc<Font>> {
        let mut out: Vec<Rc<Font>> = Vec::new();
        let mut block: Option<&PlacedText> = Some(self);
        while let Some(b) = block {
            for (_, run) in layout::runs(&b.layout, &b.text) {
                for (style, _) in run {
                    if !out.iter().any(|f| Rc::ptr_eq(f, &style.font)) {
                        out.push(Rc::clone(&style.font));
                    }
                }
            }
            block = b.next.as_deref();
        }
        out
    }

    /// Emit this block's content stream, diffing font/fill operators against
    /// `state` line by line (ported from `flat/text.py`'s `placedtext.pdf`).
    pub fn pdf(&self, page_height: f64, state: &mut GraphicsState, resources: &mut dyn PdfResources) -> Result<String> {
        let mut fragments = vec![
            "BT".to_string(),
            format!("1 0 0 1 {} {} Tm", crate::color::dump(self.x), crate::color::dump(page_height - self.y)),
        ];
        for (height, run) in layout::runs(&self.layout, &self.text) {
            fragments.push(format!("0 {} Td", crate::color::dump(-height)));
            for (style, string) in run {
                let setup = style.pdf(state, resources, !string.is_empty())?;
                if !setup.is_empty() {
                    fragments.push(setup);
                }
                let mut line = String::new();
                let mut previous = 0u16;
                let factor = -1000.0 / style.font.units_per_em() as f64;
                for ch in string.chars() {
                    let index = style.font.glyph_index(ch as u32);
                    let kerning = style.font.kerning(previous, index);
                    if kerning != 0 {
                        line.push_str(&format!("{}", (kerning as f64 * factor).round() as i64));
                    }
                    line.push_str(&format!("<{index:04x}>"));
                    previous = index;
                }
                if !line.is_empty() {
                    fragments.push(format!("[{line}] TJ"));
                }
            }
        }
        fragments.push("ET".to_string());
        Ok(fragments.join("\n"))
    }

    /// Emit one `<text>` element per committed line, each holding one
    /// `<tspan>` per style run (ported from `flat/text.py`'s
    /// `placedtext.svg`).
    pub fn svg(&self) -> Result<String> {
        let mut fragments = Vec::new();
        let mut y = self.y;
        for (height, run) in layout::runs(&self.layout, &self.text) {
            y += height;
            let mut line = format!(
                "<text x=\"{}\" y=\"{}\" xml:space=\"preserve\">",
                crate::color::dump(self.x),
                crate::color::dump(y)
            );
            for (style, string) in run {
                let name = style.font.postscript_name().ok().flatten().unwrap_or_default();
                line.push_str(&format!(
                    "<tspan font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</tspan>",
                    name,
                    crate::color::dump(style.size),
                    style.color.svg()?,
                    escape_xml(&string)
                ));
            }
            line.push_str("</text>");
            fragments.push(line);
        }
        Ok(fragments.join("\n"))
    }

    /// Rasterize every glyph outline of every committed line (ported from
    /// `flat/text.py`'s `placedtext.rasterize`).
    pub fn rasterize(&self, r: &mut Rasterizer, k: f64, x: f64, y: f64) -> Result<()> {
        let origin = self.x * k + x;
        let mut y = self.y * k + y;
        for (height, run) in layout::runs(&self.layout, &self.text) {
            let mut x = origin;
            y += height * k;
            for (style, string) in run {
                let mut previous = 0u16;
                let factor = style.size / style.font.units_per_em() as f64 * k;
                for ch in string.chars() {
                    let index = style.font.glyph_index(ch as u32);
                    x += style.font.kerning(previous, index) as f64 * factor;
                    let outline = style.font.outline(index)?.transform(1.0, 0.0, 0.0, -1.0, 0.0, 0.0);
                    let mut closed = true;
                    for c in outline.iter() {
                        match c {
                            Command::ClosePath => closed = true,
                            Command::MoveTo { .. } => {
                                if closed {
                                    closed = false;
                                } else {
                                    r.closepath();
                                }
                            }
                            _ => {}
                        }
                        c.rasterize(r, factor, x, y);
                    }
                    r.closepath();
                    let components = style.color.raster_components(r.kind())?;
                    r.composite(&components);
                    x += style.font.advance_width(index)? as f64 * factor;
                    previous = index;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_paragraphs_handles_mixed_line_endings() {
        let parts = split_paragraphs("a\r\nb\nc\rd");
        assert_eq!(parts, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn split_paragraphs_treats_crlf_as_one_break() {
        let parts = split_paragraphs("a\r\n\r\nb");
        assert_eq!(parts, vec!["a", "", "b"]);
    }
}
