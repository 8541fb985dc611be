//! Vector shapes and their paint style (spec §3 "Style", §9 "Shapes as an
//! enum, not a trait object"). Ported from `flat/shape.py`.

use std::rc::Rc;

use crate::color::{dump, Color};
use crate::command::{Command, CommandStream};
use crate::error::Result;
use crate::font::Font;
use crate::geom::{elevate2, Point, Segment};
use crate::raster::{CapKind, JoinKind, Rasterizer};
use crate::resources::PdfResources;
use crate::units::Unit;

/// A paint style: fill/stroke colour and stroke appearance, shared by every
/// shape constructed from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub stroke: Option<Color>,
    pub fill: Option<Color>,
    pub width: f64,
    pub cap: CapKind,
    pub join: JoinKind,
    pub limit: f64,
}

impl Default for Style {
    fn default() -> Self {
        Style {
            stroke: Some(Color::black()),
            fill: None,
            width: 1.0,
            cap: CapKind::Butt,
            join: JoinKind::Miter,
            limit: 10.0,
        }
    }
}

impl Style {
    pub fn new() -> Self {
        Style::default()
    }

    pub fn stroke(mut self, color: Color) -> Self {
        self.stroke = Some(color);
        self
    }

    pub fn fill(mut self, color: Color) -> Self {
        self.fill = Some(color);
        self
    }

    pub fn nostroke(mut self) -> Self {
        self.stroke = None;
        self
    }

    pub fn nofill(mut self) -> Self {
        self.fill = None;
        self
    }

    pub fn width(mut self, value: f64, unit: Unit) -> Self {
        self.width = value * unit.scale();
        self
    }

    pub fn cap(mut self, kind: CapKind) -> Self {
        self.cap = kind;
        self
    }

    pub fn join(mut self, kind: JoinKind) -> Self {
        self.join = kind;
        self
    }

    /// # Panics
    /// Panics if `value` is less than one point (programmer error, spec §7).
    pub fn limit(mut self, value: f64, unit: Unit) -> Self {
        let scaled = value * unit.scale();
        assert!(scaled >= 1.0, "invalid miter limit");
        self.limit = scaled;
        self
    }

    pub fn line(self, x0: f64, y0: f64, x1: f64, y1: f64) -> Shape {
        Shape::Line(Line { style: self, x0, y0, x1, y1 })
    }

    pub fn polyline(self, coordinates: Vec<f64>) -> Shape {
        Shape::Polyline(Polyline { style: self, coordinates })
    }

    pub fn polygon(self, coordinates: Vec<f64>) -> Shape {
        Shape::Polygon(Polygon { style: self, coordinates })
    }

    pub fn rectangle(self, x: f64, y: f64, width: f64, height: f64) -> Shape {
        Shape::Rectangle(Rectangle { style: self, x, y, width, height })
    }

    pub fn circle(self, x: f64, y: f64, r: f64) -> Shape {
        Shape::Circle(Circle { style: self, x, y, r })
    }

    pub fn ellipse(self, x: f64, y: f64, rx: f64, ry: f64) -> Shape {
        Shape::Ellipse(Ellipse { style: self, x, y, rx, ry })
    }

    pub fn path(self, commands: CommandStream) -> Shape {
        Shape::Path(Path { style: self, commands })
    }

    /// `pdfpaint`: the content-stream paint operator implied by fill/stroke
    /// presence.
    pub fn pdfpaint(&self) -> &'static str {
        match (self.stroke.is_some(), self.fill.is_some()) {
            (true, true) => "B",
            (true, false) => "S",
            (false, true) => "f",
            (false, false) => "n",
        }
    }

    /// The SVG presentation attributes for this style.
    pub fn svg(&self) -> Result<String> {
        let mut attributes = Vec::new();
        match &self.fill {
            Some(fill) => attributes.push(format!("fill=\"{}\"", fill.svg()?)),
            None => attributes.push("fill=\"none\"".to_string()),
        }
        if let Some(stroke) = &self.stroke {
            attributes.push(format!("stroke=\"{}\"", stroke.svg()?));
            if self.width != 1.0 {
                attributes.push(format!("stroke-width=\"{}\"", dump(self.width)));
            }
            if self.cap != CapKind::Butt {
                let cap = if self.cap == CapKind::Round { "round" } else { "square" };
                attributes.push(format!("stroke-linecap=\"{cap}\""));
            }
            if self.join != JoinKind::Miter {
                let join = if self.join == JoinKind::Round { "round" } else { "bevel" };
                attributes.push(format!("stroke-linejoin=\"{join}\""));
            } else if self.limit != 4.0 {
                attributes.push(format!("stroke-miterlimit=\"{}\"", dump(self.limit)));
            }
        }
        Ok(attributes.join(" "))
    }

    /// Emit the PDF graphics-state operators needed to bring `state` in
    /// line with this style, registering any spot-colour or overprint
    /// resources it newly requires through `resources`. Operators for
    /// properties already matching `state` are skipped.
    pub fn pdf(&self, state: &mut GraphicsState, resources: &mut dyn PdfResources) -> Result<String> {
        let mut fragments = Vec::new();
        let so = is_overprint(&self.stroke);
        let fo = is_overprint(&self.fill);
        let sso = is_overprint(&state.stroke);
        let ffo = is_overprint(&state.fill);
        if (self.stroke.is_some() && so != sso) || (self.fill.is_some() && fo != ffo) {
            let name = resources.overprint(so, fo);
            fragments.push(format!("/{name} gs"));
        }
        let stroke = unwrap_overprint(&self.stroke);
        let fill = unwrap_overprint(&self.fill);
        let state_stroke = unwrap_overprint(&state.stroke);
        let state_fill = unwrap_overprint(&state.fill);
        if let Some(color) = &stroke {
            if Some(color) != state_stroke.as_ref() {
                fragments.push(color_operator(color, true, resources)?);
                state.stroke = self.stroke.clone();
            }
        }
        if let Some(color) = &fill {
            if Some(color) != state_fill.as_ref() {
                fragments.push(color_operator(color, false, resources)?);
                state.fill = self.fill.clone();
            }
        }
        if self.width != state.width {
            fragments.push(format!("{} w", dump(self.width)));
            state.width = self.width;
        }
        if self.cap != state.cap {
            let code = match self.cap {
                CapKind::Butt => 0,
                CapKind::Round => 1,
                CapKind::Square => 2,
            };
            fragments.push(format!("{code} J"));
            state.cap = self.cap;
        }
        if self.join != state.join {
            let code = match self.join {
                JoinKind::Miter => 0,
                JoinKind::Round => 1,
                JoinKind::Bevel => 2,
            };
            fragments.push(format!("{code} j"));
            state.join = self.join;
        }
        if self.limit != state.limit {
            fragments.push(format!("{} M", dump(self.limit)));
            state.limit = self.limit;
        }
        Ok(fragments.join(" "))
    }
}

pub(crate) fn is_overprint(color: &Option<Color>) -> bool {
    matches!(color, Some(Color::Overprint(_)))
}

pub(crate) fn unwrap_overprint(color: &Option<Color>) -> Option<Color> {
    match color {
        Some(Color::Overprint(inner)) => Some((**inner).clone()),
        other => other.clone(),
    }
}

pub(crate) fn color_operator(color: &Color, stroke: bool, resources: &mut dyn PdfResources) -> Result<String> {
    match color {
        Color::Spot { .. } => {
            let name = resources.space(color);
            color.pdf_operator(stroke, Some(&name))
        }
        _ => color.pdf_operator(stroke, None),
    }
}

/// The subset of a PDF content stream's graphics state a [`Style`] diffs
/// against, so repeated shapes that share paint properties don't re-emit
/// their operators. Mirrors `flat/pdf.py`'s `_graphic_state`.
#[derive(Debug, Clone)]
pub struct GraphicsState {
    pub stroke: Option<Color>,
    pub fill: Option<Color>,
    pub width: f64,
    pub cap: CapKind,
    pub join: JoinKind,
    pub limit: f64,
    /// The font currently selected by `Tf`, compared by `Rc` identity.
    pub font: Option<Rc<Font>>,
    pub size: f64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        GraphicsState {
            stroke: Some(Color::black()),
            fill: Some(Color::black()),
            width: 1.0,
            cap: CapKind::Butt,
            join: JoinKind::Miter,
            limit: 10.0,
            font: None,
            size: 0.0,
        }
    }
}

/// One drawable vector primitive, carrying its own [`Style`].
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Line(Line),
    Polyline(Polyline),
    Polygon(Polygon),
    Rectangle(Rectangle),
    Circle(Circle),
    Ellipse(Ellipse),
    Path(Path),
}

impl Shape {
    pub fn style(&self) -> &Style {
        match self {
            Shape::Line(s) => &s.style,
            Shape::Polyline(s) => &s.style,
            Shape::Polygon(s) => &s.style,
            Shape::Rectangle(s) => &s.style,
            Shape::Circle(s) => &s.style,
            Shape::Ellipse(s) => &s.style,
            Shape::Path(s) => &s.style,
        }
    }

    pub fn commands(&self) -> CommandStream {
        match self {
            Shape::Line(s) => s.commands(),
            Shape::Polyline(s) => s.commands(),
            Shape::Polygon(s) => s.commands(),
            Shape::Rectangle(s) => s.commands(),
            Shape::Circle(s) => s.commands(),
            Shape::Ellipse(s) => s.commands(),
            Shape::Path(s) => s.commands(),
        }
    }

    pub fn pdf(&self, page_height: f64, k: f64, x: f64, y: f64) -> Result<String> {
        match self {
            Shape::Line(s) => Ok(s.pdf(page_height, k, x, y)),
            Shape::Polyline(s) => Ok(s.pdf(page_height, k, x, y)),
            Shape::Polygon(s) => Ok(s.pdf(page_height, k, x, y)),
            Shape::Rectangle(s) => Ok(s.pdf(page_height, k, x, y)),
            Shape::Circle(s) => Ok(s.pdf(page_height, k, x, y)),
            Shape::Ellipse(s) => Ok(s.pdf(page_height, k, x, y)),
            Shape::Path(s) => s.pdf(page_height, k, x, y),
        }
    }

    pub fn svg(&self, k: f64, x: f64, y: f64) -> Result<String> {
        match self {
            Shape::Line(s) => s.svg(k, x, y),
            Shape::Polyline(s) => s.svg(k, x, y),
            Shape::Polygon(s) => s.svg(k, x, y),
            Shape::Rectangle(s) => s.svg(k, x, y),
            Shape::Circle(s) => s.svg(k, x, y),
            Shape::Ellipse(s) => s.svg(k, x, y),
            Shape::Path(s) => s.svg(k, x, y),
        }
    }

    /// Drive `r` to paint this shape's fill and/or stroke, under geometric
    /// scale `k` and translation `(x,y)`. `device_scale` converts the
    /// style's stroke width (in page units) to the rasterizer's own pixel
    /// scale — ported from `flat/shape.py`'s `placedshape.rasterize`.
    pub fn rasterize(&self, r: &mut Rasterizer, k: f64, x: f64, y: f64, device_scale: f64) -> Result<()> {
        let style = self.style();
        let commands = self.commands();
        if let Some(fill) = &style.fill {
            let mut closed = true;
            for c in commands.iter() {
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
                c.rasterize(r, k, x, y);
            }
            r.closepath();
            let components = fill.raster_components(r.kind())?;
            r.composite(&components);
        }
        if let Some(stroke) = &style.stroke {
            let distance = style.width / 2.0 * device_scale;
            let limit = (style.limit * distance * 256.0).powi(2);
            let mut closed = true;
            for c in commands.iter() {
                match c {
                    Command::ClosePath => closed = true,
                    Command::MoveTo { .. } => {
                        if closed {
                            closed = false;
                        } else {
                            r.cap(style.cap);
                        }
                    }
                    _ => {}
                }
                c.rasterize_stroke(r, k, x, y, distance, style.join, limit);
            }
            if !closed {
                r.cap(style.cap);
            }
            let components = stroke.raster_components(r.kind())?;
            r.composite(&components);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub style: Style,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Line {
    pub fn commands(&self) -> CommandStream {
        let mut cs = CommandStream::new();
        cs.move_to(self.x0, self.y0);
        cs.line_to(self.x1, self.y1);
        cs
    }

    pub fn pdf(&self, page_height: f64, k: f64, x: f64, y: f64) -> String {
        format!(
            "{} {} m {} {} l {}",
            dump(self.x0 * k + x),
            dump(page_height - (self.y0 * k + y)),
            dump(self.x1 * k + x),
            dump(page_height - (self.y1 * k + y)),
            self.style.pdfpaint(),
        )
    }

    pub fn svg(&self, k: f64, x: f64, y: f64) -> Result<String> {
        Ok(format!(
            "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" {} />",
            dump(self.x0 * k + x),
            dump(self.y0 * k + y),
            dump(self.x1 * k + x),
            dump(self.y1 * k + y),
            self.style.svg()?,
        ))
    }
}

/// Shared commands/pdf/svg body for [`Polyline`] and [`Polygon`], which
/// differ only in whether the outline closes.
fn polyline_commands(coordinates: &[f64], closed: bool) -> CommandStream {
    let mut cs = CommandStream::new();
    for (i, chunk) in coordinates.chunks(2).enumerate() {
        let (cx, cy) = (chunk[0], chunk[1]);
        if i == 0 {
            cs.move_to(cx, cy);
        } else {
            cs.line_to(cx, cy);
        }
    }
    if closed {
        cs.close_path();
    }
    cs
}

fn polyline_pdf(coordinates: &[f64], page_height: f64, k: f64, x: f64, y: f64, closed: bool, paint: &str) -> String {
    let mut fragments = Vec::new();
    for (i, chunk) in coordinates.chunks(2).enumerate() {
        let (cx, cy) = (chunk[0], chunk[1]);
        fragments.push(dump(cx * k + x));
        fragments.push(dump(page_height - (cy * k + y)));
        fragments.push(if i == 0 { "m" } else { "l" }.to_string());
    }
    if closed {
        fragments.push("h".to_string());
    }
    fragments.push(paint.to_string());
    fragments.join(" ")
}

fn polyline_svg(coordinates: &[f64], k: f64, x: f64, y: f64, tag: &str, style: &Style) -> Result<String> {
    let mut points = Vec::new();
    for (i, &c) in coordinates.iter().enumerate() {
        let offset = if i % 2 == 0 { x } else { y };
        points.push(dump(c * k + offset));
    }
    Ok(format!("<{tag} points=\"{}\" {} />", points.join(" "), style.svg()?))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub style: Style,
    pub coordinates: Vec<f64>,
}

impl Polyline {
    pub fn commands(&self) -> CommandStream {
        polyline_commands(&self.coordinates, false)
    }

    pub fn pdf(&self, page_height: f64, k: f64, x: f64, y: f64) -> String {
        polyline_pdf(&self.coordinates, page_height, k, x, y, false, self.style.pdfpaint())
    }

    pub fn svg(&self, k: f64, x: f64, y: f64) -> Result<String> {
        polyline_svg(&self.coordinates, k, x, y, "polyline", &self.style)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub style: Style,
    pub coordinates: Vec<f64>,
}

impl Polygon {
    pub fn commands(&self) -> CommandStream {
        polyline_commands(&self.coordinates, true)
    }

    pub fn pdf(&self, page_height: f64, k: f64, x: f64, y: f64) -> String {
        polyline_pdf(&self.coordinates, page_height, k, x, y, true, self.style.pdfpaint())
    }

    pub fn svg(&self, k: f64, x: f64, y: f64) -> Result<String> {
        polyline_svg(&self.coordinates, k, x, y, "polygon", &self.style)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    pub style: Style,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rectangle {
    pub fn commands(&self) -> CommandStream {
        let mut cs = CommandStream::new();
        cs.move_to(self.x, self.y);
        cs.line_to(self.x + self.width, self.y);
        cs.line_to(self.x + self.width, self.y + self.height);
        cs.line_to(self.x, self.y + self.height);
        cs.close_path();
        cs
    }

    pub fn pdf(&self, page_height: f64, k: f64, x: f64, y: f64) -> String {
        format!(
            "{} {} {} {} re {}",
            dump(self.x * k + x),
            dump(page_height - ((self.y + self.height) * k + y)),
            dump(self.width * k),
            dump(self.height * k),
            self.style.pdfpaint(),
        )
    }

    pub fn svg(&self, k: f64, x: f64, y: f64) -> Result<String> {
        Ok(format!(
            "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" {} />",
            dump(self.x * k + x),
            dump(self.y * k + y),
            dump(self.width * k),
            dump(self.height * k),
            self.style.svg()?,
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    pub style: Style,
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

impl Circle {
    fn as_ellipse(&self) -> Ellipse {
        Ellipse { style: self.style.clone(), x: self.x, y: self.y, rx: self.r, ry: self.r }
    }

    pub fn commands(&self) -> CommandStream {
        self.as_ellipse().commands()
    }

    pub fn pdf(&self, page_height: f64, k: f64, x: f64, y: f64) -> String {
        self.as_ellipse().pdf(page_height, k, x, y)
    }

    pub fn svg(&self, k: f64, x: f64, y: f64) -> Result<String> {
        Ok(format!(
            "<circle cx=\"{}\" cy=\"{}\" r=\"{}\" {} />",
            dump(self.x * k + x),
            dump(self.y * k + y),
            dump(self.r * k),
            self.style.svg()?,
        ))
    }
}

/// Kappa: the cubic Bézier control-point offset (as a fraction of the
/// radius) that best approximates a circular quarter-arc.
fn ellipse_kappa() -> f64 {
    4.0 / 3.0 * (2f64.sqrt() - 1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ellipse {
    pub style: Style,
    pub x: f64,
    pub y: f64,
    pub rx: f64,
    pub ry: f64,
}

impl Ellipse {
    pub fn commands(&self) -> CommandStream {
        let (x, y, rx, ry) = (self.x, self.y, self.rx, self.ry);
        let dx = rx * ellipse_kappa();
        let dy = ry * ellipse_kappa();
        let mut cs = CommandStream::new();
        cs.move_to(x + rx, y);
        cs.curve_to(x + rx, y - dy, x + dx, y - ry, x, y - ry);
        cs.curve_to(x - dx, y - ry, x - rx, y - dy, x - rx, y);
        cs.curve_to(x - rx, y + dy, x - dx, y + ry, x, y + ry);
        cs.curve_to(x + dx, y + ry, x + rx, y + dy, x + rx, y);
        cs.close_path();
        cs
    }

    pub fn pdf(&self, page_height: f64, k: f64, x: f64, y: f64) -> String {
        let xc = self.x * k + x;
        let yc = page_height - (self.y * k + y);
        let rx = self.rx * k;
        let ry = self.ry * k;
        let dx = rx * ellipse_kappa();
        let dy = ry * ellipse_kappa();
        let (x0, x1, x2, x3, x4) = (xc - rx, xc - dx, xc, xc + dx, xc + rx);
        let (y0, y1, y2, y3, y4) = (yc - ry, yc - dy, yc, yc + dy, yc + ry);
        format!(
            "{} {} m {} {} {} {} {} {} c {} {} {} {} {} {} c {} {} {} {} {} {} c {} {} {} {} {} {} c h {}",
            dump(x4),
            dump(y2),
            dump(x4),
            dump(y1),
            dump(x3),
            dump(y0),
            dump(x2),
            dump(y0),
            dump(x1),
            dump(y0),
            dump(x0),
            dump(y1),
            dump(x0),
            dump(y2),
            dump(x0),
            dump(y3),
            dump(x1),
            dump(y4),
            dump(x2),
            dump(y4),
            dump(x3),
            dump(y4),
            dump(x4),
            dump(y3),
            dump(x4),
            dump(y2),
            self.style.pdfpaint(),
        )
    }

    pub fn svg(&self, k: f64, x: f64, y: f64) -> Result<String> {
        Ok(format!(
            "<ellipse cx=\"{}\" cy=\"{}\" rx=\"{}\" ry=\"{}\" {} />",
            dump(self.x * k + x),
            dump(self.y * k + y),
            dump(self.rx * k),
            dump(self.ry * k),
            self.style.svg()?,
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub style: Style,
    pub commands: CommandStream,
}

impl Path {
    pub fn commands(&self) -> CommandStream {
        self.commands.clone()
    }

    pub fn pdf(&self, page_height: f64, k: f64, x: f64, y: f64) -> Result<String> {
        let elevated = elevate_quadratics(&self.commands);
        let mut fragments = Vec::with_capacity(elevated.iter().count() + 1);
        for c in elevated.iter() {
            fragments.push(c.pdf(page_height, k, x, y)?);
        }
        fragments.push(self.style.pdfpaint().to_string());
        Ok(fragments.join(" "))
    }

    pub fn svg(&self, k: f64, x: f64, y: f64) -> Result<String> {
        let fragments: Vec<String> = self.commands.iter().map(|c| c.svg(k, x, y)).collect();
        Ok(format!("<path d=\"{}\" {} />", fragments.join(" "), self.style.svg()?))
    }
}

/// Degree-elevate every [`Command::QuadTo`] in `commands` to a cubic, since
/// PDF content streams have no quadratic curve operator. Tracks the current
/// and sub-path-start point the way `flat/path.py`'s `elevated` does.
fn elevate_quadratics(commands: &CommandStream) -> CommandStream {
    let mut out = CommandStream::new();
    let (mut x, mut y) = (0.0, 0.0);
    let (mut mx, mut my) = (0.0, 0.0);
    for c in commands.iter() {
        match *c {
            Command::MoveTo { x: cx, y: cy } => {
                mx = cx;
                my = cy;
                x = cx;
                y = cy;
                out.push(*c);
            }
            Command::QuadTo { x1, y1, x: cx, y: cy } => {
                let Segment::Cubic(_, c1, c2, _) =
                    elevate2(&Segment::Quad(Point::new(x, y), Point::new(x1, y1), Point::new(cx, cy)))
                else {
                    unreachable!("elevate2 always returns a cubic segment")
                };
                out.push(Command::CurveTo { x1: c1.x, y1: c1.y, x2: c2.x, y2: c2.y, x: cx, y: cy });
                x = cx;
                y = cy;
            }
            Command::ClosePath => {
                x = mx;
                y = my;
                out.push(*c);
            }
            Command::LineTo { x: cx, y: cy } => {
                x = cx;
                y = cy;
                out.push(*c);
            }
            Command::CurveTo { x: cx, y: cy, .. } => {
                x = cx;
                y = cy;
                out.push(*c);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_style_strokes_black_with_no_fill() {
        let style = Style::new();
        assert_eq!(style.stroke, Some(Color::black()));
        assert_eq!(style.fill, None);
        assert_eq!(style.pdfpaint(), "S");
    }

    #[test]
    fn pdfpaint_selects_operator_from_fill_and_stroke_presence() {
        assert_eq!(Style::new().nostroke().pdfpaint(), "n");
        assert_eq!(Style::new().nostroke().fill(Color::red()).pdfpaint(), "f");
        assert_eq!(Style::new().fill(Color::red()).pdfpaint(), "B");
    }

    #[test]
    #[should_panic(expected = "invalid miter limit")]
    fn limit_below_one_point_panics() {
        Style::new().limit(0.5, Unit::Pt);
    }

    #[test]
    fn rectangle_commands_trace_four_corners_closed() {
        let rect = Style::new().rectangle(0.0, 0.0, 10.0, 20.0);
        let cs = rect.commands();
        assert_eq!(cs.iter().count(), 5);
        assert!(matches!(cs.iter().last(), Some(Command::ClosePath)));
    }

    #[test]
    fn circle_pdf_matches_ellipse_with_equal_radii() {
        let circle = Style::new().circle(10.0, 10.0, 5.0);
        let ellipse = Style::new().ellipse(10.0, 10.0, 5.0, 5.0);
        assert_eq!(circle.pdf(100.0, 1.0, 0.0, 0.0).unwrap(), ellipse.pdf(100.0, 1.0, 0.0, 0.0).unwrap());
    }

    #[test]
    fn polygon_pdf_closes_with_h_before_paint_operator() {
        let polygon = Style::new().polygon(vec![0.0, 0.0, 10.0, 0.0, 10.0, 10.0]);
        let out = polygon.pdf(100.0, 1.0, 0.0, 0.0).unwrap();
        assert!(out.ends_with("h S"));
    }

    #[test]
    fn graphics_state_pdf_skips_operators_already_in_state() {
        let mut state = GraphicsState::default();
        let mut resources = NullResources;
        let style = Style::new();
        assert_eq!(style.pdf(&mut state, &mut resources).unwrap(), "");
    }

    #[test]
    fn graphics_state_pdf_emits_changed_width() {
        let mut state = GraphicsState::default();
        let mut resources = NullResources;
        let style = Style::new().width(2.0, Unit::Pt);
        assert_eq!(style.pdf(&mut state, &mut resources).unwrap(), "2 w");
    }

    struct NullResources;
    impl PdfResources for NullResources {
        fn overprint(&mut self, _stroke: bool, _fill: bool) -> String {
            "G0".to_string()
        }
        fn space(&mut self, _color: &Color) -> String {
            "C0".to_string()
        }
        fn font(&mut self, _font: &std::rc::Rc<crate::font::Font>) -> String {
            "F0".to_string()
        }
        fn image(&mut self, _image: &std::rc::Rc<crate::image::Image>) -> String {
            "I0".to_string()
        }
    }
}
