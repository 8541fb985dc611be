//! Command streams (spec §3 "Command stream", §9 "Command streams as tagged
//! variants"). Ported from `flat/command.py`.

use crate::color::dump;
use crate::error::{Error, Result};
use crate::raster::{JoinKind, Rasterizer};

/// One drawing command. `ClosePath` is a variant with no payload, matching
/// the design note in spec §9.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
    QuadTo { x1: f64, y1: f64, x: f64, y: f64 },
    CurveTo { x1: f64, y1: f64, x2: f64, y2: f64, x: f64, y: f64 },
    ClosePath,
}

impl Command {
    /// Apply the 2x3 affine matrix `[a b c d e f]` (PDF/SVG convention:
    /// `x' = a*x + c*y + e`, `y' = b*x + d*y + f`) to every point the
    /// command carries.
    pub fn transform(self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Command {
        let tx = |x: f64, y: f64| (x * a + y * c + e, x * b + y * d + f);
        match self {
            Command::MoveTo { x, y } => {
                let (x, y) = tx(x, y);
                Command::MoveTo { x, y }
            }
            Command::LineTo { x, y } => {
                let (x, y) = tx(x, y);
                Command::LineTo { x, y }
            }
            Command::QuadTo { x1, y1, x, y } => {
                let (x1, y1) = tx(x1, y1);
                let (x, y) = tx(x, y);
                Command::QuadTo { x1, y1, x, y }
            }
            Command::CurveTo { x1, y1, x2, y2, x, y } => {
                let (x1, y1) = tx(x1, y1);
                let (x2, y2) = tx(x2, y2);
                let (x, y) = tx(x, y);
                Command::CurveTo { x1, y1, x2, y2, x, y }
            }
            Command::ClosePath => Command::ClosePath,
        }
    }

    /// `pdf`: the PDF content-stream operator for this command, under scale
    /// `k` and translation `(x,y)`, with `page_height` used to flip the
    /// user-space y-up convention to PDF's bottom-left origin.
    pub fn pdf(&self, page_height: f64, k: f64, x: f64, y: f64) -> Result<String> {
        Ok(match *self {
            Command::MoveTo { x: px, y: py } => {
                format!("{} {} m", dump(px * k + x), dump(page_height - (py * k + y)))
            }
            Command::LineTo { x: px, y: py } => {
                format!("{} {} l", dump(px * k + x), dump(page_height - (py * k + y)))
            }
            Command::QuadTo { .. } => {
                return Err(Error::Unsupported("quadratic curve in a PDF content stream"));
            }
            Command::CurveTo { x1, y1, x2, y2, x: px, y: py } => format!(
                "{} {} {} {} {} {} c",
                dump(x1 * k + x),
                dump(page_height - (y1 * k + y)),
                dump(x2 * k + x),
                dump(page_height - (y2 * k + y)),
                dump(px * k + x),
                dump(page_height - (py * k + y)),
            ),
            Command::ClosePath => "h".to_string(),
        })
    }

    /// `svg`: the SVG path-data fragment for this command.
    pub fn svg(&self, k: f64, x: f64, y: f64) -> String {
        match *self {
            Command::MoveTo { x: px, y: py } => format!("M{},{}", dump(px * k + x), dump(py * k + y)),
            Command::LineTo { x: px, y: py } => format!("L{},{}", dump(px * k + x), dump(py * k + y)),
            Command::QuadTo { x1, y1, x: px, y: py } => format!(
                "Q{},{},{},{}",
                dump(x1 * k + x),
                dump(y1 * k + y),
                dump(px * k + x),
                dump(py * k + y)
            ),
            Command::CurveTo { x1, y1, x2, y2, x: px, y: py } => format!(
                "C{},{},{},{},{},{}",
                dump(x1 * k + x),
                dump(y1 * k + y),
                dump(x2 * k + x),
                dump(y2 * k + y),
                dump(px * k + x),
                dump(py * k + y)
            ),
            Command::ClosePath => "Z".to_string(),
        }
    }

    /// `rasterize`: drive the rasterizer's fill pen for this command, under
    /// scale `k` and translation `(x,y)`.
    pub fn rasterize(&self, r: &mut Rasterizer, k: f64, x: f64, y: f64) {
        match *self {
            Command::MoveTo { x: px, y: py } => r.moveto(px * k + x, py * k + y),
            Command::LineTo { x: px, y: py } => r.lineto(px * k + x, py * k + y),
            Command::QuadTo { x1, y1, x: px, y: py } => {
                r.quadto(x1 * k + x, y1 * k + y, px * k + x, py * k + y)
            }
            Command::CurveTo { x1, y1, x2, y2, x: px, y: py } => r.curveto(
                x1 * k + x,
                y1 * k + y,
                x2 * k + x,
                y2 * k + y,
                px * k + x,
                py * k + y,
            ),
            Command::ClosePath => r.closepath(),
        }
    }

    /// `rasterizestroke`: drive the rasterizer's stroke pen for this command.
    pub fn rasterize_stroke(
        &self,
        r: &mut Rasterizer,
        k: f64,
        x: f64,
        y: f64,
        distance: f64,
        join: JoinKind,
        limit: f64,
    ) {
        match *self {
            Command::MoveTo { x: px, y: py } => {
                r.stroke_moveto(px * k + x, py * k + y, distance, join, limit)
            }
            Command::LineTo { x: px, y: py } => {
                r.stroke_lineto(px * k + x, py * k + y, distance, join, limit)
            }
            Command::QuadTo { x1, y1, x: px, y: py } => r.stroke_quadto(
                x1 * k + x,
                y1 * k + y,
                px * k + x,
                py * k + y,
                distance,
                join,
                limit,
            ),
            Command::CurveTo { x1, y1, x2, y2, x: px, y: py } => r.stroke_curveto(
                x1 * k + x,
                y1 * k + y,
                x2 * k + x,
                y2 * k + y,
                px * k + x,
                py * k + y,
                distance,
                join,
                limit,
            ),
            Command::ClosePath => r.stroke_closepath(distance, join, limit),
        }
    }
}

/// An ordered sequence of commands forming a complete outline.
///
/// Invariant (spec §3): every drawable sub-path begins with `MoveTo`;
/// `ClosePath` returns the current point to the last `MoveTo`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandStream(pub Vec<Command>);

impl CommandStream {
    pub fn new() -> Self {
        CommandStream(Vec::new())
    }

    pub fn push(&mut self, cmd: Command) {
        self.0.push(cmd);
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.push(Command::MoveTo { x, y });
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        self.push(Command::LineTo { x, y });
    }

    pub fn quad_to(&mut self, x1: f64, y1: f64, x: f64, y: f64) {
        self.push(Command::QuadTo { x1, y1, x, y });
    }

    pub fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x: f64, y: f64) {
        self.push(Command::CurveTo { x1, y1, x2, y2, x, y });
    }

    pub fn close_path(&mut self) {
        self.push(Command::ClosePath);
    }

    pub fn transform(&self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> CommandStream {
        CommandStream(self.0.iter().map(|cmd| cmd.transform(a, b, c, d, e, f)).collect())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_applies_identity_unchanged() {
        let cmd = Command::LineTo { x: 3.0, y: 4.0 };
        assert_eq!(cmd.transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0), cmd);
    }

    #[test]
    fn transform_translates_points() {
        let cmd = Command::MoveTo { x: 1.0, y: 2.0 };
        let moved = cmd.transform(1.0, 0.0, 0.0, 1.0, 10.0, 20.0);
        assert_eq!(moved, Command::MoveTo { x: 11.0, y: 22.0 });
    }

    #[test]
    fn quadto_is_unsupported_in_pdf_content_streams() {
        let cmd = Command::QuadTo { x1: 1.0, y1: 1.0, x: 2.0, y: 2.0 };
        assert!(cmd.pdf(100.0, 1.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn closepath_emits_h_in_pdf_and_z_in_svg() {
        assert_eq!(Command::ClosePath.pdf(100.0, 1.0, 0.0, 0.0).unwrap(), "h");
        assert_eq!(Command::ClosePath.svg(1.0, 0.0, 0.0), "Z");
    }

    #[test]
    fn pdf_lineto_flips_y_against_page_height() {
        let cmd = Command::LineTo { x: 10.0, y: 5.0 };
        assert_eq!(cmd.pdf(100.0, 1.0, 0.0, 0.0).unwrap(), "10 95 l");
    }
}
