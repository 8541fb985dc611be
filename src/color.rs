//! Colour model (spec §3 "Style"). Ported from `flat/color.py`, restyled as
//! a tagged enum the way the teacher crate represents colour (see
//! `oxidize-pdf-core/src/graphics/color.rs`).

use crate::error::{Error, RasterError, Result};

/// A device colour in one of the colour spaces the back-ends understand.
///
/// `Ga`/`Rgba` component values are 0..255, matching spec §3. `Cmyk`/`Gray`
/// components are also 0..255 to keep a single integer domain across the
/// whole enum; the PDF/SVG back-ends divide by 255.0 at emission time.
#[derive(Debug, Clone, PartialEq)]
pub enum Color {
    Gray(u8),
    Ga(u8, u8),
    Rgb(u8, u8, u8),
    Rgba(u8, u8, u8, u8),
    Cmyk(u8, u8, u8, u8),
    Spot {
        name: &'static str,
        fallback: (u8, u8, u8, u8),
        tint: f64,
    },
    Overprint(Box<Color>),
}

impl Color {
    pub fn gray(intensity: u8) -> Color {
        Color::Gray(intensity)
    }

    pub fn ga(g: u8, a: u8) -> Color {
        Color::Ga(g, a)
    }

    pub fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color::Rgb(r, g, b)
    }

    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Color {
        Color::Rgba(r, g, b, a)
    }

    pub fn cmyk(c: u8, m: u8, y: u8, k: u8) -> Color {
        Color::Cmyk(c, m, y, k)
    }

    /// `spot`: a named colour with a CMYK fallback and a 0..100 tint.
    ///
    /// # Panics
    /// Panics if `fallback` is not itself representable as CMYK — mirrors
    /// the original's `ValueError('Invalid fallback kind.')` (programmer
    /// error, spec §7).
    pub fn spot(name: &'static str, fallback: (u8, u8, u8, u8)) -> Color {
        Color::Spot {
            name,
            fallback,
            tint: 100.0,
        }
    }

    /// `thinned`: a copy of a spot colour at a different tint percentage.
    ///
    /// # Panics
    /// Panics if called on a non-spot colour.
    pub fn thinned(&self, tint: f64) -> Color {
        match self {
            Color::Spot { name, fallback, .. } => Color::Spot {
                name,
                fallback: *fallback,
                tint,
            },
            _ => panic!("thinned() is only valid on a spot color"),
        }
    }

    /// `overprint`: the wrapper requires the underlying colour to be
    /// device-CMYK or spot.
    ///
    /// # Panics
    /// Panics if `color` is neither CMYK nor spot (programmer error).
    pub fn overprint(color: Color) -> Color {
        match &color {
            Color::Cmyk(..) | Color::Spot { .. } => Color::Overprint(Box::new(color)),
            _ => panic!("overprint() requires a CMYK or spot color"),
        }
    }

    pub fn black() -> Color {
        Color::Gray(0)
    }

    pub fn white() -> Color {
        Color::Gray(255)
    }

    pub fn red() -> Color {
        Color::Rgb(255, 0, 0)
    }

    pub fn green() -> Color {
        Color::Rgb(0, 255, 0)
    }

    pub fn blue() -> Color {
        Color::Rgb(0, 0, 255)
    }

    /// `pdfstroke`/`pdffill`-equivalent: render the PDF content-stream
    /// colour-setting operator for this colour. `resource_name` is used
    /// only for `Spot`, which must register a `/CSx` colour-space resource.
    ///
    /// # Panics
    /// Panics if called on `Spot` without a `resource_name` — the caller
    /// failed to register the colour-space resource first (programmer
    /// error, not a property of the colour itself).
    pub fn pdf_operator(&self, stroke: bool, resource_name: Option<&str>) -> Result<String> {
        Ok(match self {
            Color::Gray(g) => format!("{} {}", dump(*g as f64 / 255.0), if stroke { "G" } else { "g" }),
            Color::Ga(..) => return Err(Error::Unsupported("PDF does not support grayscale + alpha")),
            Color::Rgb(r, g, b) => format!(
                "{} {} {} {}",
                dump(*r as f64 / 255.0),
                dump(*g as f64 / 255.0),
                dump(*b as f64 / 255.0),
                if stroke { "RG" } else { "rg" }
            ),
            Color::Rgba(..) => return Err(Error::Unsupported("PDF does not support RGB + alpha")),
            Color::Cmyk(c, m, y, k) => format!(
                "{} {} {} {} {}",
                dump(*c as f64 / 255.0),
                dump(*m as f64 / 255.0),
                dump(*y as f64 / 255.0),
                dump(*k as f64 / 255.0),
                if stroke { "K" } else { "k" }
            ),
            Color::Spot { tint, .. } => {
                let name = resource_name.expect("spot color requires a registered resource name");
                format!(
                    "/{} {} {} {}",
                    name,
                    if stroke { "CS" } else { "cs" },
                    dump(tint / 100.0),
                    if stroke { "SCN" } else { "scn" }
                )
            }
            Color::Overprint(inner) => return inner.pdf_operator(stroke, resource_name),
        })
    }

    /// `svg`: the CSS colour function for this colour.
    pub fn svg(&self) -> Result<String> {
        Ok(match self {
            Color::Gray(_) => return Err(Error::Unsupported("SVG does not support grayscale")),
            Color::Ga(..) => return Err(Error::Unsupported("SVG does not support grayscale + alpha")),
            Color::Rgb(r, g, b) => format!("rgb({},{},{})", r, g, b),
            Color::Rgba(r, g, b, a) => format!("rgba({},{},{},{})", r, g, b, dump(*a as f64 / 255.0)),
            Color::Cmyk(..) => return Err(Error::Unsupported("SVG does not yet support device-cmyk")),
            Color::Spot { .. } => return Err(Error::Unsupported("SVG does not yet support device-nchannel")),
            Color::Overprint(_) => return Err(Error::Unsupported("SVG does not support overprint")),
        })
    }

    /// `rasterize`: components to hand the rasterizer, checked against the
    /// backing image's channel kind (spec §4.3 compositing).
    pub fn raster_components(&self, kind: crate::image::Kind) -> Result<Vec<u8>> {
        use crate::image::Kind;
        match (self, kind) {
            (Color::Gray(g), Kind::Gray) => Ok(vec![*g]),
            (Color::Ga(g, a), Kind::GrayAlpha) => Ok(vec![*g, *a]),
            (Color::Rgb(r, g, b), Kind::Rgb) => Ok(vec![*r, *g, *b]),
            (Color::Rgba(r, g, b, a), Kind::Rgba) => Ok(vec![*r, *g, *b, *a]),
            (Color::Cmyk(..), _) => Err(RasterError::CmykUnsupported.into()),
            (Color::Spot { .. }, _) => Err(RasterError::CmykUnsupported.into()),
            (Color::Overprint(_), _) => Err(RasterError::OverprintUnsupported.into()),
            _ => panic!("color kind does not match the rasterizer's image kind"),
        }
    }
}

/// `dump`: format a float the way the original's PDF content-stream writer
/// does — minimal digits, no trailing zeros, matching `flat/misc.py`'s
/// `dump`.
pub fn dump(value: f64) -> String {
    let s = format!("{:.4}", value);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// A small representative subset of the original's named CSS-style palette
/// (`flat/color.py` ships roughly 150; SPEC_FULL.md §E scopes this down).
pub fn named(name: &str) -> Option<Color> {
    Some(match name {
        "black" => Color::black(),
        "white" => Color::white(),
        "red" => Color::red(),
        "green" => Color::green(),
        "blue" => Color::blue(),
        "yellow" => Color::rgb(255, 255, 0),
        "cyan" => Color::rgb(0, 255, 255),
        "magenta" => Color::rgb(255, 0, 255),
        "orange" => Color::rgb(255, 165, 0),
        "gray" | "grey" => Color::gray(128),
        "purple" => Color::rgb(128, 0, 128),
        "pink" => Color::rgb(255, 192, 203),
        "brown" => Color::rgb(165, 42, 42),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Kind;

    #[test]
    fn dump_trims_trailing_zeros() {
        assert_eq!(dump(0.5), "0.5");
        assert_eq!(dump(1.0), "1");
        assert_eq!(dump(0.0), "0");
    }

    #[test]
    fn rgb_pdf_fill_operator() {
        let c = Color::rgb(255, 0, 0);
        assert_eq!(c.pdf_operator(false, None).unwrap(), "1 0 0 rg");
    }

    #[test]
    fn rgb_svg_function() {
        assert_eq!(Color::rgb(255, 0, 0).svg().unwrap(), "rgb(255,0,0)");
    }

    #[test]
    fn rgba_has_no_pdf_operator() {
        assert!(Color::rgba(1, 2, 3, 4).pdf_operator(false, None).is_err());
    }

    #[test]
    fn gray_has_no_svg_function() {
        assert!(Color::gray(1).svg().is_err());
    }

    #[test]
    fn raster_components_checks_kind() {
        let c = Color::rgb(1, 2, 3);
        assert_eq!(c.raster_components(Kind::Rgb).unwrap(), vec![1, 2, 3]);
        assert!(Color::cmyk(1, 2, 3, 4).raster_components(Kind::Rgb).is_err());
    }

    #[test]
    fn overprint_requires_cmyk_or_spot() {
        let _ = Color::overprint(Color::cmyk(1, 1, 1, 1));
    }

    #[test]
    #[should_panic]
    fn overprint_rejects_rgb() {
        Color::overprint(Color::rgb(1, 2, 3));
    }

    #[test]
    fn named_lookup_finds_known_colors() {
        assert_eq!(named("red"), Some(Color::red()));
        assert_eq!(named("not-a-color"), None);
    }
}
