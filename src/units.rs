//! Unit conversion to the crate's single internal unit: points (1/72 inch).
//!
//! Spec §6 "Units": user-facing inputs accept `pt|mm|cm|in`; internal storage
//! is always points.

/// One millimetre, in points.
pub const MM: f64 = 72.0 / 25.4;
/// One centimetre, in points.
pub const CM: f64 = 72.0 / 2.54;
/// One inch, in points.
pub const IN: f64 = 72.0;
/// One point, in points (identity; kept for symmetry with the others).
pub const PT: f64 = 1.0;

/// A length unit accepted at the public API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Pt,
    Mm,
    Cm,
    In,
}

impl Unit {
    /// Scale factor to points.
    pub fn scale(self) -> f64 {
        match self {
            Unit::Pt => PT,
            Unit::Mm => MM,
            Unit::Cm => CM,
            Unit::In => IN,
        }
    }

    /// Parse a unit suffix, panicking on anything else.
    ///
    /// Invalid units are a programmer error (spec §7) and surfaced
    /// immediately rather than threaded through as a `Result`.
    pub fn parse(s: &str) -> Unit {
        match s {
            "pt" => Unit::Pt,
            "mm" => Unit::Mm,
            "cm" => Unit::Cm,
            "in" => Unit::In,
            other => panic!("invalid unit: {other:?} (expected pt, mm, cm, or in)"),
        }
    }
}

/// Convert a value in `unit` to points.
pub fn to_points(value: f64, unit: Unit) -> f64 {
    value * unit.scale()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mm_scale_matches_spec_constant() {
        assert!((MM - 72.0 / 25.4).abs() < 1e-12);
    }

    #[test]
    fn a4_in_mm_converts_to_expected_points() {
        let w = to_points(210.0, Unit::Mm);
        let h = to_points(297.0, Unit::Mm);
        assert!((w - 595.2755905511812).abs() < 1e-9);
        assert!((h - 841.8897637795277).abs() < 1e-9);
    }

    #[test]
    fn pt_is_identity() {
        assert_eq!(to_points(42.0, Unit::Pt), 42.0);
    }

    #[test]
    #[should_panic(expected = "invalid unit")]
    fn parse_rejects_unknown_unit() {
        Unit::parse("furlong");
    }
}
