//! Scalar polynomial evaluation and real-root finding, degree 1-3.
//!
//! Grounded on `flat/polynomial.py` (`evaluate1..3`, `roots1/roots2`) and
//! `flat/geometry.py`'s `roots3`/`cbrt` for the cubic case, which the
//! original keeps in a separate module but which this kernel needs for
//! curve/curve nearest-point queries (`geom::nearest_point_on_quad`, used by
//! the CFF-outline degree reducer).

/// Horner evaluation of `a*x + b`.
pub fn evaluate1(a: f64, b: f64, x: f64) -> f64 {
    a * x + b
}

/// Horner evaluation of `a*x^2 + b*x + c`.
pub fn evaluate2(a: f64, b: f64, c: f64, x: f64) -> f64 {
    (a * x + b) * x + c
}

/// Horner evaluation of `a*x^3 + b*x^2 + c*x + d`.
pub fn evaluate3(a: f64, b: f64, c: f64, d: f64, x: f64) -> f64 {
    ((a * x + b) * x + c) * x + d
}

/// Real roots of `a*x + b = 0`.
pub fn roots1(a: f64, b: f64) -> Vec<f64> {
    if a == 0.0 {
        Vec::new()
    } else {
        vec![-b / a]
    }
}

/// Real roots of `a*x^2 + b*x + c = 0`.
pub fn roots2(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a == 0.0 {
        return roots1(b, c);
    }
    if c == 0.0 {
        if b == 0.0 {
            return vec![0.0];
        }
        let mut r = vec![0.0];
        r.extend(roots1(a, b));
        return r;
    }
    let t = b / (2.0 * a);
    let r = t * t - c / a;
    if r == 0.0 {
        vec![-t]
    } else if r > 0.0 {
        let x = r.sqrt();
        vec![x - t, -x - t]
    } else {
        Vec::new()
    }
}

fn cbrt(x: f64) -> f64 {
    if x < 0.0 {
        -(-x).powf(1.0 / 3.0)
    } else {
        x.powf(1.0 / 3.0)
    }
}

/// Real roots of `a*x^3 + b*x^2 + c*x + d = 0`, via Cardano's formula with
/// the trigonometric branch for three real roots.
pub fn roots3(a: f64, b: f64, c: f64, d: f64) -> Vec<f64> {
    if a == 0.0 {
        return roots2(b, c, d);
    }
    let (a, b, c) = (b / a, c / a, d / a);
    let a3 = a / 3.0;
    let q = (3.0 * b - a * a) / 9.0;
    let qqq = q * q * q;
    let r = (9.0 * a * b - 27.0 * c - 2.0 * a * a * a) / 54.0;
    let disc = qqq + r * r;
    if disc > 0.0 {
        let x = disc.sqrt();
        let s = cbrt(r + x);
        let t = cbrt(r - x);
        vec![s + t - a3]
    } else if disc == 0.0 {
        if r == 0.0 {
            vec![-a3]
        } else {
            let s = cbrt(r);
            vec![s + s - a3, -s - a3]
        }
    } else {
        let theta3 = (r / (-qqq).sqrt()).acos() / 3.0;
        let x = 2.0 * (-q).sqrt();
        vec![
            x * theta3.cos() - a3,
            -x * (theta3 + std::f64::consts::PI / 3.0).cos() - a3,
            -x * (theta3 - std::f64::consts::PI / 3.0).cos() - a3,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roots1_handles_degenerate_zero_slope() {
        assert!(roots1(0.0, 5.0).is_empty());
    }

    #[test]
    fn roots2_finds_both_roots_of_x_squared_minus_one() {
        let mut r = roots2(1.0, 0.0, -1.0);
        r.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((r[0] - -1.0).abs() < 1e-12);
        assert!((r[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn roots3_finds_three_real_roots() {
        // (x-1)(x-2)(x-3) = x^3 - 6x^2 + 11x - 6
        let mut r = roots3(1.0, -6.0, 11.0, -6.0);
        r.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(r.len(), 3);
        assert!((r[0] - 1.0).abs() < 1e-9);
        assert!((r[1] - 2.0).abs() < 1e-9);
        assert!((r[2] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn roots3_falls_back_to_roots2_when_leading_coefficient_zero() {
        let r = roots3(0.0, 1.0, 0.0, -4.0);
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn evaluate_matches_direct_computation() {
        assert_eq!(evaluate2(1.0, 2.0, 3.0, 2.0), 4.0 + 4.0 + 3.0);
        assert_eq!(evaluate3(1.0, 0.0, 0.0, 0.0, 3.0), 27.0);
    }
}
