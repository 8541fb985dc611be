//! Bézier geometry kernel (spec §4.1).
//!
//! Power-basis-free, de-Casteljau-based operations on degree-1/2/3 segments,
//! ported from `flat/bezier.py`. Everything here is pure scalar math; no
//! allocation beyond the `Vec`s the contract (lazy sequences in the
//! original) demands.

pub mod polynomial;

use polynomial::{evaluate1, evaluate2, evaluate3, roots1, roots2};

/// A point in user-space units (points, 1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn scale(self, k: f64) -> Point {
        Point::new(self.x * k, self.y * k)
    }

    pub fn hypot(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }
}

/// A degree-1/2/3 Bézier segment (spec §3 "Curve").
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Line(Point, Point),
    Quad(Point, Point, Point),
    Cubic(Point, Point, Point, Point),
}

impl Segment {
    pub fn start(&self) -> Point {
        match *self {
            Segment::Line(p0, _) => p0,
            Segment::Quad(p0, _, _) => p0,
            Segment::Cubic(p0, _, _, _) => p0,
        }
    }

    pub fn end(&self) -> Point {
        match *self {
            Segment::Line(_, p1) => p1,
            Segment::Quad(_, _, p2) => p2,
            Segment::Cubic(_, _, _, p3) => p3,
        }
    }

    pub fn degree(&self) -> u8 {
        match self {
            Segment::Line(..) => 1,
            Segment::Quad(..) => 2,
            Segment::Cubic(..) => 3,
        }
    }
}

/// `bezier1/2/3`: de Casteljau evaluation at parameter `t`.
pub fn evaluate(seg: &Segment, t: f64) -> Point {
    match *seg {
        Segment::Line(p0, p1) => lerp(p0, p1, t),
        Segment::Quad(p0, p1, p2) => {
            let a = lerp(p0, p1, t);
            let b = lerp(p1, p2, t);
            lerp(a, b, t)
        }
        Segment::Cubic(p0, p1, p2, p3) => {
            let a = lerp(p0, p1, t);
            let b = lerp(p1, p2, t);
            let c = lerp(p2, p3, t);
            let d = lerp(a, b, t);
            let e = lerp(b, c, t);
            lerp(d, e, t)
        }
    }
}

fn lerp(a: Point, b: Point, t: f64) -> Point {
    Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

/// `split1/2/3`: exact de Casteljau split at `t`.
pub fn split(seg: &Segment, t: f64) -> (Segment, Segment) {
    match *seg {
        Segment::Line(p0, p1) => {
            let p = lerp(p0, p1, t);
            (Segment::Line(p0, p), Segment::Line(p, p1))
        }
        Segment::Quad(p0, p1, p2) => {
            let p01 = lerp(p0, p1, t);
            let p12 = lerp(p1, p2, t);
            let p012 = lerp(p01, p12, t);
            (
                Segment::Quad(p0, p01, p012),
                Segment::Quad(p012, p12, p2),
            )
        }
        Segment::Cubic(p0, p1, p2, p3) => {
            let p01 = lerp(p0, p1, t);
            let p12 = lerp(p1, p2, t);
            let p23 = lerp(p2, p3, t);
            let p012 = lerp(p01, p12, t);
            let p123 = lerp(p12, p23, t);
            let p0123 = lerp(p012, p123, t);
            (
                Segment::Cubic(p0, p01, p012, p0123),
                Segment::Cubic(p0123, p123, p23, p3),
            )
        }
    }
}

/// `halve1/2/3`: `split(seg, 0.5)`, computed directly (matches the Python
/// original's dedicated midpoint formulae rather than calling `split`).
pub fn halve(seg: &Segment) -> (Segment, Segment) {
    split(seg, 0.5)
}

/// `chop1/2/3`: split the segment at every parameter in `ts`, producing the
/// sub-segments left to right. Parameters outside (0,1) are ignored.
///
/// Contract: the returned sub-segments, concatenated, reproduce the
/// original's endpoints exactly.
pub fn chop(seg: &Segment, ts: &[f64]) -> Vec<Segment> {
    let mut params: Vec<f64> = ts.iter().copied().filter(|t| *t > 0.0 && *t < 1.0).collect();
    params.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mut out = Vec::with_capacity(params.len() + 1);
    let mut remaining = *seg;
    let mut last_t = 0.0;
    for t in params {
        let local_t = (t - last_t) / (1.0 - last_t);
        let (left, right) = split(&remaining, local_t);
        out.push(left);
        remaining = right;
        last_t = t;
    }
    out.push(remaining);
    out
}

fn power2(p0: Point, p1: Point, p2: Point) -> ([f64; 3], [f64; 3]) {
    let x2 = p2.x - 2.0 * p1.x + p0.x;
    let x1 = 2.0 * (p1.x - p0.x);
    let y2 = p2.y - 2.0 * p1.y + p0.y;
    let y1 = 2.0 * (p1.y - p0.y);
    ([x2, x1, p0.x], [y2, y1, p0.y])
}

fn power3(p0: Point, p1: Point, p2: Point, p3: Point) -> ([f64; 4], [f64; 4]) {
    let x1 = 3.0 * (p1.x - p0.x);
    let x2 = 3.0 * (p2.x - 2.0 * p1.x + p0.x);
    let x3 = p3.x - 3.0 * (p2.x - p1.x) - p0.x;
    let y1 = 3.0 * (p1.y - p0.y);
    let y2 = 3.0 * (p2.y - 2.0 * p1.y + p0.y);
    let y3 = p3.y - 3.0 * (p2.y - p1.y) - p0.y;
    ([x3, x2, x1, p0.x], [y3, y2, y1, p0.y])
}

/// `bbox1/2/3`: axis-aligned bounding box, obtained by evaluating endpoints
/// plus interior derivative roots.
pub fn bbox(seg: &Segment) -> (f64, f64, f64, f64) {
    match *seg {
        Segment::Line(p0, p1) => (
            p0.x.min(p1.x),
            p0.y.min(p1.y),
            p0.x.max(p1.x),
            p0.y.max(p1.y),
        ),
        Segment::Quad(p0, p1, p2) => {
            let (mut minx, mut maxx) = (p0.x.min(p2.x), p0.x.max(p2.x));
            let (mut miny, mut maxy) = (p0.y.min(p2.y), p0.y.max(p2.y));
            let (xs, ys) = power2(p0, p1, p2);
            for t in roots1(2.0 * xs[0], xs[1]) {
                if (0.0..1.0).contains(&t) {
                    let x = evaluate2(xs[0], xs[1], xs[2], t);
                    minx = minx.min(x);
                    maxx = maxx.max(x);
                }
            }
            for t in roots1(2.0 * ys[0], ys[1]) {
                if (0.0..1.0).contains(&t) {
                    let y = evaluate2(ys[0], ys[1], ys[2], t);
                    miny = miny.min(y);
                    maxy = maxy.max(y);
                }
            }
            (minx, miny, maxx, maxy)
        }
        Segment::Cubic(p0, p1, p2, p3) => {
            let (mut minx, mut maxx) = (p0.x.min(p3.x), p0.x.max(p3.x));
            let (mut miny, mut maxy) = (p0.y.min(p3.y), p0.y.max(p3.y));
            let (xs, ys) = power3(p0, p1, p2, p3);
            for t in roots2(3.0 * xs[0], 2.0 * xs[1], xs[2]) {
                if (0.0..1.0).contains(&t) {
                    let x = evaluate3(xs[0], xs[1], xs[2], xs[3], t);
                    minx = minx.min(x);
                    maxx = maxx.max(x);
                }
            }
            for t in roots2(3.0 * ys[0], 2.0 * ys[1], ys[2]) {
                if (0.0..1.0).contains(&t) {
                    let y = evaluate3(ys[0], ys[1], ys[2], ys[3], t);
                    miny = miny.min(y);
                    maxy = maxy.max(y);
                }
            }
            (minx, miny, maxx, maxy)
        }
    }
}

/// Roots of the cross product of first and second derivative of a cubic:
/// parameters of inflection points, at most two.
pub fn inflections3(seg: &Segment) -> Vec<f64> {
    let Segment::Cubic(p0, p1, p2, p3) = *seg else {
        return Vec::new();
    };
    let (xs, ys) = power3(p0, p1, p2, p3);
    // xs/ys = [x3, x2, x1, x0]; the original works with (x1,x2,x3) of the
    // power basis with x0 dropped (translation doesn't affect curvature).
    let (x3, x2, x1) = (xs[0], xs[1], xs[2]);
    let (y3, y2, y1) = (ys[0], ys[1], ys[2]);
    let a = x2 * y3 - x3 * y2;
    let b = x1 * y3 - x3 * y1;
    let c = x1 * y2 - x2 * y1;
    roots2(a, b, c)
}

/// `segments2`: number of equal-parameter piecewise-linear steps to stay
/// within `error` of a quadratic, via the Sederberg second-difference bound.
pub fn segments2(seg: &Segment, error: f64) -> u32 {
    let Segment::Quad(p0, p1, p2) = *seg else {
        panic!("segments2 requires a quadratic segment");
    };
    let lx = (p2.x - 2.0 * p1.x + p0.x).abs();
    let ly = (p2.y - 2.0 * p1.y + p0.y).abs();
    let m = ((lx * lx + ly * ly).sqrt() / (4.0 * error)).sqrt();
    m.ceil().max(1.0) as u32
}

/// `segments3`: same bound for a cubic, with the factor-of-3 term.
pub fn segments3(seg: &Segment, error: f64) -> u32 {
    let Segment::Cubic(p0, p1, p2, p3) = *seg else {
        panic!("segments3 requires a cubic segment");
    };
    let lx = (p3.x - 2.0 * p2.x + p1.x).abs().max((p2.x - 2.0 * p1.x + p0.x).abs());
    let ly = (p3.y - 2.0 * p2.y + p1.y).abs().max((p2.y - 2.0 * p1.y + p0.y).abs());
    let m = (3.0 * (lx * lx + ly * ly).sqrt() / (4.0 * error)).sqrt();
    m.ceil().max(1.0) as u32
}

/// Default turning-angle threshold for [`subdivide`]: cosine of ~112.5°.
pub const SUBDIVIDE_THRESHOLD: f64 = -0.9238795325112867; // -sqrt(2+sqrt(2))/2

fn angle_cosine(a: Point, vertex: Point, b: Point) -> f64 {
    let u = a.sub(vertex);
    let v = b.sub(vertex);
    let lu = u.hypot();
    let lv = v.hypot();
    (u.x / lu) * (v.x / lv) + (u.y / lu) * (v.y / lv)
}

/// `subdivide2/3`: adaptively halve (or split near the sharper control
/// point) until every internal control-polygon turning angle is below
/// `threshold`. Required before stroking/offsetting a long curve.
pub fn subdivide(seg: &Segment, threshold: f64) -> Vec<Segment> {
    match *seg {
        Segment::Line(..) => vec![*seg],
        Segment::Quad(p0, p1, p2) => {
            let mut stack = vec![];
            let mut cur = (p0, p1, p2);
            let mut out = Vec::new();
            loop {
                let (a, b, c) = cur;
                let theta = angle_cosine(a, b, c);
                if theta > threshold {
                    let u = (a.x - b.x).powi(2) + (a.y - b.y).powi(2);
                    let v = (c.x - b.x).powi(2) + (c.y - b.y).powi(2);
                    let (first, second) = if is_similar(u, v) {
                        halve(&Segment::Quad(a, b, c))
                    } else {
                        let t = (u - (u * v).sqrt()) / (u - v);
                        split(&Segment::Quad(a, b, c), t)
                    };
                    let Segment::Quad(a0, a1, a2) = first else { unreachable!() };
                    cur = (a0, a1, a2);
                    stack.push(second);
                } else {
                    out.push(Segment::Quad(a, b, c));
                    match stack.pop() {
                        Some(Segment::Quad(a0, a1, a2)) => cur = (a0, a1, a2),
                        _ => break,
                    }
                }
            }
            out
        }
        Segment::Cubic(p0, p1, p2, p3) => {
            let mut stack = vec![];
            let mut cur = (p0, p1, p2, p3);
            let mut out = Vec::new();
            loop {
                let (a, b, c, d) = cur;
                let theta = if is_similar(a.x, b.x) && is_similar(a.y, b.y) {
                    angle_cosine(a, c, d)
                } else if is_similar(b.x, c.x) && is_similar(b.y, c.y) {
                    angle_cosine(a, Point::new((b.x + c.x) / 2.0, (b.y + c.y) / 2.0), d)
                } else if is_similar(c.x, d.x) && is_similar(c.y, d.y) {
                    angle_cosine(a, b, d)
                } else {
                    angle_cosine(a, b, c).max(angle_cosine(b, c, d))
                };
                if theta > threshold {
                    let (first, second) = halve(&Segment::Cubic(a, b, c, d));
                    let Segment::Cubic(a0, a1, a2, a3) = first else { unreachable!() };
                    cur = (a0, a1, a2, a3);
                    stack.push(second);
                } else {
                    out.push(Segment::Cubic(a, b, c, d));
                    match stack.pop() {
                        Some(Segment::Cubic(a0, a1, a2, a3)) => cur = (a0, a1, a2, a3),
                        _ => break,
                    }
                }
            }
            out
        }
    }
}

/// `similar`, from `flat/misc.py`: are two floats close enough to treat as
/// equal for subdivision-branch selection?
pub fn is_similar(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

/// `polyline2/3`: points where the derivative's dominant-axis component
/// vanishes, i.e. cusp/extremum locations used to seed stroking.
pub fn polyline(seg: &Segment) -> Vec<Point> {
    match *seg {
        Segment::Line(..) => Vec::new(),
        Segment::Quad(p0, p1, p2) => {
            let (minx, maxx) = (p0.x.min(p1.x).min(p2.x), p0.x.max(p1.x).max(p2.x));
            let (miny, maxy) = (p0.y.min(p1.y).min(p2.y), p0.y.max(p1.y).max(p2.y));
            let ts = if maxx - minx > maxy - miny {
                roots1(p2.x - 2.0 * p1.x + p0.x, p1.x - p0.x)
            } else {
                roots1(p2.y - 2.0 * p1.y + p0.y, p1.y - p0.y)
            };
            ts.into_iter()
                .filter(|t| *t > 0.0 && *t < 1.0)
                .map(|t| evaluate(seg, t))
                .collect()
        }
        Segment::Cubic(p0, p1, p2, p3) => {
            let (minx, maxx) = (
                p0.x.min(p1.x).min(p2.x).min(p3.x),
                p0.x.max(p1.x).max(p2.x).max(p3.x),
            );
            let (miny, maxy) = (
                p0.y.min(p1.y).min(p2.y).min(p3.y),
                p0.y.max(p1.y).max(p2.y).max(p3.y),
            );
            let (xs, ys) = power3(p0, p1, p2, p3);
            let mut ts = if maxx - minx > maxy - miny {
                roots2(xs[0], 2.0 * xs[1], xs[2])
            } else {
                roots2(ys[0], 2.0 * ys[1], ys[2])
            };
            ts.sort_by(|a, b| a.partial_cmp(b).unwrap());
            ts.into_iter()
                .filter(|t| *t > 0.0 && *t < 1.0)
                .map(|t| evaluate(seg, t))
                .collect()
        }
    }
}

/// `elevate2`: exact degree elevation of a quadratic to a cubic.
pub fn elevate2(seg: &Segment) -> Segment {
    let Segment::Quad(p0, p1, p2) = *seg else {
        panic!("elevate2 requires a quadratic segment");
    };
    let c1 = p0.add(p1.sub(p0).scale(2.0 / 3.0));
    let c2 = p2.add(p1.sub(p2).scale(2.0 / 3.0));
    Segment::Cubic(p0, c1, c2, p2)
}

/// `reduce3`: one-shot (non-adaptive) degree reduction of a cubic to a
/// quadratic. Only applied to already degree-2-like glyph outlines
/// (spec §4.1): the caller is responsible for having split at inflections
/// first if precision matters.
pub fn reduce3(seg: &Segment) -> Segment {
    let Segment::Cubic(p0, p1, p2, p3) = *seg else {
        panic!("reduce3 requires a cubic segment");
    };
    let x = (3.0 * (p1.x + p2.x) - p0.x - p3.x) / 4.0;
    let y = (3.0 * (p1.y + p2.y) - p0.y - p3.y) / 4.0;
    Segment::Quad(p0, Point::new(x, y), p3)
}

/// `offset1`: translate a line along its unit normal by signed distance `d`.
pub fn offset_line(p0: Point, p1: Point, d: f64) -> (Point, Point) {
    let delta = p1.sub(p0);
    let len = delta.hypot();
    let u = Point::new(delta.y / len, -delta.x / len);
    (p0.add(u.scale(d)), p1.add(u.scale(d)))
}

/// `offset2`: one-shot parallel curve of a quadratic at signed distance `d`.
/// Caller must have subdivided at cusps/inflections first.
pub fn offset_quad(p0: Point, p1: Point, p2: Point, d: f64) -> (Point, Point, Point) {
    let d0 = p1.sub(p0);
    let d2 = p2.sub(p1);
    let (l0, l2) = (d0.hypot(), d2.hypot());
    let u = Point::new(d0.y / l0, -d0.x / l0);
    let v = Point::new(d2.y / l2, -d2.x / l2);
    let uv = u.dot(v) + 1.0;
    let q0 = p0.add(u.scale(d));
    let q2 = p2.add(v.scale(d));
    let q1 = p1.add(Point::new(u.x + v.x, u.y + v.y).scale(d / uv));
    (q0, q1, q2)
}

/// `offset3`: one-shot parallel curve of a cubic at signed distance `d`,
/// preserving the chord-length ratio used to place the new interior control
/// points along the translated tangents.
pub fn offset_cubic(p0: Point, p1: Point, p2: Point, p3: Point, d: f64) -> (Point, Point, Point, Point) {
    let d0 = p1.sub(p0);
    let d3 = p3.sub(p2);
    let (l0, l3) = (d0.hypot(), d3.hypot());
    let u = Point::new(d0.y / l0, -d0.x / l0);
    let w = Point::new(d3.y / l3, -d3.x / l3);
    let chord_before = p3.sub(p0).hypot();
    let q0 = p0.add(u.scale(d));
    let q3 = p3.add(w.scale(d));
    let k = q3.sub(q0).hypot() / chord_before;
    let q1 = q0.add(d0.scale(k));
    let q2 = q3.sub(d3.scale(k));
    (q0, q1, q2, q3)
}

/// Generic entry point dispatching to the line/quad/cubic offset above.
/// Returns `None` for degenerate input (coincident control points collapsing
/// a tangent to zero length), per spec §4.1 failure handling.
pub fn offset(seg: &Segment, d: f64) -> Option<Segment> {
    match *seg {
        Segment::Line(p0, p1) => {
            if p0 == p1 {
                return None;
            }
            let (a, b) = offset_line(p0, p1, d);
            Some(Segment::Line(a, b))
        }
        Segment::Quad(p0, p1, p2) => {
            if p1.sub(p0).hypot() == 0.0 || p2.sub(p1).hypot() == 0.0 {
                return None;
            }
            let (a, b, c) = offset_quad(p0, p1, p2, d);
            Some(Segment::Quad(a, b, c))
        }
        Segment::Cubic(p0, p1, p2, p3) => {
            if p1.sub(p0).hypot() == 0.0 || p3.sub(p2).hypot() == 0.0 {
                return None;
            }
            let (a, b, c, dd) = offset_cubic(p0, p1, p2, p3, d);
            Some(Segment::Cubic(a, b, c, dd))
        }
    }
}

/// `arc3`: cubic Bézier approximation of a circular arc from `p0` to `p3`
/// around centre `c`, valid up to 90° (Riškus 2006).
pub fn arc3(c: Point, p0: Point, p3: Point) -> Segment {
    let a = p0.sub(c);
    let d = p3.sub(c);
    let u = a.x * d.y - a.y * d.x;
    let v = d.dot(d);
    let w = a.dot(d) - v;
    if v == 0.0 || w == 0.0 {
        return Segment::Cubic(p0, p0, p3, p3);
    }
    let k = 4.0 / 3.0 * (u - (-2.0 * v * w).sqrt()) / w;
    let p1 = Point::new(p0.x - a.y * k, p0.y + a.x * k);
    let p2 = Point::new(p3.x + d.y * k, p3.y - d.x * k);
    Segment::Cubic(p0, p1, p2, p3)
}

/// `side1`: which side of line `(a,b)` does `p` lie on.
pub fn side(a: Point, b: Point, p: Point) -> bool {
    (b.x - a.x) * (p.y - a.y) > (b.y - a.y) * (p.x - a.x)
}

/// `intersect11`: intersection of two infinite lines, or `None` if parallel.
pub fn intersect_lines(a0: Point, a1: Point, b0: Point, b1: Point) -> Option<Point> {
    let da = a1.sub(a0);
    let db = b1.sub(b0);
    let det = da.x * db.y - da.y * db.x;
    if det == 0.0 {
        return None;
    }
    let t = (db.x * (a0.y - b0.y) - db.y * (a0.x - b0.x)) / det;
    Some(a0.add(da.scale(t)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Point, b: Point, eps: f64) -> bool {
        (a.x - b.x).abs() < eps && (a.y - b.y).abs() < eps
    }

    #[test]
    fn split_concatenates_exactly_to_original_endpoints() {
        let seg = Segment::Cubic(
            Point::new(0.0, 0.0),
            Point::new(1.0, 2.0),
            Point::new(2.0, -1.0),
            Point::new(3.0, 0.0),
        );
        let (left, right) = split(&seg, 0.37);
        assert_eq!(left.start(), seg.start());
        assert_eq!(right.end(), seg.end());
        assert!(approx(left.end(), right.start(), 1e-12));
    }

    #[test]
    fn halve_equals_split_at_one_half() {
        let seg = Segment::Quad(Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(2.0, 0.0));
        assert_eq!(halve(&seg), split(&seg, 0.5));
    }

    #[test]
    fn chop_reconstructs_original_cubic_to_high_precision() {
        let seg = Segment::Cubic(
            Point::new(0.0, 0.0),
            Point::new(1.0, 2.0),
            Point::new(2.0, -1.0),
            Point::new(3.0, 0.0),
        );
        let t = 0.37;
        let (left, right) = split(&seg, t);
        let pieces = chop(&seg, &[t]);
        assert_eq!(pieces.len(), 2);
        // left piece covers [0,t] of the original, right covers [t,1].
        for i in 0..100 {
            let local = i as f64 / 99.0;
            let global = local * t;
            let want = evaluate(&seg, global);
            let got = evaluate(&pieces[0], local);
            assert!(approx(want, got, 1e-9));
            assert!(approx(evaluate(&left, local), got, 1e-12));
        }
        for i in 0..100 {
            let local = i as f64 / 99.0;
            let global = t + local * (1.0 - t);
            let want = evaluate(&seg, global);
            let got = evaluate(&pieces[1], local);
            assert!(approx(want, got, 1e-9));
            assert!(approx(evaluate(&right, local), got, 1e-12));
        }
    }

    #[test]
    fn bbox_contains_dense_sample_of_curve() {
        let seg = Segment::Cubic(
            Point::new(0.0, 0.0),
            Point::new(10.0, 40.0),
            Point::new(30.0, -20.0),
            Point::new(40.0, 0.0),
        );
        let (minx, miny, maxx, maxy) = bbox(&seg);
        for i in 0..=100 {
            let t = i as f64 / 100.0;
            let p = evaluate(&seg, t);
            assert!(p.x >= minx - 1e-9 && p.x <= maxx + 1e-9);
            assert!(p.y >= miny - 1e-9 && p.y <= maxy + 1e-9);
        }
    }

    #[test]
    fn inflections3_of_straight_cubic_is_empty() {
        let seg = Segment::Cubic(
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
            Point::new(3.0, 3.0),
        );
        assert!(inflections3(&seg).is_empty());
    }

    #[test]
    fn elevate_then_reduce_round_trips_a_quadratic() {
        let quad = Segment::Quad(Point::new(0.0, 0.0), Point::new(5.0, 10.0), Point::new(10.0, 0.0));
        let cubic = elevate2(&quad);
        let reduced = reduce3(&cubic);
        let Segment::Quad(p0, p1, p2) = reduced else { panic!() };
        let Segment::Quad(q0, q1, q2) = quad else { panic!() };
        assert!(approx(p0, q0, 1e-9));
        assert!(approx(p1, q1, 1e-9));
        assert!(approx(p2, q2, 1e-9));
    }

    #[test]
    fn segments2_of_a_flat_quadratic_is_one() {
        let seg = Segment::Quad(Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(10.0, 0.0));
        assert_eq!(segments2(&seg, 0.25), 1);
    }

    #[test]
    fn offset_line_translates_perpendicular_to_direction() {
        let (a, b) = offset_line(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 2.0);
        assert!(approx(a, Point::new(0.0, 2.0), 1e-9));
        assert!(approx(b, Point::new(10.0, 2.0), 1e-9));
    }

    #[test]
    fn offset_degenerate_line_returns_none() {
        let seg = Segment::Line(Point::new(1.0, 1.0), Point::new(1.0, 1.0));
        assert!(offset(&seg, 1.0).is_none());
    }

    #[test]
    fn arc3_endpoints_match_inputs() {
        let c = Point::new(0.0, 0.0);
        let p0 = Point::new(10.0, 0.0);
        let p3 = Point::new(0.0, 10.0);
        let Segment::Cubic(s, _, _, e) = arc3(c, p0, p3) else { panic!() };
        assert!(approx(s, p0, 1e-9));
        assert!(approx(e, p3, 1e-9));
    }

    #[test]
    fn subdivide_line_is_identity() {
        let seg = Segment::Line(Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        assert_eq!(subdivide(&seg, SUBDIVIDE_THRESHOLD), vec![seg]);
    }

    #[test]
    fn subdivide_stops_on_gentle_curves_without_splitting() {
        let seg = Segment::Cubic(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.01),
            Point::new(2.0, -0.01),
            Point::new(3.0, 0.0),
        );
        assert_eq!(subdivide(&seg, SUBDIVIDE_THRESHOLD).len(), 1);
    }
}
