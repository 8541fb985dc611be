//! Analytic coverage rasterizer (spec §4.3). Ported from
//! `flat/rasterizer.py`: an 8.8 fixed-point scanline accumulator with exact
//! trapezoidal coverage per pixel, non-zero winding, and stroke generation
//! via one-shot parallel-curve offsetting.

use crate::error::{RasterError, Result};
use crate::geom::{self, Point, Segment};
use crate::image::{Image, Kind};

/// Line-join style for stroked outlines (spec §3 "Stroke style").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Miter,
    Round,
    Bevel,
}

/// Line-cap style for open stroked sub-paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapKind {
    Butt,
    Round,
    Square,
}

fn iround(x: f64) -> i64 {
    (x + 0.5f64.copysign(x)) as i64
}

const SCALE: f64 = 256.0;

/// An 8.8 fixed-point coverage accumulator bound to a single [`Image`].
///
/// The pen position (`x`, `y`, sub-path start `mx`/`my`) is tracked in plain
/// page units; only the scanline accumulator itself works in fixed point,
/// matching the original's mix of float pen state and integer coverage math.
pub struct Rasterizer {
    image: Image,
    scanlines: Vec<Vec<(i64, i64)>>,
    top: i64,
    bottom: i64,
    mx: f64,
    my: f64,
    x: f64,
    y: f64,
    mnx: i64,
    mny: i64,
    nx: i64,
    ny: i64,
    first: bool,
}

impl Rasterizer {
    pub fn new(width: usize, height: usize, kind: Kind) -> Result<Self> {
        if kind == Kind::Cmyk {
            return Err(RasterError::CmykUnsupported.into());
        }
        let mut image = Image::new(width, height, kind);
        image.white();
        Ok(Rasterizer {
            image,
            scanlines: vec![Vec::new(); height],
            top: height as i64 * 256,
            bottom: 0,
            mx: 0.0,
            my: 0.0,
            x: 0.0,
            y: 0.0,
            mnx: 0,
            mny: 0,
            nx: 0,
            ny: 0,
            first: true,
        })
    }

    pub fn width(&self) -> usize {
        self.image.width
    }

    pub fn height(&self) -> usize {
        self.image.height
    }

    /// Direct mutable access to the backing image, for callers that blit
    /// pre-decoded pixels (e.g. placed images) rather than painting
    /// coverage through `composite`.
    pub fn image_mut(&mut self) -> &mut Image {
        &mut self.image
    }

    pub fn kind(&self) -> Kind {
        self.image.kind
    }

    /// Accumulate the trapezoidal coverage of a single fixed-point edge
    /// between `(x0,y0)` and `(x1,y1)`, both in 8.8 fixed point. Horizontal
    /// edges contribute nothing (winding number is unaffected).
    fn edge(&mut self, x0: i64, y0: i64, x1: i64, y1: i64) {
        let (x0, y0, x1, y1, direction) = if y0 < y1 {
            (x0, y0, x1, y1, 1i64)
        } else if y0 > y1 {
            (x1, y1, x0, y0, -1i64)
        } else {
            return;
        };
        let dx = x1 - x0;
        let dy = y1 - y0;
        let ax = dx.abs();
        let (mut bottom, mut right) = if y0 < 0 {
            (0i64, x0 + (-y0 * dx + dy / 2).div_euclid(dy))
        } else {
            (y0, x0)
        };
        let y1 = y1.min(self.image.height as i64 * 256);
        self.top = self.top.min(bottom);
        self.bottom = self.bottom.max(y1);
        while bottom < y1 {
            let top = bottom;
            bottom = ((top & !255) + 256).min(y1);
            let left = right;
            right = x0 + ((bottom - y0) * dx + dy / 2).div_euclid(dy);
            let scanline = &mut self.scanlines[(top / 256) as usize];
            if left.div_euclid(256) == right.div_euclid(256) {
                let r = (left & !255) + 256;
                let width = (r - left) + (r - right);
                let height = bottom - top;
                let area = width * height / 2;
                let spill = 256 * height - area;
                scanline.push((left.div_euclid(256), area * direction));
                scanline.push((left.div_euclid(256) + 1, spill * direction));
            } else {
                let (lo, hi) = (left.min(right), left.max(right));
                let mut b = top;
                let mut r = lo;
                let mut previous = 0i64;
                while r < hi {
                    let l = r;
                    r = (l & !255) + 256;
                    let (width, height, area, spill);
                    if r <= hi {
                        width = r - l;
                        if r < hi {
                            let t = b;
                            b = top + ((r - lo) * dy + ax / 2).div_euclid(ax);
                            height = b - t;
                        } else {
                            height = bottom - b;
                        }
                        area = width * height / 2;
                        spill = 256 * height - area;
                    } else {
                        r = hi;
                        width = r - l;
                        height = bottom - b;
                        spill = width * height / 2;
                        area = 256 * height - spill;
                    }
                    scanline.push((l.div_euclid(256), (area + previous) * direction));
                    previous = spill;
                }
                scanline.push(((hi + 255).div_euclid(256), previous * direction));
            }
        }
    }

    /// Forward-difference flatten a quadratic into edges, subject to a
    /// quarter-pixel flatness bound.
    fn bezier2(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, x2: i64, y2: i64) {
        let steps = geom::segments2(
            &Segment::Quad(
                Point::new(x0 as f64, y0 as f64),
                Point::new(x1 as f64, y1 as f64),
                Point::new(x2 as f64, y2 as f64),
            ),
            0.25 * SCALE,
        ) as i64;
        if steps <= 1 {
            if steps == 1 {
                self.edge(x0, y0, x2, y2);
            }
            return;
        }
        let a = x2 - 2 * x1 + x0;
        let b = 2 * (x1 - x0);
        let d = y2 - 2 * y1 + y0;
        let e = 2 * (y1 - y0);
        let m = steps * steps;
        let mut x = x0 * m;
        let mut dx = a + b * steps;
        let ddx = 2 * a;
        let mut y = y0 * m;
        let mut dy = d + e * steps;
        let ddy = 2 * d;
        let (mut px, mut py) = (x0, y0);
        let mut remaining = steps;
        while remaining > 0 {
            x += dx;
            y += dy;
            dx += ddx;
            dy += ddy;
            let qx = (x + m / 2).div_euclid(m);
            let qy = (y + m / 2).div_euclid(m);
            self.edge(px, py, qx, qy);
            px = qx;
            py = qy;
            remaining -= 1;
        }
    }

    /// Forward-difference flatten a cubic into edges.
    fn bezier3(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, x2: i64, y2: i64, x3: i64, y3: i64) {
        let steps = geom::segments3(
            &Segment::Cubic(
                Point::new(x0 as f64, y0 as f64),
                Point::new(x1 as f64, y1 as f64),
                Point::new(x2 as f64, y2 as f64),
                Point::new(x3 as f64, y3 as f64),
            ),
            0.25 * SCALE,
        ) as i64;
        if steps <= 1 {
            if steps == 1 {
                self.edge(x0, y0, x3, y3);
            }
            return;
        }
        let a = x3 - 3 * (x2 - x1) - x0;
        let b = 3 * (x2 - 2 * x1 + x0);
        let c = 3 * (x1 - x0);
        let f = y3 - 3 * (y2 - y1) - y0;
        let g = 3 * (y2 - 2 * y1 + y0);
        let h = 3 * (y1 - y0);
        let m = steps * steps * steps;
        let mut x = x0 * m;
        let mut dx = a + b * steps + c * steps * steps;
        let mut ddx = 6 * a + 2 * b * steps;
        let dddx = 6 * a;
        let mut y = y0 * m;
        let mut dy = f + g * steps + h * steps * steps;
        let mut ddy = 6 * f + 2 * g * steps;
        let dddy = 6 * f;
        let (mut px, mut py) = (x0, y0);
        let mut remaining = steps;
        while remaining > 0 {
            x += dx;
            y += dy;
            dx += ddx;
            dy += ddy;
            ddx += dddx;
            ddy += dddy;
            let qx = (x + m / 2).div_euclid(m);
            let qy = (y + m / 2).div_euclid(m);
            self.edge(px, py, qx, qy);
            px = qx;
            py = qy;
            remaining -= 1;
        }
    }

    /// Flatten a circular arc, given in already-scaled fixed-point
    /// coordinates, via a cubic approximation.
    fn arc3(&mut self, cx: i64, cy: i64, x0: i64, y0: i64, x3: i64, y3: i64) {
        let seg = geom::arc3(
            Point::new(cx as f64, cy as f64),
            Point::new(x0 as f64, y0 as f64),
            Point::new(x3 as f64, y3 as f64),
        );
        let Segment::Cubic(_, p1, p2, _) = seg else { unreachable!() };
        let (x1, y1) = (iround(p1.x), iround(p1.y));
        let (x2, y2) = (iround(p2.x), iround(p2.y));
        self.bezier3(x0, y0, x1, y1, x2, y2, x3, y3);
    }

    pub fn moveto(&mut self, x: f64, y: f64) {
        self.mx = x;
        self.my = y;
        self.x = x;
        self.y = y;
    }

    pub fn lineto(&mut self, x: f64, y: f64) {
        let (x0, y0) = (self.x, self.y);
        self.x = x;
        self.y = y;
        self.edge(iround(x0 * SCALE), iround(y0 * SCALE), iround(x * SCALE), iround(y * SCALE));
    }

    pub fn quadto(&mut self, x1: f64, y1: f64, x: f64, y: f64) {
        let (x0, y0) = (self.x, self.y);
        self.x = x;
        self.y = y;
        self.bezier2(
            iround(x0 * SCALE),
            iround(y0 * SCALE),
            iround(x1 * SCALE),
            iround(y1 * SCALE),
            iround(x * SCALE),
            iround(y * SCALE),
        );
    }

    pub fn curveto(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x: f64, y: f64) {
        let (x0, y0) = (self.x, self.y);
        self.x = x;
        self.y = y;
        self.bezier3(
            iround(x0 * SCALE),
            iround(y0 * SCALE),
            iround(x1 * SCALE),
            iround(y1 * SCALE),
            iround(x2 * SCALE),
            iround(y2 * SCALE),
            iround(x * SCALE),
            iround(y * SCALE),
        );
    }

    pub fn closepath(&mut self) {
        let (x0, y0, x1, y1) = (self.x, self.y, self.mx, self.my);
        if x0 != x1 || y0 != y1 {
            self.lineto(x1, y1);
        }
    }

    pub fn stroke_moveto(&mut self, x: f64, y: f64, _distance: f64, _join: JoinKind, _limit: f64) {
        self.mx = x;
        self.my = y;
        self.x = x;
        self.y = y;
        self.first = true;
    }

    pub fn stroke_lineto(&mut self, x: f64, y: f64, distance: f64, join: JoinKind, limit: f64) {
        let (x0, y0) = (self.x, self.y);
        let (x1, y1) = (x, y);
        if x0 == x1 && y0 == y1 {
            return;
        }
        self.x = x;
        self.y = y;
        let (ndx, ndy) = (y1 - y0, x0 - x1);
        let n = ndx.hypot(ndy);
        let (nx, ny) = (ndx / n * distance, ndy / n * distance);
        let (fx0, fy0) = (iround(x0 * SCALE), iround(y0 * SCALE));
        let (fx1, fy1) = (iround(x1 * SCALE), iround(y1 * SCALE));
        let (fnx, fny) = (iround(nx * SCALE), iround(ny * SCALE));
        if self.first {
            self.mnx = fnx;
            self.mny = fny;
            self.first = false;
        } else {
            self.join(fx0, fy0, fnx, fny, join, limit);
        }
        self.edge(fx0 + fnx, fy0 + fny, fx1 + fnx, fy1 + fny);
        self.edge(fx1 - fnx, fy1 - fny, fx0 - fnx, fy0 - fny);
        self.nx = fnx;
        self.ny = fny;
    }

    pub fn stroke_quadto(&mut self, x1: f64, y1: f64, x: f64, y: f64, distance: f64, mut join: JoinKind, limit: f64) {
        let (x0, y0) = (self.x, self.y);
        let (x2, y2) = (x, y);
        if geom::is_similar(x0, x1) && geom::is_similar(y0, y1) || geom::is_similar(x1, x2) && geom::is_similar(y1, y2) {
            self.stroke_lineto(x2, y2, distance, join, limit);
            return;
        }
        if geom::is_similar((x0 - x1) * (y2 - y1), (y0 - y1) * (x2 - x1)) {
            let seg = Segment::Quad(Point::new(x0, y0), Point::new(x1, y1), Point::new(x2, y2));
            for p in geom::polyline(&seg) {
                self.stroke_lineto(p.x, p.y, distance, join, limit);
                join = JoinKind::Round;
            }
            self.stroke_lineto(x2, y2, distance, join, limit);
            return;
        }
        self.x = x;
        self.y = y;
        let seg = Segment::Quad(Point::new(x0, y0), Point::new(x1, y1), Point::new(x2, y2));
        for piece in geom::subdivide(&seg, geom::SUBDIVIDE_THRESHOLD) {
            let Segment::Quad(p0, p1, p2) = piece else { unreachable!() };
            let (qa, qb, qc) = geom::offset_quad(p0, p1, p2, distance);
            let (_, qe, _) = geom::offset_quad(p2, p1, p0, distance);
            let (fx0, fy0) = (iround(p0.x * SCALE), iround(p0.y * SCALE));
            let (fx2, fy2) = (iround(p2.x * SCALE), iround(p2.y * SCALE));
            let (fax, fay) = (iround(qa.x * SCALE), iround(qa.y * SCALE));
            let (fbx, fby) = (iround(qb.x * SCALE), iround(qb.y * SCALE));
            let (fcx, fcy) = (iround(qc.x * SCALE), iround(qc.y * SCALE));
            let (fex, fey) = (iround(qe.x * SCALE), iround(qe.y * SCALE));
            let fnx = fax - fx0;
            let fny = fay - fy0;
            if self.first {
                self.mnx = fnx;
                self.mny = fny;
                self.first = false;
            } else {
                self.join(fx0, fy0, fnx, fny, join, limit);
            }
            let (ffx, ffy) = (fx0 - fnx, fy0 - fny);
            let fnx2 = fcx - fx2;
            let fny2 = fcy - fy2;
            let (fdx, fdy) = (fx2 - fnx2, fy2 - fny2);
            self.bezier2(fax, fay, fbx, fby, fcx, fcy);
            self.bezier2(fdx, fdy, fex, fey, ffx, ffy);
            self.nx = fnx2;
            self.ny = fny2;
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn stroke_curveto(
        &mut self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        x: f64,
        y: f64,
        distance: f64,
        mut join: JoinKind,
        limit: f64,
    ) {
        let (x0, y0) = (self.x, self.y);
        let (x3, y3) = (x, y);
        if geom::is_similar(x0, x1) && geom::is_similar(y0, y1) && geom::is_similar(x1, x2) && geom::is_similar(y1, y2) {
            self.stroke_lineto(x3, y3, distance, join, limit);
            return;
        }
        if geom::is_similar(x1, x2) && geom::is_similar(y1, y2) && geom::is_similar(x2, x3) && geom::is_similar(y2, y3) {
            self.stroke_lineto(x3, y3, distance, join, limit);
            return;
        }
        if geom::is_similar((x0 - x1) * (y2 - y1), (y0 - y1) * (x2 - x1))
            && geom::is_similar((x3 - x2) * (y1 - y2), (y3 - y2) * (x1 - x2))
        {
            let seg = Segment::Cubic(Point::new(x0, y0), Point::new(x1, y1), Point::new(x2, y2), Point::new(x3, y3));
            for p in geom::polyline(&seg) {
                self.stroke_lineto(p.x, p.y, distance, join, limit);
                join = JoinKind::Round;
            }
            self.stroke_lineto(x3, y3, distance, join, limit);
            return;
        }
        self.x = x;
        self.y = y;
        let full = Segment::Cubic(Point::new(x0, y0), Point::new(x1, y1), Point::new(x2, y2), Point::new(x3, y3));
        let ts: Vec<f64> = geom::inflections3(&full)
            .into_iter()
            .filter(|t| *t > 0.0 && *t < 1.0 && !geom::is_similar(*t, 0.0) && !geom::is_similar(*t, 1.0))
            .collect();
        let pieces = geom::chop(&full, &ts);
        // Merge adjacent pieces whose shared control points already
        // collapsed to a line at the chop boundary, to avoid re-offsetting
        // a degenerate zero-length interior span (spec §9 open question:
        // the canonical fix chosen here is to merge rather than re-split).
        let mut merged: Vec<Segment> = Vec::new();
        for piece in pieces {
            if let Some(Segment::Cubic(p0, p1, p2, p3)) = merged.last().copied() {
                let Segment::Cubic(q0, q1, q2, q3) = piece else { unreachable!() };
                let left_collapsed = geom::is_similar(p0.x, p1.x)
                    && geom::is_similar(p0.y, p1.y)
                    && geom::is_similar(p1.x, p2.x)
                    && geom::is_similar(p1.y, p2.y)
                    && geom::is_similar(p2.x, p3.x)
                    && geom::is_similar(p2.y, p3.y);
                let right_collapsed = geom::is_similar(q0.x, q1.x)
                    && geom::is_similar(q0.y, q1.y)
                    && geom::is_similar(q1.x, q2.x)
                    && geom::is_similar(q1.y, q2.y)
                    && geom::is_similar(q2.x, q3.x)
                    && geom::is_similar(q2.y, q3.y);
                if left_collapsed {
                    *merged.last_mut().unwrap() = Segment::Cubic(p0, q1, q2, q3);
                    continue;
                }
                if right_collapsed {
                    *merged.last_mut().unwrap() = Segment::Cubic(p0, p1, p2, q3);
                    continue;
                }
            }
            merged.push(piece);
        }
        for segment in merged {
            for piece in geom::subdivide(&segment, geom::SUBDIVIDE_THRESHOLD) {
                let Segment::Cubic(p0, p1, p2, p3) = piece else { unreachable!() };
                let (a, b, c, d, f, g);
                if geom::is_similar(p0.x, p1.x) && geom::is_similar(p0.y, p1.y) {
                    let (qa, qc, qd) = geom::offset_quad(p0, p2, p3, distance);
                    let (_, qf, qg) = geom::offset_quad(p3, p2, p0, distance);
                    a = qa;
                    b = qa;
                    c = qc;
                    d = qd;
                    f = qf;
                    g = qg;
                } else if geom::is_similar(p2.x, p3.x) && geom::is_similar(p2.y, p3.y) {
                    let (qa, qb, qd) = geom::offset_quad(p0, p1, p3, distance);
                    let (qf, qg, _) = geom::offset_quad(p3, p1, p0, distance);
                    a = qa;
                    b = qb;
                    c = qd;
                    d = qd;
                    f = qf;
                    g = qg;
                } else {
                    let (qa, qb, qc, qd) = geom::offset_cubic(p0, p1, p2, p3, distance);
                    let (_, qf, qg, _) = geom::offset_cubic(p3, p2, p1, p0, distance);
                    a = qa;
                    b = qb;
                    c = qc;
                    d = qd;
                    f = qf;
                    g = qg;
                }
                let (fx0, fy0) = (iround(p0.x * SCALE), iround(p0.y * SCALE));
                let (fx3, fy3) = (iround(p3.x * SCALE), iround(p3.y * SCALE));
                let (fax, fay) = (iround(a.x * SCALE), iround(a.y * SCALE));
                let (fbx, fby) = (iround(b.x * SCALE), iround(b.y * SCALE));
                let (fcx, fcy) = (iround(c.x * SCALE), iround(c.y * SCALE));
                let (fdx, fdy) = (iround(d.x * SCALE), iround(d.y * SCALE));
                let (ffx, ffy) = (iround(f.x * SCALE), iround(f.y * SCALE));
                let (fgx, fgy) = (iround(g.x * SCALE), iround(g.y * SCALE));
                let fnx = fax - fx0;
                let fny = fay - fy0;
                if self.first {
                    self.mnx = fnx;
                    self.mny = fny;
                    self.first = false;
                } else {
                    self.join(fx0, fy0, fnx, fny, join, limit);
                }
                let (fhx, fhy) = (fx0 - fnx, fy0 - fny);
                let fnx2 = fdx - fx3;
                let fny2 = fdy - fy3;
                let (fex, fey) = (fx3 - fnx2, fy3 - fny2);
                self.bezier3(fax, fay, fbx, fby, fcx, fcy, fdx, fdy);
                self.bezier3(fex, fey, ffx, ffy, fgx, fgy, fhx, fhy);
                self.nx = fnx2;
                self.ny = fny2;
            }
            join = JoinKind::Round;
        }
    }

    pub fn stroke_closepath(&mut self, distance: f64, join: JoinKind, limit: f64) {
        let (x0, y0, x1, y1) = (self.x, self.y, self.mx, self.my);
        if x0 != x1 || y0 != y1 {
            self.stroke_lineto(x1, y1, distance, join, limit);
        }
        let (fx1, fy1) = (iround(x1 * SCALE), iround(y1 * SCALE));
        self.join(fx1, fy1, self.mnx, self.mny, join, limit);
        self.nx = self.mnx;
        self.ny = self.mny;
    }

    /// Emit end caps for an open stroked sub-path.
    pub fn cap(&mut self, kind: CapKind) {
        let (mx, my) = (iround(self.mx * SCALE), iround(self.my * SCALE));
        let (x, y) = (iround(self.x * SCALE), iround(self.y * SCALE));
        let (mnx, mny, nx, ny) = (self.mnx, self.mny, self.nx, self.ny);
        match kind {
            CapKind::Butt => {
                self.edge(mx - mnx, my - mny, mx + mnx, my + mny);
                self.edge(x + nx, y + ny, x - nx, y - ny);
            }
            CapKind::Round => {
                const K: i64 = 72389; // 4/3*(sqrt(2)-1)*131072
                let (x0, y0) = (mx - mnx, my - mny);
                let (x4, y4) = (mx + mnx, my + mny);
                let (x2, y2) = (mx + mny, my - mnx);
                let (dx, dy) = ((mny * K + 65536).div_euclid(131072), (-mnx * K + 65536).div_euclid(131072));
                self.bezier3(x0, y0, x0 + dx, y0 + dy, x2 + dy, y2 - dx, x2, y2);
                self.bezier3(x2, y2, x2 - dy, y2 + dx, x4 + dx, y4 + dy, x4, y4);
                let (x0, y0) = (x + nx, y + ny);
                let (x4, y4) = (x - nx, y - ny);
                let (x2, y2) = (x - ny, y + nx);
                let (dx, dy) = ((ny * K + 65536).div_euclid(131072), (-nx * K + 65536).div_euclid(131072));
                self.bezier3(x0, y0, x0 - dx, y0 - dy, x2 - dy, y2 + dx, x2, y2);
                self.bezier3(x2, y2, x2 + dy, y2 - dx, x4 - dx, y4 - dy, x4, y4);
            }
            CapKind::Square => {
                let (x0, y0) = (mx - mnx, my - mny);
                let (x1, y1) = (x0 + mny, y0 - mnx);
                let (x4, y4) = (mx + mnx, my + mny);
                let (x3, y3) = (x4 + mny, y4 - mnx);
                self.edge(x0, y0, x1, y1);
                self.edge(x1, y1, x3, y3);
                self.edge(x3, y3, x4, y4);
                let (x0, y0) = (x + nx, y + ny);
                let (x1, y1) = (x0 - ny, y0 + nx);
                let (x4, y4) = (x - nx, y - ny);
                let (x3, y3) = (x4 - ny, y4 + nx);
                self.edge(x0, y0, x1, y1);
                self.edge(x1, y1, x3, y3);
                self.edge(x3, y3, x4, y4);
            }
        }
    }

    /// Bridge the outer offset edges at an interior stroke vertex
    /// `(x, y)` with incoming normal `(self.nx, self.ny)` and outgoing
    /// normal `(nx, ny)`, per `kind`. `limit` is the squared miter-length
    /// threshold beyond which a miter join falls back to a bevel.
    fn join(&mut self, x: i64, y: i64, nx: i64, ny: i64, kind: JoinKind, limit: f64) {
        let (px, py) = (self.nx, self.ny);
        if px == nx && py == ny {
            return;
        }
        match kind {
            JoinKind::Miter => {
                let d = px * ny - py * nx;
                if d == 0 {
                    self.edge(x + px, y + py, x + nx, y + ny);
                } else {
                    let (px, py, nx, ny, d) = if d < 0 { (-nx, -ny, -px, -py, -d) } else { (px, py, nx, ny, d) };
                    let m = px * (py - px) - py * (px + py);
                    let n = nx * (ny - nx) - ny * (nx + ny);
                    let rx = (py * n - m * ny + d / 2).div_euclid(d);
                    let ry = (m * nx - px * n + d / 2).div_euclid(d);
                    if ((rx * rx + ry * ry) as f64) < limit {
                        self.edge(x + px, y + py, x + rx, y + ry);
                        self.edge(x + rx, y + ry, x + nx, y + ny);
                    } else {
                        self.edge(x + px, y + py, x + nx, y + ny);
                    }
                }
            }
            JoinKind::Round => {
                let d = px * ny - py * nx;
                let (px, py, nx, ny, d) = if d < 0 { (-nx, -ny, -px, -py, -d) } else { (px, py, nx, ny, d) };
                let a = (px - nx).pow(2) + (py - ny).pow(2);
                let b = (px - ny).pow(2) + (py + nx).pow(2);
                let c = (px + nx).pow(2) + (py + ny).pow(2);
                if a <= b {
                    let m = px * (py - px) - py * (px + py);
                    let n = nx * (ny - nx) - ny * (nx + ny);
                    let rx = (py * n - m * ny + d / 2).div_euclid(d);
                    let ry = (m * nx - px * n + d / 2).div_euclid(d);
                    self.bezier2(x + px, y + py, x + rx, y + ry, x + nx, y + ny);
                } else if a <= c {
                    self.arc3(x, y, x + px, y + py, x + nx, y + ny);
                } else {
                    let u = (px * px + py * py) as f64;
                    let v = (px * nx + py * ny) as f64;
                    let k = (u / (2.0 * (u - v))).sqrt();
                    let (x3, y3) = (
                        x + iround((-py as f64 + ny as f64) * k),
                        y + iround((px as f64 - nx as f64) * k),
                    );
                    self.arc3(x, y, x + px, y + py, x3, y3);
                    self.arc3(x, y, x3, y3, x + nx, y + ny);
                }
            }
            JoinKind::Bevel => {
                self.edge(x + px, y + py, x + nx, y + ny);
            }
        }
        self.edge(x - nx, y - ny, x - px, y - py);
    }

    /// Composite the accumulated coverage against `components` (matching
    /// the image's channel count) via Porter-Duff source-over, consuming
    /// the scanline accumulator and returning the finished image.
    pub fn composite(&mut self, components: &[u8]) -> &Image {
        let n = self.image.kind.channels();
        let (c0, c1, c2, c3) = match n {
            1 => (components[0] as i64, 0, 0, 0),
            2 => (components[0] as i64, components[1] as i64, 0, 0),
            3 => (components[0] as i64, components[1] as i64, components[2] as i64, 0),
            _ => (
                components[0] as i64,
                components[1] as i64,
                components[2] as i64,
                components[3] as i64,
            ),
        };
        let w = self.image.width as i64;
        let top = (self.top.div_euclid(256)).max(0);
        let bottom = ((self.bottom + 255).div_euclid(256)).min(self.image.height as i64);
        for y in top..bottom {
            let scanline = &mut self.scanlines[y as usize];
            scanline.sort();
            let offset = y * w;
            let mut coverage = 0i64;
            let mut i: i64 = 0;
            for &(cell, area) in scanline.iter() {
                if coverage == 0 {
                    let x = cell.max(0);
                    i = (offset + x) * n as i64;
                } else {
                    let x = cell.min(w);
                    let j = (offset + x) * n as i64;
                    let alpha = ((coverage.abs().min(65536) * 255 + 32768) / 65536) as i64;
                    while i < j {
                        let idx = i as usize;
                        let data = self.image.data_mut();
                        match n {
                            1 => {
                                let v = 255 - alpha;
                                data[idx] = ((c0 * alpha + data[idx] as i64 * v + 127) / 255) as u8;
                            }
                            2 => {
                                let u = (c1 * alpha + 127) / 255;
                                let v = (data[idx + 1] as i64 * (255 - u) + 127) / 255;
                                data[idx] = ((c0 * u + data[idx] as i64 * v + 127) / 255) as u8;
                                data[idx + 1] = (u + v) as u8;
                            }
                            3 => {
                                let v = 255 - alpha;
                                data[idx] = ((c0 * alpha + data[idx] as i64 * v + 127) / 255) as u8;
                                data[idx + 1] = ((c1 * alpha + data[idx + 1] as i64 * v + 127) / 255) as u8;
                                data[idx + 2] = ((c2 * alpha + data[idx + 2] as i64 * v + 127) / 255) as u8;
                            }
                            _ => {
                                let u = (c3 * alpha + 127) / 255;
                                let v = (data[idx + 3] as i64 * (255 - u) + 127) / 255;
                                data[idx] = ((c0 * u + data[idx] as i64 * v + 127) / 255) as u8;
                                data[idx + 1] = ((c1 * u + data[idx + 1] as i64 * v + 127) / 255) as u8;
                                data[idx + 2] = ((c2 * u + data[idx + 2] as i64 * v + 127) / 255) as u8;
                                data[idx + 3] = (u + v) as u8;
                            }
                        }
                        i += n as i64;
                    }
                }
                coverage -= area;
            }
            scanline.clear();
        }
        self.top = self.image.height as i64 * 256;
        self.bottom = 0;
        &self.image
    }

    pub fn into_image(self) -> Image {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_cmyk_image_kind() {
        assert!(Rasterizer::new(4, 4, Kind::Cmyk).is_err());
    }

    #[test]
    fn filled_square_covers_interior_pixels() {
        let mut r = Rasterizer::new(10, 10, Kind::Gray).unwrap();
        r.moveto(2.0, 2.0);
        r.lineto(8.0, 2.0);
        r.lineto(8.0, 8.0);
        r.lineto(2.0, 8.0);
        r.closepath();
        let mut img = r.composite(&[0]).clone();
        assert_eq!(img.get(5, 5), &[0]);
    }

    #[test]
    fn empty_path_leaves_image_white() {
        let mut r = Rasterizer::new(4, 4, Kind::Gray).unwrap();
        let mut img = r.composite(&[0]).clone();
        assert_eq!(img.get(0, 0), &[255]);
    }

    #[test]
    fn stroke_round_trip_does_not_panic_on_closed_quad() {
        let mut r = Rasterizer::new(20, 20, Kind::Gray).unwrap();
        r.stroke_moveto(2.0, 2.0, 1.0, JoinKind::Round, 16.0);
        r.stroke_quadto(10.0, 0.0, 18.0, 2.0, 1.0, JoinKind::Round, 16.0);
        r.stroke_lineto(18.0, 18.0, 1.0, JoinKind::Round, 16.0);
        r.stroke_closepath(1.0, JoinKind::Round, 16.0);
        let _ = r.composite(&[0]);
    }
}
