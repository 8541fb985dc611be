//! Resampling kernels for [`super::Image::resize`], ported from the three
//! interpolators in `flat/image.py` (`kind` argument to `resize`).

use super::Image;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Nearest,
    Bicubic,
    Lanczos,
}

/// Cubic convolution kernel, `a = -0.5` (Catmull-Rom), matching the
/// original's bicubic weight function.
fn cubic_weight(x: f64) -> f64 {
    let x = x.abs();
    let a = -0.5;
    if x < 1.0 {
        (a + 2.0) * x.powi(3) - (a + 3.0) * x.powi(2) + 1.0
    } else if x < 2.0 {
        a * x.powi(3) - 5.0 * a * x.powi(2) + 8.0 * a * x - 4.0 * a
    } else {
        0.0
    }
}

/// Lanczos-3 windowed sinc kernel.
fn lanczos_weight(x: f64) -> f64 {
    let a = 3.0f64;
    if x == 0.0 {
        return 1.0;
    }
    if x.abs() >= a {
        return 0.0;
    }
    let px = std::f64::consts::PI * x;
    a * (px).sin() * (px / a).sin() / (px * px)
}

pub fn resize(img: &mut Image, mut width: usize, mut height: usize, interpolation: Interpolation) {
    if width == 0 && height == 0 {
        return;
    }
    if width == 0 {
        width = (img.width * height + img.height / 2) / img.height.max(1);
    }
    if height == 0 {
        height = (img.height * width + img.width / 2) / img.width.max(1);
    }
    if width == img.width && height == img.height {
        return;
    }
    match interpolation {
        Interpolation::Nearest => resize_nearest(img, width, height),
        Interpolation::Bicubic => resize_separable(img, width, height, cubic_weight, 2.0),
        Interpolation::Lanczos => resize_separable(img, width, height, lanczos_weight, 3.0),
    }
}

fn resize_nearest(img: &mut Image, width: usize, height: usize) {
    let n = img.kind.channels();
    let (sw, sh) = (img.width, img.height);
    let mut out = vec![0u8; width * height * n];
    for y in 0..height {
        let sy = (y * sh / height.max(1)).min(sh.saturating_sub(1));
        for x in 0..width {
            let sx = (x * sw / width.max(1)).min(sw.saturating_sub(1));
            let si = (sx + sy * sw) * n;
            let di = (x + y * width) * n;
            out[di..di + n].copy_from_slice(&img.data()[si..si + n]);
        }
    }
    img.width = width;
    img.height = height;
    img.data = out;
}

/// Separable weighted convolution shared by the bicubic and Lanczos kernels:
/// resample columns first, then rows, each pass a 1-D weighted sum over the
/// kernel's support radius scaled to the resampling ratio.
fn resize_separable(img: &mut Image, width: usize, height: usize, weight: fn(f64) -> f64, radius: f64) {
    let n = img.kind.channels();
    let horizontal = resample_axis(img.data(), img.width, img.height, n, width, Axis::X, weight, radius);
    let out = resample_axis(&horizontal, width, img.height, n, height, Axis::Y, weight, radius);
    img.width = width;
    img.height = height;
    img.data = out;
}

enum Axis {
    X,
    Y,
}

fn resample_axis(
    data: &[u8],
    src_w: usize,
    src_h: usize,
    n: usize,
    dst_len: usize,
    axis: Axis,
    weight: fn(f64) -> f64,
    radius: f64,
) -> Vec<u8> {
    let (src_len, other) = match axis {
        Axis::X => (src_w, src_h),
        Axis::Y => (src_h, src_w),
    };
    let scale = src_len as f64 / dst_len as f64;
    let filter_radius = radius * scale.max(1.0);
    let (out_w, out_h) = match axis {
        Axis::X => (dst_len, src_h),
        Axis::Y => (src_w, dst_len),
    };
    let mut out = vec![0u8; out_w * out_h * n];
    for d in 0..dst_len {
        let center = (d as f64 + 0.5) * scale - 0.5;
        let lo = (center - filter_radius).floor().max(0.0) as i64;
        let hi = ((center + filter_radius).ceil() as i64).min(src_len as i64 - 1);
        let mut weights = Vec::new();
        let mut total = 0.0;
        for s in lo..=hi {
            let w = weight((s as f64 - center) / scale.max(1.0));
            weights.push((s, w));
            total += w;
        }
        if total == 0.0 {
            total = 1.0;
        }
        for o in 0..other {
            for c in 0..n {
                let mut acc = 0.0;
                for &(s, w) in &weights {
                    let idx = match axis {
                        Axis::X => (s as usize + o * src_w) * n + c,
                        Axis::Y => (o + s as usize * src_w) * n + c,
                    };
                    acc += data[idx] as f64 * w;
                }
                let value = (acc / total).round().clamp(0.0, 255.0) as u8;
                let out_idx = match axis {
                    Axis::X => (d + o * out_w) * n + c,
                    Axis::Y => (o + d * out_w) * n + c,
                };
                out[out_idx] = value;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::super::Kind;
    use super::*;

    #[test]
    fn nearest_resize_changes_dimensions() {
        let mut img = Image::new(4, 4, Kind::Gray);
        img.resize(2, 2, Interpolation::Nearest);
        assert_eq!((img.width, img.height), (2, 2));
        assert_eq!(img.data().len(), 4);
    }

    #[test]
    fn bicubic_resize_preserves_uniform_fill() {
        let mut img = Image::new(6, 6, Kind::Gray);
        img.fill(&[100]);
        img.resize(3, 3, Interpolation::Bicubic);
        for &byte in img.data() {
            assert!((byte as i32 - 100).abs() <= 2, "byte {byte} drifted from uniform fill");
        }
    }

    #[test]
    fn zero_height_preserves_aspect_ratio() {
        let mut img = Image::new(8, 4, Kind::Gray);
        img.resize(4, 0, Interpolation::Nearest);
        assert_eq!((img.width, img.height), (4, 2));
    }
}
