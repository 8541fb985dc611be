//! Pixel buffer and geometric image operations (spec §3 "Image", §4
//! component table row `image`). Ported from `flat/image.py`; PNG/JPEG
//! decode is delegated to the `image` crate, which spec §1 treats as an
//! "opaque decoder that yields a pixel buffer" external collaborator.

mod resize;

pub use resize::Interpolation;

use crate::error::{ImageError, Result};
use tracing::debug;

/// Pixel channel layout (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Gray,
    GrayAlpha,
    Rgb,
    Rgba,
    Cmyk,
}

impl Kind {
    pub fn channels(self) -> usize {
        match self {
            Kind::Gray => 1,
            Kind::GrayAlpha => 2,
            Kind::Rgb => 3,
            Kind::Rgba | Kind::Cmyk => 4,
        }
    }
}

/// The compressed source an [`Image`] was opened from, kept around so it can
/// be re-emitted verbatim by the PDF/SVG back-ends without a
/// decode-then-recompress round trip, until the first mutation discards it
/// (spec §3 "Image" invariants).
#[derive(Debug, Clone)]
pub enum Source {
    Png(Vec<u8>),
    /// JPEG bytes plus the EXIF-derived clockwise rotation in degrees
    /// (0/90/180/270) that `decompress` applies after decoding.
    Jpeg(Vec<u8>, u16),
}

/// A row-major pixel buffer plus an optional lazily-decoded compressed
/// source (spec §3 "Image").
#[derive(Debug, Clone)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub kind: Kind,
    data: Vec<u8>,
    source: Option<Source>,
}

impl Image {
    /// `image(width, height, kind)`: a blank buffer of the given kind.
    pub fn new(width: usize, height: usize, kind: Kind) -> Self {
        Image {
            width,
            height,
            kind,
            data: vec![0u8; width * height * kind.channels()],
            source: None,
        }
    }

    fn n(&self) -> usize {
        self.kind.channels()
    }

    /// `image.open`: sniff PNG/JPEG magic bytes and keep the compressed
    /// bytes as a lazy [`Source`] until [`Image::decompress`] is called.
    pub fn open(bytes: Vec<u8>) -> Result<Image> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            check_png_not_interlaced(&bytes)?;
            let (w, h, kind) = png_dimensions(&bytes)?;
            return Ok(Image {
                width: w,
                height: h,
                kind,
                data: Vec::new(),
                source: Some(Source::Png(bytes)),
            });
        }
        if bytes.starts_with(&[0xFF, 0xD8]) {
            check_jpeg_not_progressive(&bytes)?;
            let rotation = jpeg_exif_rotation(&bytes);
            let decoded = image::load_from_memory(&bytes)
                .map_err(|e| ImageError::Decoder(e.to_string()))?;
            let (mut w, mut h) = (decoded.width() as usize, decoded.height() as usize);
            if rotation == 90 || rotation == 270 {
                std::mem::swap(&mut w, &mut h);
            }
            return Ok(Image {
                width: w,
                height: h,
                kind: Kind::Rgb,
                data: Vec::new(),
                source: Some(Source::Jpeg(bytes, rotation)),
            });
        }
        Err(ImageError::InvalidMagic.into())
    }

    /// `decompress`: materialise the pixel buffer from the compressed
    /// source, if any, applying any EXIF rotation the source recorded.
    pub fn decompress(&mut self) -> &mut Self {
        if let Some(source) = self.source.take() {
            match source {
                Source::Png(bytes) => {
                    let decoded = image::load_from_memory(&bytes).expect("PNG source bytes");
                    self.kind = match decoded.color() {
                        image::ColorType::L8 => Kind::Gray,
                        image::ColorType::La8 => Kind::GrayAlpha,
                        image::ColorType::Rgba8 => Kind::Rgba,
                        _ => Kind::Rgb,
                    };
                    self.data = match self.kind {
                        Kind::Gray => decoded.to_luma8().into_raw(),
                        Kind::GrayAlpha => decoded.to_luma_alpha8().into_raw(),
                        Kind::Rgba => decoded.to_rgba8().into_raw(),
                        _ => decoded.to_rgb8().into_raw(),
                    };
                    self.width = decoded.width() as usize;
                    self.height = decoded.height() as usize;
                }
                Source::Jpeg(bytes, rotation) => {
                    let decoded = image::load_from_memory(&bytes).expect("JPEG source bytes");
                    self.kind = Kind::Rgb;
                    self.data = decoded.to_rgb8().into_raw();
                    self.width = decoded.width() as usize;
                    self.height = decoded.height() as usize;
                    if rotation == 90 || rotation == 270 {
                        std::mem::swap(&mut self.width, &mut self.height);
                        self.rotate(rotation == 90);
                    } else if rotation == 180 {
                        self.flip(true, true);
                    }
                }
            }
            debug!(width = self.width, height = self.height, kind = ?self.kind, "decompressed image");
        }
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The still-cached compressed source, if this image hasn't been
    /// mutated since it was opened (spec §3 "Image" invariants).
    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// `get`: the pixel components at `(x, y)`.
    pub fn get(&mut self, x: usize, y: usize) -> &[u8] {
        self.decompress();
        let n = self.n();
        let i = (x + y * self.width) * n;
        &self.data[i..i + n]
    }

    /// `put`: overwrite the pixel components at `(x, y)`.
    ///
    /// # Panics
    /// Panics if `components.len()` does not match the image's channel
    /// count (programmer error, spec §7).
    pub fn put(&mut self, x: usize, y: usize, components: &[u8]) {
        self.decompress();
        let n = self.n();
        assert_eq!(components.len(), n, "component count does not match image kind");
        let i = (x + y * self.width) * n;
        self.data[i..i + n].copy_from_slice(components);
    }

    /// `fill`: tile `components` across the whole buffer.
    pub fn fill(&mut self, components: &[u8]) -> &mut Self {
        self.decompress();
        let n = self.n();
        assert_eq!(components.len(), n, "component count does not match image kind");
        for (i, byte) in self.data.iter_mut().enumerate() {
            *byte = components[i % n];
        }
        self
    }

    /// `white`: the colour-space-correct representation of opaque white.
    pub fn white(&mut self) -> &mut Self {
        self.decompress();
        let pattern: Vec<u8> = match self.kind {
            Kind::Gray => vec![255],
            Kind::GrayAlpha => vec![255, 0],
            Kind::Rgb => vec![255, 255, 255],
            Kind::Rgba => vec![255, 255, 255, 0],
            Kind::Cmyk => vec![0, 0, 0, 0],
        };
        self.fill(&pattern)
    }

    /// `black`: the colour-space-correct representation of opaque black.
    pub fn black(&mut self) -> &mut Self {
        self.decompress();
        let pattern: Vec<u8> = match self.kind {
            Kind::Gray => vec![0],
            Kind::GrayAlpha => vec![0, 0],
            Kind::Rgb => vec![0, 0, 0],
            Kind::Rgba => vec![0, 0, 0, 0],
            Kind::Cmyk => vec![0, 0, 0, 255],
        };
        self.fill(&pattern)
    }

    /// `blit`: copy `source` into `self` at `(x, y)`, clipped to both
    /// buffers' bounds.
    pub fn blit(&mut self, x: i64, y: i64, source: &mut Image) -> Result<()> {
        self.decompress();
        source.decompress();
        if self.kind != source.kind {
            return Err(ImageError::MismatchedKinds(self.kind, source.kind).into());
        }
        let (w, h, n) = (self.width as i64, self.height as i64, self.n());
        let width = 0.max(w.min(w - x).min(source.width as i64).min(source.width as i64 + x));
        let height = 0.max(h.min(h - y).min(source.height as i64).min(source.height as i64 + y));
        if width <= 0 || height <= 0 {
            return Ok(());
        }
        for k in 0..height {
            let i = ((x.max(0)) + (y.max(0) + k) * w) as usize * n;
            let j = ((-x).max(0) + ((-y).max(0) + k) * source.width as i64) as usize * n;
            let len = width as usize * n;
            self.data[i..i + len].copy_from_slice(&source.data[j..j + len]);
        }
        Ok(())
    }

    /// `crop`: shrink the buffer to the clipped `(x, y, width, height)` box.
    pub fn crop(&mut self, x: i64, y: i64, width: i64, height: i64) -> &mut Self {
        self.decompress();
        let (w, h, n) = (self.width as i64, self.height as i64, self.n());
        let width = 0.max(w.min(w - x).min(width).min(width + x)) as usize;
        let height = 0.max(h.min(h - y).min(height).min(height + y)) as usize;
        if self.width != width {
            for k in 0..height {
                let i = k * width * n;
                let j = ((x.max(0)) as usize + (y.max(0) as usize + k) * self.width) * n;
                self.data.copy_within(j..j + width * n, i);
            }
        }
        self.data.truncate(width * height * n);
        self.width = width;
        self.height = height;
        self
    }

    /// `flip`: mirror the buffer horizontally and/or vertically, in place.
    pub fn flip(&mut self, horizontal: bool, vertical: bool) -> &mut Self {
        self.decompress();
        let (w, h, n) = (self.width, self.height, self.n());
        let swap_pixels = |data: &mut [u8], i: usize, j: usize, n: usize| {
            for k in 0..n {
                data.swap(i + k, j + k);
            }
        };
        match (horizontal, vertical) {
            (true, true) => {
                for y in 0..h / 2 {
                    for x in 0..w {
                        let i = (x + y * w) * n;
                        let j = ((w - x - 1) + (h - y - 1) * w) * n;
                        swap_pixels(&mut self.data, i, j, n);
                    }
                }
                if h % 2 == 1 {
                    let m = h / 2;
                    for x in 0..w / 2 {
                        let i = (x + m * w) * n;
                        let j = ((w - x - 1) + m * w) * n;
                        swap_pixels(&mut self.data, i, j, n);
                    }
                }
            }
            (true, false) => {
                for y in 0..h {
                    for x in 0..w / 2 {
                        let i = (x + y * w) * n;
                        let j = ((w - x - 1) + y * w) * n;
                        swap_pixels(&mut self.data, i, j, n);
                    }
                }
            }
            (false, true) => {
                for y in 0..h / 2 {
                    for x in 0..w {
                        let i = (x + y * w) * n;
                        let j = (x + (h - y - 1) * w) * n;
                        swap_pixels(&mut self.data, i, j, n);
                    }
                }
            }
            (false, false) => {}
        }
        self
    }

    /// `rotate`: 90-degree rotation, clockwise if `clockwise`, else
    /// counter-clockwise. Swaps width/height.
    pub fn rotate(&mut self, clockwise: bool) -> &mut Self {
        self.decompress();
        let (w, h, n) = (self.width, self.height, self.n());
        let mut result = vec![0u8; w * h * n];
        for y in 0..h {
            for x in 0..w {
                let i = (x + y * w) * n;
                let j = if clockwise {
                    (h - y - 1 + x * h) * n
                } else {
                    (y + (w - x - 1) * h) * n
                };
                result[j..j + n].copy_from_slice(&self.data[i..i + n]);
            }
        }
        self.width = h;
        self.height = w;
        self.data = result;
        self
    }

    /// `resize`: bicubic/Lanczos/nearest-neighbour resampling. Passing 0 for
    /// one dimension preserves the aspect ratio.
    pub fn resize(&mut self, width: usize, height: usize, interpolation: resize::Interpolation) -> &mut Self {
        self.decompress();
        resize::resize(self, width, height, interpolation);
        self
    }

    pub fn rescale(&mut self, factor: f64, interpolation: resize::Interpolation) -> &mut Self {
        let w = (self.width as f64 * factor + 0.5) as usize;
        let h = (self.height as f64 * factor + 0.5) as usize;
        self.resize(w, h, interpolation)
    }

    /// `blur`: separable binomial-kernel box blur of the given radius.
    pub fn blur(&mut self, radius: usize) -> &mut Self {
        self.decompress();
        if radius == 0 {
            return self;
        }
        let mut kernel = vec![1i64; radius * 2 + 1];
        for k in 0..radius * 2 - 1 {
            kernel[k + 1] = kernel[k] * (radius as i64 * 2 - k as i64) / (k as i64 + 1);
        }
        let (w, h, n) = (self.width, self.height, self.n());
        let mut separation = vec![0u8; w * h * n];
        for y in 0..h {
            for x in 0..w {
                for c in 0..n {
                    let mut value = 0i64;
                    let mut total = 0i64;
                    for (o, &weight) in kernel.iter().enumerate() {
                        let offset = o as i64 - radius as i64;
                        let sx = x as i64 + offset;
                        if sx >= 0 && (sx as usize) < w {
                            let i = (sx as usize + y * w) * n + c;
                            value += self.data[i] as i64 * weight;
                            total += weight;
                        }
                    }
                    let i = (y + x * h) * n + c;
                    separation[i] = ((value + total / 2) / total) as u8;
                }
            }
        }
        for x in 0..w {
            for y in 0..h {
                for c in 0..n {
                    let mut value = 0i64;
                    let mut total = 0i64;
                    for (o, &weight) in kernel.iter().enumerate() {
                        let offset = o as i64 - radius as i64;
                        let sy = y as i64 + offset;
                        if sy >= 0 && (sy as usize) < h {
                            let i = (sy as usize + x * h) * n + c;
                            value += separation[i] as i64 * weight;
                            total += weight;
                        }
                    }
                    let i = (x + y * w) * n + c;
                    self.data[i] = ((value + total / 2) / total) as u8;
                }
            }
        }
        self
    }

    /// `dither`: Burkes (1988) error-diffusion dithering to `levels` grays.
    /// Only valid on a `Gray` image.
    pub fn dither(&mut self, levels: u32) -> Result<&mut Self> {
        self.decompress();
        if self.kind != Kind::Gray {
            panic!("dither() requires a grayscale image");
        }
        if !(2..=256).contains(&levels) {
            return Err(ImageError::InvalidDitherLevels(levels).into());
        }
        let (w, h) = (self.width, self.height);
        let cache: Vec<u8> = (0..256u32)
            .map(|i| (255 * (i * levels / 256) / (levels - 1)) as u8)
            .collect();
        let mut errors = vec![0i64; w + 4];
        for y in 0..h {
            let mut error1 = errors[2];
            let mut error2 = errors[3];
            errors[2] = 0;
            errors[3] = 0;
            for x in 0..w {
                let i = x + y * w;
                let old = self.data[i] as i64 + (error1 + 16) / 32;
                let clamped = old.clamp(0, 255) as usize;
                let new = cache[clamped];
                self.data[i] = new;
                let error = old - new as i64;
                error1 = 8 * error + error2;
                error2 = 4 * error + errors[x + 4];
                errors[x] += 2 * error;
                errors[x + 1] += 4 * error;
                errors[x + 2] += 8 * error;
                errors[x + 3] += 4 * error;
                errors[x + 4] = 2 * error;
            }
        }
        Ok(self)
    }

    /// `gamma`: power-law gamma correction.
    pub fn gamma(&mut self, value: f64) -> &mut Self {
        self.decompress();
        let cache: Vec<u8> = (0..256u32)
            .map(|i| (((i as f64 / 255.0).powf(value)) * 255.0 + 0.5) as u8)
            .collect();
        for byte in self.data.iter_mut() {
            *byte = cache[*byte as usize];
        }
        self
    }

    /// `invert`: bitwise-complement every channel.
    pub fn invert(&mut self) -> &mut Self {
        self.decompress();
        for byte in self.data.iter_mut() {
            *byte ^= 0xFF;
        }
        self
    }
}

fn check_png_not_interlaced(bytes: &[u8]) -> Result<()> {
    // IHDR is always the first chunk, at byte 8; interlace method is the
    // last byte of its 13-byte payload.
    if bytes.len() < 8 + 8 + 13 {
        return Err(ImageError::InvalidMagic.into());
    }
    let interlace = bytes[8 + 8 + 12];
    if interlace != 0 {
        return Err(ImageError::InterlacedPngUnsupported.into());
    }
    Ok(())
}

fn png_dimensions(bytes: &[u8]) -> Result<(usize, usize, Kind)> {
    let w = u32::from_be_bytes(bytes[16..20].try_into().unwrap()) as usize;
    let h = u32::from_be_bytes(bytes[20..24].try_into().unwrap()) as usize;
    let color_type = bytes[25];
    let kind = match color_type {
        0 => Kind::Gray,
        4 => Kind::GrayAlpha,
        2 => Kind::Rgb,
        6 => Kind::Rgba,
        _ => Kind::Rgb,
    };
    Ok((w, h, kind))
}

fn check_jpeg_not_progressive(bytes: &[u8]) -> Result<()> {
    let mut i = 2;
    while i + 4 <= bytes.len() {
        if bytes[i] != 0xFF {
            i += 1;
            continue;
        }
        let marker = bytes[i + 1];
        if marker == 0xC2 || marker == 0xC6 || marker == 0xCA || marker == 0xCE {
            return Err(ImageError::ProgressiveJpegUnsupported.into());
        }
        if marker == 0xD8 || marker == 0xD9 || (0xD0..=0xD7).contains(&marker) {
            i += 2;
            continue;
        }
        if marker == 0xDA {
            break; // start of scan: stop scanning markers
        }
        if i + 4 > bytes.len() {
            break;
        }
        let len = u16::from_be_bytes([bytes[i + 2], bytes[i + 3]]) as usize;
        i += 2 + len;
    }
    Ok(())
}

fn jpeg_exif_rotation(_bytes: &[u8]) -> u16 {
    // EXIF orientation parsing is out of scope for the core kernel; the
    // back-ends treat all opened JPEGs as unrotated unless a future EXIF
    // reader populates this.
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_image_has_correct_buffer_length() {
        let img = Image::new(10, 5, Kind::Rgba);
        assert_eq!(img.data.len(), 10 * 5 * 4);
    }

    #[test]
    fn white_fills_rgb_with_255() {
        let mut img = Image::new(2, 2, Kind::Rgb);
        img.white();
        assert_eq!(img.get(0, 0), &[255, 255, 255]);
    }

    #[test]
    fn put_then_get_round_trips() {
        let mut img = Image::new(2, 2, Kind::Rgb);
        img.put(1, 1, &[1, 2, 3]);
        assert_eq!(img.get(1, 1), &[1, 2, 3]);
    }

    #[test]
    fn flip_both_axes_is_involutive() {
        let mut img = Image::new(3, 3, Kind::Gray);
        for y in 0..3 {
            for x in 0..3 {
                img.put(x, y, &[(x + y * 3) as u8]);
            }
        }
        let original = img.data().to_vec();
        img.flip(true, true);
        img.flip(true, true);
        assert_eq!(img.data(), original.as_slice());
    }

    #[test]
    fn rotate_four_times_is_identity() {
        let mut img = Image::new(4, 3, Kind::Gray);
        for i in 0..img.data().len() {
            img.put(i % 4, i / 4, &[i as u8]);
        }
        let original = img.data().to_vec();
        let (ow, oh) = (img.width, img.height);
        img.rotate(true).rotate(true).rotate(true).rotate(true);
        assert_eq!((img.width, img.height), (ow, oh));
        assert_eq!(img.data(), original.as_slice());
    }

    #[test]
    fn blit_rejects_mismatched_kinds() {
        let mut dst = Image::new(4, 4, Kind::Rgb);
        let mut src = Image::new(2, 2, Kind::Gray);
        assert!(dst.blit(0, 0, &mut src).is_err());
    }

    #[test]
    fn blit_copies_clipped_region() {
        let mut dst = Image::new(4, 4, Kind::Gray);
        let mut src = Image::new(2, 2, Kind::Gray);
        src.fill(&[7]);
        dst.blit(1, 1, &mut src).unwrap();
        assert_eq!(dst.get(1, 1), &[7]);
        assert_eq!(dst.get(0, 0), &[0]);
    }

    #[test]
    fn dither_rejects_out_of_range_levels() {
        let mut img = Image::new(2, 2, Kind::Gray);
        assert!(img.dither(1).is_err());
        assert!(img.dither(300).is_err());
    }

    #[test]
    fn dither_rejects_non_gray_kind() {
        let mut img = Image::new(2, 2, Kind::Rgb);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            img.dither(4).ok();
        }));
        assert!(result.is_err());
    }

    #[test]
    fn invert_is_involutive() {
        let mut img = Image::new(2, 2, Kind::Gray);
        img.put(0, 0, &[10]);
        img.invert();
        img.invert();
        assert_eq!(img.get(0, 0), &[10]);
    }

    #[test]
    fn open_rejects_unknown_magic() {
        assert!(Image::open(vec![0, 1, 2, 3]).is_err());
    }

    #[test]
    fn open_rejects_interlaced_png() {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&[0, 0, 0, 13]); // IHDR length
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&1u32.to_be_bytes()); // width
        bytes.extend_from_slice(&1u32.to_be_bytes()); // height
        bytes.push(8); // bit depth
        bytes.push(2); // color type rgb
        bytes.push(0); // compression
        bytes.push(0); // filter
        bytes.push(1); // interlace = Adam7
        assert!(matches!(
            Image::open(bytes),
            Err(crate::error::Error::Image(ImageError::InterlacedPngUnsupported))
        ));
    }
}
