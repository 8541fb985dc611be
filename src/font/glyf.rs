//! TrueType `glyf`+`loca` quadratic outline decoding, spec §4.2 "Outline
//! decoding" (TrueType branch).

use crate::command::CommandStream;
use crate::error::{FontError, Result};
use crate::readable::Readable;

const MAX_COMPONENT_DEPTH: u32 = 8;

/// Parse the `loca` table into absolute byte offsets into `glyf`, one more
/// entry than `num_glyphs` (the trailing entry marks the end of the last
/// glyph's data).
pub fn parse_loca(loca: &[u8], num_glyphs: u16, long_format: bool) -> Result<Vec<u32>> {
    let mut r = Readable::new(loca);
    let mut offsets = Vec::with_capacity(num_glyphs as usize + 1);
    for _ in 0..=num_glyphs {
        if long_format {
            offsets.push(r.uint32()?);
        } else {
            offsets.push(r.uint16()? as u32 * 2);
        }
    }
    Ok(offsets)
}

/// Decode glyph `index`'s outline into a command stream in font design
/// units (y-up, origin at the glyph's own advance-width baseline).
pub fn decode(glyf: &[u8], loca: &[u32], num_glyphs: u16, index: u16) -> Result<CommandStream> {
    decode_inner(glyf, loca, num_glyphs, index, 0)
}

fn decode_inner(glyf: &[u8], loca: &[u32], num_glyphs: u16, index: u16, depth: u32) -> Result<CommandStream> {
    if index >= num_glyphs {
        return Err(FontError::GlyphIndexOutOfRange(index, num_glyphs).into());
    }
    let start = *loca.get(index as usize).ok_or(FontError::TableTruncated("loca"))? as usize;
    let end = *loca.get(index as usize + 1).ok_or(FontError::TableTruncated("loca"))? as usize;
    if start == end {
        return Ok(CommandStream::new()); // empty glyph, e.g. space
    }
    if end > glyf.len() {
        return Err(FontError::TableTruncated("glyf").into());
    }
    let data = &glyf[start..end];
    let mut r = Readable::new(data);
    let num_contours = r.int16()?;
    let _x_min = r.int16()?;
    let _y_min = r.int16()?;
    let _x_max = r.int16()?;
    let _y_max = r.int16()?;

    if num_contours >= 0 {
        decode_simple(&mut r, num_contours as usize)
    } else {
        if depth >= MAX_COMPONENT_DEPTH {
            return Err(FontError::GlyphIndexOutOfRange(index, num_glyphs).into());
        }
        decode_composite(&mut r, glyf, loca, num_glyphs, depth)
    }
}

fn decode_simple(r: &mut Readable, num_contours: usize) -> Result<CommandStream> {
    let mut end_pts = Vec::with_capacity(num_contours);
    for _ in 0..num_contours {
        end_pts.push(r.uint16()? as usize);
    }
    let num_points = end_pts.last().map(|&e| e + 1).unwrap_or(0);

    let instruction_length = r.uint16()? as usize;
    r.skip(instruction_length);

    const ON_CURVE: u8 = 0x01;
    const X_SHORT: u8 = 0x02;
    const Y_SHORT: u8 = 0x04;
    const REPEAT: u8 = 0x08;
    const X_SAME_OR_POSITIVE: u8 = 0x10;
    const Y_SAME_OR_POSITIVE: u8 = 0x20;

    let mut flags = Vec::with_capacity(num_points);
    while flags.len() < num_points {
        let flag = r.uint8()?;
        flags.push(flag);
        if flag & REPEAT != 0 {
            let repeat = r.uint8()?;
            for _ in 0..repeat {
                flags.push(flag);
            }
        }
    }
    flags.truncate(num_points);

    let mut xs = Vec::with_capacity(num_points);
    let mut x = 0i32;
    for &flag in &flags {
        if flag & X_SHORT != 0 {
            let d = r.uint8()? as i32;
            x += if flag & X_SAME_OR_POSITIVE != 0 { d } else { -d };
        } else if flag & X_SAME_OR_POSITIVE == 0 {
            x += r.int16()? as i32;
        }
        xs.push(x);
    }
    let mut ys = Vec::with_capacity(num_points);
    let mut y = 0i32;
    for &flag in &flags {
        if flag & Y_SHORT != 0 {
            let d = r.uint8()? as i32;
            y += if flag & Y_SAME_OR_POSITIVE != 0 { d } else { -d };
        } else if flag & Y_SAME_OR_POSITIVE == 0 {
            y += r.int16()? as i32;
        }
        ys.push(y);
    }

    let points: Vec<(f64, f64, bool)> = (0..num_points)
        .map(|i| (xs[i] as f64, ys[i] as f64, flags[i] & ON_CURVE != 0))
        .collect();

    let mut cs = CommandStream::new();
    let mut start = 0usize;
    for &end in &end_pts {
        contour_to_commands(&points[start..=end], &mut cs);
        start = end + 1;
    }
    Ok(cs)
}

/// Emit one contour's points as `moveto`/`lineto`/`quadto`/`closepath`,
/// synthesizing the implicit on-curve midpoint between consecutive
/// off-curve points.
fn contour_to_commands(raw: &[(f64, f64, bool)], cs: &mut CommandStream) {
    let n = raw.len();
    if n == 0 {
        return;
    }
    let mut expanded: Vec<(f64, f64, bool)> = Vec::with_capacity(n * 2);
    for i in 0..n {
        let cur = raw[i];
        expanded.push(cur);
        let next = raw[(i + 1) % n];
        if !cur.2 && !next.2 {
            expanded.push(((cur.0 + next.0) / 2.0, (cur.1 + next.1) / 2.0, true));
        }
    }
    let start_idx = expanded.iter().position(|p| p.2).unwrap_or(0);
    expanded.rotate_left(start_idx);
    expanded.push(expanded[0]);

    cs.move_to(expanded[0].0, expanded[0].1);
    let mut i = 1;
    while i < expanded.len() {
        if expanded[i].2 {
            cs.line_to(expanded[i].0, expanded[i].1);
            i += 1;
        } else {
            let ctrl = expanded[i];
            let end = expanded[i + 1];
            cs.quad_to(ctrl.0, ctrl.1, end.0, end.1);
            i += 2;
        }
    }
    cs.close_path();
}

fn decode_composite(
    r: &mut Readable,
    glyf: &[u8],
    loca: &[u32],
    num_glyphs: u16,
    depth: u32,
) -> Result<CommandStream> {
    const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
    const ARGS_ARE_XY_VALUES: u16 = 0x0002;
    const WE_HAVE_A_SCALE: u16 = 0x0008;
    const MORE_COMPONENTS: u16 = 0x0020;
    const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
    const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;
    const WE_HAVE_INSTRUCTIONS: u16 = 0x0100;
    const SCALED_COMPONENT_OFFSET: u16 = 0x0800;

    let mut out = CommandStream::new();
    loop {
        let flags = r.uint16()?;
        let glyph_index = r.uint16()?;
        let (dx, dy) = if flags & ARG_1_AND_2_ARE_WORDS != 0 {
            if flags & ARGS_ARE_XY_VALUES != 0 {
                (r.int16()? as f64, r.int16()? as f64)
            } else {
                let _p1 = r.uint16()?;
                let _p2 = r.uint16()?;
                (0.0, 0.0)
            }
        } else if flags & ARGS_ARE_XY_VALUES != 0 {
            (r.int8()? as f64, r.int8()? as f64)
        } else {
            let _p1 = r.uint8()?;
            let _p2 = r.uint8()?;
            (0.0, 0.0)
        };

        let (a, b, c, d) = if flags & WE_HAVE_A_SCALE != 0 {
            let s = f2dot14(r.int16()?);
            (s, 0.0, 0.0, s)
        } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            let sx = f2dot14(r.int16()?);
            let sy = f2dot14(r.int16()?);
            (sx, 0.0, 0.0, sy)
        } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
            let a = f2dot14(r.int16()?);
            let b = f2dot14(r.int16()?);
            let c = f2dot14(r.int16()?);
            let d = f2dot14(r.int16()?);
            (a, b, c, d)
        } else {
            (1.0, 0.0, 0.0, 1.0)
        };

        let (e, f) = if flags & SCALED_COMPONENT_OFFSET != 0 {
            (a * dx + c * dy, b * dx + d * dy)
        } else {
            (dx, dy)
        };

        let sub = decode_inner(glyf, loca, num_glyphs, glyph_index, depth + 1)?;
        out.0.extend(sub.transform(a, b, c, d, e, f).0);

        if flags & MORE_COMPONENTS == 0 {
            break;
        }
        let _ = WE_HAVE_INSTRUCTIONS; // instructions (if present) trail the last component; not parsed
    }
    Ok(out)
}

fn f2dot14(raw: i16) -> f64 {
    raw as f64 / 16384.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_glyph_round_trips_to_empty_command_stream() {
        let loca = vec![0, 0, 10];
        let cs = decode(&[], &loca, 2, 0).unwrap();
        assert!(cs.is_empty());
    }

    #[test]
    fn out_of_range_glyph_index_errors() {
        let loca = vec![0, 0];
        assert!(decode(&[], &loca, 1, 5).is_err());
    }

    #[test]
    fn contour_with_all_off_curve_points_synthesizes_on_curve_starts() {
        let raw = vec![(0.0, 0.0, false), (10.0, 10.0, false), (0.0, 10.0, false)];
        let mut cs = CommandStream::new();
        contour_to_commands(&raw, &mut cs);
        assert!(!cs.is_empty());
        assert!(matches!(cs.iter().next(), Some(crate::command::Command::MoveTo { .. })));
    }
}
