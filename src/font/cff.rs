//! CFF / Type 2 charstring interpreter, spec §4.2 "Outline decoding" (CFF
//! branch). Implements the operator subset sufficient for outline-only
//! rendering; arithmetic, storage and conditional operators are rejected.

use std::collections::HashMap;

use crate::command::CommandStream;
use crate::error::{Error, FontError, Result};
use crate::readable::Readable;

const MAX_SUBR_DEPTH: u32 = 10;

/// A parsed CFF table: charstrings plus the global/local subroutine
/// INDEXes needed to run them.
pub struct Cff {
    charstrings: Vec<Vec<u8>>,
    gsubrs: Vec<Vec<u8>>,
    lsubrs: Vec<Vec<u8>>,
}

impl Cff {
    pub fn num_glyphs(&self) -> u16 {
        self.charstrings.len() as u16
    }

    pub fn outline(&self, gid: u16) -> Result<CommandStream> {
        let charstring = self
            .charstrings
            .get(gid as usize)
            .ok_or(FontError::GlyphIndexOutOfRange(gid, self.num_glyphs()))?;
        let mut interp = Interpreter::new(&self.gsubrs, &self.lsubrs);
        interp.run(charstring, 0)?;
        interp.finish_contour();
        Ok(interp.commands)
    }
}

/// Parse a bare `CFF ` table (the whole table, header through the private
/// dict) into charstrings + subroutine indexes.
pub fn parse(data: &[u8]) -> Result<Cff> {
    let mut r = Readable::new(data);
    let _major = r.uint8()?;
    let _minor = r.uint8()?;
    let hdr_size = r.uint8()? as usize;
    let _off_size = r.uint8()?;
    r.jump(hdr_size);

    let (_names, pos) = read_index(data, r.position())?;
    r.jump(pos);
    let (top_dicts, pos) = read_index(data, r.position())?;
    r.jump(pos);
    let (_strings, pos) = read_index(data, r.position())?;
    r.jump(pos);
    let (gsubrs_raw, _pos) = read_index(data, r.position())?;

    let top_dict = top_dicts.first().ok_or(FontError::MissingTable("CFF Top DICT"))?;
    let dict = parse_dict(top_dict);

    if dict.contains_key(&Operator::Escape(30)) {
        // ROS operator: CID-keyed font (FDArray/FDSelect). Out of scope.
        return Err(Error::Unsupported("CID-keyed CFF fonts"));
    }

    let charstrings_offset = *dict
        .get(&Operator::Plain(17))
        .and_then(|v| v.first())
        .ok_or(FontError::MissingTable("CFF CharStrings"))? as usize;
    let (charstrings, _) = read_index(data, charstrings_offset)?;

    let lsubrs = if let Some(private) = dict.get(&Operator::Plain(18)) {
        if private.len() == 2 {
            let size = private[0] as usize;
            let offset = private[1] as usize;
            let private_data = data
                .get(offset..offset + size)
                .ok_or(FontError::TableTruncated("CFF Private DICT"))?;
            let private_dict = parse_dict(private_data);
            if let Some(subrs_rel) = private_dict.get(&Operator::Plain(19)).and_then(|v| v.first()) {
                let (subrs, _) = read_index(data, offset + *subrs_rel as usize)?;
                subrs
            } else {
                Vec::new()
            }
        } else {
            Vec::new()
        }
    } else {
        Vec::new()
    };

    Ok(Cff {
        charstrings,
        gsubrs: gsubrs_raw,
        lsubrs,
    })
}

/// Read one CFF INDEX structure starting at `offset`, returning the decoded
/// entries and the byte position immediately following the INDEX.
fn read_index(data: &[u8], offset: usize) -> Result<(Vec<Vec<u8>>, usize)> {
    let mut r = Readable::new(data);
    r.jump(offset);
    let count = r.uint16()? as usize;
    if count == 0 {
        return Ok((Vec::new(), r.position()));
    }
    let off_size = r.uint8()? as usize;
    let mut offsets = Vec::with_capacity(count + 1);
    for _ in 0..=count {
        let mut value = 0u32;
        for _ in 0..off_size {
            value = (value << 8) | r.uint8()? as u32;
        }
        offsets.push(value as usize);
    }
    let data_start = r.position() - 1; // offsets are 1-indexed from here
    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let start = data_start + offsets[i];
        let end = data_start + offsets[i + 1];
        let slice = data.get(start..end).ok_or(FontError::TableTruncated("CFF INDEX"))?;
        entries.push(slice.to_vec());
    }
    let end_pos = data_start + offsets[count];
    Ok((entries, end_pos))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Operator {
    Plain(u8),
    Escape(u8),
}

fn parse_dict(data: &[u8]) -> HashMap<Operator, Vec<f64>> {
    let mut map = HashMap::new();
    let mut operands = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let b0 = data[i];
        if b0 <= 21 {
            let op = if b0 == 12 {
                i += 1;
                Operator::Escape(data.get(i).copied().unwrap_or(0))
            } else {
                Operator::Plain(b0)
            };
            map.insert(op, std::mem::take(&mut operands));
            i += 1;
        } else if b0 == 28 {
            let v = i16::from_be_bytes([data[i + 1], data[i + 2]]) as f64;
            operands.push(v);
            i += 3;
        } else if b0 == 29 {
            let v = i32::from_be_bytes([data[i + 1], data[i + 2], data[i + 3], data[i + 4]]) as f64;
            operands.push(v);
            i += 5;
        } else if b0 == 30 {
            // Real number: packed BCD nibbles until the 0xf terminator.
            let mut s = String::new();
            i += 1;
            'nibbles: loop {
                let byte = data[i];
                i += 1;
                for nibble in [byte >> 4, byte & 0x0f] {
                    match nibble {
                        0..=9 => s.push((b'0' + nibble) as char),
                        0xa => s.push('.'),
                        0xb => s.push('E'),
                        0xc => s.push_str("E-"),
                        0xe => s.push('-'),
                        0xf => break 'nibbles,
                        _ => {}
                    }
                }
            }
            operands.push(s.parse().unwrap_or(0.0));
        } else if (32..=246).contains(&b0) {
            operands.push(b0 as f64 - 139.0);
            i += 1;
        } else if (247..=250).contains(&b0) {
            let b1 = data[i + 1];
            operands.push((b0 as f64 - 247.0) * 256.0 + b1 as f64 + 108.0);
            i += 2;
        } else if (251..=254).contains(&b0) {
            let b1 = data[i + 1];
            operands.push(-(b0 as f64 - 251.0) * 256.0 - b1 as f64 - 108.0);
            i += 2;
        } else {
            i += 1;
        }
    }
    map
}

fn bias(count: usize) -> i32 {
    if count < 1240 {
        107
    } else if count < 33900 {
        1131
    } else {
        32768
    }
}

/// Type 2 charstring virtual machine. Runs directly against [`CommandStream`]
/// the same way the glyf decoder does, so both outline sources feed the
/// rasterizer/layout code identically.
struct Interpreter<'a> {
    stack: Vec<f64>,
    x: f64,
    y: f64,
    n_stems: u32,
    have_width: bool,
    open: bool,
    commands: CommandStream,
    gsubrs: &'a [Vec<u8>],
    lsubrs: &'a [Vec<u8>],
    gbias: i32,
    lbias: i32,
}

impl<'a> Interpreter<'a> {
    fn new(gsubrs: &'a [Vec<u8>], lsubrs: &'a [Vec<u8>]) -> Self {
        Interpreter {
            stack: Vec::new(),
            x: 0.0,
            y: 0.0,
            n_stems: 0,
            have_width: false,
            open: false,
            commands: CommandStream::new(),
            gsubrs,
            lsubrs,
            gbias: bias(gsubrs.len()),
            lbias: bias(lsubrs.len()),
        }
    }

    fn finish_contour(&mut self) {
        if self.open {
            self.commands.close_path();
            self.open = false;
        }
    }

    fn moveto(&mut self, dx: f64, dy: f64) {
        self.finish_contour();
        self.x += dx;
        self.y += dy;
        self.commands.move_to(self.x, self.y);
        self.open = true;
    }

    fn lineto(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
        self.commands.line_to(self.x, self.y);
    }

    fn curveto(&mut self, dx1: f64, dy1: f64, dx2: f64, dy2: f64, dx3: f64, dy3: f64) {
        let x1 = self.x + dx1;
        let y1 = self.y + dy1;
        let x2 = x1 + dx2;
        let y2 = y1 + dy2;
        self.x = x2 + dx3;
        self.y = y2 + dy3;
        self.commands.curve_to(x1, y1, x2, y2, self.x, self.y);
    }

    /// Consume a leading width argument if the operand count is odd for a
    /// stem/moveto operator (the first such operator only).
    fn take_width(&mut self, expected_parity_even: bool) {
        if !self.have_width {
            let odd = self.stack.len() % 2 == 1;
            if odd == expected_parity_even {
                self.stack.remove(0);
            }
            self.have_width = true;
        }
    }

    fn run(&mut self, code: &[u8], depth: u32) -> Result<()> {
        if depth > MAX_SUBR_DEPTH {
            return Err(FontError::CharstringRecursionLimit.into());
        }
        let mut i = 0;
        while i < code.len() {
            let b0 = code[i];
            if b0 >= 32 || b0 == 28 {
                let (value, len) = decode_number(&code[i..]);
                self.stack.push(value);
                i += len;
                continue;
            }
            i += 1;
            match b0 {
                1 | 3 | 18 | 23 => {
                    // hstem, vstem, hstemhm, vstemhm
                    self.take_width(true);
                    self.n_stems += self.stack.len() as u32 / 2;
                    self.stack.clear();
                }
                19 | 20 => {
                    // hintmask, cntrmask
                    self.take_width(true);
                    self.n_stems += self.stack.len() as u32 / 2;
                    self.stack.clear();
                    i += ((self.n_stems + 7) / 8) as usize;
                }
                21 => {
                    // rmoveto
                    self.take_width(false);
                    let dy = self.stack.pop().unwrap_or(0.0);
                    let dx = self.stack.pop().unwrap_or(0.0);
                    self.moveto(dx, dy);
                    self.stack.clear();
                }
                22 => {
                    // hmoveto
                    self.take_width(true);
                    let dx = self.stack.pop().unwrap_or(0.0);
                    self.moveto(dx, 0.0);
                    self.stack.clear();
                }
                4 => {
                    // vmoveto
                    self.take_width(true);
                    let dy = self.stack.pop().unwrap_or(0.0);
                    self.moveto(0.0, dy);
                    self.stack.clear();
                }
                5 => {
                    // rlineto
                    let args = std::mem::take(&mut self.stack);
                    for pair in args.chunks(2) {
                        if let [dx, dy] = pair {
                            self.lineto(*dx, *dy);
                        }
                    }
                }
                6 => {
                    // hlineto: alternating horizontal/vertical
                    let args = std::mem::take(&mut self.stack);
                    for (idx, v) in args.into_iter().enumerate() {
                        if idx % 2 == 0 {
                            self.lineto(v, 0.0);
                        } else {
                            self.lineto(0.0, v);
                        }
                    }
                }
                7 => {
                    // vlineto: alternating vertical/horizontal
                    let args = std::mem::take(&mut self.stack);
                    for (idx, v) in args.into_iter().enumerate() {
                        if idx % 2 == 0 {
                            self.lineto(0.0, v);
                        } else {
                            self.lineto(v, 0.0);
                        }
                    }
                }
                8 => {
                    // rrcurveto
                    let args = std::mem::take(&mut self.stack);
                    for six in args.chunks(6) {
                        if let [a, b, c, d, e, f] = six {
                            self.curveto(*a, *b, *c, *d, *e, *f);
                        }
                    }
                }
                24 => {
                    // rcurveline: rrcurveto* then one rlineto
                    let mut args = std::mem::take(&mut self.stack);
                    let line = args.split_off(args.len() - 2);
                    for six in args.chunks(6) {
                        if let [a, b, c, d, e, f] = six {
                            self.curveto(*a, *b, *c, *d, *e, *f);
                        }
                    }
                    self.lineto(line[0], line[1]);
                }
                25 => {
                    // rlinecurve: rlineto* then one rrcurveto
                    let mut args = std::mem::take(&mut self.stack);
                    let curve = args.split_off(args.len() - 6);
                    for pair in args.chunks(2) {
                        if let [dx, dy] = pair {
                            self.lineto(*dx, *dy);
                        }
                    }
                    self.curveto(curve[0], curve[1], curve[2], curve[3], curve[4], curve[5]);
                }
                26 => {
                    // vvcurveto: [dx1] {dya dxb dyb dyc}+
                    let mut args = std::mem::take(&mut self.stack);
                    let mut dx1 = 0.0;
                    if args.len() % 4 == 1 {
                        dx1 = args.remove(0);
                    }
                    for group in args.chunks(4) {
                        if let [dya, dxb, dyb, dyc] = group {
                            self.curveto(dx1, *dya, *dxb, *dyb, 0.0, *dyc);
                            dx1 = 0.0;
                        }
                    }
                }
                27 => {
                    // hhcurveto: [dy1] {dxa dxb dyb dxc}+
                    let mut args = std::mem::take(&mut self.stack);
                    let mut dy1 = 0.0;
                    if args.len() % 4 == 1 {
                        dy1 = args.remove(0);
                    }
                    for group in args.chunks(4) {
                        if let [dxa, dxb, dyb, dxc] = group {
                            self.curveto(*dxa, dy1, *dxb, *dyb, *dxc, 0.0);
                            dy1 = 0.0;
                        }
                    }
                }
                30 | 31 => {
                    // vhcurveto / hvcurveto: alternating curve orientation.
                    // A trailing fifth operand on the final group of 4
                    // supplies the otherwise-implicit-zero component of the
                    // curve's end tangent.
                    let args = std::mem::take(&mut self.stack);
                    let mut start_horizontal = b0 == 31;
                    let n = args.len();
                    let mut idx = 0;
                    while idx + 4 <= n {
                        let is_final_group = idx + 4 == n - (n % 4);
                        let extra = if is_final_group && n % 4 == 1 { args[n - 1] } else { 0.0 };
                        if start_horizontal {
                            let (dx1, dx2, dy2, dy3) = (args[idx], args[idx + 1], args[idx + 2], args[idx + 3]);
                            self.curveto(dx1, 0.0, dx2, dy2, extra, dy3);
                        } else {
                            let (dy1, dx2, dy2, dx3) = (args[idx], args[idx + 1], args[idx + 2], args[idx + 3]);
                            self.curveto(0.0, dy1, dx2, dy2, dx3, extra);
                        }
                        start_horizontal = !start_horizontal;
                        idx += 4;
                    }
                }
                10 => {
                    // callsubr
                    if let Some(idx) = self.stack.pop() {
                        let real = idx as i32 + self.lbias;
                        if let Some(sub) = self.lsubrs.get(real as usize).cloned() {
                            self.run(&sub, depth + 1)?;
                        }
                    }
                }
                29 => {
                    // callgsubr
                    if let Some(idx) = self.stack.pop() {
                        let real = idx as i32 + self.gbias;
                        if let Some(sub) = self.gsubrs.get(real as usize).cloned() {
                            self.run(&sub, depth + 1)?;
                        }
                    }
                }
                11 => return Ok(()), // return
                14 => {
                    // endchar (accent composition via the deprecated seac-like 4-arg form is not supported)
                    self.take_width(true);
                    self.finish_contour();
                    return Ok(());
                }
                12 => {
                    let b1 = code.get(i).copied().unwrap_or(0);
                    i += 1;
                    self.escape_op(b1)?;
                }
                _ => return Err(FontError::UnsupportedCharstringOperator(b0).into()),
            }
        }
        Ok(())
    }

    fn escape_op(&mut self, op: u8) -> Result<()> {
        match op {
            35 => {
                // flex
                let a = std::mem::take(&mut self.stack);
                if a.len() >= 13 {
                    self.curveto(a[0], a[1], a[2], a[3], a[4], a[5]);
                    self.curveto(a[6], a[7], a[8], a[9], a[10], a[11]);
                }
            }
            34 => {
                // hflex
                let a = std::mem::take(&mut self.stack);
                if a.len() >= 7 {
                    let y0 = self.y;
                    self.curveto(a[0], 0.0, a[1], a[2], a[3], 0.0);
                    let dy3 = y0 - self.y;
                    self.curveto(a[4], 0.0, a[5], dy3, a[6], 0.0);
                }
            }
            36 => {
                // hflex1
                let a = std::mem::take(&mut self.stack);
                if a.len() >= 9 {
                    let y0 = self.y;
                    self.curveto(a[0], a[1], a[2], a[3], a[4], 0.0);
                    let dy3 = y0 - self.y;
                    self.curveto(a[5], 0.0, a[6], a[7], a[8], dy3);
                }
            }
            37 => {
                // flex1
                let a = std::mem::take(&mut self.stack);
                if a.len() >= 11 {
                    let (x0, y0) = (self.x, self.y);
                    self.curveto(a[0], a[1], a[2], a[3], a[4], a[5]);
                    let dx_sum: f64 = [a[0], a[2], a[4], a[6], a[8]].iter().sum();
                    let dy_sum: f64 = [a[1], a[3], a[5], a[7], a[9]].iter().sum();
                    if dx_sum.abs() > dy_sum.abs() {
                        let dx6 = a[10];
                        let dy6 = y0 - (self.y + a[7] + a[9]);
                        self.curveto(a[6], a[7], a[8], a[9], dx6, dy6);
                    } else {
                        let dy6 = a[10];
                        let dx6 = x0 - (self.x + a[6] + a[8]);
                        self.curveto(a[6], a[7], a[8], a[9], dx6, dy6);
                    }
                }
            }
            _ => return Err(FontError::UnsupportedCharstringOperator(op).into()),
        }
        Ok(())
    }
}

/// Decode one Type 2 charstring numeric operand starting at `code[0]`,
/// returning its value and the number of bytes it consumed.
fn decode_number(code: &[u8]) -> (f64, usize) {
    let b0 = code[0];
    if b0 == 28 {
        let v = i16::from_be_bytes([code[1], code[2]]) as f64;
        (v, 3)
    } else if (32..=246).contains(&b0) {
        (b0 as f64 - 139.0, 1)
    } else if (247..=250).contains(&b0) {
        (((b0 as f64 - 247.0) * 256.0) + code[1] as f64 + 108.0, 2)
    } else if (251..=254).contains(&b0) {
        (-((b0 as f64 - 251.0) * 256.0) - code[1] as f64 - 108.0, 2)
    } else {
        // b0 == 255: Type 2 fixed 16.16
        let v = i32::from_be_bytes([code[1], code[2], code[3], code[4]]) as f64 / 65536.0;
        (v, 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dict_parses_small_integer_operand() {
        // operand 100 (encoded as b0=239 => 239-139=100), operator 17 (CharStrings)
        let dict = parse_dict(&[239, 17]);
        assert_eq!(dict.get(&Operator::Plain(17)), Some(&vec![100.0]));
    }

    #[test]
    fn decode_number_handles_single_byte_range() {
        assert_eq!(decode_number(&[139]), (0.0, 1));
        assert_eq!(decode_number(&[140]), (1.0, 1));
    }

    #[test]
    fn simple_rmoveto_lineto_closes_a_contour() {
        // 10 20 rmoveto(21), 5 0 rlineto(5), endchar(14)
        let code: Vec<u8> = vec![
            10 + 139,
            20 + 139,
            21,
            5 + 139,
            139,
            5,
            14,
        ];
        let mut interp = Interpreter::new(&[], &[]);
        interp.run(&code, 0).unwrap();
        assert!(!interp.commands.is_empty());
    }
}
