//! Range-maximum index and the greedy line-breaking layout engine, spec
//! §4.4 "Paragraph layout". The RMQ structure is ported directly from
//! `flat/misc.py`'s `rmq` (a Bender/Farach-Colton sparse table).

use super::{Paragraph, Style, Text};

/// A sparse-table range-maximum-query index over `f64` values, queried on
/// half-open ranges `[i, j)` in O(1) after an O(n log n) build.
#[derive(Debug, Clone)]
pub struct RangeMax {
    table: Vec<Vec<f64>>,
}

impl RangeMax {
    pub fn new(sequence: &[f64]) -> Self {
        let mut table = vec![sequence.to_vec()];
        let mut length = sequence.len();
        let mut seq = sequence.to_vec();
        let bit_length = if length == 0 {
            0
        } else {
            (usize::BITS - length.leading_zeros()) as usize
        };
        for j in 0..bit_length.saturating_sub(1) {
            let size = 1usize << j;
            length -= size;
            let mut row = seq[..length].to_vec();
            for i in 0..row.len() {
                if row[i] < seq[i + size] {
                    row[i] = seq[i + size];
                }
            }
            table.push(row.clone());
            seq = row;
        }
        RangeMax { table }
    }

    /// Maximum value over the half-open range `[i, j)`.
    pub fn max(&self, i: usize, j: usize) -> f64 {
        let span = j - i;
        let k = (usize::BITS - 1 - span.leading_zeros()) as usize;
        let row = &self.table[k];
        row[i].max(row[j - (1 << k)])
    }
}

/// One committed line: its baseline advance (`height`), the position of its
/// first character, and the position immediately after its last.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub height: f64,
    pub start: (usize, usize, usize),
    pub end: (usize, usize, usize),
}

/// The result of laying a [`Text`] out into a fixed-width, fixed-height
/// frame: the committed lines and the start/end cursor positions.
#[derive(Debug, Clone)]
pub struct Layout {
    pub lines: Vec<Line>,
    pub start: (usize, usize, usize),
    pub end: (usize, usize, usize),
}

struct Word {
    /// Advance of the word's glyphs, excluding any trailing space run.
    advance: f64,
    /// Advance of the ASCII-whitespace run immediately following the word.
    space_advance: f64,
    /// Character count of word + trailing space run.
    length: usize,
}

/// Scan one span's text into `(word_advance, trailing_space_advance,
/// length)` tuples. A "word" is a maximal run of non-space, non-hyphen
/// characters optionally followed by a single hyphen; the space run is
/// ASCII whitespace (spec §4.4 "Word scanning").
fn scan_words(span: &super::Span) -> Vec<Word> {
    let chars: Vec<char> = span.text.chars().collect();
    if chars.is_empty() {
        // An empty span still occupies one line (a blank paragraph still
        // renders), mirroring the zero-length match `flat/text.py`'s
        // `boundaries` regex produces against an empty string.
        return vec![Word { advance: 0.0, space_advance: 0.0, length: 0 }];
    }
    let mut words = Vec::new();
    let mut i = 0;
    let scale = span.style.size / span.style.font.units_per_em() as f64;
    let mut prev_glyph = 0u16;

    while i < chars.len() {
        if chars[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let word_start = i;
        let mut advance = 0.0;
        while i < chars.len() && !chars[i].is_ascii_whitespace() && chars[i] != '-' {
            advance += glyph_advance(span, chars[i], &mut prev_glyph) * scale;
            i += 1;
        }
        if i < chars.len() && chars[i] == '-' {
            advance += glyph_advance(span, '-', &mut prev_glyph) * scale;
            i += 1;
        }
        let mut space_advance = 0.0;
        while i < chars.len() && chars[i].is_ascii_whitespace() {
            space_advance += glyph_advance(span, chars[i], &mut prev_glyph) * scale;
            i += 1;
        }
        words.push(Word {
            advance,
            space_advance,
            length: i - word_start,
        });
    }
    words
}

fn glyph_advance(span: &super::Span, ch: char, prev_glyph: &mut u16) -> f64 {
    let font = &span.style.font;
    let glyph = font.glyph_index(ch as u32);
    let kern = font.kerning(*prev_glyph, glyph) as f64;
    let advance = font.advance_width(glyph).unwrap_or(0) as f64;
    *prev_glyph = glyph;
    advance + kern
}

/// Greedily break `text` into lines that fit `width`, stopping once the
/// frame's `height` would be exceeded. `start` is the `(paragraph, span,
/// char_offset)` cursor to resume from — used by chained blocks. A span's
/// word list is always rescanned from its own beginning; `start`'s
/// char_offset only matters for the first span visited, where leading
/// words already consumed by an earlier block in the chain are skipped.
pub fn run(text: &Text, width: f64, height: f64, start: (usize, usize, usize)) -> Layout {
    let mut lines = Vec::new();
    let mut y = 0.0;
    let (start_p, start_s, start_c) = start;
    let mut first_line_of_block = true;
    let mut line_begin = start;

    'paragraphs: for p in start_p..text.paragraphs.len() {
        let paragraph = &text.paragraphs[p];
        let mut line_width = 0.0;
        let mut line_has_content = false;
        let mut line_start_span = if p == start_p { start_s } else { 0 };

        for s in line_start_span..paragraph.spans.len() {
            let span = &paragraph.spans[s];
            let words = scan_words(span);
            let mut consumed_chars = 0usize;
            let resume_at = if p == start_p && s == start_s { start_c } else { 0 };

            for word in words {
                if consumed_chars < resume_at {
                    consumed_chars += word.length;
                    continue;
                }
                if line_has_content && line_width + word.advance > width {
                    let line_height = line_height_for(paragraph, line_start_span, s, first_line_of_block);
                    if y + line_height > height {
                        break 'paragraphs;
                    }
                    lines.push(Line {
                        height: line_height,
                        start: line_begin,
                        end: (p, s, consumed_chars),
                    });
                    y += line_height;
                    first_line_of_block = false;
                    line_width = 0.0;
                    line_has_content = false;
                    line_start_span = s;
                }
                if !line_has_content && word.advance > width {
                    // a single word alone exceeds the width: overflow
                    break 'paragraphs;
                }
                if !line_has_content {
                    line_begin = (p, s, consumed_chars);
                }
                line_width += word.advance + word.space_advance;
                line_has_content = true;
                consumed_chars += word.length;
            }
        }
        if line_has_content {
            let last_span = paragraph.spans.len() - 1;
            let line_height = line_height_for(paragraph, line_start_span, last_span, first_line_of_block);
            if y + line_height > height {
                break 'paragraphs;
            }
            lines.push(Line {
                height: line_height,
                start: line_begin,
                end: (p, last_span, paragraph.spans[last_span].text.chars().count()),
            });
            y += line_height;
            first_line_of_block = false;
        }
    }

    let end = lines.last().map(|l| l.end).unwrap_or(start);
    Layout { lines, start, end }
}

/// Re-slice `text` along this layout's committed line boundaries, grouping
/// consecutive spans within a line into `(style, substring)` runs. Mirrors
/// `flat/text.py`'s `layout.runs`, used to drive the PDF/SVG/raster text
/// writers one line at a time.
pub fn runs(layout: &Layout, text: &Text) -> Vec<(f64, Vec<(Style, String)>)> {
    layout
        .lines
        .iter()
        .map(|line| {
            let (p, begin_s, begin_c) = line.start;
            let (_, end_s, end_c) = line.end;
            let paragraph = &text.paragraphs[p];
            let mut run = Vec::new();
            for s in begin_s..=end_s {
                let span = &paragraph.spans[s];
                let chars: Vec<char> = span.text.chars().collect();
                let from = if s == begin_s { begin_c } else { 0 };
                let to = if s == end_s { end_c } else { chars.len() };
                if from < to {
                    let piece: String = chars[from..to].iter().collect();
                    run.push((span.style.clone(), piece));
                }
            }
            (line.height, run)
        })
        .collect()
}

fn line_height_for(paragraph: &Paragraph, from_span: usize, to_span: usize, first_line_of_block: bool) -> f64 {
    let from = from_span.min(paragraph.spans.len() - 1);
    let to = (to_span + 1).clamp(from + 1, paragraph.spans.len());
    if first_line_of_block {
        paragraph.ascenders.max(from, to)
    } else {
        paragraph.leadings.max(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_max_finds_maximum_over_half_open_range() {
        let rmq = RangeMax::new(&[3.0, 7.0, 1.0, 9.0, 4.0]);
        assert_eq!(rmq.max(0, 5), 9.0);
        assert_eq!(rmq.max(0, 2), 7.0);
        assert_eq!(rmq.max(2, 4), 9.0);
    }

    #[test]
    fn range_max_single_element_range() {
        let rmq = RangeMax::new(&[5.0, 2.0, 8.0]);
        assert_eq!(rmq.max(1, 2), 2.0);
    }
}
