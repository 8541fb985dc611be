//! End-to-end scenarios driving several modules together, the way
//! `oxidize-pdf-core/tests/integration_tests.rs` exercises a document end
//! to end rather than one module in isolation.
//!
//! Text-layout scenarios that need a real embedded font (line breaking,
//! multi-page chaining, CFF glyph decoding) are not covered here: this
//! crate has no synthetic TrueType/CFF fixture builder, and none of the
//! example fonts shipped with the reference corpus were carried into this
//! workspace. They're left as `#[ignore]`d placeholders below rather than
//! silently dropped.

use flatgeist::raster::Rasterizer;
use flatgeist::{Color, Document, ImageKind, Style, Unit};

#[test]
fn circle_document_renders_to_pdf_svg_and_raster() {
    let mut doc = Document::new(100.0, 100.0, Unit::Mm);
    let page = doc.addpage();
    let circle = Style::new().nofill().stroke(Color::red()).width(2.5, Unit::Pt).circle(50.0, 50.0, 20.0);
    page.place(circle);

    let svg = page.svg().unwrap();
    assert!(svg.contains("viewBox=\"0 0 283.46"));
    assert!(svg.contains("<circle cx=\"141.732"));
    assert!(svg.contains("stroke=\"rgb(255,0,0)\""));

    let image = page.image(72.0, ImageKind::Rgb).unwrap();
    assert_eq!(image.width, 283);
    assert_eq!(image.height, 283);

    // A corner stays background (white); the ring sits at radius ~56.7pt
    // (20mm) around the 141.7pt centre, so mid-edge of that ring is not.
    let corner = pixel(&image, 2, 2);
    assert_eq!(corner, [255, 255, 255]);

    let on_ring = pixel(&image, 141, 141 - 57);
    assert_ne!(on_ring, [255, 255, 255]);

    let pdf = doc.pdf().unwrap();
    let pdf_text = String::from_utf8_lossy(&pdf);
    assert!(pdf_text.starts_with("%PDF-1.3"));
    assert!(pdf_text.contains("/MediaBox [0 0 283.46"));
    assert!(pdf_text.contains("2.5 w"));
    assert!(pdf_text.contains("%%EOF"));
}

fn pixel(image: &flatgeist::Image, x: usize, y: usize) -> [u8; 3] {
    let i = (y * image.width + x) * 3;
    let data = image.data();
    [data[i], data[i + 1], data[i + 2]]
}

#[test]
fn cubic_split_reconstructs_the_original_curve() {
    use flatgeist::geom::{evaluate, split, Point, Segment};

    let original = Segment::Cubic(Point::new(0.0, 0.0), Point::new(1.0, 2.0), Point::new(2.0, -1.0), Point::new(3.0, 0.0));
    let t0 = 0.37;
    let (left, right) = split(&original, t0);

    for i in 0..100 {
        let t = i as f64 / 99.0;
        let expected = evaluate(&original, t);
        let actual = if t <= t0 {
            evaluate(&left, t / t0)
        } else {
            evaluate(&right, (t - t0) / (1.0 - t0))
        };
        assert!((expected.x - actual.x).abs() < 1e-10, "x mismatch at t={t}");
        assert!((expected.y - actual.y).abs() < 1e-10, "y mismatch at t={t}");
    }
}

#[test]
fn cubic_chop_at_a_single_parameter_matches_split() {
    use flatgeist::geom::{chop, split, Point, Segment};

    let original = Segment::Cubic(Point::new(0.0, 0.0), Point::new(1.0, 2.0), Point::new(2.0, -1.0), Point::new(3.0, 0.0));
    let (left, right) = split(&original, 0.37);
    let chopped = chop(&original, &[0.37]);
    assert_eq!(chopped, vec![left, right]);
}

#[test]
fn full_square_fill_yields_uniform_coverage() {
    let mut r = Rasterizer::new(100, 100, ImageKind::Rgb).unwrap();
    r.moveto(0.0, 0.0);
    r.lineto(100.0, 0.0);
    r.lineto(100.0, 100.0);
    r.lineto(0.0, 100.0);
    r.closepath();

    let fill = Color::rgb(10, 20, 30);
    let components = fill.raster_components(r.kind()).unwrap();
    r.composite(&components);

    let image = r.into_image();
    let data = image.data();
    for chunk in data.chunks(3) {
        assert_eq!(chunk, [10, 20, 30]);
    }
}

// Scenarios 2, 3, and 5 need a real embedded TrueType/CFF font: text line
// breaking against a frame, chained multi-page overflow reduction, and CFF
// glyph outline decoding all depend on actual glyph metrics and outlines
// that no synthetic fixture in this workspace can stand in for.
#[test]
#[ignore = "needs a real embedded font fixture, not available in this workspace"]
fn single_line_paragraph_fits_its_frame() {
    unreachable!()
}

#[test]
#[ignore = "needs a real embedded font fixture, not available in this workspace"]
fn chaining_reduces_tail_overflow() {
    unreachable!()
}

#[test]
#[ignore = "needs a real embedded CFF font fixture, not available in this workspace"]
fn cff_glyph_flattens_to_a_single_closed_loop() {
    unreachable!()
}
