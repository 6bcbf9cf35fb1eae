use super::*;
use crate::foundation::core::Rgba8;

fn small() -> Canvas {
    Canvas {
        width: 64,
        height: 96,
    }
}

#[test]
fn short_text_stays_on_one_line() {
    assert_eq!(wrap_lines("cat", 140.0, 960.0), vec!["cat"]);
}

#[test]
fn long_text_wraps_on_word_boundaries() {
    // ~6px glyphs in a 63px line: 10 chars per line.
    let lines = wrap_lines("alpha beta gamma delta", 10.0, 63.0);
    assert_eq!(lines, vec!["alpha beta", "gamma", "delta"]);
}

#[test]
fn oversized_word_keeps_its_own_line() {
    let lines = wrap_lines("a supercalifragilistic b", 10.0, 63.0);
    assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
}

#[test]
fn blank_text_is_one_empty_line() {
    assert_eq!(wrap_lines("   ", 140.0, 960.0), vec![String::new()]);
}

#[test]
fn svg_escapes_markup_in_text() {
    let svg = card_svg(
        small(),
        &CardStyle::default(),
        CardKind::Word(0),
        "<b>&\"'",
    );
    assert!(svg.contains("&lt;b&gt;&amp;&quot;&apos;"));
    assert!(!svg.contains("<b>"));
}

#[test]
fn svg_uses_countdown_font_size_for_numbers() {
    let style = CardStyle::default();
    let svg = card_svg(small(), &style, CardKind::Countdown(5), "5");
    assert!(svg.contains(r#"font-size="180""#));
    let svg = card_svg(small(), &style, CardKind::Outro, "bye");
    assert!(svg.contains(r#"font-size="140""#));
}

#[test]
fn huge_margin_puts_each_word_on_its_own_line() {
    let style = CardStyle {
        margin_px: u32::MAX,
        ..CardStyle::default()
    };
    let svg = card_svg(small(), &style, CardKind::Word(0), "two words");
    assert_eq!(svg.matches("<tspan").count(), 2);
}

#[test]
fn raster_has_canvas_size_and_background() {
    let style = CardStyle {
        background: Rgba8::opaque(16, 32, 48),
        font_size: 12.0,
        countdown_font_size: 12.0,
        margin_px: 4,
        ..CardStyle::default()
    };
    let raster = CardRasterizer::new(small(), style).unwrap();
    let frame = raster.rasterize(CardKind::Word(0), "hi").unwrap();

    assert_eq!((frame.width, frame.height), (64, 96));
    assert_eq!(frame.data.len(), 64 * 96 * 4);
    assert!(frame.premultiplied);
    assert_eq!(frame.pixel(0, 0), Some([16, 32, 48, 255]));
    assert_eq!(frame.pixel(63, 95), Some([16, 32, 48, 255]));
    assert_eq!(frame.pixel(64, 0), None);
}

#[test]
fn text_is_drawn_when_fonts_exist() {
    let style = CardStyle {
        font_size: 40.0,
        margin_px: 0,
        ..CardStyle::default()
    };
    let raster = CardRasterizer::new(small(), style).unwrap();
    if raster.font_faces() == 0 {
        eprintln!("skipping: no fonts installed");
        return;
    }
    let frame = raster.rasterize(CardKind::Countdown(8), "8").unwrap();
    let lit = frame
        .data
        .chunks_exact(4)
        .filter(|px| px[0] > 128)
        .count();
    assert!(lit > 0, "expected white glyph pixels on black");
}

#[test]
fn zero_canvas_is_rejected() {
    let err = CardRasterizer::new(
        Canvas {
            width: 0,
            height: 10,
        },
        CardStyle::default(),
    )
    .err()
    .unwrap();
    assert!(err.is_validation());
}
