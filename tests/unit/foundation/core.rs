use super::*;

#[test]
fn frame_range_rejects_inverted_bounds() {
    assert!(FrameRange::new(FrameIndex(3), FrameIndex(2)).is_err());
    let r = FrameRange::new(FrameIndex(2), FrameIndex(5)).unwrap();
    assert_eq!(r.len_frames(), 3);
    assert!(r.contains(FrameIndex(4)));
    assert!(!r.contains(FrameIndex(5)));
}

#[test]
fn fps_rejects_zero_parts() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
}

#[test]
fn secs_to_frames_round_absorbs_float_noise() {
    let fps = Fps::REEL;
    assert_eq!(fps.secs_to_frames_round(0.8), 24);
    assert_eq!(fps.secs_to_frames_round(0.8 + 0.8), 48);
    assert_eq!(fps.secs_to_frames_round(0.8 + 0.8 + 1.0), 78);
    assert_eq!(fps.secs_to_frames_round(-1.0), 0);
}

#[test]
fn secs_to_frames_ceil_covers_partial_frames() {
    let fps = Fps::REEL;
    assert_eq!(fps.secs_to_frames_ceil(0.51), 16);
    assert_eq!(fps.secs_to_frames_ceil(0.5), 15);
    assert_eq!(fps.secs_to_frames_ceil(0.1 + 0.2), 9);
    assert_eq!(fps.secs_to_frames_ceil(0.0), 0);
}

#[test]
fn canvas_requires_even_non_zero_dims() {
    assert!(Canvas::PORTRAIT_1080.validate().is_ok());
    assert!(
        Canvas {
            width: 0,
            height: 10
        }
        .validate()
        .is_err()
    );
    assert!(
        Canvas {
            width: 11,
            height: 10
        }
        .validate()
        .is_err()
    );
}

#[test]
fn hex_colors_parse_with_and_without_alpha() {
    assert_eq!(Rgba8::parse_hex("#ffffff").unwrap(), Rgba8::WHITE);
    assert_eq!(
        Rgba8::parse_hex("10203080").unwrap(),
        Rgba8 {
            r: 0x10,
            g: 0x20,
            b: 0x30,
            a: 0x80
        }
    );
    assert!(Rgba8::parse_hex("#fff").is_err());
    assert!(Rgba8::parse_hex("#gggggg").is_err());
}

#[test]
fn rgba8_serde_uses_hex_strings() {
    let c: Rgba8 = serde_json::from_str("\"#FF8000\"").unwrap();
    assert_eq!(c, Rgba8::opaque(255, 128, 0));
    assert_eq!(serde_json::to_string(&c).unwrap(), "\"#ff8000\"");

    let translucent = Rgba8 { a: 0x40, ..c };
    assert_eq!(
        serde_json::to_string(&translucent).unwrap(),
        "\"#ff800040\""
    );
}
