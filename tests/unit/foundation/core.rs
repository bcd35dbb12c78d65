use super::*;

#[test]
fn parses_hex_with_and_without_hash() {
    assert_eq!(Rgb8::from_hex("#FFFFFF").unwrap(), Rgb8::WHITE);
    assert_eq!(Rgb8::from_hex("ff0080").unwrap(), Rgb8::new(255, 0, 128));
    assert_eq!(Rgb8::from_hex("  #00aa11 ").unwrap(), Rgb8::new(0, 0xaa, 0x11));
}

#[test]
fn rejects_bad_hex() {
    assert!(Rgb8::from_hex("#fff").is_err());
    assert!(Rgb8::from_hex("#gg0000").is_err());
    assert!(Rgb8::from_hex("#ff00ff80").is_err());
    assert!(Rgb8::from_hex("").is_err());
}

#[test]
fn hex_roundtrips_through_serde() {
    let c: Rgb8 = serde_json::from_str("\"#1a2B3c\"").unwrap();
    assert_eq!(c, Rgb8::new(0x1a, 0x2b, 0x3c));
    assert_eq!(serde_json::to_string(&c).unwrap(), "\"#1A2B3C\"");
}

#[test]
fn filled_frame_has_expected_layout() {
    let f = FrameRGB::filled(3, 2, Rgb8::new(1, 2, 3));
    assert_eq!(f.data.len(), 3 * 2 * 3);
    assert_eq!(f.pixel(2, 1), Some(Rgb8::new(1, 2, 3)));
    assert_eq!(f.pixel(3, 0), None);
    assert_eq!(f.canvas(), Canvas { width: 3, height: 2 });
}

#[test]
fn image_conversion_keeps_pixels() {
    let mut img = image::RgbImage::new(2, 2);
    img.put_pixel(1, 0, image::Rgb([200, 0, 0]));
    let f = FrameRGB::from_image(img);
    assert_eq!((f.width, f.height), (2, 2));
    assert_eq!(f.pixel(1, 0), Some(Rgb8::new(200, 0, 0)));
    assert_eq!(f.pixel(0, 1), Some(Rgb8::BLACK));
}

#[test]
fn rgba_expansion_is_opaque() {
    let f = FrameRGB::filled(2, 1, Rgb8::new(9, 8, 7));
    assert_eq!(f.to_rgba8(), vec![9, 8, 7, 255, 9, 8, 7, 255]);
}
