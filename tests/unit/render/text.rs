use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

const GREY: Rgb8 = Rgb8::new(128, 128, 128);

fn bitmap_stamper() -> TextStamper {
    TextStamper::new(
        FontRequest::Named("no-such-font-anywhere".to_owned()),
        FontResolver::with_dirs_only(Vec::new()),
    )
}

fn outline_stamper() -> TextStamper {
    let bytes = include_bytes!("../../data/fonts/DejaVuSans.ttf");
    TextStamper::new(
        FontRequest::Bytes(Arc::new(bytes.to_vec())),
        FontResolver::with_dirs_only(Vec::new()),
    )
}

fn hi_overlay() -> OverlaySpec {
    OverlaySpec::new("HI", Rgb8::from_hex("#FFFFFF").unwrap(), 60).unwrap()
}

#[test]
fn stroke_width_has_floor_of_two() {
    assert_eq!(stroke_width(20), 2);
    assert_eq!(stroke_width(44), 2);
    assert_eq!(stroke_width(60), 4);
    assert_eq!(stroke_width(200), 13);
}

#[test]
fn overlay_rejects_zero_size() {
    assert!(OverlaySpec::new("x", Rgb8::WHITE, 0).is_err());
}

#[test]
fn absent_or_empty_overlay_is_identity() {
    let mut stamper = bitmap_stamper();
    let frame = FrameRGB::filled(50, 40, GREY);

    let out = stamper.stamp(frame.clone(), None);
    assert_eq!(out, frame);

    let empty = OverlaySpec::new("", Rgb8::WHITE, 30).unwrap();
    let out = stamper.stamp(frame.clone(), Some(&empty));
    assert_eq!(out, frame);
}

#[test]
fn hi_at_size_60_uses_81_outline_offsets() {
    let mut stamper = bitmap_stamper();
    let prepared = stamper.prepare(Some(&hi_overlay())).unwrap();
    assert_eq!(prepared.stroke_px(), 4);
    let offsets: Vec<_> = prepared.outline_offsets().collect();
    assert_eq!(offsets.len(), 81);
    assert_eq!(offsets[0], (-4, -4));
    assert_eq!(offsets[80], (4, 4));
}

#[test]
fn placement_centers_horizontally_and_anchors_bottom() {
    let mut stamper = bitmap_stamper();
    let prepared = stamper.prepare(Some(&hi_overlay())).unwrap();
    assert_eq!(prepared.font(), &FontKind::Bitmap);
    // Bitmap font at size 60 scales by 7. The ink of "HI" runs from the left stem of 'H' to
    // the right serif of 'I' (columns 0..=9 of the cell grid) and spans all 7 rows.
    assert_eq!(prepared.text_size(), (70, 49));
    let canvas = Canvas {
        width: 300,
        height: 300,
    };
    assert_eq!(prepared.placement(canvas), (115, 211));
}

#[test]
fn outline_surrounds_fill_by_stroke_width() {
    let mut stamper = bitmap_stamper();
    let out = stamper.stamp(FrameRGB::filled(300, 300, GREY), Some(&hi_overlay()));
    let (tx, ty) = (115u32, 211u32);

    // Left column of 'H' is solid.
    assert_eq!(out.pixel(tx, ty + 10), Some(Rgb8::WHITE));
    // Outline reaches exactly `stroke` pixels out.
    assert_eq!(out.pixel(tx - 4, ty + 10), Some(Rgb8::BLACK));
    assert_eq!(out.pixel(tx - 5, ty + 10), Some(GREY));
    assert_eq!(out.pixel(tx, ty - 4), Some(Rgb8::BLACK));
    assert_eq!(out.pixel(tx, ty - 5), Some(GREY));
    // Far away from the caption nothing changes.
    assert_eq!(out.pixel(5, 5), Some(GREY));
}

#[test]
fn stamping_is_deterministic() {
    let mut a = bitmap_stamper();
    let mut b = bitmap_stamper();
    let frame = FrameRGB::filled(200, 120, GREY);
    let overlay = OverlaySpec::new("Hello, GIF!", Rgb8::new(255, 200, 0), 24).unwrap();

    let first = a.stamp(frame.clone(), Some(&overlay));
    let second = a.stamp(frame.clone(), Some(&overlay));
    let third = b.stamp(frame.clone(), Some(&overlay));
    assert_eq!(first, second);
    assert_eq!(first, third);
    assert_ne!(first, frame);
}

#[test]
fn fallback_hook_fires_once_per_stamper() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let hook: FontFallbackHook = Arc::new(move |err: &FontLoadError| {
        assert_eq!(err.requested, "no-such-font-anywhere");
        seen.fetch_add(1, Ordering::SeqCst);
    });
    let mut stamper = bitmap_stamper().with_fallback_hook(hook);

    for text in ["a", "b", "c"] {
        let overlay = OverlaySpec::new(text, Rgb8::WHITE, 20).unwrap();
        let _ = stamper.stamp(FrameRGB::filled(40, 80, GREY), Some(&overlay));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn unparsable_font_bytes_fall_back() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let mut stamper = TextStamper::new(
        FontRequest::Bytes(Arc::new(b"not a font".to_vec())),
        FontResolver::with_dirs_only(Vec::new()),
    )
    .with_fallback_hook(Arc::new(move |_err: &FontLoadError| {
        seen.fetch_add(1, Ordering::SeqCst);
    }));

    let prepared = stamper.prepare(Some(&hi_overlay())).unwrap();
    assert_eq!(prepared.font(), &FontKind::Bitmap);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn prepared_overlay_is_cached_per_spec() {
    let mut stamper = bitmap_stamper();
    let a = stamper.prepare(Some(&hi_overlay())).unwrap();
    let b = stamper.prepare(Some(&hi_overlay())).unwrap();
    assert!(Arc::ptr_eq(&a.mask, &b.mask));

    let other = OverlaySpec::new("HI", Rgb8::new(255, 0, 0), 60).unwrap();
    let c = stamper.prepare(Some(&other)).unwrap();
    assert!(!Arc::ptr_eq(&a.mask, &c.mask));
    assert_eq!(a.mask(), c.mask());
}

#[test]
fn oversized_caption_is_clipped_not_fatal() {
    let mut stamper = bitmap_stamper();
    let overlay = OverlaySpec::new("a very long caption for a tiny frame", Rgb8::WHITE, 200)
        .unwrap();
    let out = stamper.stamp(FrameRGB::filled(16, 16, GREY), Some(&overlay));
    assert_eq!((out.width, out.height), (16, 16));
}

#[test]
fn custom_margin_moves_text() {
    let mut stamper = bitmap_stamper().with_bottom_margin(0);
    let prepared = stamper.prepare(Some(&hi_overlay())).unwrap();
    let canvas = Canvas {
        width: 300,
        height: 300,
    };
    assert_eq!(prepared.placement(canvas), (115, 251));
}

#[test]
fn bundled_outline_font_is_used() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let mut stamper = outline_stamper().with_fallback_hook(Arc::new(move |_err: &FontLoadError| {
        seen.fetch_add(1, Ordering::SeqCst);
    }));
    let prepared = stamper.prepare(Some(&hi_overlay())).unwrap();

    assert_eq!(prepared.font(), &FontKind::Outline("DejaVu Sans".to_owned()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(prepared.stroke_px(), 4);
    assert_eq!(prepared.outline_offsets().count(), 81);
}

#[test]
fn outline_caption_ink_sits_on_the_bottom_margin() {
    let mut stamper = outline_stamper();
    let prepared = stamper.prepare(Some(&hi_overlay())).unwrap();
    let (tw, th) = prepared.text_size();
    let mask = prepared.mask();
    assert_eq!((mask.width, mask.height), (tw, th));
    // Cap height of DejaVu Sans at 60px is about 44px; "HI" has no descenders.
    assert!((38..=48).contains(&th), "ink height {th}");
    assert!((40..=80).contains(&tw), "ink width {tw}");

    // Every edge row and column of the box carries ink.
    assert!((0..tw).any(|x| mask.get(x, 0) > 0));
    assert!((0..tw).any(|x| mask.get(x, th - 1) > 0));
    assert!((0..th).any(|y| mask.get(0, y) > 0));
    assert!((0..th).any(|y| mask.get(tw - 1, y) > 0));

    let canvas = Canvas {
        width: 300,
        height: 300,
    };
    let (tx, ty) = prepared.placement(canvas);
    assert_eq!(tx, i64::from((300 - tw) / 2));
    assert_eq!(ty + i64::from(th), 300 - 40);
}

#[test]
fn outline_caption_is_filled_and_stroked_within_bounds() {
    let mut stamper = outline_stamper();
    let prepared = stamper.prepare(Some(&hi_overlay())).unwrap();
    let (tw, th) = prepared.text_size();
    let (tx, ty) = prepared.placement(Canvas {
        width: 300,
        height: 300,
    });
    let (tx, ty) = (tx as u32, ty as u32);
    let out = prepared.apply(FrameRGB::filled(300, 300, GREY));

    let pixels: Vec<(u32, u32, Rgb8)> = (0..300)
        .flat_map(|y| (0..300).map(move |x| (x, y)))
        .map(|(x, y)| (x, y, out.pixel(x, y).unwrap()))
        .collect();
    assert!(pixels.iter().any(|&(_, _, p)| p == Rgb8::WHITE));
    assert!(pixels.iter().any(|&(_, _, p)| p == Rgb8::BLACK));

    // Nothing reaches past the ink box grown by the stroke width.
    for &(x, y, p) in &pixels {
        let inside = x + 4 >= tx && x <= tx + tw - 1 + 4 && y + 4 >= ty && y <= ty + th - 1 + 4;
        if !inside {
            assert_eq!(p, GREY, "({x}, {y}) changed outside the outlined box");
        }
    }
    // The lowest ink row is touched.
    let bottom = ty + th - 1;
    assert_eq!(bottom, 259);
    assert!((tx..tx + tw).any(|x| out.pixel(x, bottom) != Some(GREY)));
    assert!((0..300).all(|x| out.pixel(x, 264) == Some(GREY)));
}
