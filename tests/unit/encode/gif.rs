use std::io::Cursor;
use std::io::Write;

use image::AnimationDecoder;
use image::codecs::gif::GifDecoder;

use super::*;
use crate::foundation::core::Rgb8;

fn decode_all(bytes: &[u8]) -> Vec<image::Frame> {
    let decoder = GifDecoder::new(Cursor::new(bytes.to_vec())).unwrap();
    decoder.into_frames().collect_frames().unwrap()
}

fn close(a: u8, b: u8) -> bool {
    a.abs_diff(b) <= 8
}

#[test]
fn encodes_every_frame_with_delay() {
    let frames = vec![
        FrameRGB::filled(16, 8, Rgb8::new(255, 0, 0)),
        FrameRGB::filled(16, 8, Rgb8::new(0, 255, 0)),
        FrameRGB::filled(16, 8, Rgb8::new(0, 0, 255)),
    ];
    let bytes = encode_gif(&frames, 300).unwrap();
    assert_eq!(&bytes[..3], b"GIF");

    let decoded = decode_all(&bytes);
    assert_eq!(decoded.len(), 3);
    for f in &decoded {
        assert_eq!(f.buffer().dimensions(), (16, 8));
        let (num, den) = f.delay().numer_denom_ms();
        assert_eq!(num / den, 300);
    }
    let px = decoded[1].buffer().get_pixel(3, 3).0;
    assert!(close(px[0], 0) && close(px[1], 255) && close(px[2], 0), "{px:?}");
}

#[test]
fn infinite_loop_writes_netscape_extension() {
    let frames = vec![FrameRGB::filled(4, 4, Rgb8::WHITE); 2];
    let bytes = encode_gif(&frames, 100).unwrap();
    assert!(bytes.windows(11).any(|w| w == b"NETSCAPE2.0"));
}

#[test]
fn empty_frame_list_is_rejected() {
    assert!(matches!(encode_gif(&[], 300), Err(FrameGifError::EmptyBatch)));
}

#[test]
fn out_of_range_duration_is_rejected() {
    let frames = vec![FrameRGB::filled(4, 4, Rgb8::WHITE)];
    assert!(matches!(
        encode_gif(&frames, 20),
        Err(FrameGifError::Validation(_))
    ));
}

#[test]
fn gif_sink_is_single_use() {
    let mut bytes = Vec::new();
    let mut sink = GifSink::new(&mut bytes);
    let frames = vec![FrameRGB::filled(2, 2, Rgb8::BLACK)];
    write_frames(&mut sink, &frames, 200, LoopMode::Finite(2)).unwrap();
    assert!(write_frames(&mut sink, &frames, 200, LoopMode::Infinite).is_err());
}

#[test]
fn file_sink_creates_parent_dirs_and_respects_overwrite() {
    let dir = std::env::temp_dir().join(format!("framegif-gif-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let out = dir.join("nested/out.gif");
    let frames = vec![FrameRGB::filled(6, 6, Rgb8::WHITE); 2];

    let mut sink = GifFileSink::new(GifFileSinkOpts::new(&out));
    assert_eq!(sink.out_path(), out.as_path());
    write_frames(&mut sink, &frames, 300, LoopMode::Infinite).unwrap();
    let written = std::fs::read(&out).unwrap();
    assert_eq!(decode_all(&written).len(), 2);

    let mut no_clobber = GifFileSink::new(GifFileSinkOpts {
        out_path: out.clone(),
        overwrite: false,
    });
    assert!(matches!(
        write_frames(&mut no_clobber, &frames, 300, LoopMode::Infinite),
        Err(FrameGifError::Validation(_))
    ));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn file_sink_touches_nothing_before_begin() {
    let out = std::env::temp_dir().join(format!("framegif-untouched-{}.gif", std::process::id()));
    let _ = std::fs::remove_file(&out);
    let mut sink = GifFileSink::new(GifFileSinkOpts::new(&out));
    assert!(write_frames(&mut sink, &[], 300, LoopMode::Infinite).is_err());
    assert!(!out.exists());
}

struct FlushFails(Vec<u8>);

impl Write for FlushFails {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Err(std::io::Error::other("disk went away"))
    }
}

#[test]
fn gif_sink_reports_writer_errors_at_end() {
    let mut sink = GifSink::new(FlushFails(Vec::new()));
    let frames = vec![FrameRGB::filled(3, 3, Rgb8::WHITE)];
    let err = write_frames(&mut sink, &frames, 200, LoopMode::Infinite).unwrap_err();
    assert!(matches!(err, FrameGifError::Encode(_)), "{err:?}");
    assert!(err.to_string().contains("disk went away"));
}

#[test]
fn gif_sink_returns_completed_writer() {
    let frames = vec![FrameRGB::filled(5, 5, Rgb8::BLACK); 2];
    let mut sink = GifSink::new(Vec::new());
    write_frames(&mut sink, &frames, 150, LoopMode::Infinite).unwrap();
    let bytes = sink.into_writer().unwrap();
    assert_eq!(bytes.last(), Some(&0x3B));
    assert_eq!(bytes, encode_gif(&frames, 150).unwrap());
}

#[test]
fn file_sink_leaves_no_file_when_a_frame_is_rejected() {
    let out = std::env::temp_dir().join(format!("framegif-rejected-{}.gif", std::process::id()));
    let _ = std::fs::remove_file(&out);
    let mut sink = GifFileSink::new(GifFileSinkOpts::new(&out));
    let frames = vec![
        FrameRGB::filled(4, 4, Rgb8::WHITE),
        FrameRGB::filled(5, 4, Rgb8::WHITE),
    ];
    assert!(write_frames(&mut sink, &frames, 300, LoopMode::Infinite).is_err());
    assert!(!out.exists());
}

#[cfg(target_os = "linux")]
#[test]
fn file_sink_surfaces_write_failures() {
    let mut sink = GifFileSink::new(GifFileSinkOpts::new("/dev/full"));
    let frames = vec![FrameRGB::filled(8, 8, Rgb8::WHITE); 2];
    let err = write_frames(&mut sink, &frames, 300, LoopMode::Infinite).unwrap_err();
    assert!(matches!(err, FrameGifError::Other(_)), "{err:?}");
    assert!(format!("{err:#}").contains("/dev/full"));
}
