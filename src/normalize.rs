//! Fit heterogeneous frames onto the first frame's canvas.

use rayon::prelude::*;

use crate::assets::decode::decode_source;
use crate::assets::source::SourceImage;
use crate::foundation::core::{Canvas, FrameRGB};
use crate::foundation::error::{FrameGifError, FrameGifResult};

/// Resampling filter used when a frame's size changes.
pub const RESIZE_FILTER: image::imageops::FilterType = image::imageops::FilterType::Lanczos3;

/// Where a source lands on the reference canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Resized width.
    pub width: u32,
    /// Resized height.
    pub height: u32,
    /// Left offset on the canvas.
    pub x: u32,
    /// Top offset on the canvas.
    pub y: u32,
}

/// Fit `(src_w, src_h)` inside `canvas` preserving aspect ratio, centered.
///
/// `scale = min(ref_w / src_w, ref_h / src_h)`. The constraining side takes the canvas size
/// exactly; the other is `floor(side * scale)` in integer arithmetic, clamped to `[1, ref]`.
/// Offsets are integer-truncated.
pub fn fit_inside(src_w: u32, src_h: u32, canvas: Canvas) -> Placement {
    let (sw, sh) = (u64::from(src_w.max(1)), u64::from(src_h.max(1)));
    let (cw, ch) = (u64::from(canvas.width), u64::from(canvas.height));

    // cw / sw <= ch / sh, cross-multiplied.
    let (width, height) = if cw * sh <= ch * sw {
        (cw, sh * cw / sw)
    } else {
        (sw * ch / sh, ch)
    };
    let width = (width as u32).clamp(1, canvas.width);
    let height = (height as u32).clamp(1, canvas.height);

    Placement {
        width,
        height,
        x: (canvas.width - width) / 2,
        y: (canvas.height - height) / 2,
    }
}

/// Resize and center one decoded frame on a black canvas of size `canvas`.
///
/// The composite always runs, even when the frame already matches the canvas.
pub fn fit_to_canvas(img: image::RgbImage, canvas: Canvas) -> FrameRGB {
    let (src_w, src_h) = img.dimensions();
    let p = fit_inside(src_w, src_h, canvas);

    let resized = if (p.width, p.height) == (src_w, src_h) {
        img
    } else {
        image::imageops::resize(&img, p.width, p.height, RESIZE_FILTER)
    };

    let mut out = image::RgbImage::new(canvas.width, canvas.height);
    image::imageops::replace(&mut out, &resized, i64::from(p.x), i64::from(p.y));

    tracing::debug!(
        src_w,
        src_h,
        w = p.width,
        h = p.height,
        x = p.x,
        y = p.y,
        "placed frame"
    );
    FrameRGB::from_image(out)
}

fn reference_frame(frames: &[SourceImage]) -> FrameGifResult<(Canvas, FrameRGB)> {
    let first = frames.first().ok_or(FrameGifError::EmptyBatch)?;
    let img = decode_source(0, first)?;
    let (width, height) = img.dimensions();
    let canvas = Canvas { width, height };
    Ok((canvas, fit_to_canvas(img, canvas)))
}

fn normalize_one(index: usize, source: &SourceImage, canvas: Canvas) -> FrameGifResult<FrameRGB> {
    let img = decode_source(index, source)?;
    Ok(fit_to_canvas(img, canvas))
}

/// Normalize `frames` sequentially.
///
/// Every output frame has the first frame's size. Fails with [`FrameGifError::EmptyBatch`] for
/// an empty slice and with [`FrameGifError::Decode`] on the first unreadable source.
#[tracing::instrument(skip(frames), fields(frames = frames.len()))]
pub fn normalize(frames: &[SourceImage]) -> FrameGifResult<Vec<FrameRGB>> {
    let (canvas, first) = reference_frame(frames)?;
    let mut out = Vec::with_capacity(frames.len());
    out.push(first);
    for (i, source) in frames.iter().enumerate().skip(1) {
        out.push(normalize_one(i, source, canvas)?);
    }
    tracing::debug!(width = canvas.width, height = canvas.height, "normalized batch");
    Ok(out)
}

/// Normalize `frames` with frames `1..` processed on the current rayon pool.
///
/// Output order and pixels match [`normalize`]. When several sources fail, which decode
/// error is reported is unspecified.
#[tracing::instrument(skip(frames), fields(frames = frames.len()))]
pub fn normalize_parallel(frames: &[SourceImage]) -> FrameGifResult<Vec<FrameRGB>> {
    let (canvas, first) = reference_frame(frames)?;
    let rest: Vec<FrameRGB> = frames
        .par_iter()
        .enumerate()
        .skip(1)
        .map(|(i, source)| normalize_one(i, source, canvas))
        .collect::<FrameGifResult<_>>()?;

    let mut out = Vec::with_capacity(frames.len());
    out.push(first);
    out.extend(rest);
    tracing::debug!(width = canvas.width, height = canvas.height, "normalized batch");
    Ok(out)
}

#[cfg(test)]
#[path = "../tests/unit/normalize.rs"]
mod tests;
