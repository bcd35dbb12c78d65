use crate::assets::source::{SourceData, SourceImage};
use crate::foundation::error::{FrameGifError, FrameGifResult};
use crate::foundation::math::mul_div255_u8;

/// Decode one source into an opaque RGB buffer.
///
/// Alpha is flattened over opaque black, so a half-transparent white pixel becomes mid grey.
/// `index` is only used to name the source in a [`FrameGifError::Decode`].
pub fn decode_source(index: usize, source: &SourceImage) -> FrameGifResult<image::RgbImage> {
    let rgba = match &source.data {
        SourceData::Encoded(bytes) => image::load_from_memory(bytes)
            .map_err(|e| FrameGifError::decode(index, &source.label, e))?
            .to_rgba8(),
        SourceData::Rgba8 {
            width,
            height,
            pixels,
        } => image::RgbaImage::from_raw(*width, *height, pixels.clone()).ok_or_else(|| {
            FrameGifError::decode(
                index,
                &source.label,
                format!(
                    "rgba8 buffer has {} bytes, expected {}x{}x4",
                    pixels.len(),
                    width,
                    height
                ),
            )
        })?,
    };

    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(FrameGifError::decode(
            index,
            &source.label,
            "image has zero width or height",
        ));
    }

    Ok(flatten_over_black(&rgba))
}

fn flatten_over_black(rgba: &image::RgbaImage) -> image::RgbImage {
    let (width, height) = rgba.dimensions();
    let mut out = Vec::with_capacity((width as usize) * (height as usize) * 3);
    for px in rgba.as_raw().chunks_exact(4) {
        let a = u16::from(px[3]);
        if a == 255 {
            out.extend_from_slice(&px[..3]);
            continue;
        }
        out.push(mul_div255_u8(u16::from(px[0]), a));
        out.push(mul_div255_u8(u16::from(px[1]), a));
        out.push(mul_div255_u8(u16::from(px[2]), a));
    }
    // Length is width*height*3 by construction.
    image::RgbImage::from_raw(width, height, out).unwrap_or_else(|| image::RgbImage::new(0, 0))
}
