use crate::foundation::core::{FrameRGB, Rgb8};
use crate::foundation::math::lerp_u8;

/// 8-bit coverage mask of rendered text, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphMask {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// One coverage byte per pixel (0 = untouched, 255 = fully covered).
    pub coverage: Vec<u8>,
}

impl GlyphMask {
    /// Fully transparent mask.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            coverage: vec![0; (width as usize) * (height as usize)],
        }
    }

    /// Coverage at `(x, y)`, 0 outside the mask.
    pub fn get(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.coverage[(y as usize) * (self.width as usize) + (x as usize)]
    }

    pub(crate) fn fill_block(&mut self, x0: u32, y0: u32, w: u32, h: u32, value: u8) {
        let x1 = x0.saturating_add(w).min(self.width);
        let y1 = y0.saturating_add(h).min(self.height);
        for y in y0..y1 {
            let row = (y as usize) * (self.width as usize);
            for x in x0..x1 {
                self.coverage[row + x as usize] = value;
            }
        }
    }

    /// Build from the alpha channel of a premultiplied RGBA8 buffer.
    pub(crate) fn from_rgba_alpha(width: u32, height: u32, rgba: &[u8]) -> Self {
        Self {
            width,
            height,
            coverage: rgba.chunks_exact(4).map(|px| px[3]).collect(),
        }
    }

    /// Return `true` when no pixel is covered.
    pub fn is_blank(&self) -> bool {
        self.coverage.iter().all(|&c| c == 0)
    }

    /// Crop to the smallest box holding every covered pixel. A blank mask becomes 0x0.
    pub fn trim_to_ink(&self) -> Self {
        let w = self.width as usize;
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for (i, &c) in self.coverage.iter().enumerate() {
            if c == 0 {
                continue;
            }
            let (x, y) = (i % w, i / w);
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
        let Some((x0, y0, x1, y1)) = bounds else {
            return Self::empty(0, 0);
        };

        let (tw, th) = (x1 - x0 + 1, y1 - y0 + 1);
        let mut coverage = Vec::with_capacity(tw * th);
        for y in y0..=y1 {
            coverage.extend_from_slice(&self.coverage[y * w + x0..=y * w + x1]);
        }
        Self {
            width: tw as u32,
            height: th as u32,
            coverage,
        }
    }
}

/// Blend `color` into `frame` through `mask` placed with its top-left at `(x, y)`.
///
/// `x`/`y` may be negative or past the frame edge; the mask is clipped.
pub fn blend_mask(frame: &mut FrameRGB, mask: &GlyphMask, x: i64, y: i64, color: Rgb8) {
    let fw = i64::from(frame.width);
    let fh = i64::from(frame.height);
    let mw = i64::from(mask.width);
    let mh = i64::from(mask.height);

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + mw).min(fw);
    let y1 = (y + mh).min(fh);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let c = color.to_array();
    for fy in y0..y1 {
        let my = (fy - y) as usize;
        let mask_row = my * (mask.width as usize);
        for fx in x0..x1 {
            let mx = (fx - x) as usize;
            let a = mask.coverage[mask_row + mx];
            if a == 0 {
                continue;
            }
            let i = frame.offset(fx as u32, fy as u32);
            for (ch, &v) in c.iter().enumerate() {
                frame.data[i + ch] = lerp_u8(frame.data[i + ch], v, a);
            }
        }
    }
}
