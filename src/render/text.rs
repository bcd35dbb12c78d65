//! Caption stamping: centered text near the bottom edge with a brute-force black outline.

use std::sync::Arc;

use crate::assets::bitmap_font;
use crate::assets::fonts::{FontRequest, FontResolver};
use crate::foundation::core::{Canvas, FrameRGB, Rgb8};
use crate::foundation::error::{FontLoadError, FrameGifError, FrameGifResult};
use crate::render::mask::{GlyphMask, blend_mask};
use crate::render::outline::{OutlineFont, TextLayoutEngine};

/// Default distance between the text box bottom and the frame bottom edge.
pub const DEFAULT_BOTTOM_MARGIN_PX: u32 = 40;

/// Outline color drawn behind the fill.
pub const OUTLINE_COLOR: Rgb8 = Rgb8::BLACK;

/// Callback invoked whenever the requested outline font cannot be used.
pub type FontFallbackHook = Arc<dyn Fn(&FontLoadError) + Send + Sync>;

/// Caption to stamp on every frame.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OverlaySpec {
    /// Caption text. Empty text disables stamping.
    pub text: String,
    /// Fill color.
    pub color: Rgb8,
    /// Font size in pixels, > 0.
    pub size_px: u32,
}

impl OverlaySpec {
    /// Build a validated overlay.
    pub fn new(text: impl Into<String>, color: Rgb8, size_px: u32) -> FrameGifResult<Self> {
        let spec = Self {
            text: text.into(),
            color,
            size_px,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Reject non-positive sizes.
    pub fn validate(&self) -> FrameGifResult<()> {
        if self.size_px == 0 {
            return Err(FrameGifError::validation("overlay size_px must be > 0"));
        }
        Ok(())
    }

    /// `true` when stamping would be a no-op.
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// Outline thickness for a font size: `max(2, size / 15)`.
pub fn stroke_width(size_px: u32) -> u32 {
    (size_px / 15).max(2)
}

/// Which rasterizer produced a [`PreparedOverlay`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FontKind {
    /// Outline font with the given family name.
    Outline(String),
    /// Built-in 5x7 bitmap font.
    Bitmap,
}

/// A caption rendered once and ready to be stamped on any number of frames.
///
/// Pure data; safe to share across threads.
#[derive(Clone, Debug)]
pub struct PreparedOverlay {
    mask: Arc<GlyphMask>,
    fill: Rgb8,
    stroke_px: u32,
    bottom_margin_px: u32,
    font: FontKind,
}

impl PreparedOverlay {
    /// Ink bounding box `(tw, th)` of the rendered caption.
    pub fn text_size(&self) -> (u32, u32) {
        (self.mask.width, self.mask.height)
    }

    /// Outline thickness in pixels.
    pub fn stroke_px(&self) -> u32 {
        self.stroke_px
    }

    /// Font that rendered the caption.
    pub fn font(&self) -> &FontKind {
        &self.font
    }

    /// Coverage mask of the caption.
    pub fn mask(&self) -> &GlyphMask {
        &self.mask
    }

    /// Top-left text position `(tx, ty)` for a frame of size `canvas`.
    pub fn placement(&self, canvas: Canvas) -> (i64, i64) {
        let (tw, th) = self.text_size();
        let tx = (i64::from(canvas.width) - i64::from(tw)) / 2;
        let ty = i64::from(canvas.height) - i64::from(th) - i64::from(self.bottom_margin_px);
        (tx, ty)
    }

    /// Every outline offset `(dx, dy)` in `[-s, s]^2`, row-major.
    pub fn outline_offsets(&self) -> impl Iterator<Item = (i64, i64)> + use<> {
        let s = i64::from(self.stroke_px);
        (-s..=s).flat_map(move |dy| (-s..=s).map(move |dx| (dx, dy)))
    }

    /// Stamp the caption on `frame`.
    pub fn apply(&self, mut frame: FrameRGB) -> FrameRGB {
        let (tx, ty) = self.placement(frame.canvas());
        for (dx, dy) in self.outline_offsets() {
            blend_mask(&mut frame, &self.mask, tx + dx, ty + dy, OUTLINE_COLOR);
        }
        blend_mask(&mut frame, &self.mask, tx, ty, self.fill);
        frame
    }
}

enum ResolvedFont {
    Outline(OutlineFont),
    Bitmap,
}

/// Renders overlay captions onto frames.
///
/// The requested font is resolved once, on first use. If it cannot be loaded the stamper
/// switches to the built-in bitmap font, logs a warning and calls the fallback hook; it never
/// returns an error.
pub struct TextStamper {
    request: FontRequest,
    resolver: FontResolver,
    bottom_margin_px: u32,
    on_font_fallback: Option<FontFallbackHook>,

    engine: TextLayoutEngine,
    font: Option<ResolvedFont>,
    cache: Option<(OverlaySpec, PreparedOverlay)>,
}

impl TextStamper {
    /// Create a stamper for `request`, locating named fonts through `resolver`.
    pub fn new(request: FontRequest, resolver: FontResolver) -> Self {
        Self {
            request,
            resolver,
            bottom_margin_px: DEFAULT_BOTTOM_MARGIN_PX,
            on_font_fallback: None,
            engine: TextLayoutEngine::new(),
            font: None,
            cache: None,
        }
    }

    /// Override the bottom margin.
    pub fn with_bottom_margin(mut self, px: u32) -> Self {
        self.bottom_margin_px = px;
        self.cache = None;
        self
    }

    /// Install a diagnostic hook for font fallbacks.
    pub fn with_fallback_hook(mut self, hook: FontFallbackHook) -> Self {
        self.on_font_fallback = Some(hook);
        self
    }

    fn report_fallback(&self, err: &FontLoadError) {
        tracing::warn!(
            requested = %err.requested,
            reason = %err.reason,
            "outline font unavailable, using built-in bitmap font"
        );
        if let Some(hook) = &self.on_font_fallback {
            hook(err);
        }
    }

    fn ensure_font(&mut self) {
        if self.font.is_some() {
            return;
        }
        let resolved = match self.resolver.load(&self.request) {
            Ok(loaded) => match self.engine.register(&loaded.bytes) {
                Ok(font) => {
                    tracing::debug!(
                        origin = %loaded.origin,
                        family = font.family_name(),
                        "loaded outline font"
                    );
                    ResolvedFont::Outline(font)
                }
                Err(e) => {
                    self.report_fallback(&FontLoadError {
                        requested: self.request.describe(),
                        reason: e.to_string(),
                    });
                    ResolvedFont::Bitmap
                }
            },
            Err(e) => {
                self.report_fallback(&e);
                ResolvedFont::Bitmap
            }
        };
        self.font = Some(resolved);
    }

    /// Render `overlay` once. Returns `None` when it is absent or has empty text.
    pub fn prepare(&mut self, overlay: Option<&OverlaySpec>) -> Option<PreparedOverlay> {
        let overlay = overlay.filter(|o| !o.is_blank())?;
        if let Some((spec, prepared)) = &self.cache
            && spec == overlay
        {
            return Some(prepared.clone());
        }

        self.ensure_font();
        let outline = match &self.font {
            Some(ResolvedFont::Outline(font)) => Some(
                self.engine
                    .rasterize(&overlay.text, font, overlay.size_px)
                    .map(|mask| (mask, FontKind::Outline(font.family_name().to_owned()))),
            ),
            _ => None,
        };
        let (mask, font) = match outline {
            Some(Ok(rendered)) => rendered,
            Some(Err(e)) => {
                self.report_fallback(&FontLoadError {
                    requested: self.request.describe(),
                    reason: format!("rasterization failed: {e}"),
                });
                (
                    bitmap_font::rasterize(&overlay.text, overlay.size_px),
                    FontKind::Bitmap,
                )
            }
            None => (
                bitmap_font::rasterize(&overlay.text, overlay.size_px),
                FontKind::Bitmap,
            ),
        };

        let prepared = PreparedOverlay {
            mask: Arc::new(mask.trim_to_ink()),
            fill: overlay.color,
            stroke_px: stroke_width(overlay.size_px),
            bottom_margin_px: self.bottom_margin_px,
            font,
        };
        self.cache = Some((overlay.clone(), prepared.clone()));
        Some(prepared)
    }

    /// Stamp `overlay` on `frame`. Absent or empty overlays return `frame` untouched.
    pub fn stamp(&mut self, frame: FrameRGB, overlay: Option<&OverlaySpec>) -> FrameRGB {
        match self.prepare(overlay) {
            Some(prepared) => prepared.apply(frame),
            None => frame,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
