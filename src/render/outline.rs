use std::sync::Arc;

use crate::foundation::error::{FrameGifError, FrameGifResult};
use crate::render::mask::GlyphMask;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Brush carried through Parley layouts. Only coverage is rasterized, so it stays white.
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

impl TextBrushRgba8 {
    const OPAQUE_WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };
}

/// An outline font registered with the layout engine.
#[derive(Clone)]
pub(crate) struct OutlineFont {
    family_name: String,
    data: vello_cpu::peniko::FontData,
}

impl std::fmt::Debug for OutlineFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutlineFont")
            .field("family_name", &self.family_name)
            .finish_non_exhaustive()
    }
}

impl OutlineFont {
    pub(crate) fn family_name(&self) -> &str {
        &self.family_name
    }
}

/// Stateful helper for shaping single-line captions with Parley.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Register raw font bytes and return a handle usable for layout and rasterization.
    pub(crate) fn register(&mut self, font_bytes: &Arc<Vec<u8>>) -> FrameGifResult<OutlineFont> {
        let families = self.font_ctx.collection.register_fonts(
            parley::fontique::Blob::from(font_bytes.as_ref().clone()),
            None,
        );
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            FrameGifError::validation("no font families registered from font bytes")
        })?;

        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| FrameGifError::validation("registered font family has no name"))?
            .to_string();

        let data = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(font_bytes.as_ref().clone()),
            0,
        );
        Ok(OutlineFont { family_name, data })
    }

    fn layout_line(
        &mut self,
        text: &str,
        font: &OutlineFont,
        size_px: f32,
    ) -> FrameGifResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(FrameGifError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(font.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(
            TextBrushRgba8::OPAQUE_WHITE,
        ));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }

    /// Shape `text` on one line and rasterize it into a coverage mask sized to the layout box.
    pub(crate) fn rasterize(
        &mut self,
        text: &str,
        font: &OutlineFont,
        size_px: u32,
    ) -> FrameGifResult<GlyphMask> {
        let layout = self.layout_line(text, font, size_px as f32)?;

        let width = layout.width().ceil().max(1.0) as u32;
        let height = layout.height().ceil().max(1.0) as u32;
        let w: u16 = width
            .try_into()
            .map_err(|_| FrameGifError::validation("text layout width exceeds u16"))?;
        let h: u16 = height
            .try_into()
            .map_err(|_| FrameGifError::validation("text layout height exceeds u16"))?;

        let mut ctx = vello_cpu::RenderContext::new(w, h);
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font.data)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        ctx.flush();

        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.render_to_pixmap(&mut pixmap);
        Ok(GlyphMask::from_rgba_alpha(
            width,
            height,
            pixmap.data_as_u8_slice(),
        ))
    }
}
