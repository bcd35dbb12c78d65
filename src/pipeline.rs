use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::assets::fonts::{FontRequest, FontResolver};
use crate::assets::source::SourceImage;
use crate::encode::sink::{
    DEFAULT_FRAME_DURATION_MS, FrameSink, LoopMode, SinkConfig, validate_frame_duration,
};
use crate::foundation::core::{FrameIndex, FrameRGB};
use crate::foundation::error::{FrameGifError, FrameGifResult};
use crate::normalize::{normalize, normalize_parallel};
use crate::render::text::{
    DEFAULT_BOTTOM_MARGIN_PX, FontFallbackHook, OverlaySpec, PreparedOverlay, TextStamper,
};

/// Smallest overlay font size accepted in a [`PipelineConfig`].
pub const MIN_OVERLAY_SIZE_PX: u32 = 20;
/// Largest overlay font size accepted in a [`PipelineConfig`].
pub const MAX_OVERLAY_SIZE_PX: u32 = 200;

/// Options controlling how a [`Pipeline`] schedules per-frame work.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineOpts {
    /// Enable frame-level parallelism (rayon), using a dedicated thread pool.
    pub parallel: bool,
    /// Override the number of rayon worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
}

/// Everything needed to turn a batch of sources into an animation.
///
/// Deserializes from JSON; missing keys take their defaults.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Display duration of every frame, `100..=1000` ms.
    pub frame_duration_ms: u32,
    /// Caption stamped on every frame.
    pub overlay: Option<OverlaySpec>,
    /// Outline font tried before the built-in bitmap font.
    pub font: FontRequest,
    /// Extra directories searched for named fonts.
    pub font_dirs: Vec<PathBuf>,
    /// Distance from the caption's bottom to the frame's bottom edge.
    pub bottom_margin_px: u32,
    /// Loop behavior of the output.
    pub repeat: LoopMode,
    /// Scheduling options.
    pub opts: PipelineOpts,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_duration_ms: DEFAULT_FRAME_DURATION_MS,
            overlay: None,
            font: FontRequest::default(),
            font_dirs: Vec::new(),
            bottom_margin_px: DEFAULT_BOTTOM_MARGIN_PX,
            repeat: LoopMode::Infinite,
            opts: PipelineOpts::default(),
        }
    }
}

impl PipelineConfig {
    /// Check value ranges.
    pub fn validate(&self) -> FrameGifResult<()> {
        validate_frame_duration(self.frame_duration_ms)?;
        if let Some(overlay) = &self.overlay {
            overlay.validate()?;
            if !(MIN_OVERLAY_SIZE_PX..=MAX_OVERLAY_SIZE_PX).contains(&overlay.size_px) {
                return Err(FrameGifError::validation(format!(
                    "overlay size_px must be in {MIN_OVERLAY_SIZE_PX}..={MAX_OVERLAY_SIZE_PX}, got {}",
                    overlay.size_px
                )));
            }
        }
        if self.opts.threads == Some(0) {
            return Err(FrameGifError::validation(
                "pipeline 'threads' must be >= 1 when set",
            ));
        }
        Ok(())
    }

    /// Parse a JSON config.
    pub fn from_json_str(s: &str) -> FrameGifResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| FrameGifError::validation(format!("invalid pipeline config: {e}")))
    }

    /// Read and parse a JSON config file.
    pub fn from_path(path: &Path) -> FrameGifResult<Self> {
        use anyhow::Context as _;

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&text)
    }
}

/// Batch run statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Frames delivered to the sink.
    pub frames: u64,
    /// Output width.
    pub width: u32,
    /// Output height.
    pub height: u32,
    /// Whether a caption was stamped.
    pub stamped: bool,
}

/// Normalize, stamp and encode a batch of frames.
///
/// The font is resolved once per pipeline and the rendered caption is reused across batches
/// while the overlay stays the same.
pub struct Pipeline {
    config: PipelineConfig,
    stamper: TextStamper,
    pool: Option<rayon::ThreadPool>,
}

impl Pipeline {
    /// Validate `config` and build the pipeline.
    pub fn new(config: PipelineConfig) -> FrameGifResult<Self> {
        config.validate()?;
        let resolver = FontResolver::new(config.font_dirs.iter().cloned());
        let stamper = TextStamper::new(config.font.clone(), resolver)
            .with_bottom_margin(config.bottom_margin_px);
        let pool = if config.opts.parallel {
            Some(build_thread_pool(config.opts.threads)?)
        } else {
            None
        };
        Ok(Self {
            config,
            stamper,
            pool,
        })
    }

    /// Install a diagnostic hook called when the outline font falls back.
    pub fn with_fallback_hook(mut self, hook: FontFallbackHook) -> Self {
        self.stamper = self.stamper.with_fallback_hook(hook);
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Normalize `sources` and stamp the configured caption on every frame.
    #[tracing::instrument(skip(self, sources), fields(frames = sources.len(), parallel = self.pool.is_some()))]
    pub fn process(&mut self, sources: &[SourceImage]) -> FrameGifResult<Vec<FrameRGB>> {
        if sources.is_empty() {
            return Err(FrameGifError::EmptyBatch);
        }
        let prepared = self.stamper.prepare(self.config.overlay.as_ref());

        let frames = match self.pool.as_ref() {
            Some(pool) => pool.install(|| -> FrameGifResult<Vec<FrameRGB>> {
                let frames = normalize_parallel(sources)?;
                Ok(match &prepared {
                    Some(overlay) => frames.into_par_iter().map(|f| overlay.apply(f)).collect(),
                    None => frames,
                })
            })?,
            None => {
                let frames = normalize(sources)?;
                match &prepared {
                    Some(overlay) => stamp_all(frames, overlay),
                    None => frames,
                }
            }
        };
        Ok(frames)
    }

    /// Process `sources` and stream the frames into `sink` in display order.
    ///
    /// Every source is decoded before `sink.begin` runs, so a failed batch never reaches the
    /// sink.
    #[tracing::instrument(skip(self, sources, sink), fields(frames = sources.len()))]
    pub fn run(
        &mut self,
        sources: &[SourceImage],
        sink: &mut dyn FrameSink,
    ) -> FrameGifResult<RunStats> {
        let frames = self.process(sources)?;
        let first = frames.first().ok_or(FrameGifError::EmptyBatch)?;
        let stats = RunStats {
            frames: frames.len() as u64,
            width: first.width,
            height: first.height,
            stamped: self
                .config
                .overlay
                .as_ref()
                .is_some_and(|o| !o.is_blank()),
        };

        sink.begin(SinkConfig {
            width: stats.width,
            height: stats.height,
            frame_duration_ms: self.config.frame_duration_ms,
            repeat: self.config.repeat,
        })?;
        for (i, frame) in frames.iter().enumerate() {
            sink.push_frame(FrameIndex(i as u64), frame)?;
        }
        sink.end()?;

        tracing::info!(
            frames = stats.frames,
            width = stats.width,
            height = stats.height,
            stamped = stats.stamped,
            "batch complete"
        );
        Ok(stats)
    }
}

fn stamp_all(frames: Vec<FrameRGB>, overlay: &PreparedOverlay) -> Vec<FrameRGB> {
    frames.into_iter().map(|f| overlay.apply(f)).collect()
}

fn build_thread_pool(threads: Option<usize>) -> FrameGifResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(FrameGifError::validation(
            "pipeline 'threads' must be >= 1 when set",
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| FrameGifError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../tests/unit/pipeline.rs"]
mod tests;
