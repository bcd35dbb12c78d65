//! framegif turns a batch of still frames into a looping animated GIF.
//!
//! Frames of mixed sizes are fitted onto the first frame's canvas (aspect preserved,
//! letterboxed in black), optionally captioned with outlined text, and streamed into a
//! [`FrameSink`] such as [`GifSink`]:
//!
//! - Collect [`SourceImage`]s (bytes, files, a directory, or sampled video frames)
//! - Build a [`Pipeline`] from a [`PipelineConfig`]
//! - [`Pipeline::run`] the batch into a sink
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod foundation;

/// Encoding sinks.
pub mod encode;
pub(crate) mod normalize;
/// Batch pipeline.
pub mod pipeline;
/// Caption rendering.
pub mod render;

pub use crate::foundation::core::{Canvas, FrameIndex, FrameRGB, Rgb8};
pub use crate::foundation::error::{FontLoadError, FrameGifError, FrameGifResult};

pub use crate::assets::fonts::{FONT_DIR_ENV, FontRequest, FontResolver, LoadedFont};
pub use crate::assets::media::{
    VideoSampling, VideoSourceInfo, probe_video, sample_video_frames,
};
pub use crate::assets::source::{IMAGE_EXTENSIONS, SourceData, SourceImage, collect_dir};
pub use crate::encode::gif::{GifFileSink, GifFileSinkOpts, GifSink, encode_gif, write_frames};
pub use crate::encode::sink::{
    DEFAULT_FRAME_DURATION_MS, FrameSink, InMemorySink, LoopMode, MAX_FRAME_DURATION_MS,
    MIN_FRAME_DURATION_MS, SinkConfig,
};
pub use crate::normalize::{Placement, fit_inside, fit_to_canvas, normalize, normalize_parallel};
pub use crate::pipeline::{Pipeline, PipelineConfig, PipelineOpts, RunStats};
pub use crate::render::text::{
    FontFallbackHook, FontKind, OverlaySpec, PreparedOverlay, TextStamper, stroke_width,
};
