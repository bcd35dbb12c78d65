use crate::foundation::core::{FrameIndex, FrameRGB};
use crate::foundation::error::{FrameGifError, FrameGifResult};

/// Shortest accepted per-frame display duration.
pub const MIN_FRAME_DURATION_MS: u32 = 100;
/// Longest accepted per-frame display duration.
pub const MAX_FRAME_DURATION_MS: u32 = 1000;
/// Frame duration used when none is configured.
pub const DEFAULT_FRAME_DURATION_MS: u32 = 300;

/// How many times the animation plays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    /// Loop forever (GIF `loop=0`).
    #[default]
    Infinite,
    /// Repeat the animation this many extra times.
    Finite(u16),
}

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Display duration of every frame.
    pub frame_duration_ms: u32,
    /// Loop behavior.
    pub repeat: LoopMode,
}

impl SinkConfig {
    /// Reject zero sizes and durations outside `100..=1000` ms.
    pub fn validate(&self) -> FrameGifResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameGifError::validation(
                "sink width/height must be non-zero",
            ));
        }
        validate_frame_duration(self.frame_duration_ms)
    }
}

/// Check a per-frame duration against the accepted range.
pub fn validate_frame_duration(ms: u32) -> FrameGifResult<()> {
    if !(MIN_FRAME_DURATION_MS..=MAX_FRAME_DURATION_MS).contains(&ms) {
        return Err(FrameGifError::validation(format!(
            "frame_duration_ms must be in {MIN_FRAME_DURATION_MS}..={MAX_FRAME_DURATION_MS}, got {ms}"
        )));
    }
    Ok(())
}

/// Sink contract for consuming normalized frames in display order.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> FrameGifResult<()>;
    /// Push one frame in strictly increasing display order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGB) -> FrameGifResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> FrameGifResult<()>;
}

/// Shared ordering/size checks for sinks.
#[derive(Debug, Default)]
pub(crate) struct FrameGate {
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FrameGate {
    pub(crate) fn open(&mut self, cfg: SinkConfig) -> FrameGifResult<()> {
        cfg.validate()?;
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    pub(crate) fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    pub(crate) fn admit(&mut self, idx: FrameIndex, frame: &FrameRGB) -> FrameGifResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| FrameGifError::encode("sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(FrameGifError::encode("sink received out-of-order frame index"));
        }
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(FrameGifError::encode(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.data.len() != (frame.width as usize) * (frame.height as usize) * 3 {
            return Err(FrameGifError::encode(
                "frame.data size mismatch with width*height*3",
            ));
        }
        self.last_idx = Some(idx);
        Ok(())
    }

    pub(crate) fn close(&mut self) -> FrameGifResult<SinkConfig> {
        self.last_idx = None;
        self.cfg
            .take()
            .ok_or_else(|| FrameGifError::encode("sink not started"))
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    gate: FrameGate,
    last_cfg: Option<SinkConfig>,
    /// Frames in display order.
    pub(crate) frames: Vec<(FrameIndex, FrameRGB)>,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.gate.config().cloned().or_else(|| self.last_cfg.clone())
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(FrameIndex, FrameRGB)] {
        &self.frames
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> FrameGifResult<()> {
        self.gate.open(cfg)?;
        self.frames.clear();
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGB) -> FrameGifResult<()> {
        self.gate.admit(idx, frame)?;
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> FrameGifResult<()> {
        self.last_cfg = Some(self.gate.close()?);
        Ok(())
    }
}
