use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use image::codecs::gif::{GifEncoder, Repeat};

use crate::encode::sink::{FrameGate, FrameSink, LoopMode, SinkConfig};
use crate::foundation::core::{FrameIndex, FrameRGB};
use crate::foundation::error::{FrameGifError, FrameGifResult};

/// NeuQuant sampling speed handed to the GIF encoder (1 = best, 30 = fastest).
pub const GIF_QUANTIZE_SPEED: i32 = 10;

struct WriterSlot<W> {
    writer: W,
    error: Option<String>,
}

/// Writer handed to the encoder. The sink keeps a second handle so it can recover the
/// writer, and any error the encoder swallowed, once the encoder is dropped.
struct SharedWriter<W> {
    slot: Arc<Mutex<WriterSlot<W>>>,
}

impl<W: Write> SharedWriter<W> {
    fn with_slot<T>(&self, op: impl FnOnce(&mut W) -> std::io::Result<T>) -> std::io::Result<T> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let out = op(&mut slot.writer);
        if let Err(e) = &out
            && slot.error.is_none()
        {
            slot.error = Some(e.to_string());
        }
        out
    }
}

impl<W: Write> Write for SharedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.with_slot(|w| w.write(buf))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.with_slot(|w| w.flush())
    }
}

/// Sink that encodes frames into an animated GIF written to `W`.
///
/// [`FrameSink::end`] writes the trailer, flushes `W` and reports any write error seen along
/// the way. A sink encodes one animation; calling `begin` a second time fails.
pub struct GifSink<W: Write> {
    writer: Option<W>,
    slot: Option<Arc<Mutex<WriterSlot<W>>>>,
    encoder: Option<GifEncoder<SharedWriter<W>>>,
    delay: Option<image::Delay>,
    gate: FrameGate,
    started: bool,
}

impl<W: Write> GifSink<W> {
    /// Create a sink that writes into `writer` once started.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
            slot: None,
            encoder: None,
            delay: None,
            gate: FrameGate::default(),
            started: false,
        }
    }

    /// Give back the writer: untouched before `begin`, complete after `end`, `None` while
    /// an animation is still open.
    pub fn into_writer(self) -> Option<W> {
        self.writer
    }
}

fn repeat_for(mode: LoopMode) -> Repeat {
    match mode {
        LoopMode::Infinite => Repeat::Infinite,
        LoopMode::Finite(n) => Repeat::Finite(n),
    }
}

impl<W: Write + Send> FrameSink for GifSink<W> {
    fn begin(&mut self, cfg: SinkConfig) -> FrameGifResult<()> {
        if self.started {
            return Err(FrameGifError::encode("gif sink was already started"));
        }
        let writer = self
            .writer
            .take()
            .ok_or_else(|| FrameGifError::encode("gif sink has no writer"))?;
        let repeat = repeat_for(cfg.repeat);
        let delay = image::Delay::from_numer_denom_ms(cfg.frame_duration_ms, 1);
        if let Err(e) = self.gate.open(cfg) {
            self.writer = Some(writer);
            return Err(e);
        }

        let slot = Arc::new(Mutex::new(WriterSlot {
            writer,
            error: None,
        }));
        let mut encoder = GifEncoder::new_with_speed(
            SharedWriter {
                slot: Arc::clone(&slot),
            },
            GIF_QUANTIZE_SPEED,
        );
        self.slot = Some(slot);
        self.started = true;
        encoder
            .set_repeat(repeat)
            .map_err(|e| FrameGifError::encode(format!("failed to set gif repeat: {e}")))?;
        self.encoder = Some(encoder);
        self.delay = Some(delay);
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGB) -> FrameGifResult<()> {
        self.gate.admit(idx, frame)?;
        let (Some(encoder), Some(delay)) = (self.encoder.as_mut(), self.delay) else {
            return Err(FrameGifError::encode("gif sink is already finalized"));
        };

        let rgba = image::RgbaImage::from_raw(frame.width, frame.height, frame.to_rgba8())
            .ok_or_else(|| FrameGifError::encode("frame buffer does not match its size"))?;
        encoder
            .encode_frame(image::Frame::from_parts(rgba, 0, 0, delay))
            .map_err(|e| FrameGifError::encode(format!("gif frame {} failed: {e}", idx.0)))
    }

    fn end(&mut self) -> FrameGifResult<()> {
        self.gate.close()?;
        self.delay = None;
        // Dropping the encoder writes the trailer into the shared slot.
        drop(self.encoder.take());
        let slot = self
            .slot
            .take()
            .ok_or_else(|| FrameGifError::encode("gif sink not started"))?;
        let WriterSlot { mut writer, error } = Arc::try_unwrap(slot)
            .map_err(|_| FrameGifError::encode("gif writer is still shared"))?
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(err) = error {
            return Err(FrameGifError::encode(format!("gif write failed: {err}")));
        }
        writer
            .flush()
            .map_err(|e| FrameGifError::encode(format!("gif flush failed: {e}")))?;
        self.writer = Some(writer);
        Ok(())
    }
}

/// Options for [`GifFileSink`].
#[derive(Clone, Debug)]
pub struct GifFileSinkOpts {
    /// Output GIF path.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
}

impl GifFileSinkOpts {
    /// Create options for writing a GIF to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
        }
    }
}

/// GIF sink that encodes into memory and writes its output file in `end`, so failed
/// batches leave no file behind and write errors are reported.
pub struct GifFileSink {
    opts: GifFileSinkOpts,
    inner: Option<GifSink<Vec<u8>>>,
}

impl GifFileSink {
    /// Create a sink for `opts.out_path`. Nothing touches the filesystem until `end`.
    pub fn new(opts: GifFileSinkOpts) -> Self {
        Self { opts, inner: None }
    }

    /// Output path.
    pub fn out_path(&self) -> &Path {
        &self.opts.out_path
    }

    fn refuse_existing(&self) -> FrameGifError {
        FrameGifError::validation(format!(
            "output file '{}' already exists",
            self.opts.out_path.display()
        ))
    }

    fn write_out(&self, bytes: &[u8]) -> FrameGifResult<()> {
        use anyhow::Context as _;

        let path = &self.opts.out_path;
        ensure_parent_dir(path)?;
        let mut file = if self.opts.overwrite {
            File::create(path)
        } else {
            OpenOptions::new().write(true).create_new(true).open(path)
        }
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                self.refuse_existing()
            } else {
                anyhow::Error::new(e)
                    .context(format!("create gif '{}'", path.display()))
                    .into()
            }
        })?;
        file.write_all(bytes)
            .and_then(|()| file.sync_all())
            .with_context(|| format!("write gif '{}'", path.display()))?;
        Ok(())
    }
}

impl FrameSink for GifFileSink {
    fn begin(&mut self, cfg: SinkConfig) -> FrameGifResult<()> {
        cfg.validate()?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(self.refuse_existing());
        }
        let mut inner = GifSink::new(Vec::new());
        inner.begin(cfg)?;
        self.inner = Some(inner);
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGB) -> FrameGifResult<()> {
        self.inner
            .as_mut()
            .ok_or_else(|| FrameGifError::encode("gif file sink not started"))?
            .push_frame(idx, frame)
    }

    fn end(&mut self) -> FrameGifResult<()> {
        let mut inner = self
            .inner
            .take()
            .ok_or_else(|| FrameGifError::encode("gif file sink not started"))?;
        inner.end()?;
        let bytes = inner
            .into_writer()
            .ok_or_else(|| FrameGifError::encode("gif encoder kept its buffer"))?;
        self.write_out(&bytes)?;
        tracing::info!(out = %self.opts.out_path.display(), bytes = bytes.len(), "wrote gif");
        Ok(())
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> FrameGifResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Push `frames` through `sink` in order, wrapping them in `begin`/`end`.
pub fn write_frames(
    sink: &mut dyn FrameSink,
    frames: &[FrameRGB],
    frame_duration_ms: u32,
    repeat: LoopMode,
) -> FrameGifResult<()> {
    let first = frames.first().ok_or(FrameGifError::EmptyBatch)?;
    sink.begin(SinkConfig {
        width: first.width,
        height: first.height,
        frame_duration_ms,
        repeat,
    })?;
    for (i, frame) in frames.iter().enumerate() {
        sink.push_frame(FrameIndex(i as u64), frame)?;
    }
    sink.end()
}

/// Encode `frames` as an infinitely looping GIF held in memory.
pub fn encode_gif(frames: &[FrameRGB], frame_duration_ms: u32) -> FrameGifResult<Vec<u8>> {
    let mut sink = GifSink::new(Vec::new());
    write_frames(&mut sink, frames, frame_duration_ms, LoopMode::Infinite)?;
    sink.into_writer()
        .ok_or_else(|| FrameGifError::encode("gif encoder kept its buffer"))
}

#[cfg(test)]
#[path = "../../tests/unit/encode/gif.rs"]
mod tests;
