/// Crate-wide result alias.
pub type FrameGifResult<T> = Result<T, FrameGifError>;

/// Errors surfaced to callers of the pipeline.
///
/// Font problems are deliberately absent: they are recovered locally and reported through
/// [`FontLoadError`] diagnostics instead.
#[derive(thiserror::Error, Debug)]
pub enum FrameGifError {
    /// A configuration value is out of range or malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The batch contained no frames.
    #[error("empty batch: at least one frame is required")]
    EmptyBatch,

    /// A source image could not be decoded or converted to RGB.
    #[error("decode error: frame {index} ('{label}'): {reason}")]
    Decode {
        /// Position of the offending source in the batch.
        index: usize,
        /// Caller-facing label of the source (usually a file name).
        label: String,
        /// Decoder message.
        reason: String,
    },

    /// Video probing or frame extraction failed.
    #[error("media error: {0}")]
    Media(String),

    /// A frame sink rejected a frame or the GIF encoder failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// Anything else, typically I/O with context attached.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FrameGifError {
    /// Build a [`FrameGifError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FrameGifError::Decode`].
    pub fn decode(index: usize, label: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            index,
            label: label.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`FrameGifError::Media`].
    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }

    /// Build a [`FrameGifError::Encode`].
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

/// A requested outline font could not be used.
///
/// Never returned from the public API; the text stamper falls back to the built-in bitmap
/// font, logs this error, and hands it to the configured diagnostic hook.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("font '{requested}' unavailable: {reason}")]
pub struct FontLoadError {
    /// Human-readable description of what was requested.
    pub requested: String,
    /// Why it could not be loaded.
    pub reason: String,
}
