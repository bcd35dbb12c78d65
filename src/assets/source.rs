use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::FrameGifResult;

/// File extensions picked up by [`collect_dir`].
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Pixel payload of a [`SourceImage`].
#[derive(Clone, Debug)]
pub enum SourceData {
    /// Encoded bytes in any format the `image` crate can sniff.
    Encoded(Vec<u8>),
    /// Already decoded straight-alpha RGBA8 (e.g. a sampled video frame).
    Rgba8 {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// Row-major RGBA8 bytes.
        pixels: Vec<u8>,
    },
}

/// One raw input frame, before normalization.
#[derive(Clone, Debug)]
pub struct SourceImage {
    /// Identifier used in error messages (file name, upload name, `video.mp4#12`).
    pub label: String,
    /// Pixel payload.
    pub data: SourceData,
}

impl SourceImage {
    /// Wrap encoded image bytes.
    pub fn from_bytes(label: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            data: SourceData::Encoded(bytes),
        }
    }

    /// Wrap already-decoded RGBA8 pixels.
    pub fn from_rgba8(label: impl Into<String>, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            data: SourceData::Rgba8 {
                width,
                height,
                pixels,
            },
        }
    }

    /// Read a file into an encoded source labelled with its file name.
    pub fn from_path(path: &Path) -> FrameGifResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::from_bytes(label, bytes))
    }
}

/// Return `true` when `path` has one of [`IMAGE_EXTENSIONS`] (case-insensitive).
pub fn has_image_extension(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
        return false;
    };
    let ext = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}

/// Collect every PNG/JPEG file directly inside `dir`, sorted by file name.
///
/// Subdirectories are not traversed. An empty directory yields an empty list; the pipeline
/// reports the empty batch.
pub fn collect_dir(dir: &Path) -> FrameGifResult<Vec<SourceImage>> {
    let rd =
        std::fs::read_dir(dir).with_context(|| format!("read directory '{}'", dir.display()))?;

    let mut paths = Vec::new();
    for entry in rd {
        let entry = entry.with_context(|| format!("list directory '{}'", dir.display()))?;
        let path = entry.path();
        if path.is_file() && has_image_extension(&path) {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    tracing::debug!(dir = %dir.display(), count = paths.len(), "collected image files");
    paths.iter().map(|p| SourceImage::from_path(p)).collect()
}
