use std::path::{Path, PathBuf};

use crate::assets::source::SourceImage;
use crate::foundation::error::{FrameGifError, FrameGifResult};

/// Basic metadata about a source video file.
#[derive(Clone, Debug)]
pub struct VideoSourceInfo {
    /// Source path used for probing/decoding.
    #[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
    pub source_path: PathBuf,
    /// Displayed width in pixels, after rotation metadata is applied.
    pub width: u32,
    /// Displayed height in pixels, after rotation metadata is applied.
    pub height: u32,
    /// Clockwise display rotation in degrees, normalized to `0..360`.
    pub rotation_deg: u32,
    /// Total decoded frame count reported by ffprobe, when known.
    pub frame_count: Option<u64>,
}

/// Which frames of a video become GIF frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoSampling {
    /// Keep every n-th decoded frame, starting with the first. Must be >= 1.
    pub every_nth: u32,
    /// Stop after this many kept frames. Must be >= 1.
    pub max_frames: u32,
}

impl Default for VideoSampling {
    fn default() -> Self {
        Self {
            every_nth: 5,
            max_frames: 50,
        }
    }
}

impl VideoSampling {
    /// Reject zero values.
    pub fn validate(self) -> FrameGifResult<Self> {
        if self.every_nth == 0 {
            return Err(FrameGifError::validation("video every_nth must be >= 1"));
        }
        if self.max_frames == 0 {
            return Err(FrameGifError::validation("video max_frames must be >= 1"));
        }
        Ok(self)
    }

    #[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
    fn select_filter(self) -> String {
        format!("select=not(mod(n\\,{}))", self.every_nth)
    }
}

#[derive(serde::Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    nb_frames: Option<String>,
    tags: Option<ProbeTags>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    streams: Vec<ProbeStream>,
}

impl ProbeStream {
    /// Clockwise rotation in `0..360`. The display matrix angle is counter-clockwise; the
    /// legacy `rotate` tag is clockwise.
    fn rotation_deg(&self) -> u32 {
        let from_matrix = self
            .side_data_list
            .iter()
            .find_map(|d| d.rotation)
            .map(|r| -(r.round() as i64));
        let from_tag = self
            .tags
            .as_ref()
            .and_then(|t| t.rotate.as_deref())
            .and_then(|r| r.trim().parse::<i64>().ok());
        from_matrix.or(from_tag).unwrap_or(0).rem_euclid(360) as u32
    }
}

/// Read ffprobe's `-show_streams` JSON. ffmpeg applies rotation metadata while decoding,
/// so quarter turns swap the reported width and height.
#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
fn parse_stream_info(source_path: &Path, json: &[u8]) -> FrameGifResult<VideoSourceInfo> {
    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| FrameGifError::media(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| FrameGifError::media("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| FrameGifError::media("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| FrameGifError::media("missing video height from ffprobe"))?;
    let frame_count = video_stream
        .nb_frames
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok());

    let rotation_deg = video_stream.rotation_deg();
    let (width, height) = if rotation_deg % 180 == 90 {
        (height, width)
    } else {
        (width, height)
    };

    Ok(VideoSourceInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        rotation_deg,
        frame_count,
    })
}

/// Probe source video metadata through `ffprobe`.
#[cfg(feature = "media-ffmpeg")]
pub fn probe_video(source_path: &Path) -> FrameGifResult<VideoSourceInfo> {
    let out = std::process::Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_streams"])
        .arg(source_path)
        .output()
        .map_err(|e| FrameGifError::media(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(FrameGifError::media(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    let info = parse_stream_info(source_path, &out.stdout)?;
    tracing::debug!(
        width = info.width,
        height = info.height,
        rotation = info.rotation_deg,
        "probed video"
    );
    Ok(info)
}

/// Probe source video metadata through `ffprobe`.
///
/// Returns an error when the `media-ffmpeg` feature is disabled.
#[cfg(not(feature = "media-ffmpeg"))]
pub fn probe_video(_source_path: &Path) -> FrameGifResult<VideoSourceInfo> {
    Err(FrameGifError::media(
        "video sources require the 'media-ffmpeg' feature",
    ))
}

/// Decode every `every_nth` frame of a video (up to `max_frames`) as RGBA sources.
///
/// Sources are labelled `<file name>#<decoded frame number>`.
#[cfg(feature = "media-ffmpeg")]
#[tracing::instrument(skip(sampling), fields(every_nth = sampling.every_nth, max_frames = sampling.max_frames))]
pub fn sample_video_frames(
    source_path: &Path,
    sampling: VideoSampling,
) -> FrameGifResult<Vec<SourceImage>> {
    let sampling = sampling.validate()?;
    let info = probe_video(source_path)?;

    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(&info.source_path)
        .args([
            "-vf",
            &sampling.select_filter(),
            "-vsync",
            "vfr",
            "-frames:v",
            &sampling.max_frames.to_string(),
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "pipe:1",
        ])
        .output()
        .map_err(|e| FrameGifError::media(format!("failed to run ffmpeg for video decode: {e}")))?;

    if !out.status.success() {
        return Err(FrameGifError::media(format!(
            "ffmpeg video decode failed for '{}': {}",
            info.source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    split_raw_frames(&info, sampling, out.stdout)
}

/// Decode every `every_nth` frame of a video (up to `max_frames`) as RGBA sources.
///
/// Returns an error when the `media-ffmpeg` feature is disabled.
#[cfg(not(feature = "media-ffmpeg"))]
pub fn sample_video_frames(
    _source_path: &Path,
    sampling: VideoSampling,
) -> FrameGifResult<Vec<SourceImage>> {
    sampling.validate()?;
    Err(FrameGifError::media(
        "video sources require the 'media-ffmpeg' feature",
    ))
}

#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
fn split_raw_frames(
    info: &VideoSourceInfo,
    sampling: VideoSampling,
    raw: Vec<u8>,
) -> FrameGifResult<Vec<SourceImage>> {
    let expected_len = info.width as usize * info.height as usize * 4;
    if expected_len == 0 {
        return Err(FrameGifError::media(
            "decoded video frame size is zero (invalid source dimensions)",
        ));
    }
    if !raw.len().is_multiple_of(expected_len) {
        return Err(FrameGifError::media(format!(
            "decoded video batch has invalid size: got {} bytes, expected multiples of {expected_len}",
            raw.len()
        )));
    }

    let name = info
        .source_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| info.source_path.display().to_string());

    let frames: Vec<SourceImage> = raw
        .chunks_exact(expected_len)
        .take(sampling.max_frames as usize)
        .enumerate()
        .map(|(i, px)| {
            let decoded_n = (i as u64) * u64::from(sampling.every_nth);
            SourceImage::from_rgba8(
                format!("{name}#{decoded_n}"),
                info.width,
                info.height,
                px.to_vec(),
            )
        })
        .collect();

    tracing::info!(
        source = %info.source_path.display(),
        frames = frames.len(),
        "sampled video frames"
    );
    Ok(frames)
}
