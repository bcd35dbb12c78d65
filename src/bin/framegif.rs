use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use framegif::{
    FontRequest, GifFileSink, GifFileSinkOpts, OverlaySpec, Pipeline, PipelineConfig, Rgb8,
    SourceImage, VideoSampling,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_OVERLAY_SIZE_PX: u32 = 40;

#[derive(Parser, Debug)]
#[command(name = "framegif", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a GIF from image files, in the given order.
    Images(ImagesArgs),
    /// Build a GIF from every PNG/JPEG in a directory, sorted by file name.
    Dir(DirArgs),
    /// Build a GIF from frames sampled out of a video (requires `ffmpeg` on PATH).
    Video(VideoArgs),
}

#[derive(Parser, Debug)]
struct ImagesArgs {
    /// Input images.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct DirArgs {
    /// Directory containing the frames.
    dir: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct VideoArgs {
    /// Input video.
    file: PathBuf,

    /// Keep every n-th decoded frame.
    #[arg(long, default_value_t = 5)]
    every: u32,

    /// Maximum number of frames in the GIF.
    #[arg(long, default_value_t = 50)]
    max_frames: u32,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Output GIF path.
    #[arg(long)]
    out: PathBuf,

    /// Overwrite output if it already exists.
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Pipeline config JSON. Flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frame duration in milliseconds (100..=1000).
    #[arg(long)]
    duration: Option<u32>,

    /// Caption stamped on every frame.
    #[arg(long)]
    text: Option<String>,

    /// Caption color as hex, e.g. `#FFFFFF`.
    #[arg(long)]
    color: Option<Rgb8>,

    /// Caption font size in pixels (20..=200).
    #[arg(long)]
    size: Option<u32>,

    /// Font name (searched in font directories) or path to a .ttf/.otf/.ttc file.
    #[arg(long)]
    font: Option<String>,

    /// Extra font directory; may be repeated.
    #[arg(long = "font-dir")]
    font_dirs: Vec<PathBuf>,

    /// Distance between caption and bottom edge in pixels.
    #[arg(long)]
    margin: Option<u32>,

    /// Enable frame-level parallelism.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Images(args) => {
            let sources = args
                .files
                .iter()
                .map(|p| SourceImage::from_path(p))
                .collect::<Result<Vec<_>, _>>()?;
            run(sources, &args.common)
        }
        Command::Dir(args) => {
            let sources = framegif::collect_dir(&args.dir)?;
            run(sources, &args.common)
        }
        Command::Video(args) => {
            let sampling = VideoSampling {
                every_nth: args.every,
                max_frames: args.max_frames,
            };
            let sources = framegif::sample_video_frames(&args.file, sampling)?;
            run(sources, &args.common)
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(sources: Vec<SourceImage>, common: &CommonArgs) -> anyhow::Result<()> {
    let config = build_config(common)?;
    let mut pipeline = Pipeline::new(config)?;

    let mut sink = GifFileSink::new(GifFileSinkOpts {
        out_path: common.out.clone(),
        overwrite: common.overwrite,
    });
    let stats = pipeline.run(&sources, &mut sink)?;

    eprintln!(
        "wrote {} ({} frames, {}x{})",
        common.out.display(),
        stats.frames,
        stats.width,
        stats.height
    );
    Ok(())
}

fn build_config(common: &CommonArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = match &common.config {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(ms) = common.duration {
        config.frame_duration_ms = ms;
    }

    if common.text.is_some() || common.color.is_some() || common.size.is_some() {
        let mut overlay = config.overlay.take().unwrap_or(OverlaySpec {
            text: String::new(),
            color: Rgb8::WHITE,
            size_px: DEFAULT_OVERLAY_SIZE_PX,
        });
        if let Some(text) = &common.text {
            overlay.text = text.clone();
        }
        if let Some(color) = common.color {
            overlay.color = color;
        }
        if let Some(size) = common.size {
            overlay.size_px = size;
        }
        config.overlay = Some(overlay);
    }

    if let Some(font) = &common.font {
        config.font = parse_font(font);
    }
    config.font_dirs.extend(common.font_dirs.iter().cloned());
    if let Some(px) = common.margin {
        config.bottom_margin_px = px;
    }
    if common.parallel {
        config.opts.parallel = true;
    }
    if common.threads.is_some() {
        config.opts.threads = common.threads;
    }

    config.validate()?;
    Ok(config)
}

fn parse_font(arg: &str) -> FontRequest {
    let path = PathBuf::from(arg);
    let is_font_file = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "ttf" | "otf" | "ttc"));
    if is_font_file {
        FontRequest::Path(path)
    } else {
        FontRequest::Named(arg.to_owned())
    }
}
