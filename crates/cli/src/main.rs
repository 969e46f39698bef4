use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use headcount_core::annotation::infrastructure::box_annotator::BoxAnnotator;
use headcount_core::detection::infrastructure::model_resolver;
use headcount_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use headcount_core::pipeline::annotate_people_use_case::AnnotatePeopleUseCase;
use headcount_core::pipeline::detection_session::{DetectionSession, SessionSummary};
use headcount_core::pipeline::display_sink::{DisplaySink, SessionEvent};
use headcount_core::pipeline::frame_pacer::FramePacer;
use headcount_core::shared::constants::{
    is_video_extension, DEFAULT_CAMERA_INDEX, DEFAULT_CONFIDENCE, DEFAULT_TARGET_FPS,
    MODEL_URL_ENV, VIDEO_EXTENSIONS, YOLO_MODEL_NAME,
};
use headcount_core::shared::frame::Frame;
use headcount_core::video::domain::image_writer::ImageWriter;
use headcount_core::video::domain::video_source::{UploadedVideo, VideoSource};
use headcount_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use headcount_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Detect and count people in a camera feed or a video file.
#[derive(Parser)]
#[command(name = "headcount")]
struct Cli {
    #[command(subcommand)]
    source: SourceArg,

    /// ONNX model file; skips cache lookup and download.
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// URL to download the model from when it is not cached.
    #[arg(long, global = true, env = MODEL_URL_ENV)]
    model_url: Option<String>,

    /// Detection confidence threshold (0.0-1.0).
    #[arg(long, global = true, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f32,

    /// Target processing rate in frames per second.
    #[arg(long, global = true, default_value_t = DEFAULT_TARGET_FPS)]
    fps: f64,

    /// Write every annotated frame as a PNG into this directory.
    #[arg(long, global = true)]
    save_frames: Option<PathBuf>,
}

#[derive(Subcommand)]
enum SourceArg {
    /// Read from a local camera.
    Camera {
        /// Device index (0 is the default camera).
        #[arg(long, default_value_t = DEFAULT_CAMERA_INDEX)]
        index: u32,
    },
    /// Read from a video file, or `-` for stdin.
    File {
        path: PathBuf,

        /// Container extension of stdin input (mp4, avi, mov, mkv).
        #[arg(long)]
        format: Option<String>,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let source = build_source(&cli.source)?;
    let model_path = resolve_model(&cli)?;
    let detector = OnnxYoloDetector::new(&model_path, cli.confidence)?;
    let use_case = AnnotatePeopleUseCase::new(Box::new(detector), Box::new(BoxAnnotator::default()));

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || {
        handler_stop.store(true, Ordering::Relaxed);
    })?;

    let mut session = DetectionSession::new(use_case, FramePacer::new(cli.fps), stop);
    let mut sink = LogSink::new(cli.save_frames.clone());

    log::info!("Starting detection on {source} (Ctrl-C to stop)");
    let summary = session.run(source, Box::new(FfmpegReader::new()), &mut sink)?;
    report(&summary);
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if !(cli.fps.is_finite() && cli.fps > 0.0) {
        return Err(format!("FPS must be a positive number, got {}", cli.fps).into());
    }
    if let Some(model) = &cli.model {
        if !model.exists() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    if let SourceArg::File { path, format } = &cli.source {
        if is_stdin(path) {
            match format {
                Some(ext) if is_video_extension(ext) => {}
                Some(ext) => {
                    return Err(format!(
                        "--format must be one of {}, got '{ext}'",
                        VIDEO_EXTENSIONS.join(", ")
                    )
                    .into())
                }
                None => return Err("--format is required when reading from stdin".into()),
            }
        } else if !path.exists() {
            return Err(format!("Input file not found: {}", path.display()).into());
        }
    }
    Ok(())
}

fn build_source(arg: &SourceArg) -> Result<VideoSource, Box<dyn std::error::Error>> {
    match arg {
        SourceArg::Camera { index } => Ok(VideoSource::Camera { index: *index }),
        SourceArg::File { path, format } if is_stdin(path) => {
            let ext = format.as_deref().unwrap_or_default();
            let upload = UploadedVideo::stage(&format!("stdin.{ext}"), std::io::stdin().lock())?;
            Ok(VideoSource::Upload(upload))
        }
        SourceArg::File { path, .. } => Ok(VideoSource::File(path.clone())),
    }
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn resolve_model(cli: &Cli) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = &cli.model {
        return Ok(path.clone());
    }

    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let bundled = model_resolver::bundled_model_dir();
    let path = model_resolver::resolve(
        YOLO_MODEL_NAME,
        cli.model_url.as_deref(),
        bundled.as_deref(),
        Some(Box::new(download_progress)),
    )?;
    log::info!("Using model {}", path.display());
    Ok(path)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading person detection model... {pct}%");
    } else {
        eprint!("\rDownloading person detection model... {downloaded} bytes");
    }
    if total > 0 && downloaded >= total {
        eprintln!();
    }
}

fn report(summary: &SessionSummary) {
    log::info!(
        "Session {}: {} frames in {:.1}s ({:.1} fps), peak {} {}",
        summary.end,
        summary.frames,
        summary.elapsed.as_secs_f64(),
        summary.throughput(),
        summary.peak_count,
        if summary.peak_count == 1 { "person" } else { "people" }
    );
}

/// Terminal display: logs count changes and optionally saves frames.
struct LogSink {
    frames_dir: Option<PathBuf>,
    writer: ImageFileWriter,
}

impl LogSink {
    fn new(frames_dir: Option<PathBuf>) -> Self {
        Self {
            frames_dir,
            writer: ImageFileWriter::new(),
        }
    }
}

impl DisplaySink for LogSink {
    fn show_frame(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(dir) = &self.frames_dir {
            let path = dir.join(format!("frame_{:06}.png", frame.index()));
            self.writer.write(&path, frame)?;
        }
        Ok(())
    }

    fn show_count(&mut self, count: usize) {
        log::info!("People detected: {count}");
    }

    fn event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Opened(meta) if meta.is_live() => {
                log::info!("Live capture {}x{}", meta.width, meta.height)
            }
            SessionEvent::Opened(meta) => log::info!(
                "Video {}x{}, {} frames at {:.1} fps",
                meta.width,
                meta.height,
                meta.total_frames,
                meta.fps
            ),
        }
    }
}
