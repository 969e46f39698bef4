use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use headcount_core::annotation::infrastructure::box_annotator::BoxAnnotator;
use headcount_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use headcount_core::pipeline::annotate_people_use_case::AnnotatePeopleUseCase;
use headcount_core::pipeline::detection_session::{DetectionSession, SessionEnd};
use headcount_core::pipeline::display_sink::{DisplaySink, SessionEvent};
use headcount_core::pipeline::frame_pacer::FramePacer;
use headcount_core::shared::frame::Frame;
use headcount_core::video::domain::video_source::{UploadError, UploadedVideo, VideoSource};
use headcount_core::video::infrastructure::ffmpeg_reader::FfmpegReader;

use super::model_cache::ModelCache;

/// Messages sent from the worker thread to the UI.
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    Opened(String),
    Frame {
        width: u32,
        height: u32,
        rgba: Vec<u8>,
    },
    Count(usize),
    Finished(SessionEnd),
    Error(String),
}

/// What the user asked to run on. Picked videos are copied to a temp file
/// on the worker thread, never on the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRequest {
    Camera { index: u32 },
    Video(PathBuf),
}

impl SourceRequest {
    fn into_source(self) -> Result<VideoSource, UploadError> {
        match self {
            SourceRequest::Camera { index } => Ok(VideoSource::Camera { index }),
            SourceRequest::Video(path) => Ok(VideoSource::Upload(UploadedVideo::from_path(&path)?)),
        }
    }
}

/// Parameters for one detection session.
pub struct SessionParams {
    pub source: SourceRequest,
    pub confidence: f32,
    pub target_fps: f64,
    pub model_cache: Arc<ModelCache>,
}

/// Spawn a background detection session. Returns the channel receiver and
/// the session's stop flag.
pub fn spawn(params: SessionParams) -> (Receiver<WorkerMessage>, Arc<AtomicBool>) {
    let (tx, rx) = crossbeam_channel::unbounded::<WorkerMessage>();
    let stop = Arc::new(AtomicBool::new(false));
    let stop_clone = stop.clone();

    thread::spawn(move || {
        let message = match run_session(&tx, stop_clone, params) {
            Ok(end) => WorkerMessage::Finished(end),
            Err(e) => {
                log::error!("Detection session failed: {e}");
                WorkerMessage::Error(e.to_string())
            }
        };
        let _ = tx.send(message);
    });

    (rx, stop)
}

fn run_session(
    tx: &Sender<WorkerMessage>,
    stop: Arc<AtomicBool>,
    params: SessionParams,
) -> Result<SessionEnd, Box<dyn std::error::Error>> {
    let source = params.source.into_source()?;
    let model = params.model_cache.wait(&stop)?;
    log::info!("Detection: using shared session from {}", model.path.display());

    let detector =
        OnnxYoloDetector::from_shared_session(model.session, model.input_size, params.confidence);
    let use_case = AnnotatePeopleUseCase::new(Box::new(detector), Box::new(BoxAnnotator::default()));
    let mut session = DetectionSession::new(use_case, FramePacer::new(params.target_fps), stop);

    let mut sink = ChannelSink { tx: tx.clone() };
    let summary = session.run(source, Box::new(FfmpegReader::new()), &mut sink)?;
    log::info!(
        "Session {}: {} frames, {:.1} fps, peak {}",
        summary.end,
        summary.frames,
        summary.throughput(),
        summary.peak_count
    );
    Ok(summary.end)
}

/// Forwards frames and counts to the UI thread.
struct ChannelSink {
    tx: Sender<WorkerMessage>,
}

impl DisplaySink for ChannelSink {
    fn show_frame(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        self.tx
            .send(WorkerMessage::Frame {
                width: frame.width(),
                height: frame.height(),
                rgba: frame.to_rgba(),
            })
            .map_err(|_| "display closed".into())
    }

    fn show_count(&mut self, count: usize) {
        let _ = self.tx.send(WorkerMessage::Count(count));
    }

    fn event(&mut self, event: SessionEvent) {
        let SessionEvent::Opened(meta) = event;
        let _ = self.tx.send(WorkerMessage::Opened(meta.source));
    }
}
