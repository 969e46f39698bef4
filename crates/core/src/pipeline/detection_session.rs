use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::shared::constants::VIDEO_EXTENSIONS;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_source::{UploadError, VideoSource};

use super::annotate_people_use_case::AnnotatePeopleUseCase;
use super::count_tracker::CountTracker;
use super::display_sink::{DisplaySink, SessionEvent};
use super::frame_pacer::FramePacer;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("camera {index} is unavailable: {reason}")]
    CameraUnavailable { index: u32, reason: String },
    #[error("could not read video {video}: {reason}")]
    VideoUnreadable { video: String, reason: String },
    #[error("unsupported video extension {extension:?}; expected one of {}", VIDEO_EXTENSIONS.join(", "))]
    UnsupportedExtension { extension: String },
    #[error("failed to stage upload: {0}")]
    Staging(#[source] std::io::Error),
    #[error("error processing frame {index}: {reason}")]
    Frame { index: usize, reason: String },
}

impl From<UploadError> for SessionError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::UnsupportedExtension { extension } => {
                SessionError::UnsupportedExtension { extension }
            }
            UploadError::Io(e) => SessionError::Staging(e),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// The stop flag was raised.
    Stopped,
    /// The file ran out of frames, or the camera stopped delivering.
    EndOfStream,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::Stopped => write!(f, "stopped"),
            SessionEnd::EndOfStream => write!(f, "end of stream"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionSummary {
    pub end: SessionEnd,
    pub frames: usize,
    pub elapsed: Duration,
    pub peak_count: usize,
}

impl SessionSummary {
    /// Frames processed per second of wall-clock time.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        }
    }
}

/// Closes the wrapped reader exactly once, on whatever path leaves `run`.
struct CaptureGuard {
    reader: Box<dyn VideoReader>,
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.reader.close();
    }
}

/// One capture → annotate → display loop over a single source.
///
/// The loop is synchronous. Cancellation is the shared stop flag, polled
/// once per frame before reading.
pub struct DetectionSession {
    use_case: AnnotatePeopleUseCase,
    pacer: FramePacer,
    stop: Arc<AtomicBool>,
}

impl DetectionSession {
    pub fn new(use_case: AnnotatePeopleUseCase, pacer: FramePacer, stop: Arc<AtomicBool>) -> Self {
        Self {
            use_case,
            pacer,
            stop,
        }
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Runs until the stop flag is raised, the source is exhausted, or an
    /// error occurs.
    ///
    /// Takes ownership of `source` so an uploaded temp file is deleted when
    /// the session returns, after the reader has been closed.
    pub fn run(
        &mut self,
        source: VideoSource,
        reader: Box<dyn VideoReader>,
        sink: &mut dyn DisplaySink,
    ) -> Result<SessionSummary, SessionError> {
        let mut guard = CaptureGuard { reader };

        let metadata = guard
            .reader
            .open(&source)
            .map_err(|e| open_error(&source, e.as_ref()))?;
        log::info!(
            "Opened {} ({}x{}, {:.1} fps, codec {})",
            metadata.source,
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.codec
        );
        sink.event(SessionEvent::Opened(metadata));

        let mut tracker = CountTracker::new();
        let mut processed = 0usize;
        let mut peak_count = 0usize;
        let started = Instant::now();
        let mut frames = guard.reader.frames();

        let end = loop {
            let tick = Instant::now();
            if self.stop.load(Ordering::Relaxed) {
                break SessionEnd::Stopped;
            }

            let frame = match frames.next() {
                None => break SessionEnd::EndOfStream,
                Some(Ok(frame)) => frame,
                Some(Err(e)) => return Err(frame_error(processed, e.as_ref())),
            };
            let index = frame.index();

            let annotated = self
                .use_case
                .execute(frame)
                .map_err(|e| frame_error(index, e.as_ref()))?;
            sink
                .show_frame(&annotated.frame)
                .map_err(|e| frame_error(index, e.as_ref()))?;
            if let Some(count) = tracker.update(annotated.people_count) {
                sink.show_count(count);
            }

            processed += 1;
            peak_count = peak_count.max(annotated.people_count);
            log::debug!(
                "Frame {index}: {} people in {:.1}ms",
                annotated.people_count,
                tick.elapsed().as_secs_f64() * 1000.0
            );

            self.pacer.pace(tick);
        };

        let summary = SessionSummary {
            end,
            frames: processed,
            elapsed: started.elapsed(),
            peak_count,
        };
        match end {
            SessionEnd::EndOfStream => log::warn!("{source}: end of stream after {processed} frames"),
            SessionEnd::Stopped => log::info!("{source}: stopped after {processed} frames"),
        }
        Ok(summary)
    }
}

fn open_error(source: &VideoSource, err: &dyn std::error::Error) -> SessionError {
    match source {
        VideoSource::Camera { index } => SessionError::CameraUnavailable {
            index: *index,
            reason: err.to_string(),
        },
        VideoSource::File(_) | VideoSource::Upload(_) => SessionError::VideoUnreadable {
            video: source.to_string(),
            reason: err.to_string(),
        },
    }
}

fn frame_error(index: usize, err: &dyn std::error::Error) -> SessionError {
    SessionError::Frame {
        index,
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::domain::frame_annotator::FrameAnnotator;
    use crate::detection::domain::object_detector::ObjectDetector;
    use crate::shared::detection::{BoundingBox, Detection};
    use crate::shared::frame::Frame;
    use crate::shared::video_metadata::VideoMetadata;
    use crate::video::domain::video_source::UploadedVideo;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    // --- Stubs ---

    enum Scripted {
        Frame,
        Fail,
    }

    struct StubReader {
        script: Vec<Scripted>,
        fail_open: bool,
        closes: Arc<AtomicUsize>,
        opened_path: Arc<Mutex<Option<PathBuf>>>,
    }

    impl StubReader {
        fn new(script: Vec<Scripted>) -> (Self, Arc<AtomicUsize>) {
            let closes = Arc::new(AtomicUsize::new(0));
            let reader = Self {
                script,
                fail_open: false,
                closes: closes.clone(),
                opened_path: Arc::new(Mutex::new(None)),
            };
            (reader, closes)
        }

        fn with_frames(n: usize) -> (Self, Arc<AtomicUsize>) {
            Self::new((0..n).map(|_| Scripted::Frame).collect())
        }
    }

    impl VideoReader for StubReader {
        fn open(&mut self, source: &VideoSource) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            if self.fail_open {
                return Err("device busy".into());
            }
            if let VideoSource::Upload(upload) = source {
                *self.opened_path.lock().unwrap() = Some(upload.path().to_path_buf());
            }
            Ok(VideoMetadata {
                width: 8,
                height: 8,
                fps: 30.0,
                total_frames: self.script.len(),
                codec: "stub".to_string(),
                source: source.to_string(),
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new(self.script.drain(..).enumerate().map(|(i, step)| match step {
                Scripted::Frame => Ok(Frame::new(vec![0u8; 8 * 8 * 3], 8, 8, 3, i)),
                Scripted::Fail => Err("corrupt packet".into()),
            }))
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Returns `counts[frame.index()]` people for each frame.
    struct CountingDetector {
        counts: Vec<usize>,
    }

    impl ObjectDetector for CountingDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            let n = self.counts.get(frame.index()).copied().unwrap_or(0);
            Ok((0..n)
                .map(|_| Detection {
                    class_id: 0,
                    confidence: 0.9,
                    bbox: BoundingBox::new(1, 1, 4, 4),
                })
                .collect())
        }
    }

    struct FailingDetector;

    impl ObjectDetector for FailingDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            Err("inference failed".into())
        }
    }

    struct NoopAnnotator;

    impl FrameAnnotator for NoopAnnotator {
        fn annotate(
            &self,
            _frame: &mut Frame,
            _detection: &Detection,
            _label: &str,
        ) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        frames: usize,
        counts: Vec<usize>,
        events: Vec<SessionEvent>,
        stop_after: Option<(usize, Arc<AtomicBool>)>,
    }

    impl DisplaySink for RecordingSink {
        fn show_frame(&mut self, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.frames += 1;
            if let Some((limit, stop)) = &self.stop_after {
                if self.frames >= *limit {
                    stop.store(true, Ordering::Relaxed);
                }
            }
            Ok(())
        }

        fn show_count(&mut self, count: usize) {
            self.counts.push(count);
        }

        fn event(&mut self, event: SessionEvent) {
            self.events.push(event);
        }
    }

    // --- Helpers ---

    fn session_with(detector: Box<dyn ObjectDetector>) -> DetectionSession {
        DetectionSession::new(
            AnnotatePeopleUseCase::new(detector, Box::new(NoopAnnotator)),
            FramePacer::new(1000.0),
            Arc::new(AtomicBool::new(false)),
        )
    }

    fn session(counts: Vec<usize>) -> DetectionSession {
        session_with(Box::new(CountingDetector { counts }))
    }

    fn file_source() -> VideoSource {
        VideoSource::File(PathBuf::from("clip.mp4"))
    }

    // --- Tests ---

    #[test]
    fn test_end_of_stream_closes_once() {
        let (reader, closes) = StubReader::with_frames(3);
        let mut sink = RecordingSink::default();

        let summary = session(vec![]).run(file_source(), Box::new(reader), &mut sink).unwrap();

        assert_eq!(summary.end, SessionEnd::EndOfStream);
        assert_eq!(summary.frames, 3);
        assert_eq!(sink.frames, 3);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_counts_published_only_on_change() {
        let (reader, _) = StubReader::with_frames(6);
        let mut sink = RecordingSink::default();

        let summary = session(vec![0, 0, 2, 2, 2, 1])
            .run(file_source(), Box::new(reader), &mut sink)
            .unwrap();

        assert_eq!(sink.counts, vec![0, 2, 1]);
        assert_eq!(summary.peak_count, 2);
    }

    #[test]
    fn test_opened_event_precedes_frames() {
        let (reader, _) = StubReader::with_frames(1);
        let mut sink = RecordingSink::default();

        session(vec![]).run(file_source(), Box::new(reader), &mut sink).unwrap();

        assert_eq!(sink.events.len(), 1);
        let SessionEvent::Opened(meta) = &sink.events[0];
        assert_eq!(meta.source, "clip.mp4");
    }

    #[test]
    fn test_stop_flag_ends_session_and_closes_once() {
        let (reader, closes) = StubReader::with_frames(10);
        let mut session = session(vec![]);
        let mut sink = RecordingSink {
            stop_after: Some((2, session.stop_flag())),
            ..Default::default()
        };

        let summary = session.run(file_source(), Box::new(reader), &mut sink).unwrap();

        assert_eq!(summary.end, SessionEnd::Stopped);
        assert_eq!(summary.frames, 2);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_before_first_frame() {
        let (reader, closes) = StubReader::with_frames(5);
        let mut session = session(vec![]);
        session.stop_flag().store(true, Ordering::Relaxed);
        let mut sink = RecordingSink::default();

        let summary = session.run(file_source(), Box::new(reader), &mut sink).unwrap();

        assert_eq!(summary.end, SessionEnd::Stopped);
        assert_eq!(summary.frames, 0);
        assert!(sink.counts.is_empty());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_read_error_ends_session_and_closes_once() {
        let (reader, closes) = StubReader::new(vec![Scripted::Frame, Scripted::Fail, Scripted::Frame]);
        let mut sink = RecordingSink::default();

        let err = session(vec![])
            .run(file_source(), Box::new(reader), &mut sink)
            .unwrap_err();

        assert!(matches!(err, SessionError::Frame { index: 1, .. }));
        assert_eq!(sink.frames, 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_detector_error_ends_session_and_closes_once() {
        let (reader, closes) = StubReader::with_frames(3);
        let mut sink = RecordingSink::default();

        let err = session_with(Box::new(FailingDetector))
            .run(file_source(), Box::new(reader), &mut sink)
            .unwrap_err();

        assert!(err.to_string().contains("inference failed"));
        assert_eq!(sink.frames, 0);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_camera_open_failure_is_camera_unavailable() {
        let (mut reader, closes) = StubReader::with_frames(1);
        reader.fail_open = true;
        let mut sink = RecordingSink::default();

        let err = session(vec![])
            .run(VideoSource::Camera { index: 0 }, Box::new(reader), &mut sink)
            .unwrap_err();

        assert!(matches!(err, SessionError::CameraUnavailable { index: 0, .. }));
        assert!(sink.events.is_empty());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_file_open_failure_is_video_unreadable() {
        let (mut reader, closes) = StubReader::with_frames(1);
        reader.fail_open = true;
        let mut sink = RecordingSink::default();

        let err = session(vec![])
            .run(file_source(), Box::new(reader), &mut sink)
            .unwrap_err();

        assert!(matches!(err, SessionError::VideoUnreadable { ref video, .. } if video == "clip.mp4"));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_upload_temp_file_removed_on_every_exit() {
        for fail in [false, true] {
            let upload = UploadedVideo::stage("walk.mp4", &b"bytes"[..]).unwrap();
            let path = upload.path().to_path_buf();
            let script = if fail {
                vec![Scripted::Fail]
            } else {
                vec![Scripted::Frame, Scripted::Frame]
            };
            let (reader, closes) = StubReader::new(script);
            let opened = reader.opened_path.clone();
            let mut sink = RecordingSink::default();

            let result = session(vec![]).run(VideoSource::Upload(upload), Box::new(reader), &mut sink);

            assert_eq!(result.is_err(), fail);
            assert_eq!(opened.lock().unwrap().as_deref(), Some(path.as_path()));
            assert!(!path.exists());
            assert_eq!(closes.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_upload_error_maps_to_session_error() {
        let err: SessionError = UploadedVideo::stage("notes.txt", &b""[..]).unwrap_err().into();
        assert!(matches!(err, SessionError::UnsupportedExtension { ref extension } if extension == "txt"));
    }

    #[test]
    fn test_summary_throughput() {
        let summary = SessionSummary {
            end: SessionEnd::EndOfStream,
            frames: 30,
            elapsed: Duration::from_secs(2),
            peak_count: 1,
        };
        approx::assert_relative_eq!(summary.throughput(), 15.0);

        let empty = SessionSummary {
            elapsed: Duration::ZERO,
            ..summary
        };
        assert_eq!(empty.throughput(), 0.0);
    }
}
