use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// The capture opened; carries the source's metadata.
    Opened(VideoMetadata),
}

/// Receives the output of a running detection session.
///
/// Front ends decide what "display" means: the desktop app converts each
/// frame to RGBA for an image widget, the CLI logs counts and can save frames.
pub trait DisplaySink: Send {
    /// Called once per processed frame, after annotation.
    fn show_frame(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Called only when the people count differs from the previous frame.
    fn show_count(&mut self, count: usize);

    fn event(&mut self, _event: SessionEvent) {}
}

