use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// Domain interface for a pretrained object detector.
///
/// Returns every detection the model reports for one frame, in pixel
/// coordinates of that frame. Class filtering is the caller's job.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
