use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// Domain interface for drawing one labeled detection onto a frame.
///
/// Implementations modify the frame in place and clip to its bounds.
pub trait FrameAnnotator: Send {
    fn annotate(
        &self,
        frame: &mut Frame,
        detection: &Detection,
        label: &str,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
