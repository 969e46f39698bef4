use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::constants::PERSON_LABEL;
use crate::shared::frame::Frame;

/// A frame with every detected person boxed and labeled.
#[derive(Debug)]
pub struct AnnotatedFrame {
    pub frame: Frame,
    pub people_count: usize,
}

/// Per-frame pipeline: detect → keep people → draw → count.
pub struct AnnotatePeopleUseCase {
    detector: Box<dyn ObjectDetector>,
    annotator: Box<dyn FrameAnnotator>,
}

impl AnnotatePeopleUseCase {
    pub fn new(detector: Box<dyn ObjectDetector>, annotator: Box<dyn FrameAnnotator>) -> Self {
        Self {
            detector,
            annotator,
        }
    }

    /// Runs the detector once and draws one labeled box per person.
    ///
    /// Detector errors propagate unchanged. With no people in view the
    /// frame comes back untouched.
    pub fn execute(&mut self, mut frame: Frame) -> Result<AnnotatedFrame, Box<dyn std::error::Error>> {
        let detections = self.detector.detect(&frame)?;

        let mut people_count = 0;
        for detection in detections.iter().filter(|d| d.is_person()) {
            self.annotator
                .annotate(&mut frame, detection, &person_label(detection.confidence))?;
            people_count += 1;
        }

        Ok(AnnotatedFrame {
            frame,
            people_count,
        })
    }
}

pub fn person_label(confidence: f32) -> String {
    format!("{PERSON_LABEL} {confidence:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::infrastructure::box_annotator::BoxAnnotator;
    use crate::shared::detection::{BoundingBox, Detection};
    use rstest::rstest;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubDetector {
        detections: Vec<Detection>,
    }

    impl ObjectDetector for StubDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            Ok(self.detections.clone())
        }
    }

    struct FailingDetector;

    impl ObjectDetector for FailingDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            Err("inference failed".into())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingAnnotator {
        calls: Arc<Mutex<Vec<(Detection, String)>>>,
    }

    impl FrameAnnotator for RecordingAnnotator {
        fn annotate(
            &self,
            _frame: &mut Frame,
            detection: &Detection,
            label: &str,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.calls
                .lock()
                .unwrap()
                .push((detection.clone(), label.to_string()));
            Ok(())
        }
    }

    // --- Helpers ---

    fn frame() -> Frame {
        let data = (0..64 * 48 * 3).map(|i| (i % 251) as u8).collect();
        Frame::new(data, 64, 48, 3, 0)
    }

    fn detection(class_id: u32, confidence: f32) -> Detection {
        Detection {
            class_id,
            confidence,
            bbox: BoundingBox::new(10, 20, 30, 40),
        }
    }

    fn use_case(detections: Vec<Detection>) -> (AnnotatePeopleUseCase, RecordingAnnotator) {
        let annotator = RecordingAnnotator::default();
        let uc = AnnotatePeopleUseCase::new(
            Box::new(StubDetector { detections }),
            Box::new(annotator.clone()),
        );
        (uc, annotator)
    }

    #[rstest]
    #[case(vec![], 0)]
    #[case(vec![detection(0, 0.9)], 1)]
    #[case(vec![detection(0, 0.9), detection(2, 0.8), detection(0, 0.4)], 2)]
    #[case(vec![detection(0, 0.7), detection(0, 0.7)], 2)]
    fn test_count_matches_rectangles_drawn(
        #[case] detections: Vec<Detection>,
        #[case] expected: usize,
    ) {
        let (mut uc, annotator) = use_case(detections);
        let result = uc.execute(frame()).unwrap();
        assert_eq!(result.people_count, expected);
        assert_eq!(annotator.calls.lock().unwrap().len(), expected);
    }

    #[test]
    fn test_non_person_detections_are_not_drawn() {
        let (mut uc, annotator) = use_case(vec![detection(2, 0.99), detection(0, 0.5)]);
        uc.execute(frame()).unwrap();
        let calls = annotator.calls.lock().unwrap();
        assert!(calls.iter().all(|(d, _)| d.class_id == 0));
    }

    #[test]
    fn test_label_carries_two_decimal_confidence() {
        let (mut uc, annotator) = use_case(vec![detection(0, 0.876)]);
        uc.execute(frame()).unwrap();
        assert_eq!(annotator.calls.lock().unwrap()[0].1, "Person 0.88");
    }

    #[test]
    fn test_no_people_leaves_frame_identical() {
        let mut uc = AnnotatePeopleUseCase::new(
            Box::new(StubDetector { detections: vec![] }),
            Box::new(BoxAnnotator::default()),
        );
        let result = uc.execute(frame()).unwrap();
        assert_eq!(result.frame, frame());
        assert_eq!(result.people_count, 0);
    }

    #[test]
    fn test_only_non_people_leaves_frame_identical() {
        let mut uc = AnnotatePeopleUseCase::new(
            Box::new(StubDetector {
                detections: vec![detection(1, 0.9), detection(56, 0.6)],
            }),
            Box::new(BoxAnnotator::default()),
        );
        let result = uc.execute(frame()).unwrap();
        assert_eq!(result.frame, frame());
        assert_eq!(result.people_count, 0);
    }

    #[test]
    fn test_person_changes_pixels() {
        let mut uc = AnnotatePeopleUseCase::new(
            Box::new(StubDetector {
                detections: vec![detection(0, 0.9)],
            }),
            Box::new(BoxAnnotator::default()),
        );
        let result = uc.execute(frame()).unwrap();
        assert_ne!(result.frame, frame());
        assert_eq!(result.frame.data().len(), frame().data().len());
    }

    #[test]
    fn test_detector_error_propagates() {
        let mut uc = AnnotatePeopleUseCase::new(
            Box::new(FailingDetector),
            Box::new(RecordingAnnotator::default()),
        );
        let err = uc.execute(frame()).unwrap_err();
        assert_eq!(err.to_string(), "inference failed");
    }

    #[rstest]
    #[case(0.5, "Person 0.50")]
    #[case(1.0, "Person 1.00")]
    #[case(0.254, "Person 0.25")]
    fn test_person_label(#[case] confidence: f32, #[case] expected: &str) {
        assert_eq!(person_label(confidence), expected);
    }
}
