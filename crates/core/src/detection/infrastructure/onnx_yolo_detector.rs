/// YOLOv8 COCO detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, class-aware NMS and mapping
/// boxes back into frame coordinates.
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::detection::{BoundingBox, Detection};
use crate::shared::frame::Frame;

use super::execution_provider::preferred_execution_providers;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

const NMS_IOU_THRESH: f32 = 0.45;

/// Box coordinates precede the per-class scores in every prediction row.
const BOX_VALUES: usize = 4;

/// Classes in the COCO-trained model.
const COCO_CLASSES: usize = 80;

/// A loaded model session, shared read-mostly by every detector instance.
pub type SharedSession = Arc<Mutex<ort::session::Session>>;

/// Load a YOLO ONNX model once for the life of the process.
///
/// Returns the shared session and its square input size. The size is read
/// from the model's NCHW input shape, falling back to 640 when dynamic.
pub fn load_session(model_path: &Path) -> Result<(SharedSession, u32), Box<dyn std::error::Error>> {
    let session = ort::session::Session::builder()?
        .with_execution_providers(preferred_execution_providers())?
        .commit_from_file(model_path)?;

    let input_size = session
        .inputs()
        .first()
        .and_then(|input| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                if shape.len() >= 4 && shape[2] > 0 {
                    Some(shape[2] as u32)
                } else {
                    None
                }
            } else {
                None
            }
        })
        .unwrap_or(DEFAULT_INPUT_SIZE);

    log::info!(
        "Loaded detection model {} (input {input_size}x{input_size})",
        model_path.display()
    );
    Ok((Arc::new(Mutex::new(session)), input_size))
}

pub struct OnnxYoloDetector {
    session: SharedSession,
    confidence: f32,
    input_size: u32,
}

impl OnnxYoloDetector {
    pub fn new(model_path: &Path, confidence: f32) -> Result<Self, Box<dyn std::error::Error>> {
        let (session, input_size) = load_session(model_path)?;
        Ok(Self::from_shared_session(session, input_size, confidence))
    }

    /// Build a detector over an already-loaded session.
    pub fn from_shared_session(session: SharedSession, input_size: u32, confidence: f32) -> Self {
        Self {
            session,
            confidence,
            input_size,
        }
    }
}

impl ObjectDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let letterbox = Letterbox::fit(frame.width(), frame.height(), self.input_size);
        let input_tensor = letterbox.tensor(frame);

        let (shape, data) = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| "detection model session lock poisoned")?;
            let input_value = ort::value::Tensor::from_array(input_tensor)?;
            let outputs = session.run(ort::inputs![input_value])?;
            if outputs.len() == 0 {
                return Err("YOLO model produced no outputs".into());
            }
            let tensor = outputs[0].try_extract_array::<f32>()?;
            let shape = tensor.shape().to_vec();
            let data: Vec<f32> = tensor.iter().copied().collect();
            (shape, data)
        };

        let mut candidates = parse_predictions(&data, &shape, COCO_CLASSES, self.confidence)?;
        let kept = nms(&mut candidates, NMS_IOU_THRESH);

        Ok(kept
            .iter()
            .filter_map(|c| c.to_detection(&letterbox, frame.width(), frame.height()))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Scale and padding that map a frame into the square model input.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    target: u32,
    scale: f32,
    pad_x: u32,
    pad_y: u32,
    new_w: u32,
    new_h: u32,
}

impl Letterbox {
    fn fit(width: u32, height: u32, target: u32) -> Self {
        let scale = (target as f32 / width as f32).min(target as f32 / height as f32);
        let new_w = ((width as f32 * scale).round() as u32).min(target);
        let new_h = ((height as f32 * scale).round() as u32).min(target);
        Self {
            target,
            scale,
            pad_x: (target - new_w) / 2,
            pad_y: (target - new_h) / 2,
            new_w,
            new_h,
        }
    }

    /// Nearest-neighbor resize into a 114-gray padded NCHW tensor in `[0, 1]`.
    fn tensor(&self, frame: &Frame) -> ndarray::Array4<f32> {
        let size = self.target as usize;
        let gray = 114.0f32 / 255.0;
        let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, size, size), gray);

        let src = frame.as_ndarray();
        let src_h = frame.height() as usize;
        let src_w = frame.width() as usize;

        for y in 0..self.new_h as usize {
            let src_y = ((y as f32 / self.scale) as usize).min(src_h - 1);
            for x in 0..self.new_w as usize {
                let src_x = ((x as f32 / self.scale) as usize).min(src_w - 1);
                let ty = self.pad_y as usize + y;
                let tx = self.pad_x as usize + x;
                for c in 0..3 {
                    tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
                }
            }
        }

        tensor
    }

    fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_x as f32) / self.scale,
            (y - self.pad_y as f32) / self.scale,
        )
    }
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

/// A prediction in letterbox coordinates, before NMS.
#[derive(Clone, Debug, PartialEq)]
struct Candidate {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    class_id: u32,
    confidence: f32,
}

impl Candidate {
    fn corners(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Map back to frame pixels and clamp. Returns `None` for boxes that
    /// collapse to nothing once clipped.
    fn to_detection(&self, letterbox: &Letterbox, width: u32, height: u32) -> Option<Detection> {
        let (x1, y1) = letterbox.unmap(self.x1, self.y1);
        let (x2, y2) = letterbox.unmap(self.x2, self.y2);

        let clamp_x = |v: f32| v.clamp(0.0, width as f32) as i32;
        let clamp_y = |v: f32| v.clamp(0.0, height as f32) as i32;
        let (x1, y1, x2, y2) = (clamp_x(x1), clamp_y(y1), clamp_x(x2), clamp_y(y2));
        if x1 >= x2 || y1 >= y2 {
            return None;
        }

        Some(Detection {
            class_id: self.class_id,
            confidence: self.confidence.clamp(0.0, 1.0),
            bbox: BoundingBox::new(x1, y1, x2, y2),
        })
    }
}

/// Decode raw YOLOv8 output into candidates above `confidence`.
///
/// Accepts `[1, 4 + classes, anchors]` (the native export) and the
/// transposed `[1, anchors, 4 + classes]`. The layout is told apart by
/// which axis holds `4 + num_classes` values, the native one winning when
/// both do (square outputs from small input sizes). Row layout is
/// `[cx, cy, w, h, score_0, .., score_n]`; the best class score is the
/// confidence, as YOLOv8 has no separate objectness value.
fn parse_predictions(
    data: &[f32],
    shape: &[usize],
    num_classes: usize,
    confidence: f32,
) -> Result<Vec<Candidate>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
    }
    if num_classes == 0 {
        return Err(format!("YOLO output has no class scores: {shape:?}").into());
    }
    let num_feats = BOX_VALUES + num_classes;
    let (num_anchors, features_first) = if shape[1] == num_feats {
        (shape[2], true)
    } else if shape[2] == num_feats {
        (shape[1], false)
    } else {
        return Err(format!(
            "YOLO output shape {shape:?} has no axis of {num_feats} values"
        )
        .into());
    };
    if data.len() < num_anchors * num_feats {
        return Err(format!(
            "YOLO output holds {} values, shape {shape:?} needs {}",
            data.len(),
            num_anchors * num_feats
        )
        .into());
    }

    let value = |anchor: usize, feat: usize| {
        if features_first {
            data[feat * num_anchors + anchor]
        } else {
            data[anchor * num_feats + feat]
        }
    };

    let mut candidates = Vec::new();
    for anchor in 0..num_anchors {
        let (class_id, score) = (BOX_VALUES..num_feats)
            .map(|f| ((f - BOX_VALUES) as u32, value(anchor, f)))
            .fold((0u32, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        if score < confidence {
            continue;
        }

        let cx = value(anchor, 0);
        let cy = value(anchor, 1);
        let w = value(anchor, 2);
        let h = value(anchor, 3);

        candidates.push(Candidate {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
            class_id,
            confidence: score,
        });
    }

    Ok(candidates)
}

/// Greedy class-aware NMS: sort by confidence descending, suppress
/// overlapping boxes of the same class only.
fn nms(candidates: &mut [Candidate], iou_thresh: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; candidates.len()];

    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(candidates[i].clone());
        for j in (i + 1)..candidates.len() {
            if suppressed[j] || candidates[j].class_id != candidates[i].class_id {
                continue;
            }
            if bbox_iou(&candidates[i].corners(), &candidates[j].corners()) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn bbox_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
