use std::time::Duration;

pub const YOLO_MODEL_NAME: &str = "yolov8n.onnx";

/// Environment variable consulted for a model download URL.
pub const MODEL_URL_ENV: &str = "HEADCOUNT_MODEL_URL";

/// COCO class index reserved for people.
pub const PERSON_CLASS_ID: u32 = 0;

pub const PERSON_LABEL: &str = "Person";

pub const DEFAULT_CONFIDENCE: f32 = 0.25;

pub const DEFAULT_CAMERA_INDEX: u32 = 0;

pub const DEFAULT_TARGET_FPS: f64 = 15.0;

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];

/// Minimum wall-clock time per loop iteration at `fps` frames per second.
pub fn frame_interval(fps: f64) -> Duration {
    Duration::from_secs_f64(1.0 / fps)
}

pub fn is_video_extension(ext: &str) -> bool {
    VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}
