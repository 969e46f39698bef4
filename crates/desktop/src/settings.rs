use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use headcount_core::shared::constants::{
    DEFAULT_CAMERA_INDEX, DEFAULT_CONFIDENCE, DEFAULT_TARGET_FPS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Camera,
    #[serde(rename = "video")]
    VideoFile,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Camera => write!(f, "Camera"),
            SourceKind::VideoFile => write!(f, "Video File"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    System,
    Dark,
    Light,
}

impl Appearance {
    pub const ALL: &[Appearance] = &[Appearance::System, Appearance::Dark, Appearance::Light];
}

impl std::fmt::Display for Appearance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Appearance::System => write!(f, "System"),
            Appearance::Dark => write!(f, "Dark"),
            Appearance::Light => write!(f, "Light"),
        }
    }
}

/// User preferences persisted as JSON between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source: SourceKind,
    pub camera_index: u32,
    /// Detection threshold in percent.
    pub confidence: u32,
    pub target_fps: u32,
    pub appearance: Appearance,
    pub high_contrast: bool,
    pub font_scale: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: SourceKind::Camera,
            camera_index: DEFAULT_CAMERA_INDEX,
            confidence: (DEFAULT_CONFIDENCE * 100.0).round() as u32,
            target_fps: DEFAULT_TARGET_FPS as u32,
            appearance: Appearance::System,
            high_contrast: false,
            font_scale: 1.0,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("headcount").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Missing or unparsable files fall back to defaults.
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) {
        let Some(path) = Self::config_path() else {
            log::warn!("No config directory; settings not saved");
            return;
        };
        if let Err(e) = self.save_to(&path) {
            log::warn!("Could not save settings to {}: {e}", path.display());
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Resets the detection options, leaving appearance alone.
    pub fn restore_detection_defaults(&mut self) {
        let defaults = Settings::default();
        self.camera_index = defaults.camera_index;
        self.confidence = defaults.confidence;
        self.target_fps = defaults.target_fps;
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence.min(100) as f32 / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_core_constants() {
        let s = Settings::default();
        assert_eq!(s.camera_index, 0);
        assert_eq!(s.confidence, 25);
        assert_eq!(s.target_fps, 15);
        assert_eq!(s.source, SourceKind::Camera);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            source: SourceKind::VideoFile,
            camera_index: 2,
            confidence: 60,
            appearance: Appearance::Dark,
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            Settings::load_from(&dir.path().join("absent.json")),
            Settings::default()
        );
    }

    #[test]
    fn test_corrupt_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_partial_file_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"camera_index": 3, "source": "video"}"#).unwrap();
        let s = Settings::load_from(&path);
        assert_eq!(s.camera_index, 3);
        assert_eq!(s.source, SourceKind::VideoFile);
        assert_eq!(s.target_fps, 15);
    }

    #[test]
    fn test_restore_detection_defaults_keeps_appearance() {
        let mut s = Settings {
            camera_index: 4,
            confidence: 90,
            target_fps: 30,
            appearance: Appearance::Light,
            font_scale: 1.3,
            ..Settings::default()
        };
        s.restore_detection_defaults();
        assert_eq!(s.camera_index, 0);
        assert_eq!(s.confidence, 25);
        assert_eq!(s.target_fps, 15);
        assert_eq!(s.appearance, Appearance::Light);
        assert_eq!(s.font_scale, 1.3);
    }

    #[test]
    fn test_confidence_threshold() {
        let s = Settings {
            confidence: 40,
            ..Settings::default()
        };
        approx::assert_relative_eq!(s.confidence_threshold(), 0.4);
    }
}
