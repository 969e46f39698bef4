use std::path::Path;

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Saves annotated frames with the `image` crate; the format follows the
/// path's extension.
#[derive(Default)]
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("Failed to create image from frame data")?;
        img.save(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let data = rgb.repeat((width * height) as usize);
        Frame::new(data, width, height, 3, 0)
    }

    #[test]
    fn test_write_preserves_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames").join("000001.png");
        ImageFileWriter::new()
            .write(&path, &solid(50, 40, [50, 100, 200]))
            .unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!((img.width(), img.height()), (50, 40));
        assert_eq!(img.get_pixel(49, 39).0, [50, 100, 200]);
    }

    #[test]
    fn test_write_rejects_non_rgb_frame() {
        let dir = tempfile::tempdir().unwrap();
        let frame = Frame::new(vec![0u8; 4], 2, 2, 1, 0);
        assert!(ImageFileWriter::new()
            .write(&dir.path().join("gray.png"), &frame)
            .is_err());
    }

    #[test]
    fn test_write_under_regular_file_returns_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let frame = solid(10, 10, [0, 0, 0]);
        assert!(ImageFileWriter::new()
            .write(&file.path().join("out.png"), &frame)
            .is_err());
    }
}
