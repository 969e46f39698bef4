use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

use super::bitmap_font;

/// Gap between the label background's top edge and the text, plus the text
/// baseline offset above the box.
const LABEL_PADDING: i32 = 10;
const TEXT_BASELINE_OFFSET: i32 = 5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxStyle {
    pub box_color: [u8; 3],
    pub text_color: [u8; 3],
    pub thickness: u32,
    pub text_scale: u32,
}

impl Default for BoxStyle {
    fn default() -> Self {
        Self {
            box_color: [0, 255, 0],
            text_color: [0, 0, 0],
            thickness: 2,
            text_scale: 2,
        }
    }
}

/// Draws a rectangle around the detection and a filled label tab above it.
///
/// Everything is clipped to the frame, so boxes touching the top edge lose
/// their label rather than panicking.
pub struct BoxAnnotator {
    style: BoxStyle,
}

impl BoxAnnotator {
    pub fn new(style: BoxStyle) -> Self {
        Self { style }
    }

    fn draw(&self, img: &mut RgbImage, detection: &Detection, label: &str) {
        let bbox = detection.bbox;
        let box_color = Rgb(self.style.box_color);

        // Nested 1px outlines, outermost on the box edge.
        for inset in 0..self.style.thickness {
            let w = bbox.width().saturating_sub(2 * inset);
            let h = bbox.height().saturating_sub(2 * inset);
            if w == 0 || h == 0 {
                break;
            }
            let rect = Rect::at(bbox.x1 + inset as i32, bbox.y1 + inset as i32).of_size(w, h);
            draw_hollow_rect_mut(img, rect, box_color);
        }

        let scale = self.style.text_scale;
        let (text_w, text_h) = bitmap_font::text_size(label, scale);
        if text_w == 0 {
            return;
        }

        let tab_top = bbox.y1 - text_h as i32 - LABEL_PADDING;
        let tab = Rect::at(bbox.x1, tab_top).of_size(text_w, text_h + LABEL_PADDING as u32);
        draw_filled_rect_mut(img, tab, box_color);

        let text_top = bbox.y1 - TEXT_BASELINE_OFFSET - text_h as i32;
        let text_color = Rgb(self.style.text_color);
        for (dx, dy) in bitmap_font::lit_cells(label, scale) {
            let cell = Rect::at(bbox.x1 + dx, text_top + dy).of_size(scale, scale);
            draw_filled_rect_mut(img, cell, text_color);
        }
    }
}

impl Default for BoxAnnotator {
    fn default() -> Self {
        Self::new(BoxStyle::default())
    }
}

impl FrameAnnotator for BoxAnnotator {
    fn annotate(
        &self,
        frame: &mut Frame,
        detection: &Detection,
        label: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if frame.channels() != 3 {
            return Err(format!("cannot annotate {}-channel frame", frame.channels()).into());
        }
        let (width, height) = (frame.width(), frame.height());

        let data = frame.replace_data(Vec::new());
        let mut img = RgbImage::from_raw(width, height, data)
            .ok_or("frame buffer does not match its dimensions")?;
        self.draw(&mut img, detection, label);
        frame.replace_data(img.into_raw());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::detection::BoundingBox;

    fn blank(width: u32, height: u32) -> Frame {
        Frame::new(vec![40u8; (width * height * 3) as usize], width, height, 3, 0)
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * frame.width() + x) * 3) as usize;
        [frame.data()[i], frame.data()[i + 1], frame.data()[i + 2]]
    }

    fn person(x1: i32, y1: i32, x2: i32, y2: i32) -> Detection {
        Detection {
            class_id: 0,
            confidence: 0.87,
            bbox: BoundingBox::new(x1, y1, x2, y2),
        }
    }

    #[test]
    fn test_draws_two_pixel_outline() {
        let mut frame = blank(200, 200);
        BoxAnnotator::default()
            .annotate(&mut frame, &person(50, 80, 150, 180), "Person 0.87")
            .unwrap();

        let green = [0, 255, 0];
        assert_eq!(pixel(&frame, 100, 179), green);
        assert_eq!(pixel(&frame, 100, 178), green);
        assert_eq!(pixel(&frame, 100, 177), [40, 40, 40]);
        assert_eq!(pixel(&frame, 50, 130), green);
        assert_eq!(pixel(&frame, 51, 130), green);
        assert_eq!(pixel(&frame, 100, 130), [40, 40, 40], "interior untouched");
    }

    #[test]
    fn test_label_tab_sits_above_box() {
        let mut frame = blank(200, 200);
        BoxAnnotator::default()
            .annotate(&mut frame, &person(50, 80, 150, 180), "Person 0.87")
            .unwrap();

        // Tab spans y in [80 - 14 - 10, 80); row 57 is above the text cells.
        assert_eq!(pixel(&frame, 52, 57), [0, 255, 0]);
        assert_eq!(pixel(&frame, 52, 55), [40, 40, 40]);
        // "P" top-left cell: text top = 80 - 5 - 14 = 61
        assert_eq!(pixel(&frame, 50, 61), [0, 0, 0]);
    }

    #[test]
    fn test_box_at_frame_edge_is_clipped() {
        let mut frame = blank(64, 48);
        BoxAnnotator::default()
            .annotate(&mut frame, &person(0, 0, 64, 48), "Person 1.00")
            .unwrap();
        assert_eq!(pixel(&frame, 0, 0), [0, 255, 0]);
        assert_eq!(frame.data().len(), 64 * 48 * 3);
    }

    #[test]
    fn test_thin_box_does_not_panic() {
        let mut frame = blank(20, 20);
        BoxAnnotator::default()
            .annotate(&mut frame, &person(5, 5, 6, 15), "Person 0.50")
            .unwrap();
        assert_eq!(pixel(&frame, 5, 10), [0, 255, 0]);
    }

    #[test]
    fn test_rejects_non_rgb_frame() {
        let mut frame = Frame::new(vec![0u8; 16], 4, 4, 1, 0);
        let result = BoxAnnotator::default().annotate(&mut frame, &person(0, 0, 2, 2), "Person");
        assert!(result.is_err());
        assert_eq!(frame.data().len(), 16);
    }
}
