use iced::widget::{button, column, pick_list, row, slider, text, Space};
use iced::{Alignment, Element};

use crate::app::{scaled, Message};
use crate::settings::Settings;

/// Camera indices offered in the picker.
const CAMERA_INDICES: [u32; 10] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9];

pub fn view<'a>(settings: &Settings) -> Element<'a, Message> {
    let fs = settings.font_scale;

    column![
        text("Camera").size(scaled(16.0, fs)),
        Space::new().height(8),
        row![
            text("Device index").size(scaled(13.0, fs)),
            pick_list(
                CAMERA_INDICES,
                Some(settings.camera_index),
                Message::CameraIndexChanged
            )
            .text_size(scaled(13.0, fs)),
        ]
        .spacing(12)
        .align_y(Alignment::Center),
        Space::new().height(20),
        text("Detection").size(scaled(16.0, fs)),
        Space::new().height(8),
        row![
            text("Confidence").size(scaled(13.0, fs)),
            slider(5..=95, settings.confidence, Message::ConfidenceChanged),
            text(format!("{}%", settings.confidence)).size(scaled(13.0, fs)),
        ]
        .spacing(12)
        .align_y(Alignment::Center),
        Space::new().height(12),
        row![
            text("Target rate").size(scaled(13.0, fs)),
            slider(1..=60, settings.target_fps, Message::TargetFpsChanged),
            text(format!("{} fps", settings.target_fps)).size(scaled(13.0, fs)),
        ]
        .spacing(12)
        .align_y(Alignment::Center),
        Space::new().height(24),
        button(text("Restore defaults").size(scaled(13.0, fs)))
            .on_press(Message::RestoreDefaults)
            .padding([8, 16])
            .style(button::secondary),
    ]
    .spacing(0)
    .into()
}
