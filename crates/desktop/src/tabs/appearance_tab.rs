use iced::widget::{checkbox, column, pick_list, row, slider, text, Column, Space};
use iced::{Alignment, Element, Theme};

use crate::app::{scaled, Message, StatusLevel};
use crate::settings::{Appearance, Settings};
use crate::tabs::main_tab::status_color;

const FONT_SCALE_RANGE: std::ops::RangeInclusive<f32> = 0.8..=1.5;

pub fn view<'a>(settings: &Settings, theme: &Theme) -> Element<'a, Message> {
    let fs = settings.font_scale;

    let mode_row = row![
        text("Mode").size(scaled(13.0, fs)),
        pick_list(
            Appearance::ALL,
            Some(settings.appearance),
            Message::AppearanceChanged
        )
        .text_size(scaled(13.0, fs)),
    ]
    .spacing(12)
    .align_y(Alignment::Center);

    let font_row = row![
        slider(FONT_SCALE_RANGE, settings.font_scale, Message::FontScaleChanged).step(0.05),
        text(format!("{:.0}%", settings.font_scale * 100.0)).size(scaled(13.0, fs)),
    ]
    .spacing(12)
    .align_y(Alignment::Center);

    // Sample of every status colour so contrast can be judged in place.
    let samples = [
        (StatusLevel::Success, "Model loaded"),
        (StatusLevel::Info, "Running on camera 0"),
        (StatusLevel::Warning, "Video ended"),
        (StatusLevel::Error, "Camera 0 is unavailable"),
    ];
    let preview = Column::with_children(samples.into_iter().map(|(level, label)| {
        text(label)
            .size(scaled(13.0, fs))
            .color(status_color(level, theme))
            .into()
    }))
    .spacing(4);

    column![
        text("Theme").size(scaled(16.0, fs)),
        Space::new().height(8),
        mode_row,
        Space::new().height(12),
        checkbox(settings.high_contrast)
            .label("High contrast")
            .on_toggle(Message::HighContrastChanged)
            .text_size(scaled(13.0, fs)),
        Space::new().height(20),
        text("Font size").size(scaled(16.0, fs)),
        Space::new().height(8),
        font_row,
        Space::new().height(20),
        text("Status preview").size(scaled(16.0, fs)),
        Space::new().height(8),
        preview,
    ]
    .spacing(0)
    .into()
}
