use iced::widget::{button, column, container, image, radio, row, text, Column, Space};
use iced::{Alignment, Color, Element, Font, Length, Theme};

use crate::app::{scaled, App, Message, StatusLevel};
use crate::settings::SourceKind;
use crate::theme::muted_color;

pub fn view<'a>(app: &'a App, theme: &Theme) -> Element<'a, Message> {
    let fs = app.settings.font_scale;
    let running = app.is_running();

    let mut col = column![
        text("People Detection").size(scaled(20.0, fs)).font(Font {
            weight: iced::font::Weight::Bold,
            ..Font::DEFAULT
        }),
        Space::new().height(12),
        source_picker(app, fs),
        Space::new().height(12),
    ]
    .spacing(0);

    if app.settings.source == SourceKind::VideoFile {
        col = col
            .push(video_row(app, fs, theme))
            .push(Space::new().height(12));
    }

    let controls = row![
        button(text("Start").size(scaled(14.0, fs)))
            .on_press_maybe(app.can_start().then_some(Message::Start))
            .padding([10, 24]),
        button(text("Stop").size(scaled(14.0, fs)))
            .on_press_maybe(running.then_some(Message::Stop))
            .padding([10, 24])
            .style(button::secondary),
        Space::new().width(Length::Fill),
        people_metric(app.people_count, fs, theme),
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    col.push(controls)
        .push(Space::new().height(16))
        .push(frame_view(app, fs, theme))
        .push(Space::new().height(12))
        .push(status_lines(app, fs, theme))
        .into()
}

fn source_picker<'a>(app: &App, fs: f32) -> Element<'a, Message> {
    // Source is fixed while a session holds the capture.
    if app.is_running() {
        return text(format!("Source: {}", app.settings.source))
            .size(scaled(14.0, fs))
            .into();
    }

    let selected = Some(app.settings.source);
    let mut picker = row![].spacing(20);
    for kind in [SourceKind::Camera, SourceKind::VideoFile] {
        let choice = radio(kind.to_string(), kind, selected, Message::SourceChanged)
            .text_size(scaled(14.0, fs));
        picker = picker.push(choice);
    }
    picker.into()
}

fn video_row<'a>(app: &'a App, fs: f32, theme: &Theme) -> Element<'a, Message> {
    let name: Element<'a, Message> = match app.video_path.as_deref().and_then(|p| p.file_name()) {
        Some(name) => text(name.to_string_lossy().to_string())
            .size(scaled(14.0, fs))
            .into(),
        None => text("No video selected")
            .size(scaled(14.0, fs))
            .color(muted_color(theme))
            .into(),
    };

    let browse = button(text("Browse\u{2026}").size(scaled(13.0, fs)))
        .padding([6, 14])
        .on_press_maybe((!app.is_running()).then_some(Message::SelectVideo))
        .style(button::secondary);

    container(
        row![container(name).width(Length::Fill), browse]
            .spacing(8)
            .align_y(Alignment::Center),
    )
    .padding([12, 16])
    .style(container::rounded_box)
    .width(Length::Fill)
    .into()
}

fn people_metric<'a>(count: Option<usize>, fs: f32, theme: &Theme) -> Element<'a, Message> {
    let value = count.map_or_else(|| "-".to_string(), |c| c.to_string());
    column![
        text("People Detected")
            .size(scaled(12.0, fs))
            .color(muted_color(theme)),
        text(value).size(scaled(28.0, fs)),
    ]
    .align_x(Alignment::End)
    .into()
}

fn frame_view<'a>(app: &'a App, fs: f32, theme: &Theme) -> Element<'a, Message> {
    let content: Element<'a, Message> = match &app.frame {
        Some(handle) => image(handle.clone()).width(Length::Fill).into(),
        None => text(if app.is_running() {
            "Waiting for frames\u{2026}"
        } else {
            "No video"
        })
        .size(scaled(14.0, fs))
        .color(muted_color(theme))
        .into(),
    };

    container(content)
        .width(Length::Fill)
        .height(Length::Fixed(scaled(360.0, fs)))
        .center_x(Length::Fill)
        .center_y(Length::Fixed(scaled(360.0, fs)))
        .style(container::rounded_box)
        .into()
}

fn status_lines<'a>(app: &'a App, fs: f32, theme: &Theme) -> Element<'a, Message> {
    let lines = std::iter::once(&app.model_status)
        .chain(app.status.iter())
        .map(|line| {
            text(line.text.clone())
                .size(scaled(13.0, fs))
                .color(status_color(line.level, theme))
                .into()
        });
    Column::with_children(lines).spacing(4).into()
}

pub fn status_color(level: StatusLevel, theme: &Theme) -> Color {
    let palette = theme.extended_palette();
    match level {
        StatusLevel::Success => palette.success.base.color,
        StatusLevel::Info => palette.primary.base.color,
        StatusLevel::Warning => palette.warning.base.color,
        StatusLevel::Error => palette.danger.base.color,
    }
}
