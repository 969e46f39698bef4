use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, TryRecvError};
use iced::widget::{button, column, container, image, row, scrollable, text};
use iced::{Element, Length, Subscription, Task, Theme};

use headcount_core::pipeline::detection_session::SessionEnd;
use headcount_core::shared::constants::VIDEO_EXTENSIONS;

use crate::settings::{Appearance, Settings, SourceKind};
use crate::tabs;
use crate::theme;
use crate::workers::detection_worker::{self, SessionParams, SourceRequest, WorkerMessage};
use crate::workers::model_cache::{ModelCache, ModelState};

/// UI refresh rate while a session or model load is in flight.
const POLL_INTERVAL: Duration = Duration::from_millis(30);

// ---------------------------------------------------------------------------
// Tab enum
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Main,
    Settings,
    Appearance,
}

impl Tab {
    const ALL: &[Tab] = &[Tab::Main, Tab::Settings, Tab::Appearance];

    fn label(self) -> &'static str {
        match self {
            Tab::Main => "Main",
            Tab::Settings => "Settings",
            Tab::Appearance => "Appearance",
        }
    }
}

// ---------------------------------------------------------------------------
// Status lines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusLine {
    fn new(level: StatusLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Message {
    TabSelected(Tab),
    SourceChanged(SourceKind),
    SelectVideo,
    VideoSelected(Option<PathBuf>),
    Start,
    Stop,
    Poll,
    CameraIndexChanged(u32),
    ConfidenceChanged(u32),
    TargetFpsChanged(u32),
    RestoreDefaults,
    AppearanceChanged(Appearance),
    HighContrastChanged(bool),
    FontScaleChanged(f32),
    PollSystemTheme,
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

struct RunningSession {
    rx: Receiver<WorkerMessage>,
    stop: Arc<AtomicBool>,
}

pub struct App {
    active_tab: Tab,
    pub settings: Settings,
    pub video_path: Option<PathBuf>,
    pub frame: Option<image::Handle>,
    pub people_count: Option<usize>,
    pub model_status: StatusLine,
    pub status: Vec<StatusLine>,
    model_cache: Arc<ModelCache>,
    model_ready: bool,
    model_failed: bool,
    session: Option<RunningSession>,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        (
            Self {
                active_tab: Tab::Main,
                settings: Settings::load(),
                video_path: None,
                frame: None,
                people_count: None,
                model_status: StatusLine::new(StatusLevel::Info, "Loading model\u{2026}"),
                status: Vec::new(),
                model_cache: ModelCache::new(),
                model_ready: false,
                model_failed: false,
                session: None,
            },
            Task::none(),
        )
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Start is offered once a source is chosen and the model has not failed.
    pub fn can_start(&self) -> bool {
        if self.is_running() || self.model_failed {
            return false;
        }
        match self.settings.source {
            SourceKind::Camera => true,
            SourceKind::VideoFile => self.video_path.is_some(),
        }
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::TabSelected(tab) => {
                self.active_tab = tab;
            }
            Message::SourceChanged(kind) => {
                self.settings.source = kind;
                self.settings.save();
            }
            Message::SelectVideo => {
                return Task::perform(
                    async {
                        rfd::AsyncFileDialog::new()
                            .set_title("Select a video")
                            .add_filter("Video Files", VIDEO_EXTENSIONS)
                            .pick_file()
                            .await
                            .map(|h| h.path().to_path_buf())
                    },
                    Message::VideoSelected,
                );
            }
            Message::VideoSelected(Some(path)) => {
                self.video_path = Some(path);
            }
            Message::VideoSelected(None) => {}
            Message::Start => self.start_session(),
            Message::Stop => {
                if let Some(session) = &self.session {
                    session.stop.store(true, Ordering::Relaxed);
                }
            }
            Message::Poll => {
                self.poll_model();
                self.drain_worker();
            }
            Message::CameraIndexChanged(index) => {
                self.settings.camera_index = index;
                self.settings.save();
            }
            Message::ConfidenceChanged(val) => {
                self.settings.confidence = val;
                self.settings.save();
            }
            Message::TargetFpsChanged(val) => {
                self.settings.target_fps = val.max(1);
                self.settings.save();
            }
            Message::RestoreDefaults => {
                self.settings.restore_detection_defaults();
                self.settings.save();
            }
            Message::AppearanceChanged(appearance) => {
                self.settings.appearance = appearance;
                self.settings.save();
            }
            Message::HighContrastChanged(enabled) => {
                self.settings.high_contrast = enabled;
                self.settings.save();
            }
            Message::FontScaleChanged(scale) => {
                self.settings.font_scale = scale;
                self.settings.save();
            }
            Message::PollSystemTheme => {
                // Theme is resolved fresh in theme() on every render.
            }
        }
        Task::none()
    }

    fn start_session(&mut self) {
        if !self.can_start() {
            return;
        }
        self.status.clear();
        self.frame = None;
        self.people_count = None;

        let source = match self.settings.source {
            SourceKind::Camera => SourceRequest::Camera {
                index: self.settings.camera_index,
            },
            SourceKind::VideoFile => {
                let Some(path) = self.video_path.clone() else {
                    return;
                };
                SourceRequest::Video(path)
            }
        };

        let info = match &source {
            SourceRequest::Camera { index } => format!("Starting camera {index}\u{2026}"),
            SourceRequest::Video(path) => format!("Processing {}\u{2026}", path.display()),
        };
        self.status.push(StatusLine::new(StatusLevel::Info, info));

        let (rx, stop) = detection_worker::spawn(SessionParams {
            source,
            confidence: self.settings.confidence_threshold(),
            target_fps: self.settings.target_fps.max(1) as f64,
            model_cache: self.model_cache.clone(),
        });
        self.session = Some(RunningSession { rx, stop });
    }

    fn poll_model(&mut self) {
        if self.model_ready || self.model_failed {
            return;
        }
        match self.model_cache.state() {
            ModelState::Loading { downloaded, total } if total > 0 => {
                let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
                self.model_status =
                    StatusLine::new(StatusLevel::Info, format!("Downloading model\u{2026} {pct}%"));
            }
            ModelState::Loading { .. } => {}
            ModelState::Ready(_) => {
                self.model_ready = true;
                self.model_status = StatusLine::new(StatusLevel::Success, "Model loaded");
            }
            ModelState::Failed(e) => {
                self.model_failed = true;
                self.model_status =
                    StatusLine::new(StatusLevel::Error, format!("Model unavailable: {e}"));
            }
        }
    }

    /// Applies everything the worker sent since the last poll. Only the
    /// newest frame is turned into an image handle.
    fn drain_worker(&mut self) {
        let Some(session) = &self.session else {
            return;
        };

        let mut latest_frame = None;
        let mut finished = false;
        loop {
            match session.rx.try_recv() {
                Ok(WorkerMessage::Opened(source)) => {
                    self.status.push(StatusLine::new(
                        StatusLevel::Success,
                        format!("Opened {source} successfully"),
                    ));
                }
                Ok(WorkerMessage::Frame {
                    width,
                    height,
                    rgba,
                }) => latest_frame = Some((width, height, rgba)),
                Ok(WorkerMessage::Count(count)) => self.people_count = Some(count),
                Ok(WorkerMessage::Finished(end)) => {
                    let line = match end {
                        SessionEnd::Stopped => {
                            StatusLine::new(StatusLevel::Info, "Detection stopped")
                        }
                        SessionEnd::EndOfStream => {
                            StatusLine::new(StatusLevel::Warning, "Video ended")
                        }
                    };
                    self.status.push(line);
                    finished = true;
                    break;
                }
                Ok(WorkerMessage::Error(e)) => {
                    self.status.push(StatusLine::new(StatusLevel::Error, e));
                    finished = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    finished = true;
                    break;
                }
            }
        }

        if let Some((width, height, rgba)) = latest_frame {
            self.frame = Some(image::Handle::from_rgba(width, height, rgba));
        }
        if finished {
            self.session = None;
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let fs = self.settings.font_scale;

        let tab_bar = row(Tab::ALL
            .iter()
            .map(|&tab| {
                let label = text(tab.label()).size(scaled(13.0, fs));
                let btn = button(label)
                    .on_press(Message::TabSelected(tab))
                    .padding([6, 14]);
                if tab == self.active_tab {
                    btn.style(button::primary).into()
                } else {
                    btn.style(button::text).into()
                }
            })
            .collect::<Vec<_>>())
        .spacing(2);

        let content: Element<'_, Message> = match self.active_tab {
            Tab::Main => tabs::main_tab::view(self, &self.theme()),
            Tab::Settings => tabs::settings_tab::view(&self.settings),
            Tab::Appearance => tabs::appearance_tab::view(&self.settings, &self.theme()),
        };

        let tab_content = container(scrollable(content).height(Length::Fill))
            .padding(16)
            .height(Length::Fill);

        column![tab_bar, tab_content]
            .spacing(0)
            .height(Length::Fill)
            .into()
    }

    pub fn theme(&self) -> Theme {
        theme::resolve_theme(self.settings.appearance, self.settings.high_contrast)
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let mut subs = Vec::new();
        if self.is_running() || !(self.model_ready || self.model_failed) {
            subs.push(iced::time::every(POLL_INTERVAL).map(|_| Message::Poll));
        }
        if self.settings.appearance == Appearance::System {
            subs.push(iced::time::every(Duration::from_secs(2)).map(|_| Message::PollSystemTheme));
        }
        Subscription::batch(subs)
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(session) = &self.session {
            session.stop.store(true, Ordering::Relaxed);
        }
    }
}

/// Scale a base font size by the user's font_scale setting.
pub fn scaled(base: f32, font_scale: f32) -> f32 {
    (base * font_scale).round()
}
