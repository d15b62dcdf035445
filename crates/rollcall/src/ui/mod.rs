//! Terminal UI: a registration tab and a live attendance tab.
//!
//! One `select!` loop drives the preview interval, the live interval and
//! terminal input. Nothing runs concurrently; a mark that waits on
//! geolocation holds up every redraw until it returns.

mod ascii;
mod view;

pub use ascii::AsciiGrid;

use crate::app::AttendanceApp;
use crate::config::Config;
use crate::geo::GeoResolver;
use crate::live::{FaceOverlay, LiveFrame};
use crate::marker::MarkOutcome;
use crate::register::RegisterError;
use chrono::Local;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use image::RgbImage;
use rollcall_core::FaceEngine;
use rollcall_hw::FrameSource;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Register,
    Live,
}

impl Tab {
    pub const ALL: [Tab; 2] = [Tab::Register, Tab::Live];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Register => "Register Employee",
            Tab::Live => "Live Attendance",
        }
    }

    fn index(self) -> usize {
        match self {
            Tab::Register => 0,
            Tab::Live => 1,
        }
    }

    fn toggled(self) -> Self {
        match self {
            Tab::Register => Tab::Live,
            Tab::Live => Tab::Register,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// Modal message; swallows input until dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

/// What the loop should do after a key press.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    None,
    Register(String),
    Quit,
}

/// Latest annotated live frame.
pub struct LiveView {
    pub image: RgbImage,
    pub faces: Vec<FaceOverlay>,
    pub clock: String,
}

pub struct UiState {
    pub tab: Tab,
    pub name_input: String,
    pub notice: Option<Notice>,
    pub preview: Option<RgbImage>,
    pub live: Option<LiveView>,
    /// "Marked: <name>" banner.
    pub status: Option<String>,
    /// "Last: <name> at HH:MM:SS".
    pub last_mark: Option<String>,
    pub employees: usize,
}

impl UiState {
    pub fn new(employees: usize) -> Self {
        Self {
            tab: Tab::Register,
            name_input: String::new(),
            notice: None,
            preview: None,
            live: None,
            status: None,
            last_mark: None,
            employees,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.kind != KeyEventKind::Press {
            return Action::None;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Action::Quit;
        }

        if self.notice.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.notice = None;
            }
            return Action::None;
        }

        match key.code {
            KeyCode::Esc => Action::Quit,
            KeyCode::Tab | KeyCode::BackTab => {
                self.tab = self.tab.toggled();
                Action::None
            }
            KeyCode::Enter if self.tab == Tab::Register => Action::Register(self.name_input.clone()),
            KeyCode::Backspace if self.tab == Tab::Register => {
                self.name_input.pop();
                Action::None
            }
            KeyCode::Char(c) if self.tab == Tab::Register => {
                self.name_input.push(c);
                Action::None
            }
            _ => Action::None,
        }
    }

    pub fn registration_succeeded(&mut self, name: &str, employees: usize) {
        self.employees = employees;
        self.name_input.clear();
        self.notice = Some(Notice {
            kind: NoticeKind::Info,
            title: "Success".into(),
            message: format!("Employee '{name}' registered successfully!"),
        });
    }

    pub fn registration_failed(&mut self, err: &RegisterError) {
        let title = if err.is_input_error() { "Registration" } else { "Error" };
        self.notice = Some(Notice {
            kind: NoticeKind::Error,
            title: title.into(),
            message: err.to_string(),
        });
    }

    pub fn apply_live(&mut self, frame: LiveFrame) {
        for mark in &frame.marks {
            match mark {
                MarkOutcome::Marked(m) => {
                    self.status = Some(format!("Marked: {}", m.name));
                    self.last_mark = Some(format!("Last: {} at {}", m.name, m.timestamp.format("%H:%M:%S")));
                }
                MarkOutcome::WriteFailed { name, .. } => {
                    self.status = Some(format!("Failed to save attendance for {name}"));
                }
                MarkOutcome::CoolingDown => {}
            }
        }
        self.live = Some(LiveView {
            image: frame.image,
            faces: frame.faces,
            clock: frame.clock,
        });
    }
}

/// Run the TUI until the operator quits.
///
/// Engine failures during a live tick are logged and the loop carries on.
pub async fn run<C, E, G>(app: &mut AttendanceApp<C, E, G>, config: &Config) -> anyhow::Result<()>
where
    C: FrameSource,
    E: FaceEngine,
    G: GeoResolver,
{
    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, app, config).await;
    ratatui::restore();
    result
}

async fn event_loop<C, E, G>(
    terminal: &mut ratatui::DefaultTerminal,
    app: &mut AttendanceApp<C, E, G>,
    config: &Config,
) -> anyhow::Result<()>
where
    C: FrameSource,
    E: FaceEngine,
    G: GeoResolver,
{
    let mut state = UiState::new(app.catalog().len());
    let mut events = EventStream::new();

    let mut preview = tokio::time::interval(config.preview_interval());
    preview.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut live = tokio::time::interval(config.live_interval());
    live.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        terminal.draw(|f| view::render(f, &state))?;

        tokio::select! {
            _ = preview.tick() => {
                if let Some(frame) = app.preview_frame() {
                    state.preview = Some(frame.image);
                }
            }
            _ = live.tick() => {
                match app.live_tick(Local::now()).await {
                    Ok(Some(frame)) => state.apply_live(frame),
                    Ok(None) => {}
                    Err(e) => tracing::error!(error = %e, "live recognition failed"),
                }
            }
            event = events.next() => {
                let Some(event) = event else { break };
                let Event::Key(key) = event? else { continue };
                match state.handle_key(key) {
                    Action::None => {}
                    Action::Quit => break,
                    Action::Register(name) => match app.register(&name) {
                        Ok(reg) => state.registration_succeeded(&reg.name, app.catalog().len()),
                        Err(e) => {
                            if e.is_input_error() {
                                tracing::info!(error = %e, "registration rejected");
                            } else {
                                tracing::error!(error = %e, "registration failed");
                            }
                            state.registration_failed(&e);
                        }
                    },
                }
            }
        }
    }

    tracing::info!("ui closed");
    Ok(())
}
