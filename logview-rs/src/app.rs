//! The `logview` terminal application loop.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────┐
//!   │  App::run()              │
//!   │  tokio::select! over:    │
//!   │  • term_rx               │◄── crossterm reader thread (keys, mouse, resize)
//!   │  • event_rx              │◄── ingest task (file / stdin lines)
//!   │  • SIGTERM               │
//!   │  • redraw tick           │
//!   └──────────────────────────┘
//! ```
//!
//! Ingested events go to both the [`LogView`] and the [`VelocityHistogram`];
//! the screen is repainted on the tick after anything changed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossterm::event::Event as TermEvent;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::config::ConfigError;
use crate::event::Event;
use crate::keybind::{Action, Keymap};
use crate::pattern::PatternError;
use crate::style::{color, Style};
use crate::terminal::{StatusLine, Terminal};
use crate::velocity::{format_value, VelocityHistogram};
use crate::view::LogView;

// ── Timing constants ─────────────────────────────────────────────────────

const REDRAW_INTERVAL: Duration = Duration::from_millis(50);
/// Events appended per wakeup before the loop yields to input handling.
const MAX_BATCH: usize = 512;

/// Error that ends the application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid pattern: {0}")]
    Pattern(#[from] PatternError),
}

pub struct App {
    view: Arc<LogView>,
    velocity: Arc<VelocityHistogram>,
    terminal: Terminal,
    keymap: Keymap,
    first_seen: Option<DateTime<Utc>>,
    last_seen: Option<DateTime<Utc>>,
    need_redraw: bool,
    quit: bool,
}

impl App {
    pub fn new(view: Arc<LogView>, velocity: Arc<VelocityHistogram>, terminal: Terminal) -> Self {
        Self {
            view,
            velocity,
            terminal,
            keymap: Keymap::new().with_defaults(),
            first_seen: None,
            last_seen: None,
            need_redraw: true,
            quit: false,
        }
    }

    pub fn view(&self) -> &LogView {
        &self.view
    }

    pub fn is_quitting(&self) -> bool {
        self.quit
    }

    /// Drive the UI until the user quits or the process is terminated.
    pub async fn run(&mut self, mut event_rx: mpsc::Receiver<Event>) -> Result<(), AppError> {
        let _raw = Terminal::enter_raw_mode()?;
        self.terminal.clear_screen()?;

        // crossterm's reader blocks, so it gets a thread of its own.
        let (term_tx, mut term_rx) = mpsc::channel::<TermEvent>(64);
        std::thread::spawn(move || {
            while let Ok(ev) = crossterm::event::read() {
                if term_tx.blocking_send(ev).is_err() {
                    break;
                }
            }
        });

        let mut tick = tokio::time::interval(REDRAW_INTERVAL);
        let terminate = terminate_signal();
        tokio::pin!(terminate);
        let mut input_open = true;

        while !self.quit {
            tokio::select! {
                Some(ev) = term_rx.recv() => self.handle_terminal_event(ev),

                received = event_rx.recv(), if input_open => match received {
                    Some(first) => {
                        let mut batch = vec![first];
                        while batch.len() < MAX_BATCH {
                            match event_rx.try_recv() {
                                Ok(e) => batch.push(e),
                                Err(_) => break,
                            }
                        }
                        self.ingest(&batch);
                    }
                    None => {
                        input_open = false;
                        debug!(target: "logview.app", "input closed");
                    }
                },

                _ = &mut terminate => {
                    info!(target: "logview.app", "terminated");
                    self.quit = true;
                }

                _ = tick.tick() => {
                    if self.need_redraw {
                        self.redraw()?;
                        self.need_redraw = false;
                    }
                }
            }
        }
        Ok(())
    }

    /// Append a batch to the view and the histogram.
    pub fn ingest(&mut self, events: &[Event]) {
        for e in events {
            self.velocity.append_event(e.timestamp, e.level);
            self.first_seen = Some(self.first_seen.map_or(e.timestamp, |t| t.min(e.timestamp)));
            self.last_seen = Some(self.last_seen.map_or(e.timestamp, |t| t.max(e.timestamp)));
        }
        self.view.append_events(events);
        trace!(target: "logview.app", count = events.len(), "ingested batch");
        self.need_redraw = true;
    }

    fn handle_terminal_event(&mut self, ev: TermEvent) {
        let action = match ev {
            TermEvent::Key(key) => self.keymap.lookup(&key),
            TermEvent::Mouse(m) => self.keymap.mouse(&m, self.terminal.log_rows()),
            TermEvent::Resize(w, h) => {
                self.terminal.handle_resize(w, h);
                self.need_redraw = true;
                None
            }
            _ => None,
        };
        if let Some(action) = action {
            self.apply(action);
        }
    }

    /// Perform `action` against the view.
    pub fn apply(&mut self, action: Action) {
        trace!(target: "logview.app", action = action.name(), "key action");
        let view = &self.view;
        match action {
            Action::ScrollToStart => view.scroll_to_start(),
            Action::ScrollToEnd => view.scroll_to_end(),
            Action::LineUp => view.scroll_one_up(),
            Action::LineDown => view.scroll_one_down(),
            Action::PageUp => view.scroll_page_up(),
            Action::PageDown => view.scroll_page_down(),
            Action::ToggleFollowing => view.set_following(!view.is_following()),
            Action::ToggleWrap => view.set_line_wrap(!view.config().wrap),
            Action::ToggleHighlighting => {
                view.set_highlighting(!view.config().highlighting);
                view.refresh_highlights();
            }
            Action::ToggleTimestamp => view.set_show_timestamp(!view.config().show_timestamp),
            Action::ToggleSource => view.set_show_source(!view.config().show_source),
            Action::SelectRow(row) => view.select_at(row as usize),
            Action::Redraw => {
                let _ = self.terminal.clear_screen();
            }
            Action::Quit => self.quit = true,
        }
        self.need_redraw = true;
    }

    fn redraw(&mut self) -> std::io::Result<()> {
        let width = self.terminal.width as usize;
        let rows = self.view.draw(width, self.terminal.log_rows() as usize);
        self.terminal.render_rows(&rows)?;

        if self.terminal.has_velocity_row() {
            let columns = width.saturating_sub(6);
            if let (Some(first), Some(last)) = (self.first_seen, self.last_seen) {
                self.velocity.auto_scale(first, last, columns);
                self.velocity.set_anchor(Some(last));
            }
            let values = self.velocity.values(columns);
            let max = values.iter().copied().max().unwrap_or(0);
            let label = format!("{} |", format_value(max));
            let style = Style::PLAIN.with_bg(color::GRAY_239);
            self.terminal.render_velocity(&label, &values, style)?;
        }

        self.terminal.render_status(&StatusLine::new(self.status_text()))?;
        self.terminal.flush()
    }

    /// Text for the status line.
    pub fn status_text(&self) -> String {
        let config = self.view.config();
        let mode = if self.view.is_following() { "FOLLOW" } else { "PAUSED" };
        let wrap = if config.wrap { "wrap" } else { "nowrap" };
        let mut text = format!(" {} lines | {mode} | {wrap}", self.view.event_count());
        if let Some(e) = self.view.current_event() {
            text.push_str(&format!(" | #{} {}", e.id, config.format_timestamp(&e.timestamp)));
        }
        text
    }
}

#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut s) => {
            s.recv().await;
        }
        Err(_) => std::future::pending().await,
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
