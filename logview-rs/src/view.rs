//! Thread-safe front end to the viewport.
//!
//! [`LogView`] guards a [`Viewport`] with one reader/writer lock.  Appends,
//! scrolls, resizes and draws take the write lock; queries take the read
//! lock.  The current-changed listener is called after the lock is released,
//! so it may call back into the view.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::config::ViewConfig;
use crate::event::Event;
use crate::pattern::{Pattern, PatternError};
use crate::style::Style;
use crate::viewport::{DrawRow, Viewport};

/// Called with the newly selected event.
pub type CurrentListener = Arc<dyn Fn(&Event) + Send + Sync>;

pub struct LogView {
    inner: RwLock<Viewport>,
    on_current_change: RwLock<Option<CurrentListener>>,
}

impl Default for LogView {
    fn default() -> Self {
        Self::new(ViewConfig::default())
    }
}

impl std::fmt::Debug for LogView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogView")
            .field("events", &self.event_count())
            .field("following", &self.is_following())
            .finish()
    }
}

impl LogView {
    pub fn new(config: ViewConfig) -> Self {
        Self {
            inner: RwLock::new(Viewport::new(config)),
            on_current_change: RwLock::new(None),
        }
    }

    /// Run `f` under the write lock, then notify the listener if the
    /// selection moved to a different line.
    fn mutate<R>(&self, f: impl FnOnce(&mut Viewport) -> R) -> R {
        let (result, changed) = {
            let mut vp = self.inner.write();
            let before = vp.current_line();
            let result = f(&mut *vp);
            let after = vp.current_line();
            let changed = if before != after && vp.config().highlight_current {
                vp.current_event()
            } else {
                None
            };
            (result, changed)
        };
        if let Some(event) = changed {
            let listener = self.on_current_change.read().clone();
            if let Some(listener) = listener {
                listener(&event);
            }
        }
        result
    }

    fn read<R>(&self, f: impl FnOnce(&Viewport) -> R) -> R {
        f(&*self.inner.read())
    }

    pub fn set_on_current_change(&self, listener: impl Fn(&Event) + Send + Sync + 'static) {
        *self.on_current_change.write() = Some(Arc::new(listener));
    }

    pub fn clear_on_current_change(&self) {
        *self.on_current_change.write() = None;
    }

    // ── Ingestion ─────────────────────────────────────────────────────────

    pub fn append_event(&self, event: &Event) {
        self.mutate(|vp| vp.append(event));
    }

    /// Append a batch under a single lock acquisition.
    pub fn append_events(&self, events: &[Event]) {
        self.mutate(|vp| vp.append_all(events));
    }

    pub fn clear(&self) {
        self.mutate(Viewport::clear);
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn event_count(&self) -> usize {
        self.read(Viewport::event_count)
    }

    pub fn is_following(&self) -> bool {
        self.read(Viewport::is_following)
    }

    pub fn current_event(&self) -> Option<Event> {
        self.read(Viewport::current_event)
    }

    pub fn first_event(&self) -> Option<Event> {
        self.read(Viewport::first_event)
    }

    pub fn top_event(&self) -> Option<Event> {
        self.read(Viewport::top_event)
    }

    /// See [`Viewport::find_matching_event`].
    pub fn find_matching_event<F>(&self, start_id: &str, predicate: F) -> Option<Event>
    where
        F: FnMut(&Event) -> bool,
    {
        self.read(|vp| vp.find_matching_event(start_id, predicate))
    }

    /// A snapshot of the live settings.
    pub fn config(&self) -> ViewConfig {
        self.read(|vp| vp.config().clone())
    }

    // ── Drawing ───────────────────────────────────────────────────────────

    pub fn draw(&self, width: usize, height: usize) -> Vec<DrawRow> {
        self.mutate(|vp| vp.draw(width, height))
    }

    pub fn resize(&self, width: usize, height: usize) {
        self.mutate(|vp| vp.resize(width, height));
    }

    // ── Scrolling ─────────────────────────────────────────────────────────

    pub fn scroll_to_start(&self) {
        self.mutate(Viewport::scroll_to_start);
    }

    pub fn scroll_to_end(&self) {
        self.mutate(Viewport::scroll_to_end);
    }

    pub fn scroll_one_up(&self) {
        self.mutate(Viewport::scroll_one_up);
    }

    pub fn scroll_one_down(&self) {
        self.mutate(Viewport::scroll_one_down);
    }

    pub fn scroll_page_up(&self) {
        self.mutate(Viewport::scroll_page_up);
    }

    pub fn scroll_page_down(&self) {
        self.mutate(Viewport::scroll_page_down);
    }

    pub fn scroll_to_timestamp(&self, ts: DateTime<Utc>) -> bool {
        self.mutate(|vp| vp.scroll_to_timestamp(ts))
    }

    pub fn scroll_to_event_id(&self, id: &str) -> bool {
        self.mutate(|vp| vp.scroll_to_event_id(id))
    }

    pub fn select_at(&self, row: usize) {
        self.mutate(|vp| vp.select_at(row));
    }

    // ── Settings ──────────────────────────────────────────────────────────

    pub fn set_following(&self, follow: bool) {
        self.mutate(|vp| vp.set_following(follow));
    }

    pub fn set_line_wrap(&self, enabled: bool) {
        self.mutate(|vp| vp.set_wrap(enabled));
    }

    pub fn set_max_events(&self, limit: usize) {
        self.mutate(|vp| vp.set_max_events(limit));
    }

    pub fn set_concatenate_events(&self, enabled: bool) {
        self.mutate(|vp| vp.config_mut().concatenate = enabled);
    }

    pub fn set_highlight_current_event(&self, enabled: bool) {
        self.mutate(|vp| vp.config_mut().highlight_current = enabled);
    }

    pub fn set_show_source(&self, enabled: bool) {
        self.mutate(|vp| vp.set_show_source(enabled));
    }

    pub fn set_show_timestamp(&self, enabled: bool) {
        self.mutate(|vp| vp.set_show_timestamp(enabled));
    }

    /// Set the continuation matcher.  An empty string clears it, which
    /// disables concatenation.  On error the previous matcher stays.
    pub fn set_new_event_matching_regex(&self, src: &str) -> Result<(), PatternError> {
        let matcher = if src.is_empty() {
            None
        } else {
            Some(Pattern::new_event_matcher(src)?)
        };
        debug!(target: "logview.viewport", pattern = src, "new event matcher set");
        self.mutate(|vp| vp.config_mut().new_event_matcher = matcher);
        Ok(())
    }

    // ── Highlighting ──────────────────────────────────────────────────────
    //
    // These only affect events appended afterwards until
    // `refresh_highlights` runs.

    /// Set the highlight pattern.  An empty string clears it.  On error the
    /// previous pattern stays.
    pub fn set_highlight_pattern(&self, src: &str) -> Result<(), PatternError> {
        let pattern = if src.is_empty() {
            None
        } else {
            Some(Pattern::highlight(src)?)
        };
        debug!(target: "logview.highlight", pattern = src, "highlight pattern set");
        self.mutate(|vp| vp.config_mut().highlight_pattern = pattern);
        Ok(())
    }

    pub fn set_highlighting(&self, enabled: bool) {
        self.mutate(|vp| vp.config_mut().highlighting = enabled);
    }

    pub fn set_level_highlighting(&self, enabled: bool) {
        self.mutate(|vp| vp.config_mut().level_highlighting = enabled);
    }

    pub fn set_highlight_color(&self, group: &str, fg: u8, bg: u8) {
        self.mutate(|vp| vp.config_mut().set_group_color(group, fg, bg));
    }

    pub fn set_highlight_color_fg(&self, group: &str, fg: u8) {
        self.mutate(|vp| vp.config_mut().set_group_fg(group, fg));
    }

    pub fn set_highlight_color_bg(&self, group: &str, bg: u8) {
        self.mutate(|vp| vp.config_mut().set_group_bg(group, bg));
    }

    pub fn set_warning_bg_color(&self, bg: u8) {
        self.mutate(|vp| vp.config_mut().warning_bg = bg);
    }

    pub fn set_error_bg_color(&self, bg: u8) {
        self.mutate(|vp| vp.config_mut().error_bg = bg);
    }

    pub fn set_current_bg_color(&self, bg: u8) {
        self.mutate(|vp| vp.config_mut().current_bg = bg);
    }

    pub fn set_text_style(&self, style: Style) {
        self.mutate(|vp| vp.config_mut().text_style = style);
    }

    /// Recompute spans and wrapping for every event.  Expensive.
    pub fn refresh_highlights(&self) {
        self.mutate(Viewport::refresh_highlights);
    }
}
