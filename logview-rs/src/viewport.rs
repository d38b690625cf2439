//! Viewport over the display-line chain: following, scrolling, seeking,
//! eviction and row extraction.
//!
//! ## Terminology
//!
//! * **top**: the display line drawn on the first row.
//! * **current**: the selected display line.  Highlighted when
//!   [`ViewConfig::highlight_current`] is on.
//! * **following**: like `tail -f`; each append re-anchors the page so the
//!   last line stays visible.
//!
//! Every operation here is O(page height) or better, except the full-history
//! passes [`Viewport::rewrap_all`] and [`Viewport::refresh_highlights`], which
//! only run on resize, wrap toggles and explicit refresh requests.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::ViewConfig;
use crate::event::{Event, Level};
use crate::highlight::{colorize, spans_for_range, StyleSpan};
use crate::store::{DisplayLine, EventRecord, LineId, LineStore};
use crate::style::Style;
use crate::wrap::{calculate_wrap, merge};

/// Internal contract violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("cannot colorize a split display line (order {order})")]
    ColorizeSplitLine { order: usize },
}

/// A piece of header text with its style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub text: String,
    pub style: Style,
}

/// Everything a painter needs for one visible row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawRow {
    pub event_id: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub order: usize,
    pub is_current: bool,
    /// Source/timestamp columns, left to right.  Empty when headers are off
    /// or would take half the width or more.
    pub header: Vec<HeaderCell>,
    /// Row text with line breaks replaced by spaces.
    pub text: String,
    /// Spans over `text`, offset 0 being the first character of the row.
    pub spans: Vec<StyleSpan>,
    /// Style for the rest of the row past the text.
    pub fill: Style,
}

/// Viewport state over a [`LineStore`].
#[derive(Debug)]
pub struct Viewport {
    store: LineStore,
    config: ViewConfig,

    // ── Page geometry ─────────────────────────────────────────────────────
    /// Columns available to event text (full width minus headers).
    page_width: usize,
    page_height: usize,
    full_width: usize,
    /// `(full_width, page_height)` at the previous resize.
    last_size: (usize, usize),
    /// Rewrap everything on the next resize regardless of size changes.
    force_rewrap: bool,

    // ── View state ────────────────────────────────────────────────────────
    following: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewConfig::default())
    }
}

impl Viewport {
    pub fn new(config: ViewConfig) -> Self {
        let following = config.following;
        Self {
            store: LineStore::new(),
            config,
            page_width: 0,
            page_height: 0,
            full_width: 0,
            last_size: (0, 0),
            force_rewrap: false,
            following,
        }
    }

    pub fn store(&self) -> &LineStore {
        &self.store
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// Mutable settings.  Highlight changes only reach existing events after
    /// [`Viewport::refresh_highlights`]; use [`Viewport::set_wrap`] for wrap.
    pub fn config_mut(&mut self) -> &mut ViewConfig {
        &mut self.config
    }

    pub fn event_count(&self) -> usize {
        self.store.len()
    }

    pub fn page_width(&self) -> usize {
        self.page_width
    }

    pub fn page_height(&self) -> usize {
        self.page_height
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    pub fn current_line(&self) -> Option<LineId> {
        self.store.current()
    }

    pub fn top_line(&self) -> Option<LineId> {
        self.store.top()
    }

    pub fn current_event(&self) -> Option<Event> {
        self.event_at(self.store.current())
    }

    pub fn top_event(&self) -> Option<Event> {
        self.event_at(self.store.top())
    }

    pub fn first_event(&self) -> Option<Event> {
        self.event_at(self.store.first())
    }

    pub fn last_event(&self) -> Option<Event> {
        self.event_at(self.store.last())
    }

    fn event_at(&self, line: Option<LineId>) -> Option<Event> {
        line.map(|l| self.store.record_of(l).to_event())
    }

    // ── Settings with side effects ────────────────────────────────────────

    /// Enabling following jumps to the end.
    pub fn set_following(&mut self, follow: bool) {
        self.following = follow;
        if follow {
            self.scroll_to_end();
        }
    }

    /// Toggling wrap takes effect on the next resize/draw.
    pub fn set_wrap(&mut self, enabled: bool) {
        if self.config.wrap != enabled {
            self.force_rewrap = true;
        }
        self.config.wrap = enabled;
    }

    /// Show or hide the header columns.  Changes the text width, so the
    /// next resize rewraps.
    pub fn set_show_source(&mut self, enabled: bool) {
        self.config.show_source = enabled;
    }

    pub fn set_show_timestamp(&mut self, enabled: bool) {
        self.config.show_timestamp = enabled;
    }

    /// Set the display-line limit (0 = unlimited) and evict down to it.
    pub fn set_max_events(&mut self, limit: usize) {
        self.config.max_events = limit;
        self.enforce_limit();
    }

    /// Drop every event.
    pub fn clear(&mut self) {
        self.store.clear();
        debug!(target: "logview.viewport", "cleared");
    }

    // ── Appending ─────────────────────────────────────────────────────────

    pub fn append(&mut self, event: &Event) {
        let line = match self.continuation_target(event) {
            Some(last) => {
                let record = self.store.line(last).record;
                self.store.record_mut(record).concatenate(&event.text);
                let head = merge(&mut self.store, last);
                let len = self.store.record(record).len();
                self.store.line_mut(head).end = len;
                trace!(target: "logview.viewport", id = %event.id, "concatenated onto previous event");
                head
            }
            None => {
                let record = EventRecord::from_event(event);
                let len = record.len();
                let rid = self.store.add_record(record);
                let last = self.store.last();
                self.store.insert_after(last, DisplayLine::whole(rid, len))
            }
        };

        self.colorize_line(line);
        let tail = calculate_wrap(&mut self.store, line, self.page_width, self.config.wrap);

        self.enforce_limit();

        if self.following && self.store.len() > self.page_height {
            let anchor = self.store.last();
            self.store.set_top(self.offset(anchor, -self.back_page()));
            let appended = if self.store.contains(tail) { Some(tail) } else { anchor };
            self.store.set_current(appended);
        }
    }

    pub fn append_all(&mut self, events: &[Event]) {
        for event in events {
            self.append(event);
        }
    }

    /// The last line, when `event` should be folded into it instead of
    /// starting a new event.
    fn continuation_target(&self, event: &Event) -> Option<LineId> {
        if !self.config.concatenate {
            return None;
        }
        let matcher = self.config.new_event_matcher.as_ref()?;
        if matcher.is_match(&event.text) {
            return None;
        }
        self.store.last()
    }

    /// Recompute the spans of an unsplit line.
    pub fn try_colorize(&mut self, line: LineId) -> Result<(), EngineError> {
        let order = self.store.line(line).order;
        if order != 0 {
            return Err(EngineError::ColorizeSplitLine { order });
        }
        let record = self.store.line(line).record;
        let rec = self.store.record(record);
        let spans = colorize(&rec.text, rec.level, &self.config);
        self.store.record_mut(record).spans = spans;
        Ok(())
    }

    fn colorize_line(&mut self, line: LineId) {
        if let Err(e) = self.try_colorize(line) {
            panic!("{e}");
        }
    }

    /// Evict whole events from the head until the limit holds.
    fn enforce_limit(&mut self) {
        let limit = self.config.max_events;
        if limit == 0 {
            return;
        }
        let mut evicted = 0usize;
        while self.store.len() > limit {
            let Some(first) = self.store.first() else { break };
            let head = merge(&mut self.store, first);
            self.store.delete(Some(head));
            evicted += 1;
        }
        if evicted > 0 {
            trace!(target: "logview.viewport", evicted, limit, "evicted events");
        }
    }

    // ── Full-history passes ───────────────────────────────────────────────

    /// Re-run wrapping for every event at the current width.
    pub fn rewrap_all(&mut self) {
        let mut at = self.store.first();
        while let Some(id) = at {
            let tail = calculate_wrap(&mut self.store, id, self.page_width, self.config.wrap);
            at = self.store.next(tail);
        }
        debug!(
            target: "logview.viewport",
            lines = self.store.len(),
            page_width = self.page_width,
            wrap = self.config.wrap,
            "rewrapped all events"
        );
    }

    /// Merge every event, recompute its spans with the current highlight
    /// settings, then rewrap.
    pub fn refresh_highlights(&mut self) {
        let mut at = self.store.first();
        while let Some(id) = at {
            let head = merge(&mut self.store, id);
            self.colorize_line(head);
            at = self.store.next(head);
        }
        self.rewrap_all();
        debug!(target: "logview.viewport", "refreshed highlights");
    }

    // ── Geometry ──────────────────────────────────────────────────────────

    /// Apply a new size.  Rewraps only when the text width changed or a
    /// rewrap is pending; re-anchors to the end when following.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.full_width = width;
        self.page_height = height;
        let text_width = if self.config.header_fits(width) {
            width - self.config.header_width()
        } else {
            width
        };
        let width_changed = text_width != self.page_width;
        self.page_width = text_width;

        let size_changed = (width, height) != self.last_size;
        self.last_size = (width, height);

        let rewrap = width_changed || self.force_rewrap;
        if rewrap {
            self.force_rewrap = false;
            self.rewrap_all();
        }
        if (rewrap || size_changed) && self.following {
            self.scroll_to_end();
        }
    }

    /// Lines kept above `last` when anchoring to the end.
    fn back_page(&self) -> isize {
        self.page_height.saturating_sub(1) as isize
    }

    fn offset(&self, from: Option<LineId>, by: isize) -> Option<LineId> {
        from.map(|f| self.store.at_offset(f, by))
    }

    // ── Scrolling ─────────────────────────────────────────────────────────

    pub fn scroll_to_start(&mut self) {
        let first = self.store.first();
        self.store.set_top(first);
        self.store.set_current(first);
        self.following = false;
    }

    pub fn scroll_to_end(&mut self) {
        let last = self.store.last();
        self.store.set_top(self.offset(last, -self.back_page()));
        self.store.set_current(last);
        self.following = true;
    }

    /// Move the selection up one line.  The page scrolls when the selection
    /// is already on the top row, or always when the selection is hidden.
    pub fn scroll_one_up(&mut self) {
        self.following = false;
        let (top, current) = (self.store.top(), self.store.current());
        if current == top || !self.config.highlight_current {
            self.store.set_top(self.offset(top, -1));
        }
        self.store.set_current(self.offset(current, -1));
    }

    /// Move the selection down one line.  On the last line this re-enables
    /// following instead.
    pub fn scroll_one_down(&mut self) {
        if self.store.current() == self.store.last() {
            self.following = true;
            return;
        }
        let next = self.offset(self.store.current(), 1);
        self.store.set_current(next);
        self.adjust_top();
        self.following = false;
    }

    pub fn scroll_page_up(&mut self) {
        let by = -(self.page_height as isize);
        self.store.set_top(self.offset(self.store.top(), by));
        self.store.set_current(self.offset(self.store.current(), by));
        self.following = false;
    }

    /// Page down.  Landing on the last line re-enables following and puts
    /// the last line on the bottom row.
    pub fn scroll_page_down(&mut self) {
        let by = self.page_height as isize;
        self.store.set_top(self.offset(self.store.top(), by));
        self.store.set_current(self.offset(self.store.current(), by));
        if self.store.current() == self.store.last() {
            self.scroll_to_end();
        } else {
            self.following = false;
        }
    }

    /// Scroll the page one line when the selection fell off the bottom row,
    /// or always when the selection is hidden.
    fn adjust_top(&mut self) {
        let (Some(top), Some(current)) = (self.store.top(), self.store.current()) else { return };
        if self.store.distance(current, top, self.page_height) >= self.page_height
            || !self.config.highlight_current
        {
            self.store.set_top(Some(self.store.at_offset(top, 1)));
        }
    }

    /// Select the first line stamped at or after `ts`.
    pub fn scroll_to_timestamp(&mut self, ts: DateTime<Utc>) -> bool {
        let found = self.store.iter().find(|&l| self.store.record_of(l).timestamp >= ts);
        self.jump_to(found)
    }

    /// Select the first line of the event with this id.
    pub fn scroll_to_event_id(&mut self, id: &str) -> bool {
        let found = self.find_line(id);
        self.jump_to(found)
    }

    fn find_line(&self, id: &str) -> Option<LineId> {
        self.store.iter().find(|&l| self.store.record_of(l).id == id)
    }

    fn jump_to(&mut self, line: Option<LineId>) -> bool {
        let Some(line) = line else { return false };
        self.store.set_top(Some(line));
        self.store.set_current(Some(line));
        self.following = false;
        self.adjust_top();
        // leave a little context above the match
        let back = (self.page_height / 4) as isize;
        self.store.set_top(self.offset(self.store.top(), -back));
        true
    }

    /// Select the line `row` rows below `top`.
    pub fn select_at(&mut self, row: usize) {
        let current = self.offset(self.store.top(), row as isize);
        self.store.set_current(current);
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// First event, starting at the event with `start_id` (or the first event
    /// when empty), for which `predicate` holds.  Each event is tested once.
    pub fn find_matching_event<F>(&self, start_id: &str, mut predicate: F) -> Option<Event>
    where
        F: FnMut(&Event) -> bool,
    {
        let start = if start_id.is_empty() {
            self.store.first()
        } else {
            self.find_line(start_id)
        };
        self.store
            .iter_from(Some(start?))
            .filter(|&l| self.store.line(l).order <= 1)
            .map(|l| self.store.record_of(l).to_event())
            .find(|e| predicate(e))
    }

    // ── Rows ──────────────────────────────────────────────────────────────

    /// Resize to `width` x `height` and return the visible rows.
    pub fn draw(&mut self, width: usize, height: usize) -> Vec<DrawRow> {
        self.resize(width, height);
        self.visible_rows()
    }

    /// Rows from `top` for the current page height.
    pub fn visible_rows(&self) -> Vec<DrawRow> {
        let show_header = self.config.header_fits(self.full_width);
        self.store
            .iter_from(self.store.top())
            .take(self.page_height)
            .map(|id| self.row(id, show_header))
            .collect()
    }

    fn row(&self, id: LineId, show_header: bool) -> DrawRow {
        let cfg = &self.config;
        let line = self.store.line(id);
        let rec = self.store.record(line.record);
        let is_current = self.store.current() == Some(id);
        let highlight_row = is_current && cfg.highlight_current;

        let end = if line.end > line.start && rec.text[line.end - 1] == '\n' {
            line.end - 1
        } else {
            line.end
        };
        let text: String = rec.text[line.start..end]
            .iter()
            .map(|&c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();

        let mut spans = if cfg.highlighting {
            spans_for_range(&rec.spans, line.start, end)
        } else {
            vec![StyleSpan::new(0, end - line.start, cfg.text_style)]
        };
        let mut fill = spans.last().map_or(cfg.text_style, |s| s.style);
        if highlight_row {
            for s in &mut spans {
                s.style = s.style.with_bg(cfg.current_bg);
            }
            fill = fill.with_bg(cfg.current_bg);
        }

        let mut header = Vec::new();
        if show_header {
            let continuation = line.order > 1;
            let selected = cfg.text_style.with_bg(cfg.current_bg);
            if cfg.show_source {
                let label = if continuation {
                    " ".repeat(cfg.source_clip_length)
                } else {
                    clip_source(&rec.source, cfg.source_clip_length)
                };
                let style = if highlight_row { selected } else { cfg.source_style };
                header.push(HeaderCell { text: label, style });
                header.push(separator(continuation, if highlight_row { selected } else { cfg.text_style }));
            }
            if cfg.show_timestamp {
                let stamp = cfg.format_timestamp(&rec.timestamp);
                let label = if continuation {
                    " ".repeat(stamp.chars().count())
                } else {
                    stamp
                };
                let style = if highlight_row { selected } else { cfg.timestamp_style };
                header.push(HeaderCell { text: label, style });
                header.push(separator(continuation, if highlight_row { selected } else { cfg.text_style }));
            }
        }

        DrawRow {
            event_id: rec.id.clone(),
            source: rec.source.clone(),
            timestamp: rec.timestamp,
            level: rec.level,
            order: line.order,
            is_current,
            header,
            text,
            spans,
            fill,
        }
    }
}

/// Source column text: clipped, or right-aligned to `width`.
fn clip_source(source: &str, width: usize) -> String {
    if source.chars().count() > width {
        source.chars().take(width).collect()
    } else {
        format!("{source:>width$}")
    }
}

fn separator(continuation: bool, style: Style) -> HeaderCell {
    let text = if continuation { "   " } else { " | " };
    HeaderCell { text: text.to_owned(), style }
}
