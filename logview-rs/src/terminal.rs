//! Terminal rendering: crossterm output, [`Style`] mapping, log rows,
//! velocity strip and status line.
//!
//! ## Layout
//!
//! ```text
//!   row 0 .. log_rows()-1   log rows from LogView::draw
//!   velocity_row()          event-rate sparkline (when the screen is tall enough)
//!   status_row()            status line
//! ```
//!
//! Building the rows is pure ([`row_segments`], [`sparkline`]) so it can be
//! tested without a terminal; [`Terminal`] only queues the results.

use std::io::{self, Write};

use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    queue,
    style::{Attribute, Attributes, Color, ContentStyle, Print, ResetColor, SetStyle},
    terminal::{self, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};

use crate::style::Style;
use crate::viewport::DrawRow;

/// Screens shorter than this get no velocity strip.
const MIN_HEIGHT_FOR_VELOCITY: u16 = 8;

const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

// ── Style → crossterm style ───────────────────────────────────────────────────

/// Map a [`Style`] to a crossterm [`ContentStyle`].
pub fn content_style(style: Style) -> ContentStyle {
    let mut attributes = Attributes::default();
    for (flag, attr) in [
        (Style::BOLD, Attribute::Bold),
        (Style::UNDERLINE, Attribute::Underlined),
        (Style::ITALIC, Attribute::Italic),
        (Style::REVERSE, Attribute::Reverse),
        (Style::DIM, Attribute::Dim),
    ] {
        if style.contains(flag) {
            attributes.set(attr);
        }
    }
    ContentStyle {
        foreground_color: style.fg_color().map(ansi_color),
        background_color: style.bg_color().map(ansi_color),
        underline_color: None,
        attributes,
    }
}

/// The 16 base colors by name, everything else as a palette index.
fn ansi_color(idx: u8) -> Color {
    match idx {
        0 => Color::Black,
        1 => Color::DarkRed,
        2 => Color::DarkGreen,
        3 => Color::DarkYellow,
        4 => Color::DarkBlue,
        5 => Color::DarkMagenta,
        6 => Color::DarkCyan,
        7 => Color::Grey,
        8 => Color::DarkGrey,
        9 => Color::Red,
        10 => Color::Green,
        11 => Color::Yellow,
        12 => Color::Blue,
        13 => Color::Magenta,
        14 => Color::Cyan,
        15 => Color::White,
        n => Color::AnsiValue(n),
    }
}

// ── StatusLine ────────────────────────────────────────────────────────────────

/// The status bar content, pre-formatted by the caller.
#[derive(Debug, Clone, Default)]
pub struct StatusLine {
    pub text: String,
    pub style: Style,
}

impl StatusLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), style: Style::REVERSE }
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }
}

// ── Row building ──────────────────────────────────────────────────────────────

/// Styled pieces of one log row, clipped and padded to exactly `width`
/// columns.
pub fn row_segments(row: &DrawRow, width: usize) -> Vec<(String, Style)> {
    let mut out = Vec::new();
    let mut used = 0;
    let mut push = |text: String, style: Style, used: &mut usize| {
        let room = width - *used;
        let clipped: String = text.chars().take(room).collect();
        let n = clipped.chars().count();
        if n > 0 {
            *used += n;
            out.push((clipped, style));
        }
    };

    for cell in &row.header {
        push(cell.text.clone(), cell.style, &mut used);
    }
    let chars: Vec<char> = row.text.chars().collect();
    for span in &row.spans {
        let end = span.end.min(chars.len());
        let start = span.start.min(end);
        push(chars[start..end].iter().collect(), span.style, &mut used);
    }
    let rest = width - used;
    push(" ".repeat(rest), row.fill, &mut used);
    out
}

/// One block character per value, scaled so the largest value is a full
/// block.  Zero is a space.
pub fn sparkline(values: &[usize]) -> String {
    let max = values.iter().copied().max().unwrap_or(0);
    values
        .iter()
        .map(|&v| {
            if v == 0 || max == 0 {
                ' '
            } else {
                let level = (v * BLOCKS.len()).div_ceil(max).clamp(1, BLOCKS.len());
                BLOCKS[level - 1]
            }
        })
        .collect()
}

// ── Terminal ──────────────────────────────────────────────────────────────────

/// Wraps the output writer with crossterm commands and tracks geometry.
pub struct Terminal {
    pub width: u16,
    pub height: u16,
    out: Box<dyn Write + Send>,
}

impl Terminal {
    /// Create a [`Terminal`] writing to `out`.
    ///
    /// Queries the current terminal size; falls back to 80×24 if unavailable.
    pub fn new(out: impl Write + Send + 'static) -> Self {
        let (width, height) = terminal::size().unwrap_or((80, 24));
        Self { width, height, out: Box::new(out) }
    }

    /// Enable raw mode, the alternate screen and mouse reporting.  The guard
    /// restores the terminal on drop.
    pub fn enter_raw_mode() -> io::Result<RawModeGuard> {
        terminal::enable_raw_mode()?;
        crossterm::execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture, cursor::Hide)?;
        Ok(RawModeGuard(()))
    }

    pub fn handle_resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    pub fn has_velocity_row(&self) -> bool {
        self.height >= MIN_HEIGHT_FOR_VELOCITY
    }

    pub fn status_row(&self) -> u16 {
        self.height.saturating_sub(1)
    }

    pub fn velocity_row(&self) -> Option<u16> {
        self.has_velocity_row().then(|| self.height.saturating_sub(2))
    }

    /// Rows available to log lines.
    pub fn log_rows(&self) -> u16 {
        let reserved = if self.has_velocity_row() { 2 } else { 1 };
        self.height.saturating_sub(reserved)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Paint `rows` from the top, clearing unused log rows.
    pub fn render_rows(&mut self, rows: &[DrawRow]) -> io::Result<()> {
        let width = self.width as usize;
        for y in 0..self.log_rows() {
            queue!(self.out, cursor::MoveTo(0, y))?;
            match rows.get(y as usize) {
                Some(row) => {
                    for (text, style) in row_segments(row, width) {
                        queue!(self.out, SetStyle(content_style(style)), Print(text), ResetColor)?;
                    }
                }
                None => queue!(self.out, terminal::Clear(ClearType::UntilNewLine))?,
            }
        }
        Ok(())
    }

    /// Paint the velocity strip: a fixed-width `label` then the sparkline.
    pub fn render_velocity(&mut self, label: &str, values: &[usize], style: Style) -> io::Result<()> {
        let Some(row) = self.velocity_row() else { return Ok(()) };
        let line = pad_or_truncate(&format!("{label}{}", sparkline(values)), self.width as usize);
        queue!(self.out, cursor::MoveTo(0, row), SetStyle(content_style(style)), Print(line), ResetColor)
    }

    pub fn render_status(&mut self, status: &StatusLine) -> io::Result<()> {
        let row = self.status_row();
        let line = pad_or_truncate(&status.text, self.width as usize);
        queue!(
            self.out,
            cursor::MoveTo(0, row),
            SetStyle(content_style(status.style)),
            Print(line),
            ResetColor
        )
    }

    pub fn clear_screen(&mut self) -> io::Result<()> {
        queue!(self.out, terminal::Clear(ClearType::All), cursor::MoveTo(0, 0))
    }
}

// ── RawModeGuard ──────────────────────────────────────────────────────────────

/// RAII guard: restores the terminal when dropped.
pub struct RawModeGuard(());

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(
            io::stdout(),
            DisableMouseCapture,
            LeaveAlternateScreen,
            cursor::Show
        );
        let _ = terminal::disable_raw_mode();
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Pad `s` with spaces to exactly `width` chars, or truncate if too long.
fn pad_or_truncate(s: &str, width: usize) -> String {
    let count = s.chars().count();
    if count >= width {
        s.chars().take(width).collect()
    } else {
        format!("{s}{}", " ".repeat(width - count))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
