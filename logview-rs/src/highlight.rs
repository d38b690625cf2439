//! Turning event text into styled spans.
//!
//! [`colorize`] runs the highlight pattern over the full text of one event
//! and folds the named captures into a gap-free list of [`StyleSpan`]s.  The
//! result is computed once per event and shared by every display line the
//! event wraps into.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use crate::config::ViewConfig;
use crate::event::Level;
use crate::pattern::{NamedCapture, Pattern};
use crate::style::Style;

/// A run of codepoints `[start, end)` drawn with one style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleSpan {
    pub start: usize,
    pub end: usize,
    pub style: Style,
}

impl StyleSpan {
    pub fn new(start: usize, end: usize, style: Style) -> Self {
        Self { start, end, style }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Styles registered per capture-group name.
///
/// Groups with no registered style are not highlighted; their text falls into
/// the surrounding default-style gap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupStyles {
    styles: HashMap<String, Style>,
}

impl GroupStyles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, group: impl Into<String>, style: Style) {
        self.styles.insert(group.into(), style);
    }

    pub fn get(&self, group: &str) -> Option<Style> {
        self.styles.get(group).copied()
    }

    pub fn remove(&mut self, group: &str) -> Option<Style> {
        self.styles.remove(group)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

/// The style used for uncaptured text of an event at `level`.
pub fn base_style(level: Level, config: &ViewConfig) -> Style {
    match level {
        Level::Warning if config.level_highlighting => config.text_style.with_bg(config.warning_bg),
        Level::Error if config.level_highlighting => config.text_style.with_bg(config.error_bg),
        _ => config.text_style,
    }
}

/// Compute the spans for `text` (codepoints) of an event at `level`.
///
/// The returned spans are ordered, never overlap, and tile `[0, text.len())`
/// exactly.  Empty text yields a single empty span.
pub fn colorize(text: &[char], level: Level, config: &ViewConfig) -> Vec<StyleSpan> {
    let default_style = base_style(level, config);
    let len = text.len();

    let pattern = match &config.highlight_pattern {
        Some(p) if config.highlighting && len > 0 => p,
        _ => return vec![StyleSpan::new(0, len, default_style)],
    };

    let tinted = config.level_highlighting && level != Level::Info;
    let source: String = text.iter().collect();

    let captures = match panic::catch_unwind(AssertUnwindSafe(|| char_captures(pattern, &source))) {
        Ok(caps) => caps,
        Err(_) => {
            warn!(
                target: "logview.highlight",
                pattern = pattern.src(),
                "highlight pattern failed, falling back to default style"
            );
            return vec![StyleSpan::new(0, len, default_style)];
        }
    };

    build_spans(len, &captures, &config.group_styles, default_style, tinted)
}

/// A capture translated to codepoint offsets.
struct CharCapture<'p> {
    name: &'p str,
    start: usize,
    end: usize,
}

/// Run `pattern` over `source` and convert every named capture to codepoint
/// offsets, sorted by start.  The sort is stable so captures starting at the
/// same offset keep their group order.
fn char_captures<'p>(pattern: &'p Pattern, source: &str) -> Vec<CharCapture<'p>> {
    let char_starts: Vec<usize> = source.char_indices().map(|(b, _)| b).collect();
    let to_char = |byte: usize| char_starts.partition_point(|&b| b < byte);

    let mut captures: Vec<CharCapture<'p>> = pattern
        .named_captures(source)
        .into_iter()
        .map(|NamedCapture { name, start, end }| CharCapture {
            name,
            start: to_char(start),
            end: to_char(end),
        })
        .collect();
    captures.sort_by_key(|c| c.start);
    captures
}

/// Fold sorted captures into gap-free spans over `[0, len)`.
fn build_spans(
    len: usize,
    captures: &[CharCapture<'_>],
    groups: &GroupStyles,
    default_style: Style,
    tinted: bool,
) -> Vec<StyleSpan> {
    let mut spans = Vec::with_capacity(captures.len() * 2 + 1);
    let mut pos = 0;

    for cap in captures {
        if cap.start < pos {
            // overlaps a span already emitted
            continue;
        }
        let Some(mut style) = groups.get(cap.name) else { continue };
        if tinted {
            style = style.with_bg_of(default_style);
        }
        if cap.start > pos {
            spans.push(StyleSpan::new(pos, cap.start, default_style));
        }
        spans.push(StyleSpan::new(cap.start, cap.end, style));
        pos = cap.end;
    }
    if pos < len || spans.is_empty() {
        spans.push(StyleSpan::new(pos, len, default_style));
    }
    spans
}

/// The spans intersecting `[start, end)`, clipped to it and re-based so that
/// offset 0 is `start`.
pub fn spans_for_range(spans: &[StyleSpan], start: usize, end: usize) -> Vec<StyleSpan> {
    spans
        .iter()
        .filter(|s| s.start < end && s.end > start)
        .map(|s| StyleSpan::new(s.start.max(start) - start, s.end.min(end) - start, s.style))
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::color;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn config_with(pattern: &str, groups: &[&str]) -> ViewConfig {
        let mut config = ViewConfig::default();
        config.highlight_pattern = Some(Pattern::highlight(pattern).unwrap());
        for (i, g) in groups.iter().enumerate() {
            config.group_styles.set(*g, Style::PLAIN.with_fg(i as u8 + 1));
        }
        config
    }

    fn texts(text: &[char], spans: &[StyleSpan]) -> Vec<String> {
        spans.iter().map(|s| text[s.start..s.end].iter().collect()).collect()
    }

    fn assert_tiles(spans: &[StyleSpan], len: usize) {
        assert_eq!(spans.first().map(|s| s.start), Some(0));
        assert_eq!(spans.last().map(|s| s.end), Some(len));
        for w in spans.windows(2) {
            assert_eq!(w[0].end, w[1].start);
        }
    }

    #[test]
    fn mixed_script_groups() {
        let config = config_with(
            r"\s+(?P<word1>[\p{L}]*)\s+(?P<word2>.*)\s+(?P<num>\d+) (?P<word3>[\p{L}]*)",
            &["word1", "word2", "num", "word3"],
        );
        let text = chars(" Два wordoслова 11 møøsè");
        let spans = colorize(&text, Level::Info, &config);
        assert_eq!(
            texts(&text, &spans),
            vec![" ", "Два", " ", "wordoслова", " ", "11", " ", "møøsè"]
        );
        assert_eq!(spans[1].style.fg_color(), Some(1));
        assert_eq!(spans[7].style.fg_color(), Some(4));
    }

    #[test]
    fn disabled_highlighting_gives_one_span() {
        let mut config = config_with(r"(?P<n>\d+)", &["n"]);
        config.highlighting = false;
        let text = chars("abc 123");
        assert_eq!(colorize(&text, Level::Info, &config), vec![StyleSpan::new(0, 7, Style::PLAIN)]);
    }

    #[test]
    fn no_pattern_gives_one_span() {
        let text = chars("abc");
        let spans = colorize(&text, Level::Info, &ViewConfig::default());
        assert_eq!(spans, vec![StyleSpan::new(0, 3, Style::PLAIN)]);
    }

    #[test]
    fn empty_text_gives_empty_span() {
        let config = config_with(r"(?P<n>\d+)", &["n"]);
        assert_eq!(colorize(&[], Level::Info, &config), vec![StyleSpan::new(0, 0, Style::PLAIN)]);
    }

    #[test]
    fn unregistered_group_is_left_in_gap() {
        let config = config_with(r"(?P<a>\d+)-(?P<b>\d+)", &["b"]);
        let text = chars("x 12-34 y");
        let spans = colorize(&text, Level::Info, &config);
        assert_eq!(texts(&text, &spans), vec!["x 12-", "34", " y"]);
        assert_tiles(&spans, text.len());
    }

    #[test]
    fn every_match_is_highlighted() {
        let config = config_with(r"(?P<n>\d+)", &["n"]);
        let text = chars("a1 b22 c");
        let spans = colorize(&text, Level::Info, &config);
        assert_eq!(texts(&text, &spans), vec!["a", "1", " b", "22", " c"]);
    }

    #[test]
    fn nested_group_overlap_is_skipped() {
        let config = config_with(r"(?P<outer>a(?P<inner>b)c)", &["outer", "inner"]);
        let text = chars("xabcx");
        let spans = colorize(&text, Level::Info, &config);
        assert_eq!(texts(&text, &spans), vec!["x", "abc", "x"]);
    }

    #[test]
    fn trailing_single_char_is_covered() {
        let config = config_with(r"(?P<w>ab)", &["w"]);
        let text = chars("abc");
        let spans = colorize(&text, Level::Info, &config);
        assert_eq!(texts(&text, &spans), vec!["ab", "c"]);
    }

    #[test]
    fn level_background_is_forced_onto_captures() {
        let mut config = config_with(r"(?P<n>\d+)", &["n"]);
        config.level_highlighting = true;
        config.group_styles.set("n", Style::PLAIN.with_fg(color::GREEN).with_bg(color::BLUE));
        let text = chars("err 42");
        let spans = colorize(&text, Level::Error, &config);
        assert!(spans.iter().all(|s| s.style.bg_color() == Some(config.error_bg)));
        assert_eq!(spans[1].style.fg_color(), Some(color::GREEN));
    }

    #[test]
    fn level_background_ignored_for_info() {
        let mut config = ViewConfig::default();
        config.level_highlighting = true;
        let spans = colorize(&chars("fine"), Level::Info, &config);
        assert_eq!(spans[0].style.bg_color(), None);
    }

    #[test]
    fn warning_tint_without_pattern() {
        let mut config = ViewConfig::default();
        config.level_highlighting = true;
        let spans = colorize(&chars("hmm"), Level::Warning, &config);
        assert_eq!(spans, vec![StyleSpan::new(0, 3, Style::PLAIN.with_bg(config.warning_bg))]);
    }

    #[test]
    fn identical_input_identical_output() {
        let config = config_with(r"(?P<k>\w+)=(?P<v>\w+)", &["k", "v"]);
        let text = chars("a=1 b=2 c=3");
        assert_eq!(colorize(&text, Level::Info, &config), colorize(&text, Level::Info, &config));
    }

    #[test]
    fn range_clips_and_rebases() {
        let spans = vec![
            StyleSpan::new(0, 4, Style::PLAIN),
            StyleSpan::new(4, 10, Style::BOLD),
        ];
        assert_eq!(
            spans_for_range(&spans, 2, 6),
            vec![StyleSpan::new(0, 2, Style::PLAIN), StyleSpan::new(2, 4, Style::BOLD)]
        );
        assert_eq!(spans_for_range(&spans, 4, 10), vec![StyleSpan::new(0, 6, Style::BOLD)]);
    }
}
