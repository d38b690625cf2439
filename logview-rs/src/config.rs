//! Viewer settings and the `logview.toml` configuration file.
//!
//! [`ViewConfig`] is the live settings block owned by the viewport and read by
//! the highlighter and wrap engine.  [`FileConfig`] is its on-disk form:
//!
//! | Section | Keys |
//! |---------|------|
//! | `[view]` | `wrap`, `following`, `highlighting`, `level_highlighting`, `highlight_current`, `concatenate`, `new_event_pattern`, `max_events`, `show_source`, `show_timestamp`, `source_clip_length`, `timestamp_format`, `current_bg` |
//! | `[highlight]` | `pattern` |
//! | `[highlight.colors]` | `<group> = { fg = "…", bg = "…" }` |
//! | `[levels]` | `warning_bg`, `error_bg` |
//!
//! Colors are names from [`crate::style::color`] or palette indices.  Unknown
//! keys are ignored.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::highlight::GroupStyles;
use crate::pattern::{Pattern, PatternError};
use crate::style::{color, Style};

/// New-event matcher used unless configured otherwise: a line starting with
/// whitespace continues the previous event.
pub const DEFAULT_NEW_EVENT_PATTERN: &str = r"^[^\s]";

pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%H:%M:%S%.3f";

pub const DEFAULT_SOURCE_CLIP_LENGTH: usize = 6;

const CONFIG_FILE_NAME: &str = "logview.toml";

// ── Live settings ─────────────────────────────────────────────────────────────

/// Settings consulted while appending, wrapping, highlighting and drawing.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    pub wrap: bool,
    /// Initial following state; the viewport tracks the live value.
    pub following: bool,
    pub highlighting: bool,
    pub level_highlighting: bool,
    pub highlight_current: bool,
    pub concatenate: bool,
    /// Display-line limit; 0 means unlimited.
    pub max_events: usize,

    pub highlight_pattern: Option<Pattern>,
    pub new_event_matcher: Option<Pattern>,
    pub group_styles: GroupStyles,

    pub text_style: Style,
    pub source_style: Style,
    pub timestamp_style: Style,
    pub current_bg: u8,
    pub warning_bg: u8,
    pub error_bg: u8,

    pub show_source: bool,
    pub show_timestamp: bool,
    pub source_clip_length: usize,
    /// `chrono` strftime format for the timestamp column.
    pub timestamp_format: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            wrap: true,
            following: true,
            highlighting: true,
            level_highlighting: false,
            highlight_current: false,
            concatenate: false,
            max_events: 0,
            highlight_pattern: None,
            new_event_matcher: Pattern::new_event_matcher(DEFAULT_NEW_EVENT_PATTERN).ok(),
            group_styles: GroupStyles::new(),
            text_style: Style::PLAIN,
            source_style: Style::PLAIN.with_fg(color::DARK_GOLDENROD),
            timestamp_style: Style::PLAIN.with_fg(color::DARK_ORANGE),
            current_bg: color::DIM_GRAY,
            warning_bg: color::SADDLE_BROWN,
            error_bg: color::INDIAN_RED,
            show_source: false,
            show_timestamp: false,
            source_clip_length: DEFAULT_SOURCE_CLIP_LENGTH,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_owned(),
        }
    }
}

impl ViewConfig {
    /// Register foreground and background colors for a capture group.
    pub fn set_group_color(&mut self, group: &str, fg: u8, bg: u8) {
        self.group_styles.set(group, Style::PLAIN.with_fg(fg).with_bg(bg));
    }

    /// Register a foreground color for a capture group; the background is
    /// the text style's.
    pub fn set_group_fg(&mut self, group: &str, fg: u8) {
        self.group_styles.set(group, Style::PLAIN.with_fg(fg).with_bg_of(self.text_style));
    }

    /// Register a background color for a capture group; the foreground is
    /// the text style's.
    pub fn set_group_bg(&mut self, group: &str, bg: u8) {
        let style = match self.text_style.fg_color() {
            Some(fg) => Style::PLAIN.with_fg(fg),
            None => Style::PLAIN,
        };
        self.group_styles.set(group, style.with_bg(bg));
    }

    /// Render `ts` with the configured format.  A format chrono cannot
    /// render falls back to RFC 3339.
    pub fn format_timestamp(&self, ts: &DateTime<Utc>) -> String {
        let mut out = String::new();
        if write!(out, "{}", ts.format(&self.timestamp_format)).is_err() {
            return ts.to_rfc3339();
        }
        out
    }

    /// Width of the source column including its `| ` separator.
    pub fn source_header_width(&self) -> usize {
        self.source_clip_length + 3
    }

    /// Width of the timestamp column including its `| ` separator.
    pub fn timestamp_header_width(&self) -> usize {
        let sample = Utc.timestamp_opt(0, 0).single().unwrap_or_else(Utc::now);
        self.format_timestamp(&sample).chars().count() + 3
    }

    /// Total width taken by the enabled header columns.
    pub fn header_width(&self) -> usize {
        let mut w = 0;
        if self.show_source {
            w += self.source_header_width();
        }
        if self.show_timestamp {
            w += self.timestamp_header_width();
        }
        w
    }

    /// Headers are only drawn when they take less than half of `full_width`.
    pub fn header_fits(&self, full_width: usize) -> bool {
        self.header_width() < full_width / 2
    }
}

// ── Configuration file ────────────────────────────────────────────────────────

/// Error loading or applying a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("unknown color {name:?} for {key}")]
    UnknownColor { name: String, key: String },
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ViewSection {
    pub wrap: Option<bool>,
    pub following: Option<bool>,
    pub highlighting: Option<bool>,
    pub level_highlighting: Option<bool>,
    pub highlight_current: Option<bool>,
    pub concatenate: Option<bool>,
    pub new_event_pattern: Option<String>,
    pub max_events: Option<usize>,
    pub show_source: Option<bool>,
    pub show_timestamp: Option<bool>,
    pub source_clip_length: Option<usize>,
    pub timestamp_format: Option<String>,
    pub current_bg: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ColorPair {
    pub fg: Option<String>,
    pub bg: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct HighlightSection {
    pub pattern: Option<String>,
    #[serde(default)]
    pub colors: BTreeMap<String, ColorPair>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct LevelsSection {
    pub warning_bg: Option<String>,
    pub error_bg: Option<String>,
}

/// Parsed `logview.toml`.  Every key is optional; absent keys leave the
/// corresponding [`ViewConfig`] value alone.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct FileConfig {
    #[serde(default)]
    pub view: ViewSection,
    #[serde(default)]
    pub highlight: HighlightSection,
    #[serde(default)]
    pub levels: LevelsSection,
}

impl FileConfig {
    pub fn parse(s: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let cfg = Self::parse(&s, path)?;
        info!(target: "logview.app", path = %path.display(), "loaded configuration");
        Ok(cfg)
    }

    /// Load the first configuration file found: `explicit` if given (it must
    /// exist), else `./logview.toml`, else `<config_dir>/logview/logview.toml`.
    /// No file at the implicit locations yields the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        for candidate in candidate_paths() {
            if candidate.is_file() {
                return Self::load(&candidate);
            }
        }
        debug!(target: "logview.app", "no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Copy every value present in the file onto `config`.  Patterns and
    /// colors are validated first, so on error `config` is unchanged.
    pub fn apply_to(&self, config: &mut ViewConfig) -> Result<(), ConfigError> {
        let mut next = config.clone();
        let v = &self.view;

        set_if(&mut next.wrap, v.wrap);
        set_if(&mut next.following, v.following);
        set_if(&mut next.highlighting, v.highlighting);
        set_if(&mut next.level_highlighting, v.level_highlighting);
        set_if(&mut next.highlight_current, v.highlight_current);
        set_if(&mut next.concatenate, v.concatenate);
        set_if(&mut next.max_events, v.max_events);
        set_if(&mut next.show_source, v.show_source);
        set_if(&mut next.show_timestamp, v.show_timestamp);
        set_if(&mut next.source_clip_length, v.source_clip_length);
        set_if(&mut next.timestamp_format, v.timestamp_format.clone());

        if let Some(src) = &v.new_event_pattern {
            next.new_event_matcher = optional_pattern(src, Pattern::new_event_matcher)?;
        }
        if let Some(src) = &self.highlight.pattern {
            next.highlight_pattern = optional_pattern(src, Pattern::highlight)?;
        }
        if let Some(name) = &v.current_bg {
            next.current_bg = lookup_color(name, "view.current_bg")?;
        }
        if let Some(name) = &self.levels.warning_bg {
            next.warning_bg = lookup_color(name, "levels.warning_bg")?;
        }
        if let Some(name) = &self.levels.error_bg {
            next.error_bg = lookup_color(name, "levels.error_bg")?;
        }

        for (group, pair) in &self.highlight.colors {
            let key = format!("highlight.colors.{group}");
            let fg = pair.fg.as_deref().map(|n| lookup_color(n, &key)).transpose()?;
            let bg = pair.bg.as_deref().map(|n| lookup_color(n, &key)).transpose()?;
            match (fg, bg) {
                (Some(fg), Some(bg)) => next.set_group_color(group, fg, bg),
                (Some(fg), None) => next.set_group_fg(group, fg),
                (None, Some(bg)) => next.set_group_bg(group, bg),
                (None, None) => {}
            }
        }

        *config = next;
        Ok(())
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("logview").join(CONFIG_FILE_NAME));
    }
    paths
}

fn set_if<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

/// Empty source clears the pattern.
fn optional_pattern(
    src: &str,
    compile: fn(&str) -> Result<Pattern, PatternError>,
) -> Result<Option<Pattern>, ConfigError> {
    if src.is_empty() {
        Ok(None)
    } else {
        Ok(Some(compile(src)?))
    }
}

fn lookup_color(name: &str, key: &str) -> Result<u8, ConfigError> {
    color::by_name(name).ok_or_else(|| ConfigError::UnknownColor {
        name: name.to_owned(),
        key: key.to_owned(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> FileConfig {
        FileConfig::parse(s, Path::new("test.toml")).unwrap()
    }

    // -- ViewConfig -----------------------------------------------------------

    #[test]
    fn defaults() {
        let c = ViewConfig::default();
        assert!(c.wrap);
        assert!(c.following);
        assert!(c.highlighting);
        assert!(!c.concatenate);
        assert_eq!(c.max_events, 0);
        assert_eq!(c.source_clip_length, 6);
        assert_eq!(c.new_event_matcher.as_ref().map(|p| p.src()), Some(r"^[^\s]"));
    }

    #[test]
    fn timestamp_format_renders() {
        let c = ViewConfig::default();
        let ts = Utc.with_ymd_and_hms(2021, 3, 1, 15, 4, 5).unwrap();
        assert_eq!(c.format_timestamp(&ts), "15:04:05.000");
        assert_eq!(c.timestamp_header_width(), 15);
    }

    #[test]
    fn header_needs_less_than_half_the_width() {
        let mut c = ViewConfig::default();
        c.show_source = true;
        assert_eq!(c.header_width(), 9);
        assert!(!c.header_fits(18));
        assert!(c.header_fits(20));
    }

    #[test]
    fn group_fg_takes_text_background() {
        let mut c = ViewConfig::default();
        c.text_style = Style::PLAIN.with_bg(color::BLACK);
        c.set_group_fg("num", color::GREEN);
        let s = c.group_styles.get("num").unwrap();
        assert_eq!(s.fg_color(), Some(color::GREEN));
        assert_eq!(s.bg_color(), Some(color::BLACK));
    }

    // -- FileConfig -----------------------------------------------------------

    #[test]
    fn empty_file_changes_nothing() {
        let mut c = ViewConfig::default();
        parse("").apply_to(&mut c).unwrap();
        assert!(c.wrap);
        assert!(c.highlight_pattern.is_none());
    }

    #[test]
    fn full_file_applies() {
        let src = r#"
[view]
wrap = false
concatenate = true
max_events = 5000
show_timestamp = true
current_bg = "navy"

[highlight]
pattern = '(?P<time>\d{2}:\d{2}:\d{2})|(?P<num>\d+)'

[highlight.colors]
time = { fg = "SeaGreen" }
num = { fg = "violet", bg = "black" }

[levels]
error_bg = "darkred-ish"
"#;
        let mut c = ViewConfig::default();
        let err = parse(src).apply_to(&mut c).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownColor { ref key, .. } if key == "levels.error_bg"));
        assert!(c.wrap, "failed apply must leave config untouched");

        let fixed = src.replace("darkred-ish", "maroon");
        parse(&fixed).apply_to(&mut c).unwrap();
        assert!(!c.wrap);
        assert!(c.concatenate);
        assert_eq!(c.max_events, 5000);
        assert!(c.show_timestamp);
        assert_eq!(c.current_bg, color::BLUE);
        assert_eq!(c.error_bg, color::RED);
        assert_eq!(c.group_styles.get("time").unwrap().fg_color(), Some(29));
        assert_eq!(c.group_styles.get("num").unwrap().bg_color(), Some(color::BLACK));
        assert!(c.highlight_pattern.is_some());
    }

    #[test]
    fn empty_new_event_pattern_clears_matcher() {
        let mut c = ViewConfig::default();
        parse("[view]\nnew_event_pattern = \"\"\n").apply_to(&mut c).unwrap();
        assert!(c.new_event_matcher.is_none());
    }

    #[test]
    fn bad_pattern_is_reported() {
        let mut c = ViewConfig::default();
        let err = parse("[highlight]\npattern = \"(?P<x>\"\n").apply_to(&mut c).unwrap_err();
        assert!(matches!(err, ConfigError::Pattern(_)));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let cfg = parse("[view]\nwrap = true\nsparkles = 3\n[extra]\na = 1\n");
        assert_eq!(cfg.view.wrap, Some(true));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = FileConfig::parse("[view\nwrap = ", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logview.toml");
        std::fs::write(&path, "[view]\nfollowing = false\n").unwrap();
        let cfg = FileConfig::discover(Some(&path)).unwrap();
        assert_eq!(cfg.view.following, Some(false));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = FileConfig::discover(Some(Path::new("/nonexistent/logview.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
