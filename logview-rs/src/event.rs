//! Log events as handed to the viewer.
//!
//! An [`Event`] is a plain value: the viewer copies what it needs on append,
//! so callers may reuse or mutate their events afterwards.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

/// Severity of a log event.  Warnings and errors can be tinted when level
/// highlighting is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Level {
    #[default]
    Info,
    Warning,
    Error,
}

impl Level {
    pub fn name(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warning => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = String;

    /// Case-insensitive; accepts the usual spellings found in log lines.
    fn from_str(s: &str) -> Result<Self, String> {
        match s.to_ascii_lowercase().as_str() {
            "info" | "debug" | "trace" | "notice" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warning),
            "error" | "err" | "fatal" | "critical" | "crit" => Ok(Level::Error),
            _ => Err(format!("unknown level: {s}")),
        }
    }
}

/// One ingested log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Identifier used by [`crate::view::LogView::scroll_to_event_id`] and
    /// friends.  ASCII only.
    pub id: String,
    /// What produced the event (file, host, service…).  ASCII only.
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub text: String,
}

impl Event {
    /// Build an info-level event stamped with the current time.
    ///
    /// Tabs are expanded to four spaces so that one codepoint always occupies
    /// one cell.
    pub fn new(id: impl Into<String>, text: &str) -> Self {
        Self {
            id: id.into(),
            source: String::new(),
            timestamp: Utc::now(),
            level: Level::Info,
            text: expand_tabs(text),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Number of codepoints in the text.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Replace every tab with four spaces.
pub fn expand_tabs(text: &str) -> String {
    if text.contains('\t') {
        text.replace('\t', "    ")
    } else {
        text.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_expands_tabs() {
        let e = Event::new("1", "a\tb");
        assert_eq!(e.text, "a    b");
        assert_eq!(e.level, Level::Info);
    }

    #[test]
    fn builder_sets_fields() {
        let ts = Utc.with_ymd_and_hms(2021, 3, 1, 10, 0, 0).unwrap();
        let e = Event::new("7", "boom")
            .with_source("api")
            .with_level(Level::Error)
            .with_timestamp(ts);
        assert_eq!(e.source, "api");
        assert_eq!(e.level, Level::Error);
        assert_eq!(e.timestamp, ts);
    }

    #[test]
    fn char_count_is_codepoints() {
        assert_eq!(Event::new("1", "møøsè").char_count(), 5);
    }

    #[test]
    fn level_parses_common_spellings() {
        assert_eq!("WARN".parse::<Level>(), Ok(Level::Warning));
        assert_eq!("Fatal".parse::<Level>(), Ok(Level::Error));
        assert_eq!("debug".parse::<Level>(), Ok(Level::Info));
        assert!("loud".parse::<Level>().is_err());
    }

    #[test]
    fn levels_order_by_severity() {
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Error);
    }
}
