//! Command-line arguments for the `logview` binary.
//!
//! Usage:
//!   logview [OPTIONS] [FILE]
//!
//! Without FILE, lines are read from stdin.  Flags override values from the
//! configuration file.

use std::path::PathBuf;

use clap::Parser;

use crate::config::ViewConfig;
use crate::pattern::{Pattern, PatternError};

// ── Public types ──────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "logview", version, about = "Scrollable, highlighting terminal log viewer")]
pub struct Cli {
    /// Log file to view; stdin when omitted
    pub file: Option<PathBuf>,

    /// Keep reading lines appended to FILE
    #[arg(short, long)]
    pub follow: bool,

    /// Configuration file (default: ./logview.toml, then the user config dir)
    #[arg(short, long, value_name = "PATH", conflicts_with = "no_config")]
    pub config: Option<PathBuf>,

    /// Ignore configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Highlight pattern with named capture groups
    #[arg(short, long, value_name = "REGEX")]
    pub pattern: Option<String>,

    /// Display-line limit; 0 keeps everything
    #[arg(short = 'm', long, value_name = "N")]
    pub max_events: Option<usize>,

    /// Do not wrap long lines
    #[arg(long)]
    pub no_wrap: bool,

    /// Fold lines that do not start a new event into the previous one
    #[arg(long)]
    pub concatenate: bool,

    /// Regex a line must match to start a new event
    #[arg(long, value_name = "REGEX", requires = "concatenate")]
    pub new_event: Option<String>,

    #[arg(long)]
    pub show_timestamp: bool,

    #[arg(long)]
    pub show_source: bool,

    /// Write diagnostics here (filtered by LOGVIEW_LOG)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// How to choose the configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigFile {
    /// Search the default locations.
    Search,
    /// `--no-config`.
    Skip,
    /// `--config <path>`; must exist.
    Explicit(PathBuf),
}

impl Cli {
    pub fn config_file(&self) -> ConfigFile {
        match (&self.config, self.no_config) {
            (_, true) => ConfigFile::Skip,
            (Some(path), false) => ConfigFile::Explicit(path.clone()),
            (None, false) => ConfigFile::Search,
        }
    }

    /// Source label for ingested events.
    pub fn source_name(&self) -> String {
        self.file
            .as_ref()
            .and_then(|p| p.file_name())
            .map_or_else(|| "stdin".to_owned(), |n| n.to_string_lossy().into_owned())
    }

    /// Overlay the flags that were given onto `config`.  Patterns are
    /// compiled before anything is changed.
    pub fn apply_to(&self, config: &mut ViewConfig) -> Result<(), PatternError> {
        let pattern = self.pattern.as_deref().map(Pattern::highlight).transpose()?;
        let matcher = self.new_event.as_deref().map(Pattern::new_event_matcher).transpose()?;

        if let Some(p) = pattern {
            config.highlight_pattern = Some(p);
        }
        if let Some(m) = matcher {
            config.new_event_matcher = Some(m);
        }
        if let Some(n) = self.max_events {
            config.max_events = n;
        }
        if self.no_wrap {
            config.wrap = false;
        }
        if self.concatenate {
            config.concatenate = true;
        }
        if self.show_timestamp {
            config.show_timestamp = true;
        }
        if self.show_source {
            config.show_source = true;
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
