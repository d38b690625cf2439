//! Event-rate histogram.
//!
//! [`VelocityHistogram`] counts events per level at one-second resolution and
//! folds the counts into buckets of the current width on demand, so changing
//! the bucket width never loses data.  It is fed from the same append stream
//! as the viewport but shares no state with it.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::event::Level;

/// Bucket widths, in seconds, that `set_time_window` picks from.
const NICE_WIDTHS: [i64; 16] = [
    1, 5, 10, 15, 30,
    60, 120, 300, 600, 900, 1800,
    3600, 7200, 21600, 43200,
    86400,
];

/// Which events a histogram column counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelFilter {
    /// Info events only.
    Info,
    Warning,
    Error,
    #[default]
    All,
}

impl LevelFilter {
    fn count(self, c: &Counts) -> usize {
        match self {
            LevelFilter::Info => c.info,
            LevelFilter::Warning => c.warning,
            LevelFilter::Error => c.error,
            LevelFilter::All => c.info + c.warning + c.error,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Counts {
    info: usize,
    warning: usize,
    error: usize,
}

#[derive(Debug)]
struct State {
    /// Bucket width in seconds, at least 1.
    bucket_width: i64,
    per_second: BTreeMap<i64, Counts>,
    anchor: Option<DateTime<Utc>>,
    show: LevelFilter,
}

/// Thread-safe event counter bucketed by time.
#[derive(Debug)]
pub struct VelocityHistogram {
    state: RwLock<State>,
}

impl VelocityHistogram {
    pub fn new(bucket_width: Duration) -> Self {
        Self {
            state: RwLock::new(State {
                bucket_width: (bucket_width.as_secs() as i64).max(1),
                per_second: BTreeMap::new(),
                anchor: None,
                show: LevelFilter::All,
            }),
        }
    }

    pub fn append_event(&self, timestamp: DateTime<Utc>, level: Level) {
        let mut s = self.state.write();
        let c = s.per_second.entry(timestamp.timestamp()).or_default();
        match level {
            Level::Info => c.info += 1,
            Level::Warning => c.warning += 1,
            Level::Error => c.error += 1,
        }
    }

    pub fn bucket_width(&self) -> Duration {
        Duration::from_secs(self.state.read().bucket_width as u64)
    }

    /// Pick the largest nice bucket width so that `columns` buckets span at
    /// most `window`.
    pub fn set_time_window(&self, window: Duration, columns: usize) {
        let per_column = window.as_secs() as i64 / columns.max(1) as i64;
        let width = NICE_WIDTHS
            .iter()
            .copied()
            .take_while(|&w| w <= per_column)
            .last()
            .unwrap_or(1);
        let mut s = self.state.write();
        if s.bucket_width != width {
            debug!(target: "logview.velocity", bucket_width = width, columns, "bucket width changed");
            s.bucket_width = width;
        }
    }

    /// Scale the buckets so that `[start, end]` fits `columns` columns.
    pub fn auto_scale(&self, start: DateTime<Utc>, end: DateTime<Utc>, columns: usize) {
        let window = (end - start).to_std().unwrap_or(Duration::ZERO);
        self.set_time_window(window, columns);
    }

    /// The time of the rightmost column; `None` follows the clock.
    pub fn set_anchor(&self, anchor: Option<DateTime<Utc>>) {
        self.state.write().anchor = anchor;
    }

    pub fn set_show_level(&self, show: LevelFilter) {
        self.state.write().show = show;
    }

    pub fn show_level(&self) -> LevelFilter {
        self.state.read().show
    }

    /// Counts for the `columns` buckets ending at the anchor bucket, oldest
    /// first.
    pub fn values(&self, columns: usize) -> Vec<usize> {
        let s = self.state.read();
        let anchor = s.anchor.unwrap_or_else(Utc::now).timestamp();
        let w = s.bucket_width;
        let last = anchor.div_euclid(w);

        (0..columns as i64)
            .rev()
            .map(|back| {
                let from = (last - back) * w;
                s.per_second
                    .range(from..from + w)
                    .map(|(_, c)| s.show.count(c))
                    .sum()
            })
            .collect()
    }

    /// Forget every count.
    pub fn clear(&self) {
        self.state.write().per_second.clear();
    }
}

/// Axis label for a count: four columns wide below a thousand, otherwise one
/// decimal with a `K`, `M` or `B` suffix.
pub fn format_value(value: usize) -> String {
    let v = value as f64;
    match value {
        0..=999 => format!("{value:4}"),
        1_000..=999_999 => format!("{:.1}K", v / 1e3),
        1_000_000..=999_999_999 => format!("{:.1}M", v / 1e6),
        _ => format!("{:.1}B", v / 1e9),
    }
}

/// `mm:ss`, or `hh:mm:ss` from one hour up.
pub fn format_duration(secs: u64) -> String {
    let (hours, minutes, seconds) = (secs / 3600, secs / 60 % 60, secs % 60);
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}
