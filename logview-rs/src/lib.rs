//! Scrollable, incrementally updated viewport over a stream of log events.
//!
//! ## Layers
//!
//! | Module | Role |
//! |--------|------|
//! | [`event`] | caller-facing [`Event`] and [`Level`] |
//! | [`store`] | arena-backed chain of display lines and shared event records |
//! | [`pattern`] | compiled highlight / continuation regexes |
//! | [`highlight`] | named captures to gap-free [`highlight::StyleSpan`]s |
//! | [`wrap`] | splitting events at the page width and merging them back |
//! | [`viewport`] | top/current cursors, following, scrolling, eviction, rows |
//! | [`view`] | [`LogView`], the lock-guarded front end |
//! | [`velocity`] | per-bucket event-rate histogram |
//! | [`config`] | live settings and the `logview.toml` file |
//!
//! The remaining modules make up the `logview` terminal viewer.

pub mod config;
pub mod event;
pub mod highlight;
pub mod pattern;
pub mod store;
pub mod style;
pub mod velocity;
pub mod view;
pub mod viewport;
pub mod wrap;

pub mod app;
pub mod cli;
pub mod ingest;
pub mod keybind;
pub mod terminal;

pub use config::ViewConfig;
pub use event::{Event, Level};
pub use pattern::PatternError;
pub use velocity::{LevelFilter, VelocityHistogram};
pub use view::LogView;
pub use viewport::{DrawRow, EngineError};
