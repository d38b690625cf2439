//! Turning input lines into [`Event`]s and feeding them to the app.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::event::{Event, Level};

/// How long to wait for more data at end of file when following.
const FOLLOW_POLL: Duration = Duration::from_millis(250);

/// Numbers lines and detects their timestamp and level.
#[derive(Debug, Clone)]
pub struct LineParser {
    source: String,
    line_no: u64,
}

impl LineParser {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into(), line_no: 0 }
    }

    pub fn parse(&mut self, line: &str) -> Event {
        self.line_no += 1;
        let line = line.trim_end_matches(['\r', '\n']);
        Event::new(self.line_no.to_string(), line)
            .with_source(self.source.clone())
            .with_timestamp(leading_timestamp(line).unwrap_or_else(Utc::now))
            .with_level(detect_level(line))
    }
}

/// A timestamp at the start of `line`: RFC 3339, or `YYYY-MM-DD HH:MM:SS`
/// with optional fraction, read as UTC.
pub fn leading_timestamp(line: &str) -> Option<DateTime<Utc>> {
    let first = line.split_whitespace().next()?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(first) {
        return Some(ts.with_timezone(&Utc));
    }
    let mut words = line.split_whitespace();
    let date_time = format!("{} {}", words.next()?, words.next()?);
    NaiveDateTime::parse_from_str(&date_time, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// The most severe upper-case level word in `line`.
pub fn detect_level(line: &str) -> Level {
    line.split(|c: char| !c.is_ascii_alphabetic())
        .filter_map(|word| match word {
            "ERROR" | "FATAL" | "CRITICAL" => Some(Level::Error),
            "WARN" | "WARNING" => Some(Level::Warning),
            _ => None,
        })
        .max()
        .unwrap_or(Level::Info)
}

/// Read lines from `path` (stdin when `None`) and send them as events.
/// With `follow`, keeps polling the file for appended lines until the
/// receiver goes away.
pub async fn read_events(
    path: Option<PathBuf>,
    follow: bool,
    mut parser: LineParser,
    tx: mpsc::Sender<Event>,
) -> std::io::Result<()> {
    match path {
        Some(p) => {
            let file = tokio::fs::File::open(&p).await?;
            debug!(target: "logview.app", path = %p.display(), follow, "reading file");
            pump(BufReader::new(file), follow, &mut parser, &tx).await
        }
        None => pump(BufReader::new(tokio::io::stdin()), false, &mut parser, &tx).await,
    }
}

async fn pump<R>(
    mut reader: R,
    follow: bool,
    parser: &mut LineParser,
    tx: &mpsc::Sender<Event>,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    loop {
        let n = reader.read_until(b'\n', &mut buf).await?;
        if n == 0 || !buf.ends_with(b"\n") {
            // partial line: wait for the rest when following
            if follow {
                tokio::time::sleep(FOLLOW_POLL).await;
                if tx.is_closed() {
                    return Ok(());
                }
                continue;
            }
            if buf.is_empty() {
                return Ok(());
            }
        }
        let line = String::from_utf8_lossy(&buf);
        if tx.send(parser.parse(&line)).await.is_err() {
            return Ok(());
        }
        if n == 0 || !buf.ends_with(b"\n") {
            return Ok(());
        }
        buf.clear();
    }
}

/// Log ingestion errors without tearing down the UI.
pub async fn run_reader(path: Option<PathBuf>, follow: bool, parser: LineParser, tx: mpsc::Sender<Event>) {
    if let Err(e) = read_events(path, follow, parser, tx).await {
        warn!(target: "logview.app", error = %e, "input reader stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn numbers_lines_and_sets_source() {
        let mut p = LineParser::new("app.log");
        let a = p.parse("first\n");
        let b = p.parse("second\r\n");
        assert_eq!((a.id.as_str(), a.text.as_str()), ("1", "first"));
        assert_eq!((b.id.as_str(), b.text.as_str()), ("2", "second"));
        assert_eq!(b.source, "app.log");
    }

    #[test]
    fn rfc3339_prefix() {
        let ts = leading_timestamp("2021-03-01T10:00:05Z GET /").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2021, 3, 1, 10, 0, 5).unwrap());
        let ts = leading_timestamp("2021-03-01T12:00:05+02:00 x").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2021, 3, 1, 10, 0, 5).unwrap());
    }

    #[test]
    fn space_separated_prefix() {
        let ts = leading_timestamp("2021-03-01 10:00:05 INFO ok").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2021, 3, 1, 10, 0, 5).unwrap());
        let ts = leading_timestamp("2021-03-01 10:00:05.250 INFO ok").unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn no_timestamp() {
        assert!(leading_timestamp("hello world").is_none());
        assert!(leading_timestamp("").is_none());
    }

    #[test]
    fn level_words() {
        assert_eq!(detect_level("[ERROR] boom"), Level::Error);
        assert_eq!(detect_level("x WARN y"), Level::Warning);
        assert_eq!(detect_level("WARN then FATAL"), Level::Error);
        assert_eq!(detect_level("an error in lower case"), Level::Info);
        assert_eq!(detect_level("WARNINGS"), Level::Info);
    }

    #[tokio::test]
    async fn reads_all_lines_without_follow() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        std::fs::write(&path, "one\ntwo\nthree").unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        read_events(Some(path), false, LineParser::new("a.log"), tx).await.unwrap();
        let mut texts = Vec::new();
        while let Some(e) = rx.recv().await {
            texts.push(e.text);
        }
        assert_eq!(texts, ["one", "two", "three"]);
    }
}
