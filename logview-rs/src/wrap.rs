//! Splitting events into page-width display lines and joining them back.
//!
//! An event is either unsplit (one line, `order == 0`) or split into lines
//! with `order` 1..=N.  [`calculate_wrap`] always merges an existing split
//! before partitioning again, so partitions never stack.

use tracing::trace;

use crate::store::{DisplayLine, LineId, LineStore};

/// Codepoint ranges a text of this shape is cut into at `width`.
///
/// A line ends after `width` codepoints or after a `\n`, whichever comes
/// first.  A `\n` directly after a full-width run stays on that run.
pub fn partition(text: &[char], width: usize) -> Vec<(usize, usize)> {
    if width == 0 {
        return vec![(0, text.len())];
    }
    let mut parts = Vec::with_capacity(text.len() / width + 1);
    let mut start = 0;
    let mut end = 0;
    while end < text.len() {
        if end - start == width || text[end] == '\n' {
            if text[end] == '\n' {
                end += 1;
            }
            parts.push((start, end));
            start = end;
        } else {
            end += 1;
        }
    }
    if end > start {
        parts.push((start, end));
    }
    parts
}

/// Collapse a split event back into a single unsplit line.
///
/// Walks back to the first partition, resets it to cover the whole text and
/// deletes the partitions that follow it.  Cursors on a deleted partition
/// land on the survivor.  Returns the unsplit line; a no-op when `line` is
/// already unsplit.
pub fn merge(store: &mut LineStore, line: LineId) -> LineId {
    if store.line(line).order == 0 {
        return line;
    }

    let mut head = line;
    while store.line(head).order > 1 {
        match store.prev(head) {
            Some(p) => head = p,
            None => break,
        }
    }

    let record = store.line(head).record;
    let len = store.record(record).len();
    let parts = store.line(head).line_count;
    {
        let l = store.line_mut(head);
        l.order = 0;
        l.start = 0;
        l.end = len;
        l.line_count = 1;
    }

    while let Some(next) = store.next(head) {
        let l = store.line(next);
        if l.order <= 1 || l.record != record {
            break;
        }
        store.delete(Some(next));
    }

    trace!(target: "logview.wrap", parts, "merged split event");
    head
}

/// Lay out the event owning `line` for `page_width`.  Returns the event's
/// last display line.
///
/// Wrapping off, a zero width, or a text that fits and has no `\n` leaves
/// the event unsplit (merging any previous split).
pub fn calculate_wrap(store: &mut LineStore, line: LineId, page_width: usize, wrap: bool) -> LineId {
    let line = merge(store, line);
    let record = store.line(line).record;

    let rec = store.record(record);
    if !wrap || page_width == 0 || (rec.len() <= page_width && !rec.has_newlines) {
        return line;
    }

    let bounds = partition(&rec.text, page_width);
    if bounds.len() <= 1 {
        return line;
    }

    let count = bounds.len();
    let chain: Vec<DisplayLine> = bounds
        .into_iter()
        .enumerate()
        .map(|(i, (start, end))| DisplayLine::part(record, start, end, i + 1, count))
        .collect();

    trace!(target: "logview.wrap", lines = count, page_width, "split event");
    store.replace(line, chain)
}
