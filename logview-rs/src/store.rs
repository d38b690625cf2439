//! Display-line store: an arena-backed doubly-linked list.
//!
//! Every appended event gets one [`EventRecord`] holding its owned text and
//! style spans.  The visible chain is made of [`DisplayLine`]s, each covering
//! a codepoint range of one record; a wrapped event is a run of consecutive
//! lines sharing a record.
//!
//! Lines and records live in arenas addressed by generational handles
//! ([`LineId`], [`RecordId`]).  A handle to a freed slot is detected by its
//! generation rather than silently aliasing whatever reused the slot.
//!
//! The store also owns the four cursors the viewport works with: `first`,
//! `last`, `top` and `current`.  Structural operations keep them pointing at
//! live lines.

use chrono::{DateTime, Utc};

use crate::event::{Event, Level};
use crate::highlight::StyleSpan;

// ── Arena ─────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slots are reused through a free list; each reuse bumps the generation.
#[derive(Debug)]
struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Arena<T> {
    fn new() -> Self {
        Self { slots: Vec::new(), free: Vec::new() }
    }

    fn insert(&mut self, value: T) -> (u32, u32) {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.value = Some(value);
            (index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot { generation: 0, value: Some(value) });
            (index, 0)
        }
    }

    fn get(&self, index: u32, generation: u32) -> Option<&T> {
        self.slots
            .get(index as usize)
            .filter(|s| s.generation == generation)
            .and_then(|s| s.value.as_ref())
    }

    fn get_mut(&mut self, index: u32, generation: u32) -> Option<&mut T> {
        self.slots
            .get_mut(index as usize)
            .filter(|s| s.generation == generation)
            .and_then(|s| s.value.as_mut())
    }

    fn remove(&mut self, index: u32, generation: u32) -> Option<T> {
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        let value = slot.value.take()?;
        self.free.push(index);
        Some(value)
    }

    /// Empty every slot.  Generations are kept, so handles from before the
    /// clear stay stale.
    fn clear(&mut self) {
        self.free.clear();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            slot.value = None;
            self.free.push(i as u32);
        }
    }
}

/// Handle to a display line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineId {
    index: u32,
    generation: u32,
}

/// Handle to an event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    index: u32,
    generation: u32,
}

// ── Records and lines ─────────────────────────────────────────────────────────

/// The engine's own copy of one logical event.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub id: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub text: Vec<char>,
    /// The text contains at least one `\n`, so wrapping must consider it
    /// even when it fits the page width.
    pub has_newlines: bool,
    pub spans: Vec<StyleSpan>,
    /// Number of display lines referencing this record.
    refs: usize,
}

impl EventRecord {
    pub fn from_event(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            source: event.source.clone(),
            timestamp: event.timestamp,
            level: event.level,
            text: event.text.chars().collect(),
            has_newlines: event.text.contains('\n'),
            spans: Vec::new(),
            refs: 0,
        }
    }

    /// Extend the text with `\n` followed by `more`.
    pub fn concatenate(&mut self, more: &str) {
        self.text.push('\n');
        self.text.extend(more.chars());
        self.has_newlines = true;
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn text_string(&self) -> String {
        self.text.iter().collect()
    }

    /// A caller-facing copy of the event.
    pub fn to_event(&self) -> Event {
        Event {
            id: self.id.clone(),
            source: self.source.clone(),
            timestamp: self.timestamp,
            level: self.level,
            text: self.text_string(),
        }
    }
}

/// One row's worth of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    pub record: RecordId,
    /// Codepoint range `[start, end)` of the record text.
    pub start: usize,
    pub end: usize,
    /// 0 for an unsplit event, otherwise 1-based position within the event.
    pub order: usize,
    /// Number of display lines the event currently occupies.
    pub line_count: usize,
    prev: Option<LineId>,
    next: Option<LineId>,
}

impl DisplayLine {
    /// An unsplit line covering `[0, len)` of `record`.
    pub fn whole(record: RecordId, len: usize) -> Self {
        Self::part(record, 0, len, 0, 1)
    }

    /// One partition of a split event.
    pub fn part(record: RecordId, start: usize, end: usize, order: usize, line_count: usize) -> Self {
        Self { record, start, end, order, line_count, prev: None, next: None }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn is_split(&self) -> bool {
        self.order != 0
    }

    pub fn prev(&self) -> Option<LineId> {
        self.prev
    }

    pub fn next(&self) -> Option<LineId> {
        self.next
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

/// The display-line chain plus its cursors.
#[derive(Debug)]
pub struct LineStore {
    lines: Arena<DisplayLine>,
    records: Arena<EventRecord>,
    first: Option<LineId>,
    last: Option<LineId>,
    top: Option<LineId>,
    current: Option<LineId>,
    count: usize,
}

impl Default for LineStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LineStore {
    pub fn new() -> Self {
        Self {
            lines: Arena::new(),
            records: Arena::new(),
            first: None,
            last: None,
            top: None,
            current: None,
            count: 0,
        }
    }

    /// Number of display lines in the chain.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn first(&self) -> Option<LineId> {
        self.first
    }

    pub fn last(&self) -> Option<LineId> {
        self.last
    }

    pub fn top(&self) -> Option<LineId> {
        self.top
    }

    pub fn current(&self) -> Option<LineId> {
        self.current
    }

    pub fn set_top(&mut self, id: Option<LineId>) {
        self.top = id;
    }

    pub fn set_current(&mut self, id: Option<LineId>) {
        self.current = id;
    }

    /// Drop every line and record.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.records.clear();
        self.first = None;
        self.last = None;
        self.top = None;
        self.current = None;
        self.count = 0;
    }

    // -- records --------------------------------------------------------------

    /// Store a record.  It is freed again once the last line referencing it
    /// is deleted, so callers must attach it to a line straight away.
    pub fn add_record(&mut self, record: EventRecord) -> RecordId {
        let (index, generation) = self.records.insert(record);
        RecordId { index, generation }
    }

    pub fn record(&self, id: RecordId) -> &EventRecord {
        match self.records.get(id.index, id.generation) {
            Some(r) => r,
            None => panic!("stale record handle {id:?}"),
        }
    }

    pub fn record_mut(&mut self, id: RecordId) -> &mut EventRecord {
        match self.records.get_mut(id.index, id.generation) {
            Some(r) => r,
            None => panic!("stale record handle {id:?}"),
        }
    }

    /// The record behind a line.
    pub fn record_of(&self, line: LineId) -> &EventRecord {
        self.record(self.line(line).record)
    }

    fn retain(&mut self, id: RecordId) {
        self.record_mut(id).refs += 1;
    }

    fn release(&mut self, id: RecordId) {
        let rec = self.record_mut(id);
        rec.refs -= 1;
        if rec.refs == 0 {
            self.records.remove(id.index, id.generation);
        }
    }

    // -- lines ----------------------------------------------------------------

    pub fn contains(&self, id: LineId) -> bool {
        self.lines.get(id.index, id.generation).is_some()
    }

    pub fn line(&self, id: LineId) -> &DisplayLine {
        match self.lines.get(id.index, id.generation) {
            Some(l) => l,
            None => panic!("stale display line handle {id:?}"),
        }
    }

    pub fn line_mut(&mut self, id: LineId) -> &mut DisplayLine {
        match self.lines.get_mut(id.index, id.generation) {
            Some(l) => l,
            None => panic!("stale display line handle {id:?}"),
        }
    }

    pub fn next(&self, id: LineId) -> Option<LineId> {
        self.line(id).next
    }

    pub fn prev(&self, id: LineId) -> Option<LineId> {
        self.line(id).prev
    }

    /// Iterate forward from `start` (inclusive) to the end of the chain.
    pub fn iter_from(&self, start: Option<LineId>) -> Iter<'_> {
        Iter { store: self, next: start }
    }

    /// Iterate over the whole chain.
    pub fn iter(&self) -> Iter<'_> {
        self.iter_from(self.first)
    }

    fn alloc(&mut self, line: DisplayLine) -> LineId {
        let record = line.record;
        let (index, generation) = self.lines.insert(line);
        self.retain(record);
        LineId { index, generation }
    }

    fn free(&mut self, id: LineId) {
        if let Some(line) = self.lines.remove(id.index, id.generation) {
            self.release(line.record);
        }
    }

    /// Link `line` after `after`.  `None` means the chain is empty and the
    /// new line becomes `first`, `last`, `top` and `current`.
    pub fn insert_after(&mut self, after: Option<LineId>, mut line: DisplayLine) -> LineId {
        match after {
            None => {
                line.prev = None;
                line.next = None;
                let id = self.alloc(line);
                self.first = Some(id);
                self.last = Some(id);
                self.top = Some(id);
                self.current = Some(id);
                self.count += 1;
                id
            }
            Some(node) => {
                let following = self.next(node);
                line.prev = Some(node);
                line.next = following;
                let id = self.alloc(line);
                if let Some(n) = following {
                    self.line_mut(n).prev = Some(id);
                }
                self.line_mut(node).next = Some(id);
                if self.last == Some(node) {
                    self.last = Some(id);
                }
                self.count += 1;
                id
            }
        }
    }

    /// Unlink and free `id`.  Cursors pointing at it move to its predecessor,
    /// or to its successor when it was the first line.
    pub fn delete(&mut self, id: Option<LineId>) {
        let Some(id) = id else { return };
        let (prev, next) = {
            let l = self.line(id);
            (l.prev, l.next)
        };
        if let Some(n) = next {
            self.line_mut(n).prev = prev;
        }
        if let Some(p) = prev {
            self.line_mut(p).next = next;
        }
        let survivor = prev.or(next);
        if self.first == Some(id) {
            self.first = next;
        }
        if self.last == Some(id) {
            self.last = prev;
        }
        if self.top == Some(id) {
            self.top = survivor;
        }
        if self.current == Some(id) {
            self.current = survivor;
        }
        self.free(id);
        self.count -= 1;
    }

    /// Substitute `old` with `chain`, linking the chain in order.  Cursors on
    /// `old` move to the first new line, except `last`, which moves to the
    /// last one.  Returns the last new line.
    ///
    /// An empty chain leaves the store unchanged and returns `old`.
    pub fn replace(&mut self, old: LineId, chain: Vec<DisplayLine>) -> LineId {
        if chain.is_empty() {
            return old;
        }
        let (prev, next) = {
            let l = self.line(old);
            (l.prev, l.next)
        };
        let added = chain.len();

        let mut ids: Vec<LineId> = Vec::with_capacity(added);
        for mut line in chain {
            line.prev = ids.last().copied().or(prev);
            line.next = None;
            let id = self.alloc(line);
            if let Some(&before) = ids.last() {
                self.line_mut(before).next = Some(id);
            }
            ids.push(id);
        }
        let head = ids[0];
        let tail = ids[added - 1];
        self.line_mut(tail).next = next;

        if let Some(p) = prev {
            self.line_mut(p).next = Some(head);
        }
        if let Some(n) = next {
            self.line_mut(n).prev = Some(tail);
        }

        if self.first == Some(old) {
            self.first = Some(head);
        }
        if self.last == Some(old) {
            self.last = Some(tail);
        }
        if self.top == Some(old) {
            self.top = Some(head);
        }
        if self.current == Some(old) {
            self.current = Some(head);
        }

        self.free(old);
        self.count = self.count + added - 1;
        tail
    }

    /// Walk `offset` lines from `start` (negative walks back), stopping at
    /// either end of the chain.
    pub fn at_offset(&self, start: LineId, offset: isize) -> LineId {
        let mut at = start;
        let forward = offset > 0;
        for _ in 0..offset.unsigned_abs() {
            let step = if forward { self.next(at) } else { self.prev(at) };
            match step {
                Some(s) => at = s,
                None => break,
            }
        }
        at
    }

    /// Backward steps from `start` to reach `target`, capped at `limit`.
    pub fn distance(&self, start: LineId, target: LineId, limit: usize) -> usize {
        let mut at = Some(start);
        let mut steps = 0;
        while steps < limit {
            match at {
                Some(a) if a == target => return steps,
                Some(a) => at = self.prev(a),
                None => {}
            }
            steps += 1;
        }
        steps
    }
}

/// Forward iterator over line handles.
pub struct Iter<'a> {
    store: &'a LineStore,
    next: Option<LineId>,
}

impl Iterator for Iter<'_> {
    type Item = LineId;

    fn next(&mut self) -> Option<LineId> {
        let id = self.next?;
        self.next = self.store.next(id);
        Some(id)
    }
}
