use proptest::prelude::*;

use logview::config::ViewConfig;
use logview::event::{Event, Level};
use logview::highlight::colorize;
use logview::pattern::Pattern;
use logview::store::{DisplayLine, EventRecord, LineId, LineStore};
use logview::viewport::Viewport;
use logview::wrap::{calculate_wrap, merge, partition};

fn push(store: &mut LineStore, text: &str) -> LineId {
    let rec = EventRecord::from_event(&Event::new("p", text));
    let len = rec.len();
    let rid = store.add_record(rec);
    let last = store.last();
    store.insert_after(last, DisplayLine::whole(rid, len))
}

/// Walk the chain both ways and check it agrees with `len`.
fn assert_chain(store: &LineStore) {
    let forward: Vec<_> = store.iter().collect();
    assert_eq!(forward.len(), store.len());
    let mut backward = Vec::new();
    let mut at = store.last();
    while let Some(id) = at {
        backward.push(id);
        at = store.prev(id);
    }
    backward.reverse();
    assert_eq!(forward, backward);
    assert_eq!(store.first(), forward.first().copied());
}

proptest! {
    /// Partitions tile the text with no part wider than the page.
    #[test]
    fn partition_tiles_text(text in "[a-z \n]{0,200}", width in 1usize..40) {
        let chars: Vec<char> = text.chars().collect();
        let parts = partition(&chars, width);
        let mut pos = 0;
        for &(start, end) in &parts {
            prop_assert_eq!(start, pos);
            prop_assert!(end > start);
            let body = &chars[start..end];
            let visible = body.len() - usize::from(body.last() == Some(&'\n'));
            prop_assert!(visible <= width);
            pos = end;
        }
        prop_assert_eq!(pos, chars.len());
    }

    /// Wrapping then merging restores one line over the whole text.
    #[test]
    fn wrap_then_merge_restores_event(text in "\\PC{1,150}", width in 1usize..30) {
        let mut store = LineStore::new();
        let line = push(&mut store, &text);
        let tail = calculate_wrap(&mut store, line, width, true);
        let joined: String = store
            .iter()
            .map(|l| {
                let d = store.line(l);
                store.record(d.record).text[d.start..d.end].iter().collect::<String>()
            })
            .collect();
        prop_assert_eq!(&joined, &text);

        let head = merge(&mut store, tail);
        prop_assert_eq!(store.len(), 1);
        let d = store.line(head);
        prop_assert_eq!(d.order, 0);
        prop_assert_eq!(d.end, text.chars().count());
        assert_chain(&store);
    }

    /// Spans always tile the text, whatever the pattern captures.
    #[test]
    fn spans_cover_text(text in "\\PC{0,80}", tinted in any::<bool>()) {
        let mut config = ViewConfig::default();
        config.highlight_pattern = Some(Pattern::highlight(r"(?P<word>\w+)|(?P<num>\d+)").unwrap());
        config.set_group_fg("word", 2);
        config.set_group_fg("num", 3);
        config.level_highlighting = tinted;
        let chars: Vec<char> = text.chars().collect();
        let spans = colorize(&chars, Level::Error, &config);
        prop_assert!(!spans.is_empty());
        let mut pos = 0;
        for s in &spans {
            prop_assert_eq!(s.start, pos);
            prop_assert!(s.end >= s.start);
            pos = s.end;
        }
        prop_assert_eq!(pos, chars.len());
    }

    /// The display-line count never exceeds the limit after an append.
    #[test]
    fn eviction_keeps_limit(
        texts in prop::collection::vec("[a-z ]{1,30}", 1..60),
        limit in 1usize..20,
        width in 5usize..20,
    ) {
        let mut vp = Viewport::new(ViewConfig::default());
        vp.resize(width, 5);
        vp.set_max_events(limit);
        for (i, t) in texts.iter().enumerate() {
            vp.append(&Event::new(i.to_string(), t));
            // an event wider than the limit is evicted whole
            prop_assert!(vp.event_count() <= limit);
        }
        assert_chain(vp.store());
    }

    /// While following, the last line stays on the page.
    #[test]
    fn following_shows_last_line(
        texts in prop::collection::vec("[a-z ]{1,40}", 1..50),
        width in 5usize..30,
        height in 1usize..10,
    ) {
        let mut vp = Viewport::new(ViewConfig::default());
        vp.resize(width, height);
        for (i, t) in texts.iter().enumerate() {
            vp.append(&Event::new(i.to_string(), t));
            let store = vp.store();
            let last = store.last().unwrap();
            let on_page = store.iter_from(store.top()).take(height).any(|l| l == last);
            prop_assert!(on_page);
        }
    }

    /// Resizing back and forth keeps the chain consistent and the events intact.
    #[test]
    fn resizes_keep_chain_consistent(
        texts in prop::collection::vec("[a-z \n]{1,40}", 1..30),
        widths in prop::collection::vec(1usize..40, 1..6),
    ) {
        let mut vp = Viewport::new(ViewConfig::default());
        for (i, t) in texts.iter().enumerate() {
            vp.append(&Event::new(i.to_string(), t));
        }
        for w in widths {
            vp.resize(w, 8);
            assert_chain(vp.store());
            let store = vp.store();
            prop_assert!(store.current().map_or(true, |c| store.contains(c)));
            prop_assert!(store.top().map_or(true, |t| store.contains(t)));
        }
        let store = vp.store();
        let events = store.iter().filter(|&l| store.line(l).order <= 1).count();
        prop_assert_eq!(events, texts.len());
    }
}
