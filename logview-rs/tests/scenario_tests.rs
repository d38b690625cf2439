//! End-to-end behavior of `LogView` through its public API.

use chrono::{DateTime, Duration, TimeZone, Utc};
use logview::highlight::colorize;
use logview::pattern::Pattern;
use logview::style::Style;
use logview::{Event, Level, LogView, ViewConfig};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 3, 1, 10, 0, 0).unwrap()
}

fn numbered_events(count: usize, start: DateTime<Utc>) -> Vec<Event> {
    (0..count)
        .map(|i| Event::new(format!("e{i}"), &format!("Event #{i}")).with_timestamp(start + Duration::seconds(i as i64)))
        .collect()
}

fn selecting_view() -> LogView {
    let view = LogView::default();
    view.set_highlight_current_event(true);
    view
}

fn current_id(view: &LogView) -> String {
    view.current_event().expect("a current event").id
}

const LONG: &str = "This is a rather long event and it should be wrapped";

// ── Counting and seeking ──────────────────────────────────────────────────────

#[test]
fn event_count() {
    let view = LogView::default();
    view.append_events(&numbered_events(100, t0()));
    assert_eq!(view.event_count(), 100);
}

#[test]
fn scroll_to_event_id() {
    let view = selecting_view();
    view.append_events(&numbered_events(100, t0()));
    assert!(view.scroll_to_event_id("e20"));
    assert_eq!(current_id(&view), "e20");
}

#[test]
fn scroll_to_timestamp() {
    let view = selecting_view();
    view.append_events(&numbered_events(100, t0()));
    assert!(view.scroll_to_timestamp(t0() + Duration::seconds(20)));
    assert_eq!(current_id(&view), "e20");
}

#[test]
fn scroll_to_timestamp_between_events() {
    let view = selecting_view();
    view.append_events(&numbered_events(100, t0()));
    assert!(view.scroll_to_timestamp(t0() + Duration::milliseconds(20_500)));
    assert_eq!(current_id(&view), "e21");
}

#[test]
fn seek_miss_changes_nothing() {
    let view = selecting_view();
    view.append_events(&numbered_events(100, t0()));
    view.draw(100, 10);
    view.scroll_to_event_id("e50");
    assert!(!view.scroll_to_event_id("e100"));
    assert!(!view.scroll_to_timestamp(t0() + Duration::hours(1)));
    assert_eq!(current_id(&view), "e50");
}

// ── Scrolling ─────────────────────────────────────────────────────────────────

#[test]
fn scroll_to_top() {
    let view = selecting_view();
    view.append_events(&numbered_events(100, t0()));
    view.scroll_to_start();
    assert_eq!(current_id(&view), "e0");
    assert!(!view.is_following());
}

#[test]
fn scroll_to_bottom() {
    let view = selecting_view();
    view.append_events(&numbered_events(100, t0()));
    view.draw(100, 10);

    view.scroll_to_start();
    view.set_following(false);
    view.scroll_to_end();

    assert_eq!(current_id(&view), "e99");
    assert_eq!(view.top_event().unwrap().id, "e90");
    assert!(view.is_following());
}

#[test]
fn following_keeps_tail_visible_while_appending() {
    let view = selecting_view();
    view.draw(40, 5);
    for (i, e) in numbered_events(30, t0()).iter().enumerate() {
        view.append_event(e);
        let rows = view.draw(40, 5);
        assert!(rows.iter().any(|r| r.event_id == format!("e{i}")), "e{i} not visible");
    }
}

#[test]
fn paused_view_does_not_move_on_append() {
    let view = selecting_view();
    view.append_events(&numbered_events(50, t0()));
    view.draw(40, 5);
    view.scroll_page_up();
    let top = view.top_event().unwrap().id;
    view.append_events(&numbered_events(10, t0() + Duration::minutes(1)));
    assert_eq!(view.top_event().unwrap().id, top);
}

// ── Wrapping ──────────────────────────────────────────────────────────────────

#[test]
fn long_event_wraps_into_three_rows() {
    let view = LogView::default();
    view.append_event(&Event::new("long", LONG));
    let rows = view.draw(20, 10);
    assert_eq!(rows.len(), 3);
    assert_eq!(view.event_count(), 3);
    assert_eq!(rows.iter().map(|r| r.order).collect::<Vec<_>>(), [1, 2, 3]);
    let joined: String = rows.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(joined, LONG);
}

#[test]
fn widening_merges_back() {
    let view = LogView::default();
    view.append_event(&Event::new("long", LONG));
    view.draw(20, 10);
    let rows = view.draw(100, 10);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].order, 0);
    assert_eq!(rows[0].text, LONG);
    assert_eq!(view.first_event().unwrap().text, LONG);
}

#[test]
fn disabling_wrap_keeps_one_row() {
    let view = LogView::default();
    view.set_line_wrap(false);
    view.append_event(&Event::new("long", LONG));
    let rows = view.draw(20, 10);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].text, LONG);
}

// ── Concatenation ─────────────────────────────────────────────────────────────

#[test]
fn continuation_lines_join_previous_event() {
    let view = LogView::default();
    view.set_concatenate_events(true);
    view.set_new_event_matching_regex(r"^[^\s]").unwrap();
    view.append_event(&Event::new("1", "Line 1"));
    view.append_event(&Event::new("2", " and still line 1"));

    assert_eq!(view.event_count(), 1);
    let event = view.first_event().unwrap();
    assert_eq!(event.id, "1");
    assert_eq!(event.text.replace('\n', ""), "Line 1 and still line 1");
}

#[test]
fn continuation_rows_follow_source_lines() {
    let view = LogView::default();
    view.set_concatenate_events(true);
    view.append_event(&Event::new("1", "Line 1"));
    view.append_event(&Event::new("2", " and still line 1"));
    let rows = view.draw(80, 10);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].text, "Line 1");
    assert_eq!(rows[1].text, " and still line 1");
    assert!(rows.iter().all(|r| r.event_id == "1"));
}

// ── Limits ────────────────────────────────────────────────────────────────────

#[test]
fn max_events_set_before_appending() {
    let view = LogView::default();
    view.set_max_events(10);
    view.append_events(&numbered_events(100, t0()));
    assert_eq!(view.event_count(), 10);
    assert_eq!(view.first_event().unwrap().id, "e90");
}

#[test]
fn max_events_set_after_appending() {
    let view = LogView::default();
    view.append_events(&numbered_events(100, t0()));
    view.set_max_events(10);
    assert_eq!(view.event_count(), 10);
    assert_eq!(view.first_event().unwrap().id, "e90");
}

#[test]
fn clear_then_append() {
    let view = LogView::default();
    view.append_events(&numbered_events(10, t0()));
    view.clear();
    assert_eq!(view.event_count(), 0);
    assert!(view.first_event().is_none());
    view.append_event(&Event::new("x", "again"));
    assert_eq!(view.first_event().unwrap().id, "x");
}

// ── Highlighting ──────────────────────────────────────────────────────────────

#[test]
fn mixed_script_spans_are_codepoint_exact() {
    let mut config = ViewConfig::default();
    config.highlight_pattern =
        Some(Pattern::highlight(r"\s+(?P<word1>[\p{L}]*)\s+(?P<word2>.*)\s+(?P<num>\d+) (?P<word3>[\p{L}]*)").unwrap());
    for g in ["word1", "word2", "num", "word3"] {
        config.set_group_fg(g, 2);
    }
    let text: Vec<char> = " Два wordoслова 11 møøsè".chars().collect();
    let spans = colorize(&text, Level::Info, &config);
    let pieces: Vec<String> = spans.iter().map(|s| text[s.start..s.end].iter().collect()).collect();
    assert_eq!(pieces, [" ", "Два", " ", "wordoслова", " ", "11", " ", "møøsè"]);
}

#[test]
fn highlighted_rows_carry_group_styles() {
    let view = LogView::default();
    view.set_highlight_pattern(r"(?P<g1>Event)\s+(?P<g2>#\d+)").unwrap();
    view.set_highlight_color_fg("g1", 6);
    view.set_highlight_color("g2", 2, 0);
    view.append_event(&Event::new("e0", "Event #12 done"));
    let row = &view.draw(80, 5)[0];
    let styled: Vec<(String, Style)> = row
        .spans
        .iter()
        .map(|s| (row.text.chars().skip(s.start).take(s.len()).collect(), s.style))
        .collect();
    assert_eq!(styled[0].0, "Event");
    assert_eq!(styled[0].1.fg_color(), Some(6));
    assert_eq!(styled[2].0, "#12");
    assert_eq!(styled[2].1.bg_color(), Some(0));
    assert_eq!(styled[3].0, " done");
}

#[test]
fn level_tint_applies_to_errors() {
    let view = LogView::default();
    view.set_level_highlighting(true);
    view.set_error_bg_color(52);
    view.append_event(&Event::new("1", "boom").with_level(Level::Error));
    view.append_event(&Event::new("2", "fine"));
    let rows = view.draw(80, 5);
    assert_eq!(rows[0].spans[0].style.bg_color(), Some(52));
    assert_eq!(rows[1].spans[0].style.bg_color(), None);
}

#[test]
fn find_matching_event_walks_forward() {
    let view = LogView::default();
    view.append_events(&numbered_events(20, t0()));
    let hit = view.find_matching_event("e3", |e| e.text.contains('7'));
    assert_eq!(hit.unwrap().id, "e7");
    assert!(view.find_matching_event("", |e| e.text.contains("nothing")).is_none());
}
