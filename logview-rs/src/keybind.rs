//! Key and mouse bindings: [`Action`] and [`Keymap`].
//!
//! ## Default bindings
//!
//! | Keys | Action |
//! |------|--------|
//! | `Home`, `g` | first event |
//! | `End`, `G` | last event, following |
//! | `Up`, `k` / `Down`, `j` | one line |
//! | `PageUp`, `Ctrl-B` / `PageDown`, `Ctrl-F`, `Space` | one page |
//! | `f` | toggle following |
//! | `w` | toggle wrapping |
//! | `h` | toggle highlighting |
//! | `t` / `s` | toggle timestamp / source column |
//! | `Ctrl-L` | redraw |
//! | `q`, `Esc`, `Ctrl-C` | quit |
//!
//! A left click selects the clicked row; the wheel scrolls by pages.

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

// ── Action ────────────────────────────────────────────────────────────────────

/// Viewer operations a key can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ScrollToStart,
    ScrollToEnd,
    LineUp,
    LineDown,
    PageUp,
    PageDown,
    ToggleFollowing,
    ToggleWrap,
    ToggleHighlighting,
    ToggleTimestamp,
    ToggleSource,
    Redraw,
    Quit,
    /// Select the row at this 0-based screen position.
    SelectRow(u16),
}

impl Action {
    /// The canonical name, as used in messages and logs.
    pub fn name(self) -> &'static str {
        match self {
            Action::ScrollToStart      => "START",
            Action::ScrollToEnd        => "END",
            Action::LineUp             => "LINEUP",
            Action::LineDown           => "LINEDOWN",
            Action::PageUp             => "PAGEUP",
            Action::PageDown           => "PAGEDOWN",
            Action::ToggleFollowing    => "FOLLOW",
            Action::ToggleWrap         => "WRAP",
            Action::ToggleHighlighting => "HIGHLIGHT",
            Action::ToggleTimestamp    => "TIMESTAMP",
            Action::ToggleSource       => "SOURCE",
            Action::Redraw             => "REDRAW",
            Action::Quit               => "QUIT",
            Action::SelectRow(_)       => "SELECT",
        }
    }
}

// ── Keymap ────────────────────────────────────────────────────────────────────

/// Key chords bound to actions.  Shift is folded into the character, so
/// `G` is bound as `(Char('G'), NONE)`.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: HashMap<(KeyCode, KeyModifiers), Action>,
}

impl Keymap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a chord, returning the action it replaced.
    pub fn bind(&mut self, code: KeyCode, modifiers: KeyModifiers, action: Action) -> Option<Action> {
        self.bindings.insert((code, modifiers), action)
    }

    pub fn unbind(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        self.bindings.remove(&(code, modifiers));
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Add the default bindings listed in the module docs.
    pub fn with_defaults(mut self) -> Self {
        use Action::*;
        let none = KeyModifiers::NONE;
        let ctrl = KeyModifiers::CONTROL;
        for (code, mods, action) in [
            (KeyCode::Home,      none, ScrollToStart),
            (KeyCode::Char('g'), none, ScrollToStart),
            (KeyCode::End,       none, ScrollToEnd),
            (KeyCode::Char('G'), none, ScrollToEnd),
            (KeyCode::Up,        none, LineUp),
            (KeyCode::Char('k'), none, LineUp),
            (KeyCode::Down,      none, LineDown),
            (KeyCode::Char('j'), none, LineDown),
            (KeyCode::PageUp,    none, PageUp),
            (KeyCode::Char('b'), ctrl, PageUp),
            (KeyCode::PageDown,  none, PageDown),
            (KeyCode::Char('f'), ctrl, PageDown),
            (KeyCode::Char(' '), none, PageDown),
            (KeyCode::Char('f'), none, ToggleFollowing),
            (KeyCode::Char('w'), none, ToggleWrap),
            (KeyCode::Char('h'), none, ToggleHighlighting),
            (KeyCode::Char('t'), none, ToggleTimestamp),
            (KeyCode::Char('s'), none, ToggleSource),
            (KeyCode::Char('l'), ctrl, Redraw),
            (KeyCode::Char('q'), none, Quit),
            (KeyCode::Esc,       none, Quit),
            (KeyCode::Char('c'), ctrl, Quit),
        ] {
            self.bind(code, mods, action);
        }
        self
    }

    /// The action for a key press or repeat; releases map to nothing.
    pub fn lookup(&self, key: &KeyEvent) -> Option<Action> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        let mods = key.modifiers.difference(KeyModifiers::SHIFT);
        self.bindings.get(&(key.code, mods)).copied()
    }

    /// The action for a mouse event.  `rows` is the number of log rows on
    /// screen; clicks below them are ignored.
    pub fn mouse(&self, ev: &MouseEvent, rows: u16) -> Option<Action> {
        match ev.kind {
            MouseEventKind::Down(MouseButton::Left) if ev.row < rows => Some(Action::SelectRow(ev.row)),
            MouseEventKind::ScrollUp => Some(Action::PageUp),
            MouseEventKind::ScrollDown => Some(Action::PageDown),
            _ => None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
