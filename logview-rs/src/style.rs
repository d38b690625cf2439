//! Display styles for highlighted log text.
//!
//! A [`Style`] packs text flags (bold, italic, …) together with optional
//! 256-color foreground/background indices into a single `u32`, so spans can be
//! copied and compared cheaply.  Painters translate a [`Style`] into whatever
//! their backend understands; see `terminal::content_style` for crossterm.

use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// Text flags plus optional foreground/background colors.
///
/// Use the associated flag constants and [`Style::with_fg`] /
/// [`Style::with_bg`] to build values; use [`Style::contains`],
/// [`Style::fg_color`], and [`Style::bg_color`] to inspect them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style(u32);

impl Style {
    // ── Flags (low byte) ──────────────────────────────────────────────────
    pub const UNDERLINE: Self = Self(0x0001);
    pub const REVERSE: Self   = Self(0x0002);
    pub const BOLD: Self      = Self(0x0004);
    pub const ITALIC: Self    = Self(0x0008);
    pub const DIM: Self       = Self(0x0010);

    // ── Color encoding ────────────────────────────────────────────────────
    // Presence flags at bits 8/9, 8-bit indices at bits 16-23 / 24-31.
    const FG_FLAG: u32  = 0x0100;
    const BG_FLAG: u32  = 0x0200;
    const FG_MASK: u32  = 0x00ff_0000;
    const FG_SHIFT: u32 = 16;
    const BG_MASK: u32  = 0xff00_0000;
    const BG_SHIFT: u32 = 24;
    const FLAG_MASK: u32 = 0x00ff;

    /// No flags, terminal default colors.
    pub const PLAIN: Self = Self(0);

    /// Returns `true` if no flags or colors are set.
    #[inline]
    pub fn is_plain(self) -> bool {
        self == Self::PLAIN
    }

    /// Returns `true` if all flag bits in `other` are set in `self`.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        let flags = other.0 & Self::FLAG_MASK;
        self.0 & flags == flags
    }

    /// The foreground color index, if one is set.
    #[inline]
    pub fn fg_color(self) -> Option<u8> {
        (self.0 & Self::FG_FLAG != 0).then(|| ((self.0 & Self::FG_MASK) >> Self::FG_SHIFT) as u8)
    }

    /// The background color index, if one is set.
    #[inline]
    pub fn bg_color(self) -> Option<u8> {
        (self.0 & Self::BG_FLAG != 0).then(|| ((self.0 & Self::BG_MASK) >> Self::BG_SHIFT) as u8)
    }

    /// Return a copy of `self` with the foreground color set to `color`.
    #[inline]
    pub fn with_fg(self, color: u8) -> Self {
        Self(
            (self.0 & !(Self::FG_FLAG | Self::FG_MASK))
                | Self::FG_FLAG
                | ((color as u32) << Self::FG_SHIFT),
        )
    }

    /// Return a copy of `self` with the background color set to `color`.
    #[inline]
    pub fn with_bg(self, color: u8) -> Self {
        Self(
            (self.0 & !(Self::BG_FLAG | Self::BG_MASK))
                | Self::BG_FLAG
                | ((color as u32) << Self::BG_SHIFT),
        )
    }

    /// Copy `other`'s background (or lack of one) onto `self`.
    #[inline]
    pub fn with_bg_of(self, other: Style) -> Self {
        match other.bg_color() {
            Some(bg) => self.with_bg(bg),
            None => self.without_bg(),
        }
    }

    #[inline]
    pub fn without_fg(self) -> Self {
        Self(self.0 & !(Self::FG_FLAG | Self::FG_MASK))
    }

    #[inline]
    pub fn without_bg(self) -> Self {
        Self(self.0 & !(Self::BG_FLAG | Self::BG_MASK))
    }
}

impl BitOr for Style {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self { Self(self.0 | rhs.0) }
}

impl BitOrAssign for Style {
    fn bitor_assign(&mut self, rhs: Self) { self.0 |= rhs.0; }
}

impl BitAnd for Style {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self { Self(self.0 & rhs.0) }
}

impl Not for Style {
    type Output = Self;
    fn not(self) -> Self { Self(!self.0 & Style::FLAG_MASK) }
}

// ── Named colors ──────────────────────────────────────────────────────────────

/// Color indices in the xterm 256-color palette.
///
/// The first sixteen follow the ANSI order; the named X11 colors map to the
/// nearest palette entry.
pub mod color {
    pub const BLACK: u8          = 0;
    pub const RED: u8            = 1;
    pub const GREEN: u8          = 2;
    pub const YELLOW: u8         = 3;
    pub const BLUE: u8           = 4;
    pub const MAGENTA: u8        = 5;
    pub const CYAN: u8           = 6;
    pub const WHITE: u8          = 7;
    pub const GRAY: u8           = 8;
    pub const BRIGHT_RED: u8     = 9;
    pub const BRIGHT_GREEN: u8   = 10;
    pub const BRIGHT_YELLOW: u8  = 11;
    pub const BRIGHT_BLUE: u8    = 12;
    pub const BRIGHT_MAGENTA: u8 = 13;
    pub const BRIGHT_CYAN: u8    = 14;
    pub const BRIGHT_WHITE: u8   = 15;

    pub const DIM_GRAY: u8       = 242;
    pub const INDIAN_RED: u8     = 167;
    pub const SADDLE_BROWN: u8   = 94;
    pub const DARK_GOLDENROD: u8 = 136;
    pub const DARK_ORANGE: u8    = 208;
    pub const GRAY_239: u8       = 239;

    /// Lowercase name → palette index.  Spaces, `-` and `_` are ignored when
    /// looking names up, so `"Sea Green"`, `"sea_green"` and `"SeaGreen"` agree.
    const NAMES: &[(&str, u8)] = &[
        ("black", BLACK),
        ("red", RED),
        ("maroon", RED),
        ("green", GREEN),
        ("yellow", YELLOW),
        ("olive", YELLOW),
        ("blue", BLUE),
        ("navy", BLUE),
        ("magenta", MAGENTA),
        ("purple", MAGENTA),
        ("cyan", CYAN),
        ("teal", CYAN),
        ("white", WHITE),
        ("silver", WHITE),
        ("gray", GRAY),
        ("grey", GRAY),
        ("brightred", BRIGHT_RED),
        ("brightgreen", BRIGHT_GREEN),
        ("lime", BRIGHT_GREEN),
        ("brightyellow", BRIGHT_YELLOW),
        ("brightblue", BRIGHT_BLUE),
        ("brightmagenta", BRIGHT_MAGENTA),
        ("fuchsia", BRIGHT_MAGENTA),
        ("brightcyan", BRIGHT_CYAN),
        ("aqua", BRIGHT_CYAN),
        ("brightwhite", BRIGHT_WHITE),
        ("blanchedalmond", 223),
        ("cadetblue", 73),
        ("darkcyan", 36),
        ("darkgoldenrod", DARK_GOLDENROD),
        ("darkgreen", 22),
        ("darkkhaki", 143),
        ("darkorange", DARK_ORANGE),
        ("dimgray", DIM_GRAY),
        ("dimgrey", DIM_GRAY),
        ("gold", 220),
        ("greenyellow", 154),
        ("indianred", INDIAN_RED),
        ("lavender", 189),
        ("lemonchiffon", 230),
        ("lightgreen", 120),
        ("orange", 214),
        ("pink", 218),
        ("powderblue", 152),
        ("royalblue", 63),
        ("saddlebrown", SADDLE_BROWN),
        ("salmon", 209),
        ("seagreen", 29),
        ("skyblue", 117),
        ("steelblue", 67),
        ("turquoise", 44),
        ("violet", 177),
    ];

    /// Look up a color by name (case-insensitive), or by a decimal palette
    /// index such as `"208"`.
    pub fn by_name(name: &str) -> Option<u8> {
        let key: String = name
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if let Ok(idx) = key.parse::<u8>() {
            return Some(idx);
        }
        NAMES.iter().find(|(n, _)| *n == key).map(|&(_, idx)| idx)
    }
}
