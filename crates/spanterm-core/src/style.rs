//! Packed text style: colors plus rendition modes in three 32-bit words.
//!
//! A [`Style`] is the unit of comparison for span merging and delta
//! rendering, so it is a plain value with bitwise equality. Each word holds
//! one color slot (foreground, background, underline) in bits 0–23, a
//! color-type flag in bit 31, and seven rendition-mode bits in bits 24–30.
//! The mode set is partitioned across the words: the first seven modes live
//! in the foreground word, the next six in the background word, and the
//! underline word keeps a 3-bit underline-style field.

use std::fmt::Write as _;

use bitflags::bitflags;

bitflags! {
    /// Text rendition modes.
    ///
    /// Bit positions 0–6 are stored in the foreground word, 7–12 in the
    /// background word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Mode: u16 {
        const BOLD             = 1 << 0;
        const DIM              = 1 << 1;
        const ITALIC           = 1 << 2;
        const UNDERLINE        = 1 << 3;
        const BLINK            = 1 << 4;
        const REVERSE          = 1 << 5;
        const INVISIBLE        = 1 << 6;
        const STRIKE           = 1 << 7;
        const OVERLINE         = 1 << 8;
        const DOUBLE_UNDERLINE = 1 << 9;
        const FRAMED           = 1 << 10;
        const ENCIRCLED        = 1 << 11;
        const RAPID_BLINK      = 1 << 12;
    }
}

/// Single-mode SGR set codes, in emission order.
const MODE_SGR_CODES: &[(Mode, u16)] = &[
    (Mode::BOLD, 1),
    (Mode::DIM, 2),
    (Mode::ITALIC, 3),
    (Mode::UNDERLINE, 4),
    (Mode::BLINK, 5),
    (Mode::RAPID_BLINK, 6),
    (Mode::REVERSE, 7),
    (Mode::INVISIBLE, 8),
    (Mode::STRIKE, 9),
    (Mode::DOUBLE_UNDERLINE, 21),
    (Mode::FRAMED, 51),
    (Mode::ENCIRCLED, 52),
    (Mode::OVERLINE, 53),
];

/// Which color slot of a [`Style`] an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorComponent {
    Fg,
    Bg,
    Underline,
}

/// A color value for one style component.
///
/// `Default` is the terminal default; emitters suppress the SGR color code
/// entirely for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    #[default]
    Default,
    /// 256-color palette index.
    Indexed(u8),
    /// 24-bit true color.
    Rgb(u8, u8, u8),
}

/// Basic palette indices 0–7.
pub const COL_BLACK: u8 = 0;
pub const COL_RED: u8 = 1;
pub const COL_GREEN: u8 = 2;
pub const COL_YELLOW: u8 = 3;
pub const COL_BLUE: u8 = 4;
pub const COL_MAGENTA: u8 = 5;
pub const COL_CYAN: u8 = 6;
pub const COL_WHITE: u8 = 7;

// Word layout. The default sentinel sits just outside the 8-bit palette
// range so it can never collide with a real indexed color.
const COLOR_DEFAULT: u32 = 0x100;
const MASK_256: u32 = 0xff;
const MASK_RGB: u32 = 0xff_ffff;
const COLOR_TYPE_RGB: u32 = 1 << 31;
const MODE_SHIFT: u32 = 24;
const MODE_MASK: u32 = 0x7f << MODE_SHIFT;
const PAYLOAD_MASK: u32 = !MODE_MASK;

/// Packed style: three words (fg, bg, underline color) carrying colors and
/// rendition modes. Compares and hashes bitwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Style {
    fg: u32,
    bg: u32,
    underline: u32,
}

impl Default for Style {
    fn default() -> Self {
        Self::new()
    }
}

impl Style {
    /// All colors default, no modes set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fg: COLOR_DEFAULT,
            bg: COLOR_DEFAULT,
            underline: COLOR_DEFAULT,
        }
    }

    fn word(&self, component: ColorComponent) -> u32 {
        match component {
            ColorComponent::Fg => self.fg,
            ColorComponent::Bg => self.bg,
            ColorComponent::Underline => self.underline,
        }
    }

    fn word_mut(&mut self, component: ColorComponent) -> &mut u32 {
        match component {
            ColorComponent::Fg => &mut self.fg,
            ColorComponent::Bg => &mut self.bg,
            ColorComponent::Underline => &mut self.underline,
        }
    }

    /// Set one color slot, preserving mode bits.
    pub fn set_color(&mut self, component: ColorComponent, color: Color) {
        let payload = match color {
            Color::Default => COLOR_DEFAULT,
            Color::Indexed(i) => u32::from(i) & MASK_256,
            Color::Rgb(r, g, b) => {
                (u32::from(r) << 16 | u32::from(g) << 8 | u32::from(b)) | COLOR_TYPE_RGB
            }
        };
        let w = self.word_mut(component);
        *w = (*w & MODE_MASK) | payload;
    }

    /// Read back one color slot.
    #[must_use]
    pub fn color(&self, component: ColorComponent) -> Color {
        let w = self.word(component) & PAYLOAD_MASK;
        if w & COLOR_TYPE_RGB != 0 {
            let rgb = w & MASK_RGB;
            Color::Rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
        } else if w == COLOR_DEFAULT {
            Color::Default
        } else {
            Color::Indexed((w & MASK_256) as u8)
        }
    }

    /// Combined mode bits from all three words.
    #[must_use]
    pub fn modes(&self) -> Mode {
        let fg = ((self.fg & MODE_MASK) >> MODE_SHIFT) as u16;
        let bg = ((self.bg & MODE_MASK) >> MODE_SHIFT) as u16;
        Mode::from_bits_truncate(fg | ((bg & 0x3f) << 7))
    }

    /// Set every mode in `modes`.
    pub fn set_mode(&mut self, modes: Mode) {
        let bits = modes.bits();
        self.fg |= u32::from(bits & 0x7f) << MODE_SHIFT;
        self.bg |= u32::from((bits >> 7) & 0x3f) << MODE_SHIFT;
    }

    /// Clear every mode in `modes`.
    pub fn reset_mode(&mut self, modes: Mode) {
        let bits = modes.bits();
        self.fg &= !(u32::from(bits & 0x7f) << MODE_SHIFT);
        self.bg &= !(u32::from((bits >> 7) & 0x3f) << MODE_SHIFT);
    }

    /// Whether any mode in `modes` is set.
    #[must_use]
    pub fn test_mode(&self, modes: Mode) -> bool {
        self.modes().intersects(modes)
    }

    /// Clear all modes, keeping colors.
    pub fn reset_modes(&mut self) {
        self.fg &= !MODE_MASK;
        self.bg &= !MODE_MASK;
        self.underline &= !MODE_MASK;
    }

    /// Underline style (SGR `4:n` sub-style), 3 bits.
    #[must_use]
    pub fn underline_style(&self) -> u8 {
        (((self.underline & MODE_MASK) >> MODE_SHIFT) & 0x7) as u8
    }

    /// Store an underline style value (clamped to 3 bits).
    pub fn set_underline_style(&mut self, style: u8) {
        self.underline =
            (self.underline & !MODE_MASK) | (u32::from(style & 0x7) << MODE_SHIFT);
    }

    /// Back to the default-constructed state.
    pub fn reset_all(&mut self) {
        *self = Self::new();
    }

    /// Full ANSI escape: reset, then every set mode, then both colors and
    /// the underline color when not default.
    ///
    /// Bright palette entries 8–15 use the short forms (`90`–`97`,
    /// `100`–`107`) so the output survives terminals that render
    /// `38;5;8`-style sequences differently.
    #[must_use]
    pub fn ansi_escape(&self) -> Vec<u8> {
        let mut out = String::from("\x1b[0m");
        self.push_modes(&mut out);
        self.push_colors(&mut out, true, true, true);
        out.into_bytes()
    }

    /// Minimal ANSI escape taking the pen from `prev` to `self`.
    ///
    /// Returns an empty vector when nothing changed. A mode difference
    /// forces a full reset, after which both colors are re-emitted.
    #[must_use]
    pub fn ansi_escape_from(&self, prev: &Style) -> Vec<u8> {
        let modes_changed = self.modes() != prev.modes()
            || self.underline_style() != prev.underline_style();
        let mut fg_changed = self.fg & PAYLOAD_MASK != prev.fg & PAYLOAD_MASK;
        let mut bg_changed = self.bg & PAYLOAD_MASK != prev.bg & PAYLOAD_MASK;
        let mut ul_changed = self.underline & PAYLOAD_MASK != prev.underline & PAYLOAD_MASK;

        if !modes_changed && !fg_changed && !bg_changed && !ul_changed {
            return Vec::new();
        }

        let mut out = String::new();
        if modes_changed {
            // The reset wipes colors, so everything must be restated.
            out.push_str("\x1b[0m");
            self.push_modes(&mut out);
            fg_changed = true;
            bg_changed = true;
            ul_changed = true;
        }
        self.push_colors(&mut out, fg_changed, bg_changed, ul_changed);
        out.into_bytes()
    }

    fn push_modes(&self, out: &mut String) {
        let modes = self.modes();
        for (mode, code) in MODE_SGR_CODES {
            if modes.contains(*mode) {
                let _ = write!(out, "\x1b[{code}m");
            }
        }
    }

    fn push_colors(&self, out: &mut String, fg: bool, bg: bool, underline: bool) {
        if fg {
            push_color_escape(out, self.color(ColorComponent::Fg), ColorComponent::Fg);
        }
        if bg {
            push_color_escape(out, self.color(ColorComponent::Bg), ColorComponent::Bg);
        }
        if underline {
            push_color_escape(
                out,
                self.color(ColorComponent::Underline),
                ColorComponent::Underline,
            );
        }
    }
}

fn push_color_escape(out: &mut String, color: Color, component: ColorComponent) {
    match (component, color) {
        (_, Color::Default) => {}
        (ColorComponent::Fg, Color::Indexed(i)) if i < 8 => {
            let _ = write!(out, "\x1b[{}m", 30 + u16::from(i));
        }
        (ColorComponent::Fg, Color::Indexed(i)) if i < 16 => {
            let _ = write!(out, "\x1b[{}m", 90 + u16::from(i - 8));
        }
        (ColorComponent::Fg, Color::Indexed(i)) => {
            let _ = write!(out, "\x1b[38;5;{i}m");
        }
        (ColorComponent::Fg, Color::Rgb(r, g, b)) => {
            let _ = write!(out, "\x1b[38;2;{r};{g};{b}m");
        }
        (ColorComponent::Bg, Color::Indexed(i)) if i < 8 => {
            let _ = write!(out, "\x1b[{}m", 40 + u16::from(i));
        }
        (ColorComponent::Bg, Color::Indexed(i)) if i < 16 => {
            let _ = write!(out, "\x1b[{}m", 100 + u16::from(i - 8));
        }
        (ColorComponent::Bg, Color::Indexed(i)) => {
            let _ = write!(out, "\x1b[48;5;{i}m");
        }
        (ColorComponent::Bg, Color::Rgb(r, g, b)) => {
            let _ = write!(out, "\x1b[48;2;{r};{g};{b}m");
        }
        (ColorComponent::Underline, Color::Indexed(i)) => {
            let _ = write!(out, "\x1b[58;5;{i}m");
        }
        (ColorComponent::Underline, Color::Rgb(r, g, b)) => {
            let _ = write!(out, "\x1b[58;2;{r};{g};{b}m");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_style_has_no_modes_or_colors() {
        let s = Style::new();
        assert_eq!(s.modes(), Mode::empty());
        assert_eq!(s.color(ColorComponent::Fg), Color::Default);
        assert_eq!(s.color(ColorComponent::Bg), Color::Default);
        assert_eq!(s.color(ColorComponent::Underline), Color::Default);
        assert_eq!(s, Style::default());
    }

    #[test]
    fn set_color_preserves_modes() {
        let mut s = Style::new();
        s.set_mode(Mode::BOLD | Mode::STRIKE);
        s.set_color(ColorComponent::Fg, Color::Indexed(3));
        s.set_color(ColorComponent::Bg, Color::Rgb(1, 2, 3));
        assert!(s.test_mode(Mode::BOLD));
        assert!(s.test_mode(Mode::STRIKE));
        assert_eq!(s.color(ColorComponent::Fg), Color::Indexed(3));
        assert_eq!(s.color(ColorComponent::Bg), Color::Rgb(1, 2, 3));
    }

    #[test]
    fn set_mode_preserves_colors() {
        let mut s = Style::new();
        s.set_color(ColorComponent::Fg, Color::Indexed(200));
        s.set_mode(Mode::ITALIC | Mode::ENCIRCLED | Mode::RAPID_BLINK);
        assert_eq!(s.color(ColorComponent::Fg), Color::Indexed(200));
        assert_eq!(
            s.modes(),
            Mode::ITALIC | Mode::ENCIRCLED | Mode::RAPID_BLINK
        );
        s.reset_mode(Mode::ENCIRCLED);
        assert_eq!(s.modes(), Mode::ITALIC | Mode::RAPID_BLINK);
    }

    #[test]
    fn modes_partition_across_words_independently() {
        // One mode from the fg word, one from the bg word.
        let mut s = Style::new();
        s.set_mode(Mode::INVISIBLE);
        s.set_mode(Mode::FRAMED);
        assert_eq!(s.modes(), Mode::INVISIBLE | Mode::FRAMED);
        s.reset_mode(Mode::INVISIBLE);
        assert_eq!(s.modes(), Mode::FRAMED);
    }

    #[test]
    fn underline_style_is_three_bits() {
        let mut s = Style::new();
        s.set_underline_style(0b101);
        assert_eq!(s.underline_style(), 0b101);
        s.set_underline_style(0xff);
        assert_eq!(s.underline_style(), 0x7);
        // Color slot untouched.
        assert_eq!(s.color(ColorComponent::Underline), Color::Default);
    }

    #[test]
    fn reset_all_restores_default() {
        let mut s = Style::new();
        s.set_mode(Mode::BOLD | Mode::OVERLINE);
        s.set_color(ColorComponent::Underline, Color::Indexed(9));
        s.reset_all();
        assert_eq!(s, Style::new());
    }

    #[test]
    fn ansi_escape_default_is_bare_reset() {
        assert_eq!(Style::new().ansi_escape(), b"\x1b[0m".to_vec());
    }

    #[test]
    fn ansi_escape_emits_modes_and_colors() {
        let mut s = Style::new();
        s.set_mode(Mode::BOLD);
        s.set_color(ColorComponent::Fg, Color::Indexed(1));
        s.set_color(ColorComponent::Bg, Color::Indexed(2));
        let out = String::from_utf8(s.ansi_escape()).unwrap();
        assert_eq!(out, "\x1b[0m\x1b[1m\x1b[31m\x1b[42m");
    }

    #[test]
    fn bright_colors_use_short_form() {
        let mut s = Style::new();
        s.set_color(ColorComponent::Fg, Color::Indexed(9));
        s.set_color(ColorComponent::Bg, Color::Indexed(8));
        let out = String::from_utf8(s.ansi_escape()).unwrap();
        assert!(out.contains("\x1b[91m"), "fg 9 should be CSI 91 m: {out:?}");
        assert!(out.contains("\x1b[100m"), "bg 8 should be CSI 100 m: {out:?}");
        assert!(!out.contains("38;5;"), "no extended form expected: {out:?}");
    }

    #[test]
    fn extended_palette_and_rgb_forms() {
        let mut s = Style::new();
        s.set_color(ColorComponent::Fg, Color::Indexed(123));
        s.set_color(ColorComponent::Bg, Color::Rgb(10, 20, 30));
        s.set_color(ColorComponent::Underline, Color::Indexed(55));
        let out = String::from_utf8(s.ansi_escape()).unwrap();
        assert!(out.contains("\x1b[38;5;123m"));
        assert!(out.contains("\x1b[48;2;10;20;30m"));
        assert!(out.contains("\x1b[58;5;55m"));
    }

    #[test]
    fn escape_from_identical_style_is_empty() {
        let mut s = Style::new();
        s.set_mode(Mode::UNDERLINE);
        s.set_color(ColorComponent::Fg, Color::Indexed(4));
        assert!(s.ansi_escape_from(&s).is_empty());
    }

    #[test]
    fn escape_from_color_only_change_skips_reset() {
        let mut a = Style::new();
        a.set_color(ColorComponent::Fg, Color::Indexed(1));
        let mut b = a;
        b.set_color(ColorComponent::Fg, Color::Indexed(2));
        let out = String::from_utf8(b.ansi_escape_from(&a)).unwrap();
        assert_eq!(out, "\x1b[32m");
    }

    #[test]
    fn escape_from_mode_change_forces_reset_and_colors() {
        let mut a = Style::new();
        a.set_color(ColorComponent::Fg, Color::Indexed(1));
        let mut b = a;
        b.set_mode(Mode::BOLD);
        let out = String::from_utf8(b.ansi_escape_from(&a)).unwrap();
        assert_eq!(out, "\x1b[0m\x1b[1m\x1b[31m");
    }

    #[test]
    fn delta_matches_direct_application() {
        // Applying prev then the delta must land on the same pen as the
        // full escape of the target style.
        let mut prev = Style::new();
        prev.set_mode(Mode::BOLD | Mode::STRIKE);
        prev.set_color(ColorComponent::Bg, Color::Indexed(12));

        let mut next = Style::new();
        next.set_mode(Mode::ITALIC);
        next.set_color(ColorComponent::Fg, Color::Rgb(9, 8, 7));

        let delta = String::from_utf8(next.ansi_escape_from(&prev)).unwrap();
        // Mode set changed: expect reset, italic, then fg (bg/underline are
        // default and therefore silent).
        assert_eq!(delta, "\x1b[0m\x1b[3m\x1b[38;2;9;8;7m");
    }

    #[test]
    fn indexed_color_roundtrip() {
        for i in [0u8, 7, 8, 15, 16, 255] {
            let mut s = Style::new();
            s.set_color(ColorComponent::Bg, Color::Indexed(i));
            assert_eq!(s.color(ColorComponent::Bg), Color::Indexed(i));
        }
    }
}
