//! Outbound keyboard encoding.
//!
//! A [`KeyEvent`] injected by the embedder is turned into the byte sequence
//! the child process expects. When any Kitty progressive-enhancement flag
//! is active the CSI-u family is used; otherwise the legacy xterm encoding
//! applies, optionally rewritten by the modifyOtherKeys mode.

use std::fmt::Write as _;

use bitflags::bitflags;

use crate::keyboard_mode::kitty;

bitflags! {
    /// Key modifiers, in xterm parameter order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyMods: u8 {
        const SHIFT = 1;
        const ALT   = 2;
        const CTRL  = 4;
        const SUPER = 8;
    }
}

/// Named keys. `Rune` uses the event's `rune` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyCode {
    #[default]
    Rune,
    Up,
    Down,
    Right,
    Left,
    Home,
    End,
    Insert,
    Delete,
    PageUp,
    PageDown,
    Backspace,
    Tab,
    Enter,
    Escape,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

/// Press / repeat / release, for the Kitty event-type report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyEventKind {
    #[default]
    Press,
    Repeat,
    Release,
}

/// A keyboard event from the embedder.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub rune: Option<char>,
    pub mods: KeyMods,
    pub kind: KeyEventKind,
    /// Shifted form of the key, for the Kitty alternate-keys report.
    pub shifted: Option<char>,
    /// Base-layout form of the key, for the Kitty alternate-keys report.
    pub base_layout: Option<char>,
    /// Text the key would insert, for the Kitty associated-text report.
    pub text: Option<String>,
}

impl KeyEvent {
    /// A printable key.
    #[must_use]
    pub fn rune(c: char) -> Self {
        Self {
            rune: Some(c),
            ..Self::default()
        }
    }

    /// A named key.
    #[must_use]
    pub fn code(code: KeyCode) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }

    /// Builder-style modifier attachment.
    #[must_use]
    pub fn with_mods(mut self, mods: KeyMods) -> Self {
        self.mods = mods;
        self
    }
}

/// The terminal state the encoder consults.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct KeyContext {
    pub app_cursor_keys: bool,
    pub modify_other_keys: i32,
    pub kitty_flags: u32,
}

/// Encode a key event; an empty vector means the event produces no bytes.
pub(crate) fn encode_key(ev: &KeyEvent, ctx: &KeyContext) -> Vec<u8> {
    if ctx.kitty_flags != 0 {
        return encode_kitty(ev, ctx.kitty_flags);
    }
    if ev.kind != KeyEventKind::Press {
        // Legacy encoding has no release/repeat representation.
        return Vec::new();
    }
    match ev.code {
        KeyCode::Rune => encode_rune_key(ev.rune.unwrap_or('\0'), ev.mods, ctx),
        KeyCode::Up => encode_cursor_key(b'A', ev.mods, ctx),
        KeyCode::Down => encode_cursor_key(b'B', ev.mods, ctx),
        KeyCode::Right => encode_cursor_key(b'C', ev.mods, ctx),
        KeyCode::Left => encode_cursor_key(b'D', ev.mods, ctx),
        KeyCode::Home => encode_cursor_key(b'H', ev.mods, ctx),
        KeyCode::End => encode_cursor_key(b'F', ev.mods, ctx),
        KeyCode::Insert => encode_tilde_key(2, ev.mods),
        KeyCode::Delete => encode_tilde_key(3, ev.mods),
        KeyCode::PageUp => encode_tilde_key(5, ev.mods),
        KeyCode::PageDown => encode_tilde_key(6, ev.mods),
        KeyCode::Backspace => encode_backspace(ev.mods, ctx),
        KeyCode::Tab => encode_tab(ev.mods, ctx),
        KeyCode::Enter => encode_enter(ev.mods, ctx),
        KeyCode::Escape => encode_escape(ev.mods, ctx),
        KeyCode::F1 => encode_function_key(b'P', ev.mods),
        KeyCode::F2 => encode_function_key(b'Q', ev.mods),
        KeyCode::F3 => encode_function_key(b'R', ev.mods),
        KeyCode::F4 => encode_function_key(b'S', ev.mods),
        KeyCode::F5 => encode_tilde_key(15, ev.mods),
        KeyCode::F6 => encode_tilde_key(17, ev.mods),
        KeyCode::F7 => encode_tilde_key(18, ev.mods),
        KeyCode::F8 => encode_tilde_key(19, ev.mods),
        KeyCode::F9 => encode_tilde_key(20, ev.mods),
        KeyCode::F10 => encode_tilde_key(21, ev.mods),
        KeyCode::F11 => encode_tilde_key(23, ev.mods),
        KeyCode::F12 => encode_tilde_key(24, ev.mods),
    }
}

// ── Legacy encoding ────────────────────────────────────────────────

/// The `1 + bits` modifier parameter used across xterm sequences.
fn xterm_mod_param(mods: KeyMods) -> u32 {
    let mut p = 1;
    if mods.contains(KeyMods::SHIFT) {
        p += 1;
    }
    if mods.contains(KeyMods::ALT) {
        p += 2;
    }
    if mods.contains(KeyMods::CTRL) {
        p += 4;
    }
    p
}

/// The C0 byte produced by ctrl+`r`, when one exists.
fn ctrl_byte(r: char) -> Option<u8> {
    match r {
        'a'..='z' => Some(r as u8 - b'a' + 1),
        'A'..='Z' => Some(r as u8 - b'A' + 1),
        '@' => Some(0),
        '[' => Some(27),
        '\\' => Some(28),
        ']' => Some(29),
        '^' => Some(30),
        '_' => Some(31),
        '?' => Some(127),
        _ => None,
    }
}

fn encode_rune_key(r: char, mods: KeyMods, ctx: &KeyContext) -> Vec<u8> {
    if r == '\0' {
        return Vec::new();
    }
    if ctx.modify_other_keys > 0 && !mods.is_empty() {
        return encode_modify_other_keys(r as u32, mods);
    }
    if mods.contains(KeyMods::CTRL)
        && let Some(b) = ctrl_byte(r)
    {
        if mods.contains(KeyMods::ALT) {
            return vec![0x1b, b];
        }
        return vec![b];
    }
    let mut out = Vec::new();
    if mods.contains(KeyMods::ALT) {
        out.push(0x1b);
    }
    out.extend_from_slice(r.to_string().as_bytes());
    out
}

fn encode_cursor_key(final_byte: u8, mods: KeyMods, ctx: &KeyContext) -> Vec<u8> {
    if mods.is_empty() {
        if ctx.app_cursor_keys {
            return vec![0x1b, b'O', final_byte];
        }
        return vec![0x1b, b'[', final_byte];
    }
    format!("\x1b[1;{}{}", xterm_mod_param(mods), final_byte as char).into_bytes()
}

fn encode_tilde_key(code: u32, mods: KeyMods) -> Vec<u8> {
    if mods.is_empty() {
        return format!("\x1b[{code}~").into_bytes();
    }
    format!("\x1b[{code};{}~", xterm_mod_param(mods)).into_bytes()
}

fn encode_function_key(final_byte: u8, mods: KeyMods) -> Vec<u8> {
    if mods.is_empty() {
        return vec![0x1b, b'O', final_byte];
    }
    format!("\x1b[1;{}{}", xterm_mod_param(mods), final_byte as char).into_bytes()
}

fn encode_backspace(mods: KeyMods, ctx: &KeyContext) -> Vec<u8> {
    if mods.is_empty() {
        return vec![0x7f];
    }
    if ctx.modify_other_keys > 0 {
        return encode_modify_other_keys(127, mods);
    }
    if mods.contains(KeyMods::ALT) {
        return vec![0x1b, 0x7f];
    }
    vec![0x7f]
}

fn encode_tab(mods: KeyMods, ctx: &KeyContext) -> Vec<u8> {
    if mods.is_empty() {
        return vec![b'\t'];
    }
    if mods == KeyMods::SHIFT {
        return vec![0x1b, b'[', b'Z'];
    }
    if ctx.modify_other_keys > 0 {
        return encode_modify_other_keys(9, mods);
    }
    if mods.contains(KeyMods::ALT) {
        return vec![0x1b, b'\t'];
    }
    vec![b'\t']
}

fn encode_enter(mods: KeyMods, ctx: &KeyContext) -> Vec<u8> {
    if mods.is_empty() {
        return vec![b'\r'];
    }
    if ctx.modify_other_keys > 0 {
        return encode_modify_other_keys(13, mods);
    }
    if mods.contains(KeyMods::ALT) {
        return vec![0x1b, b'\r'];
    }
    vec![b'\r']
}

fn encode_escape(mods: KeyMods, ctx: &KeyContext) -> Vec<u8> {
    if mods.is_empty() {
        return vec![0x1b];
    }
    if ctx.modify_other_keys > 0 {
        return encode_modify_other_keys(27, mods);
    }
    vec![0x1b]
}

fn encode_modify_other_keys(code: u32, mods: KeyMods) -> Vec<u8> {
    format!("\x1b[27;{};{code}~", xterm_mod_param(mods)).into_bytes()
}

// ── Kitty encoding ─────────────────────────────────────────────────

fn kitty_mod_value(mods: KeyMods) -> u32 {
    let mut v = 0;
    if mods.contains(KeyMods::SHIFT) {
        v |= 1;
    }
    if mods.contains(KeyMods::ALT) {
        v |= 2;
    }
    if mods.contains(KeyMods::CTRL) {
        v |= 4;
    }
    if mods.contains(KeyMods::SUPER) {
        v |= 8;
    }
    1 + v
}

fn kitty_event_value(kind: KeyEventKind) -> u32 {
    match kind {
        KeyEventKind::Press => 1,
        KeyEventKind::Repeat => 2,
        KeyEventKind::Release => 3,
    }
}

/// The `mods[:event]` field, or `None` when it can be omitted entirely.
fn kitty_mod_field(ev: &KeyEvent, flags: u32) -> Option<String> {
    let mods = kitty_mod_value(ev.mods);
    let report_events = flags & kitty::REPORT_EVENT_TYPES != 0;
    if report_events && ev.kind != KeyEventKind::Press {
        return Some(format!("{mods}:{}", kitty_event_value(ev.kind)));
    }
    if mods != 1 {
        return Some(mods.to_string());
    }
    None
}

/// CSI-u sequence: `CSI code[:shifted[:base]] ; mods[:event] [; text] u`.
fn kitty_csi_u(code: u32, ev: &KeyEvent, flags: u32) -> Vec<u8> {
    let mut keycodes = code.to_string();
    if flags & kitty::REPORT_ALTERNATE_KEYS != 0
        && (ev.shifted.is_some() || ev.base_layout.is_some())
    {
        keycodes.push(':');
        if let Some(s) = ev.shifted {
            let _ = write!(keycodes, "{}", s as u32);
        }
        if let Some(b) = ev.base_layout {
            let _ = write!(keycodes, ":{}", b as u32);
        }
    }

    let mod_field = kitty_mod_field(ev, flags);
    let text_field = if flags & kitty::REPORT_ASSOCIATED_TEXT != 0 {
        ev.text.as_ref().map(|t| {
            t.chars()
                .map(|c| (c as u32).to_string())
                .collect::<Vec<_>>()
                .join(":")
        })
    } else {
        None
    };

    let mut out = format!("\x1b[{keycodes}");
    if let Some(text) = text_field {
        let mods = mod_field.unwrap_or_else(|| "1".to_string());
        let _ = write!(out, ";{mods};{text}");
    } else if let Some(mods) = mod_field {
        let _ = write!(out, ";{mods}");
    }
    out.push('u');
    out.into_bytes()
}

/// Letter-form functional key (arrows, Home/End, F1–F4).
fn kitty_letter(final_byte: u8, number: u32, ev: &KeyEvent, flags: u32) -> Vec<u8> {
    match kitty_mod_field(ev, flags) {
        Some(mods) => format!("\x1b[{number};{mods}{}", final_byte as char).into_bytes(),
        None => format!("\x1b[{}", final_byte as char).into_bytes(),
    }
}

fn kitty_tilde(code: u32, ev: &KeyEvent, flags: u32) -> Vec<u8> {
    match kitty_mod_field(ev, flags) {
        Some(mods) => format!("\x1b[{code};{mods}~").into_bytes(),
        None => format!("\x1b[{code}~").into_bytes(),
    }
}

fn encode_kitty(ev: &KeyEvent, flags: u32) -> Vec<u8> {
    // Without the event-types report, release events are swallowed and
    // repeats encode as presses.
    if ev.kind == KeyEventKind::Release && flags & kitty::REPORT_EVENT_TYPES == 0 {
        return Vec::new();
    }
    let report_all = flags & kitty::REPORT_ALL_KEYS_AS_ESCAPE_CODES != 0;
    let plain = ev.mods.is_empty() && ev.kind == KeyEventKind::Press;

    match ev.code {
        KeyCode::Rune => {
            let Some(c) = ev.rune else {
                return Vec::new();
            };
            if plain && !report_all {
                return c.to_string().into_bytes();
            }
            kitty_csi_u(c as u32, ev, flags)
        }
        KeyCode::Enter if plain && !report_all => vec![b'\r'],
        KeyCode::Tab if plain && !report_all => vec![b'\t'],
        KeyCode::Backspace if plain && !report_all => vec![0x7f],
        KeyCode::Enter => kitty_csi_u(13, ev, flags),
        KeyCode::Tab => kitty_csi_u(9, ev, flags),
        KeyCode::Backspace => kitty_csi_u(127, ev, flags),
        KeyCode::Escape => kitty_csi_u(27, ev, flags),
        KeyCode::Up => kitty_letter(b'A', 1, ev, flags),
        KeyCode::Down => kitty_letter(b'B', 1, ev, flags),
        KeyCode::Right => kitty_letter(b'C', 1, ev, flags),
        KeyCode::Left => kitty_letter(b'D', 1, ev, flags),
        KeyCode::Home => kitty_letter(b'H', 1, ev, flags),
        KeyCode::End => kitty_letter(b'F', 1, ev, flags),
        KeyCode::F1 => kitty_letter(b'P', 1, ev, flags),
        KeyCode::F2 => kitty_letter(b'Q', 1, ev, flags),
        KeyCode::F3 => kitty_letter(b'R', 1, ev, flags),
        KeyCode::F4 => kitty_letter(b'S', 1, ev, flags),
        KeyCode::Insert => kitty_tilde(2, ev, flags),
        KeyCode::Delete => kitty_tilde(3, ev, flags),
        KeyCode::PageUp => kitty_tilde(5, ev, flags),
        KeyCode::PageDown => kitty_tilde(6, ev, flags),
        KeyCode::F5 => kitty_tilde(15, ev, flags),
        KeyCode::F6 => kitty_tilde(17, ev, flags),
        KeyCode::F7 => kitty_tilde(18, ev, flags),
        KeyCode::F8 => kitty_tilde(19, ev, flags),
        KeyCode::F9 => kitty_tilde(20, ev, flags),
        KeyCode::F10 => kitty_tilde(21, ev, flags),
        KeyCode::F11 => kitty_tilde(23, ev, flags),
        KeyCode::F12 => kitty_tilde(24, ev, flags),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> KeyContext {
        KeyContext::default()
    }

    fn enc(ev: KeyEvent, ctx: &KeyContext) -> Vec<u8> {
        encode_key(&ev, ctx)
    }

    #[test]
    fn plain_rune_passes_through() {
        assert_eq!(enc(KeyEvent::rune('a'), &ctx()), b"a".to_vec());
        assert_eq!(enc(KeyEvent::rune('é'), &ctx()), "é".as_bytes().to_vec());
    }

    #[test]
    fn ctrl_rune_is_c0() {
        let ev = KeyEvent::rune('c').with_mods(KeyMods::CTRL);
        assert_eq!(enc(ev, &ctx()), vec![3]);
        let ev = KeyEvent::rune('[').with_mods(KeyMods::CTRL);
        assert_eq!(enc(ev, &ctx()), vec![27]);
    }

    #[test]
    fn alt_rune_gets_escape_prefix() {
        let ev = KeyEvent::rune('x').with_mods(KeyMods::ALT);
        assert_eq!(enc(ev, &ctx()), vec![0x1b, b'x']);
        let ev = KeyEvent::rune('c').with_mods(KeyMods::CTRL | KeyMods::ALT);
        assert_eq!(enc(ev, &ctx()), vec![0x1b, 3]);
    }

    #[test]
    fn cursor_keys_plain_and_modified() {
        assert_eq!(enc(KeyEvent::code(KeyCode::Up), &ctx()), b"\x1b[A".to_vec());
        let ev = KeyEvent::code(KeyCode::Up).with_mods(KeyMods::SHIFT);
        assert_eq!(enc(ev, &ctx()), b"\x1b[1;2A".to_vec());
        let ev = KeyEvent::code(KeyCode::Left).with_mods(KeyMods::CTRL | KeyMods::SHIFT);
        assert_eq!(enc(ev, &ctx()), b"\x1b[1;6D".to_vec());
    }

    #[test]
    fn application_cursor_keys_use_ss3() {
        let c = KeyContext {
            app_cursor_keys: true,
            ..KeyContext::default()
        };
        assert_eq!(enc(KeyEvent::code(KeyCode::Up), &c), b"\x1bOA".to_vec());
        // A modifier forces the CSI form even in application mode.
        let ev = KeyEvent::code(KeyCode::Up).with_mods(KeyMods::ALT);
        assert_eq!(enc(ev, &c), b"\x1b[1;3A".to_vec());
    }

    #[test]
    fn tilde_keys() {
        assert_eq!(enc(KeyEvent::code(KeyCode::Delete), &ctx()), b"\x1b[3~".to_vec());
        let ev = KeyEvent::code(KeyCode::PageUp).with_mods(KeyMods::CTRL);
        assert_eq!(enc(ev, &ctx()), b"\x1b[5;5~".to_vec());
    }

    #[test]
    fn function_keys() {
        assert_eq!(enc(KeyEvent::code(KeyCode::F1), &ctx()), b"\x1bOP".to_vec());
        assert_eq!(enc(KeyEvent::code(KeyCode::F5), &ctx()), b"\x1b[15~".to_vec());
        assert_eq!(enc(KeyEvent::code(KeyCode::F12), &ctx()), b"\x1b[24~".to_vec());
        let ev = KeyEvent::code(KeyCode::F2).with_mods(KeyMods::SHIFT);
        assert_eq!(enc(ev, &ctx()), b"\x1b[1;2Q".to_vec());
    }

    #[test]
    fn backspace_variants() {
        assert_eq!(enc(KeyEvent::code(KeyCode::Backspace), &ctx()), vec![0x7f]);
        let ev = KeyEvent::code(KeyCode::Backspace).with_mods(KeyMods::ALT);
        assert_eq!(enc(ev, &ctx()), vec![0x1b, 0x7f]);
    }

    #[test]
    fn shift_tab_is_backtab() {
        let ev = KeyEvent::code(KeyCode::Tab).with_mods(KeyMods::SHIFT);
        assert_eq!(enc(ev, &ctx()), b"\x1b[Z".to_vec());
    }

    #[test]
    fn modify_other_keys_rewrites() {
        let c = KeyContext {
            modify_other_keys: 2,
            ..KeyContext::default()
        };
        let ev = KeyEvent::rune('a').with_mods(KeyMods::CTRL);
        assert_eq!(enc(ev, &c), b"\x1b[27;5;97~".to_vec());
        let ev = KeyEvent::code(KeyCode::Enter).with_mods(KeyMods::SHIFT);
        assert_eq!(enc(ev, &c), b"\x1b[27;2;13~".to_vec());
        // Plain keys stay plain.
        assert_eq!(enc(KeyEvent::rune('a'), &c), b"a".to_vec());
    }

    #[test]
    fn release_is_silent_in_legacy_mode() {
        let mut ev = KeyEvent::rune('a');
        ev.kind = KeyEventKind::Release;
        assert!(enc(ev, &ctx()).is_empty());
    }

    // ── Kitty ──────────────────────────────────────────────────────

    fn kitty_ctx(flags: u32) -> KeyContext {
        KeyContext {
            kitty_flags: flags,
            ..KeyContext::default()
        }
    }

    #[test]
    fn kitty_plain_rune_stays_text() {
        let c = kitty_ctx(kitty::DISAMBIGUATE_ESCAPE_CODES);
        assert_eq!(enc(KeyEvent::rune('a'), &c), b"a".to_vec());
    }

    #[test]
    fn kitty_ctrl_rune_is_csi_u() {
        let c = kitty_ctx(kitty::DISAMBIGUATE_ESCAPE_CODES);
        let ev = KeyEvent::rune('a').with_mods(KeyMods::CTRL);
        assert_eq!(enc(ev, &c), b"\x1b[97;5u".to_vec());
    }

    #[test]
    fn kitty_report_all_escapes_plain_keys() {
        let c = kitty_ctx(kitty::REPORT_ALL_KEYS_AS_ESCAPE_CODES);
        assert_eq!(enc(KeyEvent::rune('a'), &c), b"\x1b[97u".to_vec());
        assert_eq!(enc(KeyEvent::code(KeyCode::Enter), &c), b"\x1b[13u".to_vec());
    }

    #[test]
    fn kitty_release_reported_when_enabled() {
        let c = kitty_ctx(kitty::DISAMBIGUATE_ESCAPE_CODES | kitty::REPORT_EVENT_TYPES);
        let mut ev = KeyEvent::rune('a');
        ev.kind = KeyEventKind::Release;
        assert_eq!(enc(ev, &c), b"\x1b[97;1:3u".to_vec());
    }

    #[test]
    fn kitty_release_swallowed_without_event_types() {
        let c = kitty_ctx(kitty::DISAMBIGUATE_ESCAPE_CODES);
        let mut ev = KeyEvent::rune('a');
        ev.kind = KeyEventKind::Release;
        assert!(enc(ev, &c).is_empty());
    }

    #[test]
    fn kitty_alternate_keys() {
        let c = kitty_ctx(kitty::REPORT_ALL_KEYS_AS_ESCAPE_CODES | kitty::REPORT_ALTERNATE_KEYS);
        let mut ev = KeyEvent::rune('a').with_mods(KeyMods::SHIFT);
        ev.shifted = Some('A');
        assert_eq!(enc(ev, &c), b"\x1b[97:65;2u".to_vec());
    }

    #[test]
    fn kitty_associated_text() {
        let c = kitty_ctx(kitty::REPORT_ALL_KEYS_AS_ESCAPE_CODES | kitty::REPORT_ASSOCIATED_TEXT);
        let mut ev = KeyEvent::rune('a');
        ev.text = Some("a".to_string());
        assert_eq!(enc(ev, &c), b"\x1b[97;1;97u".to_vec());
    }

    #[test]
    fn kitty_arrows_keep_letter_form() {
        let c = kitty_ctx(kitty::DISAMBIGUATE_ESCAPE_CODES);
        assert_eq!(enc(KeyEvent::code(KeyCode::Up), &c), b"\x1b[A".to_vec());
        let ev = KeyEvent::code(KeyCode::Up).with_mods(KeyMods::CTRL);
        assert_eq!(enc(ev, &c), b"\x1b[1;5A".to_vec());
    }

    #[test]
    fn kitty_escape_key_always_csi_u() {
        let c = kitty_ctx(kitty::DISAMBIGUATE_ESCAPE_CODES);
        assert_eq!(enc(KeyEvent::code(KeyCode::Escape), &c), b"\x1b[27u".to_vec());
    }
}
