//! End-to-end scenarios over a live terminal: bytes go in through a pipe,
//! a real reader thread parses them, and the test drains deterministically
//! by closing the write end and waiting for the loop to finish.

mod common;

use std::io::Write;
use std::thread;
use std::time::Duration;

use common::{canonical, parse_into_terminal, spawn_terminal};
use spanterm_core::{
    BUTTON_RIGHT, ChangeReason, MouseMods, Region, TerminalConfig, TextMode, ViewString,
};

fn trimmed(term: &spanterm_core::Terminal, y: usize) -> String {
    term.line(y).trim_end().to_string()
}

#[test]
fn basic_write_and_cursor() {
    let (term, _) = parse_into_terminal(80, 24, b"Hello", TerminalConfig::default());
    assert_eq!(term.line(0), format!("Hello{}", " ".repeat(75)));
    assert_eq!(term.lock().cursor(), (5, 0));
}

#[test]
fn bright_foreground_roundtrips_short_form() {
    let (term, _) = parse_into_terminal(80, 24, b"\x1b[91mRed", TerminalConfig::default());
    let ansi = term.ansi_line(0);
    assert!(ansi.contains("\x1b[91m"), "want short form, got {ansi:?}");
    assert!(!ansi.contains("\x1b[38;5;9m"), "extended form leaked: {ansi:?}");
}

#[test]
fn wide_char_overwrite_keeps_emoji_whole() {
    let (term, _) = parse_into_terminal(
        8,
        2,
        "🐹c\x1b[D\x1b[Dy".as_bytes(),
        TerminalConfig::default(),
    );
    assert_eq!(trimmed(&term, 0), "🐹yc");
}

#[test]
fn scroll_region_linefeeds() {
    let mut input = Vec::new();
    for y in 0..10 {
        input.extend_from_slice(format!("\x1b[{};1Hrow{y}", y + 1).as_bytes());
    }
    input.extend_from_slice(b"\x1b[3;8r\x1b[8;1H\n\n");
    let (term, _) = parse_into_terminal(10, 10, &input, TerminalConfig::default());

    assert_eq!(trimmed(&term, 0), "row0");
    assert_eq!(trimmed(&term, 1), "row1");
    assert_eq!(trimmed(&term, 2), "row4");
    assert_eq!(trimmed(&term, 5), "row7");
    assert_eq!(trimmed(&term, 6), "");
    assert_eq!(trimmed(&term, 7), "");
    assert_eq!(trimmed(&term, 8), "row8");
    assert_eq!(trimmed(&term, 9), "row9");
}

#[test]
fn alternate_screen_preserves_primary() {
    let (term, frontend) = parse_into_terminal(
        80,
        24,
        b"before\x1b[?1049hA\x1b[?1049l",
        TerminalConfig::default(),
    );
    assert!(!term.on_alt_screen());
    assert_eq!(trimmed(&term, 0), "before");

    let switches = frontend
        .snapshot()
        .regions
        .iter()
        .filter(|(_, reason)| *reason == ChangeReason::ScreenSwitch)
        .count();
    assert_eq!(switches, 2);
}

#[test]
fn sgr_mouse_report() {
    let (term, mut writer, _, outbound) = spawn_terminal(TerminalConfig::default());
    writer.write_all(b"\x1b[?1003h\x1b[?1006h").unwrap();
    drop(writer);
    term.wait();

    term.send_mouse(BUTTON_RIGHT, true, MouseMods::empty(), 5, 6)
        .unwrap();
    assert_eq!(outbound.lock().unwrap().as_slice(), b"\x1b[<2;5;6M");
}

#[test]
fn mouse_disabled_by_default() {
    let (term, writer, _, outbound) = spawn_terminal(TerminalConfig::default());
    term.send_mouse(BUTTON_RIGHT, true, MouseMods::empty(), 5, 6)
        .unwrap();
    assert!(outbound.lock().unwrap().is_empty());
    drop(writer);
    term.wait();
}

#[test]
fn device_attributes_reply_over_backend() {
    let (term, mut writer, _, outbound) = spawn_terminal(TerminalConfig::default());
    writer.write_all(b"\x1b[c").unwrap();
    drop(writer);
    term.wait();
    assert_eq!(outbound.lock().unwrap().as_slice(), b"\x1b[?1;2c");
}

#[test]
fn osc_title_lands_in_view_state() {
    let (term, frontend) = parse_into_terminal(
        80,
        24,
        b"\x1b]0;my session\x07",
        TerminalConfig::default(),
    );
    assert_eq!(term.view_string(ViewString::WindowTitle), "my session");
    assert!(
        frontend
            .snapshot()
            .strings
            .contains(&(ViewString::WindowTitle, "my session".to_string()))
    );
}

#[test]
fn split_feeds_match_whole_feed() {
    // Splitting the stream at any byte boundary, including inside UTF-8
    // sequences and escape sequences, must not change the result.
    let bytes = "ab🐹\x1b[31mcd\u{0301}\x1b[0me".as_bytes();
    let (whole, _) = parse_into_terminal(20, 4, bytes, TerminalConfig::default());
    let reference: Vec<_> = (0..4)
        .map(|y| canonical(&whole.styled_line(0, 20, y)))
        .collect();

    for split in 1..bytes.len() {
        let (term, mut writer, _, _) = spawn_terminal(TerminalConfig::default());
        term.resize(20, 4).unwrap();
        writer.write_all(&bytes[..split]).unwrap();
        writer.flush().unwrap();
        // Give the reader a chance to consume the first half on its own.
        thread::sleep(Duration::from_millis(5));
        writer.write_all(&bytes[split..]).unwrap();
        drop(writer);
        term.wait();

        for (y, want) in reference.iter().enumerate() {
            let got = canonical(&term.styled_line(0, 20, y));
            assert_eq!(&got, want, "split at {split}, row {y}");
        }
    }
}

#[test]
fn ansi_render_reparses_identically() {
    let input = "\x1b[1;31mBold\x1b[0m plain \x1b[48;5;123mbg\x1b[0m 🐹 \x1b[91mbright"
        .as_bytes();
    let cols = 40;
    let (term, _) = parse_into_terminal(cols, 4, input, TerminalConfig::default());

    for y in 0..2 {
        let rendered = term.ansi_line(y);
        let (reparsed, _) =
            parse_into_terminal(cols, 4, rendered.as_bytes(), TerminalConfig::default());
        assert_eq!(
            canonical(&reparsed.styled_line(0, cols, 0)),
            canonical(&term.styled_line(0, cols, y)),
            "row {y} must survive the ANSI round trip",
        );
    }
}

#[test]
fn queries_under_one_lock_are_coherent() {
    let (term, _) = parse_into_terminal(80, 24, b"abc\r\ndef", TerminalConfig::default());
    let lines = term.with_lock(|t| t.styled_lines(Region::new(0, 0, 80, 2)));
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].plain_text().trim_end(), "abc");
    assert_eq!(lines[1].plain_text().trim_end(), "def");
}

#[test]
fn grapheme_mode_merges_combining_marks() {
    let config = TerminalConfig {
        text_mode: TextMode::Grapheme,
        ..TerminalConfig::default()
    };
    let (term, mut writer, _, _) = spawn_terminal(config);
    term.resize(20, 2).unwrap();
    // Base letter first, combining mark in a separate write.
    writer.write_all(b"e").unwrap();
    writer.flush().unwrap();
    thread::sleep(Duration::from_millis(5));
    writer.write_all("\u{0301}x".as_bytes()).unwrap();
    drop(writer);
    term.wait();

    assert!(term.line(0).starts_with("e\u{0301}x"));
    assert_eq!(term.lock().cursor(), (2, 0), "mark must not take a cell");
}

#[test]
fn rune_mode_gives_combining_marks_their_own_cell() {
    let (term, _) = parse_into_terminal(
        20,
        2,
        "e\u{0301}x".as_bytes(),
        TerminalConfig::default(),
    );
    assert_eq!(term.lock().cursor(), (3, 0));
}

#[test]
fn eof_terminates_read_loop() {
    let (term, writer, _, _) = spawn_terminal(TerminalConfig::default());
    drop(writer);
    // Returns rather than hanging.
    term.wait();
    term.wait();
}
