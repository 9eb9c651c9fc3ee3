//! The dispatcher: pulls bytes from the grapheme reader and drives the
//! screen, the view state, and the outbound writer.
//!
//! The loop alternates between batching printable tokens (written under one
//! lock acquisition) and handling control bytes. Escape sequences are read
//! to completion before the state lock is taken, so the lock is never held
//! across a blocking backend read; replies (DA, DSR, CPR, keyboard-flag
//! queries) are buffered during dispatch and written after the lock drops.
//!
//! Unknown sequences are never fatal: the bytes are captured verbatim,
//! reported to the debug sink, and parsing resumes from ground state. An
//! end-of-stream in the middle of a sequence drops it silently and ends
//! the loop.

use std::io::{self, Read};

use smallvec::SmallVec;

use crate::debug::DebugTopics;
use crate::frontend::ChangeReason;
use crate::grapheme::{GraphemeReader, GraphemeToken};
use crate::region::Region;
use crate::style::{Color, ColorComponent, Mode, Style};
use crate::terminal::{TermState, TerminalShared};
use crate::view::{MouseEncoding, MouseMode, ViewFlag, ViewInt, ViewString};

/// CSI parameter list; inline capacity covers nearly every real sequence.
pub(crate) type CsiParams = SmallVec<[u16; 4]>;

/// Run the parser until the backend reaches end of stream or fails.
pub(crate) fn read_loop<R: Read>(shared: &TerminalShared, reader: &mut GraphemeReader<R>) {
    let mut tokens = Vec::new();
    loop {
        match read_one(shared, reader, &mut tokens) {
            Ok(()) => {}
            Err(e) => {
                if e.kind() != io::ErrorKind::UnexpectedEof {
                    shared
                        .debug
                        .log(DebugTopics::ERRORS, format_args!("read loop error: {e}"));
                }
                return;
            }
        }
    }
}

/// One iteration: a batch of printable tokens, or one control byte.
pub(crate) fn read_one<R: Read>(
    shared: &TerminalShared,
    reader: &mut GraphemeReader<R>,
    tokens: &mut Vec<GraphemeToken>,
) -> io::Result<()> {
    tokens.clear();
    reader.read_printable_tokens(0, tokens)?;
    if !tokens.is_empty() {
        let mut st = shared.lock_state();
        let mode = st.text_mode;
        for tok in tokens.iter() {
            if st.insert_mode && !tok.merge {
                st.screen_mut().insert_string(&tok.text, tok.width, mode);
            } else {
                st.screen_mut()
                    .write_string(&tok.text, tok.width, tok.merge, mode);
            }
        }
        drop(st);
        if reader.buffered() == 0 {
            return Ok(());
        }
    }

    let b = reader.read_byte()?;
    match b {
        0x00 => {} // NUL
        0x05 => shared
            .debug
            .log(DebugTopics::COMMANDS, format_args!("ENQ ignored")),
        0x07 => shared.lock_state().frontend.bell(),
        0x08 => shared
            .lock_state()
            .screen_mut()
            .move_cursor(-1, 0, false, false),
        0x09 => shared
            .debug
            .log(DebugTopics::TODO, format_args!("horizontal tab ignored")),
        0x0a => shared
            .lock_state()
            .screen_mut()
            .move_cursor(0, 1, true, true),
        0x0b | 0x0c => shared
            .lock_state()
            .screen_mut()
            .move_cursor(0, 1, false, true),
        0x0d => {
            let mut st = shared.lock_state();
            let x = st.screen().cursor().0;
            st.screen_mut().move_cursor(-(x as isize), 0, true, true);
        }
        0x1b => {
            reader.start_recording();
            let handled = handle_command(shared, reader)?;
            let cmd = reader.stop_recording();
            if handled {
                if shared.debug.enabled(DebugTopics::COMMANDS) {
                    shared.debug.log(
                        DebugTopics::COMMANDS,
                        format_args!("cmd: {}", String::from_utf8_lossy(&cmd).escape_debug()),
                    );
                }
            } else {
                shared.debug.todo_sequence("unhandled escape sequence", &cmd);
            }
        }
        // DEL behaves like backspace.
        0x7f => shared
            .lock_state()
            .screen_mut()
            .move_cursor(-1, 0, false, false),
        other => shared.debug.log(
            DebugTopics::TODO,
            format_args!("unhandled control byte {other:#04x}"),
        ),
    }
    Ok(())
}

/// Everything after ESC.
fn handle_command<R: Read>(
    shared: &TerminalShared,
    reader: &mut GraphemeReader<R>,
) -> io::Result<bool> {
    let b = reader.read_byte()?;
    match b {
        // RIS: noted, not implemented.
        b'c' => {
            shared
                .debug
                .log(DebugTopics::TODO, format_args!("full reset ignored"));
            Ok(true)
        }
        // IND: cursor down, scrolling at the bottom margin.
        b'D' => {
            shared
                .lock_state()
                .screen_mut()
                .move_cursor(0, 1, false, true);
            Ok(true)
        }
        // RI: cursor up, scrolling at the top margin.
        b'M' => {
            shared
                .lock_state()
                .screen_mut()
                .move_cursor(0, -1, false, true);
            Ok(true)
        }
        b'7' => {
            shared.lock_state().screen_mut().save_cursor();
            Ok(true)
        }
        b'8' => {
            shared.lock_state().screen_mut().restore_cursor();
            Ok(true)
        }
        b'[' => handle_csi(shared, reader),
        b']' => handle_osc(shared, reader),
        b'P' => handle_dcs(shared, reader),
        // Character-set designation: consume the designator byte.
        b'(' | b')' | b'*' | b'+' => {
            let designator = reader.read_byte()?;
            shared.debug.log(
                DebugTopics::CHARSET,
                format_args!("charset designator {:?} ignored", designator as char),
            );
            Ok(true)
        }
        b'=' => {
            shared
                .lock_state()
                .set_view_flag(ViewFlag::AppKeypad, true);
            Ok(true)
        }
        b'>' => {
            shared
                .lock_state()
                .set_view_flag(ViewFlag::AppKeypad, false);
            Ok(true)
        }
        // A stray string terminator.
        b'\\' => Ok(true),
        _ => Ok(false),
    }
}

fn handle_csi<R: Read>(
    shared: &TerminalShared,
    reader: &mut GraphemeReader<R>,
) -> io::Result<bool> {
    let mut b = reader.read_byte()?;
    let mut prefix = 0u8;
    if matches!(b, b'?' | b'>' | b'<' | b'=') {
        prefix = b;
        b = reader.read_byte()?;
    }

    let mut params = CsiParams::new();
    let mut current: u32 = 0;
    let mut any = false;
    while b == b';' || b.is_ascii_digit() {
        any = true;
        if b == b';' {
            params.push(current.min(u32::from(u16::MAX)) as u16);
            current = 0;
        } else {
            current = current
                .saturating_mul(10)
                .saturating_add(u32::from(b - b'0'));
        }
        b = reader.read_byte()?;
    }
    if any {
        params.push(current.min(u32::from(u16::MAX)) as u16);
    }

    let mut reply = Vec::new();
    let handled = {
        let mut st = shared.lock_state();
        dispatch_csi(shared, &mut st, prefix, &params, b, &mut reply)
    };
    if !reply.is_empty()
        && let Err(e) = shared.write_all(&reply)
    {
        shared
            .debug
            .log(DebugTopics::ERRORS, format_args!("reply write failed: {e}"));
    }
    Ok(handled)
}

fn count_or_one(params: &CsiParams, index: usize) -> usize {
    match params.get(index) {
        Some(&v) if v > 0 => v as usize,
        _ => 1,
    }
}

fn dispatch_csi(
    shared: &TerminalShared,
    st: &mut TermState,
    prefix: u8,
    params: &CsiParams,
    final_byte: u8,
    reply: &mut Vec<u8>,
) -> bool {
    match prefix {
        0 => dispatch_csi_plain(shared, st, params, final_byte, reply),
        b'?' => dispatch_csi_dec(shared, st, params, final_byte, reply),
        b'>' => dispatch_csi_gt(shared, st, params, final_byte, reply),
        b'<' => dispatch_csi_lt(shared, st, params, final_byte),
        b'=' => dispatch_csi_eq(st, params, final_byte),
        _ => false,
    }
}

fn dispatch_csi_plain(
    shared: &TerminalShared,
    st: &mut TermState,
    params: &CsiParams,
    final_byte: u8,
    reply: &mut Vec<u8>,
) -> bool {
    let n = count_or_one(params, 0);
    match final_byte {
        b'A' => st.screen_mut().move_cursor(0, -(n as isize), false, false),
        b'B' => st.screen_mut().move_cursor(0, n as isize, false, false),
        b'C' => st.screen_mut().move_cursor(n as isize, 0, false, false),
        b'D' => st.screen_mut().move_cursor(-(n as isize), 0, false, false),
        b'G' => {
            let y = st.screen().cursor().1;
            st.screen_mut().set_cursor_pos(n - 1, y);
        }
        b'd' => {
            let x = st.screen().cursor().0;
            st.screen_mut().set_cursor_pos(x, n - 1);
        }
        b'H' | b'f' => {
            let row = count_or_one(params, 0);
            let col = count_or_one(params, 1);
            st.screen_mut().set_cursor_pos(col - 1, row - 1);
        }
        b'J' => {
            let mode = params.first().copied().unwrap_or(0);
            let (cols, rows) = st.screen().size();
            let (x, y) = st.screen().cursor();
            match mode {
                0 => {
                    st.screen_mut()
                        .erase_region(Region::row(y, x, cols), ChangeReason::Clear);
                    st.screen_mut()
                        .erase_region(Region::new(0, y + 1, cols, rows), ChangeReason::Clear);
                }
                1 => {
                    st.screen_mut()
                        .erase_region(Region::row(y, 0, x), ChangeReason::Clear);
                    st.screen_mut()
                        .erase_region(Region::new(0, 0, cols, y), ChangeReason::Clear);
                }
                2 => {
                    st.screen_mut()
                        .erase_region(Region::full(cols, rows), ChangeReason::Clear);
                    st.screen_mut().set_cursor_pos(0, 0);
                }
                other => {
                    shared.debug.log(
                        DebugTopics::TODO,
                        format_args!("erase display mode {other} ignored"),
                    );
                }
            }
        }
        b'K' => {
            let mode = params.first().copied().unwrap_or(0);
            let (cols, _) = st.screen().size();
            let (x, y) = st.screen().cursor();
            let region = match mode {
                0 => Region::row(y, x, cols),
                1 => Region::row(y, 0, x),
                2 => Region::row(y, 0, cols),
                other => {
                    shared.debug.log(
                        DebugTopics::TODO,
                        format_args!("erase line mode {other} ignored"),
                    );
                    return true;
                }
            };
            st.screen_mut().erase_region(region, ChangeReason::Clear);
        }
        // IL: open blank lines at the cursor by scrolling the tail of the
        // region down.
        b'L' => {
            let y = st.screen().cursor().1;
            let (_, bottom) = st.screen().margins();
            st.screen_mut().scroll(y, bottom, n as isize);
        }
        // DL: delete lines at the cursor by scrolling the tail up.
        b'M' => {
            let y = st.screen().cursor().1;
            let (_, bottom) = st.screen().margins();
            st.screen_mut().scroll(y, bottom, -(n as isize));
        }
        b'P' => {
            let (x, y) = st.screen().cursor();
            st.screen_mut().delete_chars(x, y, n, ChangeReason::Clear);
        }
        b'S' => {
            let (top, bottom) = st.screen().margins();
            st.screen_mut().scroll(top, bottom, -(n as isize));
        }
        b'T' => {
            let (top, bottom) = st.screen().margins();
            st.screen_mut().scroll(top, bottom, n as isize);
        }
        b'X' => {
            let (x, y) = st.screen().cursor();
            st.screen_mut()
                .erase_region(Region::row(y, x, x + n), ChangeReason::Clear);
        }
        b'@' => st.screen_mut().insert_blanks(n),
        b'c' => {
            if params.first().copied().unwrap_or(0) == 0 {
                reply.extend_from_slice(b"\x1b[?1;2c");
            } else {
                return false;
            }
        }
        b'h' | b'l' => {
            let value = final_byte == b'h';
            for &p in params {
                match p {
                    4 => st.insert_mode = value,
                    other => shared.debug.log(
                        DebugTopics::TODO,
                        format_args!("ansi mode {other} ignored"),
                    ),
                }
            }
        }
        b'm' => {
            let mut style = st.screen().style();
            apply_sgr(&mut style, params, shared);
            st.screen_mut().set_style(style);
        }
        b'n' => match params.first().copied().unwrap_or(0) {
            5 => reply.extend_from_slice(b"\x1b[0n"),
            6 => {
                let (x, y) = st.screen().cursor();
                reply.extend_from_slice(format!("\x1b[{};{}R", y + 1, x + 1).as_bytes());
            }
            _ => return false,
        },
        b'r' => {
            let (_, rows) = st.screen().size();
            let top = count_or_one(params, 0);
            let bottom = match params.get(1) {
                Some(&v) if v > 0 => v as usize,
                _ => rows,
            };
            st.screen_mut().set_margins(top - 1, bottom - 1);
        }
        b's' => {
            if params.is_empty() || (params.len() == 1 && params[0] == 0) {
                st.screen_mut().save_cursor();
            } else {
                return false;
            }
        }
        b'u' => {
            if params.is_empty() || (params.len() == 1 && params[0] == 0) {
                st.screen_mut().restore_cursor();
            } else {
                return false;
            }
        }
        b't' => match params.first().copied().unwrap_or(0) {
            22 => {
                let title = st.view.string(ViewString::WindowTitle).to_string();
                st.title_stack.push(title);
            }
            23 => {
                if let Some(title) = st.title_stack.pop() {
                    st.set_view_string(ViewString::WindowTitle, title);
                }
            }
            other => shared.debug.log(
                DebugTopics::TODO,
                format_args!("window manipulation {other} ignored"),
            ),
        },
        _ => return false,
    }
    true
}

fn dispatch_csi_dec(
    shared: &TerminalShared,
    st: &mut TermState,
    params: &CsiParams,
    final_byte: u8,
    reply: &mut Vec<u8>,
) -> bool {
    match final_byte {
        b'h' | b'l' => {
            let value = final_byte == b'h';
            for &p in params {
                match p {
                    1 => st.set_view_flag(ViewFlag::AppCursorKeys, value),
                    7 => st.screen_mut().set_auto_wrap(value),
                    9 => {
                        let mode = if value { MouseMode::Press } else { MouseMode::None };
                        st.set_view_int(ViewInt::MouseMode, mode.as_int());
                    }
                    12 => st.set_view_flag(ViewFlag::BlinkCursor, value),
                    25 => st.set_view_flag(ViewFlag::ShowCursor, value),
                    1000 => {
                        let mode = if value {
                            MouseMode::PressRelease
                        } else {
                            MouseMode::None
                        };
                        st.set_view_int(ViewInt::MouseMode, mode.as_int());
                    }
                    1002 => {
                        let mode = if value {
                            MouseMode::PressReleaseMove
                        } else {
                            MouseMode::None
                        };
                        st.set_view_int(ViewInt::MouseMode, mode.as_int());
                    }
                    1003 => {
                        let mode = if value {
                            MouseMode::PressReleaseMoveAll
                        } else {
                            MouseMode::None
                        };
                        st.set_view_int(ViewInt::MouseMode, mode.as_int());
                    }
                    1004 => st.set_view_flag(ViewFlag::ReportFocus, value),
                    1005 => {
                        let enc = if value {
                            MouseEncoding::Utf8
                        } else {
                            MouseEncoding::X10
                        };
                        st.set_view_int(ViewInt::MouseEncoding, enc.as_int());
                    }
                    1006 => {
                        let enc = if value {
                            MouseEncoding::Sgr
                        } else {
                            MouseEncoding::X10
                        };
                        st.set_view_int(ViewInt::MouseEncoding, enc.as_int());
                    }
                    1015 => shared.debug.log(
                        DebugTopics::TODO,
                        format_args!("urxvt mouse encoding unsupported"),
                    ),
                    1049 => {
                        if value != st.on_alt_screen {
                            st.switch_screen();
                        }
                    }
                    2004 => st.set_view_flag(ViewFlag::BracketedPaste, value),
                    other => shared.debug.log(
                        DebugTopics::TODO,
                        format_args!("dec private mode {other} ignored"),
                    ),
                }
            }
            true
        }
        // Kitty keyboard flag query.
        b'u' => {
            reply.extend_from_slice(format!("\x1b[?{}u", st.keyboard().flags()).as_bytes());
            true
        }
        _ => false,
    }
}

fn dispatch_csi_gt(
    shared: &TerminalShared,
    st: &mut TermState,
    params: &CsiParams,
    final_byte: u8,
    reply: &mut Vec<u8>,
) -> bool {
    match final_byte {
        // Secondary device attributes.
        b'c' => {
            reply.extend_from_slice(b"\x1b[>1;4402;0c");
            true
        }
        b'm' => match params.first().copied() {
            Some(4) => {
                let level = params.get(1).copied().unwrap_or(0);
                st.set_view_int(ViewInt::ModifyOtherKeys, i32::from(level));
                true
            }
            other => {
                shared.debug.log(
                    DebugTopics::TODO,
                    format_args!("xterm resource {other:?} ignored"),
                );
                true
            }
        },
        // Push keyboard flags.
        b'u' => {
            let flags = params.first().copied().unwrap_or(0);
            st.keyboard_mut().push(u32::from(flags));
            true
        }
        _ => false,
    }
}

fn dispatch_csi_lt(
    shared: &TerminalShared,
    st: &mut TermState,
    params: &CsiParams,
    final_byte: u8,
) -> bool {
    match final_byte {
        // Pop keyboard flags.
        b'u' => {
            let n = count_or_one(params, 0);
            st.keyboard_mut().pop(n);
            true
        }
        // An SGR mouse report echoed back at us; not our direction.
        b'M' | b'm' => {
            shared.debug.log(
                DebugTopics::COMMANDS,
                format_args!("inbound sgr mouse report ignored"),
            );
            true
        }
        _ => false,
    }
}

fn dispatch_csi_eq(st: &mut TermState, params: &CsiParams, final_byte: u8) -> bool {
    match final_byte {
        // Set keyboard flags: mode 1 = set, 2 = or, 3 = and-not.
        b'u' => {
            let flags = u32::from(params.first().copied().unwrap_or(0));
            let mode = u32::from(params.get(1).copied().unwrap_or(1));
            st.keyboard_mut().update(flags, mode);
            true
        }
        _ => false,
    }
}

/// Apply SGR parameters to a style. An empty parameter list resets.
pub(crate) fn apply_sgr(style: &mut Style, params: &[u16], shared: &TerminalShared) {
    if params.is_empty() {
        style.reset_all();
        return;
    }
    let mut i = 0;
    while i < params.len() {
        let p = params[i];
        match p {
            0 => style.reset_all(),
            1 => style.set_mode(Mode::BOLD),
            2 => style.set_mode(Mode::DIM),
            3 => style.set_mode(Mode::ITALIC),
            4 => {
                style.set_mode(Mode::UNDERLINE);
                style.set_underline_style(1);
            }
            5 => style.set_mode(Mode::BLINK),
            6 => style.set_mode(Mode::RAPID_BLINK),
            7 => style.set_mode(Mode::REVERSE),
            8 => style.set_mode(Mode::INVISIBLE),
            9 => style.set_mode(Mode::STRIKE),
            21 => {
                style.set_mode(Mode::DOUBLE_UNDERLINE);
                style.set_underline_style(2);
            }
            22 => style.reset_mode(Mode::BOLD | Mode::DIM),
            23 => style.reset_mode(Mode::ITALIC),
            24 => {
                style.reset_mode(Mode::UNDERLINE | Mode::DOUBLE_UNDERLINE);
                style.set_underline_style(0);
            }
            25 => style.reset_mode(Mode::BLINK | Mode::RAPID_BLINK),
            27 => style.reset_mode(Mode::REVERSE),
            28 => style.reset_mode(Mode::INVISIBLE),
            29 => style.reset_mode(Mode::STRIKE),
            30..=37 => style.set_color(ColorComponent::Fg, Color::Indexed((p - 30) as u8)),
            38 => i += apply_extended_color(style, ColorComponent::Fg, &params[i..], shared),
            39 => style.set_color(ColorComponent::Fg, Color::Default),
            40..=47 => style.set_color(ColorComponent::Bg, Color::Indexed((p - 40) as u8)),
            48 => i += apply_extended_color(style, ColorComponent::Bg, &params[i..], shared),
            49 => style.set_color(ColorComponent::Bg, Color::Default),
            51 => style.set_mode(Mode::FRAMED),
            52 => style.set_mode(Mode::ENCIRCLED),
            53 => style.set_mode(Mode::OVERLINE),
            54 => style.reset_mode(Mode::FRAMED | Mode::ENCIRCLED),
            55 => style.reset_mode(Mode::OVERLINE),
            58 => {
                i += apply_extended_color(style, ColorComponent::Underline, &params[i..], shared);
            }
            59 => style.set_color(ColorComponent::Underline, Color::Default),
            90..=97 => style.set_color(ColorComponent::Fg, Color::Indexed((p - 90 + 8) as u8)),
            100..=107 => style.set_color(ColorComponent::Bg, Color::Indexed((p - 100 + 8) as u8)),
            other => shared
                .debug
                .log(DebugTopics::TODO, format_args!("sgr {other} ignored")),
        }
        i += 1;
    }
}

/// Handle the `38;5;n` / `38;2;r;g;b` sub-forms; returns how many extra
/// parameters were consumed.
fn apply_extended_color(
    style: &mut Style,
    component: ColorComponent,
    params: &[u16],
    shared: &TerminalShared,
) -> usize {
    match params.get(1) {
        Some(5) => {
            if let Some(&idx) = params.get(2) {
                style.set_color(component, Color::Indexed((idx & 0xff) as u8));
                2
            } else {
                1
            }
        }
        Some(2) => {
            if params.len() >= 5 {
                style.set_color(
                    component,
                    Color::Rgb(
                        (params[2] & 0xff) as u8,
                        (params[3] & 0xff) as u8,
                        (params[4] & 0xff) as u8,
                    ),
                );
                4
            } else {
                params.len() - 1
            }
        }
        other => {
            shared.debug.log(
                DebugTopics::TODO,
                format_args!("extended color sub-form {other:?} ignored"),
            );
            params.len() - 1
        }
    }
}

/// Everything after `ESC ]`: a number, optionally `;` and a payload,
/// terminated by BEL, ST, or `ESC \`.
fn handle_osc<R: Read>(
    shared: &TerminalShared,
    reader: &mut GraphemeReader<R>,
) -> io::Result<bool> {
    let mut b = reader.read_byte()?;
    let mut num: u32 = 0;
    let mut have_num = false;
    while b.is_ascii_digit() {
        num = num.saturating_mul(10).saturating_add(u32::from(b - b'0'));
        have_num = true;
        b = reader.read_byte()?;
    }

    let mut payload = Vec::new();
    if b == b';' {
        loop {
            let nb = reader.read_byte()?;
            match nb {
                0x07 | 0x9c => break,
                0x1b => {
                    let nb2 = reader.read_byte()?;
                    if nb2 == b'\\' {
                        break;
                    }
                    payload.push(nb);
                    payload.push(nb2);
                }
                _ => payload.push(nb),
            }
        }
    } else {
        // No payload separator; swallow through the terminator.
        loop {
            match b {
                0x07 | 0x9c => break,
                0x1b => {
                    let nb = reader.read_byte()?;
                    if nb == b'\\' {
                        break;
                    }
                    b = nb;
                }
                _ => b = reader.read_byte()?,
            }
        }
    }

    if !have_num {
        return Ok(false);
    }
    let text = String::from_utf8_lossy(&payload).into_owned();
    let mut st = shared.lock_state();
    let handled = match num {
        0 | 2 => {
            st.set_view_string(ViewString::WindowTitle, text);
            true
        }
        4 => {
            shared.debug.log(
                DebugTopics::TODO,
                format_args!("palette color change ignored"),
            );
            true
        }
        6 => {
            st.set_view_string(ViewString::CurrentDirectory, text);
            true
        }
        7 => {
            st.set_view_string(ViewString::CurrentFile, text);
            true
        }
        10 | 11 => {
            shared.debug.log(
                DebugTopics::TODO,
                format_args!("osc {num} color request ignored"),
            );
            true
        }
        104 => {
            shared
                .debug
                .log(DebugTopics::TODO, format_args!("palette reset ignored"));
            true
        }
        112 => {
            shared.debug.log(
                DebugTopics::TODO,
                format_args!("cursor color reset ignored"),
            );
            true
        }
        _ => false,
    };
    Ok(handled)
}

/// `ESC P` device control string: consumed and ignored.
fn handle_dcs<R: Read>(
    shared: &TerminalShared,
    reader: &mut GraphemeReader<R>,
) -> io::Result<bool> {
    loop {
        let b = reader.read_byte()?;
        match b {
            0x9c => break,
            0x1b => {
                let nb = reader.read_byte()?;
                if nb == b'\\' {
                    break;
                }
            }
            _ => {}
        }
    }
    shared.debug.log(
        DebugTopics::COMMANDS,
        format_args!("device control string ignored"),
    );
    Ok(true)
}
