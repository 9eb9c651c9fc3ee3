//! Outbound mouse report encoding.
//!
//! Events injected by the embedder are filtered by the active
//! [`MouseMode`], then serialized in the negotiated [`MouseEncoding`].
//!
//! [`MouseMode`]: crate::view::MouseMode
//! [`MouseEncoding`]: crate::view::MouseEncoding

use bitflags::bitflags;

use crate::view::{MouseEncoding, MouseMode};

bitflags! {
    /// Modifier and motion bits, already in X10 wire positions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MouseMods: u8 {
        const SHIFT  = 4;
        const META   = 8;
        const CTRL   = 16;
        const MOTION = 32;
    }
}

/// Wheel events use buttons 4 (up) and 5 (down) with `press = true`.
pub const BUTTON_LEFT: u8 = 1;
pub const BUTTON_MIDDLE: u8 = 2;
pub const BUTTON_RIGHT: u8 = 3;
pub const BUTTON_WHEEL_UP: u8 = 4;
pub const BUTTON_WHEEL_DOWN: u8 = 5;

const BUTTON_BITS: u8 = 3;
const RELEASE_BITS: u8 = 3;
const WHEEL_BIT: u8 = 64;

/// Whether the active mode reports this event at all.
pub(crate) fn mode_accepts(mode: MouseMode, press: bool, mods: MouseMods) -> bool {
    let motion = mods.contains(MouseMods::MOTION);
    match mode {
        MouseMode::None => false,
        MouseMode::Press => press && !motion,
        MouseMode::PressRelease => !motion,
        MouseMode::PressReleaseMove => !(motion && !press),
        MouseMode::PressReleaseMoveAll => true,
    }
}

/// The shared button byte: low two bits select the button, bit 6 marks
/// wheel buttons, modifier bits are or-ed in.
fn button_bits(button: u8, mods: MouseMods) -> u8 {
    let base = match button {
        BUTTON_LEFT..=BUTTON_RIGHT => (button - 1) & BUTTON_BITS,
        BUTTON_WHEEL_UP..=7 => WHEEL_BIT | ((button - BUTTON_WHEEL_UP) & BUTTON_BITS),
        _ => RELEASE_BITS,
    };
    base | mods.bits()
}

/// Encode a mouse event, 1-based coordinates. Returns the outbound bytes;
/// `None` means the event is filtered out by the mode.
pub(crate) fn encode_mouse(
    mode: MouseMode,
    encoding: MouseEncoding,
    button: u8,
    press: bool,
    mods: MouseMods,
    x: usize,
    y: usize,
) -> Option<Vec<u8>> {
    if !mode_accepts(mode, press, mods) {
        return None;
    }
    let btn = button_bits(button, mods);
    Some(match encoding {
        MouseEncoding::X10 => {
            let btn = if press { btn } else { btn | RELEASE_BITS };
            let x = (32 + x).min(255) as u8;
            let y = (32 + y).min(255) as u8;
            let mut out = b"\x1b[M".to_vec();
            out.push(32 + btn);
            out.push(x);
            out.push(y);
            out
        }
        MouseEncoding::Utf8 => {
            let btn = if press { btn } else { btn | RELEASE_BITS };
            let mut out = String::from("\x1b[M");
            out.push(char::from(32 + btn));
            out.push(char::from_u32((32 + x) as u32).unwrap_or(' '));
            out.push(char::from_u32((32 + y) as u32).unwrap_or(' '));
            out.into_bytes()
        }
        MouseEncoding::Sgr => {
            let final_byte = if press { 'M' } else { 'm' };
            format!("\x1b[<{btn};{x};{y}{final_byte}").into_bytes()
        }
    })
}
