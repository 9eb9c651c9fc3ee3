#![forbid(unsafe_code)]

//! Span-based VT terminal emulator core.
//!
//! `spanterm-core` accepts the byte stream a child process writes to its
//! terminal, maintains an in-memory model of the visible screen, and
//! notifies an attached [`Frontend`] of every change. Keyboard and mouse
//! events injected by the embedder are encoded back onto the outbound
//! stream in the form the child expects.
//!
//! # Primary responsibilities
//!
//! - **Style**: packed color + rendition value, mergeable by equality,
//!   with full and delta ANSI emission.
//! - **Span / Line**: run-length encoded rows; wide characters are single
//!   spans, never split in half.
//! - **Screen**: cursor, scroll margins, write/erase/scroll/insert
//!   primitives, alternate-screen pair, ANSI round-trip rendering.
//! - **Grapheme reader**: byte-buffered UTF-8 segmentation into printable
//!   tokens with display width and merge classification.
//! - **Parser**: C0 + ESC + CSI + OSC + DCS dispatch, tolerant of partial
//!   reads and unknown sequences.
//! - **Terminal**: composition, the reader thread, the lock API, and
//!   keyboard/mouse encoding.
//!
//! # Design principles
//!
//! - Dispatch over variants: spans are a tagged sum, screens are concrete.
//! - Polymorphism only at the boundaries ([`Frontend`], [`Backend`]).
//! - Malformed input is never fatal; invariant violations panic.

pub mod backend;
pub mod debug;
pub mod frontend;
pub mod grapheme;
pub mod keyboard_mode;
pub mod keys;
pub mod mouse;
mod parser;
pub mod region;
pub mod screen;
pub mod span;
pub mod style;
pub mod terminal;
pub mod view;

#[cfg(test)]
mod test_util;

pub use backend::{Backend, StreamBackend, TeeBackend};
pub use debug::{DebugConfig, DebugTopics};
pub use frontend::{ChangeReason, EmptyFrontend, Frontend};
pub use grapheme::{GraphemeReader, GraphemeToken, TextMode};
pub use keyboard_mode::{KeyboardMode, kitty};
pub use keys::{KeyCode, KeyEvent, KeyEventKind, KeyMods};
pub use mouse::{
    BUTTON_LEFT, BUTTON_MIDDLE, BUTTON_RIGHT, BUTTON_WHEEL_DOWN, BUTTON_WHEEL_UP, MouseMods,
};
pub use region::Region;
pub use screen::{DEFAULT_COLS, DEFAULT_ROWS, Screen};
pub use span::{Line, Span, SpanContent};
pub use style::{Color, ColorComponent, Mode, Style};
pub use terminal::{TERM_ENV, Terminal, TerminalConfig, TerminalGuard};
pub use view::{MouseEncoding, MouseMode, ViewFlag, ViewInt, ViewString};
