//! The terminal: screens, view state, reader thread, outbound writer.
//!
//! A [`Terminal`] owns a primary and an alternate [`Screen`], the view
//! state, and a dedicated reader thread that pulls bytes from the
//! [`Backend`] through the parser. One mutex covers both screens and all
//! view state; the parser takes it once per dispatched command, and
//! callers can take it explicitly (via [`Terminal::lock`] or
//! [`Terminal::with_lock`]) to get a coherent multi-query view.

use std::io;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use crate::backend::{Backend, BackendReader};
use crate::debug::DebugConfig;
use crate::frontend::{ChangeReason, Frontend};
use crate::grapheme::{GraphemeReader, TextMode};
use crate::keyboard_mode::KeyboardMode;
use crate::keys::{self, KeyContext, KeyEvent};
use crate::mouse::{self, MouseMods};
use crate::parser;
use crate::region::Region;
use crate::screen::Screen;
use crate::span::Line;
use crate::style::Style;
use crate::view::{MouseEncoding, MouseMode, ViewFlag, ViewInt, ViewState, ViewString};

/// Environment the child process must see; set by the backend, not here.
pub const TERM_ENV: &str = "TERM=xterm-256color";

/// Construction-time options.
#[derive(Debug, Clone, Copy)]
pub struct TerminalConfig {
    /// How printable text is segmented into cells.
    pub text_mode: TextMode,
    /// Diagnostic topics for this terminal.
    pub debug: DebugConfig,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            text_mode: TextMode::Rune,
            debug: DebugConfig::default(),
        }
    }
}

/// Everything behind the terminal mutex.
pub(crate) struct TermState {
    pub(crate) frontend: Arc<dyn Frontend>,
    pub(crate) on_alt_screen: bool,
    pub(crate) main_screen: Screen,
    pub(crate) alt_screen: Screen,
    pub(crate) view: ViewState,
    pub(crate) keyboard_main: KeyboardMode,
    pub(crate) keyboard_alt: KeyboardMode,
    pub(crate) insert_mode: bool,
    pub(crate) title_stack: Vec<String>,
    pub(crate) text_mode: TextMode,
}

impl TermState {
    pub(crate) fn screen(&self) -> &Screen {
        if self.on_alt_screen {
            &self.alt_screen
        } else {
            &self.main_screen
        }
    }

    pub(crate) fn screen_mut(&mut self) -> &mut Screen {
        if self.on_alt_screen {
            &mut self.alt_screen
        } else {
            &mut self.main_screen
        }
    }

    /// The keyboard mode of the active screen.
    pub(crate) fn keyboard(&self) -> &KeyboardMode {
        if self.on_alt_screen {
            &self.keyboard_alt
        } else {
            &self.keyboard_main
        }
    }

    pub(crate) fn keyboard_mut(&mut self) -> &mut KeyboardMode {
        if self.on_alt_screen {
            &mut self.keyboard_alt
        } else {
            &mut self.keyboard_main
        }
    }

    pub(crate) fn set_view_flag(&mut self, flag: ViewFlag, value: bool) {
        self.view.set_flag(flag, value);
        self.frontend.view_flag_changed(flag, value);
    }

    pub(crate) fn set_view_int(&mut self, flag: ViewInt, value: i32) {
        self.view.set_int(flag, value);
        self.frontend.view_int_changed(flag, value);
    }

    pub(crate) fn set_view_string(&mut self, flag: ViewString, value: String) {
        self.frontend.view_string_changed(flag, &value);
        self.view.set_string(flag, value);
    }

    /// Toggle between primary and alternate screen.
    pub(crate) fn switch_screen(&mut self) {
        self.on_alt_screen = !self.on_alt_screen;
        let (cols, rows) = self.screen().size();
        self.frontend
            .region_changed(Region::full(cols, rows), ChangeReason::ScreenSwitch);
    }
}

pub(crate) struct TerminalShared {
    pub(crate) state: Mutex<TermState>,
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) debug: DebugConfig,
}

impl TerminalShared {
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, TermState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write to the backend, retrying short writes to completion.
    pub(crate) fn write_all(&self, bytes: &[u8]) -> io::Result<usize> {
        let mut remaining = bytes;
        let mut total = 0;
        while !remaining.is_empty() {
            let n = self.backend.write(remaining)?;
            if n == 0 {
                return Err(io::ErrorKind::WriteZero.into());
            }
            total += n;
            remaining = &remaining[n..];
        }
        Ok(total)
    }
}

/// A VT terminal core bound to one frontend and one backend.
pub struct Terminal {
    shared: Arc<TerminalShared>,
    done: Mutex<Option<mpsc::Receiver<()>>>,
}

impl Terminal {
    /// Create a terminal with default configuration and start its reader
    /// loop.
    pub fn new(frontend: Arc<dyn Frontend>, backend: Arc<dyn Backend>) -> Self {
        Self::with_config(frontend, backend, TerminalConfig::default())
    }

    /// Create a terminal and start its reader loop.
    pub fn with_config(
        frontend: Arc<dyn Frontend>,
        backend: Arc<dyn Backend>,
        config: TerminalConfig,
    ) -> Self {
        let term = Self::build(frontend, backend, config);
        let shared = Arc::clone(&term.shared);
        let (tx, rx) = mpsc::channel::<()>();
        thread::spawn(move || {
            let mut reader = GraphemeReader::new(
                BackendReader(Arc::clone(&shared.backend)),
                config.text_mode,
            );
            parser::read_loop(&shared, &mut reader);
            drop(tx);
        });
        *term.done.lock().unwrap_or_else(PoisonError::into_inner) = Some(rx);
        term
    }

    fn build(
        frontend: Arc<dyn Frontend>,
        backend: Arc<dyn Backend>,
        config: TerminalConfig,
    ) -> Self {
        let state = TermState {
            frontend: Arc::clone(&frontend),
            on_alt_screen: false,
            main_screen: Screen::new(Arc::clone(&frontend), true),
            alt_screen: Screen::new(Arc::clone(&frontend), false),
            view: ViewState::default(),
            keyboard_main: KeyboardMode::default(),
            keyboard_alt: KeyboardMode::default(),
            insert_mode: false,
            title_stack: Vec::new(),
            text_mode: config.text_mode,
        };
        Self {
            shared: Arc::new(TerminalShared {
                state: Mutex::new(state),
                backend,
                debug: config.debug,
            }),
            done: Mutex::new(None),
        }
    }

    /// Build a terminal without a reader thread; tests feed bytes
    /// synchronously with [`Terminal::feed`].
    #[cfg(test)]
    pub(crate) fn detached(
        frontend: Arc<dyn Frontend>,
        backend: Arc<dyn Backend>,
        config: TerminalConfig,
    ) -> Self {
        Self::build(frontend, backend, config)
    }

    /// Parse `bytes` synchronously on the calling thread.
    #[cfg(test)]
    pub(crate) fn feed(&self, bytes: &[u8]) {
        let mode = self.shared.lock_state().text_mode;
        let mut reader = GraphemeReader::new(std::io::Cursor::new(bytes.to_vec()), mode);
        let mut tokens = Vec::new();
        while parser::read_one(&self.shared, &mut reader, &mut tokens).is_ok() {}
    }

    /// Write bytes to the child process (keyboard/mouse traffic). Short
    /// writes are retried to completion.
    pub fn write(&self, bytes: &[u8]) -> io::Result<usize> {
        self.shared.write_all(bytes)
    }

    /// Current size of the active screen.
    pub fn size(&self) -> (usize, usize) {
        self.shared.lock_state().screen().size()
    }

    /// Resize both screens and the backend.
    ///
    /// # Panics
    ///
    /// Panics if `cols` or `rows` is zero.
    pub fn resize(&self, cols: usize, rows: usize) -> io::Result<()> {
        {
            let mut st = self.shared.lock_state();
            st.main_screen.resize(cols, rows);
            st.alt_screen.resize(cols, rows);
        }
        self.shared.backend.set_size(cols, rows)
    }

    /// Plain text of row `y` on the active screen.
    pub fn line(&self, y: usize) -> String {
        self.lock().line(y)
    }

    /// Row `y` re-rendered as ANSI.
    pub fn ansi_line(&self, y: usize) -> String {
        self.lock().ansi_line(y)
    }

    /// Styled cells `[x, x + w)` of row `y`.
    pub fn styled_line(&self, x: usize, w: usize, y: usize) -> Line {
        self.lock().styled_line(x, w, y)
    }

    /// Styled lines for a region.
    pub fn styled_lines(&self, region: Region) -> Vec<Line> {
        self.lock().styled_lines(region)
    }

    /// Whether the alternate screen is active.
    pub fn on_alt_screen(&self) -> bool {
        self.shared.lock_state().on_alt_screen
    }

    /// Toggle between the primary and alternate screen.
    pub fn switch_screen(&self) {
        self.shared.lock_state().switch_screen();
    }

    /// Ask the frontend to repaint the whole active screen.
    pub fn redraw_all(&self) {
        let st = self.shared.lock_state();
        let (cols, rows) = st.screen().size();
        st.frontend
            .region_changed(Region::full(cols, rows), ChangeReason::Redraw);
    }

    pub fn view_flag(&self, flag: ViewFlag) -> bool {
        self.shared.lock_state().view.flag(flag)
    }

    pub fn view_int(&self, flag: ViewInt) -> i32 {
        self.shared.lock_state().view.int(flag)
    }

    pub fn view_string(&self, flag: ViewString) -> String {
        self.shared.lock_state().view.string(flag).to_string()
    }

    /// Encode a key event and send it to the child process.
    pub fn send_key(&self, event: &KeyEvent) -> io::Result<usize> {
        let ctx = {
            let st = self.shared.lock_state();
            KeyContext {
                app_cursor_keys: st.view.flag(ViewFlag::AppCursorKeys),
                modify_other_keys: st.view.int(ViewInt::ModifyOtherKeys),
                kitty_flags: st.keyboard().flags(),
            }
        };
        let seq = keys::encode_key(event, &ctx);
        if seq.is_empty() {
            return Ok(0);
        }
        self.shared.write_all(&seq)
    }

    /// Encode a mouse event (1-based coordinates) and send it to the child
    /// process. Filtered events write nothing and return `Ok(0)`.
    pub fn send_mouse(
        &self,
        button: u8,
        press: bool,
        mods: MouseMods,
        x: usize,
        y: usize,
    ) -> io::Result<usize> {
        let (mode, encoding) = {
            let st = self.shared.lock_state();
            (
                MouseMode::from_int(st.view.int(ViewInt::MouseMode)),
                MouseEncoding::from_int(st.view.int(ViewInt::MouseEncoding)),
            )
        };
        match mouse::encode_mouse(mode, encoding, button, press, mods, x, y) {
            Some(seq) => self.shared.write_all(&seq),
            None => Ok(0),
        }
    }

    /// Take the terminal lock for a batch of coherent queries.
    pub fn lock(&self) -> TerminalGuard<'_> {
        TerminalGuard {
            state: self.shared.lock_state(),
        }
    }

    /// Run `f` with the terminal locked.
    pub fn with_lock<T>(&self, f: impl FnOnce(&mut TerminalGuard<'_>) -> T) -> T {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Block until the reader loop has observed end of stream and exited.
    pub fn wait(&self) {
        let guard = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(rx) = guard.as_ref() {
            // Disconnect is the completion signal.
            let _ = rx.recv();
        }
    }
}

/// Exclusive view of the terminal state for coherent multi-call reads.
pub struct TerminalGuard<'a> {
    state: MutexGuard<'a, TermState>,
}

impl TerminalGuard<'_> {
    pub fn size(&self) -> (usize, usize) {
        self.state.screen().size()
    }

    pub fn cursor(&self) -> (usize, usize) {
        self.state.screen().cursor()
    }

    pub fn style(&self) -> Style {
        self.state.screen().style()
    }

    pub fn on_alt_screen(&self) -> bool {
        self.state.on_alt_screen
    }

    pub fn line(&self, y: usize) -> String {
        let (cols, _) = self.size();
        self.state.screen().styled_line(0, cols, y).plain_text()
    }

    pub fn ansi_line(&self, y: usize) -> String {
        self.state.screen().render_line_ansi(y)
    }

    pub fn styled_line(&self, x: usize, w: usize, y: usize) -> Line {
        self.state.screen().styled_line(x, w, y)
    }

    pub fn styled_lines(&self, region: Region) -> Vec<Line> {
        self.state.screen().styled_lines(region)
    }

    pub fn view_flag(&self, flag: ViewFlag) -> bool {
        self.state.view.flag(flag)
    }

    pub fn view_int(&self, flag: ViewInt) -> i32 {
        self.state.view.int(flag)
    }

    pub fn view_string(&self, flag: ViewString) -> String {
        self.state.view.string(flag).to_string()
    }
}
