//! Helpers shared by the integration tests: a recording frontend and a
//! pipe-backed terminal whose outbound bytes are captured.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use spanterm_core::{
    ChangeReason, Frontend, Line, Region, StreamBackend, Style, Terminal, TerminalConfig,
    ViewFlag, ViewInt, ViewString,
};

/// Everything the frontend observed.
#[derive(Debug, Default, Clone)]
pub struct Recorded {
    pub bell_count: usize,
    pub regions: Vec<(Region, ChangeReason)>,
    pub scrolled_off: Vec<usize>,
    pub cursor: (usize, usize),
    pub styles: Vec<Style>,
    pub flags: Vec<(ViewFlag, bool)>,
    pub ints: Vec<(ViewInt, i32)>,
    pub strings: Vec<(ViewString, String)>,
}

#[derive(Debug, Default)]
pub struct RecordingFrontend {
    recorded: Mutex<Recorded>,
}

impl RecordingFrontend {
    pub fn snapshot(&self) -> Recorded {
        self.recorded.lock().unwrap().clone()
    }
}

impl Frontend for RecordingFrontend {
    fn bell(&self) {
        self.recorded.lock().unwrap().bell_count += 1;
    }
    fn region_changed(&self, region: Region, reason: ChangeReason) {
        self.recorded.lock().unwrap().regions.push((region, reason));
    }
    fn scroll_lines(&self, y: usize) {
        self.recorded.lock().unwrap().scrolled_off.push(y);
    }
    fn cursor_moved(&self, x: usize, y: usize) {
        self.recorded.lock().unwrap().cursor = (x, y);
    }
    fn style_changed(&self, style: Style) {
        self.recorded.lock().unwrap().styles.push(style);
    }
    fn view_flag_changed(&self, flag: ViewFlag, value: bool) {
        self.recorded.lock().unwrap().flags.push((flag, value));
    }
    fn view_int_changed(&self, flag: ViewInt, value: i32) {
        self.recorded.lock().unwrap().ints.push((flag, value));
    }
    fn view_string_changed(&self, flag: ViewString, value: &str) {
        self.recorded
            .lock()
            .unwrap()
            .strings
            .push((flag, value.to_string()));
    }
}

struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A live terminal reading from a pipe. Returns the terminal, the pipe
/// writer feeding it, the frontend, and the captured outbound bytes.
///
/// Drop the writer and call [`Terminal::wait`] to drain deterministically.
pub fn spawn_terminal(
    config: TerminalConfig,
) -> (
    Terminal,
    io::PipeWriter,
    Arc<RecordingFrontend>,
    Arc<Mutex<Vec<u8>>>,
) {
    let (reader, writer) = io::pipe().expect("pipe");
    let frontend = Arc::new(RecordingFrontend::default());
    let outbound = Arc::new(Mutex::new(Vec::new()));
    let backend = Arc::new(StreamBackend::new(reader, SharedSink(outbound.clone())));
    let term = Terminal::with_config(frontend.clone(), backend, config);
    (term, writer, frontend, outbound)
}

/// Feed bytes through a fresh terminal of the given size and hand it back
/// fully drained.
pub fn parse_into_terminal(
    cols: usize,
    rows: usize,
    bytes: &[u8],
    config: TerminalConfig,
) -> (Terminal, Arc<RecordingFrontend>) {
    let (term, mut writer, frontend, _) = spawn_terminal(config);
    term.resize(cols, rows).expect("resize");
    writer.write_all(bytes).expect("write");
    drop(writer);
    term.wait();
    (term, frontend)
}

/// Canonical per-cell view of a line: plain text plus one style per cell.
/// Two lines that render identically compare equal under this view even
/// when their span structure differs.
pub fn canonical(line: &Line) -> (String, Vec<Style>) {
    let mut styles = Vec::new();
    for sp in line.spans() {
        for _ in 0..sp.width {
            styles.push(sp.style);
        }
    }
    (line.plain_text(), styles)
}
