//! The IO connection between the core and the child process.
//!
//! A [`Backend`] supplies the byte stream the parser consumes and accepts
//! the bytes the terminal sends back (keyboard, mouse, query replies).
//! PTY allocation and process spawning live outside the core; any
//! reader/writer pair can be wrapped in a [`StreamBackend`].

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// IO endpoint for a terminal. Reads and writes take `&self` because the
/// reader thread and caller threads use the backend concurrently.
pub trait Backend: Send + Sync {
    /// Read bytes produced by the child process. Blocks until data is
    /// available; `Ok(0)` signals end of stream.
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write bytes destined for the child process.
    fn write(&self, buf: &[u8]) -> io::Result<usize>;

    /// Propagate a terminal resize to the child (window-size ioctl or
    /// equivalent). The default does nothing.
    fn set_size(&self, cols: usize, rows: usize) -> io::Result<()> {
        let _ = (cols, rows);
        Ok(())
    }
}

/// A backend over arbitrary reader/writer halves.
pub struct StreamBackend {
    reader: Mutex<Box<dyn Read + Send>>,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl StreamBackend {
    pub fn new(
        reader: impl Read + Send + 'static,
        writer: impl Write + Send + 'static,
    ) -> Self {
        Self {
            reader: Mutex::new(Box::new(reader)),
            writer: Mutex::new(Box::new(writer)),
        }
    }
}

impl Backend for StreamBackend {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut reader = self.reader.lock().unwrap_or_else(PoisonError::into_inner);
        reader.read(buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let n = writer.write(buf)?;
        writer.flush()?;
        Ok(n)
    }
}

/// Wraps a backend and duplicates every byte read from it into an
/// attachable writer, for traffic capture and session recording.
pub struct TeeBackend {
    inner: Arc<dyn Backend>,
    tee: Mutex<Option<Box<dyn Write + Send>>>,
}

impl TeeBackend {
    pub fn new(inner: Arc<dyn Backend>) -> Self {
        Self {
            inner,
            tee: Mutex::new(None),
        }
    }

    /// Attach or replace the capture writer; `None` detaches.
    pub fn set_tee(&self, tee: Option<Box<dyn Write + Send>>) {
        *self.tee.lock().unwrap_or_else(PoisonError::into_inner) = tee;
    }
}

impl Backend for TeeBackend {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            let mut tee = self.tee.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(w) = tee.as_mut() {
                // Capture failures detach the tee rather than break the
                // session.
                if w.write_all(&buf[..n]).is_err() {
                    *tee = None;
                }
            }
        }
        Ok(n)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn set_size(&self, cols: usize, rows: usize) -> io::Result<()> {
        self.inner.set_size(cols, rows)
    }
}

/// `io::Read` adapter over a shared backend, for the grapheme reader.
pub(crate) struct BackendReader(pub(crate) Arc<dyn Backend>);

impl Read for BackendReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}
