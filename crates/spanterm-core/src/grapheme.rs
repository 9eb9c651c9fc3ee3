//! Byte-buffered segmentation of the inbound stream into printable tokens.
//!
//! The reader exposes two interleaved consumption modes: [`read_byte`] for
//! the parser, which wants control bytes one at a time, and
//! [`read_printable_tokens`], which greedily consumes a contiguous run of
//! printable bytes and segments it into [`GraphemeToken`]s. A token flagged
//! `merge` belongs to the character already on screen (combining marks,
//! variation selectors, ZWJ continuations, the second regional indicator of
//! a flag pair) and carries width 0.
//!
//! Partial UTF-8 is never an error: an incomplete sequence at the end of
//! the buffer stops consumption, the buffer refills from the source, and
//! segmentation retries. A token never splits a codepoint.
//!
//! [`read_byte`]: GraphemeReader::read_byte
//! [`read_printable_tokens`]: GraphemeReader::read_printable_tokens

use std::io::{self, Read};
use std::ops::Range;
use std::str;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// How printable text is tokenized from the input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextMode {
    /// One token per rune, width from the character table. Combining marks
    /// get their own cell (width 1).
    #[default]
    Rune,
    /// One token per grapheme cluster; zero-width continuation clusters
    /// merge into the previous cell.
    Grapheme,
}

/// A printable token: a grapheme cluster (or rune) plus its cell width.
///
/// When `merge` is true the text belongs to the previously written cell and
/// `width` is 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphemeToken {
    pub text: String,
    pub width: usize,
    pub merge: bool,
}

const READ_BUFFER_SIZE: usize = 4096;

pub(crate) fn is_printable_byte(b: u8) -> bool {
    b >= 0x20 && b != 0x7f
}

/// Buffered reader that yields bytes and printable tokens from a source.
pub struct GraphemeReader<R> {
    src: R,
    buf: Vec<u8>,
    start: usize,
    end: usize,
    mode: TextMode,
    force_merge_next: bool,
    last_was_ri: bool,
    record: Option<Vec<u8>>,
}

struct Step {
    consumed: usize,
    text: Option<String>,
    width: usize,
    merge: bool,
    next_force_merge: bool,
    next_last_ri: bool,
}

impl<R: Read> GraphemeReader<R> {
    pub fn new(src: R, mode: TextMode) -> Self {
        Self {
            src,
            buf: Vec::new(),
            start: 0,
            end: 0,
            mode,
            force_merge_next: false,
            last_was_ri: false,
            record: None,
        }
    }

    /// Number of bytes buffered but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.end - self.start
    }

    /// Read one byte, refilling from the source as needed.
    ///
    /// End of input surfaces as `ErrorKind::UnexpectedEof`.
    pub fn read_byte(&mut self) -> io::Result<u8> {
        while self.buffered() == 0 {
            self.fill()?;
        }
        let b = self.buf[self.start];
        self.start += 1;
        if let Some(rec) = self.record.as_mut() {
            rec.push(b);
        }
        Ok(b)
    }

    /// Start capturing every byte returned by [`read_byte`] for debugging.
    ///
    /// [`read_byte`]: GraphemeReader::read_byte
    pub(crate) fn start_recording(&mut self) {
        self.record = Some(Vec::new());
    }

    /// Stop capturing and return the recorded bytes.
    pub(crate) fn stop_recording(&mut self) -> Vec<u8> {
        self.record.take().unwrap_or_default()
    }

    /// Greedily consume a run of printable bytes and append tokens to `out`.
    ///
    /// Stops before the first control byte, leaving it for [`read_byte`].
    /// `max_width` limits the total non-merge cell width consumed; pass 0
    /// for unlimited. Blocks on the source only when no token has been
    /// produced yet.
    ///
    /// [`read_byte`]: GraphemeReader::read_byte
    pub fn read_printable_tokens(
        &mut self,
        max_width: usize,
        out: &mut Vec<GraphemeToken>,
    ) -> io::Result<()> {
        let start_len = out.len();
        let mut width_used = 0usize;
        loop {
            if self.buffered() == 0 {
                if out.len() > start_len {
                    return Ok(());
                }
                self.fill()?;
            }
            if !is_printable_byte(self.buf[self.start]) {
                return Ok(());
            }

            let Some(step) = self.next_step() else {
                // Incomplete UTF-8 at the end of the buffer.
                if out.len() > start_len {
                    return Ok(());
                }
                let before = self.buffered();
                self.fill()?;
                if self.buffered() == before {
                    return Err(io::ErrorKind::UnexpectedEof.into());
                }
                continue;
            };

            let token_width = if step.merge { 0 } else { step.width };
            if max_width > 0 && width_used + token_width > max_width && out.len() > start_len {
                return Ok(());
            }

            let text = match step.text {
                Some(replacement) => replacement,
                None => {
                    // Safe: next_step only consumes whole valid sequences.
                    String::from_utf8_lossy(&self.buf[self.start..self.start + step.consumed])
                        .into_owned()
                }
            };
            out.push(GraphemeToken {
                text,
                width: step.width,
                merge: step.merge,
            });
            self.start += step.consumed;
            self.force_merge_next = step.next_force_merge;
            self.last_was_ri = step.next_last_ri;
            width_used += token_width;
        }
    }

    /// Decide the next token from the buffered bytes without consuming.
    ///
    /// Returns `None` when the buffer ends inside a UTF-8 sequence.
    fn next_step(&self) -> Option<Step> {
        let window = &self.buf[self.start..self.end];
        let valid = match str::from_utf8(window) {
            Ok(s) => s,
            Err(e) => {
                if e.valid_up_to() == 0 {
                    return match e.error_len() {
                        // Malformed bytes become a replacement character.
                        Some(n) => Some(Step {
                            consumed: n,
                            text: Some('\u{fffd}'.to_string()),
                            width: 1,
                            merge: false,
                            next_force_merge: self.force_merge_next,
                            next_last_ri: false,
                        }),
                        None => None,
                    };
                }
                // Valid prefix, incomplete tail: tokenize the prefix.
                str::from_utf8(&window[..e.valid_up_to()]).ok()?
            }
        };
        if valid.is_empty() {
            return None;
        }
        match self.mode {
            TextMode::Rune => {
                let c = valid.chars().next()?;
                Some(Step {
                    consumed: c.len_utf8(),
                    text: None,
                    width: rune_width(c),
                    merge: false,
                    next_force_merge: false,
                    next_last_ri: false,
                })
            }
            TextMode::Grapheme => {
                let cluster = valid.graphemes(true).next()?;
                Some(self.classify_cluster(cluster))
            }
        }
    }

    fn classify_cluster(&self, cluster: &str) -> Step {
        let mut merge = self.force_merge_next;
        let mut next_force_merge = false;
        let mut next_last_ri = false;
        let mut width = cluster.width();

        if is_zwj_only(cluster) {
            merge = true;
            // The cluster joined by this ZWJ must merge as well.
            next_force_merge = true;
        } else if is_variation_selector_only(cluster) {
            merge = true;
        } else if is_regional_indicator(cluster) {
            let count = cluster.chars().count();
            if count == 1 {
                if self.last_was_ri {
                    // Second half of a flag pair.
                    merge = true;
                } else {
                    next_last_ri = true;
                }
            }
            // A complete two-indicator cluster resets the pair state.
            width = width.max(2);
        } else if is_zero_width(cluster) {
            // Combining marks and other zero-width-only clusters.
            merge = true;
        }

        if merge {
            width = 0;
        }
        Step {
            consumed: cluster.len(),
            text: None,
            width,
            merge,
            next_force_merge,
            next_last_ri,
        }
    }

    /// Refill the buffer from the source, compacting once the read head has
    /// passed the midpoint and doubling when full.
    fn fill(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            self.buf = vec![0; READ_BUFFER_SIZE];
        }
        if self.start == self.end {
            self.start = 0;
            self.end = 0;
        } else if self.start > self.buf.len() / 2 {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
        if self.end == self.buf.len() {
            self.buf.resize(self.buf.len() * 2, 0);
        }
        let n = self.src.read(&mut self.buf[self.end..])?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        self.end += n;
        Ok(())
    }
}

/// Cell width of a single rune; never 0 so table-only widths stay aligned.
pub(crate) fn rune_width(c: char) -> usize {
    c.width().unwrap_or(0).max(1)
}

/// Walk `text` as clusters, yielding `(byte_range, cell_width)` per cluster.
pub(crate) fn clusters(text: &str, mode: TextMode) -> Vec<(Range<usize>, usize)> {
    match mode {
        TextMode::Rune => text
            .char_indices()
            .map(|(i, c)| (i..i + c.len_utf8(), rune_width(c)))
            .collect(),
        TextMode::Grapheme => text
            .grapheme_indices(true)
            .map(|(i, g)| (i..i + g.len(), g.width()))
            .collect(),
    }
}

fn is_zero_width(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.width().unwrap_or(0) == 0)
}

fn is_zwj_only(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c == '\u{200d}')
}

fn is_variation_selector_only(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| {
            matches!(c, '\u{fe00}'..='\u{fe0f}' | '\u{e0100}'..='\u{e01ef}')
        })
}

fn is_regional_indicator(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| ('\u{1f1e6}'..='\u{1f1ff}').contains(&c))
}
