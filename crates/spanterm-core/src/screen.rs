//! The screen model: a fixed grid of styled span rows plus cursor state.
//!
//! Two of these live inside every terminal (primary and alternate). All
//! mutation goes through the operations here, each of which preserves the
//! row invariant (span widths sum to the grid width) and reports the change
//! to the frontend.
//!
//! Out-of-range writes are programmer errors and panic; well-formed input
//! can never produce them because every dispatch clamps first.

use std::sync::Arc;

use crate::frontend::{ChangeReason, Frontend};
use crate::grapheme::TextMode;
use crate::region::Region;
use crate::span::{Line, Span};
use crate::style::Style;

/// Screens start at 80×24 until the embedder resizes them.
pub const DEFAULT_COLS: usize = 80;
pub const DEFAULT_ROWS: usize = 24;

/// One terminal screen: rows, cursor, pen, scroll margins.
pub struct Screen {
    lines: Vec<Line>,
    frontend: Arc<dyn Frontend>,
    style: Style,
    cols: usize,
    rows: usize,
    cursor_x: usize,
    cursor_y: usize,
    top_margin: usize,
    bottom_margin: usize,
    auto_wrap: bool,
    text_mode: TextMode,
    /// Scrolled-off rows are offered to the frontend only for the primary
    /// screen.
    primary: bool,
    saved_cursor: (usize, usize),
}

impl Screen {
    pub fn new(frontend: Arc<dyn Frontend>, primary: bool) -> Self {
        let style = Style::new();
        Self {
            lines: (0..DEFAULT_ROWS)
                .map(|_| Line::blank(style, DEFAULT_COLS))
                .collect(),
            frontend,
            style,
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
            cursor_x: 0,
            cursor_y: 0,
            top_margin: 0,
            bottom_margin: DEFAULT_ROWS - 1,
            auto_wrap: true,
            text_mode: TextMode::Rune,
            primary,
            saved_cursor: (0, 0),
        }
    }

    pub fn size(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_x, self.cursor_y)
    }

    pub fn style(&self) -> Style {
        self.style
    }

    /// Replace the pen and notify.
    pub fn set_style(&mut self, style: Style) {
        self.style = style;
        self.frontend.style_changed(style);
    }

    pub fn auto_wrap(&self) -> bool {
        self.auto_wrap
    }

    pub fn set_auto_wrap(&mut self, value: bool) {
        self.auto_wrap = value;
    }

    pub fn margins(&self) -> (usize, usize) {
        (self.top_margin, self.bottom_margin)
    }

    /// Set the scroll region (inclusive rows), clamped into the grid.
    pub fn set_margins(&mut self, top: usize, bottom: usize) {
        self.top_margin = top.min(self.rows - 1);
        self.bottom_margin = bottom.min(self.rows - 1);
    }

    pub fn text_mode(&self) -> TextMode {
        self.text_mode
    }

    pub fn save_cursor(&mut self) {
        self.saved_cursor = (self.cursor_x, self.cursor_y);
    }

    pub fn restore_cursor(&mut self) {
        let (x, y) = self.saved_cursor;
        self.set_cursor_pos(x, y);
    }

    // ── Writing ─────────────────────────────────────────────────────

    /// Write one printable token at the cursor. This is the hot path.
    ///
    /// With `merge` the text joins the character left of the cursor (the
    /// cursor does not move; at column 0 the merge is dropped). Otherwise
    /// the token replaces `width` cells and the cursor advances — unless it
    /// sits on the trailing cells of a wide cluster, in which case the text
    /// folds into that cluster so no half character is ever produced.
    pub fn write_string(&mut self, text: &str, width: usize, merge: bool, mode: TextMode) {
        if text.is_empty() {
            return;
        }
        self.text_mode = mode;
        if merge {
            self.merge_into_previous(text);
            return;
        }
        let width = width.max(1).min(self.cols);

        if let Some((start, cw)) = self.lines[self.cursor_y].cluster_at(self.cursor_x, mode)
            && cw > 1
            && start < self.cursor_x
        {
            if let Some((s, w)) =
                self.lines[self.cursor_y].merge_text_at(self.cursor_x, text, mode)
            {
                self.frontend
                    .region_changed(Region::row(self.cursor_y, s, s + w), ChangeReason::Text);
            }
            self.move_cursor(width as isize, 0, true, true);
            return;
        }

        if self.cursor_x + width > self.cols {
            if self.auto_wrap {
                self.move_cursor(-(self.cursor_x as isize), 1, false, true);
            } else {
                self.cursor_x = self.cols - width;
            }
        }
        let span = Span::text(self.style, text, width);
        self.raw_write_span(self.cursor_x, self.cursor_y, span, ChangeReason::Text);
        self.move_cursor(width as isize, 0, true, true);
    }

    /// Insert-mode variant of [`write_string`]: shifts the rest of the row
    /// right before writing.
    ///
    /// [`write_string`]: Screen::write_string
    pub fn insert_string(&mut self, text: &str, width: usize, mode: TextMode) {
        if text.is_empty() {
            return;
        }
        self.text_mode = mode;
        let width = width.max(1).min(self.cols);
        if self.cursor_x + width > self.cols {
            if self.auto_wrap {
                self.move_cursor(-(self.cursor_x as isize), 1, false, true);
            } else {
                self.cursor_x = self.cols - width;
            }
        }
        self.insert_blanks(width);
        let span = Span::text(self.style, text, width);
        self.raw_write_span(self.cursor_x, self.cursor_y, span, ChangeReason::Text);
        self.move_cursor(width as isize, 0, true, true);
    }

    /// Insert `n` blank cells at the cursor, shifting the tail right and
    /// truncating at the right edge. The cursor stays put.
    pub fn insert_blanks(&mut self, n: usize) {
        let n = n.min(self.cols);
        if n == 0 {
            return;
        }
        let y = self.cursor_y;
        self.clear_wide_overlaps(y, self.cursor_x, 1);
        let mode = self.text_mode;
        let line = &mut self.lines[y];
        line.truncate(self.cols - n, mode);
        line.insert_span(self.cursor_x, Span::blank(self.style, n), mode);
        self.frontend.region_changed(
            Region::row(y, self.cursor_x, self.cols),
            ChangeReason::Text,
        );
    }

    fn merge_into_previous(&mut self, text: &str) {
        if self.cursor_x == 0 {
            return;
        }
        let y = self.cursor_y;
        let mode = self.text_mode;
        if let Some((s, w)) = self.lines[y].merge_text_at(self.cursor_x - 1, text, mode) {
            self.frontend
                .region_changed(Region::row(y, s, s + w), ChangeReason::Text);
        }
    }

    /// Replace `span.width` cells at `(x, y)`. Panics when the write falls
    /// outside the grid.
    fn raw_write_span(&mut self, x: usize, y: usize, span: Span, reason: ChangeReason) {
        if span.width == 0 {
            return;
        }
        assert!(
            y < self.rows && x + span.width <= self.cols,
            "span write out of range: ({x},{y}) width {} in {}x{}",
            span.width,
            self.cols,
            self.rows,
        );
        self.clear_wide_overlaps(y, x, span.width);
        let width = span.width;
        self.lines[y].replace_range(x, width, Some(span), self.text_mode);
        self.frontend
            .region_changed(Region::row(y, x, x + width), reason);
    }

    /// Blank every wide cluster whose cells intersect `[x, x + n)` so a
    /// following write cannot leave half of one behind.
    fn clear_wide_overlaps(&mut self, y: usize, x: usize, n: usize) {
        let mode = self.text_mode;
        let wides = self.lines[y].wide_clusters_in(x, n, mode);
        for (start, w) in wides.into_iter().rev() {
            self.lines[y].replace_range(start, w, Some(Span::blank(self.style, w)), mode);
            self.frontend
                .region_changed(Region::row(y, start, start + w), ChangeReason::Clear);
        }
    }

    // ── Cursor ──────────────────────────────────────────────────────

    /// Relative cursor motion.
    ///
    /// `wrap` (together with auto-wrap) carries the X overflow into
    /// adjacent rows; otherwise X clamps. `scroll` lets Y motion past the
    /// margins scroll the region; otherwise Y clamps.
    pub fn move_cursor(&mut self, dx: isize, dy: isize, wrap: bool, scroll: bool) {
        let cols = self.cols as isize;
        let rows = self.rows as isize;
        let mut x = self.cursor_x as isize + dx;
        let mut y = self.cursor_y as isize;
        if wrap && self.auto_wrap {
            while x < 0 {
                x += cols;
                y -= 1;
            }
            while x >= cols {
                x -= cols;
                y += 1;
            }
        } else {
            x = x.clamp(0, cols - 1);
        }

        y += dy;
        if scroll {
            let top = self.top_margin as isize;
            let bottom = self.bottom_margin as isize;
            if y < top {
                self.scroll(self.top_margin, self.bottom_margin, top - y);
                y = top;
            } else if y > bottom {
                self.scroll(self.top_margin, self.bottom_margin, bottom - y);
                y = bottom;
            }
        } else {
            y = y.clamp(0, rows - 1);
        }

        debug_assert!(y >= 0 && y < rows, "cursor row out of range after move");
        self.cursor_x = x as usize;
        self.cursor_y = y.clamp(0, rows - 1) as usize;
        self.frontend.cursor_moved(self.cursor_x, self.cursor_y);
    }

    /// Absolute cursor motion, clamped into the grid.
    pub fn set_cursor_pos(&mut self, x: usize, y: usize) {
        self.cursor_x = x.min(self.cols - 1);
        self.cursor_y = y.min(self.rows - 1);
        self.frontend.cursor_moved(self.cursor_x, self.cursor_y);
    }

    // ── Scrolling ───────────────────────────────────────────────────

    /// Shift rows `[y1, y2]` by `dy` (positive = down). Vacated rows are
    /// blanked in the current style. Rows discarded off the top of the
    /// primary screen are offered to the frontend first.
    pub fn scroll(&mut self, y1: usize, y2: usize, dy: isize) {
        let y1 = y1.min(self.rows - 1);
        let y2 = y2.min(self.rows - 1);
        if y1 > y2 || dy == 0 {
            return;
        }
        let span = y2 - y1 + 1;
        let mag = (dy.unsigned_abs()).min(span);
        let full = Region::new(0, 0, self.cols, 0);
        if dy > 0 {
            for y in ((y1 + mag)..=y2).rev() {
                self.lines[y] = self.lines[y - mag].clone();
            }
            for y in y1..y1 + mag {
                self.lines[y] = Line::blank(self.style, self.cols);
            }
            self.frontend.region_changed(
                Region { y: y1 + mag, y2: y2 + 1, ..full },
                ChangeReason::Scroll,
            );
            self.frontend.region_changed(
                Region { y: y1, y2: y1 + mag, ..full },
                ChangeReason::Scroll,
            );
        } else {
            if self.primary && y1 == 0 {
                for y in y1..y1 + mag {
                    self.frontend.scroll_lines(y);
                }
            }
            for y in y1..(y2 + 1 - mag) {
                self.lines[y] = self.lines[y + mag].clone();
            }
            for y in (y2 + 1 - mag)..=y2 {
                self.lines[y] = Line::blank(self.style, self.cols);
            }
            self.frontend.region_changed(
                Region { y: y1, y2: y2 + 1 - mag, ..full },
                ChangeReason::Scroll,
            );
            self.frontend.region_changed(
                Region { y: y2 + 1 - mag, y2: y2 + 1, ..full },
                ChangeReason::Scroll,
            );
        }
    }

    // ── Erasure and deletion ────────────────────────────────────────

    /// Blank every cell of `region` (clamped) in the current style.
    pub fn erase_region(&mut self, region: Region, reason: ChangeReason) {
        let r = region.clamp(Region::full(self.cols, self.rows));
        if r.is_empty() {
            return;
        }
        for y in r.y..r.y2 {
            self.raw_write_span(r.x, y, Span::blank(self.style, r.x2 - r.x), reason);
        }
    }

    /// Remove `n` cells at `(x, y)`, shifting the remainder of the row left
    /// and filling the tail with blanks.
    pub fn delete_chars(&mut self, x: usize, y: usize, n: usize, reason: ChangeReason) {
        if y >= self.rows || n == 0 || x >= self.cols {
            return;
        }
        let n = n.min(self.cols - x);
        self.clear_wide_overlaps(y, x, n);
        let mode = self.text_mode;
        let line = &mut self.lines[y];
        line.replace_range(x, n, None, mode);
        line.resize(self.cols, self.style, mode);
        self.frontend
            .region_changed(Region::row(y, x, self.cols), reason);
    }

    // ── Resize ──────────────────────────────────────────────────────

    /// Change the grid size, preserving content at the top-left. The
    /// bottom margin keeps its distance from the bottom edge; the cursor
    /// is clamped into the new bounds but not re-homed.
    ///
    /// # Panics
    ///
    /// Panics if `cols` or `rows` is zero.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        assert!(cols > 0 && rows > 0, "screen size must be positive");
        let old_rows = self.rows;
        let old_bottom = self.bottom_margin;

        let mut old = std::mem::take(&mut self.lines).into_iter();
        let mut new_lines = Vec::with_capacity(rows);
        for _ in 0..rows {
            match old.next() {
                Some(mut line) => {
                    line.resize(cols, self.style, self.text_mode);
                    new_lines.push(line);
                }
                None => new_lines.push(Line::blank(self.style, cols)),
            }
        }
        self.lines = new_lines;
        self.cols = cols;
        self.rows = rows;

        let bottom_distance = old_rows.saturating_sub(old_bottom).max(1);
        self.bottom_margin = rows.saturating_sub(bottom_distance).min(rows - 1);
        self.top_margin = self.top_margin.min(self.bottom_margin);
        self.cursor_x = self.cursor_x.min(cols - 1);
        self.cursor_y = self.cursor_y.min(rows - 1);
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// The styled content of cells `[x, x + w)` on row `y`.
    pub fn styled_line(&self, x: usize, w: usize, y: usize) -> Line {
        if y >= self.rows {
            return Line::default();
        }
        self.lines[y].slice(x, w, self.text_mode)
    }

    /// Styled lines for every row of `region`.
    pub fn styled_lines(&self, region: Region) -> Vec<Line> {
        let r = region.clamp(Region::full(self.cols, self.rows));
        (r.y..r.y2)
            .map(|y| self.styled_line(r.x, r.x2 - r.x, y))
            .collect()
    }

    /// Plain text of row `y`, padded to the grid width.
    pub fn line_text(&self, y: usize) -> String {
        if y >= self.rows {
            return String::new();
        }
        self.lines[y].plain_text()
    }

    /// Row `y` re-rendered as ANSI. Parsing the output into a fresh screen
    /// of the same width reproduces the row.
    pub fn render_line_ansi(&self, y: usize) -> String {
        if y >= self.rows {
            return String::new();
        }
        self.lines[y].render_ansi()
    }

    #[cfg(test)]
    pub(crate) fn row_width(&self, y: usize) -> usize {
        self.lines[y].width()
    }
}
