//! Run-length storage for screen rows.
//!
//! A row is a [`Line`]: a sequence of [`Span`]s whose cell widths always sum
//! to the grid width. A span is either a repeated rune (blank fills, ASCII
//! runs written cell-by-cell) or a UTF-8 text fragment whose total display
//! width is tracked explicitly — a wide cluster is a single text span of
//! width 2, with no separate continuation cell.
//!
//! All primitives here preserve the width invariant; splitting inside a
//! wide cluster blanks the whole cluster on both sides so a half character
//! can never survive a structural edit.

use std::fmt::Write as _;

use crate::grapheme::{self, TextMode};
use crate::style::Style;

/// Content of a span: one rune covering every cell, or literal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanContent {
    Repeat(char),
    Text(String),
}

/// A run of cells sharing one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub style: Style,
    pub width: usize,
    pub content: SpanContent,
}

impl Span {
    /// A span repeating `ch` over `width` cells.
    #[must_use]
    pub fn repeat(style: Style, ch: char, width: usize) -> Self {
        Self {
            style,
            width,
            content: SpanContent::Repeat(ch),
        }
    }

    /// A blank (space-filled) span.
    #[must_use]
    pub fn blank(style: Style, width: usize) -> Self {
        Self::repeat(style, ' ', width)
    }

    /// A text span covering `width` cells.
    #[must_use]
    pub fn text(style: Style, text: impl Into<String>, width: usize) -> Self {
        Self {
            style,
            width,
            content: SpanContent::Text(text.into()),
        }
    }

    /// The span's content as a string (repeats are expanded).
    #[must_use]
    pub fn to_text(&self) -> String {
        match &self.content {
            SpanContent::Repeat(ch) => {
                let mut s = String::with_capacity(self.width);
                for _ in 0..self.width {
                    s.push(*ch);
                }
                s
            }
            SpanContent::Text(t) => t.clone(),
        }
    }
}

/// One screen row: spans plus the total cell width they cover.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Line {
    spans: Vec<Span>,
    width: usize,
}

impl Line {
    /// An all-blank row of the given width.
    #[must_use]
    pub fn blank(style: Style, width: usize) -> Self {
        Self {
            spans: vec![Span::blank(style, width)],
            width,
        }
    }

    /// Build a line from spans; the width is the sum of span widths.
    #[must_use]
    pub fn from_spans(spans: Vec<Span>) -> Self {
        let width = spans.iter().map(|s| s.width).sum();
        Self { spans, width }
    }

    /// Total cell width.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// The spans of this row, left to right.
    #[must_use]
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// The row's text with repeats expanded. Wide clusters appear once;
    /// their continuation cells contribute nothing.
    #[must_use]
    pub fn plain_text(&self) -> String {
        let mut out = String::with_capacity(self.width);
        for sp in &self.spans {
            match &sp.content {
                SpanContent::Repeat(ch) => {
                    for _ in 0..sp.width {
                        out.push(*ch);
                    }
                }
                SpanContent::Text(t) => out.push_str(t),
            }
        }
        out
    }

    /// The span index containing cell `x` and the offset inside that span.
    ///
    /// When `x` lands exactly on a span boundary the index of the span
    /// after the boundary is returned with offset 0.
    #[must_use]
    pub fn find_span_at(&self, x: usize) -> (usize, usize) {
        if x == 0 {
            return (0, 0);
        }
        let mut pos = 0;
        for (i, sp) in self.spans.iter().enumerate() {
            let next = pos + sp.width;
            if x == next {
                return (i + 1, 0);
            }
            if x < next {
                return (i, x - pos);
            }
            pos = next;
        }
        (self.spans.len(), 0)
    }

    /// Replace `n` cells starting at `x` with `insert` (which may be
    /// `None` for pure deletion). The line's width becomes
    /// `width - n + insert.width`; callers maintain the grid invariant with
    /// fill spans.
    pub fn replace_range(&mut self, x: usize, n: usize, insert: Option<Span>, mode: TextMode) {
        let total = self.width;
        let x = x.min(total);
        let n = n.min(total - x);
        let insert_width = insert.as_ref().map_or(0, |s| s.width);
        if n == 0 && insert_width == 0 {
            return;
        }

        let old = std::mem::take(&mut self.spans);
        let (mut prefix, tail) = split_spans_at(old, x, mode);
        let (_, suffix) = split_spans_at(tail, n, mode);

        if let Some(sp) = insert
            && sp.width > 0
        {
            prefix.push(sp);
        }
        prefix.extend(suffix);
        self.spans = prefix;
        self.width = total - n + insert_width;
        self.merge_adjacent();
    }

    /// Insert a span at cell `x`, shifting the tail right. The caller must
    /// truncate afterwards if the grid width is exceeded.
    pub fn insert_span(&mut self, x: usize, span: Span, mode: TextMode) {
        self.replace_range(x, 0, Some(span), mode);
    }

    /// Drop trailing cells so the total width becomes exactly `width`.
    pub fn truncate(&mut self, width: usize, mode: TextMode) {
        if width >= self.width {
            return;
        }
        if width == 0 {
            self.spans.clear();
            self.width = 0;
            return;
        }
        let n = self.width - width;
        self.replace_range(width, n, None, mode);
    }

    /// Truncate or pad with blanks to exactly `width` cells.
    pub fn resize(&mut self, width: usize, fill: Style, mode: TextMode) {
        if self.width > width {
            self.truncate(width, mode);
        } else if self.width < width {
            let pad = width - self.width;
            self.spans.push(Span::blank(fill, pad));
            self.width = width;
            self.merge_adjacent();
        }
    }

    /// Coalesce adjacent spans with equal style and compatible content.
    pub fn merge_adjacent(&mut self) {
        if self.spans.len() < 2 {
            return;
        }
        let old = std::mem::take(&mut self.spans);
        let mut out: Vec<Span> = Vec::with_capacity(old.len());
        for sp in old {
            if sp.width == 0 {
                continue;
            }
            if let Some(prev) = out.last_mut()
                && prev.style == sp.style
            {
                match (&mut prev.content, &sp.content) {
                    (SpanContent::Repeat(a), SpanContent::Repeat(b)) if *a == *b => {
                        prev.width += sp.width;
                        continue;
                    }
                    (SpanContent::Text(a), SpanContent::Text(b)) => {
                        a.push_str(b);
                        prev.width += sp.width;
                        continue;
                    }
                    // Repeat and text runs stay separate: converting long
                    // blank fills into text would defeat the encoding.
                    _ => {}
                }
            }
            out.push(sp);
        }
        self.spans = out;
    }

    /// The cluster covering cell `x`: `(start_cell, cell_width)`.
    ///
    /// Cells of a repeat span are their own width-1 clusters.
    #[must_use]
    pub fn cluster_at(&self, x: usize, mode: TextMode) -> Option<(usize, usize)> {
        if x >= self.width {
            return None;
        }
        let mut pos = 0;
        for sp in &self.spans {
            let end = pos + sp.width;
            if x < end {
                match &sp.content {
                    SpanContent::Repeat(_) => return Some((x, 1)),
                    SpanContent::Text(t) => {
                        let mut cum = 0;
                        for (_, w) in grapheme::clusters(t, mode) {
                            if w == 0 {
                                continue;
                            }
                            let cstart = pos + cum;
                            let cend = cstart + w;
                            if cend > end {
                                break;
                            }
                            if x >= cstart && x < cend {
                                return Some((cstart, w));
                            }
                            cum += w;
                        }
                        // Width bookkeeping that doesn't line up cluster by
                        // cluster (merged cells) falls back to a unit cell.
                        return Some((x, 1));
                    }
                }
            }
            pos = end;
        }
        None
    }

    /// All wide clusters (display width > 1) whose cells intersect
    /// `[x, x + n)`, as `(start_cell, cell_width)` pairs.
    #[must_use]
    pub fn wide_clusters_in(&self, x: usize, n: usize, mode: TextMode) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        if n == 0 {
            return out;
        }
        let end = x + n;
        let mut pos = 0;
        for sp in &self.spans {
            let span_end = pos + sp.width;
            if span_end <= x {
                pos = span_end;
                continue;
            }
            if pos >= end {
                break;
            }
            if let SpanContent::Text(t) = &sp.content {
                let mut cum = 0;
                for (_, w) in grapheme::clusters(t, mode) {
                    if w == 0 {
                        continue;
                    }
                    let cstart = pos + cum;
                    let cend = cstart + w;
                    if cstart >= span_end || cstart >= end {
                        break;
                    }
                    if w > 1 && cend > x {
                        out.push((cstart, w.min(span_end - cstart)));
                    }
                    cum += w;
                }
            }
            pos = span_end;
        }
        out
    }

    /// Append `text` to the cluster covering cell `x` without changing any
    /// widths. Returns the `(start, width)` of the touched cluster.
    pub fn merge_text_at(
        &mut self,
        x: usize,
        text: &str,
        mode: TextMode,
    ) -> Option<(usize, usize)> {
        let (cstart, cwidth) = self.cluster_at(x, mode)?;
        let total = self.width;

        let old = std::mem::take(&mut self.spans);
        let (mut prefix, tail) = split_spans_at(old, cstart, mode);
        let (cluster, suffix) = split_spans_at(tail, cwidth, mode);

        // The isolated range is a single cluster, so it collapses into one
        // text span.
        let style = cluster
            .first()
            .map_or_else(Style::new, |sp| sp.style);
        let mut merged = String::new();
        for sp in &cluster {
            merged.push_str(&sp.to_text());
        }
        merged.push_str(text);
        prefix.push(Span::text(style, merged, cwidth));
        prefix.extend(suffix);
        self.spans = prefix;
        self.width = total;
        Some((cstart, cwidth))
    }

    /// A copy of the cells `[x, x + w)` as a standalone line.
    #[must_use]
    pub fn slice(&self, x: usize, w: usize, mode: TextMode) -> Line {
        let x = x.min(self.width);
        let w = w.min(self.width - x);
        let (_, tail) = split_spans_at(self.spans.clone(), x, mode);
        let (mid, _) = split_spans_at(tail, w, mode);
        let mut line = Line {
            spans: mid,
            width: w,
        };
        line.merge_adjacent();
        line
    }

    /// Render the row as ANSI: each span's full escape followed by its
    /// content. Feeding the output back through the parser reproduces the
    /// row exactly.
    #[must_use]
    pub fn render_ansi(&self) -> String {
        let mut out = String::new();
        for sp in &self.spans {
            if sp.width == 0 {
                continue;
            }
            // Escapes are pure ASCII; appending them as UTF-8 is lossless.
            out.push_str(&String::from_utf8_lossy(&sp.style.ansi_escape()));
            match &sp.content {
                SpanContent::Repeat(ch) => {
                    for _ in 0..sp.width {
                        out.push(*ch);
                    }
                }
                SpanContent::Text(t) => {
                    let _ = write!(out, "{t}");
                }
            }
        }
        out
    }
}

/// Split a span list at a cell boundary, returning the two halves.
///
/// Each half's total width equals the requested split exactly. A split that
/// would land inside a wide cluster blanks that cluster: the cells on each
/// side become blank fills in the cluster's style.
fn split_spans_at(spans: Vec<Span>, cell: usize, mode: TextMode) -> (Vec<Span>, Vec<Span>) {
    if cell == 0 {
        return (Vec::new(), spans);
    }
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut pos = 0;
    let mut iter = spans.into_iter();
    for sp in iter.by_ref() {
        let end = pos + sp.width;
        if end <= cell {
            pos = end;
            left.push(sp);
            if end == cell {
                break;
            }
            continue;
        }
        // Boundary span.
        split_span(sp, cell - pos, mode, &mut left, &mut right);
        break;
    }
    right.extend(iter);
    (left, right)
}

/// Split one span at `offset` cells, pushing the halves onto `left` and
/// `right`. Widths are preserved exactly; a mid-cluster split blanks the
/// cluster across both sides.
fn split_span(sp: Span, offset: usize, mode: TextMode, left: &mut Vec<Span>, right: &mut Vec<Span>) {
    if offset == 0 {
        right.push(sp);
        return;
    }
    if offset >= sp.width {
        left.push(sp);
        return;
    }
    match sp.content {
        SpanContent::Repeat(ch) => {
            left.push(Span::repeat(sp.style, ch, offset));
            right.push(Span::repeat(sp.style, ch, sp.width - offset));
        }
        SpanContent::Text(text) => {
            let mut cum = 0usize;
            for (range, w) in grapheme::clusters(&text, mode) {
                if w == 0 {
                    continue;
                }
                if cum == offset {
                    // Clean boundary.
                    let l = &text[..range.start];
                    let r = &text[range.start..];
                    if !l.is_empty() {
                        left.push(Span::text(sp.style, l, offset));
                    } else {
                        left.push(Span::blank(sp.style, offset));
                    }
                    right.push(Span::text(sp.style, r, sp.width - offset));
                    return;
                }
                if cum < offset && offset < cum + w {
                    // The split falls inside a wide cluster: blank it.
                    if range.start > 0 {
                        left.push(Span::text(sp.style, &text[..range.start], cum));
                    }
                    left.push(Span::blank(sp.style, offset - cum));
                    let after_width = sp.width.saturating_sub(cum + w);
                    right.push(Span::blank(sp.style, cum + w - offset));
                    if range.end < text.len() && after_width > 0 {
                        right.push(Span::text(sp.style, &text[range.end..], after_width));
                    } else if after_width > 0 {
                        right.push(Span::blank(sp.style, after_width));
                    }
                    return;
                }
                cum += w;
                if cum > sp.width {
                    break;
                }
            }
            // Cluster widths ran short of the span width (merged cells or
            // trailing bookkeeping): pad both sides with blanks.
            if cum <= offset {
                if cum > 0 {
                    left.push(Span::text(sp.style, text, cum));
                }
                if offset > cum {
                    left.push(Span::blank(sp.style, offset - cum));
                }
                right.push(Span::blank(sp.style, sp.width - offset));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Color, ColorComponent, Mode};

    fn styled(idx: u8) -> Style {
        let mut s = Style::new();
        s.set_color(ColorComponent::Fg, Color::Indexed(idx));
        s
    }

    #[test]
    fn blank_line_width() {
        let l = Line::blank(Style::new(), 10);
        assert_eq!(l.width(), 10);
        assert_eq!(l.plain_text(), " ".repeat(10));
    }

    #[test]
    fn find_span_at_boundaries() {
        let l = Line::from_spans(vec![
            Span::text(Style::new(), "ab", 2),
            Span::blank(Style::new(), 3),
        ]);
        assert_eq!(l.find_span_at(0), (0, 0));
        assert_eq!(l.find_span_at(1), (0, 1));
        assert_eq!(l.find_span_at(2), (1, 0));
        assert_eq!(l.find_span_at(4), (1, 2));
        assert_eq!(l.find_span_at(5), (2, 0));
    }

    #[test]
    fn replace_range_preserves_total_width() {
        let mut l = Line::blank(Style::new(), 10);
        l.replace_range(
            3,
            4,
            Some(Span::text(styled(1), "wxyz", 4)),
            TextMode::Rune,
        );
        assert_eq!(l.width(), 10);
        assert_eq!(l.plain_text(), "   wxyz   ");
    }

    #[test]
    fn replace_range_splits_styles() {
        let mut l = Line::from_spans(vec![Span::text(styled(1), "abcdef", 6)]);
        l.replace_range(2, 2, Some(Span::text(styled(2), "XY", 2)), TextMode::Rune);
        assert_eq!(l.width(), 6);
        assert_eq!(l.plain_text(), "abXYef");
        assert_eq!(l.spans().len(), 3);
        assert_eq!(l.spans()[0].style, styled(1));
        assert_eq!(l.spans()[1].style, styled(2));
    }

    #[test]
    fn pure_deletion_shrinks_width() {
        let mut l = Line::from_spans(vec![Span::text(Style::new(), "abcdef", 6)]);
        l.replace_range(1, 3, None, TextMode::Rune);
        assert_eq!(l.width(), 3);
        assert_eq!(l.plain_text(), "aef");
    }

    #[test]
    fn insert_span_shifts_tail() {
        let mut l = Line::from_spans(vec![Span::text(Style::new(), "abc", 3)]);
        l.insert_span(1, Span::blank(Style::new(), 2), TextMode::Rune);
        assert_eq!(l.width(), 5);
        assert_eq!(l.plain_text(), "a  bc");
    }

    #[test]
    fn truncate_to_width() {
        let mut l = Line::from_spans(vec![
            Span::text(Style::new(), "abc", 3),
            Span::blank(Style::new(), 5),
        ]);
        l.truncate(4, TextMode::Rune);
        assert_eq!(l.width(), 4);
        assert_eq!(l.plain_text(), "abc ");
    }

    #[test]
    fn truncate_through_wide_cluster_blanks_it() {
        let mut l = Line::from_spans(vec![
            Span::text(Style::new(), "🐹", 2),
            Span::blank(Style::new(), 2),
        ]);
        l.truncate(1, TextMode::Grapheme);
        assert_eq!(l.width(), 1);
        assert_eq!(l.plain_text(), " ", "half a wide char must not survive");
    }

    #[test]
    fn merge_adjacent_repeats_and_text() {
        let mut l = Line::from_spans(vec![
            Span::blank(Style::new(), 2),
            Span::blank(Style::new(), 3),
            Span::text(Style::new(), "a", 1),
            Span::text(Style::new(), "b", 1),
            Span::text(styled(1), "c", 1),
        ]);
        l.merge_adjacent();
        assert_eq!(l.spans().len(), 3);
        assert_eq!(l.spans()[0].width, 5);
        assert_eq!(l.spans()[1].to_text(), "ab");
        assert_eq!(l.width(), 8);
    }

    #[test]
    fn merge_keeps_repeat_and_text_separate() {
        let mut l = Line::from_spans(vec![
            Span::text(Style::new(), "ab", 2),
            Span::blank(Style::new(), 4),
        ]);
        l.merge_adjacent();
        assert_eq!(l.spans().len(), 2);
    }

    #[test]
    fn cluster_at_wide_char() {
        let l = Line::from_spans(vec![
            Span::text(Style::new(), "🐹", 2),
            Span::text(Style::new(), "c", 1),
        ]);
        assert_eq!(l.cluster_at(0, TextMode::Grapheme), Some((0, 2)));
        assert_eq!(l.cluster_at(1, TextMode::Grapheme), Some((0, 2)));
        assert_eq!(l.cluster_at(2, TextMode::Grapheme), Some((2, 1)));
        assert_eq!(l.cluster_at(3, TextMode::Grapheme), None);
    }

    #[test]
    fn wide_clusters_in_range() {
        let l = Line::from_spans(vec![
            Span::text(Style::new(), "🐹", 2),
            Span::text(Style::new(), "c", 1),
            Span::text(Style::new(), "中", 2),
            Span::blank(Style::new(), 3),
        ]);
        assert_eq!(l.wide_clusters_in(1, 1, TextMode::Grapheme), vec![(0, 2)]);
        assert_eq!(l.wide_clusters_in(2, 1, TextMode::Grapheme), vec![]);
        assert_eq!(
            l.wide_clusters_in(0, 5, TextMode::Grapheme),
            vec![(0, 2), (3, 2)]
        );
    }

    #[test]
    fn merge_text_at_appends_to_cluster() {
        let mut l = Line::from_spans(vec![
            Span::text(Style::new(), "🐹", 2),
            Span::text(Style::new(), "c", 1),
            Span::blank(Style::new(), 2),
        ]);
        let touched = l.merge_text_at(1, "y", TextMode::Grapheme);
        assert_eq!(touched, Some((0, 2)));
        assert_eq!(l.width(), 5);
        assert_eq!(l.plain_text(), "🐹yc  ");
    }

    #[test]
    fn merge_text_at_converts_repeat() {
        let mut l = Line::blank(Style::new(), 4);
        l.merge_text_at(1, "\u{0301}", TextMode::Grapheme);
        assert_eq!(l.width(), 4);
        assert_eq!(l.plain_text(), "  \u{0301}  ");
    }

    #[test]
    fn slice_clips_and_copies() {
        let l = Line::from_spans(vec![
            Span::text(styled(1), "abc", 3),
            Span::blank(styled(2), 5),
        ]);
        let s = l.slice(2, 3, TextMode::Rune);
        assert_eq!(s.width(), 3);
        assert_eq!(s.plain_text(), "c  ");
        assert_eq!(s.spans()[0].style, styled(1));
        assert_eq!(s.spans()[1].style, styled(2));
    }

    #[test]
    fn render_ansi_repeats_and_text() {
        let mut style = Style::new();
        style.set_mode(Mode::BOLD);
        let l = Line::from_spans(vec![
            Span::text(style, "hi", 2),
            Span::blank(Style::new(), 2),
        ]);
        let out = l.render_ansi();
        assert!(out.contains("\x1b[0m\x1b[1mhi"));
        assert!(out.ends_with("\x1b[0m  "));
    }
}
