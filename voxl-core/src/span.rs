//! Byte spans over a source buffer.

use core::fmt;

/// Half-open byte range `[start, end)` into a [`crate::source::SourceText`].
///
/// Spans compare by value. Overlap is strict: two spans that merely touch
/// (`[0, 5)` and `[5, 10)`) do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    pub fn new(start: usize, length: usize) -> TextSpan {
        TextSpan {
            start,
            end: start + length,
        }
    }

    /// Build a span from absolute bounds. `start <= end` is a caller
    /// obligation; violating it is a compiler bug, not user input.
    pub fn from_bounds(start: usize, end: usize) -> TextSpan {
        assert!(start <= end, "span bounds out of order: {start}..{end}");
        TextSpan { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, position: usize) -> bool {
        self.start <= position && position < self.end
    }

    pub fn overlaps_with(&self, other: TextSpan) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Smallest span covering both inputs.
    pub fn union(a: TextSpan, b: TextSpan) -> TextSpan {
        TextSpan {
            start: a.start.min(b.start),
            end: a.end.max(b.end),
        }
    }
}

impl fmt::Display for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_spans_do_not_overlap() {
        let a = TextSpan::from_bounds(0, 5);
        let b = TextSpan::from_bounds(5, 10);
        assert!(!a.overlaps_with(b));
        assert!(!b.overlaps_with(a));
    }

    #[test]
    fn intersecting_spans_overlap() {
        let a = TextSpan::from_bounds(0, 5);
        let b = TextSpan::from_bounds(4, 10);
        assert!(a.overlaps_with(b));
        assert!(b.overlaps_with(a));
    }

    #[test]
    fn empty_span_overlaps_nothing() {
        let empty = TextSpan::from_bounds(3, 3);
        let wide = TextSpan::from_bounds(0, 10);
        assert!(!empty.overlaps_with(wide));
    }

    #[test]
    fn union_covers_both() {
        let merged = TextSpan::union(TextSpan::from_bounds(2, 4), TextSpan::from_bounds(8, 9));
        assert_eq!(merged, TextSpan::from_bounds(2, 9));
    }

    #[test]
    #[should_panic(expected = "span bounds out of order")]
    fn rejects_inverted_bounds() {
        let _ = TextSpan::from_bounds(5, 2);
    }
}
