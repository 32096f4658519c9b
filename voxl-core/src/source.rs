//! Immutable source buffer with line indexing.
//!
//! `SourceText` is built once per compilation and shared via `Rc`; every
//! later phase addresses positions through it instead of re-scanning the
//! raw string for line breaks.

use core::fmt;
use std::rc::Rc;

use crate::span::TextSpan;

/// Immutable source string plus a sorted list of line-start offsets.
///
/// Lines cover `[0, len]` contiguously, so any position in range maps to
/// exactly one line.
#[derive(Debug, PartialEq, Eq)]
pub struct SourceText {
    text: String,
    line_starts: Vec<usize>,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Rc<SourceText> {
        let text = text.into();
        let line_starts = compute_line_starts(&text);
        Rc::new(SourceText { text, line_starts })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Zero-based line containing `position`, by binary search over the
    /// line-start table.
    pub fn line_index(&self, position: usize) -> usize {
        match self.line_starts.binary_search(&position) {
            Ok(line) => line,
            Err(insert_at) => insert_at - 1,
        }
    }

    /// Byte offset at which `line` starts.
    pub fn line_start(&self, line: usize) -> usize {
        self.line_starts[line]
    }

    /// The text covered by `span`.
    pub fn slice(&self, span: TextSpan) -> &str {
        &self.text[span.start..span.end]
    }
}

fn compute_line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                starts.push(i + 1);
            }
            b'\n' => starts.push(i + 1),
            _ => {}
        }
        i += 1;
    }
    starts
}

/// A span plus the source it points into; derives line/column pairs on
/// demand rather than caching them at creation.
#[derive(Clone)]
pub struct TextLocation {
    source: Rc<SourceText>,
    pub span: TextSpan,
}

impl TextLocation {
    pub fn new(source: Rc<SourceText>, span: TextSpan) -> TextLocation {
        TextLocation { source, span }
    }

    pub fn source(&self) -> &Rc<SourceText> {
        &self.source
    }

    /// Zero-based line of the span start.
    pub fn start_line(&self) -> usize {
        self.source.line_index(self.span.start)
    }

    /// Zero-based column of the span start within its line.
    pub fn start_character(&self) -> usize {
        self.span.start - self.source.line_start(self.start_line())
    }

    pub fn end_line(&self) -> usize {
        self.source.line_index(self.span.end)
    }

    pub fn end_character(&self) -> usize {
        self.span.end - self.source.line_start(self.end_line())
    }

    pub fn text(&self) -> &str {
        self.source.slice(self.span)
    }

    /// Same source, different span.
    pub fn with_span(&self, span: TextSpan) -> TextLocation {
        TextLocation {
            source: Rc::clone(&self.source),
            span,
        }
    }
}

impl fmt::Debug for TextLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} ({})",
            self.start_line() + 1,
            self.start_character() + 1,
            self.span
        )
    }
}

impl fmt::Display for TextLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line() + 1, self.start_character() + 1)
    }
}

impl PartialEq for TextLocation {
    fn eq(&self, other: &TextLocation) -> bool {
        Rc::ptr_eq(&self.source, &other.source) && self.span == other.span
    }
}

impl Eq for TextLocation {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_positions_to_lines() {
        let source = SourceText::new("ab\ncd\r\nef");
        assert_eq!(source.line_count(), 3);
        assert_eq!(source.line_index(0), 0);
        assert_eq!(source.line_index(2), 0); // the '\n' itself
        assert_eq!(source.line_index(3), 1);
        assert_eq!(source.line_index(7), 2);
        assert_eq!(source.line_index(source.len()), 2);
    }

    #[test]
    fn empty_source_has_one_line() {
        let source = SourceText::new("");
        assert_eq!(source.line_count(), 1);
        assert_eq!(source.line_index(0), 0);
    }

    #[test]
    fn location_derives_line_and_column() {
        let source = SourceText::new("one\ntwo line\nthree");
        let loc = TextLocation::new(Rc::clone(&source), TextSpan::from_bounds(8, 12));
        assert_eq!(loc.start_line(), 1);
        assert_eq!(loc.start_character(), 4);
        assert_eq!(loc.text(), "line");
        assert_eq!(loc.to_string(), "2:5");
    }

    #[test]
    fn trailing_newline_opens_a_final_line() {
        let source = SourceText::new("x\n");
        assert_eq!(source.line_count(), 2);
        assert_eq!(source.line_index(2), 1);
    }
}
