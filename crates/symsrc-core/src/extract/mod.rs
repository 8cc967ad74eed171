//! # Span Extraction
//!
//! Given the full text of a source file and the 0-based line a resolver
//! reported for a function, return the exact text of that function's
//! definition.
//!
//! Two interchangeable implementations of [`SpanExtractor`] exist:
//!
//! - [`LexicalExtractor`]: backtracks to the true start of a multi-line
//!   declaration, then runs the character-level [`scanner`] to find the
//!   matching closing brace. Braces inside literals and comments are ignored.
//! - [`LineCountExtractor`]: the regex backend's whole-line brace counter.
//!   No lexical awareness, no backtracking; kept for parity with setups that
//!   have no debugger.
//!
//! Both are pure functions of `(source, start_line)` and hold no state, so a
//! single instance can be shared by any number of threads.

pub mod line_count;
pub mod scanner;

use tracing::{debug, warn};

pub use line_count::LineCountExtractor;
pub use scanner::{code_text, scan_braces, BraceScan, LexState, ScanEnd};

use crate::types::ExtractionResult;

/// Byte range of one function definition inside a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span
{
    /// Byte offset of the first character of the declaration
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
    /// 0-based line of `start`
    pub start_line: usize,
    /// 0-based line of the last character
    pub end_line: usize,
    /// `false` when braces never balanced before end of input
    pub complete: bool,
}

impl Span
{
    /// The spanned text, an unmodified slice of `source`.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str
    {
        &source[self.start..self.end]
    }
}

/// Turns `(source, start_line)` into the span of the enclosing definition.
pub trait SpanExtractor: Send + Sync
{
    /// Short label for logs.
    fn label(&self) -> &'static str;

    /// Find the definition containing `start_line` (0-based).
    ///
    /// Returns `None` when `start_line` is past the end of `source` or no
    /// body is ever opened.
    fn find_span(&self, source: &str, start_line: usize) -> Option<Span>;

    /// Find the span and package it as an [`ExtractionResult`].
    ///
    /// Result line numbers are 1-based.
    fn extract(&self, symbol: &str, source_file: &str, source: &str, start_line: usize) -> Option<ExtractionResult>
    {
        let Some(span) = self.find_span(source, start_line) else {
            debug!(symbol, source_file, start_line, extractor = self.label(), "no definition found");
            return None;
        };

        if !span.complete {
            warn!(
                symbol,
                source_file,
                extractor = self.label(),
                "unmatched braces, returning partial definition"
            );
        }

        let result = ExtractionResult {
            name: symbol.to_string(),
            source_file: source_file.to_string(),
            start_line: to_line_number(span.start_line),
            end_line: to_line_number(span.end_line),
            text: span.text(source).to_string(),
            complete: span.complete,
        };
        debug!(
            symbol,
            chars = result.text.len(),
            start_line = result.start_line,
            end_line = result.end_line,
            "extracted definition"
        );
        Some(result)
    }
}

fn to_line_number(index: usize) -> u32
{
    u32::try_from(index.saturating_add(1)).unwrap_or(u32::MAX)
}

/// Line index over a source text, splitting on `\n` only.
///
/// A text ending in `\n` has a final empty line, so `"a\n"` has two lines.
#[derive(Debug, Clone)]
pub struct LineTable<'a>
{
    source: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineTable<'a>
{
    #[must_use]
    pub fn new(source: &'a str) -> Self
    {
        let mut starts = vec![0];
        starts.extend(source.bytes().enumerate().filter(|&(_, b)| b == b'\n').map(|(i, _)| i + 1));
        Self { source, starts }
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.starts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.source.is_empty()
    }

    /// Byte offset where line `index` starts.
    #[must_use]
    pub fn start_of(&self, index: usize) -> usize
    {
        self.starts[index]
    }

    /// Byte offset one past the last character of line `index`, excluding its `\n`.
    #[must_use]
    pub fn end_of(&self, index: usize) -> usize
    {
        self.starts
            .get(index + 1)
            .map_or(self.source.len(), |next| next - 1)
    }

    /// Line `index` without its terminator.
    #[must_use]
    pub fn line(&self, index: usize) -> &'a str
    {
        &self.source[self.start_of(index)..self.end_of(index)]
    }

    /// Line index containing byte `offset`.
    #[must_use]
    pub fn line_of(&self, offset: usize) -> usize
    {
        match self.starts.binary_search(&offset) {
            Ok(index) => index,
            Err(insert) => insert - 1,
        }
    }
}

/// Backtracking character-scanner extractor.
///
/// ## Algorithm
///
/// 1. Walk upward from `start_line` while the preceding line is non-empty,
///    does not end a statement or block (`;` / `}`), does not open a block
///    (`{`), and is not a comment or preprocessor line. Trailing comments are
///    ignored for these checks, so `} // end a` still ends a block. The first
///    line that fails is excluded; this captures return types, attributes and
///    parameter lists split over several lines.
/// 2. Scan forward from the declaration start with [`scan_braces`]. The span
///    ends at the `}` that brings the depth back to zero; if the input ends
///    first, the rest of the input is returned flagged incomplete.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalExtractor;

impl LexicalExtractor
{
    #[must_use]
    pub fn new() -> Self
    {
        Self
    }

    /// 0-based line where the declaration containing `start_line` begins.
    #[must_use]
    pub fn declaration_start(lines: &LineTable<'_>, start_line: usize) -> usize
    {
        let mut start = start_line;
        while start > 0 && continues_declaration(lines.line(start - 1).trim()) {
            start -= 1;
        }
        start
    }
}

fn continues_declaration(line: &str) -> bool
{
    if line.is_empty() || line.starts_with('#') {
        return false;
    }
    let code = code_text(line);
    let code = code.trim();
    !is_comment_line(line, code) && !code.ends_with(';') && !code.ends_with('}') && !code.contains('{')
}

/// A line holding no code, or the continuation or end of a block comment.
fn is_comment_line(line: &str, code: &str) -> bool
{
    code.is_empty() || line.starts_with('*') || (line.ends_with("*/") && !line.contains("/*"))
}

impl SpanExtractor for LexicalExtractor
{
    fn label(&self) -> &'static str
    {
        "lexical"
    }

    fn find_span(&self, source: &str, start_line: usize) -> Option<Span>
    {
        let lines = LineTable::new(source);
        if start_line >= lines.len() {
            return None;
        }

        let decl_line = Self::declaration_start(&lines, start_line);
        let start = lines.start_of(decl_line);

        let (end, complete) = match scan_braces(&source[start..]).end {
            ScanEnd::Balanced { end } => (start + end, true),
            ScanEnd::Unterminated => (source.len(), false),
            ScanEnd::NoBody => return None,
        };

        let last = if end > start && source.as_bytes()[end - 1] == b'\n' { end - 1 } else { end };
        let end_line = lines.line_of(last.saturating_sub(1).max(start));

        Some(Span {
            start,
            end,
            start_line: decl_line,
            end_line,
            complete,
        })
    }
}
