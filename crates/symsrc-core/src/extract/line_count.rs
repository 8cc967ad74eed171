//! Whole-line brace counting, used by the regex fallback backend.

use super::{LineTable, Span, SpanExtractor};

/// Counts `{` and `}` per line starting at the reported line.
///
/// The definition ends on the first line where the running count drops back
/// to zero after at least one `{` was seen. Braces in strings and comments
/// are counted too, and the declaration is assumed to start on the reported
/// line, so this is strictly less reliable than
/// [`LexicalExtractor`](super::LexicalExtractor).
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCountExtractor;

impl LineCountExtractor
{
    #[must_use]
    pub fn new() -> Self
    {
        Self
    }
}

impl SpanExtractor for LineCountExtractor
{
    fn label(&self) -> &'static str
    {
        "line-count"
    }

    fn find_span(&self, source: &str, start_line: usize) -> Option<Span>
    {
        let lines = LineTable::new(source);
        if start_line >= lines.len() {
            return None;
        }

        let mut count: i64 = 0;
        let mut seen_open = false;
        for index in start_line..lines.len() {
            let line = lines.line(index);
            let opens = line.bytes().filter(|&b| b == b'{').count();
            let closes = line.bytes().filter(|&b| b == b'}').count();
            count += i64::try_from(opens).unwrap_or(i64::MAX) - i64::try_from(closes).unwrap_or(i64::MAX);
            seen_open |= opens > 0;

            if seen_open && count <= 0 {
                return Some(Span {
                    start: lines.start_of(start_line),
                    end: lines.end_of(index),
                    start_line,
                    end_line: index,
                    complete: true,
                });
            }
        }

        seen_open.then(|| {
            let last = lines.len() - 1;
            let end_line = if lines.line(last).is_empty() && last > start_line { last - 1 } else { last };
            Span {
                start: lines.start_of(start_line),
                end: source.len(),
                start_line,
                end_line,
                complete: false,
            }
        })
    }
}
