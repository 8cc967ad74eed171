//! Extraction result type.

use serde::{Deserialize, Serialize};

use crate::extract::scanner::declaration_text;

/// The exact source text of one function definition.
///
/// `text` is an unmodified contiguous slice of the source file: no
/// re-indentation, no comment stripping. When `complete` is `false` the
/// braces never balanced and `text` runs to the end of the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult
{
    pub name: String,
    pub source_file: String,
    /// 1-based first line of the declaration
    pub start_line: u32,
    /// 1-based line holding the closing brace (or the last line, if partial)
    pub end_line: u32,
    pub text: String,
    pub complete: bool,
}

impl ExtractionResult
{
    /// Declaration up to the body's opening brace, comments removed and
    /// whitespace collapsed, e.g. `void *malloc(size_t n)`.
    ///
    /// Falls back to `unknown <name>(...)` when no body brace is present.
    #[must_use]
    pub fn signature(&self) -> String
    {
        declaration_text(&self.text).unwrap_or_else(|| format!("unknown {}(...)", self.name))
    }

    /// `file:start-end`, the form used in reports.
    #[must_use]
    pub fn source_location(&self) -> String
    {
        format!("{}:{}-{}", self.source_file, self.start_line, self.end_line)
    }

    /// Number of lines covered.
    #[must_use]
    pub fn line_count(&self) -> u32
    {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn result(text: &str, complete: bool) -> ExtractionResult
    {
        ExtractionResult {
            name: "add".to_string(),
            source_file: "src/add.c".to_string(),
            start_line: 10,
            end_line: 13,
            text: text.to_string(),
            complete,
        }
    }

    #[test]
    fn test_signature()
    {
        let r = result("int add(int a,\n  int b) {\n  return a + b;\n}", true);
        assert_eq!(r.signature(), "int add(int a, int b)");
        assert_eq!(r.source_location(), "src/add.c:10-13");
        assert_eq!(r.line_count(), 4);
    }

    #[test]
    fn test_signature_without_body()
    {
        assert_eq!(result("int add(int, int);", false).signature(), "unknown add(...)");
    }

    #[test]
    fn test_serializes_for_downstream_sink()
    {
        let json = serde_json::to_value(result("int add(void) { }", true)).unwrap();
        assert_eq!(json["name"], "add");
        assert_eq!(json["complete"], true);
        assert_eq!(json["start_line"], 10);
    }
}
