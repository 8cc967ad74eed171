//! Character-level lexical scanner for C-like source.
//!
//! The scanner walks a byte slice once, left to right, tracking which lexical
//! context every byte belongs to. Only braces seen in plain code move the
//! brace depth; braces inside string literals, character literals and
//! comments are ignored.
//!
//! ## States
//!
//! | State            | Entered on          | Left on                      |
//! |------------------|---------------------|------------------------------|
//! | `Normal`         | start               | `"`, `'`, `//`, `/*`         |
//! | `InString`       | unescaped `"`       | unescaped `"`                |
//! | `InChar`         | unescaped `'`       | unescaped `'`                |
//! | `InLineComment`  | `//`                | end of line                  |
//! | `InBlockComment` | `/*`                | `*/`                         |
//!
//! A quote is escaped when it is preceded by an odd number of consecutive
//! backslashes. All delimiters are ASCII, so scanning bytes is safe for UTF-8
//! input: every offset the scanner reports sits on a character boundary.

/// Lexical context of the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexState
{
    /// Plain code
    Normal,
    /// Inside a `"..."` literal
    InString,
    /// Inside a `'...'` literal
    InChar,
    /// Inside a `// ...` comment
    InLineComment,
    /// Inside a `/* ... */` comment
    InBlockComment,
}

/// What a token of input is, lexically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass
{
    /// Plain code (including whitespace and the newline ending a line comment)
    Code,
    /// Part of a string or character literal, delimiters included
    Literal,
    /// Part of a comment, delimiters included
    Comment,
}

/// One or two bytes of input with their lexical class.
///
/// Two-byte tokens are the comment delimiters `//`, `/*` and `*/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token
{
    pub offset: usize,
    pub len: usize,
    pub byte: u8,
    pub class: TokenClass,
}

/// Single-pass lexer yielding classified tokens.
#[derive(Debug, Clone)]
pub struct Lexer<'a>
{
    bytes: &'a [u8],
    pos: usize,
    state: LexState,
    backslashes: usize,
}

impl<'a> Lexer<'a>
{
    #[must_use]
    pub fn new(text: &'a str) -> Self
    {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
            state: LexState::Normal,
            backslashes: 0,
        }
    }

    /// Current lexical state (the state the next byte will be read in).
    #[must_use]
    pub fn state(&self) -> LexState
    {
        self.state
    }
}

impl Iterator for Lexer<'_>
{
    type Item = Token;

    fn next(&mut self) -> Option<Token>
    {
        let offset = self.pos;
        let byte = *self.bytes.get(offset)?;
        let next = self.bytes.get(offset + 1).copied();
        let escaped = self.backslashes % 2 == 1;

        let (class, len) = match self.state {
            LexState::Normal => match (byte, next) {
                (b'"', _) if !escaped => {
                    self.state = LexState::InString;
                    (TokenClass::Literal, 1)
                }
                (b'\'', _) if !escaped => {
                    self.state = LexState::InChar;
                    (TokenClass::Literal, 1)
                }
                (b'/', Some(b'/')) => {
                    self.state = LexState::InLineComment;
                    (TokenClass::Comment, 2)
                }
                (b'/', Some(b'*')) => {
                    self.state = LexState::InBlockComment;
                    (TokenClass::Comment, 2)
                }
                _ => (TokenClass::Code, 1),
            },
            LexState::InString => {
                if byte == b'"' && !escaped {
                    self.state = LexState::Normal;
                }
                (TokenClass::Literal, 1)
            }
            LexState::InChar => {
                if byte == b'\'' && !escaped {
                    self.state = LexState::Normal;
                }
                (TokenClass::Literal, 1)
            }
            LexState::InLineComment => {
                if byte == b'\n' {
                    self.state = LexState::Normal;
                    (TokenClass::Code, 1)
                } else {
                    (TokenClass::Comment, 1)
                }
            }
            LexState::InBlockComment => {
                if byte == b'*' && next == Some(b'/') {
                    self.state = LexState::Normal;
                    (TokenClass::Comment, 2)
                } else {
                    (TokenClass::Comment, 1)
                }
            }
        };

        self.backslashes = if byte == b'\\' && len == 1 { self.backslashes + 1 } else { 0 };
        self.pos += len;

        Some(Token {
            offset,
            len,
            byte,
            class,
        })
    }
}

/// How a brace scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEnd
{
    /// Depth went from above zero back to zero; `end` is one past the closing `}`.
    Balanced
    {
        end: usize
    },
    /// Input ended with at least one block still open.
    Unterminated,
    /// Input ended without any block ever being open.
    NoBody,
}

/// Result of [`scan_braces`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BraceScan
{
    pub end: ScanEnd,
    /// Offset of the first `{` seen in plain code.
    pub body_open: Option<usize>,
}

/// Scan `text` from its start until the first block opened in plain code closes.
///
/// Single linear pass, no backtracking. The depth counter is signed: a stray
/// `}` before any `{` takes it below zero and never counts as a close.
#[must_use]
pub fn scan_braces(text: &str) -> BraceScan
{
    let mut depth: i64 = 0;
    let mut body_open = None;

    for token in Lexer::new(text) {
        if token.class != TokenClass::Code {
            continue;
        }
        match token.byte {
            b'{' => {
                body_open.get_or_insert(token.offset);
                depth += 1;
            }
            b'}' => {
                let was_open = depth > 0;
                depth -= 1;
                if was_open && depth == 0 {
                    return BraceScan {
                        end: ScanEnd::Balanced { end: token.offset + 1 },
                        body_open,
                    };
                }
            }
            _ => {}
        }
    }

    BraceScan {
        end: if depth > 0 { ScanEnd::Unterminated } else { ScanEnd::NoBody },
        body_open,
    }
}

/// `line` with comments and literals blanked out, leaving only plain code.
///
/// Each comment or literal token becomes a single space. The line is lexed on
/// its own, so a block comment opened on an earlier line is not seen.
#[must_use]
pub fn code_text(line: &str) -> String
{
    let mut kept = Vec::with_capacity(line.len());
    for token in Lexer::new(line) {
        match token.class {
            TokenClass::Code => kept.extend_from_slice(&line.as_bytes()[token.offset..token.offset + token.len]),
            TokenClass::Literal | TokenClass::Comment => kept.push(b' '),
        }
    }
    String::from_utf8_lossy(&kept).into_owned()
}

/// Declaration text before the first code-level `{`, comments dropped and
/// whitespace collapsed to single spaces.
///
/// Returns `None` when `text` has no code-level `{` or nothing precedes it.
#[must_use]
pub fn declaration_text(text: &str) -> Option<String>
{
    let mut kept = Vec::with_capacity(text.len().min(256));
    let mut found_body = false;

    for token in Lexer::new(text) {
        match token.class {
            TokenClass::Code if token.byte == b'{' => {
                found_body = true;
                break;
            }
            TokenClass::Code | TokenClass::Literal => {
                kept.extend_from_slice(&text.as_bytes()[token.offset..token.offset + token.len]);
            }
            TokenClass::Comment => kept.push(b' '),
        }
    }

    if !found_body {
        return None;
    }

    let kept = String::from_utf8_lossy(&kept);
    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}
