//! # Symbol Resolution
//!
//! Turn a function name into a [`SymbolLocation`]: its address, defining file
//! and line. Two resolvers exist:
//!
//! - [`DebuggerResolver`] asks a live debugger, retrying once on a fresh
//!   session when the first attempt times out or finds nothing.
//! - [`RegexFallbackResolver`] indexes a source tree with a definition regex
//!   when no debugger is available.

pub mod fallback;

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

pub use fallback::{RegexFallbackResolver, ScanStats, SourceIndex};

use crate::error::LocatorResult;
use crate::session::{DebuggerSession, ReplyStatus, SessionFactory};
use crate::types::SymbolLocation;

/// Looks up where a function is defined.
pub trait SymbolResolver: Send
{
    /// Short label for logs.
    fn label(&self) -> &'static str;

    /// Resolve `symbol`.
    ///
    /// `Ok(None)` means the symbol is unknown or could not be resolved in time.
    ///
    /// ## Errors
    ///
    /// Returns an error only when the resolver cannot run at all, such as a
    /// debugger that fails to start.
    fn resolve(&mut self, symbol: &str) -> LocatorResult<Option<SymbolLocation>>;
}

/// Regexes that pull a location out of concatenated debugger replies.
#[derive(Debug, Clone)]
pub struct LocationPatterns
{
    address: Regex,
    line: Regex,
}

impl LocationPatterns
{
    /// ## Errors
    ///
    /// Returns `Regex` if a pattern fails to compile.
    pub fn new() -> LocatorResult<Self>
    {
        Ok(Self {
            address: Regex::new(r"\bis (?:a (?:function|variable) )?at (?:address )?(0x[0-9a-fA-F]+)")?,
            line: Regex::new(r#"Line (\d+) of "([^"]+)""#)?,
        })
    }

    /// Extract a location from `raw`.
    ///
    /// Returns `None` unless at least one of address or line matched. The
    /// first match of each wins.
    #[must_use]
    pub fn parse(&self, symbol: &str, raw: &str) -> Option<SymbolLocation>
    {
        let address = self
            .address
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());

        let (source_file, line_number) = self
            .line
            .captures(raw)
            .and_then(|caps| {
                let line = caps.get(1)?.as_str().parse::<u32>().ok()?;
                let file = caps.get(2)?.as_str().to_string();
                Some((Some(file), Some(line)))
            })
            .unwrap_or((None, None));

        if address.is_none() && line_number.is_none() {
            return None;
        }

        Some(SymbolLocation {
            name: symbol.to_string(),
            address,
            source_file,
            line_number,
            raw_debugger_output: raw.to_string(),
        })
    }
}

/// Outcome of one query round against one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome
{
    /// Address or line found
    Resolved(SymbolLocation),
    /// Every reply arrived but none matched
    NoMatch
    {
        raw: String
    },
    /// A reply stopped short of the prompt
    Interrupted
    {
        command: String,
        status: ReplyStatus,
        raw: String,
    },
}

impl QueryOutcome
{
    fn reason(&self) -> &'static str
    {
        match self {
            Self::Resolved(_) => "resolved",
            Self::NoMatch { .. } => "no match",
            Self::Interrupted {
                status: ReplyStatus::TimedOut,
                ..
            } => "timed out",
            Self::Interrupted { .. } => "session closed",
        }
    }
}

/// Send the location queries for `symbol` and parse the combined replies.
///
/// Stops at the first reply that does not reach the prompt.
pub fn query_location(
    session: &mut dyn DebuggerSession,
    patterns: &LocationPatterns,
    symbol: &str,
    timeout: Duration,
) -> QueryOutcome
{
    let queries = session.commands().location_queries(symbol);
    let mut raw = String::new();

    for command in queries {
        let reply = session.send(&command, timeout);
        if !raw.is_empty() && !reply.text.is_empty() {
            raw.push('\n');
        }
        raw.push_str(&reply.text);

        if !reply.is_complete() {
            return QueryOutcome::Interrupted {
                command,
                status: reply.status,
                raw,
            };
        }
    }

    match patterns.parse(symbol, &raw) {
        Some(location) => QueryOutcome::Resolved(location),
        None => QueryOutcome::NoMatch { raw },
    }
}

/// Resolver backed by a debugger session.
///
/// The session is started on first use and kept for later lookups. A failed
/// attempt closes it and retries exactly once on a fresh one, so one wedged
/// command cannot poison the rest of a run.
pub struct DebuggerResolver
{
    factory: Arc<dyn SessionFactory>,
    session: Option<Box<dyn DebuggerSession>>,
    patterns: LocationPatterns,
    timeout: Duration,
}

impl DebuggerResolver
{
    /// ## Errors
    ///
    /// Returns `Regex` if the location patterns fail to compile.
    pub fn new(factory: Arc<dyn SessionFactory>, timeout: Duration) -> LocatorResult<Self>
    {
        Ok(Self {
            factory,
            session: None,
            patterns: LocationPatterns::new()?,
            timeout,
        })
    }

    /// Reuse a session that is already running.
    ///
    /// ## Errors
    ///
    /// Returns `Regex` if the location patterns fail to compile.
    pub fn with_session(
        factory: Arc<dyn SessionFactory>,
        session: Box<dyn DebuggerSession>,
        timeout: Duration,
    ) -> LocatorResult<Self>
    {
        let mut resolver = Self::new(factory, timeout)?;
        resolver.session = Some(session);
        Ok(resolver)
    }

    /// Whether a live session is currently held.
    #[must_use]
    pub fn has_session(&self) -> bool
    {
        self.session.as_ref().is_some_and(|session| !session.is_closed())
    }

    fn attempt(&mut self, symbol: &str) -> LocatorResult<QueryOutcome>
    {
        let session = live_session(&mut self.session, self.factory.as_ref())?;
        Ok(query_location(session, &self.patterns, symbol, self.timeout))
    }

    fn discard_session(&mut self)
    {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
    }
}

impl SymbolResolver for DebuggerResolver
{
    fn label(&self) -> &'static str
    {
        "debugger"
    }

    fn resolve(&mut self, symbol: &str) -> LocatorResult<Option<SymbolLocation>>
    {
        match self.attempt(symbol)? {
            QueryOutcome::Resolved(location) => {
                debug!(symbol, location = %location, "resolved");
                return Ok(Some(location));
            }
            miss => debug!(symbol, reason = miss.reason(), "retrying on a fresh debugger session"),
        }
        self.discard_session();

        match self.attempt(symbol)? {
            QueryOutcome::Resolved(location) => {
                debug!(symbol, location = %location, "resolved on retry");
                Ok(Some(location))
            }
            outcome => {
                if matches!(outcome, QueryOutcome::Interrupted { .. }) {
                    self.discard_session();
                }
                warn!(symbol, reason = outcome.reason(), "symbol unresolved");
                Ok(None)
            }
        }
    }
}

impl Drop for DebuggerResolver
{
    fn drop(&mut self)
    {
        self.discard_session();
    }
}

fn live_session<'a>(
    slot: &'a mut Option<Box<dyn DebuggerSession>>,
    factory: &dyn SessionFactory,
) -> LocatorResult<&'a mut dyn DebuggerSession>
{
    if slot.as_ref().is_some_and(|session| session.is_closed()) {
        *slot = None;
    }
    let session = match slot.take() {
        Some(session) => session,
        None => factory.start()?,
    };
    Ok(&mut **slot.insert(session))
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_parse_full_reply()
    {
        let patterns = LocationPatterns::new().unwrap();
        let raw = "Symbol \"add\" is a function at address 0x1139.\n\
                   Line 3 of \"add.c\" starts at address 0x1139 <add> and ends at 0x1141 <add+8>.\n\
                   add in section .text";
        let location = patterns.parse("add", raw).unwrap();
        assert_eq!(location.address.as_deref(), Some("0x1139"));
        assert_eq!(location.source_file.as_deref(), Some("add.c"));
        assert_eq!(location.line_number, Some(3));
        assert_eq!(location.raw_debugger_output, raw);
    }

    #[test]
    fn test_parse_plain_is_at()
    {
        let patterns = LocationPatterns::new().unwrap();
        let location = patterns.parse("errno", "Symbol \"errno\" is at 0x4010 in a file compiled without debugging.").unwrap();
        assert_eq!(location.address.as_deref(), Some("0x4010"));
        assert!(location.source_file.is_none());
        assert!(!location.has_source());
    }

    #[test]
    fn test_parse_line_without_address()
    {
        let patterns = LocationPatterns::new().unwrap();
        let location = patterns
            .parse("memset", "Line 12 of \"src/string/memset.c\" is at address 0x2000 but contains no code.")
            .unwrap();
        assert_eq!(location.line_number, Some(12));
        assert_eq!(location.source_file.as_deref(), Some("src/string/memset.c"));
    }

    #[test]
    fn test_parse_unknown_symbol()
    {
        let patterns = LocationPatterns::new().unwrap();
        assert!(patterns
            .parse("nope", "No symbol \"nope\" in current context.\nFunction \"nope\" not defined.")
            .is_none());
    }

    #[test]
    fn test_starts_at_is_not_an_address()
    {
        let patterns = LocationPatterns::new().unwrap();
        let location = patterns
            .parse("f", "Line 7 of \"f.c\" starts at address 0x10 <f> and ends at 0x20.")
            .unwrap();
        assert!(location.address.is_none());
        assert_eq!(location.line_number, Some(7));
    }
}
