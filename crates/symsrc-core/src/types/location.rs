//! Symbol location type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a symbol lives, as reported by a resolver.
///
/// At least one of `address` or (`source_file`, `line_number`) is present on
/// any location a resolver hands out; a symbol with neither is UNRESOLVED and
/// is represented by `None` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolLocation
{
    /// Symbol name that was looked up
    pub name: String,
    /// Address token as printed by the debugger (e.g. `0x7ffff7e5b010`)
    pub address: Option<String>,
    /// Source file path from debug information, unverified
    pub source_file: Option<String>,
    /// 1-based line number of the definition
    pub line_number: Option<u32>,
    /// Concatenated debugger replies the fields were parsed from
    pub raw_debugger_output: String,
}

impl SymbolLocation
{
    /// Whether both a source file and a line are known, i.e. extraction can run.
    #[must_use]
    pub fn has_source(&self) -> bool
    {
        self.source_file.is_some() && self.line_number.is_some()
    }

    /// 0-based line index for the extractor, if a line is known.
    ///
    /// A reported line of `0` is not a valid debugger line and yields `None`.
    #[must_use]
    pub fn line_index(&self) -> Option<usize>
    {
        self.line_number
            .and_then(|line| line.checked_sub(1))
            .and_then(|line| usize::try_from(line).ok())
    }

    /// Parse the address token as a number.
    #[must_use]
    pub fn address_value(&self) -> Option<u64>
    {
        let token = self.address.as_deref()?;
        let hex = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X"))?;
        u64::from_str_radix(hex, 16).ok()
    }

    /// Parsed fields only, ignoring the raw text.
    ///
    /// Two resolutions of the same symbol against an unchanged binary agree
    /// on this even when the debugger's incidental formatting differs.
    #[must_use]
    pub fn fields(&self) -> (&str, Option<&str>, Option<&str>, Option<u32>)
    {
        (
            &self.name,
            self.address.as_deref(),
            self.source_file.as_deref(),
            self.line_number,
        )
    }
}

impl fmt::Display for SymbolLocation
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.name)?;
        if let Some(address) = &self.address {
            write!(f, " @ {address}")?;
        }
        match (&self.source_file, self.line_number) {
            (Some(file), Some(line)) => write!(f, " ({file}:{line})"),
            (Some(file), None) => write!(f, " ({file})"),
            _ => Ok(()),
        }
    }
}
