//! Debugger vocabulary.
//!
//! The three location queries are templates with a `{symbol}` placeholder, and
//! the search-path command has a `{path}` placeholder, so a debugger with
//! different spelling can be configured without code changes.

use serde::{Deserialize, Serialize};

use crate::error::{LocatorError, LocatorResult};

const SYMBOL_PLACEHOLDER: &str = "{symbol}";
const PATH_PLACEHOLDER: &str = "{path}";

/// Commands and prompt for one debugger dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSet
{
    /// Query whose reply names the symbol's address (`... is at 0x...`)
    pub address_of: String,
    /// Query whose reply names the defining line (`Line N of "file"`)
    pub line_of: String,
    /// Query describing the symbol's section; logged, not parsed
    pub symbol_info: String,
    /// Text that starts the debugger's prompt line
    pub prompt: String,
    /// Sent once after the process starts
    pub init: Vec<String>,
    /// Registers one library search path (`{path}`)
    pub add_search_path: String,
    /// Sent by `close` before any signal
    pub quit: String,
}

impl Default for CommandSet
{
    fn default() -> Self
    {
        Self::gdb()
    }
}

impl CommandSet
{
    /// GDB's spelling, also understood by vendor builds such as `ntox86_64-gdb`.
    #[must_use]
    pub fn gdb() -> Self
    {
        Self {
            address_of: "info address {symbol}".to_string(),
            line_of: "info line {symbol}".to_string(),
            symbol_info: "info symbol {symbol}".to_string(),
            prompt: "(gdb)".to_string(),
            init: vec![
                "set confirm off".to_string(),
                "set pagination off".to_string(),
                "set width 0".to_string(),
            ],
            add_search_path: "set solib-search-path {path}".to_string(),
            quit: "quit".to_string(),
        }
    }

    /// The three lookup commands for `symbol`, in the order they are sent.
    #[must_use]
    pub fn location_queries(&self, symbol: &str) -> [String; 3]
    {
        [
            self.address_of.replace(SYMBOL_PLACEHOLDER, symbol),
            self.line_of.replace(SYMBOL_PLACEHOLDER, symbol),
            self.symbol_info.replace(SYMBOL_PLACEHOLDER, symbol),
        ]
    }

    /// Command that adds one shared-library search path.
    #[must_use]
    pub fn search_path(&self, path: &str) -> String
    {
        self.add_search_path.replace(PATH_PLACEHOLDER, path)
    }

    /// ## Errors
    ///
    /// Returns `InvalidConfig` for an empty prompt, a query template without
    /// the `{symbol}` placeholder, or a search-path template without `{path}`.
    pub fn validate(&self) -> LocatorResult<()>
    {
        if self.prompt.trim().is_empty() {
            return Err(LocatorError::InvalidConfig("debugger prompt is empty".to_string()));
        }
        for (field, template) in [
            ("address_of", &self.address_of),
            ("line_of", &self.line_of),
            ("symbol_info", &self.symbol_info),
        ] {
            if !template.contains(SYMBOL_PLACEHOLDER) {
                return Err(LocatorError::InvalidConfig(format!(
                    "command `{field}` has no {SYMBOL_PLACEHOLDER} placeholder: `{template}`"
                )));
            }
        }
        if !self.add_search_path.contains(PATH_PLACEHOLDER) {
            return Err(LocatorError::InvalidConfig(format!(
                "command `add_search_path` has no {PATH_PLACEHOLDER} placeholder: `{}`",
                self.add_search_path
            )));
        }
        Ok(())
    }
}
