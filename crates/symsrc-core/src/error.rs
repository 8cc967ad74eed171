//! # Error Types
//!
//! Error handling for the function source locator.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Only genuinely exceptional conditions live here. The common, expected
//! outcomes of a best-effort lookup are not errors:
//!
//! - a debugger reply that never reaches its prompt is a
//!   [`ReplyStatus::TimedOut`](crate::session::ReplyStatus) reply,
//! - a symbol the debugger knows nothing about resolves to `None`,
//! - braces that never balance produce an
//!   [`ExtractionResult`](crate::types::ExtractionResult) with `complete == false`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for locator operations
///
/// ## Error Categories
///
/// 1. **Process errors**: `ProcessStart`
/// 2. **Source errors**: `SourceUnavailable`
/// 3. **Configuration errors**: `InvalidConfig`, `Json`, `Regex`
/// 4. **I/O errors**: `Io`
#[derive(Error, Debug)]
pub enum LocatorError
{
    /// Neither the primary nor the fallback debugger executable could be
    /// spawned, or the spawned debugger never reached a usable prompt
    ///
    /// This is fatal for the lookup that needed the session, and only for
    /// that lookup: a batch records the symbol as failed and moves on.
    #[error("Failed to start debugger (tried `{primary}` and `{fallback}`): {reason}")]
    ProcessStart
    {
        /// Executable tried first
        primary: String,
        /// Executable tried after the primary failed
        fallback: String,
        /// Why the last attempt failed
        reason: String,
    },

    /// A source file named by debug information could not be read
    #[error("Source file unavailable: {}", path.display())]
    SourceUnavailable
    {
        /// Path after applying the configured source root
        path: PathBuf,
        /// Underlying read error
        #[source]
        source: io::Error,
    },

    /// Configuration is syntactically valid but unusable
    ///
    /// Examples:
    /// - An empty debugger executable name
    /// - A zero command timeout
    /// - The regex fallback backend without a source root
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A location pattern failed to compile
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// I/O error (for file operations, pipes, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl LocatorError
{
    /// Whether this error came from failing to spawn the debugger.
    #[must_use]
    pub fn is_process_start(&self) -> bool
    {
        matches!(self, Self::ProcessStart { .. })
    }
}

/// Convenience type alias for `Result<T, LocatorError>`
///
/// ```rust
/// use symsrc_core::error::LocatorResult;
/// fn foo() -> LocatorResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type LocatorResult<T> = std::result::Result<T, LocatorError>;
