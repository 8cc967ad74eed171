//! # Configuration
//!
//! Locator settings, loadable from a JSON file with every field defaulted.
//!
//! ```json
//! {
//!   "backend": "auto",
//!   "debugger": {
//!     "executable": "ntox86_64-gdb",
//!     "fallback_executable": "gdb",
//!     "target": "/opt/musl/lib/libc.so",
//!     "command_timeout_ms": 15000
//!   },
//!   "sources": { "root": "/opt/musl" },
//!   "logging": { "level": "debug", "format": "json" }
//! }
//! ```
//!
//! ## Environment overrides
//!
//! [`LocatorConfig::apply_env_overrides`] reads:
//!
//! - `SYMSRC_BACKEND`: `debugger`, `regex_fallback` or `auto`
//! - `SYMSRC_DEBUGGER` / `SYMSRC_DEBUGGER_FALLBACK`: executables
//! - `SYMSRC_TARGET`: compiled library loaded into the debugger
//! - `SYMSRC_SOURCE_ROOT`: source tree root
//! - `SYMSRC_TIMEOUT_MS`: per-command timeout

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use symsrc_utils::LogSettings;

use crate::error::{LocatorError, LocatorResult};
use crate::session::CommandSet;

/// Which resolver/extractor pair a locator uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend
{
    /// Debugger-backed resolution plus the lexical extractor
    #[default]
    Debugger,
    /// Regex source index plus the line-count extractor
    RegexFallback,
    /// Debugger if one can be started, regex fallback otherwise
    Auto,
}

impl FromStr for Backend
{
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().replace('-', "_").as_str() {
            "debugger" | "gdb" => Ok(Self::Debugger),
            "regex_fallback" | "regex" | "fallback" => Ok(Self::RegexFallback),
            "auto" => Ok(Self::Auto),
            other => Err(LocatorError::InvalidConfig(format!(
                "unknown backend `{other}`; use 'debugger', 'regex_fallback' or 'auto'"
            ))),
        }
    }
}

impl fmt::Display for Backend
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            Self::Debugger => "debugger",
            Self::RegexFallback => "regex_fallback",
            Self::Auto => "auto",
        };
        write!(f, "{label}")
    }
}

/// How to launch and talk to the external debugger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebuggerConfig
{
    /// Executable tried first
    pub executable: String,
    /// Executable tried when the first cannot be spawned
    pub fallback_executable: Option<String>,
    /// Arguments placed before `target`
    pub arguments: Vec<String>,
    /// Compiled library or binary to load, appended as the last argument
    pub target: Option<PathBuf>,
    /// Extra environment variables for the debugger process
    pub environment: BTreeMap<String, String>,
    /// Shell script whose exported environment is captured before spawning
    pub environment_script: Option<PathBuf>,
    /// Shared-library search paths, each sent with `commands.add_search_path`
    pub search_paths: Vec<PathBuf>,
    /// Budget for one command round trip
    pub command_timeout_ms: u64,
    /// How long `close` waits for a graceful exit before killing
    pub close_grace_ms: u64,
    /// Debugger vocabulary
    pub commands: CommandSet,
}

impl Default for DebuggerConfig
{
    fn default() -> Self
    {
        Self {
            executable: "gdb".to_string(),
            fallback_executable: Some("gdb-multiarch".to_string()),
            arguments: vec!["-q".to_string(), "-nx".to_string()],
            target: None,
            environment: BTreeMap::new(),
            environment_script: None,
            search_paths: Vec::new(),
            command_timeout_ms: 15_000,
            close_grace_ms: 5_000,
            commands: CommandSet::gdb(),
        }
    }
}

impl DebuggerConfig
{
    #[must_use]
    pub fn command_timeout(&self) -> Duration
    {
        Duration::from_millis(self.command_timeout_ms)
    }

    #[must_use]
    pub fn close_grace(&self) -> Duration
    {
        Duration::from_millis(self.close_grace_ms)
    }

    /// Full argument list: configured arguments followed by the target.
    #[must_use]
    pub fn launch_arguments(&self) -> Vec<String>
    {
        let mut args = self.arguments.clone();
        if let Some(target) = &self.target {
            args.push(target.display().to_string());
        }
        args
    }
}

/// Where source files live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig
{
    /// Prefix for relative debug-info paths; scan root for the regex backend
    pub root: Option<PathBuf>,
    /// File extensions the regex backend indexes
    pub extensions: Vec<String>,
    /// Sources modified after this file are logged as possibly stale
    pub reference_binary: Option<PathBuf>,
}

impl Default for SourceConfig
{
    fn default() -> Self
    {
        Self {
            root: None,
            extensions: vec!["c".to_string()],
            reference_binary: None,
        }
    }
}

/// Top-level locator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig
{
    pub backend: Backend,
    pub debugger: DebuggerConfig,
    pub sources: SourceConfig,
    pub logging: LogSettings,
}

impl LocatorConfig
{
    /// Parse a JSON document.
    ///
    /// ## Errors
    ///
    /// Returns `Json` for malformed input. Values are not validated here; call
    /// [`LocatorConfig::validate`] after applying overrides.
    pub fn from_json(text: &str) -> LocatorResult<Self>
    {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a JSON config file.
    ///
    /// ## Errors
    ///
    /// Returns `Io` if the file cannot be read and `Json` if it cannot be parsed.
    pub fn from_file(path: impl AsRef<Path>) -> LocatorResult<Self>
    {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Apply `SYMSRC_*` overrides from the process environment.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidConfig` for an unparseable backend or timeout.
    pub fn apply_env_overrides(&mut self) -> LocatorResult<()>
    {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    ///
    /// ## Errors
    ///
    /// Returns `InvalidConfig` for an unparseable backend or timeout.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> LocatorResult<()>
    {
        if let Some(backend) = lookup("SYMSRC_BACKEND") {
            self.backend = backend.parse()?;
        }
        if let Some(executable) = lookup("SYMSRC_DEBUGGER") {
            self.debugger.executable = executable;
        }
        if let Some(fallback) = lookup("SYMSRC_DEBUGGER_FALLBACK") {
            self.debugger.fallback_executable = (!fallback.is_empty()).then_some(fallback);
        }
        if let Some(target) = lookup("SYMSRC_TARGET") {
            self.debugger.target = Some(PathBuf::from(target));
        }
        if let Some(root) = lookup("SYMSRC_SOURCE_ROOT") {
            self.sources.root = Some(PathBuf::from(root));
        }
        if let Some(timeout) = lookup("SYMSRC_TIMEOUT_MS") {
            self.debugger.command_timeout_ms = timeout
                .parse()
                .map_err(|err| LocatorError::InvalidConfig(format!("SYMSRC_TIMEOUT_MS `{timeout}`: {err}")))?;
        }
        Ok(())
    }

    /// Reject settings no backend can work with.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidConfig` describing the first problem found.
    pub fn validate(&self) -> LocatorResult<()>
    {
        if matches!(self.backend, Backend::Debugger | Backend::Auto) {
            if self.debugger.executable.trim().is_empty() {
                return Err(LocatorError::InvalidConfig("debugger executable is empty".to_string()));
            }
            if self.debugger.command_timeout_ms == 0 {
                return Err(LocatorError::InvalidConfig("command timeout must be non-zero".to_string()));
            }
            self.debugger.commands.validate()?;
        }
        if self.backend == Backend::RegexFallback && self.sources.root.is_none() {
            return Err(LocatorError::InvalidConfig(
                "regex_fallback backend needs sources.root".to_string(),
            ));
        }
        Ok(())
    }
}
