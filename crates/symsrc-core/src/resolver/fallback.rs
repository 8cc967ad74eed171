//! Regex fallback: index function definitions straight from the source tree.
//!
//! Used when no debugger can be started. A definition is a line that looks
//! like `return_type name(params) {`. Static functions, preprocessor lines and
//! comments are skipped, and the first definition of a name wins.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::SymbolResolver;
use crate::error::{LocatorError, LocatorResult};
use crate::types::SymbolLocation;

const DEFINITION_PATTERN: &str =
    r"^([A-Za-z_][A-Za-z0-9_\s\*]*?)[\s\*]+([A-Za-z_][A-Za-z0-9_]*)\s*\([^)]*\)\s*\{";

const SKIPPED_PREFIXES: [&str; 3] = ["static", "#", "//"];

const CONTROL_KEYWORDS: [&str; 6] = ["if", "for", "while", "switch", "return", "sizeof"];

/// Counters from one index build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats
{
    pub files_scanned: usize,
    pub functions_found: usize,
    pub errors: usize,
}

/// Where one indexed definition starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry
{
    pub file: PathBuf,
    /// 1-based
    pub line: u32,
}

/// Function name to definition site, built by scanning source files.
#[derive(Debug)]
pub struct SourceIndex
{
    pattern: Regex,
    entries: HashMap<String, IndexEntry>,
    stats: ScanStats,
}

impl SourceIndex
{
    /// An empty index.
    ///
    /// ## Errors
    ///
    /// Returns `Regex` if the definition pattern fails to compile.
    pub fn new() -> LocatorResult<Self>
    {
        Ok(Self {
            pattern: Regex::new(DEFINITION_PATTERN)?,
            entries: HashMap::new(),
            stats: ScanStats::default(),
        })
    }

    /// Walk `root` and index every file whose extension is in `extensions`.
    ///
    /// Entries record paths relative to `root`, the way debug info records
    /// them, so a source provider rooted at the same directory can load them.
    /// Unreadable entries are counted in [`ScanStats::errors`] and skipped.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidConfig` if `root` is not a directory.
    pub fn scan(root: &Path, extensions: &[String]) -> LocatorResult<Self>
    {
        if !root.is_dir() {
            return Err(LocatorError::InvalidConfig(format!(
                "source root is not a directory: {}",
                root.display()
            )));
        }

        let mut index = Self::new()?;
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(%err, "skipping unreadable directory entry");
                    index.stats.errors += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
                continue;
            }

            match fs::read(entry.path()) {
                Ok(bytes) => {
                    index.stats.files_scanned += 1;
                    let recorded = entry.path().strip_prefix(root).unwrap_or(entry.path());
                    index.index_text(recorded, &String::from_utf8_lossy(&bytes));
                }
                Err(err) => {
                    debug!(path = %entry.path().display(), %err, "skipping unreadable file");
                    index.stats.errors += 1;
                }
            }
        }

        info!(
            root = %root.display(),
            files = index.stats.files_scanned,
            functions = index.stats.functions_found,
            errors = index.stats.errors,
            "source index built"
        );
        Ok(index)
    }

    /// Add the definitions found in one file's text.
    pub fn index_text(&mut self, file: &Path, text: &str)
    {
        for (index, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if SKIPPED_PREFIXES.iter().any(|prefix| trimmed.starts_with(prefix)) {
                continue;
            }
            let Some(name) = self.definition_name(trimmed) else {
                continue;
            };
            if self.entries.contains_key(name) {
                continue;
            }

            let entry = IndexEntry {
                file: file.to_path_buf(),
                line: u32::try_from(index + 1).unwrap_or(u32::MAX),
            };
            self.entries.insert(name.to_string(), entry);
            self.stats.functions_found += 1;
        }
    }

    fn definition_name<'a>(&self, line: &'a str) -> Option<&'a str>
    {
        let caps = self.pattern.captures(line)?;
        let leading = caps.get(1)?.as_str().trim();
        let name = caps.get(2)?.as_str();
        let is_keyword = |word: &str| CONTROL_KEYWORDS.contains(&word);
        (!is_keyword(name) && !is_keyword(leading)).then_some(name)
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&IndexEntry>
    {
        self.entries.get(name)
    }

    #[must_use]
    pub fn stats(&self) -> ScanStats
    {
        self.stats
    }

    #[must_use]
    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool
{
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted.trim_start_matches('.') == ext))
}

/// Resolver that answers from a [`SourceIndex`] built on first use.
pub struct RegexFallbackResolver
{
    root: PathBuf,
    extensions: Vec<String>,
    index: OnceCell<SourceIndex>,
}

impl RegexFallbackResolver
{
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>) -> Self
    {
        Self {
            root: root.into(),
            extensions,
            index: OnceCell::new(),
        }
    }

    /// The index, scanning the tree if this is the first call.
    ///
    /// ## Errors
    ///
    /// Returns the scan error; a later call retries the scan.
    pub fn index(&self) -> LocatorResult<&SourceIndex>
    {
        self.index.get_or_try_init(|| SourceIndex::scan(&self.root, &self.extensions))
    }
}

impl SymbolResolver for RegexFallbackResolver
{
    fn label(&self) -> &'static str
    {
        "regex_fallback"
    }

    fn resolve(&mut self, symbol: &str) -> LocatorResult<Option<SymbolLocation>>
    {
        let index = self.index()?;
        let Some(entry) = index.lookup(symbol) else {
            warn!(symbol, "not found in source index");
            return Ok(None);
        };

        let file = entry.file.display().to_string();
        Ok(Some(SymbolLocation {
            name: symbol.to_string(),
            address: None,
            raw_debugger_output: format!("source index: {file}:{}", entry.line),
            source_file: Some(file),
            line_number: Some(entry.line),
        }))
    }
}
