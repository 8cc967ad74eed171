//! # Source Providers
//!
//! Load the text of a source file named by debug information.
//!
//! Debug info records paths as the compiler saw them, often relative to the
//! build directory. [`FsSourceProvider`] joins relative paths onto a
//! configured root and decodes bytes lossily, so a stray Latin-1 comment does
//! not make a whole file unreadable.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, warn};

use crate::config::SourceConfig;
use crate::error::{LocatorError, LocatorResult};

/// Reads source text by the path recorded in debug information.
pub trait SourceProvider: Send + Sync
{
    /// ## Errors
    ///
    /// Returns `SourceUnavailable` if the file cannot be read.
    fn load(&self, path: &str) -> LocatorResult<String>;
}

/// Reads sources from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FsSourceProvider
{
    root: Option<PathBuf>,
    reference_binary: Option<PathBuf>,
}

impl FsSourceProvider
{
    #[must_use]
    pub fn new(root: Option<PathBuf>) -> Self
    {
        Self {
            root,
            reference_binary: None,
        }
    }

    /// Provider for `config`, falling back to `target` as the staleness
    /// reference when none is configured.
    #[must_use]
    pub fn from_config(config: &SourceConfig, target: Option<&Path>) -> Self
    {
        Self {
            root: config.root.clone(),
            reference_binary: config.reference_binary.clone().or_else(|| target.map(Path::to_path_buf)),
        }
    }

    /// Log a warning when a loaded source is newer than `binary`.
    #[must_use]
    pub fn with_reference_binary(mut self, binary: impl Into<PathBuf>) -> Self
    {
        self.reference_binary = Some(binary.into());
        self
    }

    /// Where `path` is read from.
    ///
    /// Relative paths are joined onto the root. An absolute path that does not
    /// exist is retried under the root with its leading separator removed.
    #[must_use]
    pub fn resolve_path(&self, path: &str) -> PathBuf
    {
        let recorded = Path::new(path);
        let Some(root) = &self.root else {
            return recorded.to_path_buf();
        };

        if recorded.is_relative() {
            return root.join(recorded);
        }
        if recorded.exists() {
            return recorded.to_path_buf();
        }
        let relative: PathBuf = recorded.components().skip(1).collect();
        let rebased = root.join(relative);
        if rebased.exists() {
            rebased
        } else {
            recorded.to_path_buf()
        }
    }

    fn warn_if_stale(&self, source: &Path)
    {
        let Some(binary) = &self.reference_binary else {
            return;
        };
        let modified = |path: &Path| fs::metadata(path).and_then(|meta| meta.modified()).ok();
        if let (Some(source_time), Some(binary_time)) = (modified(source), modified(binary)) {
            if source_time > binary_time {
                warn!(
                    source = %source.display(),
                    binary = %binary.display(),
                    "source is newer than the binary, line numbers may be stale"
                );
            }
        }
    }
}

impl SourceProvider for FsSourceProvider
{
    fn load(&self, path: &str) -> LocatorResult<String>
    {
        let resolved = self.resolve_path(path);
        let bytes = fs::read(&resolved).map_err(|source| LocatorError::SourceUnavailable {
            path: resolved.clone(),
            source,
        })?;
        self.warn_if_stale(&resolved);
        debug!(path = %resolved.display(), bytes = bytes.len(), "loaded source");
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// In-memory sources, keyed by the exact recorded path.
#[derive(Debug, Default)]
pub struct MemorySourceProvider
{
    files: HashMap<String, String>,
    loads: AtomicUsize,
}

impl MemorySourceProvider
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, text: impl Into<String>) -> Self
    {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>)
    {
        self.files.insert(path.into(), text.into());
    }

    /// Successful and failed `load` calls so far.
    #[must_use]
    pub fn loads(&self) -> usize
    {
        self.loads.load(Ordering::Relaxed)
    }
}

impl SourceProvider for MemorySourceProvider
{
    fn load(&self, path: &str) -> LocatorResult<String>
    {
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| LocatorError::SourceUnavailable {
                path: PathBuf::from(path),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
    }
}
