//! # Function Locator
//!
//! The end-to-end lookup: cache, then resolve, then load the source, then
//! extract the definition.
//!
//! ```text
//! name ──► cache hit? ──yes──► cached outcome
//!              │ no
//!              ▼
//!          resolver ──None──► cache NotFound
//!              │ location with file and line
//!              ▼
//!          source provider ──error──► cache NotFound
//!              │ text
//!              ▼
//!          extractor ──► cache Found / NotFound
//! ```
//!
//! A location without a file and line (a stripped symbol, say) never reaches
//! the extractor.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, ExtractionCache};
use crate::config::{Backend, LocatorConfig};
use crate::error::LocatorResult;
use crate::extract::{LexicalExtractor, LineCountExtractor, SpanExtractor};
use crate::resolver::{DebuggerResolver, RegexFallbackResolver, SymbolResolver};
use crate::session::{ProcessSessionFactory, SessionFactory};
use crate::source::{FsSourceProvider, SourceProvider};
use crate::types::ExtractionResult;

/// Resolves function names and extracts their definitions.
pub struct FunctionLocator
{
    resolver: Box<dyn SymbolResolver>,
    extractor: Box<dyn SpanExtractor>,
    sources: Arc<dyn SourceProvider>,
    cache: Arc<ExtractionCache>,
}

impl FunctionLocator
{
    #[must_use]
    pub fn new(
        resolver: Box<dyn SymbolResolver>,
        extractor: Box<dyn SpanExtractor>,
        sources: Arc<dyn SourceProvider>,
        cache: Arc<ExtractionCache>,
    ) -> Self
    {
        Self {
            resolver,
            extractor,
            sources,
            cache,
        }
    }

    /// Build the backend `config` asks for.
    ///
    /// With [`Backend::Auto`] a debugger session is started immediately; if
    /// that fails and a source root is configured, the regex fallback is used
    /// instead.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidConfig` for unusable settings, or `ProcessStart` when
    /// `Auto` can neither start a debugger nor fall back.
    pub fn from_config(config: &LocatorConfig, cache: Arc<ExtractionCache>) -> LocatorResult<Self>
    {
        config.validate()?;
        let sources: Arc<dyn SourceProvider> =
            Arc::new(FsSourceProvider::from_config(&config.sources, config.debugger.target.as_deref()));
        let timeout = config.debugger.command_timeout();

        let locator = match config.backend {
            Backend::Debugger => {
                let factory: Arc<dyn SessionFactory> = Arc::new(ProcessSessionFactory::new(config.debugger.clone()));
                let resolver = DebuggerResolver::new(factory, timeout)?;
                Self::new(Box::new(resolver), Box::new(LexicalExtractor::new()), sources, cache)
            }
            Backend::RegexFallback => Self::regex_fallback(config, sources, cache),
            Backend::Auto => {
                let factory: Arc<dyn SessionFactory> = Arc::new(ProcessSessionFactory::new(config.debugger.clone()));
                match factory.start() {
                    Ok(session) => {
                        let resolver = DebuggerResolver::with_session(factory, session, timeout)?;
                        Self::new(Box::new(resolver), Box::new(LexicalExtractor::new()), sources, cache)
                    }
                    Err(err) if err.is_process_start() && config.sources.root.is_some() => {
                        warn!(%err, "no debugger available, using the regex fallback");
                        Self::regex_fallback(config, sources, cache)
                    }
                    Err(err) => return Err(err),
                }
            }
        };

        info!(backend = %locator, "function locator ready");
        Ok(locator)
    }

    fn regex_fallback(config: &LocatorConfig, sources: Arc<dyn SourceProvider>, cache: Arc<ExtractionCache>) -> Self
    {
        let root = config.sources.root.clone().unwrap_or_default();
        let resolver = RegexFallbackResolver::new(root, config.sources.extensions.clone());
        Self::new(Box::new(resolver), Box::new(LineCountExtractor::new()), sources, cache)
    }

    /// Find and extract the definition of `symbol`.
    ///
    /// `Ok(None)` means the symbol could not be located or has no body in its
    /// source. Either outcome is cached; a later call returns it without
    /// touching the resolver.
    ///
    /// ## Errors
    ///
    /// Only when the resolver cannot run at all (for example `ProcessStart`).
    /// Such failures are not cached.
    pub fn locate(&mut self, symbol: &str) -> LocatorResult<Option<Arc<ExtractionResult>>>
    {
        if let Some(entry) = self.cache.get(symbol) {
            debug!(symbol, "cache hit");
            return Ok(entry.into_found());
        }

        let entry = self.lookup(symbol)?;
        self.cache.insert(symbol, entry.clone());
        Ok(entry.into_found())
    }

    fn lookup(&mut self, symbol: &str) -> LocatorResult<CacheEntry>
    {
        let Some(location) = self.resolver.resolve(symbol)? else {
            return Ok(CacheEntry::NotFound);
        };

        let (Some(file), Some(line)) = (location.source_file.as_deref(), location.line_index()) else {
            warn!(symbol, location = %location, "no source line for symbol");
            return Ok(CacheEntry::NotFound);
        };

        let source = match self.sources.load(file) {
            Ok(source) => source,
            Err(err) => {
                warn!(symbol, %err, "source unavailable");
                return Ok(CacheEntry::NotFound);
            }
        };

        Ok(match self.extractor.extract(symbol, file, &source, line) {
            Some(result) => CacheEntry::Found(Arc::new(result)),
            None => CacheEntry::NotFound,
        })
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<ExtractionCache>
    {
        &self.cache
    }
}

impl fmt::Display for FunctionLocator
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}+{}", self.resolver.label(), self.extractor.label())
    }
}
