//! Common module for library exports

pub use crate::batch::{run_batch, BatchOptions, BatchReport, BatchStats};
pub use crate::cache::{CacheEntry, ExtractionCache};
pub use crate::config::{Backend, DebuggerConfig, LocatorConfig, SourceConfig};
pub use crate::error::{LocatorError, LocatorResult};
pub use crate::extract::{LexicalExtractor, LineCountExtractor, Span, SpanExtractor};
pub use crate::locator::FunctionLocator;
pub use crate::resolver::{DebuggerResolver, RegexFallbackResolver, SymbolResolver};
pub use crate::session::{
    CommandSet, DebuggerSession, ProcessSession, ProcessSessionFactory, ReplyStatus, SessionFactory, SessionReply,
};
pub use crate::source::{FsSourceProvider, MemorySourceProvider, SourceProvider};
pub use crate::types::{ExtractionResult, SymbolLocation};
