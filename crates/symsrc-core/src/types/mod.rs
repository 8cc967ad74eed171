//! # Types
//!
//! Values that flow through the locator pipeline.
//!
//! A [`SymbolLocation`] is produced once per lookup by a resolver and may be
//! dropped as soon as the span is extracted; only the [`ExtractionResult`]
//! is kept (in the cache and by callers). Both are immutable once built.

pub mod extraction;
pub mod location;

// Re-export all public types
pub use extraction::ExtractionResult;
pub use location::SymbolLocation;
