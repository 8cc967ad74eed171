//! # symsrc-core
//!
//! Given the name of a compiled function, return the exact text of its
//! definition as written in the source tree.
//!
//! The pipeline:
//! - **Resolve**: ask a debugger session (or a regex index of the sources)
//!   where the symbol lives
//! - **Load**: read the source file named by debug information
//! - **Extract**: backtrack to the start of the declaration and scan to the
//!   matching closing brace, ignoring braces in strings and comments
//! - **Cache**: remember every outcome by name
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use symsrc_core::prelude::*;
//!
//! fn main() -> LocatorResult<()>
//! {
//!     let mut config = LocatorConfig::default();
//!     config.debugger.target = Some("/usr/lib/libc.so".into());
//!     config.apply_env_overrides()?;
//!
//!     let mut locator = FunctionLocator::from_config(&config, Arc::new(ExtractionCache::new()))?;
//!     if let Some(found) = locator.locate("strlen")? {
//!         println!("{}\n{}", found.source_location(), found.text);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency
//!
//! A debugger session holds one conversation at a time. [`batch::run_batch`]
//! gives each worker its own session and shares only the cache.

pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod locator;
pub mod prelude;
pub mod resolver;
pub mod session;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use error::{LocatorError, LocatorResult};
pub use locator::FunctionLocator;
pub use types::{ExtractionResult, SymbolLocation};
