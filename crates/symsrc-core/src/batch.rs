//! # Batch Lookups
//!
//! Locate many functions concurrently on tokio's blocking pool.
//!
//! Each worker owns one [`FunctionLocator`] (and so one debugger session),
//! built lazily by the caller's factory. Workers pull names from a shared
//! queue and share one [`ExtractionCache`], so a name any worker has already
//! settled is answered from memory.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use symsrc_core::batch::{run_batch, BatchOptions};
//! use symsrc_core::cache::ExtractionCache;
//! use symsrc_core::config::LocatorConfig;
//! use symsrc_core::locator::FunctionLocator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LocatorConfig::from_file("symsrc.json")?;
//! let names = vec!["strlen".to_string(), "memcpy".to_string()];
//! let report = run_batch(names, BatchOptions::default(), Arc::new(ExtractionCache::new()), move |cache| {
//!     FunctionLocator::from_config(&config, cache)
//! })
//! .await;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::cache::ExtractionCache;
use crate::error::LocatorResult;
use crate::locator::FunctionLocator;
use crate::types::ExtractionResult;

/// Default worker count, one debugger process each.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions
{
    /// Upper bound on simultaneous workers; zero is treated as one
    pub max_concurrent: usize,
}

impl Default for BatchOptions
{
    fn default() -> Self
    {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

/// Counters over one batch. Duplicate names are counted once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats
{
    pub total_requested: usize,
    /// Found, complete or partial
    pub successful: usize,
    /// Found but with unbalanced braces
    pub partial: usize,
    pub unresolved: usize,
    pub failed: usize,
    /// Answered from the cache without a new lookup
    pub cached: usize,
}

/// Everything a batch produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport
{
    pub found: BTreeMap<String, ExtractionResult>,
    pub unresolved: Vec<String>,
    /// Name to error message, for lookups that could not run
    pub failed: BTreeMap<String, String>,
    pub stats: BatchStats,
}

enum Outcome
{
    Found(Arc<ExtractionResult>),
    Unresolved,
    Failed(String),
}

struct Settled
{
    name: String,
    outcome: Outcome,
    cached: bool,
}

/// Locate every name in `names`.
///
/// `make_locator` is called once per worker, on the worker's thread, with the
/// shared cache. A factory error fails only the name the worker was about to
/// look up; the worker tries again for its next name.
pub async fn run_batch<F>(
    names: Vec<String>,
    options: BatchOptions,
    cache: Arc<ExtractionCache>,
    make_locator: F,
) -> BatchReport
where
    F: Fn(Arc<ExtractionCache>) -> LocatorResult<FunctionLocator> + Send + Sync + 'static,
{
    let mut seen = HashSet::new();
    let unique: Vec<String> = names.into_iter().filter(|name| seen.insert(name.clone())).collect();
    let workers = options.max_concurrent.max(1).min(unique.len());
    info!(symbols = unique.len(), workers, "starting batch lookup");

    let queue = Arc::new(Mutex::new(unique.iter().cloned().collect::<VecDeque<_>>()));
    let make_locator = Arc::new(make_locator);

    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let queue = Arc::clone(&queue);
            let cache = Arc::clone(&cache);
            let make_locator = Arc::clone(&make_locator);
            tokio::task::spawn_blocking(move || run_worker(worker, &queue, &cache, make_locator.as_ref()))
        })
        .collect();

    let mut settled = Vec::with_capacity(unique.len());
    for handle in handles {
        match handle.await {
            Ok(results) => settled.extend(results),
            Err(err) => error!(%err, "batch worker panicked"),
        }
    }

    let report = build_report(&unique, settled);
    info!(
        total = report.stats.total_requested,
        successful = report.stats.successful,
        unresolved = report.stats.unresolved,
        failed = report.stats.failed,
        cached = report.stats.cached,
        "batch lookup finished"
    );
    report
}

fn run_worker<F>(worker: usize, queue: &Mutex<VecDeque<String>>, cache: &Arc<ExtractionCache>, make_locator: &F) -> Vec<Settled>
where
    F: Fn(Arc<ExtractionCache>) -> LocatorResult<FunctionLocator>,
{
    let mut locator: Option<FunctionLocator> = None;
    let mut settled = Vec::new();

    while let Some(name) = next_name(queue) {
        let cached = cache.contains(&name);

        let current = match locator.take() {
            Some(current) => current,
            None => match make_locator(Arc::clone(cache)) {
                Ok(created) => created,
                Err(err) => {
                    warn!(worker, symbol = %name, %err, "could not create locator");
                    settled.push(Settled {
                        name,
                        outcome: Outcome::Failed(err.to_string()),
                        cached: false,
                    });
                    continue;
                }
            },
        };
        let current = locator.insert(current);

        let outcome = match current.locate(&name) {
            Ok(Some(result)) => Outcome::Found(result),
            Ok(None) => Outcome::Unresolved,
            Err(err) => {
                warn!(worker, symbol = %name, %err, "lookup failed");
                Outcome::Failed(err.to_string())
            }
        };
        debug!(worker, symbol = %name, cached, "settled");
        settled.push(Settled { name, outcome, cached });
    }

    settled
}

fn next_name(queue: &Mutex<VecDeque<String>>) -> Option<String>
{
    queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front()
}

fn build_report(requested: &[String], settled: Vec<Settled>) -> BatchReport
{
    let mut report = BatchReport::default();
    report.stats.total_requested = requested.len();

    let mut outcomes: BTreeMap<String, Settled> = settled.into_iter().map(|s| (s.name.clone(), s)).collect();

    for name in requested {
        let Some(Settled { outcome, cached, .. }) = outcomes.remove(name) else {
            report.failed.insert(name.clone(), "worker stopped before this symbol".to_string());
            report.stats.failed += 1;
            continue;
        };
        if cached {
            report.stats.cached += 1;
        }
        match outcome {
            Outcome::Found(result) => {
                report.stats.successful += 1;
                if !result.complete {
                    report.stats.partial += 1;
                }
                report.found.insert(name.clone(), ExtractionResult::clone(&result));
            }
            Outcome::Unresolved => {
                report.stats.unresolved += 1;
                report.unresolved.push(name.clone());
            }
            Outcome::Failed(message) => {
                report.stats.failed += 1;
                report.failed.insert(name.clone(), message);
            }
        }
    }

    report
}
