//! Memoized analysis.
//!
//! Inputs are compared by value: two structurally equal handler inputs share
//! one analysis, whatever their origin.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use heron_infer::HandlerInput;
use tracing::trace;

use crate::analyzer::{Analyzer, HandlerAnalysis};

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that ran the analysis.
    pub misses: u64,
    /// Entries currently cached.
    pub size: usize,
}

/// A concurrent analysis cache bound to one [`Analyzer`].
///
/// # Example
///
/// ```
/// use heron::{AnalysisCache, Analyzer, HandlerInput, Method, SuccessKind};
///
/// let cache = AnalysisCache::new(Analyzer::default());
/// let input = HandlerInput::new("health", Method::GET, "/health", SuccessKind::NoContent);
///
/// let first = cache.get_or_analyze(&input);
/// let second = cache.get_or_analyze(&input.clone());
/// assert_eq!(first, second);
/// assert_eq!(cache.stats().hits, 1);
/// ```
#[derive(Debug)]
pub struct AnalysisCache {
    analyzer: Analyzer,
    entries: DashMap<HandlerInput, HandlerAnalysis>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AnalysisCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer,
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the analyzer results are computed with.
    #[must_use]
    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Returns the cached analysis of `input`, analyzing it on a miss.
    pub fn get_or_analyze(&self, input: &HandlerInput) -> HandlerAnalysis {
        if let Some(hit) = self.entries.get(input) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(handler = %input.name, "analysis cache hit");
            return hit.clone();
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let analysis = self.analyzer.analyze(input);
        self.entries
            .entry(input.clone())
            .or_insert(analysis)
            .clone()
    }

    /// Analyzes a batch, reusing cached results.
    pub fn get_or_analyze_batch(&self, inputs: &[HandlerInput]) -> Vec<HandlerAnalysis> {
        inputs.iter().map(|input| self.get_or_analyze(input)).collect()
    }

    /// Returns the number of cached analyses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every cached analysis.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Returns hit, miss and size counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.entries.len(),
        }
    }
}
