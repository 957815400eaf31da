//! Tracking which third-party rule sources actually fired.
//!
//! Purely observational: the set records the source name of every rule that
//! contributed a successful rewrite, so a user can see which library
//! dependencies their target really exercises. It has no effect on
//! rewriting. Routines may be processed in parallel, so insertion must be
//! thread-safe; membership is idempotent and order is irrelevant.

use dashmap::DashSet;
use tracing::info;

/// The built-in platform rule source. Platform rules fire constantly and
/// say nothing about third-party dependencies, so they are never recorded.
pub const PLATFORM_SOURCE: &str = "Android SDK";

/// Process-lifetime, append-only set of third-party rule sources that
/// produced at least one rewrite.
#[derive(Debug, Default)]
pub struct DependencySet {
    sources: DashSet<String>,
}

impl DependencySet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a rule source. The platform source is ignored; the first
    /// sighting of any other source is logged.
    ///
    /// Returns `true` if the source was newly added.
    pub fn record(&self, source: &str) -> bool {
        if source == PLATFORM_SOURCE {
            return false;
        }
        let added = self.sources.insert(source.to_string());
        if added {
            info!(source, "detected dependency");
        }
        added
    }

    /// Returns `true` if the source has been recorded.
    #[must_use]
    pub fn contains(&self, source: &str) -> bool {
        self.sources.contains(source)
    }

    /// Returns the number of recorded sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Returns a sorted snapshot of the recorded sources.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        let mut sources: Vec<String> = self.sources.iter().map(|s| s.clone()).collect();
        sources.sort();
        sources
    }
}
