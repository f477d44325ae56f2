//! Probability report cache
//!
//! Entries never expire on a timer. They are dropped only by explicit
//! invalidation when an admin edits a weight table or scheme, and are
//! repopulated by warm-up or an admin-triggered recompute. The cache is the
//! engine's only shared mutable state; a coarse lock is plenty given that
//! writes happen on admin edits and at startup only.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockUpgradableReadGuard};

use crate::error::EngineError;
use crate::probability::{ProbabilityReport, ReportMethod};

/// Cache key: one report per (weight config, scheme, method) triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub weight_config: u32,
    pub scheme: u32,
    pub method: ReportMethod,
}

/// Shared report cache with explicit invalidation
pub struct ProbabilityCache {
    entries: RwLock<HashMap<CacheKey, Arc<ProbabilityReport>>>,
    // Stampede guard: at most one in-flight computation per key
    in_flight: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
    // Per-key counters bumped on every invalidation touching the key, so
    // a computation whose inputs were edited mid-flight cannot write back
    // a stale report. Lock order is entries before generations.
    generations: Mutex<HashMap<CacheKey, u64>>,
}

impl ProbabilityCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            generations: Mutex::new(HashMap::new()),
        }
    }

    /// Read-only lookup; never computes
    pub fn get(&self, key: &CacheKey) -> Option<Arc<ProbabilityReport>> {
        self.entries.read().get(key).cloned()
    }

    /// Insert or replace (last writer wins)
    pub fn put(&self, key: CacheKey, report: ProbabilityReport) -> Arc<ProbabilityReport> {
        let report = Arc::new(report);
        self.entries.write().insert(key, Arc::clone(&report));
        report
    }

    /// Drop every report keyed by this weight configuration
    pub fn invalidate_weight_config(&self, weight_config: u32) -> usize {
        self.invalidate_where(|key| key.weight_config == weight_config)
    }

    /// Drop every report keyed by this scheme
    pub fn invalidate_scheme(&self, scheme: u32) -> usize {
        self.invalidate_where(|key| key.scheme == scheme)
    }

    /// Drop the reports for one (weight config, scheme) pairing
    pub fn invalidate_pair(&self, weight_config: u32, scheme: u32) -> usize {
        self.invalidate_where(|key| key.weight_config == weight_config && key.scheme == scheme)
    }

    fn invalidate_where(&self, matches: impl Fn(&CacheKey) -> bool) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !matches(key));
        // Fence off in-flight computations started against the old inputs;
        // their write-back is discarded in get_or_compute.
        for (key, generation) in self.generations.lock().iter_mut() {
            if matches(key) {
                *generation += 1;
            }
        }
        before - entries.len()
    }

    /// Number of cached reports
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Return the cached report or compute it, with at most one concurrent
    /// computation per key. Losers of the race block on the key lock and
    /// then read the winner's entry. Failed computations cache nothing.
    ///
    /// A computation that straddles an invalidation of its key is treated
    /// as stale: its result is not written back, and any report cached in
    /// the meantime (from the post-edit recompute) is served instead.
    pub fn get_or_compute<F>(&self, key: CacheKey, compute: F) -> Result<Arc<ProbabilityReport>, EngineError>
    where
        F: FnOnce() -> Result<ProbabilityReport, EngineError>,
    {
        if let Some(report) = self.get(&key) {
            return Ok(report);
        }

        let key_lock = {
            let mut in_flight = self.in_flight.lock();
            Arc::clone(in_flight.entry(key).or_default())
        };
        let _guard = key_lock.lock();

        // A racing caller may have filled the entry while we waited
        if let Some(report) = self.get(&key) {
            return Ok(report);
        }

        let generation = self.generation(&key);
        let result = compute();
        self.in_flight.lock().remove(&key);
        let report = Arc::new(result?);

        let entries = self.entries.upgradable_read();
        if self.generation(&key) == generation {
            let mut entries = RwLockUpgradableReadGuard::upgrade(entries);
            entries.insert(key, Arc::clone(&report));
            return Ok(report);
        }

        // The key was invalidated mid-computation. Serve whatever the
        // post-edit recompute cached, or this caller's own result as a
        // one-off; the stale numbers never enter the cache.
        Ok(entries.get(&key).cloned().unwrap_or(report))
    }

    fn generation(&self, key: &CacheKey) -> u64 {
        *self.generations.lock().entry(*key).or_insert(0)
    }
}

impl Default for ProbabilityCache {
    fn default() -> Self {
        Self::new()
    }
}
