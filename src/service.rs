//! Engine facade wired to the HTTP/admin layers
//!
//! Owns the registries of live weight tables, schemes, and game-mode
//! assignments, the report cache, and the shared drawer. Constructed once
//! at process start and passed by reference; nothing here is ambient
//! global state.
//!
//! The calling contract mirrors the portal layers:
//! - game sessions call [`RewardEngine::evaluate_spin`] per round;
//! - end-user rule pages call [`RewardEngine::get_probability_report`],
//!   which reads the cache and never computes;
//! - the admin layer calls [`RewardEngine::compute_fast_report`] for exact
//!   previews while editing and [`RewardEngine::recalculate_for_scheme`]
//!   after saving an edit;
//! - startup runs [`RewardEngine::warm_up_background`] so no end-user
//!   request ever computes on the hot path.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheKey, ProbabilityCache};
use crate::classify::{ClassificationResult, classify_with_mode};
use crate::drawer::Drawer;
use crate::error::EngineError;
use crate::probability::{
    ProbabilityReport, ReportMethod, compute_exact, compute_monte_carlo,
};
use crate::rules::{Consecutiveness, RuleSet};
use crate::symbols::WeightTable;

/// Slot game modes offered by the portal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Basic,
    Advanced,
    Supreme,
}

/// Which configuration pair a game mode currently plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeAssignment {
    pub mode: GameMode,
    pub weight_config: u32,
    pub scheme: u32,
    /// Symbols drawn per round in this mode
    pub draw_len: u8,
    /// Mode-wide consecutiveness override, if the mode plays strictly
    pub consecutiveness: Option<Consecutiveness>,
}

/// Engine tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sample count for cached Monte Carlo reports
    pub monte_carlo_samples: u64,
    /// Draw length used when a pair has no mode assignment
    pub default_draw_len: u8,
    /// Fixed seed for reproducible runs (None = OS entropy)
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            monte_carlo_samples: 1_000_000,
            default_draw_len: 4,
            rng_seed: None,
        }
    }
}

/// The reward-rule engine service
pub struct RewardEngine {
    config: EngineConfig,
    tables: RwLock<HashMap<u32, Arc<WeightTable>>>,
    schemes: RwLock<HashMap<u32, Arc<RuleSet>>>,
    assignments: RwLock<HashMap<GameMode, ModeAssignment>>,
    cache: ProbabilityCache,
    drawer: Mutex<Drawer>,
}

impl RewardEngine {
    pub fn new(config: EngineConfig) -> Self {
        let draw_len = usize::from(config.default_draw_len);
        let drawer = match config.rng_seed {
            Some(seed) => Drawer::seeded(draw_len, seed),
            None => Drawer::new(draw_len),
        };
        Self {
            config,
            tables: RwLock::new(HashMap::new()),
            schemes: RwLock::new(HashMap::new()),
            assignments: RwLock::new(HashMap::new()),
            cache: ProbabilityCache::new(),
            drawer: Mutex::new(drawer),
        }
    }

    // ── configuration intake ────────────────────────────────────────────

    /// Install or replace a weight table; cached reports for its config id
    /// are dropped and must be recomputed.
    pub fn insert_weight_table(&self, table: WeightTable) {
        let config_id = table.config_id();
        self.tables.write().insert(config_id, Arc::new(table));
        let dropped = self.cache.invalidate_weight_config(config_id);
        info!("weight config {config_id} replaced, {dropped} cached report(s) invalidated");
    }

    /// Install or replace a rule set; cached reports for its scheme id are
    /// dropped and must be recomputed.
    pub fn insert_rule_set(&self, rules: RuleSet) {
        let scheme_id = rules.scheme_id();
        self.schemes.write().insert(scheme_id, Arc::new(rules));
        let dropped = self.cache.invalidate_scheme(scheme_id);
        info!("scheme {scheme_id} replaced, {dropped} cached report(s) invalidated");
    }

    /// Point a game mode at a (weight config, scheme) pair. Reports for the
    /// pair the mode previously played are dropped.
    pub fn assign_mode(&self, assignment: ModeAssignment) {
        let previous = self.assignments.write().insert(assignment.mode, assignment);
        if let Some(prev) = previous {
            if (prev.weight_config, prev.scheme) != (assignment.weight_config, assignment.scheme) {
                self.cache.invalidate_pair(prev.weight_config, prev.scheme);
            }
        }
    }

    /// Current mode assignments
    pub fn assignments(&self) -> Vec<ModeAssignment> {
        self.assignments.read().values().copied().collect()
    }

    // ── per-round evaluation ────────────────────────────────────────────

    /// Draw one outcome for the pair and classify it. Pure aside from the
    /// RNG advance; session/balance effects belong to the caller.
    pub fn evaluate_spin(
        &self,
        weight_config: u32,
        scheme: u32,
        consecutiveness: Option<Consecutiveness>,
    ) -> Result<ClassificationResult, EngineError> {
        let table = self.table(weight_config)?;
        let rules = self.scheme(scheme)?;
        let draw_len = self.draw_len_for(weight_config, scheme);

        let outcome = self.drawer.lock().draw_n(&table, draw_len);
        let result = classify_with_mode(&outcome, &rules, &table, consecutiveness);
        debug!(
            "spin config={weight_config} scheme={scheme} outcome={outcome:?} rule={:?} punishment={:?} multiplier={}",
            result.matched_rule, result.punishment, result.multiplier
        );
        Ok(result)
    }

    /// Spin the pair currently assigned to a game mode
    pub fn evaluate_mode_spin(&self, mode: GameMode) -> Result<ClassificationResult, EngineError> {
        let assignment = self
            .assignments
            .read()
            .get(&mode)
            .copied()
            .ok_or_else(|| EngineError::InvalidArgument(format!("no assignment for {mode:?}")))?;
        self.evaluate_spin(
            assignment.weight_config,
            assignment.scheme,
            assignment.consecutiveness,
        )
    }

    // ── probability reports ─────────────────────────────────────────────

    /// Read-only cache lookup. `None` means "not yet computed; the admin
    /// layer must trigger a recompute" — user-facing pages never compute.
    pub fn get_probability_report(
        &self,
        weight_config: u32,
        scheme: u32,
        method: ReportMethod,
    ) -> Option<Arc<ProbabilityReport>> {
        self.cache.get(&CacheKey {
            weight_config,
            scheme,
            method,
        })
    }

    /// Exact ("fast") report for admin preview, computed synchronously and
    /// cached. At most one computation runs per key; concurrent previews of
    /// the same pair share the result.
    pub fn compute_fast_report(
        &self,
        weight_config: u32,
        scheme: u32,
    ) -> Result<Arc<ProbabilityReport>, EngineError> {
        let table = self.table(weight_config)?;
        let rules = self.scheme(scheme)?;
        let draw_len = self.draw_len_for(weight_config, scheme);
        let key = CacheKey {
            weight_config,
            scheme,
            method: ReportMethod::Exact,
        };
        self.cache
            .get_or_compute(key, || compute_exact(&table, &rules, draw_len))
    }

    /// Invalidate and eagerly recompute the cached Monte Carlo report for
    /// every pairing currently assigned to this scheme. Called by the admin
    /// layer after any rule edit. Returns the number of refreshed reports.
    pub fn recalculate_for_scheme(&self, scheme: u32) -> Result<usize, EngineError> {
        let rules = self.scheme(scheme)?;
        self.cache.invalidate_scheme(scheme);

        let pairs: Vec<(u32, u8)> = self
            .assignments
            .read()
            .values()
            .filter(|a| a.scheme == scheme)
            .map(|a| (a.weight_config, a.draw_len))
            .collect();

        let mut refreshed = 0;
        for (weight_config, draw_len) in pairs {
            match self.refresh_monte_carlo(weight_config, &rules, usize::from(draw_len)) {
                Ok(()) => refreshed += 1,
                Err(err) => {
                    // Invariant violations are fatal to this computation
                    // only: skip caching and keep the process serving.
                    warn!("recompute for config {weight_config} scheme {scheme} failed: {err}");
                }
            }
        }
        info!("scheme {scheme}: {refreshed} report(s) recomputed");
        Ok(refreshed)
    }

    /// Compute and cache Monte Carlo reports for every assigned pair that
    /// is not cached yet. Returns the number of pairs ensured.
    pub fn warm_up(&self) -> usize {
        let started = Instant::now();
        let pairs: Vec<ModeAssignment> = self.assignments();

        let mut ensured = 0;
        for assignment in pairs {
            let key = CacheKey {
                weight_config: assignment.weight_config,
                scheme: assignment.scheme,
                method: ReportMethod::MonteCarlo,
            };
            let table = match self.table(assignment.weight_config) {
                Ok(table) => table,
                Err(err) => {
                    warn!("warm-up skipping {:?}: {err}", assignment.mode);
                    continue;
                }
            };
            let rules = match self.scheme(assignment.scheme) {
                Ok(rules) => rules,
                Err(err) => {
                    warn!("warm-up skipping {:?}: {err}", assignment.mode);
                    continue;
                }
            };
            let samples = self.config.monte_carlo_samples;
            let seed = self.config.rng_seed;
            let draw_len = usize::from(assignment.draw_len);
            let result = self.cache.get_or_compute(key, || {
                compute_monte_carlo(&table, &rules, draw_len, samples, seed)
            });
            match result {
                Ok(_) => ensured += 1,
                Err(err) => warn!("warm-up computation failed for {:?}: {err}", assignment.mode),
            }
        }
        info!(
            "warm-up ensured {ensured} report(s) in {:?}",
            started.elapsed()
        );
        ensured
    }

    /// Run warm-up on a background thread so first-request serving is not
    /// blocked at process start.
    pub fn warm_up_background(self: &Arc<Self>) -> std::thread::JoinHandle<usize> {
        let engine = Arc::clone(self);
        std::thread::spawn(move || engine.warm_up())
    }

    /// Cached report count (diagnostics)
    pub fn cached_reports(&self) -> usize {
        self.cache.len()
    }

    // ── internals ───────────────────────────────────────────────────────

    fn refresh_monte_carlo(
        &self,
        weight_config: u32,
        rules: &RuleSet,
        draw_len: usize,
    ) -> Result<(), EngineError> {
        let table = self.table(weight_config)?;
        let report = compute_monte_carlo(
            &table,
            rules,
            draw_len,
            self.config.monte_carlo_samples,
            self.config.rng_seed,
        )?;
        self.cache.put(
            CacheKey {
                weight_config,
                scheme: rules.scheme_id(),
                method: ReportMethod::MonteCarlo,
            },
            report,
        );
        Ok(())
    }

    fn table(&self, weight_config: u32) -> Result<Arc<WeightTable>, EngineError> {
        self.tables
            .read()
            .get(&weight_config)
            .cloned()
            .ok_or_else(|| {
                EngineError::InvalidArgument(format!("unknown weight config {weight_config}"))
            })
    }

    fn scheme(&self, scheme: u32) -> Result<Arc<RuleSet>, EngineError> {
        self.schemes
            .read()
            .get(&scheme)
            .cloned()
            .ok_or_else(|| EngineError::InvalidArgument(format!("unknown scheme {scheme}")))
    }

    fn draw_len_for(&self, weight_config: u32, scheme: u32) -> usize {
        self.assignments
            .read()
            .values()
            .find(|a| a.weight_config == weight_config && a.scheme == scheme)
            .map(|a| usize::from(a.draw_len))
            .unwrap_or(usize::from(self.config.default_draw_len))
    }
}
