//! Exact and Monte Carlo probability / RTP computation

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::classify::{ClassificationResult, classify};
use crate::error::EngineError;
use crate::rules::RuleSet;
use crate::symbols::{SymbolId, WeightTable};

/// Self-check tolerance for exact enumeration
const EXACT_EPSILON: f64 = 1e-9;

/// Monte Carlo samples handed to one worker
const SHARD_SIZE: u64 = 65_536;

/// How a report was computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportMethod {
    /// Full enumeration over all alphabet^K sequences
    Exact,
    /// Large-sample simulation
    MonteCarlo,
}

/// Probability and RTP report for one (weight table, rule set) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityReport {
    /// Probability of each active rule firing, keyed by rule id
    pub per_rule: BTreeMap<u32, f64>,
    /// Probability of each active punishment, keyed by citation count
    pub per_punishment: BTreeMap<u8, f64>,
    /// Probability that nothing fires
    pub no_win: f64,
    /// Long-run return to player: win contributions minus deductions
    pub rtp: f64,
    /// Computation method
    pub method: ReportMethod,
    /// Sample count (Monte Carlo only)
    pub sample_count: Option<u64>,
    /// Outcome length the report was computed for
    pub draw_len: u8,
}

impl ProbabilityReport {
    /// Total probability mass across all categories
    pub fn total_mass(&self) -> f64 {
        self.per_rule.values().sum::<f64>()
            + self.per_punishment.values().sum::<f64>()
            + self.no_win
    }

    /// Serialize for the HTTP layer
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string(self)
            .map_err(|e| EngineError::InvalidArgument(format!("report serialization failed: {e}")))
    }

    /// Parse a report produced by [`ProbabilityReport::to_json`]
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidArgument(format!("malformed report JSON: {e}")))
    }
}

/// Per-category hit tallies, mergeable across Monte Carlo shards
#[derive(Debug, Clone, Default)]
struct Tally {
    per_rule: BTreeMap<u32, u64>,
    per_punishment: BTreeMap<u8, u64>,
    no_win: u64,
}

impl Tally {
    fn record(&mut self, result: &ClassificationResult) {
        if let Some(rule_id) = result.matched_rule {
            *self.per_rule.entry(rule_id).or_insert(0) += 1;
        } else if let Some(count) = result.punishment {
            *self.per_punishment.entry(count).or_insert(0) += 1;
        } else {
            self.no_win += 1;
        }
    }

    fn merge(mut self, other: Tally) -> Tally {
        for (id, n) in other.per_rule {
            *self.per_rule.entry(id).or_insert(0) += n;
        }
        for (count, n) in other.per_punishment {
            *self.per_punishment.entry(count).or_insert(0) += n;
        }
        self.no_win += other.no_win;
        self
    }
}

/// Compute exact probabilities by direct enumeration.
///
/// Walks every one of the `alphabet^K` raw sequences, accumulating each
/// sequence's probability (product of per-position weight/total) into the
/// category its classification lands in. With K <= 5 and alphabets of <= 10
/// symbols this stays within 10^5 classify calls, which is cheaper to
/// verify than per-rule closed-form combinatorics.
pub fn compute_exact(
    table: &WeightTable,
    rules: &RuleSet,
    draw_len: usize,
) -> Result<ProbabilityReport, EngineError> {
    if draw_len == 0 {
        return Err(EngineError::InvalidArgument(
            "draw length must be at least 1".into(),
        ));
    }

    let symbols = table.symbols();
    let total = table.total_weight() as f64;
    let probs: Vec<f64> = symbols
        .iter()
        .map(|s| f64::from(s.weight) / total)
        .collect();

    let mut per_rule = zeroed_rule_map(rules);
    let mut per_punishment = zeroed_punishment_map(rules);
    let mut no_win = 0.0f64;

    // Odometer over symbol indices; accumulation follows enumeration order
    // so the summation is reproducible.
    let mut indices = vec![0usize; draw_len];
    let mut outcome: Vec<SymbolId> = vec![symbols[0].id; draw_len];
    loop {
        let p: f64 = indices.iter().map(|&i| probs[i]).product();
        let result = classify(&outcome, rules, table);
        if let Some(rule_id) = result.matched_rule {
            *per_rule.entry(rule_id).or_insert(0.0) += p;
        } else if let Some(count) = result.punishment {
            *per_punishment.entry(count).or_insert(0.0) += p;
        } else {
            no_win += p;
        }

        // Advance the odometer
        let mut pos = draw_len;
        loop {
            if pos == 0 {
                break;
            }
            pos -= 1;
            indices[pos] += 1;
            if indices[pos] < symbols.len() {
                outcome[pos] = symbols[indices[pos]].id;
                break;
            }
            indices[pos] = 0;
            outcome[pos] = symbols[0].id;
        }
        if pos == 0 && indices[0] == 0 {
            break;
        }
    }

    let report = assemble(
        per_rule,
        per_punishment,
        no_win,
        rules,
        ReportMethod::Exact,
        None,
        draw_len,
    );
    let mass = report.total_mass();
    if (mass - 1.0).abs() > EXACT_EPSILON {
        return Err(EngineError::ProbabilityInvariantViolation {
            total: mass,
            epsilon: EXACT_EPSILON,
        });
    }
    Ok(report)
}

/// Estimate probabilities by simulating `sample_count` independent draws.
///
/// Samples are sharded across the rayon pool; shard tallies are summed, so
/// no cross-shard ordering matters. A fixed `seed` makes the whole run
/// reproducible (each shard derives its own stream from it).
pub fn compute_monte_carlo(
    table: &WeightTable,
    rules: &RuleSet,
    draw_len: usize,
    sample_count: u64,
    seed: Option<u64>,
) -> Result<ProbabilityReport, EngineError> {
    if sample_count == 0 {
        return Err(EngineError::InvalidArgument(
            "Monte Carlo sample count must be positive".into(),
        ));
    }
    if draw_len == 0 {
        return Err(EngineError::InvalidArgument(
            "draw length must be at least 1".into(),
        ));
    }

    let base_seed = seed.unwrap_or_else(|| rand::random());
    let shards = sample_count.div_ceil(SHARD_SIZE);

    let tally = (0..shards)
        .into_par_iter()
        .map(|shard| {
            let shard_samples = if shard == shards - 1 {
                sample_count - shard * SHARD_SIZE
            } else {
                SHARD_SIZE
            };
            // One independent stream per shard
            let mut rng = ChaCha8Rng::seed_from_u64(
                base_seed.wrapping_add(shard.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
            );
            let mut outcome: Vec<SymbolId> = vec![0; draw_len];
            let mut tally = Tally::default();
            for _ in 0..shard_samples {
                for slot in outcome.iter_mut() {
                    *slot = table.sample(&mut rng);
                }
                tally.record(&classify(&outcome, rules, table));
            }
            tally
        })
        .reduce(Tally::default, Tally::merge);

    let n = sample_count as f64;
    let mut per_rule = zeroed_rule_map(rules);
    for (id, hits) in tally.per_rule {
        *per_rule.entry(id).or_insert(0.0) += hits as f64 / n;
    }
    let mut per_punishment = zeroed_punishment_map(rules);
    for (count, hits) in tally.per_punishment {
        *per_punishment.entry(count).or_insert(0.0) += hits as f64 / n;
    }
    let no_win = tally.no_win as f64 / n;

    Ok(assemble(
        per_rule,
        per_punishment,
        no_win,
        rules,
        ReportMethod::MonteCarlo,
        Some(sample_count),
        draw_len,
    ))
}

fn zeroed_rule_map(rules: &RuleSet) -> BTreeMap<u32, f64> {
    rules
        .rules()
        .iter()
        .filter(|r| r.active)
        .map(|r| (r.id, 0.0))
        .collect()
}

fn zeroed_punishment_map(rules: &RuleSet) -> BTreeMap<u8, f64> {
    rules
        .punishments()
        .iter()
        .filter(|(_, p)| p.active)
        .map(|(&count, _)| (count, 0.0))
        .collect()
}

fn assemble(
    per_rule: BTreeMap<u32, f64>,
    per_punishment: BTreeMap<u8, f64>,
    no_win: f64,
    rules: &RuleSet,
    method: ReportMethod,
    sample_count: Option<u64>,
    draw_len: usize,
) -> ProbabilityReport {
    let mut rtp = 0.0;
    for rule in rules.rules() {
        if let Some(p) = per_rule.get(&rule.id) {
            rtp += p * rule.multiplier;
        }
    }
    for (count, punishment) in rules.punishments() {
        if let Some(p) = per_punishment.get(count) {
            rtp -= p * punishment.deduct_multiplier;
        }
    }

    ProbabilityReport {
        per_rule,
        per_punishment,
        no_win,
        rtp,
        method,
        sample_count,
        draw_len: draw_len as u8,
    }
}
