//! Reward rules, punishments, and validated rule sets (schemes)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::symbols::SymbolId;

/// How pattern positions may be arranged inside an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consecutiveness {
    /// Matching positions must be contiguous
    Strict,
    /// Any positions qualify, adjacency ignored
    Lenient,
}

/// What an outcome must contain for a rule to fire.
///
/// Decoded from the admin layer's loose payloads (pattern strings, JSON
/// symbol arrays) into a closed variant, validated once at rule-set
/// construction so the classify path never re-parses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchSpec {
    /// Pattern string over letters anchored to the weight table's
    /// alphabet order ("A" = first symbol, "B" = second, ...); "AAAA" is
    /// four of the first symbol, "AAB" two of the first plus one of the
    /// second.
    Pattern { pattern: String },
    /// At least `count` occurrences of `symbol`, or of any single symbol
    /// when unspecified. Position-independent.
    Count {
        symbol: Option<SymbolId>,
        count: u8,
    },
    /// The outcome multiset must contain this required multiset
    SymbolSet { symbols: Vec<SymbolId> },
}

/// An admin-configured win rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Unique rule ID within the scheme
    pub id: u32,
    /// Display name
    pub name: String,
    /// Higher priority evaluates first; ties break by ascending id
    pub priority: i32,
    /// Match requirement
    pub spec: MatchSpec,
    /// Positional strictness for pattern / symbol-set specs
    pub consecutiveness: Consecutiveness,
    /// Payout multiplier (>= 0)
    pub multiplier: f64,
    /// Grants a bonus spin on match
    pub grants_free_spin: bool,
    /// Inactive rules are skipped during classification
    pub active: bool,
}

/// Negative-payout rule keyed to the exact citation-symbol count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Punishment {
    /// Exact number of citation symbols in the outcome (1..=K)
    pub citation_count: u8,
    /// Deduction multiplier, applied as a negative payout
    pub deduct_multiplier: f64,
    /// Ban duration handed back to the session layer
    pub ban_hours: u32,
    /// Inactive punishments are skipped
    pub active: bool,
}

/// Immutable, validated rule set for one scheme version.
///
/// Rules are stored pre-sorted (priority descending, id ascending) so
/// classification is a single in-order scan. Construction validates every
/// rule and punishment once; malformed payloads never reach the hot path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    scheme_id: u32,
    version: u64,
    rules: Vec<Rule>,
    punishments: BTreeMap<u8, Punishment>,
}

impl RuleSet {
    /// Build a validated rule set, failing fast with `InvalidRule`
    pub fn new(
        scheme_id: u32,
        version: u64,
        mut rules: Vec<Rule>,
        punishments: Vec<Punishment>,
    ) -> Result<Self, EngineError> {
        for rule in &rules {
            validate_rule(rule)?;
        }
        for (i, rule) in rules.iter().enumerate() {
            if rules[..i].iter().any(|r| r.id == rule.id) {
                return Err(EngineError::InvalidRule(format!(
                    "duplicate rule id {}",
                    rule.id
                )));
            }
        }
        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));

        let mut by_count = BTreeMap::new();
        for punishment in punishments {
            validate_punishment(&punishment)?;
            let count = punishment.citation_count;
            if by_count.insert(count, punishment).is_some() {
                return Err(EngineError::InvalidRule(format!(
                    "duplicate punishment for citation count {count}"
                )));
            }
        }

        Ok(Self {
            scheme_id,
            version,
            rules,
            punishments: by_count,
        })
    }

    /// Stable scheme id (cache keying)
    pub fn scheme_id(&self) -> u32 {
        self.scheme_id
    }

    /// Scheme version (bumped on every admin edit)
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Rules in evaluation order (priority descending, id ascending)
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// All configured punishments, keyed by citation count
    pub fn punishments(&self) -> &BTreeMap<u8, Punishment> {
        &self.punishments
    }

    /// Active punishment for an exact citation count, if any
    pub fn punishment_for(&self, citation_count: u8) -> Option<&Punishment> {
        self.punishments
            .get(&citation_count)
            .filter(|p| p.active)
    }
}

fn validate_rule(rule: &Rule) -> Result<(), EngineError> {
    if !rule.multiplier.is_finite() || rule.multiplier < 0.0 {
        return Err(EngineError::InvalidRule(format!(
            "rule {} has invalid multiplier {}",
            rule.id, rule.multiplier
        )));
    }
    match &rule.spec {
        MatchSpec::Pattern { pattern } => {
            if pattern.is_empty() {
                return Err(EngineError::InvalidRule(format!(
                    "rule {} has an empty pattern",
                    rule.id
                )));
            }
            if !pattern.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(EngineError::InvalidRule(format!(
                    "rule {} pattern {:?} contains non-letter characters",
                    rule.id, pattern
                )));
            }
        }
        MatchSpec::Count { count, .. } => {
            if *count == 0 {
                return Err(EngineError::InvalidRule(format!(
                    "rule {} requires a count of at least 1",
                    rule.id
                )));
            }
        }
        MatchSpec::SymbolSet { symbols } => {
            if symbols.is_empty() {
                return Err(EngineError::InvalidRule(format!(
                    "rule {} has an empty required symbol set",
                    rule.id
                )));
            }
        }
    }
    Ok(())
}

fn validate_punishment(punishment: &Punishment) -> Result<(), EngineError> {
    if punishment.citation_count == 0 {
        return Err(EngineError::InvalidRule(
            "punishment requires a citation count of at least 1".into(),
        ));
    }
    if !punishment.deduct_multiplier.is_finite() || punishment.deduct_multiplier < 0.0 {
        return Err(EngineError::InvalidRule(format!(
            "punishment for count {} has invalid deduct multiplier {}",
            punishment.citation_count, punishment.deduct_multiplier
        )));
    }
    Ok(())
}
