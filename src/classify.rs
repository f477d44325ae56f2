//! Outcome classification against a rule set
//!
//! Pure functions: no RNG, no shared state. The same outcome, rule set, and
//! weight table always produce the same result. Win rules are scanned in
//! priority order and the first match is authoritative; the punishment
//! branch is consulted only when no win rule fired.
//!
//! Pattern letters index the weight table's alphabet: `A` is the first
//! symbol, `B` the second, and so on. "AAAA" is four of the first symbol,
//! "AAB" two of the first plus one of the second. A letter past the end of
//! the alphabet never matches.

use serde::{Deserialize, Serialize};

use crate::rules::{Consecutiveness, MatchSpec, Rule, RuleSet};
use crate::symbols::{SymbolId, WeightTable};

/// Resolution of one drawn outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Winning rule id, if any
    pub matched_rule: Option<u32>,
    /// Applied punishment's citation count, if any
    pub punishment: Option<u8>,
    /// Signed payout multiplier (negative for punishments, 0 for no win)
    pub multiplier: f64,
    /// Bonus spin granted by the matched rule
    pub free_spin_granted: bool,
    /// Ban duration from the applied punishment (for the session layer)
    pub ban_hours: u32,
}

impl ClassificationResult {
    /// The "nothing happened" result
    pub fn no_win() -> Self {
        Self {
            matched_rule: None,
            punishment: None,
            multiplier: 0.0,
            free_spin_granted: false,
            ban_hours: 0,
        }
    }

    /// Did a win rule fire?
    pub fn is_win(&self) -> bool {
        self.matched_rule.is_some()
    }

    /// Did a punishment apply?
    pub fn is_punishment(&self) -> bool {
        self.punishment.is_some()
    }
}

/// Classify an outcome using each rule's own consecutiveness mode
pub fn classify(
    outcome: &[SymbolId],
    rules: &RuleSet,
    table: &WeightTable,
) -> ClassificationResult {
    classify_with_mode(outcome, rules, table, None)
}

/// Classify with an optional game-mode override of every rule's
/// consecutiveness (the "supreme" mode plays the same schemes strictly)
pub fn classify_with_mode(
    outcome: &[SymbolId],
    rules: &RuleSet,
    table: &WeightTable,
    mode_override: Option<Consecutiveness>,
) -> ClassificationResult {
    for rule in rules.rules().iter().filter(|r| r.active) {
        let mode = mode_override.unwrap_or(rule.consecutiveness);
        if rule_matches(outcome, rule, table, mode) {
            return ClassificationResult {
                matched_rule: Some(rule.id),
                punishment: None,
                multiplier: rule.multiplier,
                free_spin_granted: rule.grants_free_spin,
                ban_hours: 0,
            };
        }
    }

    // Exact-count lookup: the observed count, not "at least"
    let citation = table.citation_symbol();
    let citations = outcome.iter().filter(|&&s| s == citation).count() as u8;
    if citations > 0 {
        if let Some(punishment) = rules.punishment_for(citations) {
            return ClassificationResult {
                matched_rule: None,
                punishment: Some(citations),
                multiplier: -punishment.deduct_multiplier,
                free_spin_granted: false,
                ban_hours: punishment.ban_hours,
            };
        }
    }

    ClassificationResult::no_win()
}

fn rule_matches(
    outcome: &[SymbolId],
    rule: &Rule,
    table: &WeightTable,
    mode: Consecutiveness,
) -> bool {
    match &rule.spec {
        MatchSpec::Pattern { pattern } => {
            let Some(wanted) = resolve_pattern(pattern, table) else {
                return false;
            };
            match mode {
                Consecutiveness::Strict => sequence_in_window(outcome, &wanted),
                Consecutiveness::Lenient => multiset_contains(outcome, &wanted),
            }
        }
        MatchSpec::Count { symbol, count } => {
            let needed = usize::from(*count);
            match symbol {
                Some(s) => outcome.iter().filter(|&&x| x == *s).count() >= needed,
                None => symbol_counts(outcome).iter().any(|&(_, n)| n >= needed),
            }
        }
        MatchSpec::SymbolSet { symbols } => match mode {
            Consecutiveness::Strict => multiset_in_window(outcome, symbols),
            Consecutiveness::Lenient => multiset_contains(outcome, symbols),
        },
    }
}

/// Map pattern letters onto the alphabet (A = first symbol, ...).
/// `None` when a letter falls outside the alphabet.
fn resolve_pattern(pattern: &str, table: &WeightTable) -> Option<Vec<SymbolId>> {
    pattern
        .chars()
        .map(|c| {
            let index = (c.to_ascii_uppercase() as usize).checked_sub('A' as usize)?;
            table.symbols().get(index).map(|s| s.id)
        })
        .collect()
}

/// Strict pattern: the resolved sequence fills some contiguous window
fn sequence_in_window(outcome: &[SymbolId], wanted: &[SymbolId]) -> bool {
    wanted.len() <= outcome.len() && outcome.windows(wanted.len()).any(|w| w == wanted)
}

/// Strict symbol-set: the required multiset fills some contiguous window,
/// order-insensitive within the window
fn multiset_in_window(outcome: &[SymbolId], required: &[SymbolId]) -> bool {
    let len = required.len();
    if len > outcome.len() {
        return false;
    }
    let mut wanted = required.to_vec();
    wanted.sort_unstable();
    outcome.windows(len).any(|window| {
        let mut got = window.to_vec();
        got.sort_unstable();
        got == wanted
    })
}

fn multiset_contains(outcome: &[SymbolId], required: &[SymbolId]) -> bool {
    let mut counts = symbol_counts(outcome);
    for &sym in required {
        match counts.iter_mut().find(|(s, _)| *s == sym) {
            Some((_, n)) if *n > 0 => *n -= 1,
            _ => return false,
        }
    }
    true
}

fn symbol_counts(outcome: &[SymbolId]) -> Vec<(SymbolId, usize)> {
    let mut counts: Vec<(SymbolId, usize)> = Vec::new();
    for &sym in outcome {
        match counts.iter_mut().find(|(s, _)| *s == sym) {
            Some((_, n)) => *n += 1,
            None => counts.push((sym, 1)),
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::*;
    use crate::rules::{Punishment, RuleSet};
    use crate::symbols::SymbolDef;

    const CITATION: SymbolId = 10;

    /// Ten symbols, ids 1..=10, so letter A resolves to id 1, B to id 2, ...
    /// Id 10 (letter J) is the citation marker.
    fn table() -> WeightTable {
        let symbols = (1..=10)
            .map(|i| SymbolDef::new(i, format!("S{i}"), 10))
            .collect();
        WeightTable::new(1, 1, symbols, CITATION).unwrap()
    }

    fn scheme(rules: Vec<Rule>, punishments: Vec<Punishment>) -> RuleSet {
        RuleSet::new(1, 1, rules, punishments).unwrap()
    }

    #[test]
    fn test_first_match_by_priority_wins() {
        // Both rules match four of the first symbol; the higher priority
        // pattern rule is chosen.
        let set = scheme(
            vec![
                count_rule(2, 50, Some(1), 3, 8.0),
                pattern_rule(1, 100, "AAAA", 256.0),
            ],
            vec![],
        );
        let result = classify(&[1, 1, 1, 1], &set, &table());
        assert_eq!(result.matched_rule, Some(1));
        assert_eq!(result.multiplier, 256.0);
    }

    #[test]
    fn test_priority_tie_breaks_by_lower_id() {
        let set = scheme(
            vec![count_rule(7, 50, Some(1), 2, 3.0), count_rule(4, 50, Some(1), 2, 5.0)],
            vec![],
        );
        let result = classify(&[1, 1, 2, 3], &set, &table());
        assert_eq!(result.matched_rule, Some(4));
    }

    #[test]
    fn test_strict_rejects_gapped_three_of_a_kind() {
        let mut rule = pattern_rule(1, 10, "AAA", 8.0);
        rule.consecutiveness = Consecutiveness::Strict;
        let set = scheme(vec![rule], vec![]);

        // 1,2,1,1: the three matching symbols are not contiguous
        assert!(!classify(&[1, 2, 1, 1], &set, &table()).is_win());
        // 2,1,1,1: contiguous run
        assert!(classify(&[2, 1, 1, 1], &set, &table()).is_win());
    }

    #[test]
    fn test_lenient_accepts_gapped_three_of_a_kind() {
        let set = scheme(vec![pattern_rule(1, 10, "AAA", 8.0)], vec![]);
        assert!(classify(&[1, 2, 1, 1], &set, &table()).is_win());
    }

    #[test]
    fn test_pattern_letters_are_anchored_to_the_alphabet() {
        let set = scheme(vec![pattern_rule(1, 10, "AAAA", 256.0)], vec![]);
        // Four of the first symbol matches
        assert!(classify(&[1, 1, 1, 1], &set, &table()).is_win());
        // Four of a *different* symbol does not: "AAAA" is not generic
        // four-of-a-kind.
        assert!(!classify(&[2, 2, 2, 2], &set, &table()).is_win());
    }

    #[test]
    fn test_mixed_pattern_strict_and_lenient() {
        // "AAB" resolves to [1, 1, 2]
        let mut strict = pattern_rule(1, 10, "AAB", 4.0);
        strict.consecutiveness = Consecutiveness::Strict;
        let set = scheme(vec![strict], vec![]);
        assert!(classify(&[5, 1, 1, 2], &set, &table()).is_win());
        assert!(!classify(&[2, 1, 1, 3], &set, &table()).is_win());

        let set = scheme(vec![pattern_rule(1, 10, "AAB", 4.0)], vec![]);
        assert!(classify(&[2, 1, 1, 3], &set, &table()).is_win());
        assert!(!classify(&[1, 1, 1, 1], &set, &table()).is_win()); // no B at all
    }

    #[test]
    fn test_pattern_letter_outside_alphabet_never_matches() {
        // Letter Z has no alphabet slot in a ten-symbol table
        let set = scheme(vec![pattern_rule(1, 10, "AAZ", 4.0)], vec![]);
        assert!(!classify(&[1, 1, 1, 1], &set, &table()).is_win());
    }

    #[test]
    fn test_count_rule_any_symbol() {
        let set = scheme(vec![count_rule(1, 10, None, 3, 2.0)], vec![]);
        assert!(classify(&[4, 7, 4, 4], &set, &table()).is_win());
        assert!(!classify(&[4, 7, 4, 2], &set, &table()).is_win());
    }

    #[test]
    fn test_symbol_set_subset_and_strict_window() {
        let lenient = symbol_set_rule(1, 10, vec![2, 5], Consecutiveness::Lenient);
        let set = scheme(vec![lenient], vec![]);
        assert!(classify(&[5, 1, 1, 2], &set, &table()).is_win());
        assert!(!classify(&[5, 1, 1, 5], &set, &table()).is_win());

        let strict = symbol_set_rule(2, 10, vec![2, 5], Consecutiveness::Strict);
        let set = scheme(vec![strict], vec![]);
        assert!(classify(&[1, 5, 2, 1], &set, &table()).is_win());
        assert!(!classify(&[5, 1, 1, 2], &set, &table()).is_win());
    }

    fn symbol_set_rule(
        id: u32,
        priority: i32,
        symbols: Vec<SymbolId>,
        mode: Consecutiveness,
    ) -> Rule {
        Rule {
            id,
            name: "set".into(),
            priority,
            spec: MatchSpec::SymbolSet { symbols },
            consecutiveness: mode,
            multiplier: 3.0,
            grants_free_spin: false,
            active: true,
        }
    }

    #[test]
    fn test_inactive_rule_skipped() {
        let mut rule = count_rule(1, 10, Some(1), 2, 3.0);
        rule.active = false;
        let set = scheme(vec![rule], vec![]);
        assert!(!classify(&[1, 1, 1, 1], &set, &table()).is_win());
    }

    #[test]
    fn test_punishment_exact_count_only() {
        let set = scheme(vec![], vec![punishment(4, 2.5, 48)]);

        let full = classify(&[10, 10, 10, 10], &set, &table());
        assert_eq!(full.punishment, Some(4));
        assert_eq!(full.multiplier, -2.5);
        assert_eq!(full.ban_hours, 48);

        // Three citations: not "at least", no punishment configured for 3
        let three = classify(&[10, 10, 10, 1], &set, &table());
        assert!(!three.is_punishment());
        assert_eq!(three, ClassificationResult::no_win());
    }

    #[test]
    fn test_win_suppresses_punishment() {
        // Four citations also satisfy the count rule; the win branch takes
        // precedence and the punishment never applies alongside it.
        let set = scheme(
            vec![count_rule(1, 10, Some(10), 4, 2.0)],
            vec![punishment(4, 2.5, 48)],
        );
        let result = classify(&[10, 10, 10, 10], &set, &table());
        assert!(result.is_win());
        assert!(!result.is_punishment());
    }

    #[test]
    fn test_classify_is_pure() {
        let set = scheme(
            vec![pattern_rule(1, 100, "AAAA", 256.0), count_rule(2, 50, Some(1), 3, 8.0)],
            vec![punishment(4, 2.5, 48)],
        );
        let outcome = [1, 4, 1, 1];
        assert_eq!(
            classify(&outcome, &set, &table()),
            classify(&outcome, &set, &table())
        );
    }

    #[test]
    fn test_mode_override_forces_strict() {
        let set = scheme(vec![pattern_rule(1, 10, "AAA", 8.0)], vec![]);
        let gapped = [1, 2, 1, 1];
        assert!(classify(&gapped, &set, &table()).is_win());
        let strict =
            classify_with_mode(&gapped, &set, &table(), Some(Consecutiveness::Strict));
        assert!(!strict.is_win());
    }

    #[test]
    fn test_free_spin_flag_propagates() {
        let mut rule = count_rule(1, 10, Some(1), 2, 3.0);
        rule.grants_free_spin = true;
        let set = scheme(vec![rule], vec![]);
        assert!(classify(&[1, 1, 2, 3], &set, &table()).free_spin_granted);
    }
}
