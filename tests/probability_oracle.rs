//! Cross-validation: Monte Carlo estimates must track exact enumeration
//!
//! For each configuration the Monte Carlo RTP at two million samples has to
//! land within half a percentage point of the exact RTP, and both reports
//! must carry a total probability mass of one.

use reward_engine::{
    Consecutiveness, MatchSpec, Punishment, Rule, RuleSet, SymbolDef, WeightTable,
    compute_exact, compute_monte_carlo, standard_icons, STANDARD_CITATION,
};

const SAMPLES: u64 = 2_000_000;
const RTP_TOLERANCE: f64 = 0.005; // half a percentage point
const DRAW_LEN: usize = 4;

fn rule(id: u32, priority: i32, spec: MatchSpec, mode: Consecutiveness, multiplier: f64) -> Rule {
    Rule {
        id,
        name: format!("rule-{id}"),
        priority,
        spec,
        consecutiveness: mode,
        multiplier,
        grants_free_spin: false,
        active: true,
    }
}

fn punishment(citation_count: u8, deduct: f64) -> Punishment {
    Punishment {
        citation_count,
        deduct_multiplier: deduct,
        ban_hours: 24,
        active: true,
    }
}

fn quad_table(config_id: u32, weights: [u32; 4]) -> WeightTable {
    let symbols = vec![
        SymbolDef::new(1, "A", weights[0]),
        SymbolDef::new(2, "B", weights[1]),
        SymbolDef::new(3, "C", weights[2]),
        SymbolDef::new(4, "D", weights[3]),
    ];
    WeightTable::new(config_id, 1, symbols, 4).unwrap()
}

fn assert_engines_agree(table: &WeightTable, rules: &RuleSet, seed: u64) {
    let exact = compute_exact(table, rules, DRAW_LEN).unwrap();
    let mc = compute_monte_carlo(table, rules, DRAW_LEN, SAMPLES, Some(seed)).unwrap();

    assert!((exact.total_mass() - 1.0).abs() < 1e-9);
    assert!((mc.total_mass() - 1.0).abs() < 1e-9);
    assert!(exact.rtp.is_finite() && mc.rtp.is_finite());

    let diff = (exact.rtp - mc.rtp).abs();
    assert!(
        diff < RTP_TOLERANCE,
        "RTP divergence {diff} (exact {}, monte carlo {})",
        exact.rtp,
        mc.rtp
    );

    for (id, p_exact) in &exact.per_rule {
        let p_mc = mc.per_rule[id];
        assert!(
            (p_exact - p_mc).abs() < RTP_TOLERANCE,
            "rule {id} probability divergence: exact {p_exact}, monte carlo {p_mc}"
        );
    }
    for (count, p_exact) in &exact.per_punishment {
        let p_mc = mc.per_punishment[count];
        assert!((p_exact - p_mc).abs() < RTP_TOLERANCE);
    }
}

#[test]
fn equal_weights_configuration() {
    let table = quad_table(1, [250, 250, 250, 250]);
    let rules = RuleSet::new(
        1,
        1,
        vec![
            rule(
                1,
                100,
                MatchSpec::Pattern {
                    pattern: "AAAA".into(),
                },
                Consecutiveness::Lenient,
                32.0,
            ),
            rule(
                2,
                50,
                MatchSpec::Count {
                    symbol: None,
                    count: 3,
                },
                Consecutiveness::Lenient,
                4.0,
            ),
        ],
        vec![punishment(4, 2.0)],
    )
    .unwrap();
    assert_engines_agree(&table, &rules, 0xA1);
}

#[test]
fn skewed_weights_configuration() {
    let table = quad_table(2, [100, 100, 100, 525]);
    let rules = RuleSet::new(
        2,
        1,
        vec![
            rule(
                1,
                100,
                MatchSpec::Pattern {
                    pattern: "AAAA".into(),
                },
                Consecutiveness::Lenient,
                64.0,
            ),
            rule(
                2,
                50,
                MatchSpec::Count {
                    symbol: Some(1),
                    count: 3,
                },
                Consecutiveness::Lenient,
                8.0,
            ),
        ],
        vec![punishment(4, 2.5)],
    )
    .unwrap();
    assert_engines_agree(&table, &rules, 0xB2);
}

#[test]
fn punishment_heavy_configuration() {
    let table = quad_table(3, [150, 150, 150, 400]);
    let rules = RuleSet::new(
        3,
        1,
        vec![rule(
            1,
            10,
            MatchSpec::Count {
                symbol: Some(1),
                count: 2,
            },
            Consecutiveness::Lenient,
            2.0,
        )],
        vec![punishment(2, 0.5), punishment(3, 1.5), punishment(4, 3.0)],
    )
    .unwrap();
    assert_engines_agree(&table, &rules, 0xC3);
}

#[test]
fn strict_pattern_configuration() {
    let table = quad_table(4, [200, 200, 300, 125]);
    let rules = RuleSet::new(
        4,
        1,
        vec![
            rule(
                1,
                100,
                MatchSpec::Pattern {
                    pattern: "AAA".into(),
                },
                Consecutiveness::Strict,
                12.0,
            ),
            rule(
                2,
                50,
                MatchSpec::Pattern {
                    pattern: "AAB".into(),
                },
                Consecutiveness::Strict,
                3.0,
            ),
        ],
        vec![punishment(4, 1.0)],
    )
    .unwrap();
    assert_engines_agree(&table, &rules, 0xD4);
}

#[test]
fn symbol_set_configuration_on_full_alphabet() {
    let table = WeightTable::new(5, 1, standard_icons(), STANDARD_CITATION).unwrap();
    let rules = RuleSet::new(
        5,
        1,
        vec![
            rule(
                1,
                100,
                MatchSpec::SymbolSet {
                    symbols: vec![1, 2, 3],
                },
                Consecutiveness::Lenient,
                20.0,
            ),
            rule(
                2,
                50,
                MatchSpec::SymbolSet {
                    symbols: vec![5, 5],
                },
                Consecutiveness::Strict,
                2.0,
            ),
        ],
        vec![punishment(3, 1.0), punishment(4, 4.0)],
    )
    .unwrap();
    assert_engines_agree(&table, &rules, 0xE5);
}
