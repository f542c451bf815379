//! Battle resolution integration tests

use idle_engine::core::config::BattleConfig;
use idle_engine::economy::ledger::Cost;
use idle_engine::simulation::battle::{casualties, loot, resolve_battle};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[test]
fn test_same_seed_same_outcome() {
    let config = BattleConfig::default();
    let a = resolve_battle(100.0, 80.0, &config, &mut ChaCha8Rng::seed_from_u64(42));
    let b = resolve_battle(100.0, 80.0, &config, &mut ChaCha8Rng::seed_from_u64(42));
    assert_eq!(a, b);
    assert!((a.advantage - 100.0 / 180.0).abs() < 1e-12);
}

#[test]
fn test_overwhelming_power_always_wins() {
    let config = BattleConfig::default();
    for seed in 0..200 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        assert!(resolve_battle(1_000_000.0, 1.0, &config, &mut rng).victory);
        assert!(!resolve_battle(1.0, 1_000_000.0, &config, &mut rng).victory);
    }
}

#[test]
fn test_even_fight_goes_both_ways() {
    let config = BattleConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let wins = (0..500)
        .filter(|_| resolve_battle(100.0, 100.0, &config, &mut rng).victory)
        .count();
    assert!(wins > 150 && wins < 350, "wins = {}", wins);
}

#[test]
fn test_loot_uses_per_resource_shares() {
    let holdings = Cost::new().with("gold", 850).with("food", 620).with("wood", 3);
    let taken = loot(&holdings, &BattleConfig::default());
    assert_eq!(taken.get("gold"), 255);
    assert_eq!(taken.get("food"), 124);
    // 0.6 floors to nothing
    assert_eq!(taken.get("wood"), 0);
}

proptest! {
    #[test]
    fn prop_loser_bleeds_more(attacker in 1.0f64..10_000.0, defender in 1.0f64..10_000.0, seed in any::<u64>()) {
        let config = BattleConfig::default();
        let report = resolve_battle(attacker, defender, &config, &mut ChaCha8Rng::seed_from_u64(seed));

        let (winner, loser) = if report.victory {
            (report.attacker_attrition, report.defender_attrition)
        } else {
            (report.defender_attrition, report.attacker_attrition)
        };
        prop_assert!(winner >= config.winner_attrition_min && winner < config.winner_attrition_max);
        prop_assert!(loser >= config.loser_attrition_min && loser < config.loser_attrition_max);
        prop_assert!(report.advantage > 0.0 && report.advantage < 1.0);
    }

    #[test]
    fn prop_casualties_never_exceed_force(force in 0usize..1_000, attrition in 0.0f64..2.0) {
        prop_assert!(casualties(force, attrition) <= force);
    }
}
