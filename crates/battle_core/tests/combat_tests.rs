//! Combat formula tests.
//!
//! These exercise the damage, healing and status-effect rules directly,
//! without a running battle.

use battle_core::combat::damage::{heal, mitigate, resolve_damage, DamageKind};
use battle_core::combat::effects::{
    apply_effect, recompute_stats, EffectKind, StatusEffect, MAX_STACKS,
};
use battle_core::combat::elemental::ElementalScaling;
use battle_core::components::Effects;
use battle_core::math::Fixed;
use battle_core::rng::ScriptedRolls;
use battle_core::stats::{StatKind, StatModifier, Stats};
use battle_test_utils::fixtures::{fixed, fixed_f, plain_stats};
use battle_test_utils::proptest::prelude::*;

// =============================================================================
// Damage
// =============================================================================

#[test]
fn test_unarmored_physical_hit_deals_full_damage() {
    let attacker = plain_stats(100, 50, 0);
    let defender = plain_stats(100, 10, 0);
    let result = resolve_damage(
        DamageKind::Physical,
        &attacker,
        &defender,
        Fixed::ONE,
        ElementalScaling::NEUTRAL,
        &mut ScriptedRolls::never(),
    );
    assert_eq!(result.damage, 50);
    assert!(!result.is_critical && !result.is_evaded && !result.is_blocked);
}

#[test]
fn test_hundred_armor_halves_damage() {
    let attacker = plain_stats(100, 100, 0);
    let defender = plain_stats(100, 10, 100);
    let result = resolve_damage(
        DamageKind::Physical,
        &attacker,
        &defender,
        Fixed::ONE,
        ElementalScaling::NEUTRAL,
        &mut ScriptedRolls::never(),
    );
    assert_eq!(result.damage, 50);
}

#[test]
fn test_true_damage_ignores_armor_and_rolls() {
    let attacker = plain_stats(100, 30, 0);
    let defender = plain_stats(100, 10, 500);
    let mut rolls = ScriptedRolls::new([Fixed::ZERO], Fixed::ZERO);
    let result = resolve_damage(
        DamageKind::True,
        &attacker,
        &defender,
        Fixed::ONE,
        ElementalScaling::NEUTRAL,
        &mut rolls,
    );
    assert_eq!(result.damage, 30);
    assert_eq!(rolls.remaining(), 1);
}

#[test]
fn test_dodged_hit_deals_nothing() {
    let attacker = plain_stats(100, 50, 0);
    let mut defender = plain_stats(100, 10, 0);
    defender.dodge_chance = fixed(1);
    let result = resolve_damage(
        DamageKind::Physical,
        &attacker,
        &defender,
        Fixed::ONE,
        ElementalScaling::NEUTRAL,
        &mut ScriptedRolls::always(),
    );
    assert!(result.is_evaded);
    assert_eq!(result.damage, 0);
}

// =============================================================================
// Healing
// =============================================================================

#[test]
fn test_heal_restores_missing_health() {
    let healer = Stats::default();
    let mut target = Stats::with_health(fixed(100));
    target.set_health(fixed(40));

    let result = heal(&healer, &target, fixed(40), Fixed::ONE, &mut ScriptedRolls::never());
    assert_eq!(result.amount, 40);
    target.heal(fixed(40));
    assert_eq!(target.health(), fixed(80));
}

#[test]
fn test_heal_scales_with_magic_power() {
    let mut healer = Stats::default();
    healer.magic_power = fixed(40);
    let mut target = Stats::with_health(fixed(100));
    target.set_health(fixed(10));

    let result = heal(&healer, &target, fixed(20), Fixed::ONE, &mut ScriptedRolls::never());
    assert_eq!(result.amount, 40);
    assert!(!result.is_critical);
}

#[test]
fn test_heal_never_overflows() {
    let healer = Stats::default();
    let mut target = Stats::with_health(fixed(100));
    target.set_health(fixed(90));

    let result = heal(&healer, &target, fixed(40), Fixed::ONE, &mut ScriptedRolls::never());
    assert_eq!(result.amount, 10);
}

// =============================================================================
// Status effects
// =============================================================================

fn sunder() -> StatusEffect {
    StatusEffect::new(
        "sunder",
        EffectKind::Debuff,
        vec![StatModifier::flat(StatKind::Armor, fixed(-5))],
        fixed(3),
    )
}

#[test]
fn test_stacks_cap_at_five() {
    let mut effects = Effects::default();
    for _ in 0..8 {
        apply_effect(&mut effects, sunder());
    }
    assert_eq!(effects.active.len(), 1);
    assert_eq!(effects.get("sunder").map(|e| e.stacks), Some(MAX_STACKS));
}

const SHIFTED_STATS: [StatKind; 4] = [
    StatKind::Armor,
    StatKind::CritChance,
    StatKind::AttackDamage,
    StatKind::DodgeChance,
];

fn shift(index: usize, stat: usize, hundredths: i32, stacks: u8) -> StatusEffect {
    let mut effect = StatusEffect::new(
        format!("shift_{index}"),
        EffectKind::Debuff,
        vec![StatModifier::flat(SHIFTED_STATS[stat], fixed(hundredths) / fixed(100))],
        fixed(5),
    );
    effect.stacks = stacks;
    effect
}

fn arb_effects() -> impl Strategy<Value = (Vec<StatusEffect>, Vec<StatusEffect>)> {
    prop::collection::vec((0..SHIFTED_STATS.len(), -5_000i32..5_000, 1u8..=MAX_STACKS), 1..8)
        .prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(index, (stat, amount, stacks))| shift(index, stat, amount, stacks))
                .collect::<Vec<_>>()
        })
        .prop_flat_map(|effects| (Just(effects.clone()), Just(effects).prop_shuffle()))
}

#[test]
fn test_opposing_effects_cancel_in_any_order() {
    let mut base = Stats::default();
    base.armor = fixed(10);
    let sunder = StatusEffect::new(
        "sunder",
        EffectKind::Debuff,
        vec![StatModifier::flat(StatKind::Armor, fixed(-20))],
        fixed(3),
    );
    let guard = StatusEffect::new(
        "guard",
        EffectKind::Buff,
        vec![StatModifier::flat(StatKind::Armor, fixed(20))],
        fixed(3),
    );

    let first = recompute_stats(&base, &[], &[sunder.clone(), guard.clone()], &base);
    let second = recompute_stats(&base, &[], &[guard, sunder], &base);
    assert_eq!(first.armor, fixed(10));
    assert_eq!(first, second);
}

// =============================================================================
// Invariants
// =============================================================================

proptest! {
    #[test]
    fn prop_mitigation_decreases_with_defense(
        base in 1i32..1_000,
        low in 0i32..500,
        extra in 1i32..500,
    ) {
        let weaker = mitigate(fixed(base), fixed(low));
        let stronger = mitigate(fixed(base), fixed(low + extra));
        prop_assert!(stronger < weaker);
    }

    #[test]
    fn prop_landed_hit_deals_at_least_one(attack in 1i32..200, armor in 0i32..10_000) {
        let attacker = plain_stats(100, attack, 0);
        let defender = plain_stats(100, 10, armor);
        let result = resolve_damage(
            DamageKind::Physical,
            &attacker,
            &defender,
            Fixed::ONE,
            ElementalScaling::NEUTRAL,
            &mut ScriptedRolls::never(),
        );
        prop_assert!(result.damage >= 1);
    }

    #[test]
    fn prop_health_stays_in_bounds(
        changes in prop::collection::vec((any::<bool>(), 0i32..300), 0..40),
    ) {
        let mut stats = Stats::with_health(fixed(150));
        for (is_damage, amount) in changes {
            if is_damage {
                stats.apply_damage(fixed(amount));
            } else {
                stats.heal(fixed(amount));
            }
            prop_assert!(stats.health() >= Fixed::ZERO);
            prop_assert!(stats.health() <= stats.max_health);
        }
    }

    #[test]
    fn prop_stacks_never_exceed_cap(applications in 1usize..30) {
        let mut effects = Effects::default();
        for _ in 0..applications {
            apply_effect(&mut effects, sunder());
        }
        let stacks = effects.get("sunder").map_or(0, |e| e.stacks);
        prop_assert!((1..=MAX_STACKS).contains(&stacks));
    }

    #[test]
    fn prop_recompute_ignores_effect_order((effects, shuffled) in arb_effects()) {
        let mut base = Stats::default();
        base.armor = fixed(10);
        base.crit_chance = fixed_f(0.25);
        let derived = recompute_stats(&base, &[], &effects, &base);
        let reordered = recompute_stats(&base, &[], &shuffled, &base);
        prop_assert_eq!(derived, reordered);
    }
}
