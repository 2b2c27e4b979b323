//! Damage and healing formulas.
//!
//! Pure functions over stat snapshots. Randomness comes only from the
//! [`RollSource`] passed in, and the number of rolls drawn per call is
//! fixed by the damage kind and outcome:
//!
//! - physical: dodge, then crit and block unless evaded
//! - magical: crit
//! - true: none
//! - heal: crit

use serde::{Deserialize, Serialize};

use crate::combat::elemental::{ElementalScaling, Reaction};
use crate::math::{floor_points, percent, Fixed};
use crate::rng::RollSource;
use crate::stats::Stats;

/// Damage category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageKind {
    /// Attack damage against armor. Can be dodged, blocked and crit.
    Physical,
    /// Magic power against magic resist. Can crit, never evaded.
    Magical,
    /// Unmitigated. Cannot crit or be evaded.
    True,
}

impl DamageKind {
    /// Lowercase label for log text.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            DamageKind::Physical => "physical",
            DamageKind::Magical => "magical",
            DamageKind::True => "true",
        }
    }
}

/// Outcome of one hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageResult {
    /// Whole points of damage dealt.
    pub damage: u32,
    /// Crit multiplier applied.
    pub is_critical: bool,
    /// Hit was dodged; `damage` is zero.
    pub is_evaded: bool,
    /// Hit was blocked and halved.
    pub is_blocked: bool,
    /// Damage category.
    pub kind: DamageKind,
    /// Elemental reaction that fired.
    pub reaction: Option<Reaction>,
    /// Human-readable summary for the battle log.
    pub description: String,
}

/// Outcome of one heal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealResult {
    /// Whole points restored, never above the target's missing health.
    pub amount: u32,
    /// Crit multiplier applied.
    pub is_critical: bool,
    /// Human-readable summary for the battle log.
    pub description: String,
}

/// Pre-rounding damage with its roll flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageRoll {
    /// Damage before rounding.
    pub amount: Fixed,
    /// Crit multiplier applied.
    pub is_critical: bool,
    /// Hit was dodged.
    pub is_evaded: bool,
    /// Hit was blocked.
    pub is_blocked: bool,
    /// Damage category.
    pub kind: DamageKind,
}

/// Apply the defense curve: `base * 100 / (100 + defense)`.
///
/// Strictly decreasing in `defense` for positive `base`.
#[must_use]
pub fn mitigate(base: Fixed, defense: Fixed) -> Fixed {
    let hundred = Fixed::from_num(100);
    base.saturating_mul(hundred) / hundred.saturating_add(defense.max(Fixed::ZERO))
}

/// Roll a physical hit.
pub fn physical_damage<R>(
    attacker: &Stats,
    defender: &Stats,
    multiplier: Fixed,
    rolls: &mut R,
) -> DamageRoll
where
    R: RollSource + ?Sized,
{
    if rolls.roll() < defender.dodge_chance {
        return DamageRoll {
            amount: Fixed::ZERO,
            is_critical: false,
            is_evaded: true,
            is_blocked: false,
            kind: DamageKind::Physical,
        };
    }

    let base = attacker.attack_damage.saturating_mul(multiplier);
    let mut amount = mitigate(base, defender.armor);

    let is_critical = rolls.roll() < attacker.crit_chance;
    if is_critical {
        amount = amount.saturating_mul(attacker.crit_damage);
    }

    let is_blocked = rolls.roll() < defender.block_chance;
    if is_blocked {
        amount /= Fixed::from_num(2);
    }

    DamageRoll {
        amount,
        is_critical,
        is_evaded: false,
        is_blocked,
        kind: DamageKind::Physical,
    }
}

/// Roll a magical hit.
pub fn magical_damage<R>(
    attacker: &Stats,
    defender: &Stats,
    multiplier: Fixed,
    rolls: &mut R,
) -> DamageRoll
where
    R: RollSource + ?Sized,
{
    let base = attacker.magic_power.saturating_mul(multiplier);
    let mut amount = mitigate(base, defender.magic_resist);

    let is_critical = rolls.roll() < attacker.crit_chance;
    if is_critical {
        amount = amount.saturating_mul(attacker.crit_damage);
    }

    DamageRoll {
        amount,
        is_critical,
        is_evaded: false,
        is_blocked: false,
        kind: DamageKind::Magical,
    }
}

/// Unmitigated damage. Draws no rolls.
#[must_use]
pub fn true_damage(attacker: &Stats, multiplier: Fixed) -> DamageRoll {
    DamageRoll {
        amount: attacker.attack_damage.saturating_mul(multiplier),
        is_critical: false,
        is_evaded: false,
        is_blocked: false,
        kind: DamageKind::True,
    }
}

impl DamageRoll {
    /// Scale by an elemental multiplier. True damage ignores elements.
    #[must_use]
    pub fn with_scaling(mut self, scaling: ElementalScaling) -> (Self, Option<Reaction>) {
        if self.kind == DamageKind::True || self.is_evaded {
            return (self, None);
        }
        self.amount = self.amount.saturating_mul(scaling.multiplier);
        (self, scaling.reaction)
    }

    /// Round to whole points and describe the hit.
    #[must_use]
    pub fn finish(self, reaction: Option<Reaction>) -> DamageResult {
        let damage = if self.is_evaded {
            0
        } else if self.amount > Fixed::ZERO {
            floor_points(self.amount).max(1)
        } else {
            0
        };

        let description = if self.is_evaded {
            "evaded".to_string()
        } else {
            let mut text = format!("{damage} {} damage", self.kind.label());
            if self.is_critical {
                text.push_str(", critical");
            }
            if self.is_blocked {
                text.push_str(", blocked");
            }
            if let Some(reaction) = reaction {
                text.push_str(", ");
                text.push_str(reaction.id());
            }
            text
        };

        DamageResult {
            damage,
            is_critical: self.is_critical,
            is_evaded: self.is_evaded,
            is_blocked: self.is_blocked,
            kind: self.kind,
            reaction,
            description,
        }
    }
}

/// Roll, scale and round a hit of any kind.
pub fn resolve_damage<R>(
    kind: DamageKind,
    attacker: &Stats,
    defender: &Stats,
    multiplier: Fixed,
    scaling: ElementalScaling,
    rolls: &mut R,
) -> DamageResult
where
    R: RollSource + ?Sized,
{
    let roll = match kind {
        DamageKind::Physical => physical_damage(attacker, defender, multiplier, rolls),
        DamageKind::Magical => magical_damage(attacker, defender, multiplier, rolls),
        DamageKind::True => true_damage(attacker, multiplier),
    };
    let (roll, reaction) = roll.with_scaling(scaling);
    let result = roll.finish(reaction);
    tracing::trace!(
        damage = result.damage,
        crit = result.is_critical,
        evaded = result.is_evaded,
        "Resolved {} hit",
        kind.label()
    );
    result
}

/// Compute a heal of `amount + 0.5 * magic_power`, times `coefficient`.
///
/// Crits multiply by 1.5 using the healer's crit chance. The result never
/// exceeds the target's missing health.
pub fn heal<R>(
    healer: &Stats,
    target: &Stats,
    amount: Fixed,
    coefficient: Fixed,
    rolls: &mut R,
) -> HealResult
where
    R: RollSource + ?Sized,
{
    let mut total = amount
        .saturating_add(healer.magic_power.saturating_mul(percent(50)))
        .saturating_mul(coefficient);

    let is_critical = rolls.roll() < healer.crit_chance;
    if is_critical {
        total = total.saturating_mul(percent(150));
    }

    let restored = floor_points(total.min(target.missing_health()));
    let description = if is_critical {
        format!("healed {restored}, critical")
    } else {
        format!("healed {restored}")
    };

    HealResult {
        amount: restored,
        is_critical,
        description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedRolls;

    fn attacker(attack: i32) -> Stats {
        let mut stats = Stats::default();
        stats.attack_damage = Fixed::from_num(attack);
        stats
    }

    fn defender(armor: i32) -> Stats {
        let mut stats = Stats::with_health(Fixed::from_num(500));
        stats.armor = Fixed::from_num(armor);
        stats
    }

    #[test]
    fn test_physical_mitigation() {
        let mut rolls = ScriptedRolls::never();
        let result = resolve_damage(
            DamageKind::Physical,
            &attacker(100),
            &defender(100),
            Fixed::ONE,
            ElementalScaling::NEUTRAL,
            &mut rolls,
        );
        assert_eq!(result.damage, 50);
        assert!(!result.is_critical && !result.is_evaded && !result.is_blocked);
    }

    #[test]
    fn test_huge_multiplier_saturates() {
        let mut rolls = ScriptedRolls::never();
        let result = resolve_damage(
            DamageKind::True,
            &attacker(50_000_000),
            &defender(0),
            Fixed::from_num(1_000),
            ElementalScaling::NEUTRAL,
            &mut rolls,
        );
        assert_eq!(result.damage, floor_points(Fixed::MAX));
    }

    #[test]
    fn test_mitigation_strictly_decreasing() {
        let base = Fixed::from_num(100);
        let mut previous = mitigate(base, Fixed::ZERO);
        for armor in 1..300 {
            let next = mitigate(base, Fixed::from_num(armor));
            assert!(next < previous, "armor {armor}");
            previous = next;
        }
    }

    #[test]
    fn test_dodge_short_circuits_before_crit() {
        let mut crit_attacker = attacker(100);
        crit_attacker.crit_chance = Fixed::ONE;
        let mut dodger = defender(0);
        dodger.dodge_chance = percent(50);

        let mut rolls = ScriptedRolls::new([Fixed::ZERO], Fixed::ZERO);
        let roll = physical_damage(&crit_attacker, &dodger, Fixed::ONE, &mut rolls);
        assert!(roll.is_evaded);
        assert!(!roll.is_critical);
        assert_eq!(roll.finish(None).damage, 0);
    }

    #[test]
    fn test_crit_multiplies_after_mitigation() {
        let mut crit_attacker = attacker(100);
        crit_attacker.crit_chance = percent(50);

        // dodge misses, crit hits, block misses
        let mut rolls = ScriptedRolls::new([Fixed::ONE - Fixed::DELTA, Fixed::ZERO], Fixed::ONE);
        let result = resolve_damage(
            DamageKind::Physical,
            &crit_attacker,
            &defender(100),
            Fixed::ONE,
            ElementalScaling::NEUTRAL,
            &mut rolls,
        );
        assert!(result.is_critical);
        assert_eq!(result.damage, 75);
    }

    #[test]
    fn test_block_halves_physical() {
        let mut blocker = defender(0);
        blocker.block_chance = Fixed::ONE;
        let mut rolls = ScriptedRolls::never();
        let result = resolve_damage(
            DamageKind::Physical,
            &attacker(40),
            &blocker,
            Fixed::ONE,
            ElementalScaling::NEUTRAL,
            &mut rolls,
        );
        assert!(result.is_blocked);
        assert_eq!(result.damage, 20);
    }

    #[test]
    fn test_magic_is_never_evaded() {
        let mut caster = Stats::default();
        caster.magic_power = Fixed::from_num(60);
        let mut target = defender(0);
        target.dodge_chance = Fixed::ONE;
        target.magic_resist = Fixed::from_num(50);

        let mut rolls = ScriptedRolls::always();
        let roll = magical_damage(&caster, &target, Fixed::ONE, &mut rolls);
        assert!(!roll.is_evaded);
        assert_eq!(roll.amount, Fixed::from_num(40));
    }

    #[test]
    fn test_true_damage_ignores_defense() {
        let source = attacker(30);
        let soft = true_damage(&source, Fixed::ONE).finish(None);
        let mut rolls = ScriptedRolls::new([Fixed::ZERO], Fixed::ZERO);
        let hard = resolve_damage(
            DamageKind::True,
            &source,
            &defender(1000),
            Fixed::ONE,
            ElementalScaling::NEUTRAL,
            &mut rolls,
        );
        assert_eq!(soft.damage, 30);
        assert_eq!(hard.damage, 30);
        assert_eq!(rolls.remaining(), 1);
    }

    #[test]
    fn test_minimum_one_damage() {
        let mut rolls = ScriptedRolls::never();
        let result = resolve_damage(
            DamageKind::Physical,
            &attacker(1),
            &defender(1000),
            Fixed::ONE,
            ElementalScaling::NEUTRAL,
            &mut rolls,
        );
        assert_eq!(result.damage, 1);
    }

    #[test]
    fn test_heal_formula_and_clamp() {
        let mut healer = Stats::default();
        healer.magic_power = Fixed::from_num(40);

        let mut wounded = Stats::with_health(Fixed::from_num(100));
        wounded.set_health(Fixed::from_num(10));
        let mut rolls = ScriptedRolls::never();
        let result = heal(&healer, &wounded, Fixed::from_num(20), Fixed::ONE, &mut rolls);
        assert_eq!(result.amount, 40);

        wounded.set_health(Fixed::from_num(90));
        let clamped = heal(&healer, &wounded, Fixed::from_num(20), Fixed::ONE, &mut rolls);
        assert_eq!(clamped.amount, 10);
    }

    #[test]
    fn test_heal_crit() {
        let mut healer = Stats::default();
        healer.magic_power = Fixed::from_num(40);
        healer.crit_chance = percent(50);
        let mut wounded = Stats::with_health(Fixed::from_num(100));
        wounded.set_health(Fixed::ONE);

        let mut rolls = ScriptedRolls::always();
        let result = heal(&healer, &wounded, Fixed::from_num(20), Fixed::ONE, &mut rolls);
        assert!(result.is_critical);
        assert_eq!(result.amount, 60);
    }
}
