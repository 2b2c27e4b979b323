//! Team-composition synergies.
//!
//! Each class and race has a ladder of tiers. A team reaches a tier when it
//! fields at least `required` living members of that class or race, and
//! every member then receives the bonuses of the highest tier reached.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{CharacterClass, Race, Synergy};
use crate::math::{percent, Fixed};
use crate::stats::{StatKind, StatModifier};

/// One rung of a synergy ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynergyTier {
    /// Members needed to reach this tier.
    pub required: u8,
    /// Bonuses granted to every team member at this tier.
    pub bonuses: Vec<StatModifier>,
}

/// Synergy ladders for every class and race.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SynergyTable {
    /// Class ladders, tiers in ascending `required` order.
    #[serde(default)]
    pub classes: BTreeMap<CharacterClass, Vec<SynergyTier>>,
    /// Race ladders, tiers in ascending `required` order.
    #[serde(default)]
    pub races: BTreeMap<Race, Vec<SynergyTier>>,
}

fn tier(required: u8, bonuses: Vec<StatModifier>) -> SynergyTier {
    SynergyTier { required, bonuses }
}

impl SynergyTable {
    /// The built-in 2/4/6 ladders.
    #[must_use]
    pub fn standard() -> Self {
        use StatKind::*;

        let flat = StatModifier::flat;
        let pct = StatModifier::percent;
        let n = |v: i32| Fixed::from_num(v);

        let mut classes = BTreeMap::new();
        classes.insert(
            CharacterClass::Warrior,
            vec![
                tier(2, vec![pct(AttackDamage, percent(25))]),
                tier(4, vec![pct(AttackDamage, percent(50))]),
                tier(6, vec![pct(AttackDamage, percent(100))]),
            ],
        );
        classes.insert(
            CharacterClass::Mage,
            vec![
                tier(2, vec![flat(MagicPower, n(20))]),
                tier(4, vec![flat(MagicPower, n(50))]),
                tier(6, vec![flat(MagicPower, n(100))]),
            ],
        );
        classes.insert(
            CharacterClass::Assassin,
            vec![
                tier(2, vec![flat(CritChance, percent(25))]),
                tier(4, vec![flat(CritChance, percent(50)), flat(CritDamage, percent(50))]),
            ],
        );
        classes.insert(
            CharacterClass::Ranger,
            vec![
                tier(2, vec![pct(AttackSpeed, percent(25))]),
                tier(4, vec![pct(AttackSpeed, percent(50))]),
            ],
        );
        classes.insert(
            CharacterClass::Tank,
            vec![
                tier(2, vec![flat(Armor, n(20))]),
                tier(4, vec![flat(Armor, n(50)), flat(MagicResist, n(25))]),
            ],
        );
        classes.insert(
            CharacterClass::Healer,
            vec![
                tier(2, vec![flat(HealthRegen, n(2))]),
                tier(4, vec![flat(HealthRegen, n(5))]),
            ],
        );

        let mut races = BTreeMap::new();
        races.insert(Race::Human, vec![tier(2, vec![pct(MaxHealth, percent(25))])]);
        races.insert(Race::Elf, vec![tier(2, vec![flat(DodgeChance, percent(25))])]);
        races.insert(Race::Orc, vec![tier(2, vec![flat(AttackDamage, n(10))])]);
        races.insert(Race::Undead, vec![tier(2, vec![flat(MagicResist, n(20))])]);
        races.insert(Race::Beast, vec![tier(2, vec![flat(MoveSpeed, n(1))])]);
        races.insert(
            Race::Dragon,
            vec![
                tier(2, vec![pct(MagicPower, percent(25))]),
                tier(4, vec![pct(MagicPower, percent(50))]),
            ],
        );

        Self { classes, races }
    }
}

/// Index (1-based) of the highest tier reached, and that tier.
fn active_tier(ladder: &[SynergyTier], count: usize) -> Option<(u8, &SynergyTier)> {
    ladder
        .iter()
        .enumerate()
        .filter(|(_, tier)| count >= usize::from(tier.required))
        .last()
        .map(|(index, tier)| (u8::try_from(index + 1).unwrap_or(u8::MAX), tier))
}

/// Aggregate synergies for a roster of living members.
#[must_use]
pub fn compute_synergy(table: &SynergyTable, roster: &[(CharacterClass, Race)]) -> Synergy {
    let mut class_counts: BTreeMap<CharacterClass, usize> = BTreeMap::new();
    let mut race_counts: BTreeMap<Race, usize> = BTreeMap::new();
    for &(class, race) in roster {
        *class_counts.entry(class).or_default() += 1;
        *race_counts.entry(race).or_default() += 1;
    }

    let mut synergy = Synergy::default();

    for (class, count) in class_counts {
        let Some(ladder) = table.classes.get(&class) else {
            continue;
        };
        if let Some((level, tier)) = active_tier(ladder, count) {
            synergy.class_levels.insert(class, level);
            synergy.bonuses.extend(tier.bonuses.iter().copied());
        }
    }

    for (race, count) in race_counts {
        let Some(ladder) = table.races.get(&race) else {
            continue;
        };
        if let Some((level, tier)) = active_tier(ladder, count) {
            synergy.race_levels.insert(race, level);
            synergy.bonuses.extend(tier.bonuses.iter().copied());
        }
    }

    synergy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_member_has_no_synergy() {
        let synergy = compute_synergy(
            &SynergyTable::standard(),
            &[(CharacterClass::Warrior, Race::Human)],
        );
        assert!(synergy.class_levels.is_empty());
        assert!(synergy.bonuses.is_empty());
    }

    #[test]
    fn test_highest_tier_wins() {
        let roster = vec![(CharacterClass::Warrior, Race::Orc); 5];
        let synergy = compute_synergy(&SynergyTable::standard(), &roster);

        assert_eq!(synergy.class_levels.get(&CharacterClass::Warrior), Some(&2));
        assert_eq!(synergy.race_levels.get(&Race::Orc), Some(&1));
        assert_eq!(
            synergy.bonuses,
            vec![
                StatModifier::percent(StatKind::AttackDamage, percent(50)),
                StatModifier::flat(StatKind::AttackDamage, Fixed::from_num(10)),
            ]
        );
    }

    #[test]
    fn test_classes_and_races_counted_independently() {
        let roster = [
            (CharacterClass::Mage, Race::Elf),
            (CharacterClass::Tank, Race::Elf),
            (CharacterClass::Mage, Race::Human),
        ];
        let synergy = compute_synergy(&SynergyTable::standard(), &roster);
        assert_eq!(synergy.class_levels.get(&CharacterClass::Mage), Some(&1));
        assert_eq!(synergy.class_levels.get(&CharacterClass::Tank), None);
        assert_eq!(synergy.race_levels.get(&Race::Elf), Some(&1));
        assert_eq!(synergy.race_levels.get(&Race::Human), None);
    }

    #[test]
    fn test_table_parses_from_ron() {
        let table: SynergyTable = ron::from_str(
            "(classes: { Tank: [(required: 2, bonuses: [(stat: Armor, amount: 15.0)])] })",
        )
        .unwrap();
        assert!(table.races.is_empty());
        let roster = [(CharacterClass::Tank, Race::Orc), (CharacterClass::Tank, Race::Elf)];
        let synergy = compute_synergy(&table, &roster);
        assert_eq!(
            synergy.bonuses,
            vec![StatModifier::flat(StatKind::Armor, Fixed::from_num(15))]
        );
    }
}
