//! Character definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::combat::elemental::{Element, ElementTable};
use crate::components::{AiBehavior, CharacterClass, Race};
use crate::config::SimConfig;
use crate::data::SkillId;
use crate::math::{Decimal, Fixed, Vec2Fixed};
use crate::stats::{StatKind, Stats};

/// Elemental affinity of a character definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementalData {
    /// Resident element.
    pub primary: Element,
    /// Optional secondary element.
    #[serde(default)]
    pub secondary: Option<Element>,
    /// Incoming damage reduction per element (fractions).
    #[serde(default)]
    pub resistances: ElementTable,
    /// Outgoing damage bonus per element (fractions).
    #[serde(default)]
    pub damage_bonus: ElementTable,
}

/// AI tuning of a character definition. Absent fields use defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AiData {
    /// Behavior when nothing else applies.
    pub behavior: AiBehavior,
    /// Seconds between decisions.
    pub decision_interval: Option<Decimal>,
    /// Range at which enemies are noticed.
    pub detection_range: Option<Decimal>,
    /// Range at which allies are supported.
    pub support_range: Option<Decimal>,
    /// Start fleeing below this health percentage.
    pub flee_health_percentage: Option<Decimal>,
    /// Stop fleeing at or above this health percentage.
    pub safe_health_percentage: Option<Decimal>,
    /// Patrol route.
    pub patrol_points: Vec<(Decimal, Decimal)>,
    /// Guard post.
    pub guard_position: Option<(Decimal, Decimal)>,
}

/// Data-driven character definition.
///
/// # Example RON
///
/// ```ron
/// CharacterData(
///     id: "ember_mage",
///     name: "Ember Mage",
///     class: Mage,
///     race: Elf,
///     stats: { MaxHealth: 80.0, MagicPower: 45.0, AttackRange: 6.0 },
///     skills: ["fireball"],
///     element: Some(ElementalData(primary: Fire)),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterData {
    /// Unique string identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Combat class.
    pub class: CharacterClass,
    /// Race.
    pub race: Race,
    /// Base stat overrides; unnamed stats keep their defaults.
    #[serde(default)]
    pub stats: BTreeMap<StatKind, Decimal>,
    /// Skills in auto-cast priority order.
    #[serde(default)]
    pub skills: Vec<SkillId>,
    /// Elemental affinity.
    #[serde(default)]
    pub element: Option<ElementalData>,
    /// AI tuning. Characters without it are player-controlled.
    #[serde(default)]
    pub ai: Option<AiData>,
    /// Extra entity tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Energy cap override.
    #[serde(default)]
    pub max_energy: Option<Decimal>,
}

impl CharacterData {
    /// Base stats at full health and mana.
    ///
    /// A missing dodge chance falls back to the configured baseline.
    #[must_use]
    pub fn base_stats(&self, config: &SimConfig) -> Stats {
        let mut stats = Stats::default();
        if !self.stats.contains_key(&StatKind::DodgeChance) {
            stats.set(StatKind::DodgeChance, config.base_dodge_chance);
        }
        for (kind, value) in &self.stats {
            stats.set(*kind, value.get());
        }
        stats.set_health(stats.max_health);
        stats.set_mana(stats.max_mana);
        stats
    }

    /// Check if this character has the specified tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Whether the character is driven by AI.
    #[must_use]
    pub fn is_ai_controlled(&self) -> bool {
        self.ai.is_some()
    }
}

impl AiData {
    /// Patrol route as world positions.
    #[must_use]
    pub fn patrol_route(&self) -> Vec<Vec2Fixed> {
        self.patrol_points
            .iter()
            .map(|(x, y)| Vec2Fixed::new(x.get(), y.get()))
            .collect()
    }

    /// Guard post as a world position.
    #[must_use]
    pub fn guard_post(&self) -> Option<Vec2Fixed> {
        self.guard_position
            .map(|(x, y)| Vec2Fixed::new(x.get(), y.get()))
    }
}

pub(crate) fn or_default(value: Option<Decimal>, fallback: Fixed) -> Fixed {
    value.map_or(fallback, Decimal::get)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::percent;

    fn sample() -> CharacterData {
        ron::from_str(
            r#"(
                id: "brute",
                name: "Brute",
                class: Warrior,
                race: Orc,
                stats: { MaxHealth: 250.0, Armor: 30.0, CritChance: 3.0 },
                skills: ["cleave"],
                tags: ["frontline"],
            )"#,
        )
        .unwrap()
    }

    #[test]
    fn test_base_stats_apply_overrides() {
        let stats = sample().base_stats(&SimConfig::default());
        assert_eq!(stats.max_health, Fixed::from_num(250));
        assert_eq!(stats.health(), Fixed::from_num(250));
        assert_eq!(stats.armor, Fixed::from_num(30));
        assert_eq!(stats.crit_chance, Fixed::ONE);
        assert_eq!(stats.dodge_chance, SimConfig::default().base_dodge_chance);
    }

    #[test]
    fn test_explicit_dodge_wins_over_baseline() {
        let mut data = sample();
        data.stats
            .insert(StatKind::DodgeChance, Decimal::new(percent(25)));
        let stats = data.base_stats(&SimConfig::default());
        assert_eq!(stats.dodge_chance, percent(25));
    }

    #[test]
    fn test_tags_and_control() {
        let data = sample();
        assert!(data.has_tag("frontline"));
        assert!(!data.has_tag("backline"));
        assert!(!data.is_ai_controlled());
    }
}
