//! Skill and effect-template definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::combat::damage::DamageKind;
use crate::combat::elemental::Element;
use crate::math::{decimal_serde, Decimal, Fixed};
use crate::stats::StatModifier;

/// Identifier of a skill definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillId(pub String);

impl SkillId {
    /// Create a skill id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SkillId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Who a skill lands on when no explicit targets are given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SkillTarget {
    /// The caster's current target.
    #[default]
    CurrentEnemy,
    /// The caster.
    SelfCast,
    /// The living ally with the lowest health percentage.
    LowestAlly,
    /// Every living enemy.
    AllEnemies,
    /// Every living ally, caster included.
    AllAllies,
}

impl SkillTarget {
    /// Whether the skill is aimed at enemies.
    #[must_use]
    pub const fn is_hostile(self) -> bool {
        matches!(self, SkillTarget::CurrentEnemy | SkillTarget::AllEnemies)
    }
}

/// What a skill does to each target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillEffect {
    /// Deal damage scaled from the caster's attack or magic power.
    Damage {
        /// Multiplier on the caster's attack stat.
        #[serde(with = "decimal_serde")]
        multiplier: Fixed,
        /// Forced damage kind; by default the caster's class decides.
        #[serde(default)]
        kind: Option<DamageKind>,
    },
    /// Restore health.
    Heal {
        /// Flat heal before magic-power scaling.
        #[serde(with = "decimal_serde")]
        amount: Fixed,
        /// Final multiplier.
        #[serde(with = "decimal_serde", default = "unit_coefficient")]
        coefficient: Fixed,
    },
    /// Apply the skill's effect template as a buff.
    Buff,
    /// Apply the skill's effect template as a debuff.
    Debuff,
    /// Apply a movement-impairing debuff.
    Control {
        /// Override for the configured control duration.
        #[serde(default)]
        duration: Option<Decimal>,
    },
}

fn unit_coefficient() -> Fixed {
    Fixed::ONE
}

/// Data-driven skill definition.
///
/// # Example RON
///
/// ```ron
/// SkillDefinition(
///     id: "fireball",
///     name: "Fireball",
///     cooldown: 4.0,
///     energy_cost: 30.0,
///     effect: Damage(multiplier: 1.8),
///     target: CurrentEnemy,
///     element: Some(Fire),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SkillDefinition {
    /// Unique id, referenced by characters and effect templates.
    pub id: SkillId,
    /// Display name.
    pub name: String,
    /// Seconds between casts before cooldown reduction.
    #[serde(with = "decimal_serde")]
    pub cooldown: Fixed,
    /// Energy spent per cast.
    #[serde(with = "decimal_serde", default)]
    pub energy_cost: Fixed,
    /// What the skill does.
    pub effect: SkillEffect,
    /// Default targeting.
    #[serde(default)]
    pub target: SkillTarget,
    /// Element carried by damage.
    #[serde(default)]
    pub element: Option<Element>,
}

/// Stat change and duration for a buff/debuff skill, keyed by skill id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EffectTemplate {
    /// Per-stack stat change.
    pub stat_delta: Vec<StatModifier>,
    /// Duration override; the configured default applies when absent.
    #[serde(default)]
    pub duration: Option<Decimal>,
}
