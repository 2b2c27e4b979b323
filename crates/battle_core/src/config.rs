//! Battle-wide tuning knobs.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{decimal_serde, percent, Fixed};

/// Default ticks per second.
pub const TICK_RATE: u32 = 20;

/// Order in which skill casts check cooldown and energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CastPolicy {
    /// Start the cooldown, then check energy. A cast without enough energy
    /// drains energy to zero and still leaves the skill on cooldown.
    #[default]
    CooldownBeforeEnergy,
    /// Check energy first; a failed cast changes nothing.
    EnergyBeforeCooldown,
}

/// Simulation configuration, loadable from RON.
///
/// # Example RON
///
/// ```ron
/// SimConfig(
///     tick_rate: 20,
///     base_dodge_chance: 0.05,
///     collision_exclusions: [("player", "playerBullet")],
///     cast_policy: EnergyBeforeCooldown,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Ticks per second.
    pub tick_rate: u32,
    /// Dodge chance for characters whose definition names none.
    #[serde(with = "decimal_serde")]
    pub base_dodge_chance: Fixed,
    /// Seconds between AI decisions when a definition names none.
    #[serde(with = "decimal_serde")]
    pub decision_interval: Fixed,
    /// Collision group pairs that never collide.
    pub collision_exclusions: Vec<(String, String)>,
    /// Energy gained per landed basic attack.
    #[serde(with = "decimal_serde")]
    pub energy_per_attack: Fixed,
    /// Energy cap for characters whose definition names none.
    #[serde(with = "decimal_serde")]
    pub max_energy: Fixed,
    /// Seconds a buff or debuff lasts when its template names none.
    #[serde(with = "decimal_serde")]
    pub buff_duration: Fixed,
    /// Seconds a control effect lasts when its skill names none.
    #[serde(with = "decimal_serde")]
    pub control_duration: Fixed,
    /// Cast gating order.
    pub cast_policy: CastPolicy,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            base_dodge_chance: percent(5),
            decision_interval: Fixed::ONE / Fixed::from_num(2),
            collision_exclusions: vec![("player".to_string(), "playerBullet".to_string())],
            energy_per_attack: Fixed::from_num(10),
            max_energy: Fixed::from_num(100),
            buff_duration: Fixed::from_num(5),
            control_duration: Fixed::from_num(2),
            cast_policy: CastPolicy::default(),
        }
    }
}

impl SimConfig {
    /// Parse a configuration from RON. Missing fields take their defaults.
    pub fn from_ron_str(label: &str, source: &str) -> Result<Self> {
        let config: Self = ron::from_str(source).map_err(|err| GameError::parse(label, err))?;
        if config.tick_rate == 0 {
            return Err(GameError::DefinitionError {
                id: "tick_rate".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(config)
    }

    /// Seconds per tick.
    #[must_use]
    pub fn tick_delta(&self) -> Fixed {
        Fixed::ONE / Fixed::from_num(self.tick_rate.max(1))
    }

    /// Whether two collision groups are excluded from colliding.
    #[must_use]
    pub fn excludes(&self, a: &str, b: &str) -> bool {
        self.collision_exclusions
            .iter()
            .any(|(x, y)| (x == a && y == b) || (x == b && y == a))
    }
}
