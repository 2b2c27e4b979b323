//! Character statistics and the single dispatch path for modifying them.
//!
//! Every stat a buff, debuff or synergy bonus can touch is named by
//! [`StatKind`]. Modifications go through [`Stats::add`], which re-applies
//! the bounds for that stat, so no code path can leave a stat negative or a
//! probability above one.

use serde::{Deserialize, Serialize};

use crate::math::{clamp_unit, decimal_serde, fixed_serde, Fixed};

/// Every modifiable stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatKind {
    /// Maximum health points.
    MaxHealth,
    /// Maximum mana points.
    MaxMana,
    /// Physical attack power.
    AttackDamage,
    /// Magical attack power; also scales healing.
    MagicPower,
    /// Basic attacks per second.
    AttackSpeed,
    /// Basic attack reach in world units.
    AttackRange,
    /// Probability of a critical hit (0..=1).
    CritChance,
    /// Critical hit multiplier.
    CritDamage,
    /// Physical mitigation.
    Armor,
    /// Magical mitigation.
    MagicResist,
    /// Probability of evading a physical hit (0..=1).
    DodgeChance,
    /// Probability of halving a physical hit (0..=1).
    BlockChance,
    /// Health regenerated per second.
    HealthRegen,
    /// Mana regenerated per second.
    ManaRegen,
    /// Movement speed in units per second.
    MoveSpeed,
    /// Fraction shaved off skill cooldowns (0..=1).
    CooldownReduction,
}

impl StatKind {
    /// All stat kinds in declaration order.
    pub const ALL: [StatKind; 16] = [
        StatKind::MaxHealth,
        StatKind::MaxMana,
        StatKind::AttackDamage,
        StatKind::MagicPower,
        StatKind::AttackSpeed,
        StatKind::AttackRange,
        StatKind::CritChance,
        StatKind::CritDamage,
        StatKind::Armor,
        StatKind::MagicResist,
        StatKind::DodgeChance,
        StatKind::BlockChance,
        StatKind::HealthRegen,
        StatKind::ManaRegen,
        StatKind::MoveSpeed,
        StatKind::CooldownReduction,
    ];

    /// Whether the stat is a probability bounded to `[0, 1]`.
    #[must_use]
    pub const fn is_probability(self) -> bool {
        matches!(
            self,
            StatKind::CritChance
                | StatKind::DodgeChance
                | StatKind::BlockChance
                | StatKind::CooldownReduction
        )
    }
}

/// How a modifier combines with the stat it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModifierMode {
    /// Added directly to the stat.
    #[default]
    Flat,
    /// Fraction of the pre-modifier value (`0.1` = +10%).
    Percent,
}

/// A single change to one stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatModifier {
    /// Stat being changed.
    pub stat: StatKind,
    /// Amount of change (negative for debuffs).
    #[serde(with = "decimal_serde")]
    pub amount: Fixed,
    /// How `amount` combines with the stat.
    #[serde(default)]
    pub mode: ModifierMode,
}

impl StatModifier {
    /// Flat modifier.
    #[must_use]
    pub const fn flat(stat: StatKind, amount: Fixed) -> Self {
        Self {
            stat,
            amount,
            mode: ModifierMode::Flat,
        }
    }

    /// Percentage modifier.
    #[must_use]
    pub const fn percent(stat: StatKind, amount: Fixed) -> Self {
        Self {
            stat,
            amount,
            mode: ModifierMode::Percent,
        }
    }
}

/// Stat block for a combatant.
///
/// Current health and mana live here too so that clamping against the
/// maxima happens in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stats {
    /// Maximum health.
    #[serde(with = "fixed_serde")]
    pub max_health: Fixed,
    /// Current health, always within `[0, max_health]`.
    #[serde(with = "fixed_serde")]
    current_health: Fixed,
    /// Maximum mana.
    #[serde(with = "fixed_serde")]
    pub max_mana: Fixed,
    /// Current mana, always within `[0, max_mana]`.
    #[serde(with = "fixed_serde")]
    current_mana: Fixed,
    /// Physical attack power.
    #[serde(with = "fixed_serde")]
    pub attack_damage: Fixed,
    /// Magical attack power.
    #[serde(with = "fixed_serde")]
    pub magic_power: Fixed,
    /// Attacks per second.
    #[serde(with = "fixed_serde")]
    pub attack_speed: Fixed,
    /// Basic attack reach.
    #[serde(with = "fixed_serde")]
    pub attack_range: Fixed,
    /// Crit probability.
    #[serde(with = "fixed_serde")]
    pub crit_chance: Fixed,
    /// Crit multiplier.
    #[serde(with = "fixed_serde")]
    pub crit_damage: Fixed,
    /// Physical mitigation.
    #[serde(with = "fixed_serde")]
    pub armor: Fixed,
    /// Magical mitigation.
    #[serde(with = "fixed_serde")]
    pub magic_resist: Fixed,
    /// Dodge probability.
    #[serde(with = "fixed_serde")]
    pub dodge_chance: Fixed,
    /// Block probability.
    #[serde(with = "fixed_serde")]
    pub block_chance: Fixed,
    /// Health per second.
    #[serde(with = "fixed_serde")]
    pub health_regen: Fixed,
    /// Mana per second.
    #[serde(with = "fixed_serde")]
    pub mana_regen: Fixed,
    /// Units per second.
    #[serde(with = "fixed_serde")]
    pub move_speed: Fixed,
    /// Cooldown reduction fraction.
    #[serde(with = "fixed_serde")]
    pub cooldown_reduction: Fixed,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            max_health: Fixed::from_num(100),
            current_health: Fixed::from_num(100),
            max_mana: Fixed::from_num(100),
            current_mana: Fixed::ZERO,
            attack_damage: Fixed::from_num(10),
            magic_power: Fixed::ZERO,
            attack_speed: Fixed::ONE,
            attack_range: Fixed::from_num(2),
            crit_chance: Fixed::ZERO,
            crit_damage: Fixed::from_num(3) / Fixed::from_num(2),
            armor: Fixed::ZERO,
            magic_resist: Fixed::ZERO,
            dodge_chance: Fixed::ZERO,
            block_chance: Fixed::ZERO,
            health_regen: Fixed::ZERO,
            mana_regen: Fixed::ZERO,
            move_speed: Fixed::from_num(3),
            cooldown_reduction: Fixed::ZERO,
        }
    }
}

impl Stats {
    /// Stats at full health with the given maximum.
    #[must_use]
    pub fn with_health(max_health: Fixed) -> Self {
        let mut stats = Self::default();
        stats.max_health = max_health.max(Fixed::ZERO);
        stats.current_health = stats.max_health;
        stats
    }

    /// Read a stat by kind.
    #[must_use]
    pub fn get(&self, kind: StatKind) -> Fixed {
        match kind {
            StatKind::MaxHealth => self.max_health,
            StatKind::MaxMana => self.max_mana,
            StatKind::AttackDamage => self.attack_damage,
            StatKind::MagicPower => self.magic_power,
            StatKind::AttackSpeed => self.attack_speed,
            StatKind::AttackRange => self.attack_range,
            StatKind::CritChance => self.crit_chance,
            StatKind::CritDamage => self.crit_damage,
            StatKind::Armor => self.armor,
            StatKind::MagicResist => self.magic_resist,
            StatKind::DodgeChance => self.dodge_chance,
            StatKind::BlockChance => self.block_chance,
            StatKind::HealthRegen => self.health_regen,
            StatKind::ManaRegen => self.mana_regen,
            StatKind::MoveSpeed => self.move_speed,
            StatKind::CooldownReduction => self.cooldown_reduction,
        }
    }

    /// Overwrite a stat, re-applying its bounds.
    pub fn set(&mut self, kind: StatKind, value: Fixed) {
        let bounded = if kind.is_probability() {
            clamp_unit(value)
        } else {
            value.max(Fixed::ZERO)
        };

        let slot = match kind {
            StatKind::MaxHealth => &mut self.max_health,
            StatKind::MaxMana => &mut self.max_mana,
            StatKind::AttackDamage => &mut self.attack_damage,
            StatKind::MagicPower => &mut self.magic_power,
            StatKind::AttackSpeed => &mut self.attack_speed,
            StatKind::AttackRange => &mut self.attack_range,
            StatKind::CritChance => &mut self.crit_chance,
            StatKind::CritDamage => &mut self.crit_damage,
            StatKind::Armor => &mut self.armor,
            StatKind::MagicResist => &mut self.magic_resist,
            StatKind::DodgeChance => &mut self.dodge_chance,
            StatKind::BlockChance => &mut self.block_chance,
            StatKind::HealthRegen => &mut self.health_regen,
            StatKind::ManaRegen => &mut self.mana_regen,
            StatKind::MoveSpeed => &mut self.move_speed,
            StatKind::CooldownReduction => &mut self.cooldown_reduction,
        };
        *slot = bounded;

        // Shrinking a maximum drags the current value down with it.
        self.current_health = self.current_health.clamp(Fixed::ZERO, self.max_health);
        self.current_mana = self.current_mana.clamp(Fixed::ZERO, self.max_mana);
    }

    /// Add a delta to a stat.
    pub fn add(&mut self, kind: StatKind, delta: Fixed) {
        self.set(kind, self.get(kind).saturating_add(delta));
    }

    /// Apply a modifier against a reference value for percentage modes.
    pub fn apply_modifier(&mut self, modifier: &StatModifier, reference: &Stats) {
        let delta = match modifier.mode {
            ModifierMode::Flat => modifier.amount,
            ModifierMode::Percent => reference.get(modifier.stat).saturating_mul(modifier.amount),
        };
        self.add(modifier.stat, delta);
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> Fixed {
        self.current_health
    }

    /// Current mana.
    #[must_use]
    pub const fn mana(&self) -> Fixed {
        self.current_mana
    }

    /// Set current health, clamped to `[0, max_health]`.
    pub fn set_health(&mut self, value: Fixed) {
        self.current_health = value.clamp(Fixed::ZERO, self.max_health);
    }

    /// Set current mana, clamped to `[0, max_mana]`.
    pub fn set_mana(&mut self, value: Fixed) {
        self.current_mana = value.clamp(Fixed::ZERO, self.max_mana);
    }

    /// Remove health, returning the amount actually removed.
    pub fn apply_damage(&mut self, amount: Fixed) -> Fixed {
        let actual = amount.max(Fixed::ZERO).min(self.current_health);
        self.set_health(self.current_health - actual);
        actual
    }

    /// Restore health, returning the amount actually restored.
    pub fn heal(&mut self, amount: Fixed) -> Fixed {
        let headroom = self.max_health - self.current_health;
        let actual = amount.max(Fixed::ZERO).min(headroom);
        self.set_health(self.current_health + actual);
        actual
    }

    /// Missing health.
    #[must_use]
    pub fn missing_health(&self) -> Fixed {
        self.max_health - self.current_health
    }

    /// Health as a percentage in `[0, 100]`.
    #[must_use]
    pub fn health_percentage(&self) -> Fixed {
        if self.max_health == Fixed::ZERO {
            Fixed::ZERO
        } else {
            let hundred = Fixed::from_num(100);
            self.current_health.checked_mul(hundred).map_or_else(
                || self.current_health / self.max_health * hundred,
                |scaled| scaled / self.max_health,
            )
        }
    }

    /// Whether health has reached zero.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current_health == Fixed::ZERO
    }

    /// Seconds between basic attacks.
    #[must_use]
    pub fn attack_interval(&self) -> Fixed {
        if self.attack_speed <= Fixed::ZERO {
            Fixed::MAX
        } else {
            Fixed::ONE / self.attack_speed
        }
    }

    /// Re-apply every bound. Used after bulk construction from data.
    pub fn sanitize(&mut self) {
        for kind in StatKind::ALL {
            self.set(kind, self.get(kind));
        }
    }
}
