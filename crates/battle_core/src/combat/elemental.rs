//! Elements, per-element tables and the reaction matrix.
//!
//! A reaction fires when an incoming element meets the defender's primary
//! element. The matrix is symmetric: fire hitting water and water hitting
//! fire both vaporize.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::math::{decimal_serde, fixed_serde, percent, Fixed};

/// Elemental affinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Element {
    /// Fire.
    Fire,
    /// Water.
    Water,
    /// Earth.
    Earth,
    /// Air.
    Air,
    /// Light.
    Light,
    /// Dark.
    Dark,
}

/// Result of two elements meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reaction {
    /// Fire + Water.
    Vaporize,
    /// Fire + Air.
    Spread,
    /// Water + Earth.
    Growth,
    /// Light + Dark.
    Annihilation,
}

impl Reaction {
    /// Damage multiplier for this reaction.
    #[must_use]
    pub fn multiplier(self) -> Fixed {
        match self {
            Reaction::Vaporize => percent(150),
            Reaction::Spread => percent(120),
            Reaction::Growth => percent(130),
            Reaction::Annihilation => percent(200),
        }
    }

    /// Stable identifier used for aura keys and battle-log text.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Reaction::Vaporize => "vaporize",
            Reaction::Spread => "spread",
            Reaction::Growth => "growth",
            Reaction::Annihilation => "annihilation",
        }
    }
}

/// Look up the reaction between the defender's element and an incoming one.
#[must_use]
pub fn reaction_between(defender: Element, incoming: Element) -> Option<Reaction> {
    use Element::*;

    match (defender, incoming) {
        (Fire, Water) | (Water, Fire) => Some(Reaction::Vaporize),
        (Fire, Air) | (Air, Fire) => Some(Reaction::Spread),
        (Water, Earth) | (Earth, Water) => Some(Reaction::Growth),
        (Light, Dark) | (Dark, Light) => Some(Reaction::Annihilation),
        _ => None,
    }
}

/// Multiplier for a possible reaction; `1` when nothing reacts.
#[must_use]
pub fn reaction_multiplier(defender: Element, incoming: Element) -> Fixed {
    reaction_between(defender, incoming).map_or(Fixed::ONE, Reaction::multiplier)
}

/// One fraction per element. Missing entries in data default to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementTable {
    /// Fire.
    #[serde(with = "decimal_serde")]
    pub fire: Fixed,
    /// Water.
    #[serde(with = "decimal_serde")]
    pub water: Fixed,
    /// Earth.
    #[serde(with = "decimal_serde")]
    pub earth: Fixed,
    /// Air.
    #[serde(with = "decimal_serde")]
    pub air: Fixed,
    /// Light.
    #[serde(with = "decimal_serde")]
    pub light: Fixed,
    /// Dark.
    #[serde(with = "decimal_serde")]
    pub dark: Fixed,
}

impl ElementTable {
    /// Read the entry for an element.
    #[must_use]
    pub const fn get(&self, element: Element) -> Fixed {
        match element {
            Element::Fire => self.fire,
            Element::Water => self.water,
            Element::Earth => self.earth,
            Element::Air => self.air,
            Element::Light => self.light,
            Element::Dark => self.dark,
        }
    }

    /// Overwrite the entry for an element.
    pub fn set(&mut self, element: Element, value: Fixed) {
        let slot = match element {
            Element::Fire => &mut self.fire,
            Element::Water => &mut self.water,
            Element::Earth => &mut self.earth,
            Element::Air => &mut self.air,
            Element::Light => &mut self.light,
            Element::Dark => &mut self.dark,
        };
        *slot = value;
    }
}

/// A short-lived elemental mark left by a reaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementalAura {
    /// Reaction that created the aura.
    pub reaction: Reaction,
    /// Seconds left.
    #[serde(with = "fixed_serde")]
    pub remaining: Fixed,
}

impl ElementalAura {
    /// Seconds a reaction mark lingers on the defender.
    #[must_use]
    pub fn default_duration() -> Fixed {
        Fixed::from_num(2)
    }

    /// Mark left by `reaction`.
    #[must_use]
    pub fn from_reaction(reaction: Reaction) -> Self {
        Self {
            reaction,
            remaining: Self::default_duration(),
        }
    }
}

/// Record a reaction mark, refreshing any existing mark of the same reaction.
pub fn mark_reaction(auras: &mut BTreeMap<String, ElementalAura>, reaction: Reaction) {
    auras.insert(reaction.id().to_string(), ElementalAura::from_reaction(reaction));
}

/// Decay reaction marks by `dt`, returning the ids that ran out.
pub fn decay_auras(auras: &mut BTreeMap<String, ElementalAura>, dt: Fixed) -> Vec<String> {
    let mut expired = Vec::new();
    auras.retain(|id, aura| {
        aura.remaining -= dt;
        if aura.remaining <= Fixed::ZERO {
            expired.push(id.clone());
            false
        } else {
            true
        }
    });
    expired
}

/// Highest resistance a defender can reach against one element.
pub const MAX_ELEMENTAL_RESISTANCE: i32 = 90;

/// Combined elemental scaling for a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementalScaling {
    /// Multiplier to apply to mitigated damage.
    pub multiplier: Fixed,
    /// Reaction that fired, if any.
    pub reaction: Option<Reaction>,
}

impl ElementalScaling {
    /// Scaling that leaves damage unchanged.
    pub const NEUTRAL: Self = Self {
        multiplier: Fixed::ONE,
        reaction: None,
    };
}

/// Scale an incoming hit of `element` by attacker bonus, defender resistance
/// and the reaction against the defender's primary element.
#[must_use]
pub fn elemental_scaling(
    element: Element,
    attacker_bonus: Option<&ElementTable>,
    defender_primary: Option<Element>,
    defender_resistance: Option<&ElementTable>,
) -> ElementalScaling {
    let bonus = attacker_bonus.map_or(Fixed::ZERO, |table| table.get(element).max(Fixed::ZERO));
    let resist = defender_resistance.map_or(Fixed::ZERO, |table| {
        table
            .get(element)
            .clamp(Fixed::ZERO, percent(MAX_ELEMENTAL_RESISTANCE))
    });
    let reaction = defender_primary.and_then(|primary| reaction_between(primary, element));
    let reaction_mult = reaction.map_or(Fixed::ONE, Reaction::multiplier);

    ElementalScaling {
        multiplier: (Fixed::ONE + bonus) * (Fixed::ONE - resist) * reaction_mult,
        reaction,
    }
}
