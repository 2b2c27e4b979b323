//! Combat resolution engine.
//!
//! - [`damage`] - physical, magical and true damage, healing
//! - [`effects`] - status effects, stacking and derived stats
//! - [`elemental`] - elements, resistances and reactions
//! - [`skills`] - cast gating, targeting and skill execution
//! - [`synergy`] - team-composition bonuses

pub mod damage;
pub mod effects;
pub mod elemental;
pub mod skills;
pub mod synergy;

pub use damage::{DamageKind, DamageResult, HealResult};
pub use effects::{EffectApplication, EffectKind, StatusEffect, MAX_STACKS};
pub use elemental::{Element, ElementTable, Reaction};
pub use skills::{execute_skill, SkillOutcome};
pub use synergy::{compute_synergy, SynergyTable, SynergyTier};
