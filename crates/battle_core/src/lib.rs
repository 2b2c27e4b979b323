//! # Battle Core
//!
//! Deterministic simulation core for a squad auto-battler.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No ambient randomness (every roll comes from an injected [`rng::RollSource`])
//! - No floating-point math (uses fixed-point)
//!
//! The same seed, definitions and commands always produce the same battle,
//! which makes replays and determinism tests possible.
//!
//! ## Crate Structure
//!
//! - [`registry`] - Entities, deferred add/remove queues and the tag index
//! - [`components`] - Component definitions
//! - [`scheduler`] - Priority-ordered systems and the shared context
//! - [`systems`] - Input, AI, movement, collision, synergy, effects, combat, lifecycle
//! - [`combat`] - Damage, healing, status effects, skills, elements, synergies
//! - [`data`] - Character/skill definitions loaded from RON
//! - [`battle`] - The driver tying it all together
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod battle;
pub mod combat;
pub mod components;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod factory;
pub mod math;
pub mod registry;
pub mod rng;
pub mod scheduler;
pub mod stats;
pub mod systems;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::battle::{Battle, BattleSnapshot, EntitySnapshot};
    pub use crate::combat::{DamageKind, DamageResult, Element, HealResult, Reaction, StatusEffect};
    pub use crate::components::*;
    pub use crate::config::{CastPolicy, SimConfig};
    pub use crate::data::{CharacterData, DefinitionTable, SkillDefinition, SkillId};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{CombatEvent, CombatEventKind, TickEvents};
    pub use crate::factory::CharacterSpawn;
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::registry::{Entity, Registry};
    pub use crate::rng::{RollSource, SimRng};
    pub use crate::scheduler::{Scheduler, SimContext, System};
    pub use crate::stats::{StatKind, Stats};
}
