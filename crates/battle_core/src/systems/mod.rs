//! Simulation systems.
//!
//! Systems contain the logic that processes components. Each system does
//! one thing and is registered with the [`Scheduler`](crate::scheduler::Scheduler)
//! at one of the standard priorities below.
//!
//! All systems iterate entities in ascending id order and use fixed-point
//! math, so a battle replays identically from the same seed and inputs.

mod ai;
mod collision;
mod combat;
mod effects;
mod input;
mod lifecycle;
mod movement;
mod synergy;

pub use ai::AiSystem;
pub use collision::CollisionSystem;
pub use combat::CombatSystem;
pub use effects::EffectsSystem;
pub use input::InputSystem;
pub use lifecycle::LifecycleSystem;
pub use movement::MovementSystem;
pub use synergy::SynergySystem;

use crate::math::{Fixed, Vec2Fixed};
use crate::scheduler::System;

/// Standard priority of [`InputSystem`].
pub const INPUT_PRIORITY: i32 = 0;
/// Standard priority of [`AiSystem`].
pub const AI_PRIORITY: i32 = 10;
/// Standard priority of [`MovementSystem`].
pub const MOVEMENT_PRIORITY: i32 = 20;
/// Standard priority of [`CollisionSystem`].
pub const COLLISION_PRIORITY: i32 = 30;
/// Standard priority of [`SynergySystem`].
pub const SYNERGY_PRIORITY: i32 = 40;
/// Standard priority of [`EffectsSystem`].
pub const EFFECTS_PRIORITY: i32 = 50;
/// Standard priority of [`CombatSystem`].
pub const COMBAT_PRIORITY: i32 = 60;
/// Standard priority of [`LifecycleSystem`].
pub const LIFECYCLE_PRIORITY: i32 = 100;

/// Every standard system paired with its priority.
#[must_use]
pub fn standard_systems() -> Vec<(Box<dyn System>, i32)> {
    vec![
        (Box::new(InputSystem::default()), INPUT_PRIORITY),
        (Box::new(AiSystem::default()), AI_PRIORITY),
        (Box::new(MovementSystem), MOVEMENT_PRIORITY),
        (Box::new(CollisionSystem::default()), COLLISION_PRIORITY),
        (Box::new(SynergySystem::default()), SYNERGY_PRIORITY),
        (Box::new(EffectsSystem), EFFECTS_PRIORITY),
        (Box::new(CombatSystem), COMBAT_PRIORITY),
        (Box::new(LifecycleSystem), LIFECYCLE_PRIORITY),
    ]
}

/// Squared distance at which a mover counts as arrived.
pub(crate) fn arrival_threshold_sq() -> Fixed {
    Fixed::ONE / Fixed::from_num(4)
}

/// Velocity that moves from `from` toward `to` at `speed`.
pub(crate) fn steer(from: Vec2Fixed, to: Vec2Fixed, speed: Fixed) -> Vec2Fixed {
    (to - from).normalize().scale(speed)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::components::{
        Ai, AiBehavior, BaseStats, Character, CharacterClass, CombatState, Effects, EntityId,
        Lifecycle, Position, Race, Skills, Team, Velocity,
    };
    use crate::config::SimConfig;
    use crate::data::DefinitionTable;
    use crate::math::{Fixed, Vec2Fixed};
    use crate::registry::Registry;
    use crate::rng::ScriptedRolls;
    use crate::scheduler::SimContext;
    use crate::stats::Stats;

    pub fn context() -> SimContext {
        SimContext::new(
            Box::new(ScriptedRolls::never()),
            SimConfig::default(),
            DefinitionTable::default(),
        )
    }

    /// A pending combatant with every character component except AI.
    pub fn fighter(registry: &mut Registry, team: u8, x: i32, stats: Stats) -> EntityId {
        let id = registry.create_with_tags([format!("team:{team}")]);
        let entity = registry.get_mut(id).unwrap();
        entity.position = Some(Position::new(Vec2Fixed::from_ints(x, 0)));
        entity.velocity = Some(Velocity::ZERO);
        entity.stats = Some(stats);
        entity.base_stats = Some(BaseStats(stats));
        entity.team = Some(Team {
            team_id: team,
            formation_slot: 0,
            is_leader: false,
        });
        entity.combat = Some(CombatState::new());
        entity.character = Some(Character {
            definition_id: "fighter".to_string(),
            name: "Fighter".to_string(),
            class: CharacterClass::Warrior,
            race: Race::Human,
        });
        entity.effects = Some(Effects::default());
        entity.skills = Some(Skills::new(Vec::new(), Fixed::from_num(100)));
        entity.lifecycle = Some(Lifecycle::new(Fixed::ZERO));
        id
    }

    /// Attach an AI with the given default behavior.
    pub fn with_ai(registry: &mut Registry, id: EntityId, behavior: AiBehavior) {
        registry.get_mut(id).unwrap().ai = Some(Ai::new(behavior, Fixed::ONE));
    }
}
