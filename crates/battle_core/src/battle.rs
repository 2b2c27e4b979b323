//! The battle driver: registry, scheduler and context behind one handle.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::combat::effects::{apply_effect_to, remove_effect_from, EffectApplication, StatusEffect};
use crate::components::{AiBehavior, Command, CommandQueue, ComponentKind, EntityId, TeamId};
use crate::config::SimConfig;
use crate::data::DefinitionTable;
use crate::error::{GameError, Result};
use crate::events::TickEvents;
use crate::factory::{spawn_character, team_tag, CharacterSpawn};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::registry::{Entity, Registry};
use crate::rng::{RollSource, SimRng};
use crate::scheduler::{Scheduler, SimContext, System};
use crate::systems::standard_systems;

/// A running battle.
///
/// # Example
///
/// ```
/// use battle_core::battle::Battle;
/// use battle_core::config::SimConfig;
/// use battle_core::data::DefinitionTable;
///
/// let mut battle = Battle::with_seed(7, SimConfig::default(), DefinitionTable::default());
/// let events = battle.step();
/// assert_eq!(events.tick, 1);
/// assert_eq!(battle.tick(), 1);
/// ```
pub struct Battle {
    registry: Registry,
    scheduler: Scheduler,
    ctx: SimContext,
}

impl Battle {
    /// A battle with no systems registered.
    #[must_use]
    pub fn new(config: SimConfig, definitions: DefinitionTable, rolls: Box<dyn RollSource>) -> Self {
        Self {
            registry: Registry::new(),
            scheduler: Scheduler::new(),
            ctx: SimContext::new(rolls, config, definitions),
        }
    }

    /// A battle running every standard system at its standard priority.
    #[must_use]
    pub fn with_standard_systems(
        config: SimConfig,
        definitions: DefinitionTable,
        rolls: Box<dyn RollSource>,
    ) -> Self {
        let mut battle = Self::new(config, definitions, rolls);
        for (system, priority) in standard_systems() {
            battle.scheduler.add_system(system, priority);
        }
        battle
    }

    /// Standard systems with a seeded [`SimRng`].
    #[must_use]
    pub fn with_seed(seed: u64, config: SimConfig, definitions: DefinitionTable) -> Self {
        Self::with_standard_systems(config, definitions, Box::new(SimRng::from_seed(seed)))
    }

    /// Register an extra system.
    pub fn add_system(&mut self, system: Box<dyn System>, priority: i32) -> bool {
        self.scheduler.add_system(system, priority)
    }

    /// Spawn a character from the definition table. It joins the battle
    /// at the start of the next update.
    ///
    /// # Errors
    ///
    /// See [`spawn_character`].
    pub fn spawn_character(&mut self, spawn: &CharacterSpawn) -> Result<EntityId> {
        spawn_character(
            &mut self.registry,
            &self.ctx.definitions,
            &self.ctx.config,
            spawn,
            self.ctx.elapsed,
        )
    }

    fn command_target(&mut self, id: EntityId) -> Result<&mut CommandQueue> {
        let entity = self.registry.get_mut(id).ok_or(GameError::EntityNotFound(id))?;
        if entity.combat.is_some_and(|combat| !combat.alive) {
            return Err(GameError::InvalidState(format!("Entity {id} is dead")));
        }
        entity
            .commands
            .as_mut()
            .ok_or_else(|| GameError::InvalidState(format!("Entity {id} has no command queue")))
    }

    /// Replace an entity's queued commands with `command`.
    ///
    /// # Errors
    ///
    /// [`GameError::EntityNotFound`] for unknown ids, [`GameError::InvalidState`]
    /// for dead entities or entities that take no commands.
    pub fn apply_command(&mut self, id: EntityId, command: Command) -> Result<()> {
        self.command_target(id)?.set(command);
        Ok(())
    }

    /// Append `command` to an entity's queue.
    ///
    /// # Errors
    ///
    /// Same as [`apply_command`](Self::apply_command).
    pub fn queue_command(&mut self, id: EntityId, command: Command) -> Result<()> {
        self.command_target(id)?.push(command);
        Ok(())
    }

    /// Apply a status effect to an entity and recompute its stats.
    ///
    /// Returns `None` if the entity does not exist.
    pub fn apply_effect(&mut self, id: EntityId, effect: StatusEffect) -> Option<EffectApplication> {
        self.registry
            .get_mut(id)
            .map(|entity| apply_effect_to(entity, effect))
    }

    /// Remove a status effect from an entity and recompute its stats.
    ///
    /// Returns `false` if the entity or the effect does not exist.
    pub fn remove_effect(&mut self, id: EntityId, effect_id: &str) -> bool {
        self.registry
            .get_mut(id)
            .is_some_and(|entity| remove_effect_from(entity, effect_id))
    }

    /// Advance the battle by `dt` seconds and return what happened.
    pub fn update(&mut self, dt: Fixed) -> TickEvents {
        self.ctx.tick += 1;
        self.ctx.elapsed += dt;
        self.ctx.events = TickEvents::new(self.ctx.tick);

        let report = self.scheduler.update(dt, &mut self.registry, &mut self.ctx);

        let mut events = std::mem::replace(&mut self.ctx.events, TickEvents::new(self.ctx.tick));
        events.spawned = report.added;
        events.removed = report.removed;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.ctx.tick, state_hash = hash, "Battle state hash");
        }

        events
    }

    /// Advance by one tick at the configured tick rate.
    pub fn step(&mut self) -> TickEvents {
        let dt = self.ctx.config.tick_delta();
        self.update(dt)
    }

    /// Ticks run so far.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.ctx.tick
    }

    /// Seconds simulated so far.
    #[must_use]
    pub fn elapsed(&self) -> Fixed {
        self.ctx.elapsed
    }

    /// The entity registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable access to the entity registry.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// The system scheduler.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.ctx.config
    }

    /// Loaded definitions.
    #[must_use]
    pub fn definitions(&self) -> &DefinitionTable {
        &self.ctx.definitions
    }

    /// Look up an entity, live or pending.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.registry.get(id)
    }

    /// Live entities carrying `tag`, in id order.
    #[must_use]
    pub fn entities_by_tag(&self, tag: &str) -> Vec<EntityId> {
        self.registry.entities_with_tag(tag)
    }

    /// Live entities carrying every component in `kinds`, in id order.
    #[must_use]
    pub fn entities_by_component(&self, kinds: &[ComponentKind]) -> Vec<EntityId> {
        self.registry.query(kinds)
    }

    /// Living members of `team`, in id order.
    #[must_use]
    pub fn living_members(&self, team: TeamId) -> Vec<EntityId> {
        self.entities_by_tag(&team_tag(team))
            .into_iter()
            .filter(|id| self.registry.get(*id).is_some_and(Entity::is_alive))
            .collect()
    }

    /// Teams with at least one living member.
    #[must_use]
    pub fn living_teams(&self) -> BTreeSet<TeamId> {
        self.registry
            .iter()
            .filter(|entity| entity.is_alive())
            .filter_map(|entity| entity.team.map(|team| team.team_id))
            .collect()
    }

    /// The winning team, once it is the only one left standing.
    #[must_use]
    pub fn outcome(&self) -> Option<TeamId> {
        let teams = self.living_teams();
        match (teams.len(), teams.first()) {
            (1, Some(team)) => Some(*team),
            _ => None,
        }
    }

    /// Whether at most one team is left standing.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.living_teams().len() <= 1
    }

    /// Hash of the full battle state, in id order.
    ///
    /// Two battles with identical state produce identical hashes, so this
    /// doubles as a desync check for replays.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.ctx.tick.hash(&mut hasher);
        self.ctx.elapsed.to_bits().hash(&mut hasher);
        self.registry.len().hash(&mut hasher);
        for entity in self.registry.iter() {
            entity.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Serializable summary of every live entity.
    #[must_use]
    pub fn snapshot(&self) -> BattleSnapshot {
        BattleSnapshot {
            tick: self.ctx.tick,
            elapsed: self.ctx.elapsed,
            state_hash: self.state_hash(),
            entities: self.registry.iter().map(EntitySnapshot::from_entity).collect(),
        }
    }

    /// [`snapshot`](Self::snapshot) encoded with bincode.
    ///
    /// # Errors
    ///
    /// [`GameError::Serialization`] if encoding fails.
    pub fn snapshot_bytes(&self) -> Result<Vec<u8>> {
        self.snapshot().to_bytes()
    }
}

/// Read-only view of one entity at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Entity id.
    pub id: EntityId,
    /// Character definition id, if any.
    pub definition_id: Option<String>,
    /// Team, if any.
    pub team: Option<TeamId>,
    /// Position, if any.
    pub position: Option<Vec2Fixed>,
    /// Current health (zero without stats).
    #[serde(with = "fixed_serde")]
    pub health: Fixed,
    /// Maximum health (zero without stats).
    #[serde(with = "fixed_serde")]
    pub max_health: Fixed,
    /// Current mana (zero without stats).
    #[serde(with = "fixed_serde")]
    pub mana: Fixed,
    /// Current energy (zero without skills).
    #[serde(with = "fixed_serde")]
    pub energy: Fixed,
    /// Whether the entity is alive.
    pub alive: bool,
    /// AI behavior, if AI-controlled.
    pub behavior: Option<AiBehavior>,
    /// Active status effect ids.
    pub effects: Vec<String>,
    /// Tags.
    pub tags: Vec<String>,
}

impl EntitySnapshot {
    fn from_entity(entity: &Entity) -> Self {
        let stats = entity.stats;
        Self {
            id: entity.id,
            definition_id: entity.character.as_ref().map(|c| c.definition_id.clone()),
            team: entity.team.map(|team| team.team_id),
            position: entity.position.map(|position| position.value),
            health: stats.map_or(Fixed::ZERO, |stats| stats.health()),
            max_health: stats.map_or(Fixed::ZERO, |stats| stats.max_health),
            mana: stats.map_or(Fixed::ZERO, |stats| stats.mana()),
            energy: entity.skills.as_ref().map_or(Fixed::ZERO, |skills| skills.energy),
            alive: entity.is_alive(),
            behavior: entity.ai.as_ref().map(|ai| ai.current),
            effects: entity.effects.as_ref().map(|effects| effects.ids()).unwrap_or_default(),
            tags: entity.tags.iter().cloned().collect(),
        }
    }
}

/// Read-only view of a whole battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleSnapshot {
    /// Tick the snapshot was taken after.
    pub tick: u64,
    /// Seconds simulated.
    #[serde(with = "fixed_serde")]
    pub elapsed: Fixed,
    /// [`Battle::state_hash`] at the time.
    pub state_hash: u64,
    /// Live entities in id order.
    pub entities: Vec<EntitySnapshot>,
}

impl BattleSnapshot {
    /// Look up one entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    /// Encode with bincode.
    ///
    /// # Errors
    ///
    /// [`GameError::Serialization`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| GameError::Serialization(e.to_string()))
    }

    /// Decode from bincode.
    ///
    /// # Errors
    ///
    /// [`GameError::Serialization`] if the bytes are not a snapshot.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| GameError::Serialization(e.to_string()))
    }
}
