//! Entity registry with deferred add/remove queues.
//!
//! Entities are structs of optional components, stored in id order. New
//! entities and removals are queued and only take effect when [`Registry::flush`]
//! runs at a tick boundary, so a query taken during a system's update stays
//! valid for the whole update.
//!
//! # Example
//!
//! ```
//! use battle_core::components::{Component, ComponentKind, Position};
//! use battle_core::math::Vec2Fixed;
//! use battle_core::registry::Registry;
//!
//! let mut registry = Registry::new();
//! let id = registry.create_with_tags(["player"]);
//! registry.add_component(id, Component::Position(Position::new(Vec2Fixed::ZERO)));
//!
//! // Not visible to queries until the next flush.
//! assert!(registry.query(&[ComponentKind::Position]).is_empty());
//! registry.flush();
//! assert_eq!(registry.query(&[ComponentKind::Position]), vec![id]);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::components::{
    Ai, BaseStats, Character, Collision, CombatState, CommandQueue, Component, ComponentKind,
    Effects, Elemental, EntityId, Lifecycle, Position, Skills, Synergy, Team, Velocity,
};
use crate::stats::Stats;

/// An entity with optional components.
///
/// Only components that are `Some` are attached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier for this entity.
    pub id: EntityId,
    /// Grouping tags.
    pub tags: BTreeSet<String>,
    /// World position.
    pub position: Option<Position>,
    /// Velocity.
    pub velocity: Option<Velocity>,
    /// Live stats.
    pub stats: Option<Stats>,
    /// Base stats.
    pub base_stats: Option<BaseStats>,
    /// Class/race identity.
    pub character: Option<Character>,
    /// Team membership.
    pub team: Option<Team>,
    /// Combat bookkeeping.
    pub combat: Option<CombatState>,
    /// Skills and energy.
    pub skills: Option<Skills>,
    /// Active status effects.
    pub effects: Option<Effects>,
    /// Elemental affinity.
    pub elemental: Option<Elemental>,
    /// Synergy bonuses.
    pub synergy: Option<Synergy>,
    /// AI state machine.
    pub ai: Option<Ai>,
    /// Collision box.
    pub collision: Option<Collision>,
    /// Lifetime.
    pub lifecycle: Option<Lifecycle>,
    /// Pending commands.
    pub commands: Option<CommandQueue>,
}

impl Entity {
    /// Create a new entity with the given ID and no components.
    #[must_use]
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            tags: BTreeSet::new(),
            position: None,
            velocity: None,
            stats: None,
            base_stats: None,
            character: None,
            team: None,
            combat: None,
            skills: None,
            effects: None,
            elemental: None,
            synergy: None,
            ai: None,
            collision: None,
            lifecycle: None,
            commands: None,
        }
    }

    /// Whether a component of `kind` is attached.
    #[must_use]
    pub fn has(&self, kind: ComponentKind) -> bool {
        match kind {
            ComponentKind::Position => self.position.is_some(),
            ComponentKind::Velocity => self.velocity.is_some(),
            ComponentKind::Stats => self.stats.is_some(),
            ComponentKind::BaseStats => self.base_stats.is_some(),
            ComponentKind::Character => self.character.is_some(),
            ComponentKind::Team => self.team.is_some(),
            ComponentKind::CombatState => self.combat.is_some(),
            ComponentKind::Skills => self.skills.is_some(),
            ComponentKind::Effects => self.effects.is_some(),
            ComponentKind::Elemental => self.elemental.is_some(),
            ComponentKind::Synergy => self.synergy.is_some(),
            ComponentKind::Ai => self.ai.is_some(),
            ComponentKind::Collision => self.collision.is_some(),
            ComponentKind::Lifecycle => self.lifecycle.is_some(),
            ComponentKind::CommandQueue => self.commands.is_some(),
        }
    }

    /// Whether every listed component is attached.
    #[must_use]
    pub fn has_all(&self, kinds: &[ComponentKind]) -> bool {
        kinds.iter().all(|kind| self.has(*kind))
    }

    /// Attach a component, replacing any existing one of the same kind.
    pub fn insert(&mut self, component: Component) {
        match component {
            Component::Position(c) => self.position = Some(c),
            Component::Velocity(c) => self.velocity = Some(c),
            Component::Stats(c) => self.stats = Some(c),
            Component::BaseStats(c) => self.base_stats = Some(c),
            Component::Character(c) => self.character = Some(c),
            Component::Team(c) => self.team = Some(c),
            Component::CombatState(c) => self.combat = Some(c),
            Component::Skills(c) => self.skills = Some(c),
            Component::Effects(c) => self.effects = Some(c),
            Component::Elemental(c) => self.elemental = Some(c),
            Component::Synergy(c) => self.synergy = Some(c),
            Component::Ai(c) => self.ai = Some(c),
            Component::Collision(c) => self.collision = Some(c),
            Component::Lifecycle(c) => self.lifecycle = Some(c),
            Component::CommandQueue(c) => self.commands = Some(c),
        }
    }

    /// Detach a component. Returns whether one was attached.
    pub fn take(&mut self, kind: ComponentKind) -> bool {
        match kind {
            ComponentKind::Position => self.position.take().is_some(),
            ComponentKind::Velocity => self.velocity.take().is_some(),
            ComponentKind::Stats => self.stats.take().is_some(),
            ComponentKind::BaseStats => self.base_stats.take().is_some(),
            ComponentKind::Character => self.character.take().is_some(),
            ComponentKind::Team => self.team.take().is_some(),
            ComponentKind::CombatState => self.combat.take().is_some(),
            ComponentKind::Skills => self.skills.take().is_some(),
            ComponentKind::Effects => self.effects.take().is_some(),
            ComponentKind::Elemental => self.elemental.take().is_some(),
            ComponentKind::Synergy => self.synergy.take().is_some(),
            ComponentKind::Ai => self.ai.take().is_some(),
            ComponentKind::Collision => self.collision.take().is_some(),
            ComponentKind::Lifecycle => self.lifecycle.take().is_some(),
            ComponentKind::CommandQueue => self.commands.take().is_some(),
        }
    }

    /// Whether the entity carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Whether the entity is a living combatant.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.combat.is_some_and(|combat| combat.alive)
    }
}

/// Entities added and removed by one [`Registry::flush`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Entities that became live, in id order.
    pub added: Vec<EntityId>,
    /// Entities that were removed, in id order.
    pub removed: Vec<EntityId>,
}

/// Storage for all entities.
///
/// Uses ordered maps so iteration is always in ascending id order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    live: BTreeMap<EntityId, Entity>,
    pending_adds: BTreeMap<EntityId, Entity>,
    pending_removals: BTreeSet<EntityId>,
    tag_index: BTreeMap<String, BTreeSet<EntityId>>,
    next_id: EntityId,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Create an entity. It becomes visible to queries after the next flush.
    pub fn create(&mut self) -> EntityId {
        self.create_with_tags(std::iter::empty::<String>())
    }

    /// Create an entity carrying `tags`.
    pub fn create_with_tags<I, S>(&mut self, tags: I) -> EntityId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        let mut entity = Entity::new(id);
        entity.tags = tags.into_iter().map(Into::into).collect();
        self.pending_adds.insert(id, entity);
        id
    }

    /// Queue an entity for removal at the next flush.
    ///
    /// Returns `false` when the id is unknown or already queued.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.pending_removals.insert(id)
    }

    /// Whether the entity is queued for removal.
    #[must_use]
    pub fn is_pending_removal(&self, id: EntityId) -> bool {
        self.pending_removals.contains(&id)
    }

    /// Whether the id names a live or pending entity.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.live.contains_key(&id) || self.pending_adds.contains_key(&id)
    }

    /// Get an entity, live or pending.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.live.get(&id).or_else(|| self.pending_adds.get(&id))
    }

    /// Get a mutable entity, live or pending.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        match self.live.get_mut(&id) {
            Some(entity) => Some(entity),
            None => self.pending_adds.get_mut(&id),
        }
    }

    /// Attach a component. Returns `false` for unknown entities.
    pub fn add_component(&mut self, id: EntityId, component: Component) -> bool {
        match self.get_mut(id) {
            Some(entity) => {
                entity.insert(component);
                true
            }
            None => false,
        }
    }

    /// Detach a component. Returns `false` if nothing was detached.
    pub fn remove_component(&mut self, id: EntityId, kind: ComponentKind) -> bool {
        self.get_mut(id).is_some_and(|entity| entity.take(kind))
    }

    /// Add a tag. Returns `false` for unknown entities.
    pub fn add_tag(&mut self, id: EntityId, tag: &str) -> bool {
        let is_live = self.live.contains_key(&id);
        let Some(entity) = self.get_mut(id) else {
            return false;
        };
        entity.tags.insert(tag.to_string());
        if is_live {
            self.tag_index.entry(tag.to_string()).or_default().insert(id);
        }
        true
    }

    /// Remove a tag. Returns whether the entity carried it.
    pub fn remove_tag(&mut self, id: EntityId, tag: &str) -> bool {
        let removed = self
            .get_mut(id)
            .is_some_and(|entity| entity.tags.remove(tag));
        if removed {
            if let Some(ids) = self.tag_index.get_mut(tag) {
                ids.remove(&id);
            }
        }
        removed
    }

    /// Live entities carrying every listed component, in id order.
    #[must_use]
    pub fn query(&self, kinds: &[ComponentKind]) -> Vec<EntityId> {
        self.live
            .values()
            .filter(|entity| entity.has_all(kinds))
            .map(|entity| entity.id)
            .collect()
    }

    /// Live entities carrying `tag`, in id order.
    #[must_use]
    pub fn entities_with_tag(&self, tag: &str) -> Vec<EntityId> {
        self.tag_index
            .get(tag)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Iterate live entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.live.values()
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether there are no live entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Apply queued adds, then queued removals.
    pub fn flush(&mut self) -> FlushReport {
        let mut report = FlushReport::default();

        for (id, entity) in std::mem::take(&mut self.pending_adds) {
            for tag in &entity.tags {
                self.tag_index.entry(tag.clone()).or_default().insert(id);
            }
            self.live.insert(id, entity);
            report.added.push(id);
        }

        for id in std::mem::take(&mut self.pending_removals) {
            let Some(entity) = self.live.remove(&id) else {
                continue;
            };
            for tag in &entity.tags {
                if let Some(ids) = self.tag_index.get_mut(tag) {
                    ids.remove(&id);
                    if ids.is_empty() {
                        self.tag_index.remove(tag);
                    }
                }
            }
            report.removed.push(id);
        }

        report
    }
}
