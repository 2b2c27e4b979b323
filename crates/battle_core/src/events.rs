//! Per-tick events handed to reporting layers.

use serde::{Deserialize, Serialize};

use crate::combat::damage::{DamageResult, HealResult};
use crate::combat::elemental::Reaction;
use crate::components::EntityId;
use crate::data::SkillId;

/// Category of a combat log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatEventKind {
    /// Basic attack landed or missed.
    BasicAttack,
    /// Skill damage.
    SkillDamage,
    /// Healing.
    Heal,
    /// New status effect.
    EffectApplied,
    /// Existing status effect refreshed and stacked.
    EffectRefreshed,
    /// Status effect ran out.
    EffectExpired,
    /// Defender died.
    Death,
}

/// One combat log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatEvent {
    /// Tick the event happened on.
    pub tick: u64,
    /// Acting entity, if any.
    pub attacker: Option<EntityId>,
    /// Affected entity.
    pub defender: EntityId,
    /// Category.
    pub kind: CombatEventKind,
    /// Damage or healing amount.
    pub damage: u32,
    /// Critical hit or heal.
    pub is_critical: bool,
    /// Dodged.
    pub is_evaded: bool,
    /// Blocked.
    pub is_blocked: bool,
    /// Elemental reaction that fired.
    pub reaction: Option<Reaction>,
    /// Skill involved.
    pub skill: Option<SkillId>,
    /// Human-readable summary.
    pub description: String,
}

impl CombatEvent {
    fn blank(tick: u64, attacker: Option<EntityId>, defender: EntityId, kind: CombatEventKind) -> Self {
        Self {
            tick,
            attacker,
            defender,
            kind,
            damage: 0,
            is_critical: false,
            is_evaded: false,
            is_blocked: false,
            reaction: None,
            skill: None,
            description: String::new(),
        }
    }

    /// Event for a resolved hit.
    #[must_use]
    pub fn damage(
        tick: u64,
        attacker: EntityId,
        defender: EntityId,
        skill: Option<SkillId>,
        result: DamageResult,
    ) -> Self {
        let kind = if skill.is_some() {
            CombatEventKind::SkillDamage
        } else {
            CombatEventKind::BasicAttack
        };
        Self {
            damage: result.damage,
            is_critical: result.is_critical,
            is_evaded: result.is_evaded,
            is_blocked: result.is_blocked,
            reaction: result.reaction,
            skill,
            description: result.description,
            ..Self::blank(tick, Some(attacker), defender, kind)
        }
    }

    /// Event for a resolved heal.
    #[must_use]
    pub fn heal(
        tick: u64,
        healer: EntityId,
        target: EntityId,
        skill: SkillId,
        result: HealResult,
    ) -> Self {
        Self {
            damage: result.amount,
            is_critical: result.is_critical,
            skill: Some(skill),
            description: result.description,
            ..Self::blank(tick, Some(healer), target, CombatEventKind::Heal)
        }
    }

    /// Event for an applied or refreshed status effect.
    #[must_use]
    pub fn effect(
        tick: u64,
        source: EntityId,
        target: EntityId,
        effect_id: &str,
        stacks: Option<u8>,
    ) -> Self {
        let (kind, description) = match stacks {
            Some(stacks) => (
                CombatEventKind::EffectRefreshed,
                format!("{effect_id} refreshed ({stacks} stacks)"),
            ),
            None => (CombatEventKind::EffectApplied, format!("{effect_id} applied")),
        };
        Self {
            skill: Some(SkillId::new(effect_id)),
            description,
            ..Self::blank(tick, Some(source), target, kind)
        }
    }

    /// Event for an expired status effect or elemental mark.
    #[must_use]
    pub fn expired(tick: u64, target: EntityId, effect_id: &str) -> Self {
        Self {
            description: format!("{effect_id} expired"),
            ..Self::blank(tick, None, target, CombatEventKind::EffectExpired)
        }
    }

    /// Event for a death.
    #[must_use]
    pub fn death(tick: u64, killer: Option<EntityId>, victim: EntityId) -> Self {
        Self {
            description: "died".to_string(),
            ..Self::blank(tick, killer, victim, CombatEventKind::Death)
        }
    }
}

/// A collision resolved during the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionEvent {
    /// Lower entity id of the pair.
    pub a: EntityId,
    /// Higher entity id of the pair.
    pub b: EntityId,
}

/// Everything that happened during one tick, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Tick number these events belong to.
    pub tick: u64,
    /// Combat log entries.
    pub combat: Vec<CombatEvent>,
    /// Resolved collisions.
    pub collisions: Vec<CollisionEvent>,
    /// Entities added at the start of the tick.
    pub spawned: Vec<EntityId>,
    /// Entities removed at the start of the tick.
    pub removed: Vec<EntityId>,
}

impl TickEvents {
    /// Start an empty buffer for `tick`.
    #[must_use]
    pub fn new(tick: u64) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }

    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.combat.is_empty()
            && self.collisions.is_empty()
            && self.spawned.is_empty()
            && self.removed.is_empty()
    }

    /// Combat events of one kind.
    pub fn of_kind(&self, kind: CombatEventKind) -> impl Iterator<Item = &CombatEvent> {
        self.combat.iter().filter(move |event| event.kind == kind)
    }
}
