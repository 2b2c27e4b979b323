//! Status effects: application, stacking, decay and stat recomputation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, Effects};
use crate::math::{fixed_serde, Fixed};
use crate::registry::Entity;
use crate::stats::{ModifierMode, StatKind, StatModifier, Stats};

/// Hard cap on stacks of a single effect.
pub const MAX_STACKS: u8 = 5;

/// Whether an effect helps or hinders its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// Beneficial.
    Buff,
    /// Harmful.
    Debuff,
}

/// A timed stat change on an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusEffect {
    /// Effect id; at most one active entry per id.
    pub id: String,
    /// Buff or debuff.
    pub kind: EffectKind,
    /// Per-stack stat change.
    pub stat_delta: Vec<StatModifier>,
    /// Total duration in seconds.
    #[serde(with = "fixed_serde")]
    pub duration: Fixed,
    /// Seconds left, never above `duration`.
    #[serde(with = "fixed_serde")]
    pub remaining: Fixed,
    /// Entity that applied the effect. May dangle.
    pub source: Option<EntityId>,
    /// Current stacks, `1..=MAX_STACKS`.
    pub stacks: u8,
    /// Control effects stop movement while active.
    pub impairs_movement: bool,
}

impl StatusEffect {
    /// A fresh single-stack effect.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        kind: EffectKind,
        stat_delta: Vec<StatModifier>,
        duration: Fixed,
    ) -> Self {
        let duration = duration.max(Fixed::ZERO);
        Self {
            id: id.into(),
            kind,
            stat_delta,
            duration,
            remaining: duration,
            source: None,
            stacks: 1,
            impairs_movement: false,
        }
    }

    /// Builder: record the applying entity.
    #[must_use]
    pub fn from_source(mut self, source: EntityId) -> Self {
        self.source = Some(source);
        self
    }

    /// Builder: mark as a control effect.
    #[must_use]
    pub fn impairing(mut self) -> Self {
        self.impairs_movement = true;
        self
    }
}

/// What [`apply_effect`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectApplication {
    /// A new entry was appended.
    Applied,
    /// An existing entry was refreshed; carries the new stack count.
    Refreshed(u8),
}

/// Apply an effect, refreshing and stacking when the id is already active.
pub fn apply_effect(effects: &mut Effects, effect: StatusEffect) -> EffectApplication {
    if let Some(existing) = effects.active.iter_mut().find(|e| e.id == effect.id) {
        existing.duration = effect.duration;
        existing.remaining = effect.duration;
        existing.stacks = existing.stacks.saturating_add(1).clamp(1, MAX_STACKS);
        existing.source = effect.source.or(existing.source);
        return EffectApplication::Refreshed(existing.stacks);
    }

    let mut effect = effect;
    effect.stacks = effect.stacks.clamp(1, MAX_STACKS);
    effect.remaining = effect.remaining.min(effect.duration);
    effects.active.push(effect);
    EffectApplication::Applied
}

/// Advance every effect by `dt`, dropping those that run out.
///
/// Returns the ids of expired effects in application order.
pub fn update_effects(effects: &mut Effects, dt: Fixed) -> Vec<String> {
    let mut expired = Vec::new();
    effects.active.retain_mut(|effect| {
        effect.remaining -= dt;
        if effect.remaining <= Fixed::ZERO {
            expired.push(effect.id.clone());
            false
        } else {
            true
        }
    });
    expired
}

/// Remove an effect by id. Returns whether anything was removed.
pub fn remove_effect(effects: &mut Effects, id: &str) -> bool {
    let before = effects.active.len();
    effects.active.retain(|effect| effect.id != id);
    effects.active.len() != before
}

/// Sum the deltas per stat, then write each stat once so its bounds are
/// applied to the total rather than to every partial sum.
fn apply_summed<I>(stats: &mut Stats, deltas: I)
where
    I: IntoIterator<Item = (StatKind, Fixed)>,
{
    let mut totals: BTreeMap<StatKind, Fixed> = BTreeMap::new();
    for (kind, delta) in deltas {
        let total = totals.entry(kind).or_insert(Fixed::ZERO);
        *total = total.saturating_add(delta);
    }
    for (kind, total) in totals {
        stats.set(kind, stats.get(kind).saturating_add(total));
    }
}

fn modifier_delta(modifier: &StatModifier, reference: &Stats) -> Fixed {
    match modifier.mode {
        ModifierMode::Flat => modifier.amount,
        ModifierMode::Percent => reference.get(modifier.stat).saturating_mul(modifier.amount),
    }
}

/// Derive live stats from base stats, synergy bonuses and active effects.
///
/// Synergy flats apply first, then synergy percentages against the
/// post-flat values, then the sum of every effect's delta times its
/// stacks. Each layer is summed per stat before clamping, so the result
/// does not depend on effect order. Current health and mana carry over
/// from `current`, clamped to the new maxima.
#[must_use]
pub fn recompute_stats(
    base: &Stats,
    synergy: &[StatModifier],
    effects: &[StatusEffect],
    current: &Stats,
) -> Stats {
    let mut derived = *base;

    apply_summed(
        &mut derived,
        synergy
            .iter()
            .filter(|m| m.mode == ModifierMode::Flat)
            .map(|m| (m.stat, m.amount)),
    );
    let after_flat = derived;
    apply_summed(
        &mut derived,
        synergy
            .iter()
            .filter(|m| m.mode == ModifierMode::Percent)
            .map(|m| (m.stat, modifier_delta(m, &after_flat))),
    );

    let after_synergy = derived;
    apply_summed(
        &mut derived,
        effects.iter().flat_map(|effect| {
            let stacks = Fixed::from_num(effect.stacks);
            effect.stat_delta.iter().map(move |modifier| {
                let delta = modifier_delta(modifier, &after_synergy).saturating_mul(stacks);
                (modifier.stat, delta)
            })
        }),
    );

    derived.set_health(current.health());
    derived.set_mana(current.mana());
    derived
}

/// Recompute an entity's live stats from its components.
///
/// Entities without both base and live stats are left alone.
pub fn refresh_stats(entity: &mut Entity) {
    let (Some(base), Some(current)) = (entity.base_stats, entity.stats) else {
        return;
    };
    let synergy = entity
        .synergy
        .as_ref()
        .map_or(&[][..], |synergy| synergy.bonuses.as_slice());
    let effects = entity
        .effects
        .as_ref()
        .map_or(&[][..], |effects| effects.active.as_slice());
    entity.stats = Some(recompute_stats(&base.0, synergy, effects, &current));
}

/// Apply an effect to an entity and recompute its stats.
pub fn apply_effect_to(entity: &mut Entity, effect: StatusEffect) -> EffectApplication {
    let application = apply_effect(entity.effects.get_or_insert_with(Effects::default), effect);
    refresh_stats(entity);
    application
}

/// Remove an effect from an entity and recompute its stats.
///
/// Returns `false`, changing nothing, if the effect was not active.
pub fn remove_effect_from(entity: &mut Entity, id: &str) -> bool {
    let removed = entity
        .effects
        .as_mut()
        .is_some_and(|effects| remove_effect(effects, id));
    if removed {
        refresh_stats(entity);
    }
    removed
}
