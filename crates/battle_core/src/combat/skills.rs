//! Skill gating, targeting and execution.

use tracing::{trace, warn};

use crate::combat::damage::{heal, resolve_damage, DamageKind, DamageResult, HealResult};
use crate::combat::effects::{apply_effect_to, EffectApplication, EffectKind, StatusEffect};
use crate::combat::elemental::{elemental_scaling, mark_reaction, ElementalScaling};
use crate::components::{CharacterClass, Elemental, EntityId, Skills, Velocity};
use crate::config::{CastPolicy, SimConfig};
use crate::data::{or_default, SkillDefinition, SkillEffect, SkillId, SkillTarget};
use crate::math::{percent, Decimal, Fixed};
use crate::registry::{Entity, Registry};
use crate::scheduler::SimContext;
use crate::stats::Stats;

/// Most cooldown reduction can shave off a skill.
pub const MAX_COOLDOWN_REDUCTION: i32 = 50;

/// What a skill did to one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkillOutcome {
    /// Damage dealt.
    Damage {
        /// Entity hit.
        target: EntityId,
        /// Resolved hit.
        result: DamageResult,
    },
    /// Health restored.
    Heal {
        /// Entity healed.
        target: EntityId,
        /// Resolved heal.
        result: HealResult,
    },
    /// Status effect applied or refreshed.
    Effect {
        /// Entity affected.
        target: EntityId,
        /// Effect id (the skill id).
        effect_id: String,
        /// Whether it was new or stacked.
        application: EffectApplication,
    },
}

/// Cooldown after reduction, which is capped at 50%.
#[must_use]
pub fn scaled_cooldown(cooldown: Fixed, cooldown_reduction: Fixed) -> Fixed {
    let reduction = cooldown_reduction.clamp(Fixed::ZERO, percent(MAX_COOLDOWN_REDUCTION));
    cooldown.saturating_mul(Fixed::ONE - reduction).max(Fixed::ZERO)
}

/// Whether a skill is off cooldown and affordable right now.
#[must_use]
pub fn is_ready(skills: &Skills, skill: &SkillDefinition) -> bool {
    skills.cooldown(&skill.id) <= Fixed::ZERO && skills.energy >= skill.energy_cost
}

/// Gate a cast on cooldown and energy, paying for it on success.
///
/// Returns the definition to execute, or `None` when the cast fizzles.
/// Under [`CastPolicy::CooldownBeforeEnergy`] a cast that cannot be paid
/// for still starts the cooldown and drains energy to zero.
pub fn begin_cast(
    skills: &mut Skills,
    id: &SkillId,
    cooldown_reduction: Fixed,
    policy: CastPolicy,
) -> Option<SkillDefinition> {
    let skill = skills.definition(id)?.clone();
    if skills.cooldown(id) > Fixed::ZERO {
        return None;
    }

    let affordable = skills.energy >= skill.energy_cost;
    if policy == CastPolicy::EnergyBeforeCooldown && !affordable {
        return None;
    }

    skills
        .cooldowns
        .insert(skill.id.clone(), scaled_cooldown(skill.cooldown, cooldown_reduction));

    if !affordable {
        skills.energy = Fixed::ZERO;
        return None;
    }
    skills.energy -= skill.energy_cost;
    Some(skill)
}

fn living_members(registry: &Registry, caster_team: u8, hostile: bool) -> Vec<EntityId> {
    registry
        .iter()
        .filter(|entity| entity.is_alive() && entity.stats.is_some())
        .filter(|entity| {
            entity
                .team
                .is_some_and(|team| (team.team_id != caster_team) == hostile)
        })
        .map(|entity| entity.id)
        .collect()
}

/// Pick targets for a skill cast without explicit targets.
#[must_use]
pub fn resolve_targets(registry: &Registry, caster: EntityId, target: SkillTarget) -> Vec<EntityId> {
    let Some(entity) = registry.get(caster) else {
        return Vec::new();
    };
    let team = entity.team.map(|team| team.team_id);

    match target {
        SkillTarget::SelfCast => vec![caster],
        SkillTarget::CurrentEnemy => entity
            .combat
            .and_then(|combat| combat.current_target)
            .filter(|id| registry.get(*id).is_some_and(Entity::is_alive))
            .into_iter()
            .collect(),
        SkillTarget::AllEnemies => team.map_or_else(Vec::new, |t| living_members(registry, t, true)),
        SkillTarget::AllAllies => team.map_or_else(|| vec![caster], |t| living_members(registry, t, false)),
        SkillTarget::LowestAlly => {
            let allies = team.map_or_else(|| vec![caster], |t| living_members(registry, t, false));
            allies
                .into_iter()
                .filter_map(|id| {
                    let stats = registry.get(id)?.stats?;
                    Some((stats.health_percentage(), id))
                })
                .min()
                .map(|(_, id)| id)
                .into_iter()
                .collect()
        }
    }
}

struct CasterView {
    id: EntityId,
    stats: Stats,
    class: Option<CharacterClass>,
    elemental: Option<Elemental>,
}

/// Execute a skill from `caster` on `targets`.
///
/// Empty `targets` lets the skill's [`SkillTarget`] pick. Unknown skills,
/// casters without skills, and casts gated by cooldown or energy return an
/// empty list without touching any state beyond what the cast policy
/// prescribes.
pub fn execute_skill(
    registry: &mut Registry,
    ctx: &mut SimContext,
    caster: EntityId,
    targets: &[EntityId],
    skill_id: &SkillId,
) -> Vec<SkillOutcome> {
    let Some(entity) = registry.get_mut(caster) else {
        return Vec::new();
    };
    if !entity.is_alive() {
        return Vec::new();
    }
    let Some(stats) = entity.stats else {
        return Vec::new();
    };
    let Some(skills) = entity.skills.as_mut() else {
        return Vec::new();
    };
    let needs_template = skills
        .definition(skill_id)
        .is_some_and(|skill| matches!(skill.effect, SkillEffect::Buff | SkillEffect::Debuff));
    if needs_template && ctx.definitions.effect(skill_id).is_none() {
        warn!(caster, skill = %skill_id, "Skill has no effect template");
        return Vec::new();
    }
    let Some(skill) = begin_cast(skills, skill_id, stats.cooldown_reduction, ctx.config.cast_policy)
    else {
        trace!(caster, skill = %skill_id, "Skill not cast");
        return Vec::new();
    };

    let view = CasterView {
        id: caster,
        stats,
        class: entity.character.as_ref().map(|c| c.class),
        elemental: entity.elemental.clone(),
    };

    let targets = if targets.is_empty() {
        resolve_targets(registry, caster, skill.target)
    } else {
        targets.to_vec()
    };

    let mut outcomes = Vec::new();
    for target in targets {
        let Some(entity) = registry.get_mut(target) else {
            warn!(caster, target, "Skill target no longer exists");
            continue;
        };
        if !entity.is_alive() {
            continue;
        }
        if let Some(outcome) = apply_skill(&view, &skill, entity, ctx) {
            outcomes.push(outcome);
        }
    }
    outcomes
}

fn apply_skill(
    caster: &CasterView,
    skill: &SkillDefinition,
    target: &mut Entity,
    ctx: &mut SimContext,
) -> Option<SkillOutcome> {
    match &skill.effect {
        SkillEffect::Damage { multiplier, kind } => {
            let kind = kind.unwrap_or_else(|| match caster.class {
                Some(class) if class.deals_magic_damage() => DamageKind::Magical,
                _ => DamageKind::Physical,
            });
            let scaling = skill.element.map_or(ElementalScaling::NEUTRAL, |element| {
                elemental_scaling(
                    element,
                    caster.elemental.as_ref().map(|e| &e.damage_bonus),
                    target.elemental.as_ref().map(|e| e.primary),
                    target.elemental.as_ref().map(|e| &e.resistances),
                )
            });

            let stats = target.stats.as_mut()?;
            let result = resolve_damage(kind, &caster.stats, stats, *multiplier, scaling, &mut *ctx.rolls);
            stats.apply_damage(Fixed::from_num(result.damage));

            if let (Some(reaction), Some(elemental)) = (result.reaction, target.elemental.as_mut()) {
                mark_reaction(&mut elemental.active_effects, reaction);
            }
            if let Some(combat) = target.combat.as_mut() {
                combat.in_combat = true;
            }
            Some(SkillOutcome::Damage {
                target: target.id,
                result,
            })
        }
        SkillEffect::Heal {
            amount,
            coefficient,
        } => {
            let stats = target.stats.as_mut()?;
            let result = heal(&caster.stats, stats, *amount, *coefficient, &mut *ctx.rolls);
            stats.heal(Fixed::from_num(result.amount));
            Some(SkillOutcome::Heal {
                target: target.id,
                result,
            })
        }
        SkillEffect::Buff | SkillEffect::Debuff => {
            let template = ctx.definitions.effect(&skill.id)?;
            let kind = if skill.effect == SkillEffect::Buff {
                EffectKind::Buff
            } else {
                EffectKind::Debuff
            };
            let effect = StatusEffect::new(
                skill.id.as_str(),
                kind,
                template.stat_delta.clone(),
                or_default(template.duration, ctx.config.buff_duration),
            )
            .from_source(caster.id);
            Some(attach(target, effect))
        }
        SkillEffect::Control { duration } => {
            let stat_delta = ctx
                .definitions
                .effect(&skill.id)
                .map(|template| template.stat_delta.clone())
                .unwrap_or_default();
            let effect = StatusEffect::new(
                skill.id.as_str(),
                EffectKind::Debuff,
                stat_delta,
                control_duration(*duration, &ctx.config),
            )
            .from_source(caster.id)
            .impairing();
            if let Some(velocity) = target.velocity.as_mut() {
                *velocity = Velocity::ZERO;
            }
            Some(attach(target, effect))
        }
    }
}

fn control_duration(duration: Option<Decimal>, config: &SimConfig) -> Fixed {
    or_default(duration, config.control_duration)
}

fn attach(target: &mut Entity, effect: StatusEffect) -> SkillOutcome {
    let effect_id = effect.id.clone();
    let application = apply_effect_to(target, effect);
    SkillOutcome::Effect {
        target: target.id,
        effect_id,
        application,
    }
}
