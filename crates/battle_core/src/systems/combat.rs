use tracing::{debug, warn};

use crate::combat::damage::{resolve_damage, DamageKind};
use crate::combat::effects::EffectApplication;
use crate::combat::elemental::ElementalScaling;
use crate::combat::skills::{execute_skill, is_ready, resolve_targets, SkillOutcome};
use crate::components::{ComponentKind, EntityId, Velocity};
use crate::data::{SkillDefinition, SkillEffect, SkillId, SkillTarget};
use crate::events::CombatEvent;
use crate::math::Fixed;
use crate::registry::{Entity, Registry};
use crate::scheduler::{SimContext, System};

/// Regeneration, cooldowns, skill casts, basic attacks and deaths.
///
/// Each living combatant, in id order: regenerates, ticks its attack and
/// skill cooldowns, resolves queued casts, auto-casts one ready skill if
/// AI-controlled, then swings at its target when the attack cooldown is
/// up and the target is in range. A defender dropping to zero health dies
/// on the spot, so later entities in the same tick no longer see it alive.
#[derive(Debug, Default, Clone, Copy)]
pub struct CombatSystem;

const REQUIRED: &[ComponentKind] = &[ComponentKind::Stats, ComponentKind::CombatState];

impl System for CombatSystem {
    fn name(&self) -> &'static str {
        "combat"
    }

    fn required_components(&self) -> &'static [ComponentKind] {
        REQUIRED
    }

    fn update(&mut self, dt: Fixed, registry: &mut Registry, ctx: &mut SimContext) {
        for id in registry.query(REQUIRED) {
            let Some(entity) = registry.get_mut(id) else {
                continue;
            };
            if !entity.is_alive() {
                continue;
            }
            regenerate(entity, dt);
            let queued = entity
                .skills
                .as_mut()
                .map(|skills| std::mem::take(&mut skills.queued))
                .unwrap_or_default();

            for request in queued {
                cast(registry, ctx, id, &request.targets, &request.skill);
            }

            if let Some((skill, targets)) = auto_cast_choice(registry, id) {
                cast(registry, ctx, id, &targets, &skill);
            }

            basic_attack(registry, ctx, id);
        }
    }
}

fn regenerate(entity: &mut Entity, dt: Fixed) {
    if let Some(stats) = entity.stats.as_mut() {
        stats.heal(stats.health_regen * dt);
        stats.set_mana(stats.mana() + stats.mana_regen * dt);
    }
    if let Some(combat) = entity.combat.as_mut() {
        combat.attack_cooldown = (combat.attack_cooldown - dt).max(Fixed::ZERO);
    }
    if let Some(skills) = entity.skills.as_mut() {
        skills.tick_cooldowns(dt);
    }
}

/// Allies within the caster's support range for an ally-targeted skill.
///
/// Heals only consider wounded allies; `LowestAlly` narrows to the most
/// hurt of those in reach.
fn support_targets(registry: &Registry, caster: &Entity, skill: &SkillDefinition) -> Vec<EntityId> {
    let range = caster.ai.as_ref().map_or(Fixed::MAX, |ai| ai.support_range);
    let origin = caster.position.map(|position| position.value);
    let heals = matches!(skill.effect, SkillEffect::Heal { .. });

    let candidates = resolve_targets(registry, caster.id, SkillTarget::AllAllies)
        .into_iter()
        .filter_map(|id| {
            let ally = registry.get(id)?;
            let in_reach = match (origin, ally.position) {
                (Some(origin), Some(position)) => origin.within(position.value, range),
                _ => true,
            };
            let stats = ally.stats?;
            let wanted = !heals || stats.missing_health() > Fixed::ZERO;
            (in_reach && wanted).then_some((stats.health_percentage(), id))
        });

    if skill.target == SkillTarget::LowestAlly {
        candidates.min().map(|(_, id)| id).into_iter().collect()
    } else {
        candidates.map(|(_, id)| id).collect()
    }
}

/// First ready skill an AI caster has a use for right now, with the
/// explicit targets to cast it at (empty lets the skill pick).
fn auto_cast_choice(registry: &Registry, id: EntityId) -> Option<(SkillId, Vec<EntityId>)> {
    let entity = registry.get(id)?;
    if entity.ai.is_none() || !entity.is_alive() {
        return None;
    }
    let skills = entity.skills.as_ref()?;
    let in_combat = entity.combat.is_some_and(|combat| combat.in_combat);

    skills
        .definitions
        .iter()
        .filter(|skill| is_ready(skills, skill))
        .find_map(|skill| match skill.target {
            SkillTarget::LowestAlly | SkillTarget::AllAllies => {
                let targets = support_targets(registry, entity, skill);
                let useful = !targets.is_empty()
                    && (in_combat || matches!(skill.effect, SkillEffect::Heal { .. }));
                useful.then(|| (skill.id.clone(), targets))
            }
            _ => {
                let useful = in_combat && !resolve_targets(registry, id, skill.target).is_empty();
                useful.then(|| (skill.id.clone(), Vec::new()))
            }
        })
}

fn cast(registry: &mut Registry, ctx: &mut SimContext, caster: EntityId, targets: &[EntityId], skill: &SkillId) {
    for outcome in execute_skill(registry, ctx, caster, targets, skill) {
        let tick = ctx.tick;
        match outcome {
            SkillOutcome::Damage { target, result } => {
                ctx.events
                    .combat
                    .push(CombatEvent::damage(tick, caster, target, Some(skill.clone()), result));
                check_death(registry, ctx, Some(caster), target);
            }
            SkillOutcome::Heal { target, result } => {
                ctx.events
                    .combat
                    .push(CombatEvent::heal(tick, caster, target, skill.clone(), result));
            }
            SkillOutcome::Effect {
                target,
                effect_id,
                application,
            } => {
                let stacks = match application {
                    EffectApplication::Applied => None,
                    EffectApplication::Refreshed(stacks) => Some(stacks),
                };
                ctx.events
                    .combat
                    .push(CombatEvent::effect(tick, caster, target, &effect_id, stacks));
            }
        }
    }
}

fn basic_attack(registry: &mut Registry, ctx: &mut SimContext, id: EntityId) {
    let Some(attacker) = registry.get(id) else {
        return;
    };
    let (Some(combat), Some(stats)) = (attacker.combat, attacker.stats) else {
        return;
    };
    if !combat.alive || combat.attack_cooldown > Fixed::ZERO {
        return;
    }
    let Some(target_id) = combat.current_target else {
        return;
    };

    let Some(target) = registry.get(target_id).filter(|target| target.is_alive()) else {
        warn!(entity = id, target = target_id, "Dropping stale attack target");
        if let Some(combat) = registry.get_mut(id).and_then(|e| e.combat.as_mut()) {
            combat.clear_target();
        }
        return;
    };
    if let (Some(mine), Some(theirs)) = (attacker.team, target.team) {
        if !mine.is_hostile_to(&theirs) {
            return;
        }
    }
    if let (Some(from), Some(to)) = (attacker.position, target.position) {
        if !from.value.within(to.value, stats.attack_range) {
            return;
        }
    }
    let Some(defender) = target.stats else {
        return;
    };

    let kind = match attacker.character.as_ref() {
        Some(character) if character.class.deals_magic_damage() => DamageKind::Magical,
        _ => DamageKind::Physical,
    };
    let result = resolve_damage(
        kind,
        &stats,
        &defender,
        Fixed::ONE,
        ElementalScaling::NEUTRAL,
        &mut *ctx.rolls,
    );
    let evaded = result.is_evaded;

    if let Some(target) = registry.get_mut(target_id) {
        if let Some(stats) = target.stats.as_mut() {
            stats.apply_damage(Fixed::from_num(result.damage));
        }
        if let Some(combat) = target.combat.as_mut() {
            combat.in_combat = true;
        }
    }
    if let Some(attacker) = registry.get_mut(id) {
        if let Some(combat) = attacker.combat.as_mut() {
            combat.attack_cooldown = stats.attack_interval();
            combat.in_combat = true;
        }
        match attacker.skills.as_mut() {
            Some(skills) if !evaded => skills.gain_energy(ctx.config.energy_per_attack),
            _ => {}
        }
    }

    ctx.events
        .combat
        .push(CombatEvent::damage(ctx.tick, id, target_id, None, result));
    check_death(registry, ctx, Some(id), target_id);
}

/// Mark `victim` dead if its health ran out.
fn check_death(registry: &mut Registry, ctx: &mut SimContext, killer: Option<EntityId>, victim: EntityId) {
    let Some(entity) = registry.get_mut(victim) else {
        return;
    };
    if !entity.is_alive() || !entity.stats.is_some_and(|stats| stats.is_dead()) {
        return;
    }

    if let Some(combat) = entity.combat.as_mut() {
        combat.alive = false;
        combat.clear_target();
    }
    if let Some(lifecycle) = entity.lifecycle.as_mut() {
        lifecycle.is_active = false;
    }
    if entity.velocity.is_some() {
        entity.velocity = Some(Velocity::ZERO);
    }
    debug!(entity = victim, killer = ?killer, tick = ctx.tick, "Entity died");
    ctx.events.combat.push(CombatEvent::death(ctx.tick, killer, victim));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{AiBehavior, Skills};
    use crate::events::CombatEventKind;
    use crate::stats::Stats;
    use crate::systems::test_support::{context, fighter, with_ai};

    fn brute(attack: i32) -> Stats {
        let mut stats = Stats::default();
        stats.attack_damage = Fixed::from_num(attack);
        stats
    }

    fn armored(armor: i32, health: i32) -> Stats {
        let mut stats = Stats::with_health(Fixed::from_num(health));
        stats.armor = Fixed::from_num(armor);
        stats
    }

    fn engage(registry: &mut Registry, attacker: EntityId, target: EntityId) {
        registry.get_mut(attacker).unwrap().combat.as_mut().unwrap().current_target = Some(target);
    }

    fn health(registry: &Registry, id: EntityId) -> Fixed {
        registry.get(id).unwrap().stats.unwrap().health()
    }

    #[test]
    fn test_basic_attack_hits_and_sets_cooldown() {
        let mut registry = Registry::new();
        let attacker = fighter(&mut registry, 1, 0, brute(100));
        let defender = fighter(&mut registry, 2, 1, armored(100, 200));
        engage(&mut registry, attacker, defender);
        registry.flush();
        let mut ctx = context();
        let dt = Fixed::ONE / Fixed::from_num(4);

        CombatSystem.update(dt, &mut registry, &mut ctx);
        assert_eq!(health(&registry, defender), Fixed::from_num(150));
        let events: Vec<_> = ctx.events.of_kind(CombatEventKind::BasicAttack).collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].damage, 50);

        let entity = registry.get(attacker).unwrap();
        assert_eq!(entity.combat.unwrap().attack_cooldown, Fixed::ONE);
        assert_eq!(entity.skills.as_ref().unwrap().energy, Fixed::from_num(10));

        // cooldown still running
        CombatSystem.update(dt, &mut registry, &mut ctx);
        assert_eq!(health(&registry, defender), Fixed::from_num(150));
    }

    #[test]
    fn test_out_of_range_target_is_not_hit() {
        let mut registry = Registry::new();
        let attacker = fighter(&mut registry, 1, 0, brute(100));
        let defender = fighter(&mut registry, 2, 9, Stats::default());
        engage(&mut registry, attacker, defender);
        registry.flush();

        CombatSystem.update(Fixed::ONE, &mut registry, &mut context());
        assert_eq!(health(&registry, defender), Fixed::from_num(100));
    }

    #[test]
    fn test_lethal_hit_kills_and_deactivates() {
        let mut registry = Registry::new();
        let attacker = fighter(&mut registry, 1, 0, brute(100));
        let defender = fighter(&mut registry, 2, 1, Stats::with_health(Fixed::from_num(30)));
        engage(&mut registry, attacker, defender);
        engage(&mut registry, defender, attacker);
        registry.flush();
        let mut ctx = context();

        CombatSystem.update(Fixed::ONE, &mut registry, &mut ctx);

        let victim = registry.get(defender).unwrap();
        assert!(!victim.is_alive());
        assert!(!victim.lifecycle.unwrap().is_active);
        let deaths: Vec<_> = ctx.events.of_kind(CombatEventKind::Death).collect();
        assert_eq!(deaths.len(), 1);
        assert_eq!(deaths[0].attacker, Some(attacker));
        // the dead defender never swung back
        assert_eq!(health(&registry, attacker), Fixed::from_num(100));
    }

    #[test]
    fn test_stale_target_is_cleared() {
        let mut registry = Registry::new();
        let attacker = fighter(&mut registry, 1, 0, brute(10));
        engage(&mut registry, attacker, 999);
        registry.flush();

        CombatSystem.update(Fixed::ONE, &mut registry, &mut context());
        assert_eq!(registry.get(attacker).unwrap().combat.unwrap().current_target, None);
    }

    #[test]
    fn test_regeneration_is_clamped() {
        let mut registry = Registry::new();
        let mut stats = Stats::default();
        stats.health_regen = Fixed::from_num(5);
        stats.mana_regen = Fixed::from_num(200);
        let id = fighter(&mut registry, 1, 0, stats);
        registry
            .get_mut(id)
            .unwrap()
            .stats
            .as_mut()
            .unwrap()
            .set_health(Fixed::from_num(97));
        registry.flush();

        CombatSystem.update(Fixed::ONE, &mut registry, &mut context());
        let stats = registry.get(id).unwrap().stats.unwrap();
        assert_eq!(stats.health(), Fixed::from_num(100));
        assert_eq!(stats.mana(), Fixed::from_num(100));
    }

    fn give_mend(registry: &mut Registry, healer: EntityId) {
        let entity = registry.get_mut(healer).unwrap();
        let mut skills = Skills::new(
            vec![SkillDefinition {
                id: SkillId::new("mend"),
                name: "Mend".to_string(),
                cooldown: Fixed::from_num(4),
                energy_cost: Fixed::ZERO,
                effect: SkillEffect::Heal {
                    amount: Fixed::from_num(40),
                    coefficient: Fixed::ONE,
                },
                target: SkillTarget::LowestAlly,
                element: None,
            }],
            Fixed::from_num(100),
        );
        skills.energy = Fixed::from_num(100);
        entity.skills = Some(skills);
    }

    #[test]
    fn test_heal_ignores_allies_beyond_support_range() {
        let mut registry = Registry::new();
        let healer = fighter(&mut registry, 1, 0, Stats::default());
        let far = fighter(&mut registry, 1, 20, Stats::default());
        with_ai(&mut registry, healer, AiBehavior::Idle);
        give_mend(&mut registry, healer);
        registry
            .get_mut(far)
            .unwrap()
            .stats
            .as_mut()
            .unwrap()
            .set_health(Fixed::from_num(50));
        registry.flush();
        let mut ctx = context();

        CombatSystem.update(Fixed::ONE, &mut registry, &mut ctx);
        assert_eq!(health(&registry, far), Fixed::from_num(50));
        assert_eq!(ctx.events.of_kind(CombatEventKind::Heal).count(), 0);
    }

    #[test]
    fn test_ai_auto_casts_heal_on_wounded_ally() {
        let mut registry = Registry::new();
        let healer = fighter(&mut registry, 1, 0, Stats::default());
        let ally = fighter(&mut registry, 1, 5, Stats::default());
        with_ai(&mut registry, healer, AiBehavior::Idle);
        give_mend(&mut registry, healer);
        registry
            .get_mut(ally)
            .unwrap()
            .stats
            .as_mut()
            .unwrap()
            .set_health(Fixed::from_num(50));
        registry.flush();
        let mut ctx = context();

        CombatSystem.update(Fixed::ONE, &mut registry, &mut ctx);
        assert_eq!(health(&registry, ally), Fixed::from_num(90));
        let heals: Vec<_> = ctx.events.of_kind(CombatEventKind::Heal).collect();
        assert_eq!(heals.len(), 1);
        assert_eq!(heals[0].damage, 40);

        // on cooldown now, and nobody else is hurt enough to matter
        CombatSystem.update(Fixed::ONE, &mut registry, &mut ctx);
        assert_eq!(health(&registry, ally), Fixed::from_num(90));
    }

    #[test]
    fn test_queued_cast_resolves_against_explicit_target() {
        let mut registry = Registry::new();
        let caster = fighter(&mut registry, 1, 0, brute(20));
        let foe = fighter(&mut registry, 2, 30, Stats::default());
        {
            let entity = registry.get_mut(caster).unwrap();
            let mut skills = Skills::new(
                vec![SkillDefinition {
                    id: SkillId::new("lance"),
                    name: "Lance".to_string(),
                    cooldown: Fixed::from_num(3),
                    energy_cost: Fixed::ZERO,
                    effect: SkillEffect::Damage {
                        multiplier: Fixed::from_num(2),
                        kind: Some(DamageKind::True),
                    },
                    target: SkillTarget::CurrentEnemy,
                    element: None,
                }],
                Fixed::from_num(100),
            );
            skills.queued.push(crate::components::CastRequest {
                skill: SkillId::new("lance"),
                targets: vec![foe],
            });
            entity.skills = Some(skills);
        }
        registry.flush();
        let mut ctx = context();

        CombatSystem.update(Fixed::ONE, &mut registry, &mut ctx);
        assert_eq!(health(&registry, foe), Fixed::from_num(60));
        let hits: Vec<_> = ctx.events.of_kind(CombatEventKind::SkillDamage).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].skill, Some(SkillId::new("lance")));
        assert!(registry.get(caster).unwrap().skills.as_ref().unwrap().queued.is_empty());
    }
}
