use tracing::warn;

use crate::components::{CastRequest, Command, ComponentKind, Velocity};
use crate::math::Fixed;
use crate::registry::{Entity, Registry};
use crate::scheduler::{SimContext, System};
use crate::systems::{arrival_threshold_sq, steer};

/// Turns queued player commands into velocity, targets and cast requests.
///
/// Instant commands (`Stop`, `Attack`, `CastSkill`) are consumed in one
/// tick; a `MoveTo` stays at the front of the queue until the entity
/// arrives. Player-controlled entities (no AI) with an attack target and
/// nothing queued close to attack range on their own.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputSystem;

const REQUIRED: &[ComponentKind] = &[ComponentKind::CommandQueue, ComponentKind::Position];

impl System for InputSystem {
    fn name(&self) -> &'static str {
        "input"
    }

    fn required_components(&self) -> &'static [ComponentKind] {
        REQUIRED
    }

    fn update(&mut self, _dt: Fixed, registry: &mut Registry, _ctx: &mut SimContext) {
        for id in registry.query(REQUIRED) {
            let Some(entity) = registry.get(id) else {
                continue;
            };
            if entity.combat.is_some_and(|combat| !combat.alive) {
                continue;
            }

            let plan = plan_commands(registry, entity);
            let Some(entity) = registry.get_mut(id) else {
                continue;
            };
            plan.apply(entity);
        }
    }
}

/// Changes decided for one entity, applied after reading the registry.
#[derive(Debug, Default)]
struct CommandPlan {
    consumed: usize,
    velocity: Option<Velocity>,
    target: Option<Option<u64>>,
    casts: Vec<CastRequest>,
}

impl CommandPlan {
    fn apply(self, entity: &mut Entity) {
        if let Some(commands) = entity.commands.as_mut() {
            for _ in 0..self.consumed {
                commands.pop();
            }
        }
        if let Some(velocity) = self.velocity {
            entity.velocity = Some(velocity);
        }
        if let (Some(target), Some(combat)) = (self.target, entity.combat.as_mut()) {
            combat.current_target = target;
            combat.in_combat = target.is_some();
        }
        if !self.casts.is_empty() {
            if let Some(skills) = entity.skills.as_mut() {
                skills.queued.extend(self.casts);
            }
        }
    }
}

fn is_valid_enemy(registry: &Registry, entity: &Entity, target: u64) -> bool {
    let Some(other) = registry.get(target) else {
        return false;
    };
    if !other.is_alive() {
        return false;
    }
    match (entity.team, other.team) {
        (Some(mine), Some(theirs)) => mine.is_hostile_to(&theirs),
        _ => true,
    }
}

fn plan_commands(registry: &Registry, entity: &Entity) -> CommandPlan {
    let mut plan = CommandPlan::default();
    let (Some(commands), Some(position)) = (entity.commands.as_ref(), entity.position) else {
        return plan;
    };
    let speed = entity.stats.map_or(Fixed::ZERO, |stats| stats.move_speed);

    for command in &commands.commands {
        match command {
            Command::MoveTo(destination) => {
                if position.value.distance_squared(*destination) <= arrival_threshold_sq() {
                    plan.velocity = Some(Velocity::ZERO);
                    plan.consumed += 1;
                    continue;
                }
                plan.velocity = Some(Velocity::new(steer(position.value, *destination, speed)));
                return plan;
            }
            Command::Stop => {
                plan.velocity = Some(Velocity::ZERO);
                plan.target = Some(None);
            }
            Command::Attack(target) => {
                if is_valid_enemy(registry, entity, *target) {
                    plan.target = Some(Some(*target));
                } else {
                    warn!(entity = entity.id, target, "Attack command on invalid target dropped");
                }
            }
            Command::CastSkill { skill, targets } => plan.casts.push(CastRequest {
                skill: skill.clone(),
                targets: targets.clone(),
            }),
        }
        plan.consumed += 1;
    }

    if entity.ai.is_none() {
        plan.velocity = Some(Velocity::new(engage(registry, entity, plan.target, speed)));
    }
    plan
}

/// Velocity that closes to attack range on the current (or newly set) target.
fn engage(
    registry: &Registry,
    entity: &Entity,
    planned: Option<Option<u64>>,
    speed: Fixed,
) -> crate::math::Vec2Fixed {
    use crate::math::Vec2Fixed;

    let target = match planned {
        Some(target) => target,
        None => entity.combat.and_then(|combat| combat.current_target),
    };
    let (Some(target), Some(position), Some(stats)) = (target, entity.position, entity.stats) else {
        return Vec2Fixed::ZERO;
    };
    if !is_valid_enemy(registry, entity, target) {
        return Vec2Fixed::ZERO;
    }
    let Some(target_position) = registry.get(target).and_then(|other| other.position) else {
        return Vec2Fixed::ZERO;
    };
    if position.value.within(target_position.value, stats.attack_range) {
        Vec2Fixed::ZERO
    } else {
        steer(position.value, target_position.value, speed)
    }
}
