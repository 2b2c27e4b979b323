use tracing::debug;

use crate::components::{Ai, AiBehavior, Command, ComponentKind, EntityId, TeamId, Velocity};
use crate::math::{Fixed, Vec2Fixed};
use crate::registry::{Entity, Registry};
use crate::scheduler::{SimContext, System};
use crate::systems::{arrival_threshold_sq, steer};

/// Behavior state machine for AI-controlled entities.
///
/// Decisions happen once per `decision_interval`; steering toward the
/// current behavior's goal happens every tick. Fleeing uses two
/// thresholds: an entity starts fleeing below `flee_health_percentage`
/// and only returns to its default behavior once it reaches
/// `safe_health_percentage`. Entities following an explicit `MoveTo`
/// command are left alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct AiSystem;

const REQUIRED: &[ComponentKind] = &[ComponentKind::Ai, ComponentKind::Position, ComponentKind::Stats];

/// Position and allegiance of a living entity, captured before any AI moves.
#[derive(Debug, Clone, Copy)]
struct Sighting {
    id: EntityId,
    team: TeamId,
    position: Vec2Fixed,
}

fn sightings(registry: &Registry) -> Vec<Sighting> {
    registry
        .iter()
        .filter(|entity| entity.is_alive())
        .filter_map(|entity| {
            Some(Sighting {
                id: entity.id,
                team: entity.team?.team_id,
                position: entity.position?.value,
            })
        })
        .collect()
}

/// Closest hostile to `position`; ties go to the lower id.
fn nearest_hostile(seen: &[Sighting], team: Option<TeamId>, position: Vec2Fixed) -> Option<Sighting> {
    let team = team?;
    seen.iter()
        .filter(|other| other.team != team)
        .min_by_key(|other| (position.distance_squared(other.position), other.id))
        .copied()
}

/// Outcome of one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Decision {
    behavior: AiBehavior,
    target: Option<EntityId>,
}

fn decide(
    ai: &Ai,
    health_percentage: Fixed,
    current_target: Option<Sighting>,
    nearest: Option<Sighting>,
    position: Vec2Fixed,
    attack_range: Fixed,
) -> Decision {
    if ai.current == AiBehavior::Flee {
        let behavior = if health_percentage < ai.safe_health_percentage {
            AiBehavior::Flee
        } else {
            ai.default_behavior
        };
        return Decision {
            behavior,
            target: None,
        };
    }
    if health_percentage < ai.flee_health_percentage {
        return Decision {
            behavior: AiBehavior::Flee,
            target: None,
        };
    }

    let detected = |sighting: &Sighting| position.within(sighting.position, ai.detection_range);
    let target = current_target.filter(detected).or(nearest.filter(detected));
    match target {
        Some(target) => Decision {
            behavior: if position.within(target.position, attack_range) {
                AiBehavior::Attack
            } else {
                AiBehavior::Chase
            },
            target: Some(target.id),
        },
        None => Decision {
            behavior: ai.default_behavior,
            target: None,
        },
    }
}

/// Velocity for the current behavior, advancing the patrol index on arrival.
fn steering(
    ai: &mut Ai,
    position: Vec2Fixed,
    speed: Fixed,
    attack_range: Fixed,
    target: Option<Sighting>,
    nearest: Option<Sighting>,
) -> Vec2Fixed {
    match ai.current {
        AiBehavior::Idle => Vec2Fixed::ZERO,
        AiBehavior::Chase | AiBehavior::Attack => match target {
            Some(target) if !position.within(target.position, attack_range) => {
                steer(position, target.position, speed)
            }
            _ => Vec2Fixed::ZERO,
        },
        AiBehavior::Flee => nearest.map_or(Vec2Fixed::ZERO, |threat| steer(threat.position, position, speed)),
        AiBehavior::Guard => match ai.guard_position {
            Some(post) if position.distance_squared(post) > arrival_threshold_sq() => {
                steer(position, post, speed)
            }
            _ => Vec2Fixed::ZERO,
        },
        AiBehavior::Patrol => {
            if ai.patrol_points.is_empty() {
                return Vec2Fixed::ZERO;
            }
            let len = ai.patrol_points.len();
            let mut index = ai.patrol_index % len;
            if position.distance_squared(ai.patrol_points[index]) <= arrival_threshold_sq() {
                index = (index + 1) % len;
            }
            ai.patrol_index = index;
            let waypoint = ai.patrol_points[index];
            if position.distance_squared(waypoint) <= arrival_threshold_sq() {
                Vec2Fixed::ZERO
            } else {
                steer(position, waypoint, speed)
            }
        }
    }
}

fn following_orders(entity: &Entity) -> bool {
    entity
        .commands
        .as_ref()
        .and_then(|commands| commands.current())
        .is_some_and(|command| matches!(command, Command::MoveTo(_)))
}

impl System for AiSystem {
    fn name(&self) -> &'static str {
        "ai"
    }

    fn required_components(&self) -> &'static [ComponentKind] {
        REQUIRED
    }

    fn update(&mut self, dt: Fixed, registry: &mut Registry, ctx: &mut SimContext) {
        let seen = sightings(registry);
        let find = |id: Option<EntityId>| id.and_then(|id| seen.iter().find(|s| s.id == id).copied());

        for id in registry.query(REQUIRED) {
            let Some(entity) = registry.get_mut(id) else {
                continue;
            };
            if !entity.is_alive() || following_orders(entity) {
                continue;
            }
            let (Some(ai), Some(position), Some(stats)) =
                (entity.ai.as_mut(), entity.position, entity.stats)
            else {
                continue;
            };
            let position = position.value;
            let team = entity.team.map(|team| team.team_id);
            let nearest = nearest_hostile(&seen, team, position);
            let mut target = find(entity.combat.and_then(|combat| combat.current_target))
                .filter(|target| Some(target.team) != team);

            ai.decision_timer += dt;
            if ai.decision_timer >= ai.decision_interval {
                ai.decision_timer = Fixed::ZERO;
                let decision = decide(
                    ai,
                    stats.health_percentage(),
                    target,
                    nearest,
                    position,
                    stats.attack_range,
                );
                if decision.behavior != ai.current {
                    debug!(
                        entity = id,
                        tick = ctx.tick,
                        from = ?ai.current,
                        to = ?decision.behavior,
                        "AI behavior changed"
                    );
                    ai.current = decision.behavior;
                }
                target = find(decision.target);
                if let Some(combat) = entity.combat.as_mut() {
                    match decision.target {
                        Some(target) => {
                            combat.current_target = Some(target);
                            combat.in_combat = true;
                        }
                        None => combat.clear_target(),
                    }
                }
            }

            let velocity = steering(ai, position, stats.move_speed, stats.attack_range, target, nearest);
            entity.velocity = Some(Velocity::new(velocity));
        }
    }
}
