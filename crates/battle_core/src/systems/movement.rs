use crate::components::{ComponentKind, Velocity};
use crate::math::Fixed;
use crate::registry::Registry;
use crate::scheduler::{SimContext, System};

/// Integrates `position += velocity * dt`.
///
/// Entities under a movement-impairing effect are held in place and their
/// velocity is zeroed.
#[derive(Debug, Default, Clone, Copy)]
pub struct MovementSystem;

const REQUIRED: &[ComponentKind] = &[ComponentKind::Position, ComponentKind::Velocity];

impl System for MovementSystem {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn required_components(&self) -> &'static [ComponentKind] {
        REQUIRED
    }

    fn update(&mut self, dt: Fixed, registry: &mut Registry, _ctx: &mut SimContext) {
        for id in registry.query(REQUIRED) {
            let Some(entity) = registry.get_mut(id) else {
                continue;
            };
            let impaired = entity
                .effects
                .as_ref()
                .is_some_and(|effects| effects.is_movement_impaired());
            let (Some(position), Some(velocity)) = (entity.position.as_mut(), entity.velocity.as_mut())
            else {
                continue;
            };
            if impaired {
                *velocity = Velocity::ZERO;
                continue;
            }
            position.value += velocity.value.scale(dt);
        }
    }
}
