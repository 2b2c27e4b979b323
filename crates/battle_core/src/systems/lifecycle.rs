use tracing::trace;

use crate::components::ComponentKind;
use crate::math::Fixed;
use crate::registry::Registry;
use crate::scheduler::{SimContext, System};

/// Queues removal of inactive or expired entities.
///
/// Removal takes effect at the next tick boundary.
#[derive(Debug, Default, Clone, Copy)]
pub struct LifecycleSystem;

const REQUIRED: &[ComponentKind] = &[ComponentKind::Lifecycle];

impl System for LifecycleSystem {
    fn name(&self) -> &'static str {
        "lifecycle"
    }

    fn required_components(&self) -> &'static [ComponentKind] {
        REQUIRED
    }

    fn update(&mut self, _dt: Fixed, registry: &mut Registry, ctx: &mut SimContext) {
        let expired: Vec<_> = registry
            .query(REQUIRED)
            .into_iter()
            .filter(|id| {
                registry
                    .get(*id)
                    .and_then(|entity| entity.lifecycle)
                    .is_some_and(|lifecycle| lifecycle.is_expired(ctx.elapsed))
            })
            .collect();

        for id in expired {
            if registry.destroy(id) {
                trace!(entity = id, tick = ctx.tick, "Queued removal");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Lifecycle;
    use crate::stats::Stats;
    use crate::systems::test_support::{context, fighter};

    #[test]
    fn test_inactive_entities_are_removed_next_flush() {
        let mut registry = Registry::new();
        let id = fighter(&mut registry, 1, 0, Stats::default());
        registry.flush();
        registry.get_mut(id).unwrap().lifecycle.as_mut().unwrap().is_active = false;

        LifecycleSystem.update(Fixed::ONE, &mut registry, &mut context());
        assert!(registry.is_pending_removal(id));
        assert!(registry.get(id).is_some());

        assert_eq!(registry.flush().removed, vec![id]);
    }

    #[test]
    fn test_ttl_expiry() {
        let mut registry = Registry::new();
        let id = fighter(&mut registry, 1, 0, Stats::default());
        registry.get_mut(id).unwrap().lifecycle =
            Some(Lifecycle::new(Fixed::ZERO).with_ttl(Fixed::from_num(2)));
        registry.flush();
        let mut ctx = context();

        ctx.elapsed = Fixed::from_num(2);
        LifecycleSystem.update(Fixed::ONE, &mut registry, &mut ctx);
        assert!(!registry.is_pending_removal(id));

        ctx.elapsed = Fixed::from_num(3);
        LifecycleSystem.update(Fixed::ONE, &mut registry, &mut ctx);
        assert!(registry.is_pending_removal(id));
    }
}
