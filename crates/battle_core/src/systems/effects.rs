use crate::combat::effects::{refresh_stats, update_effects};
use crate::combat::elemental::decay_auras;
use crate::components::ComponentKind;
use crate::events::CombatEvent;
use crate::math::Fixed;
use crate::registry::Registry;
use crate::scheduler::{SimContext, System};

/// Ticks status effects and elemental marks down, expiring finished ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct EffectsSystem;

impl System for EffectsSystem {
    fn name(&self) -> &'static str {
        "effects"
    }

    fn update(&mut self, dt: Fixed, registry: &mut Registry, ctx: &mut SimContext) {
        let ids: Vec<_> = registry
            .iter()
            .filter(|e| e.has(ComponentKind::Effects) || e.has(ComponentKind::Elemental))
            .map(|e| e.id)
            .collect();

        for id in ids {
            let Some(entity) = registry.get_mut(id) else {
                continue;
            };

            let expired = entity
                .effects
                .as_mut()
                .map(|effects| update_effects(effects, dt))
                .unwrap_or_default();
            if !expired.is_empty() {
                refresh_stats(entity);
            }

            let faded = entity
                .elemental
                .as_mut()
                .map(|elemental| decay_auras(&mut elemental.active_effects, dt))
                .unwrap_or_default();

            for effect_id in expired.iter().chain(&faded) {
                ctx.events
                    .combat
                    .push(CombatEvent::expired(ctx.tick, id, effect_id));
            }
        }
    }
}
