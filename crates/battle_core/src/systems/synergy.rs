use std::collections::BTreeMap;

use tracing::debug;

use crate::combat::effects::refresh_stats;
use crate::combat::synergy::compute_synergy;
use crate::components::{CharacterClass, ComponentKind, EntityId, Race, TeamId};
use crate::math::Fixed;
use crate::registry::Registry;
use crate::scheduler::{SimContext, System};

/// Sorted class/race pairs of a team's living members.
type Signature = Vec<(CharacterClass, Race)>;

/// Recomputes team synergies when a team's living composition changes.
#[derive(Debug, Default, Clone)]
pub struct SynergySystem {
    signatures: BTreeMap<TeamId, Signature>,
}

const REQUIRED: &[ComponentKind] = &[ComponentKind::Team, ComponentKind::Character];

impl System for SynergySystem {
    fn name(&self) -> &'static str {
        "synergy"
    }

    fn required_components(&self) -> &'static [ComponentKind] {
        REQUIRED
    }

    fn update(&mut self, _dt: Fixed, registry: &mut Registry, ctx: &mut SimContext) {
        let mut members: BTreeMap<TeamId, Vec<EntityId>> = BTreeMap::new();
        let mut rosters: BTreeMap<TeamId, Signature> = BTreeMap::new();

        for id in registry.query(REQUIRED) {
            let Some(entity) = registry.get(id) else {
                continue;
            };
            let (Some(team), Some(character)) = (entity.team, entity.character.as_ref()) else {
                continue;
            };
            members.entry(team.team_id).or_default().push(id);
            let roster = rosters.entry(team.team_id).or_default();
            if entity.is_alive() {
                roster.push((character.class, character.race));
            }
        }

        for (team, mut roster) in rosters {
            roster.sort_unstable();
            if self.signatures.get(&team) == Some(&roster) {
                continue;
            }

            let synergy = compute_synergy(&ctx.definitions.synergies, &roster);
            debug!(
                team,
                bonuses = synergy.bonuses.len(),
                "Team composition changed, synergies recomputed"
            );
            for id in members.get(&team).into_iter().flatten() {
                if let Some(entity) = registry.get_mut(*id) {
                    entity.synergy = Some(synergy.clone());
                    refresh_stats(entity);
                }
            }
            self.signatures.insert(team, roster);
        }
    }
}
