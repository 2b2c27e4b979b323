//! Character construction from definitions.

use tracing::debug;

use crate::components::{
    Ai, BaseStats, Character, Collision, CombatState, CommandQueue, Effects, Elemental, EntityId,
    Lifecycle, Position, Skills, Synergy, Team, TeamId, Velocity,
};
use crate::config::SimConfig;
use crate::data::{or_default, AiData, CharacterData, DefinitionTable};
use crate::error::{GameError, Result};
use crate::math::{Fixed, Vec2Fixed};
use crate::registry::Registry;

/// Collision group every character belongs to.
pub const CHARACTER_GROUP: &str = "character";

/// Where and for whom to spawn a character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterSpawn {
    /// Definition id.
    pub character_id: String,
    /// Owning team.
    pub team: TeamId,
    /// Formation slot within the team.
    pub formation_slot: u8,
    /// Whether this member leads the team.
    pub is_leader: bool,
    /// Spawn position.
    pub position: Vec2Fixed,
}

impl CharacterSpawn {
    /// Spawn `character_id` for `team` at `position`, slot 0.
    #[must_use]
    pub fn new(character_id: impl Into<String>, team: TeamId, position: Vec2Fixed) -> Self {
        Self {
            character_id: character_id.into(),
            team,
            formation_slot: 0,
            is_leader: false,
            position,
        }
    }
}

/// Team tag carried by every member of `team`.
#[must_use]
pub fn team_tag(team: TeamId) -> String {
    format!("team:{team}")
}

fn build_ai(data: &AiData, config: &SimConfig) -> Ai {
    let mut ai = Ai::new(
        data.behavior,
        or_default(data.decision_interval, config.decision_interval),
    );
    ai.detection_range = or_default(data.detection_range, ai.detection_range);
    ai.support_range = or_default(data.support_range, ai.support_range);
    ai.flee_health_percentage = or_default(data.flee_health_percentage, ai.flee_health_percentage);
    ai.safe_health_percentage = or_default(data.safe_health_percentage, ai.safe_health_percentage);
    ai.patrol_points = data.patrol_route();
    ai.guard_position = data.guard_post();
    ai
}

fn build_skills(data: &CharacterData, definitions: &DefinitionTable, config: &SimConfig) -> Result<Skills> {
    let skills = data
        .skills
        .iter()
        .map(|id| {
            definitions
                .skill(id)
                .cloned()
                .ok_or_else(|| GameError::DefinitionError {
                    id: data.id.clone(),
                    message: format!("unknown skill `{id}`"),
                })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Skills::new(skills, or_default(data.max_energy, config.max_energy)))
}

fn build_elemental(data: &CharacterData) -> Option<Elemental> {
    let element = data.element.as_ref()?;
    let mut elemental = Elemental::new(element.primary);
    elemental.secondary = element.secondary;
    elemental.resistances = element.resistances.clone();
    elemental.damage_bonus = element.damage_bonus.clone();
    Some(elemental)
}

/// Create a fully equipped character entity from its definition.
///
/// The entity is pending until the registry's next flush. It is tagged
/// `character`, its team tag and its definition's tags. Characters with
/// AI data get an [`Ai`]; the rest are player-controlled.
///
/// # Errors
///
/// [`GameError::UnknownCharacter`] when the id is not defined, and
/// [`GameError::DefinitionError`] when the character names a missing skill.
pub fn spawn_character(
    registry: &mut Registry,
    definitions: &DefinitionTable,
    config: &SimConfig,
    spawn: &CharacterSpawn,
    now: Fixed,
) -> Result<EntityId> {
    let data = definitions
        .character(&spawn.character_id)
        .ok_or_else(|| GameError::UnknownCharacter(spawn.character_id.clone()))?;
    let skills = build_skills(data, definitions, config)?;
    let stats = data.base_stats(config);

    let tags = [CHARACTER_GROUP.to_string(), team_tag(spawn.team)]
        .into_iter()
        .chain(data.tags.iter().cloned());
    let id = registry.create_with_tags(tags);
    let Some(entity) = registry.get_mut(id) else {
        return Err(GameError::EntityNotFound(id));
    };

    entity.position = Some(Position::new(spawn.position));
    entity.velocity = Some(Velocity::ZERO);
    entity.stats = Some(stats);
    entity.base_stats = Some(BaseStats(stats));
    entity.character = Some(Character {
        definition_id: data.id.clone(),
        name: data.name.clone(),
        class: data.class,
        race: data.race,
    });
    entity.team = Some(Team {
        team_id: spawn.team,
        formation_slot: spawn.formation_slot,
        is_leader: spawn.is_leader,
    });
    entity.combat = Some(CombatState::new());
    entity.skills = Some(skills);
    entity.effects = Some(Effects::default());
    entity.elemental = build_elemental(data);
    entity.synergy = Some(Synergy::default());
    entity.ai = data.ai.as_ref().map(|ai| build_ai(ai, config));
    entity.collision = Some(Collision::dynamic(Fixed::ONE, Fixed::ONE, CHARACTER_GROUP));
    entity.lifecycle = Some(Lifecycle::new(now));
    entity.commands = Some(CommandQueue::new());

    debug!(entity = id, character = %data.id, team = spawn.team, "Spawned character");
    Ok(id)
}
