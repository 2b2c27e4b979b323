//! Test fixtures and helpers.
//!
//! The sample roster, ready-made battles and stat builders for consistent
//! testing.

use battle_core::battle::Battle;
use battle_core::components::{EntityId, TeamId};
use battle_core::config::SimConfig;
use battle_core::data::DefinitionTable;
use battle_core::factory::CharacterSpawn;
use battle_core::math::{Fixed, Vec2Fixed};
use battle_core::rng::ScriptedRolls;
use battle_core::stats::Stats;

/// The sample roster shipped in `assets/data/roster.ron`.
pub const ROSTER_RON: &str = include_str!("../../../assets/data/roster.ron");

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> Fixed {
    Fixed::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> Fixed {
    Fixed::from_num(n)
}

/// The sample roster, parsed and validated.
///
/// # Panics
///
/// Panics if the bundled roster no longer parses.
#[must_use]
pub fn roster() -> DefinitionTable {
    match DefinitionTable::from_ron_str("assets/data/roster.ron", ROSTER_RON) {
        Ok(table) => table,
        Err(err) => panic!("bundled roster is invalid: {err}"),
    }
}

/// Stats at full health with attack, armor and nothing random.
#[must_use]
pub fn plain_stats(max_health: i32, attack: i32, armor: i32) -> Stats {
    let mut stats = Stats::with_health(fixed(max_health));
    stats.attack_damage = fixed(attack);
    stats.armor = fixed(armor);
    stats
}

/// Line a team up along x = `x`, two units apart on y.
///
/// # Panics
///
/// Panics if a character id is not in the battle's definitions.
pub fn deploy(battle: &mut Battle, team: TeamId, x: i32, characters: &[&str]) -> Vec<EntityId> {
    characters
        .iter()
        .enumerate()
        .map(|(slot, id)| {
            let y = i32::try_from(slot).unwrap_or(i32::MAX) * 2;
            let mut spawn = CharacterSpawn::new(*id, team, Vec2Fixed::from_ints(x, y));
            spawn.formation_slot = u8::try_from(slot).unwrap_or(u8::MAX);
            spawn.is_leader = slot == 0;
            match battle.spawn_character(&spawn) {
                Ok(entity) => entity,
                Err(err) => panic!("cannot deploy {id}: {err}"),
            }
        })
        .collect()
}

/// Default three-a-side lineup for skirmishes.
pub const LINEUP_A: [&str; 3] = ["knight", "pyromancer", "cleric"];
/// Opposing three-a-side lineup.
pub const LINEUP_B: [&str; 3] = ["warden", "ranger", "tidecaller"];

/// A seeded three-versus-three battle on the sample roster.
#[must_use]
pub fn skirmish(seed: u64) -> Battle {
    let mut battle = Battle::with_seed(seed, SimConfig::default(), roster());
    deploy(&mut battle, 1, 0, &LINEUP_A);
    deploy(&mut battle, 2, 10, &LINEUP_B);
    battle
}

/// The same skirmish with every roll scripted to miss.
#[must_use]
pub fn scripted_skirmish() -> Battle {
    let mut battle = Battle::with_standard_systems(
        SimConfig::default(),
        roster(),
        Box::new(ScriptedRolls::never()),
    );
    deploy(&mut battle, 1, 0, &LINEUP_A);
    deploy(&mut battle, 2, 10, &LINEUP_B);
    battle
}
