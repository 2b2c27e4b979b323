//! Headless seeded battles for balancing and replay checks.

use std::fmt::Write as _;

use battle_core::battle::{Battle, EntitySnapshot};
use battle_core::components::TeamId;
use battle_core::config::SimConfig;
use battle_core::data::DefinitionTable;
use battle_core::events::CombatEvent;
use battle_core::factory::CharacterSpawn;
use battle_core::math::Vec2Fixed;
use serde::Serialize;
use tracing::{debug, info};

use crate::Result;

/// Settings for one headless run.
#[derive(Debug, Clone)]
pub struct SimulateOptions {
    /// Seed for the battle RNG.
    pub seed: u64,
    /// Give up after this many ticks.
    pub max_ticks: u64,
    /// Team 1 character ids. Empty means the first half of the roster.
    pub team_a: Vec<String>,
    /// Team 2 character ids. Empty means the rest of the roster.
    pub team_b: Vec<String>,
    /// Horizontal gap between the two lines.
    pub separation: i32,
}

impl Default for SimulateOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            max_ticks: 6_000,
            team_a: Vec::new(),
            team_b: Vec::new(),
            separation: 10,
        }
    }
}

/// Result of a headless run.
#[derive(Debug, Clone, Serialize)]
pub struct BattleLog {
    /// Seed used.
    pub seed: u64,
    /// Ticks simulated.
    pub ticks: u64,
    /// Winning team; `None` for a draw or timeout.
    pub winner: Option<TeamId>,
    /// Final state hash.
    pub state_hash: u64,
    /// Every combat event in order.
    pub events: Vec<CombatEvent>,
    /// Entities still present at the end.
    pub survivors: Vec<EntitySnapshot>,
}

impl BattleLog {
    /// Render the log as plain text, one event per line.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for event in &self.events {
            let _ = writeln!(out, "[{:>6}] {}", event.tick, event.description);
        }
        let _ = match self.winner {
            Some(team) => writeln!(out, "team {team} wins after {} ticks", self.ticks),
            None => writeln!(out, "no winner after {} ticks", self.ticks),
        };
        let _ = writeln!(out, "state hash {:016x}", self.state_hash);
        out
    }
}

fn default_lineups(table: &DefinitionTable) -> (Vec<String>, Vec<String>) {
    let ids: Vec<String> = table.characters.iter().map(|c| c.id.clone()).collect();
    if ids.len() < 2 {
        return (ids.clone(), ids);
    }
    let (a, b) = ids.split_at(ids.len() / 2);
    (a.to_vec(), b.to_vec())
}

fn deploy(battle: &mut Battle, team: TeamId, x: i32, lineup: &[String]) -> Result<()> {
    for (slot, id) in lineup.iter().enumerate() {
        let y = i32::try_from(slot).unwrap_or(i32::MAX).saturating_mul(2);
        let mut spawn = CharacterSpawn::new(id.clone(), team, Vec2Fixed::from_ints(x, y));
        spawn.formation_slot = u8::try_from(slot).unwrap_or(u8::MAX);
        spawn.is_leader = slot == 0;
        battle.spawn_character(&spawn)?;
    }
    Ok(())
}

/// Run a seeded battle between two lineups until one team remains.
///
/// # Errors
///
/// Fails if a lineup names a character the table does not define.
pub fn run_battle(table: DefinitionTable, options: &SimulateOptions) -> Result<BattleLog> {
    let (default_a, default_b) = default_lineups(&table);
    let team_a = if options.team_a.is_empty() { default_a } else { options.team_a.clone() };
    let team_b = if options.team_b.is_empty() { default_b } else { options.team_b.clone() };

    let mut battle = Battle::with_seed(options.seed, SimConfig::default(), table);
    deploy(&mut battle, 1, 0, &team_a)?;
    deploy(&mut battle, 2, options.separation, &team_b)?;
    debug!(seed = options.seed, ?team_a, ?team_b, "Battle deployed");

    let mut events = Vec::new();
    // First tick flushes the spawns; only then can a side be empty.
    loop {
        let tick = battle.step();
        events.extend(tick.combat);
        if battle.is_over() || battle.tick() >= options.max_ticks {
            break;
        }
    }

    let snapshot = battle.snapshot();
    let winner = battle.outcome();
    info!(
        ticks = snapshot.tick,
        events = events.len(),
        ?winner,
        "Battle finished"
    );
    Ok(BattleLog {
        seed: options.seed,
        ticks: snapshot.tick,
        winner,
        state_hash: snapshot.state_hash,
        events,
        survivors: snapshot.entities,
    })
}

/// Encode a log as pretty JSON.
///
/// # Errors
///
/// Fails only if serialization fails.
pub fn to_json(log: &BattleLog) -> Result<String> {
    Ok(serde_json::to_string_pretty(log)?)
}
