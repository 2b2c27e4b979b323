//! End-to-end battle tests.
//!
//! These drive a [`Battle`] (or the scheduler directly) tick by tick and
//! check behavior that spans several systems.

use std::sync::{Arc, Mutex};

use battle_core::battle::Battle;
use battle_core::components::{
    AiBehavior, Command, Component, ComponentKind, Position, Velocity,
};
use battle_core::config::SimConfig;
use battle_core::data::DefinitionTable;
use battle_core::error::GameError;
use battle_core::events::CombatEventKind;
use battle_core::factory::CharacterSpawn;
use battle_core::math::{Fixed, Vec2Fixed};
use battle_core::registry::Registry;
use battle_core::rng::ScriptedRolls;
use battle_core::scheduler::{Scheduler, SimContext, System};
use battle_test_utils::determinism::{
    find_first_divergence, run_parallel_battles, verify_battle_determinism,
    verify_snapshot_round_trip,
};
use battle_test_utils::fixtures::{fixed, scripted_skirmish, skirmish};

// =============================================================================
// Scheduler
// =============================================================================

struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl System for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn update(&mut self, _dt: Fixed, _registry: &mut Registry, _ctx: &mut SimContext) {
        self.log.lock().unwrap().push(self.name);
    }
}

fn context() -> SimContext {
    SimContext::new(
        Box::new(ScriptedRolls::never()),
        SimConfig::default(),
        DefinitionTable::default(),
    )
}

#[test]
fn test_systems_run_in_priority_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = Scheduler::new();
    for (name, priority) in [("late", 100), ("early", 0), ("middle", 50), ("middle_b", 50)] {
        let recorder = Recorder {
            name,
            log: Arc::clone(&log),
        };
        assert!(scheduler.add_system(Box::new(recorder), priority));
    }

    let mut registry = Registry::new();
    let mut ctx = context();
    scheduler.update(fixed(1), &mut registry, &mut ctx);

    assert_eq!(
        *log.lock().unwrap(),
        vec!["early", "middle", "middle_b", "late"]
    );
}

#[test]
fn test_disabled_system_is_skipped() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = Scheduler::new();
    for name in ["a", "b"] {
        let recorder = Recorder {
            name,
            log: Arc::clone(&log),
        };
        scheduler.add_system(Box::new(recorder), 0);
    }
    assert!(scheduler.set_enabled("a", false));

    scheduler.update(fixed(1), &mut Registry::new(), &mut context());
    assert_eq!(*log.lock().unwrap(), vec!["b"]);
}

#[test]
fn test_additions_become_visible_after_update() {
    let mut registry = Registry::new();
    let id = registry.create();
    registry.add_component(id, Component::Position(Position::new(Vec2Fixed::ZERO)));
    registry.add_component(id, Component::Velocity(Velocity::ZERO));

    assert!(registry.query(&[ComponentKind::Position]).is_empty());
    assert!(registry.get(id).is_some());

    let mut scheduler = Scheduler::new();
    let report = scheduler.update(fixed(1), &mut registry, &mut context());
    assert_eq!(report.added, vec![id]);
    assert_eq!(registry.query(&[ComponentKind::Position]), vec![id]);
}

// =============================================================================
// AI
// =============================================================================

const SCOUT_RON: &str = r#"(
    characters: [(
        id: "scout",
        name: "Scout",
        class: Ranger,
        race: Elf,
        stats: { MaxHealth: 100.0 },
        ai: Some((
            behavior: Idle,
            decision_interval: Some(0.05),
            flee_health_percentage: Some(20.0),
            safe_health_percentage: Some(40.0),
        )),
    )],
)"#;

fn set_health(battle: &mut Battle, id: u64, health: i32) {
    let stats = battle
        .registry_mut()
        .get_mut(id)
        .and_then(|entity| entity.stats.as_mut())
        .unwrap();
    stats.set_health(fixed(health));
}

fn behavior_after(battle: &mut Battle, id: u64, ticks: usize) -> AiBehavior {
    for _ in 0..ticks {
        battle.step();
    }
    battle.entity(id).and_then(|e| e.ai.as_ref()).unwrap().current
}

#[test]
fn test_flee_uses_hysteresis() {
    let definitions = DefinitionTable::from_ron_str("scout.ron", SCOUT_RON).unwrap();
    let mut battle = Battle::with_seed(1, SimConfig::default(), definitions);
    let scout = battle
        .spawn_character(&CharacterSpawn::new("scout", 1, Vec2Fixed::ZERO))
        .unwrap();

    set_health(&mut battle, scout, 15);
    assert_eq!(behavior_after(&mut battle, scout, 3), AiBehavior::Flee);

    // Above the flee threshold but below safety: keep running.
    set_health(&mut battle, scout, 25);
    assert_eq!(behavior_after(&mut battle, scout, 3), AiBehavior::Flee);

    set_health(&mut battle, scout, 40);
    assert_eq!(behavior_after(&mut battle, scout, 3), AiBehavior::Idle);
}

// =============================================================================
// Commands
// =============================================================================

#[test]
fn test_commands_to_unknown_entities_fail() {
    let mut battle = skirmish(1);
    let err = battle.apply_command(9_999, Command::Stop).unwrap_err();
    assert!(matches!(err, GameError::EntityNotFound(9_999)));
}

// =============================================================================
// Full battles
// =============================================================================

#[test]
fn test_dead_characters_leave_the_registry() {
    let mut battle = scripted_skirmish();
    let mut victims = Vec::new();
    while !battle.is_over() && battle.tick() < 20_000 {
        let events = battle.step();
        victims.extend(events.of_kind(CombatEventKind::Death).map(|e| e.defender));
    }
    battle.step();

    assert!(!victims.is_empty());
    for victim in victims {
        assert!(battle.entity(victim).is_none(), "entity {victim} lingered");
    }
    assert!(battle.outcome().is_some() || battle.living_teams().is_empty());
}

#[test]
fn test_seeded_skirmish_is_deterministic() {
    assert!(verify_battle_determinism(|| skirmish(7), 300));
    assert_eq!(find_first_divergence(|| skirmish(7), 300), None);
}

#[test]
fn test_parallel_skirmishes_agree() {
    run_parallel_battles(|| skirmish(11), 4, 200).assert_deterministic();
}

#[test]
fn test_snapshot_survives_round_trip() {
    assert!(verify_snapshot_round_trip(|| skirmish(3), 60));
}
