//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a battle produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Battles must replay exactly from a seed and a command log. Sources of
//! non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`battle_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Entities and definitions live in ordered maps and are visited in id order.
//!
//! - **Ambient randomness**: Every crit, dodge and block roll comes from the
//!   battle's injected roll source, seeded per battle.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual system determinism (movement, combat, etc.)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full battles are reproducible
//! 4. **Parallel tests**: Running N battles in parallel all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use battle_core::battle::{Battle, BattleSnapshot};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel battle runs.
#[derive(Debug, Clone)]
pub struct ParallelRunResult {
    /// Final state hash from each battle.
    pub hashes: Vec<u64>,
    /// Number of ticks each battle ran.
    pub ticks: u64,
    /// Number of battles run.
    pub runs: usize,
}

impl ParallelRunResult {
    /// Check if all battles produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all battles matched.
    ///
    /// # Panics
    ///
    /// Panics if battles produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel battles diverged!\n\
                 Battles: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.runs,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run any stepped state multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute a state hash
///
/// # Example
///
/// ```
/// use battle_test_utils::determinism::verify_determinism;
/// use battle_test_utils::fixtures::skirmish;
///
/// let result = verify_determinism(
///     3,
///     100,
///     || skirmish(42),
///     |battle| {
///         battle.step();
///     },
///     |battle| battle.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a battle twice from the same setup and compare final state hashes.
pub fn verify_battle_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Battle,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |battle| {
            battle.step();
        },
        Battle::state_hash,
    )
    .is_deterministic
}

/// Run N battles on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences.
///
/// # Panics
///
/// Panics if a battle thread panics.
pub fn run_parallel_battles<F>(setup_fn: F, runs: usize, num_ticks: u64) -> ParallelRunResult
where
    F: Fn() -> Battle + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..runs)
            .map(|_| {
                s.spawn(|| {
                    let mut battle = setup_fn();
                    for _ in 0..num_ticks {
                        battle.step();
                    }
                    battle.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(hash) => hash,
                Err(_) => panic!("battle thread panicked"),
            })
            .collect()
    });

    ParallelRunResult {
        hashes,
        ticks: num_ticks,
        runs,
    }
}

/// Step two battles side by side and report the first tick where their
/// state hashes or event logs differ.
///
/// # Returns
///
/// `None` if the battles stay identical, `Some(tick)` otherwise (0 when
/// they differ before the first step).
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Battle,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        let events_a = first.step();
        let events_b = second.step();

        if events_a != events_b || first.state_hash() != second.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that a snapshot survives a bincode round trip unchanged.
pub fn verify_snapshot_round_trip<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Battle,
{
    let mut battle = setup_fn();
    for _ in 0..num_ticks {
        battle.step();
    }

    let snapshot = battle.snapshot();
    let Ok(bytes) = snapshot.to_bytes() else {
        return false;
    };
    BattleSnapshot::from_bytes(&bytes).is_ok_and(|restored| restored == snapshot)
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism and invariant testing.
pub mod strategies {
    use battle_core::components::Command;
    use battle_core::math::{Fixed, Vec2Fixed};
    use battle_core::stats::Stats;
    use proptest::prelude::*;

    /// Generate a fixed-point coordinate on a small arena.
    ///
    /// Range: -50 to 50
    pub fn arb_fixed_position() -> impl Strategy<Value = Fixed> {
        (-50i32..50i32).prop_map(Fixed::from_num)
    }

    /// Generate a fixed-point 2D vector for positions.
    pub fn arb_vec2_position() -> impl Strategy<Value = Vec2Fixed> {
        (arb_fixed_position(), arb_fixed_position()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// Generate a MoveTo command.
    pub fn arb_move_command() -> impl Strategy<Value = Command> {
        arb_vec2_position().prop_map(Command::MoveTo)
    }

    /// Generate any command without entity references.
    pub fn arb_command() -> impl Strategy<Value = Command> {
        prop_oneof![4 => arb_move_command(), 1 => Just(Command::Stop)]
    }

    /// Generate a sequence of commands.
    pub fn arb_command_sequence(max_len: usize) -> impl Strategy<Value = Vec<Command>> {
        proptest::collection::vec(arb_command(), 0..max_len)
    }

    /// Generate a roll in `[0, 1)`.
    pub fn arb_roll() -> impl Strategy<Value = Fixed> {
        (0u32..1000u32).prop_map(|n| Fixed::from_num(n) / Fixed::from_num(1000))
    }

    /// Generate a probability in whole percent, as a fraction.
    pub fn arb_chance() -> impl Strategy<Value = Fixed> {
        (0i32..=100i32).prop_map(battle_core::math::percent)
    }

    /// Generate a battle seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Generate combat stats with every random chance in range.
    pub fn arb_stats() -> impl Strategy<Value = Stats> {
        (
            1i32..1000,
            0i32..200,
            0i32..200,
            0i32..300,
            0i32..300,
            (arb_chance(), arb_chance(), arb_chance()),
        )
            .prop_map(|(health, attack, magic, armor, resist, (crit, dodge, block))| {
                let mut stats = Stats::with_health(Fixed::from_num(health));
                stats.attack_damage = Fixed::from_num(attack);
                stats.magic_power = Fixed::from_num(magic);
                stats.armor = Fixed::from_num(armor);
                stats.magic_resist = Fixed::from_num(resist);
                stats.crit_chance = crit;
                stats.dodge_chance = dodge;
                stats.block_chance = block;
                stats
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{roster, scripted_skirmish, skirmish, LINEUP_A};
    use battle_core::components::Command;
    use battle_core::config::SimConfig;
    use battle_core::events::CombatEventKind;
    use battle_core::factory::CharacterSpawn;
    use battle_core::math::Vec2Fixed;
    use proptest::prelude::*;

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_empty_battle_determinism() {
        assert!(verify_battle_determinism(
            || Battle::with_seed(0, SimConfig::default(), roster()),
            100
        ));
    }

    #[test]
    fn test_skirmish_determinism() {
        let result = verify_determinism(
            4,
            400,
            || skirmish(42),
            |battle| {
                battle.step();
            },
            Battle::state_hash,
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_skirmish_has_no_divergence() {
        assert_eq!(find_first_divergence(|| skirmish(7), 300), None);
    }

    #[test]
    fn test_different_setups_diverge() {
        let seed = std::cell::Cell::new(0u64);
        let divergence = find_first_divergence(
            || {
                seed.set(seed.get() + 1);
                let mut battle = Battle::with_seed(seed.get(), SimConfig::default(), roster());
                let x = i32::try_from(seed.get()).unwrap_or(0);
                battle
                    .spawn_character(&CharacterSpawn::new("knight", 1, Vec2Fixed::from_ints(x, 0)))
                    .unwrap();
                battle
            },
            10,
        );
        // spawns are pending until the first step
        assert_eq!(divergence, Some(1));
    }

    #[test]
    fn test_scripted_skirmish_is_decided() {
        let mut battle = scripted_skirmish();
        let mut deaths = 0;
        for _ in 0..20_000 {
            let events = battle.step();
            deaths += events.of_kind(CombatEventKind::Death).count();
            if battle.is_over() {
                break;
            }
        }
        assert!(battle.is_over());
        assert!(deaths >= LINEUP_A.len());
    }

    #[test]
    fn test_snapshot_round_trip() {
        assert!(verify_snapshot_round_trip(|| skirmish(3), 120));
    }

    #[test]
    fn test_parallel_skirmishes() {
        run_parallel_battles(|| skirmish(99), 4, 300).assert_deterministic();
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_seeded_skirmishes_are_deterministic(seed in strategies::arb_seed()) {
            prop_assert!(verify_battle_determinism(|| skirmish(seed), 150));
        }

        #[test]
        fn prop_command_sequences_are_replayable(
            commands in strategies::arb_command_sequence(8),
        ) {
            let setup = || {
                let mut battle = skirmish(5);
                for command in &commands {
                    battle.queue_command(1, command.clone()).unwrap();
                }
                battle
            };
            prop_assert_eq!(find_first_divergence(setup, 120), None);
        }

        #[test]
        fn prop_stop_always_accepted(seed in strategies::arb_seed()) {
            let mut battle = skirmish(seed);
            prop_assert!(battle.apply_command(1, Command::Stop).is_ok());
        }
    }
}
