//! Injected randomness for crit, dodge and block rolls.
//!
//! The engine never reaches for ambient randomness. Every roll comes from a
//! [`RollSource`] owned by the battle context, so a seed plus a command log
//! reproduces a battle exactly.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::math::Fixed;

/// A source of uniform rolls in `[0, 1)`.
pub trait RollSource: Send {
    /// Draw the next roll.
    fn roll(&mut self) -> Fixed;
}

/// Seeded generator used by live battles.
#[derive(Debug, Clone)]
pub struct SimRng {
    rng: StdRng,
    seed: u64,
}

impl SimRng {
    /// Create a generator from a seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// The seed this generator was created with.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }
}

impl RollSource for SimRng {
    fn roll(&mut self) -> Fixed {
        // 32 random fractional bits map exactly onto I32F32's fraction.
        Fixed::from_bits(i64::from(self.rng.gen::<u32>()))
    }
}

/// Replays a fixed sequence of rolls, then a fallback value forever.
///
/// Handy for pinning down exact crit/dodge outcomes in scenarios.
#[derive(Debug, Clone)]
pub struct ScriptedRolls {
    queue: VecDeque<Fixed>,
    fallback: Fixed,
}

impl ScriptedRolls {
    /// Replay `rolls` in order, then return `fallback`.
    #[must_use]
    pub fn new(rolls: impl IntoIterator<Item = Fixed>, fallback: Fixed) -> Self {
        Self {
            queue: rolls.into_iter().collect(),
            fallback,
        }
    }

    /// A source that always rolls just below one, so no chance below 100% fires.
    #[must_use]
    pub fn never() -> Self {
        Self::new([], Fixed::ONE - Fixed::DELTA)
    }

    /// A source that always rolls zero, so every non-zero chance fires.
    #[must_use]
    pub fn always() -> Self {
        Self::new([], Fixed::ZERO)
    }

    /// Rolls not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl RollSource for ScriptedRolls {
    fn roll(&mut self) -> Fixed {
        self.queue.pop_front().unwrap_or(self.fallback)
    }
}
