//! Priority-ordered system scheduler and the context systems run against.

use tracing::debug;

use crate::components::ComponentKind;
use crate::config::SimConfig;
use crate::data::DefinitionTable;
use crate::events::TickEvents;
use crate::math::Fixed;
use crate::registry::{FlushReport, Registry};
use crate::rng::RollSource;

/// Shared state handed to every system, in place of global singletons.
pub struct SimContext {
    /// Source of every random roll.
    pub rolls: Box<dyn RollSource>,
    /// Tuning knobs.
    pub config: SimConfig,
    /// Character, skill, effect and synergy definitions.
    pub definitions: DefinitionTable,
    /// Current tick number.
    pub tick: u64,
    /// Seconds elapsed since the battle started.
    pub elapsed: Fixed,
    /// Events produced during the current tick.
    pub events: TickEvents,
}

impl SimContext {
    /// Build a context at tick zero.
    #[must_use]
    pub fn new(rolls: Box<dyn RollSource>, config: SimConfig, definitions: DefinitionTable) -> Self {
        Self {
            rolls,
            config,
            definitions,
            tick: 0,
            elapsed: Fixed::ZERO,
            events: TickEvents::new(0),
        }
    }
}

/// Behavior run once per tick over the registry.
///
/// `init` and `destroy` run once each, when the system is added to or
/// removed from a [`Scheduler`].
pub trait System: Send {
    /// Unique name; the scheduler keys systems by it.
    fn name(&self) -> &'static str;

    /// Components an entity needs for this system to touch it.
    fn required_components(&self) -> &'static [ComponentKind] {
        &[]
    }

    /// Called when the system is registered.
    fn init(&mut self) {}

    /// Called when the system is removed.
    fn destroy(&mut self) {}

    /// Advance the system by `dt` seconds.
    fn update(&mut self, dt: Fixed, registry: &mut Registry, ctx: &mut SimContext);
}

struct ScheduledSystem {
    system: Box<dyn System>,
    priority: i32,
    enabled: bool,
}

/// Runs systems in ascending priority order; ties keep insertion order.
#[derive(Default)]
pub struct Scheduler {
    systems: Vec<ScheduledSystem>,
    dirty: bool,
}

impl Scheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a system. Returns `false` if the name is already taken.
    pub fn add_system(&mut self, mut system: Box<dyn System>, priority: i32) -> bool {
        let name = system.name();
        if self.contains(name) {
            debug!("System {name} already registered");
            return false;
        }
        system.init();
        self.systems.push(ScheduledSystem {
            system,
            priority,
            enabled: true,
        });
        self.dirty = true;
        debug!("Registered system {name} at priority {priority}");
        true
    }

    /// Remove a system by name. Returns `false` if it was not registered.
    pub fn remove_system(&mut self, name: &str) -> bool {
        let Some(index) = self.position(name) else {
            return false;
        };
        let mut entry = self.systems.remove(index);
        entry.system.destroy();
        self.dirty = true;
        debug!("Removed system {name}");
        true
    }

    /// Enable or disable a system without losing its state.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.position(name) {
            Some(index) => {
                self.systems[index].enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Whether a system is enabled; `None` if it is not registered.
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        self.position(name).map(|index| self.systems[index].enabled)
    }

    /// Whether a system with `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Whether no systems are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// System names in the order they will run.
    pub fn execution_order(&mut self) -> Vec<&'static str> {
        self.sort_if_dirty();
        self.systems.iter().map(|entry| entry.system.name()).collect()
    }

    /// Run one tick: flush pending entity changes, re-sort if needed, then
    /// update every enabled system in order.
    pub fn update(&mut self, dt: Fixed, registry: &mut Registry, ctx: &mut SimContext) -> FlushReport {
        let report = registry.flush();
        self.sort_if_dirty();

        for entry in self.systems.iter_mut().filter(|entry| entry.enabled) {
            entry.system.update(dt, registry, ctx);
        }

        report
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.systems.iter().position(|entry| entry.system.name() == name)
    }

    fn sort_if_dirty(&mut self) {
        if self.dirty {
            self.systems.sort_by_key(|entry| entry.priority);
            self.dirty = false;
        }
    }
}
