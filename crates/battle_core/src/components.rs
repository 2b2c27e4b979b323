//! ECS component definitions.
//!
//! Components are pure data with no behavior. An entity carries at most one
//! component of each kind; the registry owns them and drops them with the
//! entity. Cross-entity links (targets, effect sources) are plain ids.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::combat::effects::StatusEffect;
use crate::combat::elemental::{Element, ElementTable, ElementalAura};
use crate::data::{SkillDefinition, SkillId};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::stats::{StatModifier, Stats};

/// Unique identifier for entities.
pub type EntityId = u64;

/// Team identifier.
pub type TeamId = u8;

/// Component type tag, used for queries and removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentKind {
    /// [`Position`].
    Position,
    /// [`Velocity`].
    Velocity,
    /// [`Stats`] (derived, live values).
    Stats,
    /// [`BaseStats`].
    BaseStats,
    /// [`Character`].
    Character,
    /// [`Team`].
    Team,
    /// [`CombatState`].
    CombatState,
    /// [`Skills`].
    Skills,
    /// [`Effects`].
    Effects,
    /// [`Elemental`].
    Elemental,
    /// [`Synergy`].
    Synergy,
    /// [`Ai`].
    Ai,
    /// [`Collision`].
    Collision,
    /// [`Lifecycle`].
    Lifecycle,
    /// [`CommandQueue`].
    CommandQueue,
}

/// Tagged union over every component type, for attachment through the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Component {
    /// World position.
    Position(Position),
    /// Velocity.
    Velocity(Velocity),
    /// Live stats.
    Stats(Stats),
    /// Base stats from the character definition.
    BaseStats(BaseStats),
    /// Class/race identity.
    Character(Character),
    /// Team membership.
    Team(Team),
    /// Combat bookkeeping.
    CombatState(CombatState),
    /// Skills and cooldowns.
    Skills(Skills),
    /// Active status effects.
    Effects(Effects),
    /// Elemental affinity.
    Elemental(Elemental),
    /// Active synergy bonuses.
    Synergy(Synergy),
    /// AI state machine.
    Ai(Ai),
    /// Collision bounds.
    Collision(Collision),
    /// Lifetime tracking.
    Lifecycle(Lifecycle),
    /// Pending player commands.
    CommandQueue(CommandQueue),
}

impl Component {
    /// The kind tag of this component.
    #[must_use]
    pub const fn kind(&self) -> ComponentKind {
        match self {
            Component::Position(_) => ComponentKind::Position,
            Component::Velocity(_) => ComponentKind::Velocity,
            Component::Stats(_) => ComponentKind::Stats,
            Component::BaseStats(_) => ComponentKind::BaseStats,
            Component::Character(_) => ComponentKind::Character,
            Component::Team(_) => ComponentKind::Team,
            Component::CombatState(_) => ComponentKind::CombatState,
            Component::Skills(_) => ComponentKind::Skills,
            Component::Effects(_) => ComponentKind::Effects,
            Component::Elemental(_) => ComponentKind::Elemental,
            Component::Synergy(_) => ComponentKind::Synergy,
            Component::Ai(_) => ComponentKind::Ai,
            Component::Collision(_) => ComponentKind::Collision,
            Component::Lifecycle(_) => ComponentKind::Lifecycle,
            Component::CommandQueue(_) => ComponentKind::CommandQueue,
        }
    }
}

/// Position component in world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// World position.
    pub value: Vec2Fixed,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(value: Vec2Fixed) -> Self {
        Self { value }
    }
}

/// Velocity in world units per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Velocity {
    /// Velocity vector.
    pub value: Vec2Fixed,
}

impl Velocity {
    /// Zero velocity (stationary).
    pub const ZERO: Self = Self {
        value: Vec2Fixed::ZERO,
    };

    /// Create a new velocity.
    #[must_use]
    pub const fn new(value: Vec2Fixed) -> Self {
        Self { value }
    }
}

/// The character's own stats before synergies and effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseStats(pub Stats);

/// Combat class, used for damage dispatch and class synergies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CharacterClass {
    /// Frontline physical fighter.
    Warrior,
    /// Magical damage dealer.
    Mage,
    /// Burst physical damage.
    Assassin,
    /// Ranged physical damage.
    Ranger,
    /// High-mitigation frontline.
    Tank,
    /// Heals and supports allies.
    Healer,
}

impl CharacterClass {
    /// Whether basic attacks and damage skills use the magical formula.
    #[must_use]
    pub const fn deals_magic_damage(self) -> bool {
        matches!(self, CharacterClass::Mage | CharacterClass::Healer)
    }
}

/// Race, used for race synergies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Race {
    /// Human.
    Human,
    /// Elf.
    Elf,
    /// Orc.
    Orc,
    /// Undead.
    Undead,
    /// Beast.
    Beast,
    /// Dragon.
    Dragon,
}

/// Identity of a spawned character.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Character {
    /// Definition the character was built from.
    pub definition_id: String,
    /// Display name.
    pub name: String,
    /// Combat class.
    pub class: CharacterClass,
    /// Race.
    pub race: Race,
}

/// Team membership and formation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Team {
    /// Team identifier.
    pub team_id: TeamId,
    /// Slot in the team's formation.
    pub formation_slot: u8,
    /// Whether this member leads the team.
    pub is_leader: bool,
}

impl Team {
    /// Check whether two members are on opposing teams.
    #[must_use]
    pub const fn is_hostile_to(&self, other: &Team) -> bool {
        self.team_id != other.team_id
    }
}

/// Per-entity combat bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatState {
    /// Whether the entity is engaged.
    pub in_combat: bool,
    /// Whether the entity is still alive.
    pub alive: bool,
    /// Current target by id. May dangle; always check existence.
    pub current_target: Option<EntityId>,
    /// Seconds until the next basic attack.
    #[serde(with = "fixed_serde")]
    pub attack_cooldown: Fixed,
}

impl CombatState {
    /// A living, idle combatant.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            in_combat: false,
            alive: true,
            current_target: None,
            attack_cooldown: Fixed::ZERO,
        }
    }

    /// Drop the current target.
    pub fn clear_target(&mut self) {
        self.current_target = None;
        self.in_combat = false;
    }
}

impl Default for CombatState {
    fn default() -> Self {
        Self::new()
    }
}

/// An explicit request to cast a skill, queued by player input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CastRequest {
    /// Skill to cast.
    pub skill: SkillId,
    /// Explicit targets; empty means "let the skill pick".
    pub targets: Vec<EntityId>,
}

/// Skills, cooldowns and energy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Skills {
    /// Skills in priority order.
    pub definitions: Vec<SkillDefinition>,
    /// Remaining cooldown per skill, never negative.
    #[serde(with = "cooldown_map_serde")]
    pub cooldowns: BTreeMap<SkillId, Fixed>,
    /// Current energy.
    #[serde(with = "fixed_serde")]
    pub energy: Fixed,
    /// Energy cap.
    #[serde(with = "fixed_serde")]
    pub max_energy: Fixed,
    /// Casts requested by input, resolved by the combat system.
    pub queued: Vec<CastRequest>,
}

impl Skills {
    /// Create a skill set with zero energy and no cooldowns running.
    #[must_use]
    pub fn new(definitions: Vec<SkillDefinition>, max_energy: Fixed) -> Self {
        let cooldowns = definitions
            .iter()
            .map(|skill| (skill.id.clone(), Fixed::ZERO))
            .collect();
        Self {
            definitions,
            cooldowns,
            energy: Fixed::ZERO,
            max_energy: max_energy.max(Fixed::ZERO),
            queued: Vec::new(),
        }
    }

    /// Look up a skill definition.
    #[must_use]
    pub fn definition(&self, id: &SkillId) -> Option<&SkillDefinition> {
        self.definitions.iter().find(|skill| &skill.id == id)
    }

    /// Remaining cooldown for a skill (zero when unknown).
    #[must_use]
    pub fn cooldown(&self, id: &SkillId) -> Fixed {
        self.cooldowns.get(id).copied().unwrap_or(Fixed::ZERO)
    }

    /// Add energy, clamped to `[0, max_energy]`.
    pub fn gain_energy(&mut self, amount: Fixed) {
        self.energy = (self.energy + amount).clamp(Fixed::ZERO, self.max_energy);
    }

    /// Decrement every running cooldown, flooring at zero.
    pub fn tick_cooldowns(&mut self, dt: Fixed) {
        for remaining in self.cooldowns.values_mut() {
            *remaining = (*remaining - dt).max(Fixed::ZERO);
        }
    }
}

mod cooldown_map_serde {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::data::SkillId;
    use crate::math::Fixed;

    pub fn serialize<S>(map: &BTreeMap<SkillId, Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bits: BTreeMap<&SkillId, i64> = map.iter().map(|(k, v)| (k, v.to_bits())).collect();
        bits.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<SkillId, Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = BTreeMap::<SkillId, i64>::deserialize(deserializer)?;
        Ok(bits
            .into_iter()
            .map(|(k, v)| (k, Fixed::from_bits(v)))
            .collect())
    }
}

/// Active status effects on an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Effects {
    /// Effects in application order; ids are unique.
    pub active: Vec<StatusEffect>,
}

impl Effects {
    /// Look up an active effect.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&StatusEffect> {
        self.active.iter().find(|effect| effect.id == id)
    }

    /// Ids of all active effects, in application order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.active.iter().map(|effect| effect.id.clone()).collect()
    }

    /// Whether any active effect prevents movement.
    #[must_use]
    pub fn is_movement_impaired(&self) -> bool {
        self.active.iter().any(|effect| effect.impairs_movement)
    }
}

/// Elemental affinity, bonuses and reaction marks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Elemental {
    /// Resident element used for reactions.
    pub primary: Element,
    /// Optional secondary element.
    pub secondary: Option<Element>,
    /// Incoming damage reduction per element.
    pub resistances: ElementTable,
    /// Outgoing damage bonus per element.
    pub damage_bonus: ElementTable,
    /// Reaction marks keyed by reaction id.
    pub active_effects: BTreeMap<String, ElementalAura>,
}

impl Elemental {
    /// Affinity with no bonuses or resistances.
    #[must_use]
    pub fn new(primary: Element) -> Self {
        Self {
            primary,
            secondary: None,
            resistances: ElementTable::default(),
            damage_bonus: ElementTable::default(),
            active_effects: BTreeMap::new(),
        }
    }
}

/// Team-composition bonuses currently granted to this member.
///
/// Derived data: rewritten by the synergy system whenever the roster changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Synergy {
    /// Active tier per class (0 = inactive).
    pub class_levels: BTreeMap<CharacterClass, u8>,
    /// Active tier per race (0 = inactive).
    pub race_levels: BTreeMap<Race, u8>,
    /// Bonuses this member receives.
    pub bonuses: Vec<StatModifier>,
}

/// AI behavior states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AiBehavior {
    /// Stand still.
    #[default]
    Idle,
    /// Walk a patrol route.
    Patrol,
    /// Hold a guard post.
    Guard,
    /// Close distance to a target.
    Chase,
    /// Run from enemies.
    Flee,
    /// Attack a target in range.
    Attack,
}

/// AI state machine data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ai {
    /// Current behavior.
    pub current: AiBehavior,
    /// Behavior to fall back on when nothing else applies.
    pub default_behavior: AiBehavior,
    /// Seconds accumulated toward the next decision.
    #[serde(with = "fixed_serde")]
    pub decision_timer: Fixed,
    /// Seconds between decisions.
    #[serde(with = "fixed_serde")]
    pub decision_interval: Fixed,
    /// Patrol route.
    pub patrol_points: Vec<Vec2Fixed>,
    /// Index of the next patrol point.
    pub patrol_index: usize,
    /// Post to hold in guard mode.
    pub guard_position: Option<Vec2Fixed>,
    /// Range at which enemies are noticed.
    #[serde(with = "fixed_serde")]
    pub detection_range: Fixed,
    /// Range at which allies are supported.
    #[serde(with = "fixed_serde")]
    pub support_range: Fixed,
    /// Flee below this health percentage.
    #[serde(with = "fixed_serde")]
    pub flee_health_percentage: Fixed,
    /// Stop fleeing at or above this health percentage.
    #[serde(with = "fixed_serde")]
    pub safe_health_percentage: Fixed,
}

impl Ai {
    /// AI with the given default behavior and standard thresholds.
    ///
    /// The first decision happens on the first update.
    #[must_use]
    pub fn new(default_behavior: AiBehavior, decision_interval: Fixed) -> Self {
        Self {
            current: default_behavior,
            default_behavior,
            decision_timer: decision_interval,
            decision_interval,
            patrol_points: Vec::new(),
            patrol_index: 0,
            guard_position: None,
            detection_range: Fixed::from_num(10),
            support_range: Fixed::from_num(6),
            flee_health_percentage: Fixed::from_num(20),
            safe_health_percentage: Fixed::from_num(40),
        }
    }
}

/// Axis-aligned collision box centered on the entity's position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Collision {
    /// Half of the box width.
    #[serde(with = "fixed_serde")]
    pub half_width: Fixed,
    /// Half of the box height.
    #[serde(with = "fixed_serde")]
    pub half_height: Fixed,
    /// Static bodies never move during resolution.
    pub is_static: bool,
    /// Collision group, matched against the exclusion table.
    pub group: String,
}

impl Collision {
    /// Dynamic box of the given size.
    #[must_use]
    pub fn dynamic(width: Fixed, height: Fixed, group: impl Into<String>) -> Self {
        let two = Fixed::from_num(2);
        Self {
            half_width: width / two,
            half_height: height / two,
            is_static: false,
            group: group.into(),
        }
    }

    /// Static box of the given size.
    #[must_use]
    pub fn fixed(width: Fixed, height: Fixed, group: impl Into<String>) -> Self {
        Self {
            is_static: true,
            ..Self::dynamic(width, height, group)
        }
    }
}

/// Lifetime tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lifecycle {
    /// Cleared to request removal.
    pub is_active: bool,
    /// Battle time at creation, in seconds.
    #[serde(with = "fixed_serde")]
    pub created_at: Fixed,
    /// Time-to-live in seconds; `None` or non-positive means forever.
    pub ttl: Option<FixedBits>,
}

/// Raw-bit wrapper for optional fixed values in runtime state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FixedBits(#[serde(with = "fixed_serde")] pub Fixed);

impl Lifecycle {
    /// A lifecycle started at `now` with no expiry.
    #[must_use]
    pub const fn new(now: Fixed) -> Self {
        Self {
            is_active: true,
            created_at: now,
            ttl: None,
        }
    }

    /// Builder: expire `ttl` seconds after creation.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Fixed) -> Self {
        self.ttl = Some(FixedBits(ttl));
        self
    }

    /// Whether the entity should be removed at time `now`.
    #[must_use]
    pub fn is_expired(&self, now: Fixed) -> bool {
        if !self.is_active {
            return true;
        }
        match self.ttl {
            Some(FixedBits(ttl)) if ttl > Fixed::ZERO => now - self.created_at > ttl,
            _ => false,
        }
    }
}

/// A command that can be issued to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Move to a target position.
    MoveTo(Vec2Fixed),
    /// Stop moving and drop the current target.
    Stop,
    /// Attack a specific entity.
    Attack(EntityId),
    /// Cast a skill, optionally at explicit targets.
    CastSkill {
        /// Skill to cast.
        skill: SkillId,
        /// Explicit targets.
        targets: Vec<EntityId>,
    },
}

/// Queue of commands for an entity to execute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CommandQueue {
    /// The queue of pending commands.
    pub commands: VecDeque<Command>,
}

impl CommandQueue {
    /// Create an empty command queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command to the back of the queue.
    pub fn push(&mut self, command: Command) {
        self.commands.push_back(command);
    }

    /// Replace all commands with a single new command.
    pub fn set(&mut self, command: Command) {
        self.commands.clear();
        self.commands.push_back(command);
    }

    /// The command currently executing.
    #[must_use]
    pub fn current(&self) -> Option<&Command> {
        self.commands.front()
    }

    /// Remove and return the current command.
    pub fn pop(&mut self) -> Option<Command> {
        self.commands.pop_front()
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_kind_tags() {
        let component = Component::Team(Team {
            team_id: 1,
            formation_slot: 0,
            is_leader: true,
        });
        assert_eq!(component.kind(), ComponentKind::Team);
    }

    #[test]
    fn test_lifecycle_expiry() {
        let lifecycle = Lifecycle::new(Fixed::from_num(2)).with_ttl(Fixed::from_num(3));
        assert!(!lifecycle.is_expired(Fixed::from_num(5)));
        assert!(lifecycle.is_expired(Fixed::from_num(6)));

        let forever = Lifecycle::new(Fixed::ZERO).with_ttl(Fixed::ZERO);
        assert!(!forever.is_expired(Fixed::from_num(1000)));

        let mut inactive = Lifecycle::new(Fixed::ZERO);
        inactive.is_active = false;
        assert!(inactive.is_expired(Fixed::ZERO));
    }

    #[test]
    fn test_skills_energy_is_clamped() {
        let mut skills = Skills::new(Vec::new(), Fixed::from_num(100));
        skills.gain_energy(Fixed::from_num(250));
        assert_eq!(skills.energy, Fixed::from_num(100));
        skills.gain_energy(Fixed::from_num(-400));
        assert_eq!(skills.energy, Fixed::ZERO);
    }

    #[test]
    fn test_cooldowns_floor_at_zero() {
        let mut skills = Skills::new(Vec::new(), Fixed::from_num(100));
        skills
            .cooldowns
            .insert(SkillId::new("slash"), Fixed::from_num(1));
        skills.tick_cooldowns(Fixed::from_num(3));
        assert_eq!(skills.cooldown(&SkillId::new("slash")), Fixed::ZERO);
    }

    #[test]
    fn test_command_queue_set_replaces() {
        let mut queue = CommandQueue::new();
        queue.push(Command::Stop);
        queue.push(Command::Attack(4));
        queue.set(Command::Attack(9));
        assert_eq!(queue.current(), Some(&Command::Attack(9)));
        assert_eq!(queue.commands.len(), 1);
    }
}
