//! Data structures for battle definitions.
//!
//! Characters, skills, effect templates and synergy ladders are pure data,
//! deserialized from RON into a [`DefinitionTable`].
//!
//! **Note:** This module contains no IO. Callers read files and pass the
//! contents in.

mod character_data;
mod skill_data;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::combat::synergy::SynergyTable;
use crate::error::{GameError, Result};
use crate::math::Fixed;

pub(crate) use character_data::or_default;
pub use character_data::{AiData, CharacterData, ElementalData};
pub use skill_data::{EffectTemplate, SkillDefinition, SkillEffect, SkillId, SkillTarget};

/// Every definition a battle needs.
///
/// # Example RON
///
/// ```ron
/// DefinitionTable(
///     characters: [ /* CharacterData */ ],
///     skills: [ /* SkillDefinition */ ],
///     effects: { "war_cry": EffectTemplate(stat_delta: [(stat: AttackDamage, amount: 5.0)]) },
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionTable {
    /// Character definitions.
    #[serde(default)]
    pub characters: Vec<CharacterData>,
    /// Skill definitions.
    #[serde(default)]
    pub skills: Vec<SkillDefinition>,
    /// Buff/debuff templates keyed by skill id.
    #[serde(default)]
    pub effects: BTreeMap<SkillId, EffectTemplate>,
    /// Synergy ladders.
    #[serde(default = "SynergyTable::standard")]
    pub synergies: SynergyTable,
}

impl Default for DefinitionTable {
    fn default() -> Self {
        Self {
            characters: Vec::new(),
            skills: Vec::new(),
            effects: BTreeMap::new(),
            synergies: SynergyTable::standard(),
        }
    }
}

impl DefinitionTable {
    /// Parse a definition table from RON and validate it.
    pub fn from_ron_str(label: &str, source: &str) -> Result<Self> {
        let table: Self = ron::from_str(source).map_err(|err| GameError::parse(label, err))?;
        table.validate()?;
        Ok(table)
    }

    /// Look up a character definition.
    #[must_use]
    pub fn character(&self, id: &str) -> Option<&CharacterData> {
        self.characters.iter().find(|c| c.id == id)
    }

    /// Look up a skill definition.
    #[must_use]
    pub fn skill(&self, id: &SkillId) -> Option<&SkillDefinition> {
        self.skills.iter().find(|s| &s.id == id)
    }

    /// Look up the effect template for a buff/debuff skill.
    #[must_use]
    pub fn effect(&self, id: &SkillId) -> Option<&EffectTemplate> {
        self.effects.get(id)
    }

    /// Check ids are unique and every cross reference resolves.
    pub fn validate(&self) -> Result<()> {
        let mut skill_ids = BTreeSet::new();
        for skill in &self.skills {
            if !skill_ids.insert(&skill.id) {
                return Err(definition_error(skill.id.as_str(), "duplicate skill id"));
            }
            if skill.cooldown < Fixed::ZERO {
                return Err(definition_error(skill.id.as_str(), "negative cooldown"));
            }
            if skill.energy_cost < Fixed::ZERO {
                return Err(definition_error(skill.id.as_str(), "negative energy cost"));
            }
            if matches!(skill.effect, SkillEffect::Buff | SkillEffect::Debuff)
                && !self.effects.contains_key(&skill.id)
            {
                return Err(definition_error(
                    skill.id.as_str(),
                    "buff/debuff skill has no effect template",
                ));
            }
        }

        for id in self.effects.keys() {
            if !skill_ids.contains(id) {
                return Err(definition_error(id.as_str(), "effect template for unknown skill"));
            }
        }

        let mut character_ids = BTreeSet::new();
        for character in &self.characters {
            if !character_ids.insert(character.id.as_str()) {
                return Err(definition_error(&character.id, "duplicate character id"));
            }
            for skill in &character.skills {
                if !skill_ids.contains(skill) {
                    return Err(definition_error(
                        &character.id,
                        &format!("unknown skill '{skill}'"),
                    ));
                }
            }
        }

        Ok(())
    }
}

fn definition_error(id: &str, message: &str) -> GameError {
    GameError::DefinitionError {
        id: id.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"(
        characters: [
            (id: "knight", name: "Knight", class: Warrior, race: Human, skills: ["rally"]),
        ],
        skills: [
            (id: "rally", name: "Rally", cooldown: 6.0, effect: Buff, target: AllAllies),
        ],
        effects: {
            "rally": (stat_delta: [(stat: AttackDamage, amount: 5.0)]),
        },
    )"#;

    #[test]
    fn test_parse_and_lookup() {
        let table = DefinitionTable::from_ron_str("inline", TABLE).unwrap();
        assert!(table.character("knight").is_some());
        assert!(table.skill(&SkillId::new("rally")).is_some());
        assert!(table.effect(&SkillId::new("rally")).is_some());
        assert_eq!(table.synergies, SynergyTable::standard());
    }

    #[test]
    fn test_unknown_skill_reference_is_rejected() {
        let source = TABLE.replace(r#"skills: ["rally"]"#, r#"skills: ["missing"]"#);
        let err = DefinitionTable::from_ron_str("inline", &source).unwrap_err();
        assert!(matches!(err, GameError::DefinitionError { ref id, .. } if id == "knight"));
    }

    #[test]
    fn test_buff_without_template_is_rejected() {
        let source = TABLE.replace(r#""rally": (stat_delta: [(stat: AttackDamage, amount: 5.0)]),"#, "");
        assert!(DefinitionTable::from_ron_str("inline", &source).is_err());
    }

    #[test]
    fn test_malformed_ron_is_parse_error() {
        let err = DefinitionTable::from_ron_str("broken.ron", "(characters: [").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { ref path, .. } if path == "broken.ron"));
    }
}
