//! Data validation utilities.

use std::path::{Path, PathBuf};

use battle_core::data::DefinitionTable;
use tracing::{debug, info};

use crate::{read_source, Result, ToolError};

/// Counts from a definition file that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationReport {
    /// Character definitions.
    pub characters: usize,
    /// Skill definitions.
    pub skills: usize,
    /// Effect templates.
    pub effects: usize,
}

/// Parse and validate one definition table.
///
/// # Errors
///
/// Parse and cross-reference errors from [`DefinitionTable::from_ron_str`],
/// or [`ToolError::EmptyRoster`] when no characters are defined.
pub fn validate_source(label: &str, source: &str) -> Result<ValidationReport> {
    let table = DefinitionTable::from_ron_str(label, source)?;
    if table.characters.is_empty() {
        return Err(ToolError::EmptyRoster(label.to_string()));
    }
    Ok(ValidationReport {
        characters: table.characters.len(),
        skills: table.skills.len(),
        effects: table.effects.len(),
    })
}

fn ron_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|source| ToolError::Io {
        path: dir.display().to_string(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    files.sort();
    Ok(files)
}

/// Validate a definition file, or every `.ron` file in a directory.
///
/// # Errors
///
/// Returns the first file that fails to read or validate.
pub fn validate_path(path: &Path) -> Result<Vec<(PathBuf, ValidationReport)>> {
    let files = if path.is_dir() {
        ron_files(path)?
    } else {
        vec![path.to_path_buf()]
    };
    if files.is_empty() {
        return Err(ToolError::NothingToValidate(path.display().to_string()));
    }

    files
        .into_iter()
        .map(|file| {
            debug!("Validating {}", file.display());
            let source = read_source(&file)?;
            let report = validate_source(&file.display().to_string(), &source)?;
            info!(
                characters = report.characters,
                skills = report.skills,
                effects = report.effects,
                "{} is valid",
                file.display()
            );
            Ok((file, report))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_core::error::GameError;
    use battle_test_utils::fixtures::ROSTER_RON;

    #[test]
    fn test_sample_roster_is_valid() {
        let report = validate_source("roster.ron", ROSTER_RON).unwrap();
        assert_eq!(report.characters, 6);
        assert_eq!(report.skills, 8);
        assert_eq!(report.effects, 3);
    }

    #[test]
    fn test_empty_roster_is_rejected() {
        let err = validate_source("empty.ron", "(skills: [])").unwrap_err();
        assert!(matches!(err, ToolError::EmptyRoster(ref label) if label == "empty.ron"));
    }

    #[test]
    fn test_unknown_skill_is_rejected() {
        let source = r#"(characters: [(id: "a", name: "A", class: Mage, race: Elf, skills: ["nope"])])"#;
        let err = validate_source("bad.ron", source).unwrap_err();
        assert!(matches!(err, ToolError::Game(GameError::DefinitionError { .. })));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = validate_path(Path::new("does/not/exist.ron")).unwrap_err();
        assert!(matches!(err, ToolError::Io { ref path, .. } if path.contains("exist.ron")));
    }
}
