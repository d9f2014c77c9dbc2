//! Project-type table: which folders count as build output for each kind of
//! project.
//!
//! The table is ordered. Candidate order inside a project type is the
//! priority used by the locator; project-type order is the order shown in
//! the page's selector. A JSON file passed with `--project-types` replaces
//! the built-in table:
//!
//! ```json
//! [
//!   { "name": "UI", "candidates": ["build", "dist", "out"] },
//!   { "name": "Microservice", "candidates": ["target", "app", "output"] }
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectType {
    pub name: String,
    pub candidates: Vec<String>,
}

impl ProjectType {
    pub fn new(name: &str, candidates: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectTypes {
    types: Vec<ProjectType>,
}

impl ProjectTypes {
    pub fn new(types: Vec<ProjectType>) -> Result<Self> {
        if types.is_empty() {
            return Err(AppError::Config("at least one project type is required".to_string()));
        }

        let mut seen = HashSet::new();
        for project_type in &types {
            if project_type.name.trim().is_empty() {
                return Err(AppError::Config("project type names must not be empty".to_string()));
            }
            if !seen.insert(project_type.name.as_str()) {
                return Err(AppError::Config(format!(
                    "duplicate project type: {}",
                    project_type.name
                )));
            }
            if project_type.candidates.is_empty() {
                return Err(AppError::Config(format!(
                    "project type {} has no candidate folders",
                    project_type.name
                )));
            }
            for candidate in &project_type.candidates {
                if !is_single_segment(candidate) {
                    return Err(AppError::Config(format!(
                        "project type {}: candidate {:?} must be a single folder name",
                        project_type.name, candidate
                    )));
                }
            }
        }

        Ok(Self { types })
    }

    /// `UI` and `Microservice` with their conventional output folders.
    pub fn builtin() -> Self {
        Self {
            types: vec![
                ProjectType::new("UI", &["build", "dist", "out"]),
                ProjectType::new("Microservice", &["target", "app", "output"]),
            ],
        }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let types: Vec<ProjectType> = serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        Self::new(types)
    }

    pub fn get(&self, name: &str) -> Option<&ProjectType> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn default_type(&self) -> &ProjectType {
        // Construction guarantees a non-empty table
        &self.types[0]
    }

    pub fn all(&self) -> &[ProjectType] {
        &self.types
    }

    pub fn names(&self) -> Vec<String> {
        self.types.iter().map(|t| t.name.clone()).collect()
    }
}

fn is_single_segment(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate != "."
        && candidate != ".."
        && !candidate.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_matches_conventional_folders() {
        let types = ProjectTypes::builtin();
        assert_eq!(types.names(), vec!["UI", "Microservice"]);
        assert_eq!(types.get("UI").unwrap().candidates, vec!["build", "dist", "out"]);
        assert_eq!(
            types.get("Microservice").unwrap().candidates,
            vec!["target", "app", "output"]
        );
        assert_eq!(types.default_type().name, "UI");
        assert!(types.get("Desktop").is_none());
    }

    #[test]
    fn rejects_type_without_candidates() {
        let err = ProjectTypes::new(vec![ProjectType::new("UI", &[])]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn rejects_duplicates_and_nested_candidates() {
        let dup = ProjectTypes::new(vec![
            ProjectType::new("UI", &["build"]),
            ProjectType::new("UI", &["dist"]),
        ]);
        assert!(dup.is_err());

        let nested = ProjectTypes::new(vec![ProjectType::new("UI", &["web/build"])]);
        assert!(nested.is_err());

        let parent = ProjectTypes::new(vec![ProjectType::new("UI", &[".."])]);
        assert!(parent.is_err());

        assert!(ProjectTypes::new(Vec::new()).is_err());
    }

    #[test]
    fn loads_table_from_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("types.json");
        std::fs::write(
            &path,
            r#"[{"name": "Docs", "candidates": ["site", "public"]}]"#,
        )
        .unwrap();

        let types = ProjectTypes::from_json_file(&path).unwrap();
        assert_eq!(types.names(), vec!["Docs"]);
        assert_eq!(types.get("Docs").unwrap().candidates, vec!["site", "public"]);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("types.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = ProjectTypes::from_json_file(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
