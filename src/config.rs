//! Board templates used when a new board is created.

use crate::error::{HlaviError, Result};
use serde::{Deserialize, Serialize};

/// Column definition in a board template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTemplate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wip_limit: Option<u32>,
}

impl ColumnTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            wip_limit: None,
        }
    }

    pub fn with_wip_limit(mut self, limit: u32) -> Self {
        self.wip_limit = Some(limit);
        self
    }
}

/// Board configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub name: String,
    pub columns: Vec<ColumnTemplate>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            name: "My Board".to_string(),
            columns: vec![
                ColumnTemplate::new("Todo"),
                ColumnTemplate::new("In Progress"),
                ColumnTemplate::new("Done"),
            ],
        }
    }
}

impl BoardConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| HlaviError::ConfigError(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| HlaviError::ConfigError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_columns() {
        let config = BoardConfig::default();
        let names: Vec<&str> = config.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Todo", "In Progress", "Done"]);
        assert!(config.columns.iter().all(|c| c.wip_limit.is_none()));
    }

    #[test]
    fn test_parse_toml() {
        let config = BoardConfig::from_toml_str(
            r#"
            name = "Personal"

            [[columns]]
            name = "Backlog"

            [[columns]]
            name = "Doing"
            wip_limit = 3

            [[columns]]
            name = "Done"
            "#,
        )
        .unwrap();

        assert_eq!(config.name, "Personal");
        assert_eq!(config.columns.len(), 3);
        assert_eq!(config.columns[1], ColumnTemplate::new("Doing").with_wip_limit(3));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = BoardConfig {
            name: "Work".to_string(),
            columns: vec![ColumnTemplate::new("Todo").with_wip_limit(5)],
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(BoardConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_toml() {
        let result = BoardConfig::from_toml_str("name = ");
        assert!(matches!(result, Err(HlaviError::ConfigError(_))));
    }
}
