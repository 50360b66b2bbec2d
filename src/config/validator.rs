//! Config validation: naming integrity and rule sanity.

use crate::config::FullConfig;
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;

/// Keys reserved for boolean combinators in filter JSON.
pub const RESERVED_NAMES: &[&str] = &["AND", "OR", "NOT"];

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    if config.tables.is_empty() {
        return Err(ConfigError::Validation("at least one table required".into()));
    }

    let mut table_names = HashSet::new();
    for t in &config.tables {
        if t.name.trim().is_empty() {
            return Err(ConfigError::Validation("table name must not be empty".into()));
        }
        if !table_names.insert(t.name.as_str()) {
            return Err(ConfigError::DuplicateTable(t.name.clone()));
        }
        if t.columns.is_empty() {
            return Err(ConfigError::Validation(format!("table {} has no columns", t.name)));
        }

        let mut column_names = HashSet::new();
        for c in &t.columns {
            if c.name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "table {} has a column with an empty name",
                    t.name
                )));
            }
            if RESERVED_NAMES.contains(&c.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "table {} column {} uses a reserved name",
                    t.name, c.name
                )));
            }
            if !column_names.insert(c.name.as_str()) {
                return Err(ConfigError::DuplicateColumn {
                    table: t.name.clone(),
                    column: c.name.clone(),
                });
            }
            if let Some(pattern) = c.validation.as_ref().and_then(|r| r.pattern.as_deref()) {
                Regex::new(pattern).map_err(|e| {
                    ConfigError::Validation(format!("table {} column {}: bad pattern: {}", t.name, c.name, e))
                })?;
            }
        }
    }

    Ok(())
}
