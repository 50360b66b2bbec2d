//! Build the schema registry from config, in memory or from a JSON file.

use crate::config::resolved::{ColumnInfo, FieldType, ResolvedTable, SchemaRegistry};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use std::path::Path;

/// Build the registry from full config (validates first).
pub fn resolve(config: &FullConfig) -> Result<SchemaRegistry, ConfigError> {
    validate(config)?;

    let tables = config
        .tables
        .iter()
        .map(|t| {
            let columns = t.columns.iter().map(resolve_column).collect();
            ResolvedTable::new(t.name.clone(), t.schema.clone(), columns)
        })
        .collect();

    Ok(SchemaRegistry::new(tables))
}

fn resolve_column(c: &ColumnConfig) -> ColumnInfo {
    let (field_type, pg_type) = column_types(&c.type_);
    let lower = c.type_.name().to_lowercase();
    ColumnInfo {
        name: c.name.clone(),
        field_type,
        select_as_text: lower == "numeric" || lower == "decimal" || c.type_.name().contains('.'),
        pg_type,
        nullable: c.nullable,
        generated: c.generated || lower.contains("serial"),
        validation: c.validation.clone(),
    }
}

fn column_types(ty: &ColumnTypeConfig) -> (FieldType, Option<String>) {
    let name = ty.name();
    let lower = name.to_lowercase();
    let (field_type, cast) = match lower.as_str() {
        "timestamptz" | "timestamp with time zone" => (FieldType::Timestamp, Some("timestamptz")),
        "date" => (FieldType::Date, Some("date")),
        "bool" | "boolean" => (FieldType::Boolean, Some("boolean")),
        "bigserial" | "bigint" | "int8" => (FieldType::Integer, Some("bigint")),
        "serial" | "integer" | "int" | "int4" => (FieldType::Integer, Some("integer")),
        "smallserial" | "smallint" | "int2" => (FieldType::Integer, Some("smallint")),
        "real" | "float4" => (FieldType::Float, Some("real")),
        "double precision" | "float8" | "float" => (FieldType::Float, Some("double precision")),
        "numeric" | "decimal" => (FieldType::Float, Some("numeric")),
        "json" => (FieldType::Json, Some("json")),
        "jsonb" => (FieldType::Json, Some("jsonb")),
        l if l == "timestamp" || l.starts_with("timestamp ") => (FieldType::Timestamp, Some("timestamp")),
        l if l.contains("uuid") => (FieldType::Uuid, Some("uuid")),
        _ if name.contains('.') => {
            // Schema-qualified custom type (e.g. blog.post_status); cast so text binds correctly
            return (FieldType::Text, Some(name.to_string()));
        }
        _ => (FieldType::Text, None),
    };
    (field_type, cast.map(str::to_string))
}

/// Parse and resolve a schema document.
pub fn resolve_str(json: &str) -> Result<SchemaRegistry, ConfigError> {
    let config: FullConfig = serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))?;
    resolve(&config)
}

/// Load and resolve the schema document at `path`.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<SchemaRegistry, ConfigError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "loading schema");
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    resolve_str(&text)
}
