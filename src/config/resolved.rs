//! Resolved schema registry: config validated and flattened for runtime use.

use crate::config::ValidationRule;
use std::collections::HashMap;
use std::sync::Arc;

/// Primitive type of a field, used to coerce request values and to pick SQL casts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    Float,
    Boolean,
    Date,
    Timestamp,
    Uuid,
    Json,
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub field_type: FieldType,
    /// PostgreSQL type name for placeholder casts (e.g. "timestamptz").
    pub pg_type: Option<String>,
    /// Selected as `col::text` (numeric, custom enums) so the value survives row decoding.
    pub select_as_text: bool,
    pub nullable: bool,
    pub generated: bool,
    pub validation: Option<ValidationRule>,
}

#[derive(Clone, Debug)]
pub struct ResolvedTable {
    pub name: String,
    pub schema_name: Option<String>,
    pub columns: Vec<ColumnInfo>,
    index: HashMap<String, usize>,
}

impl ResolvedTable {
    pub fn new(name: String, schema_name: Option<String>, columns: Vec<ColumnInfo>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        ResolvedTable {
            name,
            schema_name,
            columns,
            index,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.index.get(name).map(|&i| &self.columns[i])
    }
}

/// Per-table field sets. Built once at startup and shared read-only.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    tables: HashMap<String, Arc<ResolvedTable>>,
}

impl SchemaRegistry {
    pub fn new(tables: Vec<ResolvedTable>) -> Self {
        SchemaRegistry {
            tables: tables
                .into_iter()
                .map(|t| (t.name.clone(), Arc::new(t)))
                .collect(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&Arc<ResolvedTable>> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}
