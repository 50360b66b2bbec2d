//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from resolved tables and predicates.

use crate::config::{FieldType, ResolvedTable};
use crate::filter::{Column, CompareOp, Predicate};
use crate::request::Direction;
use crate::sql::PgBindValue;
use crate::store::{Row, SelectOp};
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: names come from the schema registry only).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Table name, schema-qualified when the table declares a schema.
fn qualified_table(table: &ResolvedTable) -> String {
    match &table.schema_name {
        Some(schema) => format!("{}.{}", quoted(schema), quoted(&table.name)),
        None => quoted(&table.name),
    }
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Bind `v` and return its placeholder, cast to the column type when one is declared.
    fn push_param(&mut self, v: &Value, field_type: FieldType, pg_type: Option<&str>) -> String {
        self.params.push(PgBindValue::for_field(field_type, v));
        let n = self.params.len();
        match pg_type {
            Some(t) => format!("${}::{}", n, t),
            None => format!("${}", n),
        }
    }
}

/// SELECT list: projected columns as-is, except numeric and custom enum types as col::text.
fn select_column_list(table: &ResolvedTable, columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| {
            let q = quoted(&c.name);
            let as_text = table.column(&c.name).map(|info| info.select_as_text).unwrap_or(false);
            if as_text {
                format!("{}::text AS {}", q, q)
            } else {
                q
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a predicate into `q`'s parameter list and return the boolean SQL expression.
pub fn where_clause(q: &mut QueryBuf, predicate: &Predicate) -> String {
    match predicate {
        Predicate::Compare { column, op, value } => {
            let col = quoted(&column.name);
            if value.is_null() {
                // eq/ne against null only; other operators are rejected at compile time
                return match op {
                    CompareOp::Ne => format!("{} IS NOT NULL", col),
                    _ => format!("{} IS NULL", col),
                };
            }
            let sym = match op {
                CompareOp::Eq => "=",
                CompareOp::Ne => "<>",
                CompareOp::Gt => ">",
                CompareOp::Gte => ">=",
                CompareOp::Lt => "<",
                CompareOp::Lte => "<=",
            };
            let ph = q.push_param(value, column.field_type, column.pg_type.as_deref());
            format!("{} {} {}", col, sym, ph)
        }
        Predicate::Pattern {
            column,
            pattern,
            case_insensitive,
        } => {
            let ph = q.push_param(&Value::String(pattern.clone()), FieldType::Text, None);
            let kw = if *case_insensitive { "ILIKE" } else { "LIKE" };
            format!("{}::text {} {}", quoted(&column.name), kw, ph)
        }
        Predicate::And(parts) => join_parts(q, parts, " AND ", "TRUE"),
        Predicate::Or(parts) => join_parts(q, parts, " OR ", "FALSE"),
        Predicate::Not(inner) => format!("NOT ({})", where_clause(q, inner)),
    }
}

fn join_parts(q: &mut QueryBuf, parts: &[Predicate], sep: &str, empty: &str) -> String {
    if parts.is_empty() {
        return empty.to_string();
    }
    let rendered: Vec<String> = parts.iter().map(|p| where_clause(q, p)).collect();
    format!("({})", rendered.join(sep))
}

/// SELECT projected columns with optional WHERE, ORDER BY in caller order, LIMIT, OFFSET.
pub fn select(op: &SelectOp) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(&op.table);
    let cols = select_column_list(&op.table, &op.columns);

    let where_part = op
        .predicate
        .as_ref()
        .map(|p| format!(" WHERE {}", where_clause(&mut q, p)))
        .unwrap_or_default();
    let order_part = if op.order.is_empty() {
        String::new()
    } else {
        let entries: Vec<String> = op
            .order
            .iter()
            .map(|(c, d)| {
                let dir = match d {
                    Direction::Asc => "ASC",
                    Direction::Desc => "DESC",
                };
                format!("{} {}", quoted(&c.name), dir)
            })
            .collect();
        format!(" ORDER BY {}", entries.join(", "))
    };
    let limit_part = op.limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let offset_part = op.offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();

    q.sql = format!(
        "SELECT {} FROM {}{}{}{}{}",
        cols, table, where_part, order_part, limit_part, offset_part
    );
    q
}

/// INSERT the given record. Absent columns are omitted so DB defaults apply.
pub fn insert(table: &ResolvedTable, record: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let name = qualified_table(table);
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &table.columns {
        let Some(val) = record.get(&c.name) else { continue };
        placeholders.push(q.push_param(val, c.field_type, c.pg_type.as_deref()));
        cols.push(quoted(&c.name));
    }
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", name)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            name,
            cols.join(", "),
            placeholders.join(", ")
        )
    };
    q
}

/// UPDATE rows matching `predicate`: SET only columns present in `changes`.
pub fn update(table: &ResolvedTable, predicate: &Predicate, changes: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let name = qualified_table(table);
    let mut sets = Vec::new();
    for c in &table.columns {
        let Some(val) = changes.get(&c.name) else { continue };
        let rhs = q.push_param(val, c.field_type, c.pg_type.as_deref());
        sets.push(format!("{} = {}", quoted(&c.name), rhs));
    }
    let cond = where_clause(&mut q, predicate);
    q.sql = format!("UPDATE {} SET {} WHERE {}", name, sets.join(", "), cond);
    q
}

/// DELETE rows matching `predicate`.
pub fn delete(table: &ResolvedTable, predicate: &Predicate) -> QueryBuf {
    let mut q = QueryBuf::new();
    let name = qualified_table(table);
    let cond = where_clause(&mut q, predicate);
    q.sql = format!("DELETE FROM {} WHERE {}", name, cond);
    q
}
