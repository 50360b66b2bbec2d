//! Compile filter nodes into backend-neutral predicates.
//!
//! Field names resolve through a [`FieldResolver`] and values are coerced to
//! the declared field type here, so every adapter receives typed values and
//! never sees a name outside the schema.

use super::{FieldCondition, FilterNode, Operator};
use crate::codec::coerce;
use crate::config::{FieldType, ResolvedTable};
use crate::error::AppError;
use serde_json::Value;

/// Column reference handed to a store adapter.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub field_type: FieldType,
    pub pg_type: Option<String>,
}

pub trait FieldResolver {
    fn table_name(&self) -> &str;
    fn resolve_field(&self, field: &str) -> Option<Column>;
}

impl FieldResolver for ResolvedTable {
    fn table_name(&self) -> &str {
        &self.name
    }

    fn resolve_field(&self, field: &str) -> Option<Column> {
        self.column(field).map(|c| Column {
            name: c.name.clone(),
            field_type: c.field_type,
            pg_type: c.pg_type.clone(),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// `value` is Null only for Eq/Ne, meaning IS NULL / IS NOT NULL.
    Compare { column: Column, op: CompareOp, value: Value },
    Pattern { column: Column, pattern: String, case_insensitive: bool },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Conjunction that collapses a single part.
    fn all(mut parts: Vec<Predicate>) -> Predicate {
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            Predicate::And(parts)
        }
    }
}

pub fn compile(node: &FilterNode, resolver: &impl FieldResolver) -> Result<Predicate, AppError> {
    let mut parts = Vec::new();
    for cond in &node.fields {
        parts.push(compile_condition(cond, resolver)?);
    }
    if !node.and.is_empty() {
        let operands = compile_operands(&node.and, resolver)?;
        parts.push(Predicate::And(operands));
    }
    if !node.or.is_empty() {
        let operands = compile_operands(&node.or, resolver)?;
        parts.push(Predicate::Or(operands));
    }
    if let Some(inner) = &node.not {
        parts.push(Predicate::Not(Box::new(compile(inner, resolver)?)));
    }
    Ok(Predicate::all(parts))
}

fn compile_operands(nodes: &[FilterNode], resolver: &impl FieldResolver) -> Result<Vec<Predicate>, AppError> {
    nodes.iter().map(|n| compile(n, resolver)).collect()
}

fn compile_condition(cond: &FieldCondition, resolver: &impl FieldResolver) -> Result<Predicate, AppError> {
    let column = resolver
        .resolve_field(&cond.field)
        .ok_or_else(|| AppError::UnknownField {
            table: resolver.table_name().to_string(),
            field: cond.field.clone(),
        })?;

    let mut leaves = Vec::with_capacity(cond.ops.len());
    for (op, value) in &cond.ops {
        leaves.push(compile_leaf(&column, *op, value)?);
    }
    if leaves.is_empty() {
        return Err(AppError::validation(format!(
            "condition for field '{}' has no operators",
            cond.field
        )));
    }
    Ok(Predicate::all(leaves))
}

fn compile_leaf(column: &Column, op: Operator, value: &Value) -> Result<Predicate, AppError> {
    let op = match op {
        Operator::Like | Operator::ILike => {
            let Some(pattern) = value.as_str() else {
                return Err(AppError::validation(format!(
                    "{} on field '{}' expects a string pattern",
                    op, column.name
                )));
            };
            return Ok(Predicate::Pattern {
                column: column.clone(),
                pattern: pattern.to_string(),
                case_insensitive: op == Operator::ILike,
            });
        }
        Operator::Eq => CompareOp::Eq,
        Operator::Ne => CompareOp::Ne,
        Operator::Gt => CompareOp::Gt,
        Operator::Gte => CompareOp::Gte,
        Operator::Lt => CompareOp::Lt,
        Operator::Lte => CompareOp::Lte,
    };

    let value = coerce(column.field_type, value)
        .map_err(|reason| AppError::validation(format!("field '{}': {}", column.name, reason)))?;
    if value.is_null() && !matches!(op, CompareOp::Eq | CompareOp::Ne) {
        return Err(AppError::validation(format!(
            "field '{}': ordering comparison needs a non-null value",
            column.name
        )));
    }
    Ok(Predicate::Compare {
        column: column.clone(),
        op,
        value,
    })
}
