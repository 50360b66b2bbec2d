//! Filter condition trees as they travel in `where` JSON.
//!
//! A node is a record: every plain key is a field condition, and the
//! reserved keys `AND`, `OR` and `NOT` hold nested nodes. Everything at one
//! level is conjoined.
//!
//! ```json
//! { "title": { "like": "%rust%" }, "OR": [{ "views": { "gt": 10 } }, { "pinned": true }] }
//! ```

pub mod compile;

pub use compile::{compile, Column, CompareOp, FieldResolver, Predicate};

use crate::error::AppError;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Closed operator set. Anything else is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Case-sensitive LIKE pattern.
    Like,
    /// Case-insensitive LIKE pattern.
    ILike,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Like => "like",
            Operator::ILike => "ilike",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "eq" => Operator::Eq,
            "ne" => Operator::Ne,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "like" => Operator::Like,
            "ilike" => Operator::ILike,
            _ => return Err(()),
        })
    }
}

/// One field with one or more operator/value pairs, conjoined.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldCondition {
    pub field: String,
    pub ops: Vec<(Operator, Value)>,
}

impl FieldCondition {
    pub fn new(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        FieldCondition {
            field: field.into(),
            ops: vec![(op, value.into())],
        }
    }

    fn from_json(field: &str, value: &Value) -> Result<Self, AppError> {
        let ops = match value {
            Value::Object(map) => {
                if map.is_empty() {
                    return Err(AppError::validation(format!(
                        "condition for field '{}' has no operators",
                        field
                    )));
                }
                map.iter()
                    .map(|(k, v)| {
                        let op = k.parse::<Operator>().map_err(|_| AppError::UnsupportedOperator {
                            field: field.to_string(),
                            operator: k.clone(),
                        })?;
                        Ok((op, v.clone()))
                    })
                    .collect::<Result<Vec<_>, AppError>>()?
            }
            Value::Array(_) => {
                return Err(AppError::validation(format!(
                    "condition for field '{}' must be an object or a scalar",
                    field
                )))
            }
            // bare scalar is equality shorthand
            scalar => vec![(Operator::Eq, scalar.clone())],
        };
        Ok(FieldCondition {
            field: field.to_string(),
            ops,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterNode {
    pub fields: Vec<FieldCondition>,
    pub and: Vec<FilterNode>,
    pub or: Vec<FilterNode>,
    pub not: Option<Box<FilterNode>>,
}

impl FilterNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.and.is_empty() && self.or.is_empty() && self.not.is_none()
    }

    pub fn field(mut self, field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|c| c.field == field) {
            Some(existing) => existing.ops.push((op, value)),
            None => self.fields.push(FieldCondition {
                field,
                ops: vec![(op, value)],
            }),
        }
        self
    }

    pub fn and(mut self, nodes: Vec<FilterNode>) -> Self {
        self.and.extend(nodes);
        self
    }

    pub fn or(mut self, nodes: Vec<FilterNode>) -> Self {
        self.or.extend(nodes);
        self
    }

    pub fn not(mut self, node: FilterNode) -> Self {
        self.not = Some(Box::new(node));
        self
    }

    /// Parse `where` JSON text.
    pub fn parse(text: &str) -> Result<Self, AppError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| AppError::validation(format!("invalid 'where' JSON: {}", e)))?;
        Self::from_json(&value)
    }

    pub fn from_json(value: &Value) -> Result<Self, AppError> {
        let Value::Object(map) = value else {
            return Err(AppError::validation("filter must be a JSON object"));
        };
        let mut node = FilterNode::default();
        for (key, v) in map {
            match key.as_str() {
                "AND" => {
                    // single nested node is accepted and normalized to a list
                    node.and = match v {
                        Value::Array(items) => operand_list("AND", items)?,
                        other => vec![operand("AND", other)?],
                    };
                }
                "OR" => {
                    let Value::Array(items) = v else {
                        return Err(AppError::validation("OR expects an array of conditions"));
                    };
                    node.or = operand_list("OR", items)?;
                }
                "NOT" => node.not = Some(Box::new(operand("NOT", v)?)),
                field => node.fields.push(FieldCondition::from_json(field, v)?),
            }
        }
        Ok(node)
    }

    /// Inverse of [`FilterNode::from_json`]; reparsing gives an equal node.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for cond in &self.fields {
            let ops: Map<String, Value> = cond
                .ops
                .iter()
                .map(|(op, v)| (op.as_str().to_string(), v.clone()))
                .collect();
            map.insert(cond.field.clone(), Value::Object(ops));
        }
        if !self.and.is_empty() {
            map.insert("AND".into(), Value::Array(self.and.iter().map(FilterNode::to_json).collect()));
        }
        if !self.or.is_empty() {
            map.insert("OR".into(), Value::Array(self.or.iter().map(FilterNode::to_json).collect()));
        }
        if let Some(not) = &self.not {
            map.insert("NOT".into(), not.to_json());
        }
        Value::Object(map)
    }
}

fn operand(combinator: &str, value: &Value) -> Result<FilterNode, AppError> {
    let node = FilterNode::from_json(value)?;
    if node.is_empty() {
        return Err(AppError::validation(format!("{} operand must not be empty", combinator)));
    }
    Ok(node)
}

fn operand_list(combinator: &str, items: &[Value]) -> Result<Vec<FilterNode>, AppError> {
    if items.is_empty() {
        return Err(AppError::validation(format!("{} requires at least one condition", combinator)));
    }
    items.iter().map(|v| operand(combinator, v)).collect()
}
