//! Document adapter: in-process tables of JSON rows.
//!
//! Predicates evaluate with SQL's three-valued logic so results agree with the
//! relational adapter: a comparison against a missing value is unknown, and
//! only rows whose predicate is definitely true match.

use crate::codec;
use crate::config::{FieldType, ResolvedTable};
use crate::error::StoreError;
use crate::filter::{CompareOp, Predicate};
use crate::request::Direction;
use crate::store::{Row, SelectOp, StoreClient};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Store pre-populated with `rows` for `table`, stored as given.
    pub fn with_rows(table: &str, rows: Vec<Row>) -> Self {
        let mut tables = HashMap::new();
        tables.insert(table.to_string(), rows);
        MemoryStore {
            tables: RwLock::new(tables),
        }
    }

    /// Snapshot of every row currently held for `table`.
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        let tables = self.tables.read().await;
        tables.get(table).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn select(&self, op: &SelectOp) -> Result<Vec<Row>, StoreError> {
        let tables = self.tables.read().await;
        let Some(rows) = tables.get(&op.table.name) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<&Row> = rows
            .iter()
            .filter(|row| op.predicate.as_ref().map_or(true, |p| matches(p, row)))
            .collect();

        if !op.order.is_empty() {
            // stable sort keeps insertion order among equal keys
            matched.sort_by(|a, b| {
                for (column, direction) in &op.order {
                    let ord = sort_cmp(column.field_type, field(a, &column.name), field(b, &column.name));
                    let ord = match direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let offset = op.offset.unwrap_or(0) as usize;
        let limit = op.limit.map_or(usize::MAX, |n| n as usize);
        Ok(matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| {
                op.columns
                    .iter()
                    .map(|c| (c.name.clone(), field(row, &c.name).clone()))
                    .collect()
            })
            .collect())
    }

    async fn insert(&self, table: &ResolvedTable, record: &Row) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.name.clone()).or_default();

        let mut stored = Row::new();
        for c in &table.columns {
            let value = match record.get(&c.name) {
                Some(v) => v.clone(),
                None if c.generated && c.field_type == FieldType::Integer => {
                    let next = rows
                        .iter()
                        .filter_map(|r| r.get(&c.name).and_then(Value::as_i64))
                        .max()
                        .unwrap_or(0)
                        + 1;
                    Value::from(next)
                }
                None => Value::Null,
            };
            stored.insert(c.name.clone(), value);
        }
        rows.push(stored);
        Ok(())
    }

    async fn update(&self, table: &ResolvedTable, predicate: &Predicate, changes: &Row) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(&table.name) else {
            return Ok(0);
        };
        let mut changed = 0;
        for row in rows.iter_mut().filter(|r| matches(predicate, r)) {
            for (k, v) in changes {
                row.insert(k.clone(), v.clone());
            }
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete(&self, table: &ResolvedTable, predicate: &Predicate) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(&table.name) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !matches(predicate, r));
        Ok((before - rows.len()) as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

static NULL: Value = Value::Null;

fn field<'a>(row: &'a Row, name: &str) -> &'a Value {
    row.get(name).unwrap_or(&NULL)
}

fn matches(predicate: &Predicate, row: &Row) -> bool {
    eval(predicate, row) == Some(true)
}

/// Three-valued evaluation; `None` is SQL's UNKNOWN.
fn eval(predicate: &Predicate, row: &Row) -> Option<bool> {
    match predicate {
        Predicate::Compare { column, op, value } => {
            let actual = field(row, &column.name);
            if value.is_null() {
                return Some(match op {
                    CompareOp::Ne => !actual.is_null(),
                    _ => actual.is_null(),
                });
            }
            let ord = compare(column.field_type, actual, value)?;
            Some(match op {
                CompareOp::Eq => ord == Ordering::Equal,
                CompareOp::Ne => ord != Ordering::Equal,
                CompareOp::Gt => ord == Ordering::Greater,
                CompareOp::Gte => ord != Ordering::Less,
                CompareOp::Lt => ord == Ordering::Less,
                CompareOp::Lte => ord != Ordering::Greater,
            })
        }
        Predicate::Pattern {
            column,
            pattern,
            case_insensitive,
        } => {
            let text = match field(row, &column.name) {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some(if *case_insensitive {
                like(&text.to_lowercase(), &pattern.to_lowercase())
            } else {
                like(&text, pattern)
            })
        }
        Predicate::And(parts) => {
            let mut result = Some(true);
            for p in parts {
                match eval(p, row) {
                    Some(false) => return Some(false),
                    None => result = None,
                    Some(true) => {}
                }
            }
            result
        }
        Predicate::Or(parts) => {
            let mut result = Some(false);
            for p in parts {
                match eval(p, row) {
                    Some(true) => return Some(true),
                    None => result = None,
                    Some(false) => {}
                }
            }
            result
        }
        Predicate::Not(inner) => eval(inner, row).map(|b| !b),
    }
}

/// Ordering between two non-null values of the same kind; `None` when incomparable.
/// Integers compare exactly, dates and timestamps by instant.
fn compare(field_type: FieldType, a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) if matches!(field_type, FieldType::Date | FieldType::Timestamp) => {
            match (codec::instant(x), codec::instant(y)) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => Some(x.cmp(y)),
            }
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Sort key comparison: nulls after every value, incomparable values keep their order.
fn sort_cmp(field_type: FieldType, a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => compare(field_type, a, b).unwrap_or(Ordering::Equal),
    }
}

/// SQL LIKE: `%` any run, `_` one char, backslash escapes the next char.
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => Token::Any,
            '_' => Token::One,
            '\\' => Token::Lit(chars.next().unwrap_or('\\')),
            c => Token::Lit(c),
        });
    }
    like_from(&text, &tokens)
}

#[derive(Clone, Copy)]
enum Token {
    Any,
    One,
    Lit(char),
}

fn like_from(text: &[char], tokens: &[Token]) -> bool {
    // greedy match with backtracking to the last `%`
    let (mut t, mut p) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        match tokens.get(p) {
            Some(Token::Any) => {
                star = Some((p, t));
                p += 1;
            }
            Some(Token::One) => {
                t += 1;
                p += 1;
            }
            Some(Token::Lit(c)) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }
    tokens[p..].iter().all(|tok| matches!(tok, Token::Any))
}
