//! Record validation from per-column schema rules.

use crate::config::{ResolvedTable, ValidationRule};
use crate::error::AppError;
use crate::store::Row;
use regex::Regex;
use serde_json::Value;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate an insert record. Required columns must be present and non-null.
    pub fn validate(record: &Row, table: &ResolvedTable) -> Result<(), AppError> {
        for col in &table.columns {
            let Some(rule) = &col.validation else { continue };
            let val = record.get(&col.name);
            if rule.required == Some(true) && val.map_or(true, Value::is_null) {
                return Err(AppError::validation(format!("{} is required", col.name)));
            }
            if let Some(v) = val {
                validate_field(&col.name, v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present (update). Required is not enforced for missing fields,
    /// but a required field cannot be set to null.
    pub fn validate_partial(changes: &Row, table: &ResolvedTable) -> Result<(), AppError> {
        for (name, v) in changes {
            let Some(rule) = table.column(name).and_then(|c| c.validation.as_ref()) else {
                continue;
            };
            if rule.required == Some(true) && v.is_null() {
                return Err(AppError::validation(format!("{} is required", name)));
            }
            validate_field(name, v, rule)?;
        }
        Ok(())
    }
}

fn validate_field(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(col, v, format)?;
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                return Err(AppError::validation(format!("{} must be at most {} characters", col, max)));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                return Err(AppError::validation(format!("{} must be at least {} characters", col, min)));
            }
        }
        if let Some(pattern) = &rule.pattern {
            // patterns are compiled once during schema validation, so this only fails on a bad registry
            let re = Regex::new(pattern).map_err(|_| AppError::validation(format!("invalid pattern for {}", col)))?;
            if !re.is_match(s) {
                return Err(AppError::validation(format!("{} does not match required pattern", col)));
            }
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            return Err(AppError::validation(format!(
                "{} must be one of: {}",
                col,
                allowed.iter().take(5).map(Value::to_string).collect::<Vec<_>>().join(", ")
            )));
        }
    }
    if let Some(n) = v.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(AppError::validation(format!("{} must be at least {}", col, min)));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(AppError::validation(format!("{} must be at most {}", col, max)));
            }
        }
    }
    Ok(())
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn validate_format(col: &str, v: &Value, format: &str) -> Result<(), AppError> {
    let Some(s) = v.as_str() else { return Ok(()) };
    match format.to_lowercase().as_str() {
        "email" => {
            if !s.contains('@') || s.len() < 3 {
                return Err(AppError::validation(format!("{} must be a valid email", col)));
            }
        }
        "uuid" => {
            if uuid::Uuid::parse_str(s).is_err() {
                return Err(AppError::validation(format!("{} must be a valid UUID", col)));
            }
        }
        _ => {}
    }
    Ok(())
}
