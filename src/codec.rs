//! Value codec: typed values to and from their untyped wire text.
//!
//! Responses leave the server with every leaf as a string, boolean or null.
//! [`decode`] re-types a string leaf through an ordered chain of parsers
//! (boolean, number, date) and falls back to plain text. Request values are
//! never guessed at; [`coerce`] re-types them against the declared field type.

use crate::config::FieldType;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

#[derive(Clone, Debug, PartialEq)]
pub enum DateValue {
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl DateValue {
    /// ISO-8601 text.
    pub fn to_iso(&self) -> String {
        match self {
            DateValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            DateValue::DateTime(dt) => dt.to_rfc3339(),
            DateValue::Naive(n) => n.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypedValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Date(DateValue),
    Text(String),
    List(Vec<TypedValue>),
    Record(BTreeMap<String, TypedValue>),
}

impl TypedValue {
    pub fn get(&self, key: &str) -> Option<&TypedValue> {
        match self {
            TypedValue::Record(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TypedValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Typed JSON for request payloads: numbers stay numbers, dates become ISO text.
    pub fn to_json(&self) -> Value {
        match self {
            TypedValue::Null => Value::Null,
            TypedValue::Bool(b) => Value::Bool(*b),
            TypedValue::Integer(n) => Value::Number((*n).into()),
            TypedValue::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            TypedValue::Date(d) => Value::String(d.to_iso()),
            TypedValue::Text(s) => Value::String(s.clone()),
            TypedValue::List(items) => Value::Array(items.iter().map(TypedValue::to_json).collect()),
            TypedValue::Record(map) => {
                Value::Object(map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
        }
    }
}

impl From<bool> for TypedValue {
    fn from(b: bool) -> Self {
        TypedValue::Bool(b)
    }
}

impl From<i64> for TypedValue {
    fn from(n: i64) -> Self {
        TypedValue::Integer(n)
    }
}

impl From<f64> for TypedValue {
    fn from(f: f64) -> Self {
        TypedValue::Float(f)
    }
}

impl From<&str> for TypedValue {
    fn from(s: &str) -> Self {
        TypedValue::Text(s.to_string())
    }
}

impl From<NaiveDate> for TypedValue {
    fn from(d: NaiveDate) -> Self {
        TypedValue::Date(DateValue::Date(d))
    }
}

impl From<DateTime<FixedOffset>> for TypedValue {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        TypedValue::Date(DateValue::DateTime(dt))
    }
}

/// Canonical text of a value. Composites become one JSON text blob.
pub fn encode(value: &TypedValue) -> String {
    match value {
        TypedValue::Null => "null".into(),
        TypedValue::Bool(b) => b.to_string(),
        TypedValue::Integer(n) => n.to_string(),
        // Number keeps the fraction on integral floats ("1.0"), so decode gives a float back
        TypedValue::Float(f) => Number::from_f64(*f).map(|n| n.to_string()).unwrap_or_else(|| f.to_string()),
        TypedValue::Date(d) => d.to_iso(),
        TypedValue::Text(s) => s.clone(),
        TypedValue::List(_) | TypedValue::Record(_) => to_wire(value).to_string(),
    }
}

/// Wire form: every leaf a string, boolean or null.
pub fn to_wire(value: &TypedValue) -> Value {
    match value {
        TypedValue::Null => Value::Null,
        TypedValue::Bool(b) => Value::Bool(*b),
        TypedValue::Integer(_) | TypedValue::Float(_) | TypedValue::Date(_) | TypedValue::Text(_) => {
            Value::String(encode(value))
        }
        TypedValue::List(items) => Value::Array(items.iter().map(to_wire).collect()),
        TypedValue::Record(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), to_wire(v))).collect()),
    }
}

/// Wire form of a JSON value produced by a store (numbers become their text).
pub fn json_to_wire(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::String(n.to_string()),
        Value::Array(items) => Value::Array(items.into_iter().map(json_to_wire).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, json_to_wire(v))).collect()),
        other => other,
    }
}

type LeafParser = fn(&str) -> Option<TypedValue>;

/// Order matters: a string that is both numeric and date-like decodes as a number.
const DECODE_CHAIN: [LeafParser; 3] = [parse_bool, parse_number, parse_date];

/// Best-effort re-typing of one string leaf. Never fails.
pub fn decode(text: &str) -> TypedValue {
    DECODE_CHAIN
        .iter()
        .find_map(|parse| parse(text))
        .unwrap_or_else(|| TypedValue::Text(text.to_string()))
}

/// Re-type a whole response value, leaf by leaf.
pub fn decode_wire(value: &Value) -> TypedValue {
    match value {
        Value::Null => TypedValue::Null,
        Value::Bool(b) => TypedValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => TypedValue::Integer(i),
            None => n.as_f64().map(TypedValue::Float).unwrap_or(TypedValue::Null),
        },
        Value::String(s) => decode(s),
        Value::Array(items) => TypedValue::List(items.iter().map(decode_wire).collect()),
        Value::Object(map) => TypedValue::Record(map.iter().map(|(k, v)| (k.clone(), decode_wire(v))).collect()),
    }
}

/// Parse a response body and re-type it. Only malformed JSON is an error.
pub fn decode_body(text: &str) -> Result<TypedValue, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    Ok(decode_wire(&value))
}

fn parse_bool(text: &str) -> Option<TypedValue> {
    match text {
        "true" => Some(TypedValue::Bool(true)),
        "false" => Some(TypedValue::Bool(false)),
        _ => None,
    }
}

fn number_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?$").expect("static regex"))
}

fn date_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("static regex"))
}

fn parse_number(text: &str) -> Option<TypedValue> {
    let caps = number_pattern().captures(text)?;
    let integral = caps.get(2).is_none() && caps.get(3).is_none();
    if integral {
        if let Ok(n) = text.parse::<i64>() {
            return Some(TypedValue::Integer(n));
        }
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(TypedValue::Float)
}

fn parse_date(text: &str) -> Option<TypedValue> {
    parse_date_value(text).map(TypedValue::Date)
}

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

fn parse_date_value(text: &str) -> Option<DateValue> {
    if !date_prefix().is_match(text) {
        return None;
    }
    if text.len() == 10 {
        return NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().map(DateValue::Date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(DateValue::DateTime(dt));
    }
    // PostgreSQL text form, e.g. "2024-01-15 10:00:00+00"
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(DateValue::DateTime(dt));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(DateValue::Naive)
}

/// Point on the UTC timeline for a date or timestamp string; dates read
/// as midnight and offset-less timestamps as UTC.
pub fn instant(text: &str) -> Option<NaiveDateTime> {
    match parse_date_value(text)? {
        DateValue::Date(d) => d.and_hms_opt(0, 0, 0),
        DateValue::DateTime(dt) => Some(dt.naive_utc()),
        DateValue::Naive(n) => Some(n),
    }
}

/// Re-type a caller-supplied request value to the declared field type.
/// Errors carry a short reason; the caller adds field context.
pub fn coerce(field_type: FieldType, value: &Value) -> Result<Value, String> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match field_type {
        FieldType::Json => Ok(value.clone()),
        FieldType::Text => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err("expected text".into()),
        },
        FieldType::Integer => match value {
            Value::Number(n) if n.is_i64() => Ok(value.clone()),
            Value::Number(n) if n.is_u64() => Err(format!("{} is out of range for an integer", n)),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(|n| Value::Number(n.into()))
                .map_err(|_| format!("'{}' is not an integer", s)),
            _ => Err("expected an integer".into()),
        },
        FieldType::Float => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("'{}' is not a number", s)),
            _ => Err("expected a number".into()),
        },
        FieldType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) if s == "true" => Ok(Value::Bool(true)),
            Value::String(s) if s == "false" => Ok(Value::Bool(false)),
            _ => Err("expected a boolean".into()),
        },
        FieldType::Date => match value.as_str() {
            Some(s) if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() => Ok(value.clone()),
            Some(s) => Err(format!("'{}' is not a YYYY-MM-DD date", s)),
            None => Err("expected a date string".into()),
        },
        FieldType::Timestamp => match value.as_str() {
            Some(s) if parse_date_value(s).is_some() => Ok(value.clone()),
            Some(s) => Err(format!("'{}' is not an ISO-8601 timestamp", s)),
            None => Err("expected a timestamp string".into()),
        },
        FieldType::Uuid => match value.as_str() {
            Some(s) => uuid::Uuid::parse_str(s)
                .map(|u| Value::String(u.to_string()))
                .map_err(|_| format!("'{}' is not a uuid", s)),
            None => Err("expected a uuid string".into()),
        },
    }
}
