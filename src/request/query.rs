//! Read requests: projection, ordering, pagination, and their query-string parsing.

use crate::error::AppError;
use crate::filter::FilterNode;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Field names to return, in caller order, without duplicates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Projection(Vec<String>);

impl Projection {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for f in fields {
            let f = f.into();
            if !out.contains(&f) {
                out.push(f);
            }
        }
        Projection(out)
    }

    /// `select` parameter: comma list, JSON array, or `{field: bool}` map.
    pub fn parse(text: &str) -> Result<Self, AppError> {
        let trimmed = text.trim();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            let value: Value = serde_json::from_str(trimmed)
                .map_err(|e| AppError::validation(format!("invalid 'select' JSON: {}", e)))?;
            return Self::from_json(&value);
        }
        Ok(Self::new(
            trimmed.split(',').map(str::trim).filter(|s| !s.is_empty()),
        ))
    }

    pub fn from_json(value: &Value) -> Result<Self, AppError> {
        match value {
            Value::Array(items) => {
                let names = items
                    .iter()
                    .map(|v| {
                        v.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| AppError::validation("select array must contain field names"))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::new(names))
            }
            Value::Object(map) => {
                let mut names = Vec::new();
                for (k, v) in map {
                    match v {
                        Value::Bool(true) => names.push(k.clone()),
                        Value::Bool(false) => {}
                        _ => {
                            return Err(AppError::validation(format!(
                                "select flag for '{}' must be a boolean",
                                k
                            )))
                        }
                    }
                }
                Ok(Self::new(names))
            }
            _ => Err(AppError::validation("select must be a list or a field map")),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|f| f == field)
    }

    /// Comma list form used on the query string; JSON array when a name would not survive the split.
    pub fn to_param(&self) -> String {
        let plain = self
            .0
            .iter()
            .all(|f| !f.contains(',') && f.trim() == f && !f.starts_with(['[', '{']));
        if plain {
            self.0.join(",")
        } else {
            Value::from(self.0.clone()).to_string()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// Ordered field → direction entries; the first entry is the primary sort.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OrderSpec(Vec<(String, Direction)>);

impl OrderSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, direction: Direction) {
        self.0.push((field.into(), direction));
    }

    pub fn entries(&self) -> &[(String, Direction)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn parse(text: &str) -> Result<Self, AppError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| AppError::validation(format!("invalid 'order' JSON: {}", e)))?;
        let Value::Object(map) = value else {
            return Err(AppError::validation("order must be a JSON object of field to direction"));
        };
        let mut spec = OrderSpec::new();
        for (field, dir) in map {
            let direction = match dir.as_str().map(str::to_lowercase).as_deref() {
                Some("asc") => Direction::Asc,
                Some("desc") => Direction::Desc,
                _ => {
                    return Err(AppError::validation(format!(
                        "order direction for '{}' must be \"asc\" or \"desc\"",
                        field
                    )))
                }
            };
            spec.push(field, direction);
        }
        Ok(spec)
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(f, d)| (f.clone(), Value::String(d.as_str().to_string())))
            .collect();
        Value::Object(map)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryRequest {
    pub table: String,
    pub projection: Projection,
    pub filter: Option<FilterNode>,
    pub order: OrderSpec,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl QueryRequest {
    pub fn new(table: impl Into<String>, projection: Projection) -> Self {
        QueryRequest {
            table: table.into(),
            projection,
            ..Default::default()
        }
    }

    pub fn filter(mut self, filter: FilterNode) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order.push(field, direction);
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Parse `select`, `from`, `where`, `order`, `limit`, `offset`.
    /// Order fields are checked against the projection here as well as in the planner.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, AppError> {
        let select = non_empty(params, "select")
            .ok_or_else(|| AppError::validation("missing required parameter 'select'"))?;
        let table = non_empty(params, "from")
            .ok_or_else(|| AppError::validation("missing required parameter 'from'"))?;

        let projection = Projection::parse(select)?;
        if projection.is_empty() {
            return Err(AppError::validation("'select' must name at least one field"));
        }
        let filter = non_empty(params, "where").map(FilterNode::parse).transpose()?;
        let order = non_empty(params, "order")
            .map(OrderSpec::parse)
            .transpose()?
            .unwrap_or_default();
        if let Some((field, _)) = order.entries().iter().find(|(f, _)| !projection.contains(f)) {
            return Err(AppError::InvalidOrderField(field.clone()));
        }

        Ok(QueryRequest {
            table: table.to_string(),
            projection,
            filter,
            order,
            limit: non_empty(params, "limit").map(|v| parse_pagination("limit", v)).transpose()?,
            offset: non_empty(params, "offset").map(|v| parse_pagination("offset", v)).transpose()?,
        })
    }
}

fn non_empty<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params.get(key).map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn parse_pagination(name: &str, value: &str) -> Result<u64, AppError> {
    match value.parse::<i64>() {
        Ok(n) if n < 0 => Err(AppError::InvalidPagination(format!(
            "{} must be non-negative, got {}",
            name, n
        ))),
        Ok(n) => Ok(n as u64),
        Err(_) => Err(AppError::InvalidPagination(format!(
            "{} must be an integer, got '{}'",
            name, value
        ))),
    }
}
