//! Read path: validate a QueryRequest against the registry and run it.

use crate::config::{ResolvedTable, SchemaRegistry};
use crate::error::AppError;
use crate::filter::{compile, Column, FieldResolver};
use crate::request::QueryRequest;
use crate::store::{Row, SelectOp, StoreClient};
use std::sync::Arc;

pub struct QueryPlanner<'a> {
    store: &'a dyn StoreClient,
    registry: &'a SchemaRegistry,
    max_limit: Option<u64>,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(store: &'a dyn StoreClient, registry: &'a SchemaRegistry) -> Self {
        QueryPlanner {
            store,
            registry,
            max_limit: None,
        }
    }

    /// Reject limits above `max`; `None` leaves limits unbounded.
    pub fn with_max_limit(mut self, max: Option<u64>) -> Self {
        self.max_limit = max;
        self
    }

    /// Validate and compile without touching the store.
    pub fn plan(&self, req: &QueryRequest) -> Result<SelectOp, AppError> {
        if req.projection.is_empty() {
            return Err(AppError::validation("'select' must name at least one field"));
        }
        let table = lookup_table(self.registry, &req.table)?;

        let columns = req
            .projection
            .fields()
            .iter()
            .map(|f| resolve(&table, f))
            .collect::<Result<Vec<Column>, _>>()?;

        let mut order = Vec::with_capacity(req.order.entries().len());
        for (field, direction) in req.order.entries() {
            if !req.projection.contains(field) {
                return Err(AppError::InvalidOrderField(field.clone()));
            }
            order.push((resolve(&table, field)?, *direction));
        }

        if let (Some(limit), Some(max)) = (req.limit, self.max_limit) {
            if limit > max {
                return Err(AppError::InvalidPagination(format!(
                    "limit must be at most {}, got {}",
                    max, limit
                )));
            }
        }

        let predicate = match &req.filter {
            Some(node) if !node.is_empty() => Some(compile(node, &*table)?),
            _ => None,
        };

        Ok(SelectOp {
            table,
            columns,
            predicate,
            order,
            limit: req.limit,
            offset: req.offset,
        })
    }

    pub async fn execute(&self, req: &QueryRequest) -> Result<Vec<Row>, AppError> {
        let op = self.plan(req)?;
        tracing::debug!(
            table = %op.table.name,
            backend = self.store.backend(),
            columns = op.columns.len(),
            filtered = op.predicate.is_some(),
            "select"
        );
        self.store
            .select(&op)
            .await
            .map_err(|e| AppError::QueryExecution(e.to_string()))
    }
}

pub(crate) fn lookup_table(registry: &SchemaRegistry, name: &str) -> Result<Arc<ResolvedTable>, AppError> {
    registry
        .table(name)
        .cloned()
        .ok_or_else(|| AppError::UnknownTable(name.to_string()))
}

fn resolve(table: &ResolvedTable, field: &str) -> Result<Column, AppError> {
    table.resolve_field(field).ok_or_else(|| AppError::UnknownField {
        table: table.name.clone(),
        field: field.to_string(),
    })
}
