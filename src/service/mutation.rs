//! Write path: turn a MutationRequest into exactly one store operation.

use super::planner::lookup_table;
use super::validation::RequestValidator;
use crate::codec::coerce;
use crate::config::{ResolvedTable, SchemaRegistry};
use crate::error::AppError;
use crate::filter::{compile, FilterNode, Predicate};
use crate::request::{Action, MutationRequest};
use crate::store::{Row, StoreClient};
use std::sync::Arc;

/// A validated write. Update and delete always carry a predicate.
#[derive(Clone, Debug)]
pub enum MutationOp {
    Insert { table: Arc<ResolvedTable>, record: Row },
    Update { table: Arc<ResolvedTable>, predicate: Predicate, changes: Row },
    Delete { table: Arc<ResolvedTable>, predicate: Predicate },
}

pub struct MutationDispatcher<'a> {
    store: &'a dyn StoreClient,
    registry: &'a SchemaRegistry,
}

impl<'a> MutationDispatcher<'a> {
    pub fn new(store: &'a dyn StoreClient, registry: &'a SchemaRegistry) -> Self {
        MutationDispatcher { store, registry }
    }

    /// Validate and compile without touching the store.
    pub fn plan(&self, req: &MutationRequest) -> Result<MutationOp, AppError> {
        let table = lookup_table(self.registry, req.table())?;
        match req {
            MutationRequest::Insert { record, .. } => {
                let record = coerce_record(&table, record)?;
                RequestValidator::validate(&record, &table)?;
                Ok(MutationOp::Insert { table, record })
            }
            MutationRequest::Update { filter, changes, .. } => {
                let predicate = required_predicate(Action::Update, filter.as_ref(), &table)?;
                if changes.is_empty() {
                    return Err(AppError::validation("update requires at least one field to change"));
                }
                let changes = coerce_record(&table, changes)?;
                RequestValidator::validate_partial(&changes, &table)?;
                Ok(MutationOp::Update {
                    table,
                    predicate,
                    changes,
                })
            }
            MutationRequest::Delete { filter, .. } => {
                let predicate = required_predicate(Action::Delete, filter.as_ref(), &table)?;
                Ok(MutationOp::Delete { table, predicate })
            }
        }
    }

    /// Returns the number of rows affected (1 for insert).
    pub async fn execute(&self, req: &MutationRequest) -> Result<u64, AppError> {
        let op = self.plan(req)?;
        tracing::debug!(
            action = req.action().as_str(),
            table = req.table(),
            backend = self.store.backend(),
            "mutation"
        );
        let result = match &op {
            MutationOp::Insert { table, record } => self.store.insert(table, record).await.map(|_| 1),
            MutationOp::Update {
                table,
                predicate,
                changes,
            } => self.store.update(table, predicate, changes).await,
            MutationOp::Delete { table, predicate } => self.store.delete(table, predicate).await,
        };
        result.map_err(|e| AppError::MutationExecution(e.to_string()))
    }
}

fn required_predicate(
    action: Action,
    filter: Option<&FilterNode>,
    table: &ResolvedTable,
) -> Result<Predicate, AppError> {
    match filter {
        Some(node) if !node.is_empty() => compile(node, table),
        _ => Err(AppError::MissingFilter {
            action: action.as_str(),
        }),
    }
}

/// Every key must name a column; values are re-typed to the column type.
fn coerce_record(table: &ResolvedTable, record: &Row) -> Result<Row, AppError> {
    let mut out = Row::new();
    for (key, value) in record {
        let col = table.column(key).ok_or_else(|| AppError::UnknownField {
            table: table.name.clone(),
            field: key.clone(),
        })?;
        if value.is_null() && !col.nullable {
            return Err(AppError::validation(format!("{} cannot be null", key)));
        }
        let value = coerce(col.field_type, value)
            .map_err(|reason| AppError::validation(format!("field '{}': {}", key, reason)))?;
        out.insert(key.clone(), value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::resolve_str;
    use crate::error::StoreError;
    use crate::filter::Operator;
    use crate::store::{MemoryStore, SelectOp};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> SchemaRegistry {
        resolve_str(
            r#"{ "tables": [{ "name": "posts", "columns": [
                { "name": "id", "type": "bigserial", "nullable": false },
                { "name": "title", "type": "text", "validation": { "required": true } },
                { "name": "content", "type": "text" }
            ] }] }"#,
        )
        .unwrap()
    }

    fn row(v: Value) -> Row {
        v.as_object().unwrap().clone()
    }

    /// Counts store calls and fails every one of them.
    #[derive(Default)]
    struct FailingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StoreClient for FailingStore {
        fn backend(&self) -> &'static str {
            "failing"
        }
        async fn select(&self, _: &SelectOp) -> Result<Vec<Row>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Backend("boom".into()))
        }
        async fn insert(&self, _: &ResolvedTable, _: &Row) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Backend("duplicate key value".into()))
        }
        async fn update(&self, _: &ResolvedTable, _: &Predicate, _: &Row) -> Result<u64, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Backend("boom".into()))
        }
        async fn delete(&self, _: &ResolvedTable, _: &Predicate) -> Result<u64, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Backend("boom".into()))
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Backend("down".into()))
        }
    }

    #[tokio::test]
    async fn update_and_delete_require_filter() {
        let reg = registry();
        let store = FailingStore::default();
        let d = MutationDispatcher::new(&store, &reg);

        let err = d
            .execute(&MutationRequest::Delete {
                table: "posts".into(),
                filter: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingFilter { action: "delete" }));

        let err = d
            .execute(&MutationRequest::Update {
                table: "posts".into(),
                filter: Some(FilterNode::new()),
                changes: row(json!({ "title": "x" })),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingFilter { action: "update" }));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn store_failure_is_mutation_execution() {
        let reg = registry();
        let store = FailingStore::default();
        let d = MutationDispatcher::new(&store, &reg);
        let err = d
            .execute(&MutationRequest::Insert {
                table: "posts".into(),
                record: row(json!({ "title": "x" })),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MutationExecution(ref m) if m.contains("duplicate key")));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn records_are_checked_against_the_schema() {
        let reg = registry();
        let store = MemoryStore::new();
        let d = MutationDispatcher::new(&store, &reg);

        let insert = |v: Value| {
            d.plan(&MutationRequest::Insert {
                table: "posts".into(),
                record: row(v),
            })
        };
        assert!(matches!(insert(json!({ "title": "x", "author": "me" })), Err(AppError::UnknownField { .. })));
        assert!(matches!(insert(json!({ "content": "no title" })), Err(AppError::RequestValidation(_))));
        assert!(matches!(insert(json!({ "title": "x", "id": "abc" })), Err(AppError::RequestValidation(_))));
        assert!(matches!(insert(json!({ "title": "x", "id": null })), Err(AppError::RequestValidation(_))));

        let MutationOp::Insert { record, .. } = insert(json!({ "title": "x", "id": "7" })).unwrap() else {
            panic!("expected insert");
        };
        assert_eq!(record["id"], json!(7));

        let err = d
            .plan(&MutationRequest::Update {
                table: "posts".into(),
                filter: Some(FilterNode::new().field("id", Operator::Eq, 1)),
                changes: Row::new(),
            })
            .unwrap_err();
        assert!(matches!(err, AppError::RequestValidation(_)));

        let err = d
            .plan(&MutationRequest::Delete {
                table: "comments".into(),
                filter: Some(FilterNode::new().field("id", Operator::Eq, 1)),
            })
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownTable(_)));
    }

    #[tokio::test]
    async fn executes_against_the_store() {
        let reg = registry();
        let store = MemoryStore::new();
        let d = MutationDispatcher::new(&store, &reg);
        let n = d
            .execute(&MutationRequest::Insert {
                table: "posts".into(),
                record: row(json!({ "title": "New", "content": "Content" })),
            })
            .await
            .unwrap();
        assert_eq!(n, 1);
        let n = d
            .execute(&MutationRequest::Update {
                table: "posts".into(),
                filter: Some(FilterNode::new().field("id", Operator::Eq, "1")),
                changes: row(json!({ "title": "Updated" })),
            })
            .await
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(store.rows("posts").await[0]["title"], json!("Updated"));
    }
}
