//! HTTP scenarios driven through the router against the in-memory store.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use datagate_sdk::filter::Predicate;
use datagate_sdk::store::SelectOp;
use datagate_sdk::{
    app, resolve_str, AppState, Direction, FilterNode, MemoryStore, MutationRequest, Operator, Projection,
    QueryRequest, RequestBuilder, ResolvedTable, Row, SchemaRegistry, Settings, StoreClient, StoreError, TypedValue,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn registry() -> SchemaRegistry {
    resolve_str(
        r#"{ "tables": [{ "name": "posts", "columns": [
            { "name": "id", "type": "bigserial", "nullable": false },
            { "name": "title", "type": "text" },
            { "name": "content", "type": "text" }
        ] }] }"#,
    )
    .unwrap()
}

fn row(v: Value) -> Row {
    v.as_object().unwrap().clone()
}

fn seeded_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_rows(
        "posts",
        vec![
            row(json!({ "id": 1, "title": "test A", "content": "a" })),
            row(json!({ "id": 2, "title": "test B", "content": "b" })),
            row(json!({ "id": 3, "title": "none", "content": "c" })),
        ],
    ))
}

fn router_with(store: Arc<dyn StoreClient>, settings: Settings) -> Router {
    app(AppState::new(store, registry(), settings))
}

fn router(store: &Arc<MemoryStore>) -> Router {
    router_with(store.clone(), Settings::default())
}

fn builder() -> RequestBuilder {
    RequestBuilder::new("/api/db")
}

async fn send(router: Router, req: Request<Body>) -> (StatusCode, String) {
    let res = router.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn get(router: Router, uri: &str) -> (StatusCode, String) {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post(router: Router, uri: &str, body: Option<String>) -> (StatusCode, String) {
    let req = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .unwrap();
    send(router, req).await
}

async fn mutate(router: Router, req: &MutationRequest) -> (StatusCode, String) {
    let prepared = builder().mutation(req);
    post(router, &prepared.url, prepared.body).await
}

#[tokio::test]
async fn read_with_filter_order_and_limit() {
    let store = seeded_store();
    let req = QueryRequest::new("posts", Projection::new(["id", "title"]))
        .filter(FilterNode::new().field("title", Operator::Like, "%test%"))
        .order_by("title", Direction::Asc)
        .limit(2);
    let (status, body) = get(router(&store), &builder().query_url(&req)).await;
    assert_eq!(status, StatusCode::OK);

    let parsed: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        parsed,
        json!([{ "id": "1", "title": "test A" }, { "id": "2", "title": "test B" }])
    );

    let rows = builder().decode_rows(&body).unwrap();
    assert_eq!(rows[0].get("id"), Some(&TypedValue::Integer(1)));
    assert_eq!(rows[1].get("title"), Some(&TypedValue::Text("test B".into())));
}

#[tokio::test]
async fn raw_query_string_read() {
    let store = seeded_store();
    let uri = "/api/db?select=id,title&from=posts&where=%7B%22title%22%3A%7B%22like%22%3A%22%25test%25%22%7D%7D\
               &order=%7B%22title%22%3A%22asc%22%7D&limit=2";
    let (status, body) = get(router(&store), uri).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = builder()
        .decode_rows(&body)
        .unwrap()
        .iter()
        .filter_map(|r| r.get("id").and_then(TypedValue::as_i64))
        .collect();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn insert_adds_exactly_one_row() {
    let store = seeded_store();
    let (status, body) = mutate(
        router(&store),
        &MutationRequest::Insert {
            table: "posts".into(),
            record: row(json!({ "title": "New", "content": "c" })),
        },
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());

    let rows = store.rows("posts").await;
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[3]["title"], json!("New"));
    assert_eq!(rows[3]["content"], json!("c"));
    assert_eq!(rows[3]["id"], json!(4));
}

#[tokio::test]
async fn update_touches_only_the_filtered_row() {
    let store = seeded_store();
    let (status, _) = mutate(
        router(&store),
        &MutationRequest::Update {
            table: "posts".into(),
            filter: Some(FilterNode::new().field("id", Operator::Eq, "1")),
            changes: row(json!({ "title": "Updated" })),
        },
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let rows = store.rows("posts").await;
    assert_eq!(rows[0]["title"], json!("Updated"));
    assert_eq!(rows[1]["title"], json!("test B"));
    assert_eq!(rows[2]["title"], json!("none"));
}

#[tokio::test]
async fn update_accepts_where_data_envelope() {
    let store = seeded_store();
    let body = json!({ "where": { "id": { "eq": 2 } }, "data": { "content": "changed" } }).to_string();
    let (status, _) = post(router(&store), "/api/db?action=update&table=posts", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(store.rows("posts").await[1]["content"], json!("changed"));
}

#[tokio::test]
async fn delete_without_where_is_rejected_and_harmless() {
    let store = seeded_store();
    let (status, body) = post(router(&store), "/api/db?action=delete&table=posts", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("filter"));
    assert_eq!(store.rows("posts").await.len(), 3);

    let (status, _) = post(
        router(&store),
        "/api/db?action=delete&table=posts&where=%7B%7D",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(store.rows("posts").await.len(), 3);
}

#[tokio::test]
async fn delete_with_where_removes_matches() {
    let store = seeded_store();
    let (status, _) = mutate(
        router(&store),
        &MutationRequest::Delete {
            table: "posts".into(),
            filter: Some(FilterNode::new().field("title", Operator::ILike, "TEST%")),
        },
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = store.rows("posts").await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], json!(3));
}

#[tokio::test]
async fn malformed_where_is_a_client_error() {
    let store = seeded_store();
    let (status, body) = get(router(&store), "/api/db?select=id&from=posts&where=%7Bnope").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("invalid 'where' JSON"), "body: {body}");
}

#[tokio::test]
async fn order_outside_projection_is_rejected() {
    let store = seeded_store();
    let (status, body) = get(
        router(&store),
        "/api/db?select=id&from=posts&order=%7B%22title%22%3A%22asc%22%7D",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("title"));
}

#[tokio::test]
async fn validation_failures_are_bad_requests() {
    let store = seeded_store();
    let cases = [
        "/api/db?from=posts",
        "/api/db?select=id",
        "/api/db?select=id&from=comments",
        "/api/db?select=id,author&from=posts",
        "/api/db?select=id&from=posts&limit=-1",
        "/api/db?select=id&from=posts&limit=5000",
        "/api/db?select=id&from=posts&where=%7B%22id%22%3A%7B%22between%22%3A1%7D%7D",
    ];
    for uri in cases {
        let (status, _) = get(router(&store), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }

    let (status, body) = post(router(&store), "/api/db?action=upsert&table=posts", Some("{}".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("upsert"));
}

struct BrokenStore;

#[async_trait]
impl StoreClient for BrokenStore {
    fn backend(&self) -> &'static str {
        "broken"
    }
    async fn select(&self, _: &SelectOp) -> Result<Vec<Row>, StoreError> {
        Err(StoreError::Backend("relation \"posts\" does not exist".into()))
    }
    async fn insert(&self, _: &ResolvedTable, _: &Row) -> Result<(), StoreError> {
        Err(StoreError::Backend("connection refused".into()))
    }
    async fn update(&self, _: &ResolvedTable, _: &Predicate, _: &Row) -> Result<u64, StoreError> {
        Err(StoreError::Backend("connection refused".into()))
    }
    async fn delete(&self, _: &ResolvedTable, _: &Predicate) -> Result<u64, StoreError> {
        Err(StoreError::Backend("connection refused".into()))
    }
    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Backend("connection refused".into()))
    }
}

#[tokio::test]
async fn backend_failures_are_generic_server_errors() {
    let broken = || router_with(Arc::new(BrokenStore), Settings::default());

    let (status, body) = get(broken(), "/api/db?select=id&from=posts").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.contains("relation"));

    let (status, body) = post(
        broken(),
        "/api/db?action=insert&table=posts",
        Some(r#"{"title":"x"}"#.into()),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.contains("refused"));

    let (status, _) = get(broken(), "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn health_routes() {
    let store = seeded_store();
    let (status, body) = get(router(&store), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ok"));
    let (status, body) = get(router(&store), "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("memory"));
    let (status, body) = get(router(&store), "/version").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
async fn oversized_write_body_is_refused() {
    let store = seeded_store();
    let settings = Settings {
        body_limit_bytes: 64,
        ..Settings::default()
    };
    let body = json!({ "title": "x".repeat(200) }).to_string();
    let req = Request::post("/api/db?action=insert&table=posts")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();
    let (status, _) = send(router_with(store.clone(), settings), req).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(store.rows("posts").await.len(), 3);
}
