//! Datagate SDK: declarative query/mutation HTTP layer over a schema registry.
//!
//! Reads arrive as `GET <path>?select=..&from=..&where=..`, writes as
//! `POST <path>?action=..&table=..` with a JSON body. Both go through the
//! registry before exactly one call to a [`store::StoreClient`].

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod request;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;

pub use client::{PreparedMutation, RequestBuilder};
pub use codec::{decode, decode_body, encode, TypedValue};
pub use config::{load_from_path, resolve, resolve_str, FullConfig, ResolvedTable, SchemaRegistry};
pub use error::{AppError, ConfigError, StoreError};
pub use filter::{FilterNode, Operator};
pub use request::{Action, Direction, MutationRequest, OrderSpec, Projection, QueryRequest};
pub use routes::{app, common_routes, db_routes};
pub use service::{MutationDispatcher, QueryPlanner};
pub use settings::Settings;
pub use state::AppState;
pub use store::{MemoryStore, PgStore, Row, StoreClient};
