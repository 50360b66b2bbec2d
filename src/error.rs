//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("duplicate table: {0}")]
    DuplicateTable(String),
    #[error("duplicate column: table {table} column {column}")]
    DuplicateColumn { table: String, column: String },
    #[error("settings: {0}")]
    Settings(String),
}

/// Failure raised by a store adapter. Never crosses the HTTP boundary as-is.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    RequestValidation(String),
    #[error("unsupported operator '{operator}' on field '{field}'")]
    UnsupportedOperator { field: String, operator: String },
    #[error("unknown field '{field}' on table '{table}'")]
    UnknownField { table: String, field: String },
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    #[error("order field '{0}' is not in the select list")]
    InvalidOrderField(String),
    #[error("invalid pagination: {0}")]
    InvalidPagination(String),
    #[error("{action} requires a non-empty filter")]
    MissingFilter { action: &'static str },
    #[error("query execution failed: {0}")]
    QueryExecution(String),
    #[error("mutation execution failed: {0}")]
    MutationExecution(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::RequestValidation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::QueryExecution(_) | AppError::MutationExecution(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::RequestValidation(_)
            | AppError::UnsupportedOperator { .. }
            | AppError::UnknownField { .. }
            | AppError::UnknownTable(_)
            | AppError::InvalidOrderField(_)
            | AppError::InvalidPagination(_)
            | AppError::MissingFilter { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// True for errors whose detail must stay server-side.
    pub fn is_internal(&self) -> bool {
        self.status().is_server_error()
    }

    /// Text sent to the client. Server-class errors get a fixed message.
    pub fn client_message(&self) -> String {
        match self {
            AppError::QueryExecution(_) => "failed to execute query".into(),
            AppError::MutationExecution(_) => "failed to execute mutation".into(),
            AppError::Config(_) => "server configuration error".into(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), self.client_message()).into_response()
    }
}
