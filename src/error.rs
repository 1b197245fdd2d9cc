use axum::extract::rejection::QueryRejection;
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

/// Failures of the shared connection lifecycle.
#[derive(Debug, ThisError)]
pub enum ConnectionError {
    #[error("failed to establish database connection: {0}")]
    EstablishFailed(#[source] SqlxError),

    #[error("failed to close database connection: {0}")]
    CloseFailed(#[source] SqlxError),

    #[error("database connection is not open; call open() first")]
    NotInitialized,
}

#[derive(Debug, ThisError)]
pub enum StockError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Unknown company symbol: {0}")]
    CompanyNotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<QueryRejection> for StockError {
    fn from(rejection: QueryRejection) -> Self {
        StockError::BadRequest(rejection.body_text())
    }
}

impl From<figment::Error> for StockError {
    fn from(e: figment::Error) -> Self {
        StockError::Config(Box::new(e))
    }
}

impl IntoResponse for StockError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            StockError::CompanyNotFound(symbol) => (
                StatusCode::NOT_FOUND,
                ApiErrorBody {
                    code: "NOT_FOUND".to_string(),
                    message: format!("No company with symbol {symbol}."),
                },
            ),
            StockError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody {
                    code: "BAD_REQUEST".to_string(),
                    message,
                },
            ),
            StockError::Connection(ConnectionError::NotInitialized) => {
                error!("request served before the database connection was opened");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorBody {
                        code: "NOT_INITIALIZED".to_string(),
                        message: "Database connection is not available.".to_string(),
                    },
                )
            }
            other => {
                error!(error = %other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorBody {
                        code: "INTERNAL_ERROR".to_string(),
                        message: "An internal server error occurred.".to_string(),
                    },
                )
            }
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
