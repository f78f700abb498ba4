use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use forgeroute_core::DomainError;
use forgeroute_inventory::LedgerError;
use forgeroute_routing::{RoutingError, StoreError};

pub fn routing_error_to_response(err: RoutingError) -> Response {
    match err {
        RoutingError::OrderNotFound(id) => json_error(StatusCode::NOT_FOUND, "not_found", format!("order {id} not found")),
        RoutingError::Domain(e) => domain_error_to_response(e),
        RoutingError::Store(e) => store_error_to_response(e),
        RoutingError::Ledger(e) => ledger_error_to_response(e),
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvariantViolation(msg) => json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Unauthorized => json_error(StatusCode::FORBIDDEN, "unauthorized", "unauthorized"),
    }
}

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        e @ StoreError::Conflict { .. } => json_error(StatusCode::CONFLICT, "conflict", e.to_string()),
        e @ StoreError::Duplicate(_) => json_error(StatusCode::CONFLICT, "duplicate", e.to_string()),
        e @ StoreError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", e.to_string()),
        StoreError::Backend(msg) => {
            tracing::error!(error = %msg, "store backend failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

pub fn ledger_error_to_response(err: LedgerError) -> Response {
    match err {
        e @ LedgerError::InsufficientStock { .. } => json_error(StatusCode::CONFLICT, "insufficient_stock", e.to_string()),
        e @ LedgerError::BelowReserved { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", e.to_string())
        }
        LedgerError::Storage(msg) => {
            tracing::error!(error = %msg, "ledger storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "ledger_error", msg)
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn invalid_id(what: &str) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id"))
}

/// Run synchronous engine/ledger work off the async executor and map its
/// error into a JSON response.
pub async fn blocking<T, E, F>(work: F, to_response: fn(E) -> Response) -> Result<T, Response>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(to_response(e)),
        Err(join) => {
            tracing::error!(error = %join, "blocking task failed");
            Err(json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "request task failed"))
        }
    }
}
