//! Web server module for the todo service.
//!
//! Provides the todo HTTP API and the liveness/readiness probes. Every
//! request acquires its own [`Handle`](crate::storage::Handle) and releases
//! it before responding.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::storage::{ConnectionError, ConnectionManager, StorageError, Todo};

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Manager used for per-request handles.
    pub connections: ConnectionManager,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    db: Option<String>,
}

/// Request body for `POST /todos`.
#[derive(Debug, Deserialize)]
struct CreateTodoRequest {
    task: Option<String>,
}

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or incomplete request.
    #[error("{0}")]
    Validation(String),

    /// The database could not be reached.
    #[error(transparent)]
    Unavailable(#[from] ConnectionError),

    /// The database rejected the operation.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let app_state = Arc::new(state);

    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .route("/todos", get(list_todos_handler).post(create_todo_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// Liveness probe.
async fn healthz_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        db: None,
    })
}

/// Readiness probe that checks the database answers.
async fn readyz_handler(State(state): State<Arc<AppState>>) -> Response {
    let db_status = probe_database(&state.connections)
        .await
        .map(|()| "ready".to_string())
        .map_err(|e| e.to_string());

    match db_status {
        Ok(db) => Json(HealthResponse {
            status: "ok".to_string(),
            db: Some(db),
        })
        .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "not_ready".to_string(),
                    db: Some(err),
                }),
            )
                .into_response()
        }
    }
}

async fn probe_database(connections: &ConnectionManager) -> Result<(), ApiError> {
    let mut handle = connections.acquire().await?;
    let pinged = handle.ping().await;
    handle.release().await;
    Ok(pinged?)
}

/// List all todos, newest first.
async fn list_todos_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Todo>>, ApiError> {
    let mut handle = state.connections.acquire().await?;
    let todos = handle.list_todos().await;
    handle.release().await;

    Ok(Json(todos?))
}

/// Create a todo from `{"task": "..."}`.
async fn create_todo_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let task = request
        .task
        .filter(|task| !task.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Task is required".to_string()))?;

    let mut handle = state.connections.acquire().await?;
    let inserted = handle.insert_todo(&task).await;
    handle.release().await;

    let todo = inserted?;
    tracing::debug!(id = todo.id, "Todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}
