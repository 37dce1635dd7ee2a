use axum::{
	Json, Router,
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{delete, get, post},
};
use serde::Serialize;
use uuid::Uuid;

use crate::state::AppState;
use lore_service::{Error as ServiceError, QueryRequest, QueryResponse, ReindexReport};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/session", post(create_session))
		.route("/session/{id}", delete(delete_session))
		.route("/query", post(query))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new().route("/v1/admin/reindex", post(reindex)).with_state(state)
}

#[derive(Debug, Serialize)]
struct Health {
	status: &'static str,
	active_sessions: usize,
}

#[derive(Debug, Serialize)]
struct SessionCreated {
	session_id: Uuid,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
	Json(Health { status: "ok", active_sessions: state.service.sessions.active_count().await })
}

async fn create_session(State(state): State<AppState>) -> Json<SessionCreated> {
	Json(SessionCreated { session_id: state.service.sessions.create().await })
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
	// Idempotent: deleting an unknown or already-deleted session is fine.
	state.service.sessions.reset(id).await;

	StatusCode::NO_CONTENT
}

async fn query(
	State(state): State<AppState>,
	Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
	let response = state.service.answer(payload).await?;

	Ok(Json(response))
}

async fn reindex(State(state): State<AppState>) -> Result<Json<ReindexReport>, ApiError> {
	let report = state.service.reindex().await?;

	Ok(Json(report))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	detail: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	detail: String,
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let (status, detail) = match &err {
			ServiceError::InvalidRequest { message } =>
				(StatusCode::BAD_REQUEST, message.clone()),
			ServiceError::ChunkingFailure { relpath } => (
				StatusCode::UNPROCESSABLE_ENTITY,
				format!("Failed to chunk document at {relpath}."),
			),
			ServiceError::SessionNotFound { .. } | ServiceError::NotFound { .. } =>
				(StatusCode::NOT_FOUND, err.to_string()),
			ServiceError::Conflict { .. } =>
				(StatusCode::CONFLICT, "Conflicting write; please retry.".to_string()),
			ServiceError::GenerationTimeout | ServiceError::Provider { .. } =>
				(StatusCode::BAD_GATEWAY, "Generation backend unavailable.".to_string()),
			// Storage and config internals never leak verbatim.
			ServiceError::Storage { .. } | ServiceError::InvalidConfig { .. } => {
				tracing::error!(error = %err, "Internal error while handling request.");

				(StatusCode::INTERNAL_SERVER_ERROR, "Internal error.".to_string())
			},
		};

		Self { status, detail }
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(self.status, Json(ErrorBody { detail: self.detail })).into_response()
	}
}
