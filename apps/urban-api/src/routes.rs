use axum::{
	Json, Router,
	body::Body,
	extract::{State, rejection::JsonRejection},
	http::{StatusCode, header},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;
use urban_domain::object::Observation;
use urban_service::{Error, RuleMode};

#[derive(Debug, Deserialize)]
pub struct ConditionRequest {
	pub condition: String,
}

#[derive(Debug, Serialize)]
pub struct TypesResponse {
	pub types: Vec<String>,
}

pub fn router(state: AppState) -> Router {
	let cors_permissive = state.service.cfg.service.cors_permissive;
	let router = Router::new()
		.route("/health", get(health))
		.route("/objects/new", post(new_object))
		.route("/objects/filter_by_rule/included/stream", post(included_stream))
		.route("/objects/filter_by_rule/excluded/stream", post(excluded_stream))
		.route("/objects/types", get(list_types))
		.with_state(state);

	if cors_permissive {
		router.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
	} else {
		router
	}
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn new_object(
	State(state): State<AppState>,
	payload: Result<Json<Observation>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
	let Json(observation) = payload.map_err(invalid_body)?;
	let outcome = state.service.resolve(observation).await?;
	let body = outcome.to_response().map_err(|err| {
		json_error(StatusCode::INTERNAL_SERVER_ERROR, "validation_error", err.to_string())
	})?;

	Ok(Json(body))
}

async fn included_stream(
	State(state): State<AppState>,
	payload: Result<Json<ConditionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
	rule_stream(state, payload, RuleMode::Included).await
}

async fn excluded_stream(
	State(state): State<AppState>,
	payload: Result<Json<ConditionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
	rule_stream(state, payload, RuleMode::Excluded).await
}

async fn rule_stream(
	state: AppState,
	payload: Result<Json<ConditionRequest>, JsonRejection>,
	mode: RuleMode,
) -> Result<Response, ApiError> {
	let Json(request) = payload.map_err(invalid_body)?;
	let ids = state.service.stream_by_rule(&request.condition, mode).await?;
	// A failed page fetch aborts the response body mid-stream.
	let lines = ids.map(|item| {
		item.map(|id| format!("{id}\n")).inspect_err(|err| {
			tracing::error!(error = %err, "Identifier stream failed.");
		})
	});

	Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], Body::from_stream(lines))
		.into_response())
}

async fn list_types(State(state): State<AppState>) -> Result<Json<TypesResponse>, ApiError> {
	let types = state.service.list_types().await?;

	Ok(Json(TypesResponse { types }))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let message = err.to_string();

		match err {
			Error::InvalidRequest { .. } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message),
			Error::Normalization { .. } =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "normalization_error", message),
			Error::Encoding { .. } =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "encoding_error", message),
			Error::Match { .. } =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "match_error", message),
			Error::Persistence { .. } =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "persistence_error", message),
			Error::Validation { .. } =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "validation_error", message),
			Error::PredicateSynthesis { .. } =>
				json_error(StatusCode::BAD_GATEWAY, "predicate_synthesis_error", message),
			Error::Storage { .. } =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", message),
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError::new(status, code, message)
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
	json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text())
}
