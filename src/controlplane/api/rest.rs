//! REST API Handlers
//!
//! Maps the lifecycle API onto HTTP. Status codes follow the error code of
//! the failure: InvalidArgument 400, NotFound 404, AlreadyExists 409,
//! Unimplemented 501, everything else 500.

use crate::controlplane::controller::Controller;
use crate::controlplane::types::{
    CapacityRange, ControllerCapability, ControllerExpandVolumeRequest, CreateSnapshotRequest,
    CreateVolumeRequest, DeleteSnapshotRequest, DeleteVolumeRequest,
};
use crate::error::{Code, Error, Result};
use axum::{
    extract::{Json, Path, RawPathParams, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::debug;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Body of `POST /v1/volumes/:id/expand`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandVolumeBody {
    #[serde(default)]
    pub capacity_range: Option<CapacityRange>,
}

/// Body of `GET /v1/capabilities`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitiesResponse {
    pub capabilities: Vec<ControllerCapability>,
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
}

/// Lifecycle error rendered as an HTTP response
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status = match code {
            Code::InvalidArgument => StatusCode::BAD_REQUEST,
            Code::NotFound => StatusCode::NOT_FOUND,
            Code::AlreadyExists => StatusCode::CONFLICT,
            Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
            Code::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(ApiErrorResponse {
                error: code.to_string(),
                message: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

// =============================================================================
// REST Router
// =============================================================================

/// REST API router builder
pub struct RestRouter {
    controller: Arc<Controller>,
}

impl RestRouter {
    pub fn new(controller: Arc<Controller>) -> Self {
        Self { controller }
    }

    /// Build the Axum router
    pub fn build(self) -> Router {
        let state = AppState {
            controller: self.controller,
        };

        Router::new()
            // Volume endpoints
            .route("/v1/volumes", post(create_volume).get(list_volumes))
            .route("/v1/volumes/:id", delete(delete_volume))
            .route("/v1/volumes/:id/expand", post(expand_volume))
            .route("/v1/volumes/:id/publish", post(publish_volume))
            .route("/v1/volumes/:id/unpublish", post(unpublish_volume))
            .route("/v1/volumes/:id/validate", post(validate_volume))
            // Snapshot endpoints
            .route("/v1/snapshots", post(create_snapshot).get(list_snapshots))
            .route("/v1/snapshots/:id", delete(delete_snapshot))
            // Controller endpoints
            .route("/v1/capabilities", get(get_capabilities))
            .route("/v1/capacity", get(get_capacity))
            // Health endpoint
            .route("/health", get(health_check))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    controller: Arc<Controller>,
}

// =============================================================================
// Handlers
// =============================================================================

async fn create_volume(
    State(state): State<AppState>,
    Json(request): Json<CreateVolumeRequest>,
) -> ApiResult<impl IntoResponse> {
    let response = state.controller.create_volume(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn delete_volume(
    State(state): State<AppState>,
    Path(volume_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .controller
        .delete_volume(DeleteVolumeRequest { volume_id })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn expand_volume(
    State(state): State<AppState>,
    Path(volume_id): Path<String>,
    Json(body): Json<ExpandVolumeBody>,
) -> ApiResult<impl IntoResponse> {
    let response = state
        .controller
        .expand_volume(ControllerExpandVolumeRequest {
            volume_id,
            capacity_range: body.capacity_range,
        })
        .await?;
    Ok(Json(response))
}

async fn create_snapshot(
    State(state): State<AppState>,
    Json(request): Json<CreateSnapshotRequest>,
) -> ApiResult<impl IntoResponse> {
    let response = state.controller.create_snapshot(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// The id is taken raw and decoded here so `pvc-1%40snap-1` and
/// `pvc-1@snap-1` name the same snapshot
async fn delete_snapshot(
    State(state): State<AppState>,
    params: RawPathParams,
) -> ApiResult<StatusCode> {
    let raw = params
        .iter()
        .find(|(key, _)| *key == "id")
        .map(|(_, value)| value)
        .unwrap_or_default();
    let snapshot_id = urlencoding::decode(raw)
        .map_err(|_| Error::InvalidSnapshotId { id: raw.to_string() })?
        .into_owned();

    debug!(%snapshot_id, "Deleting snapshot");
    state
        .controller
        .delete_snapshot(DeleteSnapshotRequest { snapshot_id })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_capabilities(State(state): State<AppState>) -> Json<CapabilitiesResponse> {
    Json(CapabilitiesResponse {
        capabilities: state.controller.get_capabilities(),
    })
}

async fn list_volumes(State(state): State<AppState>) -> ApiResult<StatusCode> {
    unimplemented_response(state.controller.list_volumes())
}

async fn list_snapshots(State(state): State<AppState>) -> ApiResult<StatusCode> {
    unimplemented_response(state.controller.list_snapshots())
}

async fn get_capacity(State(state): State<AppState>) -> ApiResult<StatusCode> {
    unimplemented_response(state.controller.get_capacity())
}

async fn publish_volume(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    unimplemented_response(state.controller.publish_volume(&id))
}

async fn unpublish_volume(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    unimplemented_response(state.controller.unpublish_volume(&id))
}

async fn validate_volume(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    unimplemented_response(state.controller.validate_volume_capabilities(&id))
}

fn unimplemented_response(result: Result<()>) -> ApiResult<StatusCode> {
    result?;
    Ok(StatusCode::OK)
}

/// Health check
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
