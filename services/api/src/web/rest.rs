//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::{ApiError, ErrorBody};
use crate::web::extract::{AppJson, AppPath};
use crate::web::protocol::{
    CreateObservationRequest, DeleteAllResponse, DeleteMoleResponse, DeleteObservationResponse,
    DeletedCountsBody, HealthResponse, MoleBody, MoleHistoryResponse, MoleObservationsResponse,
    MoleWithLatestBody, MoleWithObservationsBody, MolesWithObservationsResponse, ObservationBody,
    ObservationResponse,
};
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tracing::instrument;
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_moles_handler,
        list_moles_with_observations_handler,
        get_mole_handler,
        get_history_handler,
        list_observations_handler,
        get_observation_handler,
        create_observation_handler,
        delete_all_handler,
        delete_mole_handler,
        delete_observation_handler,
        health_handler,
    ),
    components(
        schemas(
            CreateObservationRequest,
            ObservationBody,
            MoleBody,
            MoleWithLatestBody,
            MoleWithObservationsBody,
            MolesWithObservationsResponse,
            MoleHistoryResponse,
            MoleObservationsResponse,
            ObservationResponse,
            DeleteMoleResponse,
            DeleteObservationResponse,
            DeletedCountsBody,
            DeleteAllResponse,
            HealthResponse,
            ErrorBody,
        )
    ),
    tags(
        (name = "Moles", description = "Track moles and their dated observations.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Read Handlers
//=========================================================================================

/// List every mole with its latest observation.
#[utoipa::path(
    get,
    path = "/api/moles",
    tag = "Moles",
    responses(
        (status = 200, description = "All moles", body = [MoleWithLatestBody]),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
#[instrument(skip(state))]
pub async fn list_moles_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MoleWithLatestBody>>, ApiError> {
    let moles = state.store.list_moles().await?;
    Ok(Json(moles.into_iter().map(Into::into).collect()))
}

/// List every mole with all of its observations nested.
#[utoipa::path(
    get,
    path = "/api/moles/all",
    tag = "Moles",
    responses(
        (status = 200, description = "All moles with observations", body = MolesWithObservationsResponse),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
#[instrument(skip(state))]
pub async fn list_moles_with_observations_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MolesWithObservationsResponse>, ApiError> {
    let moles = state.store.list_moles_with_history().await?;
    Ok(Json(moles.into()))
}

/// Fetch one mole with its latest observation.
#[utoipa::path(
    get,
    path = "/api/moles/{moleId}",
    tag = "Moles",
    params(("moleId" = String, Path, description = "The mole identifier.")),
    responses(
        (status = 200, description = "The mole", body = MoleWithLatestBody),
        (status = 404, description = "Mole not found (NOT_FOUND)", body = ErrorBody)
    )
)]
#[instrument(skip(state))]
pub async fn get_mole_handler(
    State(state): State<Arc<AppState>>,
    AppPath(mole_id): AppPath<String>,
) -> Result<Json<MoleWithLatestBody>, ApiError> {
    let mole = state.store.get_mole(&mole_id).await?;
    Ok(Json(mole.into()))
}

/// Fetch a mole and its full observation history.
#[utoipa::path(
    get,
    path = "/api/moles/{moleId}/history",
    tag = "Moles",
    params(("moleId" = String, Path, description = "The mole identifier.")),
    responses(
        (status = 200, description = "Mole and observations", body = MoleHistoryResponse),
        (status = 404, description = "Mole not found (NOT_FOUND)", body = ErrorBody)
    )
)]
#[instrument(skip(state))]
pub async fn get_history_handler(
    State(state): State<Arc<AppState>>,
    AppPath(mole_id): AppPath<String>,
) -> Result<Json<MoleHistoryResponse>, ApiError> {
    let history = state.store.get_history(&mole_id).await?;
    Ok(Json(history.into()))
}

/// List a mole's observations without the mole record.
#[utoipa::path(
    get,
    path = "/api/moles/{moleId}/observations",
    tag = "Moles",
    params(("moleId" = String, Path, description = "The mole identifier.")),
    responses(
        (status = 200, description = "Observations of the mole", body = MoleObservationsResponse),
        (status = 404, description = "Mole not found (NOT_FOUND)", body = ErrorBody)
    )
)]
#[instrument(skip(state))]
pub async fn list_observations_handler(
    State(state): State<Arc<AppState>>,
    AppPath(mole_id): AppPath<String>,
) -> Result<Json<MoleObservationsResponse>, ApiError> {
    let history = state.store.get_history(&mole_id).await?;
    Ok(Json(history.into()))
}

/// Fetch one observation of a mole.
#[utoipa::path(
    get,
    path = "/api/moles/{moleId}/observations/{observationId}",
    tag = "Moles",
    params(
        ("moleId" = String, Path, description = "The mole identifier."),
        ("observationId" = Uuid, Path, description = "The observation identifier.")
    ),
    responses(
        (status = 200, description = "The observation", body = ObservationResponse),
        (status = 400, description = "Malformed observation id (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Mole or observation not found (NOT_FOUND)", body = ErrorBody)
    )
)]
#[instrument(skip(state))]
pub async fn get_observation_handler(
    State(state): State<Arc<AppState>>,
    AppPath((mole_id, observation_id)): AppPath<(String, Uuid)>,
) -> Result<Json<ObservationResponse>, ApiError> {
    let scoped = state.store.get_observation(&mole_id, observation_id).await?;
    Ok(Json(scoped.into()))
}

//=========================================================================================
// Write Handlers
//=========================================================================================

/// Create a new mole, or add an observation to an existing one when `moleId` is supplied.
#[utoipa::path(
    post,
    path = "/api/moles",
    tag = "Moles",
    request_body = CreateObservationRequest,
    responses(
        (status = 201, description = "Observation created", body = ObservationResponse),
        (status = 400, description = "Missing or invalid fields (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Supplied moleId does not exist (NOT_FOUND)", body = ErrorBody)
    )
)]
#[instrument(skip(state, request))]
pub async fn create_observation_handler(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<CreateObservationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = request.into_domain()?;
    let created = state.store.create_observation(payload).await?;
    Ok((StatusCode::CREATED, Json(ObservationResponse::from(created))))
}

/// Delete every mole and every observation.
#[utoipa::path(
    delete,
    path = "/api/moles",
    tag = "Moles",
    responses(
        (status = 200, description = "Counts of deleted records", body = DeleteAllResponse),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
#[instrument(skip(state))]
pub async fn delete_all_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DeleteAllResponse>, ApiError> {
    let counts = state.store.delete_all().await?;
    Ok(Json(counts.into()))
}

/// Delete a mole together with all of its observations.
#[utoipa::path(
    delete,
    path = "/api/moles/{moleId}",
    tag = "Moles",
    params(("moleId" = String, Path, description = "The mole identifier.")),
    responses(
        (status = 200, description = "Mole deleted", body = DeleteMoleResponse),
        (status = 404, description = "Mole not found (NOT_FOUND)", body = ErrorBody)
    )
)]
#[instrument(skip(state))]
pub async fn delete_mole_handler(
    State(state): State<Arc<AppState>>,
    AppPath(mole_id): AppPath<String>,
) -> Result<Json<DeleteMoleResponse>, ApiError> {
    let deleted = state.store.delete_mole(&mole_id).await?;
    Ok(Json(deleted.into()))
}

/// Delete one observation of a mole.
#[utoipa::path(
    delete,
    path = "/api/moles/{moleId}/observations/{observationId}",
    tag = "Moles",
    params(
        ("moleId" = String, Path, description = "The mole identifier."),
        ("observationId" = Uuid, Path, description = "The observation identifier.")
    ),
    responses(
        (status = 200, description = "Observation deleted", body = DeleteObservationResponse),
        (status = 400, description = "Malformed observation id (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Mole or observation not found (NOT_FOUND)", body = ErrorBody)
    )
)]
#[instrument(skip(state))]
pub async fn delete_observation_handler(
    State(state): State<Arc<AppState>>,
    AppPath((mole_id, observation_id)): AppPath<(String, Uuid)>,
) -> Result<Json<DeleteObservationResponse>, ApiError> {
    let deleted = state
        .store
        .delete_observation(&mole_id, observation_id)
        .await?;
    Ok(Json(deleted.into()))
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
