pub mod extract;
pub mod protocol;
pub mod rest;
pub mod state;

use axum::{routing::get, Router};
use std::sync::Arc;

pub use rest::{
    create_observation_handler, delete_all_handler, delete_mole_handler,
    delete_observation_handler, get_history_handler, get_mole_handler, get_observation_handler,
    health_handler, list_moles_handler, list_moles_with_observations_handler,
    list_observations_handler,
};
use state::AppState;

/// Builds the API router. Cross-cutting layers (CORS, Swagger UI) are added by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    let moles = Router::new()
        .route(
            "/",
            get(list_moles_handler)
                .post(create_observation_handler)
                .delete(delete_all_handler),
        )
        .route("/all", get(list_moles_with_observations_handler))
        .route("/{moleId}", get(get_mole_handler).delete(delete_mole_handler))
        .route("/{moleId}/history", get(get_history_handler))
        .route("/{moleId}/observations", get(list_observations_handler))
        .route(
            "/{moleId}/observations/{observationId}",
            get(get_observation_handler).delete(delete_observation_handler),
        );

    Router::new()
        .nest("/api/moles", moles)
        .route("/health", get(health_handler))
        .with_state(app_state)
}
