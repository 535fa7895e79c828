use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
};
use serde_json::{Value, json};

use crate::complaints::MAX_FILE_SIZE;
use crate::middleware::{require_admin, require_auth};
use crate::state::AppState;
use crate::{auth, complaints, scans};

/// Room for the text fields and multipart framing on top of a full-size
/// attachment. Oversized files are still reported as a field error as long
/// as the whole request fits under this.
pub const MAX_REQUEST_BODY: usize = MAX_FILE_SIZE * 3;

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login));

    let user = Router::new()
        .route(
            "/api/complaints/submit-complaint",
            post(complaints::submit_complaint),
        )
        .route("/api/complaints/my-complaints", get(complaints::my_complaints))
        .route("/api/complaints/{id}", get(complaints::get_complaint));

    let admin = Router::new()
        .route("/api/complaints", get(complaints::list_complaints))
        .route(
            "/api/complaints/update-status/{id}",
            patch(complaints::update_status),
        )
        .route("/api/scans/all", get(scans::list_scans))
        .route("/api/scans/summary", get(scans::summary))
        .route_layer(from_fn(require_admin));

    let protected = user
        .merge(admin)
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    public
        .merge(protected)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
