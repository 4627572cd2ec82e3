//! Route table for the spots API.
//!
//! ## Structure
//! - **Probes** (public)
//!   - `GET    /healthz`, `GET /readyz`
//! - **Spots** (bearer token required)
//!   - `GET    /spot`              - paged list, newest first (`?size=`, `?page=`)
//!   - `POST   /spot`              - create (multipart with `picture`)
//!   - `GET    /spot/{id}`         - one spot with owner, categories, review aggregates
//!   - `PUT    /spot/{id}`         - update (owner or admin)
//!   - `PATCH  /spot/{id}`         - same as PUT
//!   - `DELETE /spot/{id}`         - delete (owner or admin; others get a denial message)
//!   - `GET    /spot/{id}/reviews` - paged reviews of one spot
//! - **Pictures** (public)
//!   - `GET    /storage/{*path}`   - stored picture bytes

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        picture_handlers::get_picture,
        spot_handlers::{destroy, index, reviews, show, store, update},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::get,
};
use tower_http::trace::TraceLayer;

/// Build the router. `max_upload_bytes` caps every request body.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/spot", get(index).post(store))
        .route(
            "/spot/{id}",
            get(show).put(update).patch(update).delete(destroy),
        )
        .route("/spot/{id}/reviews", get(reviews))
        .route("/storage/{*path}", get(get_picture))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
}
