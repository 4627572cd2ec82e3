//! REST backend for the spots review application: users create, list,
//! update and delete reviewable locations, attach categories, upload a
//! picture, and read review aggregates.

use axum::Router;

pub mod config;
pub mod db;
pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod test_support;
pub mod validation;

/// Assemble the full application with its state attached.
pub fn app(state: state::AppState, max_upload_bytes: usize) -> Router {
    routes::routes::routes(max_upload_bytes).with_state(state)
}
