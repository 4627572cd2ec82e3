use axum::extract::FromRef;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::services::{picture_store::PictureStore, spot_service::SpotService};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqlitePool>,
    pub spots: SpotService,
    pub pictures: PictureStore,
}

impl AppState {
    pub fn new(db: Arc<SqlitePool>, pictures: PictureStore) -> Self {
        Self {
            spots: SpotService::new(db.clone(), pictures.clone()),
            db,
            pictures,
        }
    }
}

impl FromRef<AppState> for SpotService {
    fn from_ref(state: &AppState) -> Self {
        state.spots.clone()
    }
}

impl FromRef<AppState> for PictureStore {
    fn from_ref(state: &AppState) -> Self {
        state.pictures.clone()
    }
}

impl FromRef<AppState> for Arc<SqlitePool> {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
