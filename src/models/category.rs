use serde::Serialize;
use sqlx::FromRow;

/// A label attached to a spot, as exposed in spot payloads.
#[derive(Serialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct CategoryRef {
    pub category: String,
    pub spot_id: i64,
}
