//! Reviews are written elsewhere; the spot API only reads them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::user::UserRef;

#[derive(FromRow, Debug)]
pub struct ReviewRow {
    pub id: i64,
    pub spot_id: i64,
    pub user_id: i64,
    pub rating: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user_name: String,
}

/// A single review with its author.
#[derive(Serialize, Clone, Debug)]
pub struct Review {
    pub id: i64,
    pub spot_id: i64,
    pub user_id: i64,
    pub rating: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user: UserRef,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            spot_id: row.spot_id,
            user_id: row.user_id,
            rating: row.rating,
            content: row.content,
            created_at: row.created_at,
            user: UserRef {
                id: row.user_id,
                name: row.user_name,
            },
        }
    }
}
