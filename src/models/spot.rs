//! Represents a reviewable location ("spot") owned by a user.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::{category::CategoryRef, user::UserRef};
use crate::services::picture_store::PictureUpload;

/// A spot row as stored in SQLite.
#[derive(Clone, FromRow, Debug)]
pub struct Spot {
    pub id: i64,

    /// Owning user.
    pub user_id: i64,

    pub name: String,

    pub address: String,

    /// Relative path inside the public disk (e.g. `spots/<uuid>.jpg`).
    pub picture: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// A spot joined with its owner's name and review aggregates.
#[derive(FromRow, Debug)]
pub struct SpotSummaryRow {
    #[sqlx(flatten)]
    pub spot: Spot,
    pub user_name: String,
    pub reviews_count: i64,
    pub reviews_sum_rating: Option<i64>,
}

/// Public representation of a spot.
///
/// `reviews_count` and `reviews_sum_rating` are computed at read time from
/// the `reviews` table and never stored.
#[derive(Serialize, Clone, Debug)]
pub struct SpotDetail {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub picture: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reviews_count: i64,
    pub reviews_sum_rating: Option<i64>,
    pub user: UserRef,
    pub categories: Vec<CategoryRef>,
}

impl SpotDetail {
    pub fn from_row(row: SpotSummaryRow, categories: Vec<CategoryRef>) -> Self {
        let SpotSummaryRow {
            spot,
            user_name,
            reviews_count,
            reviews_sum_rating,
        } = row;
        Self {
            id: spot.id,
            name: spot.name,
            address: spot.address,
            picture: spot.picture,
            user_id: spot.user_id,
            created_at: spot.created_at,
            updated_at: spot.updated_at,
            reviews_count,
            reviews_sum_rating,
            user: UserRef {
                id: spot.user_id,
                name: user_name,
            },
            categories,
        }
    }
}

/// Input for creating a spot.
#[derive(Debug)]
pub struct NewSpot {
    pub name: String,
    pub address: String,
    pub categories: Vec<String>,
    pub picture: PictureUpload,
}

/// Input for updating a spot. Absent fields are left unchanged.
#[derive(Debug, Default)]
pub struct SpotChanges {
    pub name: Option<String>,
    pub address: Option<String>,
    pub categories: Option<Vec<String>>,
    pub picture: Option<PictureUpload>,
}

impl SpotChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.address.is_none()
            && self.categories.is_none()
            && self.picture.is_none()
    }
}
