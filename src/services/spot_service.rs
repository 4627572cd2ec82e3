//! src/services/spot_service.rs
//!
//! SpotService: list/create/show/update/delete for spots, backed by SQLite
//! for rows and `PictureStore` for the uploaded picture. Row writes of each
//! operation share one transaction; picture files are compensated by hand
//! because the disk is not part of that transaction.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    models::{
        category::CategoryRef,
        page::{Page, PageQuery},
        review::{Review, ReviewRow},
        spot::{NewSpot, Spot, SpotChanges, SpotDetail, SpotSummaryRow},
        user::{AuthUser, can_modify},
    },
    services::picture_store::{PictureError, PictureStore, SPOTS_NAMESPACE},
    validation::{self, ValidationError},
};

#[derive(Debug, Error)]
pub enum SpotError {
    #[error("spot `{0}` not found")]
    NotFound(i64),
    #[error("you are not allowed to modify this spot")]
    Forbidden,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Picture(#[from] PictureError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<ValidationError> for SpotError {
    fn from(err: ValidationError) -> Self {
        SpotError::Validation(err.0)
    }
}

pub type SpotResult<T> = Result<T, SpotError>;

/// Result of a delete request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Caller is neither the owner nor an admin; nothing was touched.
    Denied,
}

const SPOT_SUMMARY_SELECT: &str = "\
    SELECT s.id, s.user_id, s.name, s.address, s.picture, s.created_at, s.updated_at, \
           u.name AS user_name, \
           (SELECT COUNT(*) FROM reviews r WHERE r.spot_id = s.id) AS reviews_count, \
           (SELECT SUM(r.rating) FROM reviews r WHERE r.spot_id = s.id) AS reviews_sum_rating \
    FROM spots s JOIN users u ON u.id = s.user_id";

#[derive(Clone)]
pub struct SpotService {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,

    /// Where spot pictures live.
    pub pictures: PictureStore,
}

impl SpotService {
    pub fn new(db: Arc<SqlitePool>, pictures: PictureStore) -> Self {
        Self { db, pictures }
    }

    /// Fetch the bare spot row.
    async fn fetch_spot(&self, id: i64) -> SpotResult<Spot> {
        sqlx::query_as::<_, Spot>(
            "SELECT id, user_id, name, address, picture, created_at, updated_at
             FROM spots WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(SpotError::NotFound(id))
    }

    /// Load categories for every spot in `ids`, grouped by spot id.
    async fn load_categories(&self, ids: &[i64]) -> SpotResult<HashMap<i64, Vec<CategoryRef>>> {
        let mut grouped: HashMap<i64, Vec<CategoryRef>> = HashMap::new();
        if ids.is_empty() {
            return Ok(grouped);
        }

        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT category, spot_id FROM categories WHERE spot_id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id ASC");

        let rows: Vec<CategoryRef> = builder.build_query_as().fetch_all(&*self.db).await?;
        for row in rows {
            grouped.entry(row.spot_id).or_default().push(row);
        }
        Ok(grouped)
    }

    /// Newest spots first, each with owner, categories and review aggregates.
    pub async fn list(&self, query: PageQuery) -> SpotResult<Page<SpotDetail>> {
        let (page, per_page) = query.normalize();
        let offset = i64::from(page - 1) * i64::from(per_page);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM spots")
            .fetch_one(&*self.db)
            .await?;

        let rows = sqlx::query_as::<_, SpotSummaryRow>(&format!(
            "{SPOT_SUMMARY_SELECT} ORDER BY s.created_at DESC, s.id DESC LIMIT ? OFFSET ?"
        ))
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(&*self.db)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.spot.id).collect();
        let mut categories = self.load_categories(&ids).await?;
        let spots = rows
            .into_iter()
            .map(|row| {
                let cats = categories.remove(&row.spot.id).unwrap_or_default();
                SpotDetail::from_row(row, cats)
            })
            .collect();

        Ok(Page::new(spots, page, per_page, total))
    }

    /// One spot with owner, categories and review aggregates.
    pub async fn show(&self, id: i64) -> SpotResult<SpotDetail> {
        let row = sqlx::query_as::<_, SpotSummaryRow>(&format!(
            "{SPOT_SUMMARY_SELECT} WHERE s.id = ?"
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(SpotError::NotFound(id))?;

        let mut categories = self.load_categories(&[id]).await?;
        let cats = categories.remove(&id).unwrap_or_default();
        Ok(SpotDetail::from_row(row, cats))
    }

    /// Store the picture, then insert the spot and its categories in one
    /// transaction. Returns the new spot id.
    ///
    /// If the insert fails the freshly written picture is removed again.
    pub async fn create(&self, input: NewSpot, user: &AuthUser) -> SpotResult<i64> {
        let input = validation::new_spot(input)?;
        let picture = self.pictures.put(SPOTS_NAMESPACE, &input.picture).await?;

        match self.insert_spot(&input, &picture, user.id).await {
            Ok(id) => {
                info!(spot_id = id, user_id = user.id, "spot created");
                Ok(id)
            }
            Err(err) => {
                self.pictures.discard(&picture).await;
                Err(err.into())
            }
        }
    }

    async fn insert_spot(
        &self,
        input: &NewSpot,
        picture: &str,
        owner_id: i64,
    ) -> Result<i64, sqlx::Error> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO spots (user_id, name, address, picture, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(owner_id)
        .bind(&input.name)
        .bind(&input.address)
        .bind(picture)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        insert_categories(&mut tx, id, &input.categories, now).await?;
        tx.commit().await?;
        Ok(id)
    }

    /// Apply `changes` to a spot owned by `user` (or any spot, for admins).
    ///
    /// Scalar fields and categories are independent: each is written only
    /// when present. Categories are replaced wholesale inside the same
    /// transaction as the scalar update.
    pub async fn update(&self, id: i64, changes: SpotChanges, user: &AuthUser) -> SpotResult<()> {
        let spot = self.fetch_spot(id).await?;
        if !can_modify(user, spot.user_id) {
            info!(spot_id = id, user_id = user.id, "spot update denied");
            return Err(SpotError::Forbidden);
        }

        let changes = validation::spot_changes(changes)?;
        if changes.is_empty() {
            debug!(spot_id = id, "empty update, nothing to do");
            return Ok(());
        }

        let new_picture = match &changes.picture {
            Some(upload) => Some(self.pictures.put(SPOTS_NAMESPACE, upload).await?),
            None => None,
        };

        if let Err(err) = self.write_changes(id, &changes, new_picture.as_deref()).await {
            if let Some(path) = &new_picture {
                self.pictures.discard(path).await;
            }
            return Err(err.into());
        }

        if new_picture.is_some() {
            self.pictures.discard(&spot.picture).await;
        }
        info!(spot_id = id, user_id = user.id, "spot updated");
        Ok(())
    }

    async fn write_changes(
        &self,
        id: i64,
        changes: &SpotChanges,
        picture: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        sqlx::query(
            "UPDATE spots
             SET name = COALESCE(?, name),
                 address = COALESCE(?, address),
                 picture = COALESCE(?, picture),
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(changes.name.as_deref())
        .bind(changes.address.as_deref())
        .bind(picture)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(categories) = &changes.categories {
            sqlx::query("DELETE FROM categories WHERE spot_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_categories(&mut tx, id, categories, now).await?;
        }

        tx.commit().await
    }

    /// Delete a spot and its categories if `user` owns it or is an admin.
    ///
    /// A refused delete is a `DeleteOutcome::Denied`, not an error.
    pub async fn destroy(&self, id: i64, user: &AuthUser) -> SpotResult<DeleteOutcome> {
        let spot = self.fetch_spot(id).await?;
        if !can_modify(user, spot.user_id) {
            info!(spot_id = id, user_id = user.id, "spot delete denied");
            return Ok(DeleteOutcome::Denied);
        }

        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM categories WHERE spot_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM spots WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(SpotError::NotFound(id));
        }
        tx.commit().await?;

        self.pictures.discard(&spot.picture).await;
        info!(spot_id = id, user_id = user.id, "spot deleted");
        Ok(DeleteOutcome::Deleted)
    }

    /// Reviews for one spot, newest first.
    pub async fn reviews(&self, id: i64, query: PageQuery) -> SpotResult<Page<Review>> {
        self.fetch_spot(id).await?;
        let (page, per_page) = query.normalize();
        let offset = i64::from(page - 1) * i64::from(per_page);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE spot_id = ?")
            .bind(id)
            .fetch_one(&*self.db)
            .await?;

        let rows = sqlx::query_as::<_, ReviewRow>(
            "SELECT r.id, r.spot_id, r.user_id, r.rating, r.content, r.created_at,
                    u.name AS user_name
             FROM reviews r JOIN users u ON u.id = r.user_id
             WHERE r.spot_id = ?
             ORDER BY r.created_at DESC, r.id DESC
             LIMIT ? OFFSET ?",
        )
        .bind(id)
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(&*self.db)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Review::from).collect(),
            page,
            per_page,
            total,
        ))
    }
}

/// Bulk-insert one category row per label.
async fn insert_categories(
    tx: &mut Transaction<'_, Sqlite>,
    spot_id: i64,
    labels: &[String],
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    if labels.is_empty() {
        return Ok(());
    }
    let mut builder =
        QueryBuilder::<Sqlite>::new("INSERT INTO categories (spot_id, category, created_at) ");
    builder.push_values(labels, |mut row, label| {
        row.push_bind(spot_id).push_bind(label.clone()).push_bind(now);
    });
    builder.build().execute(&mut **tx).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db,
        models::user::Role,
        services::picture_store::PictureUpload,
        test_support::{seed_review, seed_user},
    };
    use bytes::Bytes;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        service: SpotService,
        owner: AuthUser,
        other: AuthUser,
        admin: AuthUser,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("spots.db").display());
        let pool = Arc::new(db::connect(&url).await.unwrap());
        db::run_migrations(&pool).await.unwrap();

        let owner = seed_user(&pool, "Ayu", "ayu@example.com", Role::User).await.unwrap();
        let other = seed_user(&pool, "Budi", "budi@example.com", Role::User).await.unwrap();
        let admin = seed_user(&pool, "Admin", "admin@example.com", Role::Admin)
            .await
            .unwrap();

        let pictures = PictureStore::new(dir.path().join("public"));
        Fixture {
            service: SpotService::new(pool, pictures),
            _dir: dir,
            owner,
            other,
            admin,
        }
    }

    fn new_spot(name: &str, categories: &[&str]) -> NewSpot {
        NewSpot {
            name: name.into(),
            address: "Jl. Pantai 1".into(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            picture: PictureUpload {
                file_name: "spot.jpg".into(),
                bytes: Bytes::from_static(b"jpeg"),
            },
        }
    }

    fn labels(detail: &SpotDetail) -> Vec<&str> {
        detail.categories.iter().map(|c| c.category.as_str()).collect()
    }

    #[tokio::test]
    async fn create_inserts_one_category_row_per_label() {
        let f = fixture().await;
        let id = f
            .service
            .create(new_spot("Kuta", &["beach", "hiking"]), &f.owner)
            .await
            .unwrap();

        let spot = f.service.show(id).await.unwrap();
        assert_eq!(spot.user_id, f.owner.id);
        assert_eq!(spot.user.name, "Ayu");
        assert_eq!(labels(&spot), vec!["beach", "hiking"]);
        assert!(spot.categories.iter().all(|c| c.spot_id == id));
        assert!(spot.picture.starts_with("spots/"));
        assert!(f.service.pictures.open(&spot.picture).await.is_ok());
    }

    #[tokio::test]
    async fn create_rejects_invalid_input_without_writing() {
        let f = fixture().await;
        let err = f
            .service
            .create(new_spot("Kuta", &[]), &f.owner)
            .await
            .unwrap_err();
        assert!(matches!(err, SpotError::Validation(_)));
        assert_eq!(f.service.list(PageQuery::default()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn aggregates_reflect_reviews() {
        let f = fixture().await;
        let reviewed = f
            .service
            .create(new_spot("Reviewed", &["beach"]), &f.owner)
            .await
            .unwrap();
        let quiet = f
            .service
            .create(new_spot("Quiet", &["museum"]), &f.owner)
            .await
            .unwrap();
        seed_review(&f.service.db, reviewed, f.other.id, 4).await.unwrap();
        seed_review(&f.service.db, reviewed, f.admin.id, 5).await.unwrap();

        let spot = f.service.show(reviewed).await.unwrap();
        assert_eq!(spot.reviews_count, 2);
        assert_eq!(spot.reviews_sum_rating, Some(9));

        let spot = f.service.show(quiet).await.unwrap();
        assert_eq!(spot.reviews_count, 0);
        assert_eq!(spot.reviews_sum_rating, None);
    }

    #[tokio::test]
    async fn list_is_newest_first_and_honours_size() {
        let f = fixture().await;
        for name in ["first", "second", "third"] {
            f.service
                .create(new_spot(name, &["beach"]), &f.owner)
                .await
                .unwrap();
        }

        let page = f
            .service
            .list(PageQuery {
                size: Some(2),
                page: None,
            })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.last_page, 2);
        let names: Vec<&str> = page.data.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["third", "second"]);
        assert_eq!(labels(&page.data[0]), vec!["beach"]);

        let page = f
            .service
            .list(PageQuery {
                size: Some(2),
                page: Some(2),
            })
            .await
            .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].name, "first");
    }

    #[tokio::test]
    async fn update_replaces_categories_entirely() {
        let f = fixture().await;
        let id = f
            .service
            .create(new_spot("Kuta", &["beach", "hiking"]), &f.owner)
            .await
            .unwrap();

        f.service
            .update(
                id,
                SpotChanges {
                    categories: Some(vec!["museum".into()]),
                    ..SpotChanges::default()
                },
                &f.owner,
            )
            .await
            .unwrap();

        let spot = f.service.show(id).await.unwrap();
        assert_eq!(labels(&spot), vec!["museum"]);
        assert_eq!(spot.name, "Kuta");
    }

    #[tokio::test]
    async fn update_without_categories_still_writes_scalars() {
        let f = fixture().await;
        let id = f
            .service
            .create(new_spot("Kuta", &["beach"]), &f.owner)
            .await
            .unwrap();

        f.service
            .update(
                id,
                SpotChanges {
                    name: Some("Kuta Beach".into()),
                    ..SpotChanges::default()
                },
                &f.owner,
            )
            .await
            .unwrap();

        let spot = f.service.show(id).await.unwrap();
        assert_eq!(spot.name, "Kuta Beach");
        assert_eq!(spot.address, "Jl. Pantai 1");
        assert_eq!(labels(&spot), vec!["beach"]);
    }

    #[tokio::test]
    async fn update_with_picture_swaps_file() {
        let f = fixture().await;
        let id = f
            .service
            .create(new_spot("Kuta", &["beach"]), &f.owner)
            .await
            .unwrap();
        let old_picture = f.service.show(id).await.unwrap().picture;

        f.service
            .update(
                id,
                SpotChanges {
                    picture: Some(PictureUpload {
                        file_name: "new.png".into(),
                        bytes: Bytes::from_static(b"png"),
                    }),
                    ..SpotChanges::default()
                },
                &f.admin,
            )
            .await
            .unwrap();

        let new_picture = f.service.show(id).await.unwrap().picture;
        assert_ne!(new_picture, old_picture);
        assert!(new_picture.ends_with(".png"));
        assert!(f.service.pictures.open(&new_picture).await.is_ok());
        assert!(matches!(
            f.service.pictures.open(&old_picture).await,
            Err(PictureError::NotFound(_))
        ));
    }

    async fn stored_pictures(f: &Fixture) -> Vec<String> {
        let dir = f.service.pictures.base_path.join(SPOTS_NAMESPACE);
        let mut names = Vec::new();
        let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
            return names;
        };
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(format!(
                "{SPOTS_NAMESPACE}/{}",
                entry.file_name().to_string_lossy()
            ));
        }
        names
    }

    async fn break_category_writes(f: &Fixture) {
        sqlx::query("DROP TABLE categories")
            .execute(&*f.service.db)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failed_create_removes_stored_picture() {
        let f = fixture().await;
        break_category_writes(&f).await;

        let err = f
            .service
            .create(new_spot("Kuta", &["beach"]), &f.owner)
            .await
            .unwrap_err();
        assert!(matches!(err, SpotError::Sqlx(_)));

        assert!(stored_pictures(&f).await.is_empty());
        let spots: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM spots")
            .fetch_one(&*f.service.db)
            .await
            .unwrap();
        assert_eq!(spots, 0);
    }

    #[tokio::test]
    async fn failed_update_removes_new_picture_and_keeps_old_one() {
        let f = fixture().await;
        let id = f
            .service
            .create(new_spot("Kuta", &["beach"]), &f.owner)
            .await
            .unwrap();
        let old_picture = f.service.show(id).await.unwrap().picture;
        break_category_writes(&f).await;

        let err = f
            .service
            .update(
                id,
                SpotChanges {
                    name: Some("Kuta Baru".into()),
                    categories: Some(vec!["museum".into()]),
                    picture: Some(PictureUpload {
                        file_name: "new.png".into(),
                        bytes: Bytes::from_static(b"png"),
                    }),
                    ..SpotChanges::default()
                },
                &f.owner,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SpotError::Sqlx(_)));

        assert_eq!(stored_pictures(&f).await, vec![old_picture.clone()]);
        let (name, picture): (String, String) =
            sqlx::query_as("SELECT name, picture FROM spots WHERE id = ?")
                .bind(id)
                .fetch_one(&*f.service.db)
                .await
                .unwrap();
        assert_eq!(name, "Kuta");
        assert_eq!(picture, old_picture);
    }

    #[tokio::test]
    async fn update_by_stranger_is_forbidden() {
        let f = fixture().await;
        let id = f
            .service
            .create(new_spot("Kuta", &["beach"]), &f.owner)
            .await
            .unwrap();

        let err = f
            .service
            .update(
                id,
                SpotChanges {
                    name: Some("Hijacked".into()),
                    ..SpotChanges::default()
                },
                &f.other,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SpotError::Forbidden));
        assert_eq!(f.service.show(id).await.unwrap().name, "Kuta");
    }

    #[tokio::test]
    async fn destroy_by_owner_removes_spot_and_categories() {
        let f = fixture().await;
        let id = f
            .service
            .create(new_spot("Kuta", &["beach", "hiking"]), &f.owner)
            .await
            .unwrap();
        let picture = f.service.show(id).await.unwrap().picture;

        let outcome = f.service.destroy(id, &f.owner).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert!(matches!(
            f.service.show(id).await,
            Err(SpotError::NotFound(_))
        ));

        let leftover: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE spot_id = ?")
            .bind(id)
            .fetch_one(&*f.service.db)
            .await
            .unwrap();
        assert_eq!(leftover, 0);
        assert!(f.service.pictures.open(&picture).await.is_err());
    }

    #[tokio::test]
    async fn destroy_by_stranger_is_denied_and_keeps_spot() {
        let f = fixture().await;
        let id = f
            .service
            .create(new_spot("Kuta", &["beach"]), &f.owner)
            .await
            .unwrap();

        let outcome = f.service.destroy(id, &f.other).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Denied);
        assert!(f.service.show(id).await.is_ok());
    }

    #[tokio::test]
    async fn destroy_by_admin_succeeds() {
        let f = fixture().await;
        let id = f
            .service
            .create(new_spot("Kuta", &["beach"]), &f.owner)
            .await
            .unwrap();

        let outcome = f.service.destroy(id, &f.admin).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
    }

    #[tokio::test]
    async fn missing_spot_is_not_found_everywhere() {
        let f = fixture().await;
        assert!(matches!(f.service.show(99).await, Err(SpotError::NotFound(99))));
        assert!(matches!(
            f.service.destroy(99, &f.admin).await,
            Err(SpotError::NotFound(99))
        ));
        assert!(matches!(
            f.service.update(99, SpotChanges::default(), &f.admin).await,
            Err(SpotError::NotFound(99))
        ));
        assert!(matches!(
            f.service.reviews(99, PageQuery::default()).await,
            Err(SpotError::NotFound(99))
        ));
    }

    #[tokio::test]
    async fn reviews_are_listed_newest_first_with_author() {
        let f = fixture().await;
        let id = f
            .service
            .create(new_spot("Kuta", &["beach"]), &f.owner)
            .await
            .unwrap();
        seed_review(&f.service.db, id, f.other.id, 3).await.unwrap();
        seed_review(&f.service.db, id, f.admin.id, 5).await.unwrap();

        let page = f.service.reviews(id, PageQuery::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.data[0].rating, 5);
        assert_eq!(page.data[0].user.name, "Admin");
        assert_eq!(page.data[1].user.name, "Budi");
    }
}
