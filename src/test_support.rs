//! Fixture helpers for tests and local seeding.
//!
//! Users, tokens and reviews are owned by other parts of the system; these
//! helpers write the minimum rows the spot API reads.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    extractors::auth::hash_token,
    models::user::{AuthUser, Role},
};

pub async fn seed_user(
    db: &SqlitePool,
    name: &str,
    email: &str,
    role: Role,
) -> Result<AuthUser, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO users (name, email, role, created_at) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(name)
    .bind(email)
    .bind(role.as_str())
    .bind(Utc::now())
    .fetch_one(db)
    .await?;

    Ok(AuthUser {
        id,
        name: name.to_string(),
        role,
    })
}

/// Register `token` as a bearer token for `user_id`.
pub async fn issue_token(db: &SqlitePool, user_id: i64, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO api_tokens (user_id, token_hash, created_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(hash_token(token))
        .bind(Utc::now())
        .execute(db)
        .await?;
    Ok(())
}

pub async fn seed_review(
    db: &SqlitePool,
    spot_id: i64,
    user_id: i64,
    rating: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO reviews (spot_id, user_id, rating, content, created_at)
         VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(spot_id)
    .bind(user_id)
    .bind(rating)
    .bind(format!("rated {rating}"))
    .bind(Utc::now())
    .fetch_one(db)
    .await
}
