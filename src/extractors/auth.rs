use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::{
    errors::AppError,
    models::user::{AuthUser, UserRow},
};

/// Tokens are stored as the hex SHA-256 of the plaintext.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Token part of an `Authorization` value. The scheme is case-insensitive.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

/// Resolves `Authorization: Bearer <token>` to the owning user.
///
/// Add `AuthUser` as a handler parameter to require a session.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<SqlitePool>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(AppError::unauthenticated)?;

        let db = Arc::<SqlitePool>::from_ref(state);
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT u.id, u.name, u.role
             FROM api_tokens t JOIN users u ON u.id = t.user_id
             WHERE t.token_hash = ?",
        )
        .bind(hash_token(token))
        .fetch_optional(&*db)
        .await
        .map_err(|err| AppError::internal(err.to_string()))?
        .ok_or_else(AppError::unauthenticated)?;

        Ok(row.into())
    }
}
