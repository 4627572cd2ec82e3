//! HTTP handlers for `/spot`. Every response uses the `{ message, data }`
//! envelope; business rules live in `SpotService`.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::{
    errors::AppError,
    extractors::spot_form::SpotForm,
    models::{
        page::{ApiResponse, Page, PageQuery},
        review::Review,
        spot::SpotDetail,
        user::AuthUser,
    },
    services::spot_service::{DeleteOutcome, SpotService},
};

fn spot_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::not_found("spot not found"))
}

fn page_query(query: Result<Query<PageQuery>, QueryRejection>) -> Result<PageQuery, AppError> {
    query
        .map(|Query(q)| q)
        .map_err(|e| AppError::validation(e.body_text()))
}

/// GET `/spot`: newest spots first, `?size=` (default 10) and `?page=`.
pub async fn index(
    State(spots): State<SpotService>,
    _user: AuthUser,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Page<SpotDetail>>>, AppError> {
    let page = spots.list(page_query(query)?).await?;
    Ok(Json(ApiResponse::with_data("Spots retrieved", page)))
}

/// POST `/spot`: multipart create. The body carries no entity; the new
/// resource is announced through `Location`.
pub async fn store(
    State(spots): State<SpotService>,
    user: AuthUser,
    form: SpotForm,
) -> Result<impl IntoResponse, AppError> {
    let id = spots.create(form.into_new_spot()?, &user).await?;
    Ok((
        StatusCode::OK,
        [(header::LOCATION, format!("/spot/{id}"))],
        Json(ApiResponse::message("Spot created")),
    ))
}

/// GET `/spot/{id}`
pub async fn show(
    State(spots): State<SpotService>,
    _user: AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<SpotDetail>>, AppError> {
    let spot = spots.show(spot_id(path)?).await?;
    Ok(Json(ApiResponse::with_data("Spot retrieved", spot)))
}

/// PUT/PATCH `/spot/{id}`: owner or admin only.
pub async fn update(
    State(spots): State<SpotService>,
    user: AuthUser,
    path: Result<Path<i64>, PathRejection>,
    form: SpotForm,
) -> Result<Json<ApiResponse<()>>, AppError> {
    spots
        .update(spot_id(path)?, form.into_changes(), &user)
        .await?;
    Ok(Json(ApiResponse::message("Spot updated")))
}

/// DELETE `/spot/{id}`: a refused delete is still a 200 with a denial message.
pub async fn destroy(
    State(spots): State<SpotService>,
    user: AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let message = match spots.destroy(spot_id(path)?, &user).await? {
        DeleteOutcome::Deleted => "Spot deleted",
        DeleteOutcome::Denied => "Spot could not be deleted",
    };
    Ok(Json(ApiResponse::message(message)))
}

/// GET `/spot/{id}/reviews`
pub async fn reviews(
    State(spots): State<SpotService>,
    _user: AuthUser,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Page<Review>>>, AppError> {
    let page = spots.reviews(spot_id(path)?, page_query(query)?).await?;
    Ok(Json(ApiResponse::with_data("Reviews retrieved", page)))
}
