//! Serves stored pictures from the public disk.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use tokio_util::io::ReaderStream;

use crate::{errors::AppError, services::picture_store::PictureStore};

/// GET `/storage/{*path}`: stream a stored picture.
pub async fn get_picture(
    State(pictures): State<PictureStore>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let (file, len) = pictures.open(&path).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let content_type = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .to_string();

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    Ok(response)
}
