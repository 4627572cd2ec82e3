//! Request body for spot writes.
//!
//! Accepts `multipart/form-data` (the only way to send a picture) and, for
//! updates without a picture, a plain JSON body. An update with no body at
//! all is an empty change set.

use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header,
};
use serde::Deserialize;

use crate::{
    errors::AppError,
    models::spot::{NewSpot, SpotChanges},
    services::picture_store::PictureUpload,
};

/// Raw, unvalidated spot fields as submitted by the client.
#[derive(Debug, Default)]
pub struct SpotForm {
    pub name: Option<String>,
    pub address: Option<String>,
    pub categories: Option<Vec<String>>,
    pub picture: Option<PictureUpload>,
}

#[derive(Debug, Deserialize)]
struct SpotJson {
    name: Option<String>,
    address: Option<String>,
    category: Option<Vec<String>>,
}

impl From<SpotJson> for SpotForm {
    fn from(body: SpotJson) -> Self {
        Self {
            name: body.name,
            address: body.address,
            categories: body.category,
            picture: None,
        }
    }
}

/// `category`, `category[]` and `category[0]`-style keys all carry labels.
fn is_category_field(name: &str) -> bool {
    name == "category" || name.starts_with("category[")
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

fn is_json(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::trim)
        .is_some_and(|mime| mime == "application/json" || mime.ends_with("+json"))
}

async fn read_multipart(mut multipart: Multipart) -> Result<SpotForm, AppError> {
    let mut form = SpotForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::new(e.status(), format!("Multipart error: {}", e.body_text())))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "picture" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    AppError::new(e.status(), format!("Failed to read picture: {}", e.body_text()))
                })?;
                form.picture = Some(PictureUpload { file_name, bytes });
            }
            "name" | "address" => {
                let text = field.text().await.map_err(|e| {
                    AppError::new(e.status(), format!("Failed to read {name}: {}", e.body_text()))
                })?;
                if name == "name" {
                    form.name = Some(text);
                } else {
                    form.address = Some(text);
                }
            }
            other if is_category_field(other) => {
                let text = field.text().await.map_err(|e| {
                    AppError::new(e.status(), format!("Failed to read category: {}", e.body_text()))
                })?;
                form.categories.get_or_insert_with(Vec::new).push(text);
            }
            _ => {} // Ignore unknown fields.
        }
    }

    Ok(form)
}

impl<S> FromRequest<S> for SpotForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_multipart(&req) {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            read_multipart(multipart).await
        } else {
            let json = is_json(&req);
            let body = Bytes::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            // a bare update with nothing to change
            if body.iter().all(u8::is_ascii_whitespace) {
                return Ok(Self::default());
            }
            if !json {
                return Err(AppError::validation(
                    "Expected request with `Content-Type: application/json`",
                ));
            }
            let Json(body) = Json::<SpotJson>::from_bytes(&body)
                .map_err(|e| AppError::validation(e.body_text()))?;
            Ok(body.into())
        }
    }
}

impl SpotForm {
    /// Shape the form into a create request. Missing text fields become
    /// empty so validation reports them uniformly.
    pub fn into_new_spot(self) -> Result<NewSpot, AppError> {
        let picture = self
            .picture
            .ok_or_else(|| AppError::validation("The picture field is required."))?;
        Ok(NewSpot {
            name: self.name.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
            categories: self.categories.unwrap_or_default(),
            picture,
        })
    }

    pub fn into_changes(self) -> SpotChanges {
        SpotChanges {
            name: self.name,
            address: self.address,
            categories: self.categories,
            picture: self.picture,
        }
    }
}
