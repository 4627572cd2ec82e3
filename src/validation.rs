//! Input rules for spot writes.
//!
//! Each check trims and normalizes what it accepts, so the service only ever
//! persists cleaned values.

use thiserror::Error;

use crate::models::spot::{NewSpot, SpotChanges};

const NAME_MAX_LEN: usize = 255;
const ADDRESS_MAX_LEN: usize = 500;
const CATEGORY_MAX_LEN: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

fn required_text(field: &str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError(format!("The {field} field is required.")));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError(format!(
            "The {field} field must not be greater than {max} characters."
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim labels, drop duplicates (first occurrence wins), and require at least one.
pub fn categories(labels: Vec<String>) -> Result<Vec<String>, ValidationError> {
    let mut cleaned: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        let label = required_text("category", &label, CATEGORY_MAX_LEN)?;
        if !cleaned.contains(&label) {
            cleaned.push(label);
        }
    }
    if cleaned.is_empty() {
        return Err(ValidationError("The category field is required.".into()));
    }
    Ok(cleaned)
}

pub fn new_spot(input: NewSpot) -> Result<NewSpot, ValidationError> {
    let name = required_text("name", &input.name, NAME_MAX_LEN)?;
    let address = required_text("address", &input.address, ADDRESS_MAX_LEN)?;
    let categories = categories(input.categories)?;
    input
        .picture
        .check()
        .map_err(|err| ValidationError(format!("The picture field is invalid: {err}.")))?;
    Ok(NewSpot {
        name,
        address,
        categories,
        picture: input.picture,
    })
}

pub fn spot_changes(input: SpotChanges) -> Result<SpotChanges, ValidationError> {
    let name = input
        .name
        .map(|n| required_text("name", &n, NAME_MAX_LEN))
        .transpose()?;
    let address = input
        .address
        .map(|a| required_text("address", &a, ADDRESS_MAX_LEN))
        .transpose()?;
    let categories = input.categories.map(categories).transpose()?;
    if let Some(picture) = &input.picture {
        picture
            .check()
            .map_err(|err| ValidationError(format!("The picture field is invalid: {err}.")))?;
    }
    Ok(SpotChanges {
        name,
        address,
        categories,
        picture: input.picture,
    })
}
