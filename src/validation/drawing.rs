use crate::error::{AppError, Result};
use crate::storage::asset::NewAsset;

/// The longest accepted drawing title.
const MAX_TITLE_LEN: usize = 200;

/// The most elements accepted in a single save.
const MAX_ELEMENTS: usize = 10_000;

/// Validates a drawing title.
///
/// # Arguments
///
/// * `title` - The title to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the title is valid.
pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(AppError::Validation(
            "Drawing title must not be empty".to_string(),
        ));
    }

    if title.len() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "Drawing title must be at most {MAX_TITLE_LEN} characters"
        )));
    }

    Ok(())
}

/// Validates the size of an element payload.
pub fn validate_element_count(count: usize) -> Result<()> {
    if count > MAX_ELEMENTS {
        return Err(AppError::Validation(format!(
            "A drawing can hold at most {MAX_ELEMENTS} elements"
        )));
    }

    Ok(())
}

/// Validates that an uploaded background is an image.
///
/// Accepts a declared `image/*` media type, or sniffed image content when
/// no type was declared.
pub fn validate_background(asset: &NewAsset) -> Result<()> {
    if asset.bytes.is_empty() {
        return Err(AppError::Validation(
            "Background image must not be empty".to_string(),
        ));
    }

    match asset.content_type.as_deref() {
        Some(content_type) if content_type.starts_with("image/") => Ok(()),
        Some(content_type) => Err(AppError::Validation(format!(
            "Unsupported background type: {content_type}"
        ))),
        None => {
            let sniffed_image = infer::get(&asset.bytes)
                .map(|kind| kind.matcher_type() == infer::MatcherType::Image)
                .unwrap_or(false);
            if sniffed_image {
                Ok(())
            } else {
                Err(AppError::Validation(
                    "Background must be an image".to_string(),
                ))
            }
        }
    }
}
