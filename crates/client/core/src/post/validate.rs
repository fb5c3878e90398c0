//! Limits checked before anything is uploaded.
use std::fmt;

use super::format::ImageUpload;

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_TEXT_LENGTH: usize = 50_000;
pub const MAX_IMAGES_PER_POST: usize = 5;
pub const MAX_IMAGE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const MAX_TOTAL_UPLOAD_BYTES: u64 = 40 * 1024 * 1024;
pub const SUPPORTED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Every rule a draft breaks, in checking order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    pub errors: Vec<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.errors.join(". "))
    }
}

impl std::error::Error for ValidationError {}

fn megabytes(bytes: u64) -> u64 {
    bytes / (1024 * 1024)
}

/// Check a draft post. Lengths are counted in characters.
pub fn validate_post(title: &str, text: &str, images: &[ImageUpload]) -> Result<(), ValidationError> {
    let mut errors = Vec::new();

    if title.trim().is_empty() {
        errors.push("Title is required".to_string());
    } else if title.chars().count() > MAX_TITLE_LENGTH {
        errors.push(format!("Title must be {} characters or less", MAX_TITLE_LENGTH));
    }

    if text.trim().is_empty() && images.is_empty() {
        errors.push("Post must contain text or at least one image".to_string());
    }
    if text.chars().count() > MAX_TEXT_LENGTH {
        errors.push(format!("Text must be {} characters or less", MAX_TEXT_LENGTH));
    }

    if images.len() > MAX_IMAGES_PER_POST {
        errors.push(format!("Maximum {} images per post", MAX_IMAGES_PER_POST));
    }

    let mut total: u64 = 0;
    for image in images {
        if image.size() > MAX_IMAGE_SIZE_BYTES {
            errors.push(format!(
                "Image \"{}\" exceeds {}MB limit",
                image.file_name,
                megabytes(MAX_IMAGE_SIZE_BYTES)
            ));
        }
        if !SUPPORTED_IMAGE_TYPES.contains(&image.mime_type.as_str()) {
            errors.push(format!(
                "Image \"{}\" has unsupported type \"{}\". Supported: {}",
                image.file_name,
                image.mime_type,
                SUPPORTED_IMAGE_TYPES.join(", ")
            ));
        }
        total += image.size();
    }
    if total > MAX_TOTAL_UPLOAD_BYTES {
        errors.push(format!(
            "Total image size exceeds {}MB limit",
            megabytes(MAX_TOTAL_UPLOAD_BYTES)
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { errors })
    }
}
