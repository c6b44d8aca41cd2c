use base64::prelude::*;

use gbau_core::{DomainError, ProductId};

/// Content type assumed for bare base64 payloads.
pub const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

/// Decoded image ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Decode an image sent either as `data:image/<type>;base64,<data>` or as bare base64.
///
/// Data URLs must declare an `image/*` type and base64 encoding.
pub fn decode_image(payload: &str) -> Result<ImageUpload, DomainError> {
    let payload = payload.trim();
    let (content_type, data) = match payload.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest
                .split_once(',')
                .ok_or_else(|| DomainError::validation("image data URL has no payload"))?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| DomainError::validation("image data URL must be base64 encoded"))?;
            if !is_image_type(mime) {
                return Err(DomainError::validation(format!(
                    "unsupported image content type '{mime}'"
                )));
            }
            (mime.to_ascii_lowercase(), data)
        }
        None => (DEFAULT_IMAGE_TYPE.to_string(), payload),
    };

    let bytes = BASE64_STANDARD
        .decode(data)
        .map_err(|e| DomainError::validation(format!("image is not valid base64: {e}")))?;
    if bytes.is_empty() {
        return Err(DomainError::validation("image is empty"));
    }

    Ok(ImageUpload {
        bytes,
        content_type,
    })
}

fn is_image_type(mime: &str) -> bool {
    match mime.split_once('/') {
        Some((kind, subtype)) => {
            kind.eq_ignore_ascii_case("image")
                && !subtype.is_empty()
                && subtype
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Storage key for a variant image: `<unix-millis>_<product id>`.
pub fn image_key(unix_millis: i64, product_id: ProductId) -> String {
    let id = product_id.to_string().to_lowercase().replace(' ', "_");
    format!("{unix_millis}_{id}")
}
