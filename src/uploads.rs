//! Profile image uploads: filename sanitising, type checks and storage on disk.

use std::path::Path;

use actix_multipart::Multipart;
use chrono::Utc;
use futures::TryStreamExt;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

/// Multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";

const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

lazy_static! {
    static ref UNSAFE_CHARS: Regex = Regex::new(r"[^A-Za-z0-9._-]+").unwrap();
}

/// Reduces a client-supplied file name to its last path segment made of safe
/// characters only.
pub fn sanitize_file_name(original: &str) -> String {
    let base = original
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned = UNSAFE_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

pub fn has_allowed_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// `<millis>-<sanitised name>`, unique enough for a single upload directory.
pub fn stored_file_name(original: &str, timestamp_millis: i64) -> String {
    format!("{}-{}", timestamp_millis, sanitize_file_name(original))
}

/// Reads the `image` field from `payload`, checks type and size, and writes it under
/// `dir`. Returns the stored file name.
pub async fn save_image(
    mut payload: Multipart,
    dir: &Path,
    max_bytes: usize,
) -> Result<String, AppError> {
    while let Some(mut field) = payload.try_next().await? {
        let disposition = field.content_disposition();
        let is_image_field = disposition.get_name() == Some(IMAGE_FIELD);
        let original_name = disposition.get_filename().map(str::to_string);

        let original_name = match (is_image_field, original_name) {
            (true, Some(name)) => name,
            _ => {
                while field.try_next().await?.is_some() {}
                continue;
            }
        };

        if !has_allowed_extension(&original_name) {
            return Err(AppError::BadRequest(
                "Only .jpeg, .jpg and .png formats are allowed".into(),
            ));
        }
        if let Some(mime) = field.content_type() {
            if !ALLOWED_MIME_TYPES.contains(&mime.essence_str()) {
                return Err(AppError::BadRequest(
                    "Only .jpeg, .jpg and .png formats are allowed".into(),
                ));
            }
        }

        let mut data: Vec<u8> = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if data.len() + chunk.len() > max_bytes {
                return Err(AppError::BadRequest(format!(
                    "File exceeds the {} byte upload limit",
                    max_bytes
                )));
            }
            data.extend_from_slice(&chunk);
        }

        let file_name = stored_file_name(&original_name, Utc::now().timestamp_millis());
        tokio::fs::write(dir.join(&file_name), &data).await?;
        log::info!("Stored upload {} ({} bytes)", file_name, data.len());
        return Ok(file_name);
    }

    Err(AppError::BadRequest("No file uploaded".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("avatar.png"), "avatar.png");
        assert_eq!(sanitize_file_name("my photo (1).JPG"), "my_photo_1_.JPG");
        assert_eq!(sanitize_file_name("../../etc/passwd.png"), "passwd.png");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\face.jpeg"), "face.jpeg");
        assert_eq!(sanitize_file_name(".hidden.png"), "hidden.png");
        assert_eq!(sanitize_file_name("../"), "image");
    }

    #[test]
    fn test_allowed_extensions() {
        assert!(has_allowed_extension("a.png"));
        assert!(has_allowed_extension("a.JPG"));
        assert!(has_allowed_extension("a.jpeg"));
        assert!(!has_allowed_extension("a.gif"));
        assert!(!has_allowed_extension("a.png.exe"));
        assert!(!has_allowed_extension("png"));
    }

    #[test]
    fn test_stored_file_name_is_prefixed() {
        assert_eq!(stored_file_name("me.png", 1700000000000), "1700000000000-me.png");
    }
}
