//! HTTP handler modules for kiez-api.

pub mod auth;
pub mod images;
pub mod items;
pub mod jobs;
pub mod messages;
pub mod owners;
pub mod requests;
pub mod storage;
pub mod wizard;

use axum::extract::Multipart;

use kiez_core::NewImage;

use crate::ApiError;

/// Pull the uploaded files out of a multipart body, preserving the other
/// fields as (name, text) pairs. Per-file validation happens later in
/// `ImageSelection`, which reports limits instead of failing the request.
pub async fn read_multipart(
    mut multipart: Multipart,
) -> Result<(Vec<(String, String)>, Vec<NewImage>), ApiError> {
    let mut fields = Vec::new();
    let mut images = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name() {
            Some(filename) => {
                let filename = filename.to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
                images.push(NewImage {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {}", e)))?;
                fields.push((name, value));
            }
        }
    }

    Ok((fields, images))
}

/// Look up a text field by name.
pub fn field<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}
