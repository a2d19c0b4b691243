//! Multipart form parsing helpers
//!
//! Collects the `file` part and any text parts of a multipart/form-data upload.

use std::collections::HashMap;

use axum::extract::Multipart;
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::validation::{validate_content_type, validate_file_size};

/// Name of the multipart part carrying the image.
pub const FILE_FIELD: &str = "file";

/// Represents a file uploaded via multipart form
#[derive(Debug, Clone)]
pub struct FileField {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

/// Parsed multipart form fields
#[derive(Debug, Default)]
pub struct MultipartFields {
    file: Option<FileField>,
    text_fields: HashMap<String, String>,
}

impl MultipartFields {
    /// Read every part, validating the file's Content-Type and size.
    pub async fn parse(multipart: &mut Multipart, max_file_size: usize) -> Result<Self, ApiError> {
        let mut fields = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to parse multipart: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == FILE_FIELD {
                let content_type = field.content_type().map(str::to_string);
                let file_name = field.file_name().map(str::to_string);
                validate_content_type(content_type.as_deref())?;

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?
                    .to_vec();
                validate_file_size(data.len(), max_file_size)?;

                fields.file = Some(FileField {
                    data,
                    content_type,
                    file_name,
                });
            } else {
                let value = field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed to read field '{name}': {e}"))
                })?;
                fields.text_fields.insert(name, value);
            }
        }

        Ok(fields)
    }

    /// The uploaded file, or 400 when missing.
    pub fn require_file(&self) -> Result<&FileField, ApiError> {
        self.file.as_ref().ok_or_else(|| {
            ApiError::bad_request("No file provided. Use 'file' field in multipart form.")
        })
    }

    /// Take ownership of the uploaded file bytes, or 400 when missing.
    pub fn take_file(&mut self) -> Result<FileField, ApiError> {
        self.file.take().ok_or_else(|| {
            ApiError::bad_request("No file provided. Use 'file' field in multipart form.")
        })
    }

    /// A text field, with surrounding whitespace removed; blank counts as absent.
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.text_fields
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// A text field parsed as JSON. Missing or blank fields are `Ok(None)`.
    pub fn get_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ApiError> {
        match self.get_text(name) {
            Some(json) => serde_json::from_str(json)
                .map(Some)
                .map_err(|e| ApiError::bad_request(format!("Invalid {name} JSON: {e}"))),
            None => Ok(None),
        }
    }
}
