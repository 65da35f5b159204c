use crate::domain::ports::{ImageHost, ImageUpload};
use crate::utils::error::{AppError, Result};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

pub struct UploadService {
    host: Arc<dyn ImageHost>,
    folder: String,
    default_preset: Option<String>,
    max_bytes: usize,
}

impl UploadService {
    pub fn new(
        host: Arc<dyn ImageHost>,
        folder: impl Into<String>,
        default_preset: Option<String>,
        max_bytes: usize,
    ) -> Self {
        Self {
            host,
            folder: folder.into(),
            default_preset,
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Push one identity document to the image host and return its answer.
    pub async fn upload(&self, file: Option<UploadedFile>, preset: Option<String>) -> Result<Value> {
        let file = match file {
            Some(file) if !file.bytes.is_empty() => file,
            _ => return Err(AppError::validation("file", "No file provided")),
        };
        if file.bytes.len() > self.max_bytes {
            return Err(AppError::validation(
                "file",
                format!("File exceeds the {} byte limit", self.max_bytes),
            ));
        }

        let size = file.bytes.len();
        let result = self
            .host
            .upload(ImageUpload {
                file_name: file.file_name,
                content_type: file.content_type,
                bytes: file.bytes,
                upload_preset: preset.filter(|p| !p.is_empty()).or_else(|| self.default_preset.clone()),
                folder: self.folder.clone(),
            })
            .await?;

        if result.get("secure_url").and_then(Value::as_str).is_none() {
            return Err(AppError::upstream("image host", "Response has no secure_url"));
        }
        tracing::info!(bytes = size, folder = %self.folder, "Document uploaded");
        Ok(result)
    }
}
