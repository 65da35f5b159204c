use crate::domain::ports::{ImageHost, ImageUpload};
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;

/// Cloudinary-compatible upload API (`/v1_1/<cloud>/auto/upload`).
pub struct CloudinaryHost {
    client: Client,
    endpoint: String,
    cloud_name: String,
}

impl CloudinaryHost {
    pub fn new(endpoint: impl Into<String>, cloud_name: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            cloud_name: cloud_name.into(),
        }
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/auto/upload",
            self.endpoint.trim_end_matches('/'),
            self.cloud_name
        )
    }
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    async fn upload(&self, upload: ImageUpload) -> Result<serde_json::Value> {
        let mut part = Part::bytes(upload.bytes).file_name(upload.file_name);
        if let Some(content_type) = &upload.content_type {
            part = part.mime_str(content_type)?;
        }

        let mut form = Form::new().part("file", part).text("folder", upload.folder);
        if let Some(preset) = upload.upload_preset {
            form = form.text("upload_preset", preset);
        }

        let url = self.upload_url();
        tracing::debug!("Uploading to image host: {}", url);
        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        tracing::debug!("Image host response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream(
                "image host",
                format!("{} {}", status, body),
            ));
        }

        Ok(response.json().await?)
    }
}
