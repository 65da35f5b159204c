use super::{ApiJson, AppState};
use crate::core::contact::ContactRequest;
use crate::core::upload::UploadedFile;
use crate::utils::error::AppError;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

/// Room for multipart boundaries and the text fields next to the file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

fn multipart_error(err: MultipartError) -> AppError {
    AppError::validation("file", err.body_text())
}

/// Multipart form with a `file` part and an optional `upload_preset`.
async fn upload(
    State(st): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let mut file = None;
    let mut preset = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "upload_preset" => {
                preset = Some(field.text().await.map_err(multipart_error)?);
            }
            other => tracing::debug!(field = other, "Ignoring multipart field"),
        }
    }

    Ok(Json(st.uploads.upload(file, preset).await?))
}

async fn contact(
    State(st): State<AppState>,
    ApiJson(request): ApiJson<ContactRequest>,
) -> Result<Json<Value>, AppError> {
    st.contact.submit(request).await?;
    Ok(Json(json!({ "message": "Email sent successfully" })))
}

pub fn routes(max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::max(max_bytes + MULTIPART_OVERHEAD)),
        )
        .route("/contact", post(contact))
}
