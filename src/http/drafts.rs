use super::auth::AdminSession;
use super::{ApiJson, AppState};
use crate::core::drafts::NewDraft;
use crate::utils::error::AppError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

async fn list(State(st): State<AppState>, _admin: AdminSession) -> Json<Value> {
    Json(json!({ "drafts": st.drafts.list().await }))
}

async fn create(
    State(st): State<AppState>,
    _admin: AdminSession,
    ApiJson(input): ApiJson<NewDraft>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let draft = st.drafts.create(input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "draft": draft }))))
}

async fn get_one(
    State(st): State<AppState>,
    _admin: AdminSession,
    Path(tracking_number): Path<String>,
) -> Result<Json<Value>, AppError> {
    let draft = st.drafts.get_by_tracking_number(&tracking_number).await?;
    Ok(Json(json!({ "draft": draft })))
}

async fn update(
    State(st): State<AppState>,
    _admin: AdminSession,
    Path(tracking_number): Path<String>,
    ApiJson(patch): ApiJson<Value>,
) -> Result<Json<Value>, AppError> {
    let draft = st.drafts.update(&tracking_number, patch).await?;
    Ok(Json(json!({ "success": true, "draft": draft })))
}

async fn delete(
    State(st): State<AppState>,
    _admin: AdminSession,
    Path(tracking_number): Path<String>,
) -> Result<Json<Value>, AppError> {
    st.drafts.delete(&tracking_number).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Draft {} deleted", tracking_number),
    })))
}

/// Validates the draft as a full shipment; on success the draft is gone and
/// the shipment exists, in one write.
async fn complete(
    State(st): State<AppState>,
    _admin: AdminSession,
    Path(tracking_number): Path<String>,
) -> Result<Json<Value>, AppError> {
    let shipment = st.drafts.complete(&tracking_number).await?;
    Ok(Json(json!({ "success": true, "shipment": shipment })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/drafts", get(list).post(create))
        .route("/drafts/create", post(create))
        .route(
            "/drafts/:tracking_number",
            get(get_one).put(update).delete(delete),
        )
        .route("/drafts/:tracking_number/complete", post(complete))
}
