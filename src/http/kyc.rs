use super::auth::AdminSession;
use super::{ApiJson, AppState};
use crate::core::kyc::{KycDocuments, KycWithShipment, ReviewDecision};
use crate::utils::error::AppError;
use axum::extract::{Query, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    shipment_id: String,
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewRequest {
    shipment_id: String,
    status: ReviewDecision,
}

async fn generate(
    State(st): State<AppState>,
    _admin: AdminSession,
    ApiJson(request): ApiJson<GenerateRequest>,
) -> Result<Json<Value>, AppError> {
    if request.shipment_id.trim().is_empty() {
        return Err(AppError::validation("shipmentId", "Required"));
    }
    let link = st.kyc.generate_link(&request.shipment_id).await?;
    Ok(Json(json!({ "magicLink": link.magic_link })))
}

/// Lookup for the customer's verification page. The token is the only
/// credential.
async fn fetch(
    State(st): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<KycWithShipment>, AppError> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::validation("token", "Required"))?;
    Ok(Json(st.kyc.fetch_by_token(&token).await?))
}

async fn submit(
    State(st): State<AppState>,
    ApiJson(documents): ApiJson<KycDocuments>,
) -> Result<Json<Value>, AppError> {
    let kyc = st.kyc.submit(documents).await?;
    Ok(Json(json!({ "success": true, "kyc": kyc })))
}

async fn review(
    State(st): State<AppState>,
    _admin: AdminSession,
    ApiJson(request): ApiJson<ReviewRequest>,
) -> Result<Json<Value>, AppError> {
    let kyc = st.kyc.review(&request.shipment_id, request.status).await?;
    Ok(Json(json!({ "success": true, "kyc": kyc })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/kyc/generate", post(generate))
        .route("/kyc/submit", post(submit).get(fetch))
        .route("/kyc/review", post(review))
}
