use super::auth::AdminSession;
use super::{ApiJson, AppState};
use crate::core::label::{label_file_name, render_label};
use crate::core::map::{MapContext, MapView};
use crate::core::shipments::{Analytics, NewShipment};
use crate::domain::model::Coordinates;
use crate::utils::error::AppError;
use crate::utils::validation::validate_range;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateParams {
    #[serde(default)]
    skip_validation: bool,
}

#[derive(Debug, Deserialize)]
struct LocationRequest {
    lat: f64,
    lng: f64,
    #[serde(default)]
    confirmed: bool,
}

async fn create(
    State(st): State<AppState>,
    _admin: AdminSession,
    ApiJson(input): ApiJson<NewShipment>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let shipment = st.shipments.create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "shipment": shipment })),
    ))
}

async fn list(State(st): State<AppState>, _admin: AdminSession) -> Json<Value> {
    let shipments = st.shipments.list().await;
    Json(json!({ "shipments": shipments }))
}

async fn analytics(State(st): State<AppState>, _admin: AdminSession) -> Json<Analytics> {
    Json(st.shipments.analytics().await)
}

async fn get_one(
    State(st): State<AppState>,
    Path(tracking_number): Path<String>,
) -> Result<Json<Value>, AppError> {
    let shipment = st.shipments.get_by_tracking_number(&tracking_number).await?;
    Ok(Json(json!({ "shipment": shipment })))
}

async fn update(
    State(st): State<AppState>,
    _admin: AdminSession,
    Path(tracking_number): Path<String>,
    Query(params): Query<UpdateParams>,
    ApiJson(patch): ApiJson<Value>,
) -> Result<Json<Value>, AppError> {
    let shipment = st
        .shipments
        .update_by_tracking_number(&tracking_number, patch, params.skip_validation)
        .await?;
    Ok(Json(json!({ "success": true, "shipment": shipment })))
}

/// Admin edit map for one shipment; the current marker is draggable.
async fn edit_map(
    State(st): State<AppState>,
    _admin: AdminSession,
    Path(tracking_number): Path<String>,
) -> Result<Json<MapView>, AppError> {
    let shipment = st.shipments.get_by_tracking_number(&tracking_number).await?;
    Ok(Json(st.maps.render(&shipment, MapContext::Edit).await))
}

/// Drag/click on the edit map.
///
/// Without `confirmed` this only previews the move and nothing is stored.
/// Rapid previews for the same shipment are debounced: only the last one
/// inside the window fetches the remaining route. With `confirmed: true`
/// the position is committed.
async fn relocate(
    State(st): State<AppState>,
    _admin: AdminSession,
    Path(tracking_number): Path<String>,
    ApiJson(request): ApiJson<LocationRequest>,
) -> Result<Json<Value>, AppError> {
    validate_range("lat", request.lat, -90.0, 90.0)?;
    validate_range("lng", request.lng, -180.0, 180.0)?;

    let position = Coordinates::new(request.lat, request.lng);
    if request.confirmed {
        let shipment = st
            .shipments
            .relocate(&tracking_number, position.into())
            .await?;
        return Ok(Json(json!({ "success": true, "shipment": shipment })));
    }

    let shipment = st.shipments.get_by_tracking_number(&tracking_number).await?;
    let settled = st.debouncer.settle(&tracking_number).await;
    let preview = st
        .maps
        .preview_relocation(&shipment, position, settled)
        .await;
    Ok(Json(json!({ "confirmed": false, "preview": preview })))
}

async fn label(
    State(st): State<AppState>,
    Path(tracking_number): Path<String>,
) -> Result<Response, AppError> {
    let shipment = st.shipments.get_by_tracking_number(&tracking_number).await?;
    let svg = render_label(&shipment, &st.public_base_url)?;
    let disposition = format!(
        "inline; filename=\"{}\"",
        label_file_name(&shipment.tracking_number)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "image/svg+xml".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        svg,
    )
        .into_response())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/shipments", get(list))
        .route("/shipments/create", post(create))
        .route("/shipments/analytics", get(analytics))
        .route("/shipments/:tracking_number", get(get_one).put(update))
        .route("/shipments/:tracking_number/map", get(edit_map))
        .route("/shipments/:tracking_number/location", post(relocate))
        .route("/shipments/:tracking_number/label", get(label))
}
