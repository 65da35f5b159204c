use super::AppState;
use crate::core::map::{MapContext, MapView};
use crate::core::tracking::{tracking_view, TrackingView};
use crate::utils::error::AppError;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

async fn track(
    State(st): State<AppState>,
    Path(tracking_number): Path<String>,
) -> Result<Json<TrackingView>, AppError> {
    let shipment = st.shipments.get_by_tracking_number(&tracking_number).await?;
    Ok(Json(tracking_view(&shipment, &st.maps).await))
}

async fn track_map(
    State(st): State<AppState>,
    Path(tracking_number): Path<String>,
) -> Result<Json<MapView>, AppError> {
    let shipment = st.shipments.get_by_tracking_number(&tracking_number).await?;
    Ok(Json(st.maps.render(&shipment, MapContext::Tracking).await))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/track/:tracking_number", get(track))
        .route("/track/:tracking_number/map", get(track_map))
}
