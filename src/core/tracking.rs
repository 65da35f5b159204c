use crate::core::map::{MapContext, MapRenderer, MapView};
use crate::domain::model::{HistoryEvent, KycStatus, Shipment, ShipmentStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const TRACKING_PREFIX: &str = "RW";

fn to_base36(mut n: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// `RW` + base36 millisecond timestamp + six base36 random characters.
///
/// Uniqueness is best effort; the unique index on the collections is what
/// actually rejects a collision.
pub fn generate_tracking_number(now: DateTime<Utc>) -> String {
    let timestamp = to_base36(now.timestamp_millis().max(0) as u128);
    let random = to_base36(uuid::Uuid::new_v4().as_u128());
    let suffix: String = random.chars().rev().take(6).collect();
    format!("{}{}{:0>6}", TRACKING_PREFIX, timestamp, suffix)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartySummary {
    pub name: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingView {
    pub tracking_number: String,
    pub status: ShipmentStatus,
    pub status_label: String,
    pub status_color: &'static str,
    pub kyc_status: KycStatus,
    pub sender: PartySummary,
    pub recipient: PartySummary,
    pub package_type: String,
    pub service_type: String,
    pub weight: String,
    pub shipping_date: String,
    pub estimated_delivery_date: String,
    pub timeline: Vec<HistoryEvent>,
    pub map: MapView,
    pub updated_at: DateTime<Utc>,
}

/// History in chronological order. Events sharing a timestamp keep their
/// insertion order.
pub fn timeline(history: &[HistoryEvent]) -> Vec<HistoryEvent> {
    let mut events = history.to_vec();
    events.sort_by_key(|e| e.timestamp);
    events
}

pub async fn tracking_view(shipment: &Shipment, renderer: &MapRenderer) -> TrackingView {
    let f = &shipment.fields;
    TrackingView {
        tracking_number: shipment.tracking_number.clone(),
        status: shipment.status,
        status_label: shipment.status.as_str().to_uppercase(),
        status_color: shipment.status.color(),
        kyc_status: shipment.kyc_status,
        sender: PartySummary {
            name: f.sender_name.clone(),
            city: f.sender_city.clone(),
            state: f.sender_state.clone(),
            country: f.sender_country.clone(),
        },
        recipient: PartySummary {
            name: f.recipient_name.clone(),
            city: f.recipient_city.clone(),
            state: f.recipient_state.clone(),
            country: f.recipient_country.clone(),
        },
        package_type: f.package_type.clone(),
        service_type: f.service_type.clone(),
        weight: f.weight.clone(),
        shipping_date: f.shipping_date.clone(),
        estimated_delivery_date: f.estimated_delivery_date.clone(),
        timeline: timeline(&shipment.history),
        map: renderer.render(shipment, MapContext::Tracking).await,
        updated_at: shipment.updated_at,
    }
}
