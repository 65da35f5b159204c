use crate::core::db::{Collections, Database};
use crate::core::map::LocationChanged;
use crate::core::tracking::generate_tracking_number;
use crate::domain::model::{
    DraftFields, HistoryEvent, KycStatus, Shipment, ShipmentFields, ShipmentStatus,
};
use crate::utils::error::{AppError, Result};
use crate::utils::json::merge;
use crate::utils::validation::validate_shipment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Payload accepted by shipment create.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShipment {
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(flatten)]
    pub fields: DraftFields,
    #[serde(default)]
    pub status: Option<ShipmentStatus>,
    #[serde(default)]
    pub history: Option<Vec<HistoryEvent>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_shipments: usize,
    pub pending_shipments: usize,
    pub in_transit_shipments: usize,
    pub delivered_shipments: usize,
    pub cancelled_shipments: usize,
    pub by_status: BTreeMap<&'static str, usize>,
}

fn location_label(fields: &ShipmentFields) -> String {
    let place: Vec<&str> = [fields.sender_city.as_str(), fields.sender_country.as_str()]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect();
    if place.is_empty() {
        coordinates_label(fields)
    } else {
        place.join(", ")
    }
}

fn coordinates_label(fields: &ShipmentFields) -> String {
    format!("{:.4}, {:.4}", fields.latitude, fields.longitude)
}

pub fn status_event(
    status: ShipmentStatus,
    location: String,
    description: String,
    timestamp: DateTime<Utc>,
) -> HistoryEvent {
    HistoryEvent {
        status,
        location,
        description,
        timestamp,
        icon: status.icon().to_string(),
    }
}

/// Assemble a fresh shipment record. Seeds the history with a creation event
/// when none is supplied.
pub(crate) fn build_shipment(
    tracking_number: String,
    fields: ShipmentFields,
    status: ShipmentStatus,
    history: Option<Vec<HistoryEvent>>,
    now: DateTime<Utc>,
) -> Shipment {
    let history = match history {
        Some(events) if !events.is_empty() => events,
        _ => vec![status_event(
            status,
            location_label(&fields),
            "Shipment created".to_string(),
            now,
        )],
    };

    Shipment {
        id: uuid::Uuid::new_v4().to_string(),
        tracking_number,
        fields,
        status,
        kyc_status: KycStatus::None,
        history,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn insert_shipment(collections: &mut Collections, shipment: Shipment) -> Result<()> {
    if collections.shipments.contains_key(&shipment.tracking_number) {
        return Err(AppError::conflict(format!(
            "Shipment with tracking number {} already exists",
            shipment.tracking_number
        )));
    }
    collections
        .shipments
        .insert(shipment.tracking_number.clone(), shipment);
    Ok(())
}

fn field_value<T: serde::de::DeserializeOwned + Default>(doc: &Value, key: &str) -> Result<T> {
    match doc.get(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|e| AppError::validation(key, e.to_string())),
    }
}

/// Merge `patch` over `stored` and re-check the result.
fn apply_patch(
    stored: &Shipment,
    patch: &Value,
    skip_validation: bool,
    now: DateTime<Utc>,
) -> Result<Shipment> {
    let Value::Object(patch_map) = patch else {
        return Err(AppError::validation("body", "Expected a JSON object"));
    };

    let mut patch_map = patch_map.clone();
    if let Some(tn) = patch_map.get("trackingNumber") {
        if tn.as_str() != Some(stored.tracking_number.as_str()) {
            return Err(AppError::validation(
                "trackingNumber",
                "Tracking number cannot be changed",
            ));
        }
    }
    for immutable in ["id", "createdAt", "updatedAt"] {
        patch_map.remove(immutable);
    }

    let mut doc = serde_json::to_value(stored)?;
    merge(&mut doc, &Value::Object(patch_map));

    let status: ShipmentStatus = field_value(&doc, "status")?;
    let kyc_status: KycStatus = field_value(&doc, "kycStatus")?;
    let mut history: Vec<HistoryEvent> = field_value(&doc, "history")?;
    let loose: DraftFields =
        serde_json::from_value(doc).map_err(|e| AppError::validation("body", e.to_string()))?;

    let fields = if skip_validation {
        loose.into_unchecked()
    } else {
        validate_shipment(&loose)?
    };

    if !history.starts_with(&stored.history) {
        return Err(AppError::validation(
            "history",
            "History is append-only; existing events cannot be changed",
        ));
    }
    if status != stored.status && history.len() == stored.history.len() {
        history.push(status_event(
            status,
            coordinates_label(&fields),
            format!("Status changed to {}", status),
            now,
        ));
    }

    Ok(Shipment {
        id: stored.id.clone(),
        tracking_number: stored.tracking_number.clone(),
        fields,
        status,
        kyc_status,
        history,
        created_at: stored.created_at,
        updated_at: now,
    })
}

pub struct ShipmentService {
    db: Arc<Database>,
}

impl ShipmentService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: NewShipment) -> Result<Shipment> {
        let now = Utc::now();
        let tracking_number = input
            .tracking_number
            .map(|tn| tn.trim().to_string())
            .filter(|tn| !tn.is_empty())
            .unwrap_or_else(|| generate_tracking_number(now));

        let fields = validate_shipment(&input.fields)?;
        let shipment = build_shipment(
            tracking_number,
            fields,
            input.status.unwrap_or_default(),
            input.history,
            now,
        );

        let created = shipment.clone();
        self.db
            .write(move |c| insert_shipment(c, shipment))
            .await?;

        tracing::info!(
            tracking_number = %created.tracking_number,
            status = %created.status,
            "Shipment created"
        );
        Ok(created)
    }

    pub async fn get_by_tracking_number(&self, tracking_number: &str) -> Result<Shipment> {
        self.db
            .read(|c| c.shipments.get(tracking_number).cloned())
            .await
            .ok_or_else(|| AppError::not_found("Shipment", tracking_number))
    }

    /// Full-document merge update. Last writer wins.
    pub async fn update_by_tracking_number(
        &self,
        tracking_number: &str,
        patch: Value,
        skip_validation: bool,
    ) -> Result<Shipment> {
        let now = Utc::now();
        let updated = self
            .db
            .write(|c| {
                let stored = c
                    .shipments
                    .get(tracking_number)
                    .ok_or_else(|| AppError::not_found("Shipment", tracking_number))?;
                let updated = apply_patch(stored, &patch, skip_validation, now)?;
                c.shipments
                    .insert(tracking_number.to_string(), updated.clone());
                Ok(updated)
            })
            .await?;

        tracing::info!(
            tracking_number = %tracking_number,
            status = %updated.status,
            skip_validation,
            "Shipment updated"
        );
        Ok(updated)
    }

    /// Commit a confirmed location change from the map editor.
    pub async fn relocate(
        &self,
        tracking_number: &str,
        change: LocationChanged,
    ) -> Result<Shipment> {
        let patch = serde_json::json!({ "latitude": change.lat, "longitude": change.lng });
        self.update_by_tracking_number(tracking_number, patch, false)
            .await
    }

    /// All shipments, newest first.
    pub async fn list(&self) -> Vec<Shipment> {
        let mut shipments: Vec<Shipment> =
            self.db.read(|c| c.shipments.values().cloned().collect()).await;
        shipments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        shipments
    }

    pub async fn count_by_status(&self, status: ShipmentStatus) -> usize {
        self.db
            .read(|c| c.shipments.values().filter(|s| s.status == status).count())
            .await
    }

    pub async fn analytics(&self) -> Analytics {
        let (total, by_status) = self
            .db
            .read(|c| {
                let mut by_status: BTreeMap<&'static str, usize> = ShipmentStatus::ALL
                    .iter()
                    .map(|s| (s.as_str(), 0))
                    .collect();
                for shipment in c.shipments.values() {
                    *by_status.entry(shipment.status.as_str()).or_default() += 1;
                }
                (c.shipments.len(), by_status)
            })
            .await;

        let count = |s: ShipmentStatus| by_status.get(s.as_str()).copied().unwrap_or(0);
        Analytics {
            total_shipments: total,
            pending_shipments: count(ShipmentStatus::Pending),
            in_transit_shipments: count(ShipmentStatus::InTransit),
            delivered_shipments: count(ShipmentStatus::Delivered),
            cancelled_shipments: count(ShipmentStatus::Cancelled),
            by_status,
        }
    }
}
