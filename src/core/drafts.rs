use crate::core::db::Database;
use crate::core::shipments::{build_shipment, insert_shipment};
use crate::core::tracking::generate_tracking_number;
use crate::domain::model::{Draft, DraftFields, Shipment, ShipmentStatus};
use crate::utils::error::{AppError, Result};
use crate::utils::json::merge;
use crate::utils::validation::validate_shipment;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDraft {
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(flatten)]
    pub fields: DraftFields,
}

/// Staging area for shipments that are still being filled in. Nothing here
/// is schema-checked until [`DraftService::complete`].
pub struct DraftService {
    db: Arc<Database>,
}

impl DraftService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: NewDraft) -> Result<Draft> {
        let now = Utc::now();
        let tracking_number = input
            .tracking_number
            .map(|tn| tn.trim().to_string())
            .filter(|tn| !tn.is_empty())
            .unwrap_or_else(|| generate_tracking_number(now));

        let draft = Draft {
            id: uuid::Uuid::new_v4().to_string(),
            tracking_number: tracking_number.clone(),
            fields: input.fields,
            created_at: now,
            updated_at: now,
        };

        let created = draft.clone();
        self.db
            .write(move |c| {
                if c.drafts.contains_key(&draft.tracking_number) {
                    return Err(AppError::conflict(format!(
                        "Draft with tracking number {} already exists",
                        draft.tracking_number
                    )));
                }
                c.drafts.insert(draft.tracking_number.clone(), draft);
                Ok(())
            })
            .await?;

        tracing::info!(tracking_number = %tracking_number, "Draft created");
        Ok(created)
    }

    pub async fn list(&self) -> Vec<Draft> {
        let mut drafts: Vec<Draft> = self.db.read(|c| c.drafts.values().cloned().collect()).await;
        drafts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        drafts
    }

    pub async fn get_by_tracking_number(&self, tracking_number: &str) -> Result<Draft> {
        self.db
            .read(|c| c.drafts.get(tracking_number).cloned())
            .await
            .ok_or_else(|| AppError::not_found("Draft", tracking_number))
    }

    /// Merge `patch` into the draft. Shape errors are still rejected.
    pub async fn update(&self, tracking_number: &str, patch: Value) -> Result<Draft> {
        let Value::Object(mut patch_map) = patch else {
            return Err(AppError::validation("body", "Expected a JSON object"));
        };
        if let Some(tn) = patch_map.remove("trackingNumber") {
            if tn.as_str() != Some(tracking_number) {
                return Err(AppError::validation(
                    "trackingNumber",
                    "Tracking number cannot be changed",
                ));
            }
        }
        for immutable in ["id", "createdAt", "updatedAt"] {
            patch_map.remove(immutable);
        }

        let now = Utc::now();
        let updated = self
            .db
            .write(|c| {
                let draft = c
                    .drafts
                    .get_mut(tracking_number)
                    .ok_or_else(|| AppError::not_found("Draft", tracking_number))?;

                let mut doc = serde_json::to_value(&draft.fields)?;
                merge(&mut doc, &Value::Object(patch_map));
                draft.fields = serde_json::from_value(doc)
                    .map_err(|e| AppError::validation("body", e.to_string()))?;
                draft.updated_at = now;
                Ok(draft.clone())
            })
            .await?;

        tracing::info!(tracking_number = %tracking_number, "Draft updated");
        Ok(updated)
    }

    pub async fn delete(&self, tracking_number: &str) -> Result<()> {
        self.db
            .write(|c| {
                c.drafts
                    .remove(tracking_number)
                    .map(|_| ())
                    .ok_or_else(|| AppError::not_found("Draft", tracking_number))
            })
            .await?;
        tracing::info!(tracking_number = %tracking_number, "Draft deleted");
        Ok(())
    }

    /// Promote the draft to a shipment.
    ///
    /// Validation, shipment insert and draft removal happen in one
    /// database write; on any failure the draft is left as it was.
    pub async fn complete(&self, tracking_number: &str) -> Result<Shipment> {
        let now = Utc::now();
        let shipment = self
            .db
            .write(|c| {
                let draft = c
                    .drafts
                    .get(tracking_number)
                    .ok_or_else(|| AppError::not_found("Draft", tracking_number))?;
                let fields = validate_shipment(&draft.fields)?;

                let shipment = build_shipment(
                    draft.tracking_number.clone(),
                    fields,
                    ShipmentStatus::Pending,
                    None,
                    now,
                );
                insert_shipment(c, shipment.clone())?;
                c.drafts.remove(tracking_number);
                Ok(shipment)
            })
            .await;

        match &shipment {
            Ok(_) => tracing::info!(tracking_number = %tracking_number, "Draft promoted to shipment"),
            Err(e) => tracing::warn!(tracking_number = %tracking_number, "Draft completion failed: {}", e),
        }
        shipment
    }
}
