use crate::core::auth::random_token;
use crate::core::db::Database;
use crate::domain::model::{Kyc, KycStatus, Shipment};
use crate::utils::error::{AppError, Result};
use crate::utils::validation::validate_non_empty_string;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KycLink {
    pub magic_link: String,
    #[serde(skip)]
    pub token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycDocuments {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub id_front_url: String,
    #[serde(default)]
    pub id_back_url: String,
    #[serde(default)]
    pub selfie_url: String,
}

/// A verification record together with the shipment it belongs to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KycWithShipment {
    #[serde(flatten)]
    pub kyc: Kyc,
    pub shipment: Shipment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl From<ReviewDecision> for KycStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => KycStatus::Approved,
            ReviewDecision::Rejected => KycStatus::Rejected,
        }
    }
}

/// Magic-link token: 256 random bits as 64 hex characters.
fn generate_token() -> String {
    random_token()
}

pub struct KycService {
    db: Arc<Database>,
    public_base_url: String,
}

impl KycService {
    pub fn new(db: Arc<Database>, public_base_url: impl Into<String>) -> Self {
        Self {
            db,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Issue a fresh verification link for a shipment.
    ///
    /// Calling this again for the same shipment replaces the token on the
    /// existing record; the previous link stops working.
    pub async fn generate_link(&self, shipment_id: &str) -> Result<KycLink> {
        let token = generate_token();
        let now = Utc::now();

        let tracking_number = self
            .db
            .write(|c| {
                let shipment = c
                    .shipment_by_id_mut(shipment_id)
                    .ok_or_else(|| AppError::not_found("Shipment", shipment_id))?;
                shipment.kyc_status = KycStatus::Pending;
                shipment.updated_at = now;
                let tracking_number = shipment.tracking_number.clone();

                let record = c.kyc.entry(shipment_id.to_string()).or_insert_with(|| Kyc {
                    id: uuid::Uuid::new_v4().to_string(),
                    shipment_id: shipment_id.to_string(),
                    token: String::new(),
                    id_front_url: None,
                    id_back_url: None,
                    selfie_url: None,
                    status: KycStatus::Pending,
                    created_at: now,
                    updated_at: now,
                });
                record.token = token.clone();
                record.status = KycStatus::Pending;
                record.updated_at = now;
                Ok(tracking_number)
            })
            .await?;

        tracing::info!(tracking_number = %tracking_number, "KYC link generated");
        Ok(KycLink {
            magic_link: format!("{}/kyc/{}", self.public_base_url, token),
            token,
        })
    }

    pub async fn fetch_by_token(&self, token: &str) -> Result<KycWithShipment> {
        self.db
            .read(|c| {
                let kyc = c
                    .kyc_by_token(token)
                    .ok_or_else(|| AppError::not_found("Verification link", token))?;
                let shipment = c
                    .shipment_by_id(&kyc.shipment_id)
                    .ok_or_else(|| AppError::not_found("Shipment", kyc.shipment_id.clone()))?;
                Ok(KycWithShipment {
                    kyc: kyc.clone(),
                    shipment: shipment.clone(),
                })
            })
            .await
    }

    /// Store the uploaded document URLs and mark both the record and its
    /// shipment as submitted.
    pub async fn submit(&self, documents: KycDocuments) -> Result<Kyc> {
        validate_non_empty_string("token", &documents.token)?;
        validate_non_empty_string("idFrontUrl", &documents.id_front_url)?;
        validate_non_empty_string("idBackUrl", &documents.id_back_url)?;
        validate_non_empty_string("selfieUrl", &documents.selfie_url)?;

        let now = Utc::now();
        let token = documents.token.trim();
        let (kyc, tracking_number) = self
            .db
            .write(|c| {
                let shipment_id = c
                    .kyc_by_token(token)
                    .map(|k| k.shipment_id.clone())
                    .ok_or_else(|| AppError::not_found("Verification link", token))?;

                let tracking_number = match c.shipment_by_id_mut(&shipment_id) {
                    Some(shipment) => {
                        shipment.kyc_status = KycStatus::Submitted;
                        shipment.updated_at = now;
                        shipment.tracking_number.clone()
                    }
                    None => return Err(AppError::not_found("Shipment", shipment_id)),
                };

                let kyc = c
                    .kyc
                    .get_mut(&shipment_id)
                    .ok_or_else(|| AppError::not_found("Verification link", token))?;
                kyc.id_front_url = Some(documents.id_front_url.trim().to_string());
                kyc.id_back_url = Some(documents.id_back_url.trim().to_string());
                kyc.selfie_url = Some(documents.selfie_url.trim().to_string());
                kyc.status = KycStatus::Submitted;
                kyc.updated_at = now;
                Ok((kyc.clone(), tracking_number))
            })
            .await?;

        tracing::info!(tracking_number = %tracking_number, "KYC documents submitted");
        Ok(kyc)
    }

    /// Admin decision on a submitted verification.
    pub async fn review(&self, shipment_id: &str, decision: ReviewDecision) -> Result<Kyc> {
        let status = KycStatus::from(decision);
        let now = Utc::now();
        let kyc = self
            .db
            .write(|c| {
                let kyc = c
                    .kyc
                    .get_mut(shipment_id)
                    .ok_or_else(|| AppError::not_found("Verification record", shipment_id))?;
                if kyc.status != KycStatus::Submitted {
                    return Err(AppError::validation(
                        "status",
                        format!("Cannot review a verification that is {}", kyc.status),
                    ));
                }
                kyc.status = status;
                kyc.updated_at = now;
                let kyc = kyc.clone();

                if let Some(shipment) = c.shipment_by_id_mut(shipment_id) {
                    shipment.kyc_status = status;
                    shipment.updated_at = now;
                }
                Ok(kyc)
            })
            .await?;

        tracing::info!(shipment_id = %shipment_id, status = %status, "KYC reviewed");
        Ok(kyc)
    }
}
