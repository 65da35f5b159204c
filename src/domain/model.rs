use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShipmentStatus {
    #[default]
    Pending,
    Processing,
    InTransit,
    OutForDelivery,
    Delivered,
    OnHold,
    Cancelled,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 7] = [
        ShipmentStatus::Pending,
        ShipmentStatus::Processing,
        ShipmentStatus::InTransit,
        ShipmentStatus::OutForDelivery,
        ShipmentStatus::Delivered,
        ShipmentStatus::OnHold,
        ShipmentStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::Processing => "processing",
            ShipmentStatus::InTransit => "in-transit",
            ShipmentStatus::OutForDelivery => "out-for-delivery",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::OnHold => "on-hold",
            ShipmentStatus::Cancelled => "cancelled",
        }
    }

    /// Timeline icon name used for history events.
    pub fn icon(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "clock",
            ShipmentStatus::Processing => "package",
            ShipmentStatus::InTransit => "truck",
            ShipmentStatus::OutForDelivery => "map-pin",
            ShipmentStatus::Delivered => "check-circle",
            ShipmentStatus::OnHold => "pause-circle",
            ShipmentStatus::Cancelled => "x-circle",
        }
    }

    /// Badge color shown next to the status on the tracking page.
    pub fn color(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "#eab308",
            ShipmentStatus::Processing => "#f97316",
            ShipmentStatus::InTransit => "#3b82f6",
            ShipmentStatus::OutForDelivery => "#a855f7",
            ShipmentStatus::Delivered => "#22c55e",
            ShipmentStatus::OnHold => "#d97706",
            ShipmentStatus::Cancelled => "#ef4444",
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShipmentStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown shipment status: {}", s))
    }
}

/// Identity verification state. `None` only ever appears on a shipment that
/// never had a verification link generated; KYC records start at `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    #[default]
    None,
    Pending,
    Submitted,
    Approved,
    Rejected,
}

impl KycStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::None => "none",
            KycStatus::Pending => "pending",
            KycStatus::Submitted => "submitted",
            KycStatus::Approved => "approved",
            KycStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for KycStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A WGS84 point. Serialized as `{ "lat": .., "lng": .. }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    #[serde(default)]
    pub length: String,
    #[serde(default)]
    pub width: String,
    #[serde(default)]
    pub height: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub status: ShipmentStatus,
    pub location: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub icon: String,
}

/// Shipment attributes once they have passed schema validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentFields {
    pub sender_name: String,
    pub sender_email: String,
    #[serde(default)]
    pub sender_phone: String,
    pub sender_address: String,
    #[serde(default)]
    pub sender_city: String,
    #[serde(default)]
    pub sender_state: String,
    #[serde(default)]
    pub sender_zip: String,
    pub sender_country: String,
    pub recipient_name: String,
    pub recipient_email: String,
    #[serde(default)]
    pub recipient_phone: String,
    pub recipient_address: String,
    #[serde(default)]
    pub recipient_city: String,
    #[serde(default)]
    pub recipient_state: String,
    #[serde(default)]
    pub recipient_zip: String,
    pub recipient_country: String,
    pub package_type: String,
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub dimensions: Dimensions,
    pub value: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub special_instructions: String,
    pub service_type: String,
    pub priority: String,
    #[serde(default)]
    pub insurance: bool,
    #[serde(default)]
    pub signature_required: bool,
    pub shipping_date: String,
    pub estimated_delivery_date: String,
    pub shipping_cost: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub recipient_latitude: Option<f64>,
    #[serde(default)]
    pub recipient_longitude: Option<f64>,
}

/// The same attribute set with every field optional. Used for drafts and as
/// the loose input shape that validation turns into [`ShipmentFields`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DraftFields {
    pub sender_name: Option<String>,
    pub sender_email: Option<String>,
    pub sender_phone: Option<String>,
    pub sender_address: Option<String>,
    pub sender_city: Option<String>,
    pub sender_state: Option<String>,
    pub sender_zip: Option<String>,
    pub sender_country: Option<String>,
    pub recipient_name: Option<String>,
    pub recipient_email: Option<String>,
    pub recipient_phone: Option<String>,
    pub recipient_address: Option<String>,
    pub recipient_city: Option<String>,
    pub recipient_state: Option<String>,
    pub recipient_zip: Option<String>,
    pub recipient_country: Option<String>,
    pub package_type: Option<String>,
    pub weight: Option<String>,
    pub dimensions: Option<Dimensions>,
    pub value: Option<String>,
    pub description: Option<String>,
    pub special_instructions: Option<String>,
    pub service_type: Option<String>,
    pub priority: Option<String>,
    pub insurance: Option<bool>,
    pub signature_required: Option<bool>,
    pub shipping_date: Option<String>,
    pub estimated_delivery_date: Option<String>,
    pub shipping_cost: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub recipient_latitude: Option<f64>,
    pub recipient_longitude: Option<f64>,
}

impl From<ShipmentFields> for DraftFields {
    fn from(f: ShipmentFields) -> Self {
        Self {
            sender_name: Some(f.sender_name),
            sender_email: Some(f.sender_email),
            sender_phone: Some(f.sender_phone),
            sender_address: Some(f.sender_address),
            sender_city: Some(f.sender_city),
            sender_state: Some(f.sender_state),
            sender_zip: Some(f.sender_zip),
            sender_country: Some(f.sender_country),
            recipient_name: Some(f.recipient_name),
            recipient_email: Some(f.recipient_email),
            recipient_phone: Some(f.recipient_phone),
            recipient_address: Some(f.recipient_address),
            recipient_city: Some(f.recipient_city),
            recipient_state: Some(f.recipient_state),
            recipient_zip: Some(f.recipient_zip),
            recipient_country: Some(f.recipient_country),
            package_type: Some(f.package_type),
            weight: Some(f.weight),
            dimensions: Some(f.dimensions),
            value: Some(f.value),
            description: Some(f.description),
            special_instructions: Some(f.special_instructions),
            service_type: Some(f.service_type),
            priority: Some(f.priority),
            insurance: Some(f.insurance),
            signature_required: Some(f.signature_required),
            shipping_date: Some(f.shipping_date),
            estimated_delivery_date: Some(f.estimated_delivery_date),
            shipping_cost: Some(f.shipping_cost),
            latitude: Some(f.latitude),
            longitude: Some(f.longitude),
            recipient_latitude: f.recipient_latitude,
            recipient_longitude: f.recipient_longitude,
        }
    }
}

impl DraftFields {
    /// Fill absent attributes with empty values without checking anything.
    /// Only the explicit skip-validation update path goes through here.
    pub fn into_unchecked(self) -> ShipmentFields {
        ShipmentFields {
            sender_name: self.sender_name.unwrap_or_default(),
            sender_email: self.sender_email.unwrap_or_default(),
            sender_phone: self.sender_phone.unwrap_or_default(),
            sender_address: self.sender_address.unwrap_or_default(),
            sender_city: self.sender_city.unwrap_or_default(),
            sender_state: self.sender_state.unwrap_or_default(),
            sender_zip: self.sender_zip.unwrap_or_default(),
            sender_country: self.sender_country.unwrap_or_default(),
            recipient_name: self.recipient_name.unwrap_or_default(),
            recipient_email: self.recipient_email.unwrap_or_default(),
            recipient_phone: self.recipient_phone.unwrap_or_default(),
            recipient_address: self.recipient_address.unwrap_or_default(),
            recipient_city: self.recipient_city.unwrap_or_default(),
            recipient_state: self.recipient_state.unwrap_or_default(),
            recipient_zip: self.recipient_zip.unwrap_or_default(),
            recipient_country: self.recipient_country.unwrap_or_default(),
            package_type: self.package_type.unwrap_or_default(),
            weight: self.weight.unwrap_or_default(),
            dimensions: self.dimensions.unwrap_or_default(),
            value: self.value.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            special_instructions: self.special_instructions.unwrap_or_default(),
            service_type: self.service_type.unwrap_or_default(),
            priority: self.priority.unwrap_or_default(),
            insurance: self.insurance.unwrap_or_default(),
            signature_required: self.signature_required.unwrap_or_default(),
            shipping_date: self.shipping_date.unwrap_or_default(),
            estimated_delivery_date: self.estimated_delivery_date.unwrap_or_default(),
            shipping_cost: self.shipping_cost.unwrap_or_default(),
            latitude: self.latitude.unwrap_or_default(),
            longitude: self.longitude.unwrap_or_default(),
            recipient_latitude: self.recipient_latitude,
            recipient_longitude: self.recipient_longitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub id: String,
    pub tracking_number: String,
    #[serde(flatten)]
    pub fields: ShipmentFields,
    #[serde(default)]
    pub status: ShipmentStatus,
    #[serde(default)]
    pub kyc_status: KycStatus,
    #[serde(default)]
    pub history: Vec<HistoryEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: String,
    pub tracking_number: String,
    #[serde(flatten)]
    pub fields: DraftFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kyc {
    pub id: String,
    pub shipment_id: String,
    pub token: String,
    #[serde(default)]
    pub id_front_url: Option<String>,
    #[serde(default)]
    pub id_back_url: Option<String>,
    #[serde(default)]
    pub selfie_url: Option<String>,
    pub status: KycStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// What the API exposes about a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}
