use crate::domain::model::Coordinates;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Byte-level persistence used for the document database snapshot.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub upload_preset: Option<String>,
    pub folder: String,
}

/// Third-party image host. Returns the host's JSON result, which always
/// carries a `secure_url`.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, upload: ImageUpload) -> Result<serde_json::Value>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub distance_km: f64,
    pub geometry: Vec<Coordinates>,
}

/// Driving directions and forward geocoding.
#[async_trait]
pub trait RoutingService: Send + Sync {
    /// `Ok(None)` when the service answers but has no route.
    async fn directions(&self, from: Coordinates, to: Coordinates) -> Result<Option<Route>>;

    /// First match for a free-form address, if any.
    async fn geocode(&self, query: &str) -> Result<Option<Coordinates>>;
}
