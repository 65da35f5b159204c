//! HTTP surface: routers, extractors and the JSON error boundary.

pub mod auth;
pub mod drafts;
pub mod kyc;
pub mod public;
pub mod shipments;
pub mod tracking;

use crate::config::AppConfig;
use crate::core::auth::{AuthService, AuthSettings};
use crate::core::contact::ContactService;
use crate::core::db::Database;
use crate::core::drafts::DraftService;
use crate::core::kyc::KycService;
use crate::core::map::{MapRenderer, RouteDebouncer};
use crate::core::shipments::ShipmentService;
use crate::core::upload::UploadService;
use crate::domain::ports::{ImageHost, Mailer, RoutingService, Storage};
use crate::utils::error::{AppError, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::{async_trait, Json, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// External collaborators the services are wired to.
#[derive(Clone)]
pub struct Ports {
    pub storage: Arc<dyn Storage>,
    pub image_host: Arc<dyn ImageHost>,
    pub mailer: Arc<dyn Mailer>,
    pub routing: Arc<dyn RoutingService>,
}

#[derive(Clone)]
pub struct AppState {
    pub shipments: Arc<ShipmentService>,
    pub drafts: Arc<DraftService>,
    pub kyc: Arc<KycService>,
    pub auth: Arc<AuthService>,
    pub uploads: Arc<UploadService>,
    pub contact: Arc<ContactService>,
    pub maps: Arc<MapRenderer>,
    pub debouncer: Arc<RouteDebouncer>,
    pub public_base_url: Arc<str>,
}

impl AppState {
    pub async fn build(config: &AppConfig, ports: Ports) -> Result<Self> {
        let db = Arc::new(Database::open(ports.storage, config.storage.snapshot_file.clone()).await?);

        let auth = AuthService::new(
            db.clone(),
            AuthSettings {
                admin_emails: config.auth.admin_emails.clone(),
                session_ttl: chrono::Duration::hours(config.auth.session_ttl_hours as i64),
                min_password_length: config.auth.min_password_length as usize,
            },
        );
        let maps = MapRenderer::new(
            ports.routing,
            config.maps.edit_fit_padding,
            config.maps.route_fit_padding,
        )
        .with_default_center(config.maps.default_center);

        Ok(Self {
            shipments: Arc::new(ShipmentService::new(db.clone())),
            drafts: Arc::new(DraftService::new(db.clone())),
            kyc: Arc::new(KycService::new(db, config.server.public_base_url.clone())),
            auth: Arc::new(auth),
            uploads: Arc::new(UploadService::new(
                ports.image_host,
                config.upload.folder.clone(),
                config.upload.upload_preset.clone(),
                config.upload.max_bytes as usize,
            )),
            contact: Arc::new(ContactService::new(ports.mailer, config.mail.inbox.clone())),
            maps: Arc::new(maps),
            debouncer: Arc::new(RouteDebouncer::new(Duration::from_millis(
                config.maps.route_debounce_ms,
            ))),
            public_base_url: Arc::from(config.server.public_base_url.trim_end_matches('/')),
        })
    }
}

/// `Json<T>` whose rejection goes through [`AppError`], so malformed bodies
/// get the same `{ "error": .. }` shape as everything else.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(AppError::validation("body", rejection.body_text())),
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(Duration::from_secs(60 * 60));

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(allowed)
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(auth::routes())
        .merge(shipments::routes())
        .merge(drafts::routes())
        .merge(kyc::routes())
        .merge(tracking::routes())
        .merge(public::routes(state.uploads.max_bytes()))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
