#![allow(dead_code)]

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use reptile_global::{
    router, AppConfig, AppState, CloudinaryHost, HttpMailer, MapboxRouting, MemoryStorage, Ports,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "ops@reptileglobal.site";

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.admin_emails = vec![ADMIN_EMAIL.to_string()];
    config.server.public_base_url = "https://reptileglobal.site".to_string();
    config.maps.route_debounce_ms = 10;
    config
}

/// Ports with in-memory storage and HTTP adapters aimed at `upstream`.
/// The routing adapter has no token, so maps use straight-line fallbacks.
pub fn test_ports(upstream: &str) -> Ports {
    Ports {
        storage: Arc::new(MemoryStorage::new()),
        image_host: Arc::new(CloudinaryHost::new(upstream, "demo")),
        mailer: Arc::new(HttpMailer::new(
            format!("{}/api/send", upstream),
            "relay-key",
            "no-reply@reptileglobal.site",
        )),
        routing: Arc::new(MapboxRouting::new(
            "",
            format!("{}/directions", upstream),
            format!("{}/geocoding", upstream),
        )),
    }
}

pub async fn test_app(upstream: &str) -> Result<Router> {
    let config = test_config();
    let state = AppState::build(&config, test_ports(upstream)).await?;
    Ok(router(state, &config.server.cors_origins))
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

/// Sign up the configured admin and return the session token.
pub async fn admin_token(app: &Router) -> Result<String> {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({
            "name": "Ops Desk",
            "email": ADMIN_EMAIL,
            "password": "correct-horse",
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);
    Ok(body["token"].as_str().unwrap_or_default().to_string())
}

pub fn shipment_payload() -> Value {
    json!({
        "senderName": "Marcus Reed",
        "senderEmail": "marcus@example.com",
        "senderPhone": "+1 555 0100",
        "senderAddress": "12 Harbor Rd",
        "senderCity": "Miami",
        "senderState": "FL",
        "senderZip": "33101",
        "senderCountry": "USA",
        "recipientName": "Lena Vogel",
        "recipientEmail": "lena@example.de",
        "recipientAddress": "Hauptstrasse 5",
        "recipientCity": "Berlin",
        "recipientZip": "10115",
        "recipientCountry": "Germany",
        "packageType": "box",
        "weight": "2.5",
        "dimensions": { "length": "40", "width": "30", "height": "20" },
        "value": "450",
        "description": "Ball python, captive bred",
        "serviceType": "express",
        "priority": "high",
        "insurance": true,
        "signatureRequired": true,
        "shippingDate": "2026-10-20",
        "estimatedDeliveryDate": "2026-10-23",
        "shippingCost": "120",
        "latitude": 25.7617,
        "longitude": -80.1918,
        "recipientLatitude": 52.52,
        "recipientLongitude": 13.405,
    })
}
