mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{send, test_app, test_config, test_ports};
use httpmock::prelude::*;
use reptile_global::domain::model::Coordinates;
use reptile_global::domain::ports::{RoutingService, Storage};
use reptile_global::{router, AppState, LocalStorage, MapboxRouting};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "reptile-boundary";

fn multipart_body(file_bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"upload_preset\"\r\n\r\nkyc_docs\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"front.jpg\"\r\n\
             Content-Type: image/jpeg\r\n\r\n",
            b = BOUNDARY
        )
        .as_bytes(),
    );
    body.extend_from_slice(file_bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(body: Vec<u8>) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))?)
}

#[tokio::test]
async fn test_upload_forwards_to_image_host() -> Result<()> {
    let server = MockServer::start_async().await;
    let upload_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1_1/demo/auto/upload")
                .body_contains("kyc_docs")
                .body_contains("kyc_verifications");
            then.status(200).json_body(json!({
                "secure_url": "https://res.cloudinary.com/demo/image/upload/front.jpg",
                "public_id": "kyc_verifications/front",
            }));
        })
        .await;

    let app = test_app(&server.base_url()).await?;
    let response = app.oneshot(upload_request(multipart_body(b"fake-jpeg-bytes"))?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body: serde_json::Value = serde_json::from_slice(&bytes)?;
    assert_eq!(
        body["secure_url"],
        "https://res.cloudinary.com/demo/image/upload/front.jpg"
    );

    upload_mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_upload_without_file_is_rejected() -> Result<()> {
    let server = MockServer::start_async().await;
    let app = test_app(&server.base_url()).await?;

    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"upload_preset\"\r\n\r\nkyc_docs\r\n--{b}--\r\n",
        b = BOUNDARY
    );
    let response = app.oneshot(upload_request(body.into_bytes())?).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body: serde_json::Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["error"], "file: No file provided");

    Ok(())
}

#[tokio::test]
async fn test_upload_host_failure_is_bad_gateway() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1_1/demo/auto/upload");
            then.status(401).body("Invalid upload preset");
        })
        .await;

    let app = test_app(&server.base_url()).await?;
    let response = app.oneshot(upload_request(multipart_body(b"bytes"))?).await?;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    Ok(())
}

#[tokio::test]
async fn test_contact_sends_inbox_and_acknowledgment() -> Result<()> {
    let server = MockServer::start_async().await;
    let inbox_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/send")
                .header("authorization", "Bearer relay-key")
                .body_contains("New Contact Form Submission: Shipping a boa")
                .body_contains("\"reply_to\":\"jo@example.com\"");
            then.status(200).json_body(json!({ "id": "msg-1" }));
        })
        .await;
    let ack_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/send")
                .body_contains("We received your inquiry: Shipping a boa")
                .body_contains("\"to\":\"jo@example.com\"");
            then.status(200).json_body(json!({ "id": "msg-2" }));
        })
        .await;

    let app = test_app(&server.base_url()).await?;
    let (status, body) = send(
        &app,
        Method::POST,
        "/contact",
        None,
        Some(json!({
            "firstName": "Jo",
            "lastName": "Keeper",
            "email": "jo@example.com",
            "subject": "Shipping a boa",
            "message": "Can you ship a 2m boa to Lisbon?\nIt is calm.",
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Email sent successfully");

    inbox_mock.assert_async().await;
    ack_mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_contact_relay_failure() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/send");
            then.status(500);
        })
        .await;

    let app = test_app(&server.base_url()).await?;
    let request = json!({
        "firstName": "Jo",
        "lastName": "Keeper",
        "email": "jo@example.com",
        "subject": "Hello",
        "message": "Hi",
    });
    let (status, body) = send(&app, Method::POST, "/contact", None, Some(request.clone())).await?;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Failed to send email");

    let mut invalid = request;
    invalid["email"] = json!("not-an-email");
    let (status, _) = send(&app, Method::POST, "/contact", None, Some(invalid)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn test_mapbox_directions_and_geocoding() -> Result<()> {
    let server = MockServer::start_async().await;
    let directions_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/directions/v5/mapbox/driving/-80.1918,25.7617;13.405,52.52")
                .query_param("access_token", "pk.test")
                .query_param("geometries", "geojson");
            then.status(200).json_body(json!({
                "routes": [{
                    "distance": 8125400.0,
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [[-80.1918, 25.7617], [-40.0, 40.0], [13.405, 52.52]]
                    }
                }]
            }));
        })
        .await;
    let geocode_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path_contains("/geocoding/v5/mapbox.places/")
                .query_param("access_token", "pk.test");
            then.status(200).json_body(json!({
                "features": [{ "center": [13.405, 52.52] }]
            }));
        })
        .await;

    let routing = MapboxRouting::new(
        "pk.test",
        server.url("/directions/v5/mapbox/driving"),
        server.url("/geocoding/v5/mapbox.places"),
    );

    let route = routing
        .directions(Coordinates::new(25.7617, -80.1918), Coordinates::new(52.52, 13.405))
        .await?
        .expect("a route");
    assert!((route.distance_km - 8125.4).abs() < 1e-9);
    assert_eq!(route.geometry.len(), 3);
    assert_eq!(route.geometry[1], Coordinates::new(40.0, -40.0));

    let point = routing.geocode("Hauptstrasse 5, Berlin").await?;
    assert_eq!(point, Some(Coordinates::new(52.52, 13.405)));

    directions_mock.assert_async().await;
    geocode_mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_data_survives_restart_with_local_storage() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let data_dir = temp_dir.path().to_string_lossy().to_string();
    let config = test_config();

    let first_boot = {
        let mut ports = test_ports("http://127.0.0.1:9");
        ports.storage = Arc::new(LocalStorage::new(data_dir.clone()));
        router(AppState::build(&config, ports).await?, &[])
    };
    let token = common::admin_token(&first_boot).await?;
    let mut payload = common::shipment_payload();
    payload["trackingNumber"] = json!("RWPERSIST0001");
    let (status, _) = send(&first_boot, Method::POST, "/shipments/create", Some(&token), Some(payload)).await?;
    assert_eq!(status, StatusCode::CREATED);

    let snapshot = LocalStorage::new(data_dir.clone())
        .read_file(&config.storage.snapshot_file)
        .await?;
    assert!(!snapshot.is_empty());

    let mut ports = test_ports("http://127.0.0.1:9");
    ports.storage = Arc::new(LocalStorage::new(data_dir));
    let second_boot = router(AppState::build(&config, ports).await?, &[]);

    let (status, body) = send(&second_boot, Method::GET, "/shipments/RWPERSIST0001", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["shipment"]["senderCity"], "Miami");

    // the session persisted too
    let (status, _) = send(&second_boot, Method::GET, "/shipments", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}
