use crate::domain::model::Coordinates;
use crate::domain::ports::{Route, RoutingService};
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

#[derive(Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Deserialize)]
struct DirectionsRoute {
    /// Metres.
    distance: f64,
    geometry: LineGeometry,
}

#[derive(Deserialize)]
struct LineGeometry {
    /// `[lng, lat]` pairs.
    coordinates: Vec<[f64; 2]>,
}

#[derive(Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    /// `[lng, lat]`.
    center: [f64; 2],
}

/// Mapbox-compatible driving directions and forward geocoding.
pub struct MapboxRouting {
    client: Client,
    access_token: String,
    directions_endpoint: String,
    geocoding_endpoint: String,
}

impl MapboxRouting {
    pub fn new(
        access_token: impl Into<String>,
        directions_endpoint: impl Into<String>,
        geocoding_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            access_token: access_token.into(),
            directions_endpoint: directions_endpoint.into(),
            geocoding_endpoint: geocoding_endpoint.into(),
        }
    }

    fn url_with_segment(&self, service: &'static str, base: &str, segment: &str) -> Result<Url> {
        let mut url = Url::parse(base).map_err(|e| AppError::upstream(service, e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| AppError::upstream(service, format!("{} cannot be a base URL", base)))?
            .pop_if_empty()
            .push(segment);
        url.query_pairs_mut()
            .append_pair("access_token", &self.access_token);
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, service: &'static str, url: Url) -> Result<T> {
        tracing::debug!("{} request: {}{}", service, url.origin().ascii_serialization(), url.path());
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::upstream(service, format!("HTTP {}", status)));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl RoutingService for MapboxRouting {
    async fn directions(&self, from: Coordinates, to: Coordinates) -> Result<Option<Route>> {
        if self.access_token.is_empty() {
            tracing::debug!("No maps access token configured, skipping directions");
            return Ok(None);
        }

        let waypoints = format!("{},{};{},{}", from.lng, from.lat, to.lng, to.lat);
        let mut url = self.url_with_segment("directions", &self.directions_endpoint, &waypoints)?;
        url.query_pairs_mut().append_pair("geometries", "geojson");

        let body: DirectionsResponse = self.get_json("directions", url).await?;
        Ok(body.routes.into_iter().next().map(|route| Route {
            distance_km: route.distance / 1000.0,
            geometry: route
                .geometry
                .coordinates
                .into_iter()
                .map(|[lng, lat]| Coordinates::new(lat, lng))
                .collect(),
        }))
    }

    async fn geocode(&self, query: &str) -> Result<Option<Coordinates>> {
        if self.access_token.is_empty() || query.trim().is_empty() {
            return Ok(None);
        }

        let url = self.url_with_segment(
            "geocoding",
            &self.geocoding_endpoint,
            &format!("{}.json", query.trim()),
        )?;
        let body: GeocodingResponse = self.get_json("geocoding", url).await?;
        Ok(body
            .features
            .into_iter()
            .next()
            .map(|f| Coordinates::new(f.center[1], f.center[0])))
    }
}
