//! Map view model for the tracking page and the admin location editor.
//!
//! Nothing here is persisted. The renderer turns a shipment's coordinates into
//! markers, route lines and a viewport; the editor turns drag/click input into
//! a confirmed location change.

use crate::domain::model::{Coordinates, Shipment};
use crate::domain::ports::RoutingService;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Used when a shipment has no usable current position.
pub const DEFAULT_CENTER: Coordinates = Coordinates {
    lat: 40.7128,
    lng: -74.0060,
};

/// How far (in degrees, ~1 km) the current point may sit from the full route
/// and still be snapped onto it.
pub const ROUTE_MATCH_THRESHOLD_DEG: f64 = 0.01;

/// Great-circle distance in kilometres.
///
/// `2 * R * asin(sqrt(h))` with `h` the haversine of the central angle.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // h can drift a hair above 1.0 for antipodal points
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Sum of haversine distances along a polyline.
pub fn path_length_km(points: &[Coordinates]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_km(pair[0], pair[1]))
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Origin,
    Current,
    Destination,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub kind: MarkerKind,
    pub coordinates: Coordinates,
    pub draggable: bool,
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Route,
    Covered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteLine {
    pub kind: LineKind,
    pub coordinates: Vec<Coordinates>,
    pub distance_km: f64,
    /// True when the line is a straight great-circle fallback rather than a
    /// road route from the routing service.
    pub estimated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub south_west: Coordinates,
    pub north_east: Coordinates,
}

pub fn fit_bounds(points: &[Coordinates]) -> Option<Bounds> {
    let first = points.first()?;
    let mut bounds = Bounds {
        south_west: *first,
        north_east: *first,
    };
    for p in &points[1..] {
        bounds.south_west.lat = bounds.south_west.lat.min(p.lat);
        bounds.south_west.lng = bounds.south_west.lng.min(p.lng);
        bounds.north_east.lat = bounds.north_east.lat.max(p.lat);
        bounds.north_east.lng = bounds.north_east.lng.max(p.lng);
    }
    Some(bounds)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    pub center: Coordinates,
    pub markers: Vec<Marker>,
    pub routes: Vec<RouteLine>,
    pub bounds: Option<Bounds>,
    pub padding: u32,
    pub route_distance_km: Option<f64>,
    pub covered_distance_km: Option<f64>,
}

impl MapView {
    fn new(center: Coordinates, padding: u32) -> Self {
        Self {
            center,
            markers: Vec::new(),
            routes: Vec::new(),
            bounds: None,
            padding,
            route_distance_km: None,
            covered_distance_km: None,
        }
    }

    fn push_route(&mut self, line: RouteLine) {
        match line.kind {
            LineKind::Route => self.route_distance_km = Some(line.distance_km),
            LineKind::Covered => self.covered_distance_km = Some(line.distance_km),
        }
        self.routes.push(line);
    }

    /// Fit the viewport around every marker and route vertex.
    fn fit(&mut self) {
        let points: Vec<Coordinates> = self
            .markers
            .iter()
            .map(|m| m.coordinates)
            .chain(self.routes.iter().flat_map(|r| r.coordinates.iter().copied()))
            .collect();
        self.bounds = fit_bounds(&points);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapContext {
    /// Public tracking page: nothing is draggable.
    Tracking,
    /// Admin edit view: the current-location marker can be dragged.
    Edit,
}

/// The shipment's recorded position; `(0, 0)` means "never set".
pub fn current_position(shipment: &Shipment, fallback: Coordinates) -> Coordinates {
    let f = &shipment.fields;
    if f.latitude == 0.0 && f.longitude == 0.0 {
        fallback
    } else {
        Coordinates::new(f.latitude, f.longitude)
    }
}

fn address_query(parts: &[&str]) -> Option<String> {
    let parts: Vec<&str> = parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn marker(kind: MarkerKind, coordinates: Coordinates, draggable: bool) -> Marker {
    let (label, color) = match kind {
        MarkerKind::Origin => ("Origin (Sender)", "#1E3A5F"),
        MarkerKind::Current => ("Current Location", "#3b82f6"),
        MarkerKind::Destination => ("Destination", "#10b981"),
    };
    Marker {
        kind,
        coordinates,
        draggable,
        label: label.to_string(),
        color: color.to_string(),
    }
}

pub struct MapRenderer {
    routing: Arc<dyn RoutingService>,
    edit_padding: u32,
    tracking_padding: u32,
    default_center: Coordinates,
}

impl MapRenderer {
    pub fn new(routing: Arc<dyn RoutingService>, edit_padding: u32, tracking_padding: u32) -> Self {
        Self {
            routing,
            edit_padding,
            tracking_padding,
            default_center: DEFAULT_CENTER,
        }
    }

    pub fn with_default_center(mut self, center: Coordinates) -> Self {
        self.default_center = center;
        self
    }

    pub fn current_position(&self, shipment: &Shipment) -> Coordinates {
        current_position(shipment, self.default_center)
    }

    /// Road route between two points, or a straight great-circle line when
    /// the routing service fails or has nothing.
    pub async fn route_between(&self, from: Coordinates, to: Coordinates) -> RouteLine {
        match self.routing.directions(from, to).await {
            Ok(Some(route)) if route.geometry.len() >= 2 => RouteLine {
                kind: LineKind::Route,
                coordinates: route.geometry,
                distance_km: route.distance_km,
                estimated: false,
            },
            Ok(_) => {
                tracing::debug!("No route returned, using great-circle line");
                straight_line(LineKind::Route, from, to)
            }
            Err(e) => {
                tracing::warn!("Routing failed, using great-circle line: {}", e);
                straight_line(LineKind::Route, from, to)
            }
        }
    }

    /// Distance covered from `original` to `current`.
    ///
    /// With a destination the current point is snapped onto the full
    /// original→destination route when it lies within
    /// [`ROUTE_MATCH_THRESHOLD_DEG`] of one of its vertices; the covered part
    /// is then that route's prefix.
    pub async fn covered_distance(
        &self,
        original: Coordinates,
        current: Coordinates,
        destination: Option<Coordinates>,
    ) -> RouteLine {
        let direct = match self.routing.directions(original, current).await {
            Ok(Some(route)) if route.geometry.len() >= 2 => route,
            Ok(_) => return straight_line(LineKind::Covered, original, current),
            Err(e) => {
                tracing::warn!("Covered-distance routing failed: {}", e);
                return straight_line(LineKind::Covered, original, current);
            }
        };

        let mut line = RouteLine {
            kind: LineKind::Covered,
            coordinates: direct.geometry,
            distance_km: direct.distance_km,
            estimated: false,
        };

        if let Some(destination) = destination {
            if let Ok(Some(full)) = self.routing.directions(original, destination).await {
                if let Some(prefix) = snap_to_route(&full.geometry, current) {
                    line.distance_km = path_length_km(&prefix);
                    line.coordinates = prefix;
                }
            }
        }

        line
    }

    async fn geocode(&self, query: Option<String>) -> Option<Coordinates> {
        let query = query?;
        match self.routing.geocode(&query).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Geocoding '{}' failed: {}", query, e);
                None
            }
        }
    }

    /// Sender origin; only looked up when the full sender address is known.
    async fn sender_origin(&self, shipment: &Shipment) -> Option<Coordinates> {
        let f = &shipment.fields;
        let complete = [
            &f.sender_address,
            &f.sender_city,
            &f.sender_state,
            &f.sender_country,
        ]
        .iter()
        .all(|part| !part.trim().is_empty());
        if !complete {
            return None;
        }
        self.geocode(address_query(&[
            &f.sender_address,
            &f.sender_city,
            &f.sender_state,
            &f.sender_country,
        ]))
        .await
    }

    async fn destination(&self, shipment: &Shipment) -> Option<Coordinates> {
        let f = &shipment.fields;
        match (f.recipient_latitude, f.recipient_longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => {
                self.geocode(address_query(&[
                    &f.recipient_address,
                    &f.recipient_city,
                    &f.recipient_state,
                    &f.recipient_country,
                ]))
                .await
            }
        }
    }

    pub async fn render(&self, shipment: &Shipment, context: MapContext) -> MapView {
        let current = self.current_position(shipment);
        let destination = self.destination(shipment).await;

        let mut view = match context {
            MapContext::Tracking => {
                let mut view = MapView::new(current, self.tracking_padding);
                view.markers.push(marker(MarkerKind::Current, current, false));
                if let Some(origin) = self.sender_origin(shipment).await {
                    view.markers.push(marker(MarkerKind::Origin, origin, false));
                }
                view
            }
            MapContext::Edit => {
                let mut view = MapView::new(current, self.edit_padding);
                view.markers.push(marker(MarkerKind::Current, current, true));
                view
            }
        };

        if let Some(destination) = destination {
            view.markers
                .push(marker(MarkerKind::Destination, destination, false));
            view.push_route(self.route_between(current, destination).await);
        }

        view.fit();
        view
    }

    /// Edit view after the current marker was dragged or the map clicked.
    ///
    /// `with_route` is false when a newer move superseded this one inside the
    /// debounce window, so only the cheap covered line is drawn.
    pub async fn preview_relocation(
        &self,
        shipment: &Shipment,
        moved_to: Coordinates,
        with_route: bool,
    ) -> MapView {
        let original = self.current_position(shipment);
        let destination = self.destination(shipment).await;

        let mut view = MapView::new(moved_to, self.edit_padding);
        view.markers.push(marker(MarkerKind::Current, moved_to, true));
        if let Some(destination) = destination {
            view.markers
                .push(marker(MarkerKind::Destination, destination, false));
        }

        view.push_route(
            self.covered_distance(original, moved_to, destination)
                .await,
        );
        if let (true, Some(destination)) = (with_route, destination) {
            view.push_route(self.route_between(moved_to, destination).await);
        }

        view.fit();
        view
    }
}

fn straight_line(kind: LineKind, from: Coordinates, to: Coordinates) -> RouteLine {
    RouteLine {
        kind,
        coordinates: vec![from, to],
        distance_km: haversine_km(from, to),
        estimated: true,
    }
}

/// Prefix of `route` up to the vertex closest to `point`, if that vertex is
/// within the match threshold.
fn snap_to_route(route: &[Coordinates], point: Coordinates) -> Option<Vec<Coordinates>> {
    let (index, distance) = route
        .iter()
        .enumerate()
        .map(|(i, c)| (i, ((c.lng - point.lng).powi(2) + (c.lat - point.lat).powi(2)).sqrt()))
        .min_by(|a, b| a.1.total_cmp(&b.1))?;

    (distance < ROUTE_MATCH_THRESHOLD_DEG).then(|| route[..=index].to_vec())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationChanged {
    pub lat: f64,
    pub lng: f64,
}

impl From<Coordinates> for LocationChanged {
    fn from(position: Coordinates) -> Self {
        Self {
            lat: position.lat,
            lng: position.lng,
        }
    }
}

/// State of the edit map between a drag and its confirmation.
///
/// Drags and clicks only propose a position; nothing is reported upward
/// until `confirm` is called. This models the browser side of the edit
/// map: over HTTP each proposal is a preview request and the confirmation
/// arrives as its own request with `confirmed: true`.
#[derive(Debug, Clone)]
pub struct LocationEditor {
    committed: Coordinates,
    pending: Option<Coordinates>,
}

impl LocationEditor {
    pub fn new(current: Coordinates) -> Self {
        Self {
            committed: current,
            pending: None,
        }
    }

    pub fn propose(&mut self, position: Coordinates) {
        self.pending = Some(position);
    }

    pub fn pending(&self) -> Option<Coordinates> {
        self.pending
    }

    pub fn current(&self) -> Coordinates {
        self.committed
    }

    pub fn confirm(&mut self) -> Option<LocationChanged> {
        let position = self.pending.take()?;
        self.committed = position;
        Some(position.into())
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// Per-key debounce for route fetches triggered by marker moves.
///
/// `settle` waits out the delay and reports whether the caller is still the
/// latest move for its key.
pub struct RouteDebouncer {
    delay: Duration,
    tickets: Mutex<HashMap<String, u64>>,
}

impl RouteDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            tickets: Mutex::new(HashMap::new()),
        }
    }

    pub async fn settle(&self, key: &str) -> bool {
        let ticket = {
            let mut tickets = self.tickets.lock().unwrap_or_else(|e| e.into_inner());
            let entry = tickets.entry(key.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };

        tokio::time::sleep(self.delay).await;

        let mut tickets = self.tickets.lock().unwrap_or_else(|e| e.into_inner());
        let latest = tickets.get(key) == Some(&ticket);
        if latest {
            tickets.remove(key);
        }
        latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::Route;
    use crate::utils::error::{AppError, Result};
    use async_trait::async_trait;

    struct NoRouting;

    #[async_trait]
    impl RoutingService for NoRouting {
        async fn directions(&self, _: Coordinates, _: Coordinates) -> Result<Option<Route>> {
            Err(AppError::upstream("routing", "offline"))
        }

        async fn geocode(&self, _: &str) -> Result<Option<Coordinates>> {
            Ok(None)
        }
    }

    struct FixedRouting {
        full: Vec<Coordinates>,
    }

    #[async_trait]
    impl RoutingService for FixedRouting {
        async fn directions(&self, from: Coordinates, to: Coordinates) -> Result<Option<Route>> {
            if to == *self.full.last().unwrap() {
                Ok(Some(Route {
                    distance_km: path_length_km(&self.full),
                    geometry: self.full.clone(),
                }))
            } else {
                Ok(Some(Route {
                    distance_km: 999.0,
                    geometry: vec![from, to],
                }))
            }
        }

        async fn geocode(&self, _: &str) -> Result<Option<Coordinates>> {
            Ok(None)
        }
    }

    #[test]
    fn test_haversine_identical_points_is_zero() {
        let p = Coordinates::new(25.7617, -80.1918);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn test_haversine_antipodal_is_half_circumference() {
        let d = haversine_km(Coordinates::new(0.0, 0.0), Coordinates::new(0.0, 180.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
        assert!((d - 20015.0).abs() < 1.0);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Paris to London, ~344 km
        let d = haversine_km(
            Coordinates::new(48.8566, 2.3522),
            Coordinates::new(51.5074, -0.1278),
        );
        assert!((d - 343.5).abs() < 1.5, "got {}", d);
    }

    #[test]
    fn test_fit_bounds_spans_all_points() {
        let bounds = fit_bounds(&[
            Coordinates::new(10.0, -5.0),
            Coordinates::new(-3.0, 7.0),
            Coordinates::new(4.0, 1.0),
        ])
        .unwrap();
        assert_eq!(bounds.south_west, Coordinates::new(-3.0, -5.0));
        assert_eq!(bounds.north_east, Coordinates::new(10.0, 7.0));
        assert!(fit_bounds(&[]).is_none());
    }

    #[tokio::test]
    async fn test_covered_distance_falls_back_to_haversine() {
        let renderer = MapRenderer::new(Arc::new(NoRouting), 50, 100);
        let a = Coordinates::new(0.0, 0.0);
        let b = Coordinates::new(0.0, 1.0);
        let line = renderer.covered_distance(a, b, None).await;
        assert!(line.estimated);
        assert_eq!(line.coordinates, vec![a, b]);
        assert_eq!(line.distance_km, haversine_km(a, b));
    }

    #[tokio::test]
    async fn test_covered_distance_snaps_onto_full_route() {
        let full = vec![
            Coordinates::new(0.0, 0.0),
            Coordinates::new(0.0, 0.5),
            Coordinates::new(0.0, 1.0),
            Coordinates::new(0.5, 1.0),
        ];
        let renderer = MapRenderer::new(Arc::new(FixedRouting { full: full.clone() }), 50, 100);

        let line = renderer
            .covered_distance(full[0], Coordinates::new(0.001, 1.0), Some(full[3]))
            .await;
        assert!(!line.estimated);
        assert_eq!(line.coordinates, full[..3].to_vec());
        assert!((line.distance_km - path_length_km(&full[..3])).abs() < 1e-9);

        // Far from the route: the direct answer is kept.
        let line = renderer
            .covered_distance(full[0], Coordinates::new(3.0, 3.0), Some(full[3]))
            .await;
        assert_eq!(line.distance_km, 999.0);
    }

    #[test]
    fn test_location_editor_requires_confirmation() {
        let mut editor = LocationEditor::new(Coordinates::new(1.0, 1.0));
        assert!(editor.confirm().is_none());

        editor.propose(Coordinates::new(2.0, 2.0));
        editor.cancel();
        assert!(editor.confirm().is_none());
        assert_eq!(editor.current(), Coordinates::new(1.0, 1.0));

        editor.propose(Coordinates::new(3.0, 4.0));
        assert_eq!(editor.pending(), Some(Coordinates::new(3.0, 4.0)));
        assert_eq!(
            editor.confirm(),
            Some(LocationChanged { lat: 3.0, lng: 4.0 })
        );
        assert_eq!(editor.current(), Coordinates::new(3.0, 4.0));
        assert!(editor.pending().is_none());
    }

    #[test]
    fn test_location_changed_from_position() {
        let change = LocationChanged::from(Coordinates::new(40.7128, -74.006));
        assert_eq!(change, LocationChanged { lat: 40.7128, lng: -74.006 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_only_latest_move_settles() {
        let debouncer = Arc::new(RouteDebouncer::new(Duration::from_millis(1000)));

        let first = {
            let d = debouncer.clone();
            tokio::spawn(async move { d.settle("RW1").await })
        };
        tokio::time::sleep(Duration::from_millis(300)).await;
        let second = {
            let d = debouncer.clone();
            tokio::spawn(async move { d.settle("RW1").await })
        };
        let other_key = {
            let d = debouncer.clone();
            tokio::spawn(async move { d.settle("RW2").await })
        };

        assert!(!first.await.unwrap());
        assert!(second.await.unwrap());
        assert!(other_key.await.unwrap());
    }
}
