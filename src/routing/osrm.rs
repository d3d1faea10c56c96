use crate::config::RoutingSettings;
use crate::coords::LatLng;
use crate::error::QueryError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const NO_ROUTE_MESSAGE: &str = "No route found between the specified points";

/// Failures talking to the OSRM routing provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouteError {
    #[error("Routing provider timed out")]
    NetworkTimeout,

    #[error("Routing provider returned HTTP {status}: {message}")]
    HttpError { status: u16, message: String },

    #[error("No route found between the specified points")]
    NoRoute,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<RouteError> for QueryError {
    fn from(err: RouteError) -> Self {
        match err {
            RouteError::NoRoute => QueryError::no_match(NO_ROUTE_MESSAGE),
            RouteError::NetworkTimeout => QueryError::Upstream {
                status: None,
                message: err.to_string(),
                timed_out: true,
            },
            RouteError::HttpError { status, message } => QueryError::Upstream {
                status: Some(status),
                message,
                timed_out: false,
            },
            RouteError::ParseError(_) | RouteError::Transport(_) => QueryError::Upstream {
                status: None,
                message: err.to_string(),
                timed_out: false,
            },
        }
    }
}

// OSRM JSON deserialization structures
#[derive(Debug, Deserialize)]
struct OsrmResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
    #[serde(default)]
    waypoints: Vec<OsrmWaypoint>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: Value,
}

#[derive(Debug, Deserialize)]
struct OsrmWaypoint {
    location: [f64; 2],
}

/// First route of a provider response
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RouteSummary {
    /// Meters
    pub distance: f64,
    /// Seconds
    pub duration: f64,
    /// GeoJSON LineString
    pub geometry: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Waypoint {
    pub name: String,
    /// [lon, lat] snapped by the provider
    pub location: [f64; 2],
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RouteResult {
    pub route: RouteSummary,
    pub waypoints: Vec<Waypoint>,
}

/// Label waypoints "Start Point", "Waypoint N" (1-based position), "End Point"
pub fn label_waypoints(locations: &[[f64; 2]]) -> Vec<Waypoint> {
    let last = locations.len().saturating_sub(1);
    locations
        .iter()
        .enumerate()
        .map(|(i, location)| {
            let name = if i == 0 {
                "Start Point".to_string()
            } else if i == last {
                "End Point".to_string()
            } else {
                format!("Waypoint {}", i + 1)
            };
            Waypoint {
                name,
                location: *location,
            }
        })
        .collect()
}

/// OSRM HTTP client for point-to-point routes
///
/// # Request
/// `GET {base}/route/v1/{profile}/{lng},{lat};{lng},{lat}?overview=full&geometries=geojson`
///
/// # Error Handling
/// - Timeout (set on every request, independent of the client): `NetworkTimeout`
/// - Zero routes, or an OSRM `NoRoute` code: `NoRoute`
/// - Non-2xx: `HttpError` with the provider's `message` when present
/// - Single attempt, no retries
///
/// Dropping the future returned by [`OsrmClient::route`] abandons the call.
#[derive(Clone, Debug)]
pub struct OsrmClient {
    client: reqwest::Client,
    base_url: String,
    profile: String,
    timeout: Duration,
}

impl OsrmClient {
    pub fn new(settings: &RoutingSettings) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("mapify/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        OsrmClient {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            profile: settings.profile.clone(),
            timeout: settings.timeout,
        }
    }

    fn build_url(&self, start: LatLng, end: LatLng) -> String {
        format!(
            "{}/route/v1/{}/{},{};{},{}?overview=full&geometries=geojson",
            self.base_url, self.profile, start.lng, start.lat, end.lng, end.lat
        )
    }

    /// Fetch the route between two validated points
    pub async fn route(&self, start: LatLng, end: LatLng) -> Result<RouteResult, RouteError> {
        let url = self.build_url(start, end);
        log::info!("Fetching route from OSRM: {}", url);

        let request = self.client.get(&url).timeout(self.timeout);
        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                if e.is_timeout() {
                    return Err(RouteError::NetworkTimeout);
                }
                return Err(RouteError::Transport(e.to_string()));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                if e.is_timeout() {
                    return Err(RouteError::NetworkTimeout);
                }
                return Err(RouteError::Transport(format!("Failed to read response: {}", e)));
            }
        };

        let parsed: Option<OsrmResponse> = serde_json::from_str(&body).ok();

        if parsed.as_ref().and_then(|r| r.code.as_deref()) == Some("NoRoute") {
            return Err(RouteError::NoRoute);
        }

        if !status.is_success() {
            let message = parsed
                .and_then(|r| r.message)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "Routing failed".to_string());
            return Err(RouteError::HttpError {
                status: status.as_u16(),
                message,
            });
        }

        let parsed = match parsed {
            Some(p) => p,
            None => {
                return Err(RouteError::ParseError(
                    "Malformed OSRM response".to_string(),
                ))
            }
        };

        reshape(parsed)
    }
}

fn reshape(response: OsrmResponse) -> Result<RouteResult, RouteError> {
    let route = match response.routes.into_iter().next() {
        Some(route) => route,
        None => return Err(RouteError::NoRoute),
    };

    let locations: Vec<[f64; 2]> = response.waypoints.iter().map(|w| w.location).collect();

    Ok(RouteResult {
        route: RouteSummary {
            distance: route.distance,
            duration: route.duration,
            geometry: route.geometry,
        },
        waypoints: label_waypoints(&locations),
    })
}
