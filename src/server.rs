use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, request::Parts, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::config::ServerConfig;
use crate::context::{AppContext, GeocodingStatus};
use crate::coords::LatLng;
use crate::error::{QueryError, QueryResult};
use crate::routing::RouteResult;
use crate::spatial::{self, round_km, PoiRecord};

pub const DEFAULT_NEARBY_RADIUS_KM: f64 = 1.0;
pub const DEFAULT_NEARBY_LIMIT: usize = 20;
pub const MAX_NEARBY_LIMIT: usize = 100;

const ROUTE_EXAMPLE: &str = "/route?start=33.6844,73.0479&end=33.7000,73.0500";

/// Origins always accepted in production mode
const DEFAULT_ORIGINS: &[&str] = &["http://localhost:5173", "http://localhost:3000"];

type SharedContext = Arc<AppContext>;

#[derive(Clone, Debug, Default)]
pub struct CorsSettings {
    pub frontend_url: Option<String>,
    pub production: bool,
}

impl From<&ServerConfig> for CorsSettings {
    fn from(config: &ServerConfig) -> Self {
        CorsSettings {
            frontend_url: config.frontend_url.clone(),
            production: config.production,
        }
    }
}

impl CorsSettings {
    fn allowed_origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect();
        if let Some(url) = &self.frontend_url {
            let url = url.trim_end_matches('/').to_string();
            if !origins.contains(&url) {
                origins.push(url);
            }
        }
        origins
    }
}

/// Production-mode origin check: explicit list plus Vercel/Netlify previews
pub fn origin_allowed(origin: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|o| o == origin)
        || (origin.starts_with("https://")
            && (origin.ends_with(".vercel.app") || origin.ends_with(".netlify.app")))
}

fn cors_layer(settings: &CorsSettings) -> CorsLayer {
    if !settings.production {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed = settings.allowed_origins();
    log::info!("CORS restricted to {:?} and *.vercel.app / *.netlify.app", allowed);

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                let ok = origin
                    .to_str()
                    .map_or(false, |o| origin_allowed(o, &allowed));
                if !ok {
                    log::warn!("CORS blocked origin: {:?}", origin);
                }
                ok
            },
        ))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
}

/// Full HTTP surface over a loaded context
pub fn build_router(ctx: SharedContext, cors: &CorsSettings, data_dir: &Path) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/nearest", get(nearest_handler))
        .route("/reverse", get(nearest_handler))
        .route("/nearby", get(nearby_handler))
        .route("/search", get(search_handler))
        .route("/route", get(route_handler))
        .route("/health-buffers", get(buffers_handler))
        .route("/geocoding-status", get(status_handler))
        .route("/api/geocoding/status", get(status_handler))
        .nest_service("/data", ServeDir::new(data_dir))
        .layer(ServiceBuilder::new().layer(cors_layer(cors)))
        .with_state(ctx)
}

// ----------------------------------------------------------------------------
// Errors
// ----------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// HTTP rendering of a [`QueryError`]
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn with_details(mut self, details: impl Into<String>) -> Self {
        self.body.details = Some(details.into());
        self
    }
}

impl QueryError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            QueryError::Validation(_) => StatusCode::BAD_REQUEST,
            QueryError::DataUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            QueryError::NoMatch(_) => StatusCode::NOT_FOUND,
            QueryError::Upstream { timed_out: true, .. } => StatusCode::GATEWAY_TIMEOUT,
            QueryError::Upstream {
                status: Some(code), ..
            } if *code >= 500 => StatusCode::from_u16(*code).unwrap_or(StatusCode::BAD_GATEWAY),
            QueryError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        let status = err.status_code();
        let body = match err {
            QueryError::Upstream { message, .. } => ErrorResponse {
                error: "Routing failed".to_string(),
                details: Some(message),
            },
            QueryError::Validation(message) => {
                log::debug!("Rejected request: {}", message);
                ErrorResponse {
                    error: message,
                    details: None,
                }
            }
            QueryError::DataUnavailable(message) | QueryError::NoMatch(message) => {
                ErrorResponse {
                    error: message,
                    details: None,
                }
            }
        };
        ApiError { status, body }
    }
}

/// Malformed query strings get the same JSON body as every other 400
impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::from(QueryError::validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ----------------------------------------------------------------------------
// Handlers
// ----------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexResponse {
    status: &'static str,
    message: &'static str,
    started_at: String,
}

async fn index_handler(State(ctx): State<SharedContext>) -> Json<IndexResponse> {
    Json(IndexResponse {
        status: "ok",
        message: "mapify backend",
        started_at: ctx.started_at.to_rfc3339(),
    })
}

async fn status_handler(State(ctx): State<SharedContext>) -> Json<GeocodingStatus> {
    Json(ctx.status())
}

/// POI as returned to clients
#[derive(Debug, Serialize)]
struct PoiHit {
    name: String,
    category: String,
    coordinates: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    distance_km: Option<f64>,
}

impl PoiHit {
    fn new(record: &PoiRecord, distance_km: Option<f64>) -> Self {
        PoiHit {
            name: record.display_name().to_string(),
            category: record.display_category().to_string(),
            coordinates: record.coordinates.map(|(lon, lat)| [lon, lat]),
            distance_km: distance_km.map(round_km),
        }
    }
}

#[derive(Serialize)]
struct HitList {
    results: Vec<PoiHit>,
}

#[derive(Debug, Deserialize)]
struct PointParams {
    lat: Option<String>,
    lng: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn required_point(lat: Option<&str>, lng: Option<&str>) -> QueryResult<LatLng> {
    match (non_empty(lat), non_empty(lng)) {
        (Some(lat), Some(lng)) => LatLng::from_parts(lat, lng),
        _ => Err(QueryError::validation("lat and lng required")),
    }
}

async fn nearest_handler(
    State(ctx): State<SharedContext>,
    params: Result<Query<PointParams>, QueryRejection>,
) -> ApiResult<PoiHit> {
    let Query(params) = params?;
    let point = required_point(params.lat.as_deref(), params.lng.as_deref())?;
    let collection = ctx.collection()?;

    let hit = spatial::nearest(collection, point, &ctx.policy)?;
    Ok(Json(PoiHit::new(hit.record, Some(hit.distance_km))))
}

#[derive(Debug, Deserialize)]
struct NearbyParams {
    lat: Option<String>,
    lng: Option<String>,
    radius_km: Option<String>,
    limit: Option<String>,
}

fn parse_radius(raw: Option<&str>) -> QueryResult<f64> {
    match non_empty(raw) {
        None => Ok(DEFAULT_NEARBY_RADIUS_KM),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or_else(|| QueryError::validation("radius_km must be a positive number")),
    }
}

fn parse_limit(raw: Option<&str>) -> QueryResult<usize> {
    match non_empty(raw) {
        None => Ok(DEFAULT_NEARBY_LIMIT),
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(limit) if limit > 0 => Ok(limit.min(MAX_NEARBY_LIMIT)),
            _ => Err(QueryError::validation("limit must be a positive integer")),
        },
    }
}

async fn nearby_handler(
    State(ctx): State<SharedContext>,
    params: Result<Query<NearbyParams>, QueryRejection>,
) -> ApiResult<HitList> {
    let Query(params) = params?;
    let point = required_point(params.lat.as_deref(), params.lng.as_deref())?;
    let radius_km = parse_radius(params.radius_km.as_deref())?;
    let limit = parse_limit(params.limit.as_deref())?;
    let (collection, tree) = ctx.tree()?;

    let results = tree
        .within(collection, point, radius_km, limit)
        .into_iter()
        .map(|hit| PoiHit::new(hit.record, Some(hit.distance_km)))
        .collect();

    Ok(Json(HitList { results }))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
}

async fn search_handler(
    State(ctx): State<SharedContext>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<HitList> {
    let Query(params) = params?;
    let hits = spatial::search(ctx.loaded(), params.q.as_deref(), &ctx.policy)?;
    let results = hits.into_iter().map(|r| PoiHit::new(r, None)).collect();
    Ok(Json(HitList { results }))
}

async fn buffers_handler(State(ctx): State<SharedContext>) -> Result<Response, ApiError> {
    let doc = ctx.buffers()?;
    Ok((
        [(header::CONTENT_TYPE, "application/json")],
        doc.json.clone(),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct RouteParams {
    start: Option<String>,
    end: Option<String>,
}

/// Validates both endpoints before any outbound call
async fn route_handler(
    State(ctx): State<SharedContext>,
    params: Result<Query<RouteParams>, QueryRejection>,
) -> ApiResult<RouteResult> {
    let Query(params) = params?;
    let (start, end) = match (non_empty(params.start.as_deref()), non_empty(params.end.as_deref())) {
        (Some(start), Some(end)) => (LatLng::parse_pair(start)?, LatLng::parse_pair(end)?),
        _ => {
            return Err(
                ApiError::from(QueryError::validation("start and end parameters required"))
                    .with_details(format!("Example: {}", ROUTE_EXAMPLE)),
            )
        }
    };

    let result = ctx.router.route(start, end).await.map_err(|e| {
        log::error!("Routing error: {}", e);
        QueryError::from(e)
    })?;

    Ok(Json(result))
}
