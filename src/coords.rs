use crate::error::{QueryError, QueryResult};

/// WGS84 position as supplied by callers (latitude first)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Validated position; rejects non-finite and out-of-range values
    pub fn new(lat: f64, lng: f64) -> QueryResult<Self> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(QueryError::validation("Coordinates must be finite numbers"));
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(QueryError::validation(format!(
                "Coordinates out of range: lat={}, lng={}",
                lat, lng
            )));
        }
        Ok(LatLng { lat, lng })
    }

    /// Parse separate `lat` and `lng` query values
    pub fn from_parts(lat: &str, lng: &str) -> QueryResult<Self> {
        match (parse_component(lat), parse_component(lng)) {
            (Some(lat), Some(lng)) => Self::new(lat, lng),
            _ => Err(QueryError::validation("Invalid lat/lng format")),
        }
    }

    /// Parse a `"lat,lng"` pair; exactly two numeric components
    pub fn parse_pair(s: &str) -> QueryResult<Self> {
        let parts: Vec<&str> = s.split(',').collect();
        match parts.as_slice() {
            [lat, lng] => Self::from_parts(lat, lng).map_err(|_| invalid_pair()),
            _ => Err(invalid_pair()),
        }
    }
}

fn invalid_pair() -> QueryError {
    QueryError::validation("Invalid coordinate format. Use: lat,lng (e.g., 33.6844,73.0479)")
}

fn parse_component(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
