use super::collection::{PoiRecord, SpatialCollection};
use crate::config::QueryPolicy;
use crate::coords::LatLng;
use crate::error::{QueryError, QueryResult};
use geo::{HaversineDistance, Point};

/// A record paired with its great-circle distance from the query point
#[derive(Clone, Debug, PartialEq)]
pub struct Nearest<'a> {
    pub record: &'a PoiRecord,
    pub distance_km: f64,
}

/// Great-circle distance in kilometers between two (lon, lat) positions
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let a = Point::new(a.0, a.1);
    let b = Point::new(b.0, b.1);
    a.haversine_distance(&b) / 1000.0
}

/// Round to two decimals, as reported to clients
pub fn round_km(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

/// Closest record to `point` by haversine distance
///
/// Linear scan in collection order that only replaces the current best on
/// strict improvement, so among equidistant records the earliest wins.
/// Records without usable coordinates are skipped.
///
/// # Errors
/// - `NoMatch` when no record has usable coordinates (including an empty
///   collection)
pub fn nearest<'a>(
    collection: &'a SpatialCollection,
    point: LatLng,
    policy: &QueryPolicy,
) -> QueryResult<Nearest<'a>> {
    let origin = (point.lng, point.lat);
    let mut best: Option<Nearest<'a>> = None;

    for record in collection.iter() {
        let coords = match record.located(policy) {
            Some(c) => c,
            None => continue,
        };

        let distance_km = haversine_km(origin, coords);
        if best.as_ref().map_or(true, |b| distance_km < b.distance_km) {
            best = Some(Nearest { record, distance_km });
        }
    }

    best.ok_or_else(|| QueryError::no_match("No POI found"))
}
