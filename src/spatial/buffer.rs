use super::collection::SpatialCollection;
use crate::config::{BufferSpec, QueryPolicy};
use crate::error::{QueryError, QueryResult};
use crate::geojson::{Feature, FeatureCollection};
use geo::{Coord, HaversineDestination, LineString, Point, Polygon};
use serde_json::{json, Value};

const CATEGORY_FIELD: &str = "category";

/// Disk of `radius_km` around a (lon, lat) center, approximated by `steps` vertices
///
/// Vertices are placed by haversine destination at evenly spaced bearings,
/// walked north → west → south → east so the exterior ring is
/// counter-clockwise. The ring is closed.
pub fn disk(center: (f64, f64), radius_km: f64, steps: usize) -> Polygon<f64> {
    let origin = Point::new(center.0, center.1);
    let radius_m = radius_km * 1000.0;
    let step = 360.0 / steps as f64;

    let ring: Vec<Coord<f64>> = (0..steps)
        .map(|i| {
            let bearing = 360.0 - i as f64 * step;
            origin.haversine_destination(bearing, radius_m).0
        })
        .collect();

    Polygon::new(LineString::new(ring), vec![])
}

/// GeoJSON geometry object for a polygon
fn polygon_geometry(polygon: &Polygon<f64>) -> Value {
    let ring: Vec<[f64; 2]> = polygon.exterior().coords().map(|c| [c.x, c.y]).collect();
    json!({
        "type": "Polygon",
        "coordinates": [ring],
    })
}

/// Buffer every record of `spec.category` in the collection
///
/// Only the `category` property is matched, case-insensitively and
/// exactly; the display fallbacks (`category_group`, `amenity`) are not
/// consulted. Each match yields its own
/// polygon feature carrying the record's properties; disks are not unioned.
/// Returns an empty collection when nothing matches.
///
/// # Errors
/// - `DataUnavailable` when no collection was loaded
pub fn buffer(
    collection: Option<&SpatialCollection>,
    spec: &BufferSpec,
    policy: &QueryPolicy,
) -> QueryResult<FeatureCollection> {
    let collection = collection.ok_or_else(|| {
        QueryError::unavailable(format!("{} buffers not available", spec.category))
    })?;

    let target = spec.category.to_lowercase();

    let features = collection
        .iter()
        .filter(|record| {
            record
                .properties
                .get(CATEGORY_FIELD)
                .and_then(Value::as_str)
                .map_or(false, |c| c.to_lowercase() == target)
        })
        .filter_map(|record| {
            let center = record.located(policy)?;
            let polygon = disk(center, spec.radius_km, spec.steps);
            Some(Feature::new(
                polygon_geometry(&polygon),
                record.properties.clone(),
            ))
        })
        .collect();

    Ok(FeatureCollection::new(features))
}
