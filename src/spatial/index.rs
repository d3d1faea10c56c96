use super::collection::SpatialCollection;
use super::nearest::{haversine_km, Nearest};
use crate::config::QueryPolicy;
use crate::coords::LatLng;
use rstar::{RTree, RTreeObject, AABB};

/// Mean earth radius, matching the sphere `haversine_km` measures on
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Slack added to every box edge so points exactly on the circle survive
/// rounding in the bound computation
const EDGE_SLACK_DEG: f64 = 1e-9;

/// Collection position of a POI with its (lon, lat) point
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedPoi {
    pub index: usize,
    pub position: [f64; 2],
}

impl RTreeObject for IndexedPoi {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// R-Tree over the located records of a [`SpatialCollection`]
///
/// # Architecture
/// - Built once, next to the collection it indexes, and never mutated
/// - Envelope lookup in degrees narrows candidates; exact haversine
///   distances decide membership and ordering
/// - Circles crossing the antimeridian are searched as two boxes
pub struct PoiTree {
    tree: RTree<IndexedPoi>,
    poi_count: usize,
}

impl PoiTree {
    /// Index every record that has usable coordinates under `policy`
    pub fn from_collection(collection: &SpatialCollection, policy: &QueryPolicy) -> Self {
        let pois: Vec<IndexedPoi> = collection
            .iter()
            .filter_map(|record| {
                record.located(policy).map(|(lon, lat)| IndexedPoi {
                    index: record.index,
                    position: [lon, lat],
                })
            })
            .collect();

        let poi_count = pois.len();

        PoiTree {
            tree: RTree::bulk_load(pois),
            poi_count,
        }
    }

    /// Records within `radius_km` of `point`, nearest first
    ///
    /// Equal distances keep collection order. At most `limit` results.
    pub fn within<'a>(
        &self,
        collection: &'a SpatialCollection,
        point: LatLng,
        radius_km: f64,
        limit: usize,
    ) -> Vec<Nearest<'a>> {
        let origin = (point.lng, point.lat);

        // Boxes are disjoint in longitude, so no POI is seen twice
        let mut hits: Vec<Nearest<'a>> = search_envelopes(point, radius_km)
            .iter()
            .flat_map(|envelope| self.tree.locate_in_envelope(envelope))
            .filter_map(|poi| {
                let distance_km = haversine_km(origin, (poi.position[0], poi.position[1]));
                if distance_km > radius_km {
                    return None;
                }
                collection
                    .get(poi.index)
                    .map(|record| Nearest { record, distance_km })
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then(a.record.index.cmp(&b.record.index))
        });
        hits.truncate(limit);
        hits
    }

    pub fn poi_count(&self) -> usize {
        self.poi_count
    }
}

/// Degree-space boxes that together contain every point within `radius_km`
///
/// Latitude reach is the angular radius itself. Longitude reach is the
/// spherical bound `asin(sin(r/R) / cos(lat))`; when the circle covers a
/// pole (or the bound degenerates) every longitude is searched. A longitude
/// span crossing ±180° is split in two.
fn search_envelopes(point: LatLng, radius_km: f64) -> Vec<AABB<[f64; 2]>> {
    let angular = radius_km / EARTH_RADIUS_KM;
    let dlat = angular.to_degrees() + EDGE_SLACK_DEG;
    let south = point.lat - dlat;
    let north = point.lat + dlat;

    let full = |south: f64, north: f64| {
        vec![AABB::from_corners(
            [-180.0, south.max(-90.0)],
            [180.0, north.min(90.0)],
        )]
    };

    if north >= 90.0 || south <= -90.0 || angular >= std::f64::consts::FRAC_PI_2 {
        return full(south, north);
    }

    let reach = angular.sin() / point.lat.to_radians().cos();
    if reach >= 1.0 {
        return full(south, north);
    }

    let dlon = reach.asin().to_degrees() + EDGE_SLACK_DEG;
    let west = point.lng - dlon;
    let east = point.lng + dlon;

    if west < -180.0 {
        vec![
            AABB::from_corners([-180.0, south], [east, north]),
            AABB::from_corners([west + 360.0, south], [180.0, north]),
        ]
    } else if east > 180.0 {
        vec![
            AABB::from_corners([west, south], [180.0, north]),
            AABB::from_corners([-180.0, south], [east - 360.0, north]),
        ]
    } else {
        vec![AABB::from_corners([west, south], [east, north])]
    }
}
