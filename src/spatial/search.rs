use super::collection::{PoiRecord, SpatialCollection};
use crate::config::QueryPolicy;
use crate::error::{QueryError, QueryResult};

/// Upper bound on search results
pub const MAX_SEARCH_RESULTS: usize = 20;

/// Case-insensitive substring search over POI names
///
/// Results keep collection order and are capped at [`MAX_SEARCH_RESULTS`].
///
/// # Errors
/// - `Validation` for a missing, empty or whitespace-only query, checked first
/// - `DataUnavailable` when no collection was loaded
pub fn search<'a>(
    collection: Option<&'a SpatialCollection>,
    query: Option<&str>,
    policy: &QueryPolicy,
) -> QueryResult<Vec<&'a PoiRecord>> {
    let needle = query
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| QueryError::validation("Query parameter q is required"))?;

    let collection = collection.ok_or_else(|| QueryError::unavailable("POI data not loaded"))?;

    Ok(collection
        .iter()
        .filter(|record| record.is_eligible(policy))
        .filter(|record| {
            record
                .name()
                .map_or(false, |name| name.to_lowercase().contains(&needle))
        })
        .take(MAX_SEARCH_RESULTS)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geojson::{Feature, Properties};
    use crate::spatial::collection::SourceKind;
    use serde_json::{json, Value};

    fn props(value: Value) -> Properties {
        value.as_object().cloned().unwrap()
    }

    fn named(name: &str) -> Feature {
        Feature::point(73.0, 33.7, props(json!({"name": name, "category": "Religious"})))
    }

    fn collection(features: Vec<Feature>) -> SpatialCollection {
        SpatialCollection::from_features(features, SourceKind::Enriched)
    }

    #[test]
    fn test_substring_in_collection_order() {
        let c = collection(vec![
            named("Al-Noor Masjid"),
            named("Faisal Mosque"),
            named("Grand Masjid"),
        ]);

        let hits = search(Some(&c), Some("masjid"), &QueryPolicy::default()).unwrap();
        let names: Vec<&str> = hits.iter().map(|r| r.display_name()).collect();
        assert_eq!(names, vec!["Al-Noor Masjid", "Grand Masjid"]);
    }

    #[test]
    fn test_case_and_whitespace_insensitive_query() {
        let c = collection(vec![named("Faisal Mosque")]);
        assert_eq!(search(Some(&c), Some("  FAISAL "), &QueryPolicy::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_result_cap() {
        let c = collection((0..50).map(|i| named(&format!("Shop {}", i))).collect());
        let hits = search(Some(&c), Some("shop"), &QueryPolicy::default()).unwrap();
        assert_eq!(hits.len(), MAX_SEARCH_RESULTS);
        assert_eq!(hits[0].index, 0);
        assert_eq!(hits[19].index, 19);
    }

    #[test]
    fn test_missing_query_is_validation_error() {
        let c = collection(vec![named("Faisal Mosque")]);
        for q in [None, Some(""), Some("   ")] {
            assert!(matches!(
                search(Some(&c), q, &QueryPolicy::default()),
                Err(QueryError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_validation_precedes_unavailable() {
        assert!(matches!(
            search(None, None, &QueryPolicy::default()),
            Err(QueryError::Validation(_))
        ));
        assert!(matches!(
            search(None, Some("masjid"), &QueryPolicy::default()),
            Err(QueryError::DataUnavailable(_))
        ));
    }

    #[test]
    fn test_name_fallback_fields() {
        let c = collection(vec![
            Feature::point(73.0, 33.0, props(json!({"clean_name": "Centaurus Mall"}))),
            Feature::point(73.0, 33.0, props(json!({"name_clean": "Safa Gold Mall"}))),
            Feature::point(73.0, 33.0, props(json!({"amenity": "mall"}))),
        ]);
        let hits = search(Some(&c), Some("mall"), &QueryPolicy::default()).unwrap();
        let indices: Vec<usize> = hits.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_no_match_is_empty_success() {
        let c = collection(vec![named("Faisal Mosque")]);
        assert!(search(Some(&c), Some("zoo"), &QueryPolicy::default()).unwrap().is_empty());
    }

    #[test]
    fn test_policy_excludes_invalid() {
        let c = collection(vec![Feature {
            geometry: None,
            ..named("Lost Masjid")
        }]);

        assert_eq!(search(Some(&c), Some("masjid"), &QueryPolicy::default()).unwrap().len(), 1);
        let strict = QueryPolicy { exclude_invalid_coords: true };
        assert!(search(Some(&c), Some("masjid"), &strict).unwrap().is_empty());
    }
}
