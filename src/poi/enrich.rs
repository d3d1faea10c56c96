use super::normalize::{normalize, EnrichedPoi, RawPoi};
use crate::error::DatasetError;
use crate::geojson::{read_collection, write_collection, Feature, FeatureCollection};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Provenance tag stamped on every enriched feature
pub const ENRICHMENT_SOURCE: &str = "Enriched by mapify enrich v1";

/// Normalize a sequence of raw records, one output per input, in order
pub fn enrich_records(records: &[RawPoi]) -> Vec<EnrichedPoi> {
    records.iter().map(normalize).collect()
}

/// Enrich a single feature; geometry and foreign members pass through
pub fn enrich_feature(feature: &Feature) -> Feature {
    let enriched = normalize(&RawPoi::from_feature(feature));

    let mut properties = enriched.to_properties();
    properties.insert("source".into(), Value::from(ENRICHMENT_SOURCE));

    Feature {
        properties: Some(properties),
        ..feature.clone()
    }
}

/// Enrich every feature of a collection
///
/// Same feature count and order as the input; no filtering or dedup.
pub fn enrich(dataset: &FeatureCollection) -> FeatureCollection {
    FeatureCollection {
        kind: dataset.kind.clone(),
        features: dataset.features.iter().map(enrich_feature).collect(),
        foreign: dataset.foreign.clone(),
    }
}

/// Counts reported after an enrichment run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EnrichSummary {
    pub features: usize,
    pub invalid_coords: usize,
    pub categories: BTreeMap<String, usize>,
}

impl EnrichSummary {
    pub fn from_collection(collection: &FeatureCollection) -> Self {
        let mut summary = EnrichSummary {
            features: collection.len(),
            ..Default::default()
        };

        for feature in &collection.features {
            if feature.property("coords_valid") != Some(&Value::Bool(true)) {
                summary.invalid_coords += 1;
            }
            let category = feature
                .property("category")
                .and_then(Value::as_str)
                .unwrap_or("Unknown");
            *summary.categories.entry(category.to_string()).or_insert(0) += 1;
        }
        summary
    }
}

/// Offline pipeline: read `input`, enrich, write `output`
///
/// Fails before writing anything if the input is not a well-formed
/// feature collection.
pub fn run(input: &Path, output: &Path) -> Result<EnrichSummary, DatasetError> {
    let raw = read_collection(input)?;
    log::info!("Read {} raw features from {}", raw.len(), input.display());

    let enriched = enrich(&raw);
    write_collection(output, &enriched)?;

    Ok(EnrichSummary::from_collection(&enriched))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn sample() -> FeatureCollection {
        FeatureCollection::from_value(json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [73.05, 33.70]},
                 "properties": {"name": "Al-Noor Masjid"}},
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [73.06, 33.71]},
                 "properties": {"name": "  City   Mall  ", "address": "Main Blvd"}},
                {"type": "Feature", "geometry": null, "properties": {"name": "Lost Clinic"}},
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [73.07, 33.72]},
                 "properties": {"name": "Al-Noor Masjid"}}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_order_and_count_preserved() {
        let raw = sample();
        let enriched = enrich(&raw);

        assert_eq!(enriched.len(), raw.len());
        for (before, after) in raw.features.iter().zip(&enriched.features) {
            assert_eq!(before.geometry, after.geometry);
            assert_eq!(before.property("name"), after.property("name"));
        }

        // Duplicate names are not deduplicated
        assert_eq!(enriched.features[0].property("clean_name"), Some(&json!("Al-Noor Masjid")));
        assert_eq!(enriched.features[3].property("clean_name"), Some(&json!("Al-Noor Masjid")));
    }

    #[test]
    fn test_derived_fields() {
        let enriched = enrich(&sample());

        let mall = &enriched.features[1];
        assert_eq!(mall.property("clean_name"), Some(&json!("City Mall")));
        assert_eq!(mall.property("category"), Some(&json!("Commercial")));
        assert_eq!(mall.property("address_normalized"), Some(&json!("main blvd")));
        assert_eq!(mall.property("address"), Some(&json!("Main Blvd")));
        assert_eq!(mall.property("source"), Some(&json!(ENRICHMENT_SOURCE)));

        let lost = &enriched.features[2];
        assert_eq!(lost.property("coords_valid"), Some(&json!(false)));
        assert_eq!(lost.property("category"), Some(&json!("Health")));
    }

    #[test]
    fn test_enrich_records() {
        let records: Vec<RawPoi> = sample().features.iter().map(RawPoi::from_feature).collect();
        let enriched = enrich_records(&records);
        assert_eq!(enriched.len(), 4);
        assert_eq!(enriched[0].category, "Religious");
        assert_eq!(enriched[2].coordinates, None);
    }

    #[test]
    fn test_enriching_twice_is_stable() {
        let once = enrich(&sample());
        let twice = enrich(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_summary() {
        let summary = EnrichSummary::from_collection(&enrich(&sample()));
        assert_eq!(summary.features, 4);
        assert_eq!(summary.invalid_coords, 1);
        assert_eq!(summary.categories.get("Religious"), Some(&2));
        assert_eq!(summary.categories.get("Commercial"), Some(&1));
        assert_eq!(summary.categories.get("Health"), Some(&1));
    }

    #[test]
    fn test_run_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("rawPois.geojson");
        let output = dir.path().join("enrichedPois.geojson");
        fs::write(&input, serde_json::to_string(&sample()).unwrap()).unwrap();

        let summary = run(&input, &output).unwrap();
        assert_eq!(summary.features, 4);

        let written = read_collection(&output).unwrap();
        assert_eq!(written, enrich(&sample()));
    }

    #[test]
    fn test_run_fails_fast_on_malformed_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("rawPois.geojson");
        let output = dir.path().join("enrichedPois.geojson");
        fs::write(&input, r#"{"type": "FeatureCollection", "features": {}}"#).unwrap();

        assert!(matches!(run(&input, &output), Err(DatasetError::Malformed(_))));
        assert!(!output.exists());
    }
}
