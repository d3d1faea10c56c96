use super::classify::classify;
use crate::geojson::{coordinate_pair, Feature, Properties};
use serde_json::Value;

/// Placeholder stored in `address_normalized` when the record has no address
pub const NO_ADDRESS: &str = "N/A";

/// POI record as read from the source dataset
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawPoi {
    pub name: Option<String>,
    pub category: Option<String>,
    pub address: Option<String>,
    /// Untouched `geometry.coordinates`; validity is decided by [`normalize`]
    pub coordinates: Option<Value>,
    /// Every property of the source record, including the ones above
    pub properties: Properties,
}

impl RawPoi {
    pub fn from_feature(feature: &Feature) -> Self {
        let properties = feature.properties.clone().unwrap_or_default();
        let text = |key: &str| properties.get(key).and_then(Value::as_str).map(str::to_string);

        RawPoi {
            name: text("name"),
            category: text("category"),
            address: text("address"),
            coordinates: feature.coordinates().cloned(),
            properties: properties.clone(),
        }
    }
}

/// Canonical POI record produced by enrichment
#[derive(Clone, Debug, PartialEq)]
pub struct EnrichedPoi {
    pub clean_name: String,
    pub category: String,
    pub coords_valid: bool,
    pub address_normalized: String,
    /// (lon, lat) when `coords_valid`
    pub coordinates: Option<(f64, f64)>,
    pub original_properties: Properties,
}

impl EnrichedPoi {
    /// Original properties overlaid with the derived fields
    pub fn to_properties(&self) -> Properties {
        let mut props = self.original_properties.clone();
        props.insert("clean_name".into(), Value::from(self.clean_name.as_str()));
        props.insert("category".into(), Value::from(self.category.as_str()));
        props.insert("coords_valid".into(), Value::from(self.coords_valid));
        props.insert(
            "address_normalized".into(),
            Value::from(self.address_normalized.as_str()),
        );
        props
    }
}

/// Trim and squeeze internal whitespace runs to a single space
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Derive the canonical form of a raw record
///
/// Pure and deterministic. An explicit non-empty category always wins over
/// keyword inference; an empty address string counts as no address.
pub fn normalize(raw: &RawPoi) -> EnrichedPoi {
    let name = raw.name.as_deref().unwrap_or("");

    let category = match raw.category.as_deref() {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => classify(name).to_string(),
    };

    let coordinates = raw.coordinates.as_ref().and_then(coordinate_pair);

    let address_normalized = match raw.address.as_deref() {
        Some(a) if !a.is_empty() => a.to_lowercase(),
        _ => NO_ADDRESS.to_string(),
    };

    EnrichedPoi {
        clean_name: collapse_whitespace(name),
        category,
        coords_valid: coordinates.is_some(),
        address_normalized,
        coordinates,
        original_properties: raw.properties.clone(),
    }
}
