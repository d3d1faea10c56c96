use crate::config::QueryPolicy;
use crate::error::DatasetError;
use crate::geojson::{read_collection, Feature, Properties};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Name-like fields, most preferred first
pub const NAME_FIELDS: &[&str] = &["name", "clean_name", "name_clean"];

/// Category-like fields, most preferred first
pub const CATEGORY_FIELDS: &[&str] = &["category", "category_group", "amenity"];

pub const UNNAMED: &str = "Unnamed";
pub const NO_CATEGORY: &str = "N/A";

pub const ENRICHED_FILE: &str = "enrichedPois.geojson";
pub const RAW_FILE: &str = "rawPois.geojson";

/// First field in `fields` holding a non-empty string
pub fn first_present<'a>(properties: &'a Properties, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .filter_map(|field| properties.get(*field).and_then(Value::as_str))
        .find(|value| !value.is_empty())
}

/// One POI in the in-memory collection
#[derive(Clone, Debug, PartialEq)]
pub struct PoiRecord {
    /// Position in collection order
    pub index: usize,
    pub properties: Properties,
    /// (lon, lat) when the geometry is a well-formed point
    pub coordinates: Option<(f64, f64)>,
    pub coords_valid: bool,
}

impl PoiRecord {
    pub fn from_feature(index: usize, feature: Feature) -> Self {
        let coordinates = feature.point_coordinates();
        let properties = feature.properties.unwrap_or_default();
        // Enriched records carry their own verdict; raw ones are judged here
        let coords_valid = properties
            .get("coords_valid")
            .and_then(Value::as_bool)
            .unwrap_or(coordinates.is_some());

        PoiRecord {
            index,
            properties,
            coordinates,
            coords_valid,
        }
    }

    /// Name used for search and display, without the "Unnamed" default
    pub fn name(&self) -> Option<&str> {
        first_present(&self.properties, NAME_FIELDS)
    }

    pub fn display_name(&self) -> &str {
        self.name().unwrap_or(UNNAMED)
    }

    /// Category, absent on raw records that never went through enrichment
    pub fn category(&self) -> Option<&str> {
        first_present(&self.properties, CATEGORY_FIELDS)
    }

    pub fn display_category(&self) -> &str {
        self.category().unwrap_or(NO_CATEGORY)
    }

    pub fn is_eligible(&self, policy: &QueryPolicy) -> bool {
        !policy.exclude_invalid_coords || self.coords_valid
    }

    /// Coordinates usable for distance queries under `policy`
    pub fn located(&self, policy: &QueryPolicy) -> Option<(f64, f64)> {
        if self.is_eligible(policy) {
            self.coordinates
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Enriched,
    Raw,
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            SourceKind::Enriched => write!(f, "enriched"),
            SourceKind::Raw => write!(f, "raw"),
        }
    }
}

/// Candidate dataset file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataSource {
    pub kind: SourceKind,
    pub path: PathBuf,
}

/// Dataset files to try, in preference order
pub fn candidate_sources(data_dir: &Path) -> Vec<DataSource> {
    let source = |kind: SourceKind, name: String| DataSource {
        kind,
        path: data_dir.join(name),
    };
    vec![
        source(SourceKind::Enriched, ENRICHED_FILE.to_string()),
        source(SourceKind::Enriched, format!("{}.gz", ENRICHED_FILE)),
        source(SourceKind::Raw, RAW_FILE.to_string()),
        source(SourceKind::Raw, format!("{}.gz", RAW_FILE)),
    ]
}

/// First candidate for which `exists` holds
pub fn select_source<'a, F>(candidates: &'a [DataSource], exists: F) -> Option<&'a DataSource>
where
    F: Fn(&Path) -> bool,
{
    candidates.iter().find(|source| exists(&source.path))
}

/// Immutable, ordered POI store backing every request-time query
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialCollection {
    records: Vec<PoiRecord>,
    source: SourceKind,
}

impl SpatialCollection {
    pub fn from_features(features: Vec<Feature>, source: SourceKind) -> Self {
        let records = features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| PoiRecord::from_feature(index, feature))
            .collect();

        SpatialCollection { records, source }
    }

    /// Load the first existing candidate
    ///
    /// `Ok(None)` when no candidate exists. A candidate that exists but
    /// fails to parse is an error; later candidates are not tried.
    pub fn load(candidates: &[DataSource]) -> Result<Option<Self>, DatasetError> {
        let source = match select_source(candidates, Path::exists) {
            Some(source) => source,
            None => return Ok(None),
        };

        let collection = read_collection(&source.path)?;
        Ok(Some(Self::from_features(collection.features, source.kind)))
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PoiRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PoiRecord> {
        self.records.iter()
    }
}
