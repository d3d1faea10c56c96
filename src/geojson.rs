//! Minimal GeoJSON feature-collection model.
//!
//! Only the parts the POI pipeline touches are typed; geometry and any
//! foreign members are carried through as raw JSON so that nothing in the
//! source document is lost on a read/write cycle.

use crate::error::DatasetError;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Free-form properties object of a feature
pub type Properties = Map<String, Value>;

fn feature_type() -> String {
    "Feature".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    #[serde(default)]
    pub geometry: Option<Value>,
    #[serde(default)]
    pub properties: Option<Properties>,
    #[serde(flatten)]
    pub foreign: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: Value, properties: Properties) -> Self {
        Feature {
            kind: feature_type(),
            geometry: Some(geometry),
            properties: Some(properties),
            foreign: Map::new(),
        }
    }

    /// Point feature with the given properties, coordinates as (lon, lat)
    pub fn point(lon: f64, lat: f64, properties: Properties) -> Self {
        let geometry = serde_json::json!({
            "type": "Point",
            "coordinates": [lon, lat],
        });
        Self::new(geometry, properties)
    }

    /// Raw `geometry.coordinates` member, if any
    pub fn coordinates(&self) -> Option<&Value> {
        self.geometry.as_ref()?.get("coordinates")
    }

    /// `geometry.coordinates` as (lon, lat) when it is exactly two finite numbers
    pub fn point_coordinates(&self) -> Option<(f64, f64)> {
        self.coordinates().and_then(coordinate_pair)
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.as_ref()?.get(key)
    }
}

/// Interpret a JSON value as a well-formed `[lon, lat]` pair
pub fn coordinate_pair(value: &Value) -> Option<(f64, f64)> {
    match value.as_array()?.as_slice() {
        [lon, lat] => {
            let lon = lon.as_f64().filter(|v| v.is_finite())?;
            let lat = lat.as_f64().filter(|v| v.is_finite())?;
            Some((lon, lat))
        }
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
    #[serde(flatten)]
    pub foreign: Map<String, Value>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        FeatureCollection {
            kind: "FeatureCollection".to_string(),
            features,
            foreign: Map::new(),
        }
    }

    /// Validate and convert a parsed JSON document
    pub fn from_value(value: Value) -> Result<Self, DatasetError> {
        match value.get("type").and_then(Value::as_str) {
            Some("FeatureCollection") => {}
            Some(other) => {
                return Err(DatasetError::Malformed(format!(
                    "expected type \"FeatureCollection\", found \"{}\"",
                    other
                )))
            }
            None => {
                return Err(DatasetError::Malformed(
                    "missing \"type\" member".to_string(),
                ))
            }
        }

        let features = value
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| DatasetError::Malformed("missing \"features\" array".to_string()))?;

        if let Some(pos) = features.iter().position(|f| !f.is_object()) {
            return Err(DatasetError::Malformed(format!(
                "feature {} is not an object",
                pos
            )));
        }

        serde_json::from_value(value).map_err(|e| DatasetError::Malformed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, DatasetError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "gz")
}

/// Read a feature collection from disk, gunzipping `*.gz` paths
pub fn read_collection(path: &Path) -> Result<FeatureCollection, DatasetError> {
    let file = File::open(path)?;
    let mut json = String::new();

    if is_gzip(path) {
        GzDecoder::new(file).read_to_string(&mut json)?;
    } else {
        BufReader::new(file).read_to_string(&mut json)?;
    }

    FeatureCollection::from_json(&json)
}

/// Write a feature collection as indented JSON, gzipping `*.gz` paths
///
/// The document goes to a hidden sibling temp file first and is renamed
/// over `path` only once fully written, so readers never see a partial file.
pub fn write_collection(path: &Path, collection: &FeatureCollection) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    let result = write_to(&tmp, is_gzip(path), collection).and_then(|_| {
        fs::rename(&tmp, path)?;
        Ok(())
    });

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_to(path: &Path, gzip: bool, collection: &FeatureCollection) -> Result<(), DatasetError> {
    let writer = BufWriter::new(File::create(path)?);

    if gzip {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        serde_json::to_writer_pretty(&mut encoder, collection)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = writer;
        serde_json::to_writer_pretty(&mut writer, collection)?;
        writer.flush()?;
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "collection".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "name": "islamabad_pois",
        "features": [
            {
                "type": "Feature",
                "id": 7,
                "geometry": {"type": "Point", "coordinates": [73.048, 33.685]},
                "properties": {"name": "PIMS Hospital", "amenity": "hospital"}
            },
            {
                "type": "Feature",
                "geometry": null,
                "properties": null
            }
        ]
    }"#;

    #[test]
    fn test_parse_collection() {
        let fc = FeatureCollection::from_json(SAMPLE).unwrap();
        assert_eq!(fc.len(), 2);
        assert_eq!(fc.foreign.get("name"), Some(&json!("islamabad_pois")));

        let first = &fc.features[0];
        assert_eq!(first.point_coordinates(), Some((73.048, 33.685)));
        assert_eq!(first.property("name"), Some(&json!("PIMS Hospital")));
        assert_eq!(first.foreign.get("id"), Some(&json!(7)));

        let second = &fc.features[1];
        assert!(second.geometry.is_none());
        assert!(second.properties.is_none());
        assert_eq!(second.point_coordinates(), None);
    }

    #[test]
    fn test_reject_malformed() {
        assert!(matches!(
            FeatureCollection::from_json(r#"{"features": []}"#),
            Err(DatasetError::Malformed(_))
        ));
        assert!(matches!(
            FeatureCollection::from_json(r#"{"type": "Feature", "features": []}"#),
            Err(DatasetError::Malformed(_))
        ));
        assert!(matches!(
            FeatureCollection::from_json(r#"{"type": "FeatureCollection"}"#),
            Err(DatasetError::Malformed(_))
        ));
        assert!(matches!(
            FeatureCollection::from_json(r#"{"type": "FeatureCollection", "features": [1]}"#),
            Err(DatasetError::Malformed(_))
        ));
        assert!(matches!(
            FeatureCollection::from_json("[1, 2"),
            Err(DatasetError::Json(_))
        ));
    }

    #[test]
    fn test_coordinate_pair() {
        assert_eq!(coordinate_pair(&json!([73.0, 33.5])), Some((73.0, 33.5)));
        assert_eq!(coordinate_pair(&json!([73, 33])), Some((73.0, 33.0)));
        assert_eq!(coordinate_pair(&json!([73.0])), None);
        assert_eq!(coordinate_pair(&json!([73.0, 33.5, 500.0])), None);
        assert_eq!(coordinate_pair(&json!(["73.0", 33.5])), None);
        assert_eq!(coordinate_pair(&json!({"lon": 73.0})), None);
        assert_eq!(coordinate_pair(&Value::Null), None);
    }

    #[test]
    fn test_write_read_plain_and_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let fc = FeatureCollection::from_json(SAMPLE).unwrap();

        for name in ["pois.geojson", "pois.geojson.gz"] {
            let path = dir.path().join(name);
            write_collection(&path, &fc).unwrap();
            assert!(!temp_path(&path).exists());

            let loaded = read_collection(&path).unwrap();
            assert_eq!(loaded, fc);
        }

        // Plain output is indented JSON
        let text = fs::read_to_string(dir.path().join("pois.geojson")).unwrap();
        assert!(text.contains("\n  \"features\""));
    }

    #[test]
    fn test_failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let fc = FeatureCollection::from_json(SAMPLE).unwrap();

        // A directory squatting on the output path makes the rename fail
        let path = dir.path().join("pois.geojson");
        fs::create_dir(&path).unwrap();

        assert!(write_collection(&path, &fc).is_err());
        assert!(!temp_path(&path).exists());
        assert!(path.is_dir());
    }

    #[test]
    fn test_failed_write_keeps_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pois.geojson");
        let previous = FeatureCollection::new(vec![]);
        write_collection(&path, &previous).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        // Temp file cannot be created, so nothing is written
        fs::create_dir(temp_path(&path)).unwrap();
        let fc = FeatureCollection::from_json(SAMPLE).unwrap();
        assert!(write_collection(&path, &fc).is_err());

        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert_eq!(read_collection(&path).unwrap(), previous);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_collection(&dir.path().join("nope.geojson"));
        assert!(matches!(result, Err(DatasetError::Io(_))));
    }
}
