use crate::config::{BufferSpec, QueryPolicy, ServerConfig};
use crate::error::{QueryError, QueryResult};
use crate::geojson::FeatureCollection;
use crate::routing::OsrmClient;
use crate::spatial::{buffer, candidate_sources, PoiTree, SourceKind, SpatialCollection};
use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Everything the request handlers read, built once before serving
///
/// Nothing in here is mutated after construction, so handlers share it
/// behind an `Arc` without locks.
pub struct AppContext {
    collection: Option<SpatialCollection>,
    tree: Option<PoiTree>,
    buffers: Option<BufferDocument>,
    buffer_category: String,
    pub router: OsrmClient,
    pub policy: QueryPolicy,
    pub started_at: DateTime<Utc>,
}

/// Buffer collection serialized once at load; clones share the buffer
#[derive(Clone, Debug, PartialEq)]
pub struct BufferDocument {
    pub features: usize,
    pub json: Bytes,
}

impl BufferDocument {
    fn encode(collection: &FeatureCollection) -> Result<Self, serde_json::Error> {
        Ok(BufferDocument {
            features: collection.len(),
            json: Bytes::from(serde_json::to_vec(collection)?),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.features == 0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodingStatus {
    pub status: &'static str,
    pub geocoding: &'static str,
    pub poi_data_loaded: bool,
    pub poi_count: usize,
    pub health_buffers: bool,
}

impl AppContext {
    /// Derive the index and buffers from an already loaded collection
    pub fn new(
        collection: Option<SpatialCollection>,
        spec: &BufferSpec,
        policy: QueryPolicy,
        router: OsrmClient,
    ) -> Self {
        let tree = collection
            .as_ref()
            .map(|c| PoiTree::from_collection(c, &policy));

        let buffers = collection
            .as_ref()
            .and_then(|c| buffer(Some(c), spec, &policy).ok())
            .and_then(|fc| match BufferDocument::encode(&fc) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    log::error!("Failed to serialize {} buffers: {}", spec.category, e);
                    None
                }
            });

        match &buffers {
            Some(doc) if doc.is_empty() => {
                log::warn!("No {} POIs found, buffer collection is empty", spec.category)
            }
            Some(doc) => log::info!(
                "Computed {} {} buffers ({} km)",
                doc.features,
                spec.category,
                spec.radius_km
            ),
            None => {}
        }

        AppContext {
            collection,
            tree,
            buffers,
            buffer_category: spec.category.clone(),
            router,
            policy,
            started_at: Utc::now(),
        }
    }

    /// Load the dataset named by `config` and build the shared state
    ///
    /// A missing or unreadable dataset is logged and leaves the context
    /// without data; the server still starts and reports 503 on queries.
    pub fn load(config: &ServerConfig) -> Self {
        let candidates = candidate_sources(&config.data_dir);

        let collection = match SpatialCollection::load(&candidates) {
            Ok(Some(collection)) => {
                match collection.source() {
                    SourceKind::Enriched => log::info!(
                        "Loaded {} enriched POIs from {:?}",
                        collection.len(),
                        config.data_dir
                    ),
                    SourceKind::Raw => log::warn!(
                        "Enriched POIs not found, falling back to {} raw POIs from {:?}",
                        collection.len(),
                        config.data_dir
                    ),
                }
                Some(collection)
            }
            Ok(None) => {
                log::warn!(
                    "No POI data found in {:?}, geocoding endpoints will not work",
                    config.data_dir
                );
                None
            }
            Err(e) => {
                log::error!("Failed to load POI data from {:?}: {}", config.data_dir, e);
                None
            }
        };

        Self::new(
            collection,
            &config.buffer_spec(),
            config.query_policy(),
            OsrmClient::new(&config.routing()),
        )
    }

    pub fn collection(&self) -> QueryResult<&SpatialCollection> {
        self.collection
            .as_ref()
            .ok_or_else(|| QueryError::unavailable("POI data not loaded"))
    }

    pub fn tree(&self) -> QueryResult<(&SpatialCollection, &PoiTree)> {
        match (self.collection.as_ref(), self.tree.as_ref()) {
            (Some(collection), Some(tree)) => Ok((collection, tree)),
            _ => Err(QueryError::unavailable("POI data not loaded")),
        }
    }

    pub fn buffers(&self) -> QueryResult<&BufferDocument> {
        self.buffers.as_ref().ok_or_else(|| {
            QueryError::unavailable(format!("{} buffers not available", self.buffer_category))
        })
    }

    /// Optional view used by queries that order their own checks
    pub fn loaded(&self) -> Option<&SpatialCollection> {
        self.collection.as_ref()
    }

    pub fn status(&self) -> GeocodingStatus {
        GeocodingStatus {
            status: "ok",
            geocoding: "enabled",
            poi_data_loaded: self.collection.is_some(),
            poi_count: self.collection.as_ref().map_or(0, |c| c.len()),
            health_buffers: self.buffers.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoutingSettings;
    use crate::geojson::{write_collection, Feature, Properties};
    use crate::spatial::collection::{ENRICHED_FILE, RAW_FILE};
    use clap::Parser;
    use serde_json::json;
    use std::fs;

    fn poi(name: &str, category: &str, lon: f64, lat: f64) -> Feature {
        let mut props = Properties::new();
        props.insert("name".into(), json!(name));
        props.insert("category".into(), json!(category));
        Feature::point(lon, lat, props)
    }

    fn config_for(dir: &std::path::Path) -> ServerConfig {
        ServerConfig::try_parse_from(["mapify", "--data-dir", dir.to_str().unwrap()]).unwrap()
    }

    #[test]
    fn test_without_data() {
        let ctx = AppContext::new(
            None,
            &BufferSpec::default(),
            QueryPolicy::default(),
            OsrmClient::new(&RoutingSettings::default()),
        );

        assert!(matches!(ctx.collection(), Err(QueryError::DataUnavailable(_))));
        assert!(matches!(ctx.tree(), Err(QueryError::DataUnavailable(_))));
        assert_eq!(
            ctx.buffers().unwrap_err(),
            QueryError::unavailable("Health buffers not available")
        );

        let status = ctx.status();
        assert!(!status.poi_data_loaded);
        assert_eq!(status.poi_count, 0);
        assert!(!status.health_buffers);
    }

    #[test]
    fn test_load_enriched_dataset() {
        let dir = tempfile::tempdir().unwrap();
        write_collection(
            &dir.path().join(ENRICHED_FILE),
            &FeatureCollection::new(vec![
                poi("PIMS Hospital", "Health", 73.048, 33.685),
                poi("Faisal Mosque", "Religious", 73.037, 33.729),
            ]),
        )
        .unwrap();

        let ctx = AppContext::load(&config_for(dir.path()));
        assert_eq!(ctx.collection().unwrap().source(), SourceKind::Enriched);
        assert_eq!(ctx.tree().unwrap().1.poi_count(), 2);
        let buffers = ctx.buffers().unwrap();
        assert_eq!(buffers.features, 1);
        let decoded = FeatureCollection::from_json(std::str::from_utf8(&buffers.json).unwrap()).unwrap();
        assert_eq!(decoded.features[0].property("name"), Some(&json!("PIMS Hospital")));

        let status = serde_json::to_value(ctx.status()).unwrap();
        assert_eq!(
            status,
            json!({
                "status": "ok",
                "geocoding": "enabled",
                "poiDataLoaded": true,
                "poiCount": 2,
                "healthBuffers": true
            })
        );
    }

    #[test]
    fn test_loaded_without_health_pois_has_empty_buffers() {
        let dir = tempfile::tempdir().unwrap();
        write_collection(
            &dir.path().join(RAW_FILE),
            &FeatureCollection::new(vec![poi("Faisal Mosque", "Religious", 73.037, 33.729)]),
        )
        .unwrap();

        let ctx = AppContext::load(&config_for(dir.path()));
        assert_eq!(ctx.collection().unwrap().source(), SourceKind::Raw);
        assert!(ctx.buffers().unwrap().is_empty());
        assert!(ctx.status().health_buffers);
    }

    #[test]
    fn test_malformed_dataset_leaves_context_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(ENRICHED_FILE), "{\"type\": \"Feature\"}").unwrap();

        let ctx = AppContext::load(&config_for(dir.path()));
        assert!(ctx.loaded().is_none());
        assert!(!ctx.status().poi_data_loaded);
    }
}
