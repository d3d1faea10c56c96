pub mod buffer;
pub mod collection;
pub mod index;
pub mod nearest;
pub mod search;

pub use buffer::{buffer, disk};
pub use collection::{
    candidate_sources, first_present, select_source, DataSource, PoiRecord, SourceKind,
    SpatialCollection, CATEGORY_FIELDS, NAME_FIELDS,
};
pub use index::PoiTree;
pub use nearest::{haversine_km, nearest, round_km, Nearest};
pub use search::{search, MAX_SEARCH_RESULTS};
