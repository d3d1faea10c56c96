pub mod classify;
pub mod enrich;
pub mod normalize;

pub use classify::{classify, Category, CATEGORY_RULES};
pub use enrich::{enrich, enrich_feature, enrich_records, EnrichSummary, ENRICHMENT_SOURCE};
pub use normalize::{collapse_whitespace, normalize, EnrichedPoi, RawPoi, NO_ADDRESS};
