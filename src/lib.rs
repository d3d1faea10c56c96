pub mod config;
pub mod context;
pub mod coords;
pub mod error;
pub mod geojson;
pub mod poi;
pub mod routing;
pub mod server;
pub mod spatial;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::{DatasetError, QueryError, QueryResult};
