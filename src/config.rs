use anyhow::{bail, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Which records request-time queries may return
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryPolicy {
    /// Drop records whose `coords_valid` is false even if their geometry parses
    pub exclude_invalid_coords: bool,
}

/// Parameters of the precomputed category buffer
#[derive(Clone, Debug, PartialEq)]
pub struct BufferSpec {
    pub category: String,
    pub radius_km: f64,
    /// Vertices per disk
    pub steps: usize,
}

impl Default for BufferSpec {
    fn default() -> Self {
        BufferSpec {
            category: "Health".to_string(),
            radius_km: 0.5,
            steps: 64,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoutingSettings {
    pub base_url: String,
    pub profile: String,
    pub timeout: Duration,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        RoutingSettings {
            base_url: "https://router.project-osrm.org".to_string(),
            profile: "driving".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "mapify")]
#[command(about = "POI geocoding, search, buffer and routing server", long_about = None)]
pub struct ServerConfig {
    /// Directory holding enrichedPois.geojson / rawPois.geojson
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Port to serve on
    #[arg(long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Base URL of the OSRM routing provider
    #[arg(long, env = "OSRM_URL", default_value = "https://router.project-osrm.org")]
    pub osrm_url: String,

    /// OSRM profile (driving, walking, cycling)
    #[arg(long, default_value = "driving")]
    pub osrm_profile: String,

    /// Timeout for a single routing call, in seconds
    #[arg(long, default_value = "15")]
    pub route_timeout_secs: u64,

    /// Category whose POIs get a precomputed buffer
    #[arg(long, default_value = "Health")]
    pub buffer_category: String,

    /// Buffer radius in kilometers
    #[arg(long, default_value = "0.5")]
    pub buffer_radius_km: f64,

    /// Vertices per buffer disk
    #[arg(long, default_value = "64")]
    pub buffer_steps: usize,

    /// Exclude records flagged coords_valid=false from all queries
    #[arg(long, default_value_t = false)]
    pub exclude_invalid_coords: bool,

    /// Extra allowed CORS origin
    #[arg(long, env = "FRONTEND_URL")]
    pub frontend_url: Option<String>,

    /// Enforce the CORS origin allow-list
    #[arg(long, env = "PRODUCTION", default_value_t = false)]
    pub production: bool,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.buffer_radius_km.is_finite() && self.buffer_radius_km > 0.0) {
            bail!("buffer radius must be a positive number, got {}", self.buffer_radius_km);
        }
        if self.buffer_steps < 4 {
            bail!("buffer steps must be at least 4, got {}", self.buffer_steps);
        }
        if self.route_timeout_secs == 0 {
            bail!("route timeout must be at least 1 second");
        }
        if !(self.osrm_url.starts_with("http://") || self.osrm_url.starts_with("https://")) {
            bail!("OSRM url must be http(s): {}", self.osrm_url);
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.bind, self.port).parse()?)
    }

    pub fn query_policy(&self) -> QueryPolicy {
        QueryPolicy {
            exclude_invalid_coords: self.exclude_invalid_coords,
        }
    }

    pub fn buffer_spec(&self) -> BufferSpec {
        BufferSpec {
            category: self.buffer_category.clone(),
            radius_km: self.buffer_radius_km,
            steps: self.buffer_steps,
        }
    }

    pub fn routing(&self) -> RoutingSettings {
        RoutingSettings {
            base_url: self.osrm_url.clone(),
            profile: self.osrm_profile.clone(),
            timeout: Duration::from_secs(self.route_timeout_secs),
        }
    }
}
