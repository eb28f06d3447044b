//! Process configuration.
//!
//! Loaded from environment variables with sane defaults; the data
//! directory falls back to a platform-specific location via `directories`,
//! mirroring the teacher's `ProjectDirs`-based `Storage::new(None)` pattern.

use std::path::PathBuf;
use std::time::Duration;

/// Routing embedding dimension (compressed, module-selection only).
pub const D_ROUTE: usize = 512;
/// Full embedding dimension (stored on every memory, used for in-module search).
pub const D_FULL: usize = 1536;

#[derive(Debug, Clone)]
pub struct Config {
    pub d_route: usize,
    pub d_full: usize,
    /// Cosine similarity a CMI row must clear to contribute to routing confidence.
    pub route_confidence_threshold: f32,
    /// Routing decision cache TTL (spec §3: "TTL: 5 minutes").
    pub routing_cache_ttl: Duration,
    /// How often the reconciliation job sweeps module tables against the CMI.
    pub reconciliation_interval: Duration,
    /// Bounded horizon for compensating CMI-index retries (spec §4.5: "~30 minutes").
    pub reconciliation_horizon: Duration,
    /// Bound on concurrent connections to the vector store (spec §5: "≤ ~20").
    pub vector_pool_size: usize,
    /// SSE keep-alive interval (spec §6: "every 30 seconds").
    pub sse_ping_interval: Duration,
    /// SSE idle-subscriber cleanup (spec §6: "5-minute idle cleanup").
    pub sse_idle_timeout: Duration,
    /// Window over which access-count increments are coalesced before
    /// flushing (spec §9 Open Questions: "an implementer may batch them").
    pub access_count_batch_window: Duration,
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            d_route: D_ROUTE,
            d_full: D_FULL,
            route_confidence_threshold: 0.7,
            routing_cache_ttl: Duration::from_secs(300),
            reconciliation_interval: Duration::from_secs(60),
            reconciliation_horizon: Duration::from_secs(30 * 60),
            vector_pool_size: 20,
            sse_ping_interval: Duration::from_secs(30),
            sse_idle_timeout: Duration::from_secs(300),
            access_count_batch_window: Duration::from_secs(2),
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut cfg = Config::default();

        if let Ok(v) = std::env::var("FEDMEM_ROUTE_CONFIDENCE_THRESHOLD") {
            if let Ok(parsed) = v.parse() {
                cfg.route_confidence_threshold = parsed;
            }
        }
        if let Ok(v) = std::env::var("FEDMEM_ROUTING_CACHE_TTL_SECS") {
            if let Ok(parsed) = v.parse() {
                cfg.routing_cache_ttl = Duration::from_secs(parsed);
            }
        }
        if let Ok(v) = std::env::var("FEDMEM_RECONCILIATION_INTERVAL_SECS") {
            if let Ok(parsed) = v.parse() {
                cfg.reconciliation_interval = Duration::from_secs(parsed);
            }
        }
        if let Ok(v) = std::env::var("FEDMEM_VECTOR_POOL_SIZE") {
            if let Ok(parsed) = v.parse() {
                cfg.vector_pool_size = parsed;
            }
        }
        if let Ok(v) = std::env::var("FEDMEM_DATA_DIR") {
            cfg.data_dir = PathBuf::from(v);
        }

        cfg
    }
}

fn default_data_dir() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("dev", "fedmem", "fedmem") {
        return proj_dirs.data_dir().to_path_buf();
    }
    PathBuf::from(".fedmem")
}
