//! Per-engine tuning knobs.

use serde::{Deserialize, Serialize};

/// Configuration threaded through the builder into every component that
/// needs it. One value per engine; the defaults describe a polite
/// general-purpose crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Maximum BFS depth enforced by the depth middleware; 0 disables it.
    pub depth_limit: i64,
    /// Multiply each delay by a uniform factor in `[0.5, 1.5)`.
    pub randomize_delay: bool,
    /// Seconds to pause before each download.
    pub download_delay: f64,
    pub retry_enabled: bool,
    /// How often a failed download may be re-yielded.
    pub retry_times: i64,
    /// Per-request HTTP timeout in seconds.
    pub timeout: f64,
    /// Size of the concurrency gate: how many requests run at once.
    pub concurrent_requests: usize,
    /// Sent verbatim when non-empty.
    pub user_agent: String,
    /// Root directory for the file pipeline's downloads.
    pub file_save_dir: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        CrawlConfig {
            depth_limit: 0,
            randomize_delay: true,
            download_delay: 2.0,
            retry_enabled: true,
            retry_times: 3,
            timeout: 30.0,
            concurrent_requests: 32,
            user_agent: String::new(),
            file_save_dir: "./files".to_owned(),
        }
    }
}
