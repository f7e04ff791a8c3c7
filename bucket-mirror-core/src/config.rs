use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use crate::progress::ProgressDisplay;

/// Delay between two passes in continuous mode.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Region sent to S3-compatible servers that do not care about regions.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for the object-storage backend.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// `host[:port]`, or a full URL if it carries its own scheme.
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
    /// Use TLS when the endpoint has no scheme.
    pub secure: bool,
}

impl StorageConfig {
    /// Endpoint as a URL suitable for an HTTP client.
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.contains("://") {
            return self.endpoint.clone();
        }
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}", self.endpoint)
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("secure", &self.secure)
            .finish()
    }
}

/// Everything the reconciliation loop needs, fully resolved.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub storage: StorageConfig,
    /// Local directory treated as the mirror target.
    pub sync_dir: PathBuf,
    pub poll_interval: Duration,
    pub progress: ProgressDisplay,
}

impl MirrorConfig {
    pub fn trace_loaded(&self) {
        info!(
            endpoint = %self.storage.endpoint_url(),
            bucket = %self.storage.bucket,
            sync_dir = %self.sync_dir.display(),
            poll_interval_secs = self.poll_interval.as_secs_f64(),
            "Loaded MirrorConfig"
        );
        debug!(?self, "MirrorConfig loaded (full debug)");
    }
}
