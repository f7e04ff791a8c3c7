/// `load_config` module: Loads the YAML config file, with environment secret injection, into the core `MirrorConfig`.
///
/// This module is the only place where user-supplied YAML is parsed and mapped to strongly-typed internal structs.
///
/// # Responsibilities
/// - Parse the config file (`config.yaml` by default) into type-safe Rust structs
/// - Inject secrets from the environment (`SYNC_S3_ACCESS_KEY`, `SYNC_S3_SECRET_ACCESS_KEY`) when set
/// - Resolve an empty `saveDir` to the current working directory
/// - Produce clear diagnostics: any failure here is fatal at the CLI boundary
///
/// # Accepted schema
/// ```yaml
/// version: "1"
/// s3:
///   endpoint: minio.example.com:9000
///   accessKey: ...
///   secretAccessKey: ...
///   bucket: media
///   region: us-east-1   # optional
///   secure: true        # optional
/// saveDir: /srv/media   # optional
/// pollInterval: 10      # optional, seconds
/// ```
///
/// # Errors
/// All errors in this module use `anyhow::Error` for context-rich diagnostics.
use anyhow::{Context, Result};
use bucket_mirror_core::config::{MirrorConfig, StorageConfig, DEFAULT_POLL_INTERVAL, DEFAULT_REGION};
use bucket_mirror_core::progress::ProgressDisplay;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

/// Environment variable overriding `s3.accessKey`.
pub const ACCESS_KEY_ENV: &str = "SYNC_S3_ACCESS_KEY";
/// Environment variable overriding `s3.secretAccessKey`.
pub const SECRET_KEY_ENV: &str = "SYNC_S3_SECRET_ACCESS_KEY";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    #[serde(default)]
    version: Option<String>,
    s3: S3Section,
    #[serde(default)]
    save_dir: Option<PathBuf>,
    #[serde(default)]
    poll_interval: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct S3Section {
    endpoint: String,
    #[serde(default)]
    access_key: String,
    #[serde(default)]
    secret_access_key: String,
    bucket: String,
    #[serde(default)]
    region: Option<String>,
    #[serde(default = "default_secure")]
    secure: bool,
}

fn default_secure() -> bool {
    true
}

/// Loads the YAML config file at `path` and resolves it into a [`MirrorConfig`].
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MirrorConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config = parse_config(&config_content)?;
    info!(config_path = ?path_ref, "Config loaded successfully");
    Ok(config)
}

/// Parses YAML text and resolves it into a [`MirrorConfig`].
pub fn parse_config(content: &str) -> Result<MirrorConfig> {
    let raw: RawConfig = match serde_yaml::from_str(content) {
        Ok(conf) => conf,
        Err(e) => {
            error!(error = ?e, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if let Some(version) = &raw.version {
        info!(version = %version, "Config file version");
    }

    let mut s3 = raw.s3;
    if let Ok(key) = std::env::var(ACCESS_KEY_ENV) {
        info!("{} found in env, overriding s3.accessKey", ACCESS_KEY_ENV);
        s3.access_key = key;
    }
    if let Ok(secret) = std::env::var(SECRET_KEY_ENV) {
        info!("{} found in env, overriding s3.secretAccessKey", SECRET_KEY_ENV);
        s3.secret_access_key = secret;
    }

    if s3.endpoint.trim().is_empty() {
        anyhow::bail!("s3.endpoint must not be empty");
    }
    if s3.bucket.trim().is_empty() {
        anyhow::bail!("s3.bucket must not be empty");
    }
    if s3.access_key.is_empty() || s3.secret_access_key.is_empty() {
        warn!("S3 credentials are incomplete, requests will likely be rejected");
    }

    let poll_interval = match raw.poll_interval {
        Some(0) => anyhow::bail!("pollInterval must be at least 1 second"),
        Some(secs) => Duration::from_secs(secs),
        None => DEFAULT_POLL_INTERVAL,
    };

    let sync_dir = resolve_sync_dir(raw.save_dir)?;

    Ok(MirrorConfig {
        storage: StorageConfig {
            endpoint: s3.endpoint,
            access_key: s3.access_key,
            secret_key: s3.secret_access_key,
            bucket: s3.bucket,
            region: s3.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
            secure: s3.secure,
        },
        sync_dir,
        poll_interval,
        progress: ProgressDisplay::Bar,
    })
}

/// An unset or empty `saveDir` means the current working directory.
pub fn resolve_sync_dir(save_dir: Option<PathBuf>) -> Result<PathBuf> {
    match save_dir {
        Some(dir) if !dir.as_os_str().is_empty() => Ok(dir),
        _ => {
            info!("saveDir not set, using working directory");
            std::env::current_dir().context("failed to read working directory")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_save_dir_is_kept() {
        let dir = resolve_sync_dir(Some(PathBuf::from("/srv/media"))).unwrap();
        assert_eq!(dir, PathBuf::from("/srv/media"));
    }

    #[test]
    fn empty_save_dir_falls_back_to_working_directory() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(resolve_sync_dir(Some(PathBuf::new())).unwrap(), cwd);
        assert_eq!(resolve_sync_dir(None).unwrap(), cwd);
    }
}
