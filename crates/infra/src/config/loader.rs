//! Configuration loader.
//!
//! Loads pipeline configuration from environment variables first, falling
//! back to a config file (TOML or JSON, detected by extension).
//!
//! ## Environment variables
//! - `BEACON_DB_PATH`: SQLite file holding pending calls
//! - `BEACON_API_HOST`: ingest endpoint host
//! - `BEACON_API_PATH`: ingest endpoint path (default `/api`)
//! - `BEACON_API_USE_TLS`: https on/off (default on)
//! - `BEACON_APP_ID`, `BEACON_CLIENT_KEY`: app credentials
//! - `BEACON_DEVICE_ID`, `BEACON_USER_ID`: reporting identity
//! - `BEACON_UPLOAD_INTERVAL`: flush interval in minutes, one of 5/10/15
//!   (default 15)
//! - `BEACON_SEND_HEARTBEAT`: heartbeat per tick on/off (default on)

use std::path::{Path, PathBuf};

use beacon_domain::{
    BeaconError, Config, DatabaseConfig, DeliveryConfig, EndpointConfig, Result, UploadInterval,
};
use tracing::{debug, info};

/// Load configuration, environment first, file fallback.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            info!("configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            debug!(error = %e, "environment configuration incomplete, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables only.
pub fn load_from_env() -> Result<Config> {
    let database = DatabaseConfig { path: env_var("BEACON_DB_PATH")? };

    let endpoint = EndpointConfig {
        host: env_var("BEACON_API_HOST")?,
        path: std::env::var("BEACON_API_PATH").unwrap_or_else(|_| "/api".to_string()),
        use_tls: env_bool("BEACON_API_USE_TLS", true),
        app_id: env_var("BEACON_APP_ID")?,
        client_key: env_var("BEACON_CLIENT_KEY")?,
        device_id: env_var("BEACON_DEVICE_ID")?,
        user_id: env_var("BEACON_USER_ID")?,
    };

    let upload_interval = match std::env::var("BEACON_UPLOAD_INTERVAL") {
        Ok(raw) => {
            let minutes = raw.parse::<u64>().map_err(|e| {
                BeaconError::Config(format!("invalid BEACON_UPLOAD_INTERVAL: {e}"))
            })?;
            parse_interval(minutes)?
        }
        Err(_) => UploadInterval::default(),
    };

    let delivery =
        DeliveryConfig { upload_interval, send_heartbeat: env_bool("BEACON_SEND_HEARTBEAT", true) };

    Ok(Config { database, delivery, endpoint })
}

/// Load configuration from a file.
///
/// With no explicit `path`, probes `beacon.toml` / `beacon.json` in the
/// working directory and next to the executable.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(BeaconError::Config(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            BeaconError::Config("no config file found in any standard location".to_string())
        })?,
    };

    info!(path = %config_path.display(), "loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| BeaconError::Config(format!("failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("toml") {
        "toml" => toml::from_str(contents)
            .map_err(|e| BeaconError::Config(format!("invalid TOML config: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| BeaconError::Config(format!("invalid JSON config: {e}"))),
        other => Err(BeaconError::Config(format!("unsupported config format: {other}"))),
    }
}

fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join("beacon.toml"));
        candidates.push(cwd.join("beacon.json"));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            candidates.push(dir.join("beacon.toml"));
            candidates.push(dir.join("beacon.json"));
        }
    }

    candidates.into_iter().find(|p| p.exists())
}

/// Map a minute count onto one of the recognized upload intervals.
pub fn parse_interval(minutes: u64) -> Result<UploadInterval> {
    match minutes {
        5 => Ok(UploadInterval::Minutes5),
        10 => Ok(UploadInterval::Minutes10),
        15 => Ok(UploadInterval::Minutes15),
        other => Err(BeaconError::Config(format!(
            "unsupported upload interval {other} minutes; expected 5, 10, or 15"
        ))),
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| BeaconError::Config(format!("missing required environment variable: {key}")))
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
