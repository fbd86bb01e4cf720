//! Service configuration
//!
//! Loaded in two layers: an optional JSON file named by `PAGESTITCH_CONFIG`,
//! then individual `PAGESTITCH_*` environment variables on top.

use pagestitch_core::{ConfigError, StitchConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_BIND: &str = "127.0.0.1:5000";

#[derive(Error, Debug)]
pub enum ServiceConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Socket address the server listens on
    pub bind: String,
    pub stitch: StitchConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            stitch: StitchConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ServiceConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServiceConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("PAGESTITCH_CONFIG") {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };

        if let Some(bind) = lookup("PAGESTITCH_BIND") {
            config.bind = bind;
        }
        if let Some(dir) = lookup("PAGESTITCH_TEMP_DIR") {
            config.stitch.stream.temp_dir = PathBuf::from(dir);
        }

        let stitch = &mut config.stitch;
        set_parsed(&lookup, "PAGESTITCH_RETRY_BUDGET", &mut stitch.acquisition.retry_budget)?;
        set_parsed(&lookup, "PAGESTITCH_PAGE_CEILING", &mut stitch.acquisition.page_ceiling)?;
        set_parsed(&lookup, "PAGESTITCH_JPEG_QUALITY", &mut stitch.encode.jpeg_quality)?;
        set_parsed(&lookup, "PAGESTITCH_RESIZE_FACTOR", &mut stitch.encode.resize_factor)?;
        set_parsed(&lookup, "PAGESTITCH_CHUNK_SIZE", &mut stitch.stream.chunk_size)?;

        if let Some(raw) = lookup("PAGESTITCH_SKIP_PAGES") {
            stitch.acquisition.skip_pages = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<u64>().map_err(|_| invalid("PAGESTITCH_SKIP_PAGES", &raw)))
                .collect::<Result<BTreeSet<u64>, ConfigError>>()?;
        }
        if let Some(raw) = lookup("PAGESTITCH_ACCEPT_INVALID_CERTS") {
            stitch.http.accept_invalid_certs = parse_bool(&raw)
                .ok_or_else(|| invalid("PAGESTITCH_ACCEPT_INVALID_CERTS", &raw))?;
        }
        if let Some(raw) = lookup("PAGESTITCH_TIMEOUT_SECS") {
            let secs: u64 = raw
                .parse()
                .map_err(|_| invalid("PAGESTITCH_TIMEOUT_SECS", &raw))?;
            stitch.http.timeout_secs = (secs > 0).then_some(secs);
        }

        config.stitch.validate()?;
        Ok(config)
    }

    fn from_file(path: PathBuf) -> Result<Self, ServiceConfigError> {
        let text = std::fs::read_to_string(&path).map_err(|source| ServiceConfigError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ServiceConfigError::Parse { path, source })
    }
}

fn set_parsed<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *target = raw.trim().parse().map_err(|_| invalid(key, &raw))?;
    }
    Ok(())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    }
}
