//! Configuration management for the document resolver

use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::remote::DEFAULT_DOWNLOAD_ENDPOINT;

const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 60;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub cache: CacheConfig,
    pub remote: RemoteConfig,
    /// Recent-documents file; no record is kept when unset
    pub recent_documents_path: Option<PathBuf>,
    /// External signature database; the builtin one is used when unset
    pub signature_db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    pub api_key: Option<String>,
    pub storage_bucket: Option<String>,
    pub download_endpoint: String,
    pub timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            dir: env::temp_dir().join("document-resolver"),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            api_key: None,
            storage_bucket: None,
            download_endpoint: DEFAULT_DOWNLOAD_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
        }
    }
}

impl RemoteConfig {
    /// Whether both Firebase settings are present
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.storage_bucket.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cache: CacheConfig::default(),
            remote: RemoteConfig::default(),
            recent_documents_path: None,
            signature_db_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let timeout_secs = match var("REMOTE_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    var: "REMOTE_TIMEOUT_SECS",
                    value,
                })?,
            None => DEFAULT_REMOTE_TIMEOUT_SECS,
        };

        Ok(Config {
            cache: CacheConfig {
                dir: var("CACHE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| CacheConfig::default().dir),
            },
            remote: RemoteConfig {
                api_key: var("FIREBASE_API_KEY"),
                storage_bucket: var("FIREBASE_STORAGE_BUCKET"),
                download_endpoint: var("DOWNLOAD_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_DOWNLOAD_ENDPOINT.to_string()),
                timeout_secs,
            },
            recent_documents_path: var("RECENT_DOCUMENTS_PATH").map(PathBuf::from),
            signature_db_path: var("SIGNATURE_DB_PATH").map(PathBuf::from),
        })
    }
}
