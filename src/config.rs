use std::{fs, path::Path, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "conf/cdnapi.yaml";
const DEFAULT_BUCKET: &str = "images";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
}

// --- START STORAGE CONFIG ---

/// Object store flavour. Both speak the S3 protocol.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    S3,
    Minio,
}

impl FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" | "0" => Ok(StorageType::S3),
            "minio" | "1" => Ok(StorageType::Minio),
            other => Err(format!("unknown storage type: {}", other)),
        }
    }
}

// Accepts the same names and numeric codes as the environment.
impl<'de> Deserialize<'de> for StorageType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Name(String),
            Code(u64),
        }

        let raw = match Raw::deserialize(deserializer)? {
            Raw::Name(name) => name,
            Raw::Code(code) => code.to_string(),
        };
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Connection settings for the object store. Blank region, blank host and
/// a zero port all mean "use the default".
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StorageConfig {
    #[serde(rename = "type", default)]
    pub storage_type: StorageType,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub bucket_prefix: String,
}

impl StorageConfig {
    pub fn bucket_name(&self, bucket: &str) -> String {
        format!("{}{}", self.bucket_prefix, bucket)
    }
}

// --- PARTIAL STORAGE CONFIG for merging ---

#[derive(Debug, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialStorageConfig {
    #[serde(rename = "type")]
    pub storage_type: Option<StorageType>,
    pub region: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub ssl: Option<bool>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub bucket_prefix: Option<String>,
}

impl PartialStorageConfig {
    fn merge_into(self, final_config: &mut StorageConfig) {
        if let Some(storage_type) = self.storage_type { final_config.storage_type = storage_type; }
        if let Some(region) = self.region { final_config.region = region; }
        if let Some(host) = self.host { final_config.host = host; }
        if let Some(port) = self.port { final_config.port = port; }
        if let Some(ssl) = self.ssl { final_config.ssl = ssl; }
        if let Some(access_key) = self.access_key { final_config.access_key = access_key; }
        if let Some(secret_key) = self.secret_key { final_config.secret_key = secret_key; }
        if let Some(bucket_prefix) = self.bucket_prefix { final_config.bucket_prefix = bucket_prefix; }
    }

    fn is_empty(&self) -> bool {
        self.storage_type.is_none()
            && self.region.is_none()
            && self.host.is_none()
            && self.port.is_none()
            && self.ssl.is_none()
            && self.access_key.is_none()
            && self.secret_key.is_none()
            && self.bucket_prefix.is_none()
    }
}

#[derive(Debug, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialServerConfig {
    pub port: Option<u16>,
}

// Used for deserializing user-provided config files where all fields are optional.
#[derive(Debug, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    pub host: Option<String>,
    pub server: Option<PartialServerConfig>,
    pub bucket: Option<String>,
    pub log_level: Option<String>,
    pub storage: Option<PartialStorageConfig>,
}

impl PartialConfig {
    /// Merges the fields of this partial config into a final config, overwriting existing values.
    fn merge_into(self, final_config: &mut FinalConfig) {
        if let Some(host) = self.host { final_config.host = host; }
        if let Some(port) = self.server.and_then(|s| s.port) { final_config.port = port; }
        if let Some(bucket) = self.bucket { final_config.bucket = bucket; }
        if let Some(log_level) = self.log_level { final_config.log_level = log_level; }
        if let Some(storage) = self.storage {
            storage.merge_into(&mut final_config.storage)
        }
    }
}

// The fully resolved configuration used by the application.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FinalConfig {
    pub host: String,
    pub port: u16,
    pub bucket: String,
    pub log_level: String,
    pub storage: StorageConfig,
}

impl Default for FinalConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            bucket: DEFAULT_BUCKET.to_string(),
            log_level: "info".to_string(),
            storage: StorageConfig::default(),
        }
    }
}

fn get_env_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.parse().ok())
}

fn get_config_from_env(lookup: impl Fn(&str) -> Option<String>) -> PartialConfig {
    let storage = PartialStorageConfig {
        storage_type: get_env_var(&lookup, "STORAGE_TYPE"),
        region: get_env_var(&lookup, "STORAGE_REGION"),
        host: get_env_var(&lookup, "STORAGE_HOST"),
        port: get_env_var(&lookup, "STORAGE_PORT"),
        ssl: get_env_var(&lookup, "STORAGE_SSL"),
        access_key: get_env_var(&lookup, "STORAGE_ACCESS_KEY"),
        secret_key: get_env_var(&lookup, "STORAGE_SECRET_KEY"),
        bucket_prefix: get_env_var(&lookup, "STORAGE_BUCKET_PREFIX"),
    };
    PartialConfig {
        host: get_env_var(&lookup, "HOST"),
        server: get_env_var(&lookup, "PORT").map(|port| PartialServerConfig { port: Some(port) }),
        bucket: get_env_var(&lookup, "BUCKET"),
        log_level: get_env_var(&lookup, "LOG_LEVEL"),
        storage: (!storage.is_empty()).then_some(storage),
    }
}

fn read_partial_config(path: &Path) -> Result<Option<PartialConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&config_str)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
}

/// Resolves the configuration: defaults, then the YAML file at `path`
/// (optional), then variables returned by `lookup`.
pub fn load_config_from(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<FinalConfig, ConfigError> {
    let mut final_config = FinalConfig::default();

    if let Some(file_config) = read_partial_config(path)? {
        file_config.merge_into(&mut final_config);
    }

    // Environment variables have the highest priority.
    get_config_from_env(lookup).merge_into(&mut final_config);

    if final_config.bucket.trim().is_empty() {
        final_config.bucket = DEFAULT_BUCKET.to_string();
    }

    Ok(final_config)
}

/// Loads from `CONFIG_PATH` (default `conf/cdnapi.yaml`) and the process environment.
pub fn load_config() -> Result<FinalConfig, ConfigError> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config_from(Path::new(&path), |key| std::env::var(key).ok())
}
