use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::db::services::LinkPolicy;

/// Runtime configuration, built once at startup and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub listen_addr: String,
    pub upload_dir: PathBuf,
    pub log_dir: PathBuf,
    pub max_connections: u32,
    pub garden_link_policy: LinkPolicy,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    database_url: Option<String>,
    jwt_secret: Option<String>,
    listen_addr: Option<String>,
    upload_dir: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    max_connections: Option<u32>,
    garden_link_policy: Option<LinkPolicy>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_max_connections() -> u32 {
    10
}

fn env_value<T: FromStr>(key: &str) -> Result<Option<T>, String>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {key}: {e}")),
        _ => Ok(None),
    }
}

impl PartialServerConfig {
    fn from_file(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))
    }

    fn from_env() -> Result<Self, String> {
        Ok(Self {
            database_url: env_value("DATABASE_URL")?,
            jwt_secret: env_value("JWT_SECRET")?,
            listen_addr: env_value("LISTEN_ADDR")?,
            upload_dir: env_value("UPLOAD_DIR")?,
            log_dir: env_value("LOG_DIR")?,
            max_connections: env_value("MAX_CONNECTIONS")?,
            garden_link_policy: env_value("GARDEN_LINK_POLICY")?,
        })
    }
}

impl ServerConfig {
    /// Loads the configuration once at startup: optional TOML file, then
    /// `.env`/environment variables on top.
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        let file_config = match config_path {
            Some(path) => PartialServerConfig::from_file(Path::new(path))?,
            None => PartialServerConfig::default(),
        };
        let env_config = PartialServerConfig::from_env()?;

        Self::merge(env_config, file_config)
    }

    // Environment overrides file.
    fn merge(env_config: PartialServerConfig, file_config: PartialServerConfig) -> Result<Self, String> {
        Ok(ServerConfig {
            database_url: env_config
                .database_url
                .or(file_config.database_url)
                .ok_or("DATABASE_URL is required")?,
            jwt_secret: env_config
                .jwt_secret
                .or(file_config.jwt_secret)
                .ok_or("JWT_SECRET is required")?,
            listen_addr: env_config
                .listen_addr
                .or(file_config.listen_addr)
                .unwrap_or_else(default_listen_addr),
            upload_dir: env_config
                .upload_dir
                .or(file_config.upload_dir)
                .unwrap_or_else(default_upload_dir),
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            max_connections: env_config
                .max_connections
                .or(file_config.max_connections)
                .unwrap_or_else(default_max_connections),
            garden_link_policy: env_config
                .garden_link_policy
                .or(file_config.garden_link_policy)
                .unwrap_or_default(),
        })
    }
}
