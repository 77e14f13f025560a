//! Configuration management for restcontent.
//!
//! Default config location: ./conf/restcontent.toml

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Maximum request body size in bytes (default: 100MB).
    /// Bounds the size of uploaded import archives.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_body_size() -> usize {
    100 * 1024 * 1024 // 100MB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cors: CorsConfig::default(),
            max_body_size: default_max_body_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Allowed origins. Use "*" for any origin.
    #[serde(default = "default_cors_origins")]
    pub origins: Vec<String>,
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: default_cors_origins(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./data/restcontent.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// Public media host, e.g. "https://cdn.example.com".
    /// When unset the host is derived from each request.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_media_prefix")]
    pub prefix: String,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./data/uploads")
}

fn default_media_prefix() -> String {
    "/media/".to_string()
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            host: None,
            prefix: default_media_prefix(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SiteConfig {
    /// Origin label written into export keys and manifests.
    /// Falls back to the request Host header.
    #[serde(default)]
    pub url: Option<String>,
    /// Author recorded in export manifests.
    /// Falls back to the requesting identity's name.
    #[serde(default)]
    pub admin: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobsConfig {
    /// Grace window before a finished job is evicted
    #[serde(default = "default_completed_ttl_secs")]
    pub completed_ttl_secs: u64,
    /// Lifetime of an uploaded import archive that was never started
    #[serde(default = "default_upload_ttl_secs")]
    pub upload_ttl_secs: u64,
    /// Deflate archive entries instead of storing them
    #[serde(default = "default_true")]
    pub compress_archives: bool,
}

fn default_completed_ttl_secs() -> u64 {
    5
}

fn default_upload_ttl_secs() -> u64 {
    3600
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            completed_ttl_secs: default_completed_ttl_secs(),
            upload_ttl_secs: default_upload_ttl_secs(),
            compress_archives: true,
        }
    }
}

impl JobsConfig {
    pub fn completed_ttl(&self) -> Duration {
        Duration::from_secs(self.completed_ttl_secs)
    }

    pub fn upload_ttl(&self) -> Duration {
        Duration::from_secs(self.upload_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SecurityConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_keys: Vec<ApiKeyConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiKeyConfig {
    pub key: String,
    pub name: String,
    /// Id of the user the key acts as; stamped on imported records
    pub user_id: i64,
    #[serde(default)]
    pub superuser: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log output format: "pretty" or "json"
    /// Override with LOG_FORMAT env var
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter string
    /// Override with RUST_LOG env var
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable Prometheus metrics at GET /metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_level() -> String {
    "info,restcontent=debug".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
            metrics_enabled: true,
        }
    }
}

/// Expand ~ to home directory in path
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
        Ok(home.join(rest))
    } else if s == "~" {
        dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))
    } else {
        Ok(path.to_path_buf())
    }
}

impl Config {
    /// Load config from file path, or create default
    pub fn load_or_create(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.expand_paths()?;
            Ok(config)
        } else {
            let mut config = Config::default();
            if let Some(parent) = config_path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let _ = config.save(config_path);
            config.expand_paths()?;
            Ok(config)
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    fn expand_paths(&mut self) -> Result<()> {
        self.store.database_path = expand_tilde(&self.store.database_path)?;
        self.media.upload_dir = expand_tilde(&self.media.upload_dir)?;
        Ok(())
    }

    /// Ensure all required directories exist
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.media.upload_dir)?;
        if let Some(parent) = self.store.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    /// Blob storage configuration for the media library
    pub fn storage_config(&self) -> restcontent_storage::StorageConfig {
        restcontent_storage::StorageConfig::Local {
            path: self.media.upload_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.server.max_body_size, 100 * 1024 * 1024);
        assert_eq!(config.media.prefix, "/media/");
        assert!(config.media.host.is_none());
        assert_eq!(config.jobs.completed_ttl(), Duration::from_secs(5));
        assert_eq!(config.jobs.upload_ttl(), Duration::from_secs(3600));
        assert!(!config.security.enabled);
        assert_eq!(config.observability.log_level, "info,restcontent=debug");
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [media]
            host = "https://cdn.example.com"

            [jobs]
            completed_ttl_secs = 1

            [[security.api_keys]]
            key = "secret"
            name = "ops"
            user_id = 7
            superuser = true
            "#,
        )
        .unwrap();

        assert_eq!(config.media.host.as_deref(), Some("https://cdn.example.com"));
        assert_eq!(config.media.prefix, "/media/");
        assert_eq!(config.jobs.completed_ttl_secs, 1);
        assert_eq!(config.jobs.upload_ttl_secs, 3600);
        assert_eq!(config.security.api_keys.len(), 1);
        assert!(config.security.api_keys[0].superuser);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("conf/restcontent.toml");

        let config = Config::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");

        let reloaded = Config::load_or_create(&path).unwrap();
        assert_eq!(reloaded.media.prefix, config.media.prefix);
    }

    #[test]
    fn test_expand_tilde_passthrough() {
        let p = Path::new("./data/uploads");
        assert_eq!(expand_tilde(p).unwrap(), PathBuf::from("./data/uploads"));
    }
}
