use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

pub const DEFAULT_CONFIG_FILE: &str = "ragchat.json";
pub const BASE_URL_ENV: &str = "RAGCHAT_BASE_URL";

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    /// How long notices stay up and how long forced navigation waits.
    pub notice_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub credentials_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            notice_delay_ms: 2000,
            request_timeout_secs: 60,
            credentials_path: None,
            log_dir: None,
        }
    }
}

impl AppConfig {
    pub fn notice_delay(&self) -> Duration {
        Duration::from_millis(self.notice_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.credentials_path
            .clone()
            .unwrap_or_else(|| data_dir().join("credentials.json"))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| data_dir().join("logs"))
    }
}

fn data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ragchat")
}

/// Reads the config file if it exists; a missing file yields defaults.
pub async fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();
    let mut config = match fs::read_to_string(path).await {
        Ok(content) => serde_json::from_str::<AppConfig>(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
        config.base_url = base_url;
    }
    config.base_url = config.base_url.trim_end_matches('/').to_string();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path().join("absent.json")).await.unwrap();
        assert_eq!(config.notice_delay(), Duration::from_secs(2));
        assert_eq!(config.request_timeout_secs, 60);
    }

    #[tokio::test]
    async fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragchat.json");
        std::fs::write(
            &path,
            r#"{"base_url":"http://chat.internal:9000/","notice_delay_ms":500}"#,
        )
        .unwrap();

        let config = load_config(&path).await.unwrap();
        if std::env::var(BASE_URL_ENV).is_err() {
            assert_eq!(config.base_url, "http://chat.internal:9000");
        }
        assert_eq!(config.notice_delay(), Duration::from_millis(500));
        assert_eq!(config.request_timeout_secs, 60);
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragchat.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_config(&path).await.is_err());
    }
}
