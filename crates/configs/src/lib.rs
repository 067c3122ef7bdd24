use std::{path::PathBuf, time::Duration};

use anyhow::{anyhow, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// How long in-flight requests may run after a shutdown signal.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            worker_threads: Some(4),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// JSON snapshot loaded at startup and written at shutdown.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_file: default_data_file() }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow!("unknown log format '{other}', expected compact or json")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 3000 }
fn default_shutdown_grace() -> u64 { 60 }
fn default_data_file() -> PathBuf { PathBuf::from("./fruits-api-data.json") }

/// Load from `CONFIG_PATH` (or `config.toml`). A missing file yields defaults.
pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    match std::fs::metadata(&path) {
        Ok(_) => load_from_file(&path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(anyhow!("cannot stat config file {path}: {e}")),
    }
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    from_toml_str(&content)
}

pub fn from_toml_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// File (or defaults), then process environment, then validation.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Apply environment-style overrides resolved through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| anyhow!("SERVER_PORT '{port}' is not a valid port: {e}"))?;
        }
        if let Some(threads) = lookup("TOKIO_WORKER_THREADS") {
            self.server.worker_threads = threads.trim().parse::<usize>().ok();
        }
        if let Some(grace) = lookup("SHUTDOWN_GRACE_SECS") {
            self.server.shutdown_grace_secs = grace
                .trim()
                .parse()
                .map_err(|e| anyhow!("SHUTDOWN_GRACE_SECS '{grace}' is not a number: {e}"))?;
        }
        if let Some(file) = lookup("FRUITS_DATA_FILE") {
            self.storage.data_file = PathBuf::from(file);
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }
        Ok(())
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.storage.validate()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_grace_secs)
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = default_host();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port 必须在 1..=65535 范围内"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl StorageConfig {
    fn validate(&self) -> Result<()> {
        if self.data_file.as_os_str().is_empty() {
            return Err(anyhow!("storage.data_file 为空；请在 config.toml 或环境变量 FRUITS_DATA_FILE 中提供"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_document_uses_defaults() {
        let mut cfg = from_toml_str("").unwrap();
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.bind_addr(), "0.0.0.0:3000");
        assert_eq!(cfg.shutdown_grace(), Duration::from_secs(60));
        assert_eq!(cfg.storage.data_file, PathBuf::from("./fruits-api-data.json"));
        assert_eq!(cfg.logging.format, LogFormat::Compact);
        assert_eq!(cfg.server.worker_threads, Some(4));
    }

    #[test]
    fn parses_full_document() {
        let cfg = from_toml_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 8088
            worker_threads = 2
            shutdown_grace_secs = 5

            [storage]
            data_file = "data/fruits.json"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8088");
        assert_eq!(cfg.server.worker_threads, Some(2));
        assert_eq!(cfg.shutdown_grace(), Duration::from_secs(5));
        assert_eq!(cfg.storage.data_file, PathBuf::from("data/fruits.json"));
        assert_eq!(cfg.logging.format, LogFormat::Json);
    }

    #[test]
    fn env_overrides_win_over_file() {
        let mut cfg = from_toml_str("[server]\nport = 8088\n").unwrap();
        cfg.apply_overrides(lookup_from(&[
            ("SERVER_PORT", "9000"),
            ("FRUITS_DATA_FILE", "/tmp/f.json"),
            ("LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.storage.data_file, PathBuf::from("/tmp/f.json"));
        assert_eq!(cfg.logging.format, LogFormat::Json);
    }

    #[test]
    fn rejects_bad_port_override() {
        let mut cfg = AppConfig::default();
        assert!(cfg.apply_overrides(lookup_from(&[("SERVER_PORT", "http")])).is_err());
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!("yaml".parse::<LogFormat>().is_err());
        assert!(from_toml_str("[logging]\nformat = \"yaml\"\n").is_err());
    }

    #[test]
    fn validation_catches_zero_port_and_empty_file() {
        let mut cfg = AppConfig::default();
        cfg.server.port = 0;
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.storage.data_file = PathBuf::new();
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn blank_host_and_zero_threads_are_normalized() {
        let mut cfg = AppConfig::default();
        cfg.server.host = "  ".into();
        cfg.server.worker_threads = Some(0);
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.worker_threads, Some(4));
    }
}
