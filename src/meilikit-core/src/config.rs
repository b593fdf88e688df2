use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout; unset means no timeout
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub insecure_skip_verify: bool,
    #[serde(default)]
    pub ca_cert_path: Option<String>,

    // Task polling defaults
    #[serde(default)]
    pub tasks: TaskWaitConfig,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TaskWaitConfig {
    /// Give up after this long; `null` waits forever
    #[serde(default = "default_task_timeout_ms")]
    pub timeout_ms: Option<u64>,
    #[serde(default = "default_task_interval_ms")]
    pub interval_ms: u64,
}

fn default_url() -> String {
    "http://localhost:7700".to_string()
}

fn default_batch_size() -> usize {
    1000
}

fn default_task_timeout_ms() -> Option<u64> {
    Some(5000)
}

fn default_task_interval_ms() -> u64 {
    50
}

impl Default for TaskWaitConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_task_timeout_ms(),
            interval_ms: default_task_interval_ms(),
        }
    }
}

impl TaskWaitConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            url: url.into(),
            api_key,
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            api_key: None,
            timeout_ms: None,
            insecure_skip_verify: false,
            ca_cert_path: None,
            tasks: TaskWaitConfig::default(),
            batch_size: default_batch_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.url, "http://localhost:7700");
        assert_eq!(config.tasks.timeout(), Some(Duration::from_millis(5000)));
        assert_eq!(config.tasks.interval(), Duration::from_millis(50));
        assert_eq!(config.batch_size, 1000);
    }

    #[test]
    fn test_null_task_timeout_waits_forever() {
        let config: Config =
            serde_json::from_str(r#"{ "tasks": { "timeout_ms": null } }"#).unwrap();
        assert_eq!(config.tasks.timeout(), None);
        assert_eq!(config.tasks.interval_ms, 50);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "url": "https://search.example.com", "api_key": "masterKey", "timeout_ms": 2000 }}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.url, "https://search.example.com");
        assert_eq!(config.api_key.as_deref(), Some("masterKey"));
        assert_eq!(config.timeout(), Some(Duration::from_secs(2)));
        assert!(!config.insecure_skip_verify);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(Config::load("/definitely/not/here.json").is_err());
    }
}
