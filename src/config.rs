use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::reddit;

const DEFAULT_ENV_PREFIX: &str = "SNOOBY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub reddit: RedditConfig,
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedditConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_ssl_url")]
    pub ssl_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ssl_url: default_ssl_url(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    reddit::DEFAULT_BASE_URL.to_string()
}

fn default_ssl_url() -> String {
    reddit::DEFAULT_SSL_URL.to_string()
}

fn default_user_agent() -> String {
    format!("snooby/{} (reddit reader)", crate::VERSION)
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_subreddit")]
    pub default_subreddit: String,
    #[serde(default)]
    pub open_browser: bool,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            default_subreddit: default_subreddit(),
            open_browser: false,
        }
    }
}

fn default_subreddit() -> String {
    reddit::FRONT_PAGE.into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    cfg = apply_env(cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.reddit.base_url.is_empty() {
        base.reddit.base_url = other.reddit.base_url;
    }
    if !other.reddit.ssl_url.is_empty() {
        base.reddit.ssl_url = other.reddit.ssl_url;
    }
    if !other.reddit.user_agent.is_empty() {
        base.reddit.user_agent = other.reddit.user_agent;
    }
    if !other.reddit.timeout.is_zero() {
        base.reddit.timeout = other.reddit.timeout;
    }

    if !other.ui.default_subreddit.is_empty() {
        base.ui.default_subreddit = other.ui.default_subreddit;
    }
    base.ui.open_browser = other.ui.open_browser;

    if other.storage.path.is_some() {
        base.storage.path = other.storage.path;
    }

    base
}

fn apply_env(mut cfg: Config, prefix: &str) -> Config {
    for (key, value) in load_env(prefix) {
        apply_env_value(&mut cfg, &key, value);
    }
    cfg
}

fn load_env(prefix: &str) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }
    map
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "reddit.base_url" => cfg.reddit.base_url = value,
        "reddit.ssl_url" => cfg.reddit.ssl_url = value,
        "reddit.user_agent" => cfg.reddit.user_agent = value,
        "reddit.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.reddit.timeout = duration;
            }
        }
        "ui.default_subreddit" => cfg.ui.default_subreddit = value,
        "ui.open_browser" => {
            cfg.ui.open_browser = matches!(value.as_str(), "1" | "true" | "TRUE" | "True");
        }
        "storage.path" => cfg.storage.path = Some(PathBuf::from(value)),
        _ => {}
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("snooby").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_point_at_reddit() {
        let cfg = Config::default();
        assert_eq!(cfg.reddit.base_url, "http://www.reddit.com/");
        assert_eq!(cfg.reddit.ssl_url, "https://ssl.reddit.com/");
        assert_eq!(cfg.ui.default_subreddit, "frontpage");
        assert_eq!(cfg.reddit.timeout, Duration::from_secs(20));
        assert!(cfg.storage.path.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "reddit:\n  timeout: 5s\nui:\n  default_subreddit: pics\n  open_browser: true\n",
        )
        .unwrap();

        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("SNOOBY_FILE_TEST".into()),
        })
        .unwrap();
        assert_eq!(cfg.reddit.timeout, Duration::from_secs(5));
        assert_eq!(cfg.reddit.base_url, "http://www.reddit.com/");
        assert_eq!(cfg.ui.default_subreddit, "pics");
        assert!(cfg.ui.open_browser);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(dir.path().join("absent.yaml")),
            env_prefix: Some("SNOOBY_MISSING_TEST".into()),
        })
        .unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn env_overrides() {
        env::set_var("SNOOBY_ENV_TEST_UI__DEFAULT_SUBREDDIT", "rust");
        env::set_var("SNOOBY_ENV_TEST_REDDIT__TIMEOUT", "2m");
        env::set_var("SNOOBY_ENV_TEST_STORAGE__PATH", "/tmp/snooby.db");
        let cfg = load(LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/snooby.yaml")),
            env_prefix: Some("SNOOBY_ENV_TEST".into()),
        })
        .unwrap();
        assert_eq!(cfg.ui.default_subreddit, "rust");
        assert_eq!(cfg.reddit.timeout, Duration::from_secs(120));
        assert_eq!(cfg.storage.path, Some(PathBuf::from("/tmp/snooby.db")));
        env::remove_var("SNOOBY_ENV_TEST_UI__DEFAULT_SUBREDDIT");
        env::remove_var("SNOOBY_ENV_TEST_REDDIT__TIMEOUT");
        env::remove_var("SNOOBY_ENV_TEST_STORAGE__PATH");
    }
}
