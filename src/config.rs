use crate::client::{DEFAULT_POSTS_URL, DEFAULT_TIMEOUT};
use crate::storage::{DATA_DIR_ENV, FileBackend};
use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub posts_url: String,
    /// Storage directory; platform data dir when unset.
    pub data_dir: Option<PathBuf>,
    pub log_level: String,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            posts_url: DEFAULT_POSTS_URL.to_string(),
            data_dir: None,
            log_level: "info".to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl Config {
    pub fn get_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "taskfeed", "taskfeed")
            .map(|proj| proj.config_dir().join("config.toml"))
    }

    /// Missing file means defaults; a file that does not parse is an error.
    pub fn load() -> Result<Self> {
        match Self::get_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::get_path().ok_or_else(|| anyhow!("no config directory"))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        FileBackend::atomic_write(path, content)
    }

    /// `TASKFEED_DATA_DIR` beats the config file, which beats the platform
    /// default.
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        self.data_dir_with(std::env::var(DATA_DIR_ENV).ok())
    }

    fn data_dir_with(&self, env_override: Option<String>) -> Result<PathBuf> {
        if let Some(dir) = env_override
            && !dir.trim().is_empty()
        {
            return Ok(PathBuf::from(dir));
        }
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        FileBackend::default_dir().ok_or_else(|| anyhow!("could not determine a data directory"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let cfg = Config::parse(
            r#"
posts_url = "http://localhost:8080/posts"
log_level = "debug"
"#,
        )
        .unwrap();
        assert_eq!(cfg.posts_url, "http://localhost:8080/posts");
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.request_timeout_secs, 15);
        assert_eq!(cfg.data_dir, None);
    }

    #[test]
    fn test_bad_file_is_an_error() {
        assert!(Config::parse("posts_url = [").is_err());
        assert!(Config::parse("request_timeout_secs = \"soon\"").is_err());
    }

    #[test]
    fn test_load_from_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "log_level = 3").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn test_data_dir_precedence() {
        let cfg = Config {
            data_dir: Some(PathBuf::from("/from/config")),
            ..Config::default()
        };

        let dir = cfg.data_dir_with(Some("/from/env".into())).unwrap();
        assert_eq!(dir, PathBuf::from("/from/env"));

        // Blank override is ignored
        let dir = cfg.data_dir_with(Some("  ".into())).unwrap();
        assert_eq!(dir, PathBuf::from("/from/config"));
        let dir = cfg.data_dir_with(None).unwrap();
        assert_eq!(dir, PathBuf::from("/from/config"));

        if let Some(platform) = FileBackend::default_dir() {
            let dir = Config::default().data_dir_with(None).unwrap();
            assert_eq!(dir, platform);
        }
    }

    #[test]
    fn test_zero_timeout_is_clamped() {
        let cfg = Config {
            request_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(cfg.request_timeout(), Duration::from_secs(1));
    }
}
