//! CLI configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_server: String,
    pub default_output: String,
    pub token: Option<String>,
    pub username: String,
    pub workspace: Option<String>,
    pub cluster: String,
    pub devops: Option<String>,
    pub page_size: u32,
    /// Actions the signed-in user may perform
    pub enabled_actions: Vec<String>,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: Option<String>,
    /// Directory for JSON log files; console only when unset
    pub directory: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_server: "http://localhost:30880".to_string(),
            default_output: "table".to_string(),
            token: None,
            username: "admin".to_string(),
            workspace: None,
            cluster: "host".to_string(),
            devops: None,
            page_size: 10,
            enabled_actions: ["view", "create", "edit", "delete"]
                .iter()
                .map(|a| a.to_string())
                .collect(),
            log: LogSettings::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Update one setting by its command-line name
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let optional = |value: &str| Some(value.to_string()).filter(|v| !v.is_empty());
        match key {
            "server" => self.default_server = value.to_string(),
            "output" => self.default_output = value.to_string(),
            "token" => self.token = optional(value),
            "username" => self.username = value.to_string(),
            "workspace" => self.workspace = optional(value),
            "cluster" => self.cluster = value.to_string(),
            "devops" => self.devops = optional(value),
            "page-size" => {
                self.page_size = value
                    .parse()
                    .with_context(|| format!("page-size must be a number, got `{}`", value))?
            }
            "actions" => {
                self.enabled_actions = value
                    .split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .collect()
            }
            "log-level" => self.log.level = optional(value),
            "log-dir" => self.log.directory = optional(value).map(PathBuf::from),
            _ => anyhow::bail!("unknown setting `{}`", key),
        }
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        Ok(PathBuf::from(home).join(".config/fleetview/cli.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("cli.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/cli.toml");
        let config = Config {
            token: Some("abc".to_string()),
            workspace: Some("ws".to_string()),
            devops: Some("proj-x1".to_string()),
            ..Default::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_set() {
        let mut config = Config::default();
        config.set("workspace", "ws").unwrap();
        config.set("page-size", "25").unwrap();
        config.set("actions", "view, edit").unwrap();
        config.set("token", "").unwrap();

        assert_eq!(config.workspace.as_deref(), Some("ws"));
        assert_eq!(config.page_size, 25);
        assert_eq!(config.enabled_actions, vec!["view", "edit"]);
        assert_eq!(config.token, None);
        assert!(config.set("page-size", "many").is_err());
        assert!(config.set("colour", "red").is_err());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.toml");
        std::fs::write(&path, "cluster = \"east\"\n[log]\nlevel = \"debug\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.cluster, "east");
        assert_eq!(config.log.level.as_deref(), Some("debug"));
        assert_eq!(config.page_size, 10);
        assert_eq!(config.default_output, "table");
    }
}
