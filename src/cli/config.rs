// ABOUTME: Configuration management for the automator CLI
// ABOUTME: Handles loading configuration from files and merging environment variables

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Task types accepted by `validate` in addition to those passed with `--known`.
    #[serde(default)]
    pub known_tasks: Vec<String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => Self::find_config_file(),
        };

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            serde_yaml::from_str(&contents)?
        } else {
            Config::default()
        };

        config.merge_env();
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> PathBuf {
        let possible_paths = [
            PathBuf::from("automator.yaml"),
            PathBuf::from("automator.yml"),
            PathBuf::from(".automator.yaml"),
            PathBuf::from(".automator.yml"),
        ];

        possible_paths
            .iter()
            .find(|path| path.exists())
            .cloned()
            .unwrap_or_else(|| PathBuf::from("automator.yaml"))
    }

    /// Merge environment variables into configuration
    fn merge_env(&mut self) {
        if let Ok(level) = std::env::var("AUTOMATOR_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("AUTOMATOR_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(known) = std::env::var("AUTOMATOR_KNOWN_TASKS") {
            self.merge_known_tasks(known.split(',').map(|name| name.trim().to_string()));
        }
    }

    /// Add task types to the known list, skipping blanks and duplicates
    pub fn merge_known_tasks<I: IntoIterator<Item = String>>(&mut self, names: I) {
        for name in names {
            if !name.is_empty() && !self.known_tasks.contains(&name) {
                self.known_tasks.push(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.known_tasks.is_empty());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("automator.yaml");

        let config_content = r#"
known_tasks: [collab, nav, storage]
logging:
  level: debug
  format: compact
"#;
        fs::write(&config_path, config_content).unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.known_tasks, vec!["collab", "nav", "storage"]);
        assert_eq!(config.logging.format, "compact");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let config = Config::load(Some(temp_dir.path().join("absent.yaml"))).unwrap();
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_merge_known_tasks_dedupes() {
        let mut config = Config::default();
        config.merge_known_tasks(vec!["collab".to_string(), "".to_string()]);
        config.merge_known_tasks(vec!["collab".to_string(), "nav".to_string()]);
        assert_eq!(config.known_tasks, vec!["collab", "nav"]);
    }
}
