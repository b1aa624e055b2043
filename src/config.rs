use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::schedule::{DistributionMode, PriorityRule, ScheduleConfig};

/// Application settings, read from an optional TOML file and then overridden
/// by command line flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
    pub default_panels: usize,
    pub distribution: DistributionMode,
    /// Case-insensitive name fragment that marks the priority team
    pub priority_token: Option<String>,
    pub schedule: ScheduleConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            port: 5000,
            static_dir: None,
            default_panels: 4,
            distribution: DistributionMode::ThemeBased,
            priority_token: None,
            schedule: ScheduleConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config file if it exists, defaults otherwise
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", path.display(), e))?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn priority_rule(&self) -> PriorityRule {
        PriorityRule {
            token: self.priority_token.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/panel-splitter.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel-splitter.toml");
        std::fs::write(
            &path,
            r#"
port = 8081
priority_token = "jagermeister"
distribution = "random"

[schedule]
startTime = "09:00"
endTime = "12:00"
duration = 15
"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();

        assert_eq!(config.port, 8081);
        assert_eq!(config.default_panels, 4);
        assert_eq!(config.distribution, DistributionMode::Random);
        assert_eq!(config.schedule.duration, 15);
        assert_eq!(config.priority_rule().token.as_deref(), Some("jagermeister"));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "port = \"not a number\"").unwrap();
        assert!(AppConfig::load(&path).is_err());
    }
}
