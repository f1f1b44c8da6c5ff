//! Configuration management for Golazo

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::types::{FootballType, TournamentSettings};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// Settings new tournaments start from
    #[serde(default)]
    pub tournament: TournamentSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub football_type: FootballType,
}

/// The local user the tools act as
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub user_id: String,
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file is not an error: the default configuration is used.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default_config());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Write configuration to a specific path, creating parent directories
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::ReadError)?;
        }
        let content = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;
        std::fs::write(path, content).map_err(ConfigError::ReadError)?;
        Ok(())
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            database: DatabaseConfig {
                path: "~/.local/share/golazo/golazo.db".to_string(),
            },
            defaults: DefaultsConfig::default(),
            tournament: TournamentSettings::default(),
            profile: None,
        }
    }

    /// Id of the active local user, if a profile is configured
    pub fn active_user_id(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.user_id.as_str())
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("GOLAZO_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("golazo").join("config.toml"))
}

/// Resolve the database path
///
/// `GOLAZO_DB_PATH` wins over the configured path; `~` is expanded.
pub fn resolve_db_path(configured: Option<&str>) -> Result<PathBuf> {
    if let Ok(path) = std::env::var("GOLAZO_DB_PATH") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    match configured {
        Some(path) => Ok(PathBuf::from(shellexpand::tilde(path).to_string())),
        None => Ok(resolve_data_path()?.join("golazo.db")),
    }
}

/// Resolve the data directory path following XDG Base Directory spec
pub fn resolve_data_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| ConfigError::MissingField("data directory".to_string()))?;

    Ok(data_dir.join("golazo"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[database]
path = "/tmp/golazo.db"
"#,
        )
        .unwrap();

        assert_eq!(config.database.path, "/tmp/golazo.db");
        assert_eq!(config.tournament.points_win, 3);
        assert_eq!(config.tournament.teams_per_group, 4);
        assert_eq!(config.defaults.football_type, FootballType::Eleven);
        assert!(config.active_user_id().is_none());
    }

    #[test]
    fn test_full_config_parses() {
        let config: Config = toml::from_str(
            r#"
[database]
path = "~/golazo.db"

[defaults]
city = "Sevilla"
category = "alevin"
football_type = "f7"

[tournament]
points_win = 2
points_draw = 1
points_loss = 0
match_minutes = 50
teams_per_group = 3
classified_per_group = 1
days_between_rounds = 3
kickoff = "17:30:00"

[profile]
user_id = "u-1"
"#,
        )
        .unwrap();

        assert_eq!(config.defaults.city.as_deref(), Some("Sevilla"));
        assert_eq!(config.defaults.football_type, FootballType::Seven);
        assert_eq!(config.tournament.points_win, 2);
        assert_eq!(config.tournament.classified_per_group, 1);
        assert_eq!(config.tournament.kickoff.to_string(), "17:30:00");
        assert_eq!(config.active_user_id(), Some("u-1"));
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default_config();
        config.profile = Some(ProfileConfig {
            user_id: "coach-7".to_string(),
        });
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.database.path, config.database.path);
        assert_eq!(loaded.active_user_id(), Some("coach-7"));
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[database\npath = ").unwrap();

        let result = Config::load_from_path(&path);
        assert!(matches!(
            result,
            Err(crate::error::GolazoError::Config(ConfigError::ParseError(_)))
        ));
    }

    #[test]
    #[serial]
    fn test_load_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.toml");
        std::env::set_var("GOLAZO_CONFIG", &path);

        let config = Config::load().unwrap();
        assert_eq!(config.database.path, "~/.local/share/golazo/golazo.db");

        std::env::remove_var("GOLAZO_CONFIG");
    }

    #[test]
    #[serial]
    fn test_db_path_env_override() {
        std::env::set_var("GOLAZO_DB_PATH", "/tmp/override.db");
        let path = resolve_db_path(Some("/tmp/configured.db")).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/override.db"));
        std::env::remove_var("GOLAZO_DB_PATH");

        let path = resolve_db_path(Some("/tmp/configured.db")).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/configured.db"));
    }
}
