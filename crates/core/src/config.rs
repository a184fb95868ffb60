//! Application configuration: built-in defaults, then
//! `~/.config/perfil/config.toml`, then `PERFIL__*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{game::GameRules, store::DEFAULT_CAPACITY};

/// Directory name used under the platform config and data directories.
pub const APP_DIR: &str = "perfil";
/// Prefix of environment overrides, e.g. `PERFIL__RULES__BASE_SCORE=150`.
pub const ENV_PREFIX: &str = "PERFIL";

const DEFAULT_CONFIG: &str = r#"# Perfil configuration.
# Every key is optional; the values below are the built-in defaults.
# Any key can also be set from the environment, for example
#   PERFIL__INITIAL_CAPACITY=32
#   PERFIL__RULES__SKIP_PENALTY=10

# Relative file names below are resolved against this directory.
# data_dir = "/home/you/.local/share/perfil"

store_file = "items.bin"
ranking_file = "ranking.bin"
catalog_file = "catalog.txt"

initial_capacity = 10
default_category = "General"

[rules]
base_score = 100
letter_penalty = 20
skip_penalty = 30
max_attempts = 5
max_players = 4
"#;

/// Runtime settings shared by the dispatcher and the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base directory for the data files.
    pub data_dir: PathBuf,
    /// Binary item store.
    pub store_file: PathBuf,
    /// Ranking ledger.
    pub ranking_file: PathBuf,
    /// Delimited catalog imported when the store starts out empty.
    pub catalog_file: PathBuf,
    /// Capacity of a freshly created store.
    pub initial_capacity: usize,
    /// Category given to catalog items, which carry none.
    pub default_category: String,
    /// Scoring constants.
    pub rules: GameRules,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            store_file: PathBuf::from("items.bin"),
            ranking_file: PathBuf::from("ranking.bin"),
            catalog_file: PathBuf::from("catalog.txt"),
            initial_capacity: DEFAULT_CAPACITY,
            default_category: "General".to_string(),
            rules: GameRules::default(),
        }
    }
}

impl AppConfig {
    /// Load the user's configuration file (if any) with environment
    /// overrides applied on top.
    pub fn load() -> Result<Self> {
        Self::from_sources(&config_path(), env_source())
    }

    fn from_sources(path: &Path, env: Environment) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(env)
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?
            .try_deserialize()
            .context("invalid configuration")?;
        config.rules.validate()?;
        Ok(config)
    }

    /// Absolute location of the item store.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_file)
    }

    /// Absolute location of the ranking ledger.
    pub fn ranking_path(&self) -> PathBuf {
        self.data_dir.join(&self.ranking_file)
    }

    /// Absolute location of the catalog file.
    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(&self.catalog_file)
    }
}

/// Location of the user's configuration file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

/// Write the commented default configuration if the user has none yet.
pub fn ensure_default_config() -> Result<()> {
    write_default_config(&config_path())
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote default configuration to {}", path.display());
    Ok(())
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("data"))
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX).separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn no_env() -> Environment {
        env_source().source(Some(HashMap::new()))
    }

    #[test]
    fn missing_file_gives_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::from_sources(&dir.path().join("config.toml"), no_env())?;
        assert_eq!(config, AppConfig::default());
        assert!(config.store_path().ends_with("items.bin"));
        Ok(())
    }

    #[test]
    fn default_template_parses_to_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("perfil").join("config.toml");
        write_default_config(&path)?;
        let config = AppConfig::from_sources(&path, no_env())?;
        assert_eq!(config, AppConfig::default());
        Ok(())
    }

    #[test]
    fn existing_file_is_not_overwritten() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "initial_capacity = 3\n")?;
        write_default_config(&path)?;
        assert_eq!(fs::read_to_string(&path)?, "initial_capacity = 3\n");
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "data_dir = \"/tmp/perfil\"\ndefault_category = \"Science\"\n[rules]\nmax_players = 2\n",
        )?;
        let config = AppConfig::from_sources(&path, no_env())?;
        assert_eq!(config.default_category, "Science");
        assert_eq!(config.rules.max_players, 2);
        assert_eq!(config.rules.base_score, 100);
        assert_eq!(
            config.ranking_path(),
            PathBuf::from("/tmp/perfil/ranking.bin")
        );
        Ok(())
    }

    #[test]
    fn environment_overrides_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "initial_capacity = 3\n[rules]\nskip_penalty = 50\n")?;
        let env = env_source().source(Some(HashMap::from([
            ("PERFIL__RULES__SKIP_PENALTY".to_string(), "10".to_string()),
            ("PERFIL__STORE_FILE".to_string(), "other.bin".to_string()),
        ])));
        let config = AppConfig::from_sources(&path, env)?;
        assert_eq!(config.initial_capacity, 3);
        assert_eq!(config.rules.skip_penalty, 10);
        assert_eq!(config.store_file, PathBuf::from("other.bin"));
        Ok(())
    }

    #[test]
    fn unplayable_rules_are_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "[rules]\nmax_attempts = 0\n")?;
        assert!(AppConfig::from_sources(&path, no_env()).is_err());
        Ok(())
    }
}
