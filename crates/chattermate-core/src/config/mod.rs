//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::{DatabaseConfig, default_database_path};

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "CHATTERMATE_CONFIG_DIR";
/// Environment variable overriding the database path
pub const DATABASE_PATH_ENV: &str = "CHATTERMATE_DATABASE_PATH";

/// ChatterMate configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseSettings,
    pub service: ServiceSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Database file; `None` means the platform data directory
    pub path: Option<PathBuf>,
    pub max_connections: u32,
    pub auto_migrate: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 5,
            auto_migrate: true,
        }
    }
}

/// Identity reported by the service info and health endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "ChatterMate API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Welcome to ChatterMate API".to_string(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var(CONFIG_DIR_ENV) {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("chattermate")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location, or defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| {
                format!("Failed to create config directory: {}", dir.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.max_connections == 0 {
            return Err(anyhow!("database.max_connections must be at least 1"));
        }
        if self.service.name.trim().is_empty() {
            return Err(anyhow!("service.name must not be empty"));
        }
        Ok(())
    }

    /// Database path after applying the environment override
    pub fn database_path(&self) -> PathBuf {
        env::var(DATABASE_PATH_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.database.path.clone())
            .unwrap_or_else(default_database_path)
    }

    /// Build the storage configuration for opening the database
    pub fn database_config(&self) -> DatabaseConfig {
        let mut config = DatabaseConfig::with_path(self.database_path())
            .max_connections(self.database.max_connections);
        if !self.database.auto_migrate {
            config = config.no_migrate();
        }
        config
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "database.path" => Ok(self.database_path().display().to_string()),
            "database.max_connections" => Ok(self.database.max_connections.to_string()),
            "database.auto_migrate" => Ok(self.database.auto_migrate.to_string()),

            "service.name" => Ok(self.service.name.clone()),
            "service.version" => Ok(self.service.version.clone()),
            "service.description" => Ok(self.service.description.clone()),

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `chattermate config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "database.path" => {
                self.database.path = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            "database.max_connections" => {
                let max: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid max_connections value: {}", value))?;
                if max == 0 {
                    return Err(anyhow!("max_connections must be at least 1"));
                }
                self.database.max_connections = max;
            }
            "database.auto_migrate" => {
                self.database.auto_migrate = value
                    .parse()
                    .with_context(|| format!("Invalid auto_migrate value: {}", value))?;
            }

            "service.name" => self.service.name = value.to_string(),
            "service.description" => self.service.description = value.to_string(),
            "service.version" => {
                return Err(anyhow!("service.version is fixed at build time"));
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `chattermate config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = [
            "database.path",
            "database.max_connections",
            "database.auto_migrate",
            "service.name",
            "service.version",
            "service.description",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }
}
