//! Application configuration management.
//!
//! Settings are layered with `figment`, lowest priority first:
//!
//! 1. built-in defaults
//! 2. `config.toml` in the platform config directory (or `--config PATH`)
//! 3. `DELDUP_*` environment variables
//!
//! Command-line flags are applied on top by the caller.

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of the environment variables read by [`Config::figment`].
pub const ENV_PREFIX: &str = "DELDUP_";

/// Errors raised while loading the configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A layer could not be parsed or has a value of the wrong type.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Follow symbolic links during traversal.
    pub follow_symlinks: bool,
    /// Index the entries of ZIP archives of the official tree.
    pub enter_archives: bool,
    /// Number of threads computing fingerprints.
    pub io_threads: usize,
    /// Delete permanently instead of moving to the trash.
    pub permanent: bool,
    /// Write a header row in CSV dumps.
    pub csv_header: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            enter_archives: false,
            io_threads: 4,
            permanent: false,
            csv_header: false,
        }
    }
}

impl Config {
    /// Standard figment: defaults, then the TOML file, then the environment.
    ///
    /// A missing file contributes nothing.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        match path.map(Path::to_path_buf).or_else(Self::config_path) {
            Some(file) => {
                log::debug!("Reading configuration from {}", file.display());
                figment = figment.merge(Toml::file(file));
            }
            None => log::debug!("No configuration directory available"),
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Extract a configuration from any figment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a layer cannot be parsed.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let mut config: Self = figment.extract().map_err(Box::new)?;
        if config.io_threads == 0 {
            log::warn!("io_threads must be at least 1, using 1");
            config.io_threads = 1;
        }
        Ok(config)
    }

    /// Load the layered configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the file or environment holds invalid values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment(path))
    }

    /// Default platform-specific configuration path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "deldup", "deldup")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
