// Copyright (c) 2025 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Configuration utils.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use xdg::BaseDirectories;

/// Encountered when the configuration cannot be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Malformed TOML markup.
    #[error("Configuration Error: {0}")]
    Toml(#[from] toml::de::Error),
    /// A setting has no value, not even a default one.
    #[error("Missing configuration value: {0}")]
    MissingValue(&'static str),
}

/// Default configuration TOML string.
const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

/// Prefix for the XDG base directories.
pub const XDG_PREFIX: &str = "cdtextinfo";

/// Name of the configuration file inside the XDG config directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Subdirectory of the XDG cache directory that holds CDDB entries.
const CDDB_CACHE_DIR: &str = "cddb";

/// Timeout used when the configured timeout is negative.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Represents a piece of configuration that can be merged with another one.
trait MergeableConfig {
    /// Merge this configuration object with another one, taking values not set in this object from
    /// the other one (if present).
    fn merge(&self, other: &Self) -> Self;
}

/// Configuration for CDDB lookups.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CddbConfig {
    /// Hostname of the CDDB server.
    pub server: Option<String>,
    /// Port of the CDDB server.
    pub port: Option<i64>,
    /// Directory for cached CDDB entries.
    pub cache_dir: Option<String>,
    /// Do not read or write cached CDDB entries.
    pub disable_cache: Option<bool>,
    /// Email address given to the CDDB server during the handshake.
    pub email: Option<String>,
    /// Network timeout in seconds.
    ///
    /// Negative values select the default timeout, `0` disables the timeout.
    pub timeout: Option<i64>,
}

impl MergeableConfig for CddbConfig {
    fn merge(&self, other: &Self) -> Self {
        CddbConfig {
            server: self.server.clone().or_else(|| other.server.clone()),
            port: self.port.or(other.port),
            cache_dir: self.cache_dir.clone().or_else(|| other.cache_dir.clone()),
            disable_cache: self.disable_cache.or(other.disable_cache),
            email: self.email.clone().or_else(|| other.email.clone()),
            timeout: self.timeout.or(other.timeout),
        }
    }
}

/// The main configuration struct.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Configuration for CDDB lookups.
    #[serde(default)]
    pub cddb: CddbConfig,
}

impl MergeableConfig for Config {
    fn merge(&self, other: &Self) -> Self {
        Config {
            cddb: self.cddb.merge(&other.cddb),
        }
    }
}

impl Config {
    /// Load the configuration from a string slice.
    fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        let config = toml::from_str(text)?;
        Ok(config)
    }

    /// Load the default configuration.
    fn load_default() -> Result<Self, ConfigError> {
        Self::load_from_str(DEFAULT_CONFIG)
    }

    /// Load the configuration from a file located at the given path.
    ///
    /// # Errors
    ///
    /// This method can fail if the file cannot be accessed or if it contains malformed
    /// configuration markup.
    pub fn load_from_path<T: AsRef<Path>>(path: T) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::load_from_str(&text)?;
        Ok(config)
    }

    /// Find the configuration file in the XDG config directories.
    pub fn find_config_file() -> Option<PathBuf> {
        BaseDirectories::with_prefix(XDG_PREFIX).find_config_file(CONFIG_FILE_NAME)
    }

    /// Use values from `overrides` where present and fall back to this configuration otherwise.
    #[must_use]
    pub fn with_overrides(&self, overrides: &Self) -> Self {
        overrides.merge(self)
    }

    /// Merge this configuration struct with the default values.
    ///
    /// # Errors
    ///
    /// Fails if the embedded default configuration is malformed.
    pub fn with_defaults(&self) -> Result<Self, ConfigError> {
        let default = Self::load_default()?;
        Ok(self.merge(&default))
    }

    /// Resolve the CDDB settings, filling in the XDG cache directory if no cache directory is
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns an error if a required setting is missing, which only happens when the
    /// configuration was not merged with the defaults.
    pub fn cddb_settings(&self) -> Result<CddbSettings, ConfigError> {
        let cddb = &self.cddb;
        let cache_dir = if cddb.disable_cache.unwrap_or(false) {
            None
        } else {
            cddb.cache_dir
                .as_deref()
                .map(expand_path)
                .or_else(default_cache_dir)
        };

        Ok(CddbSettings {
            server: cddb
                .server
                .clone()
                .ok_or(ConfigError::MissingValue("cddb.server"))?,
            port: cddb.port.ok_or(ConfigError::MissingValue("cddb.port"))?,
            cache_dir,
            email: cddb
                .email
                .clone()
                .ok_or(ConfigError::MissingValue("cddb.email"))?,
            timeout: cddb.timeout.ok_or(ConfigError::MissingValue("cddb.timeout"))?,
        })
    }
}

/// Expand a leading `~` in a user-supplied path.
fn expand_path(path: &str) -> PathBuf {
    expanduser::expanduser(path).unwrap_or_else(|err| {
        log::debug!("Failed to expand path {path}: {err}");
        PathBuf::from(path)
    })
}

/// The per-user CDDB cache directory.
fn default_cache_dir() -> Option<PathBuf> {
    let cache_home = BaseDirectories::with_prefix(XDG_PREFIX).get_cache_home();
    if cache_home.is_none() {
        log::warn!("Unable to determine cache directory, CDDB caching is disabled");
    }
    cache_home.map(|dir| dir.join(CDDB_CACHE_DIR))
}

/// Fully resolved settings for a CDDB session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CddbSettings {
    /// Hostname of the CDDB server.
    pub server: String,
    /// Port as given by the user; validated when connecting.
    pub port: i64,
    /// Cache directory, `None` if caching is disabled.
    pub cache_dir: Option<PathBuf>,
    /// Email address given to the CDDB server.
    pub email: String,
    /// Timeout in seconds as given by the user.
    pub timeout: i64,
}

impl CddbSettings {
    /// The network timeout, or `None` if the timeout is disabled.
    pub fn timeout(&self) -> Option<Duration> {
        match u64::try_from(self.timeout) {
            Ok(0) => None,
            Ok(secs) => Some(Duration::from_secs(secs)),
            Err(_) => Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default().with_defaults().unwrap();
        assert_eq!(config.cddb.server.as_deref(), Some("gnudb.gnudb.org"));
        assert_eq!(config.cddb.port, Some(8880));
        assert_eq!(config.cddb.email.as_deref(), Some("me@home"));
        assert_eq!(config.cddb.timeout, Some(10));
        assert_eq!(config.cddb.disable_cache, Some(false));
    }

    #[test]
    fn test_merge_precedence() {
        let file = Config::load_from_str(
            r#"
            [cddb]
            server = "cddb.example.org"
            port = 8000
            timeout = 30
            "#,
        )
        .unwrap();
        let overrides = Config {
            cddb: CddbConfig {
                port: Some(8080),
                ..CddbConfig::default()
            },
        };

        let config = file.with_overrides(&overrides).with_defaults().unwrap();
        assert_eq!(config.cddb.server.as_deref(), Some("cddb.example.org"));
        assert_eq!(config.cddb.port, Some(8080));
        assert_eq!(config.cddb.timeout, Some(30));
        assert_eq!(config.cddb.email.as_deref(), Some("me@home"));
    }

    #[test]
    fn test_empty_config_file() {
        let config = Config::load_from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_cddb_settings_disabled_cache() {
        let overrides = Config {
            cddb: CddbConfig {
                cache_dir: Some("/tmp/cddb".to_string()),
                disable_cache: Some(true),
                ..CddbConfig::default()
            },
        };
        let settings = overrides.with_defaults().unwrap().cddb_settings().unwrap();
        assert_eq!(settings.cache_dir, None);
    }

    #[test]
    fn test_cddb_settings_cache_dir() {
        let overrides = Config {
            cddb: CddbConfig {
                cache_dir: Some("/tmp/cddb".to_string()),
                ..CddbConfig::default()
            },
        };
        let settings = overrides.with_defaults().unwrap().cddb_settings().unwrap();
        assert_eq!(settings.cache_dir, Some(PathBuf::from("/tmp/cddb")));
    }

    #[test]
    fn test_cddb_settings_missing_value() {
        let result = Config::default().cddb_settings();
        assert!(matches!(result, Err(ConfigError::MissingValue(_))));
    }

    #[test]
    fn test_timeout() {
        let mut settings = Config::default()
            .with_defaults()
            .unwrap()
            .cddb_settings()
            .unwrap();
        assert_eq!(settings.timeout(), Some(Duration::from_secs(10)));
        settings.timeout = 0;
        assert_eq!(settings.timeout(), None);
        settings.timeout = -1;
        assert_eq!(settings.timeout(), Some(Duration::from_secs(10)));
        settings.timeout = 3;
        assert_eq!(settings.timeout(), Some(Duration::from_secs(3)));
    }
}
