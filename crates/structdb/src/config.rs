// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type database configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::format::DEFAULT_FILE_NAME;

/// Type database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file, read at open and rewritten on flush
    pub path: PathBuf,

    /// Read-only seed used when `path` does not exist yet
    pub fallback_path: Option<PathBuf>,

    /// Write to a temporary sibling and rename over `path` (default: true)
    pub atomic_save: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            fallback_path: None,
            atomic_save: true,
        }
    }
}

impl DatabaseConfig {
    /// Config for a database stored at `path`
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Create a new config builder
    pub fn builder() -> DatabaseConfigBuilder {
        DatabaseConfigBuilder::default()
    }

    /// Temporary file used by atomic saves
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// `structdb.dat` next to the running executable, or in the working
/// directory when the executable location is unknown.
pub fn default_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .as_deref()
        .and_then(Path::parent)
        .map(|dir| dir.join(DEFAULT_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_NAME))
}

/// Config builder for fluent API
#[derive(Debug, Default)]
pub struct DatabaseConfigBuilder {
    path: Option<PathBuf>,
    fallback_path: Option<PathBuf>,
    atomic_save: Option<bool>,
}

impl DatabaseConfigBuilder {
    /// Set the database file
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the read-only seed database
    pub fn fallback_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.fallback_path = Some(path.into());
        self
    }

    /// Enable or disable write-then-rename saves
    pub fn atomic_save(mut self, atomic: bool) -> Self {
        self.atomic_save = Some(atomic);
        self
    }

    /// Build the configuration
    pub fn build(self) -> DatabaseConfig {
        let defaults = DatabaseConfig::default();

        DatabaseConfig {
            path: self.path.unwrap_or(defaults.path),
            fallback_path: self.fallback_path.or(defaults.fallback_path),
            atomic_save: self.atomic_save.unwrap_or(defaults.atomic_save),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = DatabaseConfig::builder()
            .path("/tmp/db/types.dat")
            .fallback_path("/usr/share/structdb/structdb.dat")
            .atomic_save(false)
            .build();

        assert_eq!(config.path, PathBuf::from("/tmp/db/types.dat"));
        assert_eq!(
            config.fallback_path,
            Some(PathBuf::from("/usr/share/structdb/structdb.dat"))
        );
        assert!(!config.atomic_save);
    }

    #[test]
    fn test_config_defaults() {
        let config = DatabaseConfig::default();

        assert!(config.path.ends_with(DEFAULT_FILE_NAME));
        assert!(config.fallback_path.is_none());
        assert!(config.atomic_save);
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let config = DatabaseConfig::at("/data/structdb.dat");
        assert_eq!(config.temp_path(), PathBuf::from("/data/structdb.dat.tmp"));
    }

    #[test]
    fn test_config_json() {
        let config = DatabaseConfig::at("types.dat");
        let json = serde_json::to_string(&config).unwrap();
        let back: DatabaseConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.path, config.path);
        assert!(back.atomic_save);
    }
}
