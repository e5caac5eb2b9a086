//! Path management for the nYNAB client
//!
//! Provides XDG-compliant path resolution for settings, the mirror snapshot
//! and the sync journal.
//!
//! ## Path Resolution Order
//!
//! 1. `NYNAB_CLIENT_DATA_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/nynab-client` or `~/.config/nynab-client`
//! 3. Windows: `%APPDATA%\nynab-client`

use std::path::PathBuf;

use crate::error::NynabError;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "NYNAB_CLIENT_DATA_DIR";

/// Manages all paths used by the client
#[derive(Debug, Clone)]
pub struct NynabPaths {
    /// Base directory for all client data
    base_dir: PathBuf,
}

impl NynabPaths {
    /// Resolve the base directory from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if no home or application-data directory can be
    /// determined.
    pub fn new() -> Result<Self, NynabError> {
        let base_dir = match std::env::var(DATA_DIR_ENV) {
            Ok(custom) => PathBuf::from(custom),
            Err(_) => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Use a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory (~/.config/nynab-client/data/)
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the mirror snapshot
    pub fn mirror_file(&self) -> PathBuf {
        self.data_dir().join("mirror.json")
    }

    /// Get the path to the sync journal
    pub fn journal_file(&self) -> PathBuf {
        self.base_dir.join("sync.log")
    }

    /// Ensure the base and data directories exist
    pub fn ensure_directories(&self) -> Result<(), NynabError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| NynabError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| NynabError::Io(format!("Failed to create data directory: {}", e)))?;

        Ok(())
    }

    /// Check if settings have been written
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, NynabError> {
    let config_base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) => PathBuf::from(xdg),
        Err(_) => {
            let home = std::env::var("HOME")
                .map_err(|_| NynabError::Config("HOME environment variable not set".into()))?;
            PathBuf::from(home).join(".config")
        }
    };
    Ok(config_base.join("nynab-client"))
}

#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, NynabError> {
    let appdata = std::env::var("APPDATA")
        .map_err(|_| NynabError::Config("Could not determine APPDATA directory".into()))?;
    Ok(PathBuf::from(appdata).join("nynab-client"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = NynabPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.data_dir(), temp_dir.path().join("data"));
    }

    #[test]
    fn test_env_var_override() {
        let temp_dir = TempDir::new().unwrap();
        let custom_path = temp_dir.path().to_str().unwrap();

        env::set_var(DATA_DIR_ENV, custom_path);
        let paths = NynabPaths::new().unwrap();
        assert_eq!(paths.base_dir(), temp_dir.path());
        env::remove_var(DATA_DIR_ENV);
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = NynabPaths::with_base_dir(temp_dir.path().join("nested"));

        paths.ensure_directories().unwrap();
        assert!(paths.data_dir().exists());
        assert!(!paths.is_initialized());
    }

    #[test]
    fn test_file_paths() {
        let temp_dir = TempDir::new().unwrap();
        let paths = NynabPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.settings_file(), temp_dir.path().join("config.json"));
        assert_eq!(
            paths.mirror_file(),
            temp_dir.path().join("data").join("mirror.json")
        );
        assert_eq!(paths.journal_file(), temp_dir.path().join("sync.log"));
    }
}
