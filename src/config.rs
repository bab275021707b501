//! TOML configuration for the query service.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! # mzrange.toml
//! [service]
//! roots = ["/data/ms"]
//! cache_enabled = true
//! thermo_enabled = true
//! mzml_enabled = true
//! idle_timeout_minutes = 120
//! sweep_interval_secs = 60
//! worker_threads = 0
//!
//! [limits]
//! thermo = 4
//! mzml = 0
//! cache = 0
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML for [`Settings`]
    #[error("Failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory scanning and lifecycle settings
    pub service: ServiceSettings,
    /// Open-handle caps per resource class
    pub limits: LimitSettings,
}

/// Directory scanning and lifecycle settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Directories scanned at init and rescan
    pub roots: Vec<PathBuf>,
    /// Register `.rch` and `folder.cache` entries
    pub cache_enabled: bool,
    /// Register Thermo `.raw` entries
    pub thermo_enabled: bool,
    /// Register `.mzML` entries
    pub mzml_enabled: bool,
    /// Close handles idle for longer than this; 0 disables the sweep
    pub idle_timeout_minutes: u64,
    /// Period of the background sweep
    pub sweep_interval_secs: u64,
    /// Batch worker threads; 0 uses one per logical CPU
    pub worker_threads: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            cache_enabled: true,
            thermo_enabled: true,
            mzml_enabled: true,
            idle_timeout_minutes: 120,
            sweep_interval_secs: 60,
            worker_threads: 0,
        }
    }
}

impl ServiceSettings {
    /// Idle timeout, `None` when the sweep is disabled
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_minutes > 0).then(|| Duration::from_secs(self.idle_timeout_minutes * 60))
    }

    /// Sweep period, never shorter than one second
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Open-handle cap per resource class (0 = unlimited)
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    /// Thermo RAW readers
    pub thermo: usize,
    /// Parsed mzML files
    pub mzml: usize,
    /// Cache store handles
    pub cache: usize,
}

impl Settings {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Settings scanning the given roots, everything else defaulted
    pub fn with_roots<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut settings = Self::default();
        settings.service.roots = roots.into_iter().map(Into::into).collect();
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [service]
            roots = ["/data/a", "/data/b"]
            cache_enabled = false
            idle_timeout_minutes = 30
            worker_threads = 8

            [limits]
            thermo = 4
            cache = 16
        "#;

        let settings = Settings::from_str(toml).unwrap();
        assert_eq!(settings.service.roots.len(), 2);
        assert!(!settings.service.cache_enabled);
        assert!(settings.service.mzml_enabled);
        assert_eq!(settings.service.idle_timeout(), Some(Duration::from_secs(1800)));
        assert_eq!(settings.service.worker_threads, 8);
        assert_eq!(settings.limits.thermo, 4);
        assert_eq!(settings.limits.mzml, 0);
        assert_eq!(settings.limits.cache, 16);
    }

    #[test]
    fn test_empty_config() {
        let settings = Settings::from_str("").unwrap();
        assert!(settings.service.roots.is_empty());
        assert_eq!(settings.service.idle_timeout_minutes, 120);
        assert_eq!(settings.service.sweep_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_zero_timeout_disables_sweep() {
        let settings = Settings::from_str("[service]\nidle_timeout_minutes = 0").unwrap();
        assert_eq!(settings.service.idle_timeout(), None);
    }

    #[test]
    fn test_invalid_toml() {
        let result = Settings::from_str("[service]\nroots = 5");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = Settings::from_file(Path::new("/nonexistent/mzrange.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
