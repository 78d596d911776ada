//! Configuration file loading

use crate::config::BridgeConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use tracing::{debug, info};

/// Loads [`BridgeConfig`] from TOML files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load, apply environment overrides and validate a config file
    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<BridgeConfig> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: BridgeConfig = toml::from_str(&source)?;
        config.apply_env_overrides();
        config.validate()?;

        info!("Loaded bridge config from {}", path.display());
        Ok(config)
    }

    /// Like [`ConfigLoader::load_from_file`], falling back to defaults when the file is missing
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<BridgeConfig> {
        match Self::load_from_file(path.as_ref()) {
            Err(ConfigError::NotFound(missing)) => {
                debug!("No config at {}, using defaults", missing.display());
                let mut config = BridgeConfig::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    #[serial]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[dispatch]\npool_levels = 2\nmax_stack_slots = 64").unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.dispatch.pool_levels, 2);
        assert_eq!(config.dispatch.max_stack_slots, 64);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::load_from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    #[serial]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_load_or_default_keeps_parse_errors() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not = [valid").unwrap();

        let err = ConfigLoader::load_or_default(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
