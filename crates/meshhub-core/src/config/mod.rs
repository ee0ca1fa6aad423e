//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section; every field carries a serde default so an empty file is valid.

pub mod conversion;
pub mod logging;
pub mod storage;
pub mod worker;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use self::conversion::{ConversionConfig, IfcToolConfig, StepToolConfig};
pub use self::logging::LoggingConfig;
pub use self::storage::StorageConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// (default.toml + environment overlay + `MESHHUB__` variables).
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    /// Artifact storage settings.
    pub storage: StorageConfig,
    /// Conversion pipeline settings (tool paths, LOD ratios, staging).
    #[validate(nested)]
    pub conversion: ConversionConfig,
    /// Background worker pool settings.
    #[validate(nested)]
    pub worker: WorkerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files and the environment.
    ///
    /// Merges `config/default`, the environment overlay `config/{env}`, an
    /// optional explicit file, and environment variables prefixed with
    /// `MESHHUB__` (e.g. `MESHHUB__CONVERSION__DECIMATER_PATH`).
    pub fn load(explicit: Option<&str>, env: &str) -> Result<Self, AppError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("MESHHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let app: AppConfig = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        app.check()?;
        Ok(app)
    }

    /// Run derived field validation plus cross-field checks.
    pub fn check(&self) -> Result<(), AppError> {
        self.validate()?;
        self.conversion.check_ratios()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.check().is_ok());
        assert_eq!(config.conversion.lod_ratios, vec![1.0, 0.6, 0.2]);
    }

    #[test]
    fn test_toml_partial_section_uses_defaults() {
        let toml_str = r#"
            [conversion]
            decimater_path = "/opt/decimate"

            [worker]
            concurrency = 2
        "#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse toml");
        assert_eq!(
            config.conversion.decimater_path,
            std::path::PathBuf::from("/opt/decimate")
        );
        assert_eq!(config.worker.concurrency, 2);
        assert_eq!(config.worker.queue_capacity, 64);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = AppConfig::default();
        config.worker.concurrency = 0;
        let err = config.check().expect_err("should reject");
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
    }
}
