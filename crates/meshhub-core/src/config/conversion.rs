//! Conversion pipeline configuration.
//!
//! Tool paths are passed explicitly to every converter and to the decimator
//! at construction time. A tool configured as a bare name (no path
//! separator) is looked up on `PATH`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;

/// Configuration for the CAD-to-mesh conversion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ConversionConfig {
    /// Root directory under which per-job staging directories are created.
    ///
    /// Defaults to `<system temp>/meshhub` when unset.
    pub staging_root: Option<PathBuf>,

    /// Path to the mesh decimation executable.
    pub decimater_path: PathBuf,

    /// LOD quality ratios, highest quality first.
    #[validate(length(min = 1, max = 8))]
    pub lod_ratios: Vec<f32>,

    /// Upper bound on a single external tool run. Unset means no limit.
    #[validate(range(min = 1, max = 86400))]
    pub tool_timeout_seconds: Option<u64>,

    /// IFC converter settings.
    pub ifc: IfcToolConfig,

    /// STEP/IGES converter settings.
    pub step: StepToolConfig,
}

/// IFC converter (IfcConvert) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IfcToolConfig {
    /// Path to the IfcConvert executable.
    pub convert_path: PathBuf,
}

/// STEP/IGES converter (FreeCAD through Python) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StepToolConfig {
    /// Python interpreter used to run the bundled conversion script.
    pub python_interpreter: PathBuf,
    /// FreeCAD library directory passed to the script with `-l`.
    pub freecad_lib_path: PathBuf,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            staging_root: None,
            decimater_path: PathBuf::from("/usr/local/bin/decimate"),
            lod_ratios: default_lod_ratios(),
            tool_timeout_seconds: None,
            ifc: IfcToolConfig::default(),
            step: StepToolConfig::default(),
        }
    }
}

impl Default for IfcToolConfig {
    fn default() -> Self {
        Self {
            convert_path: PathBuf::from("/usr/local/bin/IfcConvert"),
        }
    }
}

impl Default for StepToolConfig {
    fn default() -> Self {
        Self {
            python_interpreter: PathBuf::from("python3"),
            freecad_lib_path: PathBuf::from("/usr/lib/freecad/lib"),
        }
    }
}

fn default_lod_ratios() -> Vec<f32> {
    vec![1.0, 0.6, 0.2]
}

impl ConversionConfig {
    /// Resolve the effective staging root directory.
    pub fn effective_staging_root(&self) -> PathBuf {
        self.staging_root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("meshhub"))
    }

    /// Ratios must lie in `(0, 1]` and be strictly decreasing.
    pub fn check_ratios(&self) -> Result<(), AppError> {
        for ratio in &self.lod_ratios {
            if !(*ratio > 0.0 && *ratio <= 1.0) {
                return Err(AppError::validation(format!(
                    "LOD ratio {ratio} is outside (0, 1]"
                )));
            }
        }
        if self.lod_ratios.windows(2).any(|w| w[1] >= w[0]) {
            return Err(AppError::validation(format!(
                "LOD ratios must be strictly decreasing: {:?}",
                self.lod_ratios
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConversionConfig::default();
        assert_eq!(config.lod_ratios, vec![1.0, 0.6, 0.2]);
        assert!(config.tool_timeout_seconds.is_none());
        assert!(config.effective_staging_root().ends_with("meshhub"));
    }

    #[test]
    fn test_ratio_out_of_range() {
        let config = ConversionConfig {
            lod_ratios: vec![1.5, 0.5],
            ..Default::default()
        };
        assert!(config.check_ratios().is_err());
    }

    #[test]
    fn test_ratio_not_decreasing() {
        let config = ConversionConfig {
            lod_ratios: vec![1.0, 0.2, 0.6],
            ..Default::default()
        };
        assert!(config.check_ratios().is_err());
    }

    #[test]
    fn test_empty_ratios_rejected_by_validator() {
        let config = ConversionConfig {
            lod_ratios: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ConversionConfig {
            tool_timeout_seconds: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
