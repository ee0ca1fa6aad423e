//! Format-specific CAD converters.
//!
//! Each converter drives exactly one external executable to turn a staged
//! source file into an OBJ mesh plus optional material files.

pub mod ifc;
pub mod registry;
pub mod step;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::ConversionError;
use crate::models::ConversionResult;

pub use ifc::IfcConverter;
pub use registry::ConverterRegistry;
pub use step::StepConverter;

/// A converter from one family of CAD formats to OBJ.
#[async_trait]
pub trait CadConverter: Send + Sync + std::fmt::Debug + 'static {
    /// Short converter name used in logs and tool reports.
    fn name(&self) -> &'static str;

    /// Extensions this converter accepts, without the dot.
    fn extensions(&self) -> &'static [&'static str];

    /// Case-sensitive match against [`CadConverter::extensions`].
    fn can_handle(&self, extension: &str) -> bool {
        self.extensions().contains(&extension)
    }

    /// Executables this converter invokes, as configured.
    fn required_tools(&self) -> Vec<PathBuf>;

    /// Convert `source` into an OBJ mesh written inside `work_dir`.
    async fn convert(
        &self,
        source: &Path,
        work_dir: &Path,
    ) -> Result<ConversionResult, ConversionError>;
}

/// Fail with `OutputNotCreated` unless the tool wrote `path`.
pub(crate) async fn ensure_output(path: &Path) -> Result<(), ConversionError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(ConversionError::OutputNotCreated {
            path: path.to_path_buf(),
        }),
    }
}
