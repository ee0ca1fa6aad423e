//! IFC to OBJ through IfcConvert.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use crate::error::ConversionError;
use crate::executor::ToolExecutor;
use crate::models::ConversionResult;

use super::{CadConverter, ensure_output};

const EXTENSIONS: &[&str] = &["ifc"];

/// Converts IFC models with `IfcConvert --sew-shells`.
#[derive(Debug, Clone)]
pub struct IfcConverter {
    convert_path: PathBuf,
    executor: ToolExecutor,
}

impl IfcConverter {
    /// Create a converter invoking the executable at `convert_path`.
    pub fn new(convert_path: impl Into<PathBuf>, executor: ToolExecutor) -> Self {
        Self {
            convert_path: convert_path.into(),
            executor,
        }
    }
}

#[async_trait]
impl CadConverter for IfcConverter {
    fn name(&self) -> &'static str {
        "ifc"
    }

    fn extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }

    fn required_tools(&self) -> Vec<PathBuf> {
        vec![self.convert_path.clone()]
    }

    #[instrument(skip(self), fields(converter = "ifc"))]
    async fn convert(
        &self,
        source: &Path,
        work_dir: &Path,
    ) -> Result<ConversionResult, ConversionError> {
        let program = ToolExecutor::resolve_program(&self.convert_path)?;

        let id = Uuid::new_v4();
        let mesh = work_dir.join(format!("{id}.obj"));
        let material = work_dir.join(format!("{id}.mtl"));

        let args: Vec<OsString> = vec![
            "--sew-shells".into(),
            source.as_os_str().to_owned(),
            mesh.as_os_str().to_owned(),
        ];
        self.executor.run("IfcConvert", &program, &args, work_dir).await?;
        ensure_output(&mesh).await?;

        Ok(ConversionResult {
            mesh,
            materials: vec![material],
        })
    }
}
