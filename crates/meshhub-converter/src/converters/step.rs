//! STEP/IGES to OBJ through FreeCAD, driven by a bundled Python script.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use crate::error::ConversionError;
use crate::executor::ToolExecutor;
use crate::models::ConversionResult;

use super::{CadConverter, ensure_output};

const EXTENSIONS: &[&str] = &["stp", "step", "igs", "iges"];

/// FreeCAD conversion script shipped with the crate.
pub const CONVERSION_SCRIPT: &str = include_str!("../../scripts/convert_step_obj.py");

/// Converts STEP and IGES models by running the bundled script with a
/// Python interpreter that can import FreeCAD.
#[derive(Debug, Clone)]
pub struct StepConverter {
    python_interpreter: PathBuf,
    freecad_lib_path: PathBuf,
    executor: ToolExecutor,
}

impl StepConverter {
    /// Create a converter using `python_interpreter` and the FreeCAD
    /// libraries under `freecad_lib_path`.
    pub fn new(
        python_interpreter: impl Into<PathBuf>,
        freecad_lib_path: impl Into<PathBuf>,
        executor: ToolExecutor,
    ) -> Self {
        Self {
            python_interpreter: python_interpreter.into(),
            freecad_lib_path: freecad_lib_path.into(),
            executor,
        }
    }
}

#[async_trait]
impl CadConverter for StepConverter {
    fn name(&self) -> &'static str {
        "step"
    }

    fn extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }

    fn required_tools(&self) -> Vec<PathBuf> {
        vec![self.python_interpreter.clone()]
    }

    #[instrument(skip(self), fields(converter = "step"))]
    async fn convert(
        &self,
        source: &Path,
        work_dir: &Path,
    ) -> Result<ConversionResult, ConversionError> {
        let program = ToolExecutor::resolve_program(&self.python_interpreter)?;

        let id = Uuid::new_v4();
        let script = work_dir.join(format!("python_script{id}.py"));
        tokio::fs::write(&script, CONVERSION_SCRIPT).await?;

        let mesh = work_dir.join(format!("{id}.obj"));
        let args: Vec<OsString> = vec![
            script.as_os_str().to_owned(),
            "-l".into(),
            self.freecad_lib_path.as_os_str().to_owned(),
            "-i".into(),
            source.as_os_str().to_owned(),
            "-o".into(),
            mesh.as_os_str().to_owned(),
        ];
        self.executor.run("FreeCAD", &program, &args, work_dir).await?;
        ensure_output(&mesh).await?;

        Ok(ConversionResult {
            mesh,
            materials: Vec::new(),
        })
    }
}
