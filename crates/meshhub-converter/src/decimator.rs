//! LOD generation through an external decimation tool.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::error::{ConversionError, ConversionErrorKind};
use crate::executor::{ToolAvailability, ToolExecutor};
use crate::metrics::ConversionMetrics;
use crate::models::{LodFile, file_name_of, format_ratio, lod_file_name};

/// Produces one simplified mesh per configured ratio.
#[derive(Debug, Clone)]
pub struct Decimator {
    tool: PathBuf,
    ratios: Vec<f32>,
    executor: ToolExecutor,
    metrics: Arc<ConversionMetrics>,
}

impl Decimator {
    /// Create a decimator invoking `tool` with `ratios`, highest first.
    pub fn new(
        tool: impl Into<PathBuf>,
        ratios: Vec<f32>,
        executor: ToolExecutor,
        metrics: Arc<ConversionMetrics>,
    ) -> Self {
        Self {
            tool: tool.into(),
            ratios,
            executor,
            metrics,
        }
    }

    /// Availability of the decimation tool.
    pub fn tool_availability(&self) -> ToolAvailability {
        ToolAvailability::probe("decimator", &self.tool)
    }

    /// Run the tool once for all ratios and return one LOD per ratio, in
    /// ratio order. Every expected output must exist afterwards.
    pub async fn decimate(
        &self,
        mesh: &Path,
        dest: &Path,
    ) -> Result<Vec<LodFile>, ConversionError> {
        let program = ToolExecutor::resolve_program(&self.tool)?;

        let mut args: Vec<OsString> = vec![
            "-i".into(),
            mesh.as_os_str().to_owned(),
            "-o".into(),
            dest.as_os_str().to_owned(),
        ];
        args.extend(self.ratios.iter().map(|r| OsString::from(format_ratio(*r))));

        self.executor.run("decimate", &program, &args, dest).await?;

        let mesh_name = file_name_of(mesh);
        let mut lods = Vec::with_capacity(self.ratios.len());
        for (quality, ratio) in self.ratios.iter().enumerate() {
            let path = dest.join(lod_file_name(&mesh_name, *ratio));
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(ConversionError::OutputNotCreated { path });
            }
            lods.push(LodFile {
                quality: quality as u32,
                path,
            });
        }
        Ok(lods)
    }

    /// LOD set for `mesh`: one per ratio on success, otherwise the
    /// original mesh alone at quality 0.
    #[instrument(skip(self), fields(ratios = ?self.ratios))]
    pub async fn generate_lods(&self, mesh: &Path, dest: &Path) -> Vec<LodFile> {
        match self.decimate(mesh, dest).await {
            Ok(lods) => {
                info!(count = lods.len(), "Decimation done");
                lods
            }
            Err(e) => {
                match e.kind() {
                    ConversionErrorKind::ToolUnavailable | ConversionErrorKind::ToolNotExecutable => {
                        warn!(error = %e, "Decimation unavailable, keeping full-quality mesh only");
                    }
                    _ => warn!(error = %e, "Decimation failed, keeping full-quality mesh only"),
                }
                self.metrics.record_decimation_fallback();
                vec![LodFile {
                    quality: 0,
                    path: mesh.to_path_buf(),
                }]
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn decimator(tool: &Path) -> (Decimator, Arc<ConversionMetrics>) {
        let metrics = Arc::new(ConversionMetrics::new());
        let executor = ToolExecutor::new(None, metrics.clone());
        (
            Decimator::new(tool, vec![1.0, 0.6, 0.2], executor, metrics.clone()),
            metrics,
        )
    }

    fn write_tool(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("decimate");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_missing_tool_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = dir.path().join("abc.obj");
        std::fs::write(&mesh, "v 0 0 0\n").unwrap();

        let (dec, metrics) = decimator(Path::new("/nonexistent/decimate"));
        let lods = dec.generate_lods(&mesh, dir.path()).await;
        assert_eq!(lods, vec![LodFile { quality: 0, path: mesh }]);
        assert_eq!(metrics.snapshot().decimation_fallbacks, 1);
        assert_eq!(metrics.snapshot().tools_spawned, 0);
    }

    #[tokio::test]
    async fn test_success_yields_one_lod_per_ratio() {
        let tools = tempfile::tempdir().unwrap();
        let tool = write_tool(
            tools.path(),
            "for r in 100 60 20; do cp \"$2\" \"$4/abc$r.obj\"; done",
        );
        let work = tempfile::tempdir().unwrap();
        let mesh = work.path().join("abc.obj");
        std::fs::write(&mesh, "v 0 0 0\n").unwrap();

        let (dec, _) = decimator(&tool);
        let lods = dec.generate_lods(&mesh, work.path()).await;
        let names: Vec<String> = lods.iter().map(|l| file_name_of(&l.path)).collect();
        assert_eq!(names, vec!["abc100.obj", "abc60.obj", "abc20.obj"]);
        assert_eq!(lods.iter().map(|l| l.quality).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_missing_output_falls_back() {
        let tools = tempfile::tempdir().unwrap();
        let tool = write_tool(tools.path(), "cp \"$2\" \"$4/abc100.obj\"");
        let work = tempfile::tempdir().unwrap();
        let mesh = work.path().join("abc.obj");
        std::fs::write(&mesh, "v 0 0 0\n").unwrap();

        let (dec, _) = decimator(&tool);
        let err = dec.decimate(&mesh, work.path()).await.unwrap_err();
        assert!(matches!(err, ConversionError::OutputNotCreated { .. }));
        assert_eq!(dec.generate_lods(&mesh, work.path()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_nonzero_exit_falls_back() {
        let tools = tempfile::tempdir().unwrap();
        let tool = write_tool(tools.path(), "echo boom >&2; exit 3");
        let work = tempfile::tempdir().unwrap();
        let mesh = work.path().join("abc.obj");
        std::fs::write(&mesh, "v 0 0 0\n").unwrap();

        let (dec, metrics) = decimator(&tool);
        let lods = dec.generate_lods(&mesh, work.path()).await;
        assert_eq!(lods.len(), 1);
        assert_eq!(lods[0].path, mesh);
        assert_eq!(metrics.snapshot().tools_spawned, 1);
    }
}
