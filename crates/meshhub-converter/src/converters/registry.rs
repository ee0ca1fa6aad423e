//! Ordered converter registry. The first converter accepting an extension
//! wins.

use std::sync::Arc;

use meshhub_core::config::ConversionConfig;
use meshhub_core::types::BinaryResource;

use crate::executor::{ToolAvailability, ToolExecutor};

use super::{CadConverter, IfcConverter, StepConverter};

/// Statically registered, ordered set of converters.
#[derive(Debug, Clone, Default)]
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn CadConverter>>,
}

impl ConverterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the IFC and STEP/IGES converters, in that order.
    pub fn with_defaults(config: &ConversionConfig, executor: ToolExecutor) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(IfcConverter::new(
            config.ifc.convert_path.clone(),
            executor.clone(),
        )));
        registry.register(Arc::new(StepConverter::new(
            config.step.python_interpreter.clone(),
            config.step.freecad_lib_path.clone(),
            executor,
        )));
        registry
    }

    /// Append a converter after those already registered.
    pub fn register(&mut self, converter: Arc<dyn CadConverter>) {
        self.converters.push(converter);
    }

    /// Converter for a source file, chosen by its extension.
    pub fn select(&self, source: &BinaryResource) -> Option<Arc<dyn CadConverter>> {
        source
            .extension()
            .and_then(|ext| self.select_by_extension(ext))
    }

    /// First converter accepting `extension`.
    pub fn select_by_extension(&self, extension: &str) -> Option<Arc<dyn CadConverter>> {
        self.converters
            .iter()
            .find(|c| c.can_handle(extension))
            .cloned()
    }

    /// Every accepted extension, in registration order.
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        self.converters
            .iter()
            .flat_map(|c| c.extensions().iter().copied())
            .collect()
    }

    /// Availability of every tool the registered converters invoke.
    pub fn check_tools(&self) -> Vec<ToolAvailability> {
        self.converters
            .iter()
            .flat_map(|c| {
                c.required_tools()
                    .into_iter()
                    .map(|tool| ToolAvailability::probe(c.name(), &tool))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Number of registered converters.
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    /// Whether no converter is registered.
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ToolStatus;
    use crate::metrics::ConversionMetrics;

    fn source(name: &str) -> BinaryResource {
        BinaryResource::new(format!("key/sources/{name}"), 0)
    }

    fn registry() -> ConverterRegistry {
        let config = ConversionConfig {
            ifc: meshhub_core::config::IfcToolConfig {
                convert_path: "/nonexistent/IfcConvert".into(),
            },
            ..Default::default()
        };
        let executor = ToolExecutor::new(None, Arc::new(ConversionMetrics::new()));
        ConverterRegistry::with_defaults(&config, executor)
    }

    #[test]
    fn test_select_declared_extensions() {
        let reg = registry();
        assert_eq!(reg.select(&source("part.ifc")).unwrap().name(), "ifc");
        for name in ["a.stp", "a.step", "a.igs", "a.iges", " model.step "] {
            assert_eq!(reg.select(&source(name)).unwrap().name(), "step", "{name}");
        }
    }

    #[test]
    fn test_select_unknown_returns_none() {
        let reg = registry();
        assert!(reg.select(&source("model.STEP")).is_none());
        assert!(reg.select(&source("drawing.dwg")).is_none());
        assert!(reg.select(&source("noextension")).is_none());
        assert!(reg.select(&source("archive.tar.")).is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let mut reg = registry();
        let metrics = Arc::new(ConversionMetrics::new());
        reg.register(Arc::new(IfcConverter::new(
            "/other/IfcConvert",
            ToolExecutor::new(None, metrics),
        )));
        assert_eq!(reg.len(), 3);
        let chosen = reg.select(&source("x.ifc")).unwrap();
        assert_eq!(
            chosen.required_tools(),
            vec![std::path::PathBuf::from("/nonexistent/IfcConvert")]
        );
    }

    #[test]
    fn test_supported_extensions_order() {
        assert_eq!(
            registry().supported_extensions(),
            vec!["ifc", "stp", "step", "igs", "iges"]
        );
    }

    #[test]
    fn test_check_tools_reports_missing() {
        let report = registry().check_tools();
        let ifc = report.iter().find(|t| t.component == "ifc").unwrap();
        assert_eq!(ifc.status, ToolStatus::Missing);
        assert!(ifc.resolved.is_none());
    }
}
