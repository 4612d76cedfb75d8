//! High-level pipeline interface
//!
//! This module provides the [`Pipeline`] which serves as the primary
//! interface for driving a build. It encapsulates settings loading,
//! registry construction, target resolution, and execution.
//!
//! ## Example
//!
//! ```rust,no_run
//! use gantry_core::pipeline::{Pipeline, PipelineConfig};
//! use std::path::PathBuf;
//!
//! # async fn example() -> gantry_core::types::PipelineResult<()> {
//! let pipeline = Pipeline::new(PipelineConfig {
//!     project_root: PathBuf::from("."),
//! })?;
//!
//! // Show what the default target would run
//! let plan = pipeline.resolve(".")?;
//! println!("{} task(s)", plan.len());
//!
//! // Run the full pipeline
//! let report = pipeline.run(".").await?;
//! # let _ = report;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

use crate::execution::runner::PipelineRunner;
use crate::registry::{Registry, TaskId, TaskSpec};
use crate::reporting::{AppVeyorSink, StatusSink};
use crate::results::RunReport;
use crate::settings::Settings;
use crate::tasks::builtin_registry;
use crate::types::{PipelineError, PipelineResult};

/// Configuration for initializing a pipeline.
pub struct PipelineConfig {
    pub project_root: PathBuf,
}

/// High-level pipeline that ties settings, registry, and runner together.
pub struct Pipeline {
    pub settings: Settings,
    registry: Registry,
}

impl Pipeline {
    /// Initialize a pipeline from the given project root, reading the
    /// optional config overlay and the process environment.
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        let settings = Settings::load(&config.project_root)?;
        Ok(Self::with_settings(settings))
    }

    /// Build a pipeline around already-assembled settings.
    pub fn with_settings(settings: Settings) -> Self {
        let registry = builtin_registry(&settings.stages);
        Self { settings, registry }
    }

    /// Resolve a target name to its execution sequence.
    pub fn resolve(&self, target: &str) -> PipelineResult<Vec<TaskId>> {
        let id = self.parse_target(target)?;
        self.registry.resolve(id)
    }

    /// Resolve and execute a target, announcing progress to the given sink.
    pub async fn run_with_sink<S: StatusSink>(
        &self,
        target: &str,
        sink: &S,
    ) -> PipelineResult<RunReport> {
        let sequence = self.resolve(target)?;
        let runner = PipelineRunner::new(&self.settings, &self.registry, sink);
        Ok(runner.run(&sequence).await)
    }

    /// Resolve and execute a target with the default CI reporting sink.
    pub async fn run(&self, target: &str) -> PipelineResult<RunReport> {
        let sink = AppVeyorSink::from_settings(&self.settings);
        self.run_with_sink(target, &sink).await
    }

    /// Registered tasks in declaration order, for listings.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskSpec> {
        self.registry.tasks()
    }

    fn parse_target(&self, target: &str) -> PipelineResult<TaskId> {
        TaskId::parse(target).ok_or_else(|| PipelineError::UnknownTask(format!("'{}'", target)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::AppVeyorSink;
    use crate::settings::EnvVars;

    fn pipeline_in(root: &std::path::Path) -> Pipeline {
        let settings = Settings::with_env(root, EnvVars::default()).unwrap();
        Pipeline::with_settings(settings)
    }

    #[test]
    fn test_default_target_resolves_to_full_pipeline() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(temp_dir.path());

        let plan = pipeline.resolve(".").unwrap();
        assert_eq!(plan.len(), 12);
        assert_eq!(plan.first(), Some(&TaskId::Clean));
        assert_eq!(plan.last(), Some(&TaskId::CopySourceToBuildOutput));
    }

    #[test]
    fn test_unknown_target_is_rejected_by_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(temp_dir.path());

        let err = pipeline.resolve("Bogus_Task").unwrap_err();
        assert!(matches!(err, PipelineError::UnknownTask(_)));
        assert!(err.to_string().contains("Bogus_Task"));
    }

    #[test]
    fn test_disabled_stage_target_is_unknown() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(temp_dir.path());

        // Integration tests are off by default, so the task does not exist.
        let err = pipeline.resolve("Integration_Tests").unwrap_err();
        assert!(matches!(err, PipelineError::UnknownTask(_)));
    }

    #[test]
    fn test_overlay_toggle_enables_integration_stage() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_dir = temp_dir.path().join(".gantry");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("pipeline.yml"),
            "stages:\n  integrationTests: true\n",
        )
        .unwrap();

        let pipeline = pipeline_in(temp_dir.path());
        let plan = pipeline.resolve("Integration_Tests").unwrap();
        assert_eq!(
            plan,
            vec![TaskId::InstallDependencies, TaskId::IntegrationTests]
        );
    }

    #[tokio::test]
    async fn test_run_executes_a_filesystem_task_end_to_end() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(temp_dir.path());
        std::fs::create_dir_all(&pipeline.settings.output_dir).unwrap();
        std::fs::write(pipeline.settings.output_dir.join("stale.txt"), "old").unwrap();

        let sink = AppVeyorSink::disabled();
        let report = pipeline.run_with_sink("Clean", &sink).await.unwrap();

        assert!(report.success());
        assert!(pipeline.settings.output_dir.exists());
        assert!(!pipeline.settings.output_dir.join("stale.txt").exists());
    }
}
