use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::PipelineResult;

/// Contents of the optional `.gantry/pipeline.yml` overlay.
///
/// Every field is optional; absent fields fall back to the built-in
/// defaults described in [`crate::settings::Settings`].
#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PipelineFileConfig {
    /// Module name; defaults to the project name from CI, then the
    /// project root's directory name.
    pub module: Option<String>,
    /// Branch that version bumps are pushed to. Defaults to "master".
    pub default_branch: Option<String>,
    /// Build output directory, relative to the project root.
    pub output_dir: Option<String>,
    /// Commit message used by the push task; `{version}` is replaced with
    /// the build version.
    pub commit_message: Option<String>,
    pub stages: Option<StagesConfig>,
    pub tools: Option<ToolsConfig>,
}

/// Explicit stage inclusion/exclusion flags.
#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StagesConfig {
    pub integration_tests: Option<bool>,
    pub publish_coverage: Option<bool>,
    pub upload_test_results: Option<bool>,
    pub push_changes: Option<bool>,
}

/// Overrides for the external tool commands the pipeline invokes.
#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ToolsConfig {
    pub dependency_manager: Option<String>,
    pub test_runner: Option<String>,
    pub analyzer: Option<String>,
    pub coverage_publisher: Option<String>,
    pub docs_generator: Option<String>,
    pub git: Option<String>,
}

pub fn parse_pipeline_config(yaml_str: &str) -> PipelineResult<PipelineFileConfig> {
    let config: PipelineFileConfig = serde_yaml::from_str(yaml_str)?;
    Ok(config)
}
