//! Immutable per-run settings
//!
//! Settings are assembled exactly once, before any task runs, from three
//! sources: built-in path templates relative to the project root, the
//! optional `.gantry/pipeline.yml` overlay, and the process environment.
//! The resulting [`Settings`] value is never mutated; it is passed by
//! reference into the runner and every task body.
//!
//! Values that only some tasks need (tokens, CI identifiers, the module
//! name) are captured as options and surfaced through accessor methods
//! that fail with a `Configuration` error at the point of use, so a local
//! run without CI variables can still execute the tasks that don't need
//! them.

use std::env;
use std::path::{Path, PathBuf};

use crate::configs::{parse_pipeline_config, PipelineFileConfig};
use crate::types::{PipelineError, PipelineResult};

/// Location of the overlay file, relative to the project root.
pub const CONFIG_RELATIVE_PATH: &str = ".gantry/pipeline.yml";

/// Raw environment values consumed by the pipeline.
///
/// All fields are optional; empty strings are treated as unset.
#[derive(Debug, Clone, Default)]
pub struct EnvVars {
    /// `APPVEYOR_API_URL` - build-worker API root; presence enables the
    /// reporting sink.
    pub api_url: Option<String>,
    /// `APPVEYOR_JOB_ID` - used by the test-results upload task.
    pub job_id: Option<String>,
    /// `APPVEYOR_REPO_BRANCH` - branch being built.
    pub branch: Option<String>,
    /// `APPVEYOR_PULL_REQUEST_NUMBER` - set on pull-request builds.
    pub pull_request_number: Option<String>,
    /// `APPVEYOR_BUILD_VERSION` - target version for the manifest bump.
    pub build_version: Option<String>,
    /// `APPVEYOR_PROJECT_NAME` - fallback for the module name.
    pub project_name: Option<String>,
    /// `APPVEYOR_REPO_NAME` - "owner/repo" slug used to build the push URL.
    pub repo_name: Option<String>,
    /// `COVERALLS_REPO_TOKEN` - coverage service key (secret).
    pub coverage_token: Option<String>,
    /// `GITHUB_TOKEN` - source-control credential (secret).
    pub git_token: Option<String>,
}

impl EnvVars {
    /// Capture the relevant variables from the process environment.
    pub fn from_process() -> Self {
        fn var(name: &str) -> Option<String> {
            env::var(name).ok().filter(|value| !value.is_empty())
        }

        Self {
            api_url: var("APPVEYOR_API_URL"),
            job_id: var("APPVEYOR_JOB_ID"),
            branch: var("APPVEYOR_REPO_BRANCH"),
            pull_request_number: var("APPVEYOR_PULL_REQUEST_NUMBER"),
            build_version: var("APPVEYOR_BUILD_VERSION"),
            project_name: var("APPVEYOR_PROJECT_NAME"),
            repo_name: var("APPVEYOR_REPO_NAME"),
            coverage_token: var("COVERALLS_REPO_TOKEN"),
            git_token: var("GITHUB_TOKEN"),
        }
    }
}

/// Names of the external tool commands the pipeline shells out to.
#[derive(Debug, Clone)]
pub struct ToolSettings {
    pub dependency_manager: String,
    pub test_runner: String,
    pub analyzer: String,
    pub coverage_publisher: String,
    pub docs_generator: String,
    pub git: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            dependency_manager: "psdepend".to_string(),
            test_runner: "pester".to_string(),
            analyzer: "psscriptanalyzer".to_string(),
            coverage_publisher: "coveralls".to_string(),
            docs_generator: "platyps".to_string(),
            git: "git".to_string(),
        }
    }
}

/// Explicit stage inclusion/exclusion flags.
///
/// Disabled stages are left out of the composite task lists at registry
/// construction; they never appear in a resolved sequence.
#[derive(Debug, Clone)]
pub struct StageToggles {
    pub integration_tests: bool,
    pub publish_coverage: bool,
    pub upload_test_results: bool,
    pub push_changes: bool,
}

impl Default for StageToggles {
    fn default() -> Self {
        Self {
            // There are no integration tests in a fresh project; the stage
            // is opt-in via `.gantry/pipeline.yml`.
            integration_tests: false,
            publish_coverage: true,
            upload_test_results: true,
            push_changes: true,
        }
    }
}

/// Immutable configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub root: PathBuf,
    /// Module name, if it could be determined at load time.
    pub module: Option<String>,
    /// Branch the push task targets.
    pub default_branch: String,
    /// Commit message template; `{version}` is substituted at push time.
    pub commit_message: String,
    pub output_dir: PathBuf,
    pub test_results_dir: PathBuf,
    pub docs_dir: PathBuf,
    /// Generated documentation-site index (static header + one entry per
    /// generated page).
    pub site_index_path: PathBuf,
    pub unit_tests_dir: PathBuf,
    pub integration_tests_dir: PathBuf,
    pub env: EnvVars,
    pub tools: ToolSettings,
    pub stages: StageToggles,
}

impl Settings {
    /// Load settings from the overlay file and the process environment.
    pub fn load(root: &Path) -> PipelineResult<Self> {
        Self::with_env(root, EnvVars::from_process())
    }

    /// Load settings with an explicit environment (used by tests).
    pub fn with_env(root: &Path, env: EnvVars) -> PipelineResult<Self> {
        let config = Self::load_overlay(root)?;

        let module = config
            .module
            .clone()
            .or_else(|| env.project_name.clone())
            .or_else(|| {
                // Relative roots like "." have no file name until resolved.
                let resolved = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
                resolved
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(str::to_string)
            });

        let output_dir = root.join(config.output_dir.as_deref().unwrap_or("output"));
        let test_results_dir = output_dir.join("test-results");

        let tools = ToolSettings {
            dependency_manager: override_tool(&config, |t| &t.dependency_manager, "psdepend"),
            test_runner: override_tool(&config, |t| &t.test_runner, "pester"),
            analyzer: override_tool(&config, |t| &t.analyzer, "psscriptanalyzer"),
            coverage_publisher: override_tool(&config, |t| &t.coverage_publisher, "coveralls"),
            docs_generator: override_tool(&config, |t| &t.docs_generator, "platyps"),
            git: override_tool(&config, |t| &t.git, "git"),
        };

        let defaults = StageToggles::default();
        let stages = match &config.stages {
            Some(stages) => StageToggles {
                integration_tests: stages
                    .integration_tests
                    .unwrap_or(defaults.integration_tests),
                publish_coverage: stages.publish_coverage.unwrap_or(defaults.publish_coverage),
                upload_test_results: stages
                    .upload_test_results
                    .unwrap_or(defaults.upload_test_results),
                push_changes: stages.push_changes.unwrap_or(defaults.push_changes),
            },
            None => defaults,
        };

        Ok(Self {
            root: root.to_path_buf(),
            module,
            default_branch: config
                .default_branch
                .clone()
                .unwrap_or_else(|| "master".to_string()),
            commit_message: config
                .commit_message
                .clone()
                .unwrap_or_else(|| "Update version to {version} [skip ci]".to_string()),
            output_dir,
            test_results_dir,
            docs_dir: root.join("docs"),
            site_index_path: root.join("mkdocs.yml"),
            unit_tests_dir: root.join("tests").join("unit"),
            integration_tests_dir: root.join("tests").join("integration"),
            env,
            tools,
            stages,
        })
    }

    fn load_overlay(root: &Path) -> PipelineResult<PipelineFileConfig> {
        let config_path = root.join(CONFIG_RELATIVE_PATH);
        if !config_path.exists() {
            return Ok(PipelineFileConfig::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            PipelineError::Configuration(format!(
                "Failed to read pipeline config {}: {}",
                config_path.display(),
                e
            ))
        })?;

        parse_pipeline_config(&content).map_err(|e| {
            PipelineError::Configuration(format!(
                "Failed to parse pipeline config {}: {}",
                config_path.display(),
                e
            ))
        })
    }

    /// Module name, required by the source-dir, manifest, analysis, and
    /// documentation tasks.
    pub fn module_name(&self) -> PipelineResult<&str> {
        self.module.as_deref().ok_or_else(|| {
            PipelineError::Configuration(
                "module name is not set; add `module` to .gantry/pipeline.yml \
                 or set APPVEYOR_PROJECT_NAME"
                    .to_string(),
            )
        })
    }

    /// Directory holding the module source (`<root>/<Module>`).
    pub fn source_dir(&self) -> PipelineResult<PathBuf> {
        Ok(self.root.join(self.module_name()?))
    }

    /// Module manifest (`<root>/<Module>/<Module>.psd1`).
    pub fn manifest_path(&self) -> PipelineResult<PathBuf> {
        let module = self.module_name()?;
        Ok(self.root.join(module).join(format!("{module}.psd1")))
    }

    pub fn build_version(&self) -> PipelineResult<&str> {
        require(&self.env.build_version, "APPVEYOR_BUILD_VERSION")
    }

    pub fn job_id(&self) -> PipelineResult<&str> {
        require(&self.env.job_id, "APPVEYOR_JOB_ID")
    }

    pub fn repo_slug(&self) -> PipelineResult<&str> {
        require(&self.env.repo_name, "APPVEYOR_REPO_NAME")
    }

    pub fn coverage_token(&self) -> PipelineResult<&str> {
        require(&self.env.coverage_token, "COVERALLS_REPO_TOKEN")
    }

    pub fn git_token(&self) -> PipelineResult<&str> {
        require(&self.env.git_token, "GITHUB_TOKEN")
    }

    pub fn is_pull_request(&self) -> bool {
        self.env.pull_request_number.is_some()
    }

    // Artifact paths shared between producing and consuming tasks.

    pub fn unit_results_xml(&self) -> PathBuf {
        self.test_results_dir.join("unit-tests.xml")
    }

    pub fn unit_summary_json(&self) -> PathBuf {
        self.test_results_dir.join("unit-tests.json")
    }

    pub fn integration_results_xml(&self) -> PathBuf {
        self.test_results_dir.join("integration-tests.xml")
    }

    pub fn integration_summary_json(&self) -> PathBuf {
        self.test_results_dir.join("integration-tests.json")
    }

    pub fn coverage_file(&self) -> PathBuf {
        self.test_results_dir.join("coverage.json")
    }

    pub fn analysis_file(&self) -> PathBuf {
        self.output_dir.join("analysis.json")
    }
}

fn override_tool(
    config: &PipelineFileConfig,
    pick: impl Fn(&crate::configs::ToolsConfig) -> &Option<String>,
    default: &str,
) -> String {
    config
        .tools
        .as_ref()
        .and_then(|tools| pick(tools).clone())
        .unwrap_or_else(|| default.to_string())
}

fn require<'a>(value: &'a Option<String>, var: &str) -> PipelineResult<&'a str> {
    value.as_deref().ok_or_else(|| {
        PipelineError::Configuration(format!("required environment variable {var} is not set"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_overlay_or_env() {
        let temp_dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_env(temp_dir.path(), EnvVars::default()).unwrap();

        assert_eq!(settings.default_branch, "master");
        assert_eq!(settings.output_dir, temp_dir.path().join("output"));
        assert_eq!(
            settings.test_results_dir,
            temp_dir.path().join("output").join("test-results")
        );
        assert_eq!(settings.tools.test_runner, "pester");
        assert!(
            !settings.stages.integration_tests,
            "Integration tests should be off by default"
        );
        assert!(settings.stages.push_changes);

        // Module falls back to the root directory name.
        let expected = temp_dir
            .path()
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(settings.module_name().unwrap(), expected);
    }

    #[test]
    fn test_dot_root_falls_back_to_directory_name() {
        let settings = Settings::with_env(Path::new("."), EnvVars::default()).unwrap();

        let expected = std::env::current_dir()
            .unwrap()
            .canonicalize()
            .unwrap()
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(
            settings.module_name().unwrap(),
            expected,
            "A relative root should still yield a directory-name module"
        );
    }

    #[test]
    fn test_env_project_name_beats_directory_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let env = EnvVars {
            project_name: Some("Sampler".to_string()),
            ..EnvVars::default()
        };
        let settings = Settings::with_env(temp_dir.path(), env).unwrap();

        assert_eq!(settings.module_name().unwrap(), "Sampler");
        assert_eq!(
            settings.manifest_path().unwrap(),
            temp_dir.path().join("Sampler").join("Sampler.psd1")
        );
    }

    #[test]
    fn test_overlay_beats_env() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_dir = temp_dir.path().join(".gantry");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("pipeline.yml"),
            "module: FromConfig\noutputDir: out\nstages:\n  integrationTests: true\n",
        )
        .unwrap();

        let env = EnvVars {
            project_name: Some("FromEnv".to_string()),
            ..EnvVars::default()
        };
        let settings = Settings::with_env(temp_dir.path(), env).unwrap();

        assert_eq!(settings.module_name().unwrap(), "FromConfig");
        assert_eq!(settings.output_dir, temp_dir.path().join("out"));
        assert!(settings.stages.integration_tests);
        // Unlisted toggles keep their defaults.
        assert!(settings.stages.publish_coverage);
    }

    #[test]
    fn test_broken_overlay_fails_at_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_dir = temp_dir.path().join(".gantry");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("pipeline.yml"), "stages: [not, a, map]\n").unwrap();

        let err = Settings::with_env(temp_dir.path(), EnvVars::default()).unwrap_err();
        assert!(
            err.to_string().contains("pipeline.yml"),
            "Load error should name the config file: {}",
            err
        );
    }

    #[test]
    fn test_secrets_fail_lazily_with_variable_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_env(temp_dir.path(), EnvVars::default()).unwrap();

        let err = settings.coverage_token().unwrap_err();
        assert!(
            err.to_string().contains("COVERALLS_REPO_TOKEN"),
            "Error should name the missing variable: {}",
            err
        );
        let err = settings.build_version().unwrap_err();
        assert!(err.to_string().contains("APPVEYOR_BUILD_VERSION"));
    }

    #[test]
    fn test_empty_env_values_count_as_unset() {
        std::env::set_var("APPVEYOR_PULL_REQUEST_NUMBER", "");
        std::env::set_var("APPVEYOR_JOB_ID", "");
        let env = EnvVars::from_process();
        std::env::remove_var("APPVEYOR_PULL_REQUEST_NUMBER");
        std::env::remove_var("APPVEYOR_JOB_ID");

        assert!(env.pull_request_number.is_none());
        assert!(env.job_id.is_none());

        let temp_dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_env(temp_dir.path(), env).unwrap();
        assert!(!settings.is_pull_request());
        assert!(settings.job_id().is_err());
    }
}
