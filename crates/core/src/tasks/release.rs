//! Release tasks: stamping the build version into the module manifest and
//! pushing the resulting change back to the repository.

use std::path::Path;

use regex::Regex;

use crate::execution::command::CommandExecutor;
use crate::registry::TaskContext;
use crate::results::StageReport;
use crate::types::{PipelineError, PipelineResult};

const COMMIT_USER_NAME: &str = "Gantry Build";
const COMMIT_USER_EMAIL: &str = "gantry-build@users.noreply.github.com";

fn version_pattern() -> PipelineResult<Regex> {
    Regex::new(r"ModuleVersion\s*=\s*'(?P<version>[^']*)'")
        .map_err(|e| PipelineError::Configuration(format!("Invalid version pattern: {}", e)))
}

/// Rewrite the first `ModuleVersion = '...'` entry to the given version,
/// leaving the surrounding text byte-for-byte intact.
pub fn rewrite_version(content: &str, version: &str, manifest: &Path) -> PipelineResult<String> {
    let pattern = version_pattern()?;
    let caps = pattern.captures(content).ok_or_else(|| {
        PipelineError::Configuration(format!(
            "No ModuleVersion entry found in {}",
            manifest.display()
        ))
    })?;
    let group = caps.name("version").ok_or_else(|| {
        PipelineError::Configuration("Version pattern matched without a version group".to_string())
    })?;

    let mut updated = String::with_capacity(content.len());
    updated.push_str(&content[..group.start()]);
    updated.push_str(version);
    updated.push_str(&content[group.end()..]);
    Ok(updated)
}

/// The version currently recorded in the manifest text, if any.
pub fn extract_version(content: &str) -> PipelineResult<Option<String>> {
    Ok(version_pattern()?
        .captures(content)
        .and_then(|caps| caps.name("version"))
        .map(|m| m.as_str().to_string()))
}

/// Stamp the build version into the module manifest, then re-read the
/// file and re-match to prove the rewrite took.
pub async fn set_module_version(ctx: TaskContext<'_>) -> PipelineResult<StageReport> {
    let version = ctx.settings.build_version()?.to_string();
    let manifest_path = ctx.settings.manifest_path()?;
    if !manifest_path.exists() {
        return Err(PipelineError::Configuration(format!(
            "Module manifest {} does not exist",
            manifest_path.display()
        )));
    }

    let content = std::fs::read_to_string(&manifest_path)?;
    let updated = rewrite_version(&content, &version, &manifest_path)?;
    std::fs::write(&manifest_path, updated)?;

    let reread = std::fs::read_to_string(&manifest_path)?;
    match extract_version(&reread)? {
        Some(found) if found == version => {}
        Some(found) => {
            return Err(PipelineError::VersionMismatch {
                expected: version,
                found,
            })
        }
        None => {
            return Err(PipelineError::VersionMismatch {
                expected: version,
                found: "<none>".to_string(),
            })
        }
    }

    println!("Set module version to {}", version);
    Ok(StageReport::empty())
}

/// Commit the manifest change and push it to the default branch.
///
/// Pull-request builds and builds of other branches skip the push; the
/// version stamp stays local to the build.
pub async fn push_build_changes_to_repo(ctx: TaskContext<'_>) -> PipelineResult<StageReport> {
    let settings = ctx.settings;

    if settings.is_pull_request() {
        println!("Skipping push for pull-request build");
        return Ok(StageReport::empty());
    }
    match &settings.env.branch {
        Some(branch) if *branch == settings.default_branch => {}
        Some(branch) => {
            println!(
                "Skipping push for branch '{}' (pushes target '{}')",
                branch, settings.default_branch
            );
            return Ok(StageReport::empty());
        }
        None => {
            println!("Skipping push outside CI");
            return Ok(StageReport::empty());
        }
    }

    let version = settings.build_version()?.to_string();
    let token = settings.git_token()?.to_string();
    let slug = settings.repo_slug()?.to_string();

    let manifest_path = settings.manifest_path()?;
    let manifest_rel = manifest_path
        .strip_prefix(&settings.root)
        .unwrap_or(&manifest_path)
        .display()
        .to_string();

    let executor = CommandExecutor::new(settings);
    let git = &settings.tools.git;

    let changed = executor.run_tool_status(
        git,
        &[
            "diff".to_string(),
            "--quiet".to_string(),
            "--".to_string(),
            manifest_rel.clone(),
        ],
    )?;
    // `diff --quiet` exits 0 for no changes and 1 for changes; anything
    // else means the diff itself could not run.
    match changed {
        0 => {
            println!("No manifest changes to push");
            return Ok(StageReport::empty());
        }
        1 => {}
        code => {
            return Err(PipelineError::ExternalTool(format!(
                "'{} diff' failed with exit code {}",
                git, code
            )));
        }
    }

    executor.git(&["add".to_string(), manifest_rel])?;

    let message = settings.commit_message.replace("{version}", &version);
    executor.git(&[
        "-c".to_string(),
        format!("user.name={}", COMMIT_USER_NAME),
        "-c".to_string(),
        format!("user.email={}", COMMIT_USER_EMAIL),
        "commit".to_string(),
        "-m".to_string(),
        message,
    ])?;

    let remote = format!("https://{}@github.com/{}.git", token, slug);
    executor.git(&[
        "push".to_string(),
        remote,
        format!("HEAD:{}", settings.default_branch),
    ])?;

    println!("Pushed version {} to {}", version, settings.default_branch);
    Ok(StageReport::empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::RunHistory;
    use crate::settings::{EnvVars, Settings};

    const MANIFEST: &str = "@{\n    RootModule = 'Widget.psm1'\n    ModuleVersion = '1.0.0'\n    Description = 'A sample module'\n}\n";

    #[test]
    fn test_rewrite_updates_version_in_place() {
        let manifest = Path::new("Widget.psd1");
        let updated = rewrite_version(MANIFEST, "1.2.3", manifest).unwrap();
        assert!(updated.contains("ModuleVersion = '1.2.3'"));
        assert!(!updated.contains("1.0.0"));
        assert!(
            updated.contains("RootModule = 'Widget.psm1'"),
            "Unrelated entries must be untouched"
        );
    }

    #[test]
    fn test_rewrite_preserves_original_spacing() {
        let updated =
            rewrite_version("ModuleVersion='0.9.0'\n", "1.2.3", Path::new("m.psd1")).unwrap();
        assert_eq!(updated, "ModuleVersion='1.2.3'\n");
    }

    #[test]
    fn test_rewrite_touches_only_first_entry() {
        let content = "ModuleVersion = '1.0.0'\n# ModuleVersion = '9.9.9'\n";
        let updated = rewrite_version(content, "1.2.3", Path::new("m.psd1")).unwrap();
        assert_eq!(updated, "ModuleVersion = '1.2.3'\n# ModuleVersion = '9.9.9'\n");
    }

    #[test]
    fn test_rewrite_fails_without_version_entry() {
        let err = rewrite_version("@{}\n", "1.2.3", Path::new("Widget.psd1")).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
        assert!(err.to_string().contains("Widget.psd1"));
    }

    #[test]
    fn test_extract_version_reads_current_value() {
        assert_eq!(extract_version(MANIFEST).unwrap().as_deref(), Some("1.0.0"));
        assert_eq!(extract_version("@{}").unwrap(), None);
    }

    fn settings_with(root: &Path, env: EnvVars) -> Settings {
        Settings::with_env(root, env).unwrap()
    }

    #[tokio::test]
    async fn test_set_module_version_stamps_manifest() {
        let temp_dir = tempfile::tempdir().unwrap();
        let module_dir = temp_dir.path().join("Widget");
        std::fs::create_dir_all(&module_dir).unwrap();
        std::fs::write(module_dir.join("Widget.psd1"), MANIFEST).unwrap();

        let env = EnvVars {
            project_name: Some("Widget".to_string()),
            build_version: Some("1.2.3".to_string()),
            ..EnvVars::default()
        };
        let settings = settings_with(temp_dir.path(), env);
        let history = RunHistory::new();

        set_module_version(TaskContext {
            settings: &settings,
            history: &history,
        })
        .await
        .unwrap();

        let content = std::fs::read_to_string(module_dir.join("Widget.psd1")).unwrap();
        assert!(content.contains("ModuleVersion = '1.2.3'"));
    }

    #[tokio::test]
    async fn test_set_module_version_detects_post_check_mismatch() {
        let temp_dir = tempfile::tempdir().unwrap();
        let module_dir = temp_dir.path().join("Widget");
        std::fs::create_dir_all(&module_dir).unwrap();
        std::fs::write(module_dir.join("Widget.psd1"), MANIFEST).unwrap();

        // A quote in the version corrupts the entry, so the re-read
        // finds a different value than the one requested.
        let env = EnvVars {
            project_name: Some("Widget".to_string()),
            build_version: Some("1.2'3".to_string()),
            ..EnvVars::default()
        };
        let settings = settings_with(temp_dir.path(), env);
        let history = RunHistory::new();

        let err = set_module_version(TaskContext {
            settings: &settings,
            history: &history,
        })
        .await
        .unwrap_err();

        match err {
            PipelineError::VersionMismatch { expected, found } => {
                assert_eq!(expected, "1.2'3");
                assert_eq!(found, "1.2");
            }
            other => panic!("Expected a version mismatch, got: {}", other),
        }
    }

    #[tokio::test]
    async fn test_set_module_version_requires_build_version() {
        let temp_dir = tempfile::tempdir().unwrap();
        let settings = settings_with(temp_dir.path(), EnvVars::default());
        let history = RunHistory::new();

        let err = set_module_version(TaskContext {
            settings: &settings,
            history: &history,
        })
        .await
        .unwrap_err();

        assert!(err.to_string().contains("APPVEYOR_BUILD_VERSION"));
    }

    #[tokio::test]
    async fn test_set_module_version_requires_manifest() {
        let temp_dir = tempfile::tempdir().unwrap();
        let env = EnvVars {
            project_name: Some("Widget".to_string()),
            build_version: Some("1.2.3".to_string()),
            ..EnvVars::default()
        };
        let settings = settings_with(temp_dir.path(), env);
        let history = RunHistory::new();

        let err = set_module_version(TaskContext {
            settings: &settings,
            history: &history,
        })
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::Configuration(_)));
        assert!(err.to_string().contains("Widget.psd1"));
    }

    #[tokio::test]
    async fn test_push_skipped_for_pull_request() {
        let temp_dir = tempfile::tempdir().unwrap();
        let env = EnvVars {
            pull_request_number: Some("17".to_string()),
            branch: Some("master".to_string()),
            ..EnvVars::default()
        };
        let settings = settings_with(temp_dir.path(), env);
        let history = RunHistory::new();

        push_build_changes_to_repo(TaskContext {
            settings: &settings,
            history: &history,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_push_skipped_off_default_branch() {
        let temp_dir = tempfile::tempdir().unwrap();
        let env = EnvVars {
            branch: Some("feature/shiny".to_string()),
            ..EnvVars::default()
        };
        let settings = settings_with(temp_dir.path(), env);
        let history = RunHistory::new();

        push_build_changes_to_repo(TaskContext {
            settings: &settings,
            history: &history,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_push_skipped_outside_ci() {
        let temp_dir = tempfile::tempdir().unwrap();
        let settings = settings_with(temp_dir.path(), EnvVars::default());
        let history = RunHistory::new();

        push_build_changes_to_repo(TaskContext {
            settings: &settings,
            history: &history,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_push_requires_credentials_on_default_branch() {
        let temp_dir = tempfile::tempdir().unwrap();
        let env = EnvVars {
            branch: Some("master".to_string()),
            build_version: Some("1.2.3".to_string()),
            ..EnvVars::default()
        };
        let settings = settings_with(temp_dir.path(), env);
        let history = RunHistory::new();

        let err = push_build_changes_to_repo(TaskContext {
            settings: &settings,
            history: &history,
        })
        .await
        .unwrap_err();

        assert!(
            err.to_string().contains("GITHUB_TOKEN"),
            "Missing credential should fail with the variable name: {}",
            err
        );
    }

    #[tokio::test]
    async fn test_push_fails_when_diff_cannot_run() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let module_dir = temp_dir.path().join("Widget");
        std::fs::create_dir_all(&module_dir).unwrap();
        std::fs::write(module_dir.join("Widget.psd1"), MANIFEST).unwrap();

        // Stand-in for git outside a repository: diff exits 128, which
        // is neither "unchanged" (0) nor "changed" (1).
        let fake_git = temp_dir.path().join("fake-git");
        std::fs::write(&fake_git, "#!/bin/sh\nexit 128\n").unwrap();
        std::fs::set_permissions(&fake_git, std::fs::Permissions::from_mode(0o755)).unwrap();

        let env = EnvVars {
            branch: Some("master".to_string()),
            build_version: Some("1.2.3".to_string()),
            git_token: Some("secret".to_string()),
            repo_name: Some("widgets/widget".to_string()),
            project_name: Some("Widget".to_string()),
            ..EnvVars::default()
        };
        let mut settings = settings_with(temp_dir.path(), env);
        settings.tools.git = fake_git.display().to_string();
        let history = RunHistory::new();

        let err = push_build_changes_to_repo(TaskContext {
            settings: &settings,
            history: &history,
        })
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::ExternalTool(_)));
        assert!(
            err.to_string().contains("128"),
            "The diff failure should surface its exit code: {}",
            err
        );
    }
}
