//! Staging tasks: resetting the build output directory and copying the
//! module source tree into it.

use std::collections::VecDeque;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::registry::TaskContext;
use crate::results::StageReport;
use crate::types::{PipelineError, PipelineResult};

const COPY_EXCLUDE_GLOBS: &[&str] = &[
    "**/.git",
    "**/.git/**",
    "**/.gantry",
    "**/.gantry/**",
    "**/output",
    "**/output/**",
];

/// Remove the build output directory and recreate it empty.
pub async fn clean(ctx: TaskContext<'_>) -> PipelineResult<StageReport> {
    let output_dir = &ctx.settings.output_dir;
    if output_dir.exists() {
        std::fs::remove_dir_all(output_dir)?;
    }
    std::fs::create_dir_all(output_dir)?;
    Ok(StageReport::empty())
}

/// Copy the module source tree into the build output directory.
pub async fn copy_source(ctx: TaskContext<'_>) -> PipelineResult<StageReport> {
    let source_dir = ctx.settings.source_dir()?;
    if !source_dir.is_dir() {
        return Err(PipelineError::Configuration(format!(
            "Module source directory {} does not exist",
            source_dir.display()
        )));
    }

    let module = ctx.settings.module_name()?;
    let destination = ctx.settings.output_dir.join(module);
    let copied = copy_tree(&source_dir, &destination)?;
    println!("Copied {} file(s) to {}", copied, destination.display());
    Ok(StageReport::empty())
}

/// Recursively copy a directory tree, skipping excluded paths.
/// Returns the number of files copied.
pub fn copy_tree(source: &Path, destination: &Path) -> PipelineResult<usize> {
    let exclude_set = exclude_set();
    std::fs::create_dir_all(destination)?;

    let mut copied = 0;
    let mut queue = VecDeque::new();
    queue.push_back(source.to_path_buf());

    while let Some(current_dir) = queue.pop_front() {
        for entry in std::fs::read_dir(&current_dir)? {
            let entry = entry?;
            let path = entry.path();
            let relative_path = path.strip_prefix(source).unwrap_or(&path);

            if exclude_set.is_match(relative_path) {
                continue;
            }

            let target = destination.join(relative_path);
            if path.is_dir() {
                std::fs::create_dir_all(&target)?;
                queue.push_back(path);
            } else {
                std::fs::copy(&path, &target)?;
                copied += 1;
            }
        }
    }

    Ok(copied)
}

fn exclude_set() -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in COPY_EXCLUDE_GLOBS {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder.build().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TaskContext;
    use crate::results::RunHistory;
    use crate::settings::{EnvVars, Settings};

    #[tokio::test]
    async fn test_clean_discards_stale_output() {
        let temp_dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_env(temp_dir.path(), EnvVars::default()).unwrap();
        std::fs::create_dir_all(&settings.output_dir).unwrap();
        std::fs::write(settings.output_dir.join("stale.txt"), "old").unwrap();

        let history = RunHistory::new();
        clean(TaskContext {
            settings: &settings,
            history: &history,
        })
        .await
        .unwrap();

        assert!(settings.output_dir.exists());
        assert!(!settings.output_dir.join("stale.txt").exists());
    }

    #[tokio::test]
    async fn test_clean_creates_missing_output_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_env(temp_dir.path(), EnvVars::default()).unwrap();
        assert!(!settings.output_dir.exists());

        let history = RunHistory::new();
        clean(TaskContext {
            settings: &settings,
            history: &history,
        })
        .await
        .unwrap();

        assert!(settings.output_dir.exists());
    }

    #[test]
    fn test_copy_tree_copies_nested_files_and_skips_excluded() {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = temp_dir.path().join("src");
        std::fs::create_dir_all(source.join("sub")).unwrap();
        std::fs::create_dir_all(source.join(".git")).unwrap();
        std::fs::write(source.join("a.txt"), "a").unwrap();
        std::fs::write(source.join("sub").join("b.txt"), "b").unwrap();
        std::fs::write(source.join(".git").join("HEAD"), "ref").unwrap();

        let destination = temp_dir.path().join("dest");
        let copied = copy_tree(&source, &destination).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(
            std::fs::read_to_string(destination.join("sub").join("b.txt")).unwrap(),
            "b"
        );
        assert!(
            !destination.join(".git").exists(),
            "Version control metadata should not be copied"
        );
    }

    #[tokio::test]
    async fn test_copy_source_places_module_under_output() {
        let temp_dir = tempfile::tempdir().unwrap();
        let module_dir = temp_dir.path().join("Widget");
        std::fs::create_dir_all(&module_dir).unwrap();
        std::fs::write(module_dir.join("Widget.psd1"), "ModuleVersion = '1.0.0'").unwrap();

        let env = EnvVars {
            project_name: Some("Widget".to_string()),
            ..EnvVars::default()
        };
        let settings = Settings::with_env(temp_dir.path(), env).unwrap();
        let history = RunHistory::new();

        copy_source(TaskContext {
            settings: &settings,
            history: &history,
        })
        .await
        .unwrap();

        assert!(settings
            .output_dir
            .join("Widget")
            .join("Widget.psd1")
            .exists());
    }

    #[tokio::test]
    async fn test_copy_source_fails_when_module_dir_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let env = EnvVars {
            project_name: Some("Widget".to_string()),
            ..EnvVars::default()
        };
        let settings = Settings::with_env(temp_dir.path(), env).unwrap();
        let history = RunHistory::new();

        let err = copy_source(TaskContext {
            settings: &settings,
            history: &history,
        })
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::Configuration(_)));
        assert!(err.to_string().contains("Widget"));
    }
}
