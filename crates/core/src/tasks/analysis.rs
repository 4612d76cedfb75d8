//! Static analysis and its gate.
//!
//! The analyzer writes its findings to a JSON file (an array, one element
//! per finding) and exits zero whenever it ran to completion, findings or
//! not. A non-zero exit means the analyzer itself broke. The gate task
//! later fails the pipeline if the recorded finding count is non-zero.

use std::path::Path;

use crate::execution::command::CommandExecutor;
use crate::registry::{TaskContext, TaskId};
use crate::results::{AnalysisSummary, StageReport};
use crate::types::{PipelineError, PipelineResult};

/// Run the static analyzer over the module source and record how many
/// findings it reported.
pub async fn analyze(ctx: TaskContext<'_>) -> PipelineResult<StageReport> {
    let source_dir = ctx.settings.source_dir()?;
    std::fs::create_dir_all(&ctx.settings.output_dir)?;
    let analysis_file = ctx.settings.analysis_file();

    let executor = CommandExecutor::new(ctx.settings);
    executor.run_tool(
        &ctx.settings.tools.analyzer,
        &[
            "check".to_string(),
            "--path".to_string(),
            source_dir.display().to_string(),
            "--output".to_string(),
            analysis_file.display().to_string(),
        ],
    )?;

    let summary = read_findings(&analysis_file)?;
    println!("{} finding(s)", summary.findings);
    Ok(StageReport::with_analysis(summary))
}

fn read_findings(path: &Path) -> PipelineResult<AnalysisSummary> {
    if !path.exists() {
        return Err(PipelineError::ExternalTool(format!(
            "Analyzer did not produce a findings file at {}",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path)?;
    let findings: Vec<serde_json::Value> = serde_json::from_str(&content).map_err(|e| {
        PipelineError::ExternalTool(format!("Invalid findings file {}: {}", path.display(), e))
    })?;
    Ok(AnalysisSummary {
        findings: findings.len() as u32,
    })
}

/// Halt the pipeline if the analyzer reported any findings.
pub async fn fail_if_analyze_findings(ctx: TaskContext<'_>) -> PipelineResult<StageReport> {
    let summary = ctx.history.analysis_summary(TaskId::Analyze).ok_or_else(|| {
        PipelineError::Gate(format!(
            "No analysis results recorded; task '{}' did not run",
            TaskId::Analyze
        ))
    })?;

    if summary.findings > 0 {
        return Err(PipelineError::Gate(format!(
            "{} analyzer finding(s)",
            summary.findings
        )));
    }
    Ok(StageReport::empty())
}
