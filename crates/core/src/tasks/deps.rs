//! Dependency installation.

use crate::execution::command::CommandExecutor;
use crate::registry::TaskContext;
use crate::results::StageReport;
use crate::types::PipelineResult;

/// Install the build-time dependencies declared by the project, by handing
/// control to the configured dependency manager.
pub async fn install_dependencies(ctx: TaskContext<'_>) -> PipelineResult<StageReport> {
    let executor = CommandExecutor::new(ctx.settings);
    executor.run_tool(
        &ctx.settings.tools.dependency_manager,
        &["install".to_string()],
    )?;
    Ok(StageReport::empty())
}
