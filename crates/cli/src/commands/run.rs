use anyhow::Result;
use colored::*;
use gantry_core::pipeline::Pipeline;
use gantry_core::results::RunStatus;

pub async fn execute(pipeline: &Pipeline, target: &str) -> Result<()> {
    println!("{} {}", "Running target".bold(), target.cyan());

    // Resolve and execute using the pipeline
    let report = pipeline
        .run(target)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run target: {}", e))?;

    match report.status {
        RunStatus::AllPassed => {
            println!();
            println!(
                "{} {}",
                "✓".green().bold(),
                "All tasks completed successfully!".green().bold()
            );
            Ok(())
        }
        RunStatus::Aborted => match report.failure {
            Some(failure) => Err(anyhow::anyhow!(
                "Task '{}' failed: {}",
                failure.task,
                failure.message
            )),
            None => Err(anyhow::anyhow!("Pipeline aborted")),
        },
    }
}
