use anyhow::Result;
use colored::*;
use gantry_core::pipeline::Pipeline;

pub fn execute(pipeline: &Pipeline, target: &str) -> Result<()> {
    println!("{} {}", "Execution plan for".bold(), target.cyan());

    // Resolve the target without running anything
    let plan = pipeline
        .resolve(target)
        .map_err(|e| anyhow::anyhow!("Failed to resolve target: {}", e))?;

    if plan.is_empty() {
        println!();
        println!("  {}", "No runnable tasks".dimmed());
        return Ok(());
    }

    println!("\n{}:", "Execution order".bold());
    for (i, task) in plan.iter().enumerate() {
        println!("  {}. {}", i + 1, task);
    }

    Ok(())
}
