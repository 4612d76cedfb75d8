use anyhow::Result;
use colored::*;
use gantry_core::pipeline::Pipeline;

pub fn execute(pipeline: &Pipeline) -> Result<()> {
    println!("{}", "Task Dependency Graph:".bold().underline());
    println!();

    for spec in pipeline.tasks() {
        println!("{}", spec.id.name().blue().bold());

        let deps: Vec<&str> = spec.prereqs.iter().map(|id| id.name()).collect();
        if !deps.is_empty() {
            println!("  {} {}", "depends on:".dimmed(), deps.join(", "));
        } else {
            println!("  {}", "no dependencies".dimmed());
        }
        println!();
    }

    Ok(())
}
