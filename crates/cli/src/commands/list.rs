use anyhow::Result;
use colored::*;
use gantry_core::pipeline::Pipeline;

pub fn execute(pipeline: &Pipeline) -> Result<()> {
    println!("{}", "Tasks".bold().underline());

    let mut listed = 0;
    for spec in pipeline.tasks() {
        listed += 1;
        if spec.is_composite() {
            println!("{} {}", spec.id.name().blue().bold(), "[composite]".dimmed());
        } else {
            println!("{}", spec.id.name().blue().bold());
        }
    }

    if listed == 0 {
        println!("  {}", "No tasks registered".dimmed());
    }

    Ok(())
}
