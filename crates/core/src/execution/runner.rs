//! High-level pipeline runner.
//!
//! Executes a resolved task sequence strictly in order, one task at a
//! time. Each task gets a banner, a started/finished announcement on the
//! status sink, and a record in the run history. The first failure aborts
//! the run; tasks after the failing one never start, and everything that
//! did run stays in the history for reporting.

use std::time::{Duration, Instant};

use colored::*;

use crate::registry::{Registry, TaskContext, TaskId};
use crate::reporting::StatusSink;
use crate::results::{
    RunHistory, RunReport, RunStatus, StageReport, TaskFailure, TaskOutcome, TaskRecord,
};
use crate::settings::Settings;

/// Runs task sequences against a registry.
pub struct PipelineRunner<'a, S> {
    settings: &'a Settings,
    registry: &'a Registry,
    sink: &'a S,
}

impl<'a, S: StatusSink> PipelineRunner<'a, S> {
    pub fn new(settings: &'a Settings, registry: &'a Registry, sink: &'a S) -> Self {
        Self {
            settings,
            registry,
            sink,
        }
    }

    /// Execute the sequence and report how the run ended.
    pub async fn run(&self, sequence: &[TaskId]) -> RunReport {
        let mut history = RunHistory::new();

        if sequence.is_empty() {
            println!("Nothing to run.");
            return RunReport {
                status: RunStatus::AllPassed,
                history,
                failure: None,
            };
        }

        for (index, id) in sequence.iter().enumerate() {
            println!();
            println!(
                "┌─ {} {}",
                format!("Running task '{}'", id).bold(),
                format!("({}/{})", index + 1, sequence.len()).bright_black()
            );

            let Some(spec) = self.registry.spec(*id) else {
                let message = format!("Unknown task: '{}'", id);
                println!("└─ {} {}", "✗".red().bold(), message.red());
                self.sink
                    .task_finished(*id, TaskOutcome::Failed, Some(&message))
                    .await;
                history.record(TaskRecord {
                    id: *id,
                    outcome: TaskOutcome::Failed,
                    duration: Duration::ZERO,
                    report: StageReport::empty(),
                });
                return RunReport {
                    status: RunStatus::Aborted,
                    history,
                    failure: Some(TaskFailure {
                        task: *id,
                        message,
                    }),
                };
            };

            self.sink.task_started(*id).await;
            let started = Instant::now();
            let ctx = TaskContext {
                settings: self.settings,
                history: &history,
            };
            let result = spec.execute(ctx).await;
            let duration = started.elapsed();

            match result {
                Ok(report) => {
                    println!(
                        "└─ {} {}",
                        "✓".green().bold(),
                        format!("Passed in {:.2?}", duration).green()
                    );
                    self.sink
                        .task_finished(*id, TaskOutcome::Passed, None)
                        .await;
                    history.record(TaskRecord {
                        id: *id,
                        outcome: TaskOutcome::Passed,
                        duration,
                        report,
                    });
                }
                Err(e) => {
                    let message = e.to_string();
                    println!(
                        "└─ {} {}",
                        "✗".red().bold(),
                        format!("Failed in {:.2?}: {}", duration, message).red()
                    );
                    self.sink
                        .task_finished(*id, TaskOutcome::Failed, Some(&message))
                        .await;
                    history.record(TaskRecord {
                        id: *id,
                        outcome: TaskOutcome::Failed,
                        duration,
                        report: StageReport::empty(),
                    });
                    return RunReport {
                        status: RunStatus::Aborted,
                        history,
                        failure: Some(TaskFailure {
                            task: *id,
                            message,
                        }),
                    };
                }
            }
        }

        println!();
        println!(
            "{}",
            format!("✓ {} task(s) passed", history.passed_count())
                .green()
                .bold()
        );
        RunReport {
            status: RunStatus::AllPassed,
            history,
            failure: None,
        }
    }
}
