//! Task outcomes, structured stage reports, and the run history.
//!
//! Producing tasks (test runs, analysis) return a [`StageReport`] with
//! their counts; gate tasks later read those counts back out of the
//! [`RunHistory`]. The history is owned by the runner and passed to task
//! bodies by reference, so there is no shared mutable state between tasks.

use std::time::Duration;

use serde::Deserialize;

use crate::registry::TaskId;

/// Terminal state of one attempted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Passed,
    Failed,
}

/// Counts reported by a test-runner invocation.
///
/// Parsed from the summary file the test runner writes next to its
/// results XML. Unknown fields are ignored so newer runner versions can
/// add detail without breaking the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub passed: u32,
    #[serde(default)]
    pub failed: u32,
    #[serde(default)]
    pub skipped: u32,
}

impl TestSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Counts reported by a static-analysis invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub findings: u32,
}

/// Structured data a task hands back for later tasks to inspect.
///
/// Most tasks produce nothing and return [`StageReport::empty`].
#[derive(Debug, Clone, Default)]
pub struct StageReport {
    pub tests: Option<TestSummary>,
    pub analysis: Option<AnalysisSummary>,
}

impl StageReport {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_tests(summary: TestSummary) -> Self {
        Self {
            tests: Some(summary),
            ..Self::default()
        }
    }

    pub fn with_analysis(summary: AnalysisSummary) -> Self {
        Self {
            analysis: Some(summary),
            ..Self::default()
        }
    }
}

/// One completed task, as recorded by the runner.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: TaskId,
    pub outcome: TaskOutcome,
    pub duration: Duration,
    pub report: StageReport,
}

/// Chronological record of the tasks completed so far in one run.
#[derive(Debug, Default)]
pub struct RunHistory {
    entries: Vec<TaskRecord>,
}

impl RunHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: TaskRecord) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TaskRecord] {
        &self.entries
    }

    pub fn outcome(&self, id: TaskId) -> Option<TaskOutcome> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.outcome)
    }

    /// Report from an earlier task, if that task ran.
    pub fn report(&self, id: TaskId) -> Option<&StageReport> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.report)
    }

    pub fn test_summary(&self, id: TaskId) -> Option<TestSummary> {
        self.report(id).and_then(|report| report.tests)
    }

    pub fn analysis_summary(&self, id: TaskId) -> Option<AnalysisSummary> {
        self.report(id).and_then(|report| report.analysis)
    }

    pub fn passed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.outcome == TaskOutcome::Passed)
            .count()
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every resolved task passed.
    AllPassed,
    /// A task failed; the remainder of the sequence was skipped.
    Aborted,
}

/// The failing task and its rendered error, when a run aborts.
#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub task: TaskId,
    pub message: String,
}

/// Final result of one pipeline run.
#[derive(Debug)]
pub struct RunReport {
    pub status: RunStatus,
    pub history: RunHistory,
    pub failure: Option<TaskFailure>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.status == RunStatus::AllPassed
    }
}
