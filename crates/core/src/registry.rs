//! Task registry and dependency resolution.
//!
//! Every runnable unit of the pipeline is a [`TaskSpec`]: an identity, a
//! list of prerequisite tasks, and an optional body. Tasks without a body
//! are composites, pure grouping nodes that expand to their prerequisites
//! and never execute themselves.
//!
//! [`Registry::resolve`] turns a target task into the flat sequence the
//! runner executes: prerequisites depth-first before dependents, each task
//! at most once, ties broken by the order prerequisites were declared. The
//! same registry always yields the same sequence.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use petgraph::algo::kosaraju_scc;
use petgraph::prelude::*;

use crate::results::{RunHistory, StageReport};
use crate::settings::Settings;
use crate::types::{PipelineError, PipelineResult};

/// Identity of a pipeline task.
///
/// The canonical names (returned by [`TaskId::name`]) are what users type
/// on the command line and what the banners print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskId {
    /// The default composite, named `.`.
    All,
    Clean,
    InstallDependencies,
    /// Composite grouping the test stages.
    Test,
    UnitTests,
    FailIfFailedUnitTest,
    IntegrationTests,
    FailIfFailedIntegrationTest,
    PublishUnitTestsCoverage,
    UploadTestResultsToAppVeyor,
    Analyze,
    FailIfAnalyzeFindings,
    BuildDocumentation,
    SetModuleVersion,
    PushBuildChangesToRepo,
    CopySourceToBuildOutput,
}

impl TaskId {
    /// Canonical user-facing task name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::All => ".",
            Self::Clean => "Clean",
            Self::InstallDependencies => "Install_Dependencies",
            Self::Test => "Test",
            Self::UnitTests => "Unit_Tests",
            Self::FailIfFailedUnitTest => "Fail_If_Failed_Unit_Test",
            Self::IntegrationTests => "Integration_Tests",
            Self::FailIfFailedIntegrationTest => "Fail_If_Failed_Integration_Test",
            Self::PublishUnitTestsCoverage => "Publish_Unit_Tests_Coverage",
            Self::UploadTestResultsToAppVeyor => "Upload_Test_Results_To_AppVeyor",
            Self::Analyze => "Analyze",
            Self::FailIfAnalyzeFindings => "Fail_If_Analyze_Findings",
            Self::BuildDocumentation => "Build_Documentation",
            Self::SetModuleVersion => "Set_Module_Version",
            Self::PushBuildChangesToRepo => "Push_Build_Changes_To_Repo",
            Self::CopySourceToBuildOutput => "Copy_Source_To_Build_Output",
        }
    }

    /// Look up a task by its canonical name. Names are matched exactly.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "." => Some(Self::All),
            "Clean" => Some(Self::Clean),
            "Install_Dependencies" => Some(Self::InstallDependencies),
            "Test" => Some(Self::Test),
            "Unit_Tests" => Some(Self::UnitTests),
            "Fail_If_Failed_Unit_Test" => Some(Self::FailIfFailedUnitTest),
            "Integration_Tests" => Some(Self::IntegrationTests),
            "Fail_If_Failed_Integration_Test" => Some(Self::FailIfFailedIntegrationTest),
            "Publish_Unit_Tests_Coverage" => Some(Self::PublishUnitTestsCoverage),
            "Upload_Test_Results_To_AppVeyor" => Some(Self::UploadTestResultsToAppVeyor),
            "Analyze" => Some(Self::Analyze),
            "Fail_If_Analyze_Findings" => Some(Self::FailIfAnalyzeFindings),
            "Build_Documentation" => Some(Self::BuildDocumentation),
            "Set_Module_Version" => Some(Self::SetModuleVersion),
            "Push_Build_Changes_To_Repo" => Some(Self::PushBuildChangesToRepo),
            "Copy_Source_To_Build_Output" => Some(Self::CopySourceToBuildOutput),
            _ => None,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-only view a task body receives: the run settings and the results
/// of every task that already completed.
#[derive(Clone, Copy)]
pub struct TaskContext<'a> {
    pub settings: &'a Settings,
    pub history: &'a RunHistory,
}

/// Future returned by a task body; may borrow from the context.
pub type BodyFuture<'a> = Pin<Box<dyn Future<Output = PipelineResult<StageReport>> + Send + 'a>>;

/// A registered task body.
pub type TaskBody = Box<dyn for<'a> Fn(TaskContext<'a>) -> BodyFuture<'a> + Send + Sync>;

/// One registered task: identity, prerequisites, optional body.
pub struct TaskSpec {
    pub id: TaskId,
    pub prereqs: Vec<TaskId>,
    body: Option<TaskBody>,
}

impl TaskSpec {
    /// A grouping task with no body of its own.
    pub fn composite(id: TaskId, prereqs: Vec<TaskId>) -> Self {
        Self {
            id,
            prereqs,
            body: None,
        }
    }

    /// A runnable task.
    pub fn action<F>(id: TaskId, prereqs: Vec<TaskId>, body: F) -> Self
    where
        F: for<'a> Fn(TaskContext<'a>) -> BodyFuture<'a> + Send + Sync + 'static,
    {
        Self {
            id,
            prereqs,
            body: Some(Box::new(body)),
        }
    }

    pub fn is_composite(&self) -> bool {
        self.body.is_none()
    }

    /// Invoke the body. Returns an empty report for composites.
    pub fn execute<'a>(&'a self, ctx: TaskContext<'a>) -> BodyFuture<'a> {
        match &self.body {
            Some(body) => body(ctx),
            None => Box::pin(async { Ok(StageReport::empty()) }),
        }
    }
}

/// The set of known tasks, in declaration order.
#[derive(Default)]
pub struct Registry {
    specs: HashMap<TaskId, TaskSpec>,
    order: Vec<TaskId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task. Re-registering an id replaces the spec but keeps its
    /// original position in declaration order.
    pub fn register(&mut self, spec: TaskSpec) {
        if !self.specs.contains_key(&spec.id) {
            self.order.push(spec.id);
        }
        self.specs.insert(spec.id, spec);
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.specs.contains_key(&id)
    }

    pub fn spec(&self, id: TaskId) -> Option<&TaskSpec> {
        self.specs.get(&id)
    }

    /// All registered tasks, in declaration order.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskSpec> {
        self.order.iter().map(|id| &self.specs[id])
    }

    /// Check the whole registry: every prerequisite must be registered and
    /// the prerequisite graph must be acyclic. Runs before any resolution
    /// so a broken registry fails no matter which target was requested.
    pub fn validate(&self) -> PipelineResult<()> {
        for id in &self.order {
            for prereq in &self.specs[id].prereqs {
                if !self.specs.contains_key(prereq) {
                    return Err(PipelineError::UnknownTask(format!(
                        "'{prereq}' (required by '{id}')"
                    )));
                }
            }
        }

        let cycles = self.detect_cycles();
        if !cycles.is_empty() {
            let message = cycles
                .into_iter()
                .map(|mut cycle| {
                    if let Some(first) = cycle.first().cloned() {
                        cycle.push(first);
                    }
                    cycle.join(" -> ")
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(PipelineError::CyclicDependency(message));
        }

        Ok(())
    }

    /// Expand a target into the execution sequence: prerequisites before
    /// dependents, each task once, composites expanded away.
    pub fn resolve(&self, target: TaskId) -> PipelineResult<Vec<TaskId>> {
        if !self.specs.contains_key(&target) {
            return Err(PipelineError::UnknownTask(format!("'{target}'")));
        }
        self.validate()?;

        let mut visited = HashSet::new();
        let mut sequence = Vec::new();
        self.visit(target, &mut visited, &mut sequence);

        sequence.retain(|id| !self.specs[id].is_composite());
        Ok(sequence)
    }

    fn visit(&self, id: TaskId, visited: &mut HashSet<TaskId>, sequence: &mut Vec<TaskId>) {
        if !visited.insert(id) {
            return;
        }
        for prereq in &self.specs[&id].prereqs {
            self.visit(*prereq, visited, sequence);
        }
        sequence.push(id);
    }

    /// Detect cycles using strongly connected components.
    fn detect_cycles(&self) -> Vec<Vec<String>> {
        let mut graph = DiGraph::<TaskId, ()>::new();
        let mut node_indices = HashMap::new();

        for id in &self.order {
            let node_index = graph.add_node(*id);
            node_indices.insert(*id, node_index);
        }

        for id in &self.order {
            let from_node = node_indices[id];
            for prereq in &self.specs[id].prereqs {
                if let Some(&to_node) = node_indices.get(prereq) {
                    graph.add_edge(from_node, to_node, ());
                }
            }
        }

        let mut cycles: Vec<Vec<String>> = kosaraju_scc(&graph)
            .into_iter()
            .filter_map(|component| {
                if component.len() > 1 {
                    let mut cycle = component
                        .iter()
                        .map(|node| graph[*node].to_string())
                        .collect::<Vec<_>>();
                    cycle.sort();
                    Some(cycle)
                } else {
                    let node = component[0];
                    if graph.contains_edge(node, node) {
                        Some(vec![graph[node].to_string()])
                    } else {
                        None
                    }
                }
            })
            .collect();

        cycles.sort();
        cycles
    }
}
