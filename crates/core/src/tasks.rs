//! Built-in pipeline tasks and their registry wiring.
//!
//! Each task body lives in a submodule grouped by concern; this module
//! declares the prerequisite graph that ties them into the pipeline. The
//! default target `.` expands to the full pipeline; `Test` groups the
//! test-related stages. Stage toggles decide at registry-construction
//! time which optional tasks exist at all, so a disabled stage can never
//! appear in a resolved sequence.

pub mod analysis;
pub mod deps;
pub mod docs;
pub mod release;
pub mod staging;
pub mod testing;

use crate::registry::{BodyFuture, Registry, TaskContext, TaskId, TaskSpec};
use crate::settings::StageToggles;

fn clean_body(ctx: TaskContext<'_>) -> BodyFuture<'_> {
    Box::pin(staging::clean(ctx))
}

fn install_dependencies_body(ctx: TaskContext<'_>) -> BodyFuture<'_> {
    Box::pin(deps::install_dependencies(ctx))
}

fn unit_tests_body(ctx: TaskContext<'_>) -> BodyFuture<'_> {
    Box::pin(testing::unit_tests(ctx))
}

fn fail_if_failed_unit_test_body(ctx: TaskContext<'_>) -> BodyFuture<'_> {
    Box::pin(testing::fail_if_failed_unit_test(ctx))
}

fn integration_tests_body(ctx: TaskContext<'_>) -> BodyFuture<'_> {
    Box::pin(testing::integration_tests(ctx))
}

fn fail_if_failed_integration_test_body(ctx: TaskContext<'_>) -> BodyFuture<'_> {
    Box::pin(testing::fail_if_failed_integration_test(ctx))
}

fn publish_unit_tests_coverage_body(ctx: TaskContext<'_>) -> BodyFuture<'_> {
    Box::pin(testing::publish_unit_tests_coverage(ctx))
}

fn upload_test_results_body(ctx: TaskContext<'_>) -> BodyFuture<'_> {
    Box::pin(testing::upload_test_results_to_appveyor(ctx))
}

fn analyze_body(ctx: TaskContext<'_>) -> BodyFuture<'_> {
    Box::pin(analysis::analyze(ctx))
}

fn fail_if_analyze_findings_body(ctx: TaskContext<'_>) -> BodyFuture<'_> {
    Box::pin(analysis::fail_if_analyze_findings(ctx))
}

fn build_documentation_body(ctx: TaskContext<'_>) -> BodyFuture<'_> {
    Box::pin(docs::build_documentation(ctx))
}

fn set_module_version_body(ctx: TaskContext<'_>) -> BodyFuture<'_> {
    Box::pin(release::set_module_version(ctx))
}

fn push_build_changes_body(ctx: TaskContext<'_>) -> BodyFuture<'_> {
    Box::pin(release::push_build_changes_to_repo(ctx))
}

fn copy_source_body(ctx: TaskContext<'_>) -> BodyFuture<'_> {
    Box::pin(staging::copy_source(ctx))
}

/// Assemble the built-in registry for the given stage toggles.
pub fn builtin_registry(stages: &StageToggles) -> Registry {
    let mut registry = Registry::new();

    registry.register(TaskSpec::action(TaskId::Clean, vec![], clean_body));
    registry.register(TaskSpec::action(
        TaskId::InstallDependencies,
        vec![],
        install_dependencies_body,
    ));

    registry.register(TaskSpec::action(
        TaskId::UnitTests,
        vec![TaskId::InstallDependencies],
        unit_tests_body,
    ));
    registry.register(TaskSpec::action(
        TaskId::FailIfFailedUnitTest,
        vec![TaskId::UnitTests],
        fail_if_failed_unit_test_body,
    ));

    let mut test_stage = vec![TaskId::UnitTests, TaskId::FailIfFailedUnitTest];
    if stages.integration_tests {
        registry.register(TaskSpec::action(
            TaskId::IntegrationTests,
            vec![TaskId::InstallDependencies],
            integration_tests_body,
        ));
        registry.register(TaskSpec::action(
            TaskId::FailIfFailedIntegrationTest,
            vec![TaskId::IntegrationTests],
            fail_if_failed_integration_test_body,
        ));
        test_stage.push(TaskId::IntegrationTests);
        test_stage.push(TaskId::FailIfFailedIntegrationTest);
    }
    if stages.publish_coverage {
        registry.register(TaskSpec::action(
            TaskId::PublishUnitTestsCoverage,
            vec![TaskId::UnitTests],
            publish_unit_tests_coverage_body,
        ));
        test_stage.push(TaskId::PublishUnitTestsCoverage);
    }
    if stages.upload_test_results {
        registry.register(TaskSpec::action(
            TaskId::UploadTestResultsToAppVeyor,
            vec![TaskId::UnitTests],
            upload_test_results_body,
        ));
        test_stage.push(TaskId::UploadTestResultsToAppVeyor);
    }
    registry.register(TaskSpec::composite(TaskId::Test, test_stage));

    registry.register(TaskSpec::action(
        TaskId::Analyze,
        vec![TaskId::InstallDependencies],
        analyze_body,
    ));
    registry.register(TaskSpec::action(
        TaskId::FailIfAnalyzeFindings,
        vec![TaskId::Analyze],
        fail_if_analyze_findings_body,
    ));
    registry.register(TaskSpec::action(
        TaskId::BuildDocumentation,
        vec![TaskId::InstallDependencies],
        build_documentation_body,
    ));
    registry.register(TaskSpec::action(
        TaskId::SetModuleVersion,
        vec![],
        set_module_version_body,
    ));
    if stages.push_changes {
        registry.register(TaskSpec::action(
            TaskId::PushBuildChangesToRepo,
            vec![TaskId::SetModuleVersion],
            push_build_changes_body,
        ));
    }
    registry.register(TaskSpec::action(
        TaskId::CopySourceToBuildOutput,
        vec![TaskId::Clean],
        copy_source_body,
    ));

    let mut default_pipeline = vec![
        TaskId::Clean,
        TaskId::InstallDependencies,
        TaskId::Test,
        TaskId::Analyze,
        TaskId::FailIfAnalyzeFindings,
        TaskId::BuildDocumentation,
        TaskId::SetModuleVersion,
    ];
    if stages.push_changes {
        default_pipeline.push(TaskId::PushBuildChangesToRepo);
    }
    default_pipeline.push(TaskId::CopySourceToBuildOutput);
    registry.register(TaskSpec::composite(TaskId::All, default_pipeline));

    registry
}
