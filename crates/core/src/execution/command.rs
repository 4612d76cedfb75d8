//! External tool invocation.
//!
//! Every tool the pipeline shells out to (dependency manager, test runner,
//! analyzer, documentation generator, git) goes through [`CommandExecutor`]
//! so the setup is uniform: tools run from the project root, inherit the
//! pipeline's stdio, and see the module name in `GANTRY_MODULE`. Tools are
//! invoked by the names configured in [`Settings`]; resolving those names
//! to executables is the operating system's job.

use std::process::Command;

use crate::settings::Settings;
use crate::types::{PipelineError, PipelineResult};

/// Unified executor that handles common setup and error handling for
/// external tool invocations.
pub struct CommandExecutor<'a> {
    settings: &'a Settings,
}

impl<'a> CommandExecutor<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Run a tool and require a zero exit code.
    pub fn run_tool(&self, tool: &str, args: &[String]) -> PipelineResult<()> {
        let code = self.execute(Command::new(tool).args(args), tool)?;
        if code != 0 {
            return Err(PipelineError::ExternalTool(format!(
                "'{}' failed with exit code {}",
                tool, code
            )));
        }
        Ok(())
    }

    /// Run a tool and require a zero exit code, with extra environment
    /// variables. Used to hand secrets to tools without putting them in
    /// the argument list.
    pub fn run_tool_with_env(
        &self,
        tool: &str,
        args: &[String],
        env: &[(&str, &str)],
    ) -> PipelineResult<()> {
        let mut command = Command::new(tool);
        command.args(args);
        for (key, value) in env {
            command.env(key, value);
        }
        let code = self.execute(&mut command, tool)?;
        if code != 0 {
            return Err(PipelineError::ExternalTool(format!(
                "'{}' failed with exit code {}",
                tool, code
            )));
        }
        Ok(())
    }

    /// Run a tool and report its exit code instead of failing on non-zero.
    ///
    /// Test runners exit non-zero when tests fail, but a failed test is
    /// not a broken pipeline; the summary file is what the gate judges.
    pub fn run_tool_status(&self, tool: &str, args: &[String]) -> PipelineResult<i32> {
        self.execute(Command::new(tool).args(args), tool)
    }

    /// Run the configured git command and require success.
    pub fn git(&self, args: &[String]) -> PipelineResult<()> {
        self.run_tool(&self.settings.tools.git, args)
    }

    fn execute(&self, command: &mut Command, tool: &str) -> PipelineResult<i32> {
        command.current_dir(&self.settings.root);
        if let Some(module) = &self.settings.module {
            command.env("GANTRY_MODULE", module);
        }

        let status = command.status().map_err(|e| {
            PipelineError::ExternalTool(format!("Failed to execute '{}': {}", tool, e))
        })?;

        Ok(status.code().unwrap_or(-1))
    }
}
