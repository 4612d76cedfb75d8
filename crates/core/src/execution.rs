//! Task execution module
//!
//! This module handles the actual execution of resolved task sequences:
//! invoking external tools, running task bodies in order, and stopping the
//! run at the first failure.

pub mod command;
pub mod runner;

pub use command::CommandExecutor;
pub use runner::PipelineRunner;
