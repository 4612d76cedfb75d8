//! Gantry Core Library
//!
//! This is the core library for the Gantry build tool. It provides all the
//! pipeline logic for a module project's build: task registration and
//! dependency resolution, sequential fail-fast execution, external tool
//! invocation, and CI status reporting.
//!
//! ## Architecture
//!
//! The core library is organized into several modules:
//!
//! - [`pipeline`] - High-level pipeline interface
//! - [`registry`] - Task registry and dependency resolution
//! - [`execution`] - Task execution engine and external tool invocation
//! - [`tasks`] - Built-in pipeline tasks and their wiring
//! - [`settings`] - Immutable per-run settings from config and environment
//! - [`configs`] - Configuration file parsing
//! - [`reporting`] - CI status reporting and test-results upload
//! - [`results`] - Outcome types and the run history
//! - [`types`] - Common error types and type aliases
//!
//! ## Usage
//!
//! The primary entry point is the [`Pipeline`] which resolves and runs
//! build targets:
//!
//! ```rust,no_run
//! use gantry_core::pipeline::{Pipeline, PipelineConfig};
//! use std::path::PathBuf;
//!
//! # async fn example() -> gantry_core::types::PipelineResult<()> {
//! let pipeline = Pipeline::new(PipelineConfig {
//!     project_root: PathBuf::from("."),
//! })?;
//!
//! let report = pipeline.run(".").await?;
//! # let _ = report;
//! # Ok(())
//! # }
//! ```

pub mod configs;
pub mod execution;
pub mod pipeline;
pub mod registry;
pub mod reporting;
pub mod results;
pub mod settings;
pub mod tasks;
pub mod types;

// Re-export the main types for easier usage
pub use pipeline::{Pipeline, PipelineConfig};
pub use types::{PipelineError, PipelineResult};
