//! Configuration file parsing
//!
//! Gantry reads a single optional overlay file, `.gantry/pipeline.yml`,
//! which adjusts module naming, stage toggles, and tool commands. Everything
//! else comes from the environment and built-in path templates.

pub mod pipeline;

pub use pipeline::{parse_pipeline_config, PipelineFileConfig, StagesConfig, ToolsConfig};
