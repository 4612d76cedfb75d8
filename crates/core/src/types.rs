use thiserror::Error;

/// The main error type for Gantry operations
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A setting required by the running task is missing or unusable.
    ///
    /// Raised lazily, at the point the dependent task runs, so tasks that
    /// do not need the value still execute.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The target task name, or a declared prerequisite, is not registered.
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    /// The prerequisite graph contains a cycle.
    #[error("Cyclic task dependency: {0}")]
    CyclicDependency(String),

    /// A gate condition on a prior task's result did not hold.
    #[error("Gate failure: {0}")]
    Gate(String),

    /// An invoked external tool reported a non-zero or unexpected result.
    #[error("External tool error: {0}")]
    ExternalTool(String),

    #[error("Reporting error: {0}")]
    Report(String),

    /// The manifest did not carry the expected version after the rewrite.
    #[error("Version mismatch in manifest: expected '{expected}', found '{found}'")]
    VersionMismatch { expected: String, found: String },
}

/// Result type alias for Gantry operations
pub type PipelineResult<T> = Result<T, PipelineError>;
