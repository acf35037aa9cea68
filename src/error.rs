//! The top-level error taxonomy, unifying every component's failure
//! mode behind a single `.exit_code()` mapping so the orchestrator never
//! has to inspect error text to decide how the process should exit
//! (mirrors the teacher's `PipelineError`/`RpcError::exit_code` pattern).

use thiserror::Error;

use crate::config::ConfigError;
use crate::loader::LoadError;

/// Errors that can abort a comparison run.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("run cancelled")]
    Cancelled,
}

impl OrchestratorError {
    /// Stable mapping to a process exit code. Every taxonomy member maps
    /// to 3 (`operational error`) per §7; kept as a method rather than a
    /// constant so future variants don't silently default.
    pub fn exit_code(&self) -> i32 {
        match self {
            OrchestratorError::InvalidConfiguration(_) => 3,
            OrchestratorError::Config(_) => 3,
            OrchestratorError::Load(e) => e.exit_code(),
            OrchestratorError::Cancelled => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_maps_to_exit_code_three() {
        assert_eq!(OrchestratorError::InvalidConfiguration("x".into()).exit_code(), 3);
        assert_eq!(OrchestratorError::Cancelled.exit_code(), 3);
    }
}
