//! Planner error types

use thiserror::Error;

/// Errors raised while routing a single XMR. The planner records the error,
/// drops that reference, and keeps processing the rest.
#[derive(Debug, Clone, Error)]
pub enum PlanError {
    /// The detected path names an instance the hierarchy does not have;
    /// usually a sign the elaborated tree and the reference disagree
    #[error("no instance '{instance}' in module '{module}' while routing '{path}'")]
    MissingInstance {
        module: String,
        instance: String,
        path: String,
    },
}
