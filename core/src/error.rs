//! Error taxonomy shared across the Executor and its components. Each kind
//! carries its own local-recovery and user-surfacing rules, applied by the
//! Executor rather than encoded in the enum itself — this module only names
//! the kinds and classifies an arbitrary anyhow::Error into one.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MaestroErrorKind {
    #[error("tool call failed")]
    ToolFailed,
    #[error("write rejected: path outside the allowed file set")]
    ForbiddenWrite,
    #[error("provider transport error")]
    ProviderTransport,
    #[error("provider rate limited")]
    ProviderRateLimited,
    #[error("agent turn exceeded its iteration cap")]
    MaxIterations,
    #[error("verifier reported a build or syntax failure")]
    VerifierBuild,
    #[error("verifier reported a test or lint failure")]
    VerifierTest,
    #[error("reviewer rejected the movement's output")]
    ReviewerRejected,
    #[error("cancelled by caller")]
    Cancelled,
    #[error("decomposition produced an invalid plan")]
    DecompositionInvalid,
}

impl MaestroErrorKind {
    /// Whether the Executor should retry the same movement locally (same
    /// model, next attempt) rather than switching models or surfacing to the
    /// user immediately.
    pub fn is_locally_recoverable(&self) -> bool {
        matches!(
            self,
            MaestroErrorKind::ToolFailed
                | MaestroErrorKind::VerifierBuild
                | MaestroErrorKind::VerifierTest
                | MaestroErrorKind::ReviewerRejected
        )
    }

    /// Whether this failure should trigger a model switch via the selector
    /// before the next retry, rather than a same-model retry.
    pub fn warrants_model_switch(&self) -> bool {
        matches!(
            self,
            MaestroErrorKind::ProviderTransport | MaestroErrorKind::ProviderRateLimited | MaestroErrorKind::MaxIterations
        )
    }

    /// Whether the Executor must stop the symphony and surface this to the
    /// user rather than retrying at all.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MaestroErrorKind::ForbiddenWrite | MaestroErrorKind::Cancelled | MaestroErrorKind::DecompositionInvalid
        )
    }
}
