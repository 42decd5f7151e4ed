use thiserror::Error;

/// Errors emitted through the `error` signal.
///
/// A flat taxonomy: every failure of an attempt maps to exactly one of
/// these kinds, with a developer-facing message. Each error is terminal
/// for the current attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The supplied data was rejected, either by the realm/hostname
    /// policy or by a failed mechanism step.
    #[error("{0}")]
    NotAuthorized(String),
    /// The requested mechanism session could not be started.
    #[error("{0}")]
    OperationNotSupported(String),
    /// An operation was invoked out of sequence.
    #[error("{0}")]
    WrongState(String),
    /// The caller abandoned the attempt.
    #[error("Session canceled")]
    SessionCanceled,
}
