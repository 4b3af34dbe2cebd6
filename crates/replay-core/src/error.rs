//! Controller-level errors.

use replay_types::ValidationError;

/// Errors returned by controller handles.
///
/// Service failures are not errors at this level: a failed fetch is a
/// state transition and shows up as `last_error` on the published view.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ControllerError {
    /// The command was rejected before any request was issued.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The controller task has exited and can no longer take commands.
    #[error("controller task has shut down")]
    Closed,
}
