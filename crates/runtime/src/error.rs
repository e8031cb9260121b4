use surface::SurfaceError;
use vdom::HandlerId;

/// Fatal runtime failures. Each one means the live tree, the surface or the
/// handler table can no longer be trusted.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("surface rejected an operation: {0}")]
    Surface(#[from] SurfaceError),
    #[error("handler {id} registered twice with different payloads (event `{event}`)")]
    DuplicateHandler { id: HandlerId, event: String },
    #[error("runtime has not been started")]
    NotStarted,
    #[error("runtime was already started")]
    AlreadyStarted,
    #[error("gave up after {limit} messages without reaching quiescence")]
    MessageLimit { limit: usize },
}

/// Failure of an effect executor, turned into an application message.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("command failed: {message}")]
    Failed { message: String },
    #[error("command panicked: {message}")]
    Panicked { message: String },
    #[error("mailbox closed before the command could report back")]
    Disconnected,
}

impl CommandError {
    pub fn failed(message: impl std::fmt::Display) -> Self {
        CommandError::Failed {
            message: message.to_string(),
        }
    }
}
