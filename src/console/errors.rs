use thiserror::Error;

use crate::validation::InputError;

/// Failures reported to the operator. Acknowledgment timeouts and routing
/// failures are outcomes, not errors.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// The link refused or failed to write the outbound message.
    #[error("transport error: {0:#}")]
    Transport(#[from] anyhow::Error),

    /// The console is shutting down; nothing was sent.
    #[error("console is shutting down")]
    ShuttingDown,

    #[error("node '{0}' not found")]
    UnknownNode(String),

    /// Several nodes share the name; carries their ids.
    #[error("multiple nodes named '{name}' ({}); use the node id", .ids.join(", "))]
    AmbiguousNode { name: String, ids: Vec<String> },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("invalid input: {0}")]
    Input(#[from] InputError),

    /// Device information the command needs has not arrived from the radio yet.
    #[error("device not ready: {0}")]
    NotReady(String),
}
