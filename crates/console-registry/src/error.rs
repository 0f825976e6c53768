//! Error taxonomy for session operations.
//!
//! Every variant is handled at the boundary where it originates and
//! surfaced through the confirmation/notification collaborators; none of
//! them leaves registry state partially mutated. Interrupt or restart of a
//! kernel this process does not supervise is not an error at all: it
//! produces an informational console notice and succeeds.

use kernel_link::{InvalidIdentifier, KernelId};
use thiserror::Error;

use crate::session::SessionId;

/// Failures of the session registry and lifecycle operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Malformed connection reference. User-correctable; nothing was
    /// created.
    #[error(transparent)]
    InvalidIdentifier(#[from] InvalidIdentifier),

    /// The kernel could not be located or its connection file opened.
    /// No session is added on this path.
    #[error("unable to connect to kernel `{connection_file}`: {source}")]
    ConnectFailure {
        connection_file: String,
        #[source]
        source: std::io::Error,
    },

    /// The user declined a destructive confirmation. No state change.
    #[error("cancelled by user")]
    Cancelled,

    /// The action targets a kernel already reported dead or detached.
    #[error("kernel {0} is unavailable")]
    KernelUnavailable(KernelId),

    /// The action targets a session id no longer in the registry.
    #[error("no session {0}")]
    UnknownSession(SessionId),
}
