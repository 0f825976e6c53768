//! The supervisor-facing interface.
//!
//! The supervisor is the external component that actually spawns and owns
//! kernel processes. Everything here is consumed, not implemented: the
//! session layer drives a `KernelSupervisor` provided by the embedding
//! application and holds only non-owning [`KernelHandle`]s.
//!
//! Supervisor-side events (unexpected kernel death) originate on the
//! supervisor's own execution context. They are delivered as
//! [`KernelEvent`] values over a channel and must be drained on the owner
//! thread before any registry state is touched.

use std::time::Duration;

use thiserror::Error;

use crate::{ConnectionFile, KernelHandle, KernelId};

/// Errors reported by the kernel supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The connection file could not be opened or located.
    #[error("unable to open connection `{connection_file}`: {source}")]
    Connect {
        connection_file: String,
        #[source]
        source: std::io::Error,
    },

    /// The referenced kernel is not (or no longer) in the supervisor's
    /// records.
    #[error("kernel {0} is not tracked by this supervisor")]
    UnknownKernel(KernelId),

    /// A kernel process could not be spawned.
    #[error("failed to spawn kernel: {0}")]
    Spawn(String),
}

/// Interface to the external component that owns kernel processes.
///
/// All calls are made from the single owner thread. `start_kernel` and
/// `send_restart_request` may block while a process comes up; interrupt and
/// shutdown are fire-and-forget.
pub trait KernelSupervisor {
    /// Spawn a brand-new kernel process and return its handle.
    fn start_kernel(&mut self) -> Result<KernelHandle, SupervisorError>;

    /// Look up a running, locally supervised kernel by its canonical
    /// connection file. `None` means no local record; the caller must not
    /// start a kernel on a miss.
    fn find_kernel_by_connection_file(
        &self,
        connection_file: &ConnectionFile,
    ) -> Option<KernelHandle>;

    /// Send an interrupt signal to a kernel. No acknowledgement is tracked.
    fn send_interrupt(&mut self, handle: &KernelHandle) -> Result<(), SupervisorError>;

    /// Start a replacement process for `handle` and return the new handle.
    /// The old process keeps running until [`shutdown_kernel`] detaches it.
    ///
    /// [`shutdown_kernel`]: KernelSupervisor::shutdown_kernel
    fn send_restart_request(
        &mut self,
        handle: &KernelHandle,
    ) -> Result<KernelHandle, SupervisorError>;

    /// Terminate a kernel process and drop it from the supervisor's records.
    fn shutdown_kernel(&mut self, handle: &KernelHandle) -> Result<(), SupervisorError>;
}

/// Events pushed by the supervisor from its own execution context.
#[derive(Debug, Clone)]
pub enum KernelEvent {
    /// A kernel process exited without being asked to. `elapsed` is the
    /// time between the exit and its detection.
    Died {
        handle: KernelHandle,
        elapsed: Duration,
    },
}
