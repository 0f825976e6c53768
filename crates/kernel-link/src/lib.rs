//! Kernel identity and the supervisor-facing interface.
//!
//! A kernel is a backend compute process owned by an external supervisor.
//! This crate defines the stable identifiers used to refer to one
//! (`KernelId`, `KernelHandle`), the canonical connection-file naming
//! scheme, and the `KernelSupervisor` trait the session layer drives.
//!
//! Nothing in this crate spawns or owns processes: handles are non-owning
//! references, and callers must never assume one stays valid without
//! checking with the supervisor.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod connection;
pub mod supervisor;

pub use connection::{ConnectionFile, InvalidIdentifier};
pub use supervisor::{KernelEvent, KernelSupervisor, SupervisorError};

/// Stable identity of a kernel process, minted when the process starts.
///
/// Ids are plain attributes assigned at creation; they are never recomputed
/// from storage location, and a restarted kernel always gets a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KernelId(Uuid);

impl KernelId {
    /// Mint a new kernel id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for KernelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for KernelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-owning reference to a backend kernel process.
///
/// The connection file never changes for the lifetime of the handle; a new
/// kernel always gets a new handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelHandle {
    kernel_id: KernelId,
    connection_file: ConnectionFile,
}

impl KernelHandle {
    pub fn new(kernel_id: KernelId, connection_file: ConnectionFile) -> Self {
        Self {
            kernel_id,
            connection_file,
        }
    }

    pub fn kernel_id(&self) -> KernelId {
        self.kernel_id
    }

    pub fn connection_file(&self) -> &ConnectionFile {
        &self.connection_file
    }
}
