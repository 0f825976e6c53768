//! A client session: one open interactive console bound to a kernel.

use std::fmt;

use kernel_link::{KernelHandle, KernelId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::console::ConsoleView;

/// Unique id for a session, minted at creation and never reused for the
/// process runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the bound kernel runs. Decided once at connect time and never
/// re-evaluated: interrupt and restart are only possible for locally
/// supervised kernels, remote ones get an informational notice instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelHost {
    /// The kernel process is in this process's supervisor records.
    Local,
    /// The kernel is remote or otherwise outside the supervisor's records.
    Remote,
}

/// Link state between a session and its bound kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connected,
    /// An interrupt signal is in flight. No acknowledgement is tracked, so
    /// this is transient bookkeeping rather than a wait state.
    Interrupting,
    /// A replacement kernel is being brought up.
    Restarting,
    /// The kernel was reported dead. The session stays open until the user
    /// closes or restarts it.
    Dead,
}

/// One open interactive session, bound to exactly one kernel at a time.
///
/// Sessions are owned by the [`SessionRegistry`](crate::SessionRegistry)
/// and hold a non-owning [`KernelHandle`]; the kernel process itself
/// belongs to the external supervisor. The binding is rebound at most once
/// per restart, by the lifecycle coordinator only.
pub struct ClientSession {
    session_id: SessionId,
    display_name: String,
    bound: KernelHandle,
    host: KernelHost,
    state: LinkState,
    history: Vec<String>,
    console: Box<dyn ConsoleView>,
}

impl ClientSession {
    pub(crate) fn new(
        display_name: String,
        bound: KernelHandle,
        host: KernelHost,
        console: Box<dyn ConsoleView>,
    ) -> Self {
        Self {
            session_id: SessionId::new(),
            display_name,
            bound,
            host,
            state: LinkState::Connected,
            history: Vec::new(),
            console,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Display name, unique among all registered sessions at any instant.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn kernel(&self) -> &KernelHandle {
        &self.bound
    }

    pub fn kernel_id(&self) -> KernelId {
        self.bound.kernel_id()
    }

    pub fn host(&self) -> KernelHost {
        self.host
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Executed commands, in execution order, append-only.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub(crate) fn set_display_name(&mut self, name: String) {
        self.display_name = name;
    }

    pub(crate) fn set_state(&mut self, state: LinkState) {
        self.state = state;
    }

    pub(crate) fn push_history(&mut self, command: &str) {
        self.history.push(command.to_string());
    }

    pub(crate) fn console_mut(&mut self) -> &mut dyn ConsoleView {
        self.console.as_mut()
    }

    /// Rebind to a freshly started kernel after a restart. The previous
    /// handle is orphaned; the caller retires it with the coordinator.
    pub(crate) fn rebind(&mut self, handle: KernelHandle) {
        self.bound = handle;
        self.host = KernelHost::Local;
        self.state = LinkState::Connected;
    }
}

impl fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSession")
            .field("session_id", &self.session_id)
            .field("display_name", &self.display_name)
            .field("bound", &self.bound)
            .field("host", &self.host)
            .field("state", &self.state)
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}
