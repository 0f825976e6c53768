//! The process-wide registry of client sessions.
//!
//! An ordered collection and the sole owner of every [`ClientSession`].
//! All mutation goes through the operations here; lifecycle and UI code
//! never touch the collection directly. Kernel handles referenced by
//! sessions stay owned by the external supervisor, and no operation here
//! assumes a handle is still valid without checking with the supervisor.
//!
//! Every fallible step of an operation runs before its first mutation, so
//! a failure leaves the registry exactly as it was.

use kernel_link::{ConnectionFile, KernelHandle, KernelId, KernelSupervisor};
use log::{info, warn};

use crate::console::ConsoleFactory;
use crate::error::SessionError;
use crate::history::HistorySink;
use crate::names;
use crate::session::{ClientSession, KernelHost, SessionId};

/// Ordered collection of the currently open sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Vec<ClientSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `raw` into a connection file and open a new session for it.
    ///
    /// The kernel binding is picked by precedence: an explicitly supplied
    /// id wins, then the kernel hinted by a display-name collision, then a
    /// supervisor lookup by connection file. A kernel the supervisor does
    /// not know stays remote; none is started on a miss.
    pub fn create_session(
        &mut self,
        raw: &str,
        kernel_id: Option<KernelId>,
        supervisor: &dyn KernelSupervisor,
        factory: &mut dyn ConsoleFactory,
    ) -> Result<&ClientSession, SessionError> {
        let connection_file = ConnectionFile::resolve(raw)?;

        let allocated = names::allocate(connection_file.fragment(), &self.name_table(None));

        let (bound, host) = match kernel_id {
            // Callers supply an id only for kernels they supervise.
            Some(id) => (
                KernelHandle::new(id, connection_file.clone()),
                KernelHost::Local,
            ),
            None => match allocated.matched_kernel {
                // Reattach alongside the colliding session, keeping its host:
                // a remote kernel stays remote for the new session too.
                Some(id) => {
                    let host = self
                        .sessions
                        .iter()
                        .find(|s| s.kernel_id() == id)
                        .map(|s| s.host())
                        .unwrap_or(KernelHost::Local);
                    (KernelHandle::new(id, connection_file.clone()), host)
                }
                None => match supervisor.find_kernel_by_connection_file(&connection_file) {
                    Some(handle) => (handle, KernelHost::Local),
                    None => (
                        KernelHandle::new(KernelId::new(), connection_file.clone()),
                        KernelHost::Remote,
                    ),
                },
            },
        };

        let console = factory
            .open(&connection_file)
            .map_err(|source| SessionError::ConnectFailure {
                connection_file: connection_file.to_string(),
                source,
            })?;

        let session = ClientSession::new(allocated.display_name, bound, host, console);
        info!(
            "[registry] session {} ({}) attached to kernel {} ({:?})",
            session.session_id(),
            session.display_name(),
            session.kernel_id(),
            host
        );
        self.sessions.push(session);
        Ok(self.sessions.last().expect("session just appended"))
    }

    pub fn lookup(&self, id: SessionId) -> Option<&ClientSession> {
        self.sessions.iter().find(|s| s.session_id() == id)
    }

    pub(crate) fn lookup_mut(&mut self, id: SessionId) -> Option<&mut ClientSession> {
        self.sessions.iter_mut().find(|s| s.session_id() == id)
    }

    /// All sessions currently bound to `kernel`, in registry order.
    pub fn sessions_for_kernel(&self, kernel: KernelId) -> Vec<&ClientSession> {
        self.sessions
            .iter()
            .filter(|s| s.kernel_id() == kernel)
            .collect()
    }

    pub(crate) fn ids_for_kernel(&self, kernel: KernelId) -> Vec<SessionId> {
        self.sessions
            .iter()
            .filter(|s| s.kernel_id() == kernel)
            .map(|s| s.session_id())
            .collect()
    }

    /// Stable move within the ordered collection. Presentation ordering
    /// only; out-of-range indexes are logged and ignored.
    pub fn reorder(&mut self, from: usize, to: usize) {
        if from >= self.sessions.len() || to >= self.sessions.len() {
            warn!(
                "[registry] reorder({from}, {to}) out of range for {} session(s)",
                self.sessions.len()
            );
            return;
        }
        let session = self.sessions.remove(from);
        self.sessions.insert(to, session);
    }

    /// Unconditionally drop a session. The caller is responsible for
    /// having released any resources tied to it.
    pub fn remove(&mut self, id: SessionId) -> Option<ClientSession> {
        let index = self.sessions.iter().position(|s| s.session_id() == id)?;
        Some(self.sessions.remove(index))
    }

    /// Append a completed command to the session's history and report it
    /// to the sink, in execution order.
    pub fn record_execution(
        &mut self,
        id: SessionId,
        command: &str,
        sink: &mut dyn HistorySink,
    ) -> Result<(), SessionError> {
        let session = self
            .lookup_mut(id)
            .ok_or(SessionError::UnknownSession(id))?;
        session.push_history(command);
        sink.notify_executed(id, command);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientSession> {
        self.sessions.iter()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Display name and bound kernel of every session except `exclude`.
    pub(crate) fn name_table(&self, exclude: Option<SessionId>) -> Vec<(String, KernelId)> {
        self.sessions
            .iter()
            .filter(|s| Some(s.session_id()) != exclude)
            .map(|s| (s.display_name().to_string(), s.kernel_id()))
            .collect()
    }
}
