//! Shared test doubles for the unit tests.
//!
//! Everything records what it was asked to do; consoles expose their logs
//! through shared cells so tests can inspect them after the widget has
//! been handed to a session.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use kernel_link::{
    ConnectionFile, KernelHandle, KernelId, KernelSupervisor, SupervisorError,
};

use crate::console::{ConsoleFactory, ConsoleView};
use crate::history::HistorySink;
use crate::navigate::NavigationSink;
use crate::prompt::{ConfirmPrompt, Confirmation};
use crate::session::SessionId;

// ── Supervisor ──────────────────────────────────────────────────────

/// In-memory supervisor: tracks kernels and records every request.
#[derive(Default)]
pub(crate) struct MockSupervisor {
    pub kernels: Vec<KernelHandle>,
    pub interrupts: Vec<KernelId>,
    pub restarts: Vec<KernelId>,
    pub shutdowns: Vec<KernelId>,
    /// Fail the next spawn (start or restart) instead of producing a
    /// kernel.
    pub fail_spawn: bool,
}

impl MockSupervisor {
    /// A supervisor already tracking one kernel for `identifier`.
    pub fn with_kernel(identifier: &str) -> (Self, KernelHandle) {
        let handle = KernelHandle::new(
            KernelId::new(),
            ConnectionFile::resolve(identifier).expect("valid identifier"),
        );
        let supervisor = Self {
            kernels: vec![handle.clone()],
            ..Self::default()
        };
        (supervisor, handle)
    }

    fn fresh_handle(&self) -> KernelHandle {
        let fragment = format!("{:x}", 0xa000 + self.kernels.len());
        KernelHandle::new(
            KernelId::new(),
            ConnectionFile::resolve(&fragment).expect("valid fragment"),
        )
    }

    fn tracked(&self, handle: &KernelHandle) -> bool {
        self.kernels
            .iter()
            .any(|k| k.kernel_id() == handle.kernel_id())
    }
}

impl KernelSupervisor for MockSupervisor {
    fn start_kernel(&mut self) -> Result<KernelHandle, SupervisorError> {
        if self.fail_spawn {
            self.fail_spawn = false;
            return Err(SupervisorError::Spawn("spawn disabled in test".into()));
        }
        let handle = self.fresh_handle();
        self.kernels.push(handle.clone());
        Ok(handle)
    }

    fn find_kernel_by_connection_file(
        &self,
        connection_file: &ConnectionFile,
    ) -> Option<KernelHandle> {
        self.kernels
            .iter()
            .find(|k| k.connection_file() == connection_file)
            .cloned()
    }

    fn send_interrupt(&mut self, handle: &KernelHandle) -> Result<(), SupervisorError> {
        if !self.tracked(handle) {
            return Err(SupervisorError::UnknownKernel(handle.kernel_id()));
        }
        self.interrupts.push(handle.kernel_id());
        Ok(())
    }

    fn send_restart_request(
        &mut self,
        handle: &KernelHandle,
    ) -> Result<KernelHandle, SupervisorError> {
        if !self.tracked(handle) {
            return Err(SupervisorError::UnknownKernel(handle.kernel_id()));
        }
        if self.fail_spawn {
            self.fail_spawn = false;
            return Err(SupervisorError::Spawn("spawn disabled in test".into()));
        }
        let replacement = self.fresh_handle();
        self.kernels.push(replacement.clone());
        self.restarts.push(handle.kernel_id());
        Ok(replacement)
    }

    fn shutdown_kernel(&mut self, handle: &KernelHandle) -> Result<(), SupervisorError> {
        let index = self
            .kernels
            .iter()
            .position(|k| k.kernel_id() == handle.kernel_id())
            .ok_or(SupervisorError::UnknownKernel(handle.kernel_id()))?;
        self.kernels.remove(index);
        self.shutdowns.push(handle.kernel_id());
        Ok(())
    }
}

// ── Console ─────────────────────────────────────────────────────────

/// What a console was asked to do.
#[derive(Default)]
pub(crate) struct ConsoleLog {
    pub notices: Vec<String>,
    pub deaths: Vec<Duration>,
    pub focused: usize,
    pub released: usize,
}

pub(crate) struct RecordingConsole(pub Rc<RefCell<ConsoleLog>>);

impl ConsoleView for RecordingConsole {
    fn show_notice(&mut self, text: &str) {
        self.0.borrow_mut().notices.push(text.to_string());
    }

    fn notify_kernel_died(&mut self, elapsed: Duration) {
        self.0.borrow_mut().deaths.push(elapsed);
    }

    fn take_focus(&mut self) {
        self.0.borrow_mut().focused += 1;
    }

    fn release(&mut self) {
        self.0.borrow_mut().released += 1;
    }
}

/// A console that ignores everything.
pub(crate) fn null_console() -> Box<dyn ConsoleView> {
    Box::new(RecordingConsole(Rc::new(RefCell::new(ConsoleLog::default()))))
}

/// Factory producing recording consoles, one log per opened connection.
#[derive(Default)]
pub(crate) struct MockFactory {
    /// `(connection file, log)` per successful open, in order.
    pub logs: Vec<(String, Rc<RefCell<ConsoleLog>>)>,
    /// Fail every open with `NotFound`.
    pub fail: bool,
}

impl ConsoleFactory for MockFactory {
    fn open(&mut self, connection_file: &ConnectionFile) -> io::Result<Box<dyn ConsoleView>> {
        if self.fail {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "no such connection file",
            ));
        }
        let log = Rc::new(RefCell::new(ConsoleLog::default()));
        self.logs.push((connection_file.to_string(), log.clone()));
        Ok(Box::new(RecordingConsole(log)))
    }
}

// ── Prompt ──────────────────────────────────────────────────────────

/// Answers confirmations from a script; `Yes` once the script runs out.
pub(crate) struct ScriptedPrompt {
    pub answers: VecDeque<Confirmation>,
    pub questions: Vec<String>,
}

impl ScriptedPrompt {
    pub fn answering(answers: &[Confirmation]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            questions: Vec::new(),
        }
    }
}

impl ConfirmPrompt for ScriptedPrompt {
    fn confirm(&mut self, question: &str) -> Confirmation {
        self.questions.push(question.to_string());
        self.answers.pop_front().unwrap_or(Confirmation::Yes)
    }
}

pub(crate) fn prompt(answers: &[Confirmation]) -> ScriptedPrompt {
    ScriptedPrompt::answering(answers)
}

// ── Sinks ───────────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct RecordingHistory {
    pub executed: Vec<(SessionId, String)>,
    pub detached: Vec<SessionId>,
}

impl HistorySink for RecordingHistory {
    fn notify_executed(&mut self, session: SessionId, command: &str) {
        self.executed.push((session, command.to_string()));
    }

    fn detach(&mut self, session: SessionId) {
        self.detached.push(session);
    }
}

#[derive(Default)]
pub(crate) struct RecordingNavigation {
    pub locations: Rc<RefCell<Vec<(PathBuf, u32)>>>,
}

impl NavigationSink for RecordingNavigation {
    fn notify_error_location(&mut self, path: &Path, line: u32) {
        self.locations.borrow_mut().push((path.to_path_buf(), line));
    }
}
