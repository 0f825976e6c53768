//! Top-level wiring of the console session machinery.
//!
//! [`ConsoleManager`] owns the registry, the lifecycle coordinator, the
//! user settings and the external collaborators, and exposes one method
//! per user action. Pending supervisor events are drained at the start of
//! every action, so a death report is never outrun by a user request
//! against the same kernel.

use kernel_link::{KernelEvent, KernelId, KernelSupervisor};
use tokio::sync::mpsc::UnboundedSender;

use crate::close;
use crate::console::ConsoleFactory;
use crate::error::SessionError;
use crate::history::HistorySink;
use crate::lifecycle::LifecycleCoordinator;
use crate::navigate::{self, NavigationSink};
use crate::prompt::ConfirmPrompt;
use crate::registry::SessionRegistry;
use crate::session::SessionId;
use crate::settings::ConsoleSettings;

/// Owns the session registry and everything needed to drive it.
pub struct ConsoleManager<S: KernelSupervisor> {
    registry: SessionRegistry,
    coordinator: LifecycleCoordinator,
    settings: ConsoleSettings,
    supervisor: S,
    factory: Box<dyn ConsoleFactory>,
    prompt: Box<dyn ConfirmPrompt>,
    history: Box<dyn HistorySink>,
    navigation: Box<dyn NavigationSink>,
}

impl<S: KernelSupervisor> ConsoleManager<S> {
    pub fn new(
        settings: ConsoleSettings,
        supervisor: S,
        factory: Box<dyn ConsoleFactory>,
        prompt: Box<dyn ConfirmPrompt>,
        history: Box<dyn HistorySink>,
        navigation: Box<dyn NavigationSink>,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(),
            coordinator: LifecycleCoordinator::new(),
            settings,
            supervisor,
            factory,
            prompt,
            history,
            navigation,
        }
    }

    /// Channel end the supervisor pushes kernel events into. Safe to send
    /// into from any thread.
    pub fn event_sender(&self) -> UnboundedSender<KernelEvent> {
        self.coordinator.event_sender()
    }

    /// Drain pending supervisor events onto this thread.
    pub fn pump_events(&mut self) {
        self.coordinator.pump_events(&mut self.registry);
    }

    /// Open a new session for a user-supplied kernel identifier.
    pub fn new_session(
        &mut self,
        raw: &str,
        kernel_id: Option<KernelId>,
    ) -> Result<SessionId, SessionError> {
        self.pump_events();
        let session = self.registry.create_session(
            raw,
            kernel_id,
            &self.supervisor,
            self.factory.as_mut(),
        )?;
        Ok(session.session_id())
    }

    pub fn interrupt(&mut self, id: SessionId) -> Result<(), SessionError> {
        self.pump_events();
        self.coordinator
            .interrupt(&mut self.registry, id, &mut self.supervisor)
    }

    pub fn restart(&mut self, id: SessionId) -> Result<(), SessionError> {
        self.pump_events();
        self.coordinator.restart(
            &mut self.registry,
            id,
            &mut self.supervisor,
            self.prompt.as_mut(),
        )
    }

    /// Close a session per the teardown policy; returns the removed ids.
    pub fn close(&mut self, id: SessionId, force: bool) -> Result<Vec<SessionId>, SessionError> {
        self.pump_events();
        close::close_session(
            &mut self.registry,
            &mut self.coordinator,
            id,
            force,
            &self.settings,
            &mut self.supervisor,
            self.prompt.as_mut(),
            self.history.as_mut(),
        )
    }

    /// Presentation reordering of the session list.
    pub fn reorder(&mut self, from: usize, to: usize) {
        self.registry.reorder(from, to);
    }

    /// Record a completed command for a session.
    pub fn record_execution(&mut self, id: SessionId, command: &str) -> Result<(), SessionError> {
        self.registry
            .record_execution(id, command, self.history.as_mut())
    }

    /// Scan console output for a traceback location and forward it to the
    /// navigation sink.
    pub fn scan_output(&mut self, text: &str) {
        if let Some((path, line)) = navigate::scan_error_location(text) {
            self.navigation.notify_error_location(&path, line);
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &ConsoleSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ConsoleSettings {
        &mut self.settings
    }
}
