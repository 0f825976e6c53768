//! Kernel lifecycle coordination: interrupt, restart, death.
//!
//! Supervisor events originate on the supervisor's own execution context
//! and are pushed into an unbounded channel; [`pump_events`] drains them on
//! the owner thread before any registry state is touched. That channel is
//! the only cross-thread boundary in this crate.
//!
//! Death and explicit teardown are mutually exclusive outcomes for a
//! kernel: once a kernel is retired (reported dead, or detached by a
//! restart or close), requests against its stale handle are rejected with
//! `KernelUnavailable` instead of being retried.
//!
//! [`pump_events`]: LifecycleCoordinator::pump_events

use std::collections::HashSet;
use std::time::Duration;

use kernel_link::{KernelEvent, KernelHandle, KernelId, KernelSupervisor};
use log::{debug, info, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::SessionError;
use crate::names;
use crate::prompt::{ConfirmPrompt, Confirmation};
use crate::registry::SessionRegistry;
use crate::session::{KernelHost, LinkState, SessionId};

const CANNOT_INTERRUPT: &str = "Kernel process is either remote or unspecified. Cannot interrupt.";
const CANNOT_RESTART: &str = "Kernel process is either remote or unspecified. Cannot restart.";
const RESTART_QUESTION: &str = "Are you sure you want to restart the kernel?";

/// Drives the per-session kernel state machine and dispatches supervisor
/// events to the affected sessions.
pub struct LifecycleCoordinator {
    events_tx: UnboundedSender<KernelEvent>,
    events_rx: UnboundedReceiver<KernelEvent>,
    /// Kernels reported dead or detached by restart/close.
    retired: HashSet<KernelId>,
}

impl LifecycleCoordinator {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            events_tx,
            events_rx,
            retired: HashSet::new(),
        }
    }

    /// Channel end handed to the supervisor's event source. Safe to send
    /// into from any thread.
    pub fn event_sender(&self) -> UnboundedSender<KernelEvent> {
        self.events_tx.clone()
    }

    /// Whether requests against `kernel` are rejected as stale.
    pub fn is_retired(&self, kernel: KernelId) -> bool {
        self.retired.contains(&kernel)
    }

    pub(crate) fn retire(&mut self, kernel: KernelId) {
        self.retired.insert(kernel);
    }

    /// Drain pending supervisor events and dispatch them. Must be called
    /// from the owner thread.
    pub fn pump_events(&mut self, registry: &mut SessionRegistry) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                KernelEvent::Died { handle, elapsed } => {
                    self.kernel_died(registry, &handle, elapsed)
                }
            }
        }
    }

    /// Deliver a one-way death notification to every session bound to the
    /// kernel. Sessions stay open: the user decides to close or restart.
    fn kernel_died(
        &mut self,
        registry: &mut SessionRegistry,
        handle: &KernelHandle,
        elapsed: Duration,
    ) {
        let kernel = handle.kernel_id();
        if !self.retired.insert(kernel) {
            // Duplicate report, or a kernel we already detached ourselves.
            debug!("[lifecycle] ignoring death report for retired kernel {kernel}");
            return;
        }
        let affected = registry.ids_for_kernel(kernel);
        warn!(
            "[lifecycle] kernel {kernel} died unexpectedly after {elapsed:?}; notifying {} session(s)",
            affected.len()
        );
        for id in affected {
            if let Some(session) = registry.lookup_mut(id) {
                session.set_state(LinkState::Dead);
                session.console_mut().notify_kernel_died(elapsed);
            }
        }
    }

    /// Send an interrupt signal to the kernel behind `id`.
    ///
    /// Fire-and-forget: no acknowledgement is tracked, completion is only
    /// observable through the kernel's own output. Remote kernels get an
    /// informational console notice instead of a signal.
    pub fn interrupt(
        &mut self,
        registry: &mut SessionRegistry,
        id: SessionId,
        supervisor: &mut dyn KernelSupervisor,
    ) -> Result<(), SessionError> {
        let session = registry
            .lookup_mut(id)
            .ok_or(SessionError::UnknownSession(id))?;
        let kernel = session.kernel_id();
        if session.state() == LinkState::Dead || self.retired.contains(&kernel) {
            return Err(SessionError::KernelUnavailable(kernel));
        }
        if session.host() == KernelHost::Remote {
            session.console_mut().show_notice(CANNOT_INTERRUPT);
            return Ok(());
        }

        session.set_state(LinkState::Interrupting);
        let sent = supervisor.send_interrupt(session.kernel());
        session.set_state(LinkState::Connected);
        match sent {
            Ok(()) => {
                debug!("[lifecycle] interrupt sent to kernel {kernel}");
                Ok(())
            }
            Err(err) => {
                warn!("[lifecycle] interrupt of kernel {kernel} failed: {err}");
                Err(SessionError::KernelUnavailable(kernel))
            }
        }
    }

    /// Restart the kernel behind `id` and rebind the session to the new
    /// one.
    ///
    /// The session keeps its identity; only the bound handle and the
    /// display name change. On any failure the session stays bound to its
    /// original handle; it is never left without a kernel.
    pub fn restart(
        &mut self,
        registry: &mut SessionRegistry,
        id: SessionId,
        supervisor: &mut dyn KernelSupervisor,
        prompt: &mut dyn ConfirmPrompt,
    ) -> Result<(), SessionError> {
        let session = registry.lookup(id).ok_or(SessionError::UnknownSession(id))?;
        let old = session.kernel().clone();
        let was_dead = session.state() == LinkState::Dead;

        if session.host() == KernelHost::Remote {
            if let Some(session) = registry.lookup_mut(id) {
                session.console_mut().show_notice(CANNOT_RESTART);
            }
            return Ok(());
        }

        if prompt.confirm(RESTART_QUESTION) != Confirmation::Yes {
            return Err(SessionError::Cancelled);
        }

        if let Some(session) = registry.lookup_mut(id) {
            session.set_state(LinkState::Restarting);
        }

        // A dead or already-detached kernel must not see requests against
        // its stale handle; recovery goes through a brand-new process.
        let stale = was_dead || self.retired.contains(&old.kernel_id());
        let started = if stale {
            supervisor.start_kernel()
        } else {
            supervisor.send_restart_request(&old)
        };

        let new_handle = match started {
            Ok(handle) => handle,
            Err(err) => {
                warn!("[lifecycle] restart for session {id} failed: {err}");
                if let Some(session) = registry.lookup_mut(id) {
                    // The original binding stays in place.
                    session.set_state(if was_dead {
                        LinkState::Dead
                    } else {
                        LinkState::Connected
                    });
                }
                return Err(SessionError::ConnectFailure {
                    connection_file: old.connection_file().to_string(),
                    source: std::io::Error::other(err.to_string()),
                });
            }
        };

        if !stale {
            // Detach the old process only once the replacement is up.
            if let Err(err) = supervisor.shutdown_kernel(&old) {
                warn!(
                    "[lifecycle] could not detach old kernel {}: {err}",
                    old.kernel_id()
                );
            }
        }
        // Co-attached sessions keep the orphaned handle until they restart
        // or close; further requests against it are rejected.
        self.retired.insert(old.kernel_id());

        let new_name = names::allocate(
            new_handle.connection_file().fragment(),
            &registry.name_table(Some(id)),
        )
        .display_name;
        let new_kernel = new_handle.kernel_id();

        if let Some(session) = registry.lookup_mut(id) {
            session.rebind(new_handle);
            session.set_display_name(new_name);
            session.console_mut().take_focus();
        }
        info!("[lifecycle] session {id} rebound to kernel {new_kernel}");
        Ok(())
    }
}

impl Default for LifecycleCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{prompt, MockFactory, MockSupervisor};
    use std::collections::HashSet;

    fn registry_with_sessions(
        supervisor: &MockSupervisor,
        factory: &mut MockFactory,
        count: usize,
    ) -> (SessionRegistry, Vec<SessionId>) {
        let mut registry = SessionRegistry::new();
        let ids = (0..count)
            .map(|_| {
                registry
                    .create_session("3764", None, supervisor, factory)
                    .unwrap()
                    .session_id()
            })
            .collect();
        (registry, ids)
    }

    #[test]
    fn test_death_notifies_each_session_and_removes_none() {
        let (supervisor, handle) = MockSupervisor::with_kernel("3764");
        let mut factory = MockFactory::default();
        let (mut registry, _ids) = registry_with_sessions(&supervisor, &mut factory, 3);

        let mut coordinator = LifecycleCoordinator::new();
        coordinator
            .event_sender()
            .send(KernelEvent::Died {
                handle: handle.clone(),
                elapsed: Duration::from_secs(2),
            })
            .unwrap();
        coordinator.pump_events(&mut registry);

        assert_eq!(registry.len(), 3);
        for session in registry.iter() {
            assert_eq!(session.state(), LinkState::Dead);
        }
        let deaths: usize = factory.logs.iter().map(|(_, log)| log.borrow().deaths.len()).sum();
        assert_eq!(deaths, 3);
    }

    #[test]
    fn test_duplicate_death_event_is_ignored() {
        let (supervisor, handle) = MockSupervisor::with_kernel("3764");
        let mut factory = MockFactory::default();
        let (mut registry, _ids) = registry_with_sessions(&supervisor, &mut factory, 1);

        let mut coordinator = LifecycleCoordinator::new();
        for _ in 0..2 {
            coordinator
                .event_sender()
                .send(KernelEvent::Died {
                    handle: handle.clone(),
                    elapsed: Duration::from_secs(1),
                })
                .unwrap();
        }
        coordinator.pump_events(&mut registry);

        let deaths: usize = factory.logs.iter().map(|(_, log)| log.borrow().deaths.len()).sum();
        assert_eq!(deaths, 1);
    }

    #[test]
    fn test_interrupt_local_sends_signal() {
        let (mut supervisor, handle) = MockSupervisor::with_kernel("3764");
        let mut factory = MockFactory::default();
        let (mut registry, ids) = registry_with_sessions(&supervisor, &mut factory, 1);

        let mut coordinator = LifecycleCoordinator::new();
        coordinator
            .interrupt(&mut registry, ids[0], &mut supervisor)
            .unwrap();
        assert_eq!(supervisor.interrupts, vec![handle.kernel_id()]);
        assert_eq!(registry.lookup(ids[0]).unwrap().state(), LinkState::Connected);
    }

    #[test]
    fn test_interrupt_remote_shows_notice_only() {
        let mut supervisor = MockSupervisor::default();
        let mut factory = MockFactory::default();
        let mut registry = SessionRegistry::new();
        let id = registry
            .create_session("beef", None, &supervisor, &mut factory)
            .unwrap()
            .session_id();

        let mut coordinator = LifecycleCoordinator::new();
        coordinator
            .interrupt(&mut registry, id, &mut supervisor)
            .unwrap();
        assert!(supervisor.interrupts.is_empty());
        let log = factory.logs[0].1.borrow();
        assert_eq!(log.notices.len(), 1);
        assert!(log.notices[0].contains("Cannot interrupt"));
    }

    #[test]
    fn test_interrupt_dead_kernel_is_rejected() {
        let (mut supervisor, handle) = MockSupervisor::with_kernel("3764");
        let mut factory = MockFactory::default();
        let (mut registry, ids) = registry_with_sessions(&supervisor, &mut factory, 1);

        let mut coordinator = LifecycleCoordinator::new();
        coordinator
            .event_sender()
            .send(KernelEvent::Died {
                handle,
                elapsed: Duration::from_secs(1),
            })
            .unwrap();
        coordinator.pump_events(&mut registry);

        let err = coordinator
            .interrupt(&mut registry, ids[0], &mut supervisor)
            .unwrap_err();
        assert!(matches!(err, SessionError::KernelUnavailable(_)));
        assert!(supervisor.interrupts.is_empty());
    }

    #[test]
    fn test_restart_preserves_session_identity() {
        let (mut supervisor, handle) = MockSupervisor::with_kernel("3764");
        let mut factory = MockFactory::default();
        let (mut registry, ids) = registry_with_sessions(&supervisor, &mut factory, 1);
        let old_kernel = handle.kernel_id();

        let mut coordinator = LifecycleCoordinator::new();
        let mut prompt = prompt(&[Confirmation::Yes]);
        coordinator
            .restart(&mut registry, ids[0], &mut supervisor, &mut prompt)
            .unwrap();

        let session = registry.lookup(ids[0]).unwrap();
        assert_eq!(session.session_id(), ids[0]);
        assert_ne!(session.kernel_id(), old_kernel);
        assert_eq!(session.state(), LinkState::Connected);
        // Old process restarted in place, then detached.
        assert_eq!(supervisor.restarts, vec![old_kernel]);
        assert_eq!(supervisor.shutdowns, vec![old_kernel]);
        assert!(coordinator.is_retired(old_kernel));
    }

    #[test]
    fn test_restart_regenerates_unique_name() {
        let (mut supervisor, _handle) = MockSupervisor::with_kernel("3764");
        let mut factory = MockFactory::default();
        let (mut registry, ids) = registry_with_sessions(&supervisor, &mut factory, 2);

        let mut coordinator = LifecycleCoordinator::new();
        let mut prompt = prompt(&[Confirmation::Yes]);
        coordinator
            .restart(&mut registry, ids[0], &mut supervisor, &mut prompt)
            .unwrap();

        let names: HashSet<_> = registry.iter().map(|s| s.display_name().to_string()).collect();
        assert_eq!(names.len(), 2);
        let renamed = registry.lookup(ids[0]).unwrap().display_name().to_string();
        assert_ne!(renamed, "3764/A");
        assert!(renamed.ends_with("/A"));
    }

    #[test]
    fn test_restart_declined_changes_nothing() {
        let (mut supervisor, handle) = MockSupervisor::with_kernel("3764");
        let mut factory = MockFactory::default();
        let (mut registry, ids) = registry_with_sessions(&supervisor, &mut factory, 1);

        let mut coordinator = LifecycleCoordinator::new();
        for answer in [Confirmation::No, Confirmation::Cancel] {
            let mut prompt = prompt(&[answer]);
            let err = coordinator
                .restart(&mut registry, ids[0], &mut supervisor, &mut prompt)
                .unwrap_err();
            assert!(matches!(err, SessionError::Cancelled));
        }
        let session = registry.lookup(ids[0]).unwrap();
        assert_eq!(session.kernel_id(), handle.kernel_id());
        assert_eq!(session.display_name(), "3764/A");
        assert!(supervisor.restarts.is_empty());
    }

    #[test]
    fn test_restart_failure_keeps_original_binding() {
        let (mut supervisor, handle) = MockSupervisor::with_kernel("3764");
        supervisor.fail_spawn = true;
        let mut factory = MockFactory::default();
        let (mut registry, ids) = registry_with_sessions(&supervisor, &mut factory, 1);

        let mut coordinator = LifecycleCoordinator::new();
        let mut prompt = prompt(&[Confirmation::Yes]);
        let err = coordinator
            .restart(&mut registry, ids[0], &mut supervisor, &mut prompt)
            .unwrap_err();
        assert!(matches!(err, SessionError::ConnectFailure { .. }));

        let session = registry.lookup(ids[0]).unwrap();
        assert_eq!(session.kernel_id(), handle.kernel_id());
        assert_eq!(session.state(), LinkState::Connected);
    }

    #[test]
    fn test_restart_dead_kernel_starts_fresh_process() {
        let (mut supervisor, handle) = MockSupervisor::with_kernel("3764");
        let mut factory = MockFactory::default();
        let (mut registry, ids) = registry_with_sessions(&supervisor, &mut factory, 1);

        let mut coordinator = LifecycleCoordinator::new();
        coordinator
            .event_sender()
            .send(KernelEvent::Died {
                handle: handle.clone(),
                elapsed: Duration::from_secs(1),
            })
            .unwrap();
        coordinator.pump_events(&mut registry);

        let mut prompt = prompt(&[Confirmation::Yes]);
        coordinator
            .restart(&mut registry, ids[0], &mut supervisor, &mut prompt)
            .unwrap();

        // The stale handle saw no restart or shutdown request.
        assert!(supervisor.restarts.is_empty());
        assert!(supervisor.shutdowns.is_empty());
        let session = registry.lookup(ids[0]).unwrap();
        assert_eq!(session.state(), LinkState::Connected);
        assert_ne!(session.kernel_id(), handle.kernel_id());
    }

    #[test]
    fn test_restart_remote_shows_notice_only() {
        let mut supervisor = MockSupervisor::default();
        let mut factory = MockFactory::default();
        let mut registry = SessionRegistry::new();
        let id = registry
            .create_session("beef", None, &supervisor, &mut factory)
            .unwrap()
            .session_id();

        let mut coordinator = LifecycleCoordinator::new();
        let mut prompt = prompt(&[]);
        coordinator
            .restart(&mut registry, id, &mut supervisor, &mut prompt)
            .unwrap();
        assert!(prompt.questions.is_empty());
        let log = factory.logs[0].1.borrow();
        assert!(log.notices[0].contains("Cannot restart"));
    }

    #[test]
    fn test_unknown_session_is_reported() {
        let mut supervisor = MockSupervisor::default();
        let mut registry = SessionRegistry::new();
        let mut coordinator = LifecycleCoordinator::new();
        let err = coordinator
            .interrupt(&mut registry, SessionId::new(), &mut supervisor)
            .unwrap_err();
        assert!(matches!(err, SessionError::UnknownSession(_)));
    }

    #[test]
    fn test_restart_focuses_console() {
        let (mut supervisor, _handle) = MockSupervisor::with_kernel("3764");
        let mut factory = MockFactory::default();
        let (mut registry, ids) = registry_with_sessions(&supervisor, &mut factory, 1);

        let mut coordinator = LifecycleCoordinator::new();
        let mut prompt = prompt(&[Confirmation::Yes]);
        coordinator
            .restart(&mut registry, ids[0], &mut supervisor, &mut prompt)
            .unwrap();
        assert_eq!(factory.logs[0].1.borrow().focused, 1);
    }
}
