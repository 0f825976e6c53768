//! Close/teardown policy.
//!
//! A close request takes down either just the session or the kernel and
//! every session attached to it. The whole decision (validation, prompt)
//! is made before anything is removed, so a cancelled close changes
//! nothing and a committed close removes exactly the decided-upon set.

use kernel_link::KernelSupervisor;
use log::{info, warn};

use crate::error::SessionError;
use crate::history::HistorySink;
use crate::lifecycle::LifecycleCoordinator;
use crate::prompt::{ConfirmPrompt, Confirmation};
use crate::registry::SessionRegistry;
use crate::session::{KernelHost, SessionId};
use crate::settings::ConsoleSettings;

/// Close the session `id`, possibly cascading to its kernel and the other
/// sessions attached to it. Returns the ids actually removed.
///
/// - `force` closes exactly this session without prompting; the kernel is
///   terminated only when it is locally supervised and no other session
///   remains on it.
/// - Without `force`, a remote kernel or a disabled
///   [`confirm_on_close`](ConsoleSettings::confirm_on_close) preference
///   closes everything unprompted. Otherwise the user picks: cancel
///   (nothing changes), close only this session (kernel and co-attached
///   sessions survive), or close everything.
#[allow(clippy::too_many_arguments)]
pub fn close_session(
    registry: &mut SessionRegistry,
    coordinator: &mut LifecycleCoordinator,
    id: SessionId,
    force: bool,
    settings: &ConsoleSettings,
    supervisor: &mut dyn KernelSupervisor,
    prompt: &mut dyn ConfirmPrompt,
    history: &mut dyn HistorySink,
) -> Result<Vec<SessionId>, SessionError> {
    let (kernel, handle, host, display_name) = {
        let session = registry.lookup(id).ok_or(SessionError::UnknownSession(id))?;
        (
            session.kernel_id(),
            session.kernel().clone(),
            session.host(),
            session.display_name().to_string(),
        )
    };
    let related: Vec<SessionId> = registry
        .ids_for_kernel(kernel)
        .into_iter()
        .filter(|sid| *sid != id)
        .collect();
    let local = host == KernelHost::Local;

    let mut doomed = vec![id];
    let mut kill_kernel = false;
    if force {
        kill_kernel = local && related.is_empty();
    } else if !local || !settings.confirm_on_close {
        doomed.extend(related.iter().copied());
        kill_kernel = local;
    } else {
        let question = format!(
            "Console {display_name} will be closed.\n\
             Do you want to kill the associated kernel and all of its clients?"
        );
        match prompt.confirm(&question) {
            Confirmation::Cancel => return Err(SessionError::Cancelled),
            Confirmation::Yes => {
                doomed.extend(related.iter().copied());
                kill_kernel = true;
            }
            Confirmation::No => {}
        }
    }

    if kill_kernel {
        if !coordinator.is_retired(kernel) {
            if let Err(err) = supervisor.shutdown_kernel(&handle) {
                // The process may already be gone; teardown continues.
                warn!("[close] could not shut down kernel {kernel}: {err}");
            }
        }
        coordinator.retire(kernel);
    }

    let mut removed = Vec::with_capacity(doomed.len());
    for sid in doomed {
        if let Some(mut session) = registry.remove(sid) {
            session.console_mut().release();
            history.detach(sid);
            removed.push(sid);
        }
    }
    info!(
        "[close] removed {} session(s) bound to kernel {kernel} (kernel terminated: {kill_kernel})",
        removed.len()
    );
    Ok(removed)
}
