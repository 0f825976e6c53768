//! History log collaborators.
//!
//! Each completed command is reported exactly once, in execution order.
//! Sinks are one-way: they never feed anything back into the registry, and
//! their failures are logged rather than surfaced.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use log::warn;

use crate::session::SessionId;

/// Receives executed commands, append-only.
pub trait HistorySink {
    /// Called once per completed command, in execution order.
    fn notify_executed(&mut self, session: SessionId, command: &str);

    /// Called when a session leaves the registry.
    fn detach(&mut self, _session: SessionId) {}
}

/// Appends executed commands to a single history file.
///
/// The first command from each session opens a dated block, so commands
/// from interleaved sessions stay attributable when read back.
pub struct FileHistorySink {
    path: PathBuf,
    started: HashSet<SessionId>,
}

impl FileHistorySink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            started: HashSet::new(),
        }
    }

    /// Default location under the user data directory.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("kernel-console")
            .join("history.py")
    }

    fn append(&self, text: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(text.as_bytes())
    }
}

impl HistorySink for FileHistorySink {
    fn notify_executed(&mut self, session: SessionId, command: &str) {
        let mut entry = String::new();
        if self.started.insert(session) {
            let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
            entry.push_str(&format!("\n# ---({stamp})---\n"));
        }
        entry.push_str(command);
        entry.push('\n');
        if let Err(err) = self.append(&entry) {
            warn!("[history] failed to append to {}: {err}", self.path.display());
        }
    }

    fn detach(&mut self, session: SessionId) {
        self.started.remove(&session);
    }
}
