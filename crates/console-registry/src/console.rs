//! Capabilities of the console display widget.
//!
//! Rendering, text formatting and focus handling live with the embedding
//! UI. The registry only drives these capabilities: it opens a console per
//! session, pushes notices into it, and releases it on close.

use std::io;
use std::time::Duration;

use kernel_link::ConnectionFile;

/// One console widget attached to a session.
pub trait ConsoleView {
    /// Append an informational notice to the console output.
    fn show_notice(&mut self, text: &str);

    /// Tell the user the bound kernel died unexpectedly, `elapsed` after
    /// the death was detected. The session itself stays open.
    fn notify_kernel_died(&mut self, elapsed: Duration);

    /// Give keyboard focus to the console's focusable control.
    fn take_focus(&mut self);

    /// Release focus ownership and widget-side resources. Called exactly
    /// once, right before the session leaves the registry.
    fn release(&mut self);
}

/// Opens console widgets for connection files.
pub trait ConsoleFactory {
    /// Open a console attached to `connection_file`.
    ///
    /// An I/O error here surfaces as
    /// [`SessionError::ConnectFailure`](crate::SessionError::ConnectFailure)
    /// and no session is created.
    fn open(&mut self, connection_file: &ConnectionFile) -> io::Result<Box<dyn ConsoleView>>;
}
