//! Error-location scanning for console output.
//!
//! Traceback lines like `File "script.py", line 12` are recognized and
//! forwarded to the navigation sink so the embedding editor can jump to
//! the offending source. Parsing only; no state is kept here.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

static ERROR_LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"File "([^"]+)", line (\d+)"#).expect("valid pattern"));

/// Receives source locations extracted from error output.
pub trait NavigationSink {
    fn notify_error_location(&mut self, path: &Path, line: u32);
}

/// Extract the last `File "<path>", line <n>` pair in `text`, if any.
///
/// Tracebacks list frames outermost-first, so the last match is the frame
/// closest to the error.
pub fn scan_error_location(text: &str) -> Option<(PathBuf, u32)> {
    ERROR_LOCATION.captures_iter(text).last().and_then(|caps| {
        let path = PathBuf::from(caps.get(1)?.as_str());
        let line = caps.get(2)?.as_str().parse().ok()?;
        Some((path, line))
    })
}
