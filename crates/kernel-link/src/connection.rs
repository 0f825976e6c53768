//! Canonical connection-file naming.
//!
//! A kernel is reached through a JSON connection file named
//! `kernel-<fragment>.json`, where the fragment is a run of ASCII hex
//! digits and hyphens. Users may type the bare fragment (`3764`), the full
//! filename, or anything in between; every accepted spelling is rewritten
//! to the canonical form before use.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Accepted spellings: optional `kernel-` prefix, nonempty hex/hyphen
/// fragment, optional `.json` suffix. Anchored on both ends.
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(kernel-)?([a-fA-F0-9-]+)(\.json)?$").expect("valid pattern"));

/// The identifier could not be parsed into a connection-file name.
///
/// User-correctable: the caller should re-prompt. Nothing is created on
/// this path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid kernel identifier `{0}`: expected `kernel-<id>.json` or a bare id")]
pub struct InvalidIdentifier(pub String);

/// Canonical connection-file name for a kernel: `kernel-<fragment>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionFile(String);

impl ConnectionFile {
    /// Parse a user-supplied kernel identifier and rewrite it to canonical
    /// form.
    ///
    /// `3764`, `kernel-3764` and `kernel-3764.json` all resolve to
    /// `kernel-3764.json`. Empty or non-matching input fails with
    /// [`InvalidIdentifier`].
    pub fn resolve(raw: &str) -> Result<Self, InvalidIdentifier> {
        let trimmed = raw.trim();
        let caps = IDENTIFIER
            .captures(trimmed)
            .ok_or_else(|| InvalidIdentifier(raw.to_string()))?;
        let fragment = caps
            .get(2)
            .expect("fragment group is non-optional")
            .as_str();
        Ok(Self(format!("kernel-{fragment}.json")))
    }

    /// The id fragment between the `kernel-` prefix and `.json` suffix.
    pub fn fragment(&self) -> &str {
        &self.0["kernel-".len()..self.0.len() - ".json".len()]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ConnectionFile {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}
