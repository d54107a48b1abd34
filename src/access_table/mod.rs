//! AccessTable - Badge UID → Identity Lookup
//!
//! ## Responsibilities
//!
//! - Hold the static uid → display name mapping loaded at startup
//! - Decide grant/deny for a scanned badge (pure, total)
//!
//! The table is read-only for the lifetime of the pipeline. Reloading it is a
//! configuration concern: build a new table and restart.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Display name reported for badges that are not in the table
pub const UNKNOWN_SUBJECT: &str = "Unknown";

/// Badges enrolled when `ACCESS_UIDS` is not set
const DEFAULT_ENTRIES: [(&str, &str); 3] = [
    ("333647F7", "Blauer Chip"),
    ("61D1AA17", "Weisse Karte"),
    ("04E0391AC16680", "Angelausweis"),
];

/// Outcome of an access decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "name")]
pub enum AccessDecision {
    /// UID is known; carries the configured display name
    Grant(String),
    /// UID is unknown; carries the fixed sentinel name
    Deny(String),
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Grant(_))
    }

    /// Display name for the event record
    pub fn subject_name(&self) -> &str {
        match self {
            AccessDecision::Grant(name) | AccessDecision::Deny(name) => name,
        }
    }
}

/// Static access table
#[derive(Debug, Clone)]
pub struct AccessTable {
    entries: HashMap<String, String>,
}

impl AccessTable {
    /// Create table from an explicit mapping
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Parse `UID=Name;UID=Name` as used by the `ACCESS_UIDS` setting
    ///
    /// Whitespace around UIDs and names is trimmed and empty segments are
    /// skipped. A segment without `=` or with an empty UID is rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut entries = HashMap::new();

        for segment in raw.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            let (uid, name) = segment.split_once('=').ok_or_else(|| {
                Error::Config(format!("access entry '{}' is missing '='", segment))
            })?;

            let uid = uid.trim();
            if uid.is_empty() {
                return Err(Error::Config(format!(
                    "access entry '{}' has an empty uid",
                    segment
                )));
            }

            entries.insert(uid.to_string(), name.trim().to_string());
        }

        Ok(Self { entries })
    }

    /// Decide access for a badge UID
    ///
    /// Never fails: an unknown UID is the `Deny` case with [`UNKNOWN_SUBJECT`].
    pub fn decide(&self, uid: &str) -> AccessDecision {
        match self.entries.get(uid) {
            Some(name) => AccessDecision::Grant(name.clone()),
            None => AccessDecision::Deny(UNKNOWN_SUBJECT.to_string()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AccessTable {
    fn default() -> Self {
        Self::new(
            DEFAULT_ENTRIES
                .iter()
                .map(|(uid, name)| (uid.to_string(), name.to_string()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice_table() -> AccessTable {
        AccessTable::new(HashMap::from([("AAAA".to_string(), "Alice".to_string())]))
    }

    #[test]
    fn test_known_uid_is_granted() {
        let table = alice_table();
        assert_eq!(table.decide("AAAA"), AccessDecision::Grant("Alice".to_string()));
    }

    #[test]
    fn test_unknown_uid_is_denied_with_sentinel() {
        let table = alice_table();
        assert_eq!(
            table.decide("ZZZZ"),
            AccessDecision::Deny(UNKNOWN_SUBJECT.to_string())
        );
    }

    #[test]
    fn test_every_default_entry_grants_its_name() {
        let table = AccessTable::default();
        for (uid, name) in DEFAULT_ENTRIES {
            assert_eq!(table.decide(uid), AccessDecision::Grant(name.to_string()));
        }
    }

    #[test]
    fn test_decide_is_deterministic() {
        let table = alice_table();
        assert_eq!(table.decide("AAAA"), table.decide("AAAA"));
        assert_eq!(table.decide(""), table.decide(""));
    }

    #[test]
    fn test_parse_entries() {
        let table = AccessTable::parse(" AAAA = Alice ; BBBB=Bob;;").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.decide("BBBB").subject_name(), "Bob");
        assert!(table.decide("AAAA").is_granted());
    }

    #[test]
    fn test_parse_rejects_malformed_entry() {
        assert!(AccessTable::parse("AAAA").is_err());
        assert!(AccessTable::parse("=Nobody").is_err());
    }
}
