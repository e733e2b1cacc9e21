//! Pure functions over an inbound document's business status records.
//!
//! The API returns status records in no particular order; everything here is independent of
//! the input order.

use std::fmt;

use crate::entities::business_status::{BusinessStatus, FINAL_CODES};

/// Placeholder printed when a document has no status, or its statuses could not be read.
pub const NO_STATUS: &str = "-";

/// Code and technical status of a document's current business status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub code: String,
    pub technical_status: String,
}

impl StatusSnapshot {
    /// The `("-", "-")` sentinel.
    #[must_use]
    pub fn none() -> Self {
        Self {
            code: NO_STATUS.to_string(),
            technical_status: NO_STATUS.to_string(),
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        self.code == NO_STATUS
    }
}

impl From<&BusinessStatus> for StatusSnapshot {
    fn from(status: &BusinessStatus) -> Self {
        Self {
            code: status.code.clone(),
            technical_status: status
                .technical_status
                .clone()
                .unwrap_or_else(|| NO_STATUS.to_string()),
        }
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.technical_status)
    }
}

/// The record with the greatest `created_at`. Ties go to the record listed last.
#[must_use]
pub fn latest(statuses: &[BusinessStatus]) -> Option<&BusinessStatus> {
    statuses.iter().max_by_key(|status| status.created_at)
}

/// Snapshot of [`latest`], or the sentinel for an empty list.
#[must_use]
pub fn latest_status(statuses: &[BusinessStatus]) -> StatusSnapshot {
    latest(statuses).map_or_else(StatusSnapshot::none, StatusSnapshot::from)
}

#[must_use]
pub fn has_status(statuses: &[BusinessStatus], code: &str) -> bool {
    statuses.iter().any(|status| status.code == code)
}

#[must_use]
pub fn has_any_status(statuses: &[BusinessStatus], codes: &[&str]) -> bool {
    codes.iter().any(|code| has_status(statuses, code))
}

/// Whether `code` closes the lifecycle.
#[must_use]
pub fn is_final(code: &str) -> bool {
    FINAL_CODES.contains(&code)
}

/// Whether any record, not only the latest, carries a final code.
#[must_use]
pub fn has_final_status(statuses: &[BusinessStatus]) -> bool {
    has_any_status(statuses, &FINAL_CODES)
}
