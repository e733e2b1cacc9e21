use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Resource;
use crate::utils::date_format::api_datetime_format;
use crate::utils::serde_helpers::empty_string_as_none;

pub const RESOURCE_TYPE: &str = "business-statuses";

pub const ACCEPTED: &str = "accepted";
pub const REJECTED: &str = "rejected";

/// Codes after which the API refuses any further transition.
pub const FINAL_CODES: [&str; 2] = [ACCEPTED, REJECTED];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessStatusAttributes {
    pub code: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub technical_status: Option<String>,
    #[serde(with = "api_datetime_format")]
    pub created_at: OffsetDateTime,
}

/// One business status record of an inbound document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessStatus {
    pub id: String,
    /// Free-form lifecycle code; see [`FINAL_CODES`].
    pub code: String,
    pub technical_status: Option<String>,
    pub created_at: OffsetDateTime,
}

impl From<Resource<BusinessStatusAttributes>> for BusinessStatus {
    fn from(resource: Resource<BusinessStatusAttributes>) -> Self {
        let Resource { id, attributes, .. } = resource;
        Self {
            id,
            code: attributes.code,
            technical_status: attributes.technical_status,
            created_at: attributes.created_at,
        }
    }
}

/// Attributes sent when creating a business status.
#[derive(Debug, Clone, Serialize)]
pub struct NewBusinessStatus<'a> {
    pub code: &'a str,
}

/// The two codes that close an inbound document's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinalStatus {
    Accepted,
    Rejected,
}

impl FinalStatus {
    pub const ALL: [Self; 2] = [Self::Accepted, Self::Rejected];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => ACCEPTED,
            Self::Rejected => REJECTED,
        }
    }
}

impl fmt::Display for FinalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
