use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Resource;
use crate::utils::date_format::{api_datetime_format, api_datetime_format_option};
use crate::utils::serde_helpers::empty_string_as_none;

/// Attributes of a sent document as returned by `GET /peppol/documents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundAttributes {
    #[serde(with = "api_datetime_format")]
    pub created_at: OffsetDateTime,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub transmission_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub business_status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub technical_status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub document_number: Option<String>,
}

/// Attributes of a received document as returned by `GET /peppol/inbound-documents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundAttributes {
    #[serde(with = "api_datetime_format")]
    pub created_at: OffsetDateTime,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub transmission_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub document_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub sender_id: Option<String>,
    #[serde(
        default,
        with = "api_datetime_format_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub received_at: Option<OffsetDateTime>,
}

/// A sent invoice. Its status is denormalized onto the document itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundDocument {
    pub id: String,
    pub created_at: OffsetDateTime,
    pub transmission_id: Option<String>,
    pub status: Option<String>,
    pub business_status: Option<String>,
    pub technical_status: Option<String>,
    pub document_number: Option<String>,
}

impl From<Resource<OutboundAttributes>> for OutboundDocument {
    fn from(resource: Resource<OutboundAttributes>) -> Self {
        let Resource { id, attributes, .. } = resource;
        Self {
            id,
            created_at: attributes.created_at,
            transmission_id: attributes.transmission_id,
            status: attributes.status,
            business_status: attributes.business_status,
            technical_status: attributes.technical_status,
            document_number: attributes.document_number,
        }
    }
}

/// A received invoice. Its business status lives in a separate status list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundDocument {
    pub id: String,
    pub created_at: OffsetDateTime,
    pub transmission_id: Option<String>,
    pub document_type: Option<String>,
    pub sender_id: Option<String>,
    pub received_at: Option<OffsetDateTime>,
}

impl From<Resource<InboundAttributes>> for InboundDocument {
    fn from(resource: Resource<InboundAttributes>) -> Self {
        let Resource { id, attributes, .. } = resource;
        Self {
            id,
            created_at: attributes.created_at,
            transmission_id: attributes.transmission_id,
            document_type: attributes.document_type,
            sender_id: attributes.sender_id,
            received_at: attributes.received_at,
        }
    }
}
