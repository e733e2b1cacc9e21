//! JSON:API envelopes and the Peppol resources carried in them.

use serde::{Deserialize, Serialize};

pub mod business_status;
pub mod document;
pub mod invoice;

pub use business_status::{BusinessStatus, FinalStatus};
pub use document::{InboundDocument, OutboundDocument};
pub use invoice::InvoiceMetadata;

/// A JSON:API resource object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource<A> {
    #[serde(deserialize_with = "crate::utils::serde_helpers::string_or_number")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub attributes: A,
}

/// A top-level document whose `data` is an array of resources.
///
/// Pagination links are ignored; only the first page is read.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<A> {
    #[serde(default = "Vec::new")]
    pub data: Vec<Resource<A>>,
}

/// A top-level document whose `data` is a single resource.
#[derive(Debug, Clone, Deserialize)]
pub struct SingleResponse<A> {
    pub data: Resource<A>,
}

/// The `data` member of a create request; the id is assigned by the server.
#[derive(Debug, Clone, Serialize)]
pub struct NewResource<A> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub attributes: A,
}

/// A create request document.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRequest<A> {
    pub data: NewResource<A>,
}

impl<A> CreateRequest<A> {
    pub fn new(kind: &'static str, attributes: A) -> Self {
        Self {
            data: NewResource { kind, attributes },
        }
    }
}

impl<A> ListResponse<A> {
    /// Converts every resource into its domain type.
    pub fn into_items<T: From<Resource<A>>>(self) -> Vec<T> {
        self.data.into_iter().map(T::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Attributes {
        code: String,
    }

    #[test]
    fn list_without_data_is_empty() {
        let response: ListResponse<Attributes> =
            serde_json::from_value(json!({"meta": {"total": 0}})).unwrap();
        assert!(response.data.is_empty());
    }

    #[test]
    fn create_request_shape() {
        let request = CreateRequest::new(
            "business-statuses",
            Attributes {
                code: "accepted".to_string(),
            },
        );
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"data": {"type": "business-statuses", "attributes": {"code": "accepted"}}})
        );
    }
}
