//! Per-document status analysis and submission.
//!
//! Both operations turn API failures into values so that one bad document never ends the run.

use std::fmt;

use crate::client::Client;
use crate::entities::BusinessStatus;
use crate::error::Error;
use crate::status::{self, StatusSnapshot};

/// Message used when a failed submission carries no JSON:API error details.
pub const GENERIC_FAILURE: &str = "status submission failed";

/// Current business status state of one inbound document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentAnalysis {
    pub document_id: String,
    pub statuses: Vec<BusinessStatus>,
    pub latest: StatusSnapshot,
    pub has_final_status: bool,
    /// True only when the statuses were read and none of them is final.
    pub needs_final_status: bool,
    /// Set when the status list could not be fetched.
    pub error: Option<String>,
}

/// Outcome of one status submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusSubmission {
    Sent {
        code: String,
        technical_status: Option<String>,
    },
    Failed {
        code: String,
        status: Option<u16>,
        message: String,
    },
}

impl StatusSubmission {
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Sent { code, .. } | Self::Failed { code, .. } => code,
        }
    }

    #[must_use]
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

impl fmt::Display for StatusSubmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent {
                code,
                technical_status,
            } => write!(
                f,
                "sent {code} ({})",
                technical_status.as_deref().unwrap_or(status::NO_STATUS)
            ),
            Self::Failed {
                code,
                status: Some(status),
                message,
            } => write!(f, "failed to send {code}: HTTP {status}: {message}"),
            Self::Failed {
                code,
                status: None,
                message,
            } => write!(f, "failed to send {code}: {message}"),
        }
    }
}

#[derive(Debug)]
pub struct BusinessStatusManager<'a> {
    client: &'a Client,
}

impl<'a> BusinessStatusManager<'a> {
    #[must_use]
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Fetches the statuses of `document_id` and decides whether a final status must be sent.
    #[instrument(skip(self))]
    pub async fn analyze_document(&self, document_id: &str) -> DocumentAnalysis {
        match self.client.business_statuses().list(document_id).await {
            Ok(statuses) => {
                let has_final_status = status::has_final_status(&statuses);
                DocumentAnalysis {
                    document_id: document_id.to_string(),
                    latest: status::latest_status(&statuses),
                    has_final_status,
                    needs_final_status: !has_final_status,
                    statuses,
                    error: None,
                }
            }
            Err(e) => {
                warn!(document_id, error = %e, "failed to fetch business statuses");
                DocumentAnalysis {
                    document_id: document_id.to_string(),
                    statuses: Vec::new(),
                    latest: StatusSnapshot::none(),
                    has_final_status: false,
                    needs_final_status: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Submits `code` for `document_id`. Rejections by the API are returned as
    /// [`StatusSubmission::Failed`].
    #[instrument(skip(self))]
    pub async fn send_status(&self, document_id: &str, code: &str) -> StatusSubmission {
        match self.client.business_statuses().create(document_id, code).await {
            Ok(created) => {
                info!(document_id, code = %created.code, "business status sent");
                StatusSubmission::Sent {
                    code: created.code,
                    technical_status: created.technical_status,
                }
            }
            Err(e) => {
                let submission = StatusSubmission::Failed {
                    code: code.to_string(),
                    status: e.status_code().map(|status| status.as_u16()),
                    message: failure_message(&e),
                };
                warn!(document_id, %submission, "business status rejected");
                submission
            }
        }
    }
}

fn failure_message(error: &Error) -> String {
    if let Some(message) = error
        .error_document()
        .and_then(|errors| errors.first())
        .and_then(|first| first.message())
    {
        return message.to_string();
    }

    match error {
        Error::Request(e) => e.to_string(),
        _ => GENERIC_FAILURE.to_string(),
    }
}
