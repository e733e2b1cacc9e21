use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use oauth2::{HttpClientError, basic::BasicErrorResponse};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing_error::SpanTrace;

/// One entry of a JSON:API `errors` array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiErrorObject {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ApiErrorObject {
    /// The most specific human readable text of this error, `detail` before `title`.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.detail.as_deref().or(self.title.as_deref())
    }
}

/// The JSON:API error document returned with non-2xx responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[allow(clippy::module_name_repetitions)]
pub struct ErrorDocument {
    #[serde(default)]
    pub errors: Vec<ApiErrorObject>,
}

impl ErrorDocument {
    /// Parses an error body, falling back to an empty document when the body isn't JSON:API.
    #[must_use]
    pub fn parse_lenient(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    #[must_use]
    pub fn first(&self) -> Option<&ApiErrorObject> {
        self.errors.first()
    }
}

impl fmt::Display for ErrorDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.first().and_then(ApiErrorObject::message) {
            Some(message) if self.errors.len() > 1 => {
                write!(f, "{message} (+{} more)", self.errors.len() - 1)
            }
            Some(message) => write!(f, "{message}"),
            None => write!(f, "no error details"),
        }
    }
}

pub type TokenError = oauth2::RequestTokenError<HttpClientError<reqwest::Error>, BasicErrorResponse>;

/// Errors that can occur when talking to the Peppol API or producing the report.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("error making request: {0:?}")]
    #[diagnostic(
        code(peppol_reconcile::request_error),
        help("Check your network connection and Peppol API availability")
    )]
    Request(#[source] reqwest::Error),

    #[error("error decoding response: {0:?}")]
    #[diagnostic(
        code(peppol_reconcile::deserialization_error),
        help("The API returned data in an unexpected format")
    )]
    DeserializationError(#[source] serde_json::Error, Option<String>),

    #[error("error reading invoice xml: {0}")]
    #[diagnostic(
        code(peppol_reconcile::xml_error),
        help("The document body is not well-formed UBL XML")
    )]
    Xml(#[source] quick_xml::Error),

    #[error("object not found: {entity} (url: {url})")]
    #[diagnostic(
        code(peppol_reconcile::not_found),
        help("Verify that the {entity} exists and that you have permission to access it")
    )]
    NotFound {
        entity: String,
        url: String,
        status_code: StatusCode,
        response_body: Option<String>,
    },

    #[error("endpoint could not be parsed as a URL")]
    #[diagnostic(
        code(peppol_reconcile::invalid_endpoint),
        help("Check that PEPPOL_BASE_URL is an absolute URL")
    )]
    InvalidEndpoint,

    /// The API refused the request, e.g. a status transition out of a final status.
    #[error("encountered forbidden response ({status_code}): {errors}")]
    #[diagnostic(
        code(peppol_reconcile::forbidden),
        help("Check your credentials, or whether the document already has a final status")
    )]
    Forbidden {
        url: String,
        status_code: StatusCode,
        errors: ErrorDocument,
        span_trace: SpanTrace,
    },

    /// Any other non-success response.
    #[error("unexpected response ({status_code}) from {url}: {errors}")]
    #[diagnostic(
        code(peppol_reconcile::api_error),
        help("Review the error details returned by the Peppol API")
    )]
    Api {
        url: String,
        status_code: StatusCode,
        errors: ErrorDocument,
        response_body: Option<String>,
        span_trace: SpanTrace,
    },

    /// An error returned while exchanging client credentials for a token.
    #[error("oauth2 error: {0:?}")]
    #[diagnostic(
        code(peppol_reconcile::oauth2_error),
        help("Verify PEPPOL_TOKEN_URL, PEPPOL_CLIENT_ID and PEPPOL_CLIENT_SECRET")
    )]
    OAuth2(TokenError),

    #[error("could not read client certificate {path}")]
    #[diagnostic(
        code(peppol_reconcile::certificate),
        help("PEPPOL_CERT_PATH must point to a readable PKCS#12 bundle")
    )]
    Certificate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration for {variable}: {reason}")]
    #[diagnostic(
        code(peppol_reconcile::config),
        help("Set {variable} in the environment or in a .env file")
    )]
    Config { variable: String, reason: String },

    #[error("could not format timestamp: {0}")]
    #[diagnostic(
        code(peppol_reconcile::timestamp),
        help("Timestamps are sent in UTC as RFC 3339")
    )]
    Timestamp(#[source] time::error::Format),

    #[error("could not write report: {0}")]
    #[diagnostic(code(peppol_reconcile::io))]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status code of the failed response, if the error came from one.
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::NotFound { status_code, .. }
            | Self::Forbidden { status_code, .. }
            | Self::Api { status_code, .. } => Some(*status_code),
            Self::Request(e) => e.status(),
            _ => None,
        }
    }

    /// The JSON:API error document of the failed response, if any.
    #[must_use]
    pub fn error_document(&self) -> Option<&ErrorDocument> {
        match self {
            Self::Forbidden { errors, .. } | Self::Api { errors, .. } => Some(errors),
            _ => None,
        }
    }

    /// The span trace captured when the API rejected the request.
    #[must_use]
    pub fn span_trace(&self) -> Option<&SpanTrace> {
        match self {
            Self::Forbidden { span_trace, .. } | Self::Api { span_trace, .. } => Some(span_trace),
            _ => None,
        }
    }

    pub(crate) fn config(variable: &str, reason: impl Into<String>) -> Self {
        Self::Config {
            variable: variable.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::DeserializationError(e, None)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e)
    }
}

impl From<time::error::Format> for Error {
    fn from(e: time::error::Format) -> Self {
        Self::Timestamp(e)
    }
}

impl From<TokenError> for Error {
    fn from(e: TokenError) -> Self {
        Self::OAuth2(e)
    }
}

/// Type alias for results from this crate.
///
/// This is already a Miette diagnostic result due to the implementation of
/// the Diagnostic trait for the Error type.
pub type Result<O> = std::result::Result<O, Error>;
