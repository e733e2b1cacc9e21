use core::fmt;

use oauth2::AccessToken;
use reqwest::{IntoUrl, Method, RequestBuilder, StatusCode, header};
use serde::{Serialize, de::DeserializeOwned};
use time::{OffsetDateTime, UtcOffset, format_description::well_known::Rfc3339};
use tracing_error::SpanTrace;
use url::Url;

use crate::config::Config;
use crate::endpoints::PeppolEndpoint;
use crate::entities::{
    CreateRequest, ListResponse, SingleResponse,
    business_status::{self, BusinessStatus, BusinessStatusAttributes, NewBusinessStatus},
    document::{InboundAttributes, InboundDocument, OutboundAttributes, OutboundDocument},
};
use crate::error::{Error, ErrorDocument, Result};
use crate::oauth;

const JSON_API: &str = "application/vnd.api+json";
const XML: &str = "application/xml";

/// An authenticated client for the Peppol API.
///
/// The client holds a bearer token obtained once through the client-credentials flow. It is
/// never refreshed; a run is expected to finish well within the token's lifetime.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    access_token: AccessToken,
    page_size: u32,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Exchanges the configured client credentials for a token.
    ///
    /// # Errors
    /// Returns [`Error::OAuth2`] if the token endpoint rejects the credentials or can't be
    /// reached.
    #[instrument(skip_all, fields(token_url = %config.token_url))]
    pub async fn from_client_credentials(config: &Config, http: reqwest::Client) -> Result<Self> {
        let access_token =
            oauth::exchange_client_credentials(config.key_pair.clone(), &config.token_url, &http)
                .await?;

        Ok(Self::from_access_token(config, http, access_token))
    }

    /// Creates a client around an already obtained token.
    #[must_use]
    pub fn from_access_token(config: &Config, http: reqwest::Client, access_token: AccessToken) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            access_token,
            page_size: config.page_size,
        }
    }

    /// Build a request object with authentication headers.
    pub(crate) fn build_request<U: IntoUrl + fmt::Debug>(
        &self,
        method: Method,
        url: U,
        accept: &str,
    ) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(self.access_token.secret())
            .header(header::ACCEPT, accept)
    }

    /// Perform an authenticated `GET` request against a typed endpoint.
    #[instrument(skip(self, query))]
    pub async fn get_endpoint<R: DeserializeOwned, T: Serialize + ?Sized + fmt::Debug>(
        &self,
        endpoint: PeppolEndpoint,
        query: &T,
    ) -> Result<R> {
        let url = endpoint.to_url(&self.base_url)?;
        trace!(?query, %url, "making GET request");
        let response = self
            .build_request(Method::GET, url, JSON_API)
            .query(query)
            .send()
            .await?;

        Self::handle_response(response, &endpoint).await
    }

    /// Perform an authenticated `GET` request and return the body as text, e.g. a UBL document.
    #[instrument(skip(self))]
    pub async fn get_text(&self, endpoint: PeppolEndpoint, accept: &str) -> Result<String> {
        let url = endpoint.to_url(&self.base_url)?;
        trace!(%url, accept, "making GET request");
        let response = self
            .build_request(Method::GET, url, accept)
            .send()
            .await?;

        let response = Self::check_status(response, &endpoint).await?;
        Ok(response.text().await?)
    }

    /// Perform an authenticated `POST` request with a JSON:API body.
    #[instrument(skip(self, data))]
    pub async fn post_endpoint<R: DeserializeOwned, T: Serialize + ?Sized>(
        &self,
        endpoint: PeppolEndpoint,
        data: &T,
    ) -> Result<R> {
        let url = endpoint.to_url(&self.base_url)?;
        trace!(json = ?serde_json::to_string(data).ok(), %url, "making POST request");
        let response = self
            .build_request(Method::POST, url, JSON_API)
            .header(header::CONTENT_TYPE, JSON_API)
            .json(data)
            .send()
            .await?;

        Self::handle_response(response, &endpoint).await
    }

    /// Maps non-success responses to errors, leaving the body of successful ones unread.
    async fn check_status(
        response: reqwest::Response,
        endpoint: &PeppolEndpoint,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        let url = response.url().to_string();

        tracing::debug!("Response from {}: status={}", url, status);

        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        tracing::trace!("Error response text:\n{}", text);

        match status {
            StatusCode::NOT_FOUND => Err(Error::NotFound {
                entity: endpoint.to_string(),
                url,
                status_code: status,
                response_body: Some(text),
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Forbidden {
                url,
                status_code: status,
                errors: ErrorDocument::parse_lenient(&text),
                span_trace: SpanTrace::capture(),
            }),
            _ => {
                tracing::error!("Unexpected status code: {}", status);
                Err(Error::Api {
                    url,
                    status_code: status,
                    errors: ErrorDocument::parse_lenient(&text),
                    response_body: Some(text),
                    span_trace: SpanTrace::capture(),
                })
            }
        }
    }

    #[instrument(skip(response))]
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
        endpoint: &PeppolEndpoint,
    ) -> Result<T> {
        let response = Self::check_status(response, endpoint).await?;
        let text = response.text().await?;

        tracing::debug!("Response body size: {} bytes", text.len());
        tracing::trace!("Response text:\n{}", text);

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                "Deserialization error: {}, near position: {} - response text around that position: {}",
                e,
                e.column(),
                &text
                    .chars()
                    .skip(e.column().saturating_sub(30))
                    .take(100)
                    .collect::<String>()
            );
            Error::DeserializationError(e, Some(text.clone()))
        })
    }

    /// Access the outbound documents API
    #[must_use]
    pub fn documents(&self) -> DocumentsApi<'_> {
        DocumentsApi { client: self }
    }

    /// Access the inbound documents API
    #[must_use]
    pub fn inbound_documents(&self) -> InboundDocumentsApi<'_> {
        InboundDocumentsApi { client: self }
    }

    /// Access the business statuses of inbound documents
    #[must_use]
    pub fn business_statuses(&self) -> BusinessStatusesApi<'_> {
        BusinessStatusesApi { client: self }
    }
}

/// API handler for `/peppol/documents`
#[derive(Debug)]
pub struct DocumentsApi<'a> {
    client: &'a Client,
}

impl DocumentsApi<'_> {
    /// Lists documents sent by `supplier_id` and created at or after `created_after`.
    ///
    /// Only the first page is returned.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        supplier_id: &str,
        created_after: OffsetDateTime,
    ) -> Result<Vec<OutboundDocument>> {
        let created_after = created_after.to_offset(UtcOffset::UTC).format(&Rfc3339)?;
        let query = [
            ("filter[supplierId]", supplier_id.to_string()),
            ("filter[createdAfter]", created_after),
            ("page[size]", self.client.page_size.to_string()),
        ];
        let response: ListResponse<OutboundAttributes> = self
            .client
            .get_endpoint(PeppolEndpoint::Documents, &query)
            .await?;
        Ok(response.into_items())
    }
}

/// API handler for `/peppol/inbound-documents`
#[derive(Debug)]
pub struct InboundDocumentsApi<'a> {
    client: &'a Client,
}

impl InboundDocumentsApi<'_> {
    /// Lists documents received by `supplier_id`.
    ///
    /// Only the first page is returned.
    #[instrument(skip(self))]
    pub async fn list(&self, supplier_id: &str) -> Result<Vec<InboundDocument>> {
        let query = [
            ("filter[supplierId]", supplier_id.to_string()),
            ("page[size]", self.client.page_size.to_string()),
        ];
        let response: ListResponse<InboundAttributes> = self
            .client
            .get_endpoint(PeppolEndpoint::InboundDocuments, &query)
            .await?;
        Ok(response.into_items())
    }

    /// Fetches the UBL XML of an inbound document.
    #[instrument(skip(self))]
    pub async fn xml(&self, document_id: &str) -> Result<String> {
        self.client
            .get_text(PeppolEndpoint::InboundDocument(document_id.to_string()), XML)
            .await
    }
}

/// API handler for `/peppol/inbound-documents/{id}/business-statuses`
#[derive(Debug)]
pub struct BusinessStatusesApi<'a> {
    client: &'a Client,
}

impl BusinessStatusesApi<'_> {
    /// Lists every business status recorded for a document, in no particular order.
    #[instrument(skip(self))]
    pub async fn list(&self, document_id: &str) -> Result<Vec<BusinessStatus>> {
        let response: ListResponse<BusinessStatusAttributes> = self
            .client
            .get_endpoint(
                PeppolEndpoint::BusinessStatuses(document_id.to_string()),
                &[("page[size]", self.client.page_size.to_string())],
            )
            .await?;
        Ok(response.into_items())
    }

    /// Records a new business status and returns it as stored by the API.
    #[instrument(skip(self))]
    pub async fn create(&self, document_id: &str, code: &str) -> Result<BusinessStatus> {
        let request = CreateRequest::new(business_status::RESOURCE_TYPE, NewBusinessStatus { code });
        let response: SingleResponse<BusinessStatusAttributes> = self
            .client
            .post_endpoint(
                PeppolEndpoint::BusinessStatuses(document_id.to_string()),
                &request,
            )
            .await?;
        Ok(response.data.into())
    }
}
