use std::fmt;
use url::Url;

use crate::error::{Error, Result};

/// A typed representation of the Peppol API endpoints this tool talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeppolEndpoint {
    /// Outbound (sent) documents.
    Documents,
    /// Inbound (received) documents.
    InboundDocuments,
    /// A single inbound document; serves the UBL XML body.
    InboundDocument(String),
    /// Business statuses of an inbound document.
    BusinessStatuses(String),
}

impl PeppolEndpoint {
    fn segments(&self) -> Vec<&str> {
        match self {
            Self::Documents => vec!["peppol", "documents"],
            Self::InboundDocuments => vec!["peppol", "inbound-documents"],
            Self::InboundDocument(id) => vec!["peppol", "inbound-documents", id.as_str()],
            Self::BusinessStatuses(id) => {
                vec!["peppol", "inbound-documents", id.as_str(), "business-statuses"]
            }
        }
    }

    /// Resolves the endpoint against the API base URL. Document ids are percent-encoded as
    /// path segments.
    pub fn to_url(&self, base: &Url) -> Result<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidEndpoint)?
            .pop_if_empty()
            .extend(self.segments());
        Ok(url)
    }
}

impl fmt::Display for PeppolEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments().join("/"))
    }
}
