//! Pairing of inbound and outbound documents.

use std::collections::HashMap;
use std::fmt;

use time::Date;

use crate::entities::{InboundDocument, OutboundDocument};

/// Outbound documents keyed by transmission ID.
pub type TransmissionIndex = HashMap<String, OutboundDocument>;

/// An inbound document and the outbound document it was transmitted from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub inbound: InboundDocument,
    pub outbound: OutboundDocument,
}

impl Match {
    /// The shared transmission ID.
    #[must_use]
    pub fn transmission_id(&self) -> &str {
        self.inbound.transmission_id.as_deref().unwrap_or_default()
    }
}

/// Indexes outbound documents by transmission ID.
///
/// Documents without a transmission ID are skipped. When two documents share an ID the one
/// listed later replaces the earlier one.
#[must_use]
pub fn index_by_transmission_id(outbound: Vec<OutboundDocument>) -> TransmissionIndex {
    let mut index = TransmissionIndex::with_capacity(outbound.len());
    for document in outbound {
        let Some(transmission_id) = document.transmission_id.clone() else {
            debug!(document_id = %document.id, "outbound document has no transmission id");
            continue;
        };
        if let Some(previous) = index.insert(transmission_id.clone(), document) {
            warn!(
                %transmission_id,
                replaced = %previous.id,
                "duplicate transmission id in outbound documents"
            );
        }
    }
    index
}

/// One match per inbound document whose transmission ID is in `index`, in inbound order.
#[must_use]
pub fn match_documents(inbound: &[InboundDocument], index: &TransmissionIndex) -> Vec<Match> {
    inbound
        .iter()
        .filter_map(|document| {
            let outbound = index.get(document.transmission_id.as_deref()?)?;
            Some(Match {
                inbound: document.clone(),
                outbound: outbound.clone(),
            })
        })
        .collect()
}

/// Side of the cutoff date an invoice was issued on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Partition {
    BeforeCutoff,
    OnOrAfterCutoff,
}

impl Partition {
    /// Processing order.
    pub const ALL: [Self; 2] = [Self::BeforeCutoff, Self::OnOrAfterCutoff];

    #[must_use]
    pub fn classify(issue_date: Date, cutoff: Date) -> Self {
        if issue_date < cutoff {
            Self::BeforeCutoff
        } else {
            Self::OnOrAfterCutoff
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BeforeCutoff => "before cutoff",
            Self::OnOrAfterCutoff => "on or after cutoff",
        })
    }
}

/// Sort key for invoice numbers. Numeric numbers order by value and before any other text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum InvoiceNumberKey {
    Numeric(u64),
    Text(String),
}

impl InvoiceNumberKey {
    #[must_use]
    pub fn parse(number: &str) -> Self {
        let number = number.trim();
        number
            .parse()
            .map_or_else(|_| Self::Text(number.to_string()), Self::Numeric)
    }
}
