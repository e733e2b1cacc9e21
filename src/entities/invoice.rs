use quick_xml::{Reader, events::Event};
use time::Date;

use crate::error::Result;
use crate::utils::date_format::parse_api_date;

/// Local names of the UBL document elements whose children carry the metadata.
const DOCUMENT_ROOTS: [&[u8]; 2] = [b"Invoice", b"CreditNote"];

/// The fields of a UBL invoice shown in the report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceMetadata {
    /// `cbc:ID`
    pub invoice_number: Option<String>,
    /// First `cbc:Note`
    pub note: Option<String>,
    /// `cbc:IssueDate`
    pub issue_date: Option<Date>,
}

impl InvoiceMetadata {
    /// Reads the metadata from a UBL `Invoice` or `CreditNote`.
    ///
    /// Only direct children of the document element are considered, so identifiers of
    /// parties, references and lines are never picked up. Namespace prefixes are ignored and
    /// the document may be wrapped in an SBDH envelope. Missing elements are `None`; only
    /// malformed XML is an error.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut path: Vec<Vec<u8>> = Vec::new();
        let mut metadata = Self::default();

        loop {
            match reader.read_event()? {
                Event::Start(element) => path.push(element.local_name().as_ref().to_vec()),
                Event::End(_) => {
                    path.pop();
                }
                Event::Text(text) => metadata.capture(&path, &text.unescape()?),
                Event::CData(data) => {
                    metadata.capture(&path, &String::from_utf8_lossy(&data.into_inner()));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(metadata)
    }

    fn capture(&mut self, path: &[Vec<u8>], text: &str) {
        let [.., parent, element] = path else {
            return;
        };
        let text = text.trim();
        if text.is_empty() || !DOCUMENT_ROOTS.iter().any(|root| *root == parent.as_slice()) {
            return;
        }

        match element.as_slice() {
            b"ID" => {
                self.invoice_number.get_or_insert_with(|| text.to_string());
            }
            b"Note" => {
                self.note.get_or_insert_with(|| text.to_string());
            }
            b"IssueDate" if self.issue_date.is_none() => match parse_api_date(text) {
                Ok(date) => self.issue_date = Some(date),
                Err(e) => debug!(error = %e, "ignoring unparseable IssueDate"),
            },
            _ => {}
        }
    }
}
