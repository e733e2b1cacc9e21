//! End-to-end reconciliation run.
//!
//! A run fetches both sides, matches them, sends a final status for every matched inbound
//! document that lacks one, waits for the backend to settle and then reports the resulting
//! state, once on the console and once as a text file.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;

use time::{Date, OffsetDateTime, macros::format_description};

use crate::client::Client;
use crate::config::Config;
use crate::decider::{RandomDecider, StatusDecider};
use crate::entities::{InboundDocument, InvoiceMetadata};
use crate::error::Result;
use crate::manager::{BusinessStatusManager, DocumentAnalysis, StatusSubmission};
use crate::matching::{self, InvoiceNumberKey, Match, Partition, TransmissionIndex};
use crate::utils::date_format::{format_date, format_datetime};

/// Printed for an invoice field whose XML could not be fetched or read.
pub const XML_ERROR: &str = "Error";
/// Printed for an invoice field that is absent from the XML.
pub const MISSING: &str = "-";

const RULE: &str =
    "================================================================================";

/// How a run ended. Both variants are successful runs.
#[derive(Debug)]
pub enum ReportOutcome {
    /// The inbound supplier has received nothing; no report was written.
    NoDocuments,
    Completed(Report),
}

#[derive(Debug)]
pub struct Report {
    pub path: PathBuf,
    pub text: String,
    pub matches: usize,
    pub submissions: Vec<(String, StatusSubmission)>,
}

/// Invoice fields of an inbound document as far as they could be read.
#[derive(Debug, Clone)]
pub enum InvoiceFields {
    Parsed(InvoiceMetadata),
    Unavailable(String),
}

impl InvoiceFields {
    fn field<'a>(&'a self, select: impl FnOnce(&'a InvoiceMetadata) -> Option<&'a str>) -> &'a str {
        match self {
            Self::Parsed(metadata) => select(metadata).unwrap_or(MISSING),
            Self::Unavailable(_) => XML_ERROR,
        }
    }

    #[must_use]
    pub fn invoice_number(&self) -> &str {
        self.field(|metadata| metadata.invoice_number.as_deref())
    }

    #[must_use]
    pub fn note(&self) -> &str {
        self.field(|metadata| metadata.note.as_deref())
    }

    #[must_use]
    pub fn issue_date(&self) -> Option<Date> {
        match self {
            Self::Parsed(metadata) => metadata.issue_date,
            Self::Unavailable(_) => None,
        }
    }
}

/// Everything printed about one match.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub matched: Match,
    pub invoice: InvoiceFields,
    pub analysis: DocumentAnalysis,
    pub submission: Option<StatusSubmission>,
    pub cutoff_date: Date,
}

impl ReportEntry {
    /// The invoice's issue date, or the outbound creation date when the XML has none.
    #[must_use]
    pub fn effective_issue_date(&self) -> Date {
        self.invoice
            .issue_date()
            .unwrap_or_else(|| self.matched.outbound.created_at.date())
    }

    #[must_use]
    pub fn partition(&self) -> Partition {
        Partition::classify(self.effective_issue_date(), self.cutoff_date)
    }

    fn sort_key(&self) -> InvoiceNumberKey {
        InvoiceNumberKey::parse(self.invoice.invoice_number())
    }
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Match { inbound, outbound } = &self.matched;

        writeln!(f, "Invoice {}", self.invoice.invoice_number())?;
        writeln!(f, "  Transmission ID:   {}", self.matched.transmission_id())?;
        writeln!(
            f,
            "  Inbound document:  {} (created {})",
            inbound.id,
            format_datetime(inbound.created_at)
        )?;
        writeln!(
            f,
            "  Outbound document: {} (created {}, status {})",
            outbound.id,
            format_datetime(outbound.created_at),
            outbound.status.as_deref().unwrap_or(MISSING)
        )?;
        match (&self.invoice, self.invoice.issue_date()) {
            (InvoiceFields::Unavailable(_), _) => writeln!(f, "  Issue date:        {XML_ERROR}")?,
            (_, Some(date)) => writeln!(f, "  Issue date:        {}", format_date(date))?,
            (_, None) => writeln!(
                f,
                "  Issue date:        {} (outbound creation date)",
                format_date(self.effective_issue_date())
            )?,
        }
        writeln!(f, "  Partition:         {}", self.partition())?;
        writeln!(f, "  Note:              {}", self.invoice.note())?;
        writeln!(f, "  Business status:   {}", self.analysis.latest.code)?;
        writeln!(f, "  Technical status:  {}", self.analysis.latest.technical_status)?;
        writeln!(f, "  Status records:    {}", self.analysis.statuses.len())?;
        if let Some(error) = &self.analysis.error {
            writeln!(f, "  Status error:      {error}")?;
        }
        if let InvoiceFields::Unavailable(error) = &self.invoice {
            writeln!(f, "  XML error:         {error}")?;
        }
        match &self.submission {
            Some(submission) => writeln!(f, "  Submission:        {submission}"),
            None => writeln!(f, "  Submission:        none"),
        }
    }
}

/// The text written to the console and to the report file.
struct ReportDocument<'a> {
    generated_at: OffsetDateTime,
    config: &'a Config,
    entries: &'a [ReportEntry],
}

impl fmt::Display for ReportDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sent = self
            .entries
            .iter()
            .filter(|entry| entry.submission.as_ref().is_some_and(StatusSubmission::is_sent))
            .count();
        let failed = self
            .entries
            .iter()
            .filter(|entry| entry.submission.as_ref().is_some_and(|s| !s.is_sent()))
            .count();

        writeln!(f, "{RULE}")?;
        writeln!(f, "Peppol reconciliation report")?;
        writeln!(f, "Generated:          {} UTC", format_datetime(self.generated_at))?;
        writeln!(f, "Outbound supplier:  {}", self.config.outbound_supplier_id)?;
        writeln!(f, "Inbound supplier:   {}", self.config.inbound_supplier_id)?;
        writeln!(f, "Cutoff date:        {}", format_date(self.config.cutoff_date))?;
        writeln!(f, "Matched documents:  {}", self.entries.len())?;
        writeln!(f, "Statuses sent:      {sent}")?;
        writeln!(f, "Statuses failed:    {failed}")?;
        writeln!(f, "{RULE}")?;

        for (position, entry) in self.entries.iter().enumerate() {
            writeln!(f)?;
            write!(f, "[{}] {entry}", position + 1)?;
        }
        Ok(())
    }
}

/// The status table printed before any status is sent.
struct SummaryTable<'a>(&'a [(Match, DocumentAnalysis)]);

impl fmt::Display for SummaryTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<24} {:<24} {:<24} {:<28} {}",
            "Transmission ID", "Inbound", "Outbound", "Latest status", "Needs final"
        )?;
        for (matched, analysis) in self.0 {
            writeln!(
                f,
                "{:<24} {:<24} {:<24} {:<28} {}",
                matched.transmission_id(),
                matched.inbound.id,
                matched.outbound.id,
                analysis.latest.to_string(),
                if analysis.error.is_some() {
                    "unknown"
                } else if analysis.needs_final_status {
                    "yes"
                } else {
                    "no"
                }
            )?;
        }
        Ok(())
    }
}

/// Drives one reconciliation run.
pub struct ReportGenerator<'a, D = RandomDecider> {
    client: &'a Client,
    config: &'a Config,
    decider: D,
    console: Box<dyn Write + Send + 'a>,
}

impl<'a> ReportGenerator<'a> {
    /// A generator choosing final statuses at random and printing to stdout.
    #[must_use]
    pub fn new(client: &'a Client, config: &'a Config) -> Self {
        Self {
            client,
            config,
            decider: RandomDecider,
            console: Box::new(io::stdout()),
        }
    }
}

impl<'a, D: StatusDecider> ReportGenerator<'a, D> {
    #[must_use]
    pub fn with_decider<E: StatusDecider>(self, decider: E) -> ReportGenerator<'a, E> {
        ReportGenerator {
            client: self.client,
            config: self.config,
            decider,
            console: self.console,
        }
    }

    /// Redirects the console output, e.g. to [`io::sink`].
    #[must_use]
    pub fn with_console(mut self, console: impl Write + Send + 'a) -> Self {
        self.console = Box::new(console);
        self
    }

    /// Runs the reconciliation.
    ///
    /// Failures to fetch the document lists are fatal. Per-document failures end up in the
    /// report instead.
    #[instrument(skip(self), fields(
        outbound = %self.config.outbound_supplier_id,
        inbound = %self.config.inbound_supplier_id
    ))]
    pub async fn run(&mut self) -> Result<ReportOutcome> {
        let inbound = self.fetch_inbound().await?;
        if inbound.is_empty() {
            info!("no inbound documents, nothing to reconcile");
            return Ok(ReportOutcome::NoDocuments);
        }

        let index = self.fetch_outbound_index().await?;
        let matches = matching::match_documents(&inbound, &index);
        info!(
            inbound = inbound.len(),
            outbound = index.len(),
            matches = matches.len(),
            "matched documents"
        );

        let manager = BusinessStatusManager::new(self.client);
        let mut analyses = Vec::with_capacity(matches.len());
        for matched in matches {
            let analysis = manager.analyze_document(&matched.inbound.id).await;
            analyses.push((matched, analysis));
        }
        writeln!(self.console, "{}", SummaryTable(&analyses))?;

        let submissions = self.submit_final_statuses(&analyses).await;

        let entries = self.collect_entries(&submissions).await?;
        let report = self.write_report(entries, submissions)?;
        Ok(ReportOutcome::Completed(report))
    }

    async fn fetch_inbound(&self) -> Result<Vec<InboundDocument>> {
        self.client
            .inbound_documents()
            .list(&self.config.inbound_supplier_id)
            .await
    }

    async fn fetch_outbound_index(&self) -> Result<TransmissionIndex> {
        let created_after = OffsetDateTime::now_utc() - self.config.lookback;
        let outbound = self
            .client
            .documents()
            .list(&self.config.outbound_supplier_id, created_after)
            .await?;
        Ok(matching::index_by_transmission_id(outbound))
    }

    /// Issue date used to partition a match; see [`ReportEntry::effective_issue_date`].
    async fn issue_date(&self, matched: &Match) -> Date {
        let fallback = matched.outbound.created_at.date();
        match self.client.inbound_documents().xml(&matched.inbound.id).await {
            Ok(xml) => match InvoiceMetadata::from_xml(&xml) {
                Ok(metadata) => metadata.issue_date.unwrap_or(fallback),
                Err(e) => {
                    warn!(document_id = %matched.inbound.id, error = %e, "unreadable invoice xml");
                    fallback
                }
            },
            Err(e) => {
                warn!(document_id = %matched.inbound.id, error = %e, "failed to fetch invoice xml");
                fallback
            }
        }
    }

    /// Sends a final status for every match that needs one, partition by partition.
    async fn submit_final_statuses(
        &mut self,
        analyses: &[(Match, DocumentAnalysis)],
    ) -> HashMap<String, StatusSubmission> {
        let mut partitions: HashMap<Partition, Vec<&Match>> = HashMap::new();
        for (matched, analysis) in analyses {
            if !analysis.needs_final_status {
                continue;
            }
            let partition = Partition::classify(self.issue_date(matched).await, self.config.cutoff_date);
            partitions.entry(partition).or_default().push(matched);
        }

        let manager = BusinessStatusManager::new(self.client);
        let mut submissions = HashMap::new();
        for partition in Partition::ALL {
            let Some(pending) = partitions.remove(&partition) else {
                continue;
            };
            info!(%partition, documents = pending.len(), "sending final statuses");

            for matched in pending {
                let code = self.decider.decide(matched);
                let submission = manager.send_status(&matched.inbound.id, code.as_str()).await;
                submissions.insert(matched.inbound.id.clone(), submission);
            }
            self.settle().await;
        }
        submissions
    }

    /// Waits for the configured settle delay, logging the remaining time every tick.
    async fn settle(&self) {
        let mut remaining = self.config.settle_delay;
        if remaining.is_zero() {
            return;
        }
        info!(seconds = remaining.as_secs(), "waiting for statuses to settle");

        while !remaining.is_zero() {
            let tick = if self.config.countdown_interval.is_zero() {
                remaining
            } else {
                remaining.min(self.config.countdown_interval)
            };
            tokio::time::sleep(tick).await;
            remaining = remaining.saturating_sub(tick);
            if !remaining.is_zero() {
                info!(seconds = remaining.as_secs(), "settling");
            }
        }
    }

    /// Re-fetches both sides and gathers the final state of every match.
    async fn collect_entries(
        &self,
        submissions: &HashMap<String, StatusSubmission>,
    ) -> Result<Vec<ReportEntry>> {
        let inbound = self.fetch_inbound().await?;
        let index = self.fetch_outbound_index().await?;
        let matches = matching::match_documents(&inbound, &index);

        let manager = BusinessStatusManager::new(self.client);
        let documents = self.client.inbound_documents();
        let mut entries = Vec::with_capacity(matches.len());
        for matched in matches {
            let document_id = matched.inbound.id.as_str();
            let (xml, analysis) = tokio::join!(
                documents.xml(document_id),
                manager.analyze_document(document_id),
            );

            let invoice = match xml.and_then(|xml| InvoiceMetadata::from_xml(&xml)) {
                Ok(metadata) => InvoiceFields::Parsed(metadata),
                Err(e) => {
                    warn!(document_id, error = %e, "invoice fields unavailable");
                    InvoiceFields::Unavailable(e.to_string())
                }
            };

            entries.push(ReportEntry {
                submission: submissions.get(document_id).cloned(),
                matched,
                invoice,
                analysis,
                cutoff_date: self.config.cutoff_date,
            });
        }

        entries.sort_by_cached_key(ReportEntry::sort_key);
        Ok(entries)
    }

    fn write_report(
        &mut self,
        entries: Vec<ReportEntry>,
        submissions: HashMap<String, StatusSubmission>,
    ) -> Result<Report> {
        let generated_at = OffsetDateTime::now_utc();
        let text = ReportDocument {
            generated_at,
            config: self.config,
            entries: &entries,
        }
        .to_string();

        write!(self.console, "{text}")?;
        self.console.flush()?;

        let stamp = generated_at
            .format(format_description!("[year][month][day]-[hour][minute][second]"))?;
        std::fs::create_dir_all(&self.config.report_dir)?;
        let path = self.config.report_dir.join(format!("peppol-report-{stamp}.txt"));
        std::fs::write(&path, &text)?;
        info!(path = %path.display(), "report written");

        let mut submissions: Vec<_> = submissions.into_iter().collect();
        submissions.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(Report {
            path,
            text,
            matches: entries.len(),
            submissions,
        })
    }
}
