//! # peppol-reconcile
//!
//! Reconciles the invoices one Peppol participant sent with the invoices another participant
//! received, and closes the business status lifecycle of the received ones.
//!
//! A run:
//!
//! 1. fetches the inbound documents of the receiving participant,
//! 2. fetches the outbound documents the sending participant created within the lookback window,
//! 3. pairs them by transmission ID,
//! 4. sends `accepted` or `rejected` for every received invoice that has no final status yet,
//! 5. waits for the backend to settle and writes a report of the resulting state.
//!
//! ```no_run
//! use peppol_reconcile::{Client, Config, ReportGenerator, transport};
//!
//! # async fn run() -> peppol_reconcile::error::Result<()> {
//! let config = Config::from_env()?;
//! let http = transport::build_http_client(&config)?;
//! let client = Client::from_client_credentials(&config, http).await?;
//! ReportGenerator::new(&client, &config).run().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Span traces
//!
//! Errors built from API responses carry a [`SpanTrace`]. Install
//! `tracing_error::ErrorLayer` in the subscriber to populate it.

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

#[macro_use]
extern crate tracing;

pub mod client;
pub mod config;
pub mod decider;
pub mod endpoints;
pub mod entities;
pub mod error;
pub mod manager;
pub mod matching;
pub mod oauth;
pub mod report;
pub mod status;
pub mod transport;
pub mod utils;

pub use client::Client;
pub use config::Config;
pub use decider::{RandomDecider, StatusDecider};
pub use endpoints::PeppolEndpoint;
pub use entities::*;
pub use error::Error;
pub use manager::{BusinessStatusManager, DocumentAnalysis, StatusSubmission};
pub use matching::{Match, Partition};
pub use oauth::KeyPair;
pub use report::{Report, ReportGenerator, ReportOutcome};
pub use status::StatusSnapshot;

// Re-export SpanTrace for users who want to access it
pub use tracing_error::SpanTrace;
