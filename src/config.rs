//! Run configuration.
//!
//! A [`Config`] is assembled once, from the environment or programmatically, and passed by
//! reference to everything that needs it. Nothing mutates it afterwards.
//!
//! ## Environment Variables
//! - `PEPPOL_BASE_URL`: API base URL (required)
//! - `PEPPOL_TOKEN_URL`: OAuth2 token endpoint (required)
//! - `PEPPOL_CLIENT_ID` / `PEPPOL_CLIENT_SECRET`: client credentials (required)
//! - `PEPPOL_CERT_PATH`: PKCS#12 client certificate bundle for mutual TLS
//! - `PEPPOL_CERT_PASSPHRASE`: passphrase of the bundle
//! - `PEPPOL_OUTBOUND_SUPPLIER_ID`: participant whose sent documents are reconciled
//! - `PEPPOL_INBOUND_SUPPLIER_ID`: participant whose received documents are reconciled
//! - `PEPPOL_REPORT_DIR`: directory the text report is written to
//! - `PEPPOL_SETTLE_SECONDS`: wait after submitting statuses before re-fetching

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use time::{Date, macros::date};
use url::Url;

use crate::error::{Error, Result};
use crate::oauth::KeyPair;

pub const DEFAULT_OUTBOUND_SUPPLIER_ID: &str = "0208:0123456749";
pub const DEFAULT_INBOUND_SUPPLIER_ID: &str = "0208:0987654321";
pub const DEFAULT_REPORT_DIR: &str = "reports";
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(30);
pub const COUNTDOWN_INTERVAL: Duration = Duration::from_secs(5);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Only the first page of this size is ever requested.
pub const PAGE_SIZE: u32 = 100;
pub const LOOKBACK_DAYS: i64 = 6;
/// Invoices issued on or after this date fall into the second partition.
pub const CUTOFF_DATE: Date = date!(2025 - 12 - 01);

/// A PKCS#12 bundle presented to the API for mutual TLS.
#[derive(Clone)]
pub struct ClientCertificate {
    pub path: PathBuf,
    pub passphrase: String,
}

impl fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("path", &self.path)
            .field("passphrase", &"[redacted]")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    pub token_url: Url,
    pub key_pair: KeyPair,
    pub certificate: Option<ClientCertificate>,
    pub outbound_supplier_id: String,
    pub inbound_supplier_id: String,
    pub report_dir: PathBuf,
    pub settle_delay: Duration,
    pub countdown_interval: Duration,
    pub request_timeout: Duration,
    pub page_size: u32,
    pub lookback: time::Duration,
    pub cutoff_date: Date,
}

impl Config {
    /// Creates a configuration with the built-in defaults for everything but the endpoints and
    /// credentials.
    #[must_use]
    pub fn new(base_url: Url, token_url: Url, key_pair: KeyPair) -> Self {
        Self {
            base_url,
            token_url,
            key_pair,
            certificate: None,
            outbound_supplier_id: DEFAULT_OUTBOUND_SUPPLIER_ID.to_string(),
            inbound_supplier_id: DEFAULT_INBOUND_SUPPLIER_ID.to_string(),
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
            settle_delay: DEFAULT_SETTLE_DELAY,
            countdown_interval: COUNTDOWN_INTERVAL,
            request_timeout: REQUEST_TIMEOUT,
            page_size: PAGE_SIZE,
            lookback: time::Duration::days(LOOKBACK_DAYS),
            cutoff_date: CUTOFF_DATE,
        }
    }

    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through `lookup`, which resolves a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| Error::config(key, "not set"))
        };
        let parse_url = |key: &str| {
            let value = required(key)?;
            Url::parse(&value).map_err(|e| Error::config(key, e.to_string()))
        };

        let base_url = parse_url("PEPPOL_BASE_URL")?;
        let token_url = parse_url("PEPPOL_TOKEN_URL")?;
        let key_pair = KeyPair::new(
            required("PEPPOL_CLIENT_ID")?,
            Some(required("PEPPOL_CLIENT_SECRET")?),
        );

        let mut config = Self::new(base_url, token_url, key_pair);

        if let Some(path) = lookup("PEPPOL_CERT_PATH").filter(|p| !p.trim().is_empty()) {
            config.certificate = Some(ClientCertificate {
                path: PathBuf::from(path),
                passphrase: lookup("PEPPOL_CERT_PASSPHRASE").unwrap_or_default(),
            });
        }
        if let Some(id) = lookup("PEPPOL_OUTBOUND_SUPPLIER_ID") {
            config.outbound_supplier_id = id;
        }
        if let Some(id) = lookup("PEPPOL_INBOUND_SUPPLIER_ID") {
            config.inbound_supplier_id = id;
        }
        if let Some(dir) = lookup("PEPPOL_REPORT_DIR") {
            config.report_dir = PathBuf::from(dir);
        }
        if let Some(seconds) = lookup("PEPPOL_SETTLE_SECONDS") {
            let seconds = seconds
                .trim()
                .parse::<u64>()
                .map_err(|e| Error::config("PEPPOL_SETTLE_SECONDS", e.to_string()))?;
            config.settle_delay = Duration::from_secs(seconds);
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_certificate(mut self, certificate: ClientCertificate) -> Self {
        self.certificate = Some(certificate);
        self
    }

    #[must_use]
    pub fn with_suppliers(mut self, outbound: impl Into<String>, inbound: impl Into<String>) -> Self {
        self.outbound_supplier_id = outbound.into();
        self.inbound_supplier_id = inbound.into();
        self
    }

    #[must_use]
    pub fn with_report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = dir.into();
        self
    }

    /// Sets how long to wait for the backend to settle after submitting statuses.
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration, countdown_interval: Duration) -> Self {
        self.settle_delay = delay;
        self.countdown_interval = countdown_interval;
        self
    }

    #[must_use]
    pub fn with_cutoff_date(mut self, cutoff: Date) -> Self {
        self.cutoff_date = cutoff;
        self
    }
}
