//! HTTPS client construction.
//!
//! The Peppol access point authenticates callers with a client certificate. Its server
//! certificate is not validated.

use reqwest::{Identity, redirect};

use crate::config::{ClientCertificate, Config};
use crate::error::{Error, Result};

/// Builds the HTTP client shared by the token exchange and every API call.
#[instrument(skip(config), fields(certificate = ?config.certificate.as_ref().map(|c| &c.path)))]
pub fn build_http_client(config: &Config) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .use_native_tls()
        .danger_accept_invalid_certs(true)
        .timeout(config.request_timeout)
        .redirect(redirect::Policy::none());

    match &config.certificate {
        Some(certificate) => builder = builder.identity(load_identity(certificate)?),
        None => debug!("no client certificate configured, mutual TLS disabled"),
    }

    warn!("server certificate validation is disabled");
    Ok(builder.build()?)
}

fn load_identity(certificate: &ClientCertificate) -> Result<Identity> {
    let bundle = std::fs::read(&certificate.path).map_err(|source| Error::Certificate {
        path: certificate.path.clone(),
        source,
    })?;
    Ok(Identity::from_pkcs12_der(&bundle, &certificate.passphrase)?)
}
