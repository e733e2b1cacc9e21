use std::process::ExitCode;

use tracing::{error, info, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, prelude::*};

use peppol_reconcile::{Client, Config, ReportGenerator, ReportOutcome, error::Result, transport};

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();

    // Logs go to stderr, the report to stdout.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(ErrorLayer::default())
        .init();

    if let Err(e) = dotenv
        && !e.not_found()
    {
        warn!("Ignoring unreadable .env file: {}", e);
    }

    match run().await {
        Ok(ReportOutcome::NoDocuments) => {
            info!("Nothing to report");
            ExitCode::SUCCESS
        }
        Ok(ReportOutcome::Completed(report)) => {
            info!(
                "Reconciled {} matches, {} statuses submitted, report at {}",
                report.matches,
                report.submissions.len(),
                report.path.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Reconciliation failed: {}", e);
            eprintln!("{:?}", miette::Report::new(e));
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ReportOutcome> {
    let config = Config::from_env()?;
    let http = transport::build_http_client(&config)?;

    info!("Authenticating against {}", config.token_url);
    let client = Client::from_client_credentials(&config, http).await?;

    ReportGenerator::new(&client, &config).run().await
}
