
use std::io;
use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use tempfile::TempDir;
use time::macros::date;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use peppol_reconcile::{FinalStatus, Match, ReportGenerator, ReportOutcome, StatusSubmission};
use test_utils::{
    INBOUND_SUPPLIER, OUTBOUND_SUPPLIER, SharedConsole, created_after_within, do_setup,
    inbound_json, invoice_xml, list, mount_get, outbound_json, start_server, status_json,
    test_client, test_config,
};

fn accept_all(_: &Match) -> FinalStatus {
    FinalStatus::Accepted
}

fn reject_all(_: &Match) -> FinalStatus {
    FinalStatus::Rejected
}

fn unwrap_report(outcome: ReportOutcome) -> peppol_reconcile::Report {
    match outcome {
        ReportOutcome::Completed(report) => report,
        ReportOutcome::NoDocuments => panic!("expected a completed run"),
    }
}

#[tokio::test]
async fn unresolved_document_gets_final_status_and_is_reported() -> Result<()> {
    do_setup();
    let server = start_server().await;
    let reports = TempDir::new()?;
    let config = test_config(&server, reports.path());
    let client = test_client(&config).await;

    Mock::given(method("GET"))
        .and(path("/peppol/inbound-documents"))
        .and(query_param("filter[supplierId]", INBOUND_SUPPLIER))
        .and(query_param("page[size]", "100"))
        .respond_with(list(vec![inbound_json("in-1", "T1", "2025-11-20T09:05:00Z")]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/peppol/documents"))
        .and(query_param("filter[supplierId]", OUTBOUND_SUPPLIER))
        .respond_with(list(vec![outbound_json("out-1", "T1", "2025-11-20")]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/peppol/inbound-documents/in-1"))
        .and(header("accept", "application/xml"))
        .respond_with(invoice_xml("INV-1", None, "November services"))
        .mount(&server)
        .await;

    // No statuses before the submission, the submitted one afterwards.
    Mock::given(method("GET"))
        .and(path("/peppol/inbound-documents/in-1/business-statuses"))
        .respond_with(list(vec![]))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_get(
        &server,
        "/peppol/inbound-documents/in-1/business-statuses",
        list(vec![status_json("s1", "accepted", "acknowledged", "2025-11-21T10:00:00Z")]),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/peppol/inbound-documents/in-1/business-statuses"))
        .and(header("content-type", "application/vnd.api+json"))
        .and(body_json(json!({
            "data": {"type": "business-statuses", "attributes": {"code": "accepted"}}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": status_json("s1", "accepted", "acknowledged", "2025-11-21T10:00:00Z")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = ReportGenerator::new(&client, &config)
        .with_decider(accept_all)
        .with_console(io::sink())
        .run()
        .await?;
    let report = unwrap_report(outcome);

    assert_eq!(report.matches, 1);
    assert_eq!(
        report.submissions,
        [(
            "in-1".to_string(),
            StatusSubmission::Sent {
                code: "accepted".into(),
                technical_status: Some("acknowledged".into()),
            }
        )]
    );

    let text = &report.text;
    assert!(text.contains("[1] Invoice INV-1\n"), "{text}");
    assert!(text.contains("Transmission ID:   T1\n"), "{text}");
    assert!(text.contains("Issue date:        2025-11-20 (outbound creation date)\n"), "{text}");
    assert!(text.contains("Partition:         before cutoff\n"), "{text}");
    assert!(text.contains("Note:              November services\n"), "{text}");
    assert!(text.contains("Business status:   accepted\n"), "{text}");
    assert!(text.contains("Technical status:  acknowledged\n"), "{text}");
    assert!(text.contains("Submission:        sent accepted (acknowledged)\n"), "{text}");

    let file_name = report.path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(file_name.starts_with("peppol-report-"), "{file_name}");
    assert!(file_name.ends_with(".txt"), "{file_name}");
    assert_eq!(report.path.parent(), Some(reports.path()));
    assert_eq!(std::fs::read_to_string(&report.path)?, report.text);

    Ok(())
}

#[tokio::test]
async fn rejected_transition_is_reported_not_fatal() -> Result<()> {
    do_setup();
    let server = start_server().await;
    let reports = TempDir::new()?;
    let config = test_config(&server, reports.path());
    let client = test_client(&config).await;

    mount_get(
        &server,
        "/peppol/inbound-documents",
        list(vec![inbound_json("in-1", "T1", "2025-11-20T09:05:00Z")]),
    )
    .await;
    mount_get(
        &server,
        "/peppol/documents",
        list(vec![outbound_json("out-1", "T1", "2025-11-20T09:00:00Z")]),
    )
    .await;
    mount_get(
        &server,
        "/peppol/inbound-documents/in-1",
        invoice_xml("42", Some("2025-11-19"), "Hardware"),
    )
    .await;
    mount_get(&server, "/peppol/inbound-documents/in-1/business-statuses", list(vec![])).await;

    Mock::given(method("POST"))
        .and(path("/peppol/inbound-documents/in-1/business-statuses"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "errors": [{
                "status": "403",
                "code": "status_final",
                "title": "Forbidden",
                "detail": "Document already has a final status, cannot transition"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let report = unwrap_report(
        ReportGenerator::new(&client, &config)
            .with_decider(reject_all)
            .with_console(io::sink())
            .run()
            .await?,
    );

    let (document_id, submission) = &report.submissions[0];
    assert_eq!(document_id, "in-1");
    assert_eq!(
        submission,
        &StatusSubmission::Failed {
            code: "rejected".into(),
            status: Some(403),
            message: "Document already has a final status, cannot transition".into(),
        }
    );
    assert!(report.text.contains(
        "Submission:        failed to send rejected: HTTP 403: Document already has a final status, cannot transition\n"
    ));
    assert!(report.text.contains("Statuses failed:    1\n"));
    assert!(report.text.contains("Business status:   -\n"));

    Ok(())
}

#[tokio::test]
async fn no_inbound_documents_ends_the_run() -> Result<()> {
    do_setup();
    let server = start_server().await;
    let reports = TempDir::new()?;
    let config = test_config(&server, reports.path());
    let client = test_client(&config).await;

    mount_get(&server, "/peppol/inbound-documents", list(vec![])).await;
    Mock::given(method("GET"))
        .and(path("/peppol/documents"))
        .respond_with(list(vec![]))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = ReportGenerator::new(&client, &config)
        .with_console(io::sink())
        .run()
        .await?;

    assert!(matches!(outcome, ReportOutcome::NoDocuments));
    assert_eq!(std::fs::read_dir(reports.path())?.count(), 0);

    Ok(())
}

#[tokio::test]
async fn documents_with_final_status_are_left_alone() -> Result<()> {
    do_setup();
    let server = start_server().await;
    let reports = TempDir::new()?;
    let config = test_config(&server, reports.path());
    let client = test_client(&config).await;

    mount_get(
        &server,
        "/peppol/inbound-documents",
        list(vec![
            inbound_json("in-1", "T1", "2025-11-20T09:05:00Z"),
            inbound_json("in-9", "T9", "2025-11-20T09:06:00Z"),
        ]),
    )
    .await;
    mount_get(
        &server,
        "/peppol/documents",
        list(vec![outbound_json("out-1", "T1", "2025-11-20T09:00:00Z")]),
    )
    .await;
    mount_get(
        &server,
        "/peppol/inbound-documents/in-1",
        invoice_xml("7", Some("2025-11-20"), "Paid"),
    )
    .await;
    // The rejection is older than the latest record but still closes the lifecycle.
    mount_get(
        &server,
        "/peppol/inbound-documents/in-1/business-statuses",
        list(vec![
            status_json("s2", "in_process", "delivered", "2025-11-22T08:00:00Z"),
            status_json("s1", "rejected", "acknowledged", "2025-11-21T08:00:00Z"),
        ]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/peppol/inbound-documents/in-1/business-statuses"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let report = unwrap_report(
        ReportGenerator::new(&client, &config)
            .with_decider(accept_all)
            .with_console(io::sink())
            .run()
            .await?,
    );

    assert_eq!(report.matches, 1);
    assert!(report.submissions.is_empty());
    assert!(report.text.contains("Business status:   in_process\n"));
    assert!(report.text.contains("Status records:    2\n"));
    assert!(report.text.contains("Submission:        none\n"));
    assert!(!report.text.contains("in-9"));

    Ok(())
}

#[tokio::test]
async fn per_document_failures_become_placeholders() -> Result<()> {
    do_setup();
    let server = start_server().await;
    let reports = TempDir::new()?;
    let config = test_config(&server, reports.path());
    let client = test_client(&config).await;

    mount_get(
        &server,
        "/peppol/inbound-documents",
        list(vec![inbound_json("in-1", "T1", "2025-11-20T09:05:00Z")]),
    )
    .await;
    mount_get(
        &server,
        "/peppol/documents",
        list(vec![outbound_json("out-1", "T1", "2025-11-20T09:00:00Z")]),
    )
    .await;
    mount_get(
        &server,
        "/peppol/inbound-documents/in-1",
        ResponseTemplate::new(200).set_body_raw("<Invoice><cbc:ID>1</Invoice>", "application/xml"),
    )
    .await;
    mount_get(
        &server,
        "/peppol/inbound-documents/in-1/business-statuses",
        ResponseTemplate::new(500).set_body_string("upstream unavailable"),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/peppol/inbound-documents/in-1/business-statuses"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let report = unwrap_report(
        ReportGenerator::new(&client, &config)
            .with_decider(accept_all)
            .with_console(io::sink())
            .run()
            .await?,
    );

    let text = &report.text;
    assert!(text.contains("[1] Invoice Error\n"), "{text}");
    assert!(text.contains("Issue date:        Error\n"), "{text}");
    assert!(text.contains("Note:              Error\n"), "{text}");
    assert!(text.contains("Business status:   -\n"), "{text}");
    assert!(text.contains("Technical status:  -\n"), "{text}");
    assert!(text.contains("Status error:      "), "{text}");
    assert!(report.submissions.is_empty());

    Ok(())
}

#[tokio::test]
async fn partitions_are_processed_in_date_order_and_sorted_by_number() -> Result<()> {
    do_setup();
    let server = start_server().await;
    let reports = TempDir::new()?;
    let config = test_config(&server, reports.path())
        .with_settle_delay(Duration::from_millis(150), Duration::from_millis(50))
        .with_cutoff_date(date!(2025 - 11 - 20));
    let client = test_client(&config).await;

    mount_get(
        &server,
        "/peppol/inbound-documents",
        list(vec![
            inbound_json("in-dec", "T2", "2025-12-02T09:05:00Z"),
            inbound_json("in-nov", "T1", "2025-11-20T09:05:00Z"),
            inbound_json("in-text", "T3", "2025-11-20T09:05:00Z"),
        ]),
    )
    .await;
    mount_get(
        &server,
        "/peppol/documents",
        list(vec![
            outbound_json("out-1", "T1", "2025-11-20T09:00:00Z"),
            outbound_json("out-2", "T2", "2025-12-02T09:00:00Z"),
            outbound_json("out-3", "T3", "2025-11-20T09:00:00Z"),
        ]),
    )
    .await;
    mount_get(
        &server,
        "/peppol/inbound-documents/in-dec",
        invoice_xml("10", Some("2025-12-01"), "December"),
    )
    .await;
    mount_get(
        &server,
        "/peppol/inbound-documents/in-nov",
        invoice_xml("9", Some("2025-11-30"), "November"),
    )
    .await;
    mount_get(
        &server,
        "/peppol/inbound-documents/in-text",
        invoice_xml("A-1", Some("2025-11-15"), "Credit"),
    )
    .await;
    for id in ["in-dec", "in-nov", "in-text"] {
        mount_get(
            &server,
            &format!("/peppol/inbound-documents/{id}/business-statuses"),
            list(vec![]),
        )
        .await;
        Mock::given(method("POST"))
            .and(path(format!("/peppol/inbound-documents/{id}/business-statuses")))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": status_json("s", "accepted", "acknowledged", "2025-12-03T10:00:00Z")
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let mut decided = Vec::new();
    let report = {
        let decider = |matched: &Match| {
            decided.push(matched.inbound.id.clone());
            FinalStatus::Accepted
        };
        unwrap_report(
            ReportGenerator::new(&client, &config)
                .with_decider(decider)
                .with_console(io::sink())
                .run()
                .await?,
        )
    };

    // Only in-text predates the cutoff; the rest keep their listing order.
    assert_eq!(decided, ["in-text", "in-dec", "in-nov"]);
    assert_eq!(report.submissions.len(), 3);

    let positions: Vec<_> = ["Invoice 9\n", "Invoice 10\n", "Invoice A-1\n"]
        .iter()
        .map(|heading| report.text.find(heading).unwrap())
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]), "{}", report.text);
    assert!(report.text.contains("Partition:         on or after cutoff\n"));
    assert!(report.text.contains("Cutoff date:        2025-11-20\n"), "{}", report.text);

    Ok(())
}

#[tokio::test]
async fn summary_table_flags_documents_needing_a_final_status() -> Result<()> {
    do_setup();
    let server = start_server().await;
    let reports = TempDir::new()?;
    let config = test_config(&server, reports.path());
    let client = test_client(&config).await;

    mount_get(
        &server,
        "/peppol/inbound-documents",
        list(vec![
            inbound_json("in-open", "T-open", "2025-11-20T09:05:00Z"),
            inbound_json("in-final", "T-final", "2025-11-20T09:06:00Z"),
            inbound_json("in-broken", "T-broken", "2025-11-20T09:07:00Z"),
        ]),
    )
    .await;
    mount_get(
        &server,
        "/peppol/documents",
        list(vec![
            outbound_json("out-open", "T-open", "2025-11-20T09:00:00Z"),
            outbound_json("out-final", "T-final", "2025-11-20T09:01:00Z"),
            outbound_json("out-broken", "T-broken", "2025-11-20T09:02:00Z"),
        ]),
    )
    .await;
    for (id, number) in [("in-open", "1"), ("in-final", "2"), ("in-broken", "3")] {
        mount_get(
            &server,
            &format!("/peppol/inbound-documents/{id}"),
            invoice_xml(number, Some("2025-11-20"), "Services"),
        )
        .await;
    }
    mount_get(
        &server,
        "/peppol/inbound-documents/in-open/business-statuses",
        list(vec![]),
    )
    .await;
    mount_get(
        &server,
        "/peppol/inbound-documents/in-final/business-statuses",
        list(vec![status_json("s1", "accepted", "acknowledged", "2025-11-21T10:00:00Z")]),
    )
    .await;
    mount_get(
        &server,
        "/peppol/inbound-documents/in-broken/business-statuses",
        ResponseTemplate::new(500),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/peppol/inbound-documents/in-open/business-statuses"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": status_json("s2", "accepted", "acknowledged", "2025-11-21T11:00:00Z")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let console = SharedConsole::default();
    let report = unwrap_report(
        ReportGenerator::new(&client, &config)
            .with_decider(accept_all)
            .with_console(console.clone())
            .run()
            .await?,
    );
    assert_eq!(report.matches, 3);

    let output = console.contents();
    let rows: Vec<Vec<&str>> = output
        .lines()
        .map(|line| line.split_whitespace().collect())
        .collect();
    assert_eq!(
        rows[0],
        ["Transmission", "ID", "Inbound", "Outbound", "Latest", "status", "Needs", "final"]
    );
    let row = |transmission_id: &str| {
        rows.iter()
            .find(|row| row.first() == Some(&transmission_id))
            .cloned()
            .unwrap_or_else(|| panic!("no row for {transmission_id} in\n{output}"))
    };
    assert_eq!(row("T-open"), ["T-open", "in-open", "out-open", "-", "(-)", "yes"]);
    assert_eq!(
        row("T-final"),
        ["T-final", "in-final", "out-final", "accepted", "(acknowledged)", "no"]
    );
    assert_eq!(row("T-broken"), ["T-broken", "in-broken", "out-broken", "-", "(-)", "unknown"]);

    // The full report follows the table on the console.
    assert!(output.ends_with(&report.text), "{output}");

    Ok(())
}

#[tokio::test]
async fn outbound_documents_are_fetched_from_six_days_back() -> Result<()> {
    do_setup();
    let server = start_server().await;
    let reports = TempDir::new()?;
    let config = test_config(&server, reports.path());
    let client = test_client(&config).await;

    mount_get(
        &server,
        "/peppol/inbound-documents",
        list(vec![inbound_json("in-1", "T1", "2025-11-20T09:05:00Z")]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/peppol/documents"))
        .and(query_param("filter[supplierId]", OUTBOUND_SUPPLIER))
        .and(created_after_within(time::Duration::days(6)))
        .respond_with(list(vec![outbound_json("out-1", "T1", "2025-11-20T09:00:00Z")]))
        .expect(2)
        .mount(&server)
        .await;
    mount_get(
        &server,
        "/peppol/inbound-documents/in-1",
        invoice_xml("1", Some("2025-11-20"), "Services"),
    )
    .await;
    mount_get(
        &server,
        "/peppol/inbound-documents/in-1/business-statuses",
        list(vec![status_json("s1", "rejected", "acknowledged", "2025-11-21T10:00:00Z")]),
    )
    .await;

    let report = unwrap_report(
        ReportGenerator::new(&client, &config)
            .with_decider(accept_all)
            .with_console(io::sink())
            .run()
            .await?,
    );

    assert_eq!(report.matches, 1);
    assert!(report.submissions.is_empty());

    Ok(())
}
