//! End-to-end crawl flow: enqueue, stream the log, spot completion,
//! fetch the summary.

mod common;

use std::time::Duration;

use ragdeck::jobs::{JobAction, JobManager, LogChannel};
use tokio::sync::mpsc;

#[tokio::test]
async fn crawl_completion_line_triggers_a_deferred_summary_fetch() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("POST", "/api/admin/crawl")
        .with_body(r#"{"job_id": "J1"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/api/admin/jobs")
        .with_body(
            r#"{"jobs": [{"job_id": "J1", "job_type": "crawl", "status": "running",
                          "started_at": "2025-01-01T00:00:00Z"}]}"#,
        )
        .create_async()
        .await;
    server
        .mock("GET", "/api/admin/jobs/J1/log")
        .with_body(common::sse_body(&["[crawler] fetching https://x.com/"]).to_owned()
            + "data: Crawl job complete.\n\n")
        .create_async()
        .await;
    let summary_mock = server
        .mock("GET", "/api/admin/jobs/J1/summary")
        .with_body(r#"{"captured": 5, "errors": 0, "skipped": {"already_processed": 2}}"#)
        .create_async()
        .await;

    let client = common::admin_client_for(&server);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut jobs = JobManager::new(tx);

    let job_id = jobs.start_crawl(&client).await.unwrap();
    assert_eq!(job_id, "J1");
    assert_eq!(jobs.jobs.len(), 1, "the table refreshes on creation");
    assert_eq!(jobs.jobs[0].job_id, "J1");

    // Drain events until the deferred summary fires (~1 s after the
    // completion line) or we give up.
    let mut fetched = false;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !fetched {
        let event = tokio::time::timeout_at(deadline, rx.recv())
            .await
            .expect("timed out waiting for the summary trigger")
            .expect("event channel closed");
        if let Some(action) = jobs.handle_event(event) {
            match action {
                JobAction::FetchSummary(id) => {
                    jobs.fetch_summary(&client, &id).await.unwrap();
                    fetched = true;
                }
                JobAction::Banner(text) => panic!("unexpected banner: {text}"),
            }
        }
    }

    summary_mock.assert_async().await;
    let summary = jobs.summary.as_ref().expect("summary populated");
    assert_eq!(
        summary.pills(),
        vec![
            ("Captured".to_owned(), "5".to_owned()),
            ("Errors".to_owned(), "0".to_owned()),
            ("Skipped".to_owned(), "2".to_owned()),
        ]
    );

    let pane = jobs.pane(LogChannel::Crawl).expect("crawl pane exists");
    assert!(pane.lines.iter().any(|l| l.contains("fetching")));
    assert!(pane.lines.iter().any(|l| l.contains("Crawl job complete")));
}

#[tokio::test]
async fn delete_clears_active_references_and_refreshes_the_table() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("DELETE", "/api/admin/jobs/J1")
        .with_body("{}")
        .create_async()
        .await;
    server
        .mock("GET", "/api/admin/jobs")
        .with_body(r#"{"jobs": []}"#)
        .create_async()
        .await;

    let client = common::admin_client_for(&server);
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut jobs = JobManager::new(tx);
    jobs.current_crawl_job = Some("J1".to_owned());
    jobs.logs.open(&client, LogChannel::Crawl, "J1");

    jobs.delete_job(&client, "J1").await.unwrap();

    assert!(jobs.current_crawl_job.is_none());
    assert!(!jobs.logs.is_open(LogChannel::Crawl));
    assert!(jobs.jobs.is_empty());
}
