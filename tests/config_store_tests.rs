//! Crawl config store loading and per-row persistence against a mock
//! backend.

mod common;

use mockito::Matcher;
use ragdeck::core::store::{CrawlConfigStore, EditKind, RowStatus};

async fn mock_admin_doc(
    server: &mut mockito::ServerGuard,
    path: &str,
    body: &str,
) -> mockito::Mock {
    server
        .mock("GET", path)
        .with_body(body.to_owned())
        .create_async()
        .await
}

#[tokio::test]
async fn load_all_populates_every_slice() {
    let mut server = mockito::Server::new_async().await;
    mock_admin_doc(&mut server, "/api/admin/config/allow_block", &common::allow_block_body()).await;
    mock_admin_doc(&mut server, "/api/admin/config/agents", r#"{"intent": "You classify."}"#).await;
    mock_admin_doc(
        &mut server,
        "/api/admin/config/crawler",
        r#"{"playwright": {"auth_profiles": {"campus": {"storage_state_path": "/tmp/s.json"}}}}"#,
    )
    .await;
    mock_admin_doc(
        &mut server,
        "/api/admin/candidates/recommendations",
        r#"{"items": [{"suggested_url": "https://y.com/", "count": 4}]}"#,
    )
    .await;
    mock_admin_doc(
        &mut server,
        "/api/admin/allowed-urls/auth-status",
        r#"{"playwright_available": true,
            "by_rule_id": {"r7": {"ui_status": "valid"}},
            "by_pattern": {}}"#,
    )
    .await;

    let client = common::admin_client_for(&server);
    let mut store = CrawlConfigStore::new();
    let failures = store.load_all(&client).await;

    assert!(failures.is_empty(), "{failures:?}");
    assert_eq!(store.seeds.len(), 1);
    assert_eq!(store.blocked, vec!["ads.example".to_owned()]);
    assert_eq!(store.allow_rules.len(), 1);
    assert_eq!(store.allow_rules[0].id.as_deref(), Some("r7"));
    assert_eq!(store.recommendations.len(), 1);
    assert!(store.overlay.playwright_available);
    assert_eq!(
        store.auth_icon(&store.allow_rules[0]),
        ragdeck::core::AuthIcon::Valid,
        "the overlay verdict drives the icon"
    );
    assert!(
        store
            .crawler
            .playwright
            .auth_profiles
            .contains_key("campus")
    );
}

#[tokio::test]
async fn overlay_failure_degrades_to_empty_without_invalidating_the_rest() {
    let mut server = mockito::Server::new_async().await;
    mock_admin_doc(&mut server, "/api/admin/config/allow_block", &common::allow_block_body()).await;
    mock_admin_doc(&mut server, "/api/admin/config/agents", "{}").await;
    mock_admin_doc(&mut server, "/api/admin/config/crawler", "{}").await;
    mock_admin_doc(&mut server, "/api/admin/candidates/recommendations", r#"{"items": []}"#).await;
    server
        .mock("GET", "/api/admin/allowed-urls/auth-status")
        .with_status(500)
        .create_async()
        .await;

    let client = common::admin_client_for(&server);
    let mut store = CrawlConfigStore::new();
    let failures = store.load_all(&client).await;

    assert!(failures.is_empty(), "overlay failure is not a load failure");
    assert_eq!(store.allow_rules.len(), 1, "rules survive the overlay outage");
    assert!(!store.overlay.playwright_available);
    assert!(store.overlay.by_rule_id.is_empty());
}

#[tokio::test]
async fn per_row_save_puts_the_normalized_payload_and_adopts_the_id() {
    let mut server = mockito::Server::new_async().await;

    let expected = serde_json::json!({
        "id": "r7",
        "pattern": "https://x.com/docs/",
        "match": "prefix",
        "types": {"web": true, "pdf": false, "docx": false, "xlsx": false, "pptx": false},
        "allow_http": false,
        "auth_profile": null
    });
    let put = server
        .mock("PUT", "/api/admin/allowed-urls/r7")
        .match_body(Matcher::Json(expected.clone()))
        .with_body(expected.to_string())
        .create_async()
        .await;

    let client = common::admin_client_for(&server);
    let mut store = CrawlConfigStore::new();
    store.allow_rules = vec![{
        let mut rule = ragdeck::core::AllowRule::new("https://x.com/");
        rule.id = Some("r7".to_owned());
        rule
    }];

    // Edit the pattern the way the row editor does: un-normalized input
    store.begin_edit(EditKind::Allow, 0);
    store.allow_draft.as_mut().unwrap().pattern = "https://x.com/docs".to_owned();

    store.save_allow_draft(&client, 0).await.unwrap();

    put.assert_async().await;
    assert_eq!(store.allow_rules[0].pattern, "https://x.com/docs/");
    assert!(matches!(store.row_status("r7"), Some(RowStatus::Saved)));
    assert!(store.allow_draft.is_none(), "the edit closes on success");
}

#[tokio::test]
async fn all_false_types_persist_as_web_only() {
    let mut server = mockito::Server::new_async().await;
    let post = server
        .mock("POST", "/api/admin/allowed-urls")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "types": {"web": true, "pdf": false, "docx": false, "xlsx": false, "pptx": false}
        })))
        .with_body(
            r#"{"id": "r9", "pattern": "https://y.com/", "match": "prefix",
                "types": {"web": true}, "allow_http": false}"#,
        )
        .create_async()
        .await;

    let client = common::admin_client_for(&server);
    let mut store = CrawlConfigStore::new();
    let mut rule = ragdeck::core::AllowRule::new("https://y.com/");
    rule.types = ragdeck::core::TypeFlags {
        web: false,
        pdf: false,
        docx: false,
        xlsx: false,
        pptx: false,
    };
    store.allow_rules.push(rule.clone());
    store.allow_draft = Some(rule);
    store.edit.allow = Some(0);

    store.save_allow_draft(&client, 0).await.unwrap();

    post.assert_async().await;
    assert_eq!(store.allow_rules[0].id.as_deref(), Some("r9"));
}

#[tokio::test]
async fn failed_save_records_a_sticky_error_cell() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("PUT", "/api/admin/allowed-urls/r7")
        .with_status(400)
        .with_body("pattern overlaps an existing rule")
        .create_async()
        .await;

    let client = common::admin_client_for(&server);
    let mut store = CrawlConfigStore::new();
    let mut rule = ragdeck::core::AllowRule::new("https://x.com/");
    rule.id = Some("r7".to_owned());
    store.allow_rules.push(rule);
    store.begin_edit(EditKind::Allow, 0);

    let err = store.save_allow_draft(&client, 0).await.unwrap_err();
    assert!(err.to_string().contains("overlaps"));
    match store.row_status("r7") {
        Some(RowStatus::Error(detail)) => {
            assert_eq!(detail, "pattern overlaps an existing rule");
        }
        other => panic!("expected a sticky error cell, got {other:?}"),
    }
    // Errors survive pruning
    store.prune_row_status();
    assert!(store.row_status("r7").is_some());
}

#[tokio::test]
async fn legacy_migration_rewrites_the_playwright_block() {
    let mut server = mockito::Server::new_async().await;
    let put = server
        .mock("PUT", "/api/admin/playwright-settings")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "auth_profiles": {
                "legacy_migrated": {"storage_state_path": "/tmp/state.json"}
            }
        })))
        .with_body("{}")
        .create_async()
        .await;

    let client = common::admin_client_for(&server);
    let mut store = CrawlConfigStore::new();
    store.crawler = serde_json::from_str(
        r#"{"playwright": {"storage_state_path": "/tmp/state.json",
                           "use_for_domains": ["x.com"]}}"#,
    )
    .unwrap();
    assert!(store.shows_legacy_banner());

    store.migrate_legacy_profile(&client).await.unwrap();

    put.assert_async().await;
    assert!(!store.shows_legacy_banner());
}
