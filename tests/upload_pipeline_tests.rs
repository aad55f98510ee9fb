//! Integration tests for the batch fetcher and the upload pipeline against
//! a mock catalog provider.

mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use catalog_sync::clients::catalog::GraphCatalogClient;
use catalog_sync::clients::incident::HttpIncidentNotifier;
use catalog_sync::lock::{LockService, upload_lock_key};
use catalog_sync::models::upload_product::UploadStatus;
use catalog_sync::repositories::{UploadLogRepository, UploadProductRepository};
use catalog_sync::uploader::{
    FeedUploader, ProductBatchFetcher, ProductUploader, UploadErrorKind,
};
use test_utils::{
    insert_catalog, insert_channel_app, insert_commerce_app, insert_pending_product, setup_test_db,
};

const FEED_ID: &str = "feed-1";

/// Mounts the endpoints for a feed upload that completes on the first poll.
async fn mock_successful_upload(server: &MockServer, upload_id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/{FEED_ID}/uploads")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/{FEED_ID}/uploads")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": upload_id})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/{upload_id}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": upload_id, "end_time": "2025-11-20T12:00:00+0000"})),
        )
        .mount(server)
        .await;
}

fn feed_uploader(server: &MockServer, max_poll_attempts: u32) -> FeedUploader {
    FeedUploader::new(
        Arc::new(GraphCatalogClient::new(server.uri(), "test-token")),
        Duration::from_millis(1),
        max_poll_attempts,
    )
}

#[tokio::test]
async fn batch_fetcher_visits_every_row_exactly_once() {
    let db = setup_test_db().await.unwrap();
    let app = insert_channel_app(&db, json!({}), None).await.unwrap();
    let catalog = insert_catalog(&db, app.id, "101", None).await.unwrap();

    for i in 0..5 {
        insert_pending_product(&db, catalog.id, &format!("{}#1", 100 + i), i)
            .await
            .unwrap();
    }

    let repo = UploadProductRepository::new(db.clone());
    let mut fetcher = ProductBatchFetcher::new(repo.clone(), catalog.id, 2);

    let mut seen = Vec::new();
    while let Some((rows, remote_ids)) = fetcher.next().await.unwrap() {
        assert_eq!(rows.len(), remote_ids.len());
        seen.extend(remote_ids);
    }

    assert_eq!(seen.len(), 5, "every row visited");
    let mut deduped = seen.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), 5, "no row visited twice");

    // Oldest-first ordering within the pass
    assert_eq!(seen[0], "100#1");

    // All rows are claimed; the fetcher stays exhausted
    assert_eq!(
        repo.count_with_status(catalog.id, UploadStatus::Processing)
            .await
            .unwrap(),
        5
    );
    assert!(fetcher.next().await.unwrap().is_none());
}

#[tokio::test]
async fn feed_upload_times_out_after_poll_budget() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/{FEED_ID}/uploads")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/{FEED_ID}/uploads")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "up-1"})))
        .mount(&server)
        .await;
    // Never completes
    Mock::given(method("GET"))
        .and(path("/up-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "up-1"})))
        .mount(&server)
        .await;

    let err = feed_uploader(&server, 3)
        .upload(FEED_ID, "update_test", b"header".to_vec())
        .await
        .unwrap_err();

    assert!(matches!(err.kind, UploadErrorKind::TimedOut));
    assert_eq!(err.upload_id.as_deref(), Some("up-1"));
}

#[tokio::test]
async fn feed_upload_without_session_id_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/{FEED_ID}/uploads")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/{FEED_ID}/uploads")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let err = feed_uploader(&server, 3)
        .upload(FEED_ID, "update_test", b"header".to_vec())
        .await
        .unwrap_err();

    assert!(matches!(err.kind, UploadErrorKind::Rejected { .. }));
    assert!(err.upload_id.is_none());
}

#[tokio::test]
async fn feed_upload_waits_out_an_upload_already_in_flight() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/{FEED_ID}/uploads")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": "prior-upload"}]})),
        )
        .mount(&server)
        .await;
    // The prior upload completes on the first poll
    Mock::given(method("GET"))
        .and(path("/prior-upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"id": "prior-upload", "end_time": "2025-11-20T12:00:00+0000"}),
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/{FEED_ID}/uploads")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "up-2"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/up-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"id": "up-2", "end_time": "2025-11-20T12:05:00+0000"}),
        ))
        .mount(&server)
        .await;

    let upload_id = feed_uploader(&server, 3)
        .upload(FEED_ID, "update_test", b"header".to_vec())
        .await
        .unwrap();

    assert_eq!(upload_id, "up-2");
}

#[tokio::test]
async fn successful_run_marks_rows_and_appends_audit_logs() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;

    let channel_app = insert_channel_app(&db, json!({}), None).await.unwrap();
    let commerce_app = insert_commerce_app(&db, json!({})).await.unwrap();
    let catalog = insert_catalog(&db, channel_app.id, "101", Some(commerce_app.id))
        .await
        .unwrap();

    insert_pending_product(&db, catalog.id, "55#7", 0).await.unwrap();
    insert_pending_product(&db, catalog.id, "56#7", 1).await.unwrap();

    mock_successful_upload(&server, "up-1").await;

    let products = UploadProductRepository::new(db.clone());
    let logs = UploadLogRepository::new(db.clone());
    let lock = LockService::with_holder(db.clone(), "worker-a");
    let key = upload_lock_key(commerce_app.id);
    assert!(lock.acquire(&key, 3600, None).await.unwrap());

    let uploader = ProductUploader::new(
        catalog.clone(),
        commerce_app.id,
        FEED_ID.to_string(),
        30_000,
        products.clone(),
        logs.clone(),
        feed_uploader(&server, 3),
        Arc::new(HttpIncidentNotifier::new(server.uri())),
        lock.clone(),
    );

    let stats = uploader.process_and_upload(&key, 3600).await.unwrap();

    assert_eq!(stats.batches, 1);
    assert_eq!(stats.uploaded, 2);
    assert_eq!(stats.failed, 0);
    assert_eq!(
        products
            .count_with_status(catalog.id, UploadStatus::Success)
            .await
            .unwrap(),
        2
    );
    assert_eq!(logs.count_for_app(commerce_app.id).await.unwrap(), 2);
}

#[tokio::test]
async fn failed_batch_marks_error_and_later_batches_proceed() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;

    let channel_app = insert_channel_app(&db, json!({}), None).await.unwrap();
    let commerce_app = insert_commerce_app(&db, json!({})).await.unwrap();
    let catalog = insert_catalog(&db, channel_app.id, "101", Some(commerce_app.id))
        .await
        .unwrap();

    insert_pending_product(&db, catalog.id, "p1#1", 0).await.unwrap();
    insert_pending_product(&db, catalog.id, "p2#1", 1).await.unwrap();

    // Every submission is refused by the provider
    Mock::given(method("GET"))
        .and(path(format!("/{FEED_ID}/uploads")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/{FEED_ID}/uploads")))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": {"message": "invalid feed"}})),
        )
        .mount(&server)
        .await;
    // Incident notifications are accepted
    Mock::given(method("POST"))
        .and(path("/api/v1/incidents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let products = UploadProductRepository::new(db.clone());
    let lock = LockService::with_holder(db.clone(), "worker-a");
    let key = upload_lock_key(commerce_app.id);
    assert!(lock.acquire(&key, 3600, None).await.unwrap());

    // Batch size 1: the two rows go through two independent batches
    let uploader = ProductUploader::new(
        catalog.clone(),
        commerce_app.id,
        FEED_ID.to_string(),
        1,
        products.clone(),
        UploadLogRepository::new(db.clone()),
        feed_uploader(&server, 2),
        Arc::new(HttpIncidentNotifier::new(server.uri())),
        lock.clone(),
    );

    let stats = uploader.process_and_upload(&key, 3600).await.unwrap();

    assert_eq!(stats.batches, 2, "second batch runs despite first failing");
    assert_eq!(stats.failed, 2);
    assert_eq!(
        products
            .count_with_status(catalog.id, UploadStatus::Error)
            .await
            .unwrap(),
        2
    );
    assert_eq!(
        products
            .count_with_status(catalog.id, UploadStatus::Processing)
            .await
            .unwrap(),
        0,
        "no row is left stuck in processing"
    );
}

#[tokio::test]
async fn incident_notification_failure_does_not_change_the_outcome() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;

    let channel_app = insert_channel_app(&db, json!({}), None).await.unwrap();
    let commerce_app = insert_commerce_app(&db, json!({})).await.unwrap();
    let catalog = insert_catalog(&db, channel_app.id, "101", Some(commerce_app.id))
        .await
        .unwrap();

    insert_pending_product(&db, catalog.id, "p1#1", 0).await.unwrap();

    Mock::given(method("GET"))
        .and(path(format!("/{FEED_ID}/uploads")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/{FEED_ID}/uploads")))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "down"})))
        .mount(&server)
        .await;
    // Incident endpoint is down too; the failure must stay contained
    Mock::given(method("POST"))
        .and(path("/api/v1/incidents"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "down"})))
        .mount(&server)
        .await;

    let products = UploadProductRepository::new(db.clone());
    let lock = LockService::with_holder(db.clone(), "worker-a");
    let key = upload_lock_key(commerce_app.id);
    assert!(lock.acquire(&key, 3600, None).await.unwrap());

    let uploader = ProductUploader::new(
        catalog.clone(),
        commerce_app.id,
        FEED_ID.to_string(),
        30_000,
        products.clone(),
        UploadLogRepository::new(db.clone()),
        feed_uploader(&server, 2),
        Arc::new(HttpIncidentNotifier::new(server.uri())),
        lock.clone(),
    );

    let stats = uploader.process_and_upload(&key, 3600).await.unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(
        products
            .count_with_status(catalog.id, UploadStatus::Error)
            .await
            .unwrap(),
        1
    );
}
