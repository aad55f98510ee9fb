//! Integration tests for catalog reconciliation against a mock provider.

mod test_utils;

use std::sync::Arc;

use sea_orm::EntityTrait;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use catalog_sync::clients::catalog::GraphCatalogClient;
use catalog_sync::clients::channel::ChannelClient;
use catalog_sync::lock::{LockService, SYNC_CATALOGS_LOCK_KEY};
use catalog_sync::models::Catalog;
use catalog_sync::reconciler::CatalogReconciler;
use catalog_sync::repositories::{AppRepository, CatalogRepository};
use test_utils::{channel_config, insert_catalog, insert_channel_app, setup_test_db};

fn reconciler(
    db: Arc<sea_orm::DatabaseConnection>,
    api_base: &str,
    channel_base: &str,
) -> CatalogReconciler {
    CatalogReconciler::new(
        AppRepository::new(db.clone()),
        CatalogRepository::new(db.clone()),
        Arc::new(GraphCatalogClient::new(api_base, "test-token")),
        Arc::new(ChannelClient::new(channel_base)),
        LockService::new(db),
        60,
    )
}

async fn mock_listing(server: &MockServer, business_id: &str, catalogs: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/{business_id}/owned_product_catalogs")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": catalogs })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn creates_missing_catalog_and_notifies_downstream() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;

    let notify_id = Uuid::new_v4();
    let app = insert_channel_app(&db, channel_config("1001", "2002"), Some(notify_id))
        .await
        .unwrap();

    mock_listing(&server, "1001", json!([{"id": "101", "name": "Store"}])).await;
    Mock::given(method("GET"))
        .and(path("/101"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "101",
            "name": "Store",
            "vertical": "commerce"
        })))
        .mount(&server)
        .await;
    let notify_mock = Mock::given(method("POST"))
        .and(path(format!("/api/v1/catalogs/{notify_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .named("downstream catalog push")
        .mount_as_scoped(&server)
        .await;

    let sut = reconciler(db.clone(), &server.uri(), &server.uri());
    let stats = sut.run().await.unwrap();

    assert_eq!(stats.apps_processed, 1);
    assert_eq!(stats.catalogs_created, 1);
    assert_eq!(stats.catalogs_deleted, 0);

    let catalogs = CatalogRepository::new(db.clone());
    let created = catalogs
        .find_by_remote_id(app.id, "101")
        .await
        .unwrap()
        .expect("catalog created");
    assert_eq!(created.name, "Store");
    assert_eq!(created.category.as_deref(), Some("commerce"));

    drop(notify_mock);
}

#[tokio::test]
async fn deletes_catalogs_that_vanished_remotely() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;

    let app = insert_channel_app(&db, channel_config("1001", "2002"), None)
        .await
        .unwrap();
    insert_catalog(&db, app.id, "101", None).await.unwrap();
    insert_catalog(&db, app.id, "999", None).await.unwrap();

    mock_listing(&server, "1001", json!([{"id": "101", "name": "Store"}])).await;

    let sut = reconciler(db.clone(), &server.uri(), &server.uri());
    let stats = sut.run().await.unwrap();

    assert_eq!(stats.catalogs_created, 0);
    assert_eq!(stats.catalogs_deleted, 1);

    let remaining = Catalog::find().all(db.as_ref()).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].remote_id, "101");
}

#[tokio::test]
async fn second_run_with_no_remote_change_is_idempotent() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;

    insert_channel_app(&db, channel_config("1001", "2002"), None)
        .await
        .unwrap();

    mock_listing(
        &server,
        "1001",
        json!([{"id": "101", "name": "Store"}, {"id": "102", "name": "Outlet"}]),
    )
    .await;
    for id in ["101", "102"] {
        Mock::given(method("GET"))
            .and(path(format!("/{id}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": id, "name": format!("Catalog {id}")})),
            )
            .mount(&server)
            .await;
    }

    let sut = reconciler(db.clone(), &server.uri(), &server.uri());

    let first = sut.run().await.unwrap();
    assert_eq!(first.catalogs_created, 2);
    assert_eq!(first.catalogs_deleted, 0);

    let second = sut.run().await.unwrap();
    assert_eq!(second.catalogs_created, 0);
    assert_eq!(second.catalogs_deleted, 0);
}

#[tokio::test]
async fn app_without_identities_is_skipped() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;

    insert_channel_app(&db, json!({"wa_business_id": "1001"}), None)
        .await
        .unwrap();

    let sut = reconciler(db.clone(), &server.uri(), &server.uri());
    let stats = sut.run().await.unwrap();

    assert_eq!(stats.apps_processed, 0);
    assert_eq!(stats.apps_skipped, 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 0);
}

#[tokio::test]
async fn run_is_noop_while_another_pass_holds_the_lock() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;

    insert_channel_app(&db, channel_config("1001", "2002"), None)
        .await
        .unwrap();

    let other = LockService::with_holder(db.clone(), "other-worker");
    assert!(other.acquire(SYNC_CATALOGS_LOCK_KEY, 60, None).await.unwrap());

    let sut = reconciler(db.clone(), &server.uri(), &server.uri());
    let stats = sut.run().await.unwrap();

    assert_eq!(stats, Default::default());
    assert_eq!(server.received_requests().await.unwrap().len(), 0);
}

#[tokio::test]
async fn listing_failure_for_one_app_does_not_abort_the_pass() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;

    insert_channel_app(&db, channel_config("bad-biz", "2002"), None)
        .await
        .unwrap();
    insert_channel_app(&db, channel_config("1001", "2002"), None)
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/bad-biz/owned_product_catalogs"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
        .mount(&server)
        .await;
    mock_listing(&server, "1001", json!([{"id": "101", "name": "Store"}])).await;
    Mock::given(method("GET"))
        .and(path("/101"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "101", "name": "Store"})))
        .mount(&server)
        .await;

    let sut = reconciler(db.clone(), &server.uri(), &server.uri());
    let stats = sut.run().await.unwrap();

    assert_eq!(stats.apps_with_errors, 1);
    assert_eq!(stats.apps_processed, 1);
    assert_eq!(stats.catalogs_created, 1);
}
