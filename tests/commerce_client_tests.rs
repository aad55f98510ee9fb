//! Integration tests for the e-commerce provider client.

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use catalog_sync::clients::commerce::{CommerceApi, CommerceClient};
use catalog_sync::settings::ApiCredentials;

fn client(server: &MockServer) -> CommerceClient {
    CommerceClient::with_base_url(
        ApiCredentials {
            domain: "store.example".to_string(),
            app_key: "test-key".to_string(),
            app_token: "test-token".to_string(),
        },
        server.uri(),
    )
}

#[tokio::test]
async fn credentials_are_sent_and_accepted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/private/credentials/validate"))
        .and(header("X-App-Key", "test-key"))
        .and(header("X-App-Token", "test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    assert!(client(&server).validate_credentials().await.unwrap());
}

#[tokio::test]
async fn rejected_credentials_validate_to_false() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/private/credentials/validate"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "unauthorized"})))
        .mount(&server)
        .await;

    assert!(!client(&server).validate_credentials().await.unwrap());
}

#[tokio::test]
async fn server_failure_during_validation_is_a_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/private/credentials/validate"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
        .mount(&server)
        .await;

    let err = client(&server).validate_credentials().await.unwrap_err();
    assert_eq!(err.status, Some(500));
    assert!(err.payload.is_some());
}

#[tokio::test]
async fn only_active_sellers_are_listed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/private/sellers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"id": "s1", "is_active": true},
                {"id": "s2", "is_active": false},
                {"id": "s3", "is_active": true}
            ]
        })))
        .mount(&server)
        .await;

    let sellers = client(&server).list_active_sellers().await.unwrap();
    assert_eq!(sellers, vec!["s1".to_string(), "s3".to_string()]);
}

#[tokio::test]
async fn product_listing_carries_page_and_seller_filter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/private/products"))
        .and(query_param("page", "2"))
        .and(query_param("page_size", "100"))
        .and(query_param("sellers", "s1,s2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [{
                "sku_id": 55,
                "seller_id": "s1",
                "title": "Shirt",
                "description": "Cotton",
                "availability": "in stock",
                "status": "active",
                "condition": "new",
                "price": "19.90 BRL",
                "link": "https://store.example/shirt",
                "image_link": "https://store.example/shirt.jpg",
                "brand": "Acme",
                "sale_price": null
            }],
            "has_more": true
        })))
        .mount(&server)
        .await;

    let sellers = vec!["s1".to_string(), "s2".to_string()];
    let page = client(&server)
        .list_products(Some(&sellers), 2, 100)
        .await
        .unwrap();

    assert!(page.has_more);
    assert_eq!(page.products.len(), 1);
    assert_eq!(page.products[0].remote_product_id(), "55#s1");
}
