//! Integration tests for cursor pagination

use minisky::{
    Client, ClientConfig, ConfigMap, Error, FetchAllOptions, MemoryStore, Progress, XrpcRequest,
};
use minisky_client::test_utils::SharedBuffer;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LIST_FOLLOWERS: &str = "app.bsky.graph.getFollowers";

async fn client(config: ClientConfig) -> Client<MemoryStore> {
    let mut tokens = ConfigMap::new();
    tokens.insert("access_token".into(), json!("aaaa"));
    tokens.insert("refresh_token".into(), json!("rrrr"));

    Client::new(config.with_auto_manage_tokens(false), MemoryStore::with_config(tokens))
        .await
        .unwrap()
}

fn followers(ids: &[u32]) -> Vec<Value> {
    ids.iter().map(|id| json!({"did": format!("did:plc:{}", id), "n": id})).collect()
}

/// Mount three pages: no cursor -> c1 -> c2 -> end
async fn mount_three_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/xrpc/{}", LIST_FOLLOWERS)))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "subject": {"did": "did:plc:me"},
            "followers": followers(&[1, 2, 3]),
            "cursor": "c1",
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/xrpc/{}", LIST_FOLLOWERS)))
        .and(query_param("cursor", "c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "followers": followers(&[4, 5, 6]),
            "cursor": "c2",
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/xrpc/{}", LIST_FOLLOWERS)))
        .and(query_param("cursor", "c2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "followers": followers(&[7, 8]),
        })))
        .mount(server)
        .await;
}

fn numbers(records: &[Value]) -> Vec<u64> {
    records.iter().map(|r| r["n"].as_u64().unwrap()).collect()
}

fn request() -> XrpcRequest {
    XrpcRequest::query(LIST_FOLLOWERS).param("actor", "john.foo").param("limit", 3)
}

#[tokio::test]
async fn test_fetches_all_pages_in_order() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let client = client(ClientConfig::new(server.uri())).await;
    let records = client
        .fetch_all(request(), FetchAllOptions::new().field("followers"))
        .await
        .unwrap();

    assert_eq!(numbers(&records), vec![1, 2, 3, 4, 5, 6, 7, 8]);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].url.query(), Some("actor=john.foo&limit=3"));
    assert_eq!(requests[1].url.query(), Some("actor=john.foo&limit=3&cursor=c1"));
    assert_eq!(requests[2].url.query(), Some("actor=john.foo&limit=3&cursor=c2"));
}

#[tokio::test]
async fn test_break_when_stops_after_matching_page() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let client = client(ClientConfig::new(server.uri())).await;
    let records = client
        .fetch_all(
            request(),
            FetchAllOptions::new().field("followers").break_when(|r| r["n"] == 5),
        )
        .await
        .unwrap();

    assert_eq!(numbers(&records), vec![1, 2, 3, 4, 6]);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_break_when_filter_covers_whole_result() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let client = client(ClientConfig::new(server.uri())).await;

    // n == 2 is on page 1 so it stops there; 1 and 3 remain
    let records = client
        .fetch_all(
            request(),
            FetchAllOptions::new().field("followers").break_when(|r| r["n"] == 2),
        )
        .await
        .unwrap();

    assert_eq!(numbers(&records), vec![1, 3]);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_max_pages_limits_requests() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let client = client(ClientConfig::new(server.uri())).await;
    let records = client
        .fetch_all(
            request(),
            FetchAllOptions::new()
                .field("followers")
                .break_when(|_| false)
                .max_pages(2),
        )
        .await
        .unwrap();

    assert_eq!(numbers(&records), vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_empty_page_does_not_stop_pagination() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getAuthorFeed"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"feed": [], "cursor": "next"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getAuthorFeed"))
        .and(query_param("cursor", "next"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"feed": [{"n": 1}], "cursor": null})))
        .mount(&server)
        .await;

    let client = client(ClientConfig::new(server.uri())).await;
    let records = client
        .fetch_all(
            XrpcRequest::query("app.bsky.feed.getAuthorFeed"),
            FetchAllOptions::new().field("feed"),
        )
        .await
        .unwrap();

    assert_eq!(records, vec![json!({"n": 1})]);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_missing_field_lists_array_fields() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let client = client(ClientConfig::new(server.uri())).await;
    let err = client
        .fetch_all(request(), FetchAllOptions::new())
        .await
        .unwrap_err();

    match err {
        Error::FieldNotSet { fields } => assert_eq!(fields, vec!["followers"]),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_wrong_field_is_invalid_response() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let client = client(ClientConfig::new(server.uri())).await;
    let err = client
        .fetch_all(request(), FetchAllOptions::new().field("follows"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidResponse(_)));
}

#[tokio::test]
async fn test_error_discards_partial_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/xrpc/{}", LIST_FOLLOWERS)))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "followers": followers(&[1, 2]),
            "cursor": "c1",
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/xrpc/{}", LIST_FOLLOWERS)))
        .and(query_param("cursor", "c1"))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({"error": "UpstreamFailure"})))
        .mount(&server)
        .await;

    let client = client(ClientConfig::new(server.uri())).await;
    let err = client
        .fetch_all(request(), FetchAllOptions::new().field("followers"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ServerErrorResponse(_)));
    assert_eq!(err.response().unwrap().error_type(), Some("UpstreamFailure"));
}

#[tokio::test]
async fn test_post_request_is_rejected() {
    let server = MockServer::start().await;
    let client = client(ClientConfig::new(server.uri())).await;

    let err = client
        .fetch_all(
            XrpcRequest::procedure(LIST_FOLLOWERS),
            FetchAllOptions::new().field("followers"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

// =============================================================================
// Progress Output Tests
// =============================================================================

#[tokio::test]
async fn test_progress_printed_per_page() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let buffer = SharedBuffer::new();
    let client = client(ClientConfig::new(server.uri()))
        .await
        .with_progress_output(buffer.clone());

    client
        .fetch_all(request(), FetchAllOptions::new().field("followers").progress("*"))
        .await
        .unwrap();

    assert_eq!(buffer.contents(), "***");
}

#[tokio::test]
async fn test_default_progress_used_when_not_passed() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let buffer = SharedBuffer::new();
    let config = ClientConfig::new(server.uri()).with_default_progress(".");
    let client = client(config).await.with_progress_output(buffer.clone());

    client
        .fetch_all(request(), FetchAllOptions::new().field("followers"))
        .await
        .unwrap();

    assert_eq!(buffer.contents(), "...");
}

#[tokio::test]
async fn test_progress_off_overrides_default() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let buffer = SharedBuffer::new();
    let config = ClientConfig::new(server.uri()).with_default_progress(".");
    let client = client(config).await.with_progress_output(buffer.clone());

    client
        .fetch_all(request(), FetchAllOptions::new().field("followers").progress(Progress::Off))
        .await
        .unwrap();

    assert_eq!(buffer.contents(), "");
}

#[tokio::test]
async fn test_no_progress_without_default() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let buffer = SharedBuffer::new();
    let client = client(ClientConfig::new(server.uri()))
        .await
        .with_progress_output(buffer.clone());

    client
        .fetch_all(request(), FetchAllOptions::new().field("followers"))
        .await
        .unwrap();

    assert!(buffer.contents().is_empty());
}
