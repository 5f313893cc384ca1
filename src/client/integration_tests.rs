//! Node client tests against a mock control API

use super::*;
use crate::types::NodeRole;
use wiremock::{
    matchers::{body_string_contains, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

/// Mock storage node serving the control API
struct MockNode {
    server: MockServer,
}

impl MockNode {
    async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    fn target(&self, role: NodeRole) -> NodeTarget {
        let address = self.server.address();
        NodeTarget::new(address.ip().to_string(), role, address.port())
    }

    async fn mock_add(&self, pin: &str, body: &str) {
        Mock::given(method("POST"))
            .and(path("/api/v0/add"))
            .and(query_param("pin", pin))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    async fn mock_cat(&self, content_id: &str, bytes: usize) {
        Mock::given(method("POST"))
            .and(path("/api/v0/cat"))
            .and(query_param("arg", content_id))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xAB; bytes]))
            .mount(&self.server)
            .await;
    }

    async fn mock_gc(&self, status: u16, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/api/v0/repo/gc"))
            .respond_with(ResponseTemplate::new(status).set_body_string("{\"Key\":\"QmOld\"}\n"))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    async fn mock_unpin(&self, content_id: &str, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/api/v0/pin/rm"))
            .and(query_param("arg", content_id))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"Pins\":[]}"))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }
}

fn client(timeout: Duration) -> NodeClient {
    let settings = ClientSettings {
        timeout,
        reclaim_timeout: timeout,
        reclaim_all_timeout: timeout,
    };
    NodeClient::new(settings, Logger::quiet("NODE")).unwrap()
}

#[tokio::test]
async fn test_write_returns_last_hash() {
    let node = MockNode::start().await;
    node.mock_add(
        "false",
        "{\"Name\":\"\",\"Bytes\":5}\n{\"Name\":\"random.dat\",\"Hash\":\"QmWritten\",\"Size\":\"16\"}\n",
    )
    .await;

    let call = client(Duration::from_secs(5))
        .write(&node.target(NodeRole::Upload), b"hello world".to_vec(), WriteMode::Unpinned)
        .await;

    assert_eq!(call.outcome.unwrap(), "QmWritten");
    assert!(call.elapsed > Duration::ZERO);
}

#[tokio::test]
async fn test_write_sends_multipart_file_field() {
    let node = MockNode::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/add"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"random.dat\""))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"Hash\":\"QmForm\"}"))
        .expect(1)
        .mount(&node.server)
        .await;

    let call = client(Duration::from_secs(5))
        .write(&node.target(NodeRole::Upload), b"plain ascii payload".to_vec(), WriteMode::Unpinned)
        .await;
    assert_eq!(call.outcome.unwrap(), "QmForm");
}

#[tokio::test]
async fn test_pinned_write_requests_pinning() {
    let node = MockNode::start().await;
    node.mock_add("true", "{\"Hash\":\"QmPinned\"}").await;

    let call = client(Duration::from_secs(5))
        .write(&node.target(NodeRole::Upload), vec![1, 2, 3], WriteMode::Pinned)
        .await;
    assert_eq!(call.outcome.unwrap(), "QmPinned");
}

#[tokio::test]
async fn test_write_without_identifier_is_protocol_error() {
    let node = MockNode::start().await;
    node.mock_add("false", "{\"Name\":\"random.dat\",\"Bytes\":3}\n").await;

    let call = client(Duration::from_secs(5))
        .write(&node.target(NodeRole::Upload), vec![1, 2, 3], WriteMode::Unpinned)
        .await;
    assert_eq!(call.outcome.unwrap_err().category(), "PROTOCOL");
}

#[tokio::test]
async fn test_write_error_status_is_protocol_error() {
    let node = MockNode::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/add"))
        .respond_with(ResponseTemplate::new(500).set_body_string("repo locked"))
        .mount(&node.server)
        .await;

    let call = client(Duration::from_secs(5))
        .write(&node.target(NodeRole::Upload), vec![1], WriteMode::Unpinned)
        .await;
    let error = call.outcome.unwrap_err();
    assert_eq!(error.category(), "PROTOCOL");
    assert!(error.to_string().contains("HTTP 500"));
    assert!(error.to_string().contains("repo locked"));
}

#[tokio::test]
async fn test_read_counts_bytes() {
    let node = MockNode::start().await;
    node.mock_cat("QmRead", 64 * 1024).await;

    let call = client(Duration::from_secs(5))
        .read(&node.target(NodeRole::Download), "QmRead", 64 * 1024)
        .await;
    assert_eq!(call.outcome.unwrap(), 64 * 1024);
}

#[tokio::test]
async fn test_short_read_is_size_mismatch() {
    let node = MockNode::start().await;
    node.mock_cat("QmShort", 1000).await;

    let call = client(Duration::from_secs(5))
        .read(&node.target(NodeRole::Download), "QmShort", 1024)
        .await;
    match call.outcome {
        Err(AppError::SizeMismatch { expected, actual }) => {
            assert_eq!(expected, 1024);
            assert_eq!(actual, 1000);
        }
        other => panic!("expected size mismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_long_read_is_size_mismatch() {
    let node = MockNode::start().await;
    node.mock_cat("QmLong", 2048).await;

    let call = client(Duration::from_secs(5))
        .read(&node.target(NodeRole::Download), "QmLong", 1024)
        .await;
    assert_eq!(call.outcome.unwrap_err().category(), "SIZE");
}

#[tokio::test]
async fn test_read_missing_content_is_protocol_error() {
    let node = MockNode::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/cat"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&node.server)
        .await;

    let call = client(Duration::from_secs(5))
        .read(&node.target(NodeRole::Download), "QmMissing", 10)
        .await;
    assert_eq!(call.outcome.unwrap_err().category(), "PROTOCOL");
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let node = MockNode::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/cat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0; 10])
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&node.server)
        .await;

    let call = client(Duration::from_millis(200))
        .read(&node.target(NodeRole::Download), "QmSlow", 10)
        .await;
    assert_eq!(call.outcome.unwrap_err().category(), "TRANSPORT");
    assert!(call.elapsed < Duration::from_secs(5));
}

#[tokio::test]
async fn test_unreachable_node_is_transport_error() {
    // Bind then release a port so nothing is listening on it
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let target = NodeTarget::new("127.0.0.1", NodeRole::Upload, port);

    let call = client(Duration::from_secs(2))
        .write(&target, vec![1, 2, 3], WriteMode::Unpinned)
        .await;
    assert_eq!(call.outcome.unwrap_err().category(), "TRANSPORT");
}

#[tokio::test]
async fn test_unpinned_reclaim_only_collects_garbage() {
    let node = MockNode::start().await;
    node.mock_unpin("QmGone", 0).await;
    node.mock_gc(200, 1).await;

    client(Duration::from_secs(5))
        .reclaim(&node.target(NodeRole::Upload), "QmGone", WriteMode::Unpinned)
        .await;
}

#[tokio::test]
async fn test_pinned_reclaim_unpins_then_collects() {
    let node = MockNode::start().await;
    node.mock_unpin("QmPinned", 1).await;
    node.mock_gc(200, 1).await;

    client(Duration::from_secs(5))
        .try_reclaim(&node.target(NodeRole::Upload), "QmPinned", WriteMode::Pinned)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reclaim_failure_is_reported_not_raised() {
    let node = MockNode::start().await;
    node.mock_gc(500, 2).await;
    let client = client(Duration::from_secs(5));
    let target = node.target(NodeRole::Download);

    let error = client
        .try_reclaim(&target, "QmAny", WriteMode::Unpinned)
        .await
        .unwrap_err();
    assert_eq!(error.category(), "RECLAIM");

    // The trait method swallows the same failure
    client.reclaim(&target, "QmAny", WriteMode::Unpinned).await;
}

#[tokio::test]
async fn test_reclaim_all_sweeps_node() {
    let node = MockNode::start().await;
    node.mock_gc(200, 1).await;

    client(Duration::from_secs(5))
        .reclaim_all(&node.target(NodeRole::Peer))
        .await;
}
