//! Storage node control API client

#[cfg(test)]
mod integration_tests;

use crate::{
    error::{AppError, Result},
    logging::Logger,
    models::config::{BenchConfig, NodeTarget},
    types::WriteMode,
};
use async_trait::async_trait;
use reqwest::{multipart, Client, Response, Url};
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Name the payload is uploaded under
pub const UPLOAD_FILE_NAME: &str = "random.dat";

/// Node control API seen by the trial runner
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Upload a payload; resolves to its content identifier
    async fn write(&self, node: &NodeTarget, payload: Vec<u8>, mode: WriteMode) -> NodeCall<String>;

    /// Fetch by identifier and verify the byte count; resolves to bytes read
    async fn read(&self, node: &NodeTarget, content_id: &str, expected_size: u64) -> NodeCall<u64>;

    /// Best-effort unpin and/or garbage-collect; failures are only logged
    async fn reclaim(&self, node: &NodeTarget, content_id: &str, mode: WriteMode);

    /// Best-effort full garbage-collect sweep with the longer timeout
    async fn reclaim_all(&self, node: &NodeTarget);
}

/// Outcome of one timed node call
#[derive(Debug)]
pub struct NodeCall<T> {
    /// Wall-clock time from request start to full response consumption
    pub elapsed: Duration,
    pub outcome: Result<T>,
}

impl<T> NodeCall<T> {
    pub fn new(elapsed: Duration, outcome: Result<T>) -> Self {
        Self { elapsed, outcome }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Per-call timeouts
#[derive(Debug, Clone, Copy)]
pub struct ClientSettings {
    /// Write and read calls
    pub timeout: Duration,
    /// Per-trial unpin and garbage-collect calls
    pub reclaim_timeout: Duration,
    /// Full garbage-collect sweep
    pub reclaim_all_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: crate::defaults::DEFAULT_TIMEOUT,
            reclaim_timeout: Duration::from_secs(10),
            reclaim_all_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientSettings {
    pub fn from_config(config: &BenchConfig) -> Self {
        Self {
            timeout: config.timeout(),
            reclaim_timeout: config.harness.reclaim_timeout(),
            reclaim_all_timeout: config.harness.reclaim_all_timeout(),
        }
    }
}

/// One line of the write endpoint's progress stream
#[derive(Debug, Deserialize)]
struct AddEvent {
    #[serde(rename = "Hash", default)]
    hash: Option<String>,
}

/// reqwest-backed node client
pub struct NodeClient {
    client: Client,
    settings: ClientSettings,
    logger: Logger,
}

impl NodeClient {
    pub fn new(settings: ClientSettings, logger: Logger) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("bandwidth-bench/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            settings,
            logger,
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn endpoint(node: &NodeTarget, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&node.base_url())?.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn post(&self, url: Url, timeout: Duration) -> Result<Response> {
        let response = self.client.post(url).timeout(timeout).send().await?;
        ensure_success(response).await
    }

    async fn try_write(&self, node: &NodeTarget, payload: Vec<u8>, mode: WriteMode) -> Result<String> {
        let pin = match mode {
            WriteMode::Unpinned => "false",
            WriteMode::Pinned => "true",
        };
        let url = Self::endpoint(node, "/api/v0/add", &[("pin", pin)])?;

        let part = multipart::Part::bytes(payload).file_name(UPLOAD_FILE_NAME);
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(url)
            .timeout(self.settings.timeout)
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body = response.text().await?;

        parse_content_id(&body)
    }

    async fn try_read(&self, node: &NodeTarget, content_id: &str, expected_size: u64) -> Result<u64> {
        let url = Self::endpoint(node, "/api/v0/cat", &[("arg", content_id)])?;
        let mut response = self.post(url, self.settings.timeout).await?;

        let mut total: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            total += chunk.len() as u64;
        }

        if total != expected_size {
            return Err(AppError::size_mismatch(expected_size, total));
        }
        Ok(total)
    }

    /// Unpin (pinned writes only), then garbage-collect
    pub async fn try_reclaim(&self, node: &NodeTarget, content_id: &str, mode: WriteMode) -> Result<()> {
        if mode == WriteMode::Pinned {
            let url = Self::endpoint(node, "/api/v0/pin/rm", &[("arg", content_id)])?;
            self.post(url, self.settings.reclaim_timeout)
                .await
                .map_err(|e| AppError::reclaim(format!("unpin {} on {}: {}", content_id, node.address, e)))?;
        }
        self.garbage_collect(node, self.settings.reclaim_timeout).await
    }

    /// Garbage-collect with an explicit timeout; the response stream is drained
    pub async fn garbage_collect(&self, node: &NodeTarget, timeout: Duration) -> Result<()> {
        let result = async {
            let url = Self::endpoint(node, "/api/v0/repo/gc", &[])?;
            let response = self.post(url, timeout).await?;
            response.bytes().await?;
            Ok::<(), AppError>(())
        }
        .await;

        result.map_err(|e| AppError::reclaim(format!("garbage-collect on {}: {}", node.address, e)))
    }
}

#[async_trait]
impl NodeApi for NodeClient {
    async fn write(&self, node: &NodeTarget, payload: Vec<u8>, mode: WriteMode) -> NodeCall<String> {
        let start = Instant::now();
        let outcome = self.try_write(node, payload, mode).await;
        NodeCall::new(start.elapsed(), outcome)
    }

    async fn read(&self, node: &NodeTarget, content_id: &str, expected_size: u64) -> NodeCall<u64> {
        let start = Instant::now();
        let outcome = self.try_read(node, content_id, expected_size).await;
        NodeCall::new(start.elapsed(), outcome)
    }

    async fn reclaim(&self, node: &NodeTarget, content_id: &str, mode: WriteMode) {
        if let Err(error) = self.try_reclaim(node, content_id, mode).await {
            self.logger
                .warn(&format!("Reclaim failed on {}", node.address))
                .field("content_id", content_id)
                .field("detail", error.to_string())
                .error_info(&error)
                .log()
                .await;
        }
    }

    async fn reclaim_all(&self, node: &NodeTarget) {
        if let Err(error) = self
            .garbage_collect(node, self.settings.reclaim_all_timeout)
            .await
        {
            self.logger
                .warn(&format!("Full garbage-collect failed on {}", node.address))
                .field("detail", error.to_string())
                .error_info(&error)
                .log()
                .await;
        }
    }
}

/// Map a non-success status to a protocol error carrying the body excerpt
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.trim().chars().take(200).collect();
    Err(AppError::protocol(format!("HTTP {}: {}", status.as_u16(), excerpt)))
}

/// The last non-empty `Hash` of a newline-delimited event stream
pub fn parse_content_id(body: &str) -> Result<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_str::<AddEvent>(line).ok())
        .filter_map(|event| event.hash)
        .filter(|hash| !hash.is_empty())
        .last()
        .ok_or_else(|| AppError::protocol("write response did not contain a content identifier"))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory node API recording every call as `"<op> <node> [<id>]"`
    #[derive(Debug, Default)]
    pub struct FakeNodeApi {
        calls: Mutex<Vec<String>>,
        payloads: Mutex<Vec<Vec<u8>>>,
        next_id: AtomicUsize,
        fail_writes: bool,
        /// Bytes a read returns instead of the expected size
        served_size: Option<u64>,
    }

    impl FakeNodeApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_writes(mut self) -> Self {
            self.fail_writes = true;
            self
        }

        pub fn serving(mut self, size: u64) -> Self {
            self.served_size = Some(size);
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn count(&self, op: &str) -> usize {
            self.calls()
                .iter()
                .filter(|c| c.split(' ').next() == Some(op))
                .count()
        }

        pub fn payloads(&self) -> Vec<Vec<u8>> {
            self.payloads.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl NodeApi for FakeNodeApi {
        async fn write(&self, node: &NodeTarget, payload: Vec<u8>, _mode: WriteMode) -> NodeCall<String> {
            self.record(format!("write {}", node.address));
            if self.fail_writes {
                return NodeCall::new(
                    Duration::from_millis(40),
                    Err(AppError::transport("connection refused")),
                );
            }
            self.payloads.lock().unwrap().push(payload);
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            NodeCall::new(Duration::from_millis(200), Ok(format!("QmFake{}", id)))
        }

        async fn read(&self, node: &NodeTarget, content_id: &str, expected_size: u64) -> NodeCall<u64> {
            self.record(format!("read {} {}", node.address, content_id));
            let served = self.served_size.unwrap_or(expected_size);
            let outcome = if served == expected_size {
                Ok(served)
            } else {
                Err(AppError::size_mismatch(expected_size, served))
            };
            NodeCall::new(Duration::from_millis(100), outcome)
        }

        async fn reclaim(&self, node: &NodeTarget, content_id: &str, _mode: WriteMode) {
            self.record(format!("reclaim {} {}", node.address, content_id));
        }

        async fn reclaim_all(&self, node: &NodeTarget) {
            self.record(format!("reclaim_all {}", node.address));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_object() {
        let body = r#"{"Name":"random.dat","Hash":"QmAbc","Size":"1048587"}"#;
        assert_eq!(parse_content_id(body).unwrap(), "QmAbc");
    }

    #[test]
    fn test_parse_progress_stream_keeps_last_hash() {
        let body = concat!(
            "{\"Name\":\"\",\"Bytes\":262144}\n",
            "{\"Name\":\"\",\"Hash\":\"\",\"Bytes\":524288}\n",
            "{\"Name\":\"random.dat\",\"Hash\":\"QmFirst\"}\n",
            "{\"Name\":\"random.dat\",\"Hash\":\"QmFinal\"}\n",
            "\n"
        );
        assert_eq!(parse_content_id(body).unwrap(), "QmFinal");
    }

    #[test]
    fn test_parse_without_hash_is_protocol_error() {
        let error = parse_content_id("{\"Bytes\":10}\nnot json\n").unwrap_err();
        assert_eq!(error.category(), "PROTOCOL");
        assert!(parse_content_id("").is_err());
    }

    #[test]
    fn test_endpoint_encodes_arguments() {
        let node = NodeTarget::new("ipfs-org1", crate::types::NodeRole::Upload, 5001);
        let url = NodeClient::endpoint(&node, "/api/v0/cat", &[("arg", "Qm a&b")]).unwrap();
        assert_eq!(url.as_str(), "http://ipfs-org1:5001/api/v0/cat?arg=Qm+a%26b");

        let url = NodeClient::endpoint(&node, "/api/v0/repo/gc", &[]).unwrap();
        assert_eq!(url.as_str(), "http://ipfs-org1:5001/api/v0/repo/gc");
    }
}
