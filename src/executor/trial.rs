//! One write-then-read measurement

use super::TargetPlan;
use crate::{
    client::NodeApi,
    error::Result,
    logging::Logger,
    models::{NetworkScenario, NodeTarget, TestFile, TrialResult},
    payload::PayloadGenerator,
    types::WriteMode,
};
use bytesize::ByteSize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Runs one {file, scenario, iteration} cell end to end.
///
/// Generate, write, wait for propagation, read with size verification, then
/// reclaim the artifact on both nodes. No retries; a failed trial is recorded
/// as failed.
pub struct TrialRunner {
    api: Arc<dyn NodeApi>,
    generator: PayloadGenerator,
    write_mode: WriteMode,
    propagation_delay: Duration,
    logger: Logger,
}

impl TrialRunner {
    pub fn new(
        api: Arc<dyn NodeApi>,
        write_mode: WriteMode,
        propagation_delay: Duration,
        logger: Logger,
    ) -> Self {
        Self {
            api,
            generator: PayloadGenerator::new(),
            write_mode,
            propagation_delay,
            logger,
        }
    }

    pub fn with_generator(mut self, generator: PayloadGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    /// Measure one cell. Only a target resolution failure is returned as an
    /// error; every other failure is recorded on the result.
    pub async fn run(
        &self,
        iteration: u32,
        file: &TestFile,
        scenario: &NetworkScenario,
        plan: &TargetPlan,
    ) -> Result<TrialResult> {
        let (upload, download) = plan.resolve(iteration)?;
        let mut result = TrialResult::begin(iteration, file, scenario).with_nodes(upload, download);

        let start = Instant::now();
        let payload = match self.generator.generate(file.size_bytes) {
            Ok(payload) => payload,
            Err(error) => {
                return Ok(self.close(result.fail(format!("Failed to generate random data: {}", error))).await)
            }
        };
        result.record_generation(start.elapsed());

        self.logger
            .debug(&format!(
                "Uploading {} to {}",
                ByteSize::b(file.size_bytes),
                upload.address
            ))
            .log()
            .await;

        let write = self.api.write(upload, payload, self.write_mode).await;
        let content_id = match write.outcome {
            Ok(content_id) => {
                result.record_upload(write.elapsed);
                content_id
            }
            Err(error) => {
                result.record_upload_attempt(write.elapsed);
                return Ok(self.close(result.fail(format!("Upload failed: {}", error))).await);
            }
        };
        result.content_id = Some(content_id.clone());

        if !self.propagation_delay.is_zero() {
            tokio::time::sleep(self.propagation_delay).await;
        }

        let read = self
            .api
            .read(download, &content_id, file.size_bytes)
            .await;
        let result = match read.outcome {
            Ok(_) => {
                result.record_download(read.elapsed);
                result.succeed()
            }
            Err(error) => {
                result.record_download_attempt(read.elapsed);
                result.fail(format!("Download failed: {}", error))
            }
        };

        // The artifact exists from here on, whatever the read outcome
        self.reclaim(&content_id, upload, download).await;

        Ok(self.close(result).await)
    }

    async fn reclaim(&self, content_id: &str, upload: &NodeTarget, download: &NodeTarget) {
        self.api.reclaim(upload, content_id, self.write_mode).await;
        self.api.reclaim(download, content_id, self.write_mode).await;
    }

    async fn close(&self, result: TrialResult) -> TrialResult {
        let message = format!(
            "Iteration {}: {} {}",
            result.iteration,
            result.file,
            if result.success { "ok" } else { "failed" }
        );
        let entry = if result.success {
            self.logger.info(&message)
        } else {
            self.logger.warn(&message)
        };
        entry.trial(&result).log().await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::FakeNodeApi;
    use crate::types::NodeRole;

    fn plan() -> TargetPlan {
        TargetPlan::Fixed {
            upload: NodeTarget::new("ipfs-org1", NodeRole::Upload, 5001),
            download: NodeTarget::new("ipfs-org2", NodeRole::Download, 5001),
        }
    }

    fn runner(api: Arc<FakeNodeApi>) -> TrialRunner {
        TrialRunner::new(api, WriteMode::Unpinned, Duration::ZERO, Logger::quiet("TRIAL"))
    }

    fn file() -> TestFile {
        TestFile::new("test64k.dat", 64 * 1024)
    }

    fn scenario() -> NetworkScenario {
        NetworkScenario::unlimited("baseline", "No Limit")
    }

    #[tokio::test]
    async fn test_successful_trial() {
        let api = Arc::new(FakeNodeApi::new());
        let result = runner(api.clone())
            .run(1, &file(), &scenario(), &plan())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.content_id.as_deref(), Some("QmFake0"));
        assert!((result.upload_time - 0.2).abs() < 1e-9);
        assert!((result.download_time - 0.1).abs() < 1e-9);
        assert!((result.total_time - 0.3).abs() < 1e-9);
        assert!(result.upload_throughput > 0.0);
        assert_eq!(result.upload_node, "ipfs-org1");
        assert_eq!(result.download_node, "ipfs-org2");
        assert_eq!(
            api.calls(),
            vec![
                "write ipfs-org1",
                "read ipfs-org2 QmFake0",
                "reclaim ipfs-org1 QmFake0",
                "reclaim ipfs-org2 QmFake0",
            ]
        );
        assert_eq!(api.payloads()[0].len(), 64 * 1024);
    }

    #[tokio::test]
    async fn test_write_failure_skips_read_and_reclaim() {
        let api = Arc::new(FakeNodeApi::new().failing_writes());
        let result = runner(api.clone())
            .run(1, &file(), &scenario(), &plan())
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().starts_with("Upload failed"));
        assert!(result.content_id.is_none());
        assert!(result.upload_time > 0.0);
        assert_eq!(result.upload_throughput, 0.0);
        assert_eq!(result.download_time, 0.0);
        assert_eq!(result.total_time, 0.0);
        assert_eq!(api.count("read"), 0);
        assert_eq!(api.count("reclaim"), 0);
    }

    #[tokio::test]
    async fn test_size_mismatch_fails_and_still_reclaims() {
        let api = Arc::new(FakeNodeApi::new().serving(1000));
        let result = runner(api.clone())
            .run(2, &file(), &scenario(), &plan())
            .await
            .unwrap();

        assert!(!result.success);
        let error = result.error.as_deref().unwrap();
        assert!(error.starts_with("Download failed"));
        assert!(error.contains("65536"));
        assert_eq!(result.total_time, 0.0);
        assert_eq!(result.download_throughput, 0.0);
        assert_eq!(result.content_id.as_deref(), Some("QmFake0"));
        assert_eq!(api.count("reclaim"), 2);
        assert!(api.calls().contains(&"reclaim ipfs-org1 QmFake0".to_string()));
        assert!(api.calls().contains(&"reclaim ipfs-org2 QmFake0".to_string()));
    }

    #[tokio::test]
    async fn test_payloads_differ_between_trials() {
        let api = Arc::new(FakeNodeApi::new());
        let runner = runner(api.clone());
        for iteration in 1..=3 {
            runner.run(iteration, &file(), &scenario(), &plan()).await.unwrap();
        }

        let payloads = api.payloads();
        assert_eq!(payloads.len(), 3);
        assert_ne!(payloads[0], payloads[1]);
        assert_ne!(payloads[1], payloads[2]);
        assert_ne!(payloads[0], payloads[2]);
    }

    #[tokio::test]
    async fn test_unresolvable_targets_fail_before_io() {
        let api = Arc::new(FakeNodeApi::new());
        let plan = TargetPlan::Rotating { nodes: Vec::new() };
        let error = runner(api.clone())
            .run(1, &file(), &scenario(), &plan)
            .await
            .unwrap_err();

        assert!(error.is_fatal());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rotation_records_nodes() {
        let api = Arc::new(FakeNodeApi::new());
        let plan = TargetPlan::Rotating {
            nodes: (1..=3)
                .map(|i| NodeTarget::new(format!("ipfs-org{}", i), NodeRole::Peer, 5001))
                .collect(),
        };
        let result = runner(api.clone())
            .run(3, &file(), &scenario(), &plan)
            .await
            .unwrap();

        assert_eq!(result.upload_node, "ipfs-org3");
        assert_eq!(result.download_node, "ipfs-org1");
        assert_eq!(api.calls()[0], "write ipfs-org3");
    }
}
