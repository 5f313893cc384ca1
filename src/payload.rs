//! Unique random payloads for trials

use crate::types::{AppError, Result};
use rand::rngs::OsRng;
use rand::RngCore;

/// Default chunk size for filling payloads
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Produces payloads from the operating system's random source.
///
/// Every call yields fresh content so content-addressed deduplication never
/// short-circuits a write.
#[derive(Debug, Clone)]
pub struct PayloadGenerator {
    chunk_size: usize,
}

impl Default for PayloadGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadGenerator {
    pub fn new() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Use a different fill chunk size; zero falls back to the default
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: if chunk_size == 0 { CHUNK_SIZE } else { chunk_size },
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Generate exactly `size_bytes` random bytes
    pub fn generate(&self, size_bytes: u64) -> Result<Vec<u8>> {
        let size = usize::try_from(size_bytes).map_err(|_| {
            AppError::generation(format!("Payload of {} bytes exceeds addressable memory", size_bytes))
        })?;

        let mut payload = Vec::with_capacity(size);
        let mut chunk = vec![0u8; self.chunk_size.min(size)];

        while payload.len() < size {
            let take = (size - payload.len()).min(chunk.len());
            OsRng
                .try_fill_bytes(&mut chunk[..take])
                .map_err(|e| AppError::generation(format!("Random source failed: {}", e)))?;
            payload.extend_from_slice(&chunk[..take]);
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_length_below_chunk() {
        let payload = PayloadGenerator::new().generate(100).unwrap();
        assert_eq!(payload.len(), 100);
    }

    #[test]
    fn test_exact_length_above_chunk() {
        let size = 5 * 1024 * 1024 + 17;
        let payload = PayloadGenerator::new().generate(size).unwrap();
        assert_eq!(payload.len() as u64, size);
    }

    #[test]
    fn test_zero_size() {
        assert!(PayloadGenerator::new().generate(0).unwrap().is_empty());
    }

    #[test]
    fn test_calls_differ() {
        let generator = PayloadGenerator::new();
        let first = generator.generate(4096).unwrap();
        let second = generator.generate(4096).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_small_chunks_fill_every_byte() {
        let generator = PayloadGenerator::with_chunk_size(7);
        let payload = generator.generate(1000).unwrap();
        assert_eq!(payload.len(), 1000);
        // 1000 random bytes are never all zero in practice
        assert!(payload.iter().any(|&b| b != 0));
        assert_eq!(PayloadGenerator::with_chunk_size(0).chunk_size(), CHUNK_SIZE);
    }
}
