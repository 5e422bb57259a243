//! Run configuration.
//!
//! The thread budget is an explicit value handed to the orchestrator and the
//! decomposer; nothing in the crate reads or mutates a process-wide setting,
//! so several configurations can run side by side in one process.

use crate::core::error::{EditorError, EditorResult};

/// Default number of task records a reader pulls per batch.
pub const DEFAULT_BATCH_SIZE: usize = 2;

/// Default number of decomposition threads one reader agent drives.
pub const DEFAULT_THREADS_PER_READER: usize = 5;

/// Default capacity of the channel between the two effect-chain stages.
pub const DEFAULT_CHAIN_BUFFER: usize = 1;

/// Environment variable overriding [`EditorConfig::batch_size`].
pub const BATCH_SIZE_ENV: &str = "RASTERMILL_BATCH_SIZE";

/// Configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    /// Thread budget. `0` selects sequential mode.
    pub threads: usize,
    /// Task records per reader batch.
    pub batch_size: usize,
    /// Decomposition threads per reader agent.
    pub threads_per_reader: usize,
    /// Minimum margin rows around each row slice. Effects always get at
    /// least their own kernel half-width.
    pub slice_margin: u32,
    /// Capacity of the effect-chain hand-off channel.
    pub chain_buffer: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            batch_size: DEFAULT_BATCH_SIZE,
            threads_per_reader: DEFAULT_THREADS_PER_READER,
            slice_margin: 0,
            chain_buffer: DEFAULT_CHAIN_BUFFER,
        }
    }
}

impl EditorConfig {
    /// Create a sequential configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the thread budget.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the reader batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set how many decomposition threads one reader drives.
    pub fn with_threads_per_reader(mut self, threads_per_reader: usize) -> Self {
        self.threads_per_reader = threads_per_reader;
        self
    }

    /// Set the minimum slice margin.
    pub fn with_slice_margin(mut self, margin: u32) -> Self {
        self.slice_margin = margin;
        self
    }

    /// Set the chain hand-off channel capacity.
    pub fn with_chain_buffer(mut self, capacity: usize) -> Self {
        self.chain_buffer = capacity;
        self
    }

    /// Apply overrides from the environment.
    pub fn with_env_overrides(self) -> EditorResult<Self> {
        match std::env::var(BATCH_SIZE_ENV) {
            Ok(raw) => {
                let batch_size = raw.trim().parse::<usize>().map_err(|_| {
                    EditorError::Config(format!("{} must be an integer, got '{}'", BATCH_SIZE_ENV, raw))
                })?;
                Ok(self.with_batch_size(batch_size))
            }
            Err(_) => Ok(self),
        }
    }

    /// Whether tasks run one at a time without decomposition.
    pub fn is_sequential(&self) -> bool {
        self.threads == 0
    }

    /// Number of reader agents: `ceil(threads / threads_per_reader)`.
    pub fn reader_count(&self) -> usize {
        if self.is_sequential() {
            return 0;
        }
        let per_reader = self.threads_per_reader.max(1);
        (self.threads + per_reader - 1) / per_reader
    }

    /// Check the values can drive a run.
    pub fn validate(&self) -> EditorResult<()> {
        if self.batch_size == 0 {
            return Err(EditorError::Config("batch size must be at least 1".to_string()));
        }
        if self.threads_per_reader == 0 {
            return Err(EditorError::Config(
                "threads per reader must be at least 1".to_string(),
            ));
        }
        if self.chain_buffer == 0 {
            return Err(EditorError::Config(
                "chain buffer must hold at least one result".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::new();
        assert!(config.is_sequential());
        assert_eq!(config.batch_size, 2);
        assert_eq!(config.reader_count(), 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reader_count_rounds_up() {
        let counts: Vec<_> = [1, 4, 5, 6, 10, 11]
            .iter()
            .map(|&t| EditorConfig::new().with_threads(t).reader_count())
            .collect();
        assert_eq!(counts, vec![1, 1, 1, 2, 2, 3]);
    }

    #[test]
    fn test_builder() {
        let config = EditorConfig::new()
            .with_threads(8)
            .with_batch_size(3)
            .with_threads_per_reader(2)
            .with_slice_margin(5)
            .with_chain_buffer(4);
        assert!(!config.is_sequential());
        assert_eq!(config.reader_count(), 4);
        assert_eq!(config.slice_margin, 5);
        assert_eq!(config.chain_buffer, 4);
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let config = EditorConfig::new().with_batch_size(0);
        assert!(matches!(config.validate(), Err(EditorError::Config(_))));
    }
}
