use crate::error::Result;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_WORKERS: usize = 20;
pub const DEFAULT_CHUNK_SIZE: usize = 1024;
pub const MIN_CHUNK_SIZE: usize = 512;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_OUTPUT: &str = "sources";
pub const DEFAULT_USER_AGENT: &str =
    concat!("Unmapper/", env!("CARGO_PKG_VERSION"), " (https://github.com/trapdoorsec/unmapper)");

/// Settings shared by every stage of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub output_root: PathBuf,
    pub workers: usize,
    pub queue_capacity: usize,
    pub chunk_size: usize,
    pub timeout: Duration,
    pub user_agent: String,
}

impl PipelineConfig {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_WORKERS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Sets the per-stage worker count. The queue capacity follows it.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self.queue_capacity = self.workers;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(MIN_CHUNK_SIZE);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn build_client(&self) -> Result<Client> {
        let client = Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.timeout)
            .connect_timeout(self.timeout / 2)
            .pool_max_idle_per_host(self.workers)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(client)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.output_root, PathBuf::from("sources"));
        assert_eq!(config.workers, 20);
        assert_eq!(config.queue_capacity, 20);
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_builder_clamps_degenerate_values() {
        let config = PipelineConfig::new("out")
            .with_workers(0)
            .with_chunk_size(3)
            .with_queue_capacity(0);
        assert_eq!(config.workers, 1);
        assert_eq!(config.queue_capacity, 1);
        assert_eq!(config.chunk_size, MIN_CHUNK_SIZE);
    }

    #[test]
    fn test_build_client() {
        let config = PipelineConfig::new("out").with_timeout(Duration::from_secs(2));
        assert!(config.build_client().is_ok());
    }
}
