//! Host and per-process usage sampling (reads /proc on Linux)

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub use linux::LinuxSampler;

use std::sync::Arc;
use thiserror::Error;

/// One process observed during a sampling pass. Recreated every pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

/// Whole-host utilization measured over a sampling window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostSample {
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed {path}: {detail}")]
    Parse { path: &'static str, detail: String },
    #[error("sampling worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Source of usage readings. Calls may block for the measurement window.
pub trait Sampler: Send + Sync {
    fn sample_host(&self) -> Result<HostSample, SampleError>;

    /// Processes that exit mid-pass are skipped, never reported as errors.
    fn sample_processes(&self) -> Result<Vec<ProcessSample>, SampleError>;

    /// Host boot time in seconds since the Unix epoch.
    fn boot_time(&self) -> Result<u64, SampleError>;
}

/// Runs a sampler call on the blocking pool so the measurement window never
/// stalls the async runtime.
pub async fn sample_blocking<T, F>(sampler: &Arc<dyn Sampler>, f: F) -> Result<T, SampleError>
where
    T: Send + 'static,
    F: FnOnce(&dyn Sampler) -> Result<T, SampleError> + Send + 'static,
{
    let sampler = Arc::clone(sampler);
    tokio::task::spawn_blocking(move || f(sampler.as_ref())).await?
}
