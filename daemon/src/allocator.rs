//! Periodic priority adjustment of grouped processes

use crate::aggregator::members_of;
use crate::collector::{sample_blocking, SampleError, Sampler};
use crate::executor::PriorityControl;
use crate::groups::{GroupMatcher, GroupRegistry, NameMatcher};
use crate::policy::{plan, Priority};
use crate::thresholds::ThresholdStore;
use crate::uptime::Uptime;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(5);

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// (group, process) pairs visited; a process in two groups counts twice.
    pub processes_matched: usize,
    pub demotions: usize,
    pub restorations: usize,
    pub failures: usize,
}

pub struct Allocator {
    sampler: Arc<dyn Sampler>,
    registry: Arc<GroupRegistry>,
    matcher: Arc<dyn GroupMatcher>,
    thresholds: Arc<ThresholdStore>,
    control: Arc<dyn PriorityControl>,
    period: Duration,
}

impl Allocator {
    pub fn new(
        sampler: Arc<dyn Sampler>,
        registry: Arc<GroupRegistry>,
        thresholds: Arc<ThresholdStore>,
        control: Arc<dyn PriorityControl>,
    ) -> Self {
        Self {
            sampler,
            registry,
            matcher: Arc::new(NameMatcher),
            thresholds,
            control,
            period: DEFAULT_PERIOD,
        }
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn GroupMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Re-samples processes and applies the priority policy to every member
    /// of every group. Per-process failures are logged and counted, never
    /// propagated.
    pub async fn tick(&self) -> Result<TickReport, SampleError> {
        let thresholds = self.thresholds.get();
        let samples = sample_blocking(&self.sampler, |s| s.sample_processes()).await?;

        let mut report = TickReport::default();
        for group in self.registry.names() {
            for process in members_of(&samples, &self.registry, self.matcher.as_ref(), group) {
                report.processes_matched += 1;
                for priority in plan(process, &thresholds) {
                    match self.control.set_priority(process.pid, priority) {
                        Ok(()) => {
                            debug!(
                                group,
                                pid = process.pid,
                                name = %process.name,
                                ?priority,
                                "Priority adjusted"
                            );
                            match priority {
                                Priority::Idle => report.demotions += 1,
                                Priority::Normal => report.restorations += 1,
                            }
                        }
                        Err(e) => {
                            warn!("Error adjusting {} (PID {}): {}", process.name, process.pid, e);
                            report.failures += 1;
                            break;
                        }
                    }
                }
            }
        }
        Ok(report)
    }

    /// Runs ticks every `period` until `cancel` fires. Sampling failures are
    /// logged and retried on the next tick.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Allocator loop started (period {:?})", self.period);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.tick() => result,
            };
            match result {
                Ok(report) => debug!(?report, "Allocator tick complete"),
                Err(e) => error!("Allocator tick failed: {}", e),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.log_status() => {}
            }
        }
        info!("Allocator loop stopped");
    }

    async fn log_status(&self) {
        let status = sample_blocking(&self.sampler, |s| Ok((s.sample_host()?, s.boot_time()?))).await;
        match status {
            Ok((host, boot_time)) => info!(
                "[STATUS] CPU: {:.1}% | Memory: {:.1}% | Uptime: {}",
                host.cpu_percent,
                host.memory_percent,
                Uptime::from_boot_time(boot_time)
            ),
            Err(e) => error!("Failed to sample host status: {}", e),
        }
    }
}
