//! HTTP API message shapes (JSON)

use crate::aggregator::GroupUsage;
use crate::thresholds::ThresholdSet;
use crate::uptime::Uptime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const THRESHOLDS_UPDATED: &str = "Thresholds updated successfully";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorResponse {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub groups: BTreeMap<String, GroupUsageData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupUsageData {
    pub cpu: f64,
    pub memory: f64,
}

impl From<&GroupUsage> for GroupUsageData {
    fn from(usage: &GroupUsage) -> Self {
        Self {
            cpu: usage.cpu_total,
            memory: usage.memory_total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdsResponse {
    pub message: String,
    #[serde(flatten)]
    pub thresholds: ThresholdSet,
}

impl ThresholdsResponse {
    pub fn updated(thresholds: ThresholdSet) -> Self {
        Self {
            message: THRESHOLDS_UPDATED.to_string(),
            thresholds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UptimeResponse {
    pub uptime_seconds: u64,
    pub uptime: String,
}

impl From<Uptime> for UptimeResponse {
    fn from(uptime: Uptime) -> Self {
        Self {
            uptime_seconds: uptime.seconds,
            uptime: uptime.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
