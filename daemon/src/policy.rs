//! Priority-adjustment decisions

use crate::collector::ProcessSample;
use crate::thresholds::ThresholdSet;

/// The two scheduling classes a governed process can be placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    Normal,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Demote,
    Restore,
    NoChange,
}

impl Decision {
    pub fn target(self) -> Option<Priority> {
        match self {
            Decision::Demote => Some(Priority::Idle),
            Decision::Restore => Some(Priority::Normal),
            Decision::NoChange => None,
        }
    }
}

/// Above `high` demotes, below `low` restores, anything in between keeps
/// whatever priority the process already has.
pub fn decide(value: f64, high: f64, low: f64) -> Decision {
    if value > high {
        Decision::Demote
    } else if value < low {
        Decision::Restore
    } else {
        Decision::NoChange
    }
}

/// Ordered priority writes for one process on one tick: CPU first, memory
/// second. Applied in order, so memory wins when both fire.
pub fn plan(process: &ProcessSample, thresholds: &ThresholdSet) -> Vec<Priority> {
    let cpu = decide(process.cpu_percent, thresholds.cpu_high, thresholds.cpu_low);
    let mem = decide(process.memory_percent, thresholds.mem_high, thresholds.mem_low);
    [cpu, mem].into_iter().filter_map(Decision::target).collect()
}

/// Priority left on the process after applying `plan`, given what it had before.
pub fn resulting_priority(
    current: Priority,
    process: &ProcessSample,
    thresholds: &ThresholdSet,
) -> Priority {
    plan(process, thresholds).last().copied().unwrap_or(current)
}
