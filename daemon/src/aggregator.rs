//! Per-group usage totals

use crate::collector::ProcessSample;
use crate::groups::{GroupMatcher, GroupRegistry};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct GroupUsage {
    pub group_name: String,
    pub cpu_total: f64,
    pub memory_total: f64,
}

impl GroupUsage {
    fn empty(group_name: &str) -> Self {
        Self {
            group_name: group_name.to_string(),
            cpu_total: 0.0,
            memory_total: 0.0,
        }
    }
}

/// Sums CPU and memory of every sample belonging to each group.
///
/// Every configured group is present in the result; groups with no live
/// member report zeros.
pub fn aggregate(
    samples: &[ProcessSample],
    registry: &GroupRegistry,
    matcher: &dyn GroupMatcher,
) -> BTreeMap<String, GroupUsage> {
    registry
        .names()
        .map(|group| {
            let usage = samples
                .iter()
                .filter(|p| matcher.belongs(registry, group, p))
                .fold(GroupUsage::empty(group), |mut acc, p| {
                    acc.cpu_total += p.cpu_percent;
                    acc.memory_total += p.memory_percent;
                    acc
                });
            (group.to_string(), usage)
        })
        .collect()
}

/// Samples belonging to `group`, in sampling order.
pub fn members_of<'a>(
    samples: &'a [ProcessSample],
    registry: &'a GroupRegistry,
    matcher: &'a dyn GroupMatcher,
    group: &'a str,
) -> impl Iterator<Item = &'a ProcessSample> + 'a {
    samples
        .iter()
        .filter(move |p| matcher.belongs(registry, group, p))
}
