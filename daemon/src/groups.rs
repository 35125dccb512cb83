//! Named process groups and membership matching

use crate::collector::ProcessSample;
use std::collections::{BTreeMap, BTreeSet};

/// Decides whether a process belongs to a group. Swap the implementation to
/// match on something other than the process name.
pub trait GroupMatcher: Send + Sync {
    fn belongs(&self, registry: &GroupRegistry, group: &str, process: &ProcessSample) -> bool;
}

/// Exact, case-sensitive match of the process name against the group's members.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameMatcher;

impl GroupMatcher for NameMatcher {
    fn belongs(&self, registry: &GroupRegistry, group: &str, process: &ProcessSample) -> bool {
        registry
            .members(group)
            .is_some_and(|members| members.contains(&process.name))
    }
}

/// Static mapping of group name to member process names.
///
/// Groups need not be disjoint: a process named in two groups counts toward both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRegistry {
    groups: BTreeMap<String, BTreeSet<String>>,
}

impl GroupRegistry {
    pub fn new<G, M, N>(groups: G) -> Self
    where
        G: IntoIterator<Item = (N, M)>,
        M: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let groups = groups
            .into_iter()
            .map(|(name, members)| (name.into(), members.into_iter().map(Into::into).collect()))
            .collect();
        Self { groups }
    }

    pub fn groups(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.groups
    }

    pub fn members(&self, group: &str) -> Option<&BTreeSet<String>> {
        self.groups.get(group)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new([
            ("batch_jobs", vec!["python", "notepad"]),
            ("interactive", vec!["chrome", "code"]),
        ])
    }
}
