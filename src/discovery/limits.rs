//! limits.rs
//! Process-lifetime joint limit cache.
//!
//! The cache is primed from the first batch of candidate joints and never refreshed
//! afterwards; reselecting a controller does not clear it. An empty or failed lookup
//! leaves it unprimed so the next discovery cycle can retry.

use std::collections::HashMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::PanelResult;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub min_position: f64,
    pub max_position: f64,
    pub max_velocity: f64,
}

/// External joint-limits lookup; may resolve only part of the requested names.
pub trait JointLimitsSource: Send + Sync {
    fn fetch(&self, joint_names: &[String]) -> PanelResult<HashMap<String, JointLimits>>;
}

pub struct JointLimitCache {
    source: Box<dyn JointLimitsSource>,
    limits: HashMap<String, JointLimits>,
    populated: bool,
}

impl JointLimitCache {
    pub fn new(source: Box<dyn JointLimitsSource>) -> Self {
        Self {
            source,
            limits: HashMap::new(),
            populated: false,
        }
    }

    /// Returns the cached limits, fetching them once if the cache is still empty.
    pub fn get_or_fetch(&mut self, joint_names: &[String]) -> &HashMap<String, JointLimits> {
        if self.populated {
            return &self.limits;
        }

        match self.source.fetch(joint_names) {
            Ok(fetched) if !fetched.is_empty() => {
                let unresolved = joint_names
                    .iter()
                    .filter(|n| !fetched.contains_key(*n))
                    .count();
                for (name, limits) in fetched {
                    self.limits.entry(name).or_insert(limits);
                }
                self.populated = true;
                info!(
                    "[Limits] Cached limits for {} joints ({} unresolved)",
                    self.limits.len(),
                    unresolved
                );
            }
            Ok(_) => {
                debug!("[Limits] Lookup resolved none of {} joints", joint_names.len());
            }
            Err(e) => {
                warn!("[Limits] Lookup failed: {}", e);
            }
        }

        &self.limits
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn get(&self, joint: &str) -> Option<&JointLimits> {
        self.limits.get(joint)
    }

    /// True if every joint in `joints` has an entry.
    pub fn covers<'a>(&self, joints: impl IntoIterator<Item = &'a String>) -> bool {
        joints.into_iter().all(|j| self.limits.contains_key(j))
    }

    pub fn snapshot(&self) -> &HashMap<String, JointLimits> {
        &self.limits
    }

    /// Drops cached limits; only done on full panel shutdown.
    pub fn clear(&mut self) {
        self.limits.clear();
        self.populated = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PanelError;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    struct CountingSource {
        calls: Arc<AtomicUsize>,
        table: HashMap<String, JointLimits>,
        fail_first: bool,
    }

    impl JointLimitsSource for CountingSource {
        fn fetch(&self, joint_names: &[String]) -> PanelResult<HashMap<String, JointLimits>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && n == 0 {
                return Err(PanelError::LimitsUnavailable("robot description not loaded".into()));
            }
            Ok(joint_names
                .iter()
                .filter_map(|j| self.table.get(j).map(|l| (j.clone(), *l)))
                .collect())
        }
    }

    fn limits(v: f64) -> JointLimits {
        JointLimits {
            min_position: -1.0,
            max_position: 1.0,
            max_velocity: v,
        }
    }

    fn source(calls: Arc<AtomicUsize>, fail_first: bool) -> Box<CountingSource> {
        let table = [("j1", 1.0), ("j2", 2.0), ("j3", 3.0)]
            .into_iter()
            .map(|(n, v)| (n.to_string(), limits(v)))
            .collect();
        Box::new(CountingSource { calls, table, fail_first })
    }

    #[test]
    fn populates_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut cache = JointLimitCache::new(source(calls.clone(), false));

        let first = cache.get_or_fetch(&["j1".into(), "j2".into()]).clone();
        let second = cache.get_or_fetch(&["j3".into()]).clone();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert!(cache.get("j3").is_none());
    }

    #[test]
    fn failed_lookup_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut cache = JointLimitCache::new(source(calls.clone(), true));

        assert!(cache.get_or_fetch(&["j1".into()]).is_empty());
        assert!(!cache.is_populated());

        assert_eq!(cache.get_or_fetch(&["j1".into()]).len(), 1);
        assert!(cache.is_populated());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unresolvable_names_leave_cache_empty() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut cache = JointLimitCache::new(source(calls, false));

        assert!(cache.get_or_fetch(&["gripper".into()]).is_empty());
        assert!(!cache.is_populated());
    }

    #[test]
    fn partial_mapping_counts_as_populated() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut cache = JointLimitCache::new(source(calls, false));

        cache.get_or_fetch(&["j1".into(), "gripper".into()]);
        assert!(cache.is_populated());
        assert!(cache.covers(&["j1".to_string()]));
        assert!(!cache.covers(&["j1".to_string(), "gripper".to_string()]));
    }
}
