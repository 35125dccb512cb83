mod common;

use allocator_daemon::allocator::{Allocator, TickReport};
use allocator_daemon::collector::ProcessSample;
use allocator_daemon::groups::{GroupMatcher, GroupRegistry};
use allocator_daemon::policy::Priority;
use allocator_daemon::thresholds::{ThresholdStore, ThresholdUpdate};
use common::{sample, FakeSampler, RecordingControl};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct Fixture {
    sampler: Arc<FakeSampler>,
    control: Arc<RecordingControl>,
    thresholds: Arc<ThresholdStore>,
    allocator: Allocator,
}

fn fixture(registry: GroupRegistry) -> Fixture {
    let sampler = Arc::new(FakeSampler::new(vec![]));
    let control = Arc::new(RecordingControl::new());
    let thresholds = Arc::new(ThresholdStore::default());
    let allocator = Allocator::new(
        sampler.clone(),
        Arc::new(registry),
        Arc::clone(&thresholds),
        control.clone(),
    );
    Fixture {
        sampler,
        control,
        thresholds,
        allocator,
    }
}

#[tokio::test]
async fn test_tick_only_touches_group_members() {
    let f = fixture(GroupRegistry::default());
    f.sampler.set_processes(vec![
        sample(10, "python", 80.0, 5.0),
        sample(11, "bash", 99.0, 99.0),
    ]);

    let report = f.allocator.tick().await.unwrap();

    assert_eq!(report.processes_matched, 1);
    // CPU demotes, then memory (5% < 30%) restores
    assert_eq!(f.control.writes(), vec![(10, Priority::Idle), (10, Priority::Normal)]);
    assert_eq!(f.control.priority_of(10), Priority::Normal);
    assert!(f.control.writes().iter().all(|(pid, _)| *pid != 11));
}

#[tokio::test]
async fn test_hysteresis_band_leaves_priority_alone() {
    let f = fixture(GroupRegistry::default());
    f.control.set_initial(20, Priority::Idle);
    f.sampler.set_processes(vec![sample(20, "chrome", 30.0, 50.0)]);

    let report = f.allocator.tick().await.unwrap();

    assert_eq!(report.processes_matched, 1);
    assert!(f.control.writes().is_empty());
    assert_eq!(f.control.priority_of(20), Priority::Idle);
}

#[tokio::test]
async fn test_memory_decision_applied_last() {
    let f = fixture(GroupRegistry::default());
    f.sampler.set_processes(vec![sample(30, "code", 2.0, 90.0)]);

    let report = f.allocator.tick().await.unwrap();

    assert_eq!(
        report,
        TickReport {
            processes_matched: 1,
            demotions: 1,
            restorations: 1,
            failures: 0,
        }
    );
    assert_eq!(f.control.priority_of(30), Priority::Idle);
}

#[tokio::test]
async fn test_failed_process_does_not_abort_tick() {
    let f = fixture(GroupRegistry::default());
    f.control.fail_for(40);
    f.sampler.set_processes(vec![
        sample(40, "python", 90.0, 50.0),
        sample(41, "notepad", 90.0, 50.0),
    ]);

    let report = f.allocator.tick().await.unwrap();

    assert_eq!(report.failures, 1);
    assert_eq!(report.demotions, 1);
    assert_eq!(f.control.priority_of(41), Priority::Idle);
}

#[tokio::test]
async fn test_sampling_failure_surfaces_from_tick() {
    let f = fixture(GroupRegistry::default());
    f.sampler.set_failing(true);
    assert!(f.allocator.tick().await.is_err());
    assert!(f.control.writes().is_empty());
}

#[tokio::test]
async fn test_threshold_update_applies_on_next_tick() {
    let f = fixture(GroupRegistry::default());
    f.sampler.set_processes(vec![sample(50, "python", 40.0, 50.0)]);

    f.allocator.tick().await.unwrap();
    assert!(f.control.writes().is_empty());

    f.thresholds
        .update(&ThresholdUpdate {
            cpu_high: Some(35.0),
            ..Default::default()
        })
        .unwrap();
    f.allocator.tick().await.unwrap();
    assert_eq!(f.control.priority_of(50), Priority::Idle);
}

#[tokio::test]
async fn test_process_in_two_groups_is_visited_twice() {
    let f = fixture(GroupRegistry::new([
        ("a", vec!["worker"]),
        ("b", vec!["worker"]),
    ]));
    f.sampler.set_processes(vec![sample(60, "worker", 90.0, 50.0)]);

    let report = f.allocator.tick().await.unwrap();

    assert_eq!(report.processes_matched, 2);
    assert_eq!(f.control.writes(), vec![(60, Priority::Idle), (60, Priority::Idle)]);
    assert_eq!(f.control.priority_of(60), Priority::Idle);
}

#[tokio::test]
async fn test_run_stops_on_cancellation() {
    let f = fixture(GroupRegistry::default());
    f.sampler.set_processes(vec![sample(70, "python", 90.0, 50.0)]);
    let allocator = Arc::new(f.allocator.with_period(Duration::from_secs(5)));
    let cancel = CancellationToken::new();

    let handle = {
        let allocator = Arc::clone(&allocator);
        let cancel = cancel.clone();
        tokio::spawn(async move { allocator.run(cancel).await })
    };

    // first tick fires immediately
    for _ in 0..50 {
        if !f.control.writes().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(f.control.priority_of(70), Priority::Idle);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("loop should stop after cancellation")
        .unwrap();
}

struct PidRangeMatcher;

impl GroupMatcher for PidRangeMatcher {
    fn belongs(&self, _registry: &GroupRegistry, _group: &str, process: &ProcessSample) -> bool {
        (1000..2000).contains(&process.pid)
    }
}

#[tokio::test]
async fn test_custom_matcher_selects_processes() {
    let f = fixture(GroupRegistry::new([("tenant", Vec::<&str>::new())]));
    let allocator = f.allocator.with_matcher(Arc::new(PidRangeMatcher));
    f.sampler.set_processes(vec![
        sample(1500, "anything", 90.0, 50.0),
        sample(80, "python", 90.0, 50.0),
    ]);

    let report = allocator.tick().await.unwrap();

    assert_eq!(report.processes_matched, 1);
    assert_eq!(f.control.writes(), vec![(1500, Priority::Idle)]);
}
