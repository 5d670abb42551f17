//! Scheduling behavior across whole populations of subscriptions
//!
//! The simulation drives the scheduler with a ManualTimer and an engine that sends
//! every ready report as soon as it is signalled, then checks the gaps between
//! consecutive reports of each subscription.

use std::collections::BTreeMap;
use std::time::Duration;

use proptest::prelude::*;
use rstest::rstest;

use report_scheduler::{
    ManualTimer, NodeHandle, ReportingIntervals, RunFlag, SchedulerConfig, SchedulerError,
    SchedulerPhase, SynchronizedReportScheduler, TimerDelegate, Timestamp,
};

type Scheduler = SynchronizedReportScheduler<ManualTimer, RunFlag>;

// ============================================================================
// Test Helpers
// ============================================================================

fn scheduler() -> Scheduler {
    SynchronizedReportScheduler::new(
        SchedulerConfig::default(),
        ManualTimer::new(Timestamp::ZERO),
        RunFlag::new(),
    )
    .unwrap()
}

fn intervals(min_ms: u64, max_ms: u64) -> ReportingIntervals {
    ReportingIntervals::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms)).unwrap()
}

/// Send every ready report, including ones that become ready while sending.
fn drain_engine(scheduler: &mut Scheduler, sent: &mut BTreeMap<NodeHandle, Vec<Timestamp>>) {
    while scheduler.engine_mut().take() {
        let ready: Vec<_> = scheduler.ready_nodes().collect();
        for handle in ready {
            let now = scheduler.timer().now();
            scheduler.on_report_started(handle, false).unwrap();
            scheduler.on_subscription_report_sent(handle).unwrap();
            sent.entry(handle).or_default().push(now);
        }
    }
}

/// Run until `horizon`, applying data changes `(at_ms, node_index)` along the way.
fn simulate(
    scheduler: &mut Scheduler,
    handles: &[NodeHandle],
    mut changes: Vec<(u64, usize)>,
    horizon: Timestamp,
) -> BTreeMap<NodeHandle, Vec<Timestamp>> {
    changes.sort();
    let mut changes = changes.into_iter().peekable();
    let mut sent = BTreeMap::new();

    for _ in 0..100_000 {
        drain_engine(scheduler, &mut sent);

        let deadline = scheduler.timer().deadline();
        let change_at = changes.peek().map(|(at, _)| Timestamp::from_millis(*at));
        let next = match (deadline, change_at) {
            (Some(d), Some(c)) => d.min(c),
            (Some(d), None) => d,
            (None, Some(c)) => c,
            (None, None) => break,
        };
        if next > horizon {
            break;
        }
        if next > scheduler.timer().now() {
            scheduler.timer_mut().set_now(next);
        }

        if change_at == Some(next) {
            if let Some((_, index)) = changes.next() {
                scheduler
                    .on_became_reportable(handles[index % handles.len()])
                    .unwrap();
            }
        } else if scheduler.timer_mut().take_due() {
            scheduler.timer_fired().unwrap();
        }
    }

    sent
}

/// Strategy for (min, max) interval pairs in milliseconds
fn interval_strategy() -> impl Strategy<Value = (u64, u64)> {
    (0u64..3_000, 100u64..5_000).prop_map(|(min, span)| (min, min + span))
}

// ============================================================================
// Worked examples
// ============================================================================

#[rstest]
#[case::first_node_changed(true, 100, Duration::from_millis(100))]
#[case::nothing_changed(false, 0, Duration::from_millis(500))]
fn two_node_reconciliation(
    #[case] first_changed: bool,
    #[case] expected_min: u64,
    #[case] expected_timeout: Duration,
) {
    let mut scheduler = scheduler();
    let first = scheduler.on_subscription_established(intervals(100, 500)).unwrap();
    scheduler.on_subscription_established(intervals(50, 1000)).unwrap();
    if first_changed {
        scheduler.on_became_reportable(first).unwrap();
    }

    let timeout = scheduler.calculate_next_report_timeout(Timestamp::ZERO).unwrap();
    assert_eq!(scheduler.common_max_timestamp(), Timestamp::from_millis(500));
    assert_eq!(scheduler.common_min_timestamp(), Timestamp::from_millis(expected_min));
    assert_eq!(timeout, expected_timeout);
}

#[rstest]
#[case::inside_window(Duration::from_millis(400), true)]
#[case::outside_window(Duration::from_millis(1_500), false)]
fn idle_transition_window(#[case] before_deadline: Duration, #[case] fires: bool) {
    let mut scheduler = scheduler();
    let node = scheduler.on_subscription_established(intervals(200, 5_000)).unwrap();
    scheduler.on_became_reportable(node).unwrap();
    scheduler.timer_mut().advance(Duration::from_millis(200));
    assert!(scheduler.timer_mut().take_due());
    scheduler.timer_fired().unwrap();
    assert!(scheduler.engine_mut().take());
    scheduler.on_report_started(node, false).unwrap();
    scheduler.on_subscription_report_sent(node).unwrap();

    // Idle again; the next report is forced at 200 + 5000.
    let deadline = scheduler.timer().deadline().unwrap();
    assert_eq!(deadline, Timestamp::from_millis(5_200));
    let now = Timestamp::from_millis(deadline.as_millis() - before_deadline.as_millis() as u64);
    scheduler.timer_mut().set_now(now);
    scheduler.on_transition_to_idle(now).unwrap();

    assert_eq!(scheduler.engine().is_pending(), fires);
    assert_eq!(scheduler.is_report_scheduled(), !fires);
}

#[test]
fn idle_transition_waits_for_common_min() {
    let mut scheduler = scheduler();
    let node = scheduler.on_subscription_established(intervals(2_000, 5_000)).unwrap();
    scheduler.on_became_reportable(node).unwrap();
    assert_eq!(scheduler.common_min_timestamp(), Timestamp::from_millis(2_000));

    // Inside the window but the minimum has not elapsed yet.
    scheduler.timer_mut().set_now(Timestamp::from_millis(1_500));
    scheduler.on_transition_to_idle(Timestamp::from_millis(1_500)).unwrap();
    assert!(!scheduler.engine().is_pending());
    assert_eq!(scheduler.timer().deadline(), Some(Timestamp::from_millis(2_000)));
}

#[test]
fn pool_drains_and_rearms() {
    let mut scheduler = scheduler();
    let handles: Vec<_> = (0..3)
        .map(|i| {
            scheduler
                .on_subscription_established(intervals(100, 1_000 + i * 100))
                .unwrap()
        })
        .collect();
    assert_eq!(scheduler.phase(), SchedulerPhase::Armed);

    for handle in &handles {
        scheduler.on_read_handler_destroyed(*handle).unwrap();
    }
    assert_eq!(scheduler.phase(), SchedulerPhase::Idle);
    assert_eq!(
        scheduler.find_next_max_interval(Timestamp::ZERO),
        Err(SchedulerError::EmptyPool)
    );

    scheduler.timer_mut().advance(Duration::from_secs(10));
    let handle = scheduler.on_subscription_established(intervals(100, 700)).unwrap();
    assert_eq!(scheduler.phase(), SchedulerPhase::Armed);
    assert_eq!(scheduler.timer().deadline(), Some(Timestamp::from_millis(10_700)));
    assert!(!handles.contains(&handle));
}

#[test]
fn sleepy_device_wakes_once_for_many_subscriptions() {
    let mut scheduler = SynchronizedReportScheduler::new(
        SchedulerConfig::sleepy_device(),
        ManualTimer::new(Timestamp::ZERO),
        RunFlag::new(),
    )
    .unwrap();
    let handles: Vec<_> = [(1_000, 10_000), (2_000, 12_000), (5_000, 30_000)]
        .iter()
        .map(|(min, max)| scheduler.on_subscription_established(intervals(*min, *max)).unwrap())
        .collect();

    let sent = simulate(&mut scheduler, &handles, Vec::new(), Timestamp::from_millis(10_000));

    // All three share the wake at the first maximum.
    assert_eq!(scheduler.engine().runs(), 1);
    for handle in &handles {
        assert_eq!(sent[handle], vec![Timestamp::from_millis(10_000)]);
    }
}

// ============================================================================
// Property: common_min <= common_max and common_max >= now
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_common_bounds_hold(
        nodes in prop::collection::vec((interval_strategy(), any::<bool>()), 1..8),
        now_ms in 0u64..20_000,
    ) {
        let mut scheduler = scheduler();
        for ((min, max), changed) in &nodes {
            let handle = scheduler.on_subscription_established(intervals(*min, *max)).unwrap();
            if *changed {
                scheduler.on_became_reportable(handle).unwrap();
            }
        }

        let now = Timestamp::from_millis(now_ms);
        let timeout = scheduler.calculate_next_report_timeout(now).unwrap();

        prop_assert!(scheduler.common_max_timestamp() > now);
        prop_assert!(scheduler.common_min_timestamp() >= now);
        prop_assert!(scheduler.common_min_timestamp() <= scheduler.common_max_timestamp());
        prop_assert!(now + timeout <= scheduler.common_max_timestamp());
    }
}

// ============================================================================
// Property: Report gaps stay within [min, max]
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_report_gaps_respect_intervals(
        nodes in prop::collection::vec(interval_strategy(), 1..6),
        changes in prop::collection::vec((0u64..30_000, 0usize..6), 0..20),
    ) {
        let mut scheduler = scheduler();
        let handles: Vec<_> = nodes
            .iter()
            .map(|(min, max)| scheduler.on_subscription_established(intervals(*min, *max)).unwrap())
            .collect();

        let horizon = Timestamp::from_millis(30_000);
        let sent = simulate(&mut scheduler, &handles, changes, horizon);

        for (handle, (min, max)) in handles.iter().zip(&nodes) {
            let reports = sent.get(handle).cloned().unwrap_or_default();
            let mut previous = Timestamp::ZERO;
            for at in &reports {
                let gap = at.saturating_duration_since(previous).as_millis() as u64;
                prop_assert!(gap >= *min, "gap {} below min {} for {}", gap, min, handle);
                prop_assert!(gap <= *max, "gap {} above max {} for {}", gap, max, handle);
                previous = *at;
            }
            // Silence after the last report is bounded too.
            let tail = horizon.saturating_duration_since(previous).as_millis() as u64;
            prop_assert!(tail <= *max, "silent for {} past max {} for {}", tail, max, handle);
        }
    }
}
