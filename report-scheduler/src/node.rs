//! Per-subscription scheduling record.

use std::time::Duration;

use crate::error::{Result, SchedulerError};
use crate::timestamp::Timestamp;

/// Minimum and maximum reporting intervals negotiated for a subscription.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ReportingIntervals {
    min: Duration,
    max: Duration,
}

impl ReportingIntervals {
    /// Create intervals, rejecting `min > max`.
    pub fn new(min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            return Err(SchedulerError::InvalidIntervals(format!(
                "minimum {:?} exceeds maximum {:?}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    /// Intervals as carried on the wire, in whole seconds.
    pub fn from_secs(min: u16, max: u16) -> Result<Self> {
        Self::new(
            Duration::from_secs(u64::from(min)),
            Duration::from_secs(u64::from(max)),
        )
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }
}

/// Where a subscription is in its reporting cycle.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum NodeState {
    /// Nothing to report; only the maximum interval makes it due.
    Idle,
    /// Data changed; due as soon as the minimum interval has elapsed.
    PendingMin,
    /// The reporting engine has been asked to run for this node.
    ReadyNow,
    /// A report is being generated and sent.
    InFlight {
        /// The report spans several messages
        chunked: bool,
        /// Data changed after generation started
        changed: bool,
    },
}

/// Scheduling record for one active subscription.
#[derive(Debug, Clone)]
pub struct SubscriptionNode {
    intervals: ReportingIntervals,
    min_timestamp: Timestamp,
    max_timestamp: Timestamp,
    state: NodeState,
}

impl SubscriptionNode {
    pub(crate) fn new(intervals: ReportingIntervals, now: Timestamp) -> Self {
        let mut node = Self {
            intervals,
            min_timestamp: now,
            max_timestamp: now,
            state: NodeState::Idle,
        };
        node.set_interval_timestamps(now);
        node
    }

    pub fn intervals(&self) -> ReportingIntervals {
        self.intervals
    }

    /// No report may go out before this time.
    pub fn min_timestamp(&self) -> Timestamp {
        self.min_timestamp
    }

    /// A report must go out by this time.
    pub fn max_timestamp(&self) -> Timestamp {
        self.max_timestamp
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Whether this node would be reported if the engine ran at `now`.
    pub fn is_reportable_now(&self, now: Timestamp) -> bool {
        match self.state {
            NodeState::Idle => now >= self.max_timestamp,
            NodeState::PendingMin => now >= self.min_timestamp,
            NodeState::ReadyNow => true,
            NodeState::InFlight { .. } => false,
        }
    }

    /// Engine run already scheduled, or the report already underway.
    pub fn is_engine_run_scheduled(&self) -> bool {
        matches!(self.state, NodeState::ReadyNow | NodeState::InFlight { .. })
    }

    pub fn is_chunked_report(&self) -> bool {
        matches!(self.state, NodeState::InFlight { chunked: true, .. })
    }

    fn set_interval_timestamps(&mut self, now: Timestamp) {
        self.min_timestamp = now + self.intervals.min;
        self.max_timestamp = now + self.intervals.max;
    }

    pub(crate) fn mark_changed(&mut self) {
        self.state = match self.state {
            NodeState::Idle => NodeState::PendingMin,
            NodeState::InFlight { chunked, .. } => NodeState::InFlight {
                chunked,
                changed: true,
            },
            other => other,
        };
    }

    /// Fold into a reporting run. No-op for a report already underway.
    pub(crate) fn schedule_engine_run(&mut self) {
        if matches!(self.state, NodeState::Idle | NodeState::PendingMin) {
            self.state = NodeState::ReadyNow;
        }
    }

    pub(crate) fn start_report(&mut self, chunked: bool) -> Result<()> {
        self.state = match self.state {
            NodeState::ReadyNow => NodeState::InFlight {
                chunked,
                changed: false,
            },
            // Next message of a report that already spans several.
            NodeState::InFlight {
                chunked: true,
                changed,
            } => NodeState::InFlight { chunked, changed },
            other => {
                return Err(SchedulerError::InvalidTransition(format!(
                    "cannot start a report from {:?}",
                    other
                )))
            }
        };
        Ok(())
    }

    pub(crate) fn require_chunked(&self) -> Result<()> {
        if self.is_chunked_report() {
            Ok(())
        } else {
            Err(SchedulerError::InvalidTransition(format!(
                "no chunked report in progress ({:?})",
                self.state
            )))
        }
    }

    pub(crate) fn finish_report(&mut self, now: Timestamp) -> Result<()> {
        let NodeState::InFlight { changed, .. } = self.state else {
            return Err(SchedulerError::InvalidTransition(format!(
                "no report in progress ({:?})",
                self.state
            )));
        };
        self.state = if changed {
            NodeState::PendingMin
        } else {
            NodeState::Idle
        };
        self.set_interval_timestamps(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(min: u64, max: u64, now: u64) -> SubscriptionNode {
        let intervals =
            ReportingIntervals::new(Duration::from_millis(min), Duration::from_millis(max)).unwrap();
        SubscriptionNode::new(intervals, Timestamp::from_millis(now))
    }

    #[test]
    fn test_intervals_validation() {
        assert!(ReportingIntervals::from_secs(10, 5).is_err());
        let intervals = ReportingIntervals::from_secs(0, 60).unwrap();
        assert_eq!(intervals.min(), Duration::ZERO);
        assert_eq!(intervals.max(), Duration::from_secs(60));
    }

    #[test]
    fn test_timestamps_from_establishment() {
        let node = node(100, 500, 1_000);
        assert_eq!(node.min_timestamp(), Timestamp::from_millis(1_100));
        assert_eq!(node.max_timestamp(), Timestamp::from_millis(1_500));
        assert_eq!(node.state(), NodeState::Idle);
    }

    #[test]
    fn test_idle_reportable_only_at_max() {
        let node = node(100, 500, 0);
        assert!(!node.is_reportable_now(Timestamp::from_millis(200)));
        assert!(node.is_reportable_now(Timestamp::from_millis(500)));
    }

    #[test]
    fn test_change_reportable_after_min() {
        let mut node = node(100, 500, 0);
        node.mark_changed();
        assert_eq!(node.state(), NodeState::PendingMin);
        assert!(!node.is_reportable_now(Timestamp::from_millis(99)));
        assert!(node.is_reportable_now(Timestamp::from_millis(100)));
    }

    #[test]
    fn test_report_cycle() {
        let mut node = node(100, 500, 0);
        node.schedule_engine_run();
        assert!(node.is_engine_run_scheduled());

        node.start_report(false).unwrap();
        assert!(!node.is_reportable_now(Timestamp::from_millis(10_000)));
        assert!(node.is_engine_run_scheduled());

        node.finish_report(Timestamp::from_millis(600)).unwrap();
        assert_eq!(node.state(), NodeState::Idle);
        assert_eq!(node.min_timestamp(), Timestamp::from_millis(700));
        assert_eq!(node.max_timestamp(), Timestamp::from_millis(1_100));
    }

    #[test]
    fn test_change_during_flight_is_kept() {
        let mut node = node(100, 500, 0);
        node.schedule_engine_run();
        node.start_report(true).unwrap();
        node.mark_changed();
        assert!(node.is_chunked_report());

        // Final chunk.
        node.start_report(false).unwrap();
        assert!(node.require_chunked().is_err());
        node.finish_report(Timestamp::from_millis(50)).unwrap();
        assert_eq!(node.state(), NodeState::PendingMin);
    }

    #[test]
    fn test_invalid_transitions() {
        let mut node = node(100, 500, 0);
        assert!(node.start_report(false).is_err());
        assert!(node.finish_report(Timestamp::ZERO).is_err());
        assert!(node.require_chunked().is_err());

        node.schedule_engine_run();
        node.start_report(false).unwrap();
        // A single-message report cannot take another message.
        assert!(node.start_report(true).is_err());
    }
}
