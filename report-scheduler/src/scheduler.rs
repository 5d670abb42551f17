//! The synchronized report scheduler
//!
//! One timer serves every subscription. Each time the set of nodes changes, the
//! scheduler reconciles their intervals into a common minimum and a common maximum
//! and arms the timer for the earliest point at which a report is owed. When the
//! timer fires, every node whose minimum has elapsed joins the same reporting run,
//! so a sleepy device wakes once for many subscriptions.

use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};
use crate::node::{NodeState, ReportingIntervals, SubscriptionNode};
use crate::pool::{NodeHandle, NodePool};
use crate::timer::{ReportEngine, TimerDelegate};
use crate::timestamp::Timestamp;

/// Lifecycle of the scheduler as a whole.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SchedulerPhase {
    /// No timer armed
    Idle,
    /// Timer running toward the next report
    Armed,
    /// Timer callback executing
    Fired,
}

/// Coordinates the reporting deadlines of many subscriptions with a single timer.
///
/// The scheduler is owned by whoever establishes and tears down subscriptions and
/// is driven from one task: the owner forwards subscription lifecycle events and
/// calls [`timer_fired`](Self::timer_fired) when the armed timeout elapses.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use report_scheduler::{
///     ManualTimer, ReportingIntervals, RunFlag, SchedulerConfig,
///     SynchronizedReportScheduler, Timestamp,
/// };
///
/// let mut scheduler = SynchronizedReportScheduler::new(
///     SchedulerConfig::default(),
///     ManualTimer::new(Timestamp::ZERO),
///     RunFlag::new(),
/// )?;
///
/// let node = scheduler.on_subscription_established(ReportingIntervals::new(
///     Duration::from_millis(100),
///     Duration::from_millis(500),
/// )?)?;
/// assert!(scheduler.is_report_scheduled());
/// assert_eq!(scheduler.next_report_timestamp(), Some(Timestamp::from_millis(500)));
///
/// scheduler.timer_mut().advance(Duration::from_millis(500));
/// scheduler.timer_fired()?;
/// assert!(scheduler.engine_mut().take());
/// assert_eq!(scheduler.ready_nodes().collect::<Vec<_>>(), vec![node]);
/// # Ok::<(), report_scheduler::SchedulerError>(())
/// ```
#[derive(Debug)]
pub struct SynchronizedReportScheduler<T, E> {
    config: SchedulerConfig,
    nodes: NodePool,
    timer: T,
    engine: E,
    next_min_timestamp: Timestamp,
    next_max_timestamp: Timestamp,
    next_report_timestamp: Option<Timestamp>,
    firing: bool,
}

impl<T: TimerDelegate, E: ReportEngine> SynchronizedReportScheduler<T, E> {
    /// Create a scheduler after validating `config`.
    pub fn new(config: SchedulerConfig, timer: T, engine: E) -> Result<Self> {
        config.validate()?;
        let nodes = NodePool::with_capacity(config.node_capacity);
        Ok(Self {
            config,
            nodes,
            timer,
            engine,
            next_min_timestamp: Timestamp::ZERO,
            next_max_timestamp: Timestamp::ZERO,
            next_report_timestamp: None,
            firing: false,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn phase(&self) -> SchedulerPhase {
        if self.firing {
            SchedulerPhase::Fired
        } else if self.timer.is_timer_active() {
            SchedulerPhase::Armed
        } else {
            SchedulerPhase::Idle
        }
    }

    pub fn is_report_scheduled(&self) -> bool {
        self.timer.is_timer_active()
    }

    /// Common minimum from the last recomputation.
    pub fn common_min_timestamp(&self) -> Timestamp {
        self.next_min_timestamp
    }

    /// Common maximum from the last recomputation.
    pub fn common_max_timestamp(&self) -> Timestamp {
        self.next_max_timestamp
    }

    /// When the armed timer is expected to fire.
    pub fn next_report_timestamp(&self) -> Option<Timestamp> {
        self.next_report_timestamp
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&SubscriptionNode> {
        self.nodes.get(handle)
    }

    /// Nodes the engine should generate a report for.
    pub fn ready_nodes(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| node.state() == NodeState::ReadyNow)
            .map(|(handle, _)| handle)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Arm the timer for `timeout`, or fire right away when it is zero.
    pub fn schedule_report(&mut self, timeout: Duration, now: Timestamp) -> Result<()> {
        self.timer.cancel_timer();

        if timeout.is_zero() {
            self.next_report_timestamp = None;
            return self.timer_fired();
        }

        if let Err(e) = self.timer.start_timer(timeout) {
            self.next_report_timestamp = None;
            warn!("Failed to arm report timer for {:?}: {}", timeout, e);
            return Err(e.into());
        }
        self.next_report_timestamp = Some(now + timeout);
        debug!("Report timer armed for {:?} (fires at {})", timeout, now + timeout);
        Ok(())
    }

    pub fn cancel_report(&mut self) {
        self.timer.cancel_timer();
        self.next_report_timestamp = None;
    }

    /// Smallest node maximum strictly after `now`, bounded by the configured ceiling.
    pub fn find_next_max_interval(&mut self, now: Timestamp) -> Result<Timestamp> {
        if self.nodes.is_empty() {
            return Err(SchedulerError::EmptyPool);
        }

        let mut earliest = now + self.config.max_interval_ceiling;
        for (_, node) in self.nodes.iter() {
            let max = node.max_timestamp();
            if max > now && max < earliest {
                earliest = max;
            }
        }

        self.next_max_timestamp = earliest;
        Ok(earliest)
    }

    /// Largest minimum among nodes that will have something to report by then,
    /// never past the common maximum. Falls back to `now`.
    pub fn find_next_min_interval(&mut self, now: Timestamp) -> Result<Timestamp> {
        if self.nodes.is_empty() {
            return Err(SchedulerError::EmptyPool);
        }

        let mut latest = now;
        for (_, node) in self.nodes.iter() {
            let min = node.min_timestamp();
            if min > latest && min <= self.next_max_timestamp && node.is_reportable_now(min) {
                latest = min;
            }
        }

        self.next_min_timestamp = latest;
        Ok(latest)
    }

    pub fn calculate_next_report_timeout(&mut self, now: Timestamp) -> Result<Duration> {
        let next_max = self.find_next_max_interval(now)?;
        let next_min = self.find_next_min_interval(now)?;

        let mut reportable_at_min = false;
        for (_, node) in self.nodes.iter() {
            if node.is_engine_run_scheduled() {
                continue;
            }
            if node.is_reportable_now(now) {
                trace!("Node reportable now, firing immediately");
                return Ok(Duration::ZERO);
            }
            if node.is_reportable_now(next_min) {
                reportable_at_min = true;
            }
        }

        let target = if reportable_at_min { next_min } else { next_max };
        Ok(target.saturating_duration_since(now))
    }

    /// Handle the timer elapsing.
    ///
    /// Every node past its minimum joins the run. If no node turned out to be due,
    /// the timer fired early and is re-armed without waking the engine.
    pub fn timer_fired(&mut self) -> Result<()> {
        let now = self.timer.now();
        self.firing = true;
        self.next_report_timestamp = None;

        let mut fired_early = true;
        for (handle, node) in self.nodes.iter_mut() {
            if node.min_timestamp() <= now || node.is_reportable_now(now) {
                node.schedule_engine_run();
            }
            if node.state() == NodeState::ReadyNow {
                trace!("Node {} joins reporting run at {}", handle, now);
                fired_early = false;
            }
        }

        let result = if self.nodes.is_empty() {
            debug!("Report timer fired with no subscriptions");
            Ok(())
        } else if fired_early {
            debug!("Report timer fired early at {}, rescheduling", now);
            self.reschedule(now)
        } else {
            debug!("Report timer fired at {}, scheduling engine run", now);
            self.engine.schedule_run();
            Ok(())
        };

        self.firing = false;
        result
    }

    /// Register a new subscription and re-arm the timer around it.
    pub fn on_subscription_established(
        &mut self,
        intervals: ReportingIntervals,
    ) -> Result<NodeHandle> {
        if intervals.max() > self.config.max_interval_ceiling {
            return Err(SchedulerError::InvalidIntervals(format!(
                "maximum {:?} exceeds ceiling {:?}",
                intervals.max(),
                self.config.max_interval_ceiling
            )));
        }

        let now = self.timer.now();
        let handle = self.nodes.insert(SubscriptionNode::new(intervals, now))?;
        debug!(
            "Subscription node {} established (min {:?}, max {:?})",
            handle,
            intervals.min(),
            intervals.max()
        );

        if let Err(e) = self.reschedule(now) {
            self.nodes.remove(handle);
            return Err(e);
        }
        Ok(handle)
    }

    /// Data covered by the subscription changed.
    pub fn on_became_reportable(&mut self, handle: NodeHandle) -> Result<()> {
        self.node_mut(handle)?.mark_changed();
        let now = self.timer.now();
        self.reschedule(now)
    }

    pub fn on_report_started(&mut self, handle: NodeHandle, chunked: bool) -> Result<()> {
        self.node_mut(handle)?.start_report(chunked)?;
        trace!("Node {} report started (chunked: {})", handle, chunked);
        Ok(())
    }

    /// The subscriber acknowledged one chunk; the next goes out without waiting.
    pub fn on_report_chunk_acknowledged(&mut self, handle: NodeHandle) -> Result<()> {
        self.node_mut(handle)?.require_chunked()?;
        self.engine.schedule_run();
        Ok(())
    }

    /// The final message of a report was delivered.
    pub fn on_subscription_report_sent(&mut self, handle: NodeHandle) -> Result<()> {
        let now = self.timer.now();
        self.node_mut(handle)?.finish_report(now)?;
        debug!("Node {} report sent at {}", handle, now);
        self.reschedule(now)
    }

    pub fn on_read_handler_destroyed(&mut self, handle: NodeHandle) -> Result<()> {
        self.nodes
            .remove(handle)
            .ok_or(SchedulerError::UnknownNode(handle))?;
        debug!("Subscription node {} removed ({} left)", handle, self.nodes.len());

        if self.nodes.is_empty() {
            self.cancel_report();
        }
        Ok(())
    }

    /// The device is about to sleep at `now`. Fire at once if the pending report is
    /// close enough that waking again for it would be wasteful.
    pub fn on_transition_to_idle(&mut self, now: Timestamp) -> Result<()> {
        let Some(next_report) = self.next_report_timestamp else {
            return Ok(());
        };
        if !self.timer.is_timer_active() {
            return Ok(());
        }

        if now <= self.next_min_timestamp {
            return Ok(());
        }

        if next_report.saturating_duration_since(now) < self.config.idle_fire_window {
            debug!("Firing report at {} ahead of idle transition", now);
            self.cancel_report();
            return self.timer_fired();
        }
        Ok(())
    }

    /// The device woke from idle mode. Nodes past their minimum report in this
    /// wake window.
    pub fn on_enter_active_mode(&mut self) -> Result<()> {
        if self.nodes.is_empty() {
            return Ok(());
        }

        let now = self.timer.now();
        for (_, node) in self.nodes.iter_mut() {
            if node.min_timestamp() <= now {
                node.mark_changed();
            }
        }
        self.reschedule(now)
    }

    fn node_mut(&mut self, handle: NodeHandle) -> Result<&mut SubscriptionNode> {
        self.nodes
            .get_mut(handle)
            .ok_or(SchedulerError::UnknownNode(handle))
    }

    fn reschedule(&mut self, now: Timestamp) -> Result<()> {
        if self.nodes.is_empty() {
            self.cancel_report();
            return Ok(());
        }
        let timeout = self.calculate_next_report_timeout(now)?;
        self.schedule_report(timeout, now)
    }
}
