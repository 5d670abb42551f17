//! Seams between the scheduler and the outside world
//!
//! The scheduler owns exactly one timer and talks to one reporting engine. Both are
//! traits so the same scheduler runs against a tokio clock in the manager crate and
//! against [`ManualTimer`] in tests.

use std::time::Duration;

use crate::error::TimerError;
use crate::timestamp::Timestamp;

/// Clock and single-shot timer used by the scheduler.
///
/// The owner of the timer calls
/// [`SynchronizedReportScheduler::timer_fired`](crate::SynchronizedReportScheduler::timer_fired)
/// once the armed timeout elapses.
pub trait TimerDelegate {
    /// Current monotonic time.
    fn now(&self) -> Timestamp;

    /// Arm the timer, replacing any previous deadline.
    fn start_timer(&mut self, timeout: Duration) -> Result<(), TimerError>;

    /// Disarm the timer. No-op if it is not armed.
    fn cancel_timer(&mut self);

    fn is_timer_active(&self) -> bool;
}

/// The reporting engine the scheduler wakes up.
pub trait ReportEngine {
    /// Request a reporting run as soon as possible.
    fn schedule_run(&mut self);
}

/// Hand-driven clock and timer.
#[derive(Debug, Default, Clone)]
pub struct ManualTimer {
    now: Timestamp,
    deadline: Option<Timestamp>,
    fail_next_start: Option<TimerError>,
    starts: usize,
}

impl ManualTimer {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now,
            ..Self::default()
        }
    }

    pub fn advance(&mut self, by: Duration) {
        self.now = self.now + by;
    }

    pub fn set_now(&mut self, now: Timestamp) {
        self.now = now;
    }

    /// When the armed timer expires.
    pub fn deadline(&self) -> Option<Timestamp> {
        self.deadline
    }

    /// Number of successful `start_timer` calls.
    pub fn starts(&self) -> usize {
        self.starts
    }

    /// Make the next `start_timer` call fail with `error`.
    pub fn fail_next_start(&mut self, error: TimerError) {
        self.fail_next_start = Some(error);
    }

    /// Disarm and return `true` if the deadline has passed.
    pub fn take_due(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if self.now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

impl TimerDelegate for ManualTimer {
    fn now(&self) -> Timestamp {
        self.now
    }

    fn start_timer(&mut self, timeout: Duration) -> Result<(), TimerError> {
        if let Some(error) = self.fail_next_start.take() {
            return Err(error);
        }
        self.deadline = Some(self.now + timeout);
        self.starts += 1;
        Ok(())
    }

    fn cancel_timer(&mut self) {
        self.deadline = None;
    }

    fn is_timer_active(&self) -> bool {
        self.deadline.is_some()
    }
}

/// Engine that records run requests until they are taken.
#[derive(Debug, Default, Clone)]
pub struct RunFlag {
    pending: bool,
    runs: usize,
}

impl RunFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Clear the pending request, returning whether one was set.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    /// Total run requests received.
    pub fn runs(&self) -> usize {
        self.runs
    }
}

impl ReportEngine for RunFlag {
    fn schedule_run(&mut self) {
        self.pending = true;
        self.runs += 1;
    }
}
