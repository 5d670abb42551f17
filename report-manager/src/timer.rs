//! Scheduler timer backed by the tokio clock

use std::time::Duration;

use report_scheduler::{TimerDelegate, TimerError, Timestamp};
use tokio::time::Instant;

/// Single-shot timer whose deadline the worker loop sleeps on.
///
/// Timestamps count milliseconds since the timer was created.
#[derive(Debug)]
pub struct TokioTimer {
    origin: Instant,
    deadline: Option<Instant>,
}

impl TokioTimer {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            deadline: None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarm if the deadline has passed, returning whether it had.
    pub fn take_expired(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for TokioTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerDelegate for TokioTimer {
    fn now(&self) -> Timestamp {
        let elapsed = self.origin.elapsed().as_millis();
        Timestamp::from_millis(u64::try_from(elapsed).unwrap_or(u64::MAX))
    }

    fn start_timer(&mut self, timeout: Duration) -> Result<(), TimerError> {
        let deadline = Instant::now()
            .checked_add(timeout)
            .ok_or_else(|| TimerError::ArmFailed(format!("timeout {:?} overflows", timeout)))?;
        self.deadline = Some(deadline);
        Ok(())
    }

    fn cancel_timer(&mut self) {
        self.deadline = None;
    }

    fn is_timer_active(&self) -> bool {
        self.deadline.is_some()
    }
}

/// Sleep until `deadline`, or forever when there is none.
pub(crate) async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
