//! # report-scheduler
//!
//! Decides when the next batch of attribute reports goes out for a population of
//! subscriptions that share one timer.
//!
//! Every subscription negotiated a minimum interval (never report faster than this)
//! and a maximum interval (never stay silent longer than this). Arming one timer per
//! subscription does not scale and wakes a power-constrained device far too often, so
//! the [`SynchronizedReportScheduler`] reconciles all of them into a single fire time:
//!
//! - the **common maximum** is the earliest maximum deadline still in the future,
//! - the **common minimum** is the latest minimum among subscriptions with something
//!   to report, capped by the common maximum,
//! - when the timer fires, every subscription whose minimum has elapsed is folded into
//!   the same reporting run.
//!
//! ## Architecture
//!
//! ```text
//! SynchronizedReportScheduler<T, E>
//!     │
//!     ├── timer: T: TimerDelegate      (one timer, external clock)
//!     ├── engine: E: ReportEngine      (signalled "run now")
//!     └── nodes: NodePool              (fixed capacity, stable handles)
//!             │
//!             └── SubscriptionNode { intervals, min/max timestamps, NodeState }
//! ```
//!
//! All operations run on one logical task. The only suspension point is the wait
//! between arming the timer and [`SynchronizedReportScheduler::timer_fired`].

pub mod config;
pub mod error;
pub mod node;
pub mod pool;
pub mod scheduler;
pub mod timer;
pub mod timestamp;

pub use config::SchedulerConfig;
pub use error::{Result, SchedulerError, TimerError};
pub use node::{NodeState, ReportingIntervals, SubscriptionNode};
pub use pool::{NodeHandle, NodePool};
pub use scheduler::{SchedulerPhase, SynchronizedReportScheduler};
pub use timer::{ManualTimer, ReportEngine, RunFlag, TimerDelegate};
pub use timestamp::Timestamp;
