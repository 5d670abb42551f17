//! # Report Manager
//!
//! A sync-first runtime that turns subscriptions over a live data model into a
//! stream of report batches, paced by the synchronized report scheduler.
//!
//! ## Overview
//!
//! Applications hand the manager a shared [`DataModel`], establish subscriptions with
//! path specifiers and reporting intervals, and tell it when attribute values change.
//! A background worker owns the scheduler and its timer; whenever the scheduler says
//! reports are due it expands each due subscription's paths and emits one
//! [`ReportBatch`] per subscription. Large reports are split into chunks that the
//! subscriber acknowledges one at a time.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use report_manager::prelude::*;
//!
//! let model = Arc::new(InMemoryDataModel::new().with_cluster(1, 6, [0, 1]));
//! let manager = ReportManager::with_config(model, ManagerConfig::sleepy_device())?;
//!
//! manager.subscribe(
//!     vec![AttributePathParams::wildcard().with_endpoint(1).with_cluster(6)],
//!     ReportingIntervals::from_secs(2, 30)?,
//! )?;
//!
//! let reports = manager.iter();
//! while let Some(batch) = reports.recv() {
//!     manager.report_delivered(batch.subscription)?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ReportManager (sync facade)
//!     │  Command ──► tokio mpsc
//!     ▼
//! worker thread (current-thread tokio runtime)
//!     ├── SynchronizedReportScheduler<TokioTimer, RunFlag>
//!     ├── SubscriptionTable
//!     └── AttributePathExpandIterator over the shared DataModel
//!     │  ReportBatch ──► std mpsc
//!     ▼
//! ReportIterator (blocking / try / timeout)
//! ```

pub mod config;
pub mod error;
pub mod iter;
pub mod logging;
pub mod manager;
pub mod report;
pub mod subscription;
pub mod timer;
pub mod worker;

pub use config::ManagerConfig;
pub use error::{ManagerError, Result};
pub use iter::ReportIterator;
pub use manager::ReportManager;
pub use subscription::{ReportBatch, SubscriptionId};
pub use timer::TokioTimer;
pub use worker::SharedDataModel;

// Re-export commonly used types from dependencies
pub use attribute_path::AttributePathParams;
pub use im_data_model::{ConcreteAttributePath, DataModel, InMemoryDataModel};
pub use report_scheduler::{ReportingIntervals, SchedulerConfig};

/// Prelude module for convenient imports
///
/// ```rust
/// use report_manager::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AttributePathParams, ConcreteAttributePath, DataModel, InMemoryDataModel, ManagerConfig,
        ManagerError, ReportBatch, ReportIterator, ReportManager, ReportingIntervals, Result,
        SchedulerConfig, SubscriptionId,
    };
}
