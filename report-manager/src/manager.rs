//! Sync-first report manager
//!
//! Provides a fully synchronous API for running subscriptions over a shared data
//! model. Scheduling runs in a background worker thread.

use std::collections::BTreeSet;
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use attribute_path::{validate_all, AttributePathParams};
use im_data_model::ConcreteAttributePath;
use parking_lot::{Mutex, RwLock};
use report_scheduler::ReportingIntervals;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::ManagerConfig;
use crate::error::{ManagerError, Result};
use crate::iter::ReportIterator;
use crate::subscription::{ReportBatch, SubscriptionId};
use crate::worker::{spawn_report_worker, Command, ReportWorker, SharedDataModel};

/// Sync-first manager for attribute subscriptions
///
/// All methods are non-async. Reports are consumed through [`ReportManager::iter`].
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use attribute_path::AttributePathParams;
/// use im_data_model::{ConcreteAttributePath, InMemoryDataModel};
/// use report_manager::ReportManager;
/// use report_scheduler::ReportingIntervals;
///
/// let model = Arc::new(InMemoryDataModel::new().with_cluster(1, 6, [0, 1]));
/// let manager = ReportManager::new(model)?;
///
/// let id = manager.subscribe(
///     vec![AttributePathParams::wildcard().with_endpoint(1)],
///     ReportingIntervals::from_secs(1, 60)?,
/// )?;
/// manager.attribute_changed(ConcreteAttributePath::new(1, 6, 0))?;
///
/// for batch in manager.iter() {
///     println!("{} reported {} paths", batch.subscription, batch.paths.len());
///     if batch.more_chunks {
///         manager.chunk_acknowledged(batch.subscription)?;
///     } else {
///         manager.report_delivered(batch.subscription)?;
///     }
/// }
/// # let _ = id;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ReportManager {
    /// Send commands to background worker
    command_tx: UnboundedSender<Command>,

    /// Receive report batches from background worker
    report_rx: Arc<Mutex<mpsc::Receiver<ReportBatch>>>,

    /// Subscriptions established through this manager (sync access)
    active: Arc<RwLock<BTreeSet<SubscriptionId>>>,

    /// Background worker handle (kept alive)
    _worker: JoinHandle<()>,
}

impl ReportManager {
    /// Create a new ReportManager with default configuration
    pub fn new(model: SharedDataModel) -> Result<Self> {
        Self::with_config(model, ManagerConfig::default())
    }

    /// Create a new ReportManager with custom configuration
    pub fn with_config(model: SharedDataModel, config: ManagerConfig) -> Result<Self> {
        let (command_tx, command_rx) = tokio::sync::mpsc::unbounded_channel();
        let (report_tx, report_rx) = mpsc::channel();

        let worker = ReportWorker::new(config, model, report_tx)?;
        let handle = spawn_report_worker(worker, command_rx);

        Ok(Self {
            command_tx,
            report_rx: Arc::new(Mutex::new(report_rx)),
            active: Arc::new(RwLock::new(BTreeSet::new())),
            _worker: handle,
        })
    }

    /// Establish a subscription over `paths`
    ///
    /// The path list is validated before anything reaches the scheduler.
    pub fn subscribe(
        &self,
        paths: Vec<AttributePathParams>,
        intervals: ReportingIntervals,
    ) -> Result<SubscriptionId> {
        validate_all(&paths)?;

        let (reply, response) = mpsc::channel();
        self.send(Command::Subscribe {
            paths,
            intervals,
            reply,
        })?;
        let id = response
            .recv()
            .map_err(|_| ManagerError::WorkerDisconnected)??;

        self.active.write().insert(id);
        tracing::debug!("Subscribed {}", id);
        Ok(id)
    }

    /// Tear down a subscription
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        let (reply, response) = mpsc::channel();
        self.send(Command::Unsubscribe { id, reply })?;
        response
            .recv()
            .map_err(|_| ManagerError::WorkerDisconnected)??;

        self.active.write().remove(&id);
        Ok(())
    }

    /// Notify every subscription covering `path` that its data changed
    pub fn attribute_changed(&self, path: ConcreteAttributePath) -> Result<()> {
        self.send(Command::AttributeChanged { path })
    }

    /// The final chunk of the current report reached the subscriber
    pub fn report_delivered(&self, id: SubscriptionId) -> Result<()> {
        self.send(Command::ReportDelivered { id })
    }

    /// The subscriber acknowledged a chunk marked `more_chunks`
    pub fn chunk_acknowledged(&self, id: SubscriptionId) -> Result<()> {
        self.send(Command::ChunkAcknowledged { id })
    }

    /// The device is about to enter idle mode
    pub fn transition_to_idle(&self) -> Result<()> {
        self.send(Command::TransitionToIdle)
    }

    /// The device woke from idle mode
    pub fn enter_active_mode(&self) -> Result<()> {
        self.send(Command::EnterActiveMode)
    }

    /// Get a blocking iterator over report batches
    pub fn iter(&self) -> ReportIterator {
        ReportIterator::new(Arc::clone(&self.report_rx))
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.active.read().contains(&id)
    }

    pub fn subscription_count(&self) -> usize {
        self.active.read().len()
    }

    /// Shutdown the background worker
    ///
    /// Called automatically on drop.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(Command::Shutdown);
    }

    fn send(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| ManagerError::WorkerDisconnected)
    }
}

impl Drop for ReportManager {
    fn drop(&mut self) {
        tracing::debug!(
            "ReportManager dropping, {} active subscriptions",
            self.active.read().len()
        );

        let _ = self.command_tx.send(Command::Shutdown);
    }
}
