//! Background worker thread for report scheduling
//!
//! The worker owns the scheduler, the subscription table and a single-threaded
//! tokio runtime. It sleeps until either a command arrives from the sync
//! ReportManager or the scheduler's timer deadline passes.

use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use attribute_path::AttributePathParams;
use im_data_model::{ConcreteAttributePath, DataModel};
use report_scheduler::{
    ReportingIntervals, RunFlag, SynchronizedReportScheduler, TimerDelegate,
};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::ManagerConfig;
use crate::error::{ManagerError, Result};
use crate::report::next_chunk;
use crate::subscription::{ReportBatch, Subscription, SubscriptionId, SubscriptionTable};
use crate::timer::{sleep_until, TokioTimer};

/// Data model shared between the application and the worker
pub type SharedDataModel = Arc<dyn DataModel + Send + Sync>;

/// Commands sent from the sync ReportManager to the background worker
#[derive(Debug)]
pub enum Command {
    /// Register a subscription and reply with its id
    Subscribe {
        paths: Vec<AttributePathParams>,
        intervals: ReportingIntervals,
        reply: mpsc::Sender<Result<SubscriptionId>>,
    },
    /// Tear down a subscription
    Unsubscribe {
        id: SubscriptionId,
        reply: mpsc::Sender<Result<()>>,
    },
    /// An attribute value changed
    AttributeChanged { path: ConcreteAttributePath },
    /// The final chunk of a report reached the subscriber
    ReportDelivered { id: SubscriptionId },
    /// The subscriber acknowledged a non-final chunk
    ChunkAcknowledged { id: SubscriptionId },
    /// The device is about to enter idle mode
    TransitionToIdle,
    /// The device woke from idle mode
    EnterActiveMode,
    /// Shutdown the worker
    Shutdown,
}

type Scheduler = SynchronizedReportScheduler<TokioTimer, RunFlag>;

/// State owned by the worker thread
pub(crate) struct ReportWorker {
    scheduler: Scheduler,
    subscriptions: SubscriptionTable,
    model: SharedDataModel,
    max_paths_per_chunk: usize,
    report_tx: mpsc::Sender<ReportBatch>,
}

impl ReportWorker {
    pub(crate) fn new(
        config: ManagerConfig,
        model: SharedDataModel,
        report_tx: mpsc::Sender<ReportBatch>,
    ) -> Result<Self> {
        config.validate()?;
        let scheduler =
            SynchronizedReportScheduler::new(config.scheduler, TokioTimer::new(), RunFlag::new())?;

        Ok(Self {
            scheduler,
            subscriptions: SubscriptionTable::default(),
            model,
            max_paths_per_chunk: config.max_paths_per_chunk,
            report_tx,
        })
    }

    /// Main loop running inside the tokio runtime
    async fn run(mut self, mut command_rx: UnboundedReceiver<Command>) {
        tracing::info!("Report worker started");

        loop {
            if self.scheduler.engine_mut().take() && !self.run_reporting_pass() {
                tracing::debug!("Report receiver dropped, shutting down worker");
                break;
            }

            let deadline = self.scheduler.timer().deadline();
            tokio::select! {
                command = command_rx.recv() => {
                    match command {
                        Some(Command::Shutdown) => {
                            tracing::info!("Worker received shutdown command");
                            break;
                        }
                        Some(command) => self.handle_command(command),
                        None => {
                            tracing::debug!("Command channel closed, shutting down worker");
                            break;
                        }
                    }
                }

                _ = sleep_until(deadline) => {
                    if self.scheduler.timer_mut().take_expired() {
                        if let Err(e) = self.scheduler.timer_fired() {
                            tracing::warn!("Failed to handle report timer: {}", e);
                        }
                    }
                }
            }
        }

        tracing::info!(
            "Report worker shut down ({} subscriptions dropped)",
            self.subscriptions.len()
        );
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Subscribe {
                paths,
                intervals,
                reply,
            } => {
                let _ = reply.send(self.subscribe(paths, intervals));
            }
            Command::Unsubscribe { id, reply } => {
                let _ = reply.send(self.unsubscribe(id));
            }
            Command::AttributeChanged { path } => {
                for (id, node) in self.subscriptions.matching(&path) {
                    tracing::trace!("{} affects {}", path, id);
                    if let Err(e) = self.scheduler.on_became_reportable(node) {
                        tracing::warn!("Failed to mark {} reportable: {}", id, e);
                    }
                }
            }
            Command::ReportDelivered { id } => {
                if let Err(e) = self.report_delivered(id) {
                    tracing::warn!("Ignoring delivery of {}: {}", id, e);
                }
            }
            Command::ChunkAcknowledged { id } => {
                if let Err(e) = self.chunk_acknowledged(id) {
                    tracing::warn!("Ignoring chunk acknowledgement for {}: {}", id, e);
                }
            }
            Command::TransitionToIdle => {
                let now = self.scheduler.timer().now();
                if let Err(e) = self.scheduler.on_transition_to_idle(now) {
                    tracing::warn!("Failed to handle idle transition: {}", e);
                }
            }
            Command::EnterActiveMode => {
                if let Err(e) = self.scheduler.on_enter_active_mode() {
                    tracing::warn!("Failed to handle active mode: {}", e);
                }
            }
            Command::Shutdown => {}
        }
    }

    fn subscribe(
        &mut self,
        paths: Vec<AttributePathParams>,
        intervals: ReportingIntervals,
    ) -> Result<SubscriptionId> {
        let node = self.scheduler.on_subscription_established(intervals)?;
        let id = self.subscriptions.insert(Subscription::new(paths, node));
        tracing::debug!("Subscription {} established on node {}", id, node);
        Ok(id)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<()> {
        let subscription = self
            .subscriptions
            .remove(id)
            .ok_or(ManagerError::SubscriptionNotFound(id))?;
        self.scheduler.on_read_handler_destroyed(subscription.node)?;
        tracing::debug!("Subscription {} removed", id);
        Ok(())
    }

    fn report_delivered(&mut self, id: SubscriptionId) -> Result<()> {
        let subscription = self
            .subscriptions
            .get_mut(id)
            .ok_or(ManagerError::SubscriptionNotFound(id))?;
        if subscription.cursor.is_some() {
            tracing::warn!("{} reported delivered with chunks outstanding", id);
            subscription.cursor = None;
        }
        let node = subscription.node;
        self.scheduler.on_subscription_report_sent(node)?;
        Ok(())
    }

    fn chunk_acknowledged(&mut self, id: SubscriptionId) -> Result<()> {
        let subscription = self
            .subscriptions
            .get_mut(id)
            .ok_or(ManagerError::SubscriptionNotFound(id))?;
        self.scheduler.on_report_chunk_acknowledged(subscription.node)?;
        subscription.continue_pending = true;
        Ok(())
    }

    /// Generate one report message for every subscription due now.
    ///
    /// Returns `false` once nobody is listening for reports.
    fn run_reporting_pass(&mut self) -> bool {
        let mut due: Vec<SubscriptionId> = self
            .scheduler
            .ready_nodes()
            .filter_map(|node| {
                let id = self.subscriptions.id_for_node(node);
                if id.is_none() {
                    tracing::warn!("Ready node {} has no subscription", node);
                }
                id
            })
            .collect();
        due.extend(self.subscriptions.take_continuations());
        tracing::debug!("Reporting pass for {} subscriptions", due.len());

        for id in due {
            let Some(subscription) = self.subscriptions.get_mut(id) else {
                continue;
            };

            let state = subscription.cursor.take().unwrap_or_default();
            let chunk = next_chunk(
                &*self.model,
                &subscription.paths,
                state,
                self.max_paths_per_chunk,
            );
            let more_chunks = !chunk.is_last();

            if let Err(e) = self.scheduler.on_report_started(subscription.node, more_chunks) {
                tracing::warn!("Skipping report for {}: {}", id, e);
                continue;
            }
            subscription.cursor = chunk.resume_from;

            let batch = ReportBatch {
                subscription: id,
                paths: chunk.paths,
                more_chunks,
            };
            if self.report_tx.send(batch).is_err() {
                return false;
            }
        }

        true
    }
}

/// Spawns the background report worker thread
pub(crate) fn spawn_report_worker(
    worker: ReportWorker,
    command_rx: UnboundedReceiver<Command>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!("Failed to create tokio runtime for report worker: {}", e);
                return;
            }
        };

        rt.block_on(worker.run(command_rx));
    })
}
