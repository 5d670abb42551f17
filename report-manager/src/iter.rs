//! Sync iterator for consuming report batches from ReportManager

use std::sync::{mpsc, Arc};
use std::time::Duration;

use parking_lot::Mutex;

use crate::subscription::ReportBatch;

/// Blocking iterator over report batches
///
/// Batches arrive in the order the worker generated them. A batch with
/// `more_chunks` set is followed by the rest of that report only after
/// [`ReportManager::chunk_acknowledged`](crate::ReportManager::chunk_acknowledged);
/// the iterator itself never acknowledges anything. Every clone shares one
/// receiver, so each batch is observed exactly once.
pub struct ReportIterator {
    rx: Arc<Mutex<mpsc::Receiver<ReportBatch>>>,
}

impl ReportIterator {
    pub(crate) fn new(rx: Arc<Mutex<mpsc::Receiver<ReportBatch>>>) -> Self {
        Self { rx }
    }

    /// Block until a batch is available
    ///
    /// Returns `None` once the worker has shut down.
    pub fn recv(&self) -> Option<ReportBatch> {
        self.rx.lock().recv().ok()
    }

    pub fn try_recv(&self) -> Option<ReportBatch> {
        self.rx.lock().try_recv().ok()
    }

    /// Wait at most `timeout` for the next batch
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ReportBatch> {
        self.rx.lock().recv_timeout(timeout).ok()
    }

    /// Drain the batches generated so far without blocking
    pub fn try_iter(&self) -> impl Iterator<Item = ReportBatch> + '_ {
        std::iter::from_fn(move || self.try_recv())
    }
}

impl Iterator for ReportIterator {
    type Item = ReportBatch;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

impl Clone for ReportIterator {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
        }
    }
}
