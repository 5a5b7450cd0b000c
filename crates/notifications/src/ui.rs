//! UI dispatch boundary.
//!
//! Debounced alerts fire on the timer thread, but displaying them is work for
//! whichever thread owns the user interface. Deliveries are handed to a
//! `UiDispatch` which decides where they run.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use tracing::warn;

/// A unit of work that must run on the UI context.
pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// "Run on UI thread" primitive.
pub trait UiDispatch: Send + Sync {
    fn dispatch(&self, job: UiJob);
}

impl<D> UiDispatch for Arc<D>
where
    D: UiDispatch + ?Sized,
{
    fn dispatch(&self, job: UiJob) {
        (**self).dispatch(job)
    }
}

/// Runs jobs immediately on the calling thread.
///
/// Suitable for headless hosts where any thread may perform side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineDispatch;

impl UiDispatch for InlineDispatch {
    fn dispatch(&self, job: UiJob) {
        job()
    }
}

/// Queues jobs for the owning thread to drain through a [`UiPump`].
#[derive(Debug, Clone)]
pub struct UiQueue {
    sender: Sender<UiJob>,
}

impl UiQueue {
    /// Create the queue and the pump that the UI thread keeps.
    pub fn new() -> (Self, UiPump) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, UiPump { receiver })
    }
}

impl UiDispatch for UiQueue {
    fn dispatch(&self, job: UiJob) {
        if self.sender.send(job).is_err() {
            warn!("ui pump dropped; discarding queued delivery");
        }
    }
}

/// Receiving end of a [`UiQueue`]; owned by the UI thread.
pub struct UiPump {
    receiver: Receiver<UiJob>,
}

impl UiPump {
    /// Run every job queued so far without blocking. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for the first job, then drain the rest.
    pub fn run_for(&self, timeout: Duration) -> usize {
        match self.receiver.recv_timeout(timeout) {
            Ok(job) => {
                job();
                1 + self.run_pending()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }
}

impl core::fmt::Debug for UiPump {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UiPump").finish_non_exhaustive()
    }
}
