//! Error sink registry shared by the executor workers.
//!
//! Every job error is delivered to **each** registered sink in registration order.
//! Delivery awaits sink capacity, so a slow consumer slows down the worker that
//! reported the error (backpressure) but never loses errors. Closed sinks are pruned.

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::JobError;

#[derive(Default)]
pub(crate) struct ErrorSinks {
    sinks: Mutex<Vec<mpsc::Sender<JobError>>>,
}

impl ErrorSinks {
    pub(crate) fn register(&self, sink: mpsc::Sender<JobError>) {
        self.sinks.lock().push(sink);
    }

    pub(crate) fn len(&self) -> usize {
        self.sinks.lock().len()
    }

    /// Sends a copy of `err` to every live sink.
    pub(crate) async fn emit(&self, err: JobError) {
        let snapshot = {
            let mut sinks = self.sinks.lock();
            sinks.retain(|s| !s.is_closed());
            sinks.clone()
        };
        for sink in snapshot {
            let _ = sink.send(err.clone()).await;
        }
    }
}
