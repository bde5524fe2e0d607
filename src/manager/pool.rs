use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::{FutureExt as _, future::BoxFuture};
use tokio::{runtime::Handle, sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::foundation::{
    core::FetchKey,
    error::{AvatarError, AvatarResult},
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One queued background fetch.
pub(crate) struct FetchJob {
    pub(crate) key: FetchKey,
    pub(crate) run: BoxFuture<'static, AvatarResult<()>>,
}

/// Counters of the background fetch pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub enqueued: u64,
    pub completed: u64,
    pub timed_out: u64,
    pub failed: u64,
    pub panicked: u64,
}

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<FetchJob>>>;

/// Fixed set of tokio tasks draining one unbounded job queue.
///
/// A job's outcome is only logged and counted; it never reaches the submitter.
pub(crate) struct FetchWorkerPool {
    tx: Mutex<Option<mpsc::UnboundedSender<FetchJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stats: Arc<Mutex<FetchStats>>,
}

impl FetchWorkerPool {
    pub(crate) fn spawn(handle: &Handle, workers: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let rx: SharedReceiver = Arc::new(tokio::sync::Mutex::new(rx));
        let stats = Arc::new(Mutex::new(FetchStats::default()));

        let workers = (0..workers.max(1))
            .map(|id| handle.spawn(worker_loop(id, Arc::clone(&rx), Arc::clone(&stats))))
            .collect();

        Self {
            tx: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            stats,
        }
    }

    /// Queue `job`. A closed pool drops it immediately and returns `false`.
    pub(crate) fn submit(&self, job: FetchJob) -> bool {
        let tx = lock(&self.tx);
        let Some(tx) = tx.as_ref() else {
            debug!(key = %job.key, "fetch pool closed, dropping job");
            return false;
        };
        match tx.send(job) {
            Ok(()) => {
                lock(&self.stats).enqueued += 1;
                true
            }
            Err(mpsc::error::SendError(job)) => {
                debug!(key = %job.key, "fetch queue gone, dropping job");
                false
            }
        }
    }

    /// Abort every worker. Queued jobs are dropped once the aborted workers release the queue.
    pub(crate) fn close(&self) {
        lock(&self.tx).take();
        let workers = std::mem::take(&mut *lock(&self.workers));
        if !workers.is_empty() {
            debug!(workers = workers.len(), "closing fetch pool");
        }
        for worker in workers {
            worker.abort();
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        lock(&self.tx).is_none()
    }

    pub(crate) fn stats(&self) -> FetchStats {
        *lock(&self.stats)
    }
}

impl Drop for FetchWorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}

async fn worker_loop(id: usize, rx: SharedReceiver, stats: Arc<Mutex<FetchStats>>) {
    loop {
        let job = { rx.lock().await.recv().await };
        let Some(FetchJob { key, run }) = job else {
            debug!(worker = id, "fetch queue closed");
            return;
        };

        match AssertUnwindSafe(run).catch_unwind().await {
            Ok(Ok(())) => lock(&stats).completed += 1,
            Ok(Err(err @ AvatarError::FetchTimeout { .. })) => {
                info!(worker = id, %key, %err, "avatar fetch timed out");
                lock(&stats).timed_out += 1;
            }
            Ok(Err(err)) => {
                warn!(worker = id, %key, %err, "avatar fetch failed");
                lock(&stats).failed += 1;
            }
            Err(payload) => {
                let panic = panic_message(payload.as_ref());
                error!(worker = id, %key, panic, "avatar fetch panicked");
                lock(&stats).panicked += 1;
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
#[path = "../../tests/unit/manager/pool.rs"]
mod tests;
