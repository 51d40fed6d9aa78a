//! Bounded worker pool with serialized completion delivery.
//!
//! Blocking work (fetches, probes, pre-warm sweeps) runs under a
//! semaphore so at most `workers` tasks are in flight; outputs funnel
//! into a single-consumer queue drained by the interactive context, so
//! no two completions are ever processed concurrently.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Notify, Semaphore};

struct Shared {
    semaphore: Semaphore,
    outstanding: AtomicUsize,
    idle: Notify,
}

impl Shared {
    fn finish_one(&self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Submission half of the runner. Cloneable; shared by anything that
/// schedules work.
#[derive(Clone)]
pub struct TaskRunner<T> {
    shared: Arc<Shared>,
    tx: mpsc::UnboundedSender<T>,
}

/// Receiving half. Exactly one exists per runner; `next` hands out
/// completions one at a time.
pub struct Completions<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T: Send + 'static> TaskRunner<T> {
    /// Create a runner with a pool of `workers` concurrent slots.
    pub fn new(workers: usize) -> (Self, Completions<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                shared: Arc::new(Shared {
                    semaphore: Semaphore::new(workers),
                    outstanding: AtomicUsize::new(0),
                    idle: Notify::new(),
                }),
                tx,
            },
            Completions { rx },
        )
    }

    /// Run `work` on the pool and deliver its output to the completion
    /// queue. Excess submissions wait for a free slot. Failures must
    /// travel inside `T`; the runner does not retry.
    pub fn submit<F>(&self, work: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        self.shared.outstanding.fetch_add(1, Ordering::SeqCst);
        let shared = self.shared.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            if let Ok(_permit) = shared.semaphore.acquire().await {
                let result = work.await;
                // Receiver gone means nobody wants the result anymore.
                let _ = tx.send(result);
            }
            shared.finish_one();
        });
    }

    /// Run `work` on the pool with no completion delivery. Used for the
    /// fire-and-forget pre-warm sweep; shares the same slots as
    /// `submit`.
    pub fn submit_detached<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.shared.outstanding.fetch_add(1, Ordering::SeqCst);
        let shared = self.shared.clone();
        tokio::spawn(async move {
            if let Ok(_permit) = shared.semaphore.acquire().await {
                work.await;
            }
            shared.finish_one();
        });
    }

    /// Wait until every submission made so far has finished.
    pub async fn drain(&self) {
        loop {
            if self.shared.outstanding.load(Ordering::SeqCst) == 0 {
                return;
            }
            let notified = self.shared.idle.notified();
            if self.shared.outstanding.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl<T> Completions<T> {
    /// Next completed result. Completions come out one at a time; the
    /// `&mut self` receiver is the single interactive consumer.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}
