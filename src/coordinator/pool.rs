use std::future::Future;
use std::sync::Arc;
use tokio::sync::{oneshot, Semaphore};

/// Bounded `tokio::sync::Semaphore`-gated task spawner (§5 "Pool implementation").
/// `submit` acquires a permit, blocking the caller's await point but never a held
/// database transaction, then spawns the task on the runtime and releases the permit on
/// completion. Shutdown is implicit: dropping every clone of the pool lets in-flight
/// permits finish without forceful cancellation.
#[derive(Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(worker_count: usize) -> Self {
        Self { semaphore: Arc::new(Semaphore::new(worker_count.max(1))) }
    }

    pub async fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("pool semaphore is never closed");

        tokio::spawn(async move {
            let _permit = permit;
            task.await;
        });
    }

    /// Submits a task through the same bounded pool as `submit`, but waits for it to
    /// finish and hands back its output. Used by callers that must observe a task's
    /// terminal result rather than fire-and-forget it — e.g. the batch dispatcher,
    /// which per §4.5 awaits each intent's completion before returning.
    pub async fn submit_and_wait<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.submit(async move {
            let result = task.await;
            let _ = tx.send(result);
        })
        .await;
        rx.await.expect("pool task dropped without sending its result")
    }
}
