//! Serialized per-entity update queue.
//!
//! An [`UpdateQueue`] owns the in-memory state of one entity and applies
//! every mutation to it in submission order. Submissions made before a
//! flush starts are folded together and persisted once through the change
//! hook; each caller then receives the value its own updater produced.
//!
//! Submitting only records a job. The worker is woken when a submitter
//! first polls (or drops) the returned future, so everything a task submits
//! before its next `.await` lands in one batch whatever runtime flavor the
//! queue runs on.
//!
//! State is held as `Option<Arc<T>>`. An updater that hands back the `Arc`
//! it was given has made no change, and a batch made only of such updaters
//! never reaches the change hook.

use futures::FutureExt;
use futures::future::BoxFuture;
use parley_core::error::{ParleyError, Result};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};

/// Computes the next state from the previous one.
pub type Updater<T> = Box<dyn FnOnce(Option<&Arc<T>>) -> Result<Arc<T>> + Send>;

/// Loads the initial state on the first flush.
pub type Loader<T> = Box<dyn Fn() -> BoxFuture<'static, Result<Option<T>>> + Send + Sync>;

/// Persists a folded batch value; `None` means the entity was cleared.
pub type ChangeHook<T> =
    Arc<dyn Fn(Option<Arc<T>>) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Wraps an async closure as a [`Loader`].
pub fn loader<T, F, Fut>(f: F) -> Loader<T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<T>>> + Send + 'static,
{
    Box::new(move || f().boxed())
}

/// Wraps an async closure as a [`ChangeHook`].
pub fn change_hook<T, F, Fut>(f: F) -> ChangeHook<T>
where
    F: Fn(Option<Arc<T>>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |value| f(value).boxed())
}

/// Where a queue's initial state comes from.
pub enum QueueSeed<T> {
    /// No state until the first updater produces one.
    Empty,
    Value(T),
    /// Awaited once, before the first batch is folded.
    Loader(Loader<T>),
}

enum Job<T> {
    Update {
        updater: Updater<T>,
        reply: oneshot::Sender<Result<Arc<T>>>,
    },
    Read {
        reply: oneshot::Sender<Result<Option<Arc<T>>>>,
    },
    Clear {
        reply: oneshot::Sender<Result<()>>,
    },
}

impl<T> Job<T> {
    fn reject(self, err: ParleyError) {
        match self {
            Job::Update { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Job::Read { reply } => {
                let _ = reply.send(Err(err));
            }
            Job::Clear { reply } => {
                let _ = reply.send(Err(err));
            }
        }
    }
}

/// Outcome of one job within a folded batch, held until the batch commits.
enum Settled<T> {
    Update(oneshot::Sender<Result<Arc<T>>>, Result<Arc<T>>),
    Read(oneshot::Sender<Result<Option<Arc<T>>>>, Option<Arc<T>>),
    Clear(oneshot::Sender<Result<()>>),
}

impl<T> Settled<T> {
    fn resolve(self) {
        match self {
            Settled::Update(reply, outcome) => {
                let _ = reply.send(outcome);
            }
            Settled::Read(reply, value) => {
                let _ = reply.send(Ok(value));
            }
            Settled::Clear(reply) => {
                let _ = reply.send(Ok(()));
            }
        }
    }

    fn reject(self, err: ParleyError) {
        match self {
            Settled::Update(reply, _) => {
                let _ = reply.send(Err(err));
            }
            Settled::Read(reply, _) => {
                let _ = reply.send(Err(err));
            }
            Settled::Clear(reply) => {
                let _ = reply.send(Err(err));
            }
        }
    }
}

type Pending<T> = Arc<Mutex<Vec<Job<T>>>>;

/// Wakes the worker once, on first poll or on drop.
struct Kick(Option<mpsc::UnboundedSender<()>>);

impl Kick {
    fn fire(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for Kick {
    fn drop(&mut self) {
        self.fire();
    }
}

/// Serializes all mutations of one entity.
///
/// Each queue drives a dedicated tokio task, so it must be created from
/// within a runtime. Exactly one queue may exist per entity; see
/// [`crate::session::SessionQueueRegistry`].
pub struct UpdateQueue<T> {
    name: String,
    pending: Pending<T>,
    kick: mpsc::UnboundedSender<()>,
}

impl<T: Send + Sync + 'static> UpdateQueue<T> {
    /// Creates the queue and spawns its worker task.
    pub fn spawn(name: impl Into<String>, seed: QueueSeed<T>, on_change: Option<ChangeHook<T>>) -> Self {
        let name = name.into();
        let (kick, rx) = mpsc::unbounded_channel();
        let pending: Pending<T> = Arc::new(Mutex::new(Vec::new()));
        let (state, loader) = match seed {
            QueueSeed::Empty => (State::Ready(None), None),
            QueueSeed::Value(value) => (State::Ready(Some(Arc::new(value))), None),
            QueueSeed::Loader(loader) => (State::Unloaded, Some(loader)),
        };
        let worker = Worker {
            name: name.clone(),
            state,
            loader,
            on_change,
            pending: Arc::clone(&pending),
            rx,
        };
        tokio::spawn(worker.run());
        Self {
            name,
            pending,
            kick,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records `job` and returns a future that wakes the worker when first
    /// polled and then waits for `rx`.
    fn submit<R: Send + 'static>(
        &self,
        job: Job<T>,
        rx: oneshot::Receiver<Result<R>>,
    ) -> BoxFuture<'static, Result<R>> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(job);
        let mut kick = Kick(Some(self.kick.clone()));
        async move {
            kick.fire();
            rx.await.unwrap_or(Err(ParleyError::QueueClosed))
        }
        .boxed()
    }

    /// Enqueues `updater` and returns a future for the value it produced.
    ///
    /// The updater is queued when this method is called, not when the
    /// returned future is first polled. The future resolves once the batch
    /// containing the updater has been persisted; it fails with the
    /// updater's own error, or with the batch's persistence error.
    pub fn set<F>(&self, updater: F) -> BoxFuture<'static, Result<Arc<T>>>
    where
        F: FnOnce(Option<&Arc<T>>) -> Result<Arc<T>> + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        self.submit(
            Job::Update {
                updater: Box::new(updater),
                reply,
            },
            rx,
        )
    }

    /// Reads the state as seen by a job at this point in the queue.
    ///
    /// The read settles with its batch, so it never observes a value that
    /// was later rolled back.
    pub fn get(&self) -> BoxFuture<'static, Result<Option<Arc<T>>>> {
        let (reply, rx) = oneshot::channel();
        self.submit(Job::Read { reply }, rx)
    }

    /// Drops the state at this point in the queue.
    ///
    /// Updaters queued after the clear see `None`. If state existed, the
    /// change hook is called with `None` as part of the batch.
    pub fn clear(&self) -> BoxFuture<'static, Result<()>> {
        let (reply, rx) = oneshot::channel();
        self.submit(Job::Clear { reply }, rx)
    }
}

enum State<T> {
    Unloaded,
    Ready(Option<Arc<T>>),
}

struct Worker<T> {
    name: String,
    state: State<T>,
    loader: Option<Loader<T>>,
    on_change: Option<ChangeHook<T>>,
    pending: Pending<T>,
    rx: mpsc::UnboundedReceiver<()>,
}

impl<T: Send + Sync + 'static> Worker<T> {
    async fn run(mut self) {
        while self.rx.recv().await.is_some() {
            while self.rx.try_recv().is_ok() {}
            let batch = std::mem::take(
                &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
            );
            if batch.is_empty() {
                continue;
            }
            self.flush(batch).await;
        }
        tracing::debug!(queue = %self.name, "Update queue closed");
    }

    async fn ensure_loaded(&mut self) -> Result<Option<Arc<T>>> {
        if let State::Ready(value) = &self.state {
            return Ok(value.clone());
        }
        let loaded = match &self.loader {
            Some(loader) => loader().await.map_err(ParleyError::into_persistence)?,
            None => None,
        };
        let value = loaded.map(Arc::new);
        self.state = State::Ready(value.clone());
        tracing::debug!(queue = %self.name, found = value.is_some(), "Loaded initial state");
        Ok(value)
    }

    async fn flush(&mut self, batch: Vec<Job<T>>) {
        let size = batch.len();
        let base = match self.ensure_loaded().await {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(queue = %self.name, error = %err, "Failed to load state; rejecting batch");
                for job in batch {
                    job.reject(err.clone());
                }
                return;
            }
        };

        tracing::debug!(queue = %self.name, batch = size, "Flushing update batch");
        let mut current = base.clone();
        let mut settled = Vec::with_capacity(size);
        for job in batch {
            match job {
                Job::Update { updater, reply } => {
                    let outcome = run_updater(updater, current.as_ref());
                    match &outcome {
                        Ok(next) => current = Some(Arc::clone(next)),
                        Err(err) => {
                            tracing::warn!(queue = %self.name, error = %err, "Updater failed");
                        }
                    }
                    settled.push(Settled::Update(reply, outcome));
                }
                Job::Read { reply } => settled.push(Settled::Read(reply, current.clone())),
                Job::Clear { reply } => {
                    current = None;
                    settled.push(Settled::Clear(reply));
                }
            }
        }

        let changed = match (&base, &current) {
            (Some(before), Some(after)) => !Arc::ptr_eq(before, after),
            (None, None) => false,
            _ => true,
        };
        if changed && let Some(hook) = &self.on_change {
            if let Err(err) = hook(current.clone()).await {
                let err = err.into_persistence();
                tracing::error!(
                    queue = %self.name,
                    batch = size,
                    error = %err,
                    "Persisting batch failed; rolled back"
                );
                for item in settled {
                    item.reject(err.clone());
                }
                return;
            }
        }

        self.state = State::Ready(current);
        if changed {
            tracing::debug!(queue = %self.name, batch = size, "Committed update batch");
        }
        for item in settled {
            item.resolve();
        }
    }
}

fn run_updater<T>(updater: Updater<T>, current: Option<&Arc<T>>) -> Result<Arc<T>> {
    match panic::catch_unwind(AssertUnwindSafe(move || updater(current))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ParleyError::updater(format!("updater panicked: {message}")))
        }
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod tests;
