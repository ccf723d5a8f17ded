//! Queued formation.
//!
//! [`FormationPipeline`] accepts intents into a bounded channel and never blocks the
//! caller: a full queue rejects the request immediately. One worker task drains the
//! queue in FIFO order, running [`form`](super::form) on the blocking pool, and
//! reports each request's status and terminal result to registered observers.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{form, FormationError, FormationIntent, FormationOutcome, FormationResult};
use crate::memory::store::MemoryStore;
use crate::memory::types::Category;

/// Interval at which [`FormationPipeline::wait_idle`] re-checks the pending set.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Lifecycle of one formation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    InProgress,
    Completed,
    Failed(String),
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::InProgress => f.write_str("in progress"),
            Self::Completed => f.write_str("completed"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Receives formation notifications.
///
/// Callbacks run on the worker (or on the caller, for rejected and direct
/// requests). They may enqueue more work.
pub trait FormationObserver: Send + Sync {
    /// Called once per request with its terminal result.
    fn on_result(&self, result: &FormationResult);

    /// Called on every status transition.
    fn on_status(&self, _request_id: &str, _status: &RequestStatus) {}
}

impl<F> FormationObserver for F
where
    F: Fn(&FormationResult) + Send + Sync,
{
    fn on_result(&self, result: &FormationResult) {
        self(result)
    }
}

#[derive(Default)]
struct Shared {
    pending: RwLock<HashMap<String, RequestStatus>>,
    observers: RwLock<Vec<Arc<dyn FormationObserver>>>,
}

impl Shared {
    fn observers(&self) -> Vec<Arc<dyn FormationObserver>> {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Add `request_id` to the pending set as [`RequestStatus::Pending`].
    /// Returns `false`, touching nothing, if that id is already pending.
    fn register(&self, request_id: &str) -> bool {
        {
            let mut pending = self.pending.write().unwrap_or_else(PoisonError::into_inner);
            if pending.contains_key(request_id) {
                return false;
            }
            pending.insert(request_id.to_string(), RequestStatus::Pending);
        }
        for observer in self.observers() {
            observer.on_status(request_id, &RequestStatus::Pending);
        }
        true
    }

    fn set_status(&self, request_id: &str, status: RequestStatus) {
        self.pending
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(request_id.to_string(), status.clone());
        for observer in self.observers() {
            observer.on_status(request_id, &status);
        }
    }

    /// Report the terminal status and result, then drop the request from the
    /// pending set.
    fn finish(&self, result: &FormationResult) {
        let status = match &result.outcome {
            FormationOutcome::Failed { reason } => RequestStatus::Failed(reason.clone()),
            _ => RequestStatus::Completed,
        };
        let observers = self.observers();
        for observer in &observers {
            observer.on_status(&result.intent_id, &status);
        }
        for observer in &observers {
            observer.on_result(result);
        }
        self.pending
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&result.intent_id);
    }

    fn reject(&self, request_id: &str, reason: &str) {
        self.finish(&FormationResult::failed(request_id, reason, Duration::ZERO));
    }
}

/// Bounded formation queue with a single worker.
pub struct FormationPipeline {
    store: MemoryStore,
    shared: Arc<Shared>,
    sender: Mutex<Option<mpsc::Sender<FormationIntent>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl FormationPipeline {
    /// Spawn the worker on the current Tokio runtime.
    pub fn start(store: MemoryStore, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let shared = Arc::new(Shared::default());
        let worker = tokio::spawn(run_worker(store.clone(), shared.clone(), rx));
        info!(capacity = capacity.max(1), "formation pipeline started");

        Self {
            store,
            shared,
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Queue a request and return its id immediately.
    pub fn enqueue(
        &self,
        content: impl Into<String>,
        category: Category,
        agent_handle: Option<String>,
        path_scope: Option<String>,
    ) -> Result<String, FormationError> {
        let mut intent = FormationIntent::new(content, category);
        intent.agent_handle = agent_handle;
        intent.path_scope = path_scope;
        self.enqueue_intent(intent)
    }

    /// Queue a prepared intent. Rejected requests are also reported to observers
    /// as failed.
    ///
    /// An intent whose id is already pending is refused with
    /// [`FormationError::DuplicateId`] and not reported, so the in-flight request
    /// keeps its entry.
    pub fn enqueue_intent(&self, intent: FormationIntent) -> Result<String, FormationError> {
        let request_id = intent.id.clone();

        // Registered before sending so the worker never finishes an unknown request.
        if !self.shared.register(&request_id) {
            warn!(request = %request_id, "formation request id already pending, rejected");
            return Err(FormationError::DuplicateId { request_id });
        }

        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(sender) = sender else {
            self.shared.reject(&request_id, "pipeline closed");
            return Err(FormationError::Closed { request_id });
        };

        match sender.try_send(intent) {
            Ok(()) => {
                debug!(request = %request_id, "formation request queued");
                Ok(request_id)
            }
            Err(TrySendError::Full(_)) => {
                warn!(request = %request_id, "formation queue full, request rejected");
                self.shared.reject(&request_id, "queue full");
                Err(FormationError::QueueFull { request_id })
            }
            Err(TrySendError::Closed(_)) => {
                self.shared.reject(&request_id, "pipeline closed");
                Err(FormationError::Closed { request_id })
            }
        }
    }

    /// Form an intent on the calling thread, bypassing the queue.
    ///
    /// Blocks on storage and embedding I/O; async callers should wrap this in
    /// `spawn_blocking`. Observers are notified exactly as for queued requests.
    ///
    /// An intent whose id is already pending fails without touching the store or
    /// the pending set.
    pub fn form_now(&self, intent: &FormationIntent) -> FormationResult {
        if !self.shared.register(&intent.id) {
            warn!(request = %intent.id, "formation request id already pending, rejected");
            return FormationResult::failed(&intent.id, "request id already pending", Duration::ZERO);
        }
        self.shared.set_status(&intent.id, RequestStatus::InProgress);
        let result = form(&self.store, intent);
        self.shared.finish(&result);
        result
    }

    pub fn add_observer(&self, observer: Arc<dyn FormationObserver>) {
        self.shared
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Register a closure for terminal results.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&FormationResult) + Send + Sync + 'static,
    {
        self.add_observer(Arc::new(callback));
    }

    /// Requests queued or in progress.
    pub fn pending_count(&self) -> usize {
        self.shared
            .pending
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Current status of a request that has not finished yet.
    pub fn status(&self, request_id: &str) -> Option<RequestStatus> {
        self.shared
            .pending
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(request_id)
            .cloned()
    }

    /// Wait until nothing is pending. Returns `false` if `timeout` elapsed first.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.pending_count() == 0 {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }

    /// Stop accepting work and let the worker drain what is buffered.
    ///
    /// Returns `true` if the worker finished within `grace`. Otherwise the worker is
    /// left detached and unprocessed requests may be lost.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(sender);

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(worker) = worker else {
            return true;
        };

        match tokio::time::timeout(grace, worker).await {
            Ok(Ok(())) => {
                info!("formation pipeline drained");
                true
            }
            Ok(Err(e)) => {
                error!(error = %e, "formation worker crashed");
                false
            }
            Err(_) => {
                warn!(
                    outstanding = self.pending_count(),
                    grace_ms = grace.as_millis() as u64,
                    "formation shutdown grace period elapsed"
                );
                false
            }
        }
    }
}

async fn run_worker(
    store: MemoryStore,
    shared: Arc<Shared>,
    mut rx: mpsc::Receiver<FormationIntent>,
) {
    while let Some(intent) = rx.recv().await {
        shared.set_status(&intent.id, RequestStatus::InProgress);

        let started = Instant::now();
        let task_store = store.clone();
        let task_intent = intent.clone();
        let result = match tokio::task::spawn_blocking(move || form(&task_store, &task_intent)).await
        {
            Ok(result) => result,
            Err(e) => {
                error!(request = %intent.id, error = %e, "formation task failed");
                FormationResult::failed(&intent.id, format!("formation task failed: {e}"), started.elapsed())
            }
        };

        debug!(
            request = %result.intent_id,
            outcome = ?result.outcome,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "formation request finished"
        );
        shared.finish(&result);
    }
    debug!("formation worker stopped");
}
