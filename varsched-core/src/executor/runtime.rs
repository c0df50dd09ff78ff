//! Tokio-backed executor.
//!
//! Each request runs as its own task. Abort handles are kept in a
//! concurrent map keyed by request id so `cancel` can reach a task from the
//! scheduler's thread while tasks clean up after themselves on the runtime.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tracing::{debug, trace};

use super::{QueryCompletion, QueryExecutor, QueryRequest, QueryResult, RequestId};
use crate::error::QueryError;

/// Future returned by a [`QueryBackend`].
pub type QueryFuture = Pin<Box<dyn Future<Output = Result<QueryResult, QueryError>> + Send + 'static>>;

/// Receiving side for completions produced by a [`TokioExecutor`].
pub type CompletionReceiver = mpsc::UnboundedReceiver<QueryCompletion>;

/// Resolves a variable query against a data source.
pub trait QueryBackend: Send + Sync + 'static {
    fn run(&self, request: &QueryRequest) -> QueryFuture;
}

impl<F> QueryBackend for F
where
    F: Fn(&QueryRequest) -> QueryFuture + Send + Sync + 'static,
{
    fn run(&self, request: &QueryRequest) -> QueryFuture {
        self(request)
    }
}

/// Executor that spawns every request on a tokio runtime.
pub struct TokioExecutor<B: QueryBackend> {
    backend: Arc<B>,
    handle: Handle,
    tasks: Arc<DashMap<RequestId, AbortHandle>>,
    completions: mpsc::UnboundedSender<QueryCompletion>,
}

impl<B: QueryBackend> TokioExecutor<B> {
    /// Create an executor spawning onto `handle`, plus the receiver its
    /// completions arrive on.
    pub fn new(backend: B, handle: Handle) -> (Self, CompletionReceiver) {
        let (completions, receiver) = mpsc::unbounded_channel();
        let executor = Self {
            backend: Arc::new(backend),
            handle,
            tasks: Arc::new(DashMap::new()),
            completions,
        };
        (executor, receiver)
    }

    /// Number of requests still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }
}

impl<B: QueryBackend> QueryExecutor for TokioExecutor<B> {
    fn execute(&self, request: QueryRequest) {
        let id = request.id;
        let variable = request.variable.clone();
        let query = self.backend.run(&request);
        let tasks = Arc::clone(&self.tasks);
        let completions = self.completions.clone();

        // The task holds off until its abort handle is in `tasks`, so its own
        // removal can never run first.
        let (registered, wait_registered) = oneshot::channel::<()>();

        trace!(variable = %variable, request = %id, "spawning variable query");
        let task = self.handle.spawn(async move {
            if wait_registered.await.is_err() {
                return;
            }
            let outcome = query.await;
            tasks.remove(&id);
            // The receiver is gone once the host stops listening; nothing to do then.
            let _ = completions.send(QueryCompletion {
                request: id,
                variable,
                outcome,
            });
        });

        self.tasks.insert(id, task.abort_handle());
        let _ = registered.send(());
    }

    fn cancel(&self, request: RequestId) {
        if let Some((_, task)) = self.tasks.remove(&request) {
            debug!(request = %request, "aborting variable query");
            task.abort();
        }
    }
}
