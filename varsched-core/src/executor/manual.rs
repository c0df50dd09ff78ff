//! Hand-driven executor.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::{QueryCompletion, QueryExecutor, QueryRequest, QueryResult, RequestId};
use crate::error::QueryError;

/// Executor that only records what it is asked to do.
///
/// Clones share state: keep one clone to inspect requests and build
/// completions while the set owns the other.
#[derive(Debug, Clone, Default)]
pub struct ManualExecutor {
    state: Arc<Mutex<ManualState>>,
}

#[derive(Debug, Default)]
struct ManualState {
    /// Every request ever issued, in order.
    issued: Vec<QueryRequest>,

    /// Every cancellation received, in order.
    cancelled: Vec<RequestId>,

    /// Requests neither completed nor cancelled.
    outstanding: IndexMap<RequestId, QueryRequest>,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// All requests issued so far.
    pub fn issued(&self) -> Vec<QueryRequest> {
        self.state.lock().issued.clone()
    }

    /// All cancelled request ids so far.
    pub fn cancelled(&self) -> Vec<RequestId> {
        self.state.lock().cancelled.clone()
    }

    /// Requests still waiting for a result, oldest first.
    pub fn outstanding(&self) -> Vec<QueryRequest> {
        self.state.lock().outstanding.values().cloned().collect()
    }

    /// The newest outstanding request for `variable`.
    pub fn outstanding_for(&self, variable: &str) -> Option<QueryRequest> {
        self.state
            .lock()
            .outstanding
            .values()
            .rev()
            .find(|request| request.variable == variable)
            .cloned()
    }

    /// Number of requests issued for `variable`.
    pub fn issued_count(&self, variable: &str) -> usize {
        self.state
            .lock()
            .issued
            .iter()
            .filter(|request| request.variable == variable)
            .count()
    }

    /// Complete the outstanding request for `variable` successfully.
    ///
    /// Returns `None` if nothing is outstanding for it.
    pub fn resolve(
        &self,
        variable: &str,
        value: impl Into<crate::variable::VariableValue>,
        text: impl Into<crate::variable::VariableValue>,
    ) -> Option<QueryCompletion> {
        let request = self.outstanding_for(variable)?;
        Some(self.complete(request.id, Ok(QueryResult::new(value, text))))
    }

    /// Fail the outstanding request for `variable`.
    pub fn fail(&self, variable: &str, message: &str) -> Option<QueryCompletion> {
        let request = self.outstanding_for(variable)?;
        Some(self.complete(request.id, Err(QueryError::new(message))))
    }

    /// Build the completion for `request` and stop tracking it.
    ///
    /// Works for cancelled requests too, which is how late results are
    /// simulated.
    pub fn complete(
        &self,
        request: RequestId,
        outcome: Result<QueryResult, QueryError>,
    ) -> QueryCompletion {
        let mut state = self.state.lock();
        state.outstanding.shift_remove(&request);
        let variable = state
            .issued
            .iter()
            .find(|issued| issued.id == request)
            .map(|issued| issued.variable.clone())
            .unwrap_or_default();
        QueryCompletion {
            request,
            variable,
            outcome,
        }
    }
}

impl QueryExecutor for ManualExecutor {
    fn execute(&self, request: QueryRequest) {
        let mut state = self.state.lock();
        state.outstanding.insert(request.id, request.clone());
        state.issued.push(request);
    }

    fn cancel(&self, request: RequestId) {
        let mut state = self.state.lock();
        state.outstanding.shift_remove(&request);
        state.cancelled.push(request);
    }
}
