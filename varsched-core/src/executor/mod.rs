//! Query Executor Boundary
//!
//! The set never runs queries itself. It hands a [`QueryRequest`] to a
//! [`QueryExecutor`] and later receives a [`QueryCompletion`] for it through
//! [`VariableSet::handle_completion`]. Completions are plain messages, so
//! they can arrive in any order, late, or not at all.
//!
//! Two executors ship with the crate:
//!
//! - [`ManualExecutor`] records requests and lets the caller decide when and
//!   how they complete. Useful for hosts with their own transport and for
//!   deterministic tests.
//! - [`TokioExecutor`] runs each request on a tokio runtime and delivers
//!   completions over a channel.
//!
//! [`VariableSet::handle_completion`]: crate::scheduler::VariableSet::handle_completion

mod manual;
mod runtime;

pub use manual::ManualExecutor;
pub use runtime::{CompletionReceiver, QueryBackend, QueryFuture, TokioExecutor};

use std::fmt;

use crate::error::QueryError;
use crate::variable::VariableValue;

/// Identity of one update of one variable.
///
/// Ids increase monotonically within a set, so a completion can always be
/// matched against the update currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Get the raw id value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A fully interpolated query for one variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub id: RequestId,
    pub variable: String,
    pub query: String,
}

/// Value and display text produced by a successful query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub value: VariableValue,
    pub text: VariableValue,
}

impl QueryResult {
    pub fn new(value: impl Into<VariableValue>, text: impl Into<VariableValue>) -> Self {
        Self {
            value: value.into(),
            text: text.into(),
        }
    }
}

/// The outcome of a request, addressed back to its variable.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCompletion {
    pub request: RequestId,
    pub variable: String,
    pub outcome: Result<QueryResult, QueryError>,
}

impl QueryCompletion {
    pub fn success(request: RequestId, variable: impl Into<String>, result: QueryResult) -> Self {
        Self {
            request,
            variable: variable.into(),
            outcome: Ok(result),
        }
    }

    pub fn failure(request: RequestId, variable: impl Into<String>, error: QueryError) -> Self {
        Self {
            request,
            variable: variable.into(),
            outcome: Err(error),
        }
    }
}

/// Runs variable queries on behalf of a set.
///
/// Implementations must not call back into the set from `execute` or
/// `cancel`; results are delivered later as [`QueryCompletion`]s.
pub trait QueryExecutor: Send {
    /// Start running `request`.
    fn execute(&self, request: QueryRequest);

    /// Best-effort abort of an outstanding request. A result that still
    /// arrives afterwards is discarded by the set.
    fn cancel(&self, request: RequestId);
}
