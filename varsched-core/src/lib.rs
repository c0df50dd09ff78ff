//! Varsched Core
//!
//! This crate schedules the evaluation of dashboard template variables whose
//! queries reference each other. It implements:
//!
//! - Reference extraction and interpolation for `${name}` / `$name`
//! - A dependency graph with cycle detection
//! - A per-variable update state machine with stale-result protection
//! - The variable set scheduler: activation, cascades, cancellation
//!
//! Query execution itself is delegated to a [`QueryExecutor`]; the crate
//! ships a hand-driven executor and a tokio-backed one.
//!
//! # Architecture
//!
//! - `template`: placeholder scanning, dependency extraction, interpolation
//! - `graph`: dependency graph built from templates
//! - `variable`: variables, their kinds, values and lifecycle
//! - `executor`: the boundary to whatever actually runs queries
//! - `scheduler`: the variable set that ties everything together
//!
//! # Example
//!
//! ```rust,ignore
//! use varsched_core::{ManualExecutor, Variable, VariableSet};
//!
//! let executor = ManualExecutor::new();
//! let mut set = VariableSet::new(
//!     [
//!         Variable::query("cluster", "label_values(up, cluster)"),
//!         Variable::query("node", "label_values(up{cluster=\"$cluster\"}, node)"),
//!     ],
//!     executor.clone(),
//! )?;
//!
//! set.activate()?;
//! // Only `cluster` is loading; `node` waits for it.
//! let done = executor.resolve("cluster", "eu-1", "eu-1").unwrap();
//! set.handle_completion(done);
//! // Now `node` is loading with `cluster="eu-1"` substituted.
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod graph;
pub mod scheduler;
pub mod template;
pub mod variable;

pub use config::{SetConfig, UnknownReferencePolicy};
pub use error::{QueryError, Result, SchedulerError};
pub use executor::{
    ManualExecutor, QueryBackend, QueryCompletion, QueryExecutor, QueryRequest, QueryResult,
    RequestId, TokioExecutor,
};
pub use graph::DependencyGraph;
pub use scheduler::{SetEvent, SubscriberId, VariableSet};
pub use variable::{Variable, VariableKind, VariableStatus, VariableValue};
