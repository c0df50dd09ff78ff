//! Dependency Graph
//!
//! This module implements the directed graph of references between the
//! variables of a set.
//!
//! # Overview
//!
//! - Nodes are variable names, kept in declaration order.
//! - An edge from A to B means B's template references A (B depends on A).
//!
//! The graph is derived from templates and never edited in place: it is
//! built wholesale when a set activates and dropped when it deactivates.
//! Building fails with [`SchedulerError::CycleDetected`] when no topological
//! order exists.
//!
//! Both directions are stored on each node so the scheduler can walk
//! dependencies (readiness) and dependents (cascades) in one hop.
//!
//! [`SchedulerError::CycleDetected`]: crate::error::SchedulerError::CycleDetected

mod dependency;
mod node;

pub use dependency::DependencyGraph;
pub use node::{Node, NodeId};
