//! Variables
//!
//! A variable owns a name, a template, its current value and text, and a
//! status. It is a small state machine:
//!
//! ```text
//!   Idle ──start──▶ Loading ──complete──▶ Resolved
//!    ▲                │   └────fail─────▶ Error
//!    └────cancel──────┘
//! ```
//!
//! `Resolved` and `Error` go back to `Loading` on the next update. The
//! variable never triggers itself: every transition is driven by the
//! [`VariableSet`](crate::scheduler::VariableSet).
//!
//! Each update carries a [`RequestId`]. A completion is applied only if its
//! id matches the update in flight; anything else is a stale completion and
//! is dropped.

mod kind;
mod value;

pub use kind::VariableKind;
pub use value::VariableValue;

use crate::error::{QueryError, Result, SchedulerError};
use crate::executor::{QueryCompletion, QueryRequest, QueryResult, RequestId};

/// Lifecycle status of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableStatus {
    /// Before first activation, or after an update was cancelled.
    Idle,

    /// Exactly one update is in flight.
    Loading,

    /// The last update succeeded.
    Resolved,

    /// The last update failed. The previous value, if any, is kept.
    Error,
}

/// What the set must do after starting an update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    /// Hand the request to the query executor.
    Execute(QueryRequest),

    /// The variable resolved on the spot; deliver this completion.
    Resolved(QueryCompletion),
}

/// Outcome of applying a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Resolved with a value or text different from before.
    Changed,

    /// Resolved with the same value and text.
    Unchanged,

    /// The query failed.
    Failed,

    /// The completion does not belong to the update in flight.
    Stale,
}

/// A named variable in a set.
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    kind: VariableKind,
    value: VariableValue,
    text: VariableValue,
    status: VariableStatus,
    error: Option<QueryError>,
    in_flight: Option<RequestId>,

    /// Whether a value was ever applied. The first value always counts as a
    /// change, even when it equals the initial one.
    has_value: bool,

    /// Owes an update: an upstream value changed, or the set activated while
    /// this variable had nothing current.
    pub(crate) pending: bool,

    /// Template edited since the graph was last built.
    pub(crate) template_changed: bool,
}

impl Variable {
    pub fn new(name: impl Into<String>, kind: VariableKind) -> Self {
        Self {
            name: name.into(),
            kind,
            value: VariableValue::default(),
            text: VariableValue::default(),
            status: VariableStatus::Idle,
            error: None,
            in_flight: None,
            has_value: false,
            pending: false,
            template_changed: false,
        }
    }

    /// A variable whose values come from the query executor.
    pub fn query(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self::new(name, VariableKind::query(query))
    }

    /// A variable with a comma-separated option list.
    pub fn custom(name: impl Into<String>, options: impl Into<String>) -> Self {
        Self::new(name, VariableKind::custom(options))
    }

    /// A variable with a fixed value.
    pub fn constant(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, VariableKind::constant(value))
    }

    /// Seed an initial selection, as stored in the dashboard definition.
    ///
    /// The seed is not a resolution: the variable stays `Idle` and its first
    /// successful update is still treated as a change.
    pub fn with_initial_value(
        mut self,
        value: impl Into<VariableValue>,
        text: impl Into<VariableValue>,
    ) -> Self {
        self.value = value.into();
        self.text = text.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &VariableKind {
        &self.kind
    }

    pub fn template(&self) -> &str {
        self.kind.template()
    }

    pub fn value(&self) -> &VariableValue {
        &self.value
    }

    pub fn text(&self) -> &VariableValue {
        &self.text
    }

    pub fn status(&self) -> VariableStatus {
        self.status
    }

    /// Error from the last failed update.
    pub fn error(&self) -> Option<&QueryError> {
        self.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.status == VariableStatus::Loading
    }

    /// Id of the update in flight.
    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight
    }

    /// Whether the variable holds a usable value for its dependents:
    /// resolved, or failed after an earlier success.
    pub fn is_settled(&self) -> bool {
        match self.status {
            VariableStatus::Resolved => true,
            VariableStatus::Error => self.has_value,
            VariableStatus::Idle | VariableStatus::Loading => false,
        }
    }

    /// Whether the variable is waiting for an update to be started.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub(crate) fn set_template(&mut self, template: String) {
        self.kind.set_template(template);
        self.template_changed = true;
    }

    /// Begin an update using the already interpolated template.
    ///
    /// Fails if an update is already in flight.
    pub fn start_update(&mut self, request: RequestId, interpolated: String) -> Result<UpdateAction> {
        if self.is_loading() {
            return Err(SchedulerError::UpdateInFlight(self.name.clone()));
        }

        self.status = VariableStatus::Loading;
        self.in_flight = Some(request);
        self.error = None;
        self.pending = false;

        let action = match self.kind.resolve_locally(&interpolated, &self.value) {
            Some(result) => UpdateAction::Resolved(QueryCompletion::success(
                request,
                self.name.clone(),
                result,
            )),
            None => UpdateAction::Execute(QueryRequest {
                id: request,
                variable: self.name.clone(),
                query: interpolated,
            }),
        };
        Ok(action)
    }

    /// Apply the outcome of update `request`.
    ///
    /// Outcomes for any request other than the one in flight are
    /// [`Settlement::Stale`] and leave the variable untouched.
    pub fn complete_update(
        &mut self,
        request: RequestId,
        outcome: std::result::Result<QueryResult, QueryError>,
    ) -> Settlement {
        if self.in_flight != Some(request) {
            return Settlement::Stale;
        }
        self.in_flight = None;

        match outcome {
            Ok(result) => {
                if self.apply(result.value, result.text) {
                    Settlement::Changed
                } else {
                    Settlement::Unchanged
                }
            }
            Err(error) => {
                self.status = VariableStatus::Error;
                self.error = Some(error);
                Settlement::Failed
            }
        }
    }

    /// Abort the update in flight and return to `Idle`.
    ///
    /// Returns the id of the abandoned request so the executor can be told.
    pub fn cancel_update(&mut self) -> Result<RequestId> {
        match (self.status, self.in_flight.take()) {
            (VariableStatus::Loading, Some(request)) => {
                self.status = VariableStatus::Idle;
                Ok(request)
            }
            _ => Err(SchedulerError::NotLoading(self.name.clone())),
        }
    }

    /// Set the value from outside (a user picking an option), without a
    /// query. Any update in flight is abandoned first.
    ///
    /// Returns the abandoned request, if any, and whether the value changed.
    pub fn set_value_directly(
        &mut self,
        value: VariableValue,
        text: VariableValue,
    ) -> (Option<RequestId>, bool) {
        let cancelled = if self.is_loading() {
            self.cancel_update().ok()
        } else {
            None
        };
        self.error = None;
        let changed = self.apply(value, text);
        (cancelled, changed)
    }

    fn apply(&mut self, value: VariableValue, text: VariableValue) -> bool {
        let changed = !self.has_value || self.value != value || self.text != text;
        self.value = value;
        self.text = text;
        self.status = VariableStatus::Resolved;
        self.has_value = true;
        changed
    }
}
