//! Variable Set Scheduler
//!
//! The [`VariableSet`] owns a collection of variables, builds their
//! dependency graph, and decides at every event which variables must
//! (re)start their update.
//!
//! # Algorithm
//!
//! Activation:
//!
//! 1. Build the dependency graph from the current templates. A cycle fails
//!    activation.
//! 2. Mark every variable without a current value as *pending*.
//! 3. Start each pending variable whose dependencies are all settled, in
//!    declaration order. Everything else waits; nothing is issued early.
//!
//! Value change (a completion with a new value, or a value set directly):
//!
//! 1. Cancel every direct dependent that is loading; its query was
//!    interpolated from the old value.
//! 2. Mark every direct dependent pending.
//! 3. Start the dependents that are ready.
//!
//! Any other settlement (unchanged value, failure) only re-checks the
//! pending direct dependents, so a no-op completion never creates new work.
//! Indirect dependents are reached one level at a time, through their own
//! parents' completions.
//!
//! Deactivation cancels every update in flight and drops the graph.
//!
//! # Concurrency
//!
//! The set is driven from one thread. Queries run elsewhere and report back
//! through [`VariableSet::handle_completion`]. Variables that resolve
//! without the executor queue their completion internally, and the queue is
//! drained before each public call returns.

mod events;

pub use events::{SetEvent, Subscriber, SubscriberId};

use std::collections::VecDeque;

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::config::SetConfig;
use crate::error::{QueryError, Result, SchedulerError};
use crate::executor::{CompletionReceiver, QueryCompletion, QueryExecutor, RequestId};
use crate::graph::DependencyGraph;
use crate::template::{interpolate, Resolution, ValueLookup};
use crate::variable::{Settlement, UpdateAction, Variable, VariableStatus, VariableValue};

impl ValueLookup for IndexMap<String, Variable> {
    fn resolve(&self, name: &str) -> Resolution<'_> {
        match self.get(name) {
            None => Resolution::Unknown,
            Some(variable) if variable.value().is_empty() => Resolution::Unresolved,
            Some(variable) => Resolution::Value(variable.value()),
        }
    }
}

/// An ordered set of variables and the scheduler that keeps them current.
pub struct VariableSet {
    /// Variables in declaration order.
    variables: IndexMap<String, Variable>,

    /// Present while the set is active.
    graph: Option<DependencyGraph>,

    executor: Box<dyn QueryExecutor>,

    config: SetConfig,

    /// Last request id handed out.
    last_request: u64,

    /// Completions produced without the executor, waiting to be applied.
    local_completions: VecDeque<QueryCompletion>,

    /// Variables whose value was set while the set was inactive. Their
    /// dependents are refreshed on the next activation.
    changed_while_inactive: Vec<String>,

    subscribers: Vec<Subscriber>,
}

impl VariableSet {
    /// Create an inactive set. Names must be unique.
    pub fn new<I, E>(variables: I, executor: E) -> Result<Self>
    where
        I: IntoIterator<Item = Variable>,
        E: QueryExecutor + 'static,
    {
        let mut by_name = IndexMap::new();
        for variable in variables {
            let name = variable.name().to_string();
            if by_name.insert(name.clone(), variable).is_some() {
                return Err(SchedulerError::DuplicateVariable(name));
            }
        }

        Ok(Self {
            variables: by_name,
            graph: None,
            executor: Box::new(executor),
            config: SetConfig::default(),
            last_request: 0,
            local_completions: VecDeque::new(),
            changed_while_inactive: Vec::new(),
            subscribers: Vec::new(),
        })
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: SetConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SetConfig {
        &self.config
    }

    /// Register a callback for set events.
    pub fn subscribe<F>(&mut self, notify: F) -> SubscriberId
    where
        F: Fn(&SetEvent) + Send + Sync + 'static,
    {
        let subscriber = Subscriber::new(notify);
        let id = subscriber.id();
        self.subscribers.push(subscriber);
        id
    }

    /// Remove a callback. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|subscriber| subscriber.id() != id);
        self.subscribers.len() != before
    }

    fn emit(&self, event: SetEvent) {
        for subscriber in &self.subscribers {
            subscriber.notify(&event);
        }
    }

    pub fn is_active(&self) -> bool {
        self.graph.is_some()
    }

    /// Whether any variable has an update in flight.
    pub fn is_loading(&self) -> bool {
        self.variables.values().any(Variable::is_loading)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Variables in declaration order.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// The dependency graph of the current activation.
    pub fn graph(&self) -> Option<&DependencyGraph> {
        self.graph.as_ref()
    }

    /// Direct dependencies of `name` in the current activation.
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.graph
            .as_ref()
            .map(|graph| graph.dependencies_of(name).collect())
            .unwrap_or_default()
    }

    /// Direct dependents of `name` in the current activation.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.graph
            .as_ref()
            .map(|graph| graph.dependents_of(name).collect())
            .unwrap_or_default()
    }

    /// Interpolate arbitrary text (a panel query, a title) with the current
    /// variable values.
    pub fn interpolate(&self, template: &str) -> String {
        interpolate(template, &self.variables, &self.config.multi_value_separator)
    }

    fn next_request_id(&mut self) -> RequestId {
        self.last_request += 1;
        RequestId::from(self.last_request)
    }

    /// Build the graph and start every variable that can start.
    ///
    /// Activating an active set rebuilds the graph and picks up template
    /// edits; variables that are already resolved are left alone unless
    /// [`SetConfig::refresh_on_activate`] is set.
    pub fn activate(&mut self) -> Result<()> {
        self.rebuild(self.config.refresh_on_activate)
    }

    /// Rebuild the graph, mark what needs an update and start what can.
    ///
    /// With `force` every variable is marked, otherwise only the ones without
    /// a current value, with an edited template, or still owing an update.
    fn rebuild(&mut self, force: bool) -> Result<()> {
        let graph = DependencyGraph::build(
            self.variables
                .iter()
                .map(|(name, variable)| (name.as_str(), variable.template())),
            self.config.unknown_references,
        )?;

        let mut cancelled = Vec::new();
        for variable in self.variables.values_mut() {
            let template_changed = std::mem::take(&mut variable.template_changed);
            if variable.is_loading() {
                if !template_changed {
                    continue;
                }
                if let Ok(request) = variable.cancel_update() {
                    self.executor.cancel(request);
                    cancelled.push((variable.name().to_string(), request));
                }
            }
            if force || template_changed || variable.status() != VariableStatus::Resolved {
                variable.pending = true;
            }
        }

        for name in std::mem::take(&mut self.changed_while_inactive) {
            for dependent in graph.dependents_of(&name) {
                if let Some(variable) = self.variables.get_mut(dependent) {
                    variable.pending = true;
                }
            }
        }

        self.graph = Some(graph);
        for (variable, request) in cancelled {
            self.emit(SetEvent::UpdateCancelled { variable, request });
        }

        let pending: Vec<String> = self
            .variables
            .values()
            .filter(|variable| variable.pending)
            .map(|variable| variable.name().to_string())
            .collect();
        debug!(
            variables = self.variables.len(),
            pending = pending.len(),
            "activating variable set"
        );
        self.emit(SetEvent::Activated);

        for name in &pending {
            self.try_start(name);
        }
        self.drain();
        Ok(())
    }

    /// Cancel every update in flight and drop the graph.
    ///
    /// Variables that still owe an update stay marked, so the next
    /// activation picks them up.
    pub fn deactivate(&mut self) {
        if !self.is_active() {
            return;
        }

        let mut cancelled = Vec::new();
        for variable in self.variables.values_mut() {
            if let Ok(request) = variable.cancel_update() {
                self.executor.cancel(request);
                cancelled.push((variable.name().to_string(), request));
            }
        }
        self.local_completions.clear();
        self.graph = None;

        debug!(cancelled = cancelled.len(), "deactivated variable set");
        for (variable, request) in cancelled {
            self.emit(SetEvent::UpdateCancelled { variable, request });
        }
        self.emit(SetEvent::Deactivated);
    }

    /// Apply a completion delivered by the executor.
    ///
    /// Completions for requests that are no longer in flight are dropped.
    pub fn handle_completion(&mut self, completion: QueryCompletion) {
        self.local_completions.push_back(completion);
        self.drain();
    }

    /// Set a variable's value from outside, as when a user picks an option.
    ///
    /// Behaves like a completed update: if the value changed, dependents are
    /// re-triggered.
    pub fn set_value(
        &mut self,
        name: &str,
        value: impl Into<VariableValue>,
        text: impl Into<VariableValue>,
    ) -> Result<()> {
        let variable = self
            .variables
            .get_mut(name)
            .ok_or_else(|| SchedulerError::UnknownVariable(name.to_string()))?;

        let (cancelled, changed) = variable.set_value_directly(value.into(), text.into());
        variable.pending = false;

        if let Some(request) = cancelled {
            self.executor.cancel(request);
            self.emit(SetEvent::UpdateCancelled {
                variable: name.to_string(),
                request,
            });
        }

        if changed {
            debug!(variable = %name, "variable value set directly");
            self.emit(SetEvent::ValueChanged {
                variable: name.to_string(),
            });
            if self.is_active() {
                self.cascade(name);
            } else if !self.changed_while_inactive.iter().any(|n| n == name) {
                self.changed_while_inactive.push(name.to_string());
            }
        } else if self.is_active() {
            self.unblock_dependents(name);
        }

        self.drain();
        Ok(())
    }

    /// Replace a variable's template.
    ///
    /// On an active set this re-activates: the graph is rebuilt and the
    /// edited variable refreshed. A template that would create a cycle is
    /// rolled back and the error returned. On an inactive set the edit is
    /// picked up by the next activation.
    pub fn set_template(&mut self, name: &str, template: impl Into<String>) -> Result<()> {
        let variable = self
            .variables
            .get_mut(name)
            .ok_or_else(|| SchedulerError::UnknownVariable(name.to_string()))?;

        let previous = variable.template().to_string();
        let was_changed = variable.template_changed;
        variable.set_template(template.into());

        if !self.is_active() {
            return Ok(());
        }

        if let Err(err) = self.rebuild(false) {
            if let Some(variable) = self.variables.get_mut(name) {
                variable.set_template(previous);
                variable.template_changed = was_changed;
            }
            return Err(err);
        }
        Ok(())
    }

    /// Re-query one variable, abandoning any update in flight.
    ///
    /// On an inactive set the refresh happens at the next activation.
    pub fn refresh(&mut self, name: &str) -> Result<()> {
        let variable = self
            .variables
            .get_mut(name)
            .ok_or_else(|| SchedulerError::UnknownVariable(name.to_string()))?;

        if let Ok(request) = variable.cancel_update() {
            self.executor.cancel(request);
            self.emit(SetEvent::UpdateCancelled {
                variable: name.to_string(),
                request,
            });
        }
        if let Some(variable) = self.variables.get_mut(name) {
            variable.pending = true;
        }

        self.try_start(name);
        self.drain();
        Ok(())
    }

    /// Apply completions from `completions` until nothing is loading or the
    /// channel closes.
    pub async fn run_until_settled(&mut self, completions: &mut CompletionReceiver) {
        while self.is_loading() {
            match completions.recv().await {
                Some(completion) => self.handle_completion(completion),
                None => break,
            }
        }
    }

    /// Whether `name` may start now: pending, not loading, and every direct
    /// dependency settled with nothing owed.
    fn is_ready(&self, name: &str) -> bool {
        let Some(graph) = self.graph.as_ref() else {
            return false;
        };
        match self.variables.get(name) {
            Some(variable) if variable.pending && !variable.is_loading() => {}
            _ => return false,
        }
        graph.is_ready_with(name, |dependency| {
            self.variables
                .get(dependency)
                .map_or(false, |dep| dep.is_settled() && !dep.pending)
        })
    }

    /// Start `name` if it is ready. Returns whether an update was started.
    fn try_start(&mut self, name: &str) -> bool {
        if !self.is_ready(name) {
            trace!(variable = %name, "variable not ready");
            return false;
        }

        let request = self.next_request_id();
        let Some(template) = self.variables.get(name).map(|v| v.template().to_string()) else {
            return false;
        };
        let query = interpolate(&template, &self.variables, &self.config.multi_value_separator);

        let Some(variable) = self.variables.get_mut(name) else {
            return false;
        };
        let external = variable.kind().runs_query();
        let action = match variable.start_update(request, query.clone()) {
            Ok(action) => action,
            Err(err) => {
                warn!(variable = %name, error = %err, "could not start variable update");
                return false;
            }
        };

        debug!(
            variable = %name,
            request = %request,
            query = %query,
            external,
            "starting variable update"
        );
        self.emit(SetEvent::UpdateStarted {
            variable: name.to_string(),
            request,
            query,
        });
        match action {
            UpdateAction::Execute(query) => self.executor.execute(query),
            UpdateAction::Resolved(completion) => self.local_completions.push_back(completion),
        }
        true
    }

    fn drain(&mut self) {
        while let Some(completion) = self.local_completions.pop_front() {
            self.apply_completion(completion);
        }
    }

    fn apply_completion(&mut self, completion: QueryCompletion) {
        let QueryCompletion {
            request,
            variable: name,
            outcome,
        } = completion;

        let Some(variable) = self.variables.get_mut(&name) else {
            debug!(variable = %name, request = %request, "completion for unknown variable dropped");
            return;
        };
        let error: Option<QueryError> = outcome.as_ref().err().cloned();

        match variable.complete_update(request, outcome) {
            Settlement::Stale => {
                debug!(variable = %name, request = %request, "discarding stale completion");
                self.emit(SetEvent::StaleCompletionDiscarded {
                    variable: name,
                    request,
                });
            }
            Settlement::Changed => {
                debug!(variable = %name, request = %request, "variable value changed");
                self.emit(SetEvent::UpdateCompleted {
                    variable: name.clone(),
                    request,
                    changed: true,
                });
                self.emit(SetEvent::ValueChanged {
                    variable: name.clone(),
                });
                self.cascade(&name);
            }
            Settlement::Unchanged => {
                debug!(variable = %name, request = %request, "variable value unchanged");
                self.emit(SetEvent::UpdateCompleted {
                    variable: name.clone(),
                    request,
                    changed: false,
                });
                self.unblock_dependents(&name);
            }
            Settlement::Failed => {
                let error = error.unwrap_or_else(|| QueryError::new("query failed"));
                debug!(variable = %name, request = %request, error = %error, "variable update failed");
                self.emit(SetEvent::UpdateFailed {
                    variable: name.clone(),
                    request,
                    error,
                });
                self.unblock_dependents(&name);
            }
        }
    }

    fn direct_dependents(&self, name: &str) -> Vec<String> {
        self.graph
            .as_ref()
            .map(|graph| graph.dependents_of(name).map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Re-trigger the direct dependents of a changed variable.
    fn cascade(&mut self, name: &str) {
        let dependents = self.direct_dependents(name);
        for dependent in &dependents {
            let Some(variable) = self.variables.get_mut(dependent) else {
                continue;
            };
            if let Ok(request) = variable.cancel_update() {
                self.executor.cancel(request);
                debug!(variable = %dependent, request = %request, "cancelled update using stale input");
                self.emit(SetEvent::UpdateCancelled {
                    variable: dependent.clone(),
                    request,
                });
            }
            if let Some(variable) = self.variables.get_mut(dependent) {
                variable.pending = true;
            }
        }
        for dependent in &dependents {
            self.try_start(dependent);
        }
    }

    /// Start pending direct dependents that `name` was holding back.
    fn unblock_dependents(&mut self, name: &str) {
        for dependent in self.direct_dependents(name) {
            if self.variables.get(&dependent).is_some_and(|v| v.pending) {
                self.try_start(&dependent);
            }
        }
    }
}

impl std::fmt::Debug for VariableSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableSet")
            .field("variables", &self.variables)
            .field("active", &self.is_active())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
