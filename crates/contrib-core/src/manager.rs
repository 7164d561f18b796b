//! Per extension point contribution manager.
//!
//! A `ContributionManager` owns the dependency graph of one extension point.
//! Contributions wait in the graph until their base and declared
//! dependencies are resolved; resolution installs the merged value into the
//! component, unresolution uninstalls exactly what was installed.
//!
//! All mutations are serialized by a single lock per manager. Component
//! hooks run on the calling thread while that lock is held, so they must not
//! call back into the same manager. Lifecycle events are delivered to
//! listeners after the lock is released.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use contrib_graph::{Entry, GraphListener};
use parking_lot::Mutex;

use crate::contribution::{Contribution, ContributionKind};
use crate::error::{Error, HookError, Result};
use crate::event::{ContributionEvent, ContributionEventKind, ContributionListener};
use crate::fragment::{Fragment, FragmentRegistry};
use crate::listeners::ListenerList;
use crate::merge::{self, ContributionGraph};

/// The receiving side of an extension point.
///
/// Implementations get merged contribution values, never the registered
/// objects themselves. Errors are logged by the manager and do not stop
/// other contributions from being processed.
pub trait Component<C>: Send + Sync {
    fn install(&self, contribution: &C) -> std::result::Result<(), HookError>;

    fn uninstall(&self, contribution: &C) -> std::result::Result<(), HookError>;
}

struct State<C> {
    graph: ContributionGraph<C>,
    fragments: FragmentRegistry,
    /// Merged values currently installed, by contribution id.
    installed: HashMap<String, C>,
    /// Where each contribution came from, when known.
    sources: HashMap<String, String>,
    /// When each contribution was last (re)registered.
    registered_at: HashMap<String, Instant>,
}

/// Registry and installer for the contributions of one extension point.
pub struct ContributionManager<C: Contribution> {
    extension_point: String,
    component: Arc<dyn Component<C>>,
    state: Mutex<State<C>>,
    listeners: ListenerList<dyn ContributionListener>,
}

impl<C: Contribution> ContributionManager<C> {
    /// Create a manager for `extension_point` installing into `component`.
    pub fn new(extension_point: impl Into<String>, component: Arc<dyn Component<C>>) -> Self {
        Self {
            extension_point: extension_point.into(),
            component,
            state: Mutex::new(State {
                graph: ContributionGraph::new(),
                fragments: FragmentRegistry::new(),
                installed: HashMap::new(),
                sources: HashMap::new(),
                registered_at: HashMap::new(),
            }),
            listeners: ListenerList::new(),
        }
    }

    pub fn extension_point(&self) -> &str {
        &self.extension_point
    }

    /// Register a contribution with no source.
    pub fn register(&self, contribution: C) {
        self.register_from(contribution, None);
    }

    /// Register a contribution, remembering where it came from.
    ///
    /// Registering an id that is already present replaces the previous
    /// value: it is uninstalled (along with everything built on it) and the
    /// new value goes through resolution again.
    pub fn register_from(&self, contribution: C, source: Option<&str>) {
        let id = contribution.id().to_string();
        let requirements = contribution.requirements();
        let new_parent = declared_parent(&contribution).map(str::to_string);
        if contribution.base_id() == Some(id.as_str()) {
            tracing::warn!(
                extension_point = %self.extension_point,
                contribution = %id,
                "Contribution names itself as base and will never resolve"
            );
        }

        let mut events = vec![ContributionEvent::new(
            ContributionEventKind::Registered,
            &self.extension_point,
            &id,
        )];
        {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let old_parent = state
                .graph
                .get(id.as_str())
                .and_then(declared_parent)
                .map(str::to_string);

            tracing::debug!(
                extension_point = %self.extension_point,
                contribution = %id,
                update = state.graph.contains(id.as_str()),
                "Registering contribution"
            );
            let mut lifecycle = Lifecycle {
                extension_point: &self.extension_point,
                component: self.component.as_ref(),
                fragments: &mut state.fragments,
                installed: &mut state.installed,
                events: &mut events,
                tearing_down: state.graph.teardown_order(id.as_str()).into_iter().collect(),
            };
            state
                .graph
                .add(id.clone(), contribution, requirements, &mut lifecycle);

            if let Some(old_parent) = old_parent {
                if new_parent.as_deref() != Some(old_parent.as_str()) {
                    state.fragments.forget(&old_parent, &id);
                }
            }
            match source {
                Some(source) => {
                    state.sources.insert(id.clone(), source.to_string());
                }
                None => {
                    state.sources.remove(&id);
                }
            }
            state.registered_at.insert(id.clone(), Instant::now());

            if !state.graph.is_resolved(id.as_str()) {
                tracing::debug!(
                    extension_point = %self.extension_point,
                    contribution = %id,
                    waiting_for = ?state.graph.missing_dependencies(id.as_str()),
                    "Contribution pending"
                );
                events.push(ContributionEvent::new(
                    ContributionEventKind::Pending,
                    &self.extension_point,
                    &id,
                ));
            }
        }
        self.dispatch(events);
    }

    /// Remove a contribution, uninstalling it and everything that depends
    /// on it. Returns the registered value, or `None` if `id` is unknown.
    pub fn unregister(&self, id: &str) -> Option<C> {
        let mut events = Vec::new();
        let removed = {
            let mut guard = self.state.lock();
            self.unregister_locked(&mut guard, id, &mut events)
        };
        self.dispatch(events);
        removed
    }

    /// Remove every contribution registered from `source`, most recently
    /// registered first. Returns how many were removed.
    pub fn unregister_by_source(&self, source: &str) -> usize {
        let mut events = Vec::new();
        let count = {
            let mut guard = self.state.lock();
            let mut ids: Vec<(usize, String)> = guard
                .sources
                .iter()
                .filter(|(_, s)| s.as_str() == source)
                .map(|(id, _)| (guard.graph.position(id.as_str()).unwrap_or(0), id.clone()))
                .collect();
            ids.sort_by(|a, b| b.0.cmp(&a.0));

            ids.iter()
                .filter(|(_, id)| self.unregister_locked(&mut guard, id, &mut events).is_some())
                .count()
        };
        if count > 0 {
            tracing::debug!(
                extension_point = %self.extension_point,
                source,
                count,
                "Unregistered contributions by source"
            );
        }
        self.dispatch(events);
        count
    }

    fn unregister_locked(
        &self,
        state: &mut State<C>,
        id: &str,
        events: &mut Vec<ContributionEvent>,
    ) -> Option<C> {
        let mut lifecycle = Lifecycle {
            extension_point: &self.extension_point,
            component: self.component.as_ref(),
            fragments: &mut state.fragments,
            installed: &mut state.installed,
            events: &mut *events,
            tearing_down: state.graph.teardown_order(id).into_iter().collect(),
        };
        let removed = state.graph.remove(id, &mut lifecycle)?;

        if let Some(parent) = declared_parent(&removed) {
            state.fragments.forget(parent, id);
        }
        state.sources.remove(id);
        state.registered_at.remove(id);
        tracing::debug!(
            extension_point = %self.extension_point,
            contribution = %id,
            "Unregistered contribution"
        );
        events.push(ContributionEvent::new(
            ContributionEventKind::Unregistered,
            &self.extension_point,
            id,
        ));
        Some(removed)
    }

    /// The registered value of `id`, resolved or not.
    pub fn get(&self, id: &str) -> Option<C> {
        self.state.lock().graph.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.lock().graph.contains(id)
    }

    pub fn is_resolved(&self, id: &str) -> bool {
        self.state.lock().graph.is_resolved(id)
    }

    /// Compute the merged value of a resolved contribution.
    pub fn merged(&self, id: &str) -> Result<C> {
        let state = self.state.lock();
        if !state.graph.contains(id) {
            return Err(Error::NotRegistered { id: id.to_string() });
        }
        if !state.graph.is_resolved(id) {
            return Err(Error::NotResolved { id: id.to_string() });
        }
        merge::merged(&state.graph, &state.fragments, id)
    }

    /// The value last installed for `id`, if it is installed.
    pub fn installed(&self, id: &str) -> Option<C> {
        self.state.lock().installed.get(id).cloned()
    }

    /// Ids with an installed value, in registration order.
    pub fn installed_ids(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut ids: Vec<&String> = state.installed.keys().collect();
        ids.sort_by_key(|id| state.graph.position(id.as_str()));
        ids.into_iter().cloned().collect()
    }

    /// Fragments below a composite root, depth-first in merge order.
    pub fn fragments(&self, root: &str) -> Vec<Fragment> {
        self.state.lock().fragments.tree(root)
    }

    /// Pending contributions with the ids they are waiting on.
    pub fn pending(&self) -> Vec<(String, Vec<String>)> {
        self.state.lock().graph.pending()
    }

    /// Pending contributions registered at least `threshold` ago.
    ///
    /// Resolution never times out on its own; this is a diagnostic for
    /// callers who want to report contributions stuck on a dependency that
    /// is never going to arrive. Each stale contribution is logged.
    pub fn stale_pending(&self, threshold: Duration) -> Vec<(String, Vec<String>)> {
        let state = self.state.lock();
        let stale: Vec<(String, Vec<String>)> = state
            .graph
            .pending()
            .into_iter()
            .filter(|(id, _)| {
                state
                    .registered_at
                    .get(id)
                    .is_some_and(|at| at.elapsed() >= threshold)
            })
            .collect();
        for (id, missing) in &stale {
            tracing::warn!(
                extension_point = %self.extension_point,
                contribution = %id,
                waiting_for = ?missing,
                "Contribution still pending"
            );
        }
        stale
    }

    /// Source recorded for `id`.
    pub fn source_of(&self, id: &str) -> Option<String> {
        self.state.lock().sources.get(id).cloned()
    }

    /// Every registered id, in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.state
            .lock()
            .graph
            .iter()
            .map(|entry| entry.id().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add_listener(&self, listener: Arc<dyn ContributionListener>) {
        self.listeners.add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn ContributionListener>) -> bool {
        self.listeners.remove(listener)
    }

    fn dispatch(&self, events: Vec<ContributionEvent>) {
        if events.is_empty() || self.listeners.is_empty() {
            return;
        }
        let listeners = self.listeners.snapshot();
        for event in &events {
            for listener in listeners.iter() {
                listener.handle_event(event);
            }
        }
    }
}

/// Where a composite contribution's fragment record would live. Whether it
/// actually acts as a fragment also depends on its base's kind, see
/// [`merge::fragment_parent`].
fn declared_parent<C: Contribution>(contribution: &C) -> Option<&str> {
    match contribution.kind() {
        ContributionKind::Composite => contribution.base_id(),
        _ => None,
    }
}

/// Turns graph transitions into component installs and uninstalls.
struct Lifecycle<'a, C> {
    extension_point: &'a str,
    component: &'a dyn Component<C>,
    fragments: &'a mut FragmentRegistry,
    installed: &'a mut HashMap<String, C>,
    events: &'a mut Vec<ContributionEvent>,
    /// Ids the current mutation is about to unresolve. They are not
    /// reinstalled on the way down.
    tearing_down: HashSet<String>,
}

impl<C: Contribution> Lifecycle<'_, C> {
    fn install(&mut self, graph: &ContributionGraph<C>, id: &str) {
        let merged = match merge::merged(graph, &*self.fragments, id) {
            Ok(merged) => merged,
            Err(err) => {
                tracing::error!(
                    extension_point = %self.extension_point,
                    contribution = %id,
                    error = %err,
                    "Failed to merge contribution"
                );
                self.event(ContributionEventKind::InstallFailed, id);
                return;
            }
        };

        match self.component.install(&merged) {
            Ok(()) => {
                tracing::debug!(
                    extension_point = %self.extension_point,
                    contribution = %id,
                    "Installed contribution"
                );
                self.installed.insert(id.to_string(), merged);
                self.event(ContributionEventKind::Installed, id);
            }
            Err(err) => {
                tracing::error!(
                    extension_point = %self.extension_point,
                    contribution = %id,
                    error = %err,
                    "Failed to install contribution"
                );
                self.event(ContributionEventKind::InstallFailed, id);
            }
        }
    }

    fn uninstall(&mut self, id: &str) {
        let Some(merged) = self.installed.remove(id) else {
            return;
        };
        if let Err(err) = self.component.uninstall(&merged) {
            tracing::error!(
                extension_point = %self.extension_point,
                contribution = %id,
                error = %err,
                "Failed to uninstall contribution"
            );
        } else {
            tracing::debug!(
                extension_point = %self.extension_point,
                contribution = %id,
                "Uninstalled contribution"
            );
        }
        self.event(ContributionEventKind::Uninstalled, id);
    }

    /// Reinstall the composite root above `fragment`, and everything
    /// installed on top of it, so merged values reflect the current
    /// fragment states.
    fn refresh_root(&mut self, graph: &ContributionGraph<C>, fragment: &str) {
        let root = match merge::root_of(graph, fragment) {
            Ok(root) => root,
            Err(err) => {
                tracing::error!(
                    extension_point = %self.extension_point,
                    contribution = %fragment,
                    error = %err,
                    "Cannot locate composite root"
                );
                return;
            }
        };
        if !graph.is_resolved(root.as_str()) || self.tearing_down.contains(&root) {
            return;
        }

        let inheritors = self.inheritors(graph, &root);
        for id in inheritors.iter().rev() {
            self.uninstall(id);
        }
        self.uninstall(&root);
        self.install(graph, &root);
        for id in &inheritors {
            self.install(graph, id);
        }
    }

    /// Installed contributions whose base chain passes through `root`, in
    /// registration order.
    fn inheritors(&self, graph: &ContributionGraph<C>, root: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .installed
            .keys()
            .filter(|id| {
                id.as_str() != root
                    && !self.tearing_down.contains(*id)
                    && merge::inherits_from(graph, id, root)
            })
            .cloned()
            .collect();
        ids.sort_by_key(|id| graph.position(id.as_str()));
        ids
    }

    fn event(&mut self, kind: ContributionEventKind, id: &str) {
        self.events
            .push(ContributionEvent::new(kind, self.extension_point, id));
    }
}

impl<C: Contribution> GraphListener<String, C> for Lifecycle<'_, C> {
    fn resolved(&mut self, graph: &ContributionGraph<C>, entry: &Entry<String, C>) {
        // Every unresolution of a mutation happens before its first
        // resolution.
        self.tearing_down.clear();
        let contribution = entry.value();
        match merge::fragment_parent(graph, contribution) {
            Some(parent) => {
                self.fragments
                    .enable(parent, contribution.id(), |id| graph.position(id));
                self.refresh_root(graph, contribution.id());
            }
            None => self.install(graph, contribution.id()),
        }
    }

    fn unresolved(&mut self, graph: &ContributionGraph<C>, entry: &Entry<String, C>) {
        let contribution = entry.value();
        match merge::fragment_parent(graph, contribution) {
            Some(parent) => {
                self.fragments.disable(parent, contribution.id());
                self.refresh_root(graph, contribution.id());
            }
            None => self.uninstall(contribution.id()),
        }
    }
}
