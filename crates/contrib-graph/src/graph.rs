//! Dependency graph with pending/resolved entries.
//!
//! Edges point from dependent to dependency: if A depends on B, A cannot
//! resolve until B has. Entries whose dependencies never arrive (including
//! cycles and self references) stay pending; that is not an error.

use std::borrow::Borrow;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};

use crate::listener::GraphListener;

/// Resolution state of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryState {
    /// Waiting on at least one dependency.
    Pending,
    /// Every dependency is resolved and the resolved hook has fired.
    Resolved,
}

/// A single registration in the graph.
#[derive(Debug, Clone)]
pub struct Entry<K, V> {
    id: K,
    value: V,
    depends_on: IndexSet<K>,
    state: EntryState,
}

impl<K, V> Entry<K, V> {
    pub fn id(&self) -> &K {
        &self.id
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    /// Declared dependencies, in declaration order.
    pub fn depends_on(&self) -> impl Iterator<Item = &K> {
        self.depends_on.iter()
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    pub fn is_resolved(&self) -> bool {
        self.state == EntryState::Resolved
    }
}

/// Keyed graph of pending and resolved entries.
///
/// Mutations take a [`GraphListener`] which is told about every state
/// transition they cause. Dependencies always resolve before their
/// dependents, and dependents are unresolved before the entries they
/// depend on.
///
/// The graph itself is not synchronized; owners serialize access.
#[derive(Debug, Clone)]
pub struct DependencyGraph<K, V> {
    /// Entries in registration order. Updates keep their slot.
    entries: IndexMap<K, Entry<K, V>>,
    /// Reverse edges: dependency id -> ids that declared it.
    ///
    /// Kept for ids that are not registered yet so late arrivals can wake
    /// their waiting dependents.
    dependents: HashMap<K, IndexSet<K>>,
}

impl<K, V> Default for DependencyGraph<K, V> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
            dependents: HashMap::new(),
        }
    }
}

impl<K, V> DependencyGraph<K, V>
where
    K: Clone + Eq + Hash + Debug,
{
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` under `id`, depending on `depends_on`.
    ///
    /// The entry resolves immediately when all of its dependencies already
    /// are, and resolving it may in turn resolve pending dependents.
    ///
    /// Re-adding an existing id is an update: the entry (and everything
    /// resolved on top of it) is unresolved first, the value and
    /// dependencies are replaced in place, then resolution is retried.
    /// Returns the previous value on update.
    pub fn add<L>(
        &mut self,
        id: K,
        value: V,
        depends_on: impl IntoIterator<Item = K>,
        listener: &mut L,
    ) -> Option<V>
    where
        L: GraphListener<K, V> + ?Sized,
    {
        let depends_on: IndexSet<K> = depends_on.into_iter().collect();
        if depends_on.contains(&id) {
            tracing::warn!(id = ?id, "Entry depends on itself and will never resolve");
        }

        let previous = match self.entries.get_index_of(&id) {
            Some(index) => {
                self.unresolve_cascade(&id, listener);
                self.unlink(&id);
                let entry = &mut self.entries[index];
                entry.depends_on = depends_on;
                entry.state = EntryState::Pending;
                Some(std::mem::replace(&mut entry.value, value))
            }
            None => {
                self.entries.insert(
                    id.clone(),
                    Entry {
                        id: id.clone(),
                        value,
                        depends_on,
                        state: EntryState::Pending,
                    },
                );
                None
            }
        };

        self.link(&id);
        self.resolve_from(id, listener);
        previous
    }

    /// Remove `id` from the graph.
    ///
    /// Every resolved entry that depends on it, directly or transitively, is
    /// demoted to pending (dependents first), then the entry itself is
    /// unresolved and dropped. Demoted entries resolve again if `id` comes
    /// back. Removing an unknown id is a no-op.
    pub fn remove<Q, L>(&mut self, id: &Q, listener: &mut L) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        L: GraphListener<K, V> + ?Sized,
    {
        let key = self.entries.get_key_value(id).map(|(key, _)| key.clone())?;
        self.unresolve_cascade(&key, listener);
        self.unlink(&key);
        self.entries.shift_remove(&key).map(|entry| entry.value)
    }

    /// The value registered under `id`, whatever its state.
    pub fn get<Q>(&self, id: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.entries.get(id).map(|entry| &entry.value)
    }

    /// The value registered under `id` if it is resolved.
    pub fn get_resolved<Q>(&self, id: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.entries
            .get(id)
            .filter(|entry| entry.is_resolved())
            .map(|entry| &entry.value)
    }

    /// The full entry registered under `id`.
    pub fn entry<Q>(&self, id: &Q) -> Option<&Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.entries.get(id)
    }

    pub fn is_resolved<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.entries.get(id).is_some_and(Entry::is_resolved)
    }

    pub fn contains<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.entries.contains_key(id)
    }

    /// Registration index of `id`. Stable across updates of the same id.
    pub fn position<Q>(&self, id: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.entries.get_index_of(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry<K, V>> {
        self.entries.values()
    }

    /// Ids of resolved entries, in registration order.
    pub fn resolved_ids(&self) -> Vec<K> {
        self.entries
            .values()
            .filter(|entry| entry.is_resolved())
            .map(|entry| entry.id.clone())
            .collect()
    }

    /// Pending entries with the dependencies they are still waiting on.
    pub fn pending(&self) -> Vec<(K, Vec<K>)> {
        self.entries
            .values()
            .filter(|entry| !entry.is_resolved())
            .map(|entry| (entry.id.clone(), self.unsatisfied(entry)))
            .collect()
    }

    /// Dependencies of `id` that are absent or not resolved.
    pub fn missing_dependencies<Q>(&self, id: &Q) -> Vec<K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.entries
            .get(id)
            .map(|entry| self.unsatisfied(entry))
            .unwrap_or_default()
    }

    /// Ids that declared a dependency on `id`, registered or not.
    pub fn dependents_of<Q>(&self, id: &Q) -> Vec<K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.dependents
            .get(id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Entries that unresolve if `id` is removed or updated, in the order
    /// they would: resolved dependents first (transitively), `id` last.
    /// Empty when `id` is unknown or pending.
    pub fn teardown_order<Q>(&self, id: &Q) -> Vec<K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.entries.get_key_value(id) {
            Some((key, _)) => self.resolved_closure(key),
            None => Vec::new(),
        }
    }

    fn unsatisfied(&self, entry: &Entry<K, V>) -> Vec<K> {
        entry
            .depends_on
            .iter()
            .filter(|dep| !self.is_resolved(*dep))
            .cloned()
            .collect()
    }

    fn can_resolve(&self, id: &K) -> bool {
        match self.entries.get(id) {
            Some(entry) => {
                !entry.is_resolved() && entry.depends_on.iter().all(|dep| self.is_resolved(dep))
            }
            None => false,
        }
    }

    fn link(&mut self, id: &K) {
        let deps: Vec<K> = match self.entries.get(id) {
            Some(entry) => entry.depends_on.iter().cloned().collect(),
            None => return,
        };
        for dep in deps {
            self.dependents.entry(dep).or_default().insert(id.clone());
        }
    }

    fn unlink(&mut self, id: &K) {
        let deps: Vec<K> = match self.entries.get(id) {
            Some(entry) => entry.depends_on.iter().cloned().collect(),
            None => return,
        };
        for dep in deps {
            if let Some(ids) = self.dependents.get_mut(&dep) {
                ids.shift_remove(id);
                if ids.is_empty() {
                    self.dependents.remove(&dep);
                }
            }
        }
    }

    /// Resolve `start` if possible, then every dependent it unblocks.
    fn resolve_from<L>(&mut self, start: K, listener: &mut L)
    where
        L: GraphListener<K, V> + ?Sized,
    {
        let mut queue = VecDeque::from([start]);
        while let Some(id) = queue.pop_front() {
            if !self.can_resolve(&id) {
                continue;
            }
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.state = EntryState::Resolved;
            }
            tracing::trace!(id = ?id, "Resolved");
            if let Some(entry) = self.entries.get(&id) {
                listener.resolved(self, entry);
            }
            if let Some(waiting) = self.dependents.get(&id) {
                queue.extend(
                    waiting
                        .iter()
                        .filter(|dependent| self.can_resolve(dependent))
                        .cloned(),
                );
            }
        }
    }

    /// Unresolve `id` and every resolved entry built on it.
    fn unresolve_cascade<L>(&mut self, id: &K, listener: &mut L)
    where
        L: GraphListener<K, V> + ?Sized,
    {
        for key in self.resolved_closure(id) {
            if let Some(entry) = self.entries.get_mut(&key) {
                entry.state = EntryState::Pending;
            }
            tracing::trace!(id = ?key, "Unresolved");
            if let Some(entry) = self.entries.get(&key) {
                listener.unresolved(self, entry);
            }
        }
    }

    /// Resolved dependents of `root` (transitively) followed by `root`
    /// itself, dependents always before what they depend on.
    fn resolved_closure(&self, root: &K) -> Vec<K> {
        let mut order = Vec::new();
        if !self.is_resolved(root) {
            return order;
        }

        // Iterative post-order walk over reverse edges.
        let mut visited: HashSet<K> = HashSet::new();
        let mut stack: Vec<(K, bool)> = vec![(root.clone(), false)];
        while let Some((key, finished)) = stack.pop() {
            if finished {
                order.push(key);
                continue;
            }
            if !visited.insert(key.clone()) {
                continue;
            }
            stack.push((key.clone(), true));
            if let Some(waiting) = self.dependents.get(&key) {
                for dependent in waiting.iter().rev() {
                    if self.is_resolved(dependent) && !visited.contains(dependent) {
                        stack.push((dependent.clone(), false));
                    }
                }
            }
        }
        order
    }
}
