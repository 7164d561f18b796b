//! Resolution callbacks.

use crate::graph::{DependencyGraph, Entry};

/// Receives resolution transitions from a [`DependencyGraph`].
///
/// Both callbacks get a shared view of the whole graph, so a listener can
/// look up other resolved entries (a base contribution, for instance) while
/// handling one transition. The graph has already updated the entry's state
/// when a callback runs; everything the entry depends on is still resolved.
pub trait GraphListener<K, V> {
    /// Called once all dependencies of `entry` are resolved.
    fn resolved(&mut self, graph: &DependencyGraph<K, V>, entry: &Entry<K, V>);

    /// Called when `entry` stops being resolved, before it is removed or
    /// updated.
    fn unresolved(&mut self, graph: &DependencyGraph<K, V>, entry: &Entry<K, V>);
}

impl<K, V> GraphListener<K, V> for () {
    fn resolved(&mut self, _graph: &DependencyGraph<K, V>, _entry: &Entry<K, V>) {}

    fn unresolved(&mut self, _graph: &DependencyGraph<K, V>, _entry: &Entry<K, V>) {}
}

/// Listener that records the ids it sees, in callback order.
#[derive(Debug, Clone)]
pub struct RecordingListener<K> {
    pub resolved: Vec<K>,
    pub unresolved: Vec<K>,
}

impl<K> Default for RecordingListener<K> {
    fn default() -> Self {
        Self {
            resolved: Vec::new(),
            unresolved: Vec::new(),
        }
    }
}

impl<K> RecordingListener<K> {
    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.resolved.clear();
        self.unresolved.clear();
    }
}

impl<K: Clone, V> GraphListener<K, V> for RecordingListener<K> {
    fn resolved(&mut self, _graph: &DependencyGraph<K, V>, entry: &Entry<K, V>) {
        self.resolved.push(entry.id().clone());
    }

    fn unresolved(&mut self, _graph: &DependencyGraph<K, V>, entry: &Entry<K, V>) {
        self.unresolved.push(entry.id().clone());
    }
}
