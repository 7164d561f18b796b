//! Copy-on-write listener lists.

use std::sync::Arc;

use parking_lot::Mutex;

/// A list of listeners that can be changed while it is being notified.
///
/// Notification iterates over a snapshot, so callbacks may add or remove
/// listeners (including themselves) without affecting the round in
/// progress.
pub struct ListenerList<L: ?Sized> {
    listeners: Mutex<Arc<Vec<Arc<L>>>>,
}

impl<L: ?Sized> Default for ListenerList<L> {
    fn default() -> Self {
        Self {
            listeners: Mutex::new(Arc::new(Vec::new())),
        }
    }
}

impl<L: ?Sized> std::fmt::Debug for ListenerList<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerList")
            .field("len", &self.len())
            .finish()
    }
}

impl<L: ?Sized> ListenerList<L> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<L>) {
        let mut guard = self.listeners.lock();
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(listener);
        *guard = Arc::new(next);
    }

    /// Remove a listener by identity. Returns whether it was present.
    pub fn remove(&self, listener: &Arc<L>) -> bool {
        let mut guard = self.listeners.lock();
        if !guard.iter().any(|l| Arc::ptr_eq(l, listener)) {
            return false;
        }
        let next: Vec<Arc<L>> = guard
            .iter()
            .filter(|l| !Arc::ptr_eq(l, listener))
            .cloned()
            .collect();
        *guard = Arc::new(next);
        true
    }

    /// The current listeners.
    pub fn snapshot(&self) -> Arc<Vec<Arc<L>>> {
        Arc::clone(&self.listeners.lock())
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
