//! Fragment bookkeeping for composite contributions.
//!
//! The registry, not the contribution, owns whether a fragment currently
//! takes part in merges. A fragment whose dependencies go away is disabled
//! but keeps its slot, so re-enabling it later restores the original merge
//! order.

use std::collections::HashMap;

/// Whether a fragment is applied when its root is merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentState {
    Enabled,
    Disabled,
}

/// Registration record of one fragment under its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub id: String,
    pub state: FragmentState,
}

impl Fragment {
    pub fn is_enabled(&self) -> bool {
        self.state == FragmentState::Enabled
    }
}

/// Fragments keyed by the id of the contribution they extend.
#[derive(Debug, Clone, Default)]
pub struct FragmentRegistry {
    children: HashMap<String, Vec<Fragment>>,
}

impl FragmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable `id` under `parent`, creating its record if needed.
    ///
    /// New records are slotted by `position` (the contribution's
    /// registration index) so merge order follows registration order no
    /// matter in which order fragments resolve.
    pub fn enable(&mut self, parent: &str, id: &str, position: impl Fn(&str) -> Option<usize>) {
        let siblings = self.children.entry(parent.to_string()).or_default();
        if let Some(existing) = siblings.iter_mut().find(|f| f.id == id) {
            existing.state = FragmentState::Enabled;
            return;
        }

        let own = position(id).unwrap_or(usize::MAX);
        let slot = siblings
            .iter()
            .position(|f| position(&f.id).unwrap_or(usize::MAX) > own)
            .unwrap_or(siblings.len());
        siblings.insert(
            slot,
            Fragment {
                id: id.to_string(),
                state: FragmentState::Enabled,
            },
        );
    }

    /// Disable `id` under `parent`. Returns `false` if there is no record.
    pub fn disable(&mut self, parent: &str, id: &str) -> bool {
        match self
            .children
            .get_mut(parent)
            .and_then(|siblings| siblings.iter_mut().find(|f| f.id == id))
        {
            Some(fragment) => {
                fragment.state = FragmentState::Disabled;
                true
            }
            None => false,
        }
    }

    /// Drop the record of `id` under `parent` entirely.
    pub fn forget(&mut self, parent: &str, id: &str) {
        if let Some(siblings) = self.children.get_mut(parent) {
            siblings.retain(|f| f.id != id);
            if siblings.is_empty() {
                self.children.remove(parent);
            }
        }
    }

    /// Direct fragments of `parent`, in merge order.
    pub fn children(&self, parent: &str) -> &[Fragment] {
        self.children.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every fragment below `root`, depth-first in merge order.
    pub fn tree(&self, root: &str) -> Vec<Fragment> {
        let mut out = Vec::new();
        self.walk(root, &mut out, &mut vec![root.to_string()]);
        out
    }

    fn walk(&self, parent: &str, out: &mut Vec<Fragment>, path: &mut Vec<String>) {
        for fragment in self.children(parent) {
            if path.contains(&fragment.id) {
                continue;
            }
            out.push(fragment.clone());
            path.push(fragment.id.clone());
            self.walk(&fragment.id, out, path);
            path.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(order: &'static [&'static str]) -> impl Fn(&str) -> Option<usize> {
        move |id| order.iter().position(|x| *x == id)
    }

    #[test]
    fn test_enable_orders_by_registration_position() {
        let mut registry = FragmentRegistry::new();
        let pos = positions(&["root", "a", "b", "c"]);

        registry.enable("root", "c", &pos);
        registry.enable("root", "a", &pos);
        registry.enable("root", "b", &pos);

        let ids: Vec<&str> = registry.children("root").iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_disable_keeps_slot() {
        let mut registry = FragmentRegistry::new();
        let pos = positions(&["root", "a", "b"]);
        registry.enable("root", "a", &pos);
        registry.enable("root", "b", &pos);

        assert!(registry.disable("root", "a"));
        assert_eq!(registry.children("root")[0].state, FragmentState::Disabled);

        registry.enable("root", "a", &pos);
        assert_eq!(registry.children("root")[0].id, "a");
        assert!(registry.children("root")[0].is_enabled());
    }

    #[test]
    fn test_disable_unknown_returns_false() {
        let mut registry = FragmentRegistry::new();
        assert!(!registry.disable("root", "ghost"));
    }

    #[test]
    fn test_forget_removes_record() {
        let mut registry = FragmentRegistry::new();
        let pos = positions(&["root", "a"]);
        registry.enable("root", "a", &pos);
        registry.forget("root", "a");
        assert!(registry.children("root").is_empty());
    }

    #[test]
    fn test_tree_is_depth_first() {
        let mut registry = FragmentRegistry::new();
        let pos = positions(&["root", "a", "b", "a1"]);
        registry.enable("root", "a", &pos);
        registry.enable("root", "b", &pos);
        registry.enable("a", "a1", &pos);

        let ids: Vec<String> = registry.tree("root").into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec!["a", "a1", "b"]);
    }
}
