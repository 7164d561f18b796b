//! Dependency graph for extension contributions.
//!
//! Entries are registered with the ids they depend on and stay pending until
//! every dependency is resolved. Resolution and unresolution are reported to a
//! [`GraphListener`] in dependency order, which is how the contribution layer
//! drives install and uninstall.
//!
//! # Example
//!
//! ```
//! use contrib_graph::{DependencyGraph, RecordingListener};
//!
//! let mut graph = DependencyGraph::new();
//! let mut events = RecordingListener::default();
//!
//! graph.add("app", 2, ["core"], &mut events);
//! assert!(!graph.is_resolved("app"));
//!
//! graph.add("core", 1, [], &mut events);
//! assert_eq!(events.resolved, vec!["core", "app"]);
//! ```

pub mod graph;
pub mod listener;

pub use graph::{DependencyGraph, Entry, EntryState};
pub use listener::{GraphListener, RecordingListener};
