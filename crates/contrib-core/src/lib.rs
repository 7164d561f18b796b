//! Contribution registration, override merging and install lifecycle.
//!
//! Components expose named *extension points*. Contributors register
//! [`Contribution`] values against them; each extension point is backed by a
//! [`ContributionManager`] which holds the contributions in a dependency graph
//! and installs them into the component once everything they depend on is
//! installed.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use contrib_core::{Component, ContributionManager, HookError, PropertiesContribution};
//! use serde_json::json;
//!
//! struct Print;
//!
//! impl Component<PropertiesContribution> for Print {
//!     fn install(&self, c: &PropertiesContribution) -> Result<(), HookError> {
//!         println!("install {} {:?}", c.id, c.properties);
//!         Ok(())
//!     }
//!     fn uninstall(&self, c: &PropertiesContribution) -> Result<(), HookError> {
//!         println!("uninstall {}", c.id);
//!         Ok(())
//!     }
//! }
//!
//! let manager: ContributionManager<PropertiesContribution> =
//!     ContributionManager::new("settings", Arc::new(Print));
//! manager.register(
//!     PropertiesContribution::new("custom")
//!         .with_base("defaults")
//!         .with_property("b", json!(3)),
//! );
//! assert!(!manager.is_resolved("custom"));
//!
//! manager.register(
//!     PropertiesContribution::new("defaults")
//!         .with_property("a", json!(1))
//!         .with_property("b", json!(2)),
//! );
//! let merged = manager.merged("custom").unwrap();
//! assert_eq!(merged.get("a"), Some(&json!(1)));
//! assert_eq!(merged.get("b"), Some(&json!(3)));
//! ```

pub mod component;
pub mod contribution;
pub mod error;
pub mod event;
pub mod fragment;
pub mod listeners;
pub mod manager;
pub mod merge;
pub mod properties;

pub use component::{ExtensionPoint, ManagedComponent};
pub use contribution::{Contribution, ContributionKind};
pub use error::{Error, HookError, Result};
pub use event::{ContributionEvent, ContributionEventKind, ContributionListener};
pub use fragment::{Fragment, FragmentRegistry, FragmentState};
pub use listeners::ListenerList;
pub use manager::{Component, ContributionManager};
pub use properties::PropertiesContribution;
