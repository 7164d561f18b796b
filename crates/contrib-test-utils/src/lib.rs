//! Shared test utilities for the contribution runtime workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`component`]: [`RecordingComponent`] and [`EventRecorder`] for
//!   asserting install order and lifecycle events
//! - [`context`]: [`RecordingContext`] and [`ChangeRecorder`] for deployer
//!   tests
//! - [`files`]: [`WatchedDir`], temporary files whose modification time can
//!   be bumped deterministically

pub mod component;
pub mod context;
pub mod files;

pub use component::{Call, EventRecorder, RecordingComponent};
pub use context::{ChangeRecorder, RecordingContext};
pub use files::WatchedDir;
