//! Contribution lifecycle events.

use std::fmt;

/// What happened to a contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContributionEventKind {
    /// Accepted by the manager (new or updated).
    Registered,
    /// Registered but waiting on dependencies.
    Pending,
    /// Merged value handed to the component.
    Installed,
    /// The component rejected the merged value, or merging failed.
    InstallFailed,
    /// Previously installed value withdrawn from the component.
    Uninstalled,
    /// Removed from the manager.
    Unregistered,
}

impl fmt::Display for ContributionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered => write!(f, "registered"),
            Self::Pending => write!(f, "pending"),
            Self::Installed => write!(f, "installed"),
            Self::InstallFailed => write!(f, "install-failed"),
            Self::Uninstalled => write!(f, "uninstalled"),
            Self::Unregistered => write!(f, "unregistered"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionEvent {
    pub kind: ContributionEventKind,
    pub extension_point: String,
    pub id: String,
}

impl ContributionEvent {
    pub fn new(kind: ContributionEventKind, extension_point: &str, id: &str) -> Self {
        Self {
            kind,
            extension_point: extension_point.to_string(),
            id: id.to_string(),
        }
    }
}

/// Observer of contribution lifecycle events.
///
/// Events are delivered after the manager lock is released, in the order
/// they happened.
pub trait ContributionListener: Send + Sync {
    fn handle_event(&self, event: &ContributionEvent);
}
