//! Components and listeners that record what they are told.

use std::collections::HashSet;

use contrib_core::{
    Component, Contribution, ContributionEvent, ContributionEventKind, ContributionListener,
    HookError,
};
use parking_lot::Mutex;

/// One hook invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Call<C> {
    Install(C),
    Uninstall(C),
}

impl<C: Contribution> Call<C> {
    pub fn contribution(&self) -> &C {
        match self {
            Self::Install(c) | Self::Uninstall(c) => c,
        }
    }

    /// `+id` for installs, `-id` for uninstalls.
    pub fn label(&self) -> String {
        match self {
            Self::Install(c) => format!("+{}", c.id()),
            Self::Uninstall(c) => format!("-{}", c.id()),
        }
    }
}

/// A component that records every install and uninstall.
///
/// Installs of ids passed to [`RecordingComponent::fail_on`] return an error
/// and are still recorded.
pub struct RecordingComponent<C> {
    calls: Mutex<Vec<Call<C>>>,
    failing: Mutex<HashSet<String>>,
}

impl<C> Default for RecordingComponent<C> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }
}

impl<C: Contribution> RecordingComponent<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make installs of `id` fail.
    pub fn fail_on(&self, id: &str) {
        self.failing.lock().insert(id.to_string());
    }

    pub fn succeed_on(&self, id: &str) {
        self.failing.lock().remove(id);
    }

    pub fn calls(&self) -> Vec<Call<C>> {
        self.calls.lock().clone()
    }

    /// Calls as `+id` / `-id` labels.
    pub fn log(&self) -> Vec<String> {
        self.calls.lock().iter().map(Call::label).collect()
    }

    /// The value passed to the most recent install of `id`.
    pub fn last_installed(&self, id: &str) -> Option<C> {
        self.calls.lock().iter().rev().find_map(|call| match call {
            Call::Install(c) if c.id() == id => Some(c.clone()),
            _ => None,
        })
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl<C: Contribution> Component<C> for RecordingComponent<C> {
    fn install(&self, contribution: &C) -> Result<(), HookError> {
        self.calls.lock().push(Call::Install(contribution.clone()));
        if self.failing.lock().contains(contribution.id()) {
            return Err(format!("refusing to install {}", contribution.id()).into());
        }
        Ok(())
    }

    fn uninstall(&self, contribution: &C) -> Result<(), HookError> {
        self.calls.lock().push(Call::Uninstall(contribution.clone()));
        Ok(())
    }
}

/// Records contribution lifecycle events.
#[derive(Default)]
pub struct EventRecorder {
    events: Mutex<Vec<ContributionEvent>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ContributionEvent> {
        self.events.lock().clone()
    }

    /// Events as `kind:id` labels.
    pub fn log(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|e| format!("{}:{}", e.kind, e.id))
            .collect()
    }

    pub fn count(&self, kind: ContributionEventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind == kind).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl ContributionListener for EventRecorder {
    fn handle_event(&self, event: &ContributionEvent) {
        self.events.lock().push(event.clone());
    }
}
