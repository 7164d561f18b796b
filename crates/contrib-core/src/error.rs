//! Error types for contrib-core

/// Result type for contrib-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure raised by user code plugged into the runtime: components,
/// runtime contexts and listeners.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur in contrib-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No manager is registered for the extension point
    #[error("Unknown extension point: {point}")]
    UnknownExtensionPoint { point: String },

    /// A manager is already registered for the extension point
    #[error("Extension point already registered: {point}")]
    DuplicateExtensionPoint { point: String },

    /// A contribution object does not have the type the extension point expects
    #[error("Contribution for extension point {point} is not a {expected}")]
    ContributionType {
        point: String,
        expected: &'static str,
    },

    /// Contribution id is not registered
    #[error("Contribution not registered: {id}")]
    NotRegistered { id: String },

    /// Contribution is registered but still waiting on dependencies
    #[error("Contribution not resolved: {id}")]
    NotResolved { id: String },

    /// Base contribution chain loops back on itself
    #[error("Cyclic base contribution chain for {id}: {}", chain.join(" -> "))]
    CyclicBase { id: String, chain: Vec<String> },

    /// Base contribution referenced by a contribution is not registered
    #[error("Base contribution {base} of {id} is not registered")]
    MissingBase { id: String, base: String },
}
