//! The contribution model.
//!
//! A contribution is a value object registered against one extension point.
//! Its identity is its id: registering another value with the same id on the
//! same extension point replaces the first.
//!
//! Contributions come in three flavours, selected by [`Contribution::kind`]:
//!
//! - [`ContributionKind::Simple`]: installed as-is.
//! - [`ContributionKind::Extensible`]: may name a base contribution; the
//!   installed value is the base's merged value with this contribution's own
//!   fields copied over it.
//! - [`ContributionKind::Composite`]: like extensible, but a contribution with
//!   a base becomes a *fragment* of its base instead of being installed on its
//!   own. The composite root is reinstalled with every enabled fragment
//!   applied.

/// How a contribution participates in merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContributionKind {
    #[default]
    Simple,
    Extensible,
    Composite,
}

/// A unit of configuration targeting one extension point.
///
/// `Clone` must produce an independent deep copy: merges work on clones and
/// never touch registered values.
pub trait Contribution: Clone + Send + Sync + 'static {
    /// Unique id within the extension point.
    fn id(&self) -> &str;

    fn kind(&self) -> ContributionKind {
        ContributionKind::Simple
    }

    /// Id of the contribution this one overrides, if any.
    fn base_id(&self) -> Option<&str> {
        None
    }

    /// Ids that must be resolved before this contribution can be.
    ///
    /// The base id is added automatically and does not need to be listed.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Copy this contribution's own data over `target`.
    ///
    /// Identity fields (id, base id) must be left alone; they are re-stamped
    /// by [`Contribution::set_identity`] after merging. The default replaces
    /// `target` wholesale.
    fn copy_over(&self, target: &mut Self) {
        *target = self.clone();
    }

    /// Overwrite the identity fields of a merged value.
    fn set_identity(&mut self, _id: &str, _base_id: Option<&str>) {}

    /// Everything the dependency graph waits on: the base id plus declared
    /// dependencies, without duplicates.
    fn requirements(&self) -> Vec<String> {
        let mut requirements: Vec<String> = self.base_id().map(str::to_string).into_iter().collect();
        for dep in self.dependencies() {
            if !requirements.contains(&dep) {
                requirements.push(dep);
            }
        }
        requirements
    }
}
