//! Components exposing several extension points.

use std::any::Any;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::contribution::Contribution;
use crate::error::{Error, Result};
use crate::manager::{Component, ContributionManager};

/// Type-erased view of a [`ContributionManager`].
///
/// Lets a [`ManagedComponent`] hold managers for different contribution
/// types side by side and route untyped contribution objects to them.
pub trait ExtensionPoint: Send + Sync {
    fn name(&self) -> &str;

    /// Register a contribution, which must be of the manager's type.
    fn register_any(&self, contribution: Box<dyn Any + Send>, source: Option<&str>) -> Result<()>;

    /// Unregister a contribution by id. Returns whether it was registered.
    fn unregister_id(&self, id: &str) -> bool;

    /// Id of a contribution object, if it is of the manager's type.
    fn id_of(&self, contribution: &(dyn Any + Send)) -> Option<String>;

    fn unregister_by_source(&self, source: &str) -> usize;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<C: Contribution> ExtensionPoint for ContributionManager<C> {
    fn name(&self) -> &str {
        self.extension_point()
    }

    fn register_any(&self, contribution: Box<dyn Any + Send>, source: Option<&str>) -> Result<()> {
        let contribution = contribution
            .downcast::<C>()
            .map_err(|_| Error::ContributionType {
                point: self.extension_point().to_string(),
                expected: std::any::type_name::<C>(),
            })?;
        self.register_from(*contribution, source);
        Ok(())
    }

    fn unregister_id(&self, id: &str) -> bool {
        self.unregister(id).is_some()
    }

    fn id_of(&self, contribution: &(dyn Any + Send)) -> Option<String> {
        contribution
            .downcast_ref::<C>()
            .map(|c| c.id().to_string())
    }

    fn unregister_by_source(&self, source: &str) -> usize {
        ContributionManager::unregister_by_source(self, source)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A named component that owns one contribution manager per extension point
/// and routes inbound contributions to them.
pub struct ManagedComponent {
    name: String,
    points: RwLock<IndexMap<String, Arc<dyn ExtensionPoint>>>,
}

impl ManagedComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: RwLock::new(IndexMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Expose an extension point backed by an existing manager.
    pub fn add_extension_point(&self, point: Arc<dyn ExtensionPoint>) -> Result<()> {
        let mut points = self.points.write();
        let name = point.name().to_string();
        if points.contains_key(&name) {
            return Err(Error::DuplicateExtensionPoint { point: name });
        }
        tracing::debug!(component = %self.name, extension_point = %name, "Added extension point");
        points.insert(name, point);
        Ok(())
    }

    /// Create a manager for `point` installing into `component` and expose it.
    pub fn add_manager<C: Contribution>(
        &self,
        point: &str,
        component: Arc<dyn Component<C>>,
    ) -> Result<Arc<ContributionManager<C>>> {
        let manager = Arc::new(ContributionManager::new(point, component));
        self.add_extension_point(manager.clone())?;
        Ok(manager)
    }

    /// The typed manager behind `point`.
    pub fn manager<C: Contribution>(&self, point: &str) -> Option<Arc<ContributionManager<C>>> {
        let point = self.points.read().get(point).cloned()?;
        point.into_any().downcast::<ContributionManager<C>>().ok()
    }

    /// Names of the exposed extension points, in the order they were added.
    pub fn extension_points(&self) -> Vec<String> {
        self.points.read().keys().cloned().collect()
    }

    /// Register contributions against `point`.
    ///
    /// Contributions for an unknown extension point are dropped with a
    /// warning. Contributions of the wrong type are skipped with an error;
    /// the rest of the batch is still registered. Returns how many were
    /// registered.
    pub fn register_extension(&self, point: &str, contributions: Vec<Box<dyn Any + Send>>) -> usize {
        self.register_extension_from(point, contributions, None)
    }

    /// Same as [`ManagedComponent::register_extension`], recording `source`
    /// on every contribution.
    pub fn register_extension_from(
        &self,
        point: &str,
        contributions: Vec<Box<dyn Any + Send>>,
        source: Option<&str>,
    ) -> usize {
        let Some(target) = self.lookup(point) else {
            tracing::warn!(
                component = %self.name,
                extension_point = %point,
                dropped = contributions.len(),
                "Unknown extension point, dropping contributions"
            );
            return 0;
        };

        let mut registered = 0;
        for contribution in contributions {
            match target.register_any(contribution, source) {
                Ok(()) => registered += 1,
                Err(err) => tracing::error!(
                    component = %self.name,
                    extension_point = %point,
                    error = %err,
                    "Skipping contribution"
                ),
            }
        }
        registered
    }

    /// Unregister contributions from `point`. Returns how many were removed.
    pub fn unregister_extension(&self, point: &str, contributions: Vec<Box<dyn Any + Send>>) -> usize {
        let Some(target) = self.lookup(point) else {
            tracing::warn!(
                component = %self.name,
                extension_point = %point,
                "Unknown extension point, nothing to unregister"
            );
            return 0;
        };

        contributions
            .iter()
            .filter_map(|c| match target.id_of(c.as_ref()) {
                Some(id) => Some(id),
                None => {
                    tracing::error!(
                        component = %self.name,
                        extension_point = %point,
                        "Contribution has the wrong type, cannot unregister"
                    );
                    None
                }
            })
            .filter(|id| target.unregister_id(id))
            .count()
    }

    /// Unregister everything registered from `source`, on every extension
    /// point, last added point first.
    pub fn unregister_by_source(&self, source: &str) -> usize {
        let points: Vec<Arc<dyn ExtensionPoint>> = self.points.read().values().cloned().collect();
        points
            .iter()
            .rev()
            .map(|point| point.unregister_by_source(source))
            .sum()
    }

    fn lookup(&self, point: &str) -> Option<Arc<dyn ExtensionPoint>> {
        self.points.read().get(point).cloned()
    }
}

impl std::fmt::Debug for ManagedComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedComponent")
            .field("name", &self.name)
            .field("extension_points", &self.extension_points())
            .finish()
    }
}
