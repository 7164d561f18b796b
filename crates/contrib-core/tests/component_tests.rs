//! Routing contributions through a managed component.

use std::any::Any;
use std::sync::Arc;

use contrib_core::{Component, Contribution, Error, ManagedComponent, PropertiesContribution};
use contrib_test_utils::RecordingComponent;
use pretty_assertions::assert_eq;
use serde_json::json;

/// A contribution without a base, installed as-is.
#[derive(Debug, Clone, PartialEq)]
struct Named {
    id: String,
    after: Vec<String>,
}

impl Named {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            after: Vec::new(),
        }
    }
}

impl Contribution for Named {
    fn id(&self) -> &str {
        &self.id
    }

    fn dependencies(&self) -> Vec<String> {
        self.after.clone()
    }
}

struct Fixture {
    component: ManagedComponent,
    settings: Arc<RecordingComponent<PropertiesContribution>>,
    names: Arc<RecordingComponent<Named>>,
}

fn fixture() -> Fixture {
    let component = ManagedComponent::new("app");
    let settings = Arc::new(RecordingComponent::<PropertiesContribution>::new());
    let names = Arc::new(RecordingComponent::<Named>::new());
    component
        .add_manager::<PropertiesContribution>("settings", settings.clone() as Arc<dyn Component<_>>)
        .unwrap();
    component
        .add_manager::<Named>("names", names.clone() as Arc<dyn Component<_>>)
        .unwrap();
    Fixture {
        component,
        settings,
        names,
    }
}

fn boxed<C: Any + Send>(contribution: C) -> Box<dyn Any + Send> {
    Box::new(contribution)
}

#[test]
fn test_routes_by_extension_point() {
    let f = fixture();

    let count = f.component.register_extension(
        "settings",
        vec![boxed(PropertiesContribution::new("log").with_property("level", json!("warn")))],
    );
    f.component.register_extension("names", vec![boxed(Named::new("alice"))]);

    assert_eq!(count, 1);
    assert_eq!(f.settings.log(), vec!["+log"]);
    assert_eq!(f.names.log(), vec!["+alice"]);
    assert_eq!(f.component.extension_points(), vec!["settings", "names"]);
}

#[test]
fn test_unknown_extension_point_is_dropped() {
    let f = fixture();

    let count = f.component.register_extension("missing", vec![boxed(Named::new("bob"))]);

    assert_eq!(count, 0);
    assert!(f.names.log().is_empty());
    // dropped, not queued
    f.component.add_manager::<Named>("missing", Arc::new(RecordingComponent::<Named>::new())).unwrap();
    assert!(f.component.manager::<Named>("missing").unwrap().is_empty());
}

#[test]
fn test_wrong_type_is_skipped_rest_registered() {
    let f = fixture();

    let count = f.component.register_extension(
        "names",
        vec![
            boxed(PropertiesContribution::new("oops")),
            boxed(Named::new("carol")),
        ],
    );

    assert_eq!(count, 1);
    assert_eq!(f.names.log(), vec!["+carol"]);
}

#[test]
fn test_duplicate_extension_point() {
    let f = fixture();
    let err = f
        .component
        .add_manager::<Named>("names", Arc::new(RecordingComponent::<Named>::new()))
        .err().unwrap();
    assert!(matches!(err, Error::DuplicateExtensionPoint { point } if point == "names"));
}

#[test]
fn test_typed_manager_lookup() {
    let f = fixture();
    assert!(f.component.manager::<Named>("names").is_some());
    assert!(f.component.manager::<PropertiesContribution>("names").is_none());
    assert!(f.component.manager::<Named>("nowhere").is_none());
}

#[test]
fn test_unregister_extension() {
    let f = fixture();
    f.component.register_extension(
        "names",
        vec![boxed(Named::new("dave")), boxed(Named::new("erin"))],
    );

    let removed = f.component.unregister_extension(
        "names",
        vec![boxed(Named::new("dave")), boxed(Named::new("nobody"))],
    );

    assert_eq!(removed, 1);
    assert_eq!(f.names.log(), vec!["+dave", "+erin", "-dave"]);
}

#[test]
fn test_unregister_by_source_spans_points() {
    let f = fixture();
    let source = Some("file:/srv/app-config.xml");
    f.component.register_extension_from(
        "settings",
        vec![boxed(PropertiesContribution::new("log"))],
        source,
    );
    f.component.register_extension_from("names", vec![boxed(Named::new("frank"))], source);
    f.component.register_extension("names", vec![boxed(Named::new("grace"))]);

    assert_eq!(f.component.unregister_by_source("file:/srv/app-config.xml"), 2);

    assert_eq!(f.settings.log(), vec!["+log", "-log"]);
    assert_eq!(f.names.log(), vec!["+frank", "+grace", "-frank"]);
}

#[test]
fn test_dependencies_wait_within_point() {
    let f = fixture();
    let mut late = Named::new("late");
    late.after.push("early".to_string());

    f.component.register_extension("names", vec![boxed(late)]);
    assert!(f.names.log().is_empty());

    f.component.register_extension("names", vec![boxed(Named::new("early"))]);
    assert_eq!(f.names.log(), vec!["+early", "+late"]);
}
