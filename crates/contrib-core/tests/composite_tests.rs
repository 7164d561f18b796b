//! Composite roots and their fragments.

use std::sync::Arc;

use contrib_core::{
    Component, ContributionManager, Fragment, FragmentState, PropertiesContribution,
};
use contrib_test_utils::RecordingComponent;
use pretty_assertions::assert_eq;
use serde_json::json;

type Recording = RecordingComponent<PropertiesContribution>;

fn setup() -> (Arc<Recording>, ContributionManager<PropertiesContribution>) {
    let component = Arc::new(Recording::new());
    let manager = ContributionManager::new("layout", component.clone() as Arc<dyn Component<_>>);
    (component, manager)
}

fn root() -> PropertiesContribution {
    PropertiesContribution::new("root")
        .composite()
        .with_property("title", json!("Home"))
}

fn fragment(id: &str, base: &str) -> PropertiesContribution {
    PropertiesContribution::new(id).composite().with_base(base)
}

fn state(id: &str, state: FragmentState) -> Fragment {
    Fragment {
        id: id.to_string(),
        state,
    }
}

#[test]
fn test_fragments_reinstall_root() {
    let (component, manager) = setup();
    manager.register(root());
    manager.register(fragment("f1", "root").with_property("color", json!("red")));
    manager.register(fragment("f2", "root").with_property("color", json!("blue")));

    assert_eq!(component.log(), vec!["+root", "-root", "+root", "-root", "+root"]);
    // fragments are never installed on their own
    assert_eq!(manager.installed_ids(), vec!["root"]);

    let installed = component.last_installed("root").unwrap();
    assert_eq!(installed.id, "root");
    assert_eq!(installed.get("title"), Some(&json!("Home")));
    assert_eq!(installed.get("color"), Some(&json!("blue")));
}

#[test]
fn test_fragments_before_root_apply_in_registration_order() {
    let (component, manager) = setup();
    manager.register(fragment("f1", "root").with_property("color", json!("red")));
    manager.register(fragment("f2", "root").with_property("color", json!("blue")));
    manager.register(root());

    assert_eq!(component.last_installed("root").unwrap().get("color"), Some(&json!("blue")));
    assert_eq!(
        manager.fragments("root"),
        vec![state("f1", FragmentState::Enabled), state("f2", FragmentState::Enabled)]
    );
}

#[test]
fn test_fragment_toggles_with_its_dependency() {
    let (component, manager) = setup();
    manager.register(root());
    manager.register(
        fragment("f1", "root")
            .requiring("theme")
            .with_property("color", json!("red"))
            .with_property("border", json!(1)),
    );
    manager.register(fragment("f2", "root").with_property("color", json!("blue")));

    // f1 waits on "theme"
    let without_f1 = manager.merged("root").unwrap();
    assert_eq!(without_f1.get("border"), None);
    assert_eq!(manager.fragments("root"), vec![state("f2", FragmentState::Enabled)]);

    manager.register(PropertiesContribution::new("theme"));
    let with_f1 = manager.merged("root").unwrap();
    assert_eq!(with_f1.get("border"), Some(&json!(1)));
    // f2 still wins: it was registered after f1
    assert_eq!(with_f1.get("color"), Some(&json!("blue")));
    assert_eq!(component.last_installed("root").unwrap(), with_f1);

    manager.unregister("theme");
    assert_eq!(
        manager.fragments("root"),
        vec![state("f1", FragmentState::Disabled), state("f2", FragmentState::Enabled)]
    );
    assert_eq!(manager.merged("root").unwrap(), without_f1);
    assert_eq!(component.last_installed("root").unwrap(), without_f1);

    manager.register(PropertiesContribution::new("theme"));
    assert_eq!(manager.merged("root").unwrap(), with_f1);
    assert_eq!(
        manager.fragments("root"),
        vec![state("f1", FragmentState::Enabled), state("f2", FragmentState::Enabled)]
    );
}

#[test]
fn test_nested_fragments_apply_depth_first() {
    let (_, manager) = setup();
    manager.register(root());
    manager.register(fragment("f1", "root").with_property("trail", json!(["f1"])));
    manager.register(fragment("f2", "root").with_property("trail", json!(["f2"])));
    manager.register(fragment("f1a", "f1").with_property("trail", json!(["f1a"])).with_property("nested", json!(true)));

    assert_eq!(
        manager.fragments("root"),
        vec![
            state("f1", FragmentState::Enabled),
            state("f1a", FragmentState::Enabled),
            state("f2", FragmentState::Enabled),
        ]
    );
    let merged = manager.merged("root").unwrap();
    // f1, f1a, then f2 last
    assert_eq!(merged.get("trail"), Some(&json!(["f2"])));
    assert_eq!(merged.get("nested"), Some(&json!(true)));
    // asking for a fragment yields its root's value
    assert_eq!(manager.merged("f1a").unwrap(), merged);
}

#[test]
fn test_merge_is_deterministic() {
    let (_, manager) = setup();
    manager.register(root());
    manager.register(fragment("f1", "root").with_property("list", json!({"a": [1]})));
    manager.register(fragment("f2", "root").with_property("list", json!({"b": [2]})));

    let first = manager.merged("root").unwrap();
    let second = manager.merged("root").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.get("list"), Some(&json!({"a": [1], "b": [2]})));
    assert_eq!(manager.get("root").unwrap(), root());
}

#[test]
fn test_unregistering_fragment_drops_record() {
    let (component, manager) = setup();
    manager.register(root());
    manager.register(fragment("f1", "root").with_property("color", json!("red")));
    component.clear();

    manager.unregister("f1");

    assert!(manager.fragments("root").is_empty());
    assert_eq!(component.log(), vec!["-root", "+root"]);
    assert_eq!(component.last_installed("root").unwrap(), root());
}

#[test]
fn test_removing_root_keeps_fragment_slots() {
    let (component, manager) = setup();
    manager.register(root());
    manager.register(fragment("f1", "root").with_property("color", json!("red")));
    component.clear();

    manager.unregister("root");
    // fragments going down with their root do not reinstall it
    assert_eq!(component.log(), vec!["-root"]);
    assert!(manager.installed_ids().is_empty());
    assert_eq!(manager.fragments("root"), vec![state("f1", FragmentState::Disabled)]);

    manager.register(root());
    assert_eq!(component.last_installed("root").unwrap().get("color"), Some(&json!("red")));
}

#[test]
fn test_moving_fragment_to_other_parent() {
    let (_, manager) = setup();
    manager.register(root());
    manager.register(fragment("f1", "root"));
    manager.register(fragment("f2", "root"));

    manager.register(fragment("f2", "f1").with_property("moved", json!(true)));

    assert_eq!(
        manager.fragments("root"),
        vec![state("f1", FragmentState::Enabled), state("f2", FragmentState::Enabled)]
    );
    assert_eq!(manager.merged("root").unwrap().get("moved"), Some(&json!(true)));
}

#[test]
fn test_root_update_reapplies_fragments_once() {
    let (component, manager) = setup();
    manager.register(root());
    manager.register(fragment("f1", "root").with_property("color", json!("red")));
    manager.register(fragment("f2", "root").with_property("size", json!(2)));
    component.clear();

    manager.register(root().with_property("title", json!("Start")));

    assert_eq!(
        component.log(),
        vec!["-root", "+root", "-root", "+root", "-root", "+root"]
    );
    let installed = component.last_installed("root").unwrap();
    assert_eq!(installed.get("title"), Some(&json!("Start")));
    assert_eq!(installed.get("color"), Some(&json!("red")));
    assert_eq!(installed.get("size"), Some(&json!(2)));
}

#[test]
fn test_composite_over_extensible_base_installs_on_its_own() {
    let (component, manager) = setup();
    manager.register(PropertiesContribution::new("base").with_property("a", json!(1)));
    manager.register(fragment("c", "base").with_property("b", json!(2)));

    assert_eq!(component.log(), vec!["+base", "+c"]);
    assert_eq!(manager.installed_ids(), vec!["base", "c"]);
    assert!(manager.fragments("base").is_empty());

    let installed = manager.installed("c").unwrap();
    assert_eq!(installed.id, "c");
    assert_eq!(installed.get("a"), Some(&json!(1)));
    assert_eq!(installed.get("b"), Some(&json!(2)));
    assert_eq!(manager.installed("base").unwrap().get("b"), None);
}

#[test]
fn test_composite_over_extensible_base_takes_its_own_fragments() {
    let (component, manager) = setup();
    manager.register(PropertiesContribution::new("base").with_property("a", json!(1)));
    manager.register(fragment("c", "base").with_property("b", json!(2)));
    manager.register(fragment("c1", "c").with_property("d", json!(4)));

    assert_eq!(manager.fragments("c"), vec![state("c1", FragmentState::Enabled)]);
    let installed = component.last_installed("c").unwrap();
    assert_eq!(installed.get("a"), Some(&json!(1)));
    assert_eq!(installed.get("d"), Some(&json!(4)));
    assert_eq!(manager.installed_ids(), vec!["base", "c"]);
}

#[test]
fn test_extensible_child_sees_root_fragments() {
    let (component, manager) = setup();
    manager.register(root());
    manager.register(fragment("f1", "root").with_property("color", json!("red")));
    manager.register(
        PropertiesContribution::new("child")
            .with_base("root")
            .with_property("size", json!(2)),
    );

    let child = manager.installed("child").unwrap();
    assert_eq!(child.id, "child");
    assert_eq!(child.get("title"), Some(&json!("Home")));
    assert_eq!(child.get("color"), Some(&json!("red")));
    assert_eq!(child.get("size"), Some(&json!(2)));
    assert_eq!(manager.merged("child").unwrap(), child);
    component.clear();

    // a new fragment reaches the child too
    manager.register(fragment("f2", "root").with_property("border", json!(1)));
    assert_eq!(component.log(), vec!["-child", "-root", "+root", "+child"]);
    assert_eq!(manager.installed("child").unwrap().get("border"), Some(&json!(1)));
    component.clear();

    manager.unregister("f1");
    assert_eq!(component.log(), vec!["-child", "-root", "+root", "+child"]);
    assert_eq!(manager.installed("child").unwrap().get("color"), None);
}

#[test]
fn test_removing_root_with_child_uninstalls_each_once() {
    let (component, manager) = setup();
    manager.register(root());
    manager.register(fragment("f1", "root"));
    manager.register(PropertiesContribution::new("child").with_base("root"));
    manager.register(fragment("f2", "root"));
    component.clear();

    manager.unregister("root");

    let mut log = component.log();
    log.sort();
    assert_eq!(log, vec!["-child", "-root"]);
    assert_eq!(component.log().last().map(String::as_str), Some("-root"));
    assert!(manager.installed_ids().is_empty());
}
