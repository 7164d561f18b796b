//! File changes flowing through to installed contributions.

mod common;

use std::time::Duration;

use common::Runtime;
use contrib_core::ContributionEventKind;
use contrib_deploy::{FileChangeNotifier, NotifierConfig};
use contrib_test_utils::{Call, EventRecorder};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

#[test]
fn test_edit_reinstalls_with_new_values() {
    let rt = Runtime::new();
    let defaults = rt.write("defaults.json", json!([{"id": "defaults", "properties": {"level": "info"}}]));
    let overrides = rt.write(
        "overrides.json",
        json!([{"id": "custom", "base": "defaults", "properties": {"format": "json"}}]),
    );
    rt.deploy(&defaults);
    rt.deploy(&overrides);
    rt.installed.clear();

    rt.rewrite(&defaults, json!([{"id": "defaults", "properties": {"level": "debug"}}]));
    assert_eq!(rt.notifier.tick(), 1);

    assert_eq!(rt.changes.changes().len(), 1);
    assert_eq!(rt.installed.log(), vec!["-custom", "-defaults", "+defaults", "+custom"]);
    // uninstall saw the old merged value
    match &rt.installed.calls()[0] {
        Call::Uninstall(old) => assert_eq!(old.get("level"), Some(&json!("info"))),
        other => panic!("unexpected call {other:?}"),
    }
    assert_eq!(rt.installed_property("custom", "level"), Some(json!("debug")));
    assert_eq!(rt.installed_property("custom", "format"), Some(json!("json")));
}

#[test]
fn test_edit_dropping_a_contribution_uninstalls_it() {
    let rt = Runtime::new();
    let file = rt.write("settings.json", json!([{"id": "a"}, {"id": "b"}]));
    rt.deploy(&file);

    rt.rewrite(&file, json!([{"id": "a"}]));
    rt.notifier.tick();

    assert_eq!(rt.manager.ids(), vec!["a"]);
    assert_eq!(rt.manager.installed_ids(), vec!["a"]);
}

#[test]
fn test_one_cycle_per_change() {
    let rt = Runtime::new();
    let events = Arc::new(EventRecorder::new());
    rt.manager.add_listener(events.clone());
    let file = rt.write("settings.json", json!([{"id": "a"}]));
    rt.deploy(&file);
    events.clear();

    rt.rewrite(&file, json!([{"id": "a", "properties": {"x": 1}}]));
    rt.notifier.tick();
    rt.notifier.tick();

    assert_eq!(events.count(ContributionEventKind::Uninstalled), 1);
    assert_eq!(events.count(ContributionEventKind::Installed), 1);
    assert_eq!(rt.changes.changes().len(), 1);
}

#[test]
fn test_broken_edit_then_fix() {
    let rt = Runtime::new();
    let file = rt.write("settings.json", json!([{"id": "a", "properties": {"v": 1}}]));
    let location = rt.deploy(&file);

    rt.dir.modify(&file, "{ not json");
    rt.notifier.tick();
    // undeployed, redeploy failed: nothing installed, still tracked
    assert!(rt.manager.installed_ids().is_empty());
    assert!(rt.deployer.is_deployed(&location));
    assert!(rt.changes.changes().is_empty());

    rt.rewrite(&file, json!([{"id": "a", "properties": {"v": 2}}]));
    rt.notifier.tick();
    assert_eq!(rt.installed_property("a", "v"), Some(json!(2)));
    assert_eq!(rt.changes.changes().len(), 1);
}

#[test]
fn test_background_notifier_drives_reload() {
    let rt = Runtime::with_notifier(FileChangeNotifier::with_config(NotifierConfig {
        initial_delay_ms: 0,
        interval_ms: 20,
    }));
    let file = rt.write("settings.json", json!([{"id": "a", "properties": {"v": 1}}]));
    rt.deploy(&file);
    rt.notifier.start().unwrap();

    rt.rewrite(&file, json!([{"id": "a", "properties": {"v": 2}}]));

    assert!(rt.changes.wait_for(1, Duration::from_secs(5)));
    rt.notifier.stop();
    assert_eq!(rt.installed_property("a", "v"), Some(json!(2)));
}
