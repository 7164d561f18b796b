//! Deploying contribution files through the whole stack.

mod common;

use common::Runtime;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_override_across_files_installs_merged_value() {
    let rt = Runtime::new();
    let overrides = rt.write(
        "overrides.json",
        json!([{"id": "custom", "base": "defaults", "properties": {"b": 3}}]),
    );
    let defaults = rt.write(
        "defaults.json",
        json!([{"id": "defaults", "properties": {"a": 1, "b": 2}}]),
    );

    rt.deploy(&overrides);
    assert_eq!(
        rt.manager.pending(),
        vec![("custom".to_string(), vec!["defaults".to_string()])]
    );

    rt.deploy(&defaults);
    assert_eq!(rt.installed.log(), vec!["+defaults", "+custom"]);
    assert_eq!(rt.installed_property("custom", "a"), Some(json!(1)));
    assert_eq!(rt.installed_property("custom", "b"), Some(json!(3)));
}

#[test]
fn test_undeploying_base_file_suspends_dependents() {
    let rt = Runtime::new();
    let defaults = rt.write("defaults.json", json!([{"id": "defaults", "properties": {"a": 1}}]));
    let overrides = rt.write(
        "overrides.json",
        json!([{"id": "custom", "base": "defaults", "properties": {"b": 2}}]),
    );
    let defaults_location = rt.deploy(&defaults);
    rt.deploy(&overrides);
    rt.installed.clear();

    assert!(rt.deployer.undeploy(&defaults_location).unwrap());

    assert_eq!(rt.installed.log(), vec!["-custom", "-defaults"]);
    assert!(rt.manager.contains("custom"));
    assert!(!rt.manager.is_resolved("custom"));

    rt.deploy(&defaults);
    assert_eq!(rt.installed.log(), vec!["-custom", "-defaults", "+defaults", "+custom"]);
}

#[test]
fn test_fragments_from_separate_files() {
    let rt = Runtime::new();
    let root = rt.write(
        "root.json",
        json!([{"id": "menu", "composite": true, "properties": {"items": {"home": 1}}}]),
    );
    let admin = rt.write(
        "admin.json",
        json!([{"id": "menu-admin", "base": "menu", "composite": true, "properties": {"items": {"admin": 2}}}]),
    );
    let help = rt.write(
        "help.json",
        json!([{"id": "menu-help", "base": "menu", "composite": true, "properties": {"items": {"help": 3}}}]),
    );
    rt.deploy(&root);
    let admin_location = rt.deploy(&admin);
    rt.deploy(&help);

    assert_eq!(
        rt.installed_property("menu", "items"),
        Some(json!({"home": 1, "admin": 2, "help": 3}))
    );

    rt.deployer.undeploy(&admin_location).unwrap();
    assert_eq!(
        rt.installed_property("menu", "items"),
        Some(json!({"home": 1, "help": 3}))
    );
    assert_eq!(rt.manager.installed_ids(), vec!["menu"]);
}

#[test]
fn test_bad_contribution_does_not_block_file() {
    let rt = Runtime::new();
    rt.installed.fail_on("broken");
    let file = rt.write(
        "mixed.json",
        json!([
            {"id": "broken", "properties": {}},
            {"id": "fine", "properties": {"ok": true}},
        ]),
    );

    rt.deploy(&file);

    assert_eq!(rt.manager.installed_ids(), vec!["fine"]);
    assert_eq!(rt.installed.log(), vec!["+broken", "+fine"]);
}

#[test]
fn test_undeploy_all_removes_every_contribution() {
    let rt = Runtime::new();
    let a = rt.write("a.json", json!([{"id": "a"}]));
    let b = rt.write("b.json", json!([{"id": "b", "base": "a"}]));
    rt.deploy(&a);
    rt.deploy(&b);

    assert_eq!(rt.deployer.undeploy_all(), 2);

    assert!(rt.manager.is_empty());
    assert!(rt.manager.installed_ids().is_empty());
    assert!(rt.notifier.watched().is_empty());
}
