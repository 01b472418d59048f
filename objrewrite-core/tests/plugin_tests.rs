use objrewrite_core::{FieldPath, Plugin, PluginKind, Registry, RewriteError, Schema};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;

fn p(raw: &str) -> FieldPath {
    FieldPath::parse(raw).unwrap()
}

fn strings(paths: &[FieldPath]) -> Vec<String> {
    paths.iter().map(ToString::to_string).collect()
}

fn keep_all(target: &str, requires: &[&str]) -> Arc<Plugin> {
    Plugin::filter(target)
        .name("filter-plugin-name")
        .requires(requires.iter().copied())
        .predicate(|_, _| Ok(true))
        .build()
        .unwrap()
}

// ── Prefix binding ───────────────────────────────────────────────

#[test]
fn nested_prefix() {
    let bound = keep_all("key", &["req"]).bind(&p("prefix"));
    assert_eq!(bound.target().to_string(), "prefix.key");
    assert_eq!(strings(bound.requires()), vec!["prefix.req"]);
}

#[test]
fn nested_prefix_with_root_reference() {
    let bound = keep_all("key", &["/req"]).bind(&p("prefix"));
    assert_eq!(bound.target().to_string(), "prefix.key");
    assert_eq!(strings(bound.requires()), vec!["req"]);
}

#[test]
fn top_level_prefix() {
    let bound = keep_all("key", &["req"]).bind(&FieldPath::root());
    assert_eq!(bound.target().to_string(), "key");
    assert_eq!(strings(bound.requires()), vec!["req"]);
}

#[test]
fn star_target_is_the_prefix() {
    let bound = keep_all("*", &["*"]).bind(&p("prefix"));
    assert_eq!(bound.target(), &p("prefix"));
    assert_eq!(bound.requires(), &[p("prefix")]);

    let bound = keep_all("*", &["*"]).bind(&FieldPath::root());
    assert!(bound.target().is_root());
    assert_eq!(bound.requires(), &[FieldPath::root()]);
}

#[test]
fn filter_runs_at_its_target() {
    let bound = keep_all("items", &[]).bind(&p("order"));
    assert_eq!(bound.location(), &p("order.items"));
    assert_eq!(strings(bound.targets()), vec!["order.items"]);
    assert!(!bound.produces(&p("order.items")));
}

#[test]
fn inject_runs_at_its_prefix() {
    let plugin = Plugin::inject("meta")
        .schema(Schema::object([
            ("id", Schema::any()),
            ("tags", Schema::list(Schema::any())),
        ]))
        .transform(|_, _| Ok(json!({})))
        .build()
        .unwrap();
    let bound = plugin.bind(&p("items"));
    assert_eq!(bound.location(), &p("items"));
    assert_eq!(bound.target(), &p("items.meta"));
    assert_eq!(
        strings(bound.targets()),
        vec![
            "items.meta",
            "items.meta.id",
            "items.meta.id.**",
            "items.meta.tags",
            "items.meta.tags.**",
        ]
    );
    assert!(bound.produces(&p("items.meta.tags")));
    assert!(bound.produces(&p("items.meta.id.deep")));
    assert!(!bound.produces(&p("items.other")));
}

#[test]
fn plugin_kinds() {
    let inject = Plugin::inject("*")
        .schema(Schema::any())
        .transform(|_, _| Ok(Value::Null))
        .build()
        .unwrap();
    let filter = Plugin::filter("*").predicate(|_, _| Ok(true)).build().unwrap();
    let sort = Plugin::sort("*").key(|_, _| Ok(Value::Null)).build().unwrap();
    assert_eq!(inject.kind(), PluginKind::Inject);
    assert_eq!(filter.kind(), PluginKind::Filter);
    assert_eq!(sort.kind(), PluginKind::Sort);
    assert_eq!(inject.bind(&FieldPath::root()).kind(), PluginKind::Inject);
    assert_eq!(serde_json::to_value(PluginKind::Sort).unwrap(), json!("SORT"));
    assert_eq!(PluginKind::Filter.to_string(), "FILTER");
}

#[test]
fn default_name_and_options() {
    let plugin = Plugin::sort("items")
        .requires(["id", "/tenant"])
        .key(|v, _| Ok(v["id"].clone()))
        .build()
        .unwrap();
    assert_eq!(plugin.name(), "SORT(items)");
    assert_eq!(
        plugin.options(),
        json!({
            "name": "SORT(items)",
            "type": "SORT",
            "target": "items",
            "requires": ["id", "/tenant"]
        })
    );
    assert!(!plugin.is_deferred());
}

#[test]
fn deferred_transform_is_reported() {
    let plugin = Plugin::inject("x")
        .schema(Schema::any())
        .transform_async(|_, _| async { Ok::<_, anyhow::Error>(Value::Null) })
        .build()
        .unwrap();
    assert!(plugin.is_deferred());
}

// ── Builder validation ───────────────────────────────────────────

fn invalid(result: Result<Arc<Plugin>, RewriteError>) -> String {
    match result {
        Err(RewriteError::InvalidPlugin(msg)) => msg,
        other => panic!("expected InvalidPlugin, got {other:?}"),
    }
}

#[test]
fn empty_target_is_rejected() {
    let msg = invalid(Plugin::filter("").predicate(|_, _| Ok(true)).build());
    assert!(msg.contains("target can not be empty"));
}

#[test]
fn inject_requires_transform_and_schema() {
    let msg = invalid(Plugin::inject("x").schema(Schema::any()).build());
    assert_eq!(msg, "INJECT(x): transform is required");

    let msg = invalid(Plugin::inject("x").transform(|_, _| Ok(Value::Null)).build());
    assert_eq!(msg, "INJECT(x): schema is required");
}

#[test]
fn inject_target_must_be_concrete() {
    let msg = invalid(
        Plugin::inject("a.*")
            .schema(Schema::any())
            .transform(|_, _| Ok(Value::Null))
            .build(),
    );
    assert!(msg.contains("wildcard-free"));
}

#[test]
fn options_of_other_kinds_are_rejected() {
    let msg = invalid(
        Plugin::filter("*")
            .predicate(|_, _| Ok(true))
            .limit(|_| Ok(1))
            .build(),
    );
    assert!(msg.starts_with("FILTER(*): only predicate"));

    let msg = invalid(
        Plugin::sort("*")
            .key(|_, _| Ok(Value::Null))
            .schema(Schema::any())
            .build(),
    );
    assert!(msg.starts_with("SORT(*): only key"));

    let msg = invalid(
        Plugin::inject("x")
            .schema(Schema::any())
            .transform(|_, _| Ok(Value::Null))
            .predicate(|_, _| Ok(true))
            .build(),
    );
    assert!(msg.starts_with("INJECT(x): only transform"));
}

#[test]
fn missing_callbacks_are_rejected() {
    assert_eq!(
        invalid(Plugin::filter("*").build()),
        "FILTER(*): predicate is required"
    );
    assert_eq!(invalid(Plugin::sort("*").build()), "SORT(*): key is required");
}

#[test]
fn malformed_paths_are_rejected() {
    let err = Plugin::filter("a..b").predicate(|_, _| Ok(true)).build().unwrap_err();
    assert!(matches!(err, RewriteError::InvalidPath(_)));

    let err = Plugin::filter("*")
        .requires(["/x."])
        .predicate(|_, _| Ok(true))
        .build()
        .unwrap_err();
    assert!(matches!(err, RewriteError::InvalidPath(_)));
}

// ── Registry ─────────────────────────────────────────────────────

#[test]
fn registry_keeps_registration_order() {
    let a = keep_all("*", &[]);
    let b = keep_all("x", &[]);
    let mut registry = Registry::new();
    registry
        .register("", [Arc::clone(&a)])
        .unwrap()
        .register("child", [Arc::clone(&b)])
        .unwrap()
        .register("", [Arc::clone(&b)])
        .unwrap();

    assert_eq!(registry.len(), 2);
    let descriptors = registry.descriptors();
    let targets: Vec<String> = descriptors.iter().map(|d| d.target().to_string()).collect();
    assert_eq!(targets, vec!["", "x", "child.x"]);
    assert!(Arc::ptr_eq(descriptors[1].plugin(), &b));
    assert!(Arc::ptr_eq(descriptors[2].plugin(), &b));
}

#[test]
fn registry_rejects_bad_prefix() {
    let err = Registry::new().with("a.", [keep_all("*", &[])]).unwrap_err();
    assert!(matches!(err, RewriteError::InvalidPath(_)));
}
