mod common;

use common::{int, is_integer};
use objrewrite_core::{Plugin, Registry, RewriteError, Rewriter, RewriterConfig};
use proptest::prelude::*;
use serde_json::{Value, json};
use std::sync::Arc;

const FIELDS: [&str; 5] = ["a", "b", "c", "d", "e"];

fn field() -> impl Strategy<Value = &'static str> {
    prop::sample::select(FIELDS.to_vec())
}

fn injector(target: &str, requires: Vec<&str>) -> Arc<Plugin> {
    Plugin::inject(target)
        .requires(requires)
        .schema(is_integer())
        .transform(|_, _| Ok(json!(0)))
        .build()
        .unwrap()
}

fn numbered(values: &[i64]) -> Value {
    Value::Array(
        values
            .iter()
            .enumerate()
            .map(|(i, v)| json!({"v": v, "i": i}))
            .collect(),
    )
}

/// INJECT `w = v * 2`, FILTER on `w`, SORT on `w % 3`; immediate or async.
fn pipeline(deferred: bool) -> Registry {
    let double = Plugin::inject("w").requires(["v"]).schema(is_integer());
    let double = if deferred {
        double.transform_async(|node, _| async move { Ok::<_, anyhow::Error>(json!(int(&node, "v") * 2)) })
    } else {
        double.transform(|node, _| Ok(json!(int(node, "v") * 2)))
    };
    let keep = Plugin::filter("*")
        .requires(["w"])
        .predicate(|node, _| Ok(int(node, "w") % 5 != 0));
    let order = Plugin::sort("*")
        .requires(["w"])
        .key(|node, _| Ok(json!(int(node, "w").rem_euclid(3))));
    Registry::new()
        .with(
            "",
            [
                double.build().unwrap(),
                keep.build().unwrap(),
                order.build().unwrap(),
            ],
        )
        .unwrap()
}

proptest! {
    #[test]
    fn compile_is_idempotent(
        store in prop::collection::vec(field(), 0..5),
        plugins in prop::collection::vec((field(), prop::collection::vec(field(), 0..3)), 0..4),
        desired in prop::collection::vec(field(), 1..4),
    ) {
        let mut registry = Registry::new();
        for (target, requires) in &plugins {
            registry.register("", [injector(target, requires.clone())]).unwrap();
        }

        let first = Rewriter::new(registry.clone(), store.iter().copied()).unwrap();
        match first.compile(desired.iter().copied()) {
            Ok(compiled) => {
                let fields = compiled.field_names();
                let again = Rewriter::new(registry, fields.iter())
                    .unwrap()
                    .compile(desired.iter().copied())
                    .unwrap();
                prop_assert_eq!(again.field_names(), fields);
            }
            Err(RewriteError::UnsatisfiableField(field)) => {
                prop_assert!(FIELDS.contains(&field.as_str()));
                prop_assert!(!store.contains(&field.as_str()));
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    #[test]
    fn sort_is_stable(keys in prop::collection::vec(0i64..4, 0..24)) {
        let plugin = Plugin::sort("*")
            .requires(["v"])
            .key(|node, _| Ok(node["v"].clone()))
            .build()
            .unwrap();
        let rew = Rewriter::new(Registry::new().with("", [plugin]).unwrap(), ["v", "i"])
            .unwrap()
            .compile(["v", "i"])
            .unwrap();

        let mut data = numbered(&keys);
        rew.rewrite(&mut data, None).unwrap();

        let mut expected: Vec<(usize, i64)> = keys.iter().copied().enumerate().collect();
        expected.sort_by_key(|(_, v)| *v);
        prop_assert_eq!(data, Value::Array(
            expected.into_iter().map(|(i, v)| json!({"v": v, "i": i})).collect()
        ));
    }

    #[test]
    fn sync_and_async_rewrites_agree(values in prop::collection::vec(-50i64..50, 0..16)) {
        let fields = ["v", "i"];
        let desired = ["i", "w"];
        let sync = Rewriter::new(pipeline(false), fields).unwrap().compile(desired).unwrap();
        let deferred = Rewriter::new(pipeline(true), fields).unwrap().compile(desired).unwrap();

        let mut left = numbered(&values);
        sync.rewrite(&mut left, None).unwrap();
        let mut right = numbered(&values);
        tokio_test::block_on(deferred.rewrite_async(&mut right, None)).unwrap();
        prop_assert_eq!(left, right);
    }

    #[test]
    fn disabled_plugins_leave_tree_untouched(values in prop::collection::vec(-50i64..50, 0..16)) {
        let registry = Registry::new()
            .with("", [
                Plugin::inject("v")
                    .requires(["v"])
                    .schema(is_integer())
                    .activate(|_, _| Ok(false))
                    .transform(|_, _| Ok(json!(0)))
                    .build()
                    .unwrap(),
                Plugin::filter("*")
                    .activate(|_, _| Ok(false))
                    .predicate(|_, _| Ok(false))
                    .build()
                    .unwrap(),
                Plugin::sort("*")
                    .activate(|_, _| Ok(false))
                    .key(|node, _| Ok(json!(-int(node, "v"))))
                    .limit(|_| Ok(0))
                    .build()
                    .unwrap(),
            ])
            .unwrap();
        let config = RewriterConfig { retain_requested_only: false, ..RewriterConfig::default() };
        let rew = Rewriter::new(registry, ["v", "i"])
            .unwrap()
            .with_config(config)
            .compile(["v"])
            .unwrap();
        prop_assert_eq!(rew.active_plugins().len(), 3);

        let mut data = numbered(&values);
        rew.rewrite(&mut data, None).unwrap();
        prop_assert_eq!(data, numbered(&values));
    }
}
