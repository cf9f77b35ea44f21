// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use serde_json::json;

fn snapshot(ctx: &Context) -> String {
    format!("{:?}", ctx)
}

fn base() -> Context {
    Context::new("/srv/app")
        .with_env("APP_ENV", "dev")
        .with_extra("image", "app")
}

#[test]
fn derive_applies_overrides() {
    let parent = base();
    let overrides = ContextOverrides {
        working_dir: Some("sub".into()),
        env: BTreeMap::from([("APP_ENV".into(), "prod".into()), ("X".into(), "1".into())]),
        dry_run: Some(true),
        host: Some(Some(HostDescriptor::new("web1"))),
        extra: BTreeMap::from([("replicas".into(), json!(3))]),
    };

    let child = parent.derive(&overrides);

    assert_eq!(child.working_dir(), Path::new("/srv/app/sub"));
    assert_eq!(child.env().get("APP_ENV").map(String::as_str), Some("prod"));
    assert_eq!(child.env().get("X").map(String::as_str), Some("1"));
    assert!(child.dry_run());
    assert_eq!(child.host().map(|h| h.address.as_str()), Some("web1"));
    assert_eq!(child.get_extra("image"), Some(&json!("app")));
    assert_eq!(child.get_extra("replicas"), Some(&json!(3)));
}

#[test]
fn derive_with_absolute_working_dir_replaces_parent() {
    let child = base().derive(&ContextOverrides {
        working_dir: Some("/tmp/other".into()),
        ..Default::default()
    });
    assert_eq!(child.working_dir(), Path::new("/tmp/other"));
}

#[test]
fn derive_can_clear_host() {
    let parent = base().with_host(HostDescriptor::new("web1"));
    let child = parent.derive(&ContextOverrides {
        host: Some(None),
        ..Default::default()
    });
    assert!(child.host().is_none());
    assert!(parent.host().is_some());
}

#[test]
fn empty_overrides_copy_everything() {
    let parent = base().with_host(HostDescriptor::new("web1")).with_dry_run(true);
    let child = parent.derive(&ContextOverrides::default());
    assert_eq!(snapshot(&child), snapshot(&parent));
}

#[test]
fn convenience_derivations_leave_parent_untouched() {
    let parent = base();
    let before = snapshot(&parent);

    let _ = parent.with_host(HostDescriptor::new("web1"));
    let _ = parent.with_dry_run(true);
    let _ = parent.with_env("APP_ENV", "prod");
    let _ = parent.with_working_dir("sub");
    let _ = parent.with_extra("image", "other");
    let _ = parent.with_capability(42u32);

    assert_eq!(snapshot(&parent), before);
}

#[derive(Debug, PartialEq)]
struct Registry {
    url: String,
}

#[test]
fn capabilities_are_typed_and_inherited() {
    let ctx = base().with_capability(Registry {
        url: "ecr.example".into(),
    });
    let child = ctx.derive(&ContextOverrides::default());

    let registry = child.capability::<Registry>().unwrap();
    assert_eq!(registry.url, "ecr.example");
    assert!(child.capability::<String>().is_none());
    assert!(base().capability::<Registry>().is_none());
}

#[test]
fn template_vars_stringify_values() {
    let ctx = base().with_extra("replicas", 3).with_extra("debug", true);
    let vars = ctx.template_vars();
    assert_eq!(vars.get("image").map(String::as_str), Some("app"));
    assert_eq!(vars.get("replicas").map(String::as_str), Some("3"));
    assert_eq!(vars.get("debug").map(String::as_str), Some("true"));
}

fn arb_overrides() -> impl Strategy<Value = ContextOverrides> {
    (
        proptest::option::of("[a-z]{1,8}"),
        proptest::collection::btree_map("[A-Z]{1,4}", "[a-z0-9]{0,6}", 0..4),
        proptest::option::of(any::<bool>()),
        proptest::option::of(proptest::option::of("[a-z]{1,8}")),
        proptest::collection::btree_map("[a-z]{1,4}", "[a-z0-9]{0,6}", 0..4),
    )
        .prop_map(|(dir, env, dry_run, host, extra)| ContextOverrides {
            working_dir: dir.map(PathBuf::from),
            env,
            dry_run,
            host: host.map(|h| h.map(HostDescriptor::new)),
            extra: extra.into_iter().map(|(k, v)| (k, Value::String(v))).collect(),
        })
}

proptest! {
    #[test]
    fn derive_never_mutates_parent(overrides in arb_overrides()) {
        let parent = base().with_host(HostDescriptor::new("origin"));
        let before = snapshot(&parent);
        let _child = parent.derive(&overrides);
        prop_assert_eq!(snapshot(&parent), before);
    }

    #[test]
    fn derive_child_env_contains_parent_keys(overrides in arb_overrides()) {
        let parent = base();
        let child = parent.derive(&overrides);
        for key in parent.env().keys() {
            prop_assert!(child.env().contains_key(key));
        }
    }
}
