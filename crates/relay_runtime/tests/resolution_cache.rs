mod common;

use common::{bump, counter, ok};
use relay_runtime::{
    CacheHint, Handler, InterfaceConfig, Op, ParamList, Runtime, RuntimeConfig, Value,
};

fn small_runtime(capacity: usize) -> Runtime {
    Runtime::with_config(RuntimeConfig {
        cache_capacity: capacity,
        ..RuntimeConfig::default()
    })
}

fn locked_pair(rt: &Runtime, lock_child: bool) {
    rt.define(
        "base",
        InterfaceConfig::new().lock().native("area", |_| ok(1)),
    )
    .unwrap();
    let child = InterfaceConfig::new().chain(["base"]);
    let child = if lock_child { child.lock() } else { child };
    rt.define("child", child).unwrap();
}

#[test]
fn locked_chains_are_cached() {
    let rt = Runtime::new();
    locked_pair(&rt, true);
    let obj = rt.instantiate("child", ParamList::new()).unwrap();
    assert_eq!(rt.cache_len(), 0);

    assert_eq!(rt.send(&obj, "area", ParamList::new()).unwrap(), Value::Int(1));
    assert_eq!(rt.cache_len(), 1);
    assert_eq!(rt.send(&obj, "area", ParamList::new()).unwrap(), Value::Int(1));
    assert_eq!(rt.cache_len(), 1);

    rt.clear_cache();
    assert_eq!(rt.cache_len(), 0);
}

#[test]
fn unlocked_links_disable_caching() {
    let rt = Runtime::new();
    locked_pair(&rt, false);
    let obj = rt.instantiate("child", ParamList::new()).unwrap();
    rt.send(&obj, "area", ParamList::new()).unwrap();
    assert_eq!(rt.cache_len(), 0);
}

#[test]
fn resolutions_that_skip_self_are_not_cached() {
    let rt = Runtime::new();
    locked_pair(&rt, true);
    let found = rt
        .resolve_handler("child", &Op::name("area"), true)
        .unwrap()
        .unwrap();
    assert_eq!(found.declaring_type(), "base");
    assert_eq!(rt.cache_len(), 0);
}

fn busy_interface(rt: &Runtime, ops: usize) {
    let mut config = InterfaceConfig::new()
        .lock()
        .handler("hot", Handler::native(|_| ok("hot")).hint(CacheHint::Pin));
    for i in 0..ops {
        config = config.native(format!("op{i}"), move |_| ok(i as i64));
    }
    rt.define("busy", config).unwrap();
}

#[test]
fn pinned_resolution_survives_pressure() {
    let rt = small_runtime(4);
    assert_eq!(rt.config().cache_capacity, 4);
    busy_interface(&rt, 8);
    let obj = rt.instantiate("busy", ParamList::new()).unwrap();

    rt.send(&obj, "hot", ParamList::new()).unwrap();
    for i in 0..8 {
        let v = rt.send(&obj, format!("op{i}"), ParamList::new()).unwrap();
        assert_eq!(v, Value::Int(i));
    }
    // Four ring slots plus the pinned entry.
    assert_eq!(rt.cache_len(), 5);
    assert_eq!(rt.send(&obj, "hot", ParamList::new()).unwrap(), Value::str("hot"));
}

#[test]
fn evicted_resolution_is_rebuilt_identically() {
    let rt = small_runtime(1);
    busy_interface(&rt, 2);
    let first = rt
        .resolve_handler("busy", &Op::name("op0"), false)
        .unwrap()
        .unwrap();
    rt.resolve_handler("busy", &Op::name("op1"), false).unwrap();
    let again = rt
        .resolve_handler("busy", &Op::name("op0"), false)
        .unwrap()
        .unwrap();
    assert_eq!(first, again);
    assert_eq!(rt.cache_len(), 1);
}

#[test]
fn never_hint_skips_the_cache() {
    let rt = Runtime::new();
    rt.define(
        "volatile",
        InterfaceConfig::new()
            .lock()
            .handler("read", Handler::native(|_| ok(1)).hint(CacheHint::Never)),
    )
    .unwrap();
    let obj = rt.instantiate("volatile", ParamList::new()).unwrap();
    rt.send(&obj, "read", ParamList::new()).unwrap();
    assert_eq!(rt.cache_len(), 0);
}

#[test]
fn moderated_defaults_are_consulted_every_time() {
    let rt = Runtime::new();
    let asked = counter();
    let a = asked.clone();
    rt.define(
        "guarded",
        InterfaceConfig::new()
            .lock()
            .on_default(|_| ok("default"))
            .moderator(move |_| {
                bump(&a);
                ok(true)
            }),
    )
    .unwrap();
    let obj = rt.instantiate("guarded", ParamList::new()).unwrap();
    assert_eq!(asked.get(), 0);

    for _ in 0..2 {
        assert_eq!(
            rt.send(&obj, "whatever", ParamList::new()).unwrap(),
            Value::str("default")
        );
    }
    assert_eq!(asked.get(), 2);
    assert_eq!(rt.cache_len(), 0);
}

#[test]
fn cached_default_is_not_used_for_init() {
    let rt = Runtime::new();
    let runs = counter();
    let r = runs.clone();
    rt.define(
        "catchall",
        InterfaceConfig::new().lock().on_default(move |_| {
            bump(&r);
            ok(Value::Unit)
        }),
    )
    .unwrap();
    rt.instantiate("catchall", ParamList::new()).unwrap();
    assert_eq!(runs.get(), 0);

    let obj = rt.instantiate("catchall", ParamList::new()).unwrap();
    rt.send(&obj, "@init", ParamList::new()).unwrap();
    assert_eq!(runs.get(), 1);
    assert_eq!(rt.cache_len(), 1);

    rt.instantiate("catchall", ParamList::new()).unwrap();
    assert_eq!(runs.get(), 1);
}

#[test]
fn zero_capacity_still_dispatches() {
    let rt = small_runtime(0);
    locked_pair(&rt, true);
    let obj = rt.instantiate("child", ParamList::new()).unwrap();
    assert_eq!(rt.send(&obj, "area", ParamList::new()).unwrap(), Value::Int(1));
    assert_eq!(rt.cache_len(), 0);
}
