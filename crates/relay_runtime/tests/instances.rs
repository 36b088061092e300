mod common;

use common::{bump, counter, error_code, install_shapes, num, ok, radius};
use relay_runtime::{InterfaceConfig, ParamList, Runtime, RuntimeError, Signal, Value};

#[test]
fn unknown_and_abstract_interfaces_cannot_be_instantiated() {
    let rt = Runtime::new();
    assert_eq!(
        error_code(rt.instantiate("ghost", ParamList::new())),
        "RELAY_UNKNOWN_INTERFACE"
    );

    rt.define("idea", InterfaceConfig::new().set_abstract()).unwrap();
    let err = rt.instantiate("idea", ParamList::new()).unwrap_err();
    assert_eq!(
        err.as_error(),
        Some(&RuntimeError::AbstractInterface("idea".into()))
    );
}

#[test]
fn init_receives_the_instantiation_params() {
    let rt = Runtime::new();
    install_shapes(&rt);
    let circle = rt.instantiate("circle", radius(3)).unwrap();
    let area = rt.send(&circle, "area", ParamList::new()).unwrap();
    assert!((num(&area) - 28.26).abs() < 1e-9);
    assert!(circle.has_persistent());
}

#[test]
fn init_is_inherited_through_the_chain() {
    let rt = Runtime::new();
    rt.define(
        "base",
        InterfaceConfig::new()
            .on_init(|d| {
                let p = d.persistent().expect("receiver");
                p.borrow_mut().set("born", d.receiver_type().unwrap_or("?"));
                ok(Value::Unit)
            })
            .native("born", |d| {
                let p = d.persistent().expect("receiver");
                let born = p.borrow().get("born").cloned();
                ok(born.unwrap_or_default())
            }),
    )
    .unwrap();
    rt.define("child", InterfaceConfig::new().chain(["base"]))
        .unwrap();
    let obj = rt.instantiate("child", ParamList::new()).unwrap();
    assert_eq!(rt.send(&obj, "born", ParamList::new()).unwrap(), Value::str("child"));
}

#[test]
fn default_handler_does_not_serve_init() {
    let rt = Runtime::new();
    let runs = counter();
    let r = runs.clone();
    rt.define(
        "catchall",
        InterfaceConfig::new().on_default(move |_| {
            bump(&r);
            ok(Value::Unit)
        }),
    )
    .unwrap();
    rt.instantiate("catchall", ParamList::new()).unwrap();
    assert_eq!(runs.get(), 0);
}

#[test]
fn singleton_init_runs_once() {
    let rt = Runtime::new();
    let runs = counter();
    let r = runs.clone();
    rt.define(
        "config",
        InterfaceConfig::new().singleton().on_init(move |_| {
            bump(&r);
            ok(Value::Unit)
        }),
    )
    .unwrap();
    let a = rt.instantiate("config", ParamList::new()).unwrap();
    let b = rt
        .instantiate("config", ParamList::new().with("ignored", true))
        .unwrap();
    assert!(a.ptr_eq(&b));
    assert_eq!(runs.get(), 1);
}

#[test]
fn failed_init_is_reported_and_not_kept() {
    let rt = Runtime::new();
    let runs = counter();
    let r = runs.clone();
    rt.define(
        "flaky",
        InterfaceConfig::new().singleton().on_init(move |_| {
            bump(&r);
            if r.get() == 1 {
                return Err(Signal::failed("not yet"));
            }
            ok(Value::Unit)
        }),
    )
    .unwrap();
    let err = rt.instantiate("flaky", ParamList::new()).unwrap_err();
    assert_eq!(err.as_error(), Some(&RuntimeError::Failed("not yet".into())));

    let first = rt.instantiate("flaky", ParamList::new()).unwrap();
    let again = rt.instantiate("flaky", ParamList::new()).unwrap();
    assert!(first.ptr_eq(&again));
    assert_eq!(runs.get(), 2);
}

#[test]
fn private_interfaces_need_their_handle() {
    let rt = Runtime::new();
    let handle = rt.define("secret", InterfaceConfig::new().private()).unwrap();
    assert_eq!(
        error_code(rt.instantiate("secret", ParamList::new())),
        "RELAY_PRIVATE_INTERFACE"
    );
    let obj = rt.instantiate_with(&handle, ParamList::new()).unwrap();
    assert_eq!(obj.type_name(), "secret");
}

#[test]
fn foreign_handles_are_rejected() {
    let rt = Runtime::new();
    let other = Runtime::new();
    let handle = other.define("thing", InterfaceConfig::new()).unwrap();
    rt.define("thing", InterfaceConfig::new()).unwrap();
    assert_eq!(
        error_code(rt.instantiate_with(&handle, ParamList::new())),
        "RELAY_UNKNOWN_INTERFACE"
    );
}

#[test]
fn instantiation_freezes_the_chain() {
    let rt = Runtime::new();
    install_shapes(&rt);
    rt.define("leaf", InterfaceConfig::new()).unwrap();
    rt.instantiate("leaf", ParamList::new()).unwrap();
    assert!(rt.interface("leaf").unwrap().flags().refd);
    assert_eq!(
        rt.define("leaf", InterfaceConfig::new().chain(["shape"]))
            .unwrap_err(),
        RuntimeError::ChainFrozen("leaf".into())
    );
}

#[test]
fn private_state_belongs_to_the_declaring_interface() {
    let rt = Runtime::new();
    rt.define(
        "base",
        InterfaceConfig::new()
            .native("peek", |d| ok(d.with_state(|n: &mut i64| *n).unwrap_or(-1)))
            .native("poke", |d| ok(d.set_state(1i64))),
    )
    .unwrap();
    rt.define(
        "counter",
        InterfaceConfig::new()
            .chain(["base"])
            .on_init(|d| {
                d.set_state(0i64);
                ok(Value::Unit)
            })
            .native("inc", |d| {
                let n = d.with_state(|n: &mut i64| {
                    *n += 1;
                    *n
                });
                ok(n.unwrap_or(-1))
            }),
    )
    .unwrap();
    let obj = rt.instantiate("counter", ParamList::new()).unwrap();

    assert_eq!(rt.send(&obj, "inc", ParamList::new()).unwrap(), Value::Int(1));
    assert_eq!(rt.send(&obj, "inc", ParamList::new()).unwrap(), Value::Int(2));
    assert_eq!(rt.send(&obj, "peek", ParamList::new()).unwrap(), Value::Int(-1));
    assert_eq!(rt.send(&obj, "poke", ParamList::new()).unwrap(), Value::Bool(false));
    assert_eq!(rt.send(&obj, "inc", ParamList::new()).unwrap(), Value::Int(3));

    let plain = rt.instantiate("base", ParamList::new()).unwrap();
    assert_eq!(rt.send(&plain, "poke", ParamList::new()).unwrap(), Value::Bool(true));
    assert_eq!(rt.send(&plain, "peek", ParamList::new()).unwrap(), Value::Int(1));
}

#[test]
fn every_instance_gets_a_fresh_identity() {
    let rt = Runtime::new();
    rt.define("plain", InterfaceConfig::new()).unwrap();
    let ids: Vec<u64> = (0..3)
        .map(|_| rt.instantiate("plain", ParamList::new()).unwrap().id())
        .collect();
    assert_eq!(ids.len(), 3);
    assert!(ids[0] != ids[1] && ids[1] != ids[2] && ids[0] != ids[2]);
}

#[test]
fn state_can_be_borrowed_across_a_send_to_the_same_object() {
    let rt = Runtime::new();
    rt.define(
        "tally",
        InterfaceConfig::new()
            .on_init(|d| {
                d.set_state(0i64);
                ok(Value::Unit)
            })
            .native("peek", |d| ok(d.with_state(|n: &mut i64| *n).unwrap_or(-1)))
            .native("bump", |d| {
                let me = d.receiver().cloned().expect("receiver");
                let nested = d.with_state(|n: &mut i64| {
                    *n += 1;
                    d.runtime().send(&me, "peek", ParamList::new())
                });
                nested.unwrap_or_else(|| ok(-2))
            }),
    )
    .unwrap();
    let obj = rt.instantiate("tally", ParamList::new()).unwrap();

    // While borrowed the state is out of reach; afterwards it holds the update.
    assert_eq!(rt.send(&obj, "bump", ParamList::new()).unwrap(), Value::Int(-1));
    assert_eq!(rt.send(&obj, "peek", ParamList::new()).unwrap(), Value::Int(1));
}

#[test]
fn state_replaced_during_a_borrow_is_kept() {
    let rt = Runtime::new();
    rt.define(
        "slot",
        InterfaceConfig::new()
            .on_init(|d| {
                d.set_state(1i64);
                ok(Value::Unit)
            })
            .native("peek", |d| ok(d.with_state(|n: &mut i64| *n).unwrap_or(-1)))
            .native("reset", |d| ok(d.set_state(100i64)))
            .native("swap", |d| {
                let me = d.receiver().cloned().expect("receiver");
                let nested =
                    d.with_state(|_: &mut i64| d.runtime().send(&me, "reset", ParamList::new()));
                nested.unwrap_or_else(|| ok(false))
            }),
    )
    .unwrap();
    let obj = rt.instantiate("slot", ParamList::new()).unwrap();
    assert_eq!(rt.send(&obj, "swap", ParamList::new()).unwrap(), Value::Bool(true));
    assert_eq!(rt.send(&obj, "peek", ParamList::new()).unwrap(), Value::Int(100));
}

#[test]
fn singleton_init_that_instantiates_itself_gets_the_same_object() {
    let rt = Runtime::new();
    let runs = counter();
    let inner_id = std::rc::Rc::new(std::cell::Cell::new(0u64));
    let r = runs.clone();
    let seen = inner_id.clone();
    rt.define(
        "solo",
        InterfaceConfig::new().singleton().on_init(move |d| {
            bump(&r);
            let inner = d.runtime().instantiate("solo", ParamList::new())?;
            seen.set(inner.id());
            ok(Value::Unit)
        }),
    )
    .unwrap();

    let a = rt.instantiate("solo", ParamList::new()).unwrap();
    let b = rt.instantiate("solo", ParamList::new()).unwrap();
    assert_eq!(runs.get(), 1);
    assert_eq!(inner_id.get(), a.id());
    assert!(a.ptr_eq(&b));
}
