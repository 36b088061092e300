mod common;

use common::ok;
use relay_runtime::{CacheHint, Handler, HandlerSummary, InterfaceConfig, Runtime, RuntimeError};

fn install(rt: &Runtime) {
    rt.define("a", InterfaceConfig::new()).unwrap();
    rt.define("b", InterfaceConfig::new().chain(["a"])).unwrap();
    rt.define(
        "thing",
        InterfaceConfig::new()
            .chain(["b", "a"])
            .native("size", |_| ok(1))
            .handler("area", Handler::native(|_| ok(2)).hint(CacheHint::Pin))
            .stub("volume")
            .on_init(|_| ok(relay_runtime::Value::Unit)),
    )
    .unwrap();
}

#[test]
fn handlers_are_listed_in_name_order() {
    let rt = Runtime::new();
    install(&rt);
    let listed = rt.list_handlers("thing").unwrap();
    let ops: Vec<&str> = listed.iter().map(|h| h.op.as_str()).collect();
    assert_eq!(ops, ["@init", "area", "size", "volume"]);

    assert!(listed[0].control);
    assert_eq!(listed[1].hint, Some(CacheHint::Pin));
    assert_eq!(
        listed[3],
        HandlerSummary {
            op: "volume".into(),
            stub: true,
            control: false,
            hint: None,
        }
    );
}

#[test]
fn chain_of_reports_direct_supertypes() {
    let rt = Runtime::new();
    install(&rt);
    assert_eq!(rt.chain_of("thing").unwrap(), ["b", "a"]);
    assert_eq!(rt.flat_chain("thing").unwrap(), ["thing", "b", "a"]);
    assert!(rt.chain_of("a").unwrap().is_empty());
    assert_eq!(
        rt.chain_of("nope").unwrap_err(),
        RuntimeError::UnknownInterface("nope".into())
    );
}

#[test]
fn describe_reports_flags() {
    let rt = Runtime::new();
    install(&rt);
    let summary = rt.describe("a").unwrap();
    assert_eq!(summary.name, "a");
    assert!(summary.flags.refd);
    assert!(!summary.flags.pristine);
    assert!(summary.handlers.is_empty());
}

#[test]
fn registry_dump_is_sorted_json() {
    let rt = Runtime::new();
    install(&rt);
    rt.define("z", InterfaceConfig::new().lock().set_final())
        .unwrap();
    let dump = rt.dump_registry();
    let names: Vec<&str> = dump
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["a", "b", "thing", "z"]);

    let z = &dump[3];
    assert_eq!(z["flags"]["final"], serde_json::json!(true));
    assert_eq!(z["flags"]["locked"], serde_json::json!(true));
    assert_eq!(z["flags"]["abstract"], serde_json::json!(false));

    let thing = &dump[2];
    assert_eq!(thing["chain"], serde_json::json!(["b", "a"]));
    assert_eq!(thing["handlers"][1]["hint"], serde_json::json!("pin"));
    assert!(thing["handlers"][3].get("hint").is_none());
}
