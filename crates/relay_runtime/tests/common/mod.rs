#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use relay_runtime::{HandlerResult, InterfaceConfig, ParamList, Runtime, Signal, Value};

pub fn ok(v: impl Into<Value>) -> HandlerResult {
    Ok(v.into())
}

pub fn counter() -> Rc<Cell<usize>> {
    Rc::new(Cell::new(0))
}

pub fn bump(c: &Cell<usize>) {
    c.set(c.get() + 1);
}

pub fn num(v: &Value) -> f64 {
    v.as_f64().expect("numeric value")
}

pub fn error_code(result: Result<impl std::fmt::Debug, Signal>) -> &'static str {
    result.expect_err("expected an error").code()
}

/// `shape` answers `area` with 0; `circle` chains to it and computes from `r`.
pub fn install_shapes(rt: &Runtime) {
    rt.define("shape", InterfaceConfig::new().native("area", |_| ok(0)))
        .unwrap();
    rt.define(
        "circle",
        InterfaceConfig::new()
            .chain(["shape"])
            .on_init(|d| {
                let r = d.param("r").cloned().unwrap_or(Value::Int(1));
                if let Some(p) = d.persistent() {
                    p.borrow_mut().set("r", r);
                }
                ok(Value::Unit)
            })
            .native("area", |d| {
                if d.param("inherited").is_some_and(Value::is_truthy) {
                    return d.redispatch(relay_runtime::Redispatch::next().to_type("shape"));
                }
                let storage = d.persistent().expect("receiver storage");
                let r = storage.borrow().get("r").and_then(Value::as_f64).unwrap_or(0.0);
                ok(3.14 * r * r)
            }),
    )
    .unwrap();
}

pub fn radius(r: i64) -> ParamList {
    ParamList::new().with("r", r)
}
