//! Read-only views of the registry for tooling.

use serde::Serialize;

use crate::errors::RuntimeError;
use crate::interface::{CacheHint, ControlOp, HandlerEntry, InterfaceFlags, InterfaceRecord};
use crate::runtime::Runtime;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HandlerSummary {
    pub op: String,
    pub stub: bool,
    /// One of the engine's own operations (`@init`, `@default`, `@defacc`).
    pub control: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<CacheHint>,
}

#[derive(Clone, Debug, Serialize)]
pub struct InterfaceSummary {
    pub name: String,
    pub chain: Vec<String>,
    pub flags: InterfaceFlags,
    pub handlers: Vec<HandlerSummary>,
}

fn summarize_handlers(record: &InterfaceRecord) -> Vec<HandlerSummary> {
    let mut out: Vec<HandlerSummary> = record
        .handlers
        .borrow()
        .iter()
        .map(|(op, entry)| {
            let (stub, hint) = match entry {
                HandlerEntry::Active(h) => (false, Some(h.cache_hint())),
                HandlerEntry::Stub => (true, None),
            };
            HandlerSummary {
                op: op.to_string(),
                stub,
                control: ControlOp::of(op).is_some(),
                hint,
            }
        })
        .collect();
    out.sort_by(|a, b| a.op.cmp(&b.op));
    out
}

fn direct_chain(record: &InterfaceRecord) -> Vec<String> {
    record
        .chain
        .borrow()
        .as_ref()
        .map(|c| c.iter().map(|n| n.to_string()).collect())
        .unwrap_or_default()
}

impl Runtime {
    /// Handlers declared directly by `ty`, sorted by operation name.
    pub fn list_handlers(&self, ty: &str) -> Result<Vec<HandlerSummary>, RuntimeError> {
        let record = self.registry.require(ty)?;
        Ok(summarize_handlers(&record))
    }

    /// Direct supertypes of `ty` in declaration order.
    pub fn chain_of(&self, ty: &str) -> Result<Vec<String>, RuntimeError> {
        let record = self.registry.require(ty)?;
        Ok(direct_chain(&record))
    }

    pub fn describe(&self, ty: &str) -> Result<InterfaceSummary, RuntimeError> {
        let record = self.registry.require(ty)?;
        Ok(InterfaceSummary {
            name: record.name.to_string(),
            chain: direct_chain(&record),
            flags: record.flags(),
            handlers: summarize_handlers(&record),
        })
    }

    /// Every interface, sorted by name, as JSON.
    pub fn dump_registry(&self) -> serde_json::Value {
        let all: Vec<InterfaceSummary> = self
            .registry
            .snapshot()
            .iter()
            .map(|record| InterfaceSummary {
                name: record.name.to_string(),
                chain: direct_chain(record),
                flags: record.flags(),
                handlers: summarize_handlers(record),
            })
            .collect();
        serde_json::to_value(all).unwrap_or(serde_json::Value::Null)
    }
}
