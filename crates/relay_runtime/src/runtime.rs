//! The runtime: registry, resolution cache, baton slot and the public call surface.
//!
//! Initialization order: construct the runtime (bootstrap phase on by default),
//! install `@`-prefixed foundational interfaces, call [`Runtime::finish_bootstrap`],
//! then register application interfaces.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use relay_core::SieveCache;
use tracing::warn;

use crate::baton::{Baton, BatonSlot, Envelope, canonicalize};
use crate::config::RuntimeConfig;
use crate::core::params::ParamList;
use crate::core::value::{Op, Value};
use crate::dispatch::HandlerRef;
use crate::errors::{HandlerResult, RuntimeError, Signal};
use crate::flow::FrameId;
use crate::interface::{InterfaceConfig, InterfaceHandle};
use crate::object::Receiver;
use crate::registry::Registry;

pub struct Runtime {
    pub(crate) registry: Registry,
    pub(crate) cache: RefCell<SieveCache<(Rc<str>, Op), HandlerRef>>,
    pub(crate) baton: BatonSlot,
    config: RuntimeConfig,
    next_object: Cell<u64>,
    next_frame: Cell<u64>,
    depth: Cell<usize>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            registry: Registry::new(config.bootstrap),
            cache: RefCell::new(SieveCache::new(config.cache_capacity)),
            baton: BatonSlot::new(),
            config,
            next_object: Cell::new(0),
            next_frame: Cell::new(0),
            depth: Cell::new(0),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn is_bootstrapping(&self) -> bool {
        self.registry.is_bootstrapping()
    }

    /// Ends the bootstrap phase; `@` names are rejected from now on.
    pub fn finish_bootstrap(&self) {
        self.registry.finish_bootstrap();
    }

    /// Returns the interface named `name`, creating an empty one if needed.
    /// `"?"` always creates a new anonymous interface.
    pub fn interface(&self, name: &str) -> Result<InterfaceHandle, RuntimeError> {
        self.registry.get_or_create(name)
    }

    pub fn configure(
        &self,
        handle: &InterfaceHandle,
        config: InterfaceConfig,
    ) -> Result<(), RuntimeError> {
        if !self.registry.owns(handle) {
            return Err(RuntimeError::UnknownInterface(handle.name().to_string()));
        }
        self.registry.configure(&handle.record, config)
    }

    /// `interface` followed by `configure`.
    pub fn define(
        &self,
        name: &str,
        config: InterfaceConfig,
    ) -> Result<InterfaceHandle, RuntimeError> {
        let handle = self.interface(name)?;
        self.registry.configure(&handle.record, config)?;
        Ok(handle)
    }

    /// Names in `name`'s flattened chain, `name` first.
    pub fn flat_chain(&self, name: &str) -> Result<Vec<String>, RuntimeError> {
        let record = self.registry.require(name)?;
        Ok(self
            .registry
            .flat_chain(&record)
            .iter()
            .map(|n| n.to_string())
            .collect())
    }

    pub fn interface_count(&self) -> usize {
        self.registry.len()
    }

    pub fn send(&self, receiver: &Receiver, op: impl Into<Op>, params: ParamList) -> HandlerResult {
        self.deliver(Envelope::new(receiver.clone(), op.into(), params))
    }

    /// Like [`Runtime::send`], but evaluates `fallback` instead of failing with
    /// `NoHandler`.
    pub fn send_else(
        &self,
        receiver: &Receiver,
        op: impl Into<Op>,
        params: ParamList,
        fallback: impl Into<Value>,
    ) -> HandlerResult {
        let mut env = Envelope::new(receiver.clone(), op.into(), params);
        env.fallback = Some(fallback.into());
        self.deliver(env)
    }

    /// Invokes `receiver` the way compiled code does: with an operation, with a
    /// list-operation value, or with nothing (picking up a pending baton).
    pub fn call(&self, receiver: &Receiver, op: Option<Op>, params: Option<Value>) -> HandlerResult {
        let env = canonicalize(&self.baton, op, params, receiver)?;
        self.deliver(env)
    }

    /// Sends with sender attribution carried through the baton slot.
    pub fn send_attributed(
        &self,
        sender: Option<&Receiver>,
        sender_type: Option<&str>,
        receiver: &Receiver,
        op: impl Into<Op>,
        params: ParamList,
    ) -> HandlerResult {
        let sender_type = sender_type
            .or_else(|| sender.map(Receiver::type_name))
            .map(Rc::from);
        let baton = Baton {
            sender: sender.cloned(),
            sender_type,
            receiver: receiver.clone(),
            op: op.into(),
            params,
        };
        let _guard = self.baton.hand_off(baton)?;
        self.call(receiver, None, None)
    }

    pub fn baton_pending(&self) -> bool {
        self.baton.is_pending()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    pub(crate) fn deliver(&self, env: Envelope) -> HandlerResult {
        let depth = self.depth.get();
        self.depth.set(depth + 1);
        let result = self.dispatch(env);
        self.depth.set(depth);
        if depth == 0 {
            if let Err(Signal::Flow(signal)) = &result {
                warn!(tag = %signal.tag(), "flow-control signal escaped the outermost send");
            }
        }
        result
    }

    pub(crate) fn next_frame_id(&self) -> FrameId {
        let id = self.next_frame.get() + 1;
        self.next_frame.set(id);
        FrameId(id)
    }

    pub(crate) fn next_object_id(&self) -> u64 {
        let id = self.next_object.get() + 1;
        self.next_object.set(id);
        id
    }
}
