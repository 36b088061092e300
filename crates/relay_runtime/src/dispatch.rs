//! Dispatch engine.
//!
//! Per message: resolve a handler across the receiver's flattened chain, invoke it in a
//! fresh [`Dispatch`] frame, let it redispatch, and turn flow signals aimed at the
//! frame back into values.

use std::any::Any;
use std::cell::{Cell, OnceCell};
use std::rc::Rc;

use tracing::trace;

use crate::baton::Envelope;
use crate::core::params::{ParamList, Storage, new_storage};
use crate::core::value::{Op, Value};
use crate::errors::{HandlerResult, RuntimeError, Signal};
use crate::flow::{FlowSignal, FlowTag, FlowTarget, FrameId, Landing};
use crate::interface::{CacheHint, ControlOp, Handler, HandlerEntry, InterfaceRecord};
use crate::object::Receiver;
use crate::runtime::Runtime;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Direct,
    /// Reached through an `@default` handler.
    Default,
}

/// A resolved handler together with the interface that declares it.
#[derive(Clone, Debug)]
pub struct HandlerRef {
    declaring: Rc<str>,
    handler: Rc<Handler>,
    kind: Resolution,
}

impl HandlerRef {
    pub fn declaring_type(&self) -> &str {
        &self.declaring
    }

    pub fn kind(&self) -> Resolution {
        self.kind
    }

    pub fn is_default(&self) -> bool {
        self.kind == Resolution::Default
    }

    pub fn cache_hint(&self) -> CacheHint {
        self.handler.cache_hint()
    }
}

impl PartialEq for HandlerRef {
    fn eq(&self, other: &Self) -> bool {
        self.declaring == other.declaring
            && self.kind == other.kind
            && Rc::ptr_eq(&self.handler, &other.handler)
    }
}

/// First match per slot while walking a flattened chain.
enum Seen {
    Unseen,
    Found(HandlerRef),
    Blocked,
}

impl Seen {
    fn observe(&mut self, entry: Option<HandlerEntry>, declaring: &Rc<str>, kind: Resolution) {
        if !matches!(self, Seen::Unseen) {
            return;
        }
        match entry {
            Some(HandlerEntry::Active(handler)) => {
                *self = Seen::Found(HandlerRef {
                    declaring: declaring.clone(),
                    handler,
                    kind,
                })
            }
            Some(HandlerEntry::Stub) => *self = Seen::Blocked,
            None => {}
        }
    }

    fn decided(&self) -> bool {
        !matches!(self, Seen::Unseen)
    }

    fn found(self) -> Option<HandlerRef> {
        match self {
            Seen::Found(h) => Some(h),
            _ => None,
        }
    }
}

/// Caller identity carried into a frame.
#[derive(Clone, Default)]
pub(crate) struct Attribution {
    pub(crate) receiver: Option<Receiver>,
    pub(crate) sender: Option<Receiver>,
    pub(crate) sender_type: Option<Rc<str>>,
}

/// Options for [`Dispatch::redispatch`].
///
/// With neither an operation nor a type the same operation is resolved again, starting
/// after the interface that declares the running handler.
#[derive(Default)]
pub struct Redispatch {
    op: Option<Op>,
    ty: Option<String>,
    params: Option<ParamList>,
    fallback: Option<Value>,
}

impl Redispatch {
    pub fn next() -> Self {
        Self::default()
    }

    pub fn op(mut self, op: impl Into<Op>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Target interface; must be in the running handler's flattened chain.
    pub fn to_type(mut self, ty: impl Into<String>) -> Self {
        self.ty = Some(ty.into());
        self
    }

    pub fn params(mut self, params: ParamList) -> Self {
        self.params = Some(params);
        self
    }

    pub fn or_else(mut self, fallback: impl Into<Value>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }
}

/// Per-invocation context handed to a handler body.
pub struct Dispatch<'rt> {
    rt: &'rt Runtime,
    id: FrameId,
    handler_type: Rc<str>,
    kind: Resolution,
    op: Op,
    params: ParamList,
    attribution: Attribution,
    transient: OnceCell<Storage>,
    capture: Cell<bool>,
}

impl<'rt> Dispatch<'rt> {
    pub fn runtime(&self) -> &'rt Runtime {
        self.rt
    }

    pub fn frame_id(&self) -> FrameId {
        self.id
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn params(&self) -> &ParamList {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.params.at(index)
    }

    /// Interface declaring the running handler.
    pub fn handler_type(&self) -> &str {
        &self.handler_type
    }

    pub fn is_default(&self) -> bool {
        self.kind == Resolution::Default
    }

    pub fn receiver(&self) -> Option<&Receiver> {
        self.attribution.receiver.as_ref()
    }

    pub fn receiver_type(&self) -> Option<&str> {
        self.attribution.receiver.as_ref().map(Receiver::type_name)
    }

    pub fn sender(&self) -> Option<&Receiver> {
        self.attribution.sender.as_ref()
    }

    pub fn sender_type(&self) -> Option<&str> {
        self.attribution.sender_type.as_deref()
    }

    /// The receiver's persistent storage, created on first access.
    pub fn persistent(&self) -> Option<Storage> {
        self.attribution.receiver.as_ref().map(Receiver::persistent)
    }

    /// Storage that lives as long as this frame.
    pub fn transient(&self) -> Storage {
        self.transient.get_or_init(new_storage).clone()
    }

    fn owns_state(&self) -> Option<&Receiver> {
        self.receiver().filter(|r| r.type_name() == &*self.handler_type)
    }

    /// Replaces the receiver's private state. Only handlers declared by the
    /// receiver's own interface may do this; returns whether it happened.
    pub fn set_state<T: Any>(&self, state: T) -> bool {
        match self.owns_state() {
            Some(r) => {
                r.set_state(Box::new(state));
                true
            }
            None => false,
        }
    }

    /// Borrows the receiver's private state, under the same rule as [`Self::set_state`].
    pub fn with_state<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.owns_state()?.with_state(f)
    }

    /// Arms this frame and returns a signal that it will turn into `value`.
    pub fn ret(&self, value: impl Into<Value>) -> Signal {
        self.escape(FlowTag::Return, value)
    }

    pub fn escape(&self, tag: FlowTag, value: impl Into<Value>) -> Signal {
        self.return_target().signal(tag, value)
    }

    /// Arms this frame and hands out a target that nested code can return to.
    pub fn return_target(&self) -> FlowTarget {
        self.capture.set(true);
        FlowTarget::new(self.id)
    }

    /// Runs `result` through a catch for `tag` signals aimed at this frame.
    ///
    /// Loop-style handlers use this to honour `next`/`stop` without leaving the frame.
    pub fn intercept(&self, result: HandlerResult, tag: FlowTag) -> Result<Landing, Signal> {
        match result {
            Ok(v) => Ok(Landing::Completed(v)),
            Err(Signal::Flow(f)) if f.tag() == tag && self.captures(&f) => {
                Ok(Landing::Caught(f.into_payload()))
            }
            Err(e) => Err(e),
        }
    }

    fn captures(&self, signal: &FlowSignal) -> bool {
        self.capture.get() && signal.target() == Some(self.id)
    }

    /// Sends to another receiver with this frame's receiver as the sender.
    pub fn send(&self, target: &Receiver, op: impl Into<Op>, params: ParamList) -> HandlerResult {
        self.rt.send_attributed(
            self.attribution.receiver.as_ref(),
            Some(&*self.handler_type),
            target,
            op,
            params,
        )
    }

    /// Re-resolves and invokes a handler for the same receiver.
    pub fn redispatch(&self, options: Redispatch) -> HandlerResult {
        let rt = self.rt;
        let current = rt.registry.require(&self.handler_type)?;
        let Redispatch {
            op,
            ty,
            params,
            fallback,
        } = options;

        let (record, op, exclude_self, direct_only) = match (op, ty) {
            (None, None) => (current, self.op.clone(), true, false),
            (op, Some(ty)) => {
                let flat = rt.registry.flat_chain(&current);
                let op_changed = op.is_some();
                let op = op.unwrap_or_else(|| self.op.clone());
                if !flat.iter().any(|n| **n == *ty) {
                    return Err(RuntimeError::InvalidRedispatch {
                        from: self.handler_type.to_string(),
                        target: ty,
                        op: op.to_string(),
                    }
                    .into());
                }
                (rt.registry.require(&ty)?, op, false, !op_changed)
            }
            (Some(op), None) => {
                let ty = self
                    .receiver()
                    .map_or(&self.handler_type, Receiver::type_rc);
                (rt.registry.require(ty)?, op, false, false)
            }
        };

        let resolved = rt.resolve_in(&record, &op, exclude_self, !direct_only, self.receiver())?;
        trace!(
            from = %self.handler_type,
            to = %record.name,
            %op,
            found = resolved.is_some(),
            "redispatch"
        );
        match resolved {
            Some(h) => rt.invoke(
                &h,
                op,
                params.unwrap_or_else(|| self.params.clone()),
                self.attribution.clone(),
            ),
            None => rt.fallback_or(
                fallback,
                RuntimeError::NoHandler {
                    ty: record.name.to_string(),
                    op: op.to_string(),
                },
            ),
        }
    }
}

impl Runtime {
    /// Finds the handler `ty` uses for `op`.
    ///
    /// The flattened chain is walked in order (skipping `ty` itself if `exclude_self`),
    /// and the first direct handler wins. Otherwise the first `@default` is used unless
    /// a `@defacc` moderator, consulted with `requestedOp` and `defaultType`, rejects it.
    pub fn resolve_handler(
        &self,
        ty: &str,
        op: &Op,
        exclude_self: bool,
    ) -> Result<Option<HandlerRef>, Signal> {
        let record = self.registry.require(ty)?;
        self.resolve_in(&record, op, exclude_self, true, None)
    }

    pub(crate) fn resolve_in(
        &self,
        record: &Rc<InterfaceRecord>,
        op: &Op,
        exclude_self: bool,
        allow_default: bool,
        receiver: Option<&Receiver>,
    ) -> Result<Option<HandlerRef>, Signal> {
        let flat = self.registry.flat_chain(record);
        let cacheable = !exclude_self && self.registry.all_locked(&flat);
        let key = (record.name.clone(), op.clone());
        if cacheable {
            if let Some(hit) = self.cache.borrow_mut().get(&key) {
                trace!(interface = %record.name, %op, "resolution cache hit");
                // A cached default means there is no direct handler.
                return Ok(Some(hit.clone()).filter(|h| allow_default || !h.is_default()));
            }
        }

        let default_op = ControlOp::Default.op();
        let moderator_op = ControlOp::Moderator.op();
        let mut direct = Seen::Unseen;
        let mut default = Seen::Unseen;
        let mut moderator = Seen::Unseen;
        let skip = usize::from(exclude_self);
        for name in flat.iter().skip(skip) {
            let Some(iface) = self.registry.lookup(name) else {
                continue;
            };
            direct.observe(iface.entry(op), name, Resolution::Direct);
            if let Seen::Found(_) = direct {
                break;
            }
            default.observe(iface.entry(&default_op), name, Resolution::Default);
            moderator.observe(iface.entry(&moderator_op), name, Resolution::Direct);
            if direct.decided() && default.decided() && moderator.decided() {
                break;
            }
        }

        if let Some(found) = direct.found() {
            if cacheable {
                self.remember(key, &found);
            }
            return Ok(Some(found));
        }
        if !allow_default {
            return Ok(None);
        }
        let Some(fallback) = default.found() else {
            trace!(interface = %record.name, %op, "no handler");
            return Ok(None);
        };
        if let Some(moderator) = moderator.found() {
            let query = ParamList::new()
                .with("requestedOp", op.to_value())
                .with("defaultType", Value::Str(fallback.declaring.clone()));
            let attribution = Attribution {
                receiver: receiver.cloned(),
                ..Attribution::default()
            };
            let verdict = self.invoke(&moderator, moderator_op, query, attribution)?;
            if !verdict.is_truthy() {
                trace!(interface = %record.name, %op, "default rejected by moderator");
                return Ok(None);
            }
            return Ok(Some(fallback));
        }
        if cacheable {
            self.remember(key, &fallback);
        }
        Ok(Some(fallback))
    }

    fn remember(&self, key: (Rc<str>, Op), found: &HandlerRef) {
        let pinned = match found.cache_hint() {
            CacheHint::Never => return,
            CacheHint::Always => false,
            CacheHint::Pin => true,
        };
        let evicted = self.cache.borrow_mut().set(key, found.clone(), pinned);
        if let Some(((ty, op), _)) = evicted {
            trace!(interface = %ty, %op, "resolution evicted");
        }
    }

    /// Resolves and invokes the handler for an envelope.
    pub(crate) fn dispatch(&self, env: Envelope) -> HandlerResult {
        let record = self.registry.require(env.receiver.type_name())?;
        match self.resolve_in(&record, &env.op, false, true, Some(&env.receiver))? {
            Some(handler) => {
                let attribution = Attribution {
                    receiver: Some(env.receiver),
                    sender: env.sender,
                    sender_type: env.sender_type,
                };
                self.invoke(&handler, env.op, env.params, attribution)
            }
            None => self.fallback_or(
                env.fallback,
                RuntimeError::NoHandler {
                    ty: record.name.to_string(),
                    op: env.op.to_string(),
                },
            ),
        }
    }

    /// Runs a handler in a new frame, catching flow signals the frame armed for.
    pub(crate) fn invoke(
        &self,
        handler: &HandlerRef,
        op: Op,
        params: ParamList,
        attribution: Attribution,
    ) -> HandlerResult {
        let frame = Dispatch {
            rt: self,
            id: self.next_frame_id(),
            handler_type: handler.declaring.clone(),
            kind: handler.kind,
            op,
            params,
            attribution,
            transient: OnceCell::new(),
            capture: Cell::new(false),
        };
        match handler.handler.call(&frame) {
            Err(Signal::Flow(signal)) if frame.captures(&signal) => Ok(signal.into_payload()),
            other => other,
        }
    }

    pub(crate) fn fallback_or(&self, fallback: Option<Value>, err: RuntimeError) -> HandlerResult {
        match fallback {
            Some(v) => v.evaluate(self),
            None => Err(err.into()),
        }
    }
}
