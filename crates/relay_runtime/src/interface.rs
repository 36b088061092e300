//! Interface records, handlers and configuration requests.

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

use relay_core::{FastHashMap, fast_map_new};
use serde::Serialize;

use crate::core::value::Op;
use crate::dispatch::Dispatch;
use crate::errors::HandlerResult;
use crate::object::Receiver;

/// How a resolution that lands on a handler may be cached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheHint {
    /// Cache when the chain is locked; evictable.
    #[default]
    Always,
    Never,
    /// Cache and never evict.
    Pin,
}

/// Handler body produced outside the runtime, e.g. by a compiler.
pub trait CompiledBody {
    fn invoke(&self, d: &Dispatch<'_>) -> HandlerResult;
}

#[derive(Clone)]
enum HandlerBody {
    Native(Rc<dyn Fn(&Dispatch<'_>) -> HandlerResult>),
    Compiled(Rc<dyn CompiledBody>),
}

pub struct Handler {
    body: HandlerBody,
    hint: CacheHint,
}

impl Handler {
    pub fn native<F>(f: F) -> Self
    where
        F: Fn(&Dispatch<'_>) -> HandlerResult + 'static,
    {
        Self {
            body: HandlerBody::Native(Rc::new(f)),
            hint: CacheHint::Always,
        }
    }

    pub fn compiled(body: impl CompiledBody + 'static) -> Self {
        Self {
            body: HandlerBody::Compiled(Rc::new(body)),
            hint: CacheHint::Always,
        }
    }

    pub fn hint(mut self, hint: CacheHint) -> Self {
        self.hint = hint;
        self
    }

    pub fn cache_hint(&self) -> CacheHint {
        self.hint
    }

    pub fn is_native(&self) -> bool {
        matches!(self.body, HandlerBody::Native(_))
    }

    #[inline]
    pub(crate) fn call(&self, d: &Dispatch<'_>) -> HandlerResult {
        match &self.body {
            HandlerBody::Native(f) => f(d),
            HandlerBody::Compiled(c) => c.invoke(d),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_native() { "native" } else { "compiled" };
        write!(f, "Handler({kind}, {:?})", self.hint)
    }
}

#[derive(Clone)]
pub(crate) enum HandlerEntry {
    Active(Rc<Handler>),
    /// Explicitly blocks the operation at this interface.
    Stub,
}

/// Operations the engine itself sends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlOp {
    Init,
    Default,
    Moderator,
}

static CONTROL_OPS: phf::Map<&'static str, ControlOp> = phf::phf_map! {
    "@init" => ControlOp::Init,
    "@default" => ControlOp::Default,
    "@defacc" => ControlOp::Moderator,
};

impl ControlOp {
    pub fn name(self) -> &'static str {
        match self {
            ControlOp::Init => "@init",
            ControlOp::Default => "@default",
            ControlOp::Moderator => "@defacc",
        }
    }

    pub fn of(op: &Op) -> Option<Self> {
        op.as_name().and_then(|n| CONTROL_OPS.get(n).copied())
    }

    pub fn op(self) -> Op {
        Op::name(self.name())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InterfaceFlags {
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    #[serde(rename = "final")]
    pub is_final: bool,
    pub locked: bool,
    pub once: bool,
    pub pristine: bool,
    pub singleton: bool,
    pub private: bool,
    /// Named in another interface's chain, or instantiated.
    pub refd: bool,
}

/// A configuration request, applied by [`crate::Runtime::configure`].
///
/// Flags can only be switched on. Handlers are added or replaced; `stub` entries
/// block an operation.
#[derive(Default)]
pub struct InterfaceConfig {
    pub(crate) set_abstract: bool,
    pub(crate) set_final: bool,
    pub(crate) lock: bool,
    pub(crate) once: bool,
    pub(crate) singleton: bool,
    pub(crate) private: bool,
    pub(crate) pristine: bool,
    pub(crate) chain: Option<Vec<String>>,
    pub(crate) handlers: Vec<(Op, Option<Handler>)>,
}

impl InterfaceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_abstract(mut self) -> Self {
        self.set_abstract = true;
        self
    }

    pub fn set_final(mut self) -> Self {
        self.set_final = true;
        self
    }

    pub fn lock(mut self) -> Self {
        self.lock = true;
        self
    }

    /// Lock the interface once this request has been applied.
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    pub fn singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    /// Fail with `NotPristine` if the interface was configured before.
    pub fn pristine(mut self) -> Self {
        self.pristine = true;
        self
    }

    pub fn chain<I, S>(mut self, supertypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chain = Some(supertypes.into_iter().map(Into::into).collect());
        self
    }

    pub fn handler(mut self, op: impl Into<Op>, handler: Handler) -> Self {
        self.handlers.push((op.into(), Some(handler)));
        self
    }

    pub fn native<F>(self, op: impl Into<Op>, f: F) -> Self
    where
        F: Fn(&Dispatch<'_>) -> HandlerResult + 'static,
    {
        self.handler(op, Handler::native(f))
    }

    pub fn stub(mut self, op: impl Into<Op>) -> Self {
        self.handlers.push((op.into(), None));
        self
    }

    pub fn on_init<F>(self, f: F) -> Self
    where
        F: Fn(&Dispatch<'_>) -> HandlerResult + 'static,
    {
        self.native(ControlOp::Init.op(), f)
    }

    pub fn on_default<F>(self, f: F) -> Self
    where
        F: Fn(&Dispatch<'_>) -> HandlerResult + 'static,
    {
        self.native(ControlOp::Default.op(), f)
    }

    pub fn moderator<F>(self, f: F) -> Self
    where
        F: Fn(&Dispatch<'_>) -> HandlerResult + 'static,
    {
        self.native(ControlOp::Moderator.op(), f)
    }
}

pub(crate) struct InterfaceRecord {
    pub(crate) name: Rc<str>,
    pub(crate) handlers: RefCell<FastHashMap<Op, HandlerEntry>>,
    /// Direct supertypes in declaration order; set at most once.
    pub(crate) chain: RefCell<Option<Rc<[Rc<str>]>>>,
    pub(crate) flat: OnceCell<Rc<[Rc<str>]>>,
    flags: Cell<InterfaceFlags>,
    pub(crate) instance: RefCell<Option<Receiver>>,
}

impl InterfaceRecord {
    pub(crate) fn new(name: Rc<str>) -> Self {
        Self {
            name,
            handlers: RefCell::new(fast_map_new()),
            chain: RefCell::new(None),
            flat: OnceCell::new(),
            flags: Cell::new(InterfaceFlags {
                pristine: true,
                ..InterfaceFlags::default()
            }),
            instance: RefCell::new(None),
        }
    }

    #[inline]
    pub(crate) fn flags(&self) -> InterfaceFlags {
        self.flags.get()
    }

    pub(crate) fn update_flags(&self, f: impl FnOnce(&mut InterfaceFlags)) {
        let mut flags = self.flags.get();
        f(&mut flags);
        self.flags.set(flags);
    }

    /// The flattened chain can be memoized once this holds.
    pub(crate) fn chain_frozen(&self) -> bool {
        self.chain.borrow().is_some() || self.flags().refd
    }

    pub(crate) fn entry(&self, op: &Op) -> Option<HandlerEntry> {
        self.handlers.borrow().get(op).cloned()
    }
}

/// Handle to a registered interface.
///
/// For private interfaces this handle is the only way to configure or instantiate.
#[derive(Clone)]
pub struct InterfaceHandle {
    pub(crate) record: Rc<InterfaceRecord>,
}

impl InterfaceHandle {
    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn flags(&self) -> InterfaceFlags {
        self.record.flags()
    }
}

impl fmt::Debug for InterfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceHandle")
            .field("name", &self.record.name)
            .field("flags", &self.record.flags())
            .finish()
    }
}
