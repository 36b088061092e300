//! Sender attribution through a single-use side channel.
//!
//! An attributed send parks `{sender, receiver, op, params}` in the baton slot and then
//! invokes the receiver with no arguments. The receiver named in the baton takes it;
//! any other receiver leaves it alone. The slot is cleared when the send returns, on
//! every exit path.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::core::params::ParamList;
use crate::core::value::{Op, Value};
use crate::errors::RuntimeError;
use crate::object::Receiver;

pub(crate) struct Baton {
    pub(crate) sender: Option<Receiver>,
    pub(crate) sender_type: Option<Rc<str>>,
    pub(crate) receiver: Receiver,
    pub(crate) op: Op,
    pub(crate) params: ParamList,
}

pub(crate) struct BatonSlot {
    slot: RefCell<Option<Baton>>,
}

impl BatonSlot {
    pub(crate) fn new() -> Self {
        Self {
            slot: RefCell::new(None),
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Parks `baton` until the returned guard is dropped.
    pub(crate) fn hand_off(&self, baton: Baton) -> Result<BatonGuard<'_>, RuntimeError> {
        let mut slot = self.slot.borrow_mut();
        if let Some(pending) = slot.as_ref() {
            return Err(RuntimeError::BatonBusy(pending.receiver.type_name().to_string()));
        }
        *slot = Some(baton);
        Ok(BatonGuard { slot: self })
    }

    /// Takes the baton if it names `receiver`.
    pub(crate) fn take_for(&self, receiver: &Receiver) -> Option<Baton> {
        let mut slot = self.slot.borrow_mut();
        if slot.as_ref().is_some_and(|b| b.receiver.ptr_eq(receiver)) {
            trace!(receiver = ?receiver, "baton taken");
            return slot.take();
        }
        None
    }

    fn clear(&self) {
        self.slot.borrow_mut().take();
    }
}

pub(crate) struct BatonGuard<'a> {
    slot: &'a BatonSlot,
}

impl Drop for BatonGuard<'_> {
    fn drop(&mut self) {
        self.slot.clear();
    }
}

/// A message in canonical form, ready for dispatch.
#[derive(Debug)]
pub struct Envelope {
    pub sender: Option<Receiver>,
    pub sender_type: Option<Rc<str>>,
    pub receiver: Receiver,
    pub op: Op,
    pub params: ParamList,
    /// Returned (a `Block` is run first) when no handler is found.
    pub fallback: Option<Value>,
}

impl Envelope {
    pub fn new(receiver: Receiver, op: Op, params: ParamList) -> Self {
        Self {
            sender: None,
            sender_type: None,
            receiver,
            op,
            params,
            fallback: None,
        }
    }

    pub(crate) fn from_baton(baton: Baton) -> Self {
        Self {
            sender: baton.sender,
            sender_type: baton.sender_type,
            receiver: baton.receiver,
            op: baton.op,
            params: baton.params,
            fallback: None,
        }
    }
}

fn into_params(value: Option<&Value>) -> ParamList {
    match value {
        None => ParamList::new(),
        Some(Value::List(l)) => (**l).clone(),
        Some(other) => ParamList::positional([other.clone()]),
    }
}

/// Turns a direct receiver invocation into an envelope.
///
/// With an operation the params are taken as-is. Without one, a list parameter is read
/// as a list-operation message (`op` or position 0, `params` or position 1, optional
/// `else`), and no parameters at all means the baton is consulted.
pub(crate) fn canonicalize(
    slot: &BatonSlot,
    direct_op: Option<Op>,
    direct_params: Option<Value>,
    receiver: &Receiver,
) -> Result<Envelope, RuntimeError> {
    let missing = || RuntimeError::MissingOperation(receiver.type_name().to_string());
    match (direct_op, direct_params) {
        (Some(op), params) => Ok(Envelope::new(
            receiver.clone(),
            op,
            into_params(params.as_ref()),
        )),
        (None, Some(Value::List(list))) => {
            let op = list
                .get_either("op", 0)
                .and_then(Op::from_value)
                .ok_or_else(missing)?;
            let mut env = Envelope::new(
                receiver.clone(),
                op,
                into_params(list.get_either("params", 1)),
            );
            env.fallback = list.get("else").cloned();
            Ok(env)
        }
        (None, Some(_)) => Err(missing()),
        (None, None) => slot
            .take_for(receiver)
            .map(Envelope::from_baton)
            .ok_or_else(missing),
    }
}
