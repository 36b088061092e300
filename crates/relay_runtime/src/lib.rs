//! Relay message-dispatch runtime.
//!
//! Every value is a receiver that only answers messages: an operation plus a
//! parameter list. Host code registers interfaces (handler tables composed through
//! chains), instantiates objects against them, and sends messages that the
//! dispatch engine routes to the right handler.

#![allow(clippy::new_without_default)]
#![allow(clippy::type_complexity)]

pub mod core;
pub mod errors;
pub mod flow;

mod baton;
mod config;
mod dispatch;
mod instance;
mod interface;
mod introspect;
mod object;
mod registry;
mod runtime;

pub use crate::core::params::{Key, ParamList, Storage, new_storage};
pub use crate::core::value::{Block, Op, Value};
pub use relay_core::Symbol;

pub use baton::Envelope;
pub use config::RuntimeConfig;
pub use dispatch::{Dispatch, HandlerRef, Redispatch, Resolution};
pub use errors::{HandlerResult, RuntimeError, Signal};
pub use flow::{FlowSignal, FlowTag, FlowTarget, FrameId, Landing};
pub use interface::{
    CacheHint, CompiledBody, ControlOp, Handler, InterfaceConfig, InterfaceFlags, InterfaceHandle,
};
pub use introspect::{HandlerSummary, InterfaceSummary};
pub use object::Receiver;
pub use runtime::Runtime;
