//! Runtime errors and the handler unwinding signal.
//!
//! Registry and instantiation calls fail with [`RuntimeError`]. Handler bodies return
//! [`HandlerResult`], whose error side is a [`Signal`]: either a real error or a
//! flow-control signal on its way to the frame that armed it.
//!
//! Every error exposes a stable `RELAY_`-prefixed code:
//!
//! | Error | Code |
//! |-------|------|
//! | [`RuntimeError::InvalidName`] | `RELAY_INVALID_NAME` |
//! | [`RuntimeError::UnknownInterface`] | `RELAY_UNKNOWN_INTERFACE` |
//! | [`RuntimeError::AbstractInterface`] | `RELAY_ABSTRACT_INTERFACE` |
//! | [`RuntimeError::PrivateInterface`] | `RELAY_PRIVATE_INTERFACE` |
//! | [`RuntimeError::NotPristine`] | `RELAY_NOT_PRISTINE` |
//! | [`RuntimeError::Locked`] | `RELAY_LOCKED` |
//! | [`RuntimeError::UnknownSupertype`] | `RELAY_UNKNOWN_SUPERTYPE` |
//! | [`RuntimeError::ExtendsFinal`] | `RELAY_EXTENDS_FINAL` |
//! | [`RuntimeError::SelfChain`] | `RELAY_SELF_CHAIN` |
//! | [`RuntimeError::ChainFrozen`] | `RELAY_CHAIN_FROZEN` |
//! | [`RuntimeError::MissingOperation`] | `RELAY_MISSING_OPERATION` |
//! | [`RuntimeError::NoHandler`] | `RELAY_NO_HANDLER` |
//! | [`RuntimeError::InvalidRedispatch`] | `RELAY_INVALID_REDISPATCH` |
//! | [`RuntimeError::BatonBusy`] | `RELAY_BATON_BUSY` |
//! | [`RuntimeError::Failed`] | `RELAY_FAILED` |

use thiserror::Error;

use crate::core::value::Value;
use crate::flow::FlowSignal;

pub type HandlerResult = Result<Value, Signal>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("invalid interface name `{0}`")]
    InvalidName(String),

    #[error("unknown interface `{0}`")]
    UnknownInterface(String),

    #[error("interface `{0}` is abstract and cannot be instantiated")]
    AbstractInterface(String),

    /// The interface can only be reached through the handle its creator holds.
    #[error("interface `{0}` is private")]
    PrivateInterface(String),

    #[error("interface `{0}` has already been configured")]
    NotPristine(String),

    #[error("interface `{0}` is locked")]
    Locked(String),

    #[error("interface `{name}` cannot chain to unknown interface `{supertype}`")]
    UnknownSupertype { name: String, supertype: String },

    #[error("interface `{name}` cannot extend final interface `{supertype}`")]
    ExtendsFinal { name: String, supertype: String },

    #[error("interface `{0}` cannot chain to itself")]
    SelfChain(String),

    /// The chain was already set, or the interface is already referenced.
    #[error("chain of interface `{0}` can no longer be changed")]
    ChainFrozen(String),

    #[error("message to `{0}` has no operation")]
    MissingOperation(String),

    #[error("no handler for `{op}` on interface `{ty}`")]
    NoHandler { ty: String, op: String },

    #[error("cannot redispatch `{op}` from `{from}` to `{target}`")]
    InvalidRedispatch {
        from: String,
        target: String,
        op: String,
    },

    #[error("an attributed message to `{0}` is still pending")]
    BatonBusy(String),

    /// Raised by a handler body.
    #[error("{0}")]
    Failed(String),
}

impl RuntimeError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidName(_) => "RELAY_INVALID_NAME",
            Self::UnknownInterface(_) => "RELAY_UNKNOWN_INTERFACE",
            Self::AbstractInterface(_) => "RELAY_ABSTRACT_INTERFACE",
            Self::PrivateInterface(_) => "RELAY_PRIVATE_INTERFACE",
            Self::NotPristine(_) => "RELAY_NOT_PRISTINE",
            Self::Locked(_) => "RELAY_LOCKED",
            Self::UnknownSupertype { .. } => "RELAY_UNKNOWN_SUPERTYPE",
            Self::ExtendsFinal { .. } => "RELAY_EXTENDS_FINAL",
            Self::SelfChain(_) => "RELAY_SELF_CHAIN",
            Self::ChainFrozen(_) => "RELAY_CHAIN_FROZEN",
            Self::MissingOperation(_) => "RELAY_MISSING_OPERATION",
            Self::NoHandler { .. } => "RELAY_NO_HANDLER",
            Self::InvalidRedispatch { .. } => "RELAY_INVALID_REDISPATCH",
            Self::BatonBusy(_) => "RELAY_BATON_BUSY",
            Self::Failed(_) => "RELAY_FAILED",
        }
    }
}

#[derive(Debug, Error)]
pub enum Signal {
    #[error(transparent)]
    Error(#[from] RuntimeError),

    /// A flow-control signal that no armed frame caught.
    #[error("uncaught flow-control signal `{}`", .0.tag())]
    Flow(FlowSignal),
}

impl Signal {
    pub fn failed(message: impl Into<String>) -> Self {
        Signal::Error(RuntimeError::Failed(message.into()))
    }

    pub fn is_flow(&self) -> bool {
        matches!(self, Signal::Flow(_))
    }

    pub fn as_error(&self) -> Option<&RuntimeError> {
        match self {
            Signal::Error(e) => Some(e),
            Signal::Flow(_) => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Signal::Error(e) => e.code(),
            Signal::Flow(_) => "RELAY_UNCAUGHT_FLOW",
        }
    }
}
