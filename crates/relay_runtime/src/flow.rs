//! Non-local exits that carry a value.
//!
//! A handler leaves early by returning `Err(Signal::Flow(..))`. The signal names the
//! frame it targets; only that frame, and only if it armed itself beforehand, turns the
//! signal back into a value. Everything else lets it pass through unchanged.

use std::fmt;

use crate::core::value::Value;
use crate::errors::Signal;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameId(pub(crate) u64);

impl FrameId {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowTag {
    Return,
    /// Continue with the next iteration of a loop-style handler.
    Next,
    /// Leave a loop-style handler.
    Stop,
}

static FLOW_TAGS: phf::Map<&'static str, FlowTag> = phf::phf_map! {
    "return" => FlowTag::Return,
    "next" => FlowTag::Next,
    "stop" => FlowTag::Stop,
};

impl FlowTag {
    pub fn from_name(name: &str) -> Option<Self> {
        FLOW_TAGS.get(name).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            FlowTag::Return => "return",
            FlowTag::Next => "next",
            FlowTag::Stop => "stop",
        }
    }
}

impl fmt::Display for FlowTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug)]
pub struct FlowSignal {
    tag: FlowTag,
    payload: Value,
    target: Option<FrameId>,
}

impl FlowSignal {
    pub(crate) fn targeted(tag: FlowTag, payload: Value, target: FrameId) -> Self {
        Self {
            tag,
            payload,
            target: Some(target),
        }
    }

    /// A signal with no target. No frame will ever catch it.
    pub fn unarmed(tag: FlowTag, payload: impl Into<Value>) -> Self {
        Self {
            tag,
            payload: payload.into(),
            target: None,
        }
    }

    pub fn tag(&self) -> FlowTag {
        self.tag
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn target(&self) -> Option<FrameId> {
        self.target
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }
}

impl From<FlowSignal> for Signal {
    fn from(f: FlowSignal) -> Self {
        Signal::Flow(f)
    }
}

/// Handle to an armed frame, obtained from [`crate::Dispatch::return_target`].
///
/// It is `Copy` so blocks can carry it into nested dispatches; a signal built from it
/// passes through every frame in between and lands on the one that armed it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlowTarget {
    frame: FrameId,
}

impl FlowTarget {
    pub(crate) fn new(frame: FrameId) -> Self {
        Self { frame }
    }

    pub fn frame(self) -> FrameId {
        self.frame
    }

    pub fn signal(self, tag: FlowTag, payload: impl Into<Value>) -> Signal {
        Signal::Flow(FlowSignal::targeted(tag, payload.into(), self.frame))
    }

    pub fn ret(self, payload: impl Into<Value>) -> Signal {
        self.signal(FlowTag::Return, payload)
    }
}

/// Outcome of [`crate::Dispatch::intercept`].
#[derive(Debug, PartialEq)]
pub enum Landing {
    /// The body finished normally.
    Completed(Value),
    /// The body raised the intercepted tag at this frame.
    Caught(Value),
}
