//! Runtime values and operation names.

use std::fmt;
use std::rc::Rc;

use relay_core::Symbol;

use super::params::ParamList;
use crate::errors::HandlerResult;
use crate::object::Receiver;
use crate::runtime::Runtime;

/// Operation name: a plain string or an out-of-band symbol.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Op {
    Name(Rc<str>),
    Sym(Symbol),
}

impl Op {
    pub fn name(s: &str) -> Self {
        Op::Name(Rc::from(s))
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Op::Name(n) => Some(n),
            Op::Sym(_) => None,
        }
    }

    /// Converts a message value into an operation, if it names one.
    pub fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Str(s) => Some(Op::Name(s.clone())),
            Value::Sym(s) => Some(Op::Sym(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Op::Name(n) => Value::Str(n.clone()),
            Op::Sym(s) => Value::Sym(s.clone()),
        }
    }
}

impl From<&str> for Op {
    fn from(s: &str) -> Self {
        Op::name(s)
    }
}

impl From<String> for Op {
    fn from(s: String) -> Self {
        Op::Name(Rc::from(s))
    }
}

impl From<Symbol> for Op {
    fn from(s: Symbol) -> Self {
        Op::Sym(s)
    }
}

impl From<&Op> for Op {
    fn from(op: &Op) -> Self {
        op.clone()
    }
}

impl fmt::Debug for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Name(n) => write!(f, "{n:?}"),
            Op::Sym(s) => write!(f, "{s:?}"),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Name(n) => f.write_str(n),
            Op::Sym(s) => write!(f, "{s}"),
        }
    }
}

/// Host code evaluated on demand, e.g. a message's `else` fallback.
#[derive(Clone)]
pub struct Block(Rc<dyn Fn(&Runtime) -> HandlerResult>);

impl Block {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Runtime) -> HandlerResult + 'static,
    {
        Block(Rc::new(f))
    }

    pub fn run(&self, rt: &Runtime) -> HandlerResult {
        (self.0)(rt)
    }

    pub fn ptr_eq(&self, other: &Block) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Sym(Symbol),
    List(Rc<ParamList>),
    Object(Receiver),
    Block(Block),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn list(list: ParamList) -> Self {
        Value::List(Rc::new(list))
    }

    /// Only `Unit` and `false` are falsy.
    #[inline]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Unit | Value::Bool(false))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Receiver> {
        match self {
            Value::Object(r) => Some(r),
            _ => None,
        }
    }

    /// Runs a `Block`; any other value evaluates to itself.
    pub fn evaluate(&self, rt: &Runtime) -> HandlerResult {
        match self {
            Value::Block(b) => b.run(rt),
            other => Ok(other.clone()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Sym(a), Value::Sym(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Block(a), Value::Block(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(l) => write!(f, "{l:?}"),
            Value::Object(r) => write!(f, "{r:?}"),
            Value::Sym(s) => write!(f, "{s:?}"),
            other => write!(f, "{other}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => f.write_str("@u"),
            Value::Bool(true) => f.write_str("@t"),
            Value::Bool(false) => f.write_str("@f"),
            Value::Int(i) => {
                let mut buf = itoa::Buffer::new();
                f.write_str(buf.format(*i))
            }
            Value::Float(x) => {
                if x.is_finite() {
                    let mut buf = ryu::Buffer::new();
                    f.write_str(buf.format_finite(*x))
                } else {
                    write!(f, "{x}")
                }
            }
            Value::Str(s) => f.write_str(s),
            Value::Sym(s) => write!(f, "{s}"),
            Value::List(l) => write!(f, "{l}"),
            Value::Object(r) => write!(f, "{r:?}"),
            Value::Block(_) => f.write_str("<block>"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<Symbol> for Value {
    fn from(s: Symbol) -> Self {
        Value::Sym(s)
    }
}

impl From<ParamList> for Value {
    fn from(l: ParamList) -> Self {
        Value::list(l)
    }
}

impl From<Receiver> for Value {
    fn from(r: Receiver) -> Self {
        Value::Object(r)
    }
}

impl From<&Receiver> for Value {
    fn from(r: &Receiver) -> Self {
        Value::Object(r.clone())
    }
}

impl From<Block> for Value {
    fn from(b: Block) -> Self {
        Value::Block(b)
    }
}
