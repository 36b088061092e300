//! Value representation shared by handlers and the engine.

pub mod params;
pub mod value;

pub use params::{Key, ParamList, Storage};
pub use value::{Block, Op, Value};
