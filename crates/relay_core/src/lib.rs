//! Core types for the Relay runtime.
//!
//! This crate contains the building blocks that are independent of the dispatch engine:
//! - `SieveCache` - bounded key/value cache with SIEVE eviction and pinning
//! - `Symbol` - out-of-band operation names that never collide with strings
//! - `FastHashMap` - hashbrown map with a fixed-seed ahash hasher

pub mod hash;
pub mod sieve;
pub mod symbol;

pub use hash::{FastHashMap, FastHashSet, fast_hasher, fast_map_new, fast_set_new};
pub use sieve::SieveCache;
pub use symbol::Symbol;
