//! Runtime configuration options.

#[derive(Clone, Copy, Debug)]
pub struct RuntimeConfig {
    /// Capacity of the handler-resolution cache. Pinned entries do not count.
    pub cache_capacity: usize,
    /// Start in the bootstrap phase, where `@`-prefixed interface names are accepted.
    pub bootstrap: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 1024,
            bootstrap: true,
        }
    }
}
