use serde::{Deserialize, Serialize};

/// Pooled node slots reserved by an arena unless configured otherwise.
pub const DEFAULT_CAPACITY: u32 = 1024;

/// Arena settings.
///
/// Missing fields fall back to their defaults when deserializing, so an
/// empty table is a valid configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Nodes the pool holds before spilling to the heap.
    pub capacity: u32,
    /// Seed of the priority generator. Equal seeds give equal trees.
    pub seed: u64,
}

impl TreeConfig {
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            seed: 0,
        }
    }
}
