//! Content hashing for reflection-derived layouts

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Fixed-width hash built by pushing the hashes of heterogeneous values.
///
/// Two hashes are equal when the same values were pushed in the same order, which makes it
/// usable as a compatibility key for layouts that are built from equal content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ContentHash(u64);

impl ContentHash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Combine the hash of `value` into this one.
    pub fn push<T: Hash + ?Sized>(&mut self, value: &T) -> &mut Self {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        let h = hasher.finish();
        self.0 ^= h
            .wrapping_add(0x9e37_79b9_7f4a_7c15)
            .wrapping_add(self.0 << 6)
            .wrapping_add(self.0 >> 2);
        self
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
