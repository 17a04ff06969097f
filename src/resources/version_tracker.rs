/// Monotonic change counter.
///
/// Texture allocations bump it on every atlas commit and the shape
/// compositor bumps it on every compile, so callers can tell whether a
/// rebuild actually produced new output by comparing versions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeTracker {
    version: u64,
}

impl ChangeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self { version: 0 }
    }

    /// Marks as modified, increments version by 1
    pub fn changed(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Gets the current version number
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// True if anything changed after `seen` was read from [`Self::version`].
    #[must_use]
    pub fn changed_since(&self, seen: u64) -> bool {
        self.version != seen
    }
}
