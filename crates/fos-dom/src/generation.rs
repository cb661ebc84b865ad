//! Slot generations
//!
//! Each arena slot carries a generation counter that is bumped whenever the
//! node occupying it is torn down. Ids capture the generation they were
//! issued for, which makes liveness checks O(1).

/// Generation counter - incremented every time a slot is freed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Generation(u32);

impl Generation {
    /// Initial generation (slot never recycled)
    pub const INITIAL: Self = Generation(0);

    /// Create a new generation
    #[inline]
    pub const fn new(value: u32) -> Self {
        Generation(value)
    }

    /// Get the raw value
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Get the next generation
    #[inline]
    pub const fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }

    /// Check if this generation is newer than another
    #[inline]
    pub fn is_newer_than(self, other: Self) -> bool {
        // Handle wraparound
        let diff = self.0.wrapping_sub(other.0);
        diff > 0 && diff < u32::MAX / 2
    }
}

impl Default for Generation {
    fn default() -> Self {
        Self::INITIAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_next() {
        let g = Generation::INITIAL;
        assert_eq!(g.next().value(), 1);
        assert!(g.next().is_newer_than(g));
        assert!(!g.is_newer_than(g.next()));
    }

    #[test]
    fn test_generation_wraparound() {
        let g = Generation::new(u32::MAX);
        let next = g.next();
        assert_eq!(next.value(), 0);
        assert!(next.is_newer_than(g));
    }
}
