use std::sync::atomic::{AtomicU32, Ordering};

/// Hands out request sequence numbers: 1, 2, ... u32::MAX, 1, ...
///
/// Zero is never returned. Safe to share between tasks.
#[derive(Debug)]
pub struct SequenceNumberAllocator {
    next: AtomicU32,
}

impl SequenceNumberAllocator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Start from a given value; 0 is treated as 1
    pub fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first.max(1)),
        }
    }

    pub fn next(&self) -> u32 {
        let mut current = self.next.load(Ordering::Relaxed);
        loop {
            let following = if current == u32::MAX { 1 } else { current + 1 };
            match self.next.compare_exchange_weak(
                current,
                following,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return current,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for SequenceNumberAllocator {
    fn default() -> Self {
        Self::new()
    }
}
