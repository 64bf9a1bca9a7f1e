//! # ID Bank
//!
//! Recycling allocator for small integer IDs. Used for both component slot
//! indices and entity IDs.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Hands out `u32` IDs and takes them back for reuse.
///
/// Fresh IDs are issued densely from zero. Released IDs are reissued lowest
/// first, which keeps live IDs packed towards the front as much as the
/// allocation history allows.
///
/// # Example
///
/// ```rust,ignore
/// let mut ids = IdBank::new();
/// let a = ids.acquire(); // 0
/// let b = ids.acquire(); // 1
/// ids.release(a);
/// assert_eq!(ids.acquire(), a); // recycled
/// ```
#[derive(Clone, Debug, Default)]
pub struct IdBank {
    /// Liveness flag per ID ever issued.
    active: Vec<bool>,
    /// Released IDs, smallest on top.
    free: BinaryHeap<Reverse<u32>>,
    /// Number of currently active IDs.
    active_count: u32,
}

impl IdBank {
    /// Creates an empty bank.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty bank with room for `capacity` IDs before reallocating.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            active: Vec::with_capacity(capacity),
            free: BinaryHeap::new(),
            active_count: 0,
        }
    }

    /// Issues an ID: the lowest released one, or the next fresh one.
    ///
    /// A fresh ID always equals the previous [`total_count`](Self::total_count).
    pub fn acquire(&mut self) -> u32 {
        let id = match self.free.pop() {
            Some(Reverse(id)) => id,
            None => {
                let id = self.total_count();
                self.active.push(false);
                id
            }
        };
        self.active[id as usize] = true;
        self.active_count += 1;
        id
    }

    /// Returns an ID to the bank.
    ///
    /// Returns `false` and does nothing if the ID is not active.
    pub fn release(&mut self, id: u32) -> bool {
        match self.active.get_mut(id as usize) {
            Some(flag) if *flag => {
                *flag = false;
                self.free.push(Reverse(id));
                self.active_count -= 1;
                true
            }
            _ => false,
        }
    }

    /// Checks if an ID is currently issued.
    #[inline]
    #[must_use]
    pub fn is_active(&self, id: u32) -> bool {
        self.active.get(id as usize).copied().unwrap_or(false)
    }

    /// Number of distinct IDs ever issued (the high-water mark).
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn total_count(&self) -> u32 {
        self.active.len() as u32
    }

    /// Number of currently issued IDs.
    #[inline]
    #[must_use]
    pub const fn active_count(&self) -> u32 {
        self.active_count
    }

    /// Liveness flags for `[0, total_count)`.
    #[inline]
    #[must_use]
    pub fn liveness(&self) -> &[bool] {
        &self.active
    }

    /// Iterates active IDs in ascending order.
    pub fn iter_active(&self) -> impl Iterator<Item = u32> + '_ {
        self.active
            .iter()
            .enumerate()
            .filter(|(_, live)| **live)
            .map(|(id, _)| id as u32)
    }
}
