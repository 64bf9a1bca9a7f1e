//! # Slot Arena
//!
//! An owned, growable byte buffer split into fixed-size slots.
//!
//! The buffer is backed by `u64` words so every slot offset is aligned to
//! [`MAX_SLOT_ALIGN`] as long as the slot size is a multiple of the stored
//! type's alignment (always true for Rust types).

/// Largest alignment a slot type may require.
pub const MAX_SLOT_ALIGN: usize = std::mem::align_of::<u64>();

/// A contiguous array of equally sized byte slots.
///
/// Callers address slots by index only. Growing the arena reallocates the
/// backing words, so borrows of slot bytes never survive a `grow`.
///
/// # Example
///
/// ```rust,ignore
/// let template = 7u32.to_ne_bytes();
/// let mut arena = SlotArena::new(4, 2, &template);
/// arena.grow(4, &template);
/// assert_eq!(arena.slot(3), Some(&template[..]));
/// ```
#[derive(Clone, Debug)]
pub struct SlotArena {
    /// Backing storage.
    words: Vec<u64>,
    /// Bytes per slot.
    slot_size: usize,
    /// Number of slots.
    capacity: u32,
}

impl SlotArena {
    /// Creates an arena of `capacity` slots, each a copy of `fill`.
    ///
    /// # Panics
    ///
    /// Panics if `fill` is not exactly `slot_size` bytes or `slot_size` is zero.
    #[must_use]
    pub fn new(slot_size: usize, capacity: u32, fill: &[u8]) -> Self {
        assert!(slot_size > 0, "Slot size must be greater than zero");
        assert_eq!(fill.len(), slot_size, "Fill bytes must match the slot size");

        let mut arena = Self {
            words: vec![0u64; Self::words_for(slot_size, capacity)],
            slot_size,
            capacity,
        };
        arena.fill_range(0, capacity, fill);
        arena
    }

    fn words_for(slot_size: usize, capacity: u32) -> usize {
        (slot_size * capacity as usize).div_ceil(std::mem::size_of::<u64>())
    }

    /// Bytes per slot.
    #[inline]
    #[must_use]
    pub const fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Length of the slot region in bytes.
    #[inline]
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.slot_size * self.capacity as usize
    }

    /// All slot bytes.
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.byte_len()]
    }

    /// All slot bytes, mutably.
    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        let len = self.byte_len();
        &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[..len]
    }

    /// Bytes of one slot. `None` if `index >= capacity`.
    #[inline]
    #[must_use]
    pub fn slot(&self, index: u32) -> Option<&[u8]> {
        if index >= self.capacity {
            return None;
        }
        let start = index as usize * self.slot_size;
        Some(&self.bytes()[start..start + self.slot_size])
    }

    /// Bytes of one slot, mutably. `None` if `index >= capacity`.
    #[inline]
    pub fn slot_mut(&mut self, index: u32) -> Option<&mut [u8]> {
        if index >= self.capacity {
            return None;
        }
        let start = index as usize * self.slot_size;
        let size = self.slot_size;
        Some(&mut self.bytes_mut()[start..start + size])
    }

    /// Overwrites one slot with `src`.
    ///
    /// Returns `false` if the index is out of range.
    pub fn write_slot(&mut self, index: u32, src: &[u8]) -> bool {
        debug_assert_eq!(src.len(), self.slot_size);
        match self.slot_mut(index) {
            Some(slot) => {
                slot.copy_from_slice(src);
                true
            }
            None => false,
        }
    }

    /// Grows to `new_capacity` slots.
    ///
    /// Existing bytes are copied verbatim into a fresh buffer, the added slots
    /// are filled with `fill`, and the old buffer is dropped. Requests that do
    /// not increase the capacity are ignored.
    pub fn grow(&mut self, new_capacity: u32, fill: &[u8]) {
        if new_capacity <= self.capacity {
            return;
        }
        let old_capacity = self.capacity;
        let old_len = self.byte_len();

        let mut words = vec![0u64; Self::words_for(self.slot_size, new_capacity)];
        bytemuck::cast_slice_mut::<u64, u8>(&mut words)[..old_len].copy_from_slice(self.bytes());

        self.words = words;
        self.capacity = new_capacity;
        self.fill_range(old_capacity, new_capacity, fill);
    }

    fn fill_range(&mut self, from: u32, to: u32, fill: &[u8]) {
        let size = self.slot_size;
        let bytes = self.bytes_mut();
        for index in from..to {
            let start = index as usize * size;
            bytes[start..start + size].copy_from_slice(fill);
        }
    }
}
