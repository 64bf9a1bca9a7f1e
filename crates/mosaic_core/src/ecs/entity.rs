//! # Entity Management
//!
//! Entities are plain 32-bit identifiers. All per-entity bookkeeping lives in
//! an [`EntityRecord`] owned by the entity registry.

use std::fmt;

use super::mask::ComponentMask;

/// Unique identifier for a live entity.
///
/// IDs are recycled after an entity is destroyed, so an ID is only meaningful
/// while the entity it was issued for is alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates an entity ID from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the raw value as an index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bookkeeping for one live entity.
///
/// `slots[i]` is the pool slot of the i-th most significant type in `mask`,
/// so `slots.len() == mask.count()` at all times.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityRecord {
    /// The entity this record belongs to.
    pub(crate) id: EntityId,
    /// Attached component types.
    pub(crate) mask: ComponentMask,
    /// Pool slot per attached type, highest type bit first.
    pub(crate) slots: Vec<u32>,
}

impl EntityRecord {
    /// Creates a record with no components.
    #[inline]
    #[must_use]
    pub const fn new(id: EntityId) -> Self {
        Self {
            id,
            mask: ComponentMask::EMPTY,
            slots: Vec::new(),
        }
    }

    /// The entity's ID.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Attached component types.
    #[inline]
    #[must_use]
    pub const fn mask(&self) -> ComponentMask {
        self.mask
    }

    /// Slot indices, highest type bit first.
    #[inline]
    #[must_use]
    pub fn slots(&self) -> &[u32] {
        &self.slots
    }

    /// Checks if the entity has every type in `mask`.
    #[inline]
    #[must_use]
    pub const fn has(&self, mask: ComponentMask) -> bool {
        self.mask.contains(mask)
    }

    /// Slot of a single attached type.
    #[inline]
    #[must_use]
    pub fn slot_of(&self, single: ComponentMask) -> Option<u32> {
        if !single.is_single() || !self.mask.contains(single) {
            return None;
        }
        self.slots.get(self.mask.rank_of(single)).copied()
    }

    /// Records a newly allocated slot for `single`.
    pub(crate) fn insert(&mut self, single: ComponentMask, slot: u32) {
        debug_assert!(single.is_single() && !self.mask.contains(single));
        let rank = self.mask.rank_of(single);
        self.slots.insert(rank, slot);
        self.mask |= single;
    }

    /// Forgets the slot of `single`, returning it.
    pub(crate) fn remove(&mut self, single: ComponentMask) -> Option<u32> {
        let rank = self.mask.rank_of(single);
        if !single.is_single() || !self.mask.contains(single) {
            return None;
        }
        self.mask &= !single;
        Some(self.slots.remove(rank))
    }

    /// Checks that the slot list and mask agree in length.
    #[inline]
    #[must_use]
    pub fn is_coherent(&self) -> bool {
        self.slots.len() == self.mask.count() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bit(n: u32) -> ComponentMask {
        ComponentMask::single(n).unwrap()
    }

    #[test]
    fn test_entity_id_roundtrip() {
        let id = EntityId::new(12345);
        assert_eq!(id.raw(), 12345);
        assert_eq!(id.index(), 12345);
        assert_eq!(id.to_string(), "12345");
    }

    #[test]
    fn test_record_keeps_descending_order() {
        let mut record = EntityRecord::new(EntityId::new(0));
        record.insert(bit(3), 30);
        record.insert(bit(10), 100);
        record.insert(bit(0), 0);
        record.insert(bit(5), 50);

        assert_eq!(record.slots(), &[100, 50, 30, 0]);
        assert!(record.is_coherent());
        assert_eq!(record.slot_of(bit(5)), Some(50));
        assert_eq!(record.slot_of(bit(4)), None);
    }

    #[test]
    fn test_record_remove() {
        let mut record = EntityRecord::new(EntityId::new(1));
        record.insert(bit(1), 11);
        record.insert(bit(2), 22);

        assert_eq!(record.remove(bit(2)), Some(22));
        assert_eq!(record.remove(bit(2)), None);
        assert_eq!(record.mask(), bit(1));
        assert_eq!(record.slots(), &[11]);
        assert!(record.is_coherent());
        assert!(record.has(bit(1)));
    }
}
