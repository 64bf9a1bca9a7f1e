//! # Component Pool
//!
//! Type-erased storage for one component type.
//!
//! The pool is a dense array of fixed-size byte slots plus an ID bank that
//! recycles slot indices:
//! - Every slot always holds a complete instance, live or template
//! - Slot indices stay valid until returned, including across growth
//! - Capacity only grows

use bytemuck::Pod;

use super::component::{ComponentDescriptor, SlotHooks};
use super::entity::EntityId;
use super::mask::ComponentMask;
use crate::config::GrowthPolicy;
use crate::error::{EcsError, EcsResult};
use crate::memory::{IdBank, SlotArena, MAX_SLOT_ALIGN};

/// Storage for all instances of one component type.
///
/// Slots in `[0, total_count)` have been handed out at least once; the ones
/// that were returned hold a copy of the template again. Bulk readers must
/// check [`is_active`](Self::is_active) (or use
/// [`ComponentBuffer::iter_active`]) to skip them.
///
/// # Example
///
/// ```rust,ignore
/// let desc = ComponentDescriptor::of(Health::default(), 2, "Health");
/// let mut pool = ComponentPool::new(desc, mask, GrowthPolicy::Double)?;
///
/// let slot = pool.allocate(entity);
/// pool.get_as_mut::<Health>(slot)?.current = 10;
/// pool.return_slot(slot)?;
/// ```
#[derive(Debug)]
pub struct ComponentPool {
    /// Registered name.
    name: String,
    /// Type bit this pool serves.
    mask: ComponentMask,
    /// Prototype bytes copied into free slots.
    template: Box<[u8]>,
    /// Lifecycle callbacks.
    hooks: SlotHooks,
    /// Capacity step used when the arena is full.
    growth: GrowthPolicy,
    /// Slot bytes.
    arena: SlotArena,
    /// Slot index allocator.
    ids: IdBank,
    /// Owner hint per slot in `[0, total_count)`; `None` when free.
    owners: Vec<Option<EntityId>>,
}

impl ComponentPool {
    /// Creates a pool with `descriptor.initial_capacity` template-filled slots.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnsupportedLayout`] if the descriptor fails validation.
    pub fn new(
        descriptor: ComponentDescriptor,
        mask: ComponentMask,
        growth: GrowthPolicy,
    ) -> EcsResult<Self> {
        descriptor.validate()?;
        let ComponentDescriptor {
            name,
            template,
            initial_capacity,
            hooks,
            ..
        } = descriptor;

        let arena = SlotArena::new(template.len(), initial_capacity, &template);
        Ok(Self {
            name,
            mask,
            template: template.into_boxed_slice(),
            hooks,
            growth,
            arena,
            ids: IdBank::with_capacity(initial_capacity as usize),
            owners: Vec::with_capacity(initial_capacity as usize),
        })
    }

    /// Registered name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type bit.
    #[inline]
    #[must_use]
    pub const fn mask(&self) -> ComponentMask {
        self.mask
    }

    /// Bytes per slot.
    #[inline]
    #[must_use]
    pub const fn slot_size(&self) -> usize {
        self.arena.slot_size()
    }

    /// Number of slots the buffer can hold before growing.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.arena.capacity()
    }

    /// Number of slots ever handed out (the high-water mark).
    #[inline]
    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.ids.total_count()
    }

    /// Number of slots currently handed out.
    #[inline]
    #[must_use]
    pub const fn active_count(&self) -> u32 {
        self.ids.active_count()
    }

    /// Checks if a slot is currently handed out.
    #[inline]
    #[must_use]
    pub fn is_active(&self, slot: u32) -> bool {
        self.ids.is_active(slot)
    }

    /// Owner hint recorded when an active slot was allocated.
    #[inline]
    #[must_use]
    pub fn owner(&self, slot: u32) -> Option<EntityId> {
        self.owners.get(slot as usize).copied().flatten()
    }

    /// The template bytes.
    #[inline]
    #[must_use]
    pub fn template(&self) -> &[u8] {
        &self.template
    }

    /// Active slot indices in ascending order.
    pub fn active_slots(&self) -> impl Iterator<Item = u32> + '_ {
        self.ids.iter_active()
    }

    /// Hands out a slot for `owner` and runs the initialize hook on it.
    ///
    /// Grows the buffer per the growth policy when every slot is taken.
    /// Never fails.
    pub fn allocate(&mut self, owner: EntityId) -> u32 {
        let slot = self.ids.acquire();
        while slot >= self.capacity() {
            self.resize(None);
        }

        if slot as usize == self.owners.len() {
            self.owners.push(Some(owner));
        } else {
            self.owners[slot as usize] = Some(owner);
        }

        let initialize = self.hooks.initialize;
        if let Some(bytes) = self.arena.slot_mut(slot) {
            initialize(bytes);
        }

        tracing::trace!(component = %self.name, slot, entity = %owner, "allocated slot");
        slot
    }

    /// Runs the destroy hook on a slot, resets it to the template and
    /// recycles its index.
    ///
    /// # Errors
    ///
    /// [`EcsError::InactiveSlot`] if the slot is not handed out; nothing is
    /// changed in that case.
    pub fn return_slot(&mut self, slot: u32) -> EcsResult<()> {
        if !self.ids.is_active(slot) {
            tracing::warn!(component = %self.name, slot, "attempted to return an inactive slot");
            return Err(EcsError::InactiveSlot {
                component: self.name.clone(),
                slot,
            });
        }

        let destroy = self.hooks.destroy;
        if let Some(bytes) = self.arena.slot_mut(slot) {
            destroy(bytes);
        }
        self.arena.write_slot(slot, &self.template);
        self.owners[slot as usize] = None;
        self.ids.release(slot);

        tracing::trace!(component = %self.name, slot, "returned slot");
        Ok(())
    }

    /// Bytes of one slot.
    ///
    /// Reading a slot that is within capacity but not active is allowed and
    /// yields template bytes; it is logged in debug builds.
    ///
    /// # Errors
    ///
    /// [`EcsError::SlotOutOfRange`] if `slot >= capacity`.
    pub fn get(&self, slot: u32) -> EcsResult<&[u8]> {
        self.warn_if_inactive(slot);
        self.arena.slot(slot).ok_or_else(|| self.out_of_range(slot))
    }

    /// Bytes of one slot, mutably. Same rules as [`get`](Self::get).
    ///
    /// # Errors
    ///
    /// [`EcsError::SlotOutOfRange`] if `slot >= capacity`.
    pub fn get_mut(&mut self, slot: u32) -> EcsResult<&mut [u8]> {
        self.warn_if_inactive(slot);
        let capacity = self.capacity();
        match self.arena.slot_mut(slot) {
            Some(bytes) => Ok(bytes),
            None => Err(EcsError::SlotOutOfRange {
                component: self.name.clone(),
                slot,
                capacity,
            }),
        }
    }

    /// Typed view of one slot.
    ///
    /// # Errors
    ///
    /// As [`get`](Self::get), plus [`EcsError::TypeMismatch`] if `T` does not
    /// fit the slot layout.
    pub fn get_as<T: Pod>(&self, slot: u32) -> EcsResult<&T> {
        self.check_type::<T>()?;
        let bytes = self.get(slot)?;
        bytemuck::try_from_bytes(bytes).map_err(|_| self.type_mismatch::<T>())
    }

    /// Typed mutable view of one slot.
    ///
    /// # Errors
    ///
    /// As [`get_as`](Self::get_as).
    pub fn get_as_mut<T: Pod>(&mut self, slot: u32) -> EcsResult<&mut T> {
        self.check_type::<T>()?;
        self.warn_if_inactive(slot);
        let capacity = self.capacity();
        let slot_size = self.slot_size();
        match self.arena.slot_mut(slot) {
            Some(bytes) => bytemuck::try_from_bytes_mut(bytes)
                .map_err(|_| type_mismatch::<T>(&self.name, slot_size)),
            None => Err(EcsError::SlotOutOfRange {
                component: self.name.clone(),
                slot,
                capacity,
            }),
        }
    }

    /// The dense slot bytes of `[0, total_count)`, active or not.
    #[inline]
    #[must_use]
    pub fn buffer(&self) -> &[u8] {
        &self.arena.bytes()[..self.total_count() as usize * self.slot_size()]
    }

    /// The dense slot bytes of `[0, total_count)`, mutably.
    #[inline]
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        let len = self.total_count() as usize * self.slot_size();
        &mut self.arena.bytes_mut()[..len]
    }

    /// Bulk view for per-frame iteration.
    #[must_use]
    pub fn component_buffer(&self) -> ComponentBuffer<'_> {
        ComponentBuffer {
            name: &self.name,
            bytes: self.buffer(),
            slot_size: self.slot_size(),
            liveness: self.ids.liveness(),
            active_count: self.active_count(),
        }
    }

    /// Typed slice of `[0, total_count)`, active or not.
    ///
    /// # Errors
    ///
    /// [`EcsError::TypeMismatch`] if `T` does not fit the slot layout.
    pub fn as_slice<T: Pod>(&self) -> EcsResult<&[T]> {
        self.component_buffer().as_slice()
    }

    /// Typed mutable slice of `[0, total_count)`, active or not.
    ///
    /// # Errors
    ///
    /// [`EcsError::TypeMismatch`] if `T` does not fit the slot layout.
    pub fn as_mut_slice<T: Pod>(&mut self) -> EcsResult<&mut [T]> {
        self.check_type::<T>()?;
        let slot_size = self.slot_size();
        let len = self.total_count() as usize * slot_size;
        bytemuck::try_cast_slice_mut(&mut self.arena.bytes_mut()[..len])
            .map_err(|_| type_mismatch::<T>(&self.name, slot_size))
    }

    /// Grows the buffer.
    ///
    /// `None` applies the growth policy. Existing slots keep their bytes and
    /// indices; new slots are template copies. Requests that would not grow
    /// the pool are ignored.
    pub fn resize(&mut self, new_capacity: Option<u32>) {
        let old = self.capacity();
        let new = new_capacity.unwrap_or_else(|| self.growth.next_capacity(old));
        if new <= old {
            tracing::debug!(component = %self.name, old, requested = new, "ignored non-growing resize");
            return;
        }
        self.arena.grow(new, &self.template);
        tracing::debug!(component = %self.name, old, new, "grew component pool");
    }

    fn warn_if_inactive(&self, slot: u32) {
        if cfg!(debug_assertions) && !self.ids.is_active(slot) {
            tracing::warn!(component = %self.name, slot, "accessed an inactive slot");
        }
    }

    fn out_of_range(&self, slot: u32) -> EcsError {
        EcsError::SlotOutOfRange {
            component: self.name.clone(),
            slot,
            capacity: self.capacity(),
        }
    }

    fn check_type<T: Pod>(&self) -> EcsResult<()> {
        if std::mem::size_of::<T>() == self.slot_size() && std::mem::align_of::<T>() <= MAX_SLOT_ALIGN {
            Ok(())
        } else {
            Err(self.type_mismatch::<T>())
        }
    }

    fn type_mismatch<T>(&self) -> EcsError {
        type_mismatch::<T>(&self.name, self.slot_size())
    }
}

impl Drop for ComponentPool {
    fn drop(&mut self) {
        let destroy = self.hooks.destroy;
        for slot in 0..self.total_count() {
            if let Some(bytes) = self.arena.slot_mut(slot) {
                destroy(bytes);
            }
        }
        tracing::debug!(component = %self.name, slots = self.total_count(), "dropped component pool");
    }
}

fn type_mismatch<T>(component: &str, slot_size: usize) -> EcsError {
    EcsError::TypeMismatch {
        component: component.to_owned(),
        type_name: std::any::type_name::<T>(),
        size: std::mem::size_of::<T>(),
        slot_size,
    }
}

/// Read-only bulk view of a pool.
///
/// Covers `[0, total_count)`. Returned slots inside that range still hold
/// template copies, so consumers should iterate with
/// [`iter_active`](Self::iter_active) or test [`is_active`](Self::is_active).
#[derive(Clone, Copy, Debug)]
pub struct ComponentBuffer<'a> {
    name: &'a str,
    bytes: &'a [u8],
    slot_size: usize,
    liveness: &'a [bool],
    active_count: u32,
}

impl<'a> ComponentBuffer<'a> {
    /// Raw bytes of `[0, total_count)`.
    #[inline]
    #[must_use]
    pub const fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Bytes per slot.
    #[inline]
    #[must_use]
    pub const fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Number of slots covered by the view.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn total_count(&self) -> u32 {
        self.liveness.len() as u32
    }

    /// Number of active slots in the view.
    #[inline]
    #[must_use]
    pub const fn active_count(&self) -> u32 {
        self.active_count
    }

    /// Checks if a slot holds a live instance.
    #[inline]
    #[must_use]
    pub fn is_active(&self, slot: u32) -> bool {
        self.liveness.get(slot as usize).copied().unwrap_or(false)
    }

    /// Bytes of one slot in the view.
    #[inline]
    #[must_use]
    pub fn slot(&self, slot: u32) -> Option<&'a [u8]> {
        let start = slot as usize * self.slot_size;
        self.bytes.get(start..start + self.slot_size)
    }

    /// Iterates `(slot, bytes)` of active slots in ascending slot order.
    pub fn iter_active(&self) -> impl Iterator<Item = (u32, &'a [u8])> + 'a {
        let bytes = self.bytes;
        let liveness = self.liveness;
        bytes
            .chunks_exact(self.slot_size)
            .zip(liveness)
            .enumerate()
            .filter(|(_, (_, live))| **live)
            .map(|(slot, (bytes, _))| (slot as u32, bytes))
    }

    /// Typed slice of the whole view.
    ///
    /// # Errors
    ///
    /// [`EcsError::TypeMismatch`] if `T` does not fit the slot layout.
    pub fn as_slice<T: Pod>(&self) -> EcsResult<&'a [T]> {
        if std::mem::size_of::<T>() != self.slot_size {
            return Err(type_mismatch::<T>(self.name, self.slot_size));
        }
        let bytes = self.bytes;
        bytemuck::try_cast_slice(bytes).map_err(|_| type_mismatch::<T>(self.name, self.slot_size))
    }

    /// Iterates `(slot, &T)` of active slots.
    ///
    /// # Errors
    ///
    /// [`EcsError::TypeMismatch`] if `T` does not fit the slot layout.
    pub fn iter_active_as<T: Pod>(&self) -> EcsResult<impl Iterator<Item = (u32, &'a T)> + 'a> {
        let values = self.as_slice::<T>()?;
        let liveness = self.liveness;
        Ok(values
            .iter()
            .zip(liveness)
            .enumerate()
            .filter(|(_, (_, live))| **live)
            .map(|(slot, (value, _))| (slot as u32, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::Component;
    use bytemuck::Zeroable;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Position {
        x: f32,
        y: f32,
    }

    impl Component for Position {}

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
    #[repr(C)]
    struct Counter {
        value: u32,
        initialized: u32,
    }

    impl Component for Counter {
        fn initialize(&mut self) {
            self.initialized += 1;
        }
    }

    static DESTROYED: AtomicUsize = AtomicUsize::new(0);

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
    #[repr(C)]
    struct Tracked {
        value: u32,
    }

    impl Component for Tracked {
        fn destroy(&mut self) {
            DESTROYED.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn owner() -> EntityId {
        EntityId::new(0)
    }

    fn pool<T: Component>(template: T, capacity: u32) -> ComponentPool {
        let desc = ComponentDescriptor::of(template, capacity, std::any::type_name::<T>());
        ComponentPool::new(desc, ComponentMask::single(0).unwrap(), GrowthPolicy::Double).unwrap()
    }

    #[test]
    fn test_pool_creation() {
        let pool = pool(Position { x: 1.0, y: 2.0 }, 4);
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.total_count(), 0);
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.slot_size(), 8);
    }

    #[test]
    fn test_allocate_get_set() {
        let mut pool = pool(Position::default(), 4);
        let slot = pool.allocate(owner());
        assert_eq!(slot, 0);

        pool.get_as_mut::<Position>(slot).unwrap().x = 5.0;
        assert_eq!(pool.get_as::<Position>(slot).unwrap().x, 5.0);
        assert_eq!(pool.owner(slot), Some(owner()));
    }

    #[test]
    fn test_initialize_hook_runs_on_template_copy() {
        let mut pool = pool(Counter { value: 9, initialized: 0 }, 1);
        let slot = pool.allocate(owner());
        let counter = *pool.get_as::<Counter>(slot).unwrap();
        assert_eq!(counter, Counter { value: 9, initialized: 1 });

        // Returned slots are reset to the template, so the hook sees a fresh copy.
        pool.return_slot(slot).unwrap();
        let slot = pool.allocate(owner());
        assert_eq!(pool.get_as::<Counter>(slot).unwrap().initialized, 1);
    }

    #[test]
    fn test_return_resets_to_template_and_recycles() {
        let mut pool = pool(Position { x: -1.0, y: -1.0 }, 2);
        let a = pool.allocate(owner());
        let b = pool.allocate(owner());
        pool.get_as_mut::<Position>(a).unwrap().x = 3.0;

        pool.return_slot(a).unwrap();
        assert_eq!(*pool.get_as::<Position>(a).unwrap(), Position { x: -1.0, y: -1.0 });
        assert_eq!(pool.active_count(), 1);
        assert_eq!(pool.total_count(), 2);
        assert_eq!(pool.owner(a), None);

        assert_eq!(pool.allocate(owner()), a);
        assert!(pool.is_active(b));
    }

    #[test]
    fn test_return_inactive_slot_fails() {
        let mut pool = pool(Position::default(), 2);
        let slot = pool.allocate(owner());
        pool.return_slot(slot).unwrap();

        assert!(matches!(pool.return_slot(slot), Err(EcsError::InactiveSlot { slot: 0, .. })));
        assert!(pool.return_slot(99).is_err());
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_growth_doubles_and_preserves_values() {
        let mut pool = pool(Position::default(), 2);
        let a = pool.allocate(owner());
        let b = pool.allocate(owner());
        pool.get_as_mut::<Position>(a).unwrap().x = 1.0;
        pool.get_as_mut::<Position>(b).unwrap().x = 2.0;

        let c = pool.allocate(owner());
        assert_eq!(c, 2);
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.get_as::<Position>(a).unwrap().x, 1.0);
        assert_eq!(pool.get_as::<Position>(b).unwrap().x, 2.0);
        // The slot past the high-water mark is a template copy.
        assert_eq!(*pool.get_as::<Position>(3).unwrap(), Position::default());
    }

    #[test]
    fn test_zero_capacity_pool_grows() {
        let mut pool = pool(Position::default(), 0);
        assert_eq!(pool.allocate(owner()), 0);
        assert_eq!(pool.capacity(), 1);
        assert_eq!(pool.allocate(owner()), 1);
        assert_eq!(pool.capacity(), 2);
    }

    #[test]
    fn test_resize_explicit_and_never_shrinks() {
        let mut pool = pool(Position::default(), 2);
        pool.resize(Some(10));
        assert_eq!(pool.capacity(), 10);
        pool.resize(Some(3));
        assert_eq!(pool.capacity(), 10);
        pool.resize(None);
        assert_eq!(pool.capacity(), 20);
    }

    #[test]
    fn test_out_of_range_access() {
        let pool = pool(Position::default(), 2);
        assert!(matches!(pool.get(2), Err(EcsError::SlotOutOfRange { slot: 2, capacity: 2, .. })));
        // Within capacity but never allocated: readable template.
        assert_eq!(*pool.get_as::<Position>(1).unwrap(), Position::default());
    }

    #[test]
    fn test_type_mismatch() {
        let pool = pool(Position::default(), 2);
        assert!(matches!(pool.get_as::<u32>(0), Err(EcsError::TypeMismatch { size: 4, slot_size: 8, .. })));
        assert!(pool.as_slice::<u16>().is_err());
    }

    #[test]
    fn test_buffer_view_exposes_liveness() {
        let mut pool = pool(Position::default(), 4);
        for i in 0..3u8 {
            let slot = pool.allocate(owner());
            pool.get_as_mut::<Position>(slot).unwrap().x = f32::from(i);
        }
        pool.return_slot(1).unwrap();

        let buffer = pool.component_buffer();
        assert_eq!(buffer.total_count(), 3);
        assert_eq!(buffer.active_count(), 2);
        assert_eq!(buffer.bytes().len(), 24);
        assert!(!buffer.is_active(1));

        let live: Vec<_> = buffer
            .iter_active_as::<Position>()
            .unwrap()
            .map(|(slot, p)| (slot, p.x))
            .collect();
        assert_eq!(live, vec![(0, 0.0), (2, 2.0)]);
        assert_eq!(buffer.iter_active().count(), 2);

        let all = buffer.as_slice::<Position>().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[1], Position::default());
    }

    #[test]
    fn test_mutable_slice() {
        let mut pool = pool(Position::default(), 2);
        pool.allocate(owner());
        pool.allocate(owner());
        for p in pool.as_mut_slice::<Position>().unwrap() {
            p.y = 7.0;
        }
        assert_eq!(pool.get_as::<Position>(1).unwrap().y, 7.0);
    }

    #[test]
    fn test_drop_destroys_every_historical_slot() {
        let before = DESTROYED.load(Ordering::SeqCst);
        {
            let mut pool = pool(Tracked::default(), 2);
            let a = pool.allocate(owner());
            pool.allocate(owner());
            pool.allocate(owner());
            pool.return_slot(a).unwrap(); // destroy #1
        } // destroy x3 for [0, total_count)
        assert_eq!(DESTROYED.load(Ordering::SeqCst) - before, 4);
    }
}
