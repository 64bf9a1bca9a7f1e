//! # Entity Registry
//!
//! Entity lifecycle and per-entity component bookkeeping.
//!
//! Each live entity has a record holding its component mask and one slot
//! index per attached type. The slot list is ordered by descending type bit,
//! so the position of a type in the list is the number of attached types
//! with a higher bit ([`ComponentMask::rank_of`]). That keeps lookups O(1)
//! without a per-entity map.

use super::entity::{EntityId, EntityRecord};
use super::mask::{ComponentMask, MaskMatchMode};
use super::registry::ComponentRegistry;
use crate::error::{EcsError, EcsResult};
use crate::memory::IdBank;

/// Owner of every live entity's record.
///
/// The registry does not own component storage; operations that touch
/// components take the [`ComponentRegistry`] they delegate to.
///
/// # Example
///
/// ```rust,ignore
/// let mut components = ComponentRegistry::new();
/// let mut entities = EntityRegistry::new();
/// let health = components.register_type(Health::default(), 8, "Health")?;
///
/// let e = entities.create_entity();
/// entities.add_components(&mut components, health, e)?;
/// let bytes = entities.component(&components, health, e)?;
/// ```
#[derive(Debug, Default)]
pub struct EntityRegistry {
    /// Entity ID allocator.
    ids: IdBank,
    /// Record per entity ID; `None` for IDs not currently live.
    records: Vec<Option<EntityRecord>>,
}

impl EntityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry with room for `capacity` entities.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: IdBank::with_capacity(capacity),
            records: Vec::with_capacity(capacity),
        }
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.active_count() as usize
    }

    /// Checks if there are no live entities.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.active_count() == 0
    }

    /// Checks if an entity is live.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.ids.is_active(id.raw())
    }

    /// Iterates live entity records in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityRecord> {
        self.records.iter().flatten()
    }

    /// Record of a live entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::InactiveEntity`] if the entity is not live.
    pub fn record(&self, id: EntityId) -> EcsResult<&EntityRecord> {
        self.live_record(id, "read the record of")
    }

    /// Slot indices of a live entity, highest type bit first.
    ///
    /// # Errors
    ///
    /// [`EcsError::InactiveEntity`] if the entity is not live.
    pub fn slot_indices(&self, id: EntityId) -> EcsResult<&[u32]> {
        self.live_record(id, "read the slots of")
            .map(EntityRecord::slots)
    }

    /// Creates an entity with no components.
    pub fn create_entity(&mut self) -> EntityId {
        let id = EntityId::new(self.ids.acquire());
        let record = Some(EntityRecord::new(id));
        if id.index() == self.records.len() {
            self.records.push(record);
        } else {
            self.records[id.index()] = record;
        }
        tracing::trace!(entity = %id, "created entity");
        id
    }

    /// Removes all of an entity's components and frees its ID.
    ///
    /// # Errors
    ///
    /// [`EcsError::InactiveEntity`] if the entity is not live.
    pub fn destroy_entity(&mut self, components: &mut ComponentRegistry, id: EntityId) -> EcsResult<()> {
        let record = self.live_record_mut(id, "destroy")?;
        let mask = record.mask();
        let failed = remove_from_record(components, record, mask);
        if !failed.is_empty() {
            tracing::error!(entity = %id, failed = %failed, "components could not be returned while destroying entity");
        }

        self.records[id.index()] = None;
        self.ids.release(id.raw());
        tracing::trace!(entity = %id, "destroyed entity");
        Ok(())
    }

    /// Attaches every type in `mask` to an entity.
    ///
    /// Types are added from the highest bit down. Returns the residual mask of
    /// types that were not added because the entity already had them or they
    /// are not registered; empty on full success.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidMask`] if `mask` is empty, [`EcsError::InactiveEntity`]
    /// if the entity is not live. Nothing is changed in either case.
    pub fn add_components(
        &mut self,
        components: &mut ComponentRegistry,
        mask: ComponentMask,
        id: EntityId,
    ) -> EcsResult<ComponentMask> {
        if mask.is_empty() {
            tracing::warn!(entity = %id, "attempted to add components using an empty mask");
            return Err(EcsError::InvalidMask { mask });
        }
        let record = self.live_record_mut(id, "add components to")?;

        let mut residual = ComponentMask::EMPTY;
        for single in mask.iter_descending() {
            if record.has(single) {
                tracing::warn!(entity = %id, mask = %single, "entity already has component");
                residual |= single;
                continue;
            }
            match components.allocate(single, id) {
                Ok(slot) => record.insert(single, slot),
                Err(_) => residual |= single,
            }
        }

        debug_assert!(record.is_coherent());
        Ok(residual)
    }

    /// Detaches every type in `mask` from an entity, returning their slots.
    ///
    /// Returns the residual mask of types that could not be removed, either
    /// because the entity lacks them or their pool refused the slot.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidMask`] if `mask` is empty, [`EcsError::InactiveEntity`]
    /// if the entity is not live.
    pub fn remove_components(
        &mut self,
        components: &mut ComponentRegistry,
        mask: ComponentMask,
        id: EntityId,
    ) -> EcsResult<ComponentMask> {
        if mask.is_empty() {
            tracing::warn!(entity = %id, "attempted to remove components using an empty mask");
            return Err(EcsError::InvalidMask { mask });
        }
        let record = self.live_record_mut(id, "remove components from")?;
        Ok(remove_from_record(components, record, mask))
    }

    /// Pool slot of one of an entity's components.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotSingleType`], [`EcsError::InactiveEntity`], or
    /// [`EcsError::MissingComponent`] if the entity lacks the type.
    pub fn slot_of(&self, mask: ComponentMask, id: EntityId) -> EcsResult<u32> {
        if !mask.is_single() {
            tracing::warn!(entity = %id, mask = %mask, "component lookup needs exactly one type");
            return Err(EcsError::NotSingleType { mask });
        }
        let record = self.live_record(id, "get a component of")?;
        record.slot_of(mask).ok_or_else(|| {
            tracing::warn!(entity = %id, mask = %mask, entity_mask = %record.mask(), "entity lacks component type");
            EcsError::MissingComponent { entity: id, mask }
        })
    }

    /// Bytes of one of an entity's components.
    ///
    /// # Errors
    ///
    /// As [`slot_of`](Self::slot_of), plus registry dispatch errors.
    pub fn component<'c>(
        &self,
        components: &'c ComponentRegistry,
        mask: ComponentMask,
        id: EntityId,
    ) -> EcsResult<&'c [u8]> {
        let slot = self.slot_of(mask, id)?;
        components.get(mask, slot)
    }

    /// Bytes of one of an entity's components, mutably.
    ///
    /// # Errors
    ///
    /// As [`component`](Self::component).
    pub fn component_mut<'c>(
        &self,
        components: &'c mut ComponentRegistry,
        mask: ComponentMask,
        id: EntityId,
    ) -> EcsResult<&'c mut [u8]> {
        let slot = self.slot_of(mask, id)?;
        components.get_mut(mask, slot)
    }

    /// An entity's component mask.
    ///
    /// # Errors
    ///
    /// [`EcsError::InactiveEntity`] if the entity is not live.
    pub fn component_mask(&self, id: EntityId) -> EcsResult<ComponentMask> {
        self.live_record(id, "get the component mask of")
            .map(EntityRecord::mask)
    }

    /// Live entities whose mask matches `mask` under `mode`, in ascending ID order.
    #[must_use]
    pub fn entities_matching_mask(&self, mask: ComponentMask, mode: MaskMatchMode) -> Vec<EntityId> {
        self.iter()
            .filter(|record| mode.matches(record.mask(), mask))
            .map(EntityRecord::id)
            .collect()
    }

    /// Strips every type in `mask` from all live entities that have it.
    ///
    /// Returns the union of residual masks.
    pub fn remove_from_all(&mut self, components: &mut ComponentRegistry, mask: ComponentMask) -> ComponentMask {
        let mut failed = ComponentMask::EMPTY;
        for record in self.records.iter_mut().flatten() {
            let present = record.mask() & mask;
            if !present.is_empty() {
                failed |= remove_from_record(components, record, present);
            }
        }
        failed
    }

    fn live_record(&self, id: EntityId, action: &str) -> EcsResult<&EntityRecord> {
        if !self.ids.is_active(id.raw()) {
            tracing::warn!(entity = %id, "attempted to {action} an entity that doesn't exist");
            return Err(EcsError::InactiveEntity { entity: id });
        }
        match self.records.get(id.index()).and_then(Option::as_ref) {
            Some(record) => Ok(record),
            None => {
                tracing::error!(entity = %id, "entity is marked active but has no record");
                Err(EcsError::MissingRecord { entity: id })
            }
        }
    }

    fn live_record_mut(&mut self, id: EntityId, action: &str) -> EcsResult<&mut EntityRecord> {
        if !self.ids.is_active(id.raw()) {
            tracing::warn!(entity = %id, "attempted to {action} an entity that doesn't exist");
            return Err(EcsError::InactiveEntity { entity: id });
        }
        match self.records.get_mut(id.index()).and_then(Option::as_mut) {
            Some(record) => Ok(record),
            None => {
                tracing::error!(entity = %id, "entity is marked active but has no record");
                Err(EcsError::MissingRecord { entity: id })
            }
        }
    }
}

/// Returns the slots of `mask`'s types to their pools, highest bit first,
/// and drops them from the record. Returns the bits that failed.
fn remove_from_record(
    components: &mut ComponentRegistry,
    record: &mut EntityRecord,
    mask: ComponentMask,
) -> ComponentMask {
    let mut failed = ComponentMask::EMPTY;
    for single in mask.iter_descending() {
        let Some(slot) = record.slot_of(single) else {
            tracing::warn!(entity = %record.id(), mask = %single, "entity lacks component type to remove");
            failed |= single;
            continue;
        };
        match components.return_slot(single, slot) {
            Ok(()) => {
                record.remove(single);
            }
            Err(_) => failed |= single,
        }
    }
    debug_assert!(record.is_coherent());
    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::Component;
    use bytemuck::{Pod, Zeroable};

    #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Position {
        x: f32,
        y: f32,
    }

    impl Component for Position {}

    #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }

    impl Component for Velocity {}

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
    #[repr(C)]
    struct Health {
        hp: u32,
    }

    impl Component for Health {}

    struct Fixture {
        components: ComponentRegistry,
        entities: EntityRegistry,
        pos: ComponentMask,
        vel: ComponentMask,
        hp: ComponentMask,
    }

    fn fixture() -> Fixture {
        let mut components = ComponentRegistry::new();
        let pos = components.register_type(Position::default(), 2, "Position").unwrap();
        let vel = components.register_type(Velocity::default(), 2, "Velocity").unwrap();
        let hp = components.register_type(Health { hp: 100 }, 2, "Health").unwrap();
        Fixture {
            components,
            entities: EntityRegistry::new(),
            pos,
            vel,
            hp,
        }
    }

    #[test]
    fn test_create_destroy_recycles_ids() {
        let mut f = fixture();
        let a = f.entities.create_entity();
        let b = f.entities.create_entity();
        assert_ne!(a, b);
        assert_eq!(f.entities.len(), 2);

        f.entities.destroy_entity(&mut f.components, a).unwrap();
        assert!(!f.entities.is_alive(a));
        assert!(matches!(
            f.entities.destroy_entity(&mut f.components, a),
            Err(EcsError::InactiveEntity { .. })
        ));

        let c = f.entities.create_entity();
        assert_eq!(c, a);
        assert_eq!(f.entities.component_mask(c).unwrap(), ComponentMask::EMPTY);
    }

    #[test]
    fn test_add_keeps_descending_slot_order() {
        let mut f = fixture();
        let e = f.entities.create_entity();

        let residual = f.entities.add_components(&mut f.components, f.pos | f.hp, e).unwrap();
        assert!(residual.is_empty());
        let residual = f.entities.add_components(&mut f.components, f.vel, e).unwrap();
        assert!(residual.is_empty());

        let record = f.entities.record(e).unwrap();
        assert_eq!(record.mask(), f.pos | f.vel | f.hp);
        assert_eq!(record.slots().len(), 3);
        assert_eq!(f.entities.slot_indices(e).unwrap(), record.slots());
        // Highest bit (Health) first, Position last.
        for (rank, single) in record.mask().iter_descending().enumerate() {
            let slot = record.slots()[rank];
            assert_eq!(f.components.pool(single).unwrap().owner(slot), Some(e));
        }
    }

    #[test]
    fn test_add_rejects_empty_mask_and_dead_entity() {
        let mut f = fixture();
        let e = f.entities.create_entity();
        assert!(matches!(
            f.entities.add_components(&mut f.components, ComponentMask::EMPTY, e),
            Err(EcsError::InvalidMask { .. })
        ));
        assert!(matches!(
            f.entities.add_components(&mut f.components, f.pos, EntityId::new(9)),
            Err(EcsError::InactiveEntity { .. })
        ));
    }

    #[test]
    fn test_add_reports_duplicates_and_unregistered_types() {
        let mut f = fixture();
        let e = f.entities.create_entity();
        f.entities.add_components(&mut f.components, f.pos, e).unwrap();

        let unknown = ComponentMask::single(50).unwrap();
        let residual = f
            .entities
            .add_components(&mut f.components, f.pos | f.vel | unknown, e)
            .unwrap();
        assert_eq!(residual, f.pos | unknown);
        assert_eq!(f.entities.component_mask(e).unwrap(), f.pos | f.vel);
        assert_eq!(f.components.pool(f.pos).unwrap().active_count(), 1);
    }

    #[test]
    fn test_add_then_remove_round_trips() {
        let mut f = fixture();
        let e = f.entities.create_entity();
        f.entities.add_components(&mut f.components, f.pos | f.hp, e).unwrap();
        let before = f.entities.record(e).unwrap().clone();

        f.entities.add_components(&mut f.components, f.vel, e).unwrap();
        let residual = f.entities.remove_components(&mut f.components, f.vel, e).unwrap();
        assert!(residual.is_empty());
        assert_eq!(f.entities.record(e).unwrap(), &before);
    }

    #[test]
    fn test_remove_reports_missing_types() {
        let mut f = fixture();
        let e = f.entities.create_entity();
        f.entities.add_components(&mut f.components, f.pos, e).unwrap();

        let residual = f
            .entities
            .remove_components(&mut f.components, f.pos | f.vel, e)
            .unwrap();
        assert_eq!(residual, f.vel);
        assert_eq!(f.entities.component_mask(e).unwrap(), ComponentMask::EMPTY);
    }

    #[test]
    fn test_remove_reports_slots_the_pool_refuses() {
        let mut f = fixture();
        let e = f.entities.create_entity();
        f.entities.add_components(&mut f.components, f.pos | f.hp, e).unwrap();

        // Return the slot behind the entity's back.
        let slot = f.entities.slot_of(f.hp, e).unwrap();
        f.components.return_slot(f.hp, slot).unwrap();

        let residual = f
            .entities
            .remove_components(&mut f.components, f.pos | f.hp, e)
            .unwrap();
        assert_eq!(residual, f.hp);
        assert_eq!(f.entities.component_mask(e).unwrap(), f.hp);
        assert!(f.entities.record(e).unwrap().is_coherent());
    }

    #[test]
    fn test_component_lookup() {
        let mut f = fixture();
        let e = f.entities.create_entity();
        f.entities.add_components(&mut f.components, f.hp, e).unwrap();

        let bytes = f.entities.component(&f.components, f.hp, e).unwrap();
        assert_eq!(bytemuck::pod_read_unaligned::<Health>(bytes), Health { hp: 100 });

        let bytes = f.entities.component_mut(&mut f.components, f.hp, e).unwrap();
        bytes.copy_from_slice(&7u32.to_ne_bytes());
        let slot = f.entities.slot_of(f.hp, e).unwrap();
        assert_eq!(f.components.pool(f.hp).unwrap().get_as::<Health>(slot).unwrap().hp, 7);

        assert!(matches!(
            f.entities.component(&f.components, f.pos, e),
            Err(EcsError::MissingComponent { .. })
        ));
        assert!(matches!(
            f.entities.component(&f.components, f.pos | f.hp, e),
            Err(EcsError::NotSingleType { .. })
        ));
    }

    #[test]
    fn test_destroy_returns_all_slots() {
        let mut f = fixture();
        let e = f.entities.create_entity();
        f.entities.add_components(&mut f.components, f.pos | f.vel | f.hp, e).unwrap();
        f.entities.destroy_entity(&mut f.components, e).unwrap();

        for mask in [f.pos, f.vel, f.hp] {
            assert_eq!(f.components.pool(mask).unwrap().active_count(), 0);
        }
        assert!(f.entities.is_empty());
    }

    #[test]
    fn test_matching_masks() {
        let mut f = fixture();
        let a = f.entities.create_entity();
        let ab = f.entities.create_entity();
        let abc = f.entities.create_entity();
        f.entities.add_components(&mut f.components, f.pos, a).unwrap();
        f.entities.add_components(&mut f.components, f.pos | f.vel, ab).unwrap();
        f.entities.add_components(&mut f.components, f.pos | f.vel | f.hp, abc).unwrap();

        let query = f.pos | f.vel;
        assert_eq!(f.entities.entities_matching_mask(query, MaskMatchMode::Any), vec![a, ab, abc]);
        assert_eq!(f.entities.entities_matching_mask(query, MaskMatchMode::Partial), vec![ab, abc]);
        assert_eq!(f.entities.entities_matching_mask(query, MaskMatchMode::Exact), vec![ab]);
    }

    #[test]
    fn test_remove_from_all() {
        let mut f = fixture();
        let a = f.entities.create_entity();
        let b = f.entities.create_entity();
        f.entities.add_components(&mut f.components, f.pos | f.vel, a).unwrap();
        f.entities.add_components(&mut f.components, f.vel, b).unwrap();

        let failed = f.entities.remove_from_all(&mut f.components, f.vel);
        assert!(failed.is_empty());
        assert_eq!(f.entities.component_mask(a).unwrap(), f.pos);
        assert_eq!(f.entities.component_mask(b).unwrap(), ComponentMask::EMPTY);
        assert_eq!(f.components.pool(f.vel).unwrap().active_count(), 0);
    }

    #[test]
    fn test_type_held_by_an_entity_keeps_its_bit() {
        let mut components = ComponentRegistry::new();
        let mut entities = EntityRegistry::new();
        let pos = components.register_type(Position::default(), 1, "Position").unwrap();
        let a = entities.create_entity();
        entities.add_components(&mut components, pos, a).unwrap();

        assert!(matches!(components.unregister(pos), Err(EcsError::TypeInUse { active: 1, .. })));

        let hp = components.register_type(Health::default(), 1, "Health").unwrap();
        assert_ne!(hp, pos);
        let b = entities.create_entity();
        entities.add_components(&mut components, hp, b).unwrap();

        assert_eq!(entities.slot_of(pos, a).unwrap(), 0);
        assert_eq!(components.pool(pos).unwrap().owner(0), Some(a));
        assert_eq!(components.pool(hp).unwrap().owner(0), Some(b));
        assert!(entities.slot_of(pos, b).is_err());

        entities.remove_from_all(&mut components, pos);
        components.unregister(pos).unwrap();
        assert_eq!(entities.component_mask(a).unwrap(), ComponentMask::EMPTY);
    }
}
