//! # Component Registry
//!
//! Maps every component type bit to its pool and routes mask-addressed calls
//! to it. Registration normally happens once at startup.

use std::any::TypeId;
use std::collections::HashMap;

use super::component::{Component, ComponentDescriptor};
use super::entity::EntityId;
use super::mask::ComponentMask;
use super::pool::{ComponentBuffer, ComponentPool};
use crate::config::{EngineConfig, GrowthPolicy};
use crate::error::{EcsError, EcsResult};

/// Owner of all component pools, indexed by type bit.
///
/// Every dispatching method takes a single-type mask and fails with
/// [`EcsError::NotSingleType`] or [`EcsError::UnregisteredType`] if the mask
/// does not resolve to exactly one registered pool.
///
/// # Example
///
/// ```rust,ignore
/// let mut registry = ComponentRegistry::new();
/// let health = registry.register_type(Health::default(), 16, "Health")?;
///
/// let slot = registry.allocate(health, entity)?;
/// registry.return_slot(health, slot)?;
/// ```
#[derive(Debug)]
pub struct ComponentRegistry {
    /// Pool per bit position; `None` for free bits.
    pools: Vec<Option<ComponentPool>>,
    /// Bits owned by typed registrations.
    type_masks: HashMap<TypeId, ComponentMask>,
    /// Growth policy handed to new pools.
    growth: GrowthPolicy,
    /// Capacity for registrations that do not pass one.
    default_capacity: u32,
}

impl ComponentRegistry {
    /// Creates an empty registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    /// Creates an empty registry.
    ///
    /// `config` is expected to be validated; `max_component_types` is clamped
    /// to the mask width.
    #[must_use]
    pub fn with_config(config: &EngineConfig) -> Self {
        let max = config.max_component_types.min(super::MAX_COMPONENT_TYPES);
        Self {
            pools: (0..max).map(|_| None).collect(),
            type_masks: HashMap::new(),
            growth: config.growth,
            default_capacity: config.default_pool_capacity,
        }
    }

    /// Number of type bits this registry can hand out.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn max_types(&self) -> u32 {
        self.pools.len() as u32
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.iter().flatten().count()
    }

    /// Checks if no types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.iter().all(Option::is_none)
    }

    /// Union of all registered type bits.
    #[must_use]
    pub fn registered_mask(&self) -> ComponentMask {
        self.pools
            .iter()
            .flatten()
            .fold(ComponentMask::EMPTY, |acc, pool| acc | pool.mask())
    }

    /// Iterates registered pools in ascending bit order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentPool> {
        self.pools.iter().flatten()
    }

    /// Registers an untyped component and returns its bit.
    ///
    /// The lowest free bit is assigned.
    ///
    /// # Errors
    ///
    /// [`EcsError::RegistryFull`] if every bit is taken,
    /// [`EcsError::UnsupportedLayout`] if the descriptor is invalid.
    pub fn register(&mut self, descriptor: ComponentDescriptor) -> EcsResult<ComponentMask> {
        let Some(bit) = self.pools.iter().position(Option::is_none) else {
            tracing::warn!(component = %descriptor.name, max = self.max_types(), "component registry is full");
            return Err(EcsError::RegistryFull {
                max: self.max_types(),
            });
        };
        #[allow(clippy::cast_possible_truncation)]
        let mask = ComponentMask::single(bit as u32).ok_or(EcsError::RegistryFull {
            max: self.max_types(),
        })?;

        let pool = ComponentPool::new(descriptor, mask, self.growth)?;
        tracing::info!(
            component = pool.name(),
            mask = %mask,
            slot_size = pool.slot_size(),
            capacity = pool.capacity(),
            "registered component type"
        );
        self.pools[bit] = Some(pool);
        Ok(mask)
    }

    /// Registers a typed component with `template` as its prototype.
    ///
    /// # Errors
    ///
    /// [`EcsError::AlreadyRegistered`] if `T` already owns a bit, otherwise as
    /// [`register`](Self::register).
    pub fn register_type<T: Component>(
        &mut self,
        template: T,
        initial_capacity: u32,
        name: impl Into<String>,
    ) -> EcsResult<ComponentMask> {
        let name = name.into();
        if let Some(&mask) = self.type_masks.get(&TypeId::of::<T>()) {
            tracing::warn!(component = %name, mask = %mask, "component type registered twice");
            return Err(EcsError::AlreadyRegistered { name, mask });
        }
        let mask = self.register(ComponentDescriptor::of(template, initial_capacity, name))?;
        self.type_masks.insert(TypeId::of::<T>(), mask);
        Ok(mask)
    }

    /// Registers `T` with its `Default` value as template and the configured
    /// default capacity.
    ///
    /// # Errors
    ///
    /// As [`register_type`](Self::register_type).
    pub fn register_default<T: Component>(&mut self, name: impl Into<String>) -> EcsResult<ComponentMask> {
        self.register_type(T::default(), self.default_capacity, name)
    }

    /// Drops a type's pool and frees its bit.
    ///
    /// Destroy hooks run on every slot the pool ever handed out. Every slot
    /// must have been returned first, otherwise entity records would keep
    /// pointing into a pool that a later registration reuses the bit for.
    ///
    /// # Errors
    ///
    /// Fails unless `mask` names exactly one registered type, and with
    /// [`EcsError::TypeInUse`] while the pool still has active slots.
    pub fn unregister(&mut self, mask: ComponentMask) -> EcsResult<()> {
        let bit = self.resolve(mask)?;
        if let Some(pool) = self.pools[bit].as_ref() {
            let active = pool.active_count();
            if active > 0 {
                tracing::warn!(component = pool.name(), mask = %mask, active, "cannot unregister component type in use");
                return Err(EcsError::TypeInUse {
                    name: pool.name().to_owned(),
                    mask,
                    active,
                });
            }
        }
        if let Some(pool) = self.pools[bit].take() {
            tracing::info!(component = pool.name(), mask = %mask, "unregistered component type");
        }
        self.type_masks.retain(|_, owned| *owned != mask);
        Ok(())
    }

    /// Bit owned by the typed component `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownType`] if `T` was never registered.
    pub fn mask_of<T: Component>(&self) -> EcsResult<ComponentMask> {
        self.type_masks
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or(EcsError::UnknownType {
                type_name: std::any::type_name::<T>(),
            })
    }

    /// The pool of a single type.
    ///
    /// # Errors
    ///
    /// Fails unless `mask` names exactly one registered type.
    pub fn pool(&self, mask: ComponentMask) -> EcsResult<&ComponentPool> {
        let bit = self.resolve(mask)?;
        self.pools[bit]
            .as_ref()
            .ok_or(EcsError::UnregisteredType { mask })
    }

    /// The pool of a single type, mutably.
    ///
    /// # Errors
    ///
    /// Fails unless `mask` names exactly one registered type.
    pub fn pool_mut(&mut self, mask: ComponentMask) -> EcsResult<&mut ComponentPool> {
        let bit = self.resolve(mask)?;
        self.pools[bit]
            .as_mut()
            .ok_or(EcsError::UnregisteredType { mask })
    }

    /// Registered name of a single type.
    ///
    /// # Errors
    ///
    /// Fails unless `mask` names exactly one registered type.
    pub fn name(&self, mask: ComponentMask) -> EcsResult<&str> {
        self.pool(mask).map(ComponentPool::name)
    }

    /// Slot byte size of a single type.
    ///
    /// # Errors
    ///
    /// Fails unless `mask` names exactly one registered type.
    pub fn slot_size(&self, mask: ComponentMask) -> EcsResult<usize> {
        self.pool(mask).map(ComponentPool::slot_size)
    }

    /// Allocates a slot of a single type for `owner`.
    ///
    /// # Errors
    ///
    /// Fails unless `mask` names exactly one registered type.
    pub fn allocate(&mut self, mask: ComponentMask, owner: EntityId) -> EcsResult<u32> {
        Ok(self.pool_mut(mask)?.allocate(owner))
    }

    /// Returns a slot of a single type.
    ///
    /// # Errors
    ///
    /// Fails unless `mask` names exactly one registered type, or with
    /// [`EcsError::InactiveSlot`] if the slot is not handed out.
    pub fn return_slot(&mut self, mask: ComponentMask, slot: u32) -> EcsResult<()> {
        self.pool_mut(mask)?.return_slot(slot)
    }

    /// Bytes of one slot of a single type.
    ///
    /// # Errors
    ///
    /// Fails unless `mask` names exactly one registered type, or with
    /// [`EcsError::SlotOutOfRange`].
    pub fn get(&self, mask: ComponentMask, slot: u32) -> EcsResult<&[u8]> {
        self.pool(mask)?.get(slot)
    }

    /// Bytes of one slot of a single type, mutably.
    ///
    /// # Errors
    ///
    /// As [`get`](Self::get).
    pub fn get_mut(&mut self, mask: ComponentMask, slot: u32) -> EcsResult<&mut [u8]> {
        self.pool_mut(mask)?.get_mut(slot)
    }

    /// Bulk view of a single type's pool.
    ///
    /// # Errors
    ///
    /// Fails unless `mask` names exactly one registered type.
    pub fn component_buffer(&self, mask: ComponentMask) -> EcsResult<ComponentBuffer<'_>> {
        self.pool(mask).map(ComponentPool::component_buffer)
    }

    /// Bit position of a single registered type.
    fn resolve(&self, mask: ComponentMask) -> EcsResult<usize> {
        if !mask.is_single() {
            tracing::warn!(mask = %mask, "component mask does not name exactly one type");
            return Err(EcsError::NotSingleType { mask });
        }
        let bit = mask.highest_bit_index().unwrap_or_default() as usize;
        match self.pools.get(bit) {
            Some(Some(_)) => Ok(bit),
            _ => {
                tracing::warn!(mask = %mask, "component mask names an unregistered type");
                Err(EcsError::UnregisteredType { mask })
            }
        }
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
