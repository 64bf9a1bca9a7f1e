//! # ECS Context
//!
//! The single owner of a component registry and an entity registry.
//!
//! Construction is startup and dropping the context is shutdown: every pool
//! runs its destroy hooks and all storage is released. There is no hidden
//! global; callers that need sharing wrap the context in a
//! [`SharedContext`](crate::sync::SharedContext).

use super::component::{Component, ComponentDescriptor};
use super::entities::EntityRegistry;
use super::entity::{EntityId, EntityRecord};
use super::mask::{ComponentMask, MaskMatchMode};
use super::pool::ComponentBuffer;
use super::registry::ComponentRegistry;
use crate::config::EngineConfig;
use crate::error::{EcsError, EcsResult};

/// Component and entity storage behind one API.
///
/// # Example
///
/// ```rust,ignore
/// let mut ecs = EcsContext::new();
/// let health = ecs.register_type(Health { current: 100, max: 100 }, 64, "Health")?;
///
/// let player = ecs.create_entity();
/// ecs.add_components(health, player)?;
/// ecs.get_mut::<Health>(player)?.current -= 10;
///
/// for (entity, hp) in ecs.components_of::<Health>()? {
///     println!("{entity}: {}", hp.current);
/// }
/// ```
#[derive(Debug)]
pub struct EcsContext {
    config: EngineConfig,
    components: ComponentRegistry,
    entities: EntityRegistry,
}

impl EcsContext {
    /// Creates a context with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::from_validated(EngineConfig::default())
    }

    /// Creates a context from a configuration.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidConfig`] if the configuration does not validate.
    pub fn with_config(config: EngineConfig) -> EcsResult<Self> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: EngineConfig) -> Self {
        tracing::info!(
            max_component_types = config.max_component_types,
            default_pool_capacity = config.default_pool_capacity,
            "initializing ECS context"
        );
        Self {
            components: ComponentRegistry::with_config(&config),
            entities: EntityRegistry::with_capacity(config.entity_capacity_hint),
            config,
        }
    }

    /// The configuration this context was built with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The component registry.
    #[inline]
    #[must_use]
    pub const fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// The entity registry.
    #[inline]
    #[must_use]
    pub const fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    // ---------------------------------------------------------------
    // Component types
    // ---------------------------------------------------------------

    /// Registers a type from a descriptor.
    ///
    /// # Errors
    ///
    /// See [`ComponentRegistry::register`].
    pub fn register(&mut self, descriptor: ComponentDescriptor) -> EcsResult<ComponentMask> {
        self.components.register(descriptor)
    }

    /// Registers a typed component.
    ///
    /// # Errors
    ///
    /// See [`ComponentRegistry::register_type`].
    pub fn register_type<T: Component>(
        &mut self,
        template: T,
        initial_capacity: u32,
        name: impl Into<String>,
    ) -> EcsResult<ComponentMask> {
        self.components.register_type(template, initial_capacity, name)
    }

    /// Registers a typed component with its default template and capacity.
    ///
    /// # Errors
    ///
    /// See [`ComponentRegistry::register_default`].
    pub fn register_default<T: Component>(&mut self, name: impl Into<String>) -> EcsResult<ComponentMask> {
        self.components.register_default::<T>(name)
    }

    /// Detaches a type from every entity, then drops its pool.
    ///
    /// # Errors
    ///
    /// Fails unless `mask` names exactly one registered type, or with
    /// [`EcsError::TypeInUse`] if some entity could not be stripped.
    pub fn unregister_type(&mut self, mask: ComponentMask) -> EcsResult<()> {
        self.components.pool(mask)?;
        let failed = self.entities.remove_from_all(&mut self.components, mask);
        if !failed.is_empty() {
            tracing::error!(mask = %mask, "entities kept slots of a type being unregistered");
        }
        self.components.unregister(mask)
    }

    /// Bit of a typed component.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownType`] if `T` was never registered.
    pub fn mask_of<T: Component>(&self) -> EcsResult<ComponentMask> {
        self.components.mask_of::<T>()
    }

    /// Bulk view of one type's pool.
    ///
    /// # Errors
    ///
    /// Fails unless `mask` names exactly one registered type.
    pub fn component_buffer(&self, mask: ComponentMask) -> EcsResult<ComponentBuffer<'_>> {
        self.components.component_buffer(mask)
    }

    // ---------------------------------------------------------------
    // Entities
    // ---------------------------------------------------------------

    /// Creates an entity with no components.
    pub fn create_entity(&mut self) -> EntityId {
        self.entities.create_entity()
    }

    /// Destroys an entity and returns all its component slots.
    ///
    /// # Errors
    ///
    /// [`EcsError::InactiveEntity`] if the entity is not live.
    pub fn destroy_entity(&mut self, id: EntityId) -> EcsResult<()> {
        self.entities.destroy_entity(&mut self.components, id)
    }

    /// Checks if an entity is live.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.is_alive(id)
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Attaches the types in `mask`, returning the residual mask.
    ///
    /// # Errors
    ///
    /// See [`EntityRegistry::add_components`].
    pub fn add_components(&mut self, mask: ComponentMask, id: EntityId) -> EcsResult<ComponentMask> {
        self.entities.add_components(&mut self.components, mask, id)
    }

    /// Detaches the types in `mask`, returning the residual mask.
    ///
    /// # Errors
    ///
    /// See [`EntityRegistry::remove_components`].
    pub fn remove_components(&mut self, mask: ComponentMask, id: EntityId) -> EcsResult<ComponentMask> {
        self.entities.remove_components(&mut self.components, mask, id)
    }

    /// Bytes of one of an entity's components.
    ///
    /// # Errors
    ///
    /// See [`EntityRegistry::component`].
    pub fn component_for_entity(&self, mask: ComponentMask, id: EntityId) -> EcsResult<&[u8]> {
        self.entities.component(&self.components, mask, id)
    }

    /// Bytes of one of an entity's components, mutably.
    ///
    /// # Errors
    ///
    /// See [`EntityRegistry::component`].
    pub fn component_for_entity_mut(&mut self, mask: ComponentMask, id: EntityId) -> EcsResult<&mut [u8]> {
        self.entities.component_mut(&mut self.components, mask, id)
    }

    /// An entity's component mask.
    ///
    /// # Errors
    ///
    /// [`EcsError::InactiveEntity`] if the entity is not live.
    pub fn component_mask(&self, id: EntityId) -> EcsResult<ComponentMask> {
        self.entities.component_mask(id)
    }

    /// Record of a live entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::InactiveEntity`] if the entity is not live.
    pub fn entity_record(&self, id: EntityId) -> EcsResult<&EntityRecord> {
        self.entities.record(id)
    }

    /// Live entities matching `mask` under `mode`, in ascending ID order.
    #[must_use]
    pub fn entities_matching_mask(&self, mask: ComponentMask, mode: MaskMatchMode) -> Vec<EntityId> {
        self.entities.entities_matching_mask(mask, mode)
    }

    // ---------------------------------------------------------------
    // Typed access
    // ---------------------------------------------------------------

    /// Attaches `T` to an entity, initialized from its template.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownType`] if `T` is not registered,
    /// [`EcsError::InactiveEntity`] if the entity is not live,
    /// [`EcsError::AlreadyAttached`] if the entity already has `T`.
    pub fn add<T: Component>(&mut self, id: EntityId) -> EcsResult<()> {
        let mask = self.components.mask_of::<T>()?;
        if self.entities.record(id)?.has(mask) {
            tracing::warn!(entity = %id, mask = %mask, "entity already has component");
            return Err(EcsError::AlreadyAttached { entity: id, mask });
        }
        let residual = self.entities.add_components(&mut self.components, mask, id)?;
        if residual.is_empty() {
            Ok(())
        } else {
            Err(EcsError::UnregisteredType { mask: residual })
        }
    }

    /// Attaches `T` to an entity if it lacks it, then stores `value`.
    ///
    /// The initialize hook runs on allocation, before `value` is written.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownType`] if `T` is not registered,
    /// [`EcsError::InactiveEntity`] if the entity is not live.
    pub fn insert<T: Component>(&mut self, id: EntityId, value: T) -> EcsResult<()> {
        let mask = self.components.mask_of::<T>()?;
        let has = self.entities.record(id)?.has(mask);
        if !has {
            let residual = self.entities.add_components(&mut self.components, mask, id)?;
            if !residual.is_empty() {
                return Err(EcsError::UnregisteredType { mask: residual });
            }
        }
        *self.get_mut::<T>(id)? = value;
        Ok(())
    }

    /// Typed view of an entity's `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownType`] if `T` is not registered, otherwise as
    /// [`component_for_entity`](Self::component_for_entity).
    pub fn get<T: Component>(&self, id: EntityId) -> EcsResult<&T> {
        let mask = self.components.mask_of::<T>()?;
        let slot = self.entities.slot_of(mask, id)?;
        self.components.pool(mask)?.get_as::<T>(slot)
    }

    /// Typed mutable view of an entity's `T`.
    ///
    /// # Errors
    ///
    /// As [`get`](Self::get).
    pub fn get_mut<T: Component>(&mut self, id: EntityId) -> EcsResult<&mut T> {
        let mask = self.components.mask_of::<T>()?;
        let slot = self.entities.slot_of(mask, id)?;
        self.components.pool_mut(mask)?.get_as_mut::<T>(slot)
    }

    /// Iterates `(owner, &T)` over every live `T`, in slot order.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownType`] if `T` is not registered.
    pub fn components_of<T: Component>(&self) -> EcsResult<impl Iterator<Item = (EntityId, &T)> + '_> {
        let mask = self.components.mask_of::<T>()?;
        let pool = self.components.pool(mask)?;
        let values = pool.component_buffer().iter_active_as::<T>()?;
        Ok(values.filter_map(move |(slot, value)| pool.owner(slot).map(|owner| (owner, value))))
    }
}

impl Default for EcsContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EcsContext {
    fn drop(&mut self) {
        tracing::info!(
            entities = self.entities.len(),
            component_types = self.components.len(),
            "shutting down ECS context"
        );
    }
}
