//! # Core Error Types
//!
//! All errors that can occur in the storage core.
//!
//! Every failure is local to the call that produced it. Contract violations
//! (bad masks, dead entities, inactive slots) are reported here instead of
//! panicking so the caller can decide whether to retry or ignore them.

use crate::ecs::{ComponentMask, EntityId};
use thiserror::Error;

/// Errors that can occur in the storage core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// A mask with no bits set was supplied where at least one type is required.
    #[error("invalid component mask: {mask}")]
    InvalidMask {
        /// The offending mask.
        mask: ComponentMask,
    },

    /// The mask must name exactly one component type.
    #[error("mask {mask} does not name exactly one component type")]
    NotSingleType {
        /// The offending mask.
        mask: ComponentMask,
    },

    /// The mask names a type bit that has no registered pool.
    #[error("component type {mask} is not registered")]
    UnregisteredType {
        /// The offending mask.
        mask: ComponentMask,
    },

    /// The Rust type was never registered with the component registry.
    #[error("component type `{type_name}` is not registered")]
    UnknownType {
        /// `std::any::type_name` of the requested type.
        type_name: &'static str,
    },

    /// The Rust type already owns a component bit.
    #[error("component type `{name}` is already registered as {mask}")]
    AlreadyRegistered {
        /// Registered name of the type.
        name: String,
        /// The bit it already owns.
        mask: ComponentMask,
    },

    /// All component type bits are taken.
    #[error("component registry full: {max} types registered")]
    RegistryFull {
        /// Maximum number of registrable types.
        max: u32,
    },

    /// The slot layout cannot be stored in a pool.
    #[error("unsupported slot layout for `{name}`: size {size}, align {align}")]
    UnsupportedLayout {
        /// Registered name of the type.
        name: String,
        /// Slot byte size.
        size: usize,
        /// Required alignment.
        align: usize,
    },

    /// The type cannot be unregistered while entities still hold its slots.
    #[error("component type `{name}` ({mask}) still has {active} active slots")]
    TypeInUse {
        /// Registered name of the type.
        name: String,
        /// The type's bit.
        mask: ComponentMask,
        /// Slots still allocated.
        active: u32,
    },

    /// The entity ID is not currently live.
    #[error("entity {entity} is not active")]
    InactiveEntity {
        /// The offending entity.
        entity: EntityId,
    },

    /// The entity is live but lacks the requested component type.
    #[error("entity {entity} has no component of type {mask}")]
    MissingComponent {
        /// The entity that was queried.
        entity: EntityId,
        /// The requested type.
        mask: ComponentMask,
    },

    /// The entity already has the component type.
    #[error("entity {entity} already has a component of type {mask}")]
    AlreadyAttached {
        /// The entity that was targeted.
        entity: EntityId,
        /// The requested type.
        mask: ComponentMask,
    },

    /// The slot index is within capacity but not allocated.
    #[error("slot {slot} of `{component}` is not active")]
    InactiveSlot {
        /// Pool name.
        component: String,
        /// The offending slot index.
        slot: u32,
    },

    /// The slot index is beyond the pool's capacity.
    #[error("slot {slot} of `{component}` is out of range (capacity {capacity})")]
    SlotOutOfRange {
        /// Pool name.
        component: String,
        /// The offending slot index.
        slot: u32,
        /// Current pool capacity.
        capacity: u32,
    },

    /// A typed view was requested with a type whose size differs from the slot size.
    #[error("type `{type_name}` ({size} bytes) does not match `{component}` slots ({slot_size} bytes)")]
    TypeMismatch {
        /// Pool name.
        component: String,
        /// Requested type.
        type_name: &'static str,
        /// Size of the requested type.
        size: usize,
        /// Slot size of the pool.
        slot_size: usize,
    },

    /// An entity is marked active but the registry holds no record for it.
    #[error("entity {entity} is marked active but has no record")]
    MissingRecord {
        /// The entity whose record is missing.
        entity: EntityId,
    },

    /// Invalid engine configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read a configuration file.
    #[error("failed to read configuration: {0}")]
    Io(String),
}

/// Result type for storage core operations.
pub type EcsResult<T> = Result<T, EcsError>;
