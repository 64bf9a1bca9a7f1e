//! # MOSAIC Core
//!
//! Storage core of an Entity Component System:
//! - Component types registered at runtime, one bit of a 64-bit mask each
//! - One growable, type-erased pool of fixed-size slots per type
//! - Entities as recycled IDs with a mask and one slot per attached type
//!
//! ## Architecture Rules
//!
//! 1. **Dense storage** - every type's instances live in one contiguous buffer
//! 2. **Stable slots** - a slot index stays valid across growth until returned
//! 3. **No sentinels** - every fallible operation returns [`EcsResult`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use mosaic_core::{EcsContext, MaskMatchMode};
//!
//! let mut ecs = EcsContext::new();
//! let pos = ecs.register_default::<Position>("Position")?;
//! let vel = ecs.register_default::<Velocity>("Velocity")?;
//!
//! let e = ecs.create_entity();
//! ecs.add_components(pos | vel, e)?;
//! let moving = ecs.entities_matching_mask(pos | vel, MaskMatchMode::Partial);
//! ```

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod memory;
pub mod sync;

pub use config::{EngineConfig, GrowthPolicy};
pub use ecs::{
    Component, ComponentBuffer, ComponentDescriptor, ComponentMask, ComponentPool, ComponentRegistry,
    EcsContext, EntityId, EntityRecord, EntityRegistry, MaskMatchMode, SlotHooks, MAX_COMPONENT_TYPES,
};
pub use error::{EcsError, EcsResult};
pub use memory::{IdBank, SlotArena};
pub use sync::{ContextReadHandle, ContextWriteHandle, SharedContext};
