//! # Entity Component System
//!
//! Mask-addressed component storage.
//!
//! ## Layout
//!
//! - Every component type owns one bit of a 64-bit [`ComponentMask`]
//! - Each type lives in its own [`ComponentPool`] of fixed-size byte slots
//! - Entities are IDs plus a record of their mask and one slot per type
//! - Slot and entity IDs are recycled lowest-first

mod component;
mod context;
mod entities;
mod entity;
mod mask;
mod pool;
mod registry;

pub use component::{Component, ComponentDescriptor, SlotHook, SlotHooks};
pub use context::EcsContext;
pub use entities::EntityRegistry;
pub use entity::{EntityId, EntityRecord};
pub use mask::{ComponentMask, MaskBits, MaskMatchMode, MAX_COMPONENT_TYPES};
pub use pool::{ComponentBuffer, ComponentPool};
pub use registry::ComponentRegistry;
