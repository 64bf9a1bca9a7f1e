//! # Memory Management
//!
//! Building blocks for component storage.
//!
//! ## Design Philosophy
//!
//! - Slot storage is a single owned buffer per component type
//! - Callers address storage by index, never by address
//! - Indices are recycled, buffers only ever grow

mod arena;
mod id_bank;

pub use arena::{SlotArena, MAX_SLOT_ALIGN};
pub use id_bank::IdBank;
