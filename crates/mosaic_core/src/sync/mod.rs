//! # Synchronization
//!
//! The context itself is single-threaded: `&mut` for mutation, `&` for
//! reads. Sharing across threads goes through [`SharedContext`], which puts
//! the whole context behind one reader-writer lock.
//!
//! ```text
//! Thread 1 (logic):   write() -> add/remove/destroy
//! Thread 2 (systems): read()  -> component buffers, queries
//! ```

mod shared;

pub use shared::{ContextReadHandle, ContextWriteHandle, SharedContext};
