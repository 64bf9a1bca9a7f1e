//! # Shared ECS Context
//!
//! Cross-thread access to one [`EcsContext`] through a reader-writer lock.
//!
//! ## Access Rules
//!
//! - `ContextWriteHandle`: exclusive access, one at a time
//! - `ContextReadHandle`: shared access, many allowed
//! - Handles release the lock on drop
//!
//! Borrowed component bytes never outlive the handle they came from, so no
//! caller can observe a pool mid-growth.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::EngineConfig;
use crate::ecs::EcsContext;
use crate::error::EcsResult;

/// Clonable, thread-safe handle to one context.
///
/// ## Usage
///
/// ```rust,ignore
/// let shared = SharedContext::new(EcsContext::new());
///
/// let worker = shared.clone();
/// std::thread::spawn(move || {
///     let mut ecs = worker.write();
///     let e = ecs.create_entity();
///     ecs.add_components(health, e).ok();
/// });
///
/// let ecs = shared.read();
/// let alive = ecs.entity_count();
/// ```
#[derive(Clone, Debug)]
pub struct SharedContext {
    inner: Arc<RwLock<EcsContext>>,
}

impl SharedContext {
    /// Wraps an existing context.
    #[must_use]
    pub fn new(context: EcsContext) -> Self {
        Self {
            inner: Arc::new(RwLock::new(context)),
        }
    }

    /// Builds a context from a configuration and wraps it.
    ///
    /// # Errors
    ///
    /// As [`EcsContext::with_config`].
    pub fn with_config(config: EngineConfig) -> EcsResult<Self> {
        EcsContext::with_config(config).map(Self::new)
    }

    /// Blocks until shared access is available.
    #[must_use]
    pub fn read(&self) -> ContextReadHandle<'_> {
        ContextReadHandle {
            guard: self.inner.read(),
        }
    }

    /// Blocks until exclusive access is available.
    #[must_use]
    pub fn write(&self) -> ContextWriteHandle<'_> {
        ContextWriteHandle {
            guard: self.inner.write(),
        }
    }

    /// Shared access if no writer holds the lock.
    #[must_use]
    pub fn try_read(&self) -> Option<ContextReadHandle<'_>> {
        self.inner.try_read().map(|guard| ContextReadHandle { guard })
    }

    /// Exclusive access if nobody holds the lock.
    #[must_use]
    pub fn try_write(&self) -> Option<ContextWriteHandle<'_>> {
        self.inner.try_write().map(|guard| ContextWriteHandle { guard })
    }

    /// Runs `f` with exclusive access and returns its result.
    pub fn with_write<R>(&self, f: impl FnOnce(&mut EcsContext) -> R) -> R {
        f(&mut self.write())
    }

    /// Returns whether a write handle is currently held.
    #[inline]
    #[must_use]
    pub fn is_write_locked(&self) -> bool {
        self.inner.is_locked_exclusive()
    }

    /// Number of clones of this handle.
    #[inline]
    #[must_use]
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

/// Shared access to the context.
#[derive(Debug)]
pub struct ContextReadHandle<'a> {
    guard: RwLockReadGuard<'a, EcsContext>,
}

impl Deref for ContextReadHandle<'_> {
    type Target = EcsContext;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

/// Exclusive access to the context.
#[derive(Debug)]
pub struct ContextWriteHandle<'a> {
    guard: RwLockWriteGuard<'a, EcsContext>,
}

impl Deref for ContextWriteHandle<'_> {
    type Target = EcsContext;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl DerefMut for ContextWriteHandle<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}
