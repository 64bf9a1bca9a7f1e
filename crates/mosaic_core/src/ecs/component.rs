//! # Component Types
//!
//! Components are plain data. The pools that hold them only ever see bytes;
//! everything type-specific a pool needs (slot size, template, lifecycle
//! hooks) is captured once in a [`ComponentDescriptor`] at registration.

use bytemuck::Pod;

use crate::error::{EcsError, EcsResult};
use crate::memory::MAX_SLOT_ALIGN;

/// Trait for typed ECS components.
///
/// Components must be:
/// - `Pod`: plain old data, any slot byte pattern written by the pool is valid
/// - `Default`: used as the template when none is supplied
/// - `Send + Sync`: the context may be shared behind an external lock
///
/// The lifecycle hooks run in place on the pool slot: `initialize` when the
/// slot is handed out, `destroy` when it is returned or the pool is dropped.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Default, Pod, Zeroable)]
/// #[repr(C)]
/// struct Health {
///     current: u32,
///     max: u32,
/// }
///
/// impl Component for Health {
///     fn initialize(&mut self) {
///         self.current = self.max;
///     }
/// }
/// ```
pub trait Component: Pod + Default + Send + Sync + 'static {
    /// Runs on the slot right after it is allocated.
    fn initialize(&mut self) {}

    /// Runs on the slot before it is reset to the template.
    fn destroy(&mut self) {}
}

/// Lifecycle callback operating on the raw bytes of one slot.
pub type SlotHook = fn(&mut [u8]);

/// Per-type lifecycle callbacks.
#[derive(Clone, Copy, Debug)]
pub struct SlotHooks {
    /// Called on allocation.
    pub initialize: SlotHook,
    /// Called on return and on pool teardown.
    pub destroy: SlotHook,
    /// Slot size and alignment the callbacks reinterpret, if they are typed.
    pub layout: Option<(usize, usize)>,
}

impl SlotHooks {
    /// Hooks that do nothing.
    pub const NONE: Self = Self {
        initialize: noop,
        destroy: noop,
        layout: None,
    };

    /// Hooks forwarding to `T`'s [`Component`] implementation.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self {
            initialize: initialize_slot::<T>,
            destroy: destroy_slot::<T>,
            layout: Some((std::mem::size_of::<T>(), std::mem::align_of::<T>())),
        }
    }
}

impl Default for SlotHooks {
    fn default() -> Self {
        Self::NONE
    }
}

fn noop(_: &mut [u8]) {}

// Slots that do not fit `T` are skipped; `validate` rejects such descriptors.
fn initialize_slot<T: Component>(bytes: &mut [u8]) {
    if let Ok(value) = bytemuck::try_from_bytes_mut::<T>(bytes) {
        value.initialize();
    }
}

fn destroy_slot<T: Component>(bytes: &mut [u8]) {
    if let Ok(value) = bytemuck::try_from_bytes_mut::<T>(bytes) {
        value.destroy();
    }
}

/// Everything a pool needs to know about one component type.
#[derive(Clone, Debug)]
pub struct ComponentDescriptor {
    /// Human-readable name, used in logs and errors.
    pub name: String,
    /// Bytes of the template instance; its length is the slot size.
    pub template: Vec<u8>,
    /// Required slot alignment.
    pub align: usize,
    /// Slots allocated up front.
    pub initial_capacity: u32,
    /// Lifecycle callbacks.
    pub hooks: SlotHooks,
}

impl ComponentDescriptor {
    /// Describes a typed component with `template` as its prototype.
    #[must_use]
    pub fn of<T: Component>(template: T, initial_capacity: u32, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: bytemuck::bytes_of(&template).to_vec(),
            align: std::mem::align_of::<T>(),
            initial_capacity,
            hooks: SlotHooks::of::<T>(),
        }
    }

    /// Describes an untyped component from its template bytes.
    ///
    /// The hooks default to no-ops; see [`with_hooks`](Self::with_hooks).
    #[must_use]
    pub fn from_bytes(
        name: impl Into<String>,
        template: &[u8],
        align: usize,
        initial_capacity: u32,
    ) -> Self {
        Self {
            name: name.into(),
            template: template.to_vec(),
            align,
            initial_capacity,
            hooks: SlotHooks::NONE,
        }
    }

    /// Replaces the lifecycle callbacks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: SlotHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Bytes per slot.
    #[inline]
    #[must_use]
    pub fn slot_size(&self) -> usize {
        self.template.len()
    }

    /// Checks that the layout can live in a slot arena.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnsupportedLayout`] for zero-sized slots, alignments that
    /// are not a power of two or exceed [`MAX_SLOT_ALIGN`], and slot sizes
    /// that are not a multiple of the alignment. Typed hooks must also agree
    /// with the slot: same size, alignment no stricter than `align`.
    pub fn validate(&self) -> EcsResult<()> {
        let size = self.slot_size();
        let align = self.align;
        if size == 0 || !align.is_power_of_two() || align > MAX_SLOT_ALIGN || size % align != 0 {
            return Err(EcsError::UnsupportedLayout {
                name: self.name.clone(),
                size,
                align,
            });
        }
        if let Some((hook_size, hook_align)) = self.hooks.layout {
            if hook_size != size || hook_align > align {
                tracing::warn!(
                    component = %self.name,
                    size,
                    align,
                    hook_size,
                    hook_align,
                    "lifecycle hooks expect a different slot layout"
                );
                return Err(EcsError::UnsupportedLayout {
                    name: self.name.clone(),
                    size,
                    align,
                });
            }
        }
        Ok(())
    }
}
