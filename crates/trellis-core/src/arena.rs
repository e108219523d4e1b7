//! Runtime arena
//!
//! Fixed-size indexed store holding singleton instances for one application
//! lifetime. Slots are reserved through an [`ArenaLayout`] while the build
//! phase sizes the graph, written exactly once during dependency-ordered
//! initialization, and read many times after the arena is frozen.
//!
//! ```text
//! ArenaLayout::reserve()  →  Arena::store()  →  Arena::freeze()
//!      (build, sizing)        (init, once)       (launch, read-only)
//! ```
//!
//! The write→read transition is explicit: [`Arena::freeze`] consumes the
//! write-phase value and yields a [`FrozenArena`], so launch-phase code can
//! never observe a half-populated store.

use std::any::Any;
use std::sync::Arc;

use crate::error::{Error, Result};

/// A value held in (or produced into) the arena
pub type SharedValue = Arc<dyn Any + Send + Sync>;

/// A reserved arena index, handed out during the build phase
///
/// Handles are monotonically increasing and never reused within one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotHandle(usize);

impl SlotHandle {
    /// The underlying slot index
    pub fn index(self) -> usize {
        self.0
    }
}

/// Build-phase slot reservation counter
///
/// Each participant that needs runtime storage reserves a slot here; the
/// final count sizes the [`Arena`].
#[derive(Debug, Default)]
pub struct ArenaLayout {
    next: usize,
}

impl ArenaLayout {
    /// Create an empty layout
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next slot
    pub fn reserve(&mut self) -> SlotHandle {
        let handle = SlotHandle(self.next);
        self.next += 1;
        handle
    }

    /// Number of slots reserved so far
    pub fn len(&self) -> usize {
        self.next
    }

    /// Whether no slot has been reserved
    pub fn is_empty(&self) -> bool {
        self.next == 0
    }

    /// Allocate the arena sized to this layout
    pub fn build(self) -> Arena {
        Arena::with_size(self.next)
    }
}

/// Read access to slot contents, common to both arena phases
///
/// Producer accessors take the arena through this trait so the same
/// closure serves dependency-ordered initialization (against [`Arena`])
/// and launch-phase invocation (against [`FrozenArena`]).
pub trait ArenaRead {
    /// Read a slot's contents, `None` before the slot is written
    fn read_slot(&self, slot: SlotHandle) -> Option<SharedValue>;
}

/// Write-phase arena: a flat slot array with write-once discipline
#[derive(Debug)]
pub struct Arena {
    slots: Vec<Option<SharedValue>>,
}

impl Arena {
    /// Create an arena with a fixed number of empty slots
    pub fn with_size(size: usize) -> Self {
        Self {
            slots: (0..size).map(|_| None).collect(),
        }
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the arena has no slots
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Write a value into a slot
    ///
    /// Fails with [`Error::DuplicateSlotWrite`] if the slot already holds a
    /// value. A duplicate write signals a defect in graph construction and
    /// is never recoverable.
    pub fn store(&mut self, slot: SlotHandle, value: SharedValue) -> Result<()> {
        let cell = self
            .slots
            .get_mut(slot.index())
            .ok_or_else(|| Error::internal(format!("slot {} out of bounds", slot.index())))?;
        if cell.is_some() {
            return Err(Error::DuplicateSlotWrite {
                index: slot.index(),
            });
        }
        *cell = Some(value);
        Ok(())
    }

    /// Read a slot's contents
    ///
    /// Returns `None` before the slot is written. Resolution order
    /// guarantees correct callers never observe that.
    pub fn read(&self, slot: SlotHandle) -> Option<SharedValue> {
        self.slots.get(slot.index()).and_then(Clone::clone)
    }

    /// Read and downcast a slot's contents
    pub fn get<T: Any + Send + Sync>(&self, slot: SlotHandle) -> Result<Arc<T>> {
        let value = self.read(slot).ok_or_else(|| {
            Error::internal(format!("slot {} read before it was written", slot.index()))
        })?;
        value.downcast::<T>().map_err(|_| {
            Error::type_mismatch(format!("slot {}", slot.index()), std::any::type_name::<T>())
        })
    }

    /// Transition to the read phase
    ///
    /// Fails if any slot is still empty: a partially populated arena means
    /// resolution did not cover every reserved slot.
    pub fn freeze(self) -> Result<FrozenArena> {
        if let Some(index) = self.slots.iter().position(Option::is_none) {
            return Err(Error::internal(format!(
                "cannot freeze arena: slot {} was never written",
                index
            )));
        }
        Ok(FrozenArena { slots: self.slots })
    }
}

impl ArenaRead for Arena {
    fn read_slot(&self, slot: SlotHandle) -> Option<SharedValue> {
        self.read(slot)
    }
}

/// Read-phase arena: immutable, shareable across threads
#[derive(Debug)]
pub struct FrozenArena {
    slots: Vec<Option<SharedValue>>,
}

impl FrozenArena {
    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the arena has no slots
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Read a slot's contents
    pub fn read(&self, slot: SlotHandle) -> SharedValue {
        // Freeze verified every slot is populated.
        self.slots[slot.index()]
            .clone()
            .unwrap_or_else(|| unreachable!("frozen arena slot {} empty", slot.index()))
    }

    /// Read and downcast a slot's contents
    pub fn get<T: Any + Send + Sync>(&self, slot: SlotHandle) -> Result<Arc<T>> {
        self.read(slot).downcast::<T>().map_err(|_| {
            Error::type_mismatch(format!("slot {}", slot.index()), std::any::type_name::<T>())
        })
    }
}

impl ArenaRead for FrozenArena {
    fn read_slot(&self, slot: SlotHandle) -> Option<SharedValue> {
        Some(self.read(slot))
    }
}
