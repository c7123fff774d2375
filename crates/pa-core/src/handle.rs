use core::fmt;
use core::num::NonZeroU32;

/// Opaque handle to an object living inside the simulator.
///
/// - `u32` keeps memory small
/// - `NonZero` enables `Option<Handle>` to be pointer-optimized
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(NonZeroU32);

impl Handle {
    /// Create a handle from a 0-based index by storing index+1.
    ///
    /// Returns `None` for `u32::MAX`, whose successor does not fit.
    pub fn from_index(index: u32) -> Option<Self> {
        index.checked_add(1).and_then(NonZeroU32::new).map(Self)
    }

    /// Recover the 0-based index.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.index())
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Domain-specific handle aliases for clarity (no runtime cost).
pub type ConnectionHandle = Handle;
pub type ProjectHandle = Handle;
pub type FlowsheetHandle = Handle;
pub type ShapeHandle = Handle;

/// Monotonic handle allocator.
#[derive(Debug, Default, Clone)]
pub struct HandleAllocator {
    next: u32,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> Option<Handle> {
        let handle = Handle::from_index(self.next)?;
        self.next += 1;
        Some(handle)
    }
}
