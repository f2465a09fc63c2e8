//! Buffer usage hints, lock modes and index widths

use bitflags::bitflags;

bitflags! {
    /// Usage hints passed to the render system when a buffer is created
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Written once, read many times
        const STATIC = 1 << 0;
        /// Rewritten frequently
        const DYNAMIC = 1 << 1;
        /// The CPU never reads the contents back
        const WRITE_ONLY = 1 << 2;
        /// Contents may be thrown away on every lock
        const DISCARDABLE = 1 << 3;

        const STATIC_WRITE_ONLY = Self::STATIC.bits() | Self::WRITE_ONLY.bits();
        const DYNAMIC_WRITE_ONLY = Self::DYNAMIC.bits() | Self::WRITE_ONLY.bits();
        const DYNAMIC_WRITE_ONLY_DISCARDABLE =
            Self::DYNAMIC.bits() | Self::WRITE_ONLY.bits() | Self::DISCARDABLE.bits();
    }
}

impl BufferUsage {
    /// Usage requested from the device when a shadow copy serves every read
    pub fn for_shadowed_device(self) -> Self {
        if self.intersects(BufferUsage::STATIC | BufferUsage::DYNAMIC) {
            self | BufferUsage::WRITE_ONLY
        } else {
            self
        }
    }
}

/// Access mode of a buffer lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Read and write, existing contents preserved
    Normal,
    /// Whole buffer contents may be discarded
    Discard,
    /// No writes; a shadowed buffer is not marked dirty
    ReadOnly,
    /// Caller promises not to touch regions in flight on the device
    NoOverwrite,
}

/// Width of the indices stored in an index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    /// Size in bytes of one index
    pub fn size_bytes(&self) -> usize {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}
