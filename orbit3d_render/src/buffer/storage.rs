//! Storage capability behind every hardware buffer
//!
//! A render system plugs its device memory in by implementing
//! [`BufferStorage`] and handing a [`HardwareBufferFactory`] to the
//! [`HardwareBufferManager`](super::HardwareBufferManager).
//! [`SoftwareBufferStorage`] is the pure in-memory realization used when no
//! device is present and for shadow copies.

use crate::config::RenderSystemCapabilities;
use crate::error::{Error, Result};
use super::usage::{BufferUsage, LockMode};

// ===== BUFFER STORAGE =====

/// Raw byte-addressable memory with a lock primitive
///
/// Bounds and lock-state validation is done by
/// [`HardwareBuffer`](super::HardwareBuffer) before any of these methods
/// is called.
pub trait BufferStorage: Send {
    /// Size in bytes
    fn size(&self) -> usize;

    /// Prepare `[offset, offset + length)` for CPU access
    fn lock_impl(&mut self, offset: usize, length: usize, mode: LockMode) -> Result<()>;

    /// Bytes of the region prepared by the last `lock_impl`
    fn locked_bytes(&mut self, offset: usize, length: usize) -> Result<&mut [u8]>;

    /// Flush the region prepared by the last `lock_impl`
    fn unlock_impl(&mut self) -> Result<()>;

    /// Copy `dst.len()` bytes starting at `offset` into `dst`
    fn read_data(&self, offset: usize, dst: &mut [u8]) -> Result<()>;

    /// Copy `src` into the storage starting at `offset`
    ///
    /// `discard_whole` allows the storage to drop contents outside the
    /// written range.
    fn write_data(&mut self, offset: usize, src: &[u8], discard_whole: bool) -> Result<()>;

    /// Copy directly from another storage of the same backend
    ///
    /// Backends without a device-side copy keep the default, and callers
    /// fall back to a read followed by a write.
    fn copy_from_storage(
        &mut self,
        _src: &dyn BufferStorage,
        _src_offset: usize,
        _dst_offset: usize,
        _length: usize,
    ) -> Result<()> {
        Err(Error::Unimplemented("device-side buffer copy".to_string()))
    }

    /// True when the bytes live in CPU memory
    fn is_system_memory(&self) -> bool {
        false
    }
}

// ===== SOFTWARE STORAGE =====

/// In-memory storage
///
/// Backed by `u32` words so that any locked region starting at a multiple of
/// 4 bytes can be viewed as `f32`, `u32` or `u16` without copying.
pub struct SoftwareBufferStorage {
    words: Vec<u32>,
    size: usize,
}

impl SoftwareBufferStorage {
    pub fn new(size: usize) -> Self {
        Self {
            words: vec![0; size.div_ceil(4)],
            size,
        }
    }

    /// Whole contents as bytes
    pub fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u32, u8>(&self.words)[..self.size]
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u32, u8>(&mut self.words)[..self.size]
    }

    fn check_range(&self, offset: usize, length: usize) -> Result<()> {
        match offset.checked_add(length) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(Error::BoundsViolation(format!(
                "range {}+{} exceeds software buffer of {} bytes",
                offset, length, self.size
            ))),
        }
    }
}

impl BufferStorage for SoftwareBufferStorage {
    fn size(&self) -> usize {
        self.size
    }

    fn lock_impl(&mut self, offset: usize, length: usize, _mode: LockMode) -> Result<()> {
        self.check_range(offset, length)
    }

    fn locked_bytes(&mut self, offset: usize, length: usize) -> Result<&mut [u8]> {
        self.check_range(offset, length)?;
        Ok(&mut self.bytes_mut()[offset..offset + length])
    }

    fn unlock_impl(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_data(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        self.check_range(offset, dst.len())?;
        dst.copy_from_slice(&self.bytes()[offset..offset + dst.len()]);
        Ok(())
    }

    fn write_data(&mut self, offset: usize, src: &[u8], _discard_whole: bool) -> Result<()> {
        self.check_range(offset, src.len())?;
        self.bytes_mut()[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }

    fn is_system_memory(&self) -> bool {
        true
    }
}

// ===== FACTORY =====

/// Render-system boundary used by the buffer manager
pub trait HardwareBufferFactory: Send {
    /// Allocate storage for a new buffer
    fn create_storage(&self, size: usize, usage: BufferUsage) -> Result<Box<dyn BufferStorage>>;

    /// Capabilities of the render system behind this factory
    fn capabilities(&self) -> &RenderSystemCapabilities;
}

/// Factory creating software storage, used when no device is active
pub struct DefaultBufferFactory {
    capabilities: RenderSystemCapabilities,
}

impl DefaultBufferFactory {
    pub fn new() -> Self {
        Self {
            capabilities: RenderSystemCapabilities::new().with_instance_data(true),
        }
    }

    pub fn with_capabilities(capabilities: RenderSystemCapabilities) -> Self {
        Self { capabilities }
    }
}

impl Default for DefaultBufferFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareBufferFactory for DefaultBufferFactory {
    fn create_storage(&self, size: usize, _usage: BufferUsage) -> Result<Box<dyn BufferStorage>> {
        Ok(Box::new(SoftwareBufferStorage::new(size)))
    }

    fn capabilities(&self) -> &RenderSystemCapabilities {
        &self.capabilities
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
