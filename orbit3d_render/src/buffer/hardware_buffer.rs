/// Lockable buffer with optional software shadow.
///
/// A HardwareBuffer owns a [`BufferStorage`] (device or software memory) and
/// tracks the single outstanding lock. When a shadow is attached every lock
/// and read is served from the shadow, and dirty ranges are pushed back to
/// the device storage on unlock unless hardware updates are suppressed.
///
/// State machine: Unlocked ⇄ Locked(offset, length, mode).

use bytemuck::Pod;
use crate::error::{Error, Result};
use crate::orbit_err;
use crate::orbit_bail;
use super::storage::{BufferStorage, SoftwareBufferStorage};
use super::usage::{BufferUsage, LockMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LockState {
    offset: usize,
    length: usize,
    mode: LockMode,
}

pub struct HardwareBuffer {
    size: usize,
    usage: BufferUsage,
    storage: Box<dyn BufferStorage>,
    lock: Option<LockState>,
    /// Declared after `storage` so the device side is released first
    shadow: Option<Box<HardwareBuffer>>,
    /// Byte range [start, end) written in the shadow but not on the device
    dirty: Option<(usize, usize)>,
    suppress_hardware_update: bool,
    /// Storage-to-storage copies are attempted only when set
    device_copy: bool,
}

impl HardwareBuffer {
    /// Wrap a storage, optionally mirrored by a shadow of the same size
    ///
    /// With a shadow, `STATIC` / `DYNAMIC` usages become write-only on the
    /// device side.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidResource` if the shadow size differs from the
    /// storage size.
    pub fn new(
        storage: Box<dyn BufferStorage>,
        usage: BufferUsage,
        shadow: Option<HardwareBuffer>,
    ) -> Result<Self> {
        let size = storage.size();
        if let Some(shadow) = &shadow {
            if shadow.size() != size {
                orbit_bail!("orbit3d::HardwareBuffer",
                    "Shadow buffer size {} does not match buffer size {}", shadow.size(), size);
            }
        }
        let usage = if shadow.is_some() { usage.for_shadowed_device() } else { usage };
        Ok(Self {
            size,
            usage,
            storage,
            lock: None,
            shadow: shadow.map(Box::new),
            dirty: None,
            suppress_hardware_update: false,
            device_copy: false,
        })
    }

    /// Pure in-memory buffer without shadow
    pub fn software(size: usize, usage: BufferUsage) -> Self {
        Self {
            size,
            usage,
            storage: Box::new(SoftwareBufferStorage::new(size)),
            lock: None,
            shadow: None,
            dirty: None,
            suppress_hardware_update: false,
            device_copy: false,
        }
    }

    // ===== ACCESSORS =====

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn device_copy(&self) -> bool {
        self.device_copy
    }

    /// Let `copy_from` use the storage's device-side copy
    pub fn set_device_copy(&mut self, enabled: bool) {
        self.device_copy = enabled;
    }

    pub fn has_shadow(&self) -> bool {
        self.shadow.is_some()
    }

    pub fn shadow(&self) -> Option<&HardwareBuffer> {
        self.shadow.as_deref()
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    pub fn lock_mode(&self) -> Option<LockMode> {
        self.lock.map(|state| state.mode)
    }

    /// `(offset, length)` of the outstanding lock
    pub fn locked_range(&self) -> Option<(usize, usize)> {
        self.lock.map(|state| (state.offset, state.length))
    }

    pub fn is_system_memory(&self) -> bool {
        self.storage.is_system_memory()
    }

    /// True when the shadow holds data not yet pushed to the device
    pub fn is_shadow_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    pub fn is_hardware_update_suppressed(&self) -> bool {
        self.suppress_hardware_update
    }

    // ===== LOCKING =====

    /// Lock `[offset, offset + length)` and return the addressable region
    ///
    /// # Errors
    ///
    /// - `Error::StateViolation` if a lock is already outstanding
    /// - `Error::BoundsViolation` if the region exceeds the buffer
    pub fn lock(&mut self, offset: usize, length: usize, mode: LockMode) -> Result<&mut [u8]> {
        if self.lock.is_some() {
            orbit_bail!(StateViolation => "orbit3d::HardwareBuffer", "Buffer is already locked");
        }
        self.check_range(offset, length)?;

        match self.shadow.as_deref_mut() {
            Some(shadow) => {
                shadow.lock(offset, length, mode)?;
                if mode != LockMode::ReadOnly {
                    self.mark_dirty(offset, offset + length);
                }
            }
            None => self.storage.lock_impl(offset, length, mode)?,
        }

        self.lock = Some(LockState { offset, length, mode });
        self.locked_region_mut()
    }

    /// Lock the whole buffer
    pub fn lock_all(&mut self, mode: LockMode) -> Result<&mut [u8]> {
        self.lock(0, self.size, mode)
    }

    /// Region of the outstanding lock
    pub fn locked_region_mut(&mut self) -> Result<&mut [u8]> {
        let state = self.lock.ok_or_else(|| {
            orbit_err!(StateViolation => "orbit3d::HardwareBuffer", "Buffer is not locked")
        })?;
        match self.shadow.as_deref_mut() {
            Some(shadow) => shadow.locked_region_mut(),
            None => self.storage.locked_bytes(state.offset, state.length),
        }
    }

    /// Lock a region and view it as a slice of `T` without copying
    ///
    /// # Errors
    ///
    /// Besides the `lock` errors, returns `Error::InvalidResource` if the
    /// region is not a whole number of aligned `T`.
    pub fn lock_as<T: Pod>(&mut self, offset: usize, length: usize, mode: LockMode) -> Result<&mut [T]> {
        let elem = std::mem::size_of::<T>();
        if elem == 0 || length % elem != 0 || offset % std::mem::align_of::<T>() != 0 {
            orbit_bail!("orbit3d::HardwareBuffer",
                "Region {}+{} cannot be viewed as elements of {} bytes", offset, length, elem);
        }
        let region = self.lock(offset, length, mode)?;
        bytemuck::try_cast_slice_mut(region).map_err(|e| {
            Error::InvalidResource(format!("Locked region cannot be viewed as typed data: {:?}", e))
        })
    }

    /// Release the outstanding lock
    ///
    /// A shadowed buffer pushes the dirty range to the device unless
    /// hardware updates are suppressed.
    ///
    /// # Errors
    ///
    /// Returns `Error::StateViolation` if the buffer is not locked.
    pub fn unlock(&mut self) -> Result<()> {
        if self.lock.take().is_none() {
            orbit_bail!(StateViolation => "orbit3d::HardwareBuffer", "Unlock called on an unlocked buffer");
        }
        match self.shadow.as_deref_mut() {
            Some(shadow) => shadow.unlock()?,
            None => return self.storage.unlock_impl(),
        }
        self.update_from_shadow()
    }

    // ===== SHADOW SYNC =====

    /// Push the dirty shadow range to the device storage
    ///
    /// No-op without a shadow, without pending writes, while suppressed or
    /// while locked. A fully dirty buffer is written with the discard hint.
    pub fn update_from_shadow(&mut self) -> Result<()> {
        if self.suppress_hardware_update || self.lock.is_some() {
            return Ok(());
        }
        let Some((start, end)) = self.dirty else {
            return Ok(());
        };
        let Some(shadow) = self.shadow.as_deref() else {
            return Ok(());
        };

        let mut staging = vec![0u8; end - start];
        shadow.read_data(start, &mut staging)?;
        let discard_whole = start == 0 && end == self.size;
        self.storage.write_data(start, &staging, discard_whole)?;
        self.dirty = None;
        Ok(())
    }

    /// Hold back device updates; lifting the suppression flushes the shadow
    pub fn suppress_hardware_update(&mut self, suppress: bool) -> Result<()> {
        self.suppress_hardware_update = suppress;
        if !suppress {
            self.update_from_shadow()?;
        }
        Ok(())
    }

    // ===== READ / WRITE =====

    /// Bounds-checked copy out of the buffer
    pub fn read_data(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        self.check_unlocked()?;
        self.check_range(offset, dst.len())?;
        match self.shadow.as_deref() {
            Some(shadow) => shadow.read_data(offset, dst),
            None => self.storage.read_data(offset, dst),
        }
    }

    /// Bounds-checked copy into the buffer
    ///
    /// `discard_whole` lets the device drop contents outside the written range.
    pub fn write_data(&mut self, offset: usize, src: &[u8], discard_whole: bool) -> Result<()> {
        self.check_unlocked()?;
        self.check_range(offset, src.len())?;
        match self.shadow.as_deref_mut() {
            Some(shadow) => shadow.write_data(offset, src, discard_whole)?,
            None => return self.storage.write_data(offset, src, discard_whole),
        }
        self.mark_dirty(offset, offset + src.len());
        self.update_from_shadow()
    }

    /// Copy `length` bytes from `src` at `src_offset` to `dst_offset`
    ///
    /// Unshadowed buffers with device copy enabled try the storage's own
    /// copy first; everything else goes through a CPU staging buffer.
    pub fn copy_from(
        &mut self,
        src: &HardwareBuffer,
        src_offset: usize,
        dst_offset: usize,
        length: usize,
        discard_whole: bool,
    ) -> Result<()> {
        src.check_unlocked()?;
        src.check_range(src_offset, length)?;
        self.check_unlocked()?;
        self.check_range(dst_offset, length)?;

        if self.device_copy && self.shadow.is_none() && src.shadow.is_none() {
            match self.storage.copy_from_storage(src.storage.as_ref(), src_offset, dst_offset, length) {
                Err(Error::Unimplemented(_)) => {}
                other => return other,
            }
        }

        let mut staging = vec![0u8; length];
        src.read_data(src_offset, &mut staging)?;
        self.write_data(dst_offset, &staging, discard_whole)
    }

    /// Copy as much of `src` as fits, starting at offset 0 on both sides
    pub fn copy_all_from(&mut self, src: &HardwareBuffer) -> Result<()> {
        let length = self.size.min(src.size);
        self.copy_from(src, 0, 0, length, length == self.size)
    }

    // ===== INTERNAL =====

    fn check_range(&self, offset: usize, length: usize) -> Result<()> {
        match offset.checked_add(length) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(orbit_err!(BoundsViolation => "orbit3d::HardwareBuffer",
                "Region {}+{} exceeds buffer size {}", offset, length, self.size)),
        }
    }

    fn check_unlocked(&self) -> Result<()> {
        if self.lock.is_some() {
            orbit_bail!(StateViolation => "orbit3d::HardwareBuffer",
                "Buffer is locked; unlock it before reading or writing");
        }
        Ok(())
    }

    fn mark_dirty(&mut self, start: usize, end: usize) {
        self.dirty = Some(match self.dirty {
            Some((s, e)) => (s.min(start), e.max(end)),
            None => (start, end),
        });
    }
}

impl std::fmt::Debug for HardwareBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardwareBuffer")
            .field("size", &self.size)
            .field("usage", &self.usage)
            .field("locked", &self.lock)
            .field("has_shadow", &self.shadow.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "hardware_buffer_tests.rs"]
mod tests;
