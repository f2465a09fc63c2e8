/// Hardware buffer manager.
///
/// Owns every live vertex and index buffer of a render context, creates them
/// through a pluggable [`HardwareBufferFactory`], and leases temporary
/// vertex buffer copies (software skinning, morphing, shadow volume
/// extrusion...) to licensees.
///
/// Buffers are addressed by slotmap keys. A licensee only holds a key and a
/// weak reference is kept on it, so an expiring lease never extends its
/// lifetime.
///
/// Lease lifecycle:
/// - `allocate_vertex_buffer_copy` takes a free copy of the same vertex
///   shape or creates one, and records a license
/// - `release_vertex_buffer_copy` (or expiry of an automatic license in
///   `release_buffer_copies`) notifies the licensee and returns the copy to
///   the free list
/// - `free_unused_buffer_copies` destroys the free list

use std::sync::Weak;
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use crate::config::{RenderConfig, RenderSystemCapabilities};
use crate::error::{Error, Result};
use crate::{orbit_bail, orbit_debug, orbit_err, orbit_info, orbit_trace};
use super::hardware_buffer::HardwareBuffer;
use super::storage::HardwareBufferFactory;
use super::typed_buffer::{IndexBuffer, IndexBufferDesc, VertexBuffer, VertexBufferDesc};
use super::usage::BufferUsage;

new_key_type! {
    /// Stable key to a vertex buffer owned by a HardwareBufferManager
    pub struct VertexBufferKey;
    /// Stable key to an index buffer owned by a HardwareBufferManager
    pub struct IndexBufferKey;
}

// ===== LICENSES =====

/// How a temporary copy is given back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferLicenseRelease {
    /// The licensee calls `release_vertex_buffer_copy` itself
    Manual,
    /// The manager reclaims the copy after a number of untouched frames
    Automatic,
}

/// Holder of a temporary vertex buffer copy
pub trait HardwareBufferLicensee: Send + Sync {
    /// The lease on `copy` ended; the key must not be used again
    fn license_expired(&self, copy: VertexBufferKey);
}

struct VertexBufferLicense {
    source: VertexBufferKey,
    release: BufferLicenseRelease,
    expired_delay: u32,
    licensee: Weak<dyn HardwareBufferLicensee>,
}

impl VertexBufferLicense {
    fn notify_expired(&self, copy: VertexBufferKey) {
        if let Some(licensee) = self.licensee.upgrade() {
            licensee.license_expired(copy);
        }
    }
}

// ===== MANAGER =====

pub struct HardwareBufferManager {
    factory: Box<dyn HardwareBufferFactory>,
    vertex_buffers: SlotMap<VertexBufferKey, VertexBuffer>,
    index_buffers: SlotMap<IndexBufferKey, IndexBuffer>,
    /// Source buffer → copies not leased to anyone
    free_copies: FxHashMap<VertexBufferKey, Vec<VertexBufferKey>>,
    /// Leased copy → license
    licenses: FxHashMap<VertexBufferKey, VertexBufferLicense>,
    under_used_frame_count: u32,
    expiry_frames: u32,
    under_used_frame_threshold: u32,
}

impl HardwareBufferManager {
    pub fn new(factory: Box<dyn HardwareBufferFactory>, config: &RenderConfig) -> Self {
        Self {
            factory,
            vertex_buffers: SlotMap::with_key(),
            index_buffers: SlotMap::with_key(),
            free_copies: FxHashMap::default(),
            licenses: FxHashMap::default(),
            under_used_frame_count: 0,
            expiry_frames: config.temp_buffer_expiry_frames.max(1),
            under_used_frame_threshold: config.under_used_frame_threshold,
        }
    }

    pub fn capabilities(&self) -> &RenderSystemCapabilities {
        self.factory.capabilities()
    }

    // ===== CREATION =====

    /// Create a vertex buffer for one source stream of a declaration
    ///
    /// # Errors
    ///
    /// - `Error::InvalidResource` if the declaration has no element for `desc.source`
    /// - `Error::OutOfMemory` if the size overflows
    /// - any error of the factory
    pub fn create_vertex_buffer(&mut self, desc: VertexBufferDesc) -> Result<VertexBufferKey> {
        let vertex_size = desc.declaration.vertex_size(desc.source);
        if vertex_size == 0 {
            orbit_bail!("orbit3d::HardwareBufferManager",
                "Vertex declaration has no element for source {}", desc.source);
        }
        let size = vertex_size.checked_mul(desc.vertex_count).ok_or(Error::OutOfMemory)?;

        let buffer = self.create_hardware_buffer(size, desc.usage, desc.use_shadow)?;
        let vertex_buffer = VertexBuffer::new(
            buffer,
            desc.declaration.elements_for_source(desc.source),
            vertex_size,
            desc.vertex_count,
            self.capabilities().instance_data,
        );
        let key = self.vertex_buffers.insert(vertex_buffer);

        orbit_debug!("orbit3d::HardwareBufferManager",
            "Created vertex buffer {:?} ({} vertices x {} bytes, shadow: {})",
            key, desc.vertex_count, vertex_size, desc.use_shadow);
        Ok(key)
    }

    /// Create an index buffer
    pub fn create_index_buffer(&mut self, desc: IndexBufferDesc) -> Result<IndexBufferKey> {
        let size = desc.index_type.size_bytes()
            .checked_mul(desc.index_count)
            .ok_or(Error::OutOfMemory)?;

        let buffer = self.create_hardware_buffer(size, desc.usage, desc.use_shadow)?;
        let key = self.index_buffers.insert(IndexBuffer::new(buffer, desc.index_type, desc.index_count));

        orbit_debug!("orbit3d::HardwareBufferManager",
            "Created index buffer {:?} ({} x {:?}, shadow: {})",
            key, desc.index_count, desc.index_type, desc.use_shadow);
        Ok(key)
    }

    fn create_hardware_buffer(&self, size: usize, usage: BufferUsage, use_shadow: bool) -> Result<HardwareBuffer> {
        let device_usage = if use_shadow { usage.for_shadowed_device() } else { usage };
        let storage = self.factory.create_storage(size, device_usage)?;
        if storage.size() != size {
            orbit_bail!(BackendError => "orbit3d::HardwareBufferManager",
                "Factory returned {} bytes for a {} byte buffer", storage.size(), size);
        }
        let shadow = use_shadow.then(|| HardwareBuffer::software(size, BufferUsage::DYNAMIC));
        let mut buffer = HardwareBuffer::new(storage, usage, shadow)?;
        buffer.set_device_copy(self.factory.capabilities().device_copy);
        Ok(buffer)
    }

    // ===== ACCESS =====

    pub fn vertex_buffer(&self, key: VertexBufferKey) -> Option<&VertexBuffer> {
        self.vertex_buffers.get(key)
    }

    pub fn vertex_buffer_mut(&mut self, key: VertexBufferKey) -> Option<&mut VertexBuffer> {
        self.vertex_buffers.get_mut(key)
    }

    pub fn index_buffer(&self, key: IndexBufferKey) -> Option<&IndexBuffer> {
        self.index_buffers.get(key)
    }

    pub fn index_buffer_mut(&mut self, key: IndexBufferKey) -> Option<&mut IndexBuffer> {
        self.index_buffers.get_mut(key)
    }

    pub fn vertex_buffer_count(&self) -> usize {
        self.vertex_buffers.len()
    }

    pub fn index_buffer_count(&self) -> usize {
        self.index_buffers.len()
    }

    /// Copies waiting on the free list
    pub fn free_copy_count(&self) -> usize {
        self.free_copies.values().map(Vec::len).sum()
    }

    /// Copies currently leased
    pub fn leased_copy_count(&self) -> usize {
        self.licenses.len()
    }

    pub fn is_leased(&self, copy: VertexBufferKey) -> bool {
        self.licenses.contains_key(&copy)
    }

    /// Leased and free copies associated with `source`
    pub fn tracked_copy_count(&self, source: VertexBufferKey) -> usize {
        let leased = self.licenses.values().filter(|l| l.source == source).count();
        let free = self.free_copies.get(&source).map_or(0, Vec::len);
        leased + free
    }

    // ===== TEMPORARY COPIES =====

    /// Lease a temporary copy of `source`
    ///
    /// A free copy of the same vertex size and count is repurposed when one
    /// exists (preferring copies made from `source`), otherwise a new
    /// dynamic write-only buffer with a shadow is created.
    ///
    /// # Arguments
    ///
    /// * `source` - Buffer to copy
    /// * `release` - Who ends the lease
    /// * `licensee` - Notified when the lease ends
    /// * `copy_data` - Copy the contents of `source` into the copy
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidResource` if `source` is unknown or empty.
    pub fn allocate_vertex_buffer_copy(
        &mut self,
        source: VertexBufferKey,
        release: BufferLicenseRelease,
        licensee: Weak<dyn HardwareBufferLicensee>,
        copy_data: bool,
    ) -> Result<VertexBufferKey> {
        let (elements, vertex_size, vertex_count, size) = match self.vertex_buffers.get(source) {
            Some(buffer) => (
                buffer.elements().to_vec(),
                buffer.vertex_size(),
                buffer.vertex_count(),
                buffer.size(),
            ),
            None => orbit_bail!("orbit3d::HardwareBufferManager",
                "Cannot copy unknown vertex buffer {:?}", source),
        };
        if size == 0 {
            orbit_bail!("orbit3d::HardwareBufferManager",
                "Cannot copy empty vertex buffer {:?}", source);
        }

        let copy = match self.take_free_copy(source, vertex_size, vertex_count) {
            Some(copy) => {
                orbit_trace!("orbit3d::HardwareBufferManager",
                    "Reusing free copy {:?} for source {:?}", copy, source);
                if let Some(buffer) = self.vertex_buffers.get_mut(copy) {
                    buffer.set_elements(elements);
                }
                copy
            }
            None => {
                let buffer = self.create_hardware_buffer(
                    size, BufferUsage::DYNAMIC_WRITE_ONLY_DISCARDABLE, true)?;
                let copy = self.vertex_buffers.insert(VertexBuffer::new(
                    buffer,
                    elements,
                    vertex_size,
                    vertex_count,
                    self.capabilities().instance_data,
                ));
                orbit_trace!("orbit3d::HardwareBufferManager",
                    "Allocated new copy {:?} for source {:?}", copy, source);
                copy
            }
        };

        if copy_data {
            if let Err(err) = self.copy_vertex_data(source, copy) {
                self.free_copies.entry(source).or_default().push(copy);
                return Err(err);
            }
        }

        self.licenses.insert(copy, VertexBufferLicense {
            source,
            release,
            expired_delay: self.expiry_frames,
            licensee,
        });
        Ok(copy)
    }

    /// End a lease manually; the copy goes back to the free list
    ///
    /// Copies without a lease are ignored.
    pub fn release_vertex_buffer_copy(&mut self, copy: VertexBufferKey) {
        match self.licenses.remove(&copy) {
            Some(license) => {
                license.notify_expired(copy);
                self.free_copies.entry(license.source).or_default().push(copy);
            }
            None => {
                orbit_trace!("orbit3d::HardwareBufferManager",
                    "Release of {:?} ignored: not leased", copy);
            }
        }
    }

    /// Keep an automatic lease alive for another expiry period
    ///
    /// # Errors
    ///
    /// Returns `Error::StateViolation` for a manual lease.
    pub fn touch_vertex_buffer_copy(&mut self, copy: VertexBufferKey) -> Result<()> {
        if let Some(license) = self.licenses.get_mut(&copy) {
            if license.release != BufferLicenseRelease::Automatic {
                orbit_bail!(StateViolation => "orbit3d::HardwareBufferManager",
                    "Only automatic leases can be touched ({:?} is manual)", copy);
            }
            license.expired_delay = self.expiry_frames;
        }
        Ok(())
    }

    /// Destroy every copy on the free list
    ///
    /// # Returns
    ///
    /// Number of destroyed copies
    pub fn free_unused_buffer_copies(&mut self) -> usize {
        let copies: Vec<VertexBufferKey> = self.free_copies.drain().flat_map(|(_, list)| list).collect();
        let count = copies.len();
        for copy in copies {
            self.destroy_vertex_buffer(copy);
        }

        if count == 0 {
            orbit_info!("orbit3d::HardwareBufferManager", "No unused temporary vertex buffers found");
        } else {
            orbit_info!("orbit3d::HardwareBufferManager", "Freed {} unused temporary vertex buffers", count);
        }
        count
    }

    /// Per-frame maintenance of automatic leases
    ///
    /// Each call counts down the untouched automatic leases; expired ones
    /// (or all of them when `force_free_unused`) are returned to the free
    /// list. The free list is destroyed when forced, or once free copies
    /// outnumber leased ones for `under_used_frame_threshold` frames in a
    /// row. Manual leases are never reclaimed here.
    pub fn release_buffer_copies(&mut self, force_free_unused: bool) {
        let mut num_unused = self.free_copy_count();
        let mut num_used = self.licenses.len();

        let expired: Vec<VertexBufferKey> = self.licenses.iter_mut()
            .filter_map(|(&copy, license)| {
                if license.release != BufferLicenseRelease::Automatic {
                    return None;
                }
                if force_free_unused {
                    return Some(copy);
                }
                license.expired_delay = license.expired_delay.saturating_sub(1);
                (license.expired_delay == 0).then_some(copy)
            })
            .collect();

        for copy in expired {
            if let Some(license) = self.licenses.remove(&copy) {
                license.notify_expired(copy);
                self.free_copies.entry(license.source).or_default().push(copy);
                num_used -= 1;
                num_unused += 1;
            }
        }

        if force_free_unused {
            self.free_unused_buffer_copies();
            self.under_used_frame_count = 0;
        } else if num_used < num_unused {
            self.under_used_frame_count += 1;
            if self.under_used_frame_count >= self.under_used_frame_threshold {
                self.free_unused_buffer_copies();
                self.under_used_frame_count = 0;
            }
        } else {
            self.under_used_frame_count = 0;
        }
    }

    /// Destroy every copy made from `source`, whatever its lease kind
    ///
    /// Licensees of leased copies are notified first.
    ///
    /// # Returns
    ///
    /// Number of destroyed copies
    pub fn force_release_buffer_copies(&mut self, source: VertexBufferKey) -> usize {
        let leased: Vec<VertexBufferKey> = self.licenses.iter()
            .filter(|(_, license)| license.source == source)
            .map(|(&copy, _)| copy)
            .collect();
        for copy in &leased {
            if let Some(license) = self.licenses.remove(copy) {
                license.notify_expired(*copy);
            }
        }

        let free = self.free_copies.remove(&source).unwrap_or_default();
        leased.into_iter()
            .chain(free)
            .filter(|&copy| self.destroy_vertex_buffer(copy))
            .count()
    }

    /// Hand a pre-made copy of `source` to the free list
    pub fn register_vertex_buffer_source_and_copy(
        &mut self,
        source: VertexBufferKey,
        copy: VertexBufferKey,
    ) -> Result<()> {
        if source == copy
            || !self.vertex_buffers.contains_key(source)
            || !self.vertex_buffers.contains_key(copy)
        {
            orbit_bail!("orbit3d::HardwareBufferManager",
                "Invalid source/copy pair {:?} / {:?}", source, copy);
        }
        self.free_copies.entry(source).or_default().push(copy);
        Ok(())
    }

    // ===== DESTRUCTION =====

    /// Remove a vertex buffer from every tracking structure
    ///
    /// Ends its lease if it is a leased copy, drops it from the free list,
    /// destroys its own copies and detaches it from the registry. Unknown
    /// keys are ignored.
    ///
    /// # Returns
    ///
    /// The detached buffer, if it was still registered
    pub fn notify_vertex_buffer_destroyed(&mut self, key: VertexBufferKey) -> Option<VertexBuffer> {
        if let Some(license) = self.licenses.remove(&key) {
            license.notify_expired(key);
        }
        self.free_copies.retain(|_, list| {
            list.retain(|&copy| copy != key);
            !list.is_empty()
        });
        self.force_release_buffer_copies(key);
        self.vertex_buffers.remove(key)
    }

    /// Remove an index buffer from the registry; unknown keys are ignored
    pub fn notify_index_buffer_destroyed(&mut self, key: IndexBufferKey) -> Option<IndexBuffer> {
        self.index_buffers.remove(key)
    }

    /// Destroy a vertex buffer after the tracking tables forgot it
    ///
    /// # Returns
    ///
    /// `false` if the key was not registered
    pub fn destroy_vertex_buffer(&mut self, key: VertexBufferKey) -> bool {
        match self.notify_vertex_buffer_destroyed(key) {
            Some(buffer) => {
                orbit_debug!("orbit3d::HardwareBufferManager",
                    "Destroyed vertex buffer {:?} ({} bytes)", key, buffer.size());
                true
            }
            None => false,
        }
    }

    pub fn destroy_index_buffer(&mut self, key: IndexBufferKey) -> bool {
        match self.notify_index_buffer_destroyed(key) {
            Some(buffer) => {
                orbit_debug!("orbit3d::HardwareBufferManager",
                    "Destroyed index buffer {:?} ({} bytes)", key, buffer.size());
                true
            }
            None => false,
        }
    }

    // ===== INTERNAL =====

    fn take_free_copy(
        &mut self,
        source: VertexBufferKey,
        vertex_size: usize,
        vertex_count: usize,
    ) -> Option<VertexBufferKey> {
        if let Some(list) = self.free_copies.get_mut(&source) {
            if let Some(copy) = list.pop() {
                if list.is_empty() {
                    self.free_copies.remove(&source);
                }
                return Some(copy);
            }
        }

        let vertex_buffers = &self.vertex_buffers;
        let (owner, position) = self.free_copies.iter().find_map(|(&owner, list)| {
            list.iter()
                .position(|&copy| {
                    vertex_buffers.get(copy).is_some_and(|buffer| {
                        buffer.vertex_size() == vertex_size && buffer.vertex_count() == vertex_count
                    })
                })
                .map(|position| (owner, position))
        })?;

        let list = self.free_copies.get_mut(&owner)?;
        let copy = list.swap_remove(position);
        if list.is_empty() {
            self.free_copies.remove(&owner);
        }
        Some(copy)
    }

    fn copy_vertex_data(&mut self, source: VertexBufferKey, copy: VertexBufferKey) -> Result<()> {
        let [src, dst] = self.vertex_buffers.get_disjoint_mut([source, copy]).ok_or_else(|| {
            orbit_err!("orbit3d::HardwareBufferManager",
                "Cannot copy {:?} into {:?}", source, copy)
        })?;
        dst.copy_all_from(&*src)
    }
}

impl Drop for HardwareBufferManager {
    fn drop(&mut self) {
        for (copy, license) in self.licenses.drain() {
            license.notify_expired(copy);
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
