/// Vertex and index buffers.
///
/// Both wrap a [`HardwareBuffer`] and dereference to it, so locking and
/// read/write go through the same state machine. Their size is derived
/// from the layout: vertex size × vertex count, index width × index count.

use std::ops::{Deref, DerefMut};
use crate::error::Result;
use crate::orbit_bail;
use super::hardware_buffer::HardwareBuffer;
use super::usage::{BufferUsage, IndexType};
use super::vertex_declaration::{VertexDeclaration, VertexElement};

// ===== DESCRIPTORS =====

/// Descriptor for [`HardwareBufferManager::create_vertex_buffer`](super::HardwareBufferManager::create_vertex_buffer)
#[derive(Debug, Clone)]
pub struct VertexBufferDesc {
    pub declaration: VertexDeclaration,
    /// Source stream of `declaration` stored in this buffer
    pub source: u16,
    pub vertex_count: usize,
    pub usage: BufferUsage,
    pub use_shadow: bool,
}

/// Descriptor for [`HardwareBufferManager::create_index_buffer`](super::HardwareBufferManager::create_index_buffer)
#[derive(Debug, Clone, Copy)]
pub struct IndexBufferDesc {
    pub index_type: IndexType,
    pub index_count: usize,
    pub usage: BufferUsage,
    pub use_shadow: bool,
}

// ===== VERTEX BUFFER =====

#[derive(Debug)]
pub struct VertexBuffer {
    buffer: HardwareBuffer,
    elements: Vec<VertexElement>,
    vertex_size: usize,
    vertex_count: usize,
    is_instance_data: bool,
    instance_data_step_rate: u32,
    instance_data_supported: bool,
}

impl VertexBuffer {
    pub(crate) fn new(
        buffer: HardwareBuffer,
        elements: Vec<VertexElement>,
        vertex_size: usize,
        vertex_count: usize,
        instance_data_supported: bool,
    ) -> Self {
        Self {
            buffer,
            elements,
            vertex_size,
            vertex_count,
            is_instance_data: false,
            instance_data_step_rate: 1,
            instance_data_supported,
        }
    }

    /// Elements of the source stream stored in this buffer
    pub fn elements(&self) -> &[VertexElement] {
        &self.elements
    }

    pub fn vertex_size(&self) -> usize {
        self.vertex_size
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn is_instance_data(&self) -> bool {
        self.is_instance_data
    }

    pub fn instance_data_step_rate(&self) -> u32 {
        self.instance_data_step_rate
    }

    /// Mark the buffer as per-instance data
    ///
    /// # Errors
    ///
    /// Returns `Error::Unsupported` when enabling it on a render system
    /// without instance data support.
    pub fn set_is_instance_data(&mut self, is_instance_data: bool) -> Result<()> {
        if is_instance_data && !self.instance_data_supported {
            orbit_bail!(Unsupported => "orbit3d::VertexBuffer",
                "Instance data is not supported by the active render system");
        }
        self.is_instance_data = is_instance_data;
        Ok(())
    }

    pub fn set_instance_data_step_rate(&mut self, step_rate: u32) -> Result<()> {
        if step_rate == 0 {
            orbit_bail!("orbit3d::VertexBuffer", "Instance data step rate must be greater than zero");
        }
        self.instance_data_step_rate = step_rate;
        Ok(())
    }

    pub(crate) fn set_elements(&mut self, elements: Vec<VertexElement>) {
        self.elements = elements;
    }
}

impl Deref for VertexBuffer {
    type Target = HardwareBuffer;

    fn deref(&self) -> &HardwareBuffer {
        &self.buffer
    }
}

impl DerefMut for VertexBuffer {
    fn deref_mut(&mut self) -> &mut HardwareBuffer {
        &mut self.buffer
    }
}

// ===== INDEX BUFFER =====

#[derive(Debug)]
pub struct IndexBuffer {
    buffer: HardwareBuffer,
    index_type: IndexType,
    index_count: usize,
}

impl IndexBuffer {
    pub(crate) fn new(buffer: HardwareBuffer, index_type: IndexType, index_count: usize) -> Self {
        Self { buffer, index_type, index_count }
    }

    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    pub fn index_size(&self) -> usize {
        self.index_type.size_bytes()
    }
}

impl Deref for IndexBuffer {
    type Target = HardwareBuffer;

    fn deref(&self) -> &HardwareBuffer {
        &self.buffer
    }
}

impl DerefMut for IndexBuffer {
    fn deref_mut(&mut self) -> &mut HardwareBuffer {
        &mut self.buffer
    }
}

