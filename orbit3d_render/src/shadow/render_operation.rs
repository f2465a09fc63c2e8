/// Geometry description handed to the renderer.

use std::collections::BTreeMap;
use crate::buffer::{IndexBufferKey, VertexBufferKey, VertexDeclaration};

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OperationType {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
    TriangleFan,
}

/// Vertex declaration plus the buffers bound to its sources
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexData {
    pub declaration: VertexDeclaration,
    pub bindings: BTreeMap<u16, VertexBufferKey>,
    pub vertex_start: usize,
    pub vertex_count: usize,
}

impl VertexData {
    pub fn new(declaration: VertexDeclaration, vertex_count: usize) -> Self {
        Self {
            declaration,
            bindings: BTreeMap::new(),
            vertex_start: 0,
            vertex_count,
        }
    }

    /// Bind `buffer` to `source`, returning the previous binding
    pub fn bind(&mut self, source: u16, buffer: VertexBufferKey) -> Option<VertexBufferKey> {
        self.bindings.insert(source, buffer)
    }

    pub fn unbind(&mut self, source: u16) -> Option<VertexBufferKey> {
        self.bindings.remove(&source)
    }

    pub fn binding(&self, source: u16) -> Option<VertexBufferKey> {
        self.bindings.get(&source).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexData {
    pub buffer: IndexBufferKey,
    pub index_start: usize,
    pub index_count: usize,
}

impl IndexData {
    pub fn new(buffer: IndexBufferKey, index_start: usize, index_count: usize) -> Self {
        Self { buffer, index_start, index_count }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOperation {
    pub operation_type: OperationType,
    pub vertex_data: VertexData,
    pub index_data: Option<IndexData>,
    pub use_indices: bool,
}

impl RenderOperation {
    pub fn new(operation_type: OperationType, vertex_data: VertexData) -> Self {
        Self {
            operation_type,
            vertex_data,
            index_data: None,
            use_indices: false,
        }
    }

    pub fn indexed(operation_type: OperationType, vertex_data: VertexData, index_data: IndexData) -> Self {
        Self {
            operation_type,
            vertex_data,
            index_data: Some(index_data),
            use_indices: true,
        }
    }

    /// Vertices or indices the draw call consumes
    pub fn element_count(&self) -> usize {
        match (&self.index_data, self.use_indices) {
            (Some(index_data), true) => index_data.index_count,
            _ => self.vertex_data.vertex_count,
        }
    }
}
