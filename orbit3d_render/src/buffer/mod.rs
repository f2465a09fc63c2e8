//! Hardware buffers, software storage and the buffer manager

pub mod usage;
pub mod storage;
pub mod hardware_buffer;
pub mod vertex_declaration;
pub mod typed_buffer;
pub mod manager;

pub use usage::{BufferUsage, IndexType, LockMode};
pub use storage::{BufferStorage, DefaultBufferFactory, HardwareBufferFactory, SoftwareBufferStorage};
pub use hardware_buffer::HardwareBuffer;
pub use vertex_declaration::{VertexDeclaration, VertexElement, VertexElementSemantic, VertexElementType};
pub use typed_buffer::{IndexBuffer, IndexBufferDesc, VertexBuffer, VertexBufferDesc};
pub use manager::{
    BufferLicenseRelease, HardwareBufferLicensee, HardwareBufferManager, IndexBufferKey,
    VertexBufferKey,
};
