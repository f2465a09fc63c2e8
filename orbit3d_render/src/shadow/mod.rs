//! Shadow volume renderables and the render operations they carry

pub mod render_operation;
pub mod shadow_renderable;

pub use render_operation::{IndexData, OperationType, RenderOperation, VertexData};
pub use shadow_renderable::ShadowRenderable;
