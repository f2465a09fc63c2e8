/// Shadow volume geometry.
///
/// A [`ShadowRenderable`] is an indexed triangle list over shadow volume
/// vertices plus a small set of per-renderable custom parameters the
/// renderer binds as shader constants. An optional light cap is drawn
/// separately with depth testing disabled; without one, the main
/// geometry already closes the volume.

use glam::Vec4;
use crate::orbit_trace;
use super::render_operation::{IndexData, OperationType, RenderOperation, VertexData};

#[derive(Debug, Clone, PartialEq)]
pub struct ShadowRenderable {
    render_operation: RenderOperation,
    custom_parameters: Vec<Vec4>,
    light_cap: Option<Box<ShadowRenderable>>,
    visible: bool,
}

impl ShadowRenderable {
    /// `capacity` is the initial room for custom parameters
    pub fn new(vertex_data: VertexData, index_data: IndexData, capacity: usize) -> Self {
        Self {
            render_operation: RenderOperation::indexed(OperationType::TriangleList, vertex_data, index_data),
            custom_parameters: Vec::with_capacity(capacity),
            light_cap: None,
            visible: true,
        }
    }

    pub fn render_operation(&self) -> &RenderOperation {
        &self.render_operation
    }

    pub fn render_operation_mut(&mut self) -> &mut RenderOperation {
        &mut self.render_operation
    }

    // ===== CUSTOM PARAMETERS =====

    /// Set slot `index`; skipped slots are filled with zero vectors
    pub fn set_custom_parameter(&mut self, index: usize, value: Vec4) {
        if index >= self.custom_parameters.len() {
            self.custom_parameters.resize(index + 1, Vec4::ZERO);
        }
        self.custom_parameters[index] = value;
    }

    pub fn custom_parameter(&self, index: usize) -> Option<Vec4> {
        self.custom_parameters.get(index).copied()
    }

    pub fn custom_parameter_count(&self) -> usize {
        self.custom_parameters.len()
    }

    // ===== LIGHT CAP =====

    pub fn set_light_cap(&mut self, light_cap: Option<ShadowRenderable>) {
        self.light_cap = light_cap.map(Box::new);
    }

    pub fn light_cap_renderable(&self) -> Option<&ShadowRenderable> {
        self.light_cap.as_deref()
    }

    pub fn light_cap_renderable_mut(&mut self) -> Option<&mut ShadowRenderable> {
        self.light_cap.as_deref_mut()
    }

    /// Whether the light cap must be drawn on its own
    pub fn is_light_cap_separate(&self) -> bool {
        self.light_cap.is_some()
    }

    // ===== STATE =====

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Restrict drawing to `index_count` indices from `index_start`
    pub fn update_index_range(&mut self, index_start: usize, index_count: usize) {
        if let Some(index_data) = self.render_operation.index_data.as_mut() {
            index_data.index_start = index_start;
            index_data.index_count = index_count;
            orbit_trace!("orbit3d::ShadowRenderable",
                "Index range set to {}+{}", index_start, index_count);
        }
    }
}

#[cfg(test)]
#[path = "shadow_renderable_tests.rs"]
mod tests;
