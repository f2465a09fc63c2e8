/// Render context: the explicit owner of the per-renderer managers.
///
/// Everything that would otherwise be process-wide state lives here: the
/// hardware buffer manager, the high-level program manager and the render
/// queue. Programs are torn down before buffers when the context drops.

use crate::buffer::{DefaultBufferFactory, HardwareBufferFactory, HardwareBufferManager};
use crate::config::RenderConfig;
use crate::error::Result;
use crate::gpu_program::{GpuProgramParameters, HighLevelGpuProgramManager};
use crate::orbit_info;
use crate::render_queue::RenderQueue;
use crate::shadow::{IndexData, ShadowRenderable, VertexData};

pub struct RenderContext {
    config: RenderConfig,
    // Field order is drop order
    programs: HighLevelGpuProgramManager,
    render_queue: RenderQueue,
    buffers: HardwareBufferManager,
}

impl RenderContext {
    /// Build a context; capabilities come from `factory`
    pub fn new(config: RenderConfig, factory: Box<dyn HardwareBufferFactory>) -> Self {
        let capabilities = factory.capabilities().clone();
        let buffers = HardwareBufferManager::new(factory, &config);
        let programs = HighLevelGpuProgramManager::new(capabilities);
        orbit_info!("orbit3d::RenderContext", "Render context created");
        Self {
            config,
            programs,
            render_queue: RenderQueue::new(),
            buffers,
        }
    }

    /// Default configuration over software buffers
    pub fn with_defaults() -> Self {
        Self::new(RenderConfig::default(), Box::new(DefaultBufferFactory::new()))
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn buffers(&self) -> &HardwareBufferManager {
        &self.buffers
    }

    pub fn buffers_mut(&mut self) -> &mut HardwareBufferManager {
        &mut self.buffers
    }

    pub fn programs(&self) -> &HighLevelGpuProgramManager {
        &self.programs
    }

    pub fn programs_mut(&mut self) -> &mut HighLevelGpuProgramManager {
        &mut self.programs
    }

    pub fn render_queue(&self) -> &RenderQueue {
        &self.render_queue
    }

    pub fn render_queue_mut(&mut self) -> &mut RenderQueue {
        &mut self.render_queue
    }

    /// Parameters for the program `name` resolves to, with this context's config
    pub fn create_parameters(&mut self, name: &str) -> Result<GpuProgramParameters> {
        self.programs.create_parameters(name, &self.config)
    }

    pub fn create_shadow_renderable(&self, vertex_data: VertexData, index_data: IndexData) -> ShadowRenderable {
        ShadowRenderable::new(vertex_data, index_data, self.config.custom_parameter_capacity)
    }

    /// Frame boundary: age automatic buffer leases and empty the queue
    pub fn end_frame(&mut self) {
        self.buffers.release_buffer_copies(false);
        self.render_queue.clear(false);
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
