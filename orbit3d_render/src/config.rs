//! Engine-wide configuration and render system capabilities

use rustc_hash::FxHashSet;

/// Configuration shared by the managers of a [`RenderContext`](crate::context::RenderContext)
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Copied into every parameter set created by a program
    pub transpose_matrices: bool,
    /// Calls to `release_buffer_copies(false)` an untouched automatic lease survives
    pub temp_buffer_expiry_frames: u32,
    /// Consecutive under-used frames before free copies are reclaimed
    pub under_used_frame_threshold: u32,
    /// Growth increment of float/int constant banks
    pub constant_list_grow_step: usize,
    /// Initial custom parameter capacity of shadow renderables
    pub custom_parameter_capacity: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            transpose_matrices: false,
            temp_buffer_expiry_frames: 5,
            under_used_frame_threshold: 30000,
            constant_list_grow_step: 16,
            custom_parameter_capacity: 4,
        }
    }
}

/// Capabilities reported by the active render system
#[derive(Debug, Clone, Default)]
pub struct RenderSystemCapabilities {
    /// Per-instance vertex streams
    pub instance_data: bool,
    /// Buffer to buffer copies without a CPU round trip
    pub device_copy: bool,
    /// Shader syntax codes the device can run ("vs_2_0", "glsl", ...)
    pub supported_syntaxes: FxHashSet<String>,
}

impl RenderSystemCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instance_data(mut self, enabled: bool) -> Self {
        self.instance_data = enabled;
        self
    }

    pub fn with_device_copy(mut self, enabled: bool) -> Self {
        self.device_copy = enabled;
        self
    }

    pub fn with_syntax(mut self, syntax: &str) -> Self {
        self.supported_syntaxes.insert(syntax.to_string());
        self
    }

    pub fn is_syntax_supported(&self, syntax: &str) -> bool {
        self.supported_syntaxes.contains(syntax)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
