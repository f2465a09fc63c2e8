/*!
# Orbit3D Render

Rendering abstraction layer of the Orbit3D engine.

This crate provides the device-independent half of a renderer: buffers that
behave the same with or without a graphics device, a manager that leases
temporary vertex buffer copies, GPU program constant layouts and parameter
sets, and the render queue the scene renderer fills every frame.

## Architecture

- **HardwareBuffer**: lockable byte buffer over a pluggable storage, with an
  optional software shadow
- **HardwareBufferManager**: creates vertex/index buffers, leases copies
- **GpuProgramParameters**: float/int constant banks addressed by name or
  logical register
- **GpuSharedParameters**: named pools copied into many parameter sets
- **HighLevelGpuProgramManager**: program factories, unified programs
- **RenderQueue**: queue groups and priority buckets of renderables
- **ShadowRenderable**: shadow volume geometry
- **RenderContext**: owns the managers of one renderer

Render-system backends implement [`orbit3d::buffer::BufferStorage`] and
[`orbit3d::buffer::HardwareBufferFactory`].
*/

// Internal modules
mod error;
mod config;
mod context;
pub mod log;
pub mod buffer;
pub mod gpu_program;
pub mod render_queue;
pub mod shadow;

// Main orbit3d namespace module
pub mod orbit3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Configuration
    pub use crate::config::{RenderConfig, RenderSystemCapabilities};

    // Context owning the managers
    pub use crate::context::RenderContext;

    // Logging sub-module (types and the dispatch functions the macros use)
    pub mod log {
        pub use crate::log::{
            dispatch, dispatch_detailed, reset_logger, set_logger, DefaultLogger, LogEntry, LogSeverity,
            Logger,
        };
    }

    // Buffers and the buffer manager
    pub mod buffer {
        pub use crate::buffer::*;
    }

    // GPU program constants, parameters and programs
    pub mod gpu_program {
        pub use crate::gpu_program::*;
    }

    // Render queue grouping
    pub mod render_queue {
        pub use crate::render_queue::*;
    }

    // Shadow renderables
    pub mod shadow {
        pub use crate::shadow::*;
    }
}

// Re-export math library at crate root
pub use glam;
