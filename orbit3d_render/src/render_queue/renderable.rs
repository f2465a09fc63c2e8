/// What the render queue needs to know about the things it sorts.

use std::sync::Arc;
use glam::Vec3;

/// Something the renderer can draw
pub trait Renderable: Send + Sync {
    /// Squared distance from `camera_position`, used to order transparents
    fn squared_view_depth(&self, camera_position: Vec3) -> f32;

    fn casts_shadows(&self) -> bool {
        false
    }
}

pub type RenderableRef = Arc<dyn Renderable>;

/// Lighting stage of a pass once a technique is split by lighting type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IlluminationStage {
    Ambient,
    PerLight,
    Decal,
}

/// Snapshot of the material technique a renderable is drawn with
///
/// Passes are identified by id; the queue orders solid passes by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Technique {
    pub transparent: bool,
    pub depth_write: bool,
    pub depth_check: bool,
    pub receive_shadows: bool,
    pub passes: Vec<u32>,
    pub illumination_passes: Vec<(u32, IlluminationStage)>,
}

impl Technique {
    /// Opaque technique with the given passes, depth testing on
    pub fn solid(passes: &[u32]) -> Self {
        Self {
            transparent: false,
            depth_write: true,
            depth_check: true,
            receive_shadows: true,
            passes: passes.to_vec(),
            illumination_passes: Vec::new(),
        }
    }

    /// Blended technique that does not write depth
    pub fn transparent(passes: &[u32]) -> Self {
        Self {
            transparent: true,
            depth_write: false,
            ..Self::solid(passes)
        }
    }

    pub fn with_illumination_passes(mut self, passes: &[(u32, IlluminationStage)]) -> Self {
        self.illumination_passes = passes.to_vec();
        self
    }

    pub fn with_receive_shadows(mut self, receive: bool) -> Self {
        self.receive_shadows = receive;
        self
    }

    /// Passes split by lighting stage
    ///
    /// Without explicit illumination passes every pass is ambient.
    pub fn illumination_stages(&self) -> Vec<(u32, IlluminationStage)> {
        if self.illumination_passes.is_empty() {
            self.passes.iter().map(|&pass| (pass, IlluminationStage::Ambient)).collect()
        } else {
            self.illumination_passes.clone()
        }
    }

    /// Transparent and not fully depth tested
    pub fn needs_depth_sort(&self) -> bool {
        self.transparent && !(self.depth_write && self.depth_check)
    }
}

/// A renderable paired with one pass of its technique
#[derive(Clone)]
pub struct RenderablePass {
    pub renderable: RenderableRef,
    pub pass: u32,
}

impl std::fmt::Debug for RenderablePass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderablePass")
            .field("pass", &self.pass)
            .finish_non_exhaustive()
    }
}
