//! Render queue grouping: queue groups, priority buckets and pass maps

pub mod renderable;
pub mod priority_group;
pub mod queue_group;
pub mod queue;

pub use renderable::{IlluminationStage, Renderable, RenderablePass, RenderableRef, Technique};
pub use priority_group::{PassMap, RenderPriorityGroup, SolidBucket};
pub use queue_group::RenderQueueGroup;
pub use queue::{RenderQueue, RenderQueueGroupId};
