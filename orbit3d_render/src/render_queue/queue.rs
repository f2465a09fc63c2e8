/// The render queue: queue groups keyed by id, visited in ascending order.

use std::collections::BTreeMap;
use glam::Vec3;
use super::queue_group::RenderQueueGroup;
use super::renderable::{RenderableRef, Technique};

/// Identifies a queue group; lower ids render first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderQueueGroupId(pub u8);

impl RenderQueueGroupId {
    pub const BACKGROUND: Self = Self(0);
    pub const SKIES_EARLY: Self = Self(5);
    pub const MAIN: Self = Self(50);
    pub const SKIES_LATE: Self = Self(95);
    pub const OVERLAY: Self = Self(100);
}

impl Default for RenderQueueGroupId {
    fn default() -> Self {
        Self::MAIN
    }
}

pub struct RenderQueue {
    groups: BTreeMap<RenderQueueGroupId, RenderQueueGroup>,
    default_group: RenderQueueGroupId,
    split_passes_by_lighting_type: bool,
    split_no_shadow_passes: bool,
    shadow_casters_not_receivers: bool,
}

impl RenderQueue {
    pub const DEFAULT_PRIORITY: u16 = 100;

    /// The main group exists up front
    pub fn new() -> Self {
        let mut queue = Self {
            groups: BTreeMap::new(),
            default_group: RenderQueueGroupId::MAIN,
            split_passes_by_lighting_type: false,
            split_no_shadow_passes: false,
            shadow_casters_not_receivers: false,
        };
        queue.queue_group_mut(RenderQueueGroupId::MAIN);
        queue
    }

    pub fn default_group(&self) -> RenderQueueGroupId {
        self.default_group
    }

    pub fn set_default_group(&mut self, group: RenderQueueGroupId) {
        self.default_group = group;
    }

    pub fn add_renderable_to_group(
        &mut self,
        renderable: RenderableRef,
        technique: &Technique,
        group: RenderQueueGroupId,
        priority: u16,
    ) {
        self.queue_group_mut(group).add_renderable(renderable, technique, priority);
    }

    /// Add to the default group
    pub fn add_renderable_with_priority(&mut self, renderable: RenderableRef, technique: &Technique, priority: u16) {
        self.add_renderable_to_group(renderable, technique, self.default_group, priority);
    }

    /// Add to the default group with the default priority
    pub fn add_renderable(&mut self, renderable: RenderableRef, technique: &Technique) {
        self.add_renderable_with_priority(renderable, technique, Self::DEFAULT_PRIORITY);
    }

    /// Empty all groups; `dispose` also drops their priority buckets
    pub fn clear(&mut self, dispose: bool) {
        for group in self.groups.values_mut() {
            group.clear(dispose);
        }
    }

    pub fn sort(&mut self, camera_position: Vec3) {
        for group in self.groups.values_mut() {
            group.sort(camera_position);
        }
    }

    pub fn queue_group(&self, id: RenderQueueGroupId) -> Option<&RenderQueueGroup> {
        self.groups.get(&id)
    }

    /// Group `id`, created with the queue's current flags if missing
    pub fn queue_group_mut(&mut self, id: RenderQueueGroupId) -> &mut RenderQueueGroup {
        let (split_lighting, split_no_shadow, casters) = (
            self.split_passes_by_lighting_type,
            self.split_no_shadow_passes,
            self.shadow_casters_not_receivers,
        );
        self.groups
            .entry(id)
            .or_insert_with(|| RenderQueueGroup::new(split_lighting, split_no_shadow, casters))
    }

    /// Groups in ascending id order
    pub fn queue_groups(&self) -> impl Iterator<Item = (RenderQueueGroupId, &RenderQueueGroup)> {
        self.groups.iter().map(|(id, group)| (*id, group))
    }

    pub fn queue_group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn split_passes_by_lighting_type(&self) -> bool {
        self.split_passes_by_lighting_type
    }

    pub fn set_split_passes_by_lighting_type(&mut self, split: bool) {
        self.split_passes_by_lighting_type = split;
        for group in self.groups.values_mut() {
            group.set_split_passes_by_lighting_type(split);
        }
    }

    pub fn split_no_shadow_passes(&self) -> bool {
        self.split_no_shadow_passes
    }

    pub fn set_split_no_shadow_passes(&mut self, split: bool) {
        self.split_no_shadow_passes = split;
        for group in self.groups.values_mut() {
            group.set_split_no_shadow_passes(split);
        }
    }

    pub fn shadow_casters_not_receivers(&self) -> bool {
        self.shadow_casters_not_receivers
    }

    pub fn set_shadow_casters_not_receivers(&mut self, enabled: bool) {
        self.shadow_casters_not_receivers = enabled;
        for group in self.groups.values_mut() {
            group.set_shadow_casters_not_receivers(enabled);
        }
    }
}

impl Default for RenderQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
