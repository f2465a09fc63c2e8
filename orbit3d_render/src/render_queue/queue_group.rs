/// Priority buckets of one render queue group.

use std::collections::BTreeMap;
use glam::Vec3;
use super::priority_group::RenderPriorityGroup;
use super::renderable::{RenderableRef, Technique};

pub struct RenderQueueGroup {
    priority_groups: BTreeMap<u16, RenderPriorityGroup>,
    split_passes_by_lighting_type: bool,
    split_no_shadow_passes: bool,
    shadow_casters_not_receivers: bool,
    shadows_enabled: bool,
}

impl RenderQueueGroup {
    /// Shadows start enabled
    pub fn new(
        split_passes_by_lighting_type: bool,
        split_no_shadow_passes: bool,
        shadow_casters_not_receivers: bool,
    ) -> Self {
        Self {
            priority_groups: BTreeMap::new(),
            split_passes_by_lighting_type,
            split_no_shadow_passes,
            shadow_casters_not_receivers,
            shadows_enabled: true,
        }
    }

    /// Add to the bucket for `priority`, creating it on first use
    pub fn add_renderable(&mut self, renderable: RenderableRef, technique: &Technique, priority: u16) {
        let (split_lighting, split_no_shadow, casters) = (
            self.split_passes_by_lighting_type,
            self.split_no_shadow_passes,
            self.shadow_casters_not_receivers,
        );
        self.priority_groups
            .entry(priority)
            .or_insert_with(|| RenderPriorityGroup::new(split_lighting, split_no_shadow, casters))
            .add_renderable(renderable, technique, self.shadows_enabled);
    }

    /// Empty every bucket; `dispose` also drops the buckets themselves
    pub fn clear(&mut self, dispose: bool) {
        if dispose {
            self.priority_groups.clear();
        } else {
            self.priority_groups.values_mut().for_each(RenderPriorityGroup::clear);
        }
    }

    pub fn sort(&mut self, camera_position: Vec3) {
        for group in self.priority_groups.values_mut() {
            group.sort(camera_position);
        }
    }

    /// Buckets in ascending priority
    pub fn priority_groups(&self) -> impl Iterator<Item = (u16, &RenderPriorityGroup)> {
        self.priority_groups.iter().map(|(priority, group)| (*priority, group))
    }

    pub fn priority_group(&self, priority: u16) -> Option<&RenderPriorityGroup> {
        self.priority_groups.get(&priority)
    }

    pub fn priority_group_count(&self) -> usize {
        self.priority_groups.len()
    }

    pub fn shadows_enabled(&self) -> bool {
        self.shadows_enabled
    }

    pub fn set_shadows_enabled(&mut self, enabled: bool) {
        self.shadows_enabled = enabled;
    }

    pub fn split_passes_by_lighting_type(&self) -> bool {
        self.split_passes_by_lighting_type
    }

    pub fn set_split_passes_by_lighting_type(&mut self, split: bool) {
        self.split_passes_by_lighting_type = split;
        for group in self.priority_groups.values_mut() {
            group.set_split_passes_by_lighting_type(split);
        }
    }

    pub fn split_no_shadow_passes(&self) -> bool {
        self.split_no_shadow_passes
    }

    pub fn set_split_no_shadow_passes(&mut self, split: bool) {
        self.split_no_shadow_passes = split;
        for group in self.priority_groups.values_mut() {
            group.set_split_no_shadow_passes(split);
        }
    }

    pub fn shadow_casters_not_receivers(&self) -> bool {
        self.shadow_casters_not_receivers
    }

    pub fn set_shadow_casters_not_receivers(&mut self, enabled: bool) {
        self.shadow_casters_not_receivers = enabled;
        for group in self.priority_groups.values_mut() {
            group.set_shadow_casters_not_receivers(enabled);
        }
    }
}

#[cfg(test)]
#[path = "queue_group_tests.rs"]
mod tests;
