/// Renderables of one priority, bucketed by pass.

use std::collections::BTreeMap;
use glam::Vec3;
use super::renderable::{IlluminationStage, RenderablePass, RenderableRef, Technique};

pub type PassMap = BTreeMap<u32, Vec<RenderableRef>>;

/// Which solid pass map a pass goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolidBucket {
    Basic,
    DiffuseSpecular,
    Decal,
    NoShadow,
}

pub struct RenderPriorityGroup {
    solid_passes: PassMap,
    solid_passes_diffuse_specular: PassMap,
    solid_passes_decal: PassMap,
    solid_passes_no_shadow: PassMap,
    transparent_passes: Vec<RenderablePass>,
    split_passes_by_lighting_type: bool,
    split_no_shadow_passes: bool,
    shadow_casters_not_receivers: bool,
}

impl RenderPriorityGroup {
    pub fn new(
        split_passes_by_lighting_type: bool,
        split_no_shadow_passes: bool,
        shadow_casters_not_receivers: bool,
    ) -> Self {
        Self {
            solid_passes: PassMap::new(),
            solid_passes_diffuse_specular: PassMap::new(),
            solid_passes_decal: PassMap::new(),
            solid_passes_no_shadow: PassMap::new(),
            transparent_passes: Vec::new(),
            split_passes_by_lighting_type,
            split_no_shadow_passes,
            shadow_casters_not_receivers,
        }
    }

    /// Queue `renderable` under every pass of `technique`
    ///
    /// `shadows_enabled` comes from the owning queue group and gates the
    /// no-shadow split.
    pub fn add_renderable(&mut self, renderable: RenderableRef, technique: &Technique, shadows_enabled: bool) {
        if technique.needs_depth_sort() {
            self.transparent_passes.extend(technique.passes.iter().map(|&pass| RenderablePass {
                renderable: renderable.clone(),
                pass,
            }));
            return;
        }

        let no_shadow = self.split_no_shadow_passes
            && shadows_enabled
            && (!technique.receive_shadows
                || (renderable.casts_shadows() && self.shadow_casters_not_receivers));

        if no_shadow {
            Self::add_to_map(&mut self.solid_passes_no_shadow, &technique.passes, &renderable);
        } else if self.split_passes_by_lighting_type {
            for (pass, stage) in technique.illumination_stages() {
                let map = match stage {
                    IlluminationStage::Ambient => &mut self.solid_passes,
                    IlluminationStage::PerLight => &mut self.solid_passes_diffuse_specular,
                    IlluminationStage::Decal => &mut self.solid_passes_decal,
                };
                map.entry(pass).or_default().push(renderable.clone());
            }
        } else {
            Self::add_to_map(&mut self.solid_passes, &technique.passes, &renderable);
        }
    }

    fn add_to_map(map: &mut PassMap, passes: &[u32], renderable: &RenderableRef) {
        for &pass in passes {
            map.entry(pass).or_default().push(renderable.clone());
        }
    }

    /// Order transparent passes back to front
    pub fn sort(&mut self, camera_position: Vec3) {
        self.transparent_passes.sort_by(|a, b| {
            let depth_a = a.renderable.squared_view_depth(camera_position);
            let depth_b = b.renderable.squared_view_depth(camera_position);
            depth_b.total_cmp(&depth_a)
        });
    }

    /// Empty every pass list, keeping the pass keys
    pub fn clear(&mut self) {
        for map in self.maps_mut() {
            map.values_mut().for_each(Vec::clear);
        }
        self.transparent_passes.clear();
    }

    /// Drop a pass key from every solid map
    pub fn remove_solid_pass_entry(&mut self, pass: u32) {
        for map in self.maps_mut() {
            map.remove(&pass);
        }
    }

    fn maps_mut(&mut self) -> [&mut PassMap; 4] {
        [
            &mut self.solid_passes,
            &mut self.solid_passes_diffuse_specular,
            &mut self.solid_passes_decal,
            &mut self.solid_passes_no_shadow,
        ]
    }

    pub fn solid_passes(&self, bucket: SolidBucket) -> &PassMap {
        match bucket {
            SolidBucket::Basic => &self.solid_passes,
            SolidBucket::DiffuseSpecular => &self.solid_passes_diffuse_specular,
            SolidBucket::Decal => &self.solid_passes_decal,
            SolidBucket::NoShadow => &self.solid_passes_no_shadow,
        }
    }

    pub fn transparent_passes(&self) -> &[RenderablePass] {
        &self.transparent_passes
    }

    pub fn solid_pass_count(&self) -> usize {
        self.solid_passes.len()
    }

    pub fn transparent_pass_count(&self) -> usize {
        self.transparent_passes.len()
    }

    /// Renderables queued over every map
    pub fn renderable_count(&self) -> usize {
        let solid: usize = [
            &self.solid_passes,
            &self.solid_passes_diffuse_specular,
            &self.solid_passes_decal,
            &self.solid_passes_no_shadow,
        ]
        .iter()
        .flat_map(|map| map.values())
        .map(Vec::len)
        .sum();
        solid + self.transparent_passes.len()
    }

    pub fn split_passes_by_lighting_type(&self) -> bool {
        self.split_passes_by_lighting_type
    }

    pub fn set_split_passes_by_lighting_type(&mut self, split: bool) {
        self.split_passes_by_lighting_type = split;
    }

    pub fn split_no_shadow_passes(&self) -> bool {
        self.split_no_shadow_passes
    }

    pub fn set_split_no_shadow_passes(&mut self, split: bool) {
        self.split_no_shadow_passes = split;
    }

    pub fn shadow_casters_not_receivers(&self) -> bool {
        self.shadow_casters_not_receivers
    }

    pub fn set_shadow_casters_not_receivers(&mut self, enabled: bool) {
        self.shadow_casters_not_receivers = enabled;
    }
}

#[cfg(test)]
#[path = "priority_group_tests.rs"]
mod tests;
