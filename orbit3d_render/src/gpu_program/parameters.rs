/// Per-program parameter sets.
///
/// A GpuProgramParameters holds the float and int banks a program reads,
/// plus the tables that locate constants in them:
/// - named constants (high-level programs), shared with the program and
///   copied on write when a logical index grows in place
/// - logical → physical maps (assembly programs), shared with the program
///   and every other parameter set created from it
///
/// Shared parameter pools are bound through [`GpuSharedParametersUsage`]
/// and pulled in with [`copy_shared_params`](GpuProgramParameters::copy_shared_params).

use std::sync::Arc;
use glam::{Mat4, Vec3, Vec4};
use crate::error::{poisoned, Error, Result};
use crate::{orbit_bail, orbit_err};
use super::constant_list::{ConstantList, FloatConstantList, IntConstantList, DEFAULT_GROW_STEP};
use super::constants::{
    ConstantBank, GpuConstantDefinition, GpuLogicalBufferStruct, GpuLogicalIndexUse,
    GpuNamedConstants, GpuParamVariability, SharedLogicalBuffer,
};
use super::shared_parameters::{GpuSharedParametersUsage, SharedParametersPtr};

#[derive(Debug, Clone)]
pub struct GpuProgramParameters {
    float_constants: FloatConstantList,
    int_constants: IntConstantList,
    float_logical: Option<SharedLogicalBuffer>,
    int_logical: Option<SharedLogicalBuffer>,
    named_constants: Option<Arc<GpuNamedConstants>>,
    transpose_matrices: bool,
    ignore_missing_parameters: bool,
    shared_usages: Vec<GpuSharedParametersUsage>,
}

impl GpuProgramParameters {
    pub fn new() -> Self {
        Self::with_grow_step(DEFAULT_GROW_STEP)
    }

    pub fn with_grow_step(grow_step: usize) -> Self {
        Self {
            float_constants: ConstantList::with_grow_step(grow_step),
            int_constants: ConstantList::with_grow_step(grow_step),
            float_logical: None,
            int_logical: None,
            named_constants: None,
            transpose_matrices: false,
            ignore_missing_parameters: false,
            shared_usages: Vec::new(),
        }
    }

    // ===== LAYOUT TABLES =====

    /// Attach a named constant table, growing the banks to its sizes
    pub fn set_named_constants(&mut self, named: Arc<GpuNamedConstants>) -> Result<()> {
        if named.float_buffer_size > self.float_constants.len() {
            self.float_constants.resize(named.float_buffer_size)?;
        }
        if named.int_buffer_size > self.int_constants.len() {
            self.int_constants.resize(named.int_buffer_size)?;
        }
        self.named_constants = Some(named);
        Ok(())
    }

    /// Attach logical index maps, growing the banks to their sizes
    pub fn set_logical_indexes(&mut self, float: SharedLogicalBuffer, int: SharedLogicalBuffer) -> Result<()> {
        let float_size = float.lock().map_err(|_| poisoned("Float logical buffer"))?.buffer_size;
        let int_size = int.lock().map_err(|_| poisoned("Int logical buffer"))?.buffer_size;
        if float_size > self.float_constants.len() {
            self.float_constants.resize(float_size)?;
        }
        if int_size > self.int_constants.len() {
            self.int_constants.resize(int_size)?;
        }
        self.float_logical = Some(float);
        self.int_logical = Some(int);
        Ok(())
    }

    pub fn named_constants(&self) -> Option<&GpuNamedConstants> {
        self.named_constants.as_deref()
    }

    pub fn has_named_constants(&self) -> bool {
        self.named_constants.is_some()
    }

    pub fn has_logical_indexed_constants(&self) -> bool {
        self.float_logical.is_some()
    }

    pub fn find_named_constant_definition(&self, name: &str) -> Option<&GpuConstantDefinition> {
        self.named_constants.as_ref()?.get(name)
    }

    // ===== FLAGS =====

    pub fn transpose_matrices(&self) -> bool {
        self.transpose_matrices
    }

    /// Write matrices column-major instead of rows first
    pub fn set_transpose_matrices(&mut self, transpose: bool) {
        self.transpose_matrices = transpose;
    }

    pub fn ignore_missing_parameters(&self) -> bool {
        self.ignore_missing_parameters
    }

    pub fn set_ignore_missing_parameters(&mut self, ignore: bool) {
        self.ignore_missing_parameters = ignore;
    }

    // ===== BANKS =====

    pub fn float_constants(&self) -> &[f32] {
        self.float_constants.as_slice()
    }

    pub fn int_constants(&self) -> &[i32] {
        self.int_constants.as_slice()
    }

    pub fn float_constants_mut(&mut self) -> &mut [f32] {
        self.float_constants.as_mut_slice()
    }

    pub fn int_constants_mut(&mut self) -> &mut [i32] {
        self.int_constants.as_mut_slice()
    }

    pub fn float_constant(&self, physical_index: usize) -> Option<f32> {
        self.float_constants.get(physical_index)
    }

    pub fn int_constant(&self, physical_index: usize) -> Option<i32> {
        self.int_constants.get(physical_index)
    }

    // ===== RAW (PHYSICAL) WRITES =====

    pub fn write_raw_f32s(&mut self, physical_index: usize, values: &[f32]) -> Result<()> {
        self.float_constants.write(physical_index, values)
    }

    pub fn write_raw_i32s(&mut self, physical_index: usize, values: &[i32]) -> Result<()> {
        self.int_constants.write(physical_index, values)
    }

    /// Write the first `count` (at most 4) components of a vector
    pub fn write_raw_vec4(&mut self, physical_index: usize, value: Vec4, count: usize) -> Result<()> {
        let values = value.to_array();
        self.write_raw_f32s(physical_index, &values[..count.min(4)])
    }

    /// Write the first `element_count` (at most 16) scalars of a matrix
    pub fn write_raw_mat4(&mut self, physical_index: usize, value: &Mat4, element_count: usize) -> Result<()> {
        let values = self.matrix_values(value);
        self.write_raw_f32s(physical_index, &values[..element_count.min(16)])
    }

    pub fn write_raw_mat4_array(&mut self, physical_index: usize, values: &[Mat4]) -> Result<()> {
        let flat: Vec<f32> = values.iter().flat_map(|m| self.matrix_values(m)).collect();
        self.write_raw_f32s(physical_index, &flat)
    }

    fn matrix_values(&self, value: &Mat4) -> [f32; 16] {
        if self.transpose_matrices {
            value.to_cols_array()
        } else {
            value.transpose().to_cols_array()
        }
    }

    // ===== LOGICAL WRITES =====

    /// Write whole registers starting at a logical index
    ///
    /// The values are padded with zeros to a multiple of 4. Unknown logical
    /// indexes get registers at the end of the bank; an entry too small for
    /// the write is widened in place.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidResource` when the set has no logical index map.
    pub fn set_constant_f32s(&mut self, logical_index: usize, values: &[f32]) -> Result<()> {
        let mut padded = values.to_vec();
        padded.resize(values.len().div_ceil(4).max(1) * 4, 0.0);
        let physical = self.float_physical_index_for(logical_index, padded.len(), GpuParamVariability::GLOBAL)?;
        self.write_raw_f32s(physical, &padded)
    }

    pub fn set_constant_f32(&mut self, logical_index: usize, value: f32) -> Result<()> {
        self.set_constant_vec4(logical_index, Vec4::new(value, 0.0, 0.0, 0.0))
    }

    /// The w component is set to 1
    pub fn set_constant_vec3(&mut self, logical_index: usize, value: Vec3) -> Result<()> {
        self.set_constant_vec4(logical_index, value.extend(1.0))
    }

    pub fn set_constant_vec4(&mut self, logical_index: usize, value: Vec4) -> Result<()> {
        self.set_constant_f32s(logical_index, &value.to_array())
    }

    pub fn set_constant_mat4(&mut self, logical_index: usize, value: &Mat4) -> Result<()> {
        let values = self.matrix_values(value);
        self.set_constant_f32s(logical_index, &values)
    }

    pub fn set_constant_mat4_array(&mut self, logical_index: usize, values: &[Mat4]) -> Result<()> {
        let flat: Vec<f32> = values.iter().flat_map(|m| self.matrix_values(m)).collect();
        self.set_constant_f32s(logical_index, &flat)
    }

    pub fn set_constant_i32s(&mut self, logical_index: usize, values: &[i32]) -> Result<()> {
        let mut padded = values.to_vec();
        padded.resize(values.len().div_ceil(4).max(1) * 4, 0);
        let physical = self.int_physical_index_for(logical_index, padded.len(), GpuParamVariability::GLOBAL)?;
        self.write_raw_i32s(physical, &padded)
    }

    /// Physical index of a logical float register, if mapped
    pub fn float_logical_index_use(&self, logical_index: usize) -> Option<GpuLogicalIndexUse> {
        let buffer = self.float_logical.as_ref()?.lock().ok()?;
        buffer.map.get(&logical_index).copied()
    }

    pub fn int_logical_index_use(&self, logical_index: usize) -> Option<GpuLogicalIndexUse> {
        let buffer = self.int_logical.as_ref()?.lock().ok()?;
        buffer.map.get(&logical_index).copied()
    }

    fn float_physical_index_for(
        &mut self,
        logical_index: usize,
        requested_size: usize,
        variability: GpuParamVariability,
    ) -> Result<usize> {
        let logical = self.float_logical.clone().ok_or_else(|| {
            orbit_err!("orbit3d::GpuProgramParameters",
                "This parameter set has no float logical index map")
        })?;
        let mut buffer = logical.lock().map_err(|_| poisoned("Float logical buffer"))?;
        logical_index_use(
            &mut buffer,
            &mut self.float_constants,
            &mut self.named_constants,
            ConstantBank::Float,
            logical_index,
            requested_size,
            variability,
        )
    }

    fn int_physical_index_for(
        &mut self,
        logical_index: usize,
        requested_size: usize,
        variability: GpuParamVariability,
    ) -> Result<usize> {
        let logical = self.int_logical.clone().ok_or_else(|| {
            orbit_err!("orbit3d::GpuProgramParameters",
                "This parameter set has no int logical index map")
        })?;
        let mut buffer = logical.lock().map_err(|_| poisoned("Int logical buffer"))?;
        logical_index_use(
            &mut buffer,
            &mut self.int_constants,
            &mut self.named_constants,
            ConstantBank::Int,
            logical_index,
            requested_size,
            variability,
        )
    }

    // ===== NAMED WRITES =====

    /// Definition of `name`, or an error unless missing names are ignored
    fn named_definition(&self, name: &str) -> Result<Option<GpuConstantDefinition>> {
        match self.find_named_constant_definition(name) {
            Some(def) => Ok(Some(*def)),
            None if self.ignore_missing_parameters => Ok(None),
            None => Err(orbit_err!(NotFound => "orbit3d::GpuProgramParameters",
                "Parameter called '{}' does not exist", name)),
        }
    }

    /// Write up to the definition's extent
    pub fn set_named_f32s(&mut self, name: &str, values: &[f32]) -> Result<()> {
        let Some(def) = self.named_definition(name)? else {
            return Ok(());
        };
        if !def.is_float() {
            orbit_bail!("orbit3d::GpuProgramParameters", "Parameter '{}' is not a float constant", name);
        }
        let count = values.len().min(def.total_size());
        self.write_raw_f32s(def.physical_index, &values[..count])
    }

    pub fn set_named_i32s(&mut self, name: &str, values: &[i32]) -> Result<()> {
        let Some(def) = self.named_definition(name)? else {
            return Ok(());
        };
        if def.is_float() {
            orbit_bail!("orbit3d::GpuProgramParameters", "Parameter '{}' is not an int constant", name);
        }
        let count = values.len().min(def.total_size());
        self.write_raw_i32s(def.physical_index, &values[..count])
    }

    pub fn set_named_f32(&mut self, name: &str, value: f32) -> Result<()> {
        self.set_named_f32s(name, &[value])
    }

    pub fn set_named_i32(&mut self, name: &str, value: i32) -> Result<()> {
        self.set_named_i32s(name, &[value])
    }

    pub fn set_named_vec3(&mut self, name: &str, value: Vec3) -> Result<()> {
        self.set_named_f32s(name, &value.to_array())
    }

    /// Writes at most the definition's element size
    pub fn set_named_vec4(&mut self, name: &str, value: Vec4) -> Result<()> {
        let Some(def) = self.named_definition(name)? else {
            return Ok(());
        };
        self.write_raw_vec4(def.physical_index, value, def.element_size)
    }

    pub fn set_named_mat4(&mut self, name: &str, value: &Mat4) -> Result<()> {
        let Some(def) = self.named_definition(name)? else {
            return Ok(());
        };
        self.write_raw_mat4(def.physical_index, value, def.element_size)
    }

    pub fn set_named_mat4_array(&mut self, name: &str, values: &[Mat4]) -> Result<()> {
        let flat: Vec<f32> = values.iter().flat_map(|m| self.matrix_values(m)).collect();
        self.set_named_f32s(name, &flat)
    }

    // ===== COPIES =====

    /// Take over the banks, layout tables and shared pools of `source`
    ///
    /// The matrix and missing-parameter flags of `self` are kept.
    pub fn copy_constants_from(&mut self, source: &GpuProgramParameters) {
        self.float_constants = source.float_constants.clone();
        self.int_constants = source.int_constants.clone();
        self.float_logical = source.float_logical.clone();
        self.int_logical = source.int_logical.clone();
        self.named_constants = source.named_constants.clone();
        self.shared_usages = source.shared_usages.clone();
    }

    /// Copy values of constants present with the same name in both sets
    ///
    /// The smaller of the two extents is copied.
    pub fn copy_matching_named_constants_from(&mut self, source: &GpuProgramParameters) -> Result<()> {
        let (Some(src_named), Some(dst_named)) = (source.named_constants.clone(), self.named_constants.clone()) else {
            return Ok(());
        };
        for (name, src_def) in src_named.iter() {
            let Some(dst_def) = dst_named.get(name) else {
                continue;
            };
            if src_def.bank() != dst_def.bank() {
                continue;
            }
            let count = src_def.total_size().min(dst_def.total_size());
            match dst_def.bank() {
                ConstantBank::Float => {
                    let values = source.float_constants.as_slice()
                        .get(src_def.physical_index..src_def.physical_index + count)
                        .ok_or_else(|| Error::BoundsViolation(format!("Source constant '{}' out of range", name)))?;
                    self.float_constants.write(dst_def.physical_index, values)?;
                }
                ConstantBank::Int => {
                    let values = source.int_constants.as_slice()
                        .get(src_def.physical_index..src_def.physical_index + count)
                        .ok_or_else(|| Error::BoundsViolation(format!("Source constant '{}' out of range", name)))?;
                    self.int_constants.write(dst_def.physical_index, values)?;
                }
            }
        }
        Ok(())
    }

    // ===== SHARED PARAMETERS =====

    /// Bind a shared pool; a pool with the same name is bound only once
    pub fn add_shared_parameters(&mut self, shared: SharedParametersPtr) -> Result<()> {
        let usage = GpuSharedParametersUsage::new(shared)?;
        if !self.is_using_shared_parameters(usage.name()) {
            self.shared_usages.push(usage);
        }
        Ok(())
    }

    pub fn is_using_shared_parameters(&self, name: &str) -> bool {
        self.shared_usages.iter().any(|usage| usage.name() == name)
    }

    pub fn remove_shared_parameters(&mut self, name: &str) -> bool {
        let before = self.shared_usages.len();
        self.shared_usages.retain(|usage| usage.name() != name);
        self.shared_usages.len() != before
    }

    pub fn remove_all_shared_parameters(&mut self) {
        self.shared_usages.clear();
    }

    pub fn shared_parameters(&self) -> &[GpuSharedParametersUsage] {
        &self.shared_usages
    }

    /// Pull the current values of every bound pool into the banks
    pub fn copy_shared_params(&mut self) -> Result<()> {
        let mut usages = std::mem::take(&mut self.shared_usages);
        let result = usages.iter_mut().try_for_each(|usage| usage.copy_to_target(self));
        self.shared_usages = usages;
        result
    }
}

impl Default for GpuProgramParameters {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve (and allocate or widen) the physical placement of a logical register
fn logical_index_use<T: Copy + Default>(
    buffer: &mut GpuLogicalBufferStruct,
    constants: &mut ConstantList<T>,
    named: &mut Option<Arc<GpuNamedConstants>>,
    bank: ConstantBank,
    logical_index: usize,
    requested_size: usize,
    variability: GpuParamVariability,
) -> Result<usize> {
    let Some(existing) = buffer.map.get(&logical_index).copied() else {
        let physical = constants.len();
        constants.extend_zeros(requested_size);
        buffer.buffer_size = constants.len();

        for register in 0..requested_size.div_ceil(4) {
            buffer.map.entry(logical_index + register).or_insert(GpuLogicalIndexUse {
                physical_index: physical + register * 4,
                current_size: requested_size,
                variability,
            });
        }
        return Ok(physical);
    };

    if existing.current_size < requested_size {
        let insert_count = requested_size - existing.current_size;
        let position = existing.physical_index + existing.current_size;
        constants.insert_zeros(position, insert_count)?;

        for entry in buffer.map.values_mut() {
            if entry.physical_index >= position {
                entry.physical_index += insert_count;
            }
        }
        buffer.buffer_size += insert_count;

        if let Some(named) = named.as_mut() {
            Arc::make_mut(named).shift_physical_indexes(bank, position, insert_count);
        }
    }

    if let Some(entry) = buffer.map.get_mut(&logical_index) {
        entry.current_size = entry.current_size.max(requested_size);
        entry.variability = variability;
    }
    Ok(existing.physical_index)
}

#[cfg(test)]
#[path = "parameters_tests.rs"]
mod tests;
