/// Shared parameter pools and their binding to parameter sets.
///
/// A [`GpuSharedParameters`] pool holds packed constants that many programs
/// read (a per-frame block, fog settings...). Each parameter set using the
/// pool owns a [`GpuSharedParametersUsage`] that caches a copy plan from
/// the pool's packed layout to the set's padded layout.
///
/// The plan is tagged with the pool version it was built against and
/// rebuilt lazily on the next copy after the pool changes structure.

use std::sync::{Arc, Mutex};
use glam::{Mat4, Vec3, Vec4};
use crate::error::{poisoned, Result};
use crate::{orbit_bail, orbit_err, orbit_trace};
use super::constant_list::{ConstantList, FloatConstantList, IntConstantList};
use super::constants::{
    ConstantBank, GpuConstantDefinition, GpuConstantType, GpuNamedConstants, GpuParamVariability,
};
use super::parameters::GpuProgramParameters;

pub type SharedParametersPtr = Arc<Mutex<GpuSharedParameters>>;

// ===== SHARED PARAMETERS =====

#[derive(Debug, Clone)]
pub struct GpuSharedParameters {
    name: String,
    named_constants: GpuNamedConstants,
    float_constants: FloatConstantList,
    int_constants: IntConstantList,
    version: u64,
}

impl GpuSharedParameters {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            named_constants: GpuNamedConstants::new(),
            float_constants: ConstantList::new(),
            int_constants: ConstantList::new(),
            version: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Incremented on every add/remove of a definition
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn named_constants(&self) -> &GpuNamedConstants {
        &self.named_constants
    }

    pub fn float_constants(&self) -> &[f32] {
        self.float_constants.as_slice()
    }

    pub fn int_constants(&self) -> &[i32] {
        self.int_constants.as_slice()
    }

    pub fn find_constant_definition(&self, name: &str) -> Option<&GpuConstantDefinition> {
        self.named_constants.get(name)
    }

    /// Add a packed constant at the end of its bank
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidResource` if the name exists, the type is
    /// unknown or `array_size` is zero.
    pub fn add_constant_definition(
        &mut self,
        name: &str,
        constant_type: GpuConstantType,
        array_size: usize,
    ) -> Result<()> {
        if self.named_constants.contains(name) {
            orbit_bail!("orbit3d::GpuSharedParameters",
                "Constant entry with name '{}' already exists in '{}'", name, self.name);
        }
        if constant_type == GpuConstantType::Unknown || array_size == 0 {
            orbit_bail!("orbit3d::GpuSharedParameters",
                "Constant '{}' needs a known type and a non-zero array size", name);
        }

        let element_size = constant_type.element_size(false);
        let total = element_size * array_size;
        let physical_index = match constant_type.bank() {
            ConstantBank::Float => {
                let physical = self.float_constants.len();
                self.float_constants.extend_zeros(total);
                self.named_constants.float_buffer_size = self.float_constants.len();
                physical
            }
            ConstantBank::Int => {
                let physical = self.int_constants.len();
                self.int_constants.extend_zeros(total);
                self.named_constants.int_buffer_size = self.int_constants.len();
                physical
            }
        };

        self.named_constants.insert(name, GpuConstantDefinition {
            constant_type,
            physical_index,
            logical_index: 0,
            element_size,
            array_size,
            variability: GpuParamVariability::GLOBAL,
        });
        self.version += 1;
        Ok(())
    }

    /// Remove a constant and compact its bank
    ///
    /// # Returns
    ///
    /// `false` if no constant has this name
    pub fn remove_constant_definition(&mut self, name: &str) -> Result<bool> {
        let Some(def) = self.named_constants.remove(name) else {
            return Ok(false);
        };
        let count = def.total_size();
        let bank = def.bank();

        for (_, other) in self.named_constants.iter_mut() {
            if other.bank() == bank && other.physical_index > def.physical_index {
                other.physical_index -= count;
            }
        }
        match bank {
            ConstantBank::Float => {
                self.float_constants.remove_range(def.physical_index, count)?;
                self.named_constants.float_buffer_size = self.float_constants.len();
            }
            ConstantBank::Int => {
                self.int_constants.remove_range(def.physical_index, count)?;
                self.named_constants.int_buffer_size = self.int_constants.len();
            }
        }
        self.version += 1;
        Ok(true)
    }

    pub fn remove_all_constant_definitions(&mut self) {
        self.named_constants.clear();
        self.float_constants.clear();
        self.int_constants.clear();
        self.version += 1;
    }

    // ===== NAMED VALUES =====
    //
    // Unknown names are ignored; values are clamped to the definition extent.

    pub fn set_named_f32s(&mut self, name: &str, values: &[f32]) -> Result<()> {
        let Some(def) = self.named_constants.get(name).copied() else {
            return Ok(());
        };
        if !def.is_float() {
            orbit_bail!("orbit3d::GpuSharedParameters", "Constant '{}' is not a float constant", name);
        }
        let count = values.len().min(def.total_size());
        self.float_constants.write(def.physical_index, &values[..count])
    }

    pub fn set_named_i32s(&mut self, name: &str, values: &[i32]) -> Result<()> {
        let Some(def) = self.named_constants.get(name).copied() else {
            return Ok(());
        };
        if def.is_float() {
            orbit_bail!("orbit3d::GpuSharedParameters", "Constant '{}' is not an int constant", name);
        }
        let count = values.len().min(def.total_size());
        self.int_constants.write(def.physical_index, &values[..count])
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

    pub fn set_named_vec4(&mut self, name: &str, value: Vec4) -> Result<()> {
        self.set_named_f32s(name, &value.to_array())
    }

    /// Matrices are stored rows first
    pub fn set_named_mat4(&mut self, name: &str, value: &Mat4) -> Result<()> {
        self.set_named_f32s(name, &value.transpose().to_cols_array())
    }

    pub fn set_named_mat4_array(&mut self, name: &str, values: &[Mat4]) -> Result<()> {
        let flat: Vec<f32> = values.iter()
            .flat_map(|m| m.transpose().to_cols_array())
            .collect();
        self.set_named_f32s(name, &flat)
    }
}

// ===== USAGE =====

/// One planned copy from the pool into a parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyDataEntry {
    pub constant_type: GpuConstantType,
    pub src_physical_index: usize,
    pub src_element_size: usize,
    pub dst_physical_index: usize,
    pub dst_element_size: usize,
    pub array_size: usize,
}

/// Binding of a shared pool to one parameter set
pub struct GpuSharedParametersUsage {
    shared: SharedParametersPtr,
    name: String,
    copy_data: Vec<CopyDataEntry>,
    /// Pool version the plan was built against, `None` before the first build
    copy_data_version: Option<u64>,
}

impl GpuSharedParametersUsage {
    pub fn new(shared: SharedParametersPtr) -> Result<Self> {
        let name = shared.lock()
            .map_err(|_| poisoned("GpuSharedParameters"))?
            .name()
            .to_string();
        Ok(Self {
            shared,
            name,
            copy_data: Vec::new(),
            copy_data_version: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shared_parameters(&self) -> &SharedParametersPtr {
        &self.shared
    }

    pub fn copy_data_version(&self) -> Option<u64> {
        self.copy_data_version
    }

    pub fn copy_entries(&self) -> &[CopyDataEntry] {
        &self.copy_data
    }

    pub fn copy_entry_count(&self) -> usize {
        self.copy_data.len()
    }

    /// Copy the pool's values into `target`
    ///
    /// Rebuilds the plan first if the pool version changed since the last
    /// build. 4×4 matrices are transposed element by element when the
    /// target transposes matrices; other constants are copied as-is when
    /// the layouts agree, or expanded from packed to padded otherwise.
    pub fn copy_to_target(&mut self, target: &mut GpuProgramParameters) -> Result<()> {
        let shared = self.shared.lock().map_err(|_| poisoned("GpuSharedParameters"))?;
        if self.copy_data_version != Some(shared.version()) {
            self.copy_data = Self::build_copy_data(&shared, target);
            self.copy_data_version = Some(shared.version());
            orbit_trace!("orbit3d::GpuSharedParametersUsage",
                "Rebuilt copy plan for '{}' at version {} ({} entries)",
                self.name, shared.version(), self.copy_data.len());
        }

        let transpose = target.transpose_matrices();
        for entry in &self.copy_data {
            if entry.constant_type.is_float() {
                let transpose = transpose && entry.constant_type == GpuConstantType::Matrix4x4;
                copy_entry(entry, shared.float_constants(), target.float_constants_mut(), transpose)?;
            } else {
                copy_entry(entry, shared.int_constants(), target.int_constants_mut(), false)?;
            }
        }
        Ok(())
    }

    fn build_copy_data(shared: &GpuSharedParameters, target: &GpuProgramParameters) -> Vec<CopyDataEntry> {
        shared.named_constants().iter()
            .filter_map(|(name, src)| {
                let dst = target.find_named_constant_definition(name)?;
                (dst.constant_type == src.constant_type && dst.array_size == src.array_size)
                    .then(|| CopyDataEntry {
                        constant_type: dst.constant_type,
                        src_physical_index: src.physical_index,
                        src_element_size: src.element_size,
                        dst_physical_index: dst.physical_index,
                        dst_element_size: dst.element_size,
                        array_size: dst.array_size,
                    })
            })
            .collect()
    }
}

impl Clone for GpuSharedParametersUsage {
    /// The clone binds the same pool with an unbuilt plan
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            name: self.name.clone(),
            copy_data: Vec::new(),
            copy_data_version: None,
        }
    }
}

impl std::fmt::Debug for GpuSharedParametersUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuSharedParametersUsage")
            .field("name", &self.name)
            .field("copy_data", &self.copy_data)
            .field("copy_data_version", &self.copy_data_version)
            .finish()
    }
}

fn copy_entry<T: Copy>(entry: &CopyDataEntry, src: &[T], dst: &mut [T], transpose: bool) -> Result<()> {
    let array_size = entry.array_size;

    if transpose {
        for element in 0..array_size {
            let s = range(src, entry.src_physical_index + element * entry.src_element_size, 16)?;
            let d = range_mut(dst, entry.dst_physical_index + element * entry.dst_element_size, 16)?;
            for row in 0..4 {
                for col in 0..4 {
                    d[row * 4 + col] = s[col * 4 + row];
                }
            }
        }
    } else if entry.src_element_size == entry.dst_element_size {
        let count = entry.dst_element_size * array_size;
        range_mut(dst, entry.dst_physical_index, count)?
            .copy_from_slice(range(src, entry.src_physical_index, count)?);
    } else {
        // Packed source, destination padded to whole registers
        if entry.dst_element_size % 4 != 0 {
            orbit_bail!("orbit3d::GpuSharedParametersUsage",
                "Padded element size {} is not a multiple of 4", entry.dst_element_size);
        }
        let iterations = entry.dst_element_size / 4 * array_size;
        if iterations == 0 {
            return Ok(());
        }
        // Spread the whole packed array over the registers, not one element
        let values_per_iteration = entry.src_element_size * array_size / iterations;
        let mut src_index = entry.src_physical_index;
        let mut dst_index = entry.dst_physical_index;
        for _ in 0..iterations {
            range_mut(dst, dst_index, values_per_iteration)?
                .copy_from_slice(range(src, src_index, values_per_iteration)?);
            src_index += values_per_iteration;
            dst_index += 4;
        }
    }
    Ok(())
}

fn range<T>(values: &[T], start: usize, count: usize) -> Result<&[T]> {
    let len = values.len();
    values.get(start..start + count).ok_or_else(|| {
        orbit_err!(BoundsViolation => "orbit3d::GpuSharedParametersUsage",
            "Range {}+{} beyond bank of {} values", start, count, len)
    })
}

fn range_mut<T>(values: &mut [T], start: usize, count: usize) -> Result<&mut [T]> {
    let len = values.len();
    values.get_mut(start..start + count).ok_or_else(|| {
        orbit_err!(BoundsViolation => "orbit3d::GpuSharedParametersUsage",
            "Range {}+{} beyond bank of {} values", start, count, len)
    })
}

#[cfg(test)]
#[path = "shared_parameters_tests.rs"]
mod tests;
