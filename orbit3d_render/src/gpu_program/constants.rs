/// Named constant tables and logical index maps.
///
/// Every GPU program parameter set keeps two flat banks (floats and ints).
/// A [`GpuNamedConstants`] table maps a shader constant name to the place
/// its data lives in one of the banks; a [`GpuLogicalBufferStruct`] does
/// the same for the numeric register indexes used by assembly programs.
///
/// Element sizes are padded to multiples of 4 in program tables (vector
/// registers) and packed in shared parameter pools.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use bitflags::bitflags;
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::orbit_bail;

// ===== CONSTANT TYPE =====

/// Data type of a shader constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuConstantType {
    Float1,
    Float2,
    Float3,
    Float4,
    Sampler1D,
    Sampler2D,
    Sampler3D,
    SamplerCube,
    Sampler1DShadow,
    Sampler2DShadow,
    Matrix2x2,
    Matrix2x3,
    Matrix2x4,
    Matrix3x2,
    Matrix3x3,
    Matrix3x4,
    Matrix4x2,
    Matrix4x3,
    Matrix4x4,
    Int1,
    Int2,
    Int3,
    Int4,
    Unknown,
}

/// Bank holding the data of a constant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantBank {
    Float,
    Int,
}

impl GpuConstantType {
    /// Number of scalars of one element
    ///
    /// With `pad_to_4` the size is rounded up to whole vector registers.
    pub fn element_size(&self, pad_to_4: bool) -> usize {
        use GpuConstantType::*;
        match self {
            Float1 | Int1 | Sampler1D | Sampler2D | Sampler3D | SamplerCube
            | Sampler1DShadow | Sampler2DShadow => if pad_to_4 { 4 } else { 1 },
            Float2 | Int2 => if pad_to_4 { 4 } else { 2 },
            Float3 | Int3 => if pad_to_4 { 4 } else { 3 },
            Float4 | Int4 => 4,
            Matrix2x2 => if pad_to_4 { 8 } else { 4 },
            Matrix2x3 | Matrix3x2 => if pad_to_4 { 8 } else { 6 },
            Matrix2x4 | Matrix4x2 => 8,
            Matrix3x3 => if pad_to_4 { 12 } else { 9 },
            Matrix3x4 | Matrix4x3 => 12,
            Matrix4x4 => 16,
            Unknown => 0,
        }
    }

    pub fn is_float(&self) -> bool {
        use GpuConstantType::*;
        matches!(
            self,
            Float1 | Float2 | Float3 | Float4
                | Matrix2x2 | Matrix2x3 | Matrix2x4
                | Matrix3x2 | Matrix3x3 | Matrix3x4
                | Matrix4x2 | Matrix4x3 | Matrix4x4
        )
    }

    pub fn is_sampler(&self) -> bool {
        use GpuConstantType::*;
        matches!(
            self,
            Sampler1D | Sampler2D | Sampler3D | SamplerCube | Sampler1DShadow | Sampler2DShadow
        )
    }

    /// Ints and samplers (texture units) live in the int bank
    pub fn is_int(&self) -> bool {
        !self.is_float() && *self != GpuConstantType::Unknown
    }

    pub fn bank(&self) -> ConstantBank {
        if self.is_float() { ConstantBank::Float } else { ConstantBank::Int }
    }

    /// Stable numeric code used by the binary named constants format
    pub fn code(&self) -> u32 {
        use GpuConstantType::*;
        match self {
            Float1 => 1,
            Float2 => 2,
            Float3 => 3,
            Float4 => 4,
            Sampler1D => 5,
            Sampler2D => 6,
            Sampler3D => 7,
            SamplerCube => 8,
            Sampler1DShadow => 9,
            Sampler2DShadow => 10,
            Matrix2x2 => 11,
            Matrix2x3 => 12,
            Matrix2x4 => 13,
            Matrix3x2 => 14,
            Matrix3x3 => 15,
            Matrix3x4 => 16,
            Matrix4x2 => 17,
            Matrix4x3 => 18,
            Matrix4x4 => 19,
            Int1 => 20,
            Int2 => 21,
            Int3 => 22,
            Int4 => 23,
            Unknown => 99,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        use GpuConstantType::*;
        Some(match code {
            1 => Float1,
            2 => Float2,
            3 => Float3,
            4 => Float4,
            5 => Sampler1D,
            6 => Sampler2D,
            7 => Sampler3D,
            8 => SamplerCube,
            9 => Sampler1DShadow,
            10 => Sampler2DShadow,
            11 => Matrix2x2,
            12 => Matrix2x3,
            13 => Matrix2x4,
            14 => Matrix3x2,
            15 => Matrix3x3,
            16 => Matrix3x4,
            17 => Matrix4x2,
            18 => Matrix4x3,
            19 => Matrix4x4,
            20 => Int1,
            21 => Int2,
            22 => Int3,
            23 => Int4,
            99 => Unknown,
            _ => return None,
        })
    }
}

// ===== VARIABILITY =====

bitflags! {
    /// How often a constant's value changes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GpuParamVariability: u16 {
        /// No variation except by manual setting
        const GLOBAL = 1;
        /// Varies per object (world matrix, ...)
        const PER_OBJECT = 2;
        /// Varies with the light setup
        const LIGHTS = 4;
        /// Varies with pass iteration number
        const PASS_ITERATION_NUMBER = 8;
        const ALL = 0xFFFF;
    }
}

// ===== DEFINITION =====

/// Location and shape of one named constant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuConstantDefinition {
    pub constant_type: GpuConstantType,
    /// Offset of the first scalar in the float or int bank
    pub physical_index: usize,
    /// Register index for assembly programs
    pub logical_index: usize,
    /// Scalars per array element (padded or packed)
    pub element_size: usize,
    pub array_size: usize,
    pub variability: GpuParamVariability,
}

impl GpuConstantDefinition {
    pub fn is_float(&self) -> bool {
        self.constant_type.is_float()
    }

    pub fn is_int(&self) -> bool {
        self.constant_type.is_int()
    }

    pub fn bank(&self) -> ConstantBank {
        self.constant_type.bank()
    }

    /// Scalars covered by the whole array
    pub fn total_size(&self) -> usize {
        self.element_size * self.array_size
    }
}

// ===== NAMED CONSTANTS =====

/// Array entries beyond this many elements get no `name[i]` alias
const MAX_GENERATED_ARRAY_ENTRIES: usize = 16;

/// Name → definition table with the bank sizes it requires
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpuNamedConstants {
    pub float_buffer_size: usize,
    pub int_buffer_size: usize,
    map: FxHashMap<String, GpuConstantDefinition>,
}

impl GpuNamedConstants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a definition using the padded (vector register) layout
    ///
    /// The constant is placed at the end of its bank; `name[i]` aliases are
    /// generated for arrays.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidResource` for a duplicate name, an unknown type
    /// or a zero array size.
    pub fn add_definition(
        &mut self,
        name: &str,
        constant_type: GpuConstantType,
        array_size: usize,
    ) -> Result<GpuConstantDefinition> {
        if self.map.contains_key(name) {
            orbit_bail!("orbit3d::GpuNamedConstants", "Constant entry with name '{}' already exists", name);
        }
        if constant_type == GpuConstantType::Unknown || array_size == 0 {
            orbit_bail!("orbit3d::GpuNamedConstants",
                "Constant '{}' needs a known type and a non-zero array size", name);
        }

        let element_size = constant_type.element_size(true);
        let buffer_size = match constant_type.bank() {
            ConstantBank::Float => &mut self.float_buffer_size,
            ConstantBank::Int => &mut self.int_buffer_size,
        };
        let def = GpuConstantDefinition {
            constant_type,
            physical_index: *buffer_size,
            logical_index: *buffer_size,
            element_size,
            array_size,
            variability: GpuParamVariability::GLOBAL,
        };
        *buffer_size += def.total_size();

        self.map.insert(name.to_string(), def);
        if array_size > 1 {
            self.generate_array_entries(name, &def);
        }
        Ok(def)
    }

    /// Insert a definition as-is; bank sizes are not touched
    pub fn insert(&mut self, name: &str, def: GpuConstantDefinition) {
        self.map.insert(name.to_string(), def);
    }

    /// Add `name[0]`, `name[1]`... aliases of single array elements
    ///
    /// Only the first 16 elements get an alias. Bank sizes are unchanged.
    pub fn generate_array_entries(&mut self, name: &str, base: &GpuConstantDefinition) {
        let mut element = *base;
        element.array_size = 1;
        let count = if base.array_size <= MAX_GENERATED_ARRAY_ENTRIES { base.array_size } else { 1 };
        for i in 0..count {
            self.map.insert(format!("{}[{}]", name, i), element);
            element.physical_index += element.element_size;
        }
    }

    pub fn get(&self, name: &str) -> Option<&GpuConstantDefinition> {
        self.map.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut GpuConstantDefinition> {
        self.map.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<GpuConstantDefinition> {
        self.map.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &GpuConstantDefinition)> {
        self.map.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut GpuConstantDefinition)> {
        self.map.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.float_buffer_size = 0;
        self.int_buffer_size = 0;
    }

    /// Shift definitions of `bank` starting at or after `from` by `count` scalars
    pub(crate) fn shift_physical_indexes(&mut self, bank: ConstantBank, from: usize, count: usize) {
        for def in self.map.values_mut() {
            if def.bank() == bank && def.physical_index >= from {
                def.physical_index += count;
            }
        }
        match bank {
            ConstantBank::Float => self.float_buffer_size += count,
            ConstantBank::Int => self.int_buffer_size += count,
        }
    }
}

// ===== LOGICAL INDEXES =====

/// Physical placement of one logical register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuLogicalIndexUse {
    pub physical_index: usize,
    /// Scalars reserved for the register group starting here
    pub current_size: usize,
    pub variability: GpuParamVariability,
}

/// Logical → physical map of one bank, shared by a program and its parameter sets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpuLogicalBufferStruct {
    pub map: BTreeMap<usize, GpuLogicalIndexUse>,
    pub buffer_size: usize,
}

impl GpuLogicalBufferStruct {
    pub fn new() -> Self {
        Self::default()
    }
}

pub type SharedLogicalBuffer = Arc<Mutex<GpuLogicalBufferStruct>>;

#[cfg(test)]
#[path = "constants_tests.rs"]
mod tests;
