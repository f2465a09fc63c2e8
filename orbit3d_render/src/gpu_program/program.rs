/// GPU program definitions.
///
/// A [`GpuProgram`] owns the constant layout of one shader: its named
/// constant table and its logical register maps. Parameter sets created
/// from it share those tables.

use std::io::Read;
use std::sync::{Arc, Mutex};
use crate::config::{RenderConfig, RenderSystemCapabilities};
use crate::error::{poisoned, Result};
use crate::orbit_debug;
use super::constants::{
    ConstantBank, GpuConstantDefinition, GpuConstantType, GpuLogicalBufferStruct, GpuLogicalIndexUse,
    GpuNamedConstants, SharedLogicalBuffer,
};
use super::parameters::GpuProgramParameters;
use super::serializer::GpuNamedConstantsSerializer;

/// Language name of programs that never run
pub const NULL_LANGUAGE: &str = "null";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuProgramType {
    Vertex,
    Fragment,
    Geometry,
}

#[derive(Debug)]
pub struct GpuProgram {
    name: String,
    program_type: GpuProgramType,
    language: String,
    syntax_code: String,
    named_constants: Arc<GpuNamedConstants>,
    float_logical: SharedLogicalBuffer,
    int_logical: SharedLogicalBuffer,
    manual_named_constants: bool,
    default_parameters: Option<GpuProgramParameters>,
    #[cfg(feature = "multithreaded")]
    create_parameters_lock: Mutex<()>,
}

impl GpuProgram {
    pub fn new(name: &str, program_type: GpuProgramType, language: &str) -> Self {
        Self {
            name: name.to_string(),
            program_type,
            language: language.to_string(),
            syntax_code: String::new(),
            named_constants: Arc::new(GpuNamedConstants::new()),
            float_logical: Arc::new(Mutex::new(GpuLogicalBufferStruct::new())),
            int_logical: Arc::new(Mutex::new(GpuLogicalBufferStruct::new())),
            manual_named_constants: false,
            default_parameters: None,
            #[cfg(feature = "multithreaded")]
            create_parameters_lock: Mutex::new(()),
        }
    }

    pub fn with_syntax(mut self, syntax_code: &str) -> Self {
        self.syntax_code = syntax_code.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program_type(&self) -> GpuProgramType {
        self.program_type
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn syntax_code(&self) -> &str {
        &self.syntax_code
    }

    pub fn set_syntax_code(&mut self, syntax_code: &str) {
        self.syntax_code = syntax_code.to_string();
    }

    pub fn named_constants(&self) -> &GpuNamedConstants {
        &self.named_constants
    }

    pub fn float_logical_buffer(&self) -> &SharedLogicalBuffer {
        &self.float_logical
    }

    pub fn int_logical_buffer(&self) -> &SharedLogicalBuffer {
        &self.int_logical
    }

    pub fn has_manual_named_constants(&self) -> bool {
        self.manual_named_constants
    }

    /// Whether the render system can run this program
    pub fn is_supported(&self, capabilities: &RenderSystemCapabilities) -> bool {
        if self.language == NULL_LANGUAGE {
            return false;
        }
        self.syntax_code.is_empty() || capabilities.is_syntax_supported(&self.syntax_code)
    }

    // ===== CONSTANT LAYOUT =====

    /// Append a constant to the program's table (padded layout)
    ///
    /// Parameter sets created earlier keep the table they were created with.
    pub fn add_constant_definition(
        &mut self,
        name: &str,
        constant_type: GpuConstantType,
        array_size: usize,
    ) -> Result<GpuConstantDefinition> {
        Arc::make_mut(&mut self.named_constants).add_definition(name, constant_type, array_size)
    }

    /// Replace the constant table with one supplied by the caller
    ///
    /// The logical maps are rebuilt from the definitions' logical indexes.
    pub fn set_manual_named_constants(&mut self, named: GpuNamedConstants) -> Result<()> {
        let mut float = GpuLogicalBufferStruct::new();
        let mut int = GpuLogicalBufferStruct::new();
        float.buffer_size = named.float_buffer_size;
        int.buffer_size = named.int_buffer_size;

        for (_, def) in named.iter() {
            let buffer = match def.bank() {
                ConstantBank::Float => &mut float,
                ConstantBank::Int => &mut int,
            };
            buffer.map.entry(def.logical_index).or_insert(GpuLogicalIndexUse {
                physical_index: def.physical_index,
                current_size: def.total_size(),
                variability: def.variability,
            });
        }

        *self.float_logical.lock().map_err(|_| poisoned("Float logical buffer"))? = float;
        *self.int_logical.lock().map_err(|_| poisoned("Int logical buffer"))? = int;
        orbit_debug!("orbit3d::GpuProgram", "Program '{}' uses {} manual named constants",
            self.name, named.len());
        self.named_constants = Arc::new(named);
        self.manual_named_constants = true;
        Ok(())
    }

    /// Load a manual constant table written by [`GpuNamedConstantsSerializer`]
    pub fn load_manual_named_constants<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        let named = GpuNamedConstantsSerializer::import(reader)?;
        self.set_manual_named_constants(named)
    }

    // ===== PARAMETERS =====

    /// Create a parameter set sharing this program's layout
    ///
    /// Values of the default parameters, when present, are copied in.
    pub fn create_parameters(&self, config: &RenderConfig) -> Result<GpuProgramParameters> {
        #[cfg(feature = "multithreaded")]
        let _guard = self.create_parameters_lock.lock()
            .map_err(|_| poisoned("GpuProgram parameter creation"))?;

        let mut params = GpuProgramParameters::with_grow_step(config.constant_list_grow_step);
        params.set_transpose_matrices(config.transpose_matrices);
        params.set_logical_indexes(self.float_logical.clone(), self.int_logical.clone())?;
        params.set_named_constants(self.named_constants.clone())?;

        if let Some(defaults) = &self.default_parameters {
            params.copy_constants_from(defaults);
        }
        Ok(params)
    }

    pub fn default_parameters(&self) -> Option<&GpuProgramParameters> {
        self.default_parameters.as_ref()
    }

    /// Default parameters, created on first access
    pub fn default_parameters_mut(&mut self, config: &RenderConfig) -> Result<&mut GpuProgramParameters> {
        let params = match self.default_parameters.take() {
            Some(params) => params,
            None => self.create_parameters(config)?,
        };
        Ok(self.default_parameters.insert(params))
    }

    pub fn has_default_parameters(&self) -> bool {
        self.default_parameters.is_some()
    }
}

#[cfg(test)]
#[path = "program_tests.rs"]
mod tests;
