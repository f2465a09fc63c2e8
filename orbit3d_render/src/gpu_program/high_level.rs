/// High-level programs, their factories and the program manager.
///
/// A program is either concrete (a [`GpuProgram`] in some language) or
/// unified: an ordered list of delegate program names of which the first
/// one the render system supports is used.

use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;
use crate::config::{RenderConfig, RenderSystemCapabilities};
use crate::error::Result;
use crate::{orbit_bail, orbit_debug, orbit_err, orbit_info, orbit_warn};
use super::parameters::GpuProgramParameters;
use super::program::{GpuProgram, GpuProgramType, NULL_LANGUAGE};
use super::shared_parameters::{GpuSharedParameters, SharedParametersPtr};

pub const UNIFIED_LANGUAGE: &str = "unified";
const DELEGATE_PROPERTY: &str = "delegate";

// ===== UNIFIED PROGRAM =====

#[derive(Debug, Clone)]
pub struct UnifiedGpuProgram {
    name: String,
    program_type: GpuProgramType,
    delegates: Vec<String>,
    /// Manager generation and the delegate chosen at that generation
    resolution: Option<(u64, Option<String>)>,
}

impl UnifiedGpuProgram {
    pub fn new(name: &str, program_type: GpuProgramType) -> Self {
        Self {
            name: name.to_string(),
            program_type,
            delegates: Vec::new(),
            resolution: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program_type(&self) -> GpuProgramType {
        self.program_type
    }

    pub fn delegates(&self) -> &[String] {
        &self.delegates
    }

    /// Append a candidate; earlier candidates take precedence
    pub fn add_delegate(&mut self, name: &str) {
        self.delegates.push(name.to_string());
        self.resolution = None;
    }

    /// Script-style property access; only `delegate` is known
    ///
    /// # Returns
    ///
    /// `false` for unknown properties
    pub fn set_parameter(&mut self, name: &str, value: &str) -> bool {
        if name == DELEGATE_PROPERTY {
            self.add_delegate(value);
            true
        } else {
            false
        }
    }

    /// Last delegate name, as a script would read the property back
    pub fn parameter(&self, name: &str) -> Option<&str> {
        if name == DELEGATE_PROPERTY {
            self.delegates.last().map(String::as_str)
        } else {
            None
        }
    }

    /// Delegate chosen by the last resolution, if still valid for `generation`
    fn cached_resolution(&self, generation: u64) -> Option<Option<String>> {
        match &self.resolution {
            Some((resolved_at, chosen)) if *resolved_at == generation => Some(chosen.clone()),
            _ => None,
        }
    }
}

// ===== HIGH-LEVEL PROGRAM =====

#[derive(Debug)]
pub enum HighLevelGpuProgram {
    Concrete(GpuProgram),
    Unified(UnifiedGpuProgram),
}

impl HighLevelGpuProgram {
    pub fn name(&self) -> &str {
        match self {
            HighLevelGpuProgram::Concrete(program) => program.name(),
            HighLevelGpuProgram::Unified(program) => program.name(),
        }
    }

    pub fn program_type(&self) -> GpuProgramType {
        match self {
            HighLevelGpuProgram::Concrete(program) => program.program_type(),
            HighLevelGpuProgram::Unified(program) => program.program_type(),
        }
    }

    pub fn language(&self) -> &str {
        match self {
            HighLevelGpuProgram::Concrete(program) => program.language(),
            HighLevelGpuProgram::Unified(_) => UNIFIED_LANGUAGE,
        }
    }

    pub fn as_concrete(&self) -> Option<&GpuProgram> {
        match self {
            HighLevelGpuProgram::Concrete(program) => Some(program),
            HighLevelGpuProgram::Unified(_) => None,
        }
    }

    pub fn as_concrete_mut(&mut self) -> Option<&mut GpuProgram> {
        match self {
            HighLevelGpuProgram::Concrete(program) => Some(program),
            HighLevelGpuProgram::Unified(_) => None,
        }
    }

    pub fn as_unified(&self) -> Option<&UnifiedGpuProgram> {
        match self {
            HighLevelGpuProgram::Unified(program) => Some(program),
            HighLevelGpuProgram::Concrete(_) => None,
        }
    }

    pub fn as_unified_mut(&mut self) -> Option<&mut UnifiedGpuProgram> {
        match self {
            HighLevelGpuProgram::Unified(program) => Some(program),
            HighLevelGpuProgram::Concrete(_) => None,
        }
    }

    /// Concrete programs expose no script properties
    pub fn set_parameter(&mut self, name: &str, value: &str) -> bool {
        match self {
            HighLevelGpuProgram::Unified(program) => program.set_parameter(name, value),
            HighLevelGpuProgram::Concrete(_) => false,
        }
    }
}

// ===== FACTORIES =====

/// Creates programs for one language
pub trait HighLevelGpuProgramFactory: Send + Sync {
    fn language(&self) -> &str;

    fn create(&self, name: &str, program_type: GpuProgramType) -> HighLevelGpuProgram;
}

/// Programs that are never supported; used when no real factory exists
#[derive(Debug, Default)]
pub struct NullProgramFactory;

impl HighLevelGpuProgramFactory for NullProgramFactory {
    fn language(&self) -> &str {
        NULL_LANGUAGE
    }

    fn create(&self, name: &str, program_type: GpuProgramType) -> HighLevelGpuProgram {
        HighLevelGpuProgram::Concrete(GpuProgram::new(name, program_type, NULL_LANGUAGE))
    }
}

#[derive(Debug, Default)]
pub struct UnifiedProgramFactory;

impl HighLevelGpuProgramFactory for UnifiedProgramFactory {
    fn language(&self) -> &str {
        UNIFIED_LANGUAGE
    }

    fn create(&self, name: &str, program_type: GpuProgramType) -> HighLevelGpuProgram {
        HighLevelGpuProgram::Unified(UnifiedGpuProgram::new(name, program_type))
    }
}

/// Concrete programs of a render-system language with a fixed syntax code
#[derive(Debug, Clone)]
pub struct SyntaxProgramFactory {
    language: String,
    syntax_code: String,
}

impl SyntaxProgramFactory {
    pub fn new(language: &str, syntax_code: &str) -> Self {
        Self {
            language: language.to_string(),
            syntax_code: syntax_code.to_string(),
        }
    }

    pub fn syntax_code(&self) -> &str {
        &self.syntax_code
    }
}

impl HighLevelGpuProgramFactory for SyntaxProgramFactory {
    fn language(&self) -> &str {
        &self.language
    }

    fn create(&self, name: &str, program_type: GpuProgramType) -> HighLevelGpuProgram {
        HighLevelGpuProgram::Concrete(
            GpuProgram::new(name, program_type, &self.language).with_syntax(&self.syntax_code),
        )
    }
}

// ===== MANAGER =====

/// Registry of program factories, programs and shared parameter pools
pub struct HighLevelGpuProgramManager {
    factories: FxHashMap<String, Box<dyn HighLevelGpuProgramFactory>>,
    null_factory: NullProgramFactory,
    programs: FxHashMap<String, HighLevelGpuProgram>,
    shared_parameters: FxHashMap<String, SharedParametersPtr>,
    capabilities: RenderSystemCapabilities,
    /// Bumped whenever a unified program's resolution may change
    generation: u64,
}

impl HighLevelGpuProgramManager {
    /// Create a manager with the null and unified factories registered
    pub fn new(capabilities: RenderSystemCapabilities) -> Self {
        let mut manager = Self {
            factories: FxHashMap::default(),
            null_factory: NullProgramFactory,
            programs: FxHashMap::default(),
            shared_parameters: FxHashMap::default(),
            capabilities,
            generation: 0,
        };
        manager.add_factory(Box::new(NullProgramFactory));
        manager.add_factory(Box::new(UnifiedProgramFactory));
        manager
    }

    pub fn capabilities(&self) -> &RenderSystemCapabilities {
        &self.capabilities
    }

    pub fn set_capabilities(&mut self, capabilities: RenderSystemCapabilities) {
        self.capabilities = capabilities;
        self.generation += 1;
    }

    // ===== FACTORIES =====

    /// Register a factory, replacing any factory of the same language
    pub fn add_factory(&mut self, factory: Box<dyn HighLevelGpuProgramFactory>) {
        let language = factory.language().to_string();
        if self.factories.insert(language.clone(), factory).is_some() {
            orbit_warn!("orbit3d::HighLevelGpuProgramManager",
                "Replaced program factory for language '{}'", language);
        }
    }

    pub fn remove_factory(&mut self, language: &str) -> bool {
        self.factories.remove(language).is_some()
    }

    pub fn factory(&self, language: &str) -> Option<&dyn HighLevelGpuProgramFactory> {
        self.factories.get(language).map(|factory| factory.as_ref())
    }

    /// Factory for `language`, or the null factory when none is registered
    pub fn factory_or_null(&self, language: &str) -> &dyn HighLevelGpuProgramFactory {
        match self.factories.get(language) {
            Some(factory) => factory.as_ref(),
            None => &self.null_factory,
        }
    }

    pub fn is_language_supported(&self, language: &str) -> bool {
        self.factories.contains_key(language)
    }

    // ===== PROGRAMS =====

    /// Create a program with the factory of `language`
    ///
    /// # Errors
    ///
    /// `Error::NotFound` naming the language when no factory handles it,
    /// `Error::InvalidResource` when the name is taken.
    pub fn create_program(
        &mut self,
        name: &str,
        language: &str,
        program_type: GpuProgramType,
    ) -> Result<&mut HighLevelGpuProgram> {
        if self.programs.contains_key(name) {
            orbit_bail!("orbit3d::HighLevelGpuProgramManager", "Program '{}' already exists", name);
        }
        let factory = self.factories.get(language).ok_or_else(|| {
            orbit_err!(NotFound => "orbit3d::HighLevelGpuProgramManager",
                "No factory found for language '{}' (program '{}')", language, name)
        })?;
        let program = factory.create(name, program_type);
        self.generation += 1;
        orbit_info!("orbit3d::HighLevelGpuProgramManager",
            "Created {:?} program '{}' ({})", program_type, name, language);
        Ok(self.programs.entry(name.to_string()).or_insert(program))
    }

    pub fn program(&self, name: &str) -> Option<&HighLevelGpuProgram> {
        self.programs.get(name)
    }

    /// Mutable access invalidates cached unified resolutions
    pub fn program_mut(&mut self, name: &str) -> Option<&mut HighLevelGpuProgram> {
        self.generation += 1;
        self.programs.get_mut(name)
    }

    pub fn remove_program(&mut self, name: &str) -> Option<HighLevelGpuProgram> {
        let removed = self.programs.remove(name);
        if removed.is_some() {
            self.generation += 1;
        }
        removed
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    /// Concrete program that runs for `name`
    ///
    /// A concrete program resolves to itself. A unified program resolves to
    /// its first delegate that is a supported concrete program; the choice
    /// is cached until the delegates, the program set or the capabilities
    /// change.
    pub fn resolve_program(&mut self, name: &str) -> Option<&GpuProgram> {
        let generation = self.generation;
        let (target, fresh) = match self.programs.get(name)? {
            HighLevelGpuProgram::Concrete(_) => (Some(name.to_string()), false),
            HighLevelGpuProgram::Unified(unified) => match unified.cached_resolution(generation) {
                Some(cached) => (cached, false),
                None => (self.first_supported_delegate(unified.delegates()), true),
            },
        };

        if fresh {
            if let Some(HighLevelGpuProgram::Unified(unified)) = self.programs.get_mut(name) {
                unified.resolution = Some((generation, target.clone()));
            }
            orbit_debug!("orbit3d::HighLevelGpuProgramManager",
                "Unified program '{}' resolved to {:?}", name, target);
        }

        let target = target?;
        self.programs.get(&target)?.as_concrete()
    }

    /// Whether `name` resolves to a program the render system supports
    pub fn is_program_supported(&mut self, name: &str) -> bool {
        let capabilities = self.capabilities.clone();
        self.resolve_program(name)
            .is_some_and(|program| program.is_supported(&capabilities))
    }

    fn first_supported_delegate(&self, delegates: &[String]) -> Option<String> {
        delegates.iter()
            .find(|delegate| {
                matches!(self.programs.get(delegate.as_str()),
                    Some(HighLevelGpuProgram::Concrete(program)) if program.is_supported(&self.capabilities))
            })
            .cloned()
    }

    /// Create a parameter set for the program `name` resolves to
    ///
    /// A unified program without a supported delegate yields an empty set
    /// that ignores missing named constants.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` for an unknown program.
    pub fn create_parameters(&mut self, name: &str, config: &RenderConfig) -> Result<GpuProgramParameters> {
        if !self.programs.contains_key(name) {
            orbit_bail!(NotFound => "orbit3d::HighLevelGpuProgramManager", "Program '{}' does not exist", name);
        }
        match self.resolve_program(name) {
            Some(program) => program.create_parameters(config),
            None => {
                let mut params = GpuProgramParameters::with_grow_step(config.constant_list_grow_step);
                params.set_transpose_matrices(config.transpose_matrices);
                params.set_ignore_missing_parameters(true);
                Ok(params)
            }
        }
    }

    // ===== SHARED PARAMETERS =====

    /// # Errors
    ///
    /// `Error::InvalidResource` if a pool with this name exists.
    pub fn create_shared_parameters(&mut self, name: &str) -> Result<SharedParametersPtr> {
        if self.shared_parameters.contains_key(name) {
            orbit_bail!("orbit3d::HighLevelGpuProgramManager",
                "Shared parameter set '{}' already exists", name);
        }
        let shared = Arc::new(Mutex::new(GpuSharedParameters::new(name)));
        self.shared_parameters.insert(name.to_string(), shared.clone());
        Ok(shared)
    }

    pub fn shared_parameters(&self, name: &str) -> Option<SharedParametersPtr> {
        self.shared_parameters.get(name).cloned()
    }

    /// Parameter sets already bound to the pool keep using it
    pub fn remove_shared_parameters(&mut self, name: &str) -> bool {
        self.shared_parameters.remove(name).is_some()
    }

    pub fn shared_parameters_count(&self) -> usize {
        self.shared_parameters.len()
    }
}

#[cfg(test)]
#[path = "high_level_tests.rs"]
mod tests;
