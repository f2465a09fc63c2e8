//! GPU program constants, parameter sets, shared parameters and programs

pub mod constants;
pub mod constant_list;
pub mod parameters;
pub mod shared_parameters;
pub mod serializer;
pub mod program;
pub mod high_level;

pub use constants::{
    ConstantBank, GpuConstantDefinition, GpuConstantType, GpuLogicalBufferStruct, GpuLogicalIndexUse,
    GpuNamedConstants, GpuParamVariability, SharedLogicalBuffer,
};
pub use constant_list::{ConstantList, FloatConstantList, IntConstantList, DEFAULT_GROW_STEP};
pub use parameters::GpuProgramParameters;
pub use shared_parameters::{
    CopyDataEntry, GpuSharedParameters, GpuSharedParametersUsage, SharedParametersPtr,
};
pub use serializer::{Endian, GpuNamedConstantsSerializer, VERSION_TAG};
pub use program::{GpuProgram, GpuProgramType, NULL_LANGUAGE};
pub use high_level::{
    HighLevelGpuProgram, HighLevelGpuProgramFactory, HighLevelGpuProgramManager, NullProgramFactory,
    SyntaxProgramFactory, UnifiedGpuProgram, UnifiedProgramFactory, UNIFIED_LANGUAGE,
};
