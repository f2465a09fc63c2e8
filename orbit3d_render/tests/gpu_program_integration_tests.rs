//! Integration tests for GPU programs, parameter sets and shared parameters
//!
//! No device required.
//!
//! Run with: cargo test --test gpu_program_integration_tests

use orbit3d_render::glam::{Mat4, Vec3, Vec4};
use orbit3d_render::orbit3d::buffer::DefaultBufferFactory;
use orbit3d_render::orbit3d::gpu_program::{
    Endian, GpuConstantType, GpuNamedConstants, GpuNamedConstantsSerializer, GpuProgramType,
    SyntaxProgramFactory, UNIFIED_LANGUAGE,
};
use orbit3d_render::orbit3d::{Error, RenderConfig, RenderContext, RenderSystemCapabilities};

// ============================================================================
// HELPERS
// ============================================================================

fn glsl_context(transpose_matrices: bool) -> RenderContext {
    let config = RenderConfig { transpose_matrices, ..RenderConfig::default() };
    let mut context = RenderContext::new(config, Box::new(DefaultBufferFactory::new()));
    context.programs_mut()
        .set_capabilities(RenderSystemCapabilities::new().with_syntax("glsl330"));
    context.programs_mut()
        .add_factory(Box::new(SyntaxProgramFactory::new("glsl", "glsl330")));
    context
}

/// Vertex program with a padded float3 `light_dir` and a 4×4 `view_proj`
fn add_lit_program(context: &mut RenderContext, name: &str) {
    let program = context.programs_mut()
        .create_program(name, "glsl", GpuProgramType::Vertex)
        .unwrap()
        .as_concrete_mut()
        .unwrap();
    program.add_constant_definition("light_dir", GpuConstantType::Float3, 1).unwrap();
    program.add_constant_definition("view_proj", GpuConstantType::Matrix4x4, 1).unwrap();
}

fn sample_matrix() -> Mat4 {
    Mat4::from_cols_array(&std::array::from_fn(|i| i as f32 + 1.0))
}

// ============================================================================
// SHARED PARAMETERS
// ============================================================================

#[test]
fn test_integration_packed_float3_fills_three_of_four_slots() {
    let mut context = glsl_context(false);
    add_lit_program(&mut context, "lit_vs");

    let shared = context.programs_mut().create_shared_parameters("frame").unwrap();
    {
        let mut pool = shared.lock().unwrap();
        pool.add_constant_definition("light_dir", GpuConstantType::Float3, 1).unwrap();
        pool.set_named_vec3("light_dir", Vec3::new(1.0, 2.0, 3.0)).unwrap();
    }

    let mut params = context.create_parameters("lit_vs").unwrap();
    let def = *params.find_named_constant_definition("light_dir").unwrap();
    params.float_constants_mut()[def.physical_index + 3] = 9.0;

    params.add_shared_parameters(shared).unwrap();
    params.copy_shared_params().unwrap();

    let slot = &params.float_constants()[def.physical_index..def.physical_index + 4];
    assert_eq!(slot, &[1.0, 2.0, 3.0, 9.0]);
}

#[test]
fn test_integration_shared_matrix_transposed_into_target() {
    let mut context = glsl_context(true);
    add_lit_program(&mut context, "lit_vs");

    let shared = context.programs_mut().create_shared_parameters("camera").unwrap();
    shared.lock().unwrap()
        .add_constant_definition("view_proj", GpuConstantType::Matrix4x4, 1).unwrap();
    shared.lock().unwrap().set_named_mat4("view_proj", &sample_matrix()).unwrap();

    let mut params = context.create_parameters("lit_vs").unwrap();
    assert!(params.transpose_matrices());
    params.add_shared_parameters(shared.clone()).unwrap();
    params.copy_shared_params().unwrap();

    let pool = shared.lock().unwrap();
    let src_index = pool.find_constant_definition("view_proj").unwrap().physical_index;
    let src = &pool.float_constants()[src_index..src_index + 16];
    let dst_index = params.find_named_constant_definition("view_proj").unwrap().physical_index;
    let dst = &params.float_constants()[dst_index..dst_index + 16];
    for row in 0..4 {
        for col in 0..4 {
            assert_eq!(dst[row * 4 + col], src[col * 4 + row], "row {} col {}", row, col);
        }
    }
}

#[test]
fn test_integration_new_pool_constant_picked_up_on_next_copy() {
    let mut context = glsl_context(false);
    add_lit_program(&mut context, "lit_vs");

    let shared = context.programs_mut().create_shared_parameters("frame").unwrap();
    shared.lock().unwrap()
        .add_constant_definition("light_dir", GpuConstantType::Float3, 1).unwrap();

    let mut params = context.create_parameters("lit_vs").unwrap();
    params.add_shared_parameters(shared.clone()).unwrap();
    params.copy_shared_params().unwrap();

    {
        let mut pool = shared.lock().unwrap();
        pool.add_constant_definition("view_proj", GpuConstantType::Matrix4x4, 1).unwrap();
        pool.set_named_mat4("view_proj", &Mat4::IDENTITY).unwrap();
    }
    params.copy_shared_params().unwrap();

    let index = params.find_named_constant_definition("view_proj").unwrap().physical_index;
    assert_eq!(&params.float_constants()[index..index + 16], &Mat4::IDENTITY.to_cols_array());
}

#[test]
fn test_integration_duplicate_shared_pool_rejected() {
    let mut context = glsl_context(false);
    context.programs_mut().create_shared_parameters("frame").unwrap();
    let result = context.programs_mut().create_shared_parameters("frame");
    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert_eq!(context.programs().shared_parameters_count(), 1);
}

// ============================================================================
// UNIFIED PROGRAMS
// ============================================================================

#[test]
fn test_integration_unified_program_uses_first_supported_delegate() {
    let mut context = glsl_context(false);
    context.programs_mut()
        .add_factory(Box::new(SyntaxProgramFactory::new("hlsl", "vs_5_0")));
    context.programs_mut().create_program("lit_hlsl", "hlsl", GpuProgramType::Vertex).unwrap();
    add_lit_program(&mut context, "lit_glsl");

    let unified = context.programs_mut()
        .create_program("lit", UNIFIED_LANGUAGE, GpuProgramType::Vertex)
        .unwrap();
    assert!(unified.set_parameter("delegate", "lit_hlsl"));
    assert!(unified.set_parameter("delegate", "lit_glsl"));

    let resolved = context.programs_mut().resolve_program("lit").unwrap();
    assert_eq!(resolved.name(), "lit_glsl");
    assert!(context.programs_mut().is_program_supported("lit"));

    let mut params = context.create_parameters("lit").unwrap();
    params.set_named_vec4("light_dir", Vec4::new(0.0, 1.0, 0.0, 0.0)).unwrap();
}

#[test]
fn test_integration_unified_program_without_candidates() {
    let mut context = glsl_context(false);
    context.programs_mut()
        .create_program("orphan", UNIFIED_LANGUAGE, GpuProgramType::Fragment)
        .unwrap()
        .set_parameter("delegate", "missing");

    assert!(context.programs_mut().resolve_program("orphan").is_none());
    assert!(!context.programs_mut().is_program_supported("orphan"));

    let mut params = context.create_parameters("orphan").unwrap();
    assert!(params.ignore_missing_parameters());
    params.set_named_f32("anything", 1.0).unwrap();
}

#[test]
fn test_integration_unknown_language_reported() {
    let mut context = glsl_context(false);
    let result = context.programs_mut().create_program("x", "cg", GpuProgramType::Vertex);
    match result {
        Err(Error::NotFound(message)) => assert!(message.contains("cg")),
        other => panic!("unexpected result: {:?}", other.map(|p| p.name().to_string())),
    }
}

// ============================================================================
// MANUAL NAMED CONSTANTS
// ============================================================================

#[test]
fn test_integration_manual_constants_from_serialized_table() {
    let mut named = GpuNamedConstants::new();
    named.add_definition("tint", GpuConstantType::Float4, 1).unwrap();
    named.add_definition("bones", GpuConstantType::Matrix4x4, 2).unwrap();
    let bytes = GpuNamedConstantsSerializer::export_to_vec(&named, Endian::Little).unwrap();

    let mut context = glsl_context(false);
    context.programs_mut().create_program("skin_vs", "glsl", GpuProgramType::Vertex).unwrap();
    let program = context.programs_mut().program_mut("skin_vs").unwrap().as_concrete_mut().unwrap();
    program.load_manual_named_constants(&mut bytes.as_slice()).unwrap();
    assert!(program.has_manual_named_constants());

    let mut params = context.create_parameters("skin_vs").unwrap();
    params.set_named_mat4_array("bones", &[Mat4::IDENTITY, sample_matrix()]).unwrap();
    params.set_named_vec4("tint", Vec4::ONE).unwrap();

    let tint = params.find_named_constant_definition("tint").unwrap().physical_index;
    assert_eq!(&params.float_constants()[tint..tint + 4], &[1.0; 4]);
}
