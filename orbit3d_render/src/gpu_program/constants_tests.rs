use super::*;
use crate::error::Error;

#[test]
fn test_element_sizes_packed_and_padded() {
    use GpuConstantType::*;
    let table = [
        (Float1, 1, 4), (Float2, 2, 4), (Float3, 3, 4), (Float4, 4, 4),
        (Int1, 1, 4), (Int2, 2, 4), (Int3, 3, 4), (Int4, 4, 4),
        (Sampler2D, 1, 4), (SamplerCube, 1, 4),
        (Matrix2x2, 4, 8), (Matrix2x3, 6, 8), (Matrix3x2, 6, 8),
        (Matrix2x4, 8, 8), (Matrix4x2, 8, 8), (Matrix3x3, 9, 12),
        (Matrix3x4, 12, 12), (Matrix4x3, 12, 12), (Matrix4x4, 16, 16),
        (Unknown, 0, 0),
    ];
    for (ty, packed, padded) in table {
        assert_eq!(ty.element_size(false), packed, "{:?} packed", ty);
        assert_eq!(ty.element_size(true), padded, "{:?} padded", ty);
    }
}

#[test]
fn test_constant_type_banks() {
    assert!(GpuConstantType::Float3.is_float());
    assert!(GpuConstantType::Matrix4x4.is_float());
    assert!(GpuConstantType::Int2.is_int());
    assert!(GpuConstantType::Sampler2D.is_int());
    assert!(GpuConstantType::Sampler2D.is_sampler());
    assert!(!GpuConstantType::Unknown.is_float());
    assert!(!GpuConstantType::Unknown.is_int());
    assert_eq!(GpuConstantType::Float1.bank(), ConstantBank::Float);
    assert_eq!(GpuConstantType::Int1.bank(), ConstantBank::Int);
}

#[test]
fn test_constant_type_codes_are_stable() {
    assert_eq!(GpuConstantType::Float1.code(), 1);
    assert_eq!(GpuConstantType::Matrix4x4.code(), 19);
    assert_eq!(GpuConstantType::Int4.code(), 23);
    assert_eq!(GpuConstantType::Unknown.code(), 99);
    for code in (1..=23).chain([99]) {
        let ty = GpuConstantType::from_code(code).unwrap();
        assert_eq!(ty.code(), code);
    }
    assert!(GpuConstantType::from_code(0).is_none());
    assert!(GpuConstantType::from_code(24).is_none());
}

#[test]
fn test_add_definition_uses_padded_layout() {
    let mut named = GpuNamedConstants::new();
    let a = named.add_definition("a", GpuConstantType::Float3, 1).unwrap();
    let b = named.add_definition("b", GpuConstantType::Matrix4x4, 1).unwrap();
    let c = named.add_definition("c", GpuConstantType::Int1, 1).unwrap();

    assert_eq!(a.physical_index, 0);
    assert_eq!(a.element_size, 4);
    assert_eq!(b.physical_index, 4);
    assert_eq!(c.physical_index, 0);
    assert_eq!(named.float_buffer_size, 20);
    assert_eq!(named.int_buffer_size, 4);
    assert_eq!(named.len(), 3);
}

#[test]
fn test_add_definition_rejects_duplicates_and_unknown() {
    let mut named = GpuNamedConstants::new();
    named.add_definition("a", GpuConstantType::Float1, 1).unwrap();
    assert!(matches!(
        named.add_definition("a", GpuConstantType::Float2, 1),
        Err(Error::InvalidResource(_))
    ));
    assert!(named.add_definition("b", GpuConstantType::Unknown, 1).is_err());
    assert!(named.add_definition("c", GpuConstantType::Float1, 0).is_err());
}

#[test]
fn test_array_entries_generated() {
    let mut named = GpuNamedConstants::new();
    named.add_definition("lights", GpuConstantType::Float4, 3).unwrap();

    assert_eq!(named.float_buffer_size, 12);
    assert_eq!(named.get("lights").unwrap().array_size, 3);
    for i in 0..3 {
        let element = named.get(&format!("lights[{}]", i)).unwrap();
        assert_eq!(element.physical_index, i * 4);
        assert_eq!(element.array_size, 1);
    }
    assert!(named.get("lights[3]").is_none());
}

#[test]
fn test_large_arrays_only_alias_first_element() {
    let mut named = GpuNamedConstants::new();
    named.add_definition("bones", GpuConstantType::Matrix3x4, 20).unwrap();
    assert!(named.contains("bones[0]"));
    assert!(!named.contains("bones[1]"));
}

#[test]
fn test_shift_physical_indexes() {
    let mut named = GpuNamedConstants::new();
    named.add_definition("a", GpuConstantType::Float4, 1).unwrap();
    named.add_definition("b", GpuConstantType::Float4, 1).unwrap();
    named.add_definition("i", GpuConstantType::Int4, 1).unwrap();

    named.shift_physical_indexes(ConstantBank::Float, 4, 8);

    assert_eq!(named.get("a").unwrap().physical_index, 0);
    assert_eq!(named.get("b").unwrap().physical_index, 12);
    assert_eq!(named.get("i").unwrap().physical_index, 0);
    assert_eq!(named.float_buffer_size, 16);
    assert_eq!(named.int_buffer_size, 4);
}

#[test]
fn test_variability_flags() {
    let v = GpuParamVariability::GLOBAL | GpuParamVariability::LIGHTS;
    assert!(v.contains(GpuParamVariability::LIGHTS));
    assert!(!v.contains(GpuParamVariability::PER_OBJECT));
    assert!(GpuParamVariability::ALL.contains(v));
    assert_eq!(GpuParamVariability::PASS_ITERATION_NUMBER.bits(), 8);
}
