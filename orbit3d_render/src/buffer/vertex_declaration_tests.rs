use super::*;

#[test]
fn test_element_type_sizes() {
    assert_eq!(VertexElementType::Float1.size_bytes(), 4);
    assert_eq!(VertexElementType::Float3.size_bytes(), 12);
    assert_eq!(VertexElementType::Float4.size_bytes(), 16);
    assert_eq!(VertexElementType::Color.size_bytes(), 4);
    assert_eq!(VertexElementType::Short3.size_bytes(), 6);
    assert_eq!(VertexElementType::UByte4.size_bytes(), 4);
    assert_eq!(VertexElementType::Short4.component_count(), 4);
}

#[test]
fn test_offsets_accumulate_per_source() {
    let mut decl = VertexDeclaration::new();
    decl.add_element(0, VertexElementType::Float3, VertexElementSemantic::Position, 0);
    decl.add_element(1, VertexElementType::Float2, VertexElementSemantic::TexCoords, 0);
    decl.add_element(0, VertexElementType::Float3, VertexElementSemantic::Normal, 0);
    decl.add_element(0, VertexElementType::Color, VertexElementSemantic::Diffuse, 0);

    let elements = decl.elements();
    assert_eq!(elements[0].offset, 0);
    assert_eq!(elements[1].offset, 0);
    assert_eq!(elements[2].offset, 12);
    assert_eq!(elements[3].offset, 24);

    assert_eq!(decl.vertex_size(0), 28);
    assert_eq!(decl.vertex_size(1), 8);
    assert_eq!(decl.vertex_size(2), 0);
    assert_eq!(decl.sources(), vec![0, 1]);
}

#[test]
fn test_builder_assigns_semantic_indexes() {
    let decl = VertexDeclaration::new()
        .with_element(0, VertexElementType::Float3, VertexElementSemantic::Position)
        .with_element(0, VertexElementType::Float2, VertexElementSemantic::TexCoords)
        .with_element(0, VertexElementType::Float2, VertexElementSemantic::TexCoords);

    let second_uv = decl.find_element_by_semantic(VertexElementSemantic::TexCoords, 1).unwrap();
    assert_eq!(second_uv.offset, 20);
    assert!(decl.find_element_by_semantic(VertexElementSemantic::Normal, 0).is_none());
}

#[test]
fn test_elements_for_source() {
    let decl = VertexDeclaration::new()
        .with_element(0, VertexElementType::Float3, VertexElementSemantic::Position)
        .with_element(1, VertexElementType::Float3, VertexElementSemantic::Normal);

    let source1 = decl.elements_for_source(1);
    assert_eq!(source1.len(), 1);
    assert_eq!(source1[0].semantic, VertexElementSemantic::Normal);
    assert!(VertexDeclaration::new().is_empty());
}
