/// Vertex layout description.
///
/// A VertexDeclaration is an ordered list of elements, each bound to a
/// source stream. The per-vertex size of a stream is the sum of its
/// element sizes.

// ===== ELEMENT TYPE =====

/// Data type of a vertex element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexElementType {
    Float1,
    Float2,
    Float3,
    Float4,
    /// Packed 32-bit color in the render system's native order
    Color,
    ColorArgb,
    ColorAbgr,
    Short1,
    Short2,
    Short3,
    Short4,
    UByte4,
}

impl VertexElementType {
    /// Size in bytes
    pub fn size_bytes(&self) -> usize {
        match self {
            VertexElementType::Float1 => 4,
            VertexElementType::Float2 => 8,
            VertexElementType::Float3 => 12,
            VertexElementType::Float4 => 16,
            VertexElementType::Color
            | VertexElementType::ColorArgb
            | VertexElementType::ColorAbgr => 4,
            VertexElementType::Short1 => 2,
            VertexElementType::Short2 => 4,
            VertexElementType::Short3 => 6,
            VertexElementType::Short4 => 8,
            VertexElementType::UByte4 => 4,
        }
    }

    /// Number of scalar components
    pub fn component_count(&self) -> usize {
        match self {
            VertexElementType::Float1 | VertexElementType::Short1 => 1,
            VertexElementType::Float2 | VertexElementType::Short2 => 2,
            VertexElementType::Float3 | VertexElementType::Short3 => 3,
            VertexElementType::Float4 | VertexElementType::Short4 | VertexElementType::UByte4 => 4,
            VertexElementType::Color
            | VertexElementType::ColorArgb
            | VertexElementType::ColorAbgr => 1,
        }
    }
}

// ===== SEMANTIC =====

/// Meaning of a vertex element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexElementSemantic {
    Position,
    BlendWeights,
    BlendIndices,
    Normal,
    Diffuse,
    Specular,
    TexCoords,
    Binormal,
    Tangent,
}

// ===== ELEMENT =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexElement {
    /// Source stream (vertex buffer binding) index
    pub source: u16,
    /// Byte offset inside one vertex of the source stream
    pub offset: usize,
    pub element_type: VertexElementType,
    pub semantic: VertexElementSemantic,
    /// Distinguishes repeated semantics (texture coordinate sets)
    pub index: u16,
}

impl VertexElement {
    pub fn size_bytes(&self) -> usize {
        self.element_type.size_bytes()
    }
}

// ===== DECLARATION =====

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexDeclaration {
    elements: Vec<VertexElement>,
}

impl VertexDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element at the end of its source stream
    ///
    /// The offset is the current vertex size of `source`.
    pub fn add_element(
        &mut self,
        source: u16,
        element_type: VertexElementType,
        semantic: VertexElementSemantic,
        index: u16,
    ) -> &VertexElement {
        let offset = self.vertex_size(source);
        self.elements.push(VertexElement { source, offset, element_type, semantic, index });
        &self.elements[self.elements.len() - 1]
    }

    /// Builder variant of [`add_element`](Self::add_element)
    pub fn with_element(
        mut self,
        source: u16,
        element_type: VertexElementType,
        semantic: VertexElementSemantic,
    ) -> Self {
        let index = self.elements.iter()
            .filter(|e| e.semantic == semantic)
            .count() as u16;
        self.add_element(source, element_type, semantic, index);
        self
    }

    pub fn elements(&self) -> &[VertexElement] {
        &self.elements
    }

    /// Elements bound to one source stream, in declaration order
    pub fn elements_for_source(&self, source: u16) -> Vec<VertexElement> {
        self.elements.iter().filter(|e| e.source == source).copied().collect()
    }

    pub fn find_element_by_semantic(
        &self,
        semantic: VertexElementSemantic,
        index: u16,
    ) -> Option<&VertexElement> {
        self.elements.iter().find(|e| e.semantic == semantic && e.index == index)
    }

    /// Per-vertex byte size of one source stream
    pub fn vertex_size(&self, source: u16) -> usize {
        self.elements.iter()
            .filter(|e| e.source == source)
            .map(|e| e.size_bytes())
            .sum()
    }

    /// Distinct source streams, ascending
    pub fn sources(&self) -> Vec<u16> {
        let mut sources: Vec<u16> = self.elements.iter().map(|e| e.source).collect();
        sources.sort_unstable();
        sources.dedup();
        sources
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
#[path = "vertex_declaration_tests.rs"]
mod tests;
