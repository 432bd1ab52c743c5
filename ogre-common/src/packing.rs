//! Vertex declarations and interleaved vertex packing
//!
//! Writers that emit a binary vertex buffer use a [`VertexDeclaration`] to
//! describe the element layout and [`pack_vertex_data`] to interleave welded
//! vertices into it:
//! - position: Float3
//! - normal: Float3 (optional)
//! - diffuse colour: RGBA unorm8x4 (optional)
//! - one Float2 texture coordinate set per UV channel
//!
//! Floats are written in native (little-endian on every supported target)
//! byte order.

use bytemuck::cast_slice;
use serde::Serialize;

use crate::formats::WeldedVertex;

// ============================================================================
// Declaration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VertexSemantic {
    Position,
    Normal,
    Diffuse,
    /// Texture coordinate set with its channel index
    TexCoord(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VertexElementType {
    Float2,
    Float3,
    ColourRgba,
}

impl VertexElementType {
    /// Size in bytes
    #[inline]
    pub const fn size(self) -> u32 {
        match self {
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::ColourRgba => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VertexElement {
    pub semantic: VertexSemantic,
    pub element_type: VertexElementType,
    /// Byte offset inside one vertex
    pub offset: u32,
}

/// Ordered element list plus the resulting stride
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VertexDeclaration {
    pub elements: Vec<VertexElement>,
    pub stride: u32,
}

impl VertexDeclaration {
    pub fn new(normals: bool, colors: bool, uv_channels: usize) -> Self {
        let mut decl = Self {
            elements: Vec::with_capacity(3 + uv_channels),
            stride: 0,
        };
        decl.push(VertexSemantic::Position, VertexElementType::Float3);
        if normals {
            decl.push(VertexSemantic::Normal, VertexElementType::Float3);
        }
        if colors {
            decl.push(VertexSemantic::Diffuse, VertexElementType::ColourRgba);
        }
        for channel in 0..uv_channels {
            decl.push(VertexSemantic::TexCoord(channel as u8), VertexElementType::Float2);
        }
        decl
    }

    fn push(&mut self, semantic: VertexSemantic, element_type: VertexElementType) {
        self.elements.push(VertexElement {
            semantic,
            element_type,
            offset: self.stride,
        });
        self.stride += element_type.size();
    }

    pub fn has(&self, semantic: VertexSemantic) -> bool {
        self.elements.iter().any(|e| e.semantic == semantic)
    }
}

// ============================================================================
// Packing
// ============================================================================

/// Convert f32 to unsigned normalized 8-bit integer
#[inline]
fn f32_to_unorm8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Pack an RGBA colour to unorm8x4
#[inline]
pub fn pack_color_rgba_unorm8(color: [f32; 4]) -> [u8; 4] {
    color.map(f32_to_unorm8)
}

/// Interleave vertices according to `decl`
///
/// Texture coordinate sets missing on a vertex are written as zeros.
pub fn pack_vertex_data(decl: &VertexDeclaration, vertices: &[WeldedVertex]) -> Vec<u8> {
    let mut packed = Vec::with_capacity(vertices.len() * decl.stride as usize);

    for vertex in vertices {
        for element in &decl.elements {
            match element.semantic {
                VertexSemantic::Position => {
                    packed.extend_from_slice(cast_slice(&vertex.position));
                }
                VertexSemantic::Normal => {
                    packed.extend_from_slice(cast_slice(&vertex.normal));
                }
                VertexSemantic::Diffuse => {
                    packed.extend_from_slice(&pack_color_rgba_unorm8(vertex.color));
                }
                VertexSemantic::TexCoord(channel) => {
                    let uv = vertex.uvs.get(channel as usize).copied().unwrap_or([0.0; 2]);
                    packed.extend_from_slice(cast_slice(&uv));
                }
            }
        }
    }

    packed
}
