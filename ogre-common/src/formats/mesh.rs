//! Welded vertices, faces and index buffers

use serde::Serialize;

/// Largest vertex index / index count that still fits a 16-bit index buffer
pub const MAX_16BIT_INDEX: usize = u16::MAX as usize;

/// Maximum number of bone influences kept per vertex
pub const MAX_BONE_INFLUENCES: usize = 4;

/// A single (joint, weight) pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoneInfluence {
    /// Index into the exported bone list
    pub joint: u16,
    pub weight: f32,
}

impl BoneInfluence {
    pub const fn new(joint: u16, weight: f32) -> Self {
        Self { joint, weight }
    }

    /// Full-weight influence used for rigidly skinned vertices
    pub const fn rigid(joint: u16) -> Self {
        Self { joint, weight: 1.0 }
    }
}

/// A deduplicated vertex
///
/// Two face corners that reference the same source position share a
/// `WeldedVertex` only when every exported attribute matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeldedVertex {
    /// Position in export units (length-unit scaled, zero snapped)
    pub position: [f32; 3],
    /// Unit normal
    pub normal: [f32; 3],
    /// RGBA colour
    pub color: [f32; 4],
    /// One (u, v) pair per active UV channel
    pub uvs: Vec<[f32; 2]>,
    /// Bone influences (weights sum to ~1)
    pub influences: Vec<BoneInfluence>,
    /// Index of the source position this vertex was built from; used to
    /// re-read the vertex when sampling vertex animation
    pub source_index: u32,
}

/// Triangle referencing three vertices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Face(pub [u32; 3]);

impl Face {
    /// Reverse the winding order (for surfaces marked "opposite")
    pub fn flipped(self) -> Self {
        let [a, b, c] = self.0;
        Self([c, b, a])
    }
}

/// Index buffer in the width chosen for the submesh
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "width", content = "indices")]
pub enum IndexBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    /// 32-bit indices are required for shared geometry, or when either the
    /// vertex count or the index count exceeds the 16-bit range
    pub fn requires_32bit(shared_geometry: bool, vertex_count: usize, index_count: usize) -> bool {
        shared_geometry || vertex_count > MAX_16BIT_INDEX || index_count > MAX_16BIT_INDEX
    }

    /// Flatten faces into an index buffer of the requested width
    pub fn from_faces(faces: &[Face], use_32bit: bool) -> Self {
        let flat = faces.iter().flat_map(|f| f.0);
        if use_32bit {
            Self::U32(flat.collect())
        } else {
            Self::U16(flat.map(|i| i as u16).collect())
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_32bit(&self) -> bool {
        matches!(self, Self::U32(_))
    }
}

/// Axis-aligned bounding box in export units
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundingBox {
    pub fn from_point(p: [f32; 3]) -> Self {
        Self { min: p, max: p }
    }

    /// Smallest box containing every point, or `None` for an empty iterator
    pub fn from_points<I: IntoIterator<Item = [f32; 3]>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let mut bbox = Self::from_point(iter.next()?);
        for p in iter {
            bbox.expand(p);
        }
        Some(bbox)
    }

    pub fn expand(&mut self, p: [f32; 3]) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    pub fn merge(&mut self, other: &BoundingBox) {
        self.expand(other.min);
        self.expand(other.max);
    }
}

/// Merge `other` into an optional accumulator
pub fn merge_bounds(acc: &mut Option<BoundingBox>, other: Option<BoundingBox>) {
    match (acc.as_mut(), other) {
        (Some(a), Some(b)) => a.merge(&b),
        (None, Some(b)) => *acc = Some(b),
        _ => {}
    }
}
