//! Morph target poses

use serde::Serialize;

use super::TrackTarget;

/// Displacement of one vertex in a pose
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VertexOffset {
    /// Vertex index in the target's vertex buffer
    pub index: u32,
    pub offset: [f32; 3],
}

/// Named vertex displacement set
///
/// Only vertices with a non-zero (after snapping) displacement are listed.
/// A pose may have no offsets at all; it is kept so pose indices stay aligned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pose {
    pub name: String,
    pub target: TrackTarget,
    pub offsets: Vec<VertexOffset>,
}
