//! Shared data model for the Ogre exporter
//!
//! This crate holds the host-independent structures produced by the export
//! core and consumed by mesh/skeleton writers:
//! - `ogre-export` (geometry consolidation + animation sampling)
//! - any writer implementing the export sink contract
//!
//! # Modules
//!
//! - [`formats`] - Mesh, skeleton, pose and animation output types
//! - [`packing`] - Vertex declarations and interleaved vertex packing
//! - [`math`] - Zero snapping shared by every numeric output

pub mod formats;
pub mod math;
pub mod packing;

// Re-export commonly used format items
pub use formats::{
    Animation, Bone, BoneInfluence, BoneTransform, BoundingBox, Face, IndexBuffer, merge_bounds,
    MAX_16BIT_INDEX, MAX_BONE_INFLUENCES, MAX_BONES, MorphKeyframe, Pose, PoseKeyframe,
    PoseReference, SkeletonKeyframe, Track, TrackTarget, VertexOffset, WeldedVertex,
};

// Re-export commonly used packing items
pub use packing::{
    VertexDeclaration, VertexElement, VertexElementType, VertexSemantic, pack_color_rgba_unorm8,
    pack_vertex_data,
};

pub use math::{DEFAULT_EPSILON, snap3, snap_to_zero};
