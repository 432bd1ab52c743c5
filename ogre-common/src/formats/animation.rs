//! Animation clips and tracks

use serde::Serialize;

use super::BoneTransform;

/// What a vertex track or pose applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TrackTarget {
    /// The shared vertex buffer of the whole mesh
    Mesh,
    /// The dedicated vertex buffer of one submesh
    Submesh(u32),
}

/// Bone transform relative to the bind pose at one time
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SkeletonKeyframe {
    pub time: f32,
    pub transform: BoneTransform,
}

/// Absolute vertex positions at one time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MorphKeyframe {
    pub time: f32,
    pub positions: Vec<[f32; 3]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PoseReference {
    /// Global pose index
    pub pose_index: u32,
    pub weight: f32,
}

/// Weighted pose references at one time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseKeyframe {
    pub time: f32,
    pub references: Vec<PoseReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Track {
    Skeletal {
        bone: String,
        keyframes: Vec<SkeletonKeyframe>,
    },
    Morph {
        target: TrackTarget,
        keyframes: Vec<MorphKeyframe>,
    },
    Pose {
        target: TrackTarget,
        keyframes: Vec<PoseKeyframe>,
    },
}

impl Track {
    pub fn keyframe_count(&self) -> usize {
        match self {
            Track::Skeletal { keyframes, .. } => keyframes.len(),
            Track::Morph { keyframes, .. } => keyframes.len(),
            Track::Pose { keyframes, .. } => keyframes.len(),
        }
    }

    /// Vertex target (`None` for skeletal tracks)
    pub fn target(&self) -> Option<TrackTarget> {
        match self {
            Track::Skeletal { .. } => None,
            Track::Morph { target, .. } | Track::Pose { target, .. } => Some(*target),
        }
    }
}

/// A sampled clip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Animation {
    pub name: String,
    /// Length in seconds (last sample time minus first)
    pub length: f32,
    pub tracks: Vec<Track>,
}
