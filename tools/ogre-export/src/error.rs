//! Error taxonomy of the export core
//!
//! [`ExportError`] covers structural failures (bad indices, missing nodes,
//! bone overflow, mismatched morph data). [`ClipError`] covers failures that
//! only drop a single animation clip.

use ogre_common::MAX_BONES;

/// Structural export failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExportError {
    /// A face or skin refers past the end of an attribute list
    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// Nothing to export: no selected node carries triangles
    #[error("no triangles to export")]
    EmptyMesh,

    /// Node handle unknown to the scene
    #[error("node {0} not found in scene")]
    MissingNode(u32),

    /// Skeleton above the engine's bone ceiling
    #[error("skeleton has {count} bones, but maximum is {max}")]
    BoneLimitExceeded { count: usize, max: usize },

    /// Morph channel point count differs from the base mesh
    #[error(
        "morph channel '{channel}' has {found} points but the base mesh has {expected}; collapse the modifier stack before export"
    )]
    MorphVertexCountMismatch {
        channel: String,
        expected: usize,
        found: usize,
    },

    /// Error reported by the scene reader
    #[error("scene: {0}")]
    Scene(String),
}

impl ExportError {
    pub fn bone_limit(count: usize) -> Self {
        ExportError::BoneLimitExceeded {
            count,
            max: MAX_BONES,
        }
    }

    /// Bounds-checked lookup helper
    pub fn check_index(what: &'static str, index: usize, len: usize) -> Result<(), Self> {
        if index < len {
            Ok(())
        } else {
            Err(ExportError::IndexOutOfRange { what, index, len })
        }
    }
}

/// Clip-level failure; the clip is skipped and the export continues
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClipError {
    #[error("sample rate {0} must be positive")]
    InvalidRate(f32),

    #[error("clip range {start}..{stop} is negative")]
    InvalidRange { start: f32, stop: f32 },

    /// Merged tracks were not sampled on the same time sequence
    #[error("cannot merge tracks with {expected} and {found} samples")]
    MismatchedSampleCount { expected: usize, found: usize },

    #[error("skeleton has no joints")]
    NoJoints,

    #[error(transparent)]
    Scene(#[from] ExportError),
}
