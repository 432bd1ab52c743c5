//! Bone hierarchy output

use serde::Serialize;

/// Hard bone ceiling of the target engine. Skeletons above this are rejected
/// as a whole, never truncated.
pub const MAX_BONES: usize = 256;

/// Parent-relative transform in angle-axis form
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoneTransform {
    pub translation: [f32; 3],
    /// Unit rotation axis
    pub axis: [f32; 3],
    /// Rotation angle in radians
    pub angle: f32,
    pub scale: [f32; 3],
}

impl BoneTransform {
    pub const IDENTITY: Self = Self {
        translation: [0.0; 3],
        axis: [0.0, 1.0, 0.0],
        angle: 0.0,
        scale: [1.0; 3],
    };
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Exported bone
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bone {
    /// Stable bone id (equal to the bone's position in the list)
    pub id: u16,
    /// Globally unique bone name
    pub name: String,
    /// Parent bone id, `None` for roots
    pub parent: Option<u16>,
    /// Bind pose relative to the parent
    pub bind: BoneTransform,
}
