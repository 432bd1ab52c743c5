//! Morph channels as poses
//!
//! Each active morph channel becomes one [`Pose`]: the displacement of every
//! exported vertex from the neutral mesh, transformed into export space.
//! Near-zero displacements are left out, but a pose with no remaining offsets
//! is still emitted so global pose indices stay aligned.
//!
//! Sources are owned by a [`BlendShapeSet`]; submeshes and geometry map
//! entries refer to them by index, so each source is released exactly once
//! with the set.

use glam::{Mat4, Vec3};
use hashbrown::HashMap;
use tracing::info;

use crate::config::ExportParams;
use crate::error::ExportError;
use crate::scene::{BIND_TIME, MorphDeformer, NodeId, SceneReader, SkinDisableGuard, Space};
use ogre_common::{BoundingBox, Pose, TrackTarget, VertexOffset, WeldedVertex, snap3};

/// Morph deformer pulled from one node
#[derive(Debug, Clone, PartialEq)]
pub struct BlendShapeSource {
    pub node: NodeId,
    pub deformer: MorphDeformer,
}

#[derive(Debug, Default)]
pub struct BlendShapeSet {
    sources: Vec<BlendShapeSource>,
}

impl BlendShapeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a source and return its index; a node is stored once
    pub fn add(&mut self, node: NodeId, deformer: MorphDeformer) -> usize {
        if let Some(i) = self.index_of(node) {
            return i;
        }
        self.sources.push(BlendShapeSource { node, deformer });
        self.sources.len() - 1
    }

    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.sources.iter().position(|s| s.node == node)
    }

    pub fn get(&self, index: usize) -> Option<&BlendShapeSource> {
        self.sources.get(index)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Poses of one source applied to one target
#[derive(Debug, Clone, PartialEq)]
pub struct PoseGroup {
    pub target: TrackTarget,
    pub node: NodeId,
    /// Index into the [`BlendShapeSet`]
    pub source: usize,
    /// Morph channel of each pose, in pose order
    pub channels: Vec<usize>,
    /// Local index of the group's first pose within its target
    pub local_start: u32,
}

/// Target -> (local pose index -> global pose index)
///
/// The mesh-wide target maps local indices to themselves. Each submesh
/// target maps its own 0-based pose list onto the global list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseRemapping {
    tables: HashMap<TrackTarget, Vec<u32>>,
}

impl PoseRemapping {
    /// Record global pose `global` for `target`; returns its local index
    pub fn push(&mut self, target: TrackTarget, global: u32) -> u32 {
        let table = self.tables.entry(target).or_default();
        table.push(global);
        (table.len() - 1) as u32
    }

    pub fn global(&self, target: TrackTarget, local: u32) -> Option<u32> {
        self.tables.get(&target)?.get(local as usize).copied()
    }

    pub fn local_count(&self, target: TrackTarget) -> usize {
        self.tables.get(&target).map_or(0, Vec::len)
    }
}

/// Result of extracting one source against one target
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPoses {
    pub poses: Vec<Pose>,
    /// Morph channel of each pose
    pub channels: Vec<usize>,
    /// Extent of the morph targets in export units
    pub bounds: Option<BoundingBox>,
}

/// Build poses for `vertices` (a range of the target's vertex buffer that
/// starts at `offset`)
///
/// Skin modifiers of the node are disabled while the neutral mesh is read.
/// A channel whose point count differs from the neutral mesh fails the whole
/// source.
pub fn extract_poses<R: SceneReader + ?Sized>(
    reader: &mut R,
    source: &BlendShapeSource,
    vertices: &[WeldedVertex],
    offset: u32,
    target: TrackTarget,
    first_pose: u32,
    params: &ExportParams,
) -> Result<ExtractedPoses, ExportError> {
    let node = source.node;
    let guard = SkinDisableGuard::new(reader, node);
    let neutral = guard.positions(node, Space::Object, BIND_TIME)?;

    let (diff_tm, world) = if params.world_space {
        (
            guard.object_transform(node, BIND_TIME),
            guard.world_transform(node, BIND_TIME),
        )
    } else {
        (Mat4::IDENTITY, Mat4::IDENTITY)
    };
    drop(guard);

    let lum = params.length_multiplier();
    let pos_eps = params.position_epsilon();

    for channel in source.deformer.channels.iter().filter(|c| c.active) {
        if channel.positions.len() != neutral.len() {
            return Err(ExportError::MorphVertexCountMismatch {
                channel: channel.name.clone().unwrap_or_default(),
                expected: neutral.len(),
                found: channel.positions.len(),
            });
        }
    }
    for v in vertices {
        ExportError::check_index("morph vertex", v.source_index as usize, neutral.len())?;
    }

    let mut result = ExtractedPoses {
        poses: Vec::new(),
        channels: Vec::new(),
        bounds: None,
    };

    for (c, channel) in source.deformer.channels.iter().enumerate() {
        if !channel.active {
            continue;
        }

        let mut offsets = Vec::new();
        for (k, v) in vertices.iter().enumerate() {
            let src = v.source_index as usize;
            let morph = Vec3::from(channel.positions[src]);
            let diff = morph - Vec3::from(neutral[src]);
            let d = snap3((diff_tm.transform_vector3(diff) * lum).to_array(), pos_eps);
            if d != [0.0; 3] {
                offsets.push(VertexOffset {
                    index: offset + k as u32,
                    offset: d,
                });
            }

            if params.blend_shape_bounds {
                let p = (world.transform_point3(morph) * lum).to_array();
                match result.bounds.as_mut() {
                    Some(b) => b.expand(p),
                    None => result.bounds = Some(BoundingBox::from_point(p)),
                }
            }
        }

        let name = match &channel.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("pose{}", first_pose as usize + result.poses.len()),
        };
        info!("Pose '{}': {} vertex offsets", name, offsets.len());
        result.poses.push(Pose {
            name,
            target,
            offsets,
        });
        result.channels.push(c);
    }

    Ok(result)
}
