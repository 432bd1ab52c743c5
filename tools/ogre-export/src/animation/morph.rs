//! Vertex (morph) clip sampling
//!
//! Keyframes hold absolute positions for every vertex of the target buffer,
//! read back from the host through each vertex's source position index.

use tracing::info;

use super::{BoundsTracker, ClipSchedule};
use crate::config::{ClipDef, ExportParams};
use crate::error::{ClipError, ExportError};
use crate::mesh::ExportedMesh;
use crate::scene::{NodeId, SceneReader, Space, TimeGuard};
use ogre_common::{Animation, MorphKeyframe, Track, TrackTarget, snap3};

/// Contiguous run of target vertices that come from one node
#[derive(Debug, Clone, PartialEq)]
pub struct MorphSegment {
    pub node: NodeId,
    pub source_indices: Vec<u32>,
}

/// Vertex buffer animated by one morph track
#[derive(Debug, Clone, PartialEq)]
pub struct MorphTarget {
    pub target: TrackTarget,
    pub segments: Vec<MorphSegment>,
}

impl MorphTarget {
    pub fn vertex_count(&self) -> usize {
        self.segments.iter().map(|s| s.source_indices.len()).sum()
    }
}

/// Targets for a built mesh: one covering the shared buffer, or one per
/// submesh
pub fn morph_targets(mesh: &ExportedMesh) -> Vec<MorphTarget> {
    if mesh.uses_shared_geometry() {
        let segments = mesh
            .geometry_map
            .entries()
            .iter()
            .map(|entry| MorphSegment {
                node: entry.node,
                source_indices: mesh.shared_vertices[entry.range()]
                    .iter()
                    .map(|v| v.source_index)
                    .collect(),
            })
            .collect();
        return vec![MorphTarget {
            target: TrackTarget::Mesh,
            segments,
        }];
    }

    mesh.submeshes
        .iter()
        .enumerate()
        .map(|(i, submesh)| MorphTarget {
            target: TrackTarget::Submesh(i as u32),
            segments: vec![MorphSegment {
                node: submesh.node,
                source_indices: submesh.vertices.iter().map(|v| v.source_index).collect(),
            }],
        })
        .collect()
}

fn sample_target<R: SceneReader + ?Sized>(
    reader: &R,
    target: &MorphTarget,
    time: f32,
    params: &ExportParams,
) -> Result<Vec<[f32; 3]>, ExportError> {
    let space = Space::from_world_flag(params.world_space);
    let lum = params.length_multiplier();
    let pos_eps = params.position_epsilon();

    let mut out = Vec::with_capacity(target.vertex_count());
    for segment in &target.segments {
        let positions = reader.positions(segment.node, space, time)?;
        for &src in &segment.source_indices {
            ExportError::check_index("position", src as usize, positions.len())?;
            let p = positions[src as usize];
            out.push(snap3([p[0] * lum, p[1] * lum, p[2] * lum], pos_eps));
        }
    }
    Ok(out)
}

/// Sample absolute vertex positions of every target over `clip`
pub fn sample_vertex_clip<R: SceneReader + ?Sized>(
    reader: &mut R,
    clip: &ClipDef,
    targets: &[MorphTarget],
    params: &ExportParams,
    mut bounds: Option<&mut BoundsTracker>,
) -> Result<Animation, ClipError> {
    let schedule = ClipSchedule::new(clip, reader.frame_rate())?;
    let mut keyframes: Vec<Vec<MorphKeyframe>> = vec![Vec::new(); targets.len()];

    let mut guard = TimeGuard::new(reader);
    for (i, time) in schedule.samples() {
        guard.set_current_time(time);
        for (target, track) in targets.iter().zip(&mut keyframes) {
            track.push(MorphKeyframe {
                time: schedule.key_time(i),
                positions: sample_target(&*guard, target, time, params)?,
            });
        }
        if let Some(tracker) = bounds.as_deref_mut() {
            tracker.sample(&*guard, time);
        }
    }
    drop(guard);

    info!(
        "Vertex clip '{}': {} samples, {} tracks",
        schedule.name,
        schedule.len(),
        targets.len()
    );

    Ok(Animation {
        name: schedule.name.clone(),
        length: schedule.length(),
        tracks: targets
            .iter()
            .zip(keyframes)
            .map(|(target, keyframes)| Track::Morph {
                target: target.target,
                keyframes,
            })
            .collect(),
    })
}
