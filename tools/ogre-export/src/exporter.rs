//! Export orchestration
//!
//! One [`Exporter::export`] call runs the whole pipeline against a scene:
//! skeleton discovery, geometry consolidation, pose extraction, then clip
//! sampling. Structural errors abort the call. Recoverable problems are
//! logged and collected in the returned [`ExportReport`]. The host's current
//! time is restored whichever way the call ends.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::animation::{
    BoundsTracker, morph_targets, sample_pose_clip, sample_skeletal_clip, sample_vertex_clip,
};
use crate::blendshape::{BlendShapeSet, PoseGroup, PoseRemapping, extract_poses};
use crate::config::{ClipDef, ExportParams};
use crate::error::{ClipError, ExportError};
use crate::material::{Material, MaterialSet};
use crate::mesh::{ExportedMesh, MeshBuilder, NodeBounds};
use crate::scene::{NodeId, SceneReader, TimeGuard};
use crate::skeleton::{ExportedSkeleton, Skeleton, SkeletonBuilder};
use ogre_common::{Animation, BoundingBox, Pose, TrackTarget};

/// Recoverable problems met during one export
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportReport {
    pub warnings: Vec<String>,
    /// Sub-exports that were abandoned (e.g. an oversized skeleton)
    pub errors: Vec<String>,
    pub skipped_clips: Vec<String>,
}

impl ExportReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty() && self.skipped_clips.is_empty()
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    fn skip_clip(&mut self, kind: &str, clip: &ClipDef, err: ClipError) {
        warn!("Skipping {} clip '{}': {}", kind, clip.name, err);
        self.skipped_clips.push(clip.name.clone());
    }
}

/// State owned by a single export
#[derive(Debug, Default)]
pub struct ExportContext {
    pub materials: MaterialSet,
    pub report: ExportReport,
}

impl ExportContext {
    pub fn new(params: &ExportParams) -> Self {
        Self {
            materials: MaterialSet::new(&params.material_prefix),
            report: ExportReport::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportOutput {
    pub mesh: Option<ExportedMesh>,
    pub skeleton: Option<ExportedSkeleton>,
    pub materials: Vec<Material>,
    pub report: ExportReport,
}

/// Poses and the bookkeeping pose clips need
#[derive(Debug, Default)]
struct PoseState {
    poses: Vec<Pose>,
    groups: Vec<PoseGroup>,
    remap: PoseRemapping,
}

pub struct Exporter<'p> {
    params: &'p ExportParams,
}

impl<'p> Exporter<'p> {
    pub fn new(params: &'p ExportParams) -> Self {
        Self { params }
    }

    /// Export `nodes` as one mesh (and skeleton) named `name`
    pub fn export<R: SceneReader + ?Sized>(
        &self,
        reader: &mut R,
        name: &str,
        nodes: &[NodeId],
    ) -> Result<ExportOutput, ExportError> {
        let params = self.params;
        let mut scene = TimeGuard::new(reader);

        for &node in nodes {
            if !scene.contains(node) {
                return Err(ExportError::MissingNode(node.0));
            }
        }
        let mesh_nodes: Vec<NodeId> = nodes.iter().copied().filter(|&n| scene.has_mesh(n)).collect();
        info!(
            "Exporting '{}': {} nodes, {} meshes",
            name,
            nodes.len(),
            mesh_nodes.len()
        );

        let mut ctx = ExportContext::new(params);
        let skeleton = if params.export_skeleton {
            self.build_skeleton(&*scene, name, &mesh_nodes, &mut ctx.report)?
        } else {
            None
        };

        let mut mesh = if params.export_mesh {
            let mut builder = MeshBuilder::new(params);
            for &node in &mesh_nodes {
                builder.add_node(&*scene, node, skeleton.as_ref(), &mut ctx.materials)?;
            }
            if builder.submesh_count() == 0 {
                return Err(ExportError::EmptyMesh);
            }
            Some(builder.finish(name, skeleton.as_ref().map(|s| s.name.as_str())))
        } else {
            None
        };

        let mut node_bounds = NodeBounds::new();
        let mut pose_state = PoseState::default();
        if params.export_blend_shapes
            && let Some(mesh) = mesh.as_mut()
        {
            pose_state =
                self.extract_blend_shapes(&mut *scene, mesh, &mut node_bounds, &mut ctx.report)?;
            mesh.poses = std::mem::take(&mut pose_state.poses);
        }

        let mut skeleton_animations = Vec::new();
        if params.wants_skeletal_clips()
            && let Some(skeleton) = skeleton.as_ref()
        {
            let mut tracker = params
                .skeleton_bounds
                .then(|| BoundsTracker::new(mesh_nodes.clone(), params));
            for clip in &params.skeletal_clips {
                match sample_skeletal_clip(&mut *scene, skeleton, clip, params, tracker.as_mut()) {
                    Ok(animation) => skeleton_animations.push(animation),
                    Err(err) => ctx.report.skip_clip("skeletal", clip, err),
                }
            }
            if let Some(tracker) = tracker {
                for (node, bounds) in tracker.into_bounds() {
                    grow_node_bounds(&mut node_bounds, node, bounds);
                }
            }
        }

        if let Some(mesh) = mesh.as_mut() {
            if params.wants_pose_clips() && !pose_state.groups.is_empty() {
                for clip in &params.pose_clips {
                    match sample_pose_clip(&mut *scene, clip, &pose_state.groups, &pose_state.remap) {
                        Ok(animation) => mesh.animations.push(animation),
                        Err(err) => ctx.report.skip_clip("pose", clip, err),
                    }
                }
            }

            if params.wants_vertex_clips() {
                let targets = morph_targets(mesh);
                let mut tracker = params
                    .vertex_bounds
                    .then(|| BoundsTracker::new(mesh_nodes.clone(), params));
                let mut animations: Vec<Animation> = Vec::new();
                for clip in &params.vertex_clips {
                    match sample_vertex_clip(&mut *scene, clip, &targets, params, tracker.as_mut()) {
                        Ok(animation) => animations.push(animation),
                        Err(err) => ctx.report.skip_clip("vertex", clip, err),
                    }
                }
                mesh.animations.extend(animations);
                if let Some(tracker) = tracker {
                    for (node, bounds) in tracker.into_bounds() {
                        grow_node_bounds(&mut node_bounds, node, bounds);
                    }
                }
            }

            mesh.grow_bounds(&node_bounds);
        }
        drop(scene);

        let skeleton = skeleton.map(|s| ExportedSkeleton {
            name: s.name.clone(),
            bones: s.bones(),
            animations: skeleton_animations,
        });
        let materials = if params.export_material {
            ctx.materials.into_materials()
        } else {
            Vec::new()
        };

        info!(
            "Export '{}' finished: {} warnings, {} errors, {} skipped clips",
            name,
            ctx.report.warnings.len(),
            ctx.report.errors.len(),
            ctx.report.skipped_clips.len()
        );

        Ok(ExportOutput {
            mesh,
            skeleton,
            materials,
            report: ctx.report,
        })
    }

    /// Discover and load the skeleton driving `mesh_nodes`
    ///
    /// Exceeding the bone ceiling drops the skeleton (and with it skinning
    /// and skeletal clips) but not the export.
    fn build_skeleton<R: SceneReader + ?Sized>(
        &self,
        scene: &R,
        name: &str,
        mesh_nodes: &[NodeId],
        report: &mut ExportReport,
    ) -> Result<Option<Skeleton>, ExportError> {
        let skins: Vec<_> = mesh_nodes.iter().filter_map(|&n| scene.skin(n)).collect();
        if skins.is_empty() {
            return Ok(None);
        }

        let mut builder = SkeletonBuilder::new(self.params);
        for root in SkeletonBuilder::discover_roots(scene, &skins) {
            builder.load_joint(scene, root)?;
        }
        if builder.is_empty() {
            report.warn(format!(
                "Skinned meshes in '{}' have no root bone, injecting a synthetic root",
                name
            ));
            builder.inject_root(scene)?;
        }

        match builder.build(name) {
            Ok(skeleton) => Ok(Some(skeleton)),
            Err(err @ ExportError::BoneLimitExceeded { .. }) => {
                error!("Skeleton export aborted: {}", err);
                report.errors.push(err.to_string());
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Turn morph deformers of exported nodes into poses
    fn extract_blend_shapes<R: SceneReader + ?Sized>(
        &self,
        scene: &mut R,
        mesh: &mut ExportedMesh,
        node_bounds: &mut NodeBounds,
        report: &mut ExportReport,
    ) -> Result<PoseState, ExportError> {
        let params = self.params;
        let mut sources = BlendShapeSet::new();
        let mut state = PoseState::default();

        // (node, target, vertex offset, vertex range, submesh index)
        let mut jobs = Vec::new();
        if mesh.uses_shared_geometry() {
            for entry in mesh.geometry_map.entries() {
                jobs.push((entry.node, TrackTarget::Mesh, entry.offset, entry.range(), None));
            }
        } else {
            for (i, submesh) in mesh.submeshes.iter().enumerate() {
                let target = TrackTarget::Submesh(i as u32);
                jobs.push((submesh.node, target, 0, 0..submesh.vertices.len(), Some(i)));
            }
        }

        for (node, target, offset, range, submesh) in jobs {
            let source = match sources.index_of(node) {
                Some(source) => source,
                None => match scene.morph(node) {
                    Some(deformer) => sources.add(node, deformer),
                    None => continue,
                },
            };
            let Some(shape) = sources.get(source) else {
                continue;
            };
            let vertices = match submesh {
                Some(i) => &mesh.submeshes[i].vertices[range],
                None => &mesh.shared_vertices[range],
            };

            let first_pose = state.poses.len() as u32;
            let extracted =
                match extract_poses(scene, shape, vertices, offset, target, first_pose, params) {
                    Ok(extracted) => extracted,
                    Err(err @ ExportError::MorphVertexCountMismatch { .. }) => {
                        report.warn(format!(
                            "Dropping blend shapes of '{}': {}",
                            scene.node_name(node),
                            err
                        ));
                        continue;
                    }
                    Err(err) => return Err(err),
                };

            let local_start = state.remap.local_count(target) as u32;
            for pose in extracted.poses {
                state.remap.push(target, state.poses.len() as u32);
                state.poses.push(pose);
            }
            state.groups.push(PoseGroup {
                target,
                node,
                source,
                channels: extracted.channels,
                local_start,
            });

            match submesh {
                Some(i) => mesh.submeshes[i].pose_source = Some(source),
                None => mesh.geometry_map.set_pose_source(node, source),
            }
            if let Some(bounds) = extracted.bounds {
                grow_node_bounds(node_bounds, node, bounds);
            }
        }

        info!(
            "Blend shapes: {} sources, {} poses",
            sources.len(),
            state.poses.len()
        );
        Ok(state)
    }
}

fn grow_node_bounds(acc: &mut NodeBounds, node: NodeId, bounds: BoundingBox) {
    acc.entry(node)
        .and_modify(|b| b.merge(&bounds))
        .or_insert(bounds);
}
