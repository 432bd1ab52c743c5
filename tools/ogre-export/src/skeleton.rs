//! Skeleton building
//!
//! Bones are discovered from skin bindings: every skin joint is walked up to
//! its top-level ancestor and each distinct ancestor is loaded as a root
//! together with its whole subtree. Bind poses are always evaluated at
//! [`BIND_TIME`], independent of the scene's current time.
//!
//! A joint goes through these states:
//! - unseen
//! - provisional root (loaded while its parent is not a joint)
//! - reparented (revisited once its parent became a joint)
//!
//! Revisiting a joint whose parent is unchanged does nothing.

use glam::{Mat4, Quat, Vec3};
use hashbrown::{HashMap, HashSet};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ExportParams;
use crate::error::ExportError;
use crate::scene::{BIND_TIME, NodeId, SceneReader, SkinBinding};
use ogre_common::{Animation, Bone, BoneTransform, MAX_BONES, snap_to_zero, snap3};

/// Loaded bone with its bind matrices
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub id: u16,
    pub name: String,
    pub node: NodeId,
    pub parent: Option<u16>,
    /// World matrix at bind time (scale stripped when normalising)
    pub bind_world: Mat4,
    /// Parent-relative bind matrix
    pub bind_local: Mat4,
    pub bind: BoneTransform,
}

#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    pub name: String,
    pub joints: Vec<Joint>,
    pub roots: Vec<u16>,
    by_node: HashMap<NodeId, u16>,
}

impl Skeleton {
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn joint_index(&self, node: NodeId) -> Option<u16> {
        self.by_node.get(&node).copied()
    }

    /// Joint a rigid vertex of `node` binds to: the node itself or its
    /// nearest ancestor joint, else joint 0
    pub fn rigid_joint<R: SceneReader + ?Sized>(&self, reader: &R, node: NodeId) -> u16 {
        reader
            .ancestors(node)
            .into_iter()
            .find_map(|n| self.joint_index(n))
            .unwrap_or(0)
    }

    pub fn bones(&self) -> Vec<Bone> {
        self.joints
            .iter()
            .map(|j| Bone {
                id: j.id,
                name: j.name.clone(),
                parent: j.parent,
                bind: j.bind,
            })
            .collect()
    }
}

/// Skeleton output handed to writers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedSkeleton {
    pub name: String,
    pub bones: Vec<Bone>,
    pub animations: Vec<Animation>,
}

pub struct SkeletonBuilder<'p> {
    params: &'p ExportParams,
    joints: Vec<Joint>,
    roots: Vec<u16>,
    by_node: HashMap<NodeId, u16>,
    names: HashSet<String>,
}

impl<'p> SkeletonBuilder<'p> {
    pub fn new(params: &'p ExportParams) -> Self {
        Self {
            params,
            joints: Vec::new(),
            roots: Vec::new(),
            by_node: HashMap::new(),
            names: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn joint_index(&self, node: NodeId) -> Option<u16> {
        self.by_node.get(&node).copied()
    }

    /// Distinct top-level ancestors of every skin joint, in discovery order
    pub fn discover_roots<R: SceneReader + ?Sized>(reader: &R, skins: &[SkinBinding]) -> Vec<NodeId> {
        let mut roots = Vec::new();
        for skin in skins {
            for &joint in &skin.joints {
                let top = reader.ancestors(joint).last().copied().unwrap_or(joint);
                if !roots.contains(&top) {
                    roots.push(top);
                }
            }
        }
        roots
    }

    /// Load `node` and its subtree
    pub fn load_joint<R: SceneReader + ?Sized>(
        &mut self,
        reader: &R,
        node: NodeId,
    ) -> Result<(), ExportError> {
        if !reader.contains(node) {
            return Err(ExportError::MissingNode(node.0));
        }

        if let Some(id) = self.joint_index(node) {
            self.revisit(reader, id);
            return Ok(());
        }

        let name = reader.node_name(node).to_string();
        if self.names.contains(&name) {
            warn!("Duplicate bone name '{}', skipping node {}", name, node.0);
            return Ok(());
        }

        let id = self.joints.len() as u16;
        let parent = reader.parent(node).and_then(|p| self.joint_index(p));
        let bind_world = world_matrix(reader, node, BIND_TIME, self.params.normalize_scale);
        let bind_local = self.bind_local(parent, bind_world);

        self.joints.push(Joint {
            id,
            name: name.clone(),
            node,
            parent,
            bind_world,
            bind_local,
            bind: decompose(bind_local, self.params),
        });
        self.by_node.insert(node, id);
        self.names.insert(name);
        if parent.is_none() {
            self.roots.push(id);
        }

        for child in reader.children(node) {
            self.load_joint(reader, child)?;
        }
        Ok(())
    }

    /// Demote a provisional root whose parent has since become a joint
    fn revisit<R: SceneReader + ?Sized>(&mut self, reader: &R, id: u16) {
        let joint = &self.joints[id as usize];
        if joint.parent.is_some() {
            return;
        }
        let Some(parent) = reader.parent(joint.node).and_then(|p| self.joint_index(p)) else {
            return;
        };

        let bind_local = self.bind_local(Some(parent), joint.bind_world);
        let bind = decompose(bind_local, self.params);
        let joint = &mut self.joints[id as usize];
        joint.parent = Some(parent);
        joint.bind_local = bind_local;
        joint.bind = bind;
        self.roots.retain(|&r| r != id);
    }

    /// Roots keep their world bind in both export spaces
    fn bind_local(&self, parent: Option<u16>, bind_world: Mat4) -> Mat4 {
        match parent {
            Some(p) => self.joints[p as usize].bind_world.inverse() * bind_world,
            None => bind_world,
        }
    }

    /// Use the first top-level node as a synthetic root
    pub fn inject_root<R: SceneReader + ?Sized>(&mut self, reader: &R) -> Result<(), ExportError> {
        let Some(&node) = reader.top_level_nodes().first() else {
            return Err(ExportError::Scene("scene has no nodes".into()));
        };
        warn!(
            "No root bone found, using '{}' as skeleton root",
            reader.node_name(node)
        );
        self.load_joint(reader, node)
    }

    /// Finish; skeletons above the bone ceiling are rejected whole
    pub fn build(self, name: &str) -> Result<Skeleton, ExportError> {
        if self.joints.len() > MAX_BONES {
            return Err(ExportError::bone_limit(self.joints.len()));
        }
        info!(
            "Skeleton '{}': {} bones, {} roots",
            name,
            self.joints.len(),
            self.roots.len()
        );
        Ok(Skeleton {
            name: name.to_string(),
            joints: self.joints,
            roots: self.roots,
            by_node: self.by_node,
        })
    }
}

// ============================================================================
// Transform helpers
// ============================================================================

/// World matrix of `node`, optionally with scale removed
pub(crate) fn world_matrix<R: SceneReader + ?Sized>(
    reader: &R,
    node: NodeId,
    time: f32,
    normalize_scale: bool,
) -> Mat4 {
    let world = reader.world_transform(node, time);
    if normalize_scale {
        strip_scale(world)
    } else {
        world
    }
}

pub(crate) fn strip_scale(m: Mat4) -> Mat4 {
    let (_, rotation, translation) = m.to_scale_rotation_translation();
    Mat4::from_rotation_translation(rotation, translation)
}

/// Unit axis and angle of a rotation, snapped
///
/// Rotations whose angle snaps to zero, and degenerate axes (length below 0.5
/// after normalising), become (0, 1, 0) with a zero angle.
pub(crate) fn axis_angle(rotation: Quat, epsilon: f32) -> ([f32; 3], f32) {
    let q = if rotation.w < 0.0 { -rotation } else { rotation };
    let q = q.normalize();
    let angle = snap_to_zero(2.0 * q.w.clamp(-1.0, 1.0).acos(), epsilon);
    let s = (1.0 - q.w * q.w).max(0.0).sqrt();
    if angle == 0.0 || s <= 1e-6 {
        return ([0.0, 1.0, 0.0], 0.0);
    }

    let axis = Vec3::from(snap3((Vec3::new(q.x, q.y, q.z) / s).to_array(), epsilon));
    let axis = axis.normalize_or_zero();
    if axis.length() < 0.5 {
        return ([0.0, 1.0, 0.0], 0.0);
    }
    (snap3(axis.to_array(), epsilon), angle)
}

/// Export-format transform from decomposed parts; `translation` is in scene
/// units
pub(crate) fn bone_transform(
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,
    params: &ExportParams,
) -> BoneTransform {
    let (axis, angle) = axis_angle(rotation, params.epsilon);
    BoneTransform {
        translation: snap3(
            (translation * params.length_multiplier()).to_array(),
            params.position_epsilon(),
        ),
        axis,
        angle: if params.negate_rotation_angle && angle != 0.0 {
            -angle
        } else {
            angle
        },
        scale: snap3(scale.to_array(), params.epsilon),
    }
}

/// Split a local matrix into the bone transform format
pub(crate) fn decompose(local: Mat4, params: &ExportParams) -> BoneTransform {
    let (scale, rotation, translation) = local.to_scale_rotation_translation();
    bone_transform(translation, rotation, scale, params)
}
