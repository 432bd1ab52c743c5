//! JSON scene snapshot host
//!
//! A baked scene description (hierarchy, keyed TRS, meshes, skins, morph
//! channels, keyed vertex positions) that implements [`SceneReader`]. The CLI
//! exports from it and the tests build fixtures with it.
//!
//! Skin modifiers are tracked for enable/disable state only; the snapshot
//! does not deform vertices by bones. Animated surfaces use `vertex_keys`.

use anyhow::{Context, Result};
use glam::{Mat3, Mat4, Quat, Vec3};
use hashbrown::HashSet;
use serde::Deserialize;
use std::path::Path;

use super::{
    MaterialSlot, MorphChannel, MorphDeformer, NodeId, SceneReader, SkinBinding, SkinWeight,
    SourceFace, SourceMesh, Space,
};
use crate::error::ExportError;
use ogre_common::BoundingBox;

fn default_frame_rate() -> f32 {
    30.0
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn default_true() -> bool {
    true
}

/// Linear key list (`times` ascending, one value per time)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Keys<T> {
    pub times: Vec<f32>,
    pub values: Vec<T>,
}

impl<T> Keys<T> {
    fn is_empty(&self) -> bool {
        self.times.is_empty() || self.values.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotFace {
    pub positions: [u32; 3],
    /// Defaults to the position indices (or the flat face normal when the
    /// mesh has no normals)
    #[serde(default)]
    pub normals: Option<[u32; 3]>,
    #[serde(default)]
    pub colors: Option<[u32; 3]>,
    /// Defaults to the position indices for every UV channel
    #[serde(default)]
    pub uvs: Option<Vec<[u32; 3]>>,
    #[serde(default)]
    pub material: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VertexKey {
    pub time: f32,
    pub positions: Vec<[f32; 3]>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotMesh {
    pub positions: Vec<[f32; 3]>,
    #[serde(default)]
    pub normals: Vec<[f32; 3]>,
    #[serde(default)]
    pub colors: Vec<[f32; 4]>,
    #[serde(default)]
    pub uvs: Vec<Vec<[f32; 2]>>,
    pub faces: Vec<SnapshotFace>,
    #[serde(default)]
    pub materials: Vec<MaterialSlot>,
    #[serde(default)]
    pub opposite: bool,
    /// Baked vertex animation (object space)
    #[serde(default)]
    pub vertex_keys: Vec<VertexKey>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotSkin {
    /// Bone node indices
    pub joints: Vec<u32>,
    /// Per position: `[joint slot, weight]` pairs
    pub weights: Vec<Vec<(u32, f32)>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotChannel {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    pub positions: Vec<[f32; 3]>,
    /// Weight keys in `0.0..=1.0`
    #[serde(default)]
    pub weights: Keys<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotNode {
    pub name: String,
    #[serde(default)]
    pub parent: Option<u32>,
    #[serde(default)]
    pub translation: [f32; 3],
    /// Quaternion `[x, y, z, w]`
    #[serde(default = "identity_rotation")]
    pub rotation: [f32; 4],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    #[serde(default)]
    pub translation_keys: Keys<[f32; 3]>,
    #[serde(default)]
    pub rotation_keys: Keys<[f32; 4]>,
    #[serde(default)]
    pub scale_keys: Keys<[f32; 3]>,
    #[serde(default)]
    pub mesh: Option<SnapshotMesh>,
    #[serde(default)]
    pub skin: Option<SnapshotSkin>,
    #[serde(default)]
    pub morph: Vec<SnapshotChannel>,
}

/// In-memory scene implementing [`SceneReader`]
#[derive(Debug, Clone, Deserialize)]
pub struct SceneSnapshot {
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f32,
    #[serde(default)]
    pub current_time: f32,
    pub nodes: Vec<SnapshotNode>,
    #[serde(skip)]
    disabled_skins: HashSet<u32>,
}

impl SceneSnapshot {
    /// Load a snapshot from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene snapshot: {:?}", path))?;
        Self::from_json(&content).with_context(|| format!("Invalid scene snapshot: {:?}", path))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let scene: SceneSnapshot =
            serde_json::from_str(content).context("Failed to parse scene JSON")?;
        for (i, node) in scene.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                anyhow::ensure!(
                    (parent as usize) < scene.nodes.len() && parent as usize != i,
                    "node '{}' has invalid parent {}",
                    node.name,
                    parent
                );
            }
        }
        for (i, node) in scene.nodes.iter().enumerate() {
            let mut seen = HashSet::new();
            seen.insert(i);
            let mut next = node.parent;
            while let Some(parent) = next {
                anyhow::ensure!(
                    seen.insert(parent as usize),
                    "node '{}' is part of a parent cycle",
                    node.name
                );
                next = scene.nodes[parent as usize].parent;
            }
        }
        Ok(scene)
    }

    /// Every node carrying a mesh, in scene order
    pub fn mesh_nodes(&self) -> Vec<NodeId> {
        (0..self.nodes.len() as u32)
            .filter(|&i| self.nodes[i as usize].mesh.is_some())
            .map(NodeId)
            .collect()
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .map(|i| NodeId(i as u32))
    }

    fn node(&self, node: NodeId) -> Result<&SnapshotNode, ExportError> {
        self.nodes
            .get(node.0 as usize)
            .ok_or(ExportError::MissingNode(node.0))
    }

    fn snapshot_mesh(&self, node: NodeId) -> Result<&SnapshotMesh, ExportError> {
        let n = self.node(node)?;
        n.mesh
            .as_ref()
            .ok_or_else(|| ExportError::Scene(format!("node '{}' has no mesh", n.name)))
    }

    fn local_transform(&self, node: &SnapshotNode, time: f32) -> Mat4 {
        let translation = if node.translation_keys.is_empty() {
            node.translation
        } else {
            interpolate_vec3(&node.translation_keys, time)
        };
        let rotation = if node.rotation_keys.is_empty() {
            node.rotation
        } else {
            interpolate_quat(&node.rotation_keys, time)
        };
        let scale = if node.scale_keys.is_empty() {
            node.scale
        } else {
            interpolate_vec3(&node.scale_keys, time)
        };

        Mat4::from_scale_rotation_translation(
            Vec3::from(scale),
            Quat::from_array(rotation).normalize(),
            Vec3::from(translation),
        )
    }

    /// Object-space positions at `time`: keyed vertex positions when present,
    /// otherwise the base mesh plus weighted active morph channels
    fn object_positions(&self, node: NodeId, time: f32) -> Result<Vec<[f32; 3]>, ExportError> {
        let n = self.node(node)?;
        let mesh = self.snapshot_mesh(node)?;
        let count = mesh.positions.len();

        if !mesh.vertex_keys.is_empty() && mesh.vertex_keys.iter().all(|k| k.positions.len() == count)
        {
            return Ok(interpolate_vertex_keys(&mesh.vertex_keys, time));
        }

        let mut positions = mesh.positions.clone();
        for (c, channel) in n.morph.iter().enumerate() {
            if !channel.active || channel.positions.len() != count {
                continue;
            }
            let weight = self.morph_weight(node, c, time);
            if weight == 0.0 {
                continue;
            }
            for (p, (base, target)) in positions
                .iter_mut()
                .zip(mesh.positions.iter().zip(&channel.positions))
            {
                for i in 0..3 {
                    p[i] += (target[i] - base[i]) * weight;
                }
            }
        }
        Ok(positions)
    }

    fn to_space(&self, node: NodeId, space: Space, time: f32, positions: &mut [[f32; 3]]) {
        if space == Space::World {
            let world = self.world_transform(node, time);
            for p in positions.iter_mut() {
                *p = world.transform_point3(Vec3::from(*p)).to_array();
            }
        }
    }
}

impl SceneReader for SceneSnapshot {
    fn contains(&self, node: NodeId) -> bool {
        (node.0 as usize) < self.nodes.len()
    }

    fn node_name(&self, node: NodeId) -> &str {
        self.nodes
            .get(node.0 as usize)
            .map(|n| n.name.as_str())
            .unwrap_or("")
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0 as usize)?.parent.map(NodeId)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent == Some(node.0))
            .map(|(i, _)| NodeId(i as u32))
            .collect()
    }

    fn top_level_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(i, _)| NodeId(i as u32))
            .collect()
    }

    fn world_transform(&self, node: NodeId, time: f32) -> Mat4 {
        let Some(n) = self.nodes.get(node.0 as usize) else {
            return Mat4::IDENTITY;
        };
        let local = self.local_transform(n, time);
        match n.parent {
            Some(parent) => self.world_transform(NodeId(parent), time) * local,
            None => local,
        }
    }

    fn object_transform(&self, node: NodeId, time: f32) -> Mat4 {
        // snapshot nodes carry no pivot offset
        self.world_transform(node, time)
    }

    fn has_mesh(&self, node: NodeId) -> bool {
        self.nodes
            .get(node.0 as usize)
            .is_some_and(|n| n.mesh.is_some())
    }

    fn mesh(&self, node: NodeId, space: Space, time: f32) -> Result<SourceMesh, ExportError> {
        let mesh = self.snapshot_mesh(node)?;
        let mut positions = self.object_positions(node, time)?;
        self.to_space(node, space, time, &mut positions);

        let world = self.world_transform(node, time);
        let mirrored = space == Space::World && world.determinant() < 0.0;

        // without authored normals every face gets its flat normal
        let flat_normals = mesh.normals.is_empty();
        let mut normals: Vec<[f32; 3]> = if flat_normals {
            mesh.faces
                .iter()
                .map(|f| face_normal(&positions, f.positions))
                .collect()
        } else {
            mesh.normals.clone()
        };
        if space == Space::World && !flat_normals {
            let normal_matrix = Mat3::from_mat4(world).inverse().transpose();
            for n in normals.iter_mut() {
                *n = (normal_matrix * Vec3::from(*n)).normalize_or_zero().to_array();
            }
        }

        let channel_count = mesh.uvs.len();
        let faces = mesh
            .faces
            .iter()
            .enumerate()
            .map(|(i, f)| SourceFace {
                positions: f.positions,
                normals: if flat_normals {
                    [i as u32; 3]
                } else {
                    f.normals.unwrap_or(f.positions)
                },
                colors: if mesh.colors.is_empty() {
                    None
                } else {
                    Some(f.colors.unwrap_or(f.positions))
                },
                uvs: f
                    .uvs
                    .clone()
                    .unwrap_or_else(|| vec![f.positions; channel_count]),
                material: f.material,
            })
            .collect();

        let materials = if mesh.materials.is_empty() {
            vec![MaterialSlot::named("default")]
        } else {
            mesh.materials.clone()
        };

        Ok(SourceMesh {
            positions,
            normals,
            colors: mesh.colors.clone(),
            uv_channels: mesh.uvs.clone(),
            faces,
            materials,
            opposite: mesh.opposite ^ mirrored,
        })
    }

    fn positions(
        &self,
        node: NodeId,
        space: Space,
        time: f32,
    ) -> Result<Vec<[f32; 3]>, ExportError> {
        let mut positions = self.object_positions(node, time)?;
        self.to_space(node, space, time, &mut positions);
        Ok(positions)
    }

    fn bounding_box(&self, node: NodeId, space: Space, time: f32) -> Option<BoundingBox> {
        let positions = self.positions(node, space, time).ok()?;
        BoundingBox::from_points(positions)
    }

    fn skin(&self, node: NodeId) -> Option<SkinBinding> {
        let skin = self.nodes.get(node.0 as usize)?.skin.as_ref()?;
        Some(SkinBinding {
            joints: skin.joints.iter().copied().map(NodeId).collect(),
            influences: skin
                .weights
                .iter()
                .map(|list| {
                    list.iter()
                        .map(|&(joint, weight)| SkinWeight { joint, weight })
                        .collect()
                })
                .collect(),
        })
    }

    fn morph(&self, node: NodeId) -> Option<MorphDeformer> {
        let n = self.nodes.get(node.0 as usize)?;
        if n.morph.is_empty() {
            return None;
        }
        Some(MorphDeformer {
            channels: n
                .morph
                .iter()
                .map(|c| MorphChannel {
                    name: c.name.clone(),
                    active: c.active,
                    positions: c.positions.clone(),
                })
                .collect(),
        })
    }

    fn morph_weight(&self, node: NodeId, channel: usize, time: f32) -> f32 {
        self.nodes
            .get(node.0 as usize)
            .and_then(|n| n.morph.get(channel))
            .map(|c| interpolate_scalar(&c.weights, time))
            .unwrap_or(0.0)
    }

    fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    fn current_time(&self) -> f32 {
        self.current_time
    }

    fn set_current_time(&mut self, time: f32) {
        self.current_time = time;
    }

    fn skin_modifier_count(&self, node: NodeId) -> usize {
        self.nodes
            .get(node.0 as usize)
            .map_or(0, |n| n.skin.is_some() as usize)
    }

    fn skin_modifier_enabled(&self, node: NodeId, modifier: usize) -> bool {
        modifier < self.skin_modifier_count(node) && !self.disabled_skins.contains(&node.0)
    }

    fn set_skin_modifier_enabled(&mut self, node: NodeId, modifier: usize, enabled: bool) {
        if modifier >= self.skin_modifier_count(node) {
            return;
        }
        if enabled {
            self.disabled_skins.remove(&node.0);
        } else {
            self.disabled_skins.insert(node.0);
        }
    }
}

// ============================================================================
// Key interpolation
// ============================================================================

/// Segment start index and blend factor for time `t`; `None` past the last key
fn find_segment(times: &[f32], t: f32) -> Option<(usize, f32)> {
    let mut i = 0;
    while i < times.len() - 1 && times[i + 1] < t {
        i += 1;
    }

    if i >= times.len() - 1 {
        return None;
    }

    let t0 = times[i];
    let t1 = times[i + 1];
    let factor = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
    Some((i, factor.clamp(0.0, 1.0)))
}

fn interpolate_scalar(keys: &Keys<f32>, t: f32) -> f32 {
    if keys.is_empty() {
        return 0.0;
    }
    match find_segment(&keys.times, t) {
        Some((i, f)) if i + 1 < keys.values.len() => {
            keys.values[i] + (keys.values[i + 1] - keys.values[i]) * f
        }
        _ => keys.values[keys.values.len() - 1],
    }
}

fn lerp3(a: [f32; 3], b: [f32; 3], f: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * f,
        a[1] + (b[1] - a[1]) * f,
        a[2] + (b[2] - a[2]) * f,
    ]
}

fn interpolate_vec3(keys: &Keys<[f32; 3]>, t: f32) -> [f32; 3] {
    match find_segment(&keys.times, t) {
        Some((i, f)) if i + 1 < keys.values.len() => lerp3(keys.values[i], keys.values[i + 1], f),
        _ => keys.values[keys.values.len() - 1],
    }
}

fn interpolate_quat(keys: &Keys<[f32; 4]>, t: f32) -> [f32; 4] {
    match find_segment(&keys.times, t) {
        Some((i, f)) if i + 1 < keys.values.len() => slerp(keys.values[i], keys.values[i + 1], f),
        _ => keys.values[keys.values.len() - 1],
    }
}

fn interpolate_vertex_keys(keys: &[VertexKey], t: f32) -> Vec<[f32; 3]> {
    let times: Vec<f32> = keys.iter().map(|k| k.time).collect();
    match find_segment(&times, t) {
        Some((i, f)) => keys[i]
            .positions
            .iter()
            .zip(&keys[i + 1].positions)
            .map(|(&a, &b)| lerp3(a, b, f))
            .collect(),
        None => keys[keys.len() - 1].positions.clone(),
    }
}

fn slerp(q0: [f32; 4], q1: [f32; 4], t: f32) -> [f32; 4] {
    let mut dot = q0[0] * q1[0] + q0[1] * q1[1] + q0[2] * q1[2] + q0[3] * q1[3];

    // Shortest path
    let mut q1 = q1;
    if dot < 0.0 {
        q1 = [-q1[0], -q1[1], -q1[2], -q1[3]];
        dot = -dot;
    }

    if dot > 0.9995 {
        let result = [
            q0[0] + t * (q1[0] - q0[0]),
            q0[1] + t * (q1[1] - q0[1]),
            q0[2] + t * (q1[2] - q0[2]),
            q0[3] + t * (q1[3] - q0[3]),
        ];
        return normalize_quat(result);
    }

    let theta_0 = dot.acos();
    let theta = theta_0 * t;
    let sin_theta = theta.sin();
    let sin_theta_0 = theta_0.sin();

    let s0 = (theta_0 - theta).sin() / sin_theta_0;
    let s1 = sin_theta / sin_theta_0;

    [
        s0 * q0[0] + s1 * q1[0],
        s0 * q0[1] + s1 * q1[1],
        s0 * q0[2] + s1 * q1[2],
        s0 * q0[3] + s1 * q1[3],
    ]
}

fn normalize_quat(q: [f32; 4]) -> [f32; 4] {
    let len = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if len > 0.0 {
        [q[0] / len, q[1] / len, q[2] / len, q[3] / len]
    } else {
        [0.0, 0.0, 0.0, 1.0]
    }
}

fn face_normal(positions: &[[f32; 3]], face: [u32; 3]) -> [f32; 3] {
    let get = |i: u32| {
        positions
            .get(i as usize)
            .map(|&p| Vec3::from(p))
            .unwrap_or(Vec3::ZERO)
    };
    let (a, b, c) = (get(face[0]), get(face[1]), get(face[2]));
    let n = (b - a).cross(c - a).normalize_or_zero();
    if n == Vec3::ZERO { [0.0, 0.0, 1.0] } else { n.to_array() }
}
